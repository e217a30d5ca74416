//! Streaming batch pipelines.
//!
//! Each pipeline runs one producer thread per metadata array, a coordinator
//! joining the producer queues by record index, and a pool of preprocessing
//! workers. The consumer assembles batches from whichever examples arrive
//! first.

mod batch;
mod boxes;
mod digits;
mod images;
mod queue;

pub use batch::*;
pub use queue::{join_keys, Keyed, StopSignal};

use crate::{common::*, config::ImageChannels, processor::FloatImage};
use flume::{Receiver, RecvError};
use queue::Threads;

/// The pipeline producing digit recognition batches.
pub type DigitBatchPipeline = BatchPipeline<DigitBatch>;

/// The pipeline producing box regression batches.
pub type BoxBatchPipeline = BatchPipeline<BoxBatch>;

/// The pipeline producing batches from in-memory images.
pub type ImageBatchPipeline = BatchPipeline<ImageBatch>;

/// The batch pipeline handle.
///
/// Dropping the handle stops and joins every pipeline thread.
#[derive(Debug)]
pub struct BatchPipeline<B>
where
    B: Batch,
{
    batch_size: usize,
    num_records: usize,
    finished: bool,
    example_rx: Receiver<Result<Keyed<B::Example>>>,
    // dropped after the receiver so that blocked workers are released
    _threads: Threads,
}

impl<B> BatchPipeline<B>
where
    B: Batch,
{
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// The number of records in a full pass.
    pub fn num_records(&self) -> usize {
        self.num_records
    }

    /// Wait for the next batch.
    ///
    /// It returns `Ok(None)` when a single-pass pipeline is exhausted. The
    /// last batch of a single pass may be smaller than the batch size.
    pub fn next_batch(&mut self) -> Result<Option<B>> {
        let mut examples = Vec::with_capacity(self.batch_size);
        while !self.finished && examples.len() < self.batch_size {
            let received = self.example_rx.recv();
            self.accept(received, &mut examples)?;
        }
        self.assemble(examples)
    }

    /// Asynchronous version of [next_batch](Self::next_batch).
    pub async fn next_batch_async(&mut self) -> Result<Option<B>> {
        let mut examples = Vec::with_capacity(self.batch_size);
        while !self.finished && examples.len() < self.batch_size {
            let received = self.example_rx.recv_async().await;
            self.accept(received, &mut examples)?;
        }
        self.assemble(examples)
    }

    /// Turn the pipeline into a stream of batches.
    ///
    /// The stream ends after the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<B>> + Send {
        stream::unfold(self, |mut pipeline| async move {
            let item = pipeline.next_batch_async().await.transpose()?;
            if item.is_err() {
                pipeline.finished = true;
            }
            Some((item, pipeline))
        })
    }

    fn accept(
        &mut self,
        received: Result<Result<Keyed<B::Example>>, RecvError>,
        examples: &mut Vec<Keyed<B::Example>>,
    ) -> Result<()> {
        match received {
            Ok(Ok(example)) => {
                examples.push(example);
                Ok(())
            }
            Ok(Err(err)) => {
                self.finished = true;
                Err(err)
            }
            Err(RecvError::Disconnected) => {
                self.finished = true;
                Ok(())
            }
        }
    }

    fn assemble(&self, examples: Vec<Keyed<B::Example>>) -> Result<Option<B>> {
        if examples.is_empty() {
            return Ok(None);
        }
        let batch = B::stack(examples)?;
        debug!("assembled a batch of {} examples", batch.len());
        Ok(Some(batch))
    }
}

fn read_float_image(path: &Path, channels: ImageChannels) -> Result<FloatImage> {
    let bytes =
        fs::read(path).with_context(|| format!("failed to read image '{}'", path.display()))?;
    FloatImage::decode(&bytes, channels)
        .with_context(|| format!("failed to decode image '{}'", path.display()))
}
