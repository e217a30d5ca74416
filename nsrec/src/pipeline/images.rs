use super::{
    queue::{spawn_coordinator, spawn_producer, spawn_workers, Threads},
    BatchPipeline, ImageBatch, ImageExample,
};
use crate::{
    common::*,
    config::PipelineConfig,
    mnist::InMemoryDataset,
    pipeline::{join_keys, Keyed},
    processor::FloatImage,
    profiling::Timing,
};

impl BatchPipeline<ImageBatch> {
    /// Start a pipeline yielding in-memory images resized to the configured
    /// size, together with their class labels.
    ///
    /// The channel count follows the dataset. The crop option is ignored.
    pub fn new(dataset: Arc<InMemoryDataset>, config: &PipelineConfig) -> Result<Self> {
        let PipelineConfig {
            batch_size,
            num_preprocess_threads,
            is_training,
            ..
        } = *config;
        let image_size = config.image_size()?;
        let capacity = config.queue_capacity();

        let num_records = dataset.len();
        ensure!(num_records > 0, "the dataset has no records");
        info!(
            "start in-memory image pipeline on {} records with {} workers",
            num_records, num_preprocess_threads
        );

        let mut threads = Threads::default();

        let image_rx = {
            let dataset = dataset.clone();
            spawn_producer(
                &mut threads,
                "image",
                num_records,
                is_training,
                capacity,
                move |index| dataset.images().index_axis(Axis(0), index).to_owned(),
            )?
        };
        let label_rx = {
            let dataset = dataset.clone();
            spawn_producer(
                &mut threads,
                "label",
                num_records,
                is_training,
                capacity,
                move |index| dataset.labels().row(index).to_owned(),
            )?
        };

        let (work_tx, work_rx) = flume::bounded(capacity);
        let (example_tx, example_rx) = flume::bounded(capacity);

        spawn_coordinator(&mut threads, work_tx, example_tx.clone(), move || {
            let image = image_rx.recv().ok()?;
            let label = label_rx.recv().ok()?;
            let work = join_keys(&[image.index, label.index])
                .map(|index| Keyed::new(index, (image.value, label.value)));
            Some(work)
        })?;

        spawn_workers(
            &mut threads,
            num_preprocess_threads.get(),
            work_rx,
            example_tx,
            move |_index, (image, label): (Array3<f32>, Array1<f32>)| {
                let mut timing = Timing::new("image_worker");
                let image = FloatImage::from_array(image)?
                    .resize(&image_size)
                    .into_array()?;
                timing.lap("resize");
                timing.finish();

                Ok(ImageExample { image, label })
            },
        )?;

        Ok(Self {
            batch_size: batch_size.get(),
            num_records,
            finished: false,
            example_rx,
            _threads: threads,
        })
    }
}
