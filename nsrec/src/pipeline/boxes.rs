use super::{
    queue::{spawn_coordinator, spawn_producer, spawn_workers, Threads},
    read_float_image, BatchPipeline, BoxBatch, BoxExample,
};
use crate::{
    common::*,
    config::PipelineConfig,
    metadata::MetadataSource,
    pipeline::{join_keys, Keyed},
    profiling::Timing,
};

impl BatchPipeline<BoxBatch> {
    /// Start a pipeline yielding whole images together with their number boxes.
    ///
    /// Images are resized without cropping. Boxes are expressed in ratio
    /// units of the original image size. The crop option is ignored.
    pub fn new<S>(source: &S, config: &PipelineConfig) -> Result<Self>
    where
        S: MetadataSource + ?Sized,
    {
        let PipelineConfig {
            batch_size,
            num_preprocess_threads,
            channels,
            is_training,
            ..
        } = *config;
        let image_size = config.image_size()?;
        let capacity = config.queue_capacity();

        let metadata = Arc::new(source.load()?);
        let num_records = metadata.len();
        ensure!(num_records > 0, "the metadata has no records");
        info!(
            "start box pipeline on {} records with {} workers",
            num_records, num_preprocess_threads
        );

        let mut threads = Threads::default();

        let filename_rx = {
            let metadata = metadata.clone();
            spawn_producer(
                &mut threads,
                "filename",
                num_records,
                is_training,
                capacity,
                move |index| metadata.filenames()[index].clone(),
            )?
        };
        let bbox_rx = {
            let metadata = metadata.clone();
            spawn_producer(
                &mut threads,
                "bbox",
                num_records,
                is_training,
                capacity,
                move |index| metadata.bboxes()[index],
            )?
        };

        let (work_tx, work_rx) = flume::bounded(capacity);
        let (example_tx, example_rx) = flume::bounded(capacity);

        spawn_coordinator(&mut threads, work_tx, example_tx.clone(), move || {
            let filename = filename_rx.recv().ok()?;
            let bbox = bbox_rx.recv().ok()?;
            let work = join_keys(&[filename.index, bbox.index])
                .map(|index| Keyed::new(index, (filename.value, bbox.value)));
            Some(work)
        })?;

        spawn_workers(
            &mut threads,
            num_preprocess_threads.get(),
            work_rx,
            example_tx,
            move |_index, (filename, bbox): (PathBuf, LTWH<f64>)| {
                let mut timing = Timing::new("box_worker");

                let image = read_float_image(&filename, channels)?;
                let original_size = image
                    .size()?
                    .try_cast::<f64>()
                    .ok_or_else(|| format_err!("invalid image size"))?;
                timing.lap("decode");

                let image = image.resize(&image_size).into_array()?;
                timing.lap("resize");
                timing.finish();

                let [l, t, w, h] = bbox.to_ratio(&original_size).ltwh();
                Ok(BoxExample {
                    image,
                    bbox: [l as f32, t as f32, w as f32, h as f32],
                })
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
