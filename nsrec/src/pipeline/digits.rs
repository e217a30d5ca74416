use super::{
    queue::{spawn_coordinator, spawn_producer, spawn_workers, Threads},
    read_float_image, BatchPipeline, DigitBatch, DigitExample,
};
use crate::{
    common::*,
    config::PipelineConfig,
    metadata::MetadataSource,
    pipeline::{join_keys, Keyed},
    profiling::Timing,
};

#[derive(Debug)]
struct DigitWork {
    filename: PathBuf,
    bbox: LTWH<f64>,
    length_label: Array1<f32>,
    numbers_label: Array2<f32>,
}

impl BatchPipeline<DigitBatch> {
    /// Start a pipeline yielding images together with their length and digit labels.
    ///
    /// Images are cropped to the fixed record boxes before resizing if the
    /// crop option is set.
    pub fn new<S>(source: &S, config: &PipelineConfig) -> Result<Self>
    where
        S: MetadataSource + ?Sized,
    {
        let PipelineConfig {
            batch_size,
            num_preprocess_threads,
            channels,
            is_training,
            ref crop,
            ..
        } = *config;
        let image_size = config.image_size()?;
        let capacity = config.queue_capacity();
        let fixer = crop.as_ref().map(|crop| crop.fixer()).transpose()?;

        let metadata = Arc::new(source.load()?);
        let num_records = metadata.len();
        ensure!(num_records > 0, "the metadata has no records");
        info!(
            "start digit pipeline on {} records with {} workers",
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
        let length_rx = {
            let metadata = metadata.clone();
            spawn_producer(
                &mut threads,
                "length_label",
                num_records,
                is_training,
                capacity,
                move |index| metadata.length_labels().row(index).to_owned(),
            )?
        };
        let numbers_rx = {
            let metadata = metadata.clone();
            spawn_producer(
                &mut threads,
                "numbers_label",
                num_records,
                is_training,
                capacity,
                move |index| metadata.numbers_labels().index_axis(Axis(0), index).to_owned(),
            )?
        };

        let (work_tx, work_rx) = flume::bounded(capacity);
        let (example_tx, example_rx) = flume::bounded(capacity);

        spawn_coordinator(&mut threads, work_tx, example_tx.clone(), move || {
            let filename = filename_rx.recv().ok()?;
            let bbox = bbox_rx.recv().ok()?;
            let length_label = length_rx.recv().ok()?;
            let numbers_label = numbers_rx.recv().ok()?;

            let keys = [filename.index, bbox.index, length_label.index, numbers_label.index];
            let work = join_keys(&keys).map(|index| {
                Keyed::new(
                    index,
                    DigitWork {
                        filename: filename.value,
                        bbox: bbox.value,
                        length_label: length_label.value,
                        numbers_label: numbers_label.value,
                    },
                )
            });
            Some(work)
        })?;

        spawn_workers(
            &mut threads,
            num_preprocess_threads.get(),
            work_rx,
            example_tx,
            move |_index, work: DigitWork| {
                let DigitWork {
                    filename,
                    bbox,
                    length_label,
                    numbers_label,
                } = work;
                let mut timing = Timing::new("digit_worker");

                let image = read_float_image(&filename, channels)?;
                timing.lap("decode");

                let image = match &fixer {
                    Some(fixer) => {
                        let region = fixer.fix_pixels(&image.size()?, &bbox)?;
                        image.crop(&region)?
                    }
                    None => image,
                };
                let image = image.resize(&image_size).into_array()?;
                timing.lap("crop & resize");
                timing.finish();

                Ok(DigitExample {
                    image,
                    length_label,
                    numbers_label,
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
