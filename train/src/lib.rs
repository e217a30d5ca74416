//! The training program of multi-digit number recognition.

pub mod common;
pub mod config;
pub mod step;
pub mod utils;

use crate::{
    common::*,
    config::{Config, Task, TrainingConfig},
    step::{BatchInspector, TrainingStep},
    utils::ThroughputMeter,
};

/// The outcome of a training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_dir: PathBuf,
    pub num_steps: usize,
    pub inspector: BatchInspector,
}

/// The entry of training program.
pub async fn start(config: Arc<Config>) -> Result<RunSummary> {
    let start_time = Local::now();
    let run_dir = config
        .training
        .output_dir
        .join(format!("{}", start_time.format(utils::FILE_STRFTIME)));

    // create dirs and save config
    {
        tokio::fs::create_dir_all(&run_dir)
            .await
            .with_context(|| format!("failed to create directory '{}'", run_dir.display()))?;
        let path = run_dir.join("config.json");
        let text = serde_json::to_string_pretty(&*config)?;
        tokio::fs::write(&path, text).await?;
    }
    info!("run directory '{}'", run_dir.display());

    // start the input pipeline and the training loop
    info!("loading metadata");
    let mut inspector = BatchInspector::new();
    let num_steps = match config.training.task {
        Task::Digits => {
            let pipeline = {
                let config = config.clone();
                tokio::task::spawn_blocking(move || {
                    let source = config.metadata.source();
                    DigitBatchPipeline::new(&*source, &config.pipeline)
                })
                .await??
            };
            training_loop(pipeline.into_stream(), &mut inspector, &config.training).await?
        }
        Task::Boxes => {
            let pipeline = {
                let config = config.clone();
                tokio::task::spawn_blocking(move || {
                    let source = config.metadata.source();
                    BoxBatchPipeline::new(&*source, &config.pipeline)
                })
                .await??
            };
            training_loop(pipeline.into_stream(), &mut inspector, &config.training).await?
        }
    };

    let summary = RunSummary {
        run_dir,
        num_steps,
        inspector,
    };
    let text = serde_json::to_string_pretty(&summary)?;
    tokio::fs::write(summary.run_dir.join("summary.json"), text).await?;
    info!(
        "finished {} steps on {} examples",
        summary.num_steps, summary.inspector.num_examples
    );

    Ok(summary)
}

async fn training_loop<B, S, T>(stream: S, trainer: &mut T, config: &TrainingConfig) -> Result<usize>
where
    B: Batch,
    S: Stream<Item = Result<B>>,
    T: TrainingStep<B>,
{
    let TrainingConfig {
        number_of_steps,
        log_every_n_steps,
        ..
    } = *config;
    let mut stream = Box::pin(stream);
    let mut meter = ThroughputMeter::default();
    let mut num_steps = 0;

    while num_steps < number_of_steps.get() {
        let batch = match stream
            .next()
            .instrument(trace_span!("recv_next_batch"))
            .await
        {
            Some(batch) => batch?,
            None => {
                info!("input exhausted after {} steps", num_steps);
                break;
            }
        };

        trainer.step(num_steps, &batch)?;
        meter.record_step(batch.len());
        num_steps += 1;

        if num_steps % log_every_n_steps.get() == 0 {
            info!("step {}\tbatch size {}", num_steps, batch.len());
            if let Some(throughput) = meter.measure() {
                info!(
                    "{:.2} steps/s\t{:.2} examples/s",
                    throughput.steps_per_sec, throughput.examples_per_sec
                );
            }
        }
    }

    Ok(num_steps)
}
