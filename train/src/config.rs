//! Training program configuration format.

use crate::common::*;

/// The main training configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub metadata: MetadataConfig,
    pub pipeline: PipelineConfig,
    pub training: TrainingConfig,
}

impl Config {
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let text = std::fs::read_to_string(path)?;
        let config = json5::from_str(&text)?;
        Ok(config)
    }
}

/// Training loop options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// The directory where run directories are created.
    pub output_dir: PathBuf,
    #[serde(default)]
    pub task: Task,
    #[serde(default = "default_number_of_steps")]
    pub number_of_steps: NonZeroUsize,
    #[serde(default = "default_log_every_n_steps")]
    pub log_every_n_steps: NonZeroUsize,
}

/// The kind of batches fed to the training step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Task {
    /// Images with length and digit labels.
    Digits,
    /// Whole images with number boxes in ratio units.
    Boxes,
}

impl Default for Task {
    fn default() -> Self {
        Self::Digits
    }
}

fn default_number_of_steps() -> NonZeroUsize {
    NonZeroUsize::new(10000).unwrap()
}

fn default_log_every_n_steps() -> NonZeroUsize {
    NonZeroUsize::new(1).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use noisy_float::prelude::*;

    #[test]
    fn parse_json5_config() -> Result<()> {
        let config: Config = json5::from_str(
            r#"{
                // SVHN training split
                metadata: {
                    format: "DigitStruct",
                    metadata_file: "train/digitStruct.json",
                    data_dir: "train",
                    max_number_length: 5,
                    box_merge: "First",
                },
                pipeline: {
                    batch_size: 64,
                    image_height: 64,
                    image_width: 64,
                    num_preprocess_threads: 4,
                    channels: "Rgb",
                    crop: { expand_rate: 0.15 },
                },
                training: {
                    output_dir: "runs",
                },
            }"#,
        )?;

        assert!(matches!(config.metadata, MetadataConfig::DigitStruct(_)));
        assert_eq!(config.metadata.max_number_length().get(), 5);
        assert_eq!(config.pipeline.batch_size.get(), 64);
        assert_eq!(config.pipeline.num_preprocess_threads.get(), 4);
        assert!(config.pipeline.is_training);

        let crop = config.pipeline.crop.unwrap();
        assert_eq!(crop.expand_rate, r64(0.15));
        assert_eq!(crop.accept_min_rate, r64(0.05));

        assert_eq!(config.training.task, Task::Digits);
        assert_eq!(config.training.number_of_steps.get(), 10000);
        assert_eq!(config.training.log_every_n_steps.get(), 1);
        Ok(())
    }
}
