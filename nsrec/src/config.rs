//! Input pipeline configuration format.

use crate::{
    common::*,
    metadata::{DigitStructSource, MetadataSource, PickleSource},
    processor::BBoxFixer,
};

pub use metadata::*;
pub use pipeline::*;

mod metadata {
    use super::*;

    /// Metadata file options, selected by the file format.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(tag = "format")]
    pub enum MetadataConfig {
        /// The `digitStruct` annotation hierarchy of the SVHN dataset.
        DigitStruct(DigitStructConfig),
        /// The pickled dictionary of filenames, labels and boxes.
        Pickle(PickleConfig),
    }

    impl MetadataConfig {
        /// Build the metadata adapter for the configured format.
        pub fn source(&self) -> Box<dyn MetadataSource> {
            match self {
                Self::DigitStruct(config) => Box::new(DigitStructSource::new(config.clone())),
                Self::Pickle(config) => Box::new(PickleSource::new(config.clone())),
            }
        }

        pub fn max_number_length(&self) -> NonZeroUsize {
            match self {
                Self::DigitStruct(config) => config.max_number_length,
                Self::Pickle(config) => config.max_number_length,
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct DigitStructConfig {
        pub metadata_file: PathBuf,
        /// The directory that image file names are relative to.
        pub data_dir: PathBuf,
        pub max_number_length: NonZeroUsize,
        /// How digit boxes are merged into the box of the whole number.
        #[serde(default)]
        pub box_merge: BoxMerge,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct PickleConfig {
        pub metadata_file: PathBuf,
        /// The directory that image file names are relative to.
        pub data_dir: PathBuf,
        pub max_number_length: NonZeroUsize,
    }

    /// The method to derive the number box from digit boxes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub enum BoxMerge {
        /// The smallest rectangle enclosing all digit boxes.
        Union,
        /// The box of the leftmost stored digit.
        First,
    }

    impl Default for BoxMerge {
        fn default() -> Self {
            Self::Union
        }
    }
}

mod pipeline {
    use super::*;

    /// Batch pipeline options.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct PipelineConfig {
        pub batch_size: NonZeroUsize,
        /// The output image height in pixels.
        pub image_height: NonZeroUsize,
        /// The output image width in pixels.
        pub image_width: NonZeroUsize,
        #[serde(default = "default_num_preprocess_threads")]
        pub num_preprocess_threads: NonZeroUsize,
        #[serde(default)]
        pub channels: ImageChannels,
        /// Cycle through the records forever if set, otherwise make a single pass.
        #[serde(default = "default_is_training")]
        pub is_training: bool,
        /// Crop images to the record boxes before resizing if set.
        ///
        /// It defaults to the exact record box. Set it to `null` to feed
        /// whole images.
        #[serde(default = "default_crop")]
        pub crop: Option<CropConfig>,
        /// The capacity of each queue. It defaults to three batches.
        pub queue_capacity: Option<NonZeroUsize>,
    }

    impl PipelineConfig {
        pub fn new(batch_size: usize, image_height: usize, image_width: usize) -> Result<Self> {
            let non_zero = |value: usize, name: &str| {
                NonZeroUsize::new(value).ok_or_else(|| format_err!("{} must be positive", name))
            };

            Ok(Self {
                batch_size: non_zero(batch_size, "batch_size")?,
                image_height: non_zero(image_height, "image_height")?,
                image_width: non_zero(image_width, "image_width")?,
                num_preprocess_threads: default_num_preprocess_threads(),
                channels: ImageChannels::default(),
                is_training: default_is_training(),
                crop: default_crop(),
                queue_capacity: None,
            })
        }

        pub fn queue_capacity(&self) -> usize {
            self.queue_capacity
                .map(|capacity| capacity.get())
                .unwrap_or(self.batch_size.get() * 3)
        }

        pub fn image_size(&self) -> Result<HW<u32>> {
            let h = u32::try_from(self.image_height.get())?;
            let w = u32::try_from(self.image_width.get())?;
            HW::try_from_hw([h, w])
        }
    }

    /// The number of color channels of decoded images.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub enum ImageChannels {
        Gray,
        Rgb,
    }

    impl ImageChannels {
        pub fn count(&self) -> usize {
            match self {
                Self::Gray => 1,
                Self::Rgb => 3,
            }
        }
    }

    impl Default for ImageChannels {
        fn default() -> Self {
            Self::Gray
        }
    }

    /// Bounding box cropping options.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct CropConfig {
        /// The margin added on each side, in ratio of image size.
        #[serde(default = "default_expand_rate")]
        pub expand_rate: R64,
        /// The minimum acceptable span of the crop, in ratio of image size.
        #[serde(default = "default_accept_min_rate")]
        pub accept_min_rate: R64,
    }

    impl CropConfig {
        /// Crop to the record box without margins or fallback.
        pub fn tight() -> Self {
            Self {
                expand_rate: r64(0.0),
                accept_min_rate: r64(0.0),
            }
        }

        pub fn fixer(&self) -> Result<BBoxFixer> {
            BBoxFixer::new(self.expand_rate, self.accept_min_rate)
        }
    }

    impl Default for CropConfig {
        fn default() -> Self {
            Self {
                expand_rate: default_expand_rate(),
                accept_min_rate: default_accept_min_rate(),
            }
        }
    }

    fn default_num_preprocess_threads() -> NonZeroUsize {
        NonZeroUsize::new(1).unwrap()
    }

    fn default_is_training() -> bool {
        true
    }

    fn default_crop() -> Option<CropConfig> {
        Some(CropConfig::tight())
    }

    fn default_expand_rate() -> R64 {
        r64(0.1)
    }

    fn default_accept_min_rate() -> R64 {
        r64(0.05)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_config_defaults() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{ "batch_size": 8, "image_height": 64, "image_width": 32, "crop": {} }"#,
        )
        .unwrap();

        assert_eq!(config.num_preprocess_threads.get(), 1);
        assert_eq!(config.channels, ImageChannels::Gray);
        assert!(config.is_training);
        assert_eq!(config.queue_capacity(), 24);
        assert_eq!(config.image_size().unwrap().hw(), [64, 32]);

        let crop = config.crop.unwrap();
        assert_eq!(crop.expand_rate, r64(0.1));
        assert_eq!(crop.accept_min_rate, r64(0.05));
    }

    #[test]
    fn crop_defaults_to_record_box() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{ "batch_size": 8, "image_height": 64, "image_width": 32 }"#)
                .unwrap();
        assert_eq!(config.crop, Some(CropConfig::tight()));
        assert_eq!(
            PipelineConfig::new(8, 64, 32).unwrap().crop,
            Some(CropConfig::tight())
        );

        let config: PipelineConfig = serde_json::from_str(
            r#"{ "batch_size": 8, "image_height": 64, "image_width": 32, "crop": null }"#,
        )
        .unwrap();
        assert_eq!(config.crop, None);
    }

    #[test]
    fn metadata_config_tagged_by_format() {
        let config: MetadataConfig = serde_json::from_str(
            r#"{
                "format": "Pickle",
                "metadata_file": "metadata.pickle",
                "data_dir": "train",
                "max_number_length": 5
            }"#,
        )
        .unwrap();

        assert!(matches!(config, MetadataConfig::Pickle(_)));
        assert_eq!(config.max_number_length().get(), 5);

        let config: MetadataConfig = serde_json::from_str(
            r#"{
                "format": "DigitStruct",
                "metadata_file": "digitStruct.json",
                "data_dir": "train",
                "max_number_length": 5
            }"#,
        )
        .unwrap();

        match config {
            MetadataConfig::DigitStruct(config) => assert_eq!(config.box_merge, BoxMerge::Union),
            _ => unreachable!(),
        }
    }

    #[test]
    fn pipeline_config_rejects_zero() {
        assert!(PipelineConfig::new(0, 64, 64).is_err());
        assert!(PipelineConfig::new(8, 64, 64).is_ok());
    }
}
