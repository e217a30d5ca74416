use super::{Metadata, MetadataBuilder, MetadataSource};
use crate::{common::*, config::PickleConfig};

/// The pickled metadata dictionary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickleMetadata {
    /// Image file names relative to the data directory.
    pub filenames: Vec<String>,
    pub labels: Vec<String>,
    /// Number boxes in `[left, top, width, height]` order.
    pub bboxes: Vec<[f64; 4]>,
}

impl PickleMetadata {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(
            fs::File::open(path)
                .with_context(|| format!("failed to open metadata file '{}'", path.display()))?,
        );
        let metadata: Self =
            serde_pickle::from_reader(reader, serde_pickle::DeOptions::new().decode_strings())
                .with_context(|| format!("failed to parse metadata file '{}'", path.display()))?;

        let Self {
            filenames,
            labels,
            bboxes,
        } = &metadata;
        ensure!(
            filenames.len() == labels.len() && filenames.len() == bboxes.len(),
            "the metadata has {} filenames, {} labels and {} bboxes",
            filenames.len(),
            labels.len(),
            bboxes.len()
        );

        Ok(metadata)
    }
}

/// The metadata adapter of pickled metadata dictionaries.
///
/// Labels longer than `max_number_length` are truncated by the label
/// encoder without notice.
#[derive(Debug, Clone)]
pub struct PickleSource {
    config: PickleConfig,
}

impl PickleSource {
    pub fn new(config: PickleConfig) -> Self {
        Self { config }
    }
}

impl MetadataSource for PickleSource {
    fn load(&self) -> Result<Metadata> {
        let PickleConfig {
            ref metadata_file,
            ref data_dir,
            max_number_length,
        } = self.config;

        let PickleMetadata {
            filenames,
            labels,
            bboxes,
        } = PickleMetadata::open(metadata_file)?;
        let mut builder = MetadataBuilder::with_capacity(max_number_length.get(), filenames.len())?;

        for (filename, label, bbox) in itertools::izip!(filenames, labels, bboxes) {
            let bbox = LTWH::try_from_ltwh(bbox)
                .with_context(|| format!("invalid bbox {:?} for '{}'", bbox, filename))?;
            builder.push(data_dir.join(filename), bbox, &label)?;
        }

        let metadata = builder.build()?;
        info!(
            "loaded {} records from '{}'",
            metadata.len(),
            metadata_file.display()
        );
        Ok(metadata)
    }
}
