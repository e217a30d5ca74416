//! The `digitStruct` annotation hierarchy of the SVHN dataset.
//!
//! The hierarchy consists of a reference table and a `digitStruct` group
//! with `name` and `bbox` columns. Each column cell refers to an object in
//! the table. A name object is a column of character codes. A bbox object
//! is a group of `label`, `top`, `left`, `width` and `height` columns,
//! whose cells are either inline values, or references to single-value
//! objects when the image has more than one digit.
//!
//! The hierarchy is read from MATLAB v7.3 files, which are HDF5 containers,
//! with the `with-hdf5` feature. Any other file is read as a JSON rendering
//! of the same hierarchy, where a reference cell is `{ "$ref": id }`.

use super::{Metadata, MetadataBuilder, MetadataSource};
use crate::{
    common::*,
    config::{BoxMerge, DigitStructConfig},
};

pub(crate) const BBOX_ATTRIBUTES: [&str; 5] = ["label", "top", "left", "width", "height"];
const PROGRESS_INTERVAL: usize = 1000;
const HDF5_SIGNATURE: &[u8] = b"\x89HDF\r\n\x1a\n";
/// Offsets where the HDF5 superblock may start. MATLAB puts a 512-byte
/// header before it.
const HDF5_SIGNATURE_OFFSETS: [usize; 4] = [0, 512, 1024, 2048];

/// A matrix cell, holding either a value or a reference to another object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Inline(f64),
    Reference(ObjectRef),
}

/// The reference to an object in the reference table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    #[serde(rename = "$ref")]
    pub id: String,
}

/// An object in the reference table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Dataset(Vec<Vec<Cell>>),
    Group(IndexMap<String, Vec<Vec<Cell>>>),
}

/// The `digitStruct` group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigitStructGroup {
    pub name: Vec<Vec<Cell>>,
    pub bbox: Vec<Vec<Cell>>,
}

/// The annotation file content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigitStructFile {
    #[serde(rename = "#refs#")]
    pub refs: HashMap<String, Node>,
    #[serde(rename = "digitStruct")]
    pub digit_struct: DigitStructGroup,
}

/// The annotation of one image.
#[derive(Debug, Clone, PartialEq)]
pub struct DigitRecord {
    pub filename: String,
    /// Digit boxes in stored order.
    pub bboxes: Vec<DigitBox>,
}

impl DigitRecord {
    /// The number label built from the digit boxes.
    pub fn label(&self) -> String {
        self.bboxes.iter().map(|bbox| bbox.class.to_string()).collect()
    }

    /// The box of the whole number.
    pub fn bbox(&self, merge: BoxMerge) -> Option<LTWH<f64>> {
        match merge {
            BoxMerge::Union => {
                closure_of(self.bboxes.iter().map(|bbox| &bbox.rect)).map(LTWH::from)
            }
            BoxMerge::First => self.bboxes.first().map(|bbox| bbox.rect),
        }
    }
}

impl DigitStructFile {
    /// Open an annotation file, telling HDF5 containers from JSON by content.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = if is_hdf5(path)? {
            Self::open_hdf5(path)?
        } else {
            Self::open_json(path)?
        };
        ensure!(
            file.digit_struct.name.len() == file.digit_struct.bbox.len(),
            "the name column has {} rows, but the bbox column has {} rows",
            file.digit_struct.name.len(),
            file.digit_struct.bbox.len()
        );
        Ok(file)
    }

    pub fn open_json(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(
            fs::File::open(path)
                .with_context(|| format!("failed to open metadata file '{}'", path.display()))?,
        );
        let file = serde_json::from_reader(reader)
            .with_context(|| format!("failed to parse metadata file '{}'", path.display()))?;
        Ok(file)
    }

    #[cfg(not(feature = "with-hdf5"))]
    pub fn open_hdf5(path: impl AsRef<Path>) -> Result<Self> {
        bail!(
            "'{}' is an HDF5 file, which requires the 'with-hdf5' feature",
            path.as_ref().display()
        )
    }

    pub fn num_records(&self) -> usize {
        self.digit_struct.name.len()
    }

    /// Iterate over the records in stored order.
    pub fn records(&self) -> impl Iterator<Item = Result<DigitRecord>> + '_ {
        (0..self.num_records()).map(move |index| {
            self.record(index)
                .with_context(|| format!("malformed record at index {}", index))
        })
    }

    pub fn record(&self, index: usize) -> Result<DigitRecord> {
        let DigitStructGroup { name, bbox } = &self.digit_struct;
        let name_cell = first_cell(name, index)?;
        let bbox_cell = first_cell(bbox, index)?;

        let filename = match self.dereference(name_cell)? {
            Node::Dataset(codes) => decode_name(codes)?,
            Node::Group(_) => bail!("the name object must be a dataset"),
        };

        let attributes = match self.dereference(bbox_cell)? {
            Node::Group(attributes) => attributes,
            Node::Dataset(_) => bail!("the bbox object must be a group"),
        };
        let columns: Vec<_> = BBOX_ATTRIBUTES
            .iter()
            .map(|&attribute| {
                attributes
                    .get(attribute)
                    .ok_or_else(|| format_err!("the bbox group has no '{}' column", attribute))
            })
            .try_collect()?;
        let num_digits = columns[0].len();
        ensure!(
            columns.iter().all(|column| column.len() == num_digits),
            "bbox attribute columns of '{}' have different lengths",
            filename
        );
        ensure!(num_digits > 0, "'{}' has no digit boxes", filename);

        let bboxes: Vec<_> = (0..num_digits)
            .map(|row| -> Result<_> {
                let values: Vec<_> = columns
                    .iter()
                    .map(|column| self.value(first_cell(column, row)?))
                    .try_collect()?;
                let [label, top, left, width, height]: [f64; 5] = values
                    .try_into()
                    .map_err(|_| format_err!("expect {} attributes", BBOX_ATTRIBUTES.len()))?;

                Ok(Label {
                    rect: LTWH::try_from_ltwh([left, top, width, height])?,
                    class: DigitClass::from_annotation(label)?,
                })
            })
            .try_collect()?;

        Ok(DigitRecord { filename, bboxes })
    }

    fn dereference(&self, cell: &Cell) -> Result<&Node> {
        match cell {
            Cell::Reference(ObjectRef { id }) => self
                .refs
                .get(id)
                .ok_or_else(|| format_err!("dangling object reference '{}'", id)),
            Cell::Inline(value) => bail!("expect an object reference, but get value {}", value),
        }
    }

    /// Resolve a cell to a scalar with at most one dereference.
    fn value(&self, cell: &Cell) -> Result<f64> {
        match cell {
            Cell::Inline(value) => Ok(*value),
            Cell::Reference(_) => match self.dereference(cell)? {
                Node::Dataset(matrix) => match matrix.iter().flatten().next() {
                    Some(Cell::Inline(value)) => Ok(*value),
                    Some(Cell::Reference(_)) => bail!("nested object references are not allowed"),
                    None => bail!("the referenced dataset is empty"),
                },
                Node::Group(_) => bail!("expect a value dataset, but get a group"),
            },
        }
    }
}

/// Check the HDF5 format signature at the possible superblock offsets.
pub fn is_hdf5(path: &Path) -> Result<bool> {
    use std::io::Read as _;

    let max_offset = HDF5_SIGNATURE_OFFSETS[HDF5_SIGNATURE_OFFSETS.len() - 1];
    let mut header = vec![];
    fs::File::open(path)
        .with_context(|| format!("failed to open metadata file '{}'", path.display()))?
        .take((max_offset + HDF5_SIGNATURE.len()) as u64)
        .read_to_end(&mut header)?;

    let found = HDF5_SIGNATURE_OFFSETS
        .iter()
        .any(|&offset| header.get(offset..offset + HDF5_SIGNATURE.len()) == Some(HDF5_SIGNATURE));
    Ok(found)
}

fn first_cell(column: &[Vec<Cell>], row: usize) -> Result<&Cell> {
    column
        .get(row)
        .and_then(|cells| cells.first())
        .ok_or_else(|| format_err!("row {} is out of range or empty", row))
}

fn decode_name(codes: &[Vec<Cell>]) -> Result<String> {
    codes
        .iter()
        .flatten()
        .map(|cell| match *cell {
            Cell::Inline(code) => char::from_u32(code as u32)
                .filter(|_| code.fract() == 0.0 && code >= 0.0)
                .ok_or_else(|| format_err!("invalid character code {}", code)),
            Cell::Reference(_) => bail!("the name must consist of character codes"),
        })
        .collect()
}

/// The metadata adapter of `digitStruct` annotation files.
///
/// Records with more digits than `max_number_length` are dropped.
#[derive(Debug, Clone)]
pub struct DigitStructSource {
    config: DigitStructConfig,
}

impl DigitStructSource {
    pub fn new(config: DigitStructConfig) -> Self {
        Self { config }
    }
}

impl MetadataSource for DigitStructSource {
    fn load(&self) -> Result<Metadata> {
        let DigitStructConfig {
            ref metadata_file,
            ref data_dir,
            max_number_length,
            box_merge,
        } = self.config;
        let max_number_length = max_number_length.get();

        let file = DigitStructFile::open(metadata_file)?;
        let mut builder = MetadataBuilder::with_capacity(max_number_length, file.num_records())?;
        let mut dropped_count = 0;

        for (index, record) in file.records().enumerate() {
            let read_count = index + 1;
            let record = record?;
            let label = record.label();

            if label.chars().count() > max_number_length {
                info!(
                    "ignore data since label is too long: filename={}, label={}",
                    record.filename, label
                );
                dropped_count += 1;
                continue;
            }

            let bbox = record
                .bbox(box_merge)
                .ok_or_else(|| format_err!("'{}' has no digit boxes", record.filename))?;
            builder.push(data_dir.join(&record.filename), bbox, &label)?;

            if read_count % PROGRESS_INTERVAL == 0 {
                info!("read {} records", read_count);
            }
        }

        let metadata = builder.build()?;
        info!(
            "loaded {} records from '{}', {} dropped",
            metadata.len(),
            metadata_file.display(),
            dropped_count
        );
        Ok(metadata)
    }
}
