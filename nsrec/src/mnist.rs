//! In-memory image classification data, such as MNIST.
//!
//! The dataset is a sanity check input for models. It bypasses metadata
//! files and image decoding, and is fed through the same cyclic queues as
//! the SVHN pipelines.

use crate::{common::*, config::ImageChannels};

const IDX_IMAGES_MAGIC: u32 = 0x0000_0803;
const IDX_LABELS_MAGIC: u32 = 0x0000_0801;

/// The number of MNIST classes.
pub const NUM_MNIST_CLASSES: usize = 10;

/// Images with one-hot class labels, held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct InMemoryDataset {
    images: Array4<f32>,
    labels: Array2<f32>,
}

impl InMemoryDataset {
    /// Build from images of shape `[N, height, width, channels]` with values
    /// in `[0, 1]`, and one-hot labels of shape `[N, num_classes]`.
    pub fn new(images: Array4<f32>, labels: Array2<f32>) -> Result<Self> {
        let (num_images, height, width, channels) = images.dim();
        ensure!(
            num_images == labels.nrows(),
            "{} images do not match {} labels",
            num_images,
            labels.nrows()
        );
        ensure!(
            height > 0 && width > 0,
            "image size {}x{} is empty",
            height,
            width
        );
        ensure!(
            channels == 1 || channels == 3,
            "expect 1 or 3 channels, but get {}",
            channels
        );
        Ok(Self { images, labels })
    }

    /// Load MNIST from uncompressed IDX image and label files.
    ///
    /// Only the first `count` records are kept if `count` is given.
    pub fn open_mnist(
        images_file: impl AsRef<Path>,
        labels_file: impl AsRef<Path>,
        count: Option<usize>,
    ) -> Result<Self> {
        let images = read_idx_images(images_file)?;
        let labels = read_idx_labels(labels_file, NUM_MNIST_CLASSES)?;
        let dataset = Self::new(images, labels)?;

        let dataset = match count {
            Some(count) => dataset.take(count)?,
            None => dataset,
        };
        info!("loaded {} in-memory images", dataset.len());
        Ok(dataset)
    }

    /// Keep the first `count` records.
    pub fn take(self, count: usize) -> Result<Self> {
        ensure!(
            count <= self.len(),
            "cannot take {} records from a dataset of {} records",
            count,
            self.len()
        );
        let Self { images, labels } = self;
        Ok(Self {
            images: images.slice_move(ndarray::s![..count, .., .., ..]),
            labels: labels.slice_move(ndarray::s![..count, ..]),
        })
    }

    pub fn len(&self) -> usize {
        self.labels.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn num_classes(&self) -> usize {
        self.labels.ncols()
    }

    pub fn channels(&self) -> ImageChannels {
        match self.images.len_of(Axis(3)) {
            3 => ImageChannels::Rgb,
            _ => ImageChannels::Gray,
        }
    }

    /// Images of shape `[N, height, width, channels]`.
    pub fn images(&self) -> &Array4<f32> {
        &self.images
    }

    /// One-hot labels of shape `[N, num_classes]`.
    pub fn labels(&self) -> &Array2<f32> {
        &self.labels
    }
}

/// Read an IDX image file into an array of shape `[N, rows, cols, 1]` scaled to `[0, 1]`.
pub fn read_idx_images(path: impl AsRef<Path>) -> Result<Array4<f32>> {
    let path = path.as_ref();
    let (dims, data) = read_idx(path, IDX_IMAGES_MAGIC, 3)?;
    let values: Vec<f32> = data.into_iter().map(|value| value as f32 / 255.0).collect();
    let images = Array4::from_shape_vec((dims[0], dims[1], dims[2], 1), values)?;
    Ok(images)
}

/// Read an IDX label file into one-hot rows of shape `[N, num_classes]`.
pub fn read_idx_labels(path: impl AsRef<Path>, num_classes: usize) -> Result<Array2<f32>> {
    let path = path.as_ref();
    let (dims, data) = read_idx(path, IDX_LABELS_MAGIC, 1)?;
    let mut labels = Array2::zeros((dims[0], num_classes));

    for (index, &class) in data.iter().enumerate() {
        let class = class as usize;
        ensure!(
            class < num_classes,
            "label {} of record {} in '{}' is out of range",
            class,
            index,
            path.display()
        );
        labels[[index, class]] = 1.0;
    }
    Ok(labels)
}

/// Read the dimensions and the unsigned byte payload of an IDX file.
fn read_idx(path: &Path, magic: u32, num_dims: usize) -> Result<(Vec<usize>, Vec<u8>)> {
    let bytes =
        fs::read(path).with_context(|| format!("failed to read IDX file '{}'", path.display()))?;
    let header_len = 4 * (num_dims + 1);
    ensure!(
        bytes.len() >= header_len,
        "IDX file '{}' is truncated",
        path.display()
    );

    let words: Vec<u32> = bytes[..header_len]
        .chunks_exact(4)
        .map(|chunk| u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();
    ensure!(
        words[0] == magic,
        "IDX file '{}' has magic number {:#010x}, but expect {:#010x}",
        path.display(),
        words[0],
        magic
    );

    let dims: Vec<usize> = words[1..].iter().map(|&dim| dim as usize).collect();
    let payload = &bytes[header_len..];
    let expect_len: usize = dims.iter().product();
    ensure!(
        payload.len() == expect_len,
        "IDX file '{}' has {} bytes of data, but its dimensions {:?} require {}",
        path.display(),
        payload.len(),
        dims,
        expect_len
    );

    Ok((dims, payload.to_vec()))
}
