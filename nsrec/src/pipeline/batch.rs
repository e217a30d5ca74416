use super::Keyed;
use crate::common::*;
use ndarray::{stack, ArrayView3};

/// A batch assembled from a sequence of examples.
pub trait Batch
where
    Self: Sized + Send + 'static,
{
    type Example: Send + 'static;

    /// Stack examples in the given order. The sequence must not be empty.
    fn stack(examples: Vec<Keyed<Self::Example>>) -> Result<Self>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A preprocessed image with its labels.
#[derive(Debug, Clone, PartialEq)]
pub struct DigitExample {
    /// Image of shape `[height, width, channels]`.
    pub image: Array3<f32>,
    /// One-hot length label of shape `[max_number_length]`.
    pub length_label: Array1<f32>,
    /// One-hot digit labels of shape `[max_number_length, 11]`.
    pub numbers_label: Array2<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DigitBatch {
    /// Images of shape `[batch, height, width, channels]`.
    pub images: Array4<f32>,
    /// Length labels of shape `[batch, max_number_length]`.
    pub length_labels: Array2<f32>,
    /// Digit labels of shape `[batch, max_number_length, 11]`.
    pub numbers_labels: Array3<f32>,
    /// The record index of each row.
    pub indices: Vec<usize>,
}

impl Batch for DigitBatch {
    type Example = DigitExample;

    fn stack(examples: Vec<Keyed<Self::Example>>) -> Result<Self> {
        ensure!(!examples.is_empty(), "cannot stack an empty batch");

        let indices = examples.iter().map(|example| example.index).collect();
        let images: Vec<ArrayView3<f32>> = examples.iter().map(|ex| ex.value.image.view()).collect();
        let length_labels: Vec<_> = examples
            .iter()
            .map(|ex| ex.value.length_label.view())
            .collect();
        let numbers_labels: Vec<_> = examples
            .iter()
            .map(|ex| ex.value.numbers_label.view())
            .collect();

        Ok(Self {
            images: stack(Axis(0), &images)?,
            length_labels: stack(Axis(0), &length_labels)?,
            numbers_labels: stack(Axis(0), &numbers_labels)?,
            indices,
        })
    }

    fn len(&self) -> usize {
        self.indices.len()
    }
}

/// A resized image with its number box in ratio units.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxExample {
    /// Image of shape `[height, width, channels]`.
    pub image: Array3<f32>,
    /// The box as `[left, top, width, height]` over the original image size.
    pub bbox: [f32; 4],
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoxBatch {
    /// Images of shape `[batch, height, width, channels]`.
    pub images: Array4<f32>,
    /// Boxes of shape `[batch, 4]` in `[left, top, width, height]` order.
    pub bboxes: Array2<f32>,
    /// The record index of each row.
    pub indices: Vec<usize>,
}

impl Batch for BoxBatch {
    type Example = BoxExample;

    fn stack(examples: Vec<Keyed<Self::Example>>) -> Result<Self> {
        ensure!(!examples.is_empty(), "cannot stack an empty batch");

        let indices = examples.iter().map(|example| example.index).collect();
        let images: Vec<ArrayView3<f32>> = examples.iter().map(|ex| ex.value.image.view()).collect();
        let bboxes: Vec<f32> = examples
            .iter()
            .flat_map(|ex| ex.value.bbox)
            .collect();

        Ok(Self {
            images: stack(Axis(0), &images)?,
            bboxes: Array2::from_shape_vec((examples.len(), 4), bboxes)?,
            indices,
        })
    }

    fn len(&self) -> usize {
        self.indices.len()
    }
}

/// An in-memory image with its class label.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageExample {
    /// Image of shape `[height, width, channels]`.
    pub image: Array3<f32>,
    /// One-hot class label of shape `[num_classes]`.
    pub label: Array1<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageBatch {
    /// Images of shape `[batch, height, width, channels]`.
    pub images: Array4<f32>,
    /// Class labels of shape `[batch, num_classes]`.
    pub labels: Array2<f32>,
    /// The record index of each row.
    pub indices: Vec<usize>,
}

impl Batch for ImageBatch {
    type Example = ImageExample;

    fn stack(examples: Vec<Keyed<Self::Example>>) -> Result<Self> {
        ensure!(!examples.is_empty(), "cannot stack an empty batch");

        let indices = examples.iter().map(|example| example.index).collect();
        let images: Vec<_> = examples.iter().map(|ex| ex.value.image.view()).collect();
        let labels: Vec<_> = examples.iter().map(|ex| ex.value.label.view()).collect();

        Ok(Self {
            images: stack(Axis(0), &images)?,
            labels: stack(Axis(0), &labels)?,
            indices,
        })
    }

    fn len(&self) -> usize {
        self.indices.len()
    }
}
