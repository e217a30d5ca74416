//! Conversion of batches to tensors.

use crate::{
    common::*,
    pipeline::{BoxBatch, DigitBatch},
};
use ndarray::{ArrayBase, Data, Dimension};
use tch::Tensor;

/// The tensors of a digit batch. Images are in `[batch, channels, height, width]` layout.
#[derive(Debug)]
pub struct DigitBatchTensors {
    pub images: Tensor,
    pub length_labels: Tensor,
    pub numbers_labels: Tensor,
}

/// The tensors of a box batch. Images are in `[batch, channels, height, width]` layout.
#[derive(Debug)]
pub struct BoxBatchTensors {
    pub images: Tensor,
    pub bboxes: Tensor,
}

impl TryFrom<&DigitBatch> for DigitBatchTensors {
    type Error = anyhow::Error;

    fn try_from(from: &DigitBatch) -> Result<Self, Self::Error> {
        Ok(Self {
            images: to_tensor(&from.images)?.permute(&[0, 3, 1, 2]),
            length_labels: to_tensor(&from.length_labels)?,
            numbers_labels: to_tensor(&from.numbers_labels)?,
        })
    }
}

impl TryFrom<&BoxBatch> for BoxBatchTensors {
    type Error = anyhow::Error;

    fn try_from(from: &BoxBatch) -> Result<Self, Self::Error> {
        Ok(Self {
            images: to_tensor(&from.images)?.permute(&[0, 3, 1, 2]),
            bboxes: to_tensor(&from.bboxes)?,
        })
    }
}

/// Copy an array into a CPU tensor of the same shape.
pub fn to_tensor<S, D>(array: &ArrayBase<S, D>) -> Result<Tensor>
where
    S: Data<Elem = f32>,
    D: Dimension,
{
    let shape: Vec<i64> = array
        .shape()
        .iter()
        .map(|&size| i64::try_from(size))
        .try_collect()?;
    let array = array.as_standard_layout();
    let values = array
        .as_slice()
        .ok_or_else(|| format_err!("the array is not contiguous"))?;
    Ok(Tensor::of_slice(values).view(shape.as_slice()))
}
