use crate::{DigitClass, NUM_DIGIT_CLASSES};
use anyhow::{bail, ensure, format_err, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayViewMut1, ArrayViewMut2};
use std::iter;

/// The one-hot encoded length and digits of a number label.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedLabel {
    /// One-hot vector of shape `[max_number_length]`.
    pub length: Array1<f32>,
    /// One-hot matrix of shape `[max_number_length, 11]`.
    pub digits: Array2<f32>,
}

/// Encodes digit strings into fixed-width one-hot tensors.
///
/// A label of `n` digits sets index `n - 1` of the length vector. Position
/// `i < n` of the digit matrix sets the digit index, and the remaining
/// positions set the blank index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelEncoder {
    max_number_length: usize,
}

impl LabelEncoder {
    pub fn new(max_number_length: usize) -> Result<Self> {
        ensure!(max_number_length > 0, "max_number_length must be positive");
        Ok(Self { max_number_length })
    }

    pub fn max_number_length(&self) -> usize {
        self.max_number_length
    }

    /// Encode a label. Characters beyond `max_number_length` are dropped.
    pub fn encode(&self, label: &str) -> Result<EncodedLabel> {
        let mut length = Array1::zeros(self.max_number_length);
        let mut digits = Array2::zeros((self.max_number_length, NUM_DIGIT_CLASSES));
        self.encode_into(label, length.view_mut(), digits.view_mut())?;
        Ok(EncodedLabel { length, digits })
    }

    /// Encode a label into zero-initialized rows of preallocated arrays.
    pub fn encode_into(
        &self,
        label: &str,
        mut length: ArrayViewMut1<f32>,
        mut digits: ArrayViewMut2<f32>,
    ) -> Result<()> {
        let max_len = self.max_number_length;
        ensure!(
            length.len() == max_len,
            "expect length label of size {}, but get {}",
            max_len,
            length.len()
        );
        ensure!(
            digits.dim() == (max_len, NUM_DIGIT_CLASSES),
            "expect digit label of shape {:?}, but get {:?}",
            (max_len, NUM_DIGIT_CLASSES),
            digits.dim()
        );

        let classes: Vec<_> = label
            .chars()
            .take(max_len)
            .map(DigitClass::from_char)
            .collect::<Result<_>>()?;
        ensure!(!classes.is_empty(), "the label must have at least one digit");

        length.fill(0.0);
        length[classes.len() - 1] = 1.0;

        digits.fill(0.0);
        classes
            .iter()
            .copied()
            .chain(iter::repeat(DigitClass::Blank))
            .take(max_len)
            .enumerate()
            .for_each(|(position, class)| {
                digits[[position, class.index()]] = 1.0;
            });

        Ok(())
    }

    /// Reconstruct the label string by taking argmax of each one-hot vector.
    pub fn decode(&self, length: ArrayView1<f32>, digits: ArrayView2<f32>) -> Result<String> {
        let max_len = self.max_number_length;
        ensure!(
            length.len() == max_len && digits.dim() == (max_len, NUM_DIGIT_CLASSES),
            "label shapes {:?} and {:?} do not match max_number_length {}",
            length.dim(),
            digits.dim(),
            max_len
        );

        let num_digits = argmax(length).ok_or_else(|| format_err!("empty length label"))? + 1;
        digits
            .outer_iter()
            .take(num_digits)
            .enumerate()
            .map(|(position, row)| {
                let index = argmax(row).ok_or_else(|| format_err!("empty digit label"))?;
                match DigitClass::from_index(index)?.to_char() {
                    Some(ch) => Ok(ch),
                    None => bail!(
                        "position {} is blank within the label length {}",
                        position,
                        num_digits
                    ),
                }
            })
            .collect()
    }
}

fn argmax(values: ArrayView1<f32>) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |max: Option<(usize, f32)>, (index, &value)| match max {
            Some((_, max_value)) if max_value >= value => max,
            _ => Some((index, value)),
        })
        .map(|(index, _)| index)
}
