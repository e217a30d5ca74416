//! The training step seam and the batch inspector.

use crate::common::*;

/// A single optimization step driven by the training loop.
///
/// The model and optimizer live behind this trait.
pub trait TrainingStep<B> {
    fn step(&mut self, step: usize, batch: &B) -> Result<()>;
}

/// A training step that validates batches and gathers label statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchInspector {
    pub num_batches: usize,
    pub num_examples: usize,
    /// Number of examples per number length, starting at length 1.
    pub length_histogram: Vec<usize>,
    /// Number of digits per class, the blank class excluded.
    pub digit_histogram: Vec<usize>,
    pub num_boxes: usize,
    /// Accumulated `[left, top, width, height]` box ratios.
    pub bbox_sum: [f64; 4],
}

impl BatchInspector {
    pub fn new() -> Self {
        Self::default()
    }

    /// The mean box in ratio units, if any box was seen.
    pub fn mean_bbox(&self) -> Option<[f64; 4]> {
        (self.num_boxes > 0).then(|| {
            let count = self.num_boxes as f64;
            self.bbox_sum.map(|sum| sum / count)
        })
    }

    fn check_images(images: &ndarray::Array4<f32>) -> Result<()> {
        ensure!(
            images.iter().all(|value| value.is_finite()),
            "images contain non-finite values"
        );
        Ok(())
    }
}

impl TrainingStep<DigitBatch> for BatchInspector {
    fn step(&mut self, step: usize, batch: &DigitBatch) -> Result<()> {
        let DigitBatch {
            images,
            length_labels,
            numbers_labels,
            ..
        } = batch;
        let batch_size = batch.len();
        let (_, max_len, num_classes) = numbers_labels.dim();

        ensure!(
            images.len_of(Axis(0)) == batch_size
                && length_labels.len_of(Axis(0)) == batch_size
                && numbers_labels.len_of(Axis(0)) == batch_size,
            "batch {} has inconsistent sizes",
            step
        );
        Self::check_images(images)?;

        if self.length_histogram.len() < max_len {
            self.length_histogram.resize(max_len, 0);
        }
        if self.digit_histogram.len() < num_classes - 1 {
            self.digit_histogram.resize(num_classes - 1, 0);
        }

        for (length_label, numbers_label) in length_labels
            .outer_iter()
            .zip(numbers_labels.outer_iter())
        {
            let length = one_hot_index(length_label.iter().copied())
                .ok_or_else(|| format_err!("batch {} has a malformed length label", step))?;
            self.length_histogram[length] += 1;

            for row in numbers_label.outer_iter().take(length + 1) {
                let class = one_hot_index(row.iter().copied())
                    .ok_or_else(|| format_err!("batch {} has a malformed digit label", step))?;
                ensure!(
                    class < num_classes - 1,
                    "batch {} has a blank digit within the number length",
                    step
                );
                self.digit_histogram[class] += 1;
            }
        }

        self.num_batches += 1;
        self.num_examples += batch_size;
        Ok(())
    }
}

impl TrainingStep<BoxBatch> for BatchInspector {
    fn step(&mut self, step: usize, batch: &BoxBatch) -> Result<()> {
        let BoxBatch { images, bboxes, .. } = batch;
        ensure!(
            images.len_of(Axis(0)) == batch.len() && bboxes.dim() == (batch.len(), 4),
            "batch {} has inconsistent sizes",
            step
        );
        Self::check_images(images)?;

        for bbox in bboxes.outer_iter() {
            ensure!(
                bbox.iter().all(|value| value.is_finite()),
                "batch {} has a non-finite box",
                step
            );
            self.bbox_sum
                .iter_mut()
                .zip(bbox.iter())
                .for_each(|(sum, &value)| *sum += value as f64);
        }
        self.num_boxes += batch.len();

        self.num_batches += 1;
        self.num_examples += batch.len();
        Ok(())
    }
}

/// Locate the hot position of a one-hot vector.
fn one_hot_index(values: impl Iterator<Item = f32>) -> Option<usize> {
    let mut hot = None;
    for (index, value) in values.enumerate() {
        if value == 1.0 {
            if hot.is_some() {
                return None;
            }
            hot = Some(index);
        } else if value != 0.0 {
            return None;
        }
    }
    hot
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{stack, Array2, Array4};
    use nsrec::label::{LabelEncoder, NUM_DIGIT_CLASSES};

    fn digit_batch(labels: &[&str]) -> DigitBatch {
        let encoder = LabelEncoder::new(3).unwrap();
        let encoded: Vec<_> = labels
            .iter()
            .map(|label| encoder.encode(label).unwrap())
            .collect();
        let lengths: Vec<_> = encoded.iter().map(|label| label.length.view()).collect();
        let digits: Vec<_> = encoded.iter().map(|label| label.digits.view()).collect();

        DigitBatch {
            images: Array4::zeros((labels.len(), 4, 4, 1)),
            length_labels: stack(Axis(0), &lengths).unwrap(),
            numbers_labels: stack(Axis(0), &digits).unwrap(),
            indices: (0..labels.len()).collect(),
        }
    }

    #[test]
    fn inspect_digit_batches() -> Result<()> {
        let mut inspector = BatchInspector::new();
        inspector.step(0, &digit_batch(&["12", "7", "300"]))?;
        inspector.step(1, &digit_batch(&["9"]))?;

        assert_eq!(inspector.num_batches, 2);
        assert_eq!(inspector.num_examples, 4);
        assert_eq!(inspector.length_histogram, [2, 1, 1]);
        assert_eq!(inspector.digit_histogram.len(), NUM_DIGIT_CLASSES - 1);
        assert_eq!(inspector.digit_histogram[0], 2);
        assert_eq!(inspector.digit_histogram[3], 1);
        assert_eq!(inspector.digit_histogram[9], 1);
        assert_eq!(inspector.mean_bbox(), None);
        Ok(())
    }

    #[test]
    fn reject_malformed_labels() {
        let mut batch = digit_batch(&["12"]);
        batch.length_labels[[0, 2]] = 1.0;
        assert!(BatchInspector::new().step(0, &batch).is_err());

        let mut batch = digit_batch(&["12"]);
        batch.images[[0, 1, 1, 0]] = f32::NAN;
        assert!(BatchInspector::new().step(0, &batch).is_err());
    }

    #[test]
    fn inspect_box_batches() -> Result<()> {
        let batch = BoxBatch {
            images: Array4::zeros((2, 4, 4, 3)),
            bboxes: Array2::from_shape_vec(
                (2, 4),
                vec![0.1, 0.2, 0.5, 0.5, 0.3, 0.2, 0.3, 0.5],
            )?,
            indices: vec![0, 1],
        };
        let mut inspector = BatchInspector::new();
        inspector.step(0, &batch)?;

        let mean = inspector.mean_bbox().unwrap();
        let expect = [0.2, 0.2, 0.4, 0.5];
        mean.iter()
            .zip(expect)
            .for_each(|(&actual, expect)| assert_abs_diff_eq!(actual, expect, epsilon = 1e-6));
        Ok(())
    }
}
