use crate::common::*;

/// The uniform metadata shared by all adapters.
///
/// Index `i` of every array refers to the same record. The constructor
/// rejects arrays of different lengths, so the alignment holds for any
/// value of this type.
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    filenames: Vec<PathBuf>,
    bboxes: Vec<LTWH<f64>>,
    length_labels: Array2<f32>,
    numbers_labels: Array3<f32>,
}

impl Metadata {
    pub fn new(
        filenames: Vec<PathBuf>,
        bboxes: Vec<LTWH<f64>>,
        length_labels: Array2<f32>,
        numbers_labels: Array3<f32>,
    ) -> Result<Self> {
        let num_records = filenames.len();
        let (num_length_labels, max_number_length) = length_labels.dim();

        ensure!(
            bboxes.len() == num_records
                && num_length_labels == num_records
                && numbers_labels.len_of(Axis(0)) == num_records,
            "metadata arrays are not aligned: {} filenames, {} bboxes, {} length labels, {} numbers labels",
            num_records,
            bboxes.len(),
            num_length_labels,
            numbers_labels.len_of(Axis(0))
        );
        ensure!(max_number_length > 0, "max_number_length must be positive");
        ensure!(
            numbers_labels.dim() == (num_records, max_number_length, NUM_DIGIT_CLASSES),
            "expect numbers labels of shape {:?}, but get {:?}",
            (num_records, max_number_length, NUM_DIGIT_CLASSES),
            numbers_labels.dim()
        );

        Ok(Self {
            filenames,
            bboxes,
            length_labels,
            numbers_labels,
        })
    }

    pub fn len(&self) -> usize {
        self.filenames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filenames.is_empty()
    }

    pub fn max_number_length(&self) -> usize {
        self.length_labels.ncols()
    }

    pub fn filenames(&self) -> &[PathBuf] {
        &self.filenames
    }

    pub fn bboxes(&self) -> &[LTWH<f64>] {
        &self.bboxes
    }

    /// One-hot length labels of shape `[N, max_number_length]`.
    pub fn length_labels(&self) -> &Array2<f32> {
        &self.length_labels
    }

    /// One-hot digit labels of shape `[N, max_number_length, 11]`.
    pub fn numbers_labels(&self) -> &Array3<f32> {
        &self.numbers_labels
    }

    pub fn into_parts(self) -> (Vec<PathBuf>, Vec<LTWH<f64>>, Array2<f32>, Array3<f32>) {
        let Self {
            filenames,
            bboxes,
            length_labels,
            numbers_labels,
        } = self;
        (filenames, bboxes, length_labels, numbers_labels)
    }
}

/// Accumulates records into [Metadata].
#[derive(Debug, Clone)]
pub struct MetadataBuilder {
    encoder: LabelEncoder,
    filenames: Vec<PathBuf>,
    bboxes: Vec<LTWH<f64>>,
    length_labels: Vec<f32>,
    numbers_labels: Vec<f32>,
}

impl MetadataBuilder {
    pub fn new(max_number_length: usize) -> Result<Self> {
        Self::with_capacity(max_number_length, 0)
    }

    pub fn with_capacity(max_number_length: usize, capacity: usize) -> Result<Self> {
        let encoder = LabelEncoder::new(max_number_length)?;
        Ok(Self {
            encoder,
            filenames: Vec::with_capacity(capacity),
            bboxes: Vec::with_capacity(capacity),
            length_labels: Vec::with_capacity(capacity * max_number_length),
            numbers_labels: Vec::with_capacity(capacity * max_number_length * NUM_DIGIT_CLASSES),
        })
    }

    pub fn max_number_length(&self) -> usize {
        self.encoder.max_number_length()
    }

    pub fn len(&self) -> usize {
        self.filenames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filenames.is_empty()
    }

    /// Encode the label and append the record.
    ///
    /// The record is appended to all arrays or to none of them.
    pub fn push(&mut self, filename: PathBuf, bbox: LTWH<f64>, label: &str) -> Result<()> {
        let EncodedLabel { length, digits } = self
            .encoder
            .encode(label)
            .with_context(|| format!("invalid label '{}' for '{}'", label, filename.display()))?;

        self.filenames.push(filename);
        self.bboxes.push(bbox);
        self.length_labels.extend(length.iter());
        self.numbers_labels.extend(digits.iter());
        Ok(())
    }

    pub fn build(self) -> Result<Metadata> {
        let Self {
            encoder,
            filenames,
            bboxes,
            length_labels,
            numbers_labels,
        } = self;
        let num_records = filenames.len();
        let max_len = encoder.max_number_length();

        let length_labels = Array2::from_shape_vec((num_records, max_len), length_labels)?;
        let numbers_labels =
            Array3::from_shape_vec((num_records, max_len, NUM_DIGIT_CLASSES), numbers_labels)?;

        Metadata::new(filenames, bboxes, length_labels, numbers_labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox() -> LTWH<f64> {
        LTWH::try_from_ltwh([1.0, 2.0, 3.0, 4.0]).unwrap()
    }

    #[test]
    fn metadata_builder_keeps_alignment() {
        let mut builder = MetadataBuilder::new(3).unwrap();
        builder.push("a.png".into(), bbox(), "12").unwrap();
        assert!(builder.push("b.png".into(), bbox(), "x1").is_err());
        builder.push("c.png".into(), bbox(), "345").unwrap();

        let metadata = builder.build().unwrap();
        assert_eq!(metadata.len(), 2);
        assert_eq!(
            metadata.filenames(),
            &[PathBuf::from("a.png"), PathBuf::from("c.png")]
        );
        assert_eq!(metadata.bboxes().len(), 2);
        assert_eq!(metadata.length_labels().dim(), (2, 3));
        assert_eq!(metadata.numbers_labels().dim(), (2, 3, NUM_DIGIT_CLASSES));

        let encoder = LabelEncoder::new(3).unwrap();
        let decoded = encoder
            .decode(
                metadata.length_labels().row(1),
                metadata.numbers_labels().index_axis(Axis(0), 1),
            )
            .unwrap();
        assert_eq!(decoded, "345");
    }

    #[test]
    fn metadata_rejects_misaligned_arrays() {
        let result = Metadata::new(
            vec!["a.png".into(), "b.png".into()],
            vec![bbox()],
            Array2::zeros((2, 3)),
            Array3::zeros((2, 3, NUM_DIGIT_CLASSES)),
        );
        assert!(result.is_err());

        let result = Metadata::new(
            vec!["a.png".into()],
            vec![bbox()],
            Array2::zeros((1, 3)),
            Array3::zeros((1, 4, NUM_DIGIT_CLASSES)),
        );
        assert!(result.is_err());
    }
}
