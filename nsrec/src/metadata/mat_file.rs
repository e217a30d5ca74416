//! Loading the `digitStruct` hierarchy from MATLAB v7.3 files.

use super::{Cell, DigitStructFile, DigitStructGroup, Node, ObjectRef};
use crate::common::*;
use hdf5::{Dataset, File, ObjectReference1, ReferencedObject};

impl DigitStructFile {
    /// Load the hierarchy from an HDF5 container.
    ///
    /// Object references are resolved eagerly. Each referenced object is
    /// stored in the reference table under the path of the cell pointing to it.
    pub fn open_hdf5(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("failed to open HDF5 file '{}'", path.display()))?;
        let group = file
            .group("digitStruct")
            .with_context(|| format!("'{}' has no 'digitStruct' group", path.display()))?;

        let mut loader = ObjectLoader {
            file: &file,
            refs: HashMap::new(),
        };
        let name = loader.load_matrix(&group.dataset("name")?, "digitStruct/name")?;
        let bbox = loader.load_matrix(&group.dataset("bbox")?, "digitStruct/bbox")?;
        debug!(
            "resolved {} objects from '{}'",
            loader.refs.len(),
            path.display()
        );

        Ok(Self {
            refs: loader.refs,
            digit_struct: DigitStructGroup { name, bbox },
        })
    }
}

struct ObjectLoader<'a> {
    file: &'a File,
    refs: HashMap<String, Node>,
}

impl ObjectLoader<'_> {
    /// Read a 2-D dataset of either numbers or object references.
    fn load_matrix(&mut self, dataset: &Dataset, path: &str) -> Result<Vec<Vec<Cell>>> {
        if !dataset.dtype()?.is::<ObjectReference1>() {
            let values = dataset
                .read_2d::<f64>()
                .with_context(|| format!("failed to read numbers at '{}'", path))?;
            let matrix = values
                .outer_iter()
                .map(|row| row.iter().map(|&value| Cell::Inline(value)).collect())
                .collect();
            return Ok(matrix);
        }

        let references = dataset
            .read_2d::<ObjectReference1>()
            .with_context(|| format!("failed to read references at '{}'", path))?;
        let mut matrix = Vec::with_capacity(references.nrows());

        for (row_index, row) in references.outer_iter().enumerate() {
            let mut cells = Vec::with_capacity(row.len());
            for (col_index, reference) in row.iter().enumerate() {
                let id = format!("{}[{},{}]", path, row_index, col_index);
                let node = self.load_object(reference, &id)?;
                self.refs.insert(id.clone(), node);
                cells.push(Cell::Reference(ObjectRef { id }));
            }
            matrix.push(cells);
        }

        Ok(matrix)
    }

    fn load_object(&mut self, reference: &ObjectReference1, path: &str) -> Result<Node> {
        let node = match self.file.dereference(reference)? {
            ReferencedObject::Dataset(dataset) => Node::Dataset(self.load_matrix(&dataset, path)?),
            ReferencedObject::Group(group) => {
                let mut columns = IndexMap::new();
                for member in group.member_names()? {
                    let dataset = group.dataset(&member)?;
                    let column = self.load_matrix(&dataset, &format!("{}/{}", path, member))?;
                    columns.insert(member, column);
                }
                Node::Group(columns)
            }
            _ => bail!("the object referred at '{}' is neither a dataset nor a group", path),
        };
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdf5::Group;

    fn write_numbers(group: &Group, name: &str, values: &[f64]) -> Result<()> {
        let dataset = group
            .new_dataset::<f64>()
            .shape((values.len(), 1))
            .create(name)?;
        dataset.write_raw(values)?;
        Ok(())
    }

    fn write_references(group: &Group, name: &str, references: &[ObjectReference1]) -> Result<()> {
        let dataset = group
            .new_dataset::<ObjectReference1>()
            .shape((references.len(), 1))
            .create(name)?;
        dataset.write_raw(references)?;
        Ok(())
    }

    /// `1.png` with an inline digit 5, and `2.png` with the referenced digits 1 and 10.
    fn write_mat_file(path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let refs = file.create_group("#refs#")?;

        let codes = |name: &str| name.chars().map(|ch| ch as u32 as f64).collect::<Vec<_>>();
        write_numbers(&refs, "n1", &codes("1.png"))?;
        write_numbers(&refs, "n2", &codes("2.png"))?;

        let b1 = refs.create_group("b1")?;
        let values = [
            ("label", 5.0),
            ("top", 7.0),
            ("left", 43.0),
            ("width", 19.0),
            ("height", 30.0),
        ];
        for (attribute, value) in values {
            write_numbers(&b1, attribute, &[value])?;
        }

        let b2 = refs.create_group("b2")?;
        let values = [
            ("label", [1.0, 10.0]),
            ("top", [5.0, 6.0]),
            ("left", [10.0, 20.0]),
            ("width", [9.0, 10.0]),
            ("height", [20.0, 21.0]),
        ];
        for (attribute, pair) in values {
            let mut references = vec![];
            for (index, value) in pair.iter().enumerate() {
                let name = format!("{}{}", attribute, index);
                write_numbers(&refs, &name, &[*value])?;
                references.push(file.reference::<ObjectReference1>(&format!("#refs#/{}", name))?);
            }
            write_references(&b2, attribute, &references)?;
        }

        let digit_struct = file.create_group("digitStruct")?;
        let names = [
            file.reference::<ObjectReference1>("#refs#/n1")?,
            file.reference::<ObjectReference1>("#refs#/n2")?,
        ];
        let bboxes = [
            file.reference::<ObjectReference1>("#refs#/b1")?,
            file.reference::<ObjectReference1>("#refs#/b2")?,
        ];
        write_references(&digit_struct, "name", &names)?;
        write_references(&digit_struct, "bbox", &bboxes)?;
        Ok(())
    }

    #[test]
    fn read_mat_file_records() -> Result<()> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("digitStruct.mat");
        write_mat_file(&path)?;

        let file = DigitStructFile::open(&path)?;
        let records: Vec<_> = file.records().try_collect()?;

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].filename, "1.png");
        assert_eq!(records[0].label(), "5");
        assert_eq!(records[1].filename, "2.png");
        assert_eq!(records[1].label(), "10");
        assert_eq!(
            records[1].bbox(crate::config::BoxMerge::Union).unwrap().ltwh(),
            [10.0, 5.0, 20.0, 22.0]
        );
        Ok(())
    }
}
