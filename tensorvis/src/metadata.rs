//! Column-oriented store for per-voxel derived attributes
//!
//! A [`MetaData`] is a map from column name to a column of per-voxel values.
//! Columns are reference-counted, so cloning a store is cheap and never copies
//! voxel data; use [`MetaData::deep_copy`] to fork the storage.
use crate::{
    Error,
    attribute::{AttributeKind, ElementType},
};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::Arc};
use strum::IntoEnumIterator;

/// A single column of per-voxel values
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Column {
    /// One scalar per voxel
    Scalar(Arc<Vec<f32>>),
    /// One 3-vector per voxel
    Vector(Arc<Vec<Vector3<f32>>>),
}

impl Column {
    /// Returns the number of entries in the column
    pub fn len(&self) -> usize {
        match self {
            Column::Scalar(v) => v.len(),
            Column::Vector(v) => v.len(),
        }
    }

    /// Checks whether the column is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the element type of this column
    pub fn element_type(&self) -> ElementType {
        match self {
            Column::Scalar(..) => ElementType::Scalar,
            Column::Vector(..) => ElementType::Vector,
        }
    }

    fn deep_copy(&self) -> Self {
        match self {
            Column::Scalar(v) => Column::Scalar(Arc::new(v.as_ref().clone())),
            Column::Vector(v) => Column::Vector(Arc::new(v.as_ref().clone())),
        }
    }
}

impl From<Vec<f32>> for Column {
    fn from(v: Vec<f32>) -> Self {
        Column::Scalar(Arc::new(v))
    }
}

impl From<Vec<Vector3<f32>>> for Column {
    fn from(v: Vec<Vector3<f32>>) -> Self {
        Column::Vector(Arc::new(v))
    }
}

/// Presence of the six standard eigen-attributes in a store
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AttributeState {
    /// All six attributes are present
    Complete,
    /// None of the six attributes are present
    Absent,
    /// Some attributes are present and some are missing
    Partial {
        /// Attributes found in the store
        present: Vec<AttributeKind>,
        /// Attributes absent from the store
        missing: Vec<AttributeKind>,
    },
}

/// Column store keyed by name
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaData {
    columns: BTreeMap<String, Column>,
}

impl MetaData {
    /// Builds a new, empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a store whose columns own independent copies of their data
    pub fn deep_copy(&self) -> Self {
        Self {
            columns: self
                .columns
                .iter()
                .map(|(k, c)| (k.clone(), c.deep_copy()))
                .collect(),
        }
    }

    /// Returns the number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Iterates over column names, in sorted order
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Iterates over `(name, column)` pairs, in sorted order
    pub fn columns(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.columns.iter().map(|(k, c)| (k.as_str(), c))
    }

    /// Checks whether a column with the given name exists
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Checks whether the given attribute is stored with the right type
    pub fn has(&self, kind: AttributeKind) -> bool {
        self.columns
            .get(kind.identifier())
            .is_some_and(|c| c.element_type() == kind.element_type())
    }

    /// Returns a column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    /// Inserts a column, replacing any previous column of the same name
    ///
    /// Returns the previous column, if one was present
    pub fn add_column<C: Into<Column>>(
        &mut self,
        name: &str,
        column: C,
    ) -> Option<Column> {
        self.columns.insert(name.to_owned(), column.into())
    }

    /// Inserts a column only if no column of that name is present
    ///
    /// Returns `true` if the column was inserted
    pub fn add_if_not_present<C: Into<Column>>(
        &mut self,
        name: &str,
        column: C,
    ) -> bool {
        if self.columns.contains_key(name) {
            false
        } else {
            self.columns.insert(name.to_owned(), column.into());
            true
        }
    }

    /// Removes a column, returning it if it was present
    pub fn drop_column(&mut self, name: &str) -> Option<Column> {
        self.columns.remove(name)
    }

    /// Returns the scalar values of a standard attribute
    pub fn scalars(&self, kind: AttributeKind) -> Result<&[f32], Error> {
        match self.columns.get(kind.identifier()) {
            Some(Column::Scalar(v)) => Ok(v),
            Some(Column::Vector(..)) => {
                Err(Error::WrongColumnType(kind.identifier().to_owned()))
            }
            None => Err(Error::MissingAttribute(kind)),
        }
    }

    /// Returns the vector values of a standard attribute
    pub fn vectors(
        &self,
        kind: AttributeKind,
    ) -> Result<&[Vector3<f32>], Error> {
        match self.columns.get(kind.identifier()) {
            Some(Column::Vector(v)) => Ok(v),
            Some(Column::Scalar(..)) => {
                Err(Error::WrongColumnType(kind.identifier().to_owned()))
            }
            None => Err(Error::MissingAttribute(kind)),
        }
    }

    /// Classifies the store by which standard attributes it holds
    ///
    /// Only column names are considered; see [`validate`](Self::validate) for
    /// element type checks.
    pub fn attribute_state(&self) -> AttributeState {
        let (present, missing): (Vec<_>, Vec<_>) = AttributeKind::iter()
            .partition(|k| self.has_column(k.identifier()));
        if missing.is_empty() {
            AttributeState::Complete
        } else if present.is_empty() {
            AttributeState::Absent
        } else {
            AttributeState::Partial { present, missing }
        }
    }

    /// Checks that every column has exactly `len` entries, and that columns
    /// named after a standard attribute hold that attribute's element type
    pub fn validate(&self, len: usize) -> Result<(), Error> {
        for k in AttributeKind::iter() {
            if let Some(c) = self.columns.get(k.identifier()) {
                if c.element_type() != k.element_type() {
                    return Err(Error::WrongColumnType(
                        k.identifier().to_owned(),
                    ));
                }
            }
        }
        for (name, c) in &self.columns {
            if c.len() != len {
                return Err(Error::ColumnLengthMismatch {
                    name: name.clone(),
                    expected: len,
                    actual: c.len(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn full_store(n: usize) -> MetaData {
        let mut m = MetaData::new();
        for k in AttributeKind::iter() {
            match k.element_type() {
                ElementType::Scalar => {
                    m.add_column(k.identifier(), vec![1.0f32; n]);
                }
                ElementType::Vector => {
                    m.add_column(k.identifier(), vec![Vector3::x(); n]);
                }
            }
        }
        m
    }

    #[test]
    fn attribute_state() {
        let mut m = MetaData::new();
        assert_eq!(m.attribute_state(), AttributeState::Absent);

        m.add_column("Trace", vec![0.0f32; 4]);
        assert_eq!(m.attribute_state(), AttributeState::Absent);

        m.add_column(AttributeKind::Lambda1.identifier(), vec![0.0f32; 4]);
        let AttributeState::Partial { present, missing } = m.attribute_state()
        else {
            panic!("expected a partial state");
        };
        assert_eq!(present, vec![AttributeKind::Lambda1]);
        assert_eq!(missing.len(), 5);

        let m = full_store(4);
        assert_eq!(m.attribute_state(), AttributeState::Complete);
    }

    #[test]
    fn wrong_type_is_rejected() {
        let mut m = full_store(2);
        m.add_column(
            AttributeKind::Lambda2.identifier(),
            vec![Vector3::y(); 2],
        );
        assert!(!m.has(AttributeKind::Lambda2));
        assert!(matches!(
            m.scalars(AttributeKind::Lambda2),
            Err(Error::WrongColumnType(..))
        ));
        assert_eq!(m.attribute_state(), AttributeState::Complete);
        assert!(matches!(m.validate(2), Err(Error::WrongColumnType(..))));
    }

    #[test]
    fn add_and_drop() {
        let mut m = MetaData::new();
        assert!(m.add_if_not_present("a", vec![1.0f32, 2.0]));
        assert!(!m.add_if_not_present("a", vec![3.0f32, 4.0]));
        assert_eq!(m.column("a"), Some(&Column::from(vec![1.0f32, 2.0])));

        let prev = m.add_column("a", vec![5.0f32, 6.0]);
        assert_eq!(prev, Some(Column::from(vec![1.0f32, 2.0])));

        assert!(m.drop_column("a").is_some());
        assert!(m.drop_column("a").is_none());
        assert_eq!(m.column_count(), 0);
    }

    #[test]
    fn lengths() {
        let mut m = full_store(3);
        assert!(m.validate(3).is_ok());
        m.add_column("short", vec![0.0f32; 2]);
        match m.validate(3) {
            Err(Error::ColumnLengthMismatch {
                name,
                expected,
                actual,
            }) => {
                assert_eq!(name, "short");
                assert_eq!(expected, 3);
                assert_eq!(actual, 2);
            }
            e => panic!("unexpected result {e:?}"),
        }
    }

    #[test]
    fn deep_copy_forks_storage() {
        let m = full_store(2);
        let shallow = m.clone();
        let deep = m.deep_copy();
        let name = AttributeKind::Lambda1.identifier();

        let (Some(Column::Scalar(a)), Some(Column::Scalar(b))) =
            (m.column(name), shallow.column(name))
        else {
            panic!("missing column");
        };
        assert!(Arc::ptr_eq(a, b));

        let Some(Column::Scalar(c)) = deep.column(name) else {
            panic!("missing column");
        };
        assert!(!Arc::ptr_eq(a, c));
        assert_eq!(a, c);
    }
}
