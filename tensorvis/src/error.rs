//! Module containing the universal error type
use crate::attribute::AttributeKind;
use thiserror::Error;

/// Universal error type for tensor field operations
#[derive(Error, Debug)]
pub enum Error {
    /// Tensor array length does not match the product of the dimensions
    #[error("tensor count ({1}) does not match dimension product ({0})")]
    DimensionMismatch(usize, usize),

    /// The product of the grid dimensions does not fit in a `usize`
    #[error("grid dimensions {0:?} overflow the voxel count")]
    GridTooLarge([usize; 3]),

    /// A zero-length axis was used in a spacing or position calculation
    #[error("grid has at least one zero-sized dimension: {0:?}")]
    DegenerateGrid([usize; 3]),

    /// Range computation was attempted over zero voxels
    #[error("cannot compute a value range over an empty field")]
    EmptyField,

    /// Metadata holds some, but not all, of the standard eigen-attributes
    #[error(
        "eigen-attribute set is inconsistent; present: {present:?}, \
         missing: {missing:?}"
    )]
    AttributeSetInconsistent {
        /// Attributes found in the metadata
        present: Vec<AttributeKind>,
        /// Attributes absent from the metadata
        missing: Vec<AttributeKind>,
    },

    /// A metadata column has the wrong number of entries
    #[error("column `{name}` has {actual} entries, expected {expected}")]
    ColumnLengthMismatch {
        /// Column name
        name: String,
        /// Voxel count of the field
        expected: usize,
        /// Length of the column
        actual: usize,
    },

    /// Linear index is outside the grid
    #[error("index ({0}) exceeds voxel count ({1})")]
    BadIndex(usize, usize),

    /// Binary mask length does not match the voxel count
    #[error("binary mask length ({1}) does not match voxel count ({0})")]
    MaskLengthMismatch(usize, usize),

    /// Attribute is not present in the metadata
    #[error("attribute `{0}` is not present in the metadata")]
    MissingAttribute(AttributeKind),

    /// Column exists, but holds a different element type
    #[error("column `{0}` has the wrong element type")]
    WrongColumnType(String),

    /// The operation was cancelled before completion
    #[error("operation was cancelled")]
    Cancelled,
}
