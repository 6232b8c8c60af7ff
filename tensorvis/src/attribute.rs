//! Standard per-voxel attributes derived from a tensor field
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

/// One of the six derived eigen-attributes
///
/// Eigenvalues are ranked in descending order, so `Lambda1` is always the
/// largest eigenvalue at a voxel and `MajorEigenVector` is its eigenvector.
#[allow(missing_docs)]
#[derive(
    Copy,
    Clone,
    Debug,
    Hash,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Serialize,
    Deserialize,
    strum::EnumIter,
)]
pub enum AttributeKind {
    Lambda1,
    Lambda2,
    Lambda3,
    MajorEigenVector,
    IntermediateEigenVector,
    MinorEigenVector,
}

/// Element type stored in a metadata column
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ElementType {
    /// One `f32` per voxel
    Scalar,
    /// One 3-vector per voxel
    Vector,
}

impl AttributeKind {
    /// Returns the column name used to store this attribute
    pub const fn identifier(&self) -> &'static str {
        match self {
            AttributeKind::Lambda1 => "Lambda1",
            AttributeKind::Lambda2 => "Lambda2",
            AttributeKind::Lambda3 => "Lambda3",
            AttributeKind::MajorEigenVector => "Major Eigenvector",
            AttributeKind::IntermediateEigenVector => {
                "Intermediate Eigenvector"
            }
            AttributeKind::MinorEigenVector => "Minor Eigenvector",
        }
    }

    /// Looks up an attribute by its column name
    pub fn from_identifier(s: &str) -> Option<Self> {
        Self::iter().find(|k| k.identifier() == s)
    }

    /// Position in the eigenvalue ordering (0 = major, 2 = minor)
    pub const fn rank(&self) -> usize {
        match self {
            AttributeKind::Lambda1 | AttributeKind::MajorEigenVector => 0,
            AttributeKind::Lambda2
            | AttributeKind::IntermediateEigenVector => 1,
            AttributeKind::Lambda3 | AttributeKind::MinorEigenVector => 2,
        }
    }

    /// Returns the element type of this attribute's column
    pub const fn element_type(&self) -> ElementType {
        match self {
            AttributeKind::Lambda1
            | AttributeKind::Lambda2
            | AttributeKind::Lambda3 => ElementType::Scalar,
            _ => ElementType::Vector,
        }
    }

    /// Returns the eigenvalue attribute with the given rank
    ///
    /// # Panics
    /// If `rank >= 3`
    pub const fn eigenvalue(rank: usize) -> Self {
        match rank {
            0 => AttributeKind::Lambda1,
            1 => AttributeKind::Lambda2,
            2 => AttributeKind::Lambda3,
            _ => panic!("invalid eigenvalue rank"),
        }
    }

    /// Returns the eigenvector attribute with the given rank
    ///
    /// # Panics
    /// If `rank >= 3`
    pub const fn eigenvector(rank: usize) -> Self {
        match rank {
            0 => AttributeKind::MajorEigenVector,
            1 => AttributeKind::IntermediateEigenVector,
            2 => AttributeKind::MinorEigenVector,
            _ => panic!("invalid eigenvector rank"),
        }
    }
}

impl std::fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.identifier())
    }
}
