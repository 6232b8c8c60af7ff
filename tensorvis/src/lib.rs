//! Tensorvis is a library for dense 3D tensor fields and the per-voxel
//! attributes derived from them.
//!
//! A **tensor field** is a structured grid where every voxel holds a
//! second-order tensor (a 3x3 real matrix), e.g. a stress or diffusion tensor
//! sampled over a volume.  Visualizations rarely draw the tensors directly;
//! instead, they map derived quantities (eigenvalues and eigenvectors) onto
//! glyphs, colors, and opacities.
//!
//! # Building a field
//! A [`TensorField3D`] is built from grid dimensions and a tensor array, laid
//! out with `x` varying fastest, then `y`, then `z`:
//! ```
//! use nalgebra::Matrix3;
//! use tensorvis::TensorField3D;
//!
//! let tensors = vec![Matrix3::identity(); 8];
//! let field = TensorField3D::new([2, 2, 2], tensors)?;
//! assert_eq!(field.size(), 8);
//! # Ok::<(), tensorvis::Error>(())
//! ```
//!
//! Construction eagerly derives six attributes per voxel (see
//! [`AttributeKind`]): the three eigenvalues, sorted in descending order, and
//! their eigenvectors.  The decomposition runs in parallel across voxels using
//! [`rayon`]; [`DeriveConfig`] selects the thread pool and carries a
//! [`CancelToken`].  The eigen-solver itself sits behind the [`EigenSolver`]
//! trait, with [`NalgebraEigenSolver`] as the default.
//!
//! # Sharing
//! Tensors and derived attributes live in reference-counted, immutable
//! snapshots.  Cloning a field is cheap and shares storage;
//! [`TensorField3D::deep_copy`] forks it.  Replacing tensors or metadata swaps
//! the snapshot wholesale, so readers of an existing field never observe a
//! partial update.
//!
//! # Value ranges
//! Downstream color and opacity mapping needs the extent of each attribute.
//! These are computed on demand by [`TensorField3D::compute_data_maps`] and
//! stored as [`DataMap`] values.
//! ```
//! use nalgebra::{Matrix3, Vector3};
//! use tensorvis::{AttributeKind, TensorField3D};
//!
//! let tensors = vec![
//!     Matrix3::from_diagonal(&Vector3::new(3.0, 2.0, 1.0)),
//!     Matrix3::from_diagonal(&Vector3::new(6.0, 4.0, 2.0)),
//! ];
//! let mut field = TensorField3D::new([2, 1, 1], tensors)?;
//! field.compute_data_maps()?;
//!
//! let r = field.attribute_range(AttributeKind::Lambda3);
//! assert!((r.data_range[0] - 1.0).abs() < 1e-5);
//! assert!((r.data_range[1] - 2.0).abs() < 1e-5);
//! # Ok::<(), tensorvis::Error>(())
//! ```
#![warn(missing_docs)]

pub mod attribute;
pub mod config;
pub mod eigen;
mod error;
pub mod field;
pub mod geometry;
pub mod metadata;
pub mod range;

pub use attribute::AttributeKind;
pub use config::{CancelToken, DeriveConfig, ThreadPool};
pub use eigen::{EigenSolver, NalgebraEigenSolver};
pub use error::Error;
pub use field::{FieldSnapshot, TensorField3D};
pub use metadata::MetaData;
pub use range::DataMap;
