//! Grid indexing and placement in physical space
use crate::Error;
use nalgebra::{Matrix3, Matrix4, Vector3};
use serde::{Deserialize, Serialize};

/// Maps between 3D grid coordinates and linear indices
///
/// Voxels are stored with `x` varying fastest, then `y`, then `z`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct IndexMapper {
    dims: [usize; 3],
}

impl IndexMapper {
    /// Builds a new mapper for a grid of the given size
    ///
    /// # Errors
    /// If the voxel count does not fit in a `usize`, returns
    /// [`Error::GridTooLarge`]
    pub fn new(dims: [usize; 3]) -> Result<Self, Error> {
        match dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d)) {
            Some(_) => Ok(Self { dims }),
            None => Err(Error::GridTooLarge(dims)),
        }
    }

    /// Returns the total number of voxels
    pub fn size(&self) -> usize {
        self.dims.iter().product()
    }

    /// Converts a grid coordinate to a linear index
    ///
    /// Returns `None` if the coordinate is outside the grid
    pub fn index(&self, pos: [usize; 3]) -> Option<usize> {
        if pos.iter().zip(&self.dims).any(|(p, d)| p >= d) {
            return None;
        }
        let [dx, dy, _] = self.dims;
        Some(pos[0] + dx * (pos[1] + dy * pos[2]))
    }

    /// Converts a linear index to a grid coordinate
    ///
    /// Returns `None` if the index is outside the grid
    pub fn position(&self, index: usize) -> Option<[usize; 3]> {
        if index >= self.size() {
            return None;
        }
        let [dx, dy, _] = self.dims;
        Some([index % dx, (index / dx) % dy, index / (dx * dy)])
    }
}

/// Returns the per-axis step between voxels in the unit cube
///
/// Axes with fewer than two voxels have no step and return `0`.
///
/// # Errors
/// If any dimension is zero, returns [`Error::DegenerateGrid`]
pub fn normalized_spacing(dims: [usize; 3]) -> Result<Vector3<f32>, Error> {
    if dims.contains(&0) {
        return Err(Error::DegenerateGrid(dims));
    }
    Ok(Vector3::from_fn(|i, _| {
        if dims[i] < 2 {
            0.0
        } else {
            1.0 / (dims[i] - 1) as f32
        }
    }))
}

/// Basis and offset placing a grid in physical space
///
/// Basis columns are the grid axes; their lengths are the physical extents of
/// the grid along each axis.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridTransform {
    /// Grid axes, stored as columns
    pub basis: Matrix3<f32>,
    /// Position of the grid origin
    pub offset: Vector3<f32>,
}

impl Default for GridTransform {
    fn default() -> Self {
        Self {
            basis: Matrix3::identity(),
            offset: Vector3::zeros(),
        }
    }
}

impl GridTransform {
    /// Builds a new transform from a basis and offset
    pub fn new(basis: Matrix3<f32>, offset: Vector3<f32>) -> Self {
        Self { basis, offset }
    }

    /// Returns the homogeneous model matrix
    ///
    /// The upper-left 3x3 block is the basis and the offset is the
    /// translation; the remaining homogeneous entries are `[0, 0, 0, 1]`.
    pub fn model_matrix(&self) -> Matrix4<f32> {
        let mut m = self.basis.to_homogeneous();
        m.fixed_view_mut::<3, 1>(0, 3).copy_from(&self.offset);
        m
    }

    /// Returns the physical length of each grid axis
    pub fn extents(&self) -> Vector3<f32> {
        Vector3::from_fn(|i, _| self.basis.column(i).norm())
    }

    /// Rescales each basis axis to the given length, keeping its direction
    ///
    /// A zero-length axis is replaced by the corresponding canonical axis.
    pub fn set_extents(&mut self, extents: Vector3<f32>) {
        for i in 0..3 {
            let axis = self.basis.column(i).into_owned();
            let dir = axis
                .try_normalize(f32::EPSILON)
                .unwrap_or_else(|| Vector3::ith(i, 1.0));
            self.basis.set_column(i, &(dir * extents[i]));
        }
    }
}

/// Axis-aligned bounds, as `[xmin, xmax, ymin, ymax, zmin, zmax]`
///
/// This is the layout used by common mesh and grid file formats.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds(pub [f64; 6]);

impl Bounds {
    /// Returns the size of the bounds along each axis
    pub fn extents(&self) -> Vector3<f32> {
        let b = &self.0;
        Vector3::new(b[1] - b[0], b[3] - b[2], b[5] - b[4]).cast()
    }

    /// Returns the minimum corner
    pub fn offset(&self) -> Vector3<f32> {
        let b = &self.0;
        Vector3::new(b[0], b[2], b[4]).cast()
    }

    /// Returns extents scaled so that the largest axis has length 1
    ///
    /// Empty bounds are returned unchanged.
    pub fn normalized_extents(&self) -> Vector3<f32> {
        let e = self.extents();
        let m = e.max();
        if m > 0.0 { e / m } else { e }
    }

    /// Builds a grid transform with an axis-aligned basis covering the bounds
    pub fn to_transform(&self, normalize: bool) -> GridTransform {
        let extents = if normalize {
            self.normalized_extents()
        } else {
            self.extents()
        };
        GridTransform::new(Matrix3::from_diagonal(&extents), self.offset())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector4;

    #[test]
    fn index_round_trip() {
        let m = IndexMapper::new([3, 4, 5]).unwrap();
        assert_eq!(m.size(), 60);
        assert_eq!(m.index([0, 0, 0]), Some(0));
        assert_eq!(m.index([1, 0, 0]), Some(1));
        assert_eq!(m.index([0, 1, 0]), Some(3));
        assert_eq!(m.index([0, 0, 1]), Some(12));
        assert_eq!(m.index([3, 0, 0]), None);
        for i in 0..m.size() {
            let p = m.position(i).unwrap();
            assert_eq!(m.index(p), Some(i));
        }
        assert_eq!(m.position(60), None);
    }

    #[test]
    fn degenerate_mapper() {
        let m = IndexMapper::new([0, 3, 3]).unwrap();
        assert_eq!(m.size(), 0);
        assert_eq!(m.position(0), None);
        assert_eq!(m.index([0, 0, 0]), None);

        // A zero axis keeps the product in range
        let m = IndexMapper::new([usize::MAX, 0, usize::MAX]).unwrap();
        assert_eq!(m.size(), 0);
    }

    #[test]
    fn oversized_mapper() {
        assert!(matches!(
            IndexMapper::new([usize::MAX, 2, 1]),
            Err(Error::GridTooLarge([usize::MAX, 2, 1]))
        ));
        let big = 1 << (usize::BITS / 2);
        assert!(matches!(
            IndexMapper::new([big, big, 2]),
            Err(Error::GridTooLarge(..))
        ));
    }

    #[test]
    fn spacing() {
        let s = normalized_spacing([3, 1, 5]).unwrap();
        assert_eq!(s, Vector3::new(0.5, 0.0, 0.25));
        assert!(matches!(
            normalized_spacing([3, 0, 5]),
            Err(Error::DegenerateGrid([3, 0, 5]))
        ));
    }

    #[test]
    fn model_matrix() {
        let t = GridTransform::new(
            Matrix3::from_diagonal(&Vector3::new(2.0, 3.0, 4.0)),
            Vector3::new(1.0, -1.0, 0.5),
        );
        let m = t.model_matrix();
        assert_eq!(m.row(3), Vector4::new(0.0, 0.0, 0.0, 1.0).transpose());
        assert_eq!(m.column(3), Vector4::new(1.0, -1.0, 0.5, 1.0));
        let p = m * Vector4::new(1.0, 1.0, 1.0, 1.0);
        assert_eq!(p, Vector4::new(3.0, 2.0, 4.5, 1.0));
    }

    #[test]
    fn extents() {
        let mut t = GridTransform::new(
            Matrix3::new(0.0, 2.0, 0.0, 2.0, 0.0, 0.0, 0.0, 0.0, 0.0),
            Vector3::zeros(),
        );
        assert_eq!(t.extents(), Vector3::new(2.0, 2.0, 0.0));
        t.set_extents(Vector3::new(1.0, 3.0, 5.0));
        assert_relative_eq!(t.extents(), Vector3::new(1.0, 3.0, 5.0));
        assert_relative_eq!(
            t.basis.column(0).into_owned(),
            Vector3::new(0.0, 1.0, 0.0)
        );
        assert_relative_eq!(
            t.basis.column(2).into_owned(),
            Vector3::new(0.0, 0.0, 5.0)
        );
    }

    #[test]
    fn bounds() {
        let b = Bounds([-1.0, 1.0, 0.0, 4.0, 2.0, 3.0]);
        assert_eq!(b.extents(), Vector3::new(2.0, 4.0, 1.0));
        assert_eq!(b.offset(), Vector3::new(-1.0, 0.0, 2.0));
        assert_eq!(b.normalized_extents(), Vector3::new(0.5, 1.0, 0.25));

        let t = b.to_transform(true);
        assert_eq!(t.extents(), Vector3::new(0.5, 1.0, 0.25));
        assert_eq!(t.offset, b.offset());
    }
}
