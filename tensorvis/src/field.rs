//! Dense 3D tensor field with derived eigen-attributes
use crate::{
    Error,
    attribute::AttributeKind,
    config::DeriveConfig,
    eigen::{EigenPair, EigenSolver, NalgebraEigenSolver, decompose},
    geometry::{GridTransform, IndexMapper, normalized_spacing},
    metadata::{AttributeState, MetaData},
    range::{DataMap, scalar_range, vector_range},
};
use log::debug;
use nalgebra::{Matrix3, Matrix4, Vector3};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A structured 3D grid holding one 3x3 tensor per voxel
///
/// Construction guarantees that the six standard eigen-attributes (see
/// [`AttributeKind`]) are present in the field's [`MetaData`], with one entry
/// per voxel in the same order as the tensor array.
///
/// Tensors and metadata are shared, immutable snapshots.  Cloning a field is
/// a shallow copy: both fields point at the same tensors and metadata, and
/// [`set_tensors`](Self::set_tensors) / [`set_metadata`](Self::set_metadata)
/// swap in a new snapshot for one field without affecting the other.  Use
/// [`deep_copy`](Self::deep_copy) to fork the underlying storage.
///
/// Value ranges are only populated by an explicit call to
/// [`compute_data_maps`](Self::compute_data_maps), and are not kept in sync
/// when tensors or metadata are replaced afterwards.
///
/// ```
/// use nalgebra::Matrix3;
/// use tensorvis::{AttributeKind, TensorField3D};
///
/// let tensors = vec![Matrix3::identity(), Matrix3::identity() * 2.0];
/// let mut field = TensorField3D::new([2, 1, 1], tensors)?;
/// field.compute_data_maps()?;
///
/// let major = field.major_eigenvalues();
/// assert!((major[0] - 1.0).abs() < 1e-5);
/// assert!((major[1] - 2.0).abs() < 1e-5);
///
/// let range = field.attribute_range(AttributeKind::Lambda1);
/// assert!((range.data_range[1] - 2.0).abs() < 1e-5);
/// # Ok::<(), tensorvis::Error>(())
/// ```
#[derive(Clone, Debug)]
pub struct TensorField3D {
    dimensions: [usize; 3],
    index_mapper: IndexMapper,
    transform: GridTransform,
    tensors: Arc<Vec<Matrix3<f32>>>,
    metadata: Arc<MetaData>,
    binary_mask: Arc<Vec<bool>>,
    eigenvalue_maps: [DataMap; 3],
    eigenvector_maps: [DataMap; 3],
}

impl TensorField3D {
    /// Builds a field that takes ownership of its tensors
    pub fn new(
        dimensions: [usize; 3],
        tensors: Vec<Matrix3<f32>>,
    ) -> Result<Self, Error> {
        Self::from_shared(dimensions, Arc::new(tensors))
    }

    /// Builds a field over a shared tensor array
    pub fn from_shared(
        dimensions: [usize; 3],
        tensors: Arc<Vec<Matrix3<f32>>>,
    ) -> Result<Self, Error> {
        Self::with_metadata(dimensions, tensors, Arc::new(MetaData::new()))
    }

    /// Builds a field over shared tensors and pre-existing metadata
    ///
    /// If the metadata already holds all six eigen-attributes, they are kept
    /// as-is; if it holds none, they are derived and added alongside any other
    /// columns.
    ///
    /// # Errors
    /// - [`Error::GridTooLarge`] if the product of `dimensions` overflows
    /// - [`Error::DimensionMismatch`] if the tensor count does not match the
    ///   product of `dimensions`
    /// - [`Error::ColumnLengthMismatch`] if any metadata column has the wrong
    ///   length
    /// - [`Error::WrongColumnType`] if a standard attribute column holds the
    ///   wrong element type
    /// - [`Error::AttributeSetInconsistent`] if the metadata holds some, but
    ///   not all, of the eigen-attributes
    pub fn with_metadata(
        dimensions: [usize; 3],
        tensors: Arc<Vec<Matrix3<f32>>>,
        metadata: Arc<MetaData>,
    ) -> Result<Self, Error> {
        Self::with_config(
            dimensions,
            tensors,
            metadata,
            &NalgebraEigenSolver,
            &DeriveConfig::default(),
        )
    }

    /// Builds a field with a custom eigen-solver and derivation settings
    ///
    /// Errors are the same as [`with_metadata`](Self::with_metadata), plus
    /// [`Error::Cancelled`] if the derivation pass was cancelled.
    pub fn with_config<S: EigenSolver + ?Sized>(
        dimensions: [usize; 3],
        tensors: Arc<Vec<Matrix3<f32>>>,
        metadata: Arc<MetaData>,
        solver: &S,
        config: &DeriveConfig,
    ) -> Result<Self, Error> {
        let index_mapper = IndexMapper::new(dimensions)?;
        let size = index_mapper.size();
        if tensors.len() != size {
            return Err(Error::DimensionMismatch(size, tensors.len()));
        }
        metadata.validate(size)?;

        let binary_mask: Arc<Vec<bool>> = Arc::new(
            tensors.iter().map(is_defined).collect(),
        );
        let mut out = Self {
            dimensions,
            index_mapper,
            transform: GridTransform::default(),
            tensors,
            metadata,
            binary_mask,
            eigenvalue_maps: Default::default(),
            eigenvector_maps: Default::default(),
        };
        out.initialize_default_metadata(solver, config)?;
        Ok(out)
    }

    /// Derives the six eigen-attributes, unless they are already present
    ///
    /// On success, the field's metadata is replaced by a new store holding the
    /// previous columns plus the derived attributes.  On failure (including
    /// cancellation), the field's metadata is left untouched.
    fn initialize_default_metadata<S: EigenSolver + ?Sized>(
        &mut self,
        solver: &S,
        config: &DeriveConfig,
    ) -> Result<(), Error> {
        match self.metadata.attribute_state() {
            AttributeState::Complete => return Ok(()),
            AttributeState::Partial { present, missing } => {
                return Err(Error::AttributeSetInconsistent {
                    present,
                    missing,
                });
            }
            AttributeState::Absent => (),
        }

        debug!(
            "deriving eigen-attributes for {} tensors {:?}",
            self.tensors.len(),
            self.dimensions
        );
        let pairs = derive_pairs(&self.tensors, solver, config)?;

        let n = pairs.len();
        let mut values: [Vec<f32>; 3] =
            std::array::from_fn(|_| Vec::with_capacity(n));
        let mut vectors: [Vec<Vector3<f32>>; 3] =
            std::array::from_fn(|_| Vec::with_capacity(n));
        for p in &pairs {
            for (rank, (lambda, vec)) in p.iter().enumerate() {
                values[rank].push(*lambda);
                vectors[rank].push(*vec);
            }
        }

        let mut metadata = self.metadata.as_ref().clone();
        for (rank, (v, e)) in values.into_iter().zip(vectors).enumerate() {
            metadata.add_if_not_present(
                AttributeKind::eigenvalue(rank).identifier(),
                v,
            );
            metadata.add_if_not_present(
                AttributeKind::eigenvector(rank).identifier(),
                e,
            );
        }
        self.metadata = Arc::new(metadata);
        Ok(())
    }

    /// Returns a copy of this field with independently-owned storage
    ///
    /// The copy's tensors, metadata, and mask will never observe changes made
    /// through the original.  Metadata is trusted as-is and not re-validated.
    pub fn deep_copy(&self) -> Self {
        Self {
            tensors: Arc::new(self.tensors.as_ref().clone()),
            metadata: Arc::new(self.metadata.deep_copy()),
            binary_mask: Arc::new(self.binary_mask.as_ref().clone()),
            ..self.clone()
        }
    }

    /// Returns the grid dimensions as `[width, height, depth]`
    pub fn dimensions(&self) -> [usize; 3] {
        self.dimensions
    }

    /// Returns the number of voxels
    pub fn size(&self) -> usize {
        self.tensors.len()
    }

    /// Returns the mapper between grid coordinates and linear indices
    pub fn index_mapper(&self) -> &IndexMapper {
        &self.index_mapper
    }

    /// Returns the shared tensor array
    pub fn tensors(&self) -> &Arc<Vec<Matrix3<f32>>> {
        &self.tensors
    }

    /// Returns the tensor at the given grid coordinate
    pub fn at(&self, pos: [usize; 3]) -> Option<&Matrix3<f32>> {
        self.index_mapper.index(pos).map(|i| &self.tensors[i])
    }

    /// Replaces the tensor array
    ///
    /// Metadata, mask, and value ranges are left unchanged.
    pub fn set_tensors(
        &mut self,
        tensors: Arc<Vec<Matrix3<f32>>>,
    ) -> Result<(), Error> {
        if tensors.len() != self.size() {
            return Err(Error::DimensionMismatch(self.size(), tensors.len()));
        }
        self.tensors = tensors;
        Ok(())
    }

    /// Returns the shared metadata store
    pub fn metadata(&self) -> &Arc<MetaData> {
        &self.metadata
    }

    /// Replaces the metadata store
    ///
    /// The new store must hold all six eigen-attributes, and every column must
    /// have one entry per voxel.  Value ranges are left unchanged.
    pub fn set_metadata(
        &mut self,
        metadata: Arc<MetaData>,
    ) -> Result<(), Error> {
        metadata.validate(self.size())?;
        match metadata.attribute_state() {
            AttributeState::Complete => (),
            AttributeState::Absent => {
                return Err(Error::MissingAttribute(AttributeKind::Lambda1));
            }
            AttributeState::Partial { present, missing } => {
                return Err(Error::AttributeSetInconsistent {
                    present,
                    missing,
                });
            }
        }
        self.metadata = metadata;
        Ok(())
    }

    /// Returns the per-voxel values of a scalar attribute
    ///
    /// Vector attributes return an empty slice.
    pub fn scalars(&self, kind: AttributeKind) -> &[f32] {
        // Present by construction
        self.metadata.scalars(kind).unwrap_or(&[])
    }

    /// Returns the per-voxel values of a vector attribute
    ///
    /// Scalar attributes return an empty slice.
    pub fn vectors(&self, kind: AttributeKind) -> &[Vector3<f32>] {
        self.metadata.vectors(kind).unwrap_or(&[])
    }

    /// Returns the largest eigenvalue at each voxel
    pub fn major_eigenvalues(&self) -> &[f32] {
        self.scalars(AttributeKind::Lambda1)
    }

    /// Returns the middle eigenvalue at each voxel
    pub fn intermediate_eigenvalues(&self) -> &[f32] {
        self.scalars(AttributeKind::Lambda2)
    }

    /// Returns the smallest eigenvalue at each voxel
    pub fn minor_eigenvalues(&self) -> &[f32] {
        self.scalars(AttributeKind::Lambda3)
    }

    /// Returns the eigenvector of the largest eigenvalue at each voxel
    pub fn major_eigenvectors(&self) -> &[Vector3<f32>] {
        self.vectors(AttributeKind::MajorEigenVector)
    }

    /// Returns the eigenvector of the middle eigenvalue at each voxel
    pub fn intermediate_eigenvectors(&self) -> &[Vector3<f32>] {
        self.vectors(AttributeKind::IntermediateEigenVector)
    }

    /// Returns the eigenvector of the smallest eigenvalue at each voxel
    pub fn minor_eigenvectors(&self) -> &[Vector3<f32>] {
        self.vectors(AttributeKind::MinorEigenVector)
    }

    /// Returns the per-voxel defined flags
    pub fn binary_mask(&self) -> &[bool] {
        &self.binary_mask
    }

    /// Replaces the per-voxel defined flags
    pub fn set_binary_mask(&mut self, mask: Vec<bool>) -> Result<(), Error> {
        if mask.len() != self.size() {
            return Err(Error::MaskLengthMismatch(self.size(), mask.len()));
        }
        self.binary_mask = Arc::new(mask);
        Ok(())
    }

    /// Returns the number of voxels flagged as defined
    pub fn num_defined_entries(&self) -> usize {
        self.binary_mask.iter().filter(|b| **b).count()
    }

    /// Returns the grid placement in physical space
    pub fn transform(&self) -> &GridTransform {
        &self.transform
    }

    /// Sets the grid placement in physical space
    pub fn set_transform(&mut self, transform: GridTransform) {
        self.transform = transform;
    }

    /// Sets the grid basis (axes as columns)
    pub fn set_basis(&mut self, basis: Matrix3<f32>) {
        self.transform.basis = basis;
    }

    /// Sets the grid origin
    pub fn set_offset(&mut self, offset: Vector3<f32>) {
        self.transform.offset = offset;
    }

    /// Returns the combined basis and offset as a homogeneous transform
    pub fn model_matrix(&self) -> Matrix4<f32> {
        self.transform.model_matrix()
    }

    /// Returns the physical size of the grid along each basis axis
    pub fn extents(&self) -> Vector3<f32> {
        self.transform.extents()
    }

    /// Rescales the basis so that each axis has the given physical size
    pub fn set_extents(&mut self, extents: Vector3<f32>) {
        self.transform.set_extents(extents)
    }

    /// Recomputes value ranges for all six eigen-attributes
    ///
    /// Each range's data and value range are both set to the observed
    /// `[min, max]`.  Eigenvector ranges span all three components of every
    /// vector.  Ranges are only updated if every attribute succeeds.
    ///
    /// # Errors
    /// If the field has no voxels, returns [`Error::EmptyField`]
    pub fn compute_data_maps(&mut self) -> Result<(), Error> {
        let mut values = [DataMap::default(); 3];
        let mut vectors = [DataMap::default(); 3];
        for rank in 0..3 {
            values[rank] =
                scalar_range(self.scalars(AttributeKind::eigenvalue(rank)))?;
            vectors[rank] =
                vector_range(self.vectors(AttributeKind::eigenvector(rank)))?;
        }
        self.eigenvalue_maps = values;
        self.eigenvector_maps = vectors;
        Ok(())
    }

    /// Returns ranges for (major, intermediate, minor) eigenvalues
    pub fn eigenvalue_data_maps(&self) -> &[DataMap; 3] {
        &self.eigenvalue_maps
    }

    /// Returns ranges for (major, intermediate, minor) eigenvectors
    pub fn eigenvector_data_maps(&self) -> &[DataMap; 3] {
        &self.eigenvector_maps
    }

    /// Returns the cached range for a single attribute
    pub fn attribute_range(&self, kind: AttributeKind) -> DataMap {
        *self.data_map(kind)
    }

    /// Narrows the display range of an attribute, keeping its data range
    pub fn set_value_range(&mut self, kind: AttributeKind, min: f64, max: f64) {
        self.data_map_mut(kind).set_value_range(min, max)
    }

    fn data_map(&self, kind: AttributeKind) -> &DataMap {
        match kind {
            AttributeKind::Lambda1
            | AttributeKind::Lambda2
            | AttributeKind::Lambda3 => &self.eigenvalue_maps[kind.rank()],
            _ => &self.eigenvector_maps[kind.rank()],
        }
    }

    fn data_map_mut(&mut self, kind: AttributeKind) -> &mut DataMap {
        match kind {
            AttributeKind::Lambda1
            | AttributeKind::Lambda2
            | AttributeKind::Lambda3 => &mut self.eigenvalue_maps[kind.rank()],
            _ => &mut self.eigenvector_maps[kind.rank()],
        }
    }

    /// Splits the tensors into three per-voxel vector volumes
    ///
    /// Volume `i` holds column `i` of each tensor, so for a tensor
    /// ```text
    ///   xx  xy  xz
    ///   yx  yy  yz
    ///   zx  zy  zz
    /// ```
    /// the first volume holds `[xx, yx, zx]`.
    pub fn column_volumes(&self) -> [Vec<Vector3<f32>>; 3] {
        std::array::from_fn(|i| {
            self.tensors
                .iter()
                .map(|t| t.column(i).into_owned())
                .collect()
        })
    }

    /// Returns the position of a voxel within the unit cube
    ///
    /// Axes with fewer than two voxels use `slice` as their coordinate.
    ///
    /// # Errors
    /// - [`Error::DegenerateGrid`] if any dimension is zero
    /// - [`Error::BadIndex`] if `index` is outside the grid
    pub fn normalized_volume_position(
        &self,
        index: usize,
        slice: f32,
    ) -> Result<Vector3<f32>, Error> {
        let spacing = normalized_spacing(self.dimensions)?;
        self.position_with_spacing(index, slice, &spacing)
    }

    /// Returns the unit-cube position of every voxel, in linear-index order
    ///
    /// # Errors
    /// If any dimension is zero, returns [`Error::DegenerateGrid`]
    pub fn normalized_positions(
        &self,
        slice: f32,
    ) -> Result<Vec<Vector3<f32>>, Error> {
        let spacing = normalized_spacing(self.dimensions)?;
        (0..self.size())
            .map(|i| self.position_with_spacing(i, slice, &spacing))
            .collect()
    }

    fn position_with_spacing(
        &self,
        index: usize,
        slice: f32,
        spacing: &Vector3<f32>,
    ) -> Result<Vector3<f32>, Error> {
        let pos = self
            .index_mapper
            .position(index)
            .ok_or(Error::BadIndex(index, self.size()))?;
        Ok(Vector3::from_fn(|i, _| {
            if self.dimensions[i] < 2 {
                slice
            } else {
                pos[i] as f32 * spacing[i]
            }
        }))
    }
}

/// Default mask value: the tensor is finite and not the zero sentinel
fn is_defined(t: &Matrix3<f32>) -> bool {
    *t != Matrix3::zeros() && t.iter().all(|v| v.is_finite())
}

/// Runs the per-voxel decomposition, in parallel if a pool is provided
///
/// Returns [`Error::Cancelled`] if the token fires before every voxel has been
/// processed; in that case no partial results are returned.
fn derive_pairs<S: EigenSolver + ?Sized>(
    tensors: &[Matrix3<f32>],
    solver: &S,
    config: &DeriveConfig,
) -> Result<Vec<[EigenPair; 3]>, Error> {
    use rayon::prelude::*;

    let f = |t: &Matrix3<f32>| {
        if config.cancel.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(decompose(solver, t))
        }
    };
    match config.threads {
        None => tensors.iter().map(f).collect(),
        Some(p) => p.run(|| tensors.par_iter().map(f).collect()),
    }
}

/// Plain-text summary table, one row per line
impl std::fmt::Display for TensorField3D {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        const RANKS: [&str; 3] = ["major", "intermediate", "minor"];
        let [w, h, d] = self.dimensions;
        writeln!(f, "{:<36}{}", "Type", "3D tensor field")?;
        writeln!(f, "{:<36}{}", "Number of tensors", self.size())?;
        writeln!(f, "{:<36}{w} x {h} x {d}", "Dimensions")?;
        for (name, m) in RANKS.iter().zip(&self.eigenvalue_maps) {
            let label = format!("Max {name} field eigenvalue");
            writeln!(f, "{label:<36}{}", m.value_range[1])?;
            let label = format!("Min {name} field eigenvalue");
            writeln!(f, "{label:<36}{}", m.value_range[0])?;
        }
        let e = self.extents();
        write!(f, "{:<36}[{}, {}, {}]", "Extents", e.x, e.y, e.z)
    }
}

/// Serializable snapshot of a [`TensorField3D`]
///
/// Cached value ranges are not part of the snapshot; converting back into a
/// field re-validates everything through the normal construction path.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldSnapshot {
    /// Grid dimensions
    pub dimensions: [usize; 3],
    /// Grid placement
    pub transform: GridTransform,
    /// Per-voxel tensors
    pub tensors: Arc<Vec<Matrix3<f32>>>,
    /// Derived attributes and any extra columns
    pub metadata: Arc<MetaData>,
    /// Per-voxel defined flags
    pub binary_mask: Arc<Vec<bool>>,
}

impl From<&TensorField3D> for FieldSnapshot {
    fn from(f: &TensorField3D) -> Self {
        Self {
            dimensions: f.dimensions,
            transform: f.transform,
            tensors: f.tensors.clone(),
            metadata: f.metadata.clone(),
            binary_mask: f.binary_mask.clone(),
        }
    }
}

impl TryFrom<FieldSnapshot> for TensorField3D {
    type Error = Error;
    fn try_from(s: FieldSnapshot) -> Result<Self, Error> {
        let mut f = Self::with_metadata(s.dimensions, s.tensors, s.metadata)?;
        f.set_transform(s.transform);
        f.set_binary_mask(s.binary_mask.as_ref().clone())?;
        Ok(f)
    }
}
