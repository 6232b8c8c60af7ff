//! Per-tensor eigen-decomposition
use nalgebra::{Matrix3, Vector3};
use ordered_float::OrderedFloat;

/// A single eigenvalue and its (real) eigenvector
pub type EigenPair = (f32, Vector3<f32>);

/// Solver for the eigenvalues and eigenvectors of a 3x3 real matrix
///
/// Implementations return the real parts of all three eigen-pairs, with each
/// eigenvalue paired with its own eigenvector.  The order of the returned
/// pairs is unspecified; [`decompose`] sorts them.
pub trait EigenSolver: Send + Sync {
    /// Solves for the three eigen-pairs of `m`
    fn solve(&self, m: &Matrix3<f32>) -> [EigenPair; 3];
}

/// Eigen-solver built on `nalgebra`
///
/// Symmetric matrices (the common case for physical tensors) go through a
/// symmetric eigen-solver, which returns orthonormal eigenvectors.  For other
/// matrices, eigenvalues are the real parts of the Schur spectrum, and each
/// eigenvector is the right singular vector of `A - λI` with the smallest
/// singular value.
///
/// When an eigenvalue is repeated in a non-symmetric matrix, its pairs may
/// share the same eigenvector.
#[derive(Copy, Clone, Debug, Default)]
pub struct NalgebraEigenSolver;

/// Relative asymmetry below which a matrix is treated as symmetric
const SYMMETRY_TOLERANCE: f32 = 1e-6;

impl EigenSolver for NalgebraEigenSolver {
    fn solve(&self, m: &Matrix3<f32>) -> [EigenPair; 3] {
        let asymmetry = (m - m.transpose()).amax();
        if asymmetry <= SYMMETRY_TOLERANCE * m.amax() {
            let eig = nalgebra::SymmetricEigen::new(*m);
            std::array::from_fn(|i| {
                (eig.eigenvalues[i], eig.eigenvectors.column(i).into_owned())
            })
        } else {
            let values = m.complex_eigenvalues();
            std::array::from_fn(|i| {
                let lambda = values[i].re;
                (lambda, null_vector(m, lambda))
            })
        }
    }
}

/// Returns the unit vector `v` minimizing `|(m - λI) v|`
fn null_vector(m: &Matrix3<f32>, lambda: f32) -> Vector3<f32> {
    let shifted = m - Matrix3::identity() * lambda;
    let svd = nalgebra::linalg::SVD::new(shifted, false, true);
    // Singular values are not guaranteed to be sorted
    let i = svd.singular_values.imin();
    match svd.v_t {
        Some(v_t) => v_t.row(i).transpose(),
        None => Vector3::zeros(),
    }
}

/// Decomposes a tensor into (major, intermediate, minor) eigen-pairs
///
/// The zero tensor is a sentinel and yields three `(0, [0, 0, 0])` pairs
/// without invoking the solver.  A tensor with any NaN or infinite entry
/// yields three `(NaN, [0, 0, 0])` pairs, also without the solver.
/// Otherwise, pairs are sorted by eigenvalue in descending order; the sort is
/// stable, but the order among exactly-equal eigenvalues depends on the
/// solver.
pub fn decompose<S: EigenSolver + ?Sized>(
    solver: &S,
    m: &Matrix3<f32>,
) -> [EigenPair; 3] {
    if *m == Matrix3::zeros() {
        return [(0.0, Vector3::zeros()); 3];
    }
    if !m.iter().all(|v| v.is_finite()) {
        return [(f32::NAN, Vector3::zeros()); 3];
    }
    let mut pairs = solver.solve(m);
    pairs.sort_by_key(|(v, _)| std::cmp::Reverse(OrderedFloat(*v)));
    pairs
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    /// Checks that `v` is `expected` or `-expected`
    fn assert_parallel(v: Vector3<f32>, expected: Vector3<f32>) {
        let d = v.dot(&expected).abs();
        assert_relative_eq!(d, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn zero_tensor_is_sentinel() {
        let out = decompose(&NalgebraEigenSolver, &Matrix3::zeros());
        for (v, e) in out {
            assert_eq!(v, 0.0);
            assert_eq!(e, Vector3::zeros());
        }
    }

    #[test]
    fn non_finite_tensor() {
        let mut m = Matrix3::identity();
        m[(0, 1)] = f32::NAN;
        for (v, e) in decompose(&NalgebraEigenSolver, &m) {
            assert!(v.is_nan());
            assert_eq!(e, Vector3::zeros());
        }
        let m = Matrix3::identity() * f32::NEG_INFINITY;
        assert!(decompose(&NalgebraEigenSolver, &m)[0].0.is_nan());
    }

    #[test]
    fn diagonal() {
        let m = Matrix3::from_diagonal(&Vector3::new(1.0, 3.0, 2.0));
        let [(l1, e1), (l2, e2), (l3, e3)] =
            decompose(&NalgebraEigenSolver, &m);
        assert_relative_eq!(l1, 3.0, epsilon = 1e-5);
        assert_relative_eq!(l2, 2.0, epsilon = 1e-5);
        assert_relative_eq!(l3, 1.0, epsilon = 1e-5);
        assert_parallel(e1, Vector3::y());
        assert_parallel(e2, Vector3::z());
        assert_parallel(e3, Vector3::x());
    }

    #[test]
    fn symmetric_off_diagonal() {
        // Eigenvalues are 3 (along [1, 1, 0]), 1 (along [1, -1, 0]) and
        // -2 (along z)
        let m = Matrix3::new(2.0, 1.0, 0.0, 1.0, 2.0, 0.0, 0.0, 0.0, -2.0);
        let [(l1, e1), (l2, e2), (l3, e3)] =
            decompose(&NalgebraEigenSolver, &m);
        assert_relative_eq!(l1, 3.0, epsilon = 1e-5);
        assert_relative_eq!(l2, 1.0, epsilon = 1e-5);
        assert_relative_eq!(l3, -2.0, epsilon = 1e-5);
        assert_parallel(e1, Vector3::new(1.0, 1.0, 0.0).normalize());
        assert_parallel(e2, Vector3::new(1.0, -1.0, 0.0).normalize());
        assert_parallel(e3, Vector3::z());
    }

    #[test]
    fn non_symmetric() {
        // Upper-triangular, so the eigenvalues are the diagonal
        let m = Matrix3::new(4.0, 1.0, 0.0, 0.0, 2.0, 1.0, 0.0, 0.0, 1.0);
        let pairs = decompose(&NalgebraEigenSolver, &m);
        let expected = [4.0, 2.0, 1.0];
        for ((l, e), x) in pairs.iter().zip(expected) {
            assert_relative_eq!(*l, x, epsilon = 1e-4);
            assert_relative_eq!(e.norm(), 1.0, epsilon = 1e-4);
            let residual = m * e - e * *l;
            assert!(residual.norm() < 1e-3, "residual too large: {residual}");
        }
    }

    #[test]
    fn repeated_spectrum() {
        let m = Matrix3::identity() * 2.0;
        let pairs = decompose(&NalgebraEigenSolver, &m);
        for (l, _) in pairs {
            assert_relative_eq!(l, 2.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn custom_solver_is_sorted() {
        struct Fixed;
        impl EigenSolver for Fixed {
            fn solve(&self, _m: &Matrix3<f32>) -> [EigenPair; 3] {
                [
                    (1.0, Vector3::x()),
                    (5.0, Vector3::y()),
                    (-3.0, Vector3::z()),
                ]
            }
        }
        let pairs = decompose(&Fixed, &Matrix3::identity());
        assert_eq!(pairs[0], (5.0, Vector3::y()));
        assert_eq!(pairs[1], (1.0, Vector3::x()));
        assert_eq!(pairs[2], (-3.0, Vector3::z()));
    }
}
