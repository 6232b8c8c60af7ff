//! Value ranges used to map attributes onto colors and opacities
use crate::Error;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Observed extent of an attribute, plus a display range
///
/// `data_range` is the full `[min, max]` observed across all voxels.
/// `value_range` starts out equal to it and may be narrowed by the caller for
/// display mapping; the two are not linked after that.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DataMap {
    /// Observed `[min, max]` of the attribute
    pub data_range: [f64; 2],
    /// `[min, max]` used for display mapping
    pub value_range: [f64; 2],
}

impl DataMap {
    /// Builds a map whose data and value ranges are both `[min, max]`
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            data_range: [min, max],
            value_range: [min, max],
        }
    }

    /// Sets the display range, leaving the data range unchanged
    pub fn set_value_range(&mut self, min: f64, max: f64) {
        self.value_range = [min, max];
    }

    /// Maps a value into `[0, 1]` using the value range
    ///
    /// Values outside the range are clamped.
    pub fn normalize(&self, v: f64) -> f64 {
        let [lo, hi] = self.value_range;
        if v >= hi {
            1.0
        } else if v <= lo {
            0.0
        } else {
            (v - lo) / (hi - lo)
        }
    }

    /// Maps a value from `[0, 1]` back into the value range
    ///
    /// Inputs outside of `[0, 1]` are clamped.
    pub fn denormalize(&self, t: f64) -> f64 {
        let [lo, hi] = self.value_range;
        if t <= 0.0 {
            lo
        } else if t >= 1.0 {
            hi
        } else {
            lo + t * (hi - lo)
        }
    }
}

/// Computes `[min, max]` over a set of scalar values
pub fn scalar_range(values: &[f32]) -> Result<DataMap, Error> {
    if values.is_empty() {
        return Err(Error::EmptyField);
    }
    let (min, max) = values
        .iter()
        .fold((f64::MAX, f64::MIN), |(lo, hi), &v| {
            (lo.min(v as f64), hi.max(v as f64))
        });
    Ok(DataMap::new(min, max))
}

/// Computes a single `[min, max]` spanning every component of every vector
///
/// This is one range for the whole attribute, not one range per axis.
pub fn vector_range(values: &[Vector3<f32>]) -> Result<DataMap, Error> {
    if values.is_empty() {
        return Err(Error::EmptyField);
    }
    let (min, max) = values
        .iter()
        .fold((f64::MAX, f64::MIN), |(lo, hi), v| {
            (lo.min(v.min() as f64), hi.max(v.max() as f64))
        });
    Ok(DataMap::new(min, max))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn scalar() {
        let m = scalar_range(&[3.0, -1.5, 2.0]).unwrap();
        assert_eq!(m.data_range, [-1.5, 3.0]);
        assert_eq!(m.value_range, m.data_range);
        assert!(matches!(scalar_range(&[]), Err(Error::EmptyField)));
    }

    #[test]
    fn vector_collapses_components() {
        let m = vector_range(&[
            Vector3::new(0.5, -2.0, 0.0),
            Vector3::new(0.0, 1.0, 4.0),
        ])
        .unwrap();
        assert_eq!(m.data_range, [-2.0, 4.0]);
        assert!(matches!(vector_range(&[]), Err(Error::EmptyField)));
    }

    #[test]
    fn normalize() {
        let mut m = DataMap::new(-1.0, 3.0);
        assert_eq!(m.normalize(1.0), 0.5);
        assert_eq!(m.normalize(-5.0), 0.0);
        assert_eq!(m.normalize(5.0), 1.0);
        assert_eq!(m.denormalize(0.25), 0.0);
        assert_eq!(m.denormalize(2.0), 3.0);

        m.set_value_range(0.0, 1.0);
        assert_eq!(m.data_range, [-1.0, 3.0]);
        assert_eq!(m.normalize(0.5), 0.5);
    }
}
