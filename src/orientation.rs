//! Crystal orientations and their averaging
//!
//! Voxel orientations are Bunge Euler angles (phi1, Phi, phi2), rotations
//! about z, then x, then z again. Averaging the angles directly breaks down
//! at the 0/2pi wrap and near Phi = 0, so grain averages are taken over unit
//! quaternions instead:
//!
//! 1. convert each voxel orientation to a quaternion
//! 2. flip it onto the same hemisphere as the grain's first quaternion, since
//!    q and -q are the same rotation
//! 3. sum, normalise, and convert back
//!
//! No crystal symmetry reduction is applied. Voxels of one grain are assumed
//! to be indexed in a consistent symmetric variant, which is what EBSD
//! cleanup software writes.

// standard library
use std::f64::consts::TAU;

// external crates
use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use serde::Serialize;

/// A triplet of Bunge Euler angles in degrees
///
/// Degrees are the convention for orientation providers, whereas voxel and
/// average data keep the radians read from file.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct EulerAngles {
    pub phi1: f64,
    pub phi: f64,
    pub phi2: f64,
}

impl EulerAngles {
    /// ```rust
    /// # use ebsd::orientation::EulerAngles;
    /// let angles = EulerAngles::from_radians([std::f64::consts::PI, 0.0, 0.0]);
    /// assert_eq!(angles.phi1, 180.0);
    /// ```
    pub fn from_radians(angles: [f64; 3]) -> Self {
        Self {
            phi1: angles[0].to_degrees(),
            phi: angles[1].to_degrees(),
            phi2: angles[2].to_degrees(),
        }
    }

    pub fn to_radians(&self) -> [f64; 3] {
        [
            self.phi1.to_radians(),
            self.phi.to_radians(),
            self.phi2.to_radians(),
        ]
    }
}

impl std::fmt::Display for EulerAngles {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "({:.3}, {:.3}, {:.3})", self.phi1, self.phi, self.phi2)
    }
}

/// Bunge angles in radians to a unit quaternion
pub fn to_quaternion(angles: [f64; 3]) -> UnitQuaternion<f64> {
    UnitQuaternion::from_axis_angle(&Vector3::z_axis(), angles[0])
        * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), angles[1])
        * UnitQuaternion::from_axis_angle(&Vector3::z_axis(), angles[2])
}

/// Unit quaternion to Bunge angles in radians
///
/// phi1 and phi2 are wrapped into [0, 2pi). When Phi is 0 or pi only the
/// sum (or difference) of phi1 and phi2 is defined, and phi2 is set to 0.
pub fn from_quaternion(q: &UnitQuaternion<f64>) -> [f64; 3] {
    let rotation = q.to_rotation_matrix();
    let m = rotation.matrix();
    let cos_phi = m[(2, 2)].clamp(-1.0, 1.0);
    let phi = cos_phi.acos();

    if 1.0 - cos_phi.abs() > 1e-12 {
        let phi1 = m[(0, 2)].atan2(-m[(1, 2)]);
        let phi2 = m[(2, 0)].atan2(m[(2, 1)]);
        [wrap(phi1), phi, wrap(phi2)]
    } else {
        [wrap(m[(1, 0)].atan2(m[(0, 0)])), phi, 0.0]
    }
}

fn wrap(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    if TAU - wrapped < 1e-12 {
        0.0
    } else {
        wrapped
    }
}

/// Running quaternion average of one grain's orientations
///
/// A grain made of a single voxel keeps that voxel's angles exactly.
#[derive(Debug, Clone)]
pub struct OrientationAverage {
    first: Option<[f64; 3]>,
    reference: UnitQuaternion<f64>,
    sum: Quaternion<f64>,
    count: usize,
}

impl Default for OrientationAverage {
    fn default() -> Self {
        Self {
            first: None,
            reference: UnitQuaternion::identity(),
            sum: Quaternion::new(0.0, 0.0, 0.0, 0.0),
            count: 0,
        }
    }
}

impl OrientationAverage {
    pub fn new() -> Self {
        Default::default()
    }

    /// Add one orientation, Bunge angles in radians
    pub fn add(&mut self, angles: [f64; 3]) {
        let q = to_quaternion(angles);
        if self.first.is_none() {
            self.first = Some(angles);
            self.reference = q;
        }

        let q = match q.coords.dot(&self.reference.coords) < 0.0 {
            true => -q.into_inner(),
            false => q.into_inner(),
        };
        self.sum += q;
        self.count += 1;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Mean orientation in radians, `None` if nothing was added
    pub fn mean(&self) -> Option<[f64; 3]> {
        let first = self.first?;
        if self.count == 1 {
            return Some(first);
        }
        match UnitQuaternion::try_new(self.sum, 1.0e-12) {
            Some(q) => Some(from_quaternion(&q)),
            None => Some(first),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::f64::consts::PI;

    fn same_rotation(a: [f64; 3], b: [f64; 3]) -> bool {
        to_quaternion(a).angle_to(&to_quaternion(b)) < 1e-9
    }

    #[rstest]
    #[case([0.3, 0.5, 1.2])]
    #[case([5.9, 2.8, 0.1])]
    #[case([1.0, PI / 2.0, 4.0])]
    fn quaternion_round_trip(#[case] angles: [f64; 3]) {
        let back = from_quaternion(&to_quaternion(angles));
        for (a, b) in angles.iter().zip(back.iter()) {
            assert!((a - b).abs() < 1e-9, "{angles:?} -> {back:?}");
        }
    }

    #[test]
    fn degenerate_phi() {
        // only phi1 + phi2 is defined when Phi = 0
        let back = from_quaternion(&to_quaternion([0.4, 0.0, 0.3]));
        assert!((back[0] - 0.7).abs() < 1e-9);
        assert_eq!(back[2], 0.0);
        assert!(same_rotation(back, [0.4, 0.0, 0.3]));
    }

    #[test]
    fn single_sample_is_exact() {
        let mut average = OrientationAverage::new();
        assert_eq!(average.mean(), None);
        average.add([0.123, 0.456, 0.789]);
        assert_eq!(average.mean(), Some([0.123, 0.456, 0.789]));
    }

    #[test]
    fn identical_samples() {
        let mut average = OrientationAverage::new();
        for _ in 0..5 {
            average.add([1.1, 0.7, 2.3]);
        }
        assert_eq!(average.count(), 5);
        assert!(same_rotation(average.mean().unwrap(), [1.1, 0.7, 2.3]));
    }

    #[test]
    fn average_across_the_wrap() {
        // +/- 0.1 about z on top of the same tilt average to no z rotation
        let mut average = OrientationAverage::new();
        average.add([0.1, 0.5, 0.0]);
        average.add([TAU - 0.1, 0.5, 0.0]);
        assert!(same_rotation(average.mean().unwrap(), [0.0, 0.5, 0.0]));
    }

    #[test]
    fn equivalent_quaternion_signs() {
        // phi1 + 2pi is the same rotation but flips the quaternion sign
        let mut average = OrientationAverage::new();
        average.add([0.2, 0.3, 0.4]);
        average.add([0.2 + TAU, 0.3, 0.4]);
        assert!(same_rotation(average.mean().unwrap(), [0.2, 0.3, 0.4]));
    }

    #[test]
    fn degree_conversion() {
        let angles = EulerAngles::from_radians([PI / 2.0, PI / 4.0, 0.0]);
        assert!((angles.phi1 - 90.0).abs() < 1e-12);
        assert!((angles.phi - 45.0).abs() < 1e-12);
        let back = angles.to_radians();
        assert!((back[0] - PI / 2.0).abs() < 1e-12);
    }
}
