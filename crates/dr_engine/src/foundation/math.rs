//! Math utilities and types
//!
//! Provides the vector and matrix aliases shared by the coordinate, wire and
//! dead reckoning modules. Engine-side (local) quantities are `f32`, remote and
//! geodetic quantities are `f64`.
//!
//! Rotation matrices follow the row-vector convention used by the heading,
//! pitch, roll helpers below: a vector `v` is rotated as `v * M`, which is
//! [`pre_mult`] in this module.

pub use nalgebra::{Matrix3, Matrix4, Quaternion, Unit, UnitQuaternion, Vector2, Vector3};

/// 3D vector type for local (engine) space
pub type Vec3 = Vector3<f32>;

/// 2D double precision vector (lat/lon pairs, flat earth origins)
pub type Vec2d = Vector2<f64>;

/// 3D double precision vector (remote, geocentric, geodetic, UTM)
pub type Vec3d = Vector3<f64>;

/// 3x3 double precision matrix
pub type Mat3d = Matrix3<f64>;

/// 4x4 double precision matrix used for the origin rotation
pub type Mat4d = Matrix4<f64>;

/// Quaternion type for rotations
pub type Quat = UnitQuaternion<f32>;

/// Position plus heading/pitch/roll of an entity.
///
/// Rotation is stored as degrees in (heading, pitch, roll) order, which is what
/// the rest of the engine hands around.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Transform {
    /// Translation in local space
    pub translation: Vec3,

    /// Heading, pitch, roll in degrees
    pub rotation: Vec3,
}

impl Transform {
    /// Create a transform from translation and heading/pitch/roll
    pub const fn new(translation: Vec3, rotation: Vec3) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    /// Create a transform with only a translation
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            rotation: Vec3::zeros(),
        }
    }

    /// Rotation as a quaternion
    pub fn rotation_quat(&self) -> Quat {
        hpr_to_quat(&self.rotation)
    }

    /// Set the rotation from a quaternion
    pub fn set_rotation_quat(&mut self, rotation: &Quat) {
        self.rotation = quat_to_hpr(rotation);
    }
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f64 = std::f64::consts::PI;

    /// 2 * Pi
    pub const TAU: f64 = 2.0 * PI;

    /// Pi / 2
    pub const HALF_PI: f64 = PI * 0.5;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f64 = PI / 180.0;

    /// Radians to degrees conversion factor
    pub const RAD_TO_DEG: f64 = 180.0 / PI;
}

/// Math utility functions
pub mod utils {
    use super::constants;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f64) -> f64 {
        degrees * constants::DEG_TO_RAD
    }

    /// Convert radians to degrees
    pub fn rad_to_deg(radians: f64) -> f64 {
        radians * constants::RAD_TO_DEG
    }

    /// Linear interpolation
    pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
        a + (b - a) * t
    }

    /// `asin` that tolerates inputs slightly outside [-1, 1]
    pub fn safe_asin(value: f64) -> f64 {
        value.clamp(-1.0, 1.0).asin()
    }

    /// Replace NaN or infinite components with zero.
    ///
    /// Returns true when anything was replaced.
    pub fn zero_non_finite(values: &mut [f64]) -> bool {
        let mut replaced = false;
        for v in values.iter_mut() {
            if !v.is_finite() {
                *v = 0.0;
                replaced = true;
            }
        }
        replaced
    }
}

const HPR_EPSILON: f64 = 0.00001;

fn sin_cos_deg(angle: f64) -> (f64, f64) {
    if angle.abs() < HPR_EPSILON {
        (0.0, 1.0)
    } else {
        utils::deg_to_rad(angle).sin_cos()
    }
}

/// Build a rotation matrix from heading, pitch, roll in degrees.
///
/// Heading turns about +Z, pitch about +X, roll about +Y.
pub fn hpr_to_matrix(hpr: &Vec3d) -> Mat3d {
    let (sh, ch) = sin_cos_deg(hpr.x);
    let (sp, cp) = sin_cos_deg(hpr.y);
    let (sr, cr) = sin_cos_deg(hpr.z);

    let srsp = sr * sp;
    let crsp = cr * sp;
    let srcp = sr * cp;

    Mat3d::new(
        ch * cr - sh * srsp,
        cr * sh + srsp * ch,
        -srcp,
        -sh * cp,
        ch * cp,
        sp,
        sr * ch + sh * crsp,
        sr * sh - ch * crsp,
        cr * cp,
    )
}

/// Extract heading, pitch, roll in degrees from a rotation matrix.
///
/// Any uniform scale in the matrix is divided out first.
pub fn matrix_to_hpr(rotation: &Mat3d) -> Vec3d {
    let scale = rotation.row(0).norm();
    if scale <= HPR_EPSILON {
        return Vec3d::zeros();
    }
    let mat = rotation / scale;

    let pitch = utils::safe_asin(mat[(1, 2)]);
    let cp = pitch.cos();

    let (heading, roll) = if cp.abs() < HPR_EPSILON {
        let cr = (-mat[(2, 1)]).clamp(-1.0, 1.0);
        let sr = mat[(0, 1)].clamp(-1.0, 1.0);
        (0.0, sr.atan2(cr))
    } else {
        let sr = (-mat[(0, 2)] / cp).clamp(-1.0, 1.0);
        let cr = (mat[(2, 2)] / cp).clamp(-1.0, 1.0);
        let mut sh = (-mat[(1, 0)] / cp).clamp(-1.0, 1.0);
        let mut ch = (mat[(1, 1)] / cp).clamp(-1.0, 1.0);
        if sh.abs() < HPR_EPSILON && ch.abs() < HPR_EPSILON {
            sh = mat[(0, 1)];
            ch = mat[(0, 0)];
        }
        (sh.atan2(ch), sr.atan2(cr))
    };

    Vec3d::new(
        utils::rad_to_deg(heading),
        utils::rad_to_deg(pitch),
        utils::rad_to_deg(roll),
    )
}

/// Rotate `v` as a row vector: `v * M`.
pub fn pre_mult(matrix: &Mat3d, v: &Vec3d) -> Vec3d {
    matrix.transpose() * v
}

/// Upper-left 3x3 block of a homogeneous matrix
pub fn rotation_part(matrix: &Mat4d) -> Mat3d {
    matrix.fixed_view::<3, 3>(0, 0).into_owned()
}

/// Quaternion for a row-convention rotation matrix
pub fn matrix_to_quat(rotation: &Mat3d) -> Quat {
    let column = nalgebra::Rotation3::from_matrix_unchecked(rotation.transpose());
    let q = UnitQuaternion::from_rotation_matrix(&column);
    UnitQuaternion::new_normalize(Quaternion::new(
        q.w as f32, q.i as f32, q.j as f32, q.k as f32,
    ))
}

/// Row-convention rotation matrix for a quaternion
pub fn quat_to_matrix(rotation: &Quat) -> Mat3d {
    let q = UnitQuaternion::new_normalize(Quaternion::new(
        f64::from(rotation.w),
        f64::from(rotation.i),
        f64::from(rotation.j),
        f64::from(rotation.k),
    ));
    q.to_rotation_matrix().into_inner().transpose()
}

/// Quaternion from heading, pitch, roll in degrees
pub fn hpr_to_quat(hpr: &Vec3) -> Quat {
    matrix_to_quat(&hpr_to_matrix(&hpr.cast::<f64>()))
}

/// Heading, pitch, roll in degrees from a quaternion
pub fn quat_to_hpr(rotation: &Quat) -> Vec3 {
    matrix_to_hpr(&quat_to_matrix(rotation)).cast::<f32>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_hpr_matrix_round_trip() {
        let hpr = Vec3d::new(30.0, 20.0, -45.0);
        let back = matrix_to_hpr(&hpr_to_matrix(&hpr));
        assert_relative_eq!(back, hpr, epsilon = 1e-9);
    }

    #[test]
    fn test_heading_only_matrix() {
        let m = hpr_to_matrix(&Vec3d::new(90.0, 0.0, 0.0));
        // Heading of 90 turns +Y (north) toward -X (west)
        let north = Vec3d::new(0.0, 1.0, 0.0);
        let turned = pre_mult(&m, &north);
        assert_relative_eq!(turned, Vec3d::new(-1.0, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_gimbal_lock_pitch() {
        let hpr = Vec3d::new(0.0, 90.0, 25.0);
        let back = matrix_to_hpr(&hpr_to_matrix(&hpr));
        assert_relative_eq!(back.y, 90.0, epsilon = 1e-6);
        assert_relative_eq!(back.z, 25.0, epsilon = 1e-6);
    }

    #[test]
    fn test_quat_round_trip() {
        let hpr = Vec3::new(-120.0, 10.0, 5.0);
        let back = quat_to_hpr(&hpr_to_quat(&hpr));
        assert_relative_eq!(back, hpr, epsilon = 1e-3);
    }

    #[test]
    fn test_zero_non_finite() {
        let mut v = [1.0, f64::NAN, f64::INFINITY];
        assert!(utils::zero_non_finite(&mut v));
        assert_eq!(v, [1.0, 0.0, 0.0]);
        assert!(!utils::zero_non_finite(&mut v));
    }

    #[test]
    fn test_scaled_matrix_normalized() {
        let m = hpr_to_matrix(&Vec3d::new(10.0, 5.0, 2.0)) * 3.0;
        let hpr = matrix_to_hpr(&m);
        assert_relative_eq!(hpr, Vec3d::new(10.0, 5.0, 2.0), epsilon = 1e-9);
    }
}
