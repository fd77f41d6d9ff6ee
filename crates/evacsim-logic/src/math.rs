//! Vector math shared by the controller and the engine.
//!
//! World units are centimetres-ish "units" with +Z up. All normalisation is
//! "safe": degenerate vectors collapse to [`Vec3::ZERO`] instead of NaN.

use serde::{Deserialize, Serialize};

/// Squared-length tolerance below which a vector cannot be normalised.
pub const SMALL_NUMBER: f32 = 1.0e-8;

/// Per-component tolerance for "nearly zero" checks.
pub const KINDA_SMALL_NUMBER: f32 = 1.0e-4;

/// 3D vector
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0, z: 0.0 };
    pub const UP: Self = Self { x: 0.0, y: 0.0, z: 1.0 };
    pub const FORWARD: Self = Self { x: 1.0, y: 0.0, z: 0.0 };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn dot(&self, other: &Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: &Self) -> Self {
        Self {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    pub fn length_squared(&self) -> f32 {
        self.dot(self)
    }

    pub fn length(&self) -> f32 {
        self.length_squared().sqrt()
    }

    pub fn distance_squared(&self, other: &Self) -> f32 {
        (*self - *other).length_squared()
    }

    pub fn distance(&self, other: &Self) -> f32 {
        self.distance_squared(other).sqrt()
    }

    /// Drop the vertical component.
    pub fn horizontal(&self) -> Self {
        Self::new(self.x, self.y, 0.0)
    }

    /// Unit vector in the same direction, or zero when too short to normalise.
    pub fn safe_normal(&self) -> Self {
        let len_sq = self.length_squared();
        if len_sq < SMALL_NUMBER || !len_sq.is_finite() {
            return Self::ZERO;
        }
        *self * (1.0 / len_sq.sqrt())
    }

    /// Scale down to `max` length if longer; shorter vectors are returned as-is.
    pub fn clamped_to_max_size(&self, max: f32) -> Self {
        if max < KINDA_SMALL_NUMBER {
            return Self::ZERO;
        }
        let len_sq = self.length_squared();
        if len_sq > max * max {
            *self * (max / len_sq.sqrt())
        } else {
            *self
        }
    }

    pub fn is_nearly_zero(&self) -> bool {
        self.is_nearly_zero_within(KINDA_SMALL_NUMBER)
    }

    pub fn is_nearly_zero_within(&self, tolerance: f32) -> bool {
        self.x.abs() <= tolerance && self.y.abs() <= tolerance && self.z.abs() <= tolerance
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl std::ops::Add for Vec3 {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl std::ops::AddAssign for Vec3 {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl std::ops::Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl std::ops::Mul<f32> for Vec3 {
    type Output = Self;
    fn mul(self, scalar: f32) -> Self {
        Self::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

/// Exponential approach of `current` toward `target`.
///
/// Moves `clamp(dt * speed, 0, 1)` of the remaining distance per call, so a
/// higher `speed` converges faster. A non-positive `speed` snaps to `target`.
pub fn interp_to(current: f32, target: f32, dt: f32, speed: f32) -> f32 {
    if speed <= 0.0 {
        return target;
    }
    let dist = target - current;
    if dist * dist < SMALL_NUMBER {
        return target;
    }
    current + dist * (dt * speed).clamp(0.0, 1.0)
}

/// Vector form of [`interp_to`].
pub fn vinterp_to(current: Vec3, target: Vec3, dt: f32, speed: f32) -> Vec3 {
    if speed <= 0.0 {
        return target;
    }
    let dist = target - current;
    if dist.length_squared() < SMALL_NUMBER {
        return target;
    }
    current + dist * (dt * speed).clamp(0.0, 1.0)
}

/// Map `value` from `input` to `output`, clamping to the output range.
///
/// `input` may be inverted (`input.0 > input.1`), which inverts the mapping.
pub fn mapped_range_clamped(input: (f32, f32), output: (f32, f32), value: f32) -> f32 {
    let span = input.1 - input.0;
    let pct = if span.abs() < SMALL_NUMBER {
        if value >= input.1 {
            1.0
        } else {
            0.0
        }
    } else {
        ((value - input.0) / span).clamp(0.0, 1.0)
    };
    output.0 + (output.1 - output.0) * pct
}

/// Angle between `normal` and world up, in degrees. Zero vectors read as flat.
pub fn slope_degrees(normal: Vec3) -> f32 {
    let n = normal.safe_normal();
    if n == Vec3::ZERO {
        return 0.0;
    }
    n.z.clamp(-1.0, 1.0).acos().to_degrees()
}
