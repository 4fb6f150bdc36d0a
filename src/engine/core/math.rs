// ABOUTME: Shared vector type and small numeric helpers used across physics kernels
// ABOUTME: Consolidated so wind, flow, and gradient code share one Vec2 implementation

/// 2D vector used for wind and flow direction/magnitude.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0)
    }

    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn clamp_magnitude(&self, max: f32) -> Self {
        let mag = self.magnitude();
        if mag > max && mag > f32::EPSILON {
            Self::new(self.x * max / mag, self.y * max / mag)
        } else {
            *self
        }
    }
}

impl std::ops::Add for Vec2 {
    type Output = Vec2;
    fn add(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x + other.x, self.y + other.y)
    }
}

impl std::ops::Mul<f32> for Vec2 {
    type Output = Vec2;
    fn mul(self, scalar: f32) -> Vec2 {
        Vec2::new(self.x * scalar, self.y * scalar)
    }
}

/// 8-neighbor offsets in a fixed, deterministic order: E, SE, S, SW, W, NW, N, NE.
/// `is_diagonal` lets callers apply a separate attenuation factor.
pub const NEIGHBORS_8: [(i64, i64, bool); 8] = [
    (1, 0, false),
    (1, 1, true),
    (0, 1, false),
    (-1, 1, true),
    (-1, 0, false),
    (-1, -1, true),
    (0, -1, false),
    (1, -1, true),
];

/// 4-neighbor cardinal offsets in a fixed, deterministic order: E, S, W, N.
pub const NEIGHBORS_4: [(i64, i64); 4] = [(1, 0), (0, 1), (-1, 0), (0, -1)];

#[inline]
pub fn clamp(value: f32, lo: f32, hi: f32) -> f32 {
    value.max(lo).min(hi)
}

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Normalized discrete Gaussian kernel of the given radius (`2r+1` taps).
pub fn gaussian_kernel_1d(radius: usize, sigma: f32) -> Vec<f32> {
    let radius_i = radius as i64;
    let mut kernel: Vec<f32> = (-radius_i..=radius_i)
        .map(|i| {
            let x = i as f32;
            (-(x * x) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f32 = kernel.iter().sum();
    if sum > f32::EPSILON {
        for v in &mut kernel {
            *v /= sum;
        }
    }
    kernel
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec2_magnitude() {
        assert_eq!(Vec2::new(3.0, 4.0).magnitude(), 5.0);
    }

    #[test]
    fn vec2_clamp_magnitude_shrinks_but_preserves_direction() {
        let v = Vec2::new(3.0, 4.0).clamp_magnitude(2.5);
        assert!((v.magnitude() - 2.5).abs() < 1e-5);
    }

    #[test]
    fn gaussian_kernel_sums_to_one() {
        let kernel = gaussian_kernel_1d(3, 1.0);
        let sum: f32 = kernel.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert_eq!(kernel.len(), 7);
    }

    #[test]
    fn neighbors_8_has_four_diagonals() {
        let diagonals = NEIGHBORS_8.iter().filter(|(_, _, d)| *d).count();
        assert_eq!(diagonals, 4);
    }
}
