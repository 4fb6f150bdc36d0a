// ABOUTME: Diamond-Square midpoint-displacement noise, shaped into a bedrock elevation field
// ABOUTME: No third-party noise crate; the displacement grid is generated on a padded power-of-two size and resampled

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::engine::core::grid::Grid2;

#[derive(Clone, Debug)]
pub struct DiamondSquareConfig {
    pub initial_corners: [f32; 4],
    pub roughness: f32,
    pub persistence: f32,
}

impl Default for DiamondSquareConfig {
    fn default() -> Self {
        Self {
            initial_corners: [0.5, 0.5, 0.5, 0.5],
            roughness: 0.5,
            persistence: 0.5,
        }
    }
}

pub struct DiamondSquareGenerator {
    seed: u64,
}

impl DiamondSquareGenerator {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Normalized (0..1) noise field resampled to `width`x`height`.
    pub fn generate(&self, width: usize, height: usize, config: &DiamondSquareConfig) -> Grid2<f32> {
        let size = next_power_of_two_plus_one(width.max(height));
        let full = self.generate_power_of_two(size, config);
        let mut sampled = self.sample_to_dimensions(&full, width, height);
        normalize(&mut sampled);
        sampled
    }

    fn generate_power_of_two(&self, size: usize, config: &DiamondSquareConfig) -> Grid2<f32> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut map = Grid2::new(size, size, 0.0f32);
        let max_index = size - 1;

        map.set(0, 0, config.initial_corners[0]);
        map.set(max_index, 0, config.initial_corners[1]);
        map.set(0, max_index, config.initial_corners[2]);
        map.set(max_index, max_index, config.initial_corners[3]);

        let mut step_size = size - 1;
        let mut scale = config.roughness;

        while step_size > 1 {
            let half_step = step_size / 2;

            for y in (half_step..size).step_by(step_size) {
                for x in (half_step..size).step_by(step_size) {
                    let avg = diamond_average(&map, x, y, half_step, size);
                    let noise = rng.gen_range(-scale..scale);
                    map.set(x, y, avg + noise);
                }
            }

            for y in (0..size).step_by(half_step) {
                let offset = if (y / half_step) % 2 == 0 { half_step } else { 0 };
                for x in (offset..size).step_by(step_size) {
                    let avg = square_average(&map, x, y, half_step, size);
                    let noise = rng.gen_range(-scale..scale);
                    map.set(x, y, avg + noise);
                }
            }

            step_size /= 2;
            scale *= config.persistence;
        }

        map
    }

    fn sample_to_dimensions(&self, full_map: &Grid2<f32>, width: usize, height: usize) -> Grid2<f32> {
        let full_size = full_map.width();
        let mut result = Grid2::new(width, height, 0.0f32);

        for y in 0..height {
            for x in 0..width {
                let src_x = (x * (full_size - 1)) / (width - 1).max(1);
                let src_y = (y * (full_size - 1)) / (height - 1).max(1);
                result.set(x, y, *full_map.get(src_x.min(full_size - 1), src_y.min(full_size - 1)));
            }
        }
        result
    }
}

fn diamond_average(map: &Grid2<f32>, x: usize, y: usize, half_step: usize, size: usize) -> f32 {
    let points = [
        (x.wrapping_sub(half_step), y.wrapping_sub(half_step)),
        (x + half_step, y.wrapping_sub(half_step)),
        (x.wrapping_sub(half_step), y + half_step),
        (x + half_step, y + half_step),
    ];
    average_in_bounds(map, &points, size)
}

fn square_average(map: &Grid2<f32>, x: usize, y: usize, half_step: usize, size: usize) -> f32 {
    let points = [
        (x, y.wrapping_sub(half_step)),
        (x.wrapping_sub(half_step), y),
        (x + half_step, y),
        (x, y + half_step),
    ];
    average_in_bounds(map, &points, size)
}

fn average_in_bounds(map: &Grid2<f32>, points: &[(usize, usize)], size: usize) -> f32 {
    let mut sum = 0.0;
    let mut count = 0;
    for &(px, py) in points {
        if px < size && py < size {
            sum += *map.get(px, py);
            count += 1;
        }
    }
    if count > 0 { sum / count as f32 } else { 0.0 }
}

fn normalize(grid: &mut Grid2<f32>) {
    let min = grid.min();
    let max = grid.max();
    if max > min {
        for v in grid.data_mut() {
            *v = (*v - min) / (max - min);
        }
    }
}

fn next_power_of_two_plus_one(n: usize) -> usize {
    let mut size = 2usize;
    while size + 1 < n {
        size *= 2;
    }
    size + 1
}

/// Emphasizes peaks and valleys: pushes values away from the midpoint,
/// preserving sign and the [0,1] domain.
pub fn emphasize_extremes(value: f32, exponent: f32) -> f32 {
    let centered = value - 0.5;
    centered.signum() * centered.abs().powf(exponent) * 0.5 + 0.5
}

/// Shapes a normalized noise field into bedrock elevation, enforcing the
/// configured floor.
pub fn shape_bedrock(noise: &Grid2<f32>, min_elevation: i32, relief: i32, exponent: f32) -> Grid2<i32> {
    noise.map(|v| {
        let shaped = emphasize_extremes(*v, exponent);
        (min_elevation as f32 + shaped * relief as f32).round() as i32
    }).map(|v| (*v).max(min_elevation))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_field_stays_within_unit_range() {
        let generator = DiamondSquareGenerator::new(42);
        let field = generator.generate(16, 16, &DiamondSquareConfig::default());
        for v in field.data() {
            assert!(*v >= 0.0 && *v <= 1.0);
        }
    }

    #[test]
    fn same_seed_is_deterministic() {
        let a = DiamondSquareGenerator::new(7).generate(9, 9, &DiamondSquareConfig::default());
        let b = DiamondSquareGenerator::new(7).generate(9, 9, &DiamondSquareConfig::default());
        assert_eq!(a, b);
    }

    #[test]
    fn shaped_bedrock_never_drops_below_floor() {
        let generator = DiamondSquareGenerator::new(3);
        let field = generator.generate(10, 10, &DiamondSquareConfig::default());
        let bedrock = shape_bedrock(&field, -20, 40, 0.6);
        for v in bedrock.data() {
            assert!(*v >= -20);
        }
    }

    #[test]
    fn emphasize_extremes_preserves_endpoints() {
        assert!((emphasize_extremes(0.0, 0.6) - 0.0).abs() < 1e-5);
        assert!((emphasize_extremes(1.0, 0.6) - 1.0).abs() < 1e-5);
        assert!((emphasize_extremes(0.5, 0.6) - 0.5).abs() < 1e-5);
    }
}
