// ABOUTME: Humidity and wind diffusion - random drift followed by a separable Gaussian blur
// ABOUTME: Runs every 2 ticks per the scheduler's phase table; evaporation and erosion read the result

use rand::Rng;
use rayon::prelude::*;

use crate::engine::config::EngineConfig;
use crate::engine::core::grid::Grid2;
use crate::engine::core::math::{clamp, gaussian_kernel_1d, Vec2};
use crate::engine::state::atmosphere::AtmosphereState;

pub fn step(atmosphere: &mut AtmosphereState, config: &EngineConfig, heat: f32, rng: &mut impl Rng) {
    update_humidity(atmosphere, config, heat, rng);
    update_wind(atmosphere, config, rng);
}

fn update_humidity(atmosphere: &mut AtmosphereState, config: &EngineConfig, heat: f32, rng: &mut impl Rng) {
    let grid = &mut atmosphere.humidity_grid;
    for v in grid.data_mut() {
        let drift = rng.gen_range(-config.humidity_drift_epsilon..=config.humidity_drift_epsilon);
        *v = clamp(*v + drift - config.humidity_heat_bias * heat, 0.0, 1.0);
    }
    let blurred = blur_grid(grid, config.atmosphere_blur_radius, config.atmosphere_blur_sigma);
    for (v, b) in grid.data_mut().iter_mut().zip(blurred.data()) {
        *v = clamp(*b, 0.0, 1.0);
    }
}

fn update_wind(atmosphere: &mut AtmosphereState, config: &EngineConfig, rng: &mut impl Rng) {
    let width = atmosphere.wind_grid.width();
    let height = atmosphere.wind_grid.height();

    let mut x_channel = Grid2::new(width, height, 0.0f32);
    let mut y_channel = Grid2::new(width, height, 0.0f32);
    for y in 0..height {
        for x in 0..width {
            let wind = atmosphere.wind_grid.get(x, y);
            let dx = rng.gen_range(-config.wind_drift_epsilon..=config.wind_drift_epsilon);
            let dy = rng.gen_range(-config.wind_drift_epsilon..=config.wind_drift_epsilon);
            x_channel.set(x, y, wind.x + dx);
            y_channel.set(x, y, wind.y + dy);
        }
    }

    let x_blurred = blur_grid(&x_channel, config.atmosphere_blur_radius, config.atmosphere_blur_sigma);
    let y_blurred = blur_grid(&y_channel, config.atmosphere_blur_radius, config.atmosphere_blur_sigma);

    for y in 0..height {
        for x in 0..width {
            let vec = Vec2::new(*x_blurred.get(x, y), *y_blurred.get(x, y))
                .clamp_magnitude(config.wind_max_magnitude);
            atmosphere.wind_grid.set(x, y, vec);
        }
    }
}

/// Separable Gaussian blur with clamped (edge-extended) boundaries: no
/// wrapping, and no energy loss from a truncated kernel at the border.
///
/// Each output row is independent of every other row in both passes (the
/// horizontal pass reads one source row, the vertical pass reads one source
/// column's worth of rows but writes only its own), so both passes are
/// split across `rayon`'s data-parallel row iterator.
fn blur_grid(grid: &Grid2<f32>, radius: usize, sigma: f32) -> Grid2<f32> {
    let width = grid.width();
    let height = grid.height();
    let kernel = gaussian_kernel_1d(radius, sigma);
    let radius = radius as i64;

    let mut horizontal = Grid2::new(width, height, 0.0f32);
    horizontal
        .data_mut()
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, cell) in row.iter_mut().enumerate() {
                let mut acc = 0.0;
                for (k, weight) in kernel.iter().enumerate() {
                    let sx = (x as i64 + k as i64 - radius).clamp(0, width as i64 - 1) as usize;
                    acc += *grid.get(sx, y) * weight;
                }
                *cell = acc;
            }
        });

    let mut result = Grid2::new(width, height, 0.0f32);
    result
        .data_mut()
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, cell) in row.iter_mut().enumerate() {
                let mut acc = 0.0;
                for (k, weight) in kernel.iter().enumerate() {
                    let sy = (y as i64 + k as i64 - radius).clamp(0, height as i64 - 1) as usize;
                    acc += *horizontal.get(x, sy) * weight;
                }
                *cell = acc;
            }
        });
    result
}
