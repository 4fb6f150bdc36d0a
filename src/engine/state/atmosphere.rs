// ABOUTME: Humidity and wind field storage for the atmosphere diffusion subsystem
// ABOUTME: Pure data; the diffusion update itself lives in engine::physics::atmosphere_update

use crate::engine::core::grid::Grid2;
use crate::engine::core::math::Vec2;

#[derive(Debug, Clone)]
pub struct AtmosphereState {
    pub humidity_grid: Grid2<f32>,
    pub wind_grid: Grid2<Vec2>,
}

impl AtmosphereState {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            humidity_grid: Grid2::new(width, height, 0.3),
            wind_grid: Grid2::new(width, height, Vec2::zero()),
        }
    }
}
