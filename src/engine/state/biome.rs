// ABOUTME: Biome classification tags plus the moisture/erosion accumulators biome recalc reads
// ABOUTME: BiomeKind is the fine-grained per-cell tag produced by both worldgen and end-of-day recalc

use crate::engine::core::grid::Grid2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BiomeKind {
    #[default]
    Flat,
    Dune,
    Wadi,
    Rock,
    Salt,
}

#[derive(Debug, Clone)]
pub struct BiomeState {
    pub kind_grid: Grid2<BiomeKind>,
    pub moisture_grid: Grid2<f32>,
    pub water_passage: Grid2<f32>,
    pub wind_exposure: Grid2<f32>,
}

impl BiomeState {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            kind_grid: Grid2::new(width, height, BiomeKind::Flat),
            moisture_grid: Grid2::new(width, height, 0.0),
            water_passage: Grid2::new(width, height, 0.0),
            wind_exposure: Grid2::new(width, height, 0.0),
        }
    }

    /// Zeroed at the end of each day, after erosion consumes them.
    pub fn reset_daily_accumulators(&mut self) {
        self.water_passage.fill(0.0);
        self.wind_exposure.fill(0.0);
    }
}
