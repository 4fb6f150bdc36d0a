// ABOUTME: Deterministic world generation: bedrock shaping, WFC biome placement, layer population, water init
// ABOUTME: Entry point is generate_world; every sub-phase reports through the same progress callback

pub mod noise_field;
pub mod wfc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::engine::config::EngineConfig;
use crate::engine::core::grid::Grid2;
use crate::engine::state::atmosphere::AtmosphereState;
use crate::engine::state::biome::{BiomeKind, BiomeState};
use crate::engine::state::events::EventLog;
use crate::engine::state::terrain::{Material, TerrainState, ALL_LAYERS};
use crate::engine::state::water::WaterState;
use noise_field::{DiamondSquareConfig, DiamondSquareGenerator};
use wfc::GenerationPhase;

pub use wfc::GenerationError;

pub struct GeneratedWorld {
    pub terrain: TerrainState,
    pub water: WaterState,
    pub atmosphere: AtmosphereState,
    pub biome: BiomeState,
}

pub fn generate_world(
    seed: u64,
    width: usize,
    height: usize,
    config: &EngineConfig,
    events: &mut EventLog,
    mut progress: impl FnMut(GenerationPhase, f32) -> bool,
) -> Result<GeneratedWorld, GenerationError> {
    let mut rng = StdRng::seed_from_u64(seed);

    if !progress(GenerationPhase::Heightmap, 0.0) {
        return Err(GenerationError::Aborted);
    }
    let noise = DiamondSquareGenerator::new(seed).generate(width, height, &DiamondSquareConfig::default());
    let relief = 40;
    let bedrock = noise_field::shape_bedrock(&noise, config.min_bedrock_elevation, relief, 0.65);
    if !progress(GenerationPhase::Heightmap, 1.0) {
        return Err(GenerationError::Aborted);
    }

    let coarse_width = width.div_ceil(config.wfc_coarse_cell_size).max(1);
    let coarse_height = height.div_ceil(config.wfc_coarse_cell_size).max(1);
    let coarse_elevation = downsample_elevation(&bedrock, coarse_width, coarse_height, config.wfc_coarse_cell_size);
    let coarse_biomes = wfc::generate_coarse_biomes(
        coarse_width,
        coarse_height,
        &coarse_elevation,
        config.wfc_max_restarts,
        &mut rng,
        events,
        &mut progress,
    )?;
    let biome_kinds = wfc::upsample(&coarse_biomes, width, height, config.wfc_coarse_cell_size);

    if !progress(GenerationPhase::LayerPopulation, 0.0) {
        return Err(GenerationError::Aborted);
    }
    let mut terrain = TerrainState::new(width, height);
    terrain.bedrock_base = bedrock;
    populate_layers(&mut terrain, &biome_kinds, &mut rng);
    terrain.rebuild_if_dirty();
    if !progress(GenerationPhase::LayerPopulation, 1.0) {
        return Err(GenerationError::Aborted);
    }

    if !progress(GenerationPhase::Wellsprings, 0.0) {
        return Err(GenerationError::Aborted);
    }
    let mut water = WaterState::new(width, height, config.initial_water_pool as i64);
    place_wellsprings(&mut water, config, &mut rng);
    if !progress(GenerationPhase::Wellsprings, 1.0) {
        return Err(GenerationError::Aborted);
    }

    if !progress(GenerationPhase::WaterInit, 0.0) {
        return Err(GenerationError::Aborted);
    }
    let atmosphere = AtmosphereState::new(width, height);
    let mut biome = BiomeState::new(width, height);
    biome.kind_grid = biome_kinds;
    if !progress(GenerationPhase::WaterInit, 1.0) {
        return Err(GenerationError::Aborted);
    }

    Ok(GeneratedWorld { terrain, water, atmosphere, biome })
}

fn downsample_elevation(
    bedrock: &Grid2<i32>,
    coarse_width: usize,
    coarse_height: usize,
    cell_size: usize,
) -> Grid2<f32> {
    let width = bedrock.width();
    let height = bedrock.height();
    let min = *bedrock.data().iter().min().unwrap_or(&0) as f32;
    let max = *bedrock.data().iter().max().unwrap_or(&0) as f32;
    let span = (max - min).max(1.0);

    let mut result = Grid2::new(coarse_width, coarse_height, 0.0f32);
    for cy in 0..coarse_height {
        for cx in 0..coarse_width {
            let x0 = cx * cell_size;
            let y0 = cy * cell_size;
            let x1 = (x0 + cell_size).min(width);
            let y1 = (y0 + cell_size).min(height);
            let mut sum = 0i64;
            let mut count = 0i64;
            for y in y0..y1.max(y0 + 1).min(height) {
                for x in x0..x1.max(x0 + 1).min(width) {
                    sum += *bedrock.get(x, y) as i64;
                    count += 1;
                }
            }
            let mean = if count > 0 { sum as f32 / count as f32 } else { min };
            result.set(cx, cy, (mean - min) / span);
        }
    }
    result
}

/// Depth range (inclusive, in cells) per layer for a biome, bottom-up.
fn layer_ranges(kind: BiomeKind) -> [(i32, i32); 6] {
    match kind {
        BiomeKind::Dune => [(0, 1), (0, 1), (1, 3), (0, 1), (3, 8), (0, 0)],
        BiomeKind::Flat => [(0, 0), (1, 2), (2, 4), (1, 2), (2, 4), (0, 1)],
        BiomeKind::Wadi => [(0, 0), (1, 2), (2, 3), (1, 3), (3, 5), (1, 3)],
        BiomeKind::Rock => [(0, 3), (0, 1), (0, 1), (0, 0), (0, 1), (0, 0)],
        BiomeKind::Salt => [(0, 0), (1, 2), (1, 2), (1, 2), (1, 2), (0, 0)],
    }
}

fn populate_layers(terrain: &mut TerrainState, biome_kinds: &Grid2<BiomeKind>, rng: &mut StdRng) {
    let width = terrain.bedrock_base.width();
    let height = terrain.bedrock_base.height();

    for y in 0..height {
        for x in 0..width {
            let kind = *biome_kinds.get(x, y);
            let ranges = layer_ranges(kind);
            for (i, layer) in ALL_LAYERS.iter().enumerate() {
                let (lo, hi) = ranges[i];
                let depth = if hi > lo { rng.gen_range(lo..=hi) } else { lo };
                terrain.set_layer_depth(*layer, x, y, depth);
            }
            if kind == BiomeKind::Salt {
                if let Some(layer) = terrain.topmost_nonempty(x, y) {
                    terrain.terrain_materials.set(layer as usize, x, y, Material::Salt);
                }
            }
        }
    }
}

fn place_wellsprings(water: &mut WaterState, config: &EngineConfig, rng: &mut StdRng) {
    let width = water.wellspring_grid.width();
    let height = water.wellspring_grid.height();
    for y in 0..height {
        for x in 0..width {
            if rng.r#gen::<f32>() < config.wellspring_density {
                let output = rng.gen_range(config.wellspring_min_output..=config.wellspring_max_output);
                water.wellspring_grid.set(x, y, output);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_is_deterministic_for_a_fixed_seed() {
        let config = EngineConfig::default();
        let mut events_a = EventLog::new(64);
        let mut events_b = EventLog::new(64);
        let world_a = generate_world(7, 16, 16, &config, &mut events_a, |_, _| true).unwrap();
        let world_b = generate_world(7, 16, 16, &config, &mut events_b, |_, _| true).unwrap();
        assert_eq!(world_a.terrain.bedrock_base, world_b.terrain.bedrock_base);
        assert_eq!(world_a.biome.kind_grid, world_b.biome.kind_grid);
    }

    #[test]
    fn bedrock_never_drops_below_configured_minimum() {
        let config = EngineConfig::default();
        let mut events = EventLog::new(64);
        let world = generate_world(11, 20, 20, &config, &mut events, |_, _| true).unwrap();
        for v in world.terrain.bedrock_base.data() {
            assert!(*v >= config.min_bedrock_elevation);
        }
    }

    #[test]
    fn generation_aborts_when_progress_callback_declines() {
        let config = EngineConfig::default();
        let mut events = EventLog::new(64);
        let result = generate_world(1, 10, 10, &config, &mut events, |_, _| false);
        assert!(result.is_err());
    }

    #[test]
    fn salt_biome_cells_carry_salt_material() {
        let config = EngineConfig::default();
        let mut events = EventLog::new(64);
        let world = generate_world(5, 24, 24, &config, &mut events, |_, _| true).unwrap();
        let width = world.biome.kind_grid.width();
        let height = world.biome.kind_grid.height();
        for y in 0..height {
            for x in 0..width {
                if *world.biome.kind_grid.get(x, y) == BiomeKind::Salt {
                    if let Some(layer) = world.terrain.topmost_nonempty(x, y) {
                        assert_eq!(*world.terrain.terrain_materials.get(layer as usize, x, y), Material::Salt);
                    }
                }
            }
        }
    }
}
