// ABOUTME: End-of-day moisture EMA update and elevation-percentile biome reclassification
// ABOUTME: Reclassified cells are recorded so the host can invalidate just those static renders

use std::collections::HashSet;

use crate::engine::config::EngineConfig;
use crate::engine::state::biome::{BiomeKind, BiomeState};
use crate::engine::state::terrain::{Material, TerrainState, ALL_LAYERS};
use crate::engine::state::water::WaterState;

pub fn step(
    terrain: &TerrainState,
    water: &WaterState,
    biome: &mut BiomeState,
    config: &EngineConfig,
    dirty_cells: &mut HashSet<(u32, u32)>,
) {
    update_moisture(terrain, water, biome, config);
    let percentiles = elevation_percentiles(terrain);
    reclassify(terrain, biome, config, &percentiles, dirty_cells);
}

/// Exposed separately from [`step`] so the scheduler can run it on its own
/// phase-table slot (`tick mod 4 == 1`) instead of only once per day.
pub(crate) fn update_moisture(terrain: &TerrainState, water: &WaterState, biome: &mut BiomeState, config: &EngineConfig) {
    let width = terrain.elevation_grid.width();
    let height = terrain.elevation_grid.height();
    let alpha = config.moisture_ema_alpha;

    for y in 0..height {
        for x in 0..width {
            let surface = *water.water_grid.get(x, y) as f32;
            let subsurface: i32 = ALL_LAYERS
                .iter()
                .map(|l| *water.subsurface_water_grid.get(*l as usize, x, y))
                .sum();
            let sample = surface + subsurface as f32;
            let previous = *biome.moisture_grid.get(x, y);
            biome.moisture_grid.set(x, y, (1.0 - alpha) * previous + alpha * sample);
        }
    }
}

/// Rank-based percentile of each cell's elevation within the whole grid,
/// in `[0, 1]`. Ties share the same percentile (average rank).
fn elevation_percentiles(terrain: &TerrainState) -> Vec<f32> {
    let width = terrain.elevation_grid.width();
    let height = terrain.elevation_grid.height();
    let n = width * height;
    if n <= 1 {
        return vec![0.5; n];
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by_key(|&i| {
        let x = i % width;
        let y = i / width;
        *terrain.elevation_grid.get(x, y)
    });

    let mut percentiles = vec![0.0f32; n];
    let mut i = 0;
    while i < n {
        let x = order[i] % width;
        let y = order[i] / width;
        let value = *terrain.elevation_grid.get(x, y);
        let mut j = i;
        while j < n {
            let x2 = order[j] % width;
            let y2 = order[j] / width;
            if *terrain.elevation_grid.get(x2, y2) != value {
                break;
            }
            j += 1;
        }
        let average_rank = (i + j - 1) as f32 / 2.0;
        let percentile = average_rank / (n - 1) as f32;
        for &idx in &order[i..j] {
            percentiles[idx] = percentile;
        }
        i = j;
    }
    percentiles
}

fn reclassify(
    terrain: &TerrainState,
    biome: &mut BiomeState,
    config: &EngineConfig,
    percentiles: &[f32],
    dirty_cells: &mut HashSet<(u32, u32)>,
) {
    let width = terrain.elevation_grid.width();
    let height = terrain.elevation_grid.height();

    for y in 0..height {
        for x in 0..width {
            let percentile = percentiles[y * width + x];
            let moisture = *biome.moisture_grid.get(x, y);
            let topmost_material = terrain
                .topmost_nonempty(x, y)
                .map(|layer| *terrain.terrain_materials.get(layer as usize, x, y));

            let classified = classify(config, percentile, moisture, topmost_material);

            let current = biome.kind_grid.get_mut(x, y);
            if *current != classified {
                *current = classified;
                dirty_cells.insert((x as u32, y as u32));
            }
        }
    }
}

fn classify(
    config: &EngineConfig,
    percentile: f32,
    moisture: f32,
    topmost_material: Option<Material>,
) -> BiomeKind {
    if moisture >= config.biome_salt_moisture_threshold && topmost_material == Some(Material::Salt) {
        return BiomeKind::Salt;
    }
    if percentile >= config.biome_percentile_high && moisture <= config.biome_moisture_low {
        return if matches!(topmost_material, None | Some(Material::Bedrock | Material::Regolith | Material::Subsoil))
        {
            BiomeKind::Rock
        } else {
            BiomeKind::Dune
        };
    }
    if percentile <= config.biome_percentile_low && moisture >= config.biome_moisture_high {
        return BiomeKind::Wadi;
    }
    BiomeKind::Flat
}
