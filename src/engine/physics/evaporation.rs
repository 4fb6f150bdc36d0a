// ABOUTME: Removes water from the surface (and, on dry cells, the topmost soil layer) into the atmosphere
// ABOUTME: Every removed unit is routed through WaterPool::deposit_atmospheric, never discarded

use crate::engine::config::EngineConfig;
use crate::engine::core::grid::Grid2;
use crate::engine::core::math::clamp;
use crate::engine::state::atmosphere::AtmosphereState;
use crate::engine::state::biome::BiomeKind;
use crate::engine::state::biome::BiomeState;
use crate::engine::state::terrain::TerrainState;
use crate::engine::state::water::WaterState;

/// Base evaporation pressure per biome before heat/atmosphere modifiers.
fn base_evap(kind: BiomeKind) -> f32 {
    match kind {
        BiomeKind::Dune => 1.2,
        BiomeKind::Flat => 1.0,
        BiomeKind::Wadi => 0.6,
        BiomeKind::Rock => 0.8,
        BiomeKind::Salt => 1.4,
    }
}

fn evap_modifier(humidity: f32, wind_speed: f32, config: &EngineConfig) -> f32 {
    let raw = (1.0 - humidity) * (1.0 + config.evaporation_wind_coefficient * wind_speed);
    clamp(raw, config.evaporation_modifier_low, config.evaporation_modifier_high)
}

/// `structure_modifier` multiplies the per-cell evaporation rate (a
/// Cistern slows evaporation on its own cell); pass an all-ones grid when
/// no structures are present.
pub fn step(
    terrain: &TerrainState,
    water: &mut WaterState,
    atmosphere: &AtmosphereState,
    biome: &BiomeState,
    structure_modifier: &Grid2<f32>,
    config: &EngineConfig,
    heat: f32,
) {
    let width = water.water_grid.width();
    let height = water.water_grid.height();

    for y in 0..height {
        for x in 0..width {
            let humidity = *atmosphere.humidity_grid.get(x, y);
            let wind_speed = atmosphere.wind_grid.get(x, y).magnitude();
            let kind = *biome.kind_grid.get(x, y);

            let rate = base_evap(kind)
                * heat
                * evap_modifier(humidity, wind_speed, config)
                * *structure_modifier.get(x, y);

            if rate <= 0.0 {
                continue;
            }

            let surface = *water.water_grid.get(x, y);
            let from_surface = (rate.floor() as i32).min(surface).max(0);
            let mut removed = from_surface;
            if from_surface > 0 {
                *water.water_grid.get_mut(x, y) -= from_surface;
            }

            let remainder = rate - from_surface as f32;
            if surface - from_surface <= 0 && remainder > 0.0 {
                if let Some(layer) = terrain.topmost_nonempty(x, y) {
                    let l = layer as usize;
                    let soil_water = *water.subsurface_water_grid.get(l, x, y);
                    let scaled =
                        ((remainder * config.evaporation_soil_blend_scale).floor() as i32)
                            .min(soil_water)
                            .max(0);
                    if scaled > 0 {
                        *water.subsurface_water_grid.get_mut(l, x, y) -= scaled;
                        removed += scaled;
                    }
                }
            }

            if removed > 0 {
                water.pool.deposit_atmospheric(removed as i64);
            }
        }
    }
}
