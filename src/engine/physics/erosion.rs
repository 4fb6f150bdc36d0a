// ABOUTME: Overnight material transport driven by the day's water-passage and wind-exposure accumulators
// ABOUTME: Hydraulic erosion always runs; wind erosion is gated by config.erosion_wind_enabled

use crate::engine::config::EngineConfig;
use crate::engine::core::math::{Vec2, NEIGHBORS_8};
use crate::engine::state::atmosphere::AtmosphereState;
use crate::engine::state::biome::BiomeState;
use crate::engine::state::events::{Event, EventKind, EventLog};
use crate::engine::state::terrain::{SoilLayer, TerrainState};
use crate::engine::state::water::WaterState;

struct Transport {
    source: (usize, usize),
    source_layer: SoilLayer,
    target: (usize, usize),
    target_layer: SoilLayer,
    amount: i32,
}

pub fn step(
    terrain: &mut TerrainState,
    water: &WaterState,
    atmosphere: &AtmosphereState,
    biome: &BiomeState,
    config: &EngineConfig,
    events: &mut EventLog,
    tick: u64,
) {
    let hydraulic = collect_hydraulic(terrain, biome, config);
    apply_transports(terrain, &hydraulic, events, tick, EventKind::ErosionEvent);

    if config.erosion_wind_enabled {
        let wind = collect_wind(terrain, water, atmosphere, biome, config);
        apply_transports(terrain, &wind, events, tick, EventKind::ErosionEvent);
    }
}

fn steepest_downhill(terrain: &TerrainState, x: usize, y: usize) -> Option<(usize, usize)> {
    let width = terrain.elevation_grid.width();
    let height = terrain.elevation_grid.height();
    let here = *terrain.elevation_grid.get(x, y);
    let mut best: Option<((usize, usize), i32)> = None;
    for (dx, dy, _) in NEIGHBORS_8 {
        let nx = x as i64 + dx;
        let ny = y as i64 + dy;
        if nx < 0 || ny < 0 || nx as usize >= width || ny as usize >= height {
            continue;
        }
        let (nx, ny) = (nx as usize, ny as usize);
        let drop = here - *terrain.elevation_grid.get(nx, ny);
        if drop <= 0 {
            continue;
        }
        match best {
            Some((_, best_drop)) if best_drop >= drop => {}
            _ => best = Some(((nx, ny), drop)),
        }
    }
    best.map(|(coord, _)| coord)
}

/// Nearest of the 8 discrete directions to `wind`, by dot product; ties break
/// lexicographically by `NEIGHBORS_8` order, same as `steepest_downhill`.
fn downwind_neighbor(width: usize, height: usize, x: usize, y: usize, wind: Vec2) -> Option<(usize, usize)> {
    if wind.magnitude() <= f32::EPSILON {
        return None;
    }
    let mut best: Option<((usize, usize), f32)> = None;
    for (dx, dy, _) in NEIGHBORS_8 {
        let nx = x as i64 + dx;
        let ny = y as i64 + dy;
        if nx < 0 || ny < 0 || nx as usize >= width || ny as usize >= height {
            continue;
        }
        let dot = wind.x * dx as f32 + wind.y * dy as f32;
        if dot <= 0.0 {
            continue;
        }
        match best {
            Some((_, best_dot)) if best_dot >= dot => {}
            _ => best = Some(((nx as usize, ny as usize), dot)),
        }
    }
    best.map(|(coord, _)| coord)
}

fn collect_hydraulic(terrain: &TerrainState, biome: &BiomeState, config: &EngineConfig) -> Vec<Transport> {
    let width = terrain.elevation_grid.width();
    let height = terrain.elevation_grid.height();
    let mut transports = Vec::new();

    for y in 0..height {
        for x in 0..width {
            let passage = *biome.water_passage.get(x, y);
            if passage <= config.erosion_threshold_water {
                continue;
            }
            let Some(source_layer) = terrain.topmost_nonempty(x, y) else {
                continue;
            };
            let Some(target) = steepest_downhill(terrain, x, y) else {
                continue;
            };
            let depth = *terrain.terrain_layers.get(source_layer as usize, x, y);
            let amount = (((passage - config.erosion_threshold_water) * config.erosion_hydraulic_rate)
                .floor() as i32)
                .min(depth)
                .max(0);
            if amount == 0 {
                continue;
            }
            let target_layer = terrain
                .topmost_nonempty(target.0, target.1)
                .unwrap_or(SoilLayer::Regolith);
            transports.push(Transport {
                source: (x, y),
                source_layer,
                target,
                target_layer,
                amount,
            });
        }
    }
    transports
}

fn collect_wind(
    terrain: &TerrainState,
    water: &WaterState,
    atmosphere: &AtmosphereState,
    biome: &BiomeState,
    config: &EngineConfig,
) -> Vec<Transport> {
    let width = terrain.elevation_grid.width();
    let height = terrain.elevation_grid.height();
    let mean_elevation = terrain.elevation_grid.sum() as f32 / (width * height).max(1) as f32;
    let mut transports = Vec::new();

    for y in 0..height {
        for x in 0..width {
            let exposure = *biome.wind_exposure.get(x, y);
            if exposure <= config.erosion_threshold_wind {
                continue;
            }
            let elevation = *terrain.elevation_grid.get(x, y) as f32;
            if elevation <= mean_elevation {
                continue;
            }
            let Some(source_layer) = terrain.topmost_nonempty(x, y) else {
                continue;
            };
            if *water.subsurface_water_grid.get(source_layer as usize, x, y) > 0 {
                continue;
            }
            let wind = *atmosphere.wind_grid.get(x, y);
            let Some(target) = downwind_neighbor(width, height, x, y, wind) else {
                continue;
            };
            let depth = *terrain.terrain_layers.get(source_layer as usize, x, y);
            let amount = (((exposure - config.erosion_threshold_wind) * config.erosion_wind_rate).floor()
                as i32)
                .min(depth)
                .max(0);
            if amount == 0 {
                continue;
            }
            let target_layer = terrain
                .topmost_nonempty(target.0, target.1)
                .unwrap_or(SoilLayer::Regolith);
            transports.push(Transport {
                source: (x, y),
                source_layer,
                target,
                target_layer,
                amount,
            });
        }
    }
    transports
}

fn apply_transports(
    terrain: &mut TerrainState,
    transports: &[Transport],
    events: &mut EventLog,
    tick: u64,
    kind: EventKind,
) {
    for transport in transports {
        let (sx, sy) = transport.source;
        let (tx, ty) = transport.target;
        let source_depth = *terrain.terrain_layers.get(transport.source_layer as usize, sx, sy);
        terrain.set_layer_depth(transport.source_layer, sx, sy, source_depth - transport.amount);
        let target_depth = *terrain.terrain_layers.get(transport.target_layer as usize, tx, ty);
        terrain.set_layer_depth(transport.target_layer, tx, ty, target_depth + transport.amount);

        events.push(Event {
            tick,
            kind,
            cell: Some((sx as u32, sy as u32)),
            amount: Some(transport.amount as f32),
            message: format!("eroded {} units toward ({tx}, {ty})", transport.amount),
        });
    }
    terrain.rebuild_if_dirty();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(w: usize, h: usize) -> (TerrainState, WaterState, AtmosphereState, BiomeState, EngineConfig, EventLog) {
        (
            TerrainState::new(w, h),
            WaterState::new(w, h, 0),
            AtmosphereState::new(w, h),
            BiomeState::new(w, h),
            EngineConfig::default(),
            EventLog::new(16),
        )
    }

    #[test]
    fn hydraulic_erosion_moves_material_toward_downhill_neighbor() {
        let (mut terrain, water, atmosphere, mut biome, config, mut events) = fixture(2, 1);
        terrain.set_layer_depth(SoilLayer::Topsoil, 0, 0, 10);
        terrain.set_layer_depth(SoilLayer::Topsoil, 1, 0, 10);
        terrain.bedrock_base.set(0, 0, 5);
        terrain.rebuild_if_dirty();
        biome.water_passage.set(0, 0, config.erosion_threshold_water + 10.0);

        let before: i32 = (0..2).map(|x| *terrain.terrain_layers.get(SoilLayer::Topsoil as usize, x, 0)).sum();
        step(&mut terrain, &water, &atmosphere, &biome, &config, &mut events, 0);
        let after: i32 = (0..2).map(|x| *terrain.terrain_layers.get(SoilLayer::Topsoil as usize, x, 0)).sum();

        assert_eq!(before, after);
        assert!(*terrain.terrain_layers.get(SoilLayer::Topsoil as usize, 0, 0) < 10);
        assert!(*terrain.terrain_layers.get(SoilLayer::Topsoil as usize, 1, 0) > 10);
    }

    #[test]
    fn below_threshold_passage_causes_no_erosion() {
        let (mut terrain, water, atmosphere, mut biome, config, mut events) = fixture(2, 1);
        terrain.set_layer_depth(SoilLayer::Topsoil, 0, 0, 10);
        terrain.bedrock_base.set(0, 0, 5);
        terrain.rebuild_if_dirty();
        biome.water_passage.set(0, 0, config.erosion_threshold_water - 1.0);

        step(&mut terrain, &water, &atmosphere, &biome, &config, &mut events, 0);
        assert_eq!(*terrain.terrain_layers.get(SoilLayer::Topsoil as usize, 0, 0), 10);
    }

    #[test]
    fn wind_erosion_disabled_by_config_is_skipped() {
        let (mut terrain, mut water, mut atmosphere, mut biome, mut config, mut events) = fixture(2, 1);
        config.erosion_wind_enabled = false;
        terrain.set_layer_depth(SoilLayer::Topsoil, 0, 0, 10);
        terrain.bedrock_base.set(0, 0, 100);
        terrain.rebuild_if_dirty();
        biome.wind_exposure.set(0, 0, config.erosion_threshold_wind + 10.0);
        atmosphere.wind_grid.set(0, 0, Vec2::new(1.0, 0.0));
        water.subsurface_water_grid.set(SoilLayer::Topsoil as usize, 0, 0, 0);

        step(&mut terrain, &water, &atmosphere, &biome, &config, &mut events, 0);
        assert_eq!(*terrain.terrain_layers.get(SoilLayer::Topsoil as usize, 0, 0), 10);
    }
}
