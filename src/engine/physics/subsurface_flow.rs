// ABOUTME: Layered vertical (gravity/capillary) and horizontal (Darcy-style) subsurface water transfer
// ABOUTME: Three sub-phases on fresh snapshots each, finished by a bottom-up overflow cascade

use crate::engine::config::EngineConfig;
use crate::engine::core::grid::Grid3;
use crate::engine::core::math::NEIGHBORS_4;
use crate::engine::state::events::{Event, EventKind, EventLog};
use crate::engine::state::terrain::{SoilLayer, TerrainState, LAYER_COUNT};
use crate::engine::state::water::WaterState;

/// Layer water is injected into when a wellspring fires.
pub const INJECTION_LAYER: SoilLayer = SoilLayer::Regolith;

pub fn step(
    terrain: &TerrainState,
    water: &mut WaterState,
    config: &EngineConfig,
    events: &mut EventLog,
    tick: u64,
) {
    inject_wellsprings(terrain, water, events, tick);
    vertical_transfer(terrain, water, config);
    horizontal_transfer(terrain, water, config, events, tick);
    overflow_cascade(terrain, water);
}

fn inject_wellsprings(_terrain: &TerrainState, water: &mut WaterState, events: &mut EventLog, tick: u64) {
    let width = water.wellspring_grid.width();
    let height = water.wellspring_grid.height();
    let layer = INJECTION_LAYER as usize;

    for y in 0..height {
        for x in 0..width {
            let requested = *water.wellspring_grid.get(x, y);
            if requested <= 0 {
                continue;
            }
            let granted = water.pool.draw(requested as i64) as i32;
            if granted > 0 {
                // Deposit the whole draw; overflow_cascade (run later this
                // step) spills anything past the injection layer's capacity
                // upward instead of discarding it.
                *water.subsurface_water_grid.get_mut(layer, x, y) += granted;
            }
            if (granted as i64) < requested as i64 {
                events.push(Event {
                    tick,
                    kind: EventKind::WellspringDry,
                    cell: Some((x as u32, y as u32)),
                    amount: Some((requested as i64 - granted as i64) as f32),
                    message: "wellspring output reduced: free reserve exhausted".to_string(),
                });
            }
        }
    }
}

fn vertical_transfer(terrain: &TerrainState, water: &mut WaterState, config: &EngineConfig) {
    let width = water.subsurface_water_grid.width();
    let height = water.subsurface_water_grid.height();
    let snapshot = water.subsurface_water_grid.clone();
    let mut delta = Grid3::new(LAYER_COUNT, width, height, 0i32);
    // A layer acts as the upper half of one pair and the lower half of the
    // next as `u` advances, so its two possible outflows (gravitational
    // down, capillary up) must share one budget instead of each being
    // capped against the untouched snapshot value.
    let mut outflow = Grid3::new(LAYER_COUNT, width, height, 0i32);

    for u in 1..LAYER_COUNT {
        let l = u - 1;
        for y in 0..height {
            for x in 0..width {
                let water_u = *snapshot.get(u, x, y);
                let water_l = *snapshot.get(l, x, y);
                let avail_u = (water_u - *outflow.get(u, x, y)).max(0);
                let avail_l = (water_l - *outflow.get(l, x, y)).max(0);

                if avail_u > 0 {
                    let perm_u = *water.permeability_vert_grid.get(u, x, y);
                    let cap_l = water.layer_capacity(&terrain.terrain_layers, l, x, y);
                    let request = ((avail_u as f32) * perm_u).floor() as i32;
                    let down = request.min(avail_u).min((cap_l - water_l).max(0)).max(0);
                    if down > 0 {
                        *delta.get_mut(u, x, y) -= down;
                        *delta.get_mut(l, x, y) += down;
                        *outflow.get_mut(u, x, y) += down;
                    }
                }

                if avail_l > 0 {
                    let cap_u = water.layer_capacity(&terrain.terrain_layers, u, x, y);
                    let weight = capillary_elevation_weight(terrain, x, y);
                    let request = ((avail_l as f32) * config.capillary_rise_rate * weight).floor() as i32;
                    let up = request.min(avail_l).min((cap_u - water_u).max(0)).max(0);
                    if up > 0 {
                        *delta.get_mut(l, x, y) -= up;
                        *delta.get_mut(u, x, y) += up;
                        *outflow.get_mut(l, x, y) += up;
                    }
                }
            }
        }
    }

    apply_delta(&mut water.subsurface_water_grid, &snapshot, &delta);
}

/// Elevation-weighted distribution rule for capillary rise (engine
/// specification §4.5a): a cell sitting below its local neighborhood draws
/// more than one sitting above it, relative to `CAPILLARY_ELEVATION_SCALE`.
const CAPILLARY_ELEVATION_SCALE: f32 = 0.02;

fn capillary_elevation_weight(terrain: &TerrainState, x: usize, y: usize) -> f32 {
    let width = terrain.elevation_grid.width() as i64;
    let height = terrain.elevation_grid.height() as i64;
    let here = *terrain.elevation_grid.get(x, y) as f32;

    let mut sum = 0.0f32;
    let mut count = 0.0f32;
    for (dx, dy) in NEIGHBORS_4 {
        let nx = x as i64 + dx;
        let ny = y as i64 + dy;
        if nx >= 0 && ny >= 0 && nx < width && ny < height {
            sum += *terrain.elevation_grid.get(nx as usize, ny as usize) as f32;
            count += 1.0;
        }
    }
    if count == 0.0 {
        return 1.0;
    }

    let neighbor_mean = sum / count;
    (1.0 + (neighbor_mean - here) * CAPILLARY_ELEVATION_SCALE).clamp(0.25, 2.5)
}

fn horizontal_transfer(
    terrain: &TerrainState,
    water: &mut WaterState,
    config: &EngineConfig,
    events: &mut EventLog,
    tick: u64,
) {
    let width = water.subsurface_water_grid.width();
    let height = water.subsurface_water_grid.height();
    let snapshot = water.subsurface_water_grid.clone();
    let mut delta = Grid3::new(LAYER_COUNT, width, height, 0i32);
    let mut edge_runoff = 0i64;

    for l in 0..LAYER_COUNT {
        for y in 0..height {
            for x in 0..width {
                let depth_here = *terrain.terrain_layers.get(l, x, y);
                if depth_here <= 0 {
                    continue;
                }
                let water_here = *snapshot.get(l, x, y);
                if water_here <= 0 {
                    continue;
                }
                let porosity_here = *water.porosity_grid.get(l, x, y);
                let head_here = *terrain.bedrock_base.get(x, y) as f32
                    + sum_layers_up_to(&terrain.terrain_layers, l, x, y) as f32
                    + water_here as f32 / (porosity_here * depth_here as f32).max(1.0);

                // Each of the up-to-4 directions is computed against what's
                // left after the earlier directions this cell already sent,
                // so the sum sent out of a cell this pass never exceeds the
                // water it actually held.
                let mut remaining = water_here;

                for (i, (dx, dy)) in NEIGHBORS_4.iter().enumerate() {
                    if remaining <= 0 {
                        break;
                    }
                    let nx = x as i64 + dx;
                    let ny = y as i64 + dy;
                    let in_bounds =
                        nx >= 0 && ny >= 0 && (nx as usize) < width && (ny as usize) < height;
                    if !in_bounds {
                        // Open boundary: losses beyond the grid edge are not
                        // gated by the connectivity cache, which only tracks
                        // in-grid neighbor validity.
                        let permeability = *water.permeability_horiz_grid.get(l, x, y);
                        let flow = (head_here * permeability * config.horiz_rate).floor() as i32;
                        let amount = flow.min(remaining).max(0);
                        if amount > 0 {
                            *delta.get_mut(l, x, y) -= amount;
                            edge_runoff += amount as i64;
                            remaining -= amount;
                        }
                        continue;
                    }
                    if !terrain.connectivity.connected(l, x, y, i) {
                        continue;
                    }
                    let (nx, ny) = (nx as usize, ny as usize);
                    let n_depth = *terrain.terrain_layers.get(l, nx, ny);
                    let n_water = *snapshot.get(l, nx, ny);
                    let n_porosity = *water.porosity_grid.get(l, nx, ny);
                    let head_neighbor = *terrain.bedrock_base.get(nx, ny) as f32
                        + sum_layers_up_to(&terrain.terrain_layers, l, nx, ny) as f32
                        + n_water as f32 / (n_porosity * n_depth as f32).max(1.0);

                    let delta_head = head_here - head_neighbor;
                    if delta_head <= 0.0 {
                        continue;
                    }
                    let permeability = *water.permeability_horiz_grid.get(l, x, y);
                    let flow = (delta_head * permeability * config.horiz_rate).floor() as i32;
                    let cap_neighbor = water.layer_capacity(&terrain.terrain_layers, l, nx, ny);
                    let amount = flow.min(remaining).min((cap_neighbor - n_water).max(0)).max(0);
                    if amount > 0 {
                        *delta.get_mut(l, x, y) -= amount;
                        *delta.get_mut(l, nx, ny) += amount;
                        remaining -= amount;
                    }
                }
            }
        }
    }

    apply_delta(&mut water.subsurface_water_grid, &snapshot, &delta);

    if edge_runoff > 0 {
        water.pool.deposit_edge_runoff(edge_runoff);
        events.push(Event {
            tick,
            kind: EventKind::EdgeRunoff,
            cell: None,
            amount: Some(edge_runoff as f32),
            message: format!("{edge_runoff} units of subsurface water left the grid"),
        });
    }
}

fn sum_layers_up_to(terrain_layers: &Grid3<i32>, l: usize, x: usize, y: usize) -> i32 {
    (0..=l).map(|k| *terrain_layers.get(k, x, y)).sum()
}

fn apply_delta(grid: &mut Grid3<i32>, snapshot: &Grid3<i32>, delta: &Grid3<i32>) {
    for l in 0..LAYER_COUNT {
        for i in 0..grid.width() * grid.height() {
            let x = i % grid.width();
            let y = i / grid.width();
            let value = (*snapshot.get(l, x, y) + *delta.get(l, x, y)).max(0);
            grid.set(l, x, y, value);
        }
    }
}

/// Bottom-up overflow cascade (engine specification §4.5c): any layer left
/// over capacity after (a)+(b) spills into the layer above, or onto the
/// surface once it exits the topmost layer.
fn overflow_cascade(terrain: &TerrainState, water: &mut WaterState) {
    let width = water.water_grid.width();
    let height = water.water_grid.height();

    for l in 0..LAYER_COUNT {
        for y in 0..height {
            for x in 0..width {
                let capacity = water.layer_capacity(&terrain.terrain_layers, l, x, y);
                let current = *water.subsurface_water_grid.get(l, x, y);
                if current > capacity {
                    let excess = current - capacity;
                    water.subsurface_water_grid.set(l, x, y, capacity);
                    if l + 1 < LAYER_COUNT {
                        *water.subsurface_water_grid.get_mut(l + 1, x, y) += excess;
                    } else {
                        *water.water_grid.get_mut(x, y) += excess;
                    }
                }
            }
        }
    }
}
