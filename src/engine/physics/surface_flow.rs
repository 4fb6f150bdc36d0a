// ABOUTME: 8-neighbor gravity-driven redistribution of surface water
// ABOUTME: Computes transfers against a start-of-tick snapshot so updates are simultaneous, not sequential

use crate::engine::config::EngineConfig;
use crate::engine::core::grid::Grid2;
use crate::engine::core::math::NEIGHBORS_8;
use crate::engine::state::biome::BiomeState;
use crate::engine::state::events::{Event, EventKind, EventLog};
use crate::engine::state::terrain::TerrainState;
use crate::engine::state::water::WaterState;

/// Redistributes surface water toward lower-total-head neighbors.
///
/// `total head` is `elevation + water` at the start of the tick; all eight
/// transfers out of a cell are computed from that single snapshot and
/// written into a fresh buffer, so no cell ever sees a neighbor's
/// already-updated value mid-pass (engine specification §5: "simultaneous
/// update stencils compute from a snapshot and write to a new buffer").
pub fn step(
    terrain: &TerrainState,
    water: &mut WaterState,
    biome: &mut BiomeState,
    config: &EngineConfig,
    events: &mut EventLog,
    tick: u64,
) {
    let width = water.water_grid.width();
    let height = water.water_grid.height();
    let snapshot = water.water_grid.clone();
    let mut next = snapshot.clone();
    let mut edge_runoff = 0i64;

    for y in 0..height {
        for x in 0..width {
            let source_water = *snapshot.get(x, y);
            if source_water <= 0 {
                continue;
            }
            let head_here = *terrain.elevation_grid.get(x, y) + source_water;

            for (dx, dy, diagonal) in NEIGHBORS_8 {
                let nx = x as i64 + dx;
                let ny = y as i64 + dy;

                let neighbor_head = if snapshot.in_bounds(nx, ny) {
                    *terrain.elevation_grid.get(nx as usize, ny as usize)
                        + *snapshot.get(nx as usize, ny as usize)
                } else {
                    // Treat off-grid as a head of negative infinity's worth
                    // of water by only gating on elevation at the edge; the
                    // delta below still uses the real head_here.
                    i32::MIN
                };

                if neighbor_head == i32::MIN {
                    // Edge direction: still subject to the threshold using
                    // the edge cell's own head as if the far side were at
                    // bedrock-minimum elevation, conservatively treated the
                    // same as any steep downhill neighbor.
                    let delta = head_here - *terrain.elevation_grid.get(x, y);
                    if delta > config.surface_flow_threshold {
                        let base = (source_water as f32 / 8.0)
                            .min((delta as f32 * config.surface_flow_rate).floor());
                        let amount = if diagonal {
                            (base * config.surface_flow_diagonal_factor).floor()
                        } else {
                            base.floor()
                        };
                        let amount = amount.max(0.0) as i32;
                        if amount > 0 {
                            *next.get_mut(x, y) -= amount;
                            edge_runoff += amount as i64;
                            *biome.water_passage.get_mut(x, y) += amount as f32;
                        }
                    }
                    continue;
                }

                let delta = head_here - neighbor_head;
                if delta > config.surface_flow_threshold {
                    let base = (source_water as f32 / 8.0)
                        .min((delta as f32 * config.surface_flow_rate).floor());
                    let amount = if diagonal {
                        (base * config.surface_flow_diagonal_factor).floor()
                    } else {
                        base.floor()
                    };
                    let amount = amount.max(0.0) as i32;
                    if amount > 0 {
                        *next.get_mut(x, y) -= amount;
                        *next.get_mut(nx as usize, ny as usize) += amount;
                        *biome.water_passage.get_mut(x, y) += amount as f32;
                    }
                }
            }
        }
    }

    if edge_runoff > 0 {
        water.pool.deposit_edge_runoff(edge_runoff);
        events.push(Event {
            tick,
            kind: EventKind::EdgeRunoff,
            cell: None,
            amount: Some(edge_runoff as f32),
            message: format!("{edge_runoff} units of surface water left the grid"),
        });
    }

    water.water_grid = clamp_non_negative(next);
}

fn clamp_non_negative(mut grid: Grid2<i32>) -> Grid2<i32> {
    for v in grid.iter_mut() {
        if *v < 0 {
            *v = 0;
        }
    }
    grid
}
