// ABOUTME: Validated player mutation entry points — dig, raise/lower, pour/collect, build/demolish, survey
// ABOUTME: Every entry point returns a two-variant ActionOutcome; internal code never fails outward

use std::collections::HashSet;

use crate::engine::config::EngineConfig;
use crate::engine::core::grid::Grid2;
use crate::engine::state::biome::BiomeState;
use crate::engine::state::events::{Event, EventKind, EventLog};
use crate::engine::state::structures::{Structure, StructureId, StructureKind};
use crate::engine::state::terrain::{SoilLayer, TerrainState};
use crate::engine::state::water::WaterState;

#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    Accepted(String),
    Refused(RefusalReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefusalReason {
    OutOfBounds,
    NegativeAmount,
    BedrockFloor,
    CellOccupied,
    CellEmpty,
    InsufficientInventory,
    InsufficientWaterAtCell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrenchDirection {
    East,
    South,
    West,
    North,
}

impl TrenchDirection {
    fn offset(self) -> (i64, i64) {
        match self {
            TrenchDirection::East => (1, 0),
            TrenchDirection::South => (0, 1),
            TrenchDirection::West => (-1, 0),
            TrenchDirection::North => (0, -1),
        }
    }

    fn perpendicular_offsets(self) -> ((i64, i64), (i64, i64)) {
        match self {
            TrenchDirection::East | TrenchDirection::West => ((0, -1), (0, 1)),
            TrenchDirection::South | TrenchDirection::North => ((-1, 0), (1, 0)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrenchMode {
    Flat,
    SlopeDown,
    SlopeUp,
}

fn target_elevation(mode: TrenchMode, origin_elevation: i32, index: usize) -> i32 {
    match mode {
        TrenchMode::Flat => origin_elevation,
        TrenchMode::SlopeDown => origin_elevation - index as i32,
        TrenchMode::SlopeUp => origin_elevation + index as i32,
    }
}

fn in_bounds(width: usize, height: usize, x: i64, y: i64) -> Option<(usize, usize)> {
    if x >= 0 && y >= 0 && (x as usize) < width && (y as usize) < height {
        Some((x as usize, y as usize))
    } else {
        None
    }
}

/// Removes up to `amount` of depth from a cell's topmost non-empty layer,
/// cascading downward, and finally lowering `bedrock_base` itself down to
/// `min_floor`. Returns the amount actually removed.
fn remove_depth(terrain: &mut TerrainState, cell: (usize, usize), amount: i32, min_floor: i32) -> i32 {
    let (x, y) = cell;
    let mut remaining = amount;
    let mut removed_total = 0;

    while remaining > 0 {
        if let Some(layer) = terrain.topmost_nonempty(x, y) {
            let depth = *terrain.terrain_layers.get(layer as usize, x, y);
            let take = depth.min(remaining);
            terrain.set_layer_depth(layer, x, y, depth - take);
            remaining -= take;
            removed_total += take;
        } else {
            let current = *terrain.bedrock_base.get(x, y);
            let take = (current - min_floor).max(0).min(remaining);
            if take == 0 {
                break;
            }
            terrain.bedrock_base.set(x, y, current - take);
            terrain.mark_changed();
            remaining -= take;
            removed_total += take;
        }
    }
    removed_total
}

/// Deposits `amount` of depth into a cell's topmost non-empty layer,
/// defaulting to Topsoil when the cell is bare.
fn deposit_depth(terrain: &mut TerrainState, cell: (usize, usize), amount: i32) {
    if amount <= 0 {
        return;
    }
    let (x, y) = cell;
    let layer = terrain.topmost_nonempty(x, y).unwrap_or(SoilLayer::Topsoil);
    let depth = *terrain.terrain_layers.get(layer as usize, x, y);
    terrain.set_layer_depth(layer, x, y, depth + amount);
}

/// Removes a volume of material along a short strip, redistributing it to
/// the strip's perpendicular neighbors (or, for `SlopeUp`, partly into the
/// exit cell) so the total volume removed equals the total volume deposited.
pub fn dig_trench(
    terrain: &mut TerrainState,
    config: &EngineConfig,
    origin: (usize, usize),
    direction: TrenchDirection,
    mode: TrenchMode,
    length: usize,
    dirty_cells: &mut HashSet<(u32, u32)>,
) -> ActionOutcome {
    let width = terrain.elevation_grid.width();
    let height = terrain.elevation_grid.height();

    if length == 0 {
        return ActionOutcome::Refused(RefusalReason::NegativeAmount);
    }
    if origin.0 >= width || origin.1 >= height {
        return ActionOutcome::Refused(RefusalReason::OutOfBounds);
    }

    let (dx, dy) = direction.offset();
    let (perp_a, perp_b) = direction.perpendicular_offsets();
    let mut strip = Vec::with_capacity(length);
    let mut sides = Vec::with_capacity(length);

    for i in 0..length {
        let x = origin.0 as i64 + dx * i as i64;
        let y = origin.1 as i64 + dy * i as i64;
        let Some(cell) = in_bounds(width, height, x, y) else {
            return ActionOutcome::Refused(RefusalReason::OutOfBounds);
        };
        let Some(side_a) = in_bounds(width, height, x + perp_a.0, y + perp_a.1) else {
            return ActionOutcome::Refused(RefusalReason::OutOfBounds);
        };
        let Some(side_b) = in_bounds(width, height, x + perp_b.0, y + perp_b.1) else {
            return ActionOutcome::Refused(RefusalReason::OutOfBounds);
        };
        strip.push(cell);
        sides.push((side_a, side_b));
    }

    let origin_elevation = *terrain.elevation_grid.get(origin.0, origin.1);
    let exit_index = length - 1;
    let exit_cell = strip[exit_index];
    let exit_target = target_elevation(mode, origin_elevation, exit_index);
    let exit_current = *terrain.elevation_grid.get(exit_cell.0, exit_cell.1);
    let mut exit_deficit = (exit_target - exit_current).max(0);

    let mut removals: Vec<(usize, i32)> = Vec::new();
    for (i, &cell) in strip.iter().enumerate() {
        let current = *terrain.elevation_grid.get(cell.0, cell.1);
        let target = target_elevation(mode, origin_elevation, i);
        if current > target {
            let excess = current - target;
            let removed = remove_depth(terrain, cell, excess, config.min_bedrock_elevation);
            if removed > 0 {
                removals.push((i, removed));
            }
        }
    }

    for (_, amount) in removals.iter_mut().rev() {
        if exit_deficit == 0 {
            break;
        }
        let take = (*amount).min(exit_deficit);
        if take > 0 {
            *amount -= take;
            exit_deficit -= take;
            deposit_depth(terrain, exit_cell, take);
            dirty_cells.insert((exit_cell.0 as u32, exit_cell.1 as u32));
        }
    }

    for (i, amount) in removals {
        if amount == 0 {
            continue;
        }
        let half = amount / 2;
        let remainder = amount - half * 2;
        let (side_a, side_b) = sides[i];
        deposit_depth(terrain, side_a, half + remainder);
        deposit_depth(terrain, side_b, half);
        dirty_cells.insert((side_a.0 as u32, side_a.1 as u32));
        dirty_cells.insert((side_b.0 as u32, side_b.1 as u32));
        dirty_cells.insert((strip[i].0 as u32, strip[i].1 as u32));
    }

    terrain.rebuild_if_dirty();
    ActionOutcome::Accepted(format!("trench dug from ({}, {})", origin.0, origin.1))
}

pub fn lower_ground(
    terrain: &mut TerrainState,
    config: &EngineConfig,
    cell: (usize, usize),
    dirty_cells: &mut HashSet<(u32, u32)>,
) -> ActionOutcome {
    let (x, y) = cell;
    if x >= terrain.elevation_grid.width() || y >= terrain.elevation_grid.height() {
        return ActionOutcome::Refused(RefusalReason::OutOfBounds);
    }
    if let Some(layer) = terrain.topmost_nonempty(x, y) {
        let depth = *terrain.terrain_layers.get(layer as usize, x, y);
        terrain.set_layer_depth(layer, x, y, depth - 1);
    } else {
        let current = *terrain.bedrock_base.get(x, y);
        if current - 1 < config.min_bedrock_elevation {
            return ActionOutcome::Refused(RefusalReason::BedrockFloor);
        }
        terrain.bedrock_base.set(x, y, current - 1);
        terrain.mark_changed();
    }
    terrain.rebuild_if_dirty();
    dirty_cells.insert((x as u32, y as u32));
    ActionOutcome::Accepted(format!("lowered ({x}, {y})"))
}

pub fn raise_ground(
    terrain: &mut TerrainState,
    cell: (usize, usize),
    dirty_cells: &mut HashSet<(u32, u32)>,
) -> ActionOutcome {
    let (x, y) = cell;
    if x >= terrain.elevation_grid.width() || y >= terrain.elevation_grid.height() {
        return ActionOutcome::Refused(RefusalReason::OutOfBounds);
    }
    let layer = terrain.topmost_nonempty(x, y).unwrap_or(SoilLayer::Topsoil);
    let depth = *terrain.terrain_layers.get(layer as usize, x, y);
    terrain.set_layer_depth(layer, x, y, depth + 1);
    terrain.rebuild_if_dirty();
    dirty_cells.insert((x as u32, y as u32));
    ActionOutcome::Accepted(format!("raised ({x}, {y})"))
}

pub fn pour_water(
    water: &mut WaterState,
    cell: (usize, usize),
    amount: i32,
    inventory: &mut i32,
) -> ActionOutcome {
    let (x, y) = cell;
    if x >= water.water_grid.width() || y >= water.water_grid.height() {
        return ActionOutcome::Refused(RefusalReason::OutOfBounds);
    }
    if amount < 0 {
        return ActionOutcome::Refused(RefusalReason::NegativeAmount);
    }
    if amount > *inventory {
        return ActionOutcome::Refused(RefusalReason::InsufficientInventory);
    }
    *inventory -= amount;
    *water.water_grid.get_mut(x, y) += amount;
    ActionOutcome::Accepted(format!("poured {amount} units at ({x}, {y})"))
}

pub fn collect_water(
    water: &mut WaterState,
    cell: (usize, usize),
    amount: i32,
    inventory: &mut i32,
) -> ActionOutcome {
    let (x, y) = cell;
    if x >= water.water_grid.width() || y >= water.water_grid.height() {
        return ActionOutcome::Refused(RefusalReason::OutOfBounds);
    }
    if amount < 0 {
        return ActionOutcome::Refused(RefusalReason::NegativeAmount);
    }
    let available = *water.water_grid.get(x, y);
    if amount > available {
        return ActionOutcome::Refused(RefusalReason::InsufficientWaterAtCell);
    }
    *water.water_grid.get_mut(x, y) -= amount;
    *inventory += amount;
    ActionOutcome::Accepted(format!("collected {amount} units from ({x}, {y})"))
}

pub fn build(
    cell: (usize, usize),
    kind: StructureKind,
    structures: &mut Vec<Structure>,
    structure_id_grid: &mut Grid2<Option<StructureId>>,
    next_id: &mut StructureId,
    events: &mut EventLog,
    tick: u64,
) -> ActionOutcome {
    let (x, y) = cell;
    if x >= structure_id_grid.width() || y >= structure_id_grid.height() {
        return ActionOutcome::Refused(RefusalReason::OutOfBounds);
    }
    if structure_id_grid.get(x, y).is_some() {
        return ActionOutcome::Refused(RefusalReason::CellOccupied);
    }
    let id = *next_id;
    *next_id += 1;
    let description = format!("built structure {id} at ({x}, {y})");
    structure_id_grid.set(x, y, Some(id));
    structures.push(Structure { id, cell, kind });
    events.push(Event {
        tick,
        kind: EventKind::StructureBuilt,
        cell: Some((x as u32, y as u32)),
        amount: None,
        message: description.clone(),
    });
    ActionOutcome::Accepted(description)
}

pub fn demolish(
    cell: (usize, usize),
    structures: &mut Vec<Structure>,
    structure_id_grid: &mut Grid2<Option<StructureId>>,
    events: &mut EventLog,
    tick: u64,
) -> ActionOutcome {
    let (x, y) = cell;
    if x >= structure_id_grid.width() || y >= structure_id_grid.height() {
        return ActionOutcome::Refused(RefusalReason::OutOfBounds);
    }
    let Some(id) = *structure_id_grid.get(x, y) else {
        return ActionOutcome::Refused(RefusalReason::CellEmpty);
    };
    if let Some(index) = structures.iter().position(|s| s.id == id) {
        let structure = structures.remove(index);
        structure.demolish(structure_id_grid);
    } else {
        structure_id_grid.set(x, y, None);
    }
    events.push(Event {
        tick,
        kind: EventKind::StructureDemolished,
        cell: Some((x as u32, y as u32)),
        amount: None,
        message: format!("demolished structure {id} at ({x}, {y})"),
    });
    ActionOutcome::Accepted(format!("demolished structure {id} at ({x}, {y})"))
}

pub fn survey(
    terrain: &TerrainState,
    water: &WaterState,
    biome: &BiomeState,
    cell: (usize, usize),
) -> ActionOutcome {
    let (x, y) = cell;
    if x >= terrain.elevation_grid.width() || y >= terrain.elevation_grid.height() {
        return ActionOutcome::Refused(RefusalReason::OutOfBounds);
    }
    let elevation = *terrain.elevation_grid.get(x, y);
    let surface_water = *water.water_grid.get(x, y);
    let kind = *biome.kind_grid.get(x, y);
    let topmost = terrain.topmost_nonempty(x, y);
    ActionOutcome::Accepted(format!(
        "({x}, {y}): elevation {elevation}, surface water {surface_water}, biome {kind:?}, topmost layer {topmost:?}"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dig_trench_flat_conserves_total_volume() {
        let mut terrain = TerrainState::new(5, 3);
        let elevations = [12, 11, 10, 12, 10];
        for (i, &e) in elevations.iter().enumerate() {
            terrain.bedrock_base.set(i, 1, e);
        }
        terrain.rebuild_if_dirty();
        let config = EngineConfig::default();
        let mut dirty = HashSet::new();

        let before: i32 = (0..5)
            .flat_map(|x| [(x, 0), (x, 1), (x, 2)])
            .map(|(x, y)| *terrain.elevation_grid.get(x, y))
            .sum();

        let outcome = dig_trench(
            &mut terrain,
            &config,
            (0, 1),
            TrenchDirection::East,
            TrenchMode::Flat,
            5,
            &mut dirty,
        );
        assert!(matches!(outcome, ActionOutcome::Accepted(_)));

        let after: i32 = (0..5)
            .flat_map(|x| [(x, 0), (x, 1), (x, 2)])
            .map(|(x, y)| *terrain.elevation_grid.get(x, y))
            .sum();
        assert_eq!(before, after);

        for x in 0..5 {
            assert!(*terrain.elevation_grid.get(x, 1) <= 12);
        }
        assert_eq!(*terrain.elevation_grid.get(0, 1), 12);
    }

    #[test]
    fn dig_trench_out_of_bounds_is_refused_without_mutation() {
        let mut terrain = TerrainState::new(3, 3);
        terrain.bedrock_base.set(0, 1, 10);
        terrain.rebuild_if_dirty();
        let config = EngineConfig::default();
        let mut dirty = HashSet::new();
        let before = terrain.clone();

        let outcome = dig_trench(
            &mut terrain,
            &config,
            (0, 1),
            TrenchDirection::East,
            TrenchMode::Flat,
            10,
            &mut dirty,
        );
        assert_eq!(outcome, ActionOutcome::Refused(RefusalReason::OutOfBounds));
        assert_eq!(terrain.elevation_grid, before.elevation_grid);
    }

    #[test]
    fn lower_ground_refuses_below_bedrock_floor() {
        let mut terrain = TerrainState::new(1, 1);
        terrain.bedrock_base.set(0, 0, -20);
        terrain.rebuild_if_dirty();
        let config = EngineConfig {
            min_bedrock_elevation: -20,
            ..EngineConfig::default()
        };
        let mut dirty = HashSet::new();
        let outcome = lower_ground(&mut terrain, &config, (0, 0), &mut dirty);
        assert_eq!(outcome, ActionOutcome::Refused(RefusalReason::BedrockFloor));
    }

    #[test]
    fn raise_ground_creates_topsoil_on_bare_cell() {
        let mut terrain = TerrainState::new(1, 1);
        let mut dirty = HashSet::new();
        raise_ground(&mut terrain, (0, 0), &mut dirty);
        assert_eq!(*terrain.terrain_layers.get(SoilLayer::Topsoil as usize, 0, 0), 1);
    }

    #[test]
    fn pour_then_collect_round_trips_through_inventory() {
        let mut water = WaterState::new(1, 1, 0);
        let mut inventory = 10;
        let outcome = pour_water(&mut water, (0, 0), 7, &mut inventory);
        assert!(matches!(outcome, ActionOutcome::Accepted(_)));
        assert_eq!(inventory, 3);
        assert_eq!(*water.water_grid.get(0, 0), 7);

        let outcome = collect_water(&mut water, (0, 0), 7, &mut inventory);
        assert!(matches!(outcome, ActionOutcome::Accepted(_)));
        assert_eq!(inventory, 10);
        assert_eq!(*water.water_grid.get(0, 0), 0);
    }

    #[test]
    fn pour_more_than_inventory_is_refused() {
        let mut water = WaterState::new(1, 1, 0);
        let mut inventory = 2;
        let outcome = pour_water(&mut water, (0, 0), 5, &mut inventory);
        assert_eq!(outcome, ActionOutcome::Refused(RefusalReason::InsufficientInventory));
    }

    #[test]
    fn build_refuses_occupied_cell_then_demolish_clears_it() {
        let mut structures = Vec::new();
        let mut grid = Grid2::new(2, 2, None);
        let mut next_id = 0;
        let mut events = EventLog::new(8);

        let outcome = build(
            (0, 0),
            StructureKind::Depot,
            &mut structures,
            &mut grid,
            &mut next_id,
            &mut events,
            0,
        );
        assert!(matches!(outcome, ActionOutcome::Accepted(_)));

        let outcome = build(
            (0, 0),
            StructureKind::Depot,
            &mut structures,
            &mut grid,
            &mut next_id,
            &mut events,
            0,
        );
        assert_eq!(outcome, ActionOutcome::Refused(RefusalReason::CellOccupied));

        let outcome = demolish((0, 0), &mut structures, &mut grid, &mut events, 0);
        assert!(matches!(outcome, ActionOutcome::Accepted(_)));
        assert!(grid.get(0, 0).is_none());
        assert!(structures.is_empty());
    }

    #[test]
    fn survey_never_mutates_state() {
        let terrain = TerrainState::new(1, 1);
        let water = WaterState::new(1, 1, 0);
        let biome = BiomeState::new(1, 1);
        let before_water = water.water_grid.clone();
        let outcome = survey(&terrain, &water, &biome, (0, 0));
        assert!(matches!(outcome, ActionOutcome::Accepted(_)));
        assert_eq!(water.water_grid, before_water);
    }
}
