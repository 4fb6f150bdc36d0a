// ABOUTME: Wave-Function-Collapse style constraint propagation for coarse biome placement
// ABOUTME: On contradiction, re-seeds the local region with one relaxed adjacency rule before falling back

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::Rng;

use crate::engine::core::grid::Grid2;
use crate::engine::state::biome::BiomeKind;
use crate::engine::state::events::{Event, EventKind, EventLog};

const ALL_KINDS: [BiomeKind; 5] = [
    BiomeKind::Flat,
    BiomeKind::Dune,
    BiomeKind::Wadi,
    BiomeKind::Rock,
    BiomeKind::Salt,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationError {
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationPhase {
    Heightmap,
    BiomePlacement,
    LayerPopulation,
    Wellsprings,
    WaterInit,
}

/// Whether `a` may sit next to `b`. Symmetric. `relax_wadi_dune` drops the
/// Wadi/Dune exclusion, which is the constraint the local-restart path
/// relaxes first per the engine's generation-contradiction policy.
fn compatible(a: BiomeKind, b: BiomeKind, relax_wadi_dune: bool) -> bool {
    use BiomeKind::*;
    if relax_wadi_dune {
        return true;
    }
    match (a, b) {
        (Wadi, Dune) | (Dune, Wadi) => false,
        (Wadi, Salt) | (Salt, Wadi) => false,
        _ => true,
    }
}

/// Collapse weight for a candidate kind given a coarse cell's mean bedrock
/// elevation normalized to [0,1] (higher = more elevated).
fn weight_for(kind: BiomeKind, elevation_norm: f32) -> f32 {
    match kind {
        BiomeKind::Dune | BiomeKind::Rock => 0.2 + elevation_norm,
        BiomeKind::Wadi => 1.2 - elevation_norm,
        BiomeKind::Flat => 1.0,
        BiomeKind::Salt => 0.1,
    }
    .max(0.01)
}

struct Cell {
    possibilities: Vec<BiomeKind>,
}

impl Cell {
    fn full() -> Self {
        Self {
            possibilities: ALL_KINDS.to_vec(),
        }
    }

    fn collapsed(&self) -> Option<BiomeKind> {
        if self.possibilities.len() == 1 {
            Some(self.possibilities[0])
        } else {
            None
        }
    }
}

/// Runs constraint propagation over a `coarse_width`x`coarse_height` grid and
/// returns the collapsed biome tag per coarse cell.
pub fn generate_coarse_biomes(
    coarse_width: usize,
    coarse_height: usize,
    elevation_norm: &Grid2<f32>,
    max_restarts: u32,
    rng: &mut StdRng,
    events: &mut EventLog,
    mut progress: impl FnMut(GenerationPhase, f32) -> bool,
) -> Result<Grid2<BiomeKind>, GenerationError> {
    let mut cells: Vec<Cell> = (0..coarse_width * coarse_height).map(|_| Cell::full()).collect();
    let mut restarts_used = 0u32;
    let total = coarse_width * coarse_height;
    let mut collapsed_count = 0usize;

    loop {
        let next = lowest_entropy_cell(&cells, coarse_width, coarse_height);
        let Some(index) = next else { break };

        if !progress(GenerationPhase::BiomePlacement, collapsed_count as f32 / total.max(1) as f32) {
            return Err(GenerationError::Aborted);
        }

        let x = index % coarse_width;
        let y = index / coarse_width;
        let kind = collapse(&cells[index], *elevation_norm.get(x, y), rng);
        cells[index].possibilities = vec![kind];
        collapsed_count += 1;

        if let Err(contradiction_at) =
            propagate(&mut cells, coarse_width, coarse_height, index, false)
        {
            events.push(Event {
                tick: 0,
                kind: EventKind::GenerationContradiction,
                cell: Some((
                    (contradiction_at % coarse_width) as u32,
                    (contradiction_at / coarse_width) as u32,
                )),
                amount: None,
                message: "wfc contradiction, restarting local region".to_string(),
            });

            if restarts_used >= max_restarts {
                force_resolve(&mut cells, contradiction_at, *elevation_norm.get(
                    contradiction_at % coarse_width,
                    contradiction_at / coarse_width,
                ), rng);
            } else {
                restarts_used += 1;
                reset_region(&mut cells, coarse_width, coarse_height, contradiction_at);
                let _ = propagate(&mut cells, coarse_width, coarse_height, index, true);
            }
        }
    }

    progress(GenerationPhase::BiomePlacement, 1.0);

    let mut result = Grid2::new(coarse_width, coarse_height, BiomeKind::Flat);
    for y in 0..coarse_height {
        for x in 0..coarse_width {
            let i = y * coarse_width + x;
            let kind = cells[i].collapsed().unwrap_or(BiomeKind::Flat);
            result.set(x, y, kind);
        }
    }
    Ok(result)
}

fn lowest_entropy_cell(cells: &[Cell], width: usize, height: usize) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for y in 0..height {
        for x in 0..width {
            let i = y * width + x;
            let count = cells[i].possibilities.len();
            if count <= 1 {
                continue;
            }
            match best {
                Some((_, best_count)) if best_count <= count => {}
                _ => best = Some((i, count)),
            }
        }
    }
    best.map(|(i, _)| i)
}

fn collapse(cell: &Cell, elevation_norm: f32, rng: &mut StdRng) -> BiomeKind {
    let weights: Vec<f32> = cell
        .possibilities
        .iter()
        .map(|k| weight_for(*k, elevation_norm))
        .collect();
    let total: f32 = weights.iter().sum();
    let mut roll = rng.gen_range(0.0..total.max(f32::EPSILON));
    for (kind, weight) in cell.possibilities.iter().zip(weights.iter()) {
        if roll < *weight {
            return *kind;
        }
        roll -= weight;
    }
    *cell.possibilities.last().unwrap_or(&BiomeKind::Flat)
}

/// Breadth-first constraint propagation from `origin`. Returns `Err(index)`
/// of the first cell whose possibility set goes empty.
fn propagate(
    cells: &mut [Cell],
    width: usize,
    height: usize,
    origin: usize,
    relax_wadi_dune: bool,
) -> Result<(), usize> {
    let mut queue = VecDeque::new();
    queue.push_back(origin);

    while let Some(current) = queue.pop_front() {
        let current_possibilities = cells[current].possibilities.clone();
        let x = current % width;
        let y = current / width;

        for (dx, dy) in [(1i64, 0i64), (-1, 0), (0, 1), (0, -1)] {
            let nx = x as i64 + dx;
            let ny = y as i64 + dy;
            if nx < 0 || ny < 0 || nx as usize >= width || ny as usize >= height {
                continue;
            }
            let neighbor = ny as usize * width + nx as usize;
            if cells[neighbor].possibilities.len() <= 1 {
                continue;
            }

            let before = cells[neighbor].possibilities.len();
            cells[neighbor].possibilities.retain(|candidate| {
                current_possibilities
                    .iter()
                    .any(|p| compatible(*p, *candidate, relax_wadi_dune))
            });

            if cells[neighbor].possibilities.is_empty() {
                return Err(neighbor);
            }
            if cells[neighbor].possibilities.len() < before {
                queue.push_back(neighbor);
            }
        }
    }
    Ok(())
}

fn reset_region(cells: &mut [Cell], width: usize, height: usize, center: usize) {
    let cx = center % width;
    let cy = center / width;
    for dy in -1i64..=1 {
        for dx in -1i64..=1 {
            let nx = cx as i64 + dx;
            let ny = cy as i64 + dy;
            if nx < 0 || ny < 0 || nx as usize >= width || ny as usize >= height {
                continue;
            }
            let index = ny as usize * width + nx as usize;
            cells[index] = Cell::full();
        }
    }
}

/// Last-resort single-cell collapse ignoring adjacency entirely, used once
/// `max_restarts` local re-seeds have been exhausted.
fn force_resolve(cells: &mut [Cell], index: usize, elevation_norm: f32, rng: &mut StdRng) {
    cells[index] = Cell::full();
    let kind = collapse(&cells[index], elevation_norm, rng);
    cells[index].possibilities = vec![kind];
}

/// Expands a coarse biome grid into a full W×H grid by nearest-cell lookup.
pub fn upsample(coarse: &Grid2<BiomeKind>, width: usize, height: usize, cell_size: usize) -> Grid2<BiomeKind> {
    let mut full = Grid2::new(width, height, BiomeKind::Flat);
    for y in 0..height {
        for x in 0..width {
            let cx = (x / cell_size.max(1)).min(coarse.width() - 1);
            let cy = (y / cell_size.max(1)).min(coarse.height() - 1);
            full.set(x, y, *coarse.get(cx, cy));
        }
    }
    full
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn fully_collapses_every_cell() {
        let elevation = Grid2::new(6, 6, 0.5f32);
        let mut rng = StdRng::seed_from_u64(11);
        let mut events = EventLog::new(32);
        let result = generate_coarse_biomes(6, 6, &elevation, 8, &mut rng, &mut events, |_, _| true).unwrap();
        assert_eq!(result.width(), 6);
        assert_eq!(result.height(), 6);
    }

    #[test]
    fn aborts_when_progress_callback_returns_false() {
        let elevation = Grid2::new(4, 4, 0.5f32);
        let mut rng = StdRng::seed_from_u64(3);
        let mut events = EventLog::new(32);
        let result = generate_coarse_biomes(4, 4, &elevation, 8, &mut rng, &mut events, |_, _| false);
        assert_eq!(result, Err(GenerationError::Aborted));
    }

    #[test]
    fn upsample_replicates_coarse_cells() {
        let mut coarse = Grid2::new(2, 1, BiomeKind::Flat);
        coarse.set(1, 0, BiomeKind::Dune);
        let full = upsample(&coarse, 4, 2, 2);
        assert_eq!(*full.get(0, 0), BiomeKind::Flat);
        assert_eq!(*full.get(2, 0), BiomeKind::Dune);
        assert_eq!(*full.get(3, 1), BiomeKind::Dune);
    }

    #[test]
    fn high_restart_budget_never_panics_on_dense_grid() {
        let elevation = Grid2::new(10, 10, 0.9f32);
        let mut rng = StdRng::seed_from_u64(99);
        let mut events = EventLog::new(64);
        let result = generate_coarse_biomes(10, 10, &elevation, 16, &mut rng, &mut events, |_, _| true);
        assert!(result.is_ok());
    }
}
