// ABOUTME: Tick phase dispatch table, day/heat curve, and end-of-day bookkeeping
// ABOUTME: phase_table_for/day_phase_fraction/heat_at are pure so the schedule is testable without live state

use std::collections::HashSet;

use rand::rngs::StdRng;

use crate::engine::config::EngineConfig;
use crate::engine::core::grid::Grid2;
use crate::engine::physics::{
    atmosphere_update, biome_gen, erosion, evaporation, seepage, subsurface_flow, surface_flow,
};
use crate::engine::state::atmosphere::AtmosphereState;
use crate::engine::state::biome::BiomeState;
use crate::engine::state::events::EventLog;
use crate::engine::state::terrain::TerrainState;
use crate::engine::state::water::WaterState;

const WIND_EXPOSURE_INTERVAL: u64 = 10;

/// Which physics kernels run on a given tick, independent of any live
/// state, so the schedule itself is unit-testable without a fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickPhase {
    pub surface_flow: bool,
    pub seepage: bool,
    pub evaporation: bool,
    pub atmosphere: bool,
    pub subsurface_flow: bool,
}

pub fn phase_table_for(tick: u64) -> TickPhase {
    match tick % 4 {
        0 => TickPhase {
            surface_flow: true,
            seepage: true,
            evaporation: true,
            atmosphere: true,
            subsurface_flow: false,
        },
        1 => TickPhase {
            surface_flow: false,
            seepage: false,
            evaporation: true,
            atmosphere: false,
            subsurface_flow: true,
        },
        2 => TickPhase {
            surface_flow: true,
            seepage: false,
            evaporation: true,
            atmosphere: true,
            subsurface_flow: false,
        },
        _ => TickPhase {
            surface_flow: false,
            seepage: false,
            evaporation: true,
            atmosphere: false,
            subsurface_flow: false,
        },
    }
}

/// Fraction of the current day elapsed, in `[0, 1)`.
pub fn day_phase_fraction(tick: u64, config: &EngineConfig) -> f32 {
    let length = config.day_length_ticks.max(1);
    (tick % length) as f32 / length as f32
}

/// Heat curve for the day: zero at the dawn/dusk boundary, peaking at midday.
pub fn heat_at(tick: u64, config: &EngineConfig) -> f32 {
    let phase = day_phase_fraction(tick, config);
    let intensity = (std::f32::consts::PI * phase).sin().max(0.0);
    config.heat_min + (config.heat_max - config.heat_min) * intensity
}

pub fn is_end_of_day(tick: u64, config: &EngineConfig) -> bool {
    tick > 0 && tick % config.day_length_ticks.max(1) == 0
}

#[allow(clippy::too_many_arguments)]
pub fn advance_tick(
    terrain: &mut TerrainState,
    water: &mut WaterState,
    atmosphere: &mut AtmosphereState,
    biome: &mut BiomeState,
    structure_modifier: &Grid2<f32>,
    config: &EngineConfig,
    events: &mut EventLog,
    dirty_cells: &mut HashSet<(u32, u32)>,
    rng: &mut StdRng,
    tick: u64,
) {
    let heat = heat_at(tick, config);
    let phase = phase_table_for(tick);

    if phase.surface_flow {
        surface_flow::step(terrain, water, biome, config, events, tick);
    }
    if phase.seepage {
        seepage::step(terrain, water, config);
    }
    if phase.subsurface_flow {
        subsurface_flow::step(terrain, water, config, events, tick);
        biome_gen::update_moisture(terrain, water, biome, config);
    }
    if phase.evaporation {
        evaporation::step(terrain, water, atmosphere, biome, structure_modifier, config, heat);
    }
    if phase.atmosphere {
        atmosphere_update::step(atmosphere, config, heat, rng);
    }

    if tick % WIND_EXPOSURE_INTERVAL == 0 {
        accumulate_wind_exposure(atmosphere, biome);
    }

    if is_end_of_day(tick, config) {
        biome_gen::step(terrain, water, biome, config, dirty_cells);
        erosion::step(terrain, water, atmosphere, biome, config, events, tick);
        biome.reset_daily_accumulators();
    }
}

fn accumulate_wind_exposure(atmosphere: &AtmosphereState, biome: &mut BiomeState) {
    let width = biome.wind_exposure.width();
    let height = biome.wind_exposure.height();
    for y in 0..height {
        for x in 0..width {
            let magnitude = atmosphere.wind_grid.get(x, y).magnitude();
            *biome.wind_exposure.get_mut(x, y) += magnitude;
        }
    }
}
