// ABOUTME: Surface-to-topsoil infiltration governed by permeability and remaining layer capacity
// ABOUTME: Always targets the topmost non-empty soil layer; bare bedrock cells seep nothing

use crate::engine::config::EngineConfig;
use crate::engine::state::terrain::TerrainState;
use crate::engine::state::water::WaterState;

/// Moves water from the surface into the topmost non-empty soil layer,
/// capped by that layer's remaining capacity (engine specification §4.4).
pub fn step(terrain: &TerrainState, water: &mut WaterState, config: &EngineConfig) {
    let width = water.water_grid.width();
    let height = water.water_grid.height();

    for y in 0..height {
        for x in 0..width {
            let surface = *water.water_grid.get(x, y);
            if surface <= 0 {
                continue;
            }
            let Some(layer) = terrain.topmost_nonempty(x, y) else {
                continue;
            };
            let l = layer as usize;
            let permeability = *water.permeability_vert_grid.get(l, x, y);
            let capacity = water.layer_capacity(&terrain.terrain_layers, l, x, y);
            let current = *water.subsurface_water_grid.get(l, x, y);
            let remaining_capacity = (capacity - current).max(0);

            let requested = ((surface as f32) * config.surface_seepage_rate * permeability).floor();
            let amount = (requested as i32).min(surface).min(remaining_capacity).max(0);

            if amount > 0 {
                *water.water_grid.get_mut(x, y) -= amount;
                *water.subsurface_water_grid.get_mut(l, x, y) += amount;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::state::terrain::SoilLayer;

    #[test]
    fn seepage_respects_layer_capacity() {
        let mut terrain = TerrainState::new(1, 1);
        terrain.set_layer_depth(SoilLayer::Topsoil, 0, 0, 10);
        terrain.rebuild_if_dirty();
        let mut water = WaterState::new(1, 1, 0);
        water.porosity_grid.set(SoilLayer::Topsoil as usize, 0, 0, 0.3);
        water.permeability_vert_grid.set(SoilLayer::Topsoil as usize, 0, 0, 1.0);
        water.water_grid.set(0, 0, 100);
        let config = EngineConfig {
            surface_seepage_rate: 1.0,
            ..EngineConfig::default()
        };

        for _ in 0..20 {
            step(&terrain, &mut water, &config);
        }

        assert!(*water.subsurface_water_grid.get(SoilLayer::Topsoil as usize, 0, 0) <= 3);
    }

    #[test]
    fn bare_bedrock_cell_seeps_nothing() {
        let terrain = TerrainState::new(1, 1);
        let mut water = WaterState::new(1, 1, 0);
        water.water_grid.set(0, 0, 50);
        let config = EngineConfig::default();
        step(&terrain, &mut water, &config);
        assert_eq!(*water.water_grid.get(0, 0), 50);
    }
}
