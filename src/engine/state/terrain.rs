// ABOUTME: Bedrock, soil-layer depth/material, and derived elevation storage
// ABOUTME: Owns the connectivity cache that keeps the subsurface stencil's inner loop geometry-free

use crate::engine::core::grid::{Grid2, Grid3};
use crate::engine::core::math::NEIGHBORS_4;

/// The six soil strata, strictly bottom-up. `as usize` indexes directly into
/// `Grid3` without an intermediate lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(usize)]
pub enum SoilLayer {
    Bedrock = 0,
    Regolith = 1,
    Subsoil = 2,
    Eluviation = 3,
    Topsoil = 4,
    Organics = 5,
}

pub const LAYER_COUNT: usize = 6;
pub const ALL_LAYERS: [SoilLayer; LAYER_COUNT] = [
    SoilLayer::Bedrock,
    SoilLayer::Regolith,
    SoilLayer::Subsoil,
    SoilLayer::Eluviation,
    SoilLayer::Topsoil,
    SoilLayer::Organics,
];

impl SoilLayer {
    #[inline]
    pub fn above(self) -> Option<SoilLayer> {
        ALL_LAYERS.get(self as usize + 1).copied()
    }

    #[inline]
    pub fn below(self) -> Option<SoilLayer> {
        (self as usize).checked_sub(1).map(|i| ALL_LAYERS[i])
    }
}

/// Material identity for a soil-layer cell. `Empty` is the only tag allowed
/// when a layer's depth is zero (invariant 4 in the engine specification).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Material {
    #[default]
    Empty,
    Bedrock,
    Regolith,
    Subsoil,
    Clay,
    Loam,
    Humus,
    Sand,
    Salt,
}

impl SoilLayer {
    /// Material a freshly non-empty layer defaults to, used by raise/dig
    /// actions when depth goes from zero to positive.
    pub fn default_material(self) -> Material {
        match self {
            SoilLayer::Bedrock => Material::Bedrock,
            SoilLayer::Regolith => Material::Regolith,
            SoilLayer::Subsoil => Material::Subsoil,
            SoilLayer::Eluviation => Material::Clay,
            SoilLayer::Topsoil => Material::Loam,
            SoilLayer::Organics => Material::Humus,
        }
    }
}

/// Per-layer, per-direction edge validity, precomputed from `terrain_layers
/// > 0` and invalidated only on terrain mutation. Removes geometry/bounds
/// checks from the subsurface horizontal-flow inner loop.
#[derive(Debug, Clone)]
pub struct ConnectivityCache {
    /// One bitmask per layer-cell; bit `i` set means `NEIGHBORS_4[i]` is a
    /// valid, in-bounds, non-empty-depth neighbor.
    masks: Grid3<u8>,
    valid: bool,
}

impl ConnectivityCache {
    fn new(width: usize, height: usize) -> Self {
        Self {
            masks: Grid3::new(LAYER_COUNT, width, height, 0u8),
            valid: false,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    #[inline]
    pub fn connected(&self, layer: usize, x: usize, y: usize, direction: usize) -> bool {
        (*self.masks.get(layer, x, y) & (1 << direction)) != 0
    }

    fn rebuild(&mut self, terrain_layers: &Grid3<i32>) {
        let width = terrain_layers.width();
        let height = terrain_layers.height();
        for l in 0..LAYER_COUNT {
            for y in 0..height {
                for x in 0..width {
                    if *terrain_layers.get(l, x, y) <= 0 {
                        self.masks.set(l, x, y, 0);
                        continue;
                    }
                    let mut mask = 0u8;
                    for (i, (dx, dy)) in NEIGHBORS_4.iter().enumerate() {
                        let nx = x as i64 + dx;
                        let ny = y as i64 + dy;
                        if nx < 0 || ny < 0 || nx as usize >= width || ny as usize >= height {
                            continue;
                        }
                        if *terrain_layers.get(l, nx as usize, ny as usize) > 0 {
                            mask |= 1 << i;
                        }
                    }
                    self.masks.set(l, x, y, mask);
                }
            }
        }
        self.valid = true;
    }
}

/// Bedrock floor, soil-layer depth/material, and the derived elevation
/// field. `terrain_changed` gates the (comparatively expensive) elevation
/// and connectivity-cache rebuilds so repeated reads between mutations are
/// free.
#[derive(Debug, Clone)]
pub struct TerrainState {
    pub bedrock_base: Grid2<i32>,
    pub terrain_layers: Grid3<i32>,
    pub terrain_materials: Grid3<Material>,
    pub elevation_grid: Grid2<i32>,
    pub connectivity: ConnectivityCache,
    terrain_changed: bool,
}

impl TerrainState {
    pub fn new(width: usize, height: usize) -> Self {
        let mut state = Self {
            bedrock_base: Grid2::new(width, height, 0),
            terrain_layers: Grid3::new(LAYER_COUNT, width, height, 0),
            terrain_materials: Grid3::new(LAYER_COUNT, width, height, Material::Empty),
            elevation_grid: Grid2::new(width, height, 0),
            connectivity: ConnectivityCache::new(width, height),
            terrain_changed: true,
        };
        state.rebuild_if_dirty();
        state
    }

    pub fn mark_changed(&mut self) {
        self.terrain_changed = true;
        self.connectivity.invalidate();
    }

    pub fn is_changed(&self) -> bool {
        self.terrain_changed
    }

    /// Invariant 6: rebuild `elevation_grid` from `bedrock_base +
    /// Σ terrain_layers` whenever terrain has been mutated, and rebuild the
    /// connectivity cache alongside it.
    pub fn rebuild_if_dirty(&mut self) {
        if !self.terrain_changed {
            return;
        }
        let width = self.bedrock_base.width();
        let height = self.bedrock_base.height();
        for y in 0..height {
            for x in 0..width {
                let mut total = *self.bedrock_base.get(x, y);
                for l in 0..LAYER_COUNT {
                    total += *self.terrain_layers.get(l, x, y);
                }
                self.elevation_grid.set(x, y, total);
            }
        }
        self.connectivity.rebuild(&self.terrain_layers);
        self.terrain_changed = false;
    }

    pub fn topmost_nonempty(&self, x: usize, y: usize) -> Option<SoilLayer> {
        for layer in ALL_LAYERS.iter().rev() {
            if *self.terrain_layers.get(*layer as usize, x, y) > 0 {
                return Some(*layer);
            }
        }
        None
    }

    /// Sets a layer's depth, keeping invariant 4 (depth zero iff material
    /// empty) and marking terrain changed for the next rebuild.
    pub fn set_layer_depth(&mut self, layer: SoilLayer, x: usize, y: usize, depth: i32) {
        let depth = depth.max(0);
        self.terrain_layers.set(layer as usize, x, y, depth);
        if depth == 0 {
            self.terrain_materials
                .set(layer as usize, x, y, Material::Empty);
        } else if *self.terrain_materials.get(layer as usize, x, y) == Material::Empty {
            self.terrain_materials
                .set(layer as usize, x, y, layer.default_material());
        }
        self.mark_changed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elevation_rebuilds_from_bedrock_and_layers() {
        let mut terrain = TerrainState::new(2, 2);
        terrain.bedrock_base.set(0, 0, 10);
        terrain.set_layer_depth(SoilLayer::Topsoil, 0, 0, 3);
        terrain.set_layer_depth(SoilLayer::Organics, 0, 0, 2);
        terrain.rebuild_if_dirty();
        assert_eq!(*terrain.elevation_grid.get(0, 0), 15);
    }

    #[test]
    fn material_cleared_when_depth_hits_zero() {
        let mut terrain = TerrainState::new(1, 1);
        terrain.set_layer_depth(SoilLayer::Topsoil, 0, 0, 5);
        assert_eq!(
            *terrain.terrain_materials.get(SoilLayer::Topsoil as usize, 0, 0),
            Material::Loam
        );
        terrain.set_layer_depth(SoilLayer::Topsoil, 0, 0, 0);
        assert_eq!(
            *terrain.terrain_materials.get(SoilLayer::Topsoil as usize, 0, 0),
            Material::Empty
        );
    }

    #[test]
    fn connectivity_cache_disconnects_zero_depth_cells() {
        let mut terrain = TerrainState::new(3, 1);
        terrain.set_layer_depth(SoilLayer::Topsoil, 0, 0, 1);
        terrain.set_layer_depth(SoilLayer::Topsoil, 2, 0, 1);
        // cell 1 left empty: both neighbors should see it as disconnected
        terrain.rebuild_if_dirty();
        assert!(!terrain
            .connectivity
            .connected(SoilLayer::Topsoil as usize, 0, 0, 0)); // east neighbor (x=1) empty
    }

    #[test]
    fn topmost_nonempty_prefers_higher_layers() {
        let mut terrain = TerrainState::new(1, 1);
        terrain.set_layer_depth(SoilLayer::Regolith, 0, 0, 4);
        terrain.set_layer_depth(SoilLayer::Topsoil, 0, 0, 2);
        assert_eq!(terrain.topmost_nonempty(0, 0), Some(SoilLayer::Topsoil));
    }
}
