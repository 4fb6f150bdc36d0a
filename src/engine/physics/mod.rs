// ABOUTME: The seven physics kernels dispatched by the scheduler's phase table
// ABOUTME: Each module is a free function operating on borrowed state slices, no shared trait

pub mod atmosphere_update;
pub mod biome_gen;
pub mod erosion;
pub mod evaporation;
pub mod seepage;
pub mod subsurface_flow;
pub mod surface_flow;
