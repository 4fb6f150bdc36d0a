// ABOUTME: Core module organization - foundational storage and math shared by every subsystem
// ABOUTME: Contains no simulation rules, only the primitives they're built from

pub mod grid;
pub mod math;
