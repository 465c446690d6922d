//! Stage names. Device stages double as kernel names.

/// Reset the bucket table.
pub const CLEAR: &str = "clear";
/// Hash particles to cells.
pub const HASH: &str = "hash";
/// Host-side stable sort by cell.
pub const SORT: &str = "sort";
/// Back permutation and sorted gather.
pub const SORT_POST_PASS: &str = "sort_post_pass";
/// First particle per cell.
pub const INDEX: &str = "index";
/// Host-side forward fill of empty cells.
pub const INDEX_POST_PASS: &str = "index_post_pass";
/// Neighbor lists.
pub const FIND_NEIGHBORS: &str = "find_neighbors";
/// Step-start density.
pub const COMPUTE_DENSITY: &str = "compute_density";
/// Viscosity, gravity and the initial pressure.
pub const COMPUTE_FORCES_INIT_PRESSURE: &str = "compute_forces_init_pressure";
/// Spring and muscle forces.
pub const COMPUTE_ELASTIC_FORCES: &str = "compute_elastic_forces";
/// Tentative positions.
pub const PREDICT_POSITIONS: &str = "predict_positions";
/// Density at the tentative positions.
pub const PREDICT_DENSITY: &str = "predict_density";
/// Pressure update from the density error.
pub const CORRECT_PRESSURE: &str = "correct_pressure";
/// Pressure acceleration.
pub const COMPUTE_PRESSURE_FORCE: &str = "compute_pressure_force";
/// Time integration.
pub const INTEGRATE: &str = "integrate";

/// Every kernel a backend program must provide.
pub const KERNEL_NAMES: [&str; 13] = [
    CLEAR,
    HASH,
    SORT_POST_PASS,
    INDEX,
    FIND_NEIGHBORS,
    COMPUTE_DENSITY,
    COMPUTE_FORCES_INIT_PRESSURE,
    COMPUTE_ELASTIC_FORCES,
    PREDICT_POSITIONS,
    PREDICT_DENSITY,
    CORRECT_PRESSURE,
    COMPUTE_PRESSURE_FORCE,
    INTEGRATE,
];
