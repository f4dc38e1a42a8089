//! Price universes: in-memory container and synthetic generation.

pub mod synthetic;
pub mod universe;

pub use synthetic::{generate_synthetic_series, synthetic_universe};
pub use universe::Universe;
