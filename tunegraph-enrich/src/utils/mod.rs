//! Utility modules

pub mod pacing;
pub mod path_mapper;

pub use pacing::{Pacer, PacingPolicy};
pub use path_mapper::PathMapper;
