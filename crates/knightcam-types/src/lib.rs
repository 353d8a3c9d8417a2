//! Shared domain types for the knightcam project.

pub mod config;
pub mod events;
pub mod frame;
pub mod region;
pub mod round;
pub mod telemetry;

mod errors;

pub use errors::{KnightcamError, Result};
