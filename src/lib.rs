//! Gridslide slide correction library
//!
//! Cancels the drift characters pick up while standing on moving or
//! rotating grids. The corrector lives in [`slide`]; [`sim`] is a Rapier3D
//! reference host used by the CLI and the tests.

pub mod config;
pub mod sim;
pub mod slide;

pub use config::SlideConfig;
pub use slide::{SlideCorrector, StartOutcome, TickReport};
