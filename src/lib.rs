//! chart-drawing-rs: interactive drawing tools for price/time charts.
//!
//! The crate owns the shared engine behind every tool family: a data-space
//! anchor model, a per-tool interaction state machine, a pixel-space geometry
//! kernel, regression and price-level math, and an edge-triggered alert
//! evaluator. Pixel mapping, bars and rasterization are supplied by the host.

pub mod alerts;
pub mod api;
pub mod core;
pub mod error;
pub mod geometry;
pub mod interaction;
pub mod levels;
pub mod regression;
pub mod render;
pub mod style;
pub mod telemetry;
pub mod tools;

pub use api::{DrawingEngine, DrawingEngineConfig};
pub use error::{DrawingError, DrawingResult};
