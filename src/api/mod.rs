mod engine;
mod engine_config;
mod persistence;
mod pointer_dispatch;
mod tool_factory;

pub use engine::DrawingEngine;
pub use engine_config::DrawingEngineConfig;
pub use persistence::{DRAWING_SNAPSHOT_VERSION, DrawingSnapshot, PersistedAnchor, ToolSnapshot};
pub use pointer_dispatch::PointerDispatch;
pub use tool_factory::{AnchorSpec, ToolRequest};
