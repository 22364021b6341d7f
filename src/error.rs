use thiserror::Error;

use crate::core::ToolId;

pub type DrawingResult<T> = Result<T, DrawingError>;

#[derive(Debug, Error)]
pub enum DrawingError {
    #[error("invalid viewport size: width={width}, height={height}")]
    InvalidViewport { width: u32, height: u32 },

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("invalid argument `{field}`: {reason}")]
    InvalidArgument { field: &'static str, reason: String },

    #[error("unknown drawing tool: {0}")]
    UnknownTool(ToolId),

    #[error("persistence error: {0}")]
    Persistence(String),
}

impl DrawingError {
    pub(crate) fn argument(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field,
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for DrawingError {
    fn from(err: serde_json::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}
