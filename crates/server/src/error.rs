//! Errors raised by the tool layer itself.
//!
//! Store, cache and network failures arrive as `moviemaster_core::Error`
//! and convert on their own; these cover bad tool arguments and output
//! that cannot be encoded.

use rmcp::model::{ErrorCode, ErrorData as McpError};

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Arguments that parse but make no sense together.
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    #[error("OUTPUT_FAILED: {0}")]
    OutputFailed(String),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let (code, message) = match &err {
            ToolError::InvalidInput(_) => (-32602, err.to_string()),
            ToolError::OutputFailed(_) => (-32603, err.to_string()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
