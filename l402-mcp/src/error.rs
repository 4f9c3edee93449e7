//! Error types for tool invocation.

use l402::ExecutorError;
use l402_http::FetchError;

/// Errors that can occur while decoding or running a tool call.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ToolError {
    /// No tool has this name.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// The arguments did not match the tool's schema.
    #[error("Invalid arguments for `{tool}`: {reason}")]
    InvalidArguments {
        /// Tool being called.
        tool: &'static str,
        /// What was wrong with the arguments.
        reason: String,
    },

    /// The metered request failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The payment executor could not be used.
    #[error(transparent)]
    Executor(#[from] ExecutorError),

    /// The tool is not available in this configuration.
    #[error("Tool `{0}` is not available: no invoice issuer configured")]
    Unavailable(&'static str),

    /// The MCP session could not be started or ended abnormally.
    #[error("MCP transport error: {0}")]
    Transport(String),
}

impl ToolError {
    /// Builds an [`Self::InvalidArguments`] error.
    pub fn invalid(tool: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            tool,
            reason: reason.into(),
        }
    }
}
