//! MCP server on the official Rust MCP SDK ([`rmcp`]).
//!
//! [`ToolServer`] implements [`ServerHandler`]: `tools/list` answers with
//! [`ToolServer::definitions`] and `tools/call` runs [`ToolServer::call`].
//! Unknown tools are reported as invalid-params errors; every other failure
//! is a tool result with `isError` set.
//!
//! # Example
//!
//! ```rust,ignore
//! use l402_mcp::rmcp_compat::serve_stdio;
//!
//! serve_stdio(ToolServer::new(client)).await?;
//! ```

use rmcp::model as mcp;
use rmcp::service::{RequestContext, RoleServer};
use rmcp::{ServerHandler, ServiceExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
#[cfg(feature = "telemetry")]
use tracing::info;

use crate::error::ToolError;
use crate::server::ToolServer;
use crate::types::{CallToolParams, CallToolResult, ToolDefinition};
use crate::{SERVER_NAME, SERVER_VERSION};

const INSTRUCTIONS: &str = "Stock quotes behind an L402 paywall. Call `signup` once for a \
    bearer token, then `get_stock`; payments for exhausted credits are made automatically.";

/// Re-encodes a value through its JSON wire form.
///
/// The crate's types and `rmcp`'s share the MCP wire format.
fn convert<T: Serialize, U: DeserializeOwned>(value: &T) -> Result<U, mcp::ErrorData> {
    serde_json::to_value(value)
        .and_then(serde_json::from_value)
        .map_err(|e| mcp::ErrorData::internal_error(e.to_string(), None))
}

/// Converts tool definitions to rmcp [`Tool`](mcp::Tool)s.
///
/// # Errors
///
/// Returns an internal error if a definition has no valid schema object.
pub fn tools_to_rmcp(definitions: &[ToolDefinition]) -> Result<Vec<mcp::Tool>, mcp::ErrorData> {
    definitions.iter().map(convert).collect()
}

/// Converts a [`CallToolResult`] to rmcp's [`CallToolResult`](mcp::CallToolResult).
///
/// # Errors
///
/// Returns an internal error if the result cannot be re-encoded.
pub fn result_to_rmcp(result: &CallToolResult) -> Result<mcp::CallToolResult, mcp::ErrorData> {
    convert(result)
}

impl From<mcp::CallToolRequestParams> for CallToolParams {
    fn from(params: mcp::CallToolRequestParams) -> Self {
        Self {
            name: params.name.into_owned(),
            arguments: params.arguments.unwrap_or_default(),
        }
    }
}

impl ServerHandler for ToolServer {
    fn get_info(&self) -> mcp::ServerInfo {
        let mut info = mcp::ServerInfo::default();
        info.capabilities = mcp::ServerCapabilities::builder().enable_tools().build();
        info.server_info.name = SERVER_NAME.to_owned();
        info.server_info.version = SERVER_VERSION.to_owned();
        info.instructions = Some(INSTRUCTIONS.to_owned());
        info
    }

    async fn list_tools(
        &self,
        _request: Option<mcp::PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<mcp::ListToolsResult, mcp::ErrorData> {
        let tools = tools_to_rmcp(&self.definitions())?;
        Ok(mcp::ListToolsResult::with_all_items(tools))
    }

    async fn call_tool(
        &self,
        request: mcp::CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<mcp::CallToolResult, mcp::ErrorData> {
        match self.call(request.into()).await {
            Ok(result) => result_to_rmcp(&result),
            Err(err) => Err(mcp::ErrorData::invalid_params(err.to_string(), None)),
        }
    }
}

/// Serves `server` on the process's stdin and stdout until the client
/// disconnects.
///
/// # Errors
///
/// Returns [`ToolError::Transport`] if the MCP handshake fails or the
/// session task ends abnormally.
pub async fn serve_stdio(server: ToolServer) -> Result<(), ToolError> {
    let running = server
        .serve(rmcp::transport::stdio())
        .await
        .map_err(|e| ToolError::Transport(e.to_string()))?;

    #[cfg(feature = "telemetry")]
    info!("MCP session initialized");

    running
        .waiting()
        .await
        .map_err(|e| ToolError::Transport(e.to_string()))?;

    #[cfg(feature = "telemetry")]
    info!("MCP session closed");

    Ok(())
}
