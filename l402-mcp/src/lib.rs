#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Agent tool surface for L402 metered APIs.
//!
//! Exposes the metered stock API and the paying node as a small set of
//! tools that a language model can call:
//!
//! | Tool             | Arguments                        |
//! |------------------|----------------------------------|
//! | `signup`         | none                             |
//! | `get_stock`      | `ticker`, `bearer_token`         |
//! | `get_user_info`  | `bearer_token`                   |
//! | `pay_lightning`  | `payment_request`                |
//! | `create_invoice` | `amount_msats`, `memo` (both optional) |
//!
//! Arguments are decoded strictly from JSON into [`tools::ToolCall`];
//! unknown fields and missing required fields are rejected.
//!
//! # Renderings
//!
//! - [`rmcp_compat`] serves the tools as an MCP server through the official
//!   Rust MCP SDK, over stdio or any other `rmcp` transport
//! - [`openai`] renders the same tools as OpenAI function definitions and
//!   decodes `tool_calls` back into typed invocations
//!
//! # Feature Flags
//!
//! - `telemetry`: enables tracing instrumentation for debugging and monitoring

pub mod error;
pub mod openai;
pub mod rmcp_compat;
pub mod server;
pub mod tools;
pub mod types;

/// Server name reported in the MCP `initialize` handshake.
pub const SERVER_NAME: &str = "stock-l402";

/// Server version reported in the MCP `initialize` handshake.
pub const SERVER_VERSION: &str = "0.1.0";

pub use error::ToolError;
pub use server::ToolServer;
pub use tools::ToolCall;
pub use types::{CallToolParams, CallToolResult, ContentItem, ToolDefinition};
