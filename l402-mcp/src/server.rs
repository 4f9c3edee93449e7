//! Tool dispatch.
//!
//! [`ToolServer`] runs decoded [`ToolCall`]s against a [`MeteredClient`]
//! and, for `create_invoice`, an [`InvoiceIssuer`]. Every failure is turned
//! into a [`CallToolResult`] with `is_error` set, so a calling model always
//! gets a readable answer.

use std::sync::Arc;

use l402::AccountToken;
use l402::executor::{InvoiceIssuer, TestInvoiceRequest};
use l402_http::MeteredClient;
#[cfg(feature = "telemetry")]
use tracing::{debug, instrument, warn};

use crate::error::ToolError;
use crate::tools::{self, CREATE_INVOICE, ToolCall};
use crate::types::{CallToolParams, CallToolResult, ToolDefinition};

/// Runs tool calls against a metered API and a paying node.
#[derive(Clone)]
pub struct ToolServer {
    client: MeteredClient,
    issuer: Option<Arc<dyn InvoiceIssuer>>,
}

impl std::fmt::Debug for ToolServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolServer")
            .field("client", &self.client)
            .field("has_invoice_issuer", &self.issuer.is_some())
            .finish()
    }
}

impl ToolServer {
    /// Creates a tool server around `client`.
    ///
    /// Without an invoice issuer, `create_invoice` reports an error.
    #[must_use]
    pub const fn new(client: MeteredClient) -> Self {
        Self {
            client,
            issuer: None,
        }
    }

    /// Enables `create_invoice` through `issuer`.
    #[must_use]
    pub fn with_invoice_issuer(mut self, issuer: Arc<dyn InvoiceIssuer>) -> Self {
        self.issuer = Some(issuer);
        self
    }

    /// Returns the underlying metered client.
    #[must_use]
    pub const fn client(&self) -> &MeteredClient {
        &self.client
    }

    /// Returns the definitions of every tool.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        tools::definitions()
    }

    /// Decodes and runs an MCP `tools/call` request.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::UnknownTool`] only; every other failure is
    /// reported inside the returned [`CallToolResult`].
    pub async fn call(&self, params: CallToolParams) -> Result<CallToolResult, ToolError> {
        let call = match ToolCall::decode(&params.name, params.arguments.into()) {
            Ok(call) => call,
            Err(err @ ToolError::UnknownTool(_)) => return Err(err),
            Err(err) => return Ok(CallToolResult::error(err.to_string())),
        };
        Ok(self.run(call).await)
    }

    /// Runs a decoded call, reporting failures as an error result.
    pub async fn run(&self, call: ToolCall) -> CallToolResult {
        match self.invoke(call).await {
            Ok(text) => CallToolResult::success(text),
            Err(err) => {
                #[cfg(feature = "telemetry")]
                warn!(error = %err, "Tool call failed");
                CallToolResult::error(err.to_string())
            }
        }
    }

    /// Runs a decoded call and returns its text output.
    ///
    /// # Errors
    ///
    /// Returns the [`ToolError`] of whichever step failed.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "l402.tool.invoke", skip_all, fields(tool = call.name()), err)
    )]
    pub async fn invoke(&self, call: ToolCall) -> Result<String, ToolError> {
        match call {
            ToolCall::Signup => {
                let token = self.client.signup().await?;
                Ok(format!(
                    "Successfully created account. Your bearer token is: {token}"
                ))
            }
            ToolCall::GetStock {
                ticker,
                bearer_token,
            } => {
                let token = AccountToken::new(bearer_token);
                let response = self.client.stock_quote(&ticker, &token).await?;

                #[cfg(feature = "telemetry")]
                debug!(status = %response.status, paid = response.was_paid(), "Quote fetched");

                Ok(format!(
                    "Response status: {}\nResponse data: {}",
                    response.status.as_u16(),
                    response.text()
                ))
            }
            ToolCall::GetUserInfo { bearer_token } => {
                let info = self
                    .client
                    .user_info(&AccountToken::new(bearer_token))
                    .await?;
                Ok(format!("User Info: {info}"))
            }
            ToolCall::PayLightning { payment_request } => {
                let payment_id = self.client.pay_invoice(&payment_request, None).await?;
                Ok(format!("Payment successful! Payment ID: {payment_id}"))
            }
            ToolCall::CreateInvoice { amount, memo } => {
                let issuer = self
                    .issuer
                    .as_ref()
                    .ok_or(ToolError::Unavailable(CREATE_INVOICE))?;
                let invoice = issuer
                    .create_test_invoice(&TestInvoiceRequest {
                        node_id: self.client.node_id().to_owned(),
                        amount,
                        memo: Some(memo),
                    })
                    .await?;
                Ok(format!("Created test invoice for {amount}: {invoice}"))
            }
        }
    }
}
