//! HTTP bridge to a node payment service.
//!
//! [`HttpPaymentExecutor`] implements [`PaymentExecutor`] and
//! [`InvoiceIssuer`] by calling a JSON service that holds the funded node:
//!
//! - `POST {url}/payments` pays an invoice
//! - `POST {url}/invoices/test` creates a test-mode invoice
//!
//! Requests carry the API client id and secret as HTTP basic auth; the node
//! password is forwarded in the payment body so the service can unlock the
//! node's signing key.

use std::time::Duration;

use l402::config::NodeConfig;
use l402::executor::{
    BoxFuture, InvoiceIssuer, PayInvoiceRequest, PaymentExecutor, PaymentOutcome,
    TestInvoiceRequest,
};
use l402::{ExecutorError, Invoice};
use serde::{Deserialize, Serialize};
#[cfg(feature = "telemetry")]
use tracing::{debug, instrument};

use crate::constants::{DEFAULT_HTTP_TIMEOUT, EXECUTOR_HTTP_GRACE};

/// Configuration for [`HttpPaymentExecutor`].
pub struct ExecutorConfig {
    /// Payment service base URL.
    pub url: String,

    /// Timeout for calls that do not carry their own (test invoices).
    pub timeout: Duration,

    /// API client id and secret, sent as basic auth.
    pub credentials: Option<(String, String)>,

    /// Node password forwarded with payments.
    pub node_password: Option<String>,

    /// Optional pre-configured reqwest client. If `None`, a new client is
    /// created.
    pub http_client: Option<reqwest::Client>,
}

impl ExecutorConfig {
    /// Creates a config for the service at `url`, without credentials.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: DEFAULT_HTTP_TIMEOUT,
            credentials: None,
            node_password: None,
            http_client: None,
        }
    }

    /// Creates a config carrying the credentials of `node`.
    #[must_use]
    pub fn for_node(url: impl Into<String>, node: &NodeConfig) -> Self {
        Self::new(url)
            .with_credentials(&node.api_client_id, &node.api_client_secret)
            .with_node_password(&node.node_password)
    }

    /// Sets the timeout for calls without their own deadline.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the basic-auth credentials.
    #[must_use]
    pub fn with_credentials(mut self, client_id: impl Into<String>, secret: impl Into<String>) -> Self {
        self.credentials = Some((client_id.into(), secret.into()));
        self
    }

    /// Sets the node password forwarded with payments.
    #[must_use]
    pub fn with_node_password(mut self, password: impl Into<String>) -> Self {
        self.node_password = Some(password.into());
        self
    }

    /// Sets a pre-configured reqwest client.
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }
}

impl std::fmt::Debug for ExecutorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutorConfig")
            .field("url", &self.url)
            .field("timeout", &self.timeout)
            .field("has_credentials", &self.credentials.is_some())
            .field("has_node_password", &self.node_password.is_some())
            .field("has_http_client", &self.http_client.is_some())
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct PayBody<'a> {
    node_id: &'a str,
    encoded_invoice: &'a str,
    timeout_secs: u64,
    maximum_fees_msats: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    amount_msats: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    node_password: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct PaymentBody {
    #[serde(default)]
    id: Option<String>,
    status: String,
    #[serde(default)]
    failure_reason: Option<String>,
}

impl PaymentBody {
    fn into_outcome(self) -> Result<PaymentOutcome, ExecutorError> {
        match self.status.to_ascii_uppercase().as_str() {
            "SUCCESS" | "SUCCEEDED" => {
                let payment_id = self.id.filter(|id| !id.is_empty()).ok_or_else(|| {
                    ExecutorError::InvalidResponse("successful payment without an id".into())
                })?;
                Ok(PaymentOutcome::Succeeded { payment_id })
            }
            "FAILED" => Ok(PaymentOutcome::Failed {
                reason: self
                    .failure_reason
                    .unwrap_or_else(|| "payment failed".to_owned()),
            }),
            // Not settled within the timeout; counts as a failure.
            "PENDING" | "IN_FLIGHT" => Ok(PaymentOutcome::Failed {
                reason: "payment still pending at timeout".to_owned(),
            }),
            other => Err(ExecutorError::InvalidResponse(format!(
                "unknown payment status `{other}`"
            ))),
        }
    }
}

#[derive(Debug, Serialize)]
struct TestInvoiceBody<'a> {
    node_id: &'a str,
    amount_msats: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    memo: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct IssuedInvoiceBody {
    encoded_payment_request: String,
}

/// Executor that talks JSON over HTTP to a node payment service.
pub struct HttpPaymentExecutor {
    url: String,
    timeout: Duration,
    credentials: Option<(String, String)>,
    node_password: Option<String>,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpPaymentExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPaymentExecutor")
            .field("url", &self.url)
            .field("timeout", &self.timeout)
            .field("has_credentials", &self.credentials.is_some())
            .finish_non_exhaustive()
    }
}

impl HttpPaymentExecutor {
    /// Creates an executor from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::Transport`] if the HTTP client cannot be
    /// built.
    pub fn new(config: ExecutorConfig) -> Result<Self, ExecutorError> {
        let url = config.url.trim_end_matches('/').to_owned();
        let client = match config.http_client {
            Some(client) => client,
            None => reqwest::Client::builder()
                .build()
                .map_err(|e| ExecutorError::Transport(e.to_string()))?,
        };
        Ok(Self {
            url,
            timeout: config.timeout,
            credentials: config.credentials,
            node_password: config.node_password,
            client,
        })
    }

    /// Returns the payment service base URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    fn post(&self, path: &str, timeout: Duration) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .post(format!("{}/{path}", self.url))
            .timeout(timeout);
        match &self.credentials {
            Some((id, secret)) => builder.basic_auth(id, Some(secret)),
            None => builder,
        }
    }

    async fn send_json<B, R>(
        &self,
        path: &str,
        timeout: Duration,
        body: &B,
    ) -> Result<R, ExecutorError>
    where
        B: Serialize + Sync,
        R: for<'de> Deserialize<'de>,
    {
        let response = self
            .post(path, timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| ExecutorError::Transport(format!("{path} request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ExecutorError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<R>()
            .await
            .map_err(|e| ExecutorError::InvalidResponse(format!("{path} response parse error: {e}")))
    }

    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "l402.executor.pay", skip_all, fields(node_id = %request.node_id), err)
    )]
    async fn pay_http(&self, request: &PayInvoiceRequest) -> Result<PaymentOutcome, ExecutorError> {
        let body = PayBody {
            node_id: &request.node_id,
            encoded_invoice: request.invoice.as_str(),
            timeout_secs: request.timeout.as_secs().max(1),
            maximum_fees_msats: request.maximum_fee.as_u64(),
            amount_msats: request.amount.map(|a| a.as_u64()),
            node_password: self.node_password.as_deref(),
        };
        let payment: PaymentBody = self
            .send_json("payments", request.timeout + EXECUTOR_HTTP_GRACE, &body)
            .await?;

        #[cfg(feature = "telemetry")]
        debug!(status = %payment.status, id = ?payment.id, "Payment service answered");

        payment.into_outcome()
    }

    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "l402.executor.create_test_invoice", skip_all, err)
    )]
    async fn create_test_invoice_http(
        &self,
        request: &TestInvoiceRequest,
    ) -> Result<Invoice, ExecutorError> {
        let body = TestInvoiceBody {
            node_id: &request.node_id,
            amount_msats: request.amount.as_u64(),
            memo: request.memo.as_deref(),
        };
        let issued: IssuedInvoiceBody = self.send_json("invoices/test", self.timeout, &body).await?;
        Invoice::parse(&issued.encoded_payment_request)
            .map_err(|e| ExecutorError::InvalidResponse(e.to_string()))
    }
}

impl PaymentExecutor for HttpPaymentExecutor {
    fn pay<'a>(
        &'a self,
        request: &'a PayInvoiceRequest,
    ) -> BoxFuture<'a, Result<PaymentOutcome, ExecutorError>> {
        Box::pin(self.pay_http(request))
    }
}

impl InvoiceIssuer for HttpPaymentExecutor {
    fn create_test_invoice<'a>(
        &'a self,
        request: &'a TestInvoiceRequest,
    ) -> BoxFuture<'a, Result<Invoice, ExecutorError>> {
        Box::pin(self.create_test_invoice_http(request))
    }
}
