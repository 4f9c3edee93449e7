//! The metered HTTP client.
//!
//! [`MeteredClient::fetch`] performs at most two `GET`s and at most one
//! payment per call:
//!
//! 1. `GET` the resource with the account token
//! 2. on 2xx, return it
//! 3. on anything other than 402, fail with [`FetchError::UnexpectedStatus`]
//! 4. on 402, pay through [`PaymentFlow`] and `GET` again
//! 5. return the second response as-is, whatever its status

use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;
use l402::hooks::{HookChain, PaymentHooks, PaymentReceipt};
use l402::offer::{FirstOffer, OfferSelector};
use l402::proto::{AccountToken, SignupResponse};
use l402::{Invoice, MilliSatoshis, PaymentExecutor, PaymentLimits, PaymentOutcome};
use serde::de::{DeserializeOwned, Error as _};
#[cfg(feature = "telemetry")]
use tracing::{debug, info, instrument};
use url::Url;

use crate::constants::{DEFAULT_HTTP_TIMEOUT, INFO_PATH, SIGNUP_PATH, TICKER_PATH};
use crate::error::FetchError;
use crate::middleware::L402Middleware;
use crate::payment::PaymentFlow;

/// A response obtained through [`MeteredClient::fetch`].
#[derive(Debug, Clone)]
pub struct MeteredResponse {
    /// Status of the final response.
    pub status: StatusCode,
    /// Body of the final response.
    pub body: String,
    /// The payment made for this response, if one was needed.
    pub receipt: Option<PaymentReceipt>,
}

impl MeteredResponse {
    async fn read(
        response: reqwest::Response,
        receipt: Option<PaymentReceipt>,
    ) -> Result<Self, FetchError> {
        let status = response.status();
        let body = response.text().await?;
        Ok(Self {
            status,
            body,
            receipt,
        })
    }

    /// Returns `true` if the final status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns `true` if a payment was made.
    #[must_use]
    pub const fn was_paid(&self) -> bool {
        self.receipt.is_some()
    }

    /// Returns the body as text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.body
    }

    /// Decodes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

struct Inner {
    http: reqwest::Client,
    base_url: Url,
    flow: Arc<PaymentFlow>,
}

/// HTTP client for an L402 resource server.
///
/// Cheap to clone; clones share the connection pool and payment flow.
#[derive(Clone)]
pub struct MeteredClient {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for MeteredClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeteredClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("node_id", &self.inner.flow.node_id())
            .field("limits", self.inner.flow.limits())
            .finish_non_exhaustive()
    }
}

impl MeteredClient {
    /// Starts building a client for the server at `base_url`, paying from
    /// `node_id` through `executor`.
    pub fn builder(
        base_url: Url,
        node_id: impl Into<String>,
        executor: impl PaymentExecutor + 'static,
    ) -> MeteredClientBuilder {
        MeteredClientBuilder {
            base_url,
            node_id: node_id.into(),
            executor: Arc::new(executor),
            selector: Box::new(FirstOffer),
            limits: PaymentLimits::default(),
            hooks: HookChain::default(),
            http_client: None,
            timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    /// Returns the server base URL, always ending in `/`.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Resolves a resource path against the base URL.
    ///
    /// A leading `/` is ignored so that paths stay under a base URL that
    /// has a path prefix.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] if the result is not a valid URL.
    pub fn url_for(&self, path: &str) -> Result<Url, FetchError> {
        Ok(self.inner.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Returns the id of the node that pays.
    #[must_use]
    pub fn node_id(&self) -> &str {
        self.inner.flow.node_id()
    }

    /// Returns the payment limits in effect.
    #[must_use]
    pub fn limits(&self) -> &PaymentLimits {
        self.inner.flow.limits()
    }

    /// Returns a `reqwest-middleware` layer sharing this client's payment
    /// flow.
    #[must_use]
    pub fn middleware(&self) -> L402Middleware {
        L402Middleware::from_shared(Arc::clone(&self.inner.flow))
    }

    /// Obtains a new account token.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::UnexpectedStatus`] on a non-2xx status,
    /// [`FetchError::Decode`] if the body has no usable token, and
    /// [`FetchError::Transport`] if the server is unreachable.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "l402.client.signup", skip(self), err)
    )]
    pub async fn signup(&self) -> Result<AccountToken, FetchError> {
        let url = self.url_for(SIGNUP_PATH)?;
        let response = self.inner.http.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(FetchError::UnexpectedStatus { status, body });
        }
        let signup: SignupResponse = serde_json::from_str(&body)?;
        let token = AccountToken::new(signup.id);
        if token.is_blank() {
            return Err(serde_json::Error::custom("signup returned an empty account token").into());
        }

        #[cfg(feature = "telemetry")]
        info!(token = ?token, "Signed up");

        Ok(token)
    }

    /// Fetches `path`, paying for it if the server answers 402.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::UnexpectedStatus`] if the first response is
    /// neither 2xx nor 402, any payment error from [`PaymentFlow::pay_for`],
    /// and [`FetchError::Transport`] if the server is unreachable. The
    /// response to the paid retry is returned as `Ok` whatever its status.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "l402.client.fetch", skip(self, token), err)
    )]
    pub async fn fetch(&self, path: &str, token: &AccountToken) -> Result<MeteredResponse, FetchError> {
        let url = self.url_for(path)?;

        let first = self.get(&url, token).await?;
        let status = first.status();
        if status.is_success() {
            return MeteredResponse::read(first, None).await;
        }
        if status != StatusCode::PAYMENT_REQUIRED {
            let body = first.text().await.unwrap_or_default();
            return Err(FetchError::UnexpectedStatus { status, body });
        }

        #[cfg(feature = "telemetry")]
        info!(url = %url, "Received 402 Payment Required, processing payment");

        let body = first.bytes().await?;
        let receipt = self
            .inner
            .flow
            .pay_for(url.as_str(), Some(token), &body)
            .await?;

        #[cfg(feature = "telemetry")]
        debug!(url = %url, "Retrying request after payment");

        match self.get_text(&url, token).await {
            Ok((status, body)) => Ok(MeteredResponse {
                status,
                body,
                receipt: Some(receipt),
            }),
            Err(source) => Err(FetchError::RetryFailed {
                receipt: Box::new(receipt),
                source,
            }),
        }
    }

    /// Fetches a stock quote for `ticker`.
    ///
    /// # Errors
    ///
    /// See [`Self::fetch`].
    pub async fn stock_quote(
        &self,
        ticker: &str,
        token: &AccountToken,
    ) -> Result<MeteredResponse, FetchError> {
        self.fetch(&format!("{TICKER_PATH}/{ticker}"), token).await
    }

    /// Returns account info, including remaining credits.
    ///
    /// # Errors
    ///
    /// See [`Self::fetch`]. Additionally returns
    /// [`FetchError::UnexpectedStatus`] if the final response is not 2xx
    /// and [`FetchError::Decode`] if it is not JSON.
    pub async fn user_info(&self, token: &AccountToken) -> Result<serde_json::Value, FetchError> {
        let response = self.fetch(INFO_PATH, token).await?;
        if !response.is_success() {
            return Err(FetchError::UnexpectedStatus {
                status: response.status,
                body: response.body,
            });
        }
        Ok(response.json()?)
    }

    /// Pays an invoice directly, outside any metered request.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::PaymentFailed`] if the executor failed, errored
    /// or exceeded the timeout.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "l402.client.pay_invoice", skip(self), err)
    )]
    pub async fn pay_invoice(
        &self,
        invoice: &Invoice,
        amount: Option<MilliSatoshis>,
    ) -> Result<String, FetchError> {
        match self.inner.flow.pay_invoice(invoice, amount).await {
            PaymentOutcome::Succeeded { payment_id } => Ok(payment_id),
            PaymentOutcome::Failed { reason } => Err(FetchError::PaymentFailed { reason }),
        }
    }

    async fn get(&self, url: &Url, token: &AccountToken) -> reqwest::Result<reqwest::Response> {
        self.inner
            .http
            .get(url.clone())
            .bearer_auth(token.as_str())
            .send()
            .await
    }

    async fn get_text(&self, url: &Url, token: &AccountToken) -> reqwest::Result<(StatusCode, String)> {
        let response = self.get(url, token).await?;
        let status = response.status();
        Ok((status, response.text().await?))
    }
}

/// Builder for [`MeteredClient`].
#[allow(missing_debug_implementations)] // dyn trait objects do not implement Debug
pub struct MeteredClientBuilder {
    base_url: Url,
    node_id: String,
    executor: Arc<dyn PaymentExecutor>,
    selector: Box<dyn OfferSelector>,
    limits: PaymentLimits,
    hooks: HookChain,
    http_client: Option<reqwest::Client>,
    timeout: Duration,
}

impl MeteredClientBuilder {
    /// Replaces the default first-offer selector.
    #[must_use]
    pub fn selector(mut self, selector: impl OfferSelector + 'static) -> Self {
        self.selector = Box::new(selector);
        self
    }

    /// Sets the payment timeout and fee ceiling.
    #[must_use]
    pub const fn limits(mut self, limits: PaymentLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Appends a payment lifecycle hook.
    #[must_use]
    pub fn hook(mut self, hook: impl PaymentHooks + 'static) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Uses a preconfigured `reqwest` client; [`Self::timeout`] is then
    /// ignored.
    #[must_use]
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the per-request timeout for resource-server calls.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Transport`] if the HTTP client cannot be
    /// constructed.
    pub fn build(self) -> Result<MeteredClient, FetchError> {
        let http = match self.http_client {
            Some(client) => client,
            None => reqwest::Client::builder().timeout(self.timeout).build()?,
        };

        let flow = PaymentFlow::from_parts(
            http.clone(),
            self.node_id,
            self.executor,
            self.selector,
            self.hooks,
            self.limits,
        );

        Ok(MeteredClient {
            inner: Arc::new(Inner {
                http,
                base_url: with_trailing_slash(self.base_url),
                flow: Arc::new(flow),
            }),
        })
    }
}

/// Makes `Url::join` append to the base path instead of replacing its last
/// segment.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
