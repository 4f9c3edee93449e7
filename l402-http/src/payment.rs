//! The payment step of a metered request.
//!
//! [`PaymentFlow`] takes the body of a `402 Payment Required` response and
//! turns it into a settled payment: select an offer, obtain its invoice,
//! run the hooks, and have the executor pay within the configured limits.
//! It never retries; both [`MeteredClient`](crate::MeteredClient) and
//! [`L402Middleware`](crate::L402Middleware) call it at most once per
//! request.

use std::sync::Arc;

use l402::hooks::{HookChain, HookDecision, PaymentContext, PaymentHooks, PaymentReceipt};
use l402::offer::{FirstOffer, InvoiceSource, OfferSelector, plan_payment};
use l402::proto::{AccountToken, InvoiceRequest, InvoiceResponse, PaymentRequired};
use l402::{
    Invoice, LIGHTNING, MilliSatoshis, PayInvoiceRequest, PaymentExecutor, PaymentLimits,
    PaymentOutcome,
};
#[cfg(feature = "telemetry")]
use tracing::{debug, info, instrument, warn};

use crate::constants::EXECUTOR_HTTP_GRACE;
use crate::error::FetchError;

/// Pays for one 402 response.
#[allow(missing_debug_implementations)] // dyn trait objects do not implement Debug
pub struct PaymentFlow {
    http: reqwest::Client,
    executor: Arc<dyn PaymentExecutor>,
    selector: Box<dyn OfferSelector>,
    hooks: HookChain,
    node_id: String,
    limits: PaymentLimits,
    scheme: String,
}

impl PaymentFlow {
    /// Creates a flow that pays from `node_id` through `executor`.
    ///
    /// Defaults: [`FirstOffer`] selection, [`PaymentLimits::default`], the
    /// `lightning` scheme and no hooks. `http` is used for invoice
    /// resolution.
    pub fn new(
        http: reqwest::Client,
        node_id: impl Into<String>,
        executor: impl PaymentExecutor + 'static,
    ) -> Self {
        Self {
            http,
            executor: Arc::new(executor),
            selector: Box::new(FirstOffer),
            hooks: HookChain::default(),
            node_id: node_id.into(),
            limits: PaymentLimits::default(),
            scheme: LIGHTNING.to_owned(),
        }
    }

    pub(crate) fn from_parts(
        http: reqwest::Client,
        node_id: String,
        executor: Arc<dyn PaymentExecutor>,
        selector: Box<dyn OfferSelector>,
        hooks: HookChain,
        limits: PaymentLimits,
    ) -> Self {
        Self {
            http,
            executor,
            selector,
            hooks,
            node_id,
            limits,
            scheme: LIGHTNING.to_owned(),
        }
    }

    /// Replaces the offer selector.
    #[must_use]
    pub fn with_selector(mut self, selector: impl OfferSelector + 'static) -> Self {
        self.selector = Box::new(selector);
        self
    }

    /// Replaces the payment limits.
    #[must_use]
    pub const fn with_limits(mut self, limits: PaymentLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Appends a lifecycle hook.
    #[must_use]
    pub fn with_hook(mut self, hook: impl PaymentHooks + 'static) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Returns the payment limits in effect.
    #[must_use]
    pub const fn limits(&self) -> &PaymentLimits {
        &self.limits
    }

    /// Returns the paying node's id.
    #[must_use]
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Pays for the resource at `url` given the body of its 402 response.
    ///
    /// `token` is sent as a bearer token on the invoice-resolution request,
    /// if one is needed.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidPaymentRequired`] for an unparseable body,
    /// the offer errors from [`plan_payment`], [`FetchError::Aborted`] if a
    /// hook refused, and [`FetchError::PaymentFailed`] if the executor
    /// failed, errored or exceeded the timeout.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "l402.payment.pay_for", skip_all, fields(url = %url), err)
    )]
    pub async fn pay_for(
        &self,
        url: &str,
        token: Option<&AccountToken>,
        body: &[u8],
    ) -> Result<PaymentReceipt, FetchError> {
        let required = PaymentRequired::from_slice(body)
            .map_err(|e| FetchError::InvalidPaymentRequired(e.to_string()))?;
        let plan = plan_payment(&required, self.selector.as_ref(), &self.scheme)?;

        #[cfg(feature = "telemetry")]
        debug!(
            offer_id = ?plan.offer.id,
            amount = ?plan.offer.amount,
            currency = ?plan.offer.currency,
            "Selected offer"
        );

        let invoice = match &plan.source {
            InvoiceSource::Embedded(invoice) => invoice.clone(),
            InvoiceSource::Resolve { url, request } => {
                resolve_invoice(&self.http, url, request, token).await?
            }
        };

        let ctx = PaymentContext {
            url: url.to_owned(),
            plan,
            invoice,
        };
        if let HookDecision::Abort { reason } = self.hooks.before_payment(&ctx).await {
            #[cfg(feature = "telemetry")]
            warn!(%reason, "Payment aborted by hook");
            return Err(FetchError::Aborted(reason));
        }

        match self.pay_invoice(&ctx.invoice, None).await {
            PaymentOutcome::Succeeded { payment_id } => {
                #[cfg(feature = "telemetry")]
                info!(%payment_id, "Invoice paid");
                let receipt = PaymentReceipt {
                    payment_id,
                    invoice: ctx.invoice.clone(),
                    offer_id: ctx.plan.offer.id.clone(),
                };
                self.hooks.after_payment(&ctx, &receipt).await;
                Ok(receipt)
            }
            PaymentOutcome::Failed { reason } => {
                #[cfg(feature = "telemetry")]
                warn!(%reason, "Payment failed");
                self.hooks.on_payment_failure(&ctx, &reason).await;
                Err(FetchError::PaymentFailed { reason })
            }
        }
    }

    /// Pays `invoice` within the configured limits, without running hooks.
    ///
    /// The executor is told to give up after `limits.timeout` and is waited
    /// on for [`EXECUTOR_HTTP_GRACE`] longer. Executor errors and an elapsed
    /// deadline are folded into [`PaymentOutcome::Failed`]. `amount` is only needed for invoices
    /// that do not encode one.
    pub async fn pay_invoice(&self, invoice: &Invoice, amount: Option<MilliSatoshis>) -> PaymentOutcome {
        let request = PayInvoiceRequest {
            node_id: self.node_id.clone(),
            invoice: invoice.clone(),
            timeout: self.limits.timeout,
            maximum_fee: self.limits.maximum_fee,
            amount,
        };
        // The executor stops routing at `limits.timeout`; the grace lets its
        // answer for a payment settled right at the limit still arrive.
        let deadline = self.limits.timeout + EXECUTOR_HTTP_GRACE;
        match tokio::time::timeout(deadline, self.executor.pay(&request)).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => PaymentOutcome::Failed {
                reason: err.to_string(),
            },
            Err(_) => PaymentOutcome::Failed {
                reason: format!("payment timed out after {deadline:?}"),
            },
        }
    }
}

/// Requests the invoice for an offer from the server's resolution endpoint.
///
/// # Errors
///
/// Returns [`FetchError::InvoiceResolution`] on a transport error, a non-2xx
/// status, a malformed body or a missing invoice.
#[cfg_attr(
    feature = "telemetry",
    instrument(name = "l402.payment.resolve_invoice", skip(http, request, token), err)
)]
pub async fn resolve_invoice(
    http: &reqwest::Client,
    url: &str,
    request: &InvoiceRequest,
    token: Option<&AccountToken>,
) -> Result<Invoice, FetchError> {
    let mut builder = http.post(url).json(request);
    if let Some(token) = token {
        builder = builder.bearer_auth(token.as_str());
    }
    let response = builder
        .send()
        .await
        .map_err(|e| FetchError::InvoiceResolution(format!("request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(FetchError::InvoiceResolution(format!(
            "server returned {status}: {body}"
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| FetchError::InvoiceResolution(format!("failed to read body: {e}")))?;
    let issued: InvoiceResponse = serde_json::from_slice(&bytes)
        .map_err(|e| FetchError::InvoiceResolution(format!("malformed body: {e}")))?;
    let encoded = issued
        .lightning_invoice()
        .ok_or_else(|| FetchError::InvoiceResolution("response has no lightning invoice".into()))?;
    Invoice::parse(encoded).map_err(|e| FetchError::InvoiceResolution(e.to_string()))
}
