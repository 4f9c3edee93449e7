//! The pay-and-retry flow as a `reqwest-middleware` layer.
//!
//! Use this when requests are built by other code on a shared
//! [`ClientWithMiddleware`](rqm::ClientWithMiddleware). A 402 response is
//! paid for through [`PaymentFlow`] and the original request is replayed
//! once; the replayed response is returned whatever its status.

use std::sync::Arc;

use http::header::AUTHORIZATION;
use http::{Extensions, StatusCode};
use l402::proto::AccountToken;
use reqwest::{Client, ClientBuilder, Request, Response};
use reqwest_middleware as rqm;
#[cfg(feature = "telemetry")]
use tracing::{info, instrument, trace};

use crate::error::FetchError;
use crate::payment::PaymentFlow;

/// Middleware that pays for `402 Payment Required` responses.
#[allow(missing_debug_implementations)] // PaymentFlow holds dyn trait objects
#[derive(Clone)]
pub struct L402Middleware {
    flow: Arc<PaymentFlow>,
}

impl L402Middleware {
    /// Wraps a payment flow.
    #[must_use]
    pub fn new(flow: PaymentFlow) -> Self {
        Self::from_shared(Arc::new(flow))
    }

    /// Wraps a payment flow shared with other clients.
    #[must_use]
    pub const fn from_shared(flow: Arc<PaymentFlow>) -> Self {
        Self { flow }
    }
}

/// Runs the next middleware or HTTP client with optional telemetry instrumentation.
#[cfg_attr(feature = "telemetry", instrument(name = "l402.reqwest.next", skip_all))]
async fn run_next(
    next: rqm::Next<'_>,
    req: Request,
    extensions: &mut Extensions,
) -> rqm::Result<Response> {
    next.run(req, extensions).await
}

/// Reads the account token back out of an `Authorization: Bearer` header.
fn bearer_token(req: &Request) -> Option<AccountToken> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(AccountToken::new)
}

#[async_trait::async_trait]
impl rqm::Middleware for L402Middleware {
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "l402.reqwest.handle", skip_all, err)
    )]
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: rqm::Next<'_>,
    ) -> rqm::Result<Response> {
        let retry_req = req.try_clone();
        let token = bearer_token(&req);
        let url = req.url().to_string();
        let res = run_next(next.clone(), req, extensions).await?;

        if res.status() != StatusCode::PAYMENT_REQUIRED {
            #[cfg(feature = "telemetry")]
            trace!(status = ?res.status(), "No payment required, returning response");
            return Ok(res);
        }

        #[cfg(feature = "telemetry")]
        info!(%url, "Received 402 Payment Required, processing payment");

        // Refuse before paying if the request cannot be replayed.
        let retry = retry_req.ok_or_else(|| {
            rqm::Error::Middleware(FetchError::RequestNotCloneable.into())
        })?;
        let body = res.bytes().await.map_err(rqm::Error::Reqwest)?;
        let receipt = self
            .flow
            .pay_for(&url, token.as_ref(), &body)
            .await
            .map_err(|e| rqm::Error::Middleware(e.into()))?;

        run_next(next, retry, extensions)
            .await
            .map_err(|e| match e {
                rqm::Error::Reqwest(source) => rqm::Error::Middleware(
                    FetchError::RetryFailed {
                        receipt: Box::new(receipt),
                        source,
                    }
                    .into(),
                ),
                other => other,
            })
    }
}

/// Adds L402 payment handling to `reqwest` clients.
pub trait ReqwestWithL402 {
    /// Wraps the client in a [`ClientWithMiddleware`](rqm::ClientWithMiddleware)
    /// that pays for 402 responses.
    ///
    /// # Errors
    ///
    /// Returns [`reqwest::Error`] if a builder fails to build.
    fn with_l402(self, middleware: L402Middleware) -> Result<rqm::ClientWithMiddleware, reqwest::Error>;
}

impl ReqwestWithL402 for Client {
    fn with_l402(self, middleware: L402Middleware) -> Result<rqm::ClientWithMiddleware, reqwest::Error> {
        Ok(rqm::ClientBuilder::new(self).with(middleware).build())
    }
}

impl ReqwestWithL402 for ClientBuilder {
    fn with_l402(self, middleware: L402Middleware) -> Result<rqm::ClientWithMiddleware, reqwest::Error> {
        self.build()?.with_l402(middleware)
    }
}
