#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use l402::executor::{BoxFuture, PayInvoiceRequest, PaymentExecutor, PaymentOutcome};
use l402::{ExecutorError, PaymentLimits};
use l402::MilliSatoshis;
use l402_http::MeteredClient;
use serde_json::{Value, json};
use wiremock::MockServer;

pub const INVOICE: &str = "lnbc1500n1pjtestinvoice";

/// Executor that records every request and answers with a fixed outcome.
#[derive(Clone)]
pub struct RecordingExecutor {
    calls: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<PayInvoiceRequest>>>,
    outcome: PaymentOutcome,
    delay: Option<Duration>,
}

impl RecordingExecutor {
    pub fn succeeding() -> Self {
        Self::with_outcome(PaymentOutcome::Succeeded {
            payment_id: "pay-1".into(),
        })
    }

    pub fn failing(reason: &str) -> Self {
        Self::with_outcome(PaymentOutcome::Failed {
            reason: reason.into(),
        })
    }

    pub fn with_outcome(outcome: PaymentOutcome) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            seen: Arc::new(Mutex::new(Vec::new())),
            outcome,
            delay: None,
        }
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn paid_invoices(&self) -> Vec<String> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.invoice.as_str().to_owned())
            .collect()
    }

    pub fn last_request(&self) -> Option<PayInvoiceRequest> {
        self.seen.lock().unwrap().last().cloned()
    }
}

impl PaymentExecutor for RecordingExecutor {
    fn pay<'a>(
        &'a self,
        request: &'a PayInvoiceRequest,
    ) -> BoxFuture<'a, Result<PaymentOutcome, ExecutorError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(request.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(self.outcome.clone())
        })
    }
}

/// Executor that cannot be reached.
pub struct UnreachableExecutor;

impl PaymentExecutor for UnreachableExecutor {
    fn pay<'a>(
        &'a self,
        _request: &'a PayInvoiceRequest,
    ) -> BoxFuture<'a, Result<PaymentOutcome, ExecutorError>> {
        Box::pin(async { Err(ExecutorError::Transport("connection refused".into())) })
    }
}

pub fn client(server: &MockServer, executor: impl PaymentExecutor + 'static) -> MeteredClient {
    MeteredClient::builder(server.uri().parse().unwrap(), "node-1", executor)
        .build()
        .unwrap()
}

pub fn client_with_timeout(
    server: &MockServer,
    executor: impl PaymentExecutor + 'static,
    timeout: Duration,
) -> MeteredClient {
    MeteredClient::builder(server.uri().parse().unwrap(), "node-1", executor)
        .limits(PaymentLimits::new(timeout, MilliSatoshis(1000)).unwrap())
        .build()
        .unwrap()
}

/// A 402 body with one offer carrying an embedded invoice.
pub fn embedded_offer(invoice: &str) -> Value {
    json!({
        "offers": [{
            "id": "offer-1",
            "title": "1 credit",
            "amount": 1,
            "currency": "USD",
            "payment_methods": [{
                "payment_type": "lightning",
                "payment_details": { "payment_request": invoice }
            }]
        }]
    })
}

/// A 402 body whose first offer must be resolved at `url`.
pub fn resolvable_offer(url: &str) -> Value {
    json!({
        "offers": [{
            "id": "offer-1",
            "amount": 1,
            "currency": "USD",
            "payment_methods": ["lightning"]
        }],
        "payment_request_url": url,
        "payment_context_token": "ctx-token",
        "version": "0.2.2"
    })
}
