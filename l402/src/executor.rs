//! The payment executor seam.
//!
//! A [`PaymentExecutor`] settles Lightning invoices against a funded node.
//! The L402 client only ever asks it to pay one invoice at a time, with a
//! fee ceiling and a timeout; how the node signs and routes the payment is
//! the executor's business.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use crate::amount::MilliSatoshis;
use crate::error::ExecutorError;
use crate::invoice::Invoice;

/// Boxed future returned by the executor traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A request to pay one invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayInvoiceRequest {
    /// Node that funds the payment.
    pub node_id: String,
    /// Invoice to pay.
    pub invoice: Invoice,
    /// How long the executor may spend routing the payment.
    pub timeout: Duration,
    /// Ceiling on routing fees.
    pub maximum_fee: MilliSatoshis,
    /// Amount to send, only needed for invoices that do not encode one.
    pub amount: Option<MilliSatoshis>,
}

/// Result of a payment attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// The invoice was paid.
    Succeeded {
        /// Executor-assigned payment identifier.
        payment_id: String,
    },
    /// The payment was attempted and did not complete.
    Failed {
        /// Why the payment failed (no route, fee ceiling, expired invoice…).
        reason: String,
    },
}

impl PaymentOutcome {
    /// Returns `true` if the payment succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

/// Settles Lightning invoices.
pub trait PaymentExecutor: Send + Sync {
    /// Pays one invoice.
    ///
    /// Returns `Ok(PaymentOutcome::Failed { .. })` when the payment was
    /// attempted and failed, and `Err` when the executor could not be asked
    /// at all.
    fn pay<'a>(
        &'a self,
        request: &'a PayInvoiceRequest,
    ) -> BoxFuture<'a, Result<PaymentOutcome, ExecutorError>>;
}

impl<T: PaymentExecutor + ?Sized> PaymentExecutor for Arc<T> {
    fn pay<'a>(
        &'a self,
        request: &'a PayInvoiceRequest,
    ) -> BoxFuture<'a, Result<PaymentOutcome, ExecutorError>> {
        (**self).pay(request)
    }
}

/// A request for a test-mode invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestInvoiceRequest {
    /// Node that will receive the payment.
    pub node_id: String,
    /// Invoice amount.
    pub amount: MilliSatoshis,
    /// Memo shown to the payer.
    pub memo: Option<String>,
}

/// Issues test-mode invoices, for exercising the pay path without real funds.
pub trait InvoiceIssuer: Send + Sync {
    /// Creates an invoice payable in test mode.
    fn create_test_invoice<'a>(
        &'a self,
        request: &'a TestInvoiceRequest,
    ) -> BoxFuture<'a, Result<Invoice, ExecutorError>>;
}

impl<T: InvoiceIssuer + ?Sized> InvoiceIssuer for Arc<T> {
    fn create_test_invoice<'a>(
        &'a self,
        request: &'a TestInvoiceRequest,
    ) -> BoxFuture<'a, Result<Invoice, ExecutorError>> {
        (**self).create_test_invoice(request)
    }
}

/// Executor for clients without a funded node.
///
/// Every payment is refused, so metered requests that need one fail with a
/// payment error while free requests still go through.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPayments;

impl PaymentExecutor for NoPayments {
    fn pay<'a>(
        &'a self,
        _request: &'a PayInvoiceRequest,
    ) -> BoxFuture<'a, Result<PaymentOutcome, ExecutorError>> {
        Box::pin(async { Err(ExecutorError::Unsupported("no funded node configured")) })
    }
}
