//! Error types for the HTTP client.

use http::StatusCode;
use l402::OfferError;
use l402::hooks::PaymentReceipt;

/// Errors that end a metered fetch.
///
/// None of these are retried; at most one payment is made per fetch.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The 402 response listed no offers.
    #[error("no payment offer available")]
    NoOfferAvailable,

    /// The chosen offer has no payment method this client can pay.
    #[error("no supported payment method in offer (offered: {offered:?})")]
    UnsupportedPaymentMethod {
        /// Payment types the offer listed.
        offered: Vec<String>,
    },

    /// The invoice could not be obtained from the offer.
    #[error("invoice resolution failed: {0}")]
    InvoiceResolution(String),

    /// The executor reported failure or did not answer in time.
    #[error("payment failed: {reason}")]
    PaymentFailed {
        /// Reason given by the executor, or the timeout.
        reason: String,
    },

    /// The first response was neither a success nor a 402.
    #[error("unexpected status {status}: {body}")]
    UnexpectedStatus {
        /// Response status.
        status: StatusCode,
        /// Response body, as text.
        body: String,
    },

    /// The 402 body could not be parsed.
    #[error("invalid 402 response body: {0}")]
    InvalidPaymentRequired(String),

    /// A payment hook refused the payment.
    #[error("payment aborted: {0}")]
    Aborted(String),

    /// A response body did not have the expected shape.
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// The resource path could not be joined onto the base URL.
    #[error("invalid resource URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The request body cannot be replayed for the paid retry.
    #[error("request is not cloneable (streaming body?)")]
    RequestNotCloneable,

    /// The resource server could not be reached.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The invoice was paid but the retried request did not complete.
    #[error("payment {} made but the retry failed: {source}", .receipt.payment_id)]
    RetryFailed {
        /// The payment that was made.
        receipt: Box<PaymentReceipt>,
        /// Why the retry failed.
        source: reqwest::Error,
    },
}

impl FetchError {
    /// Returns `true` if the error came from the payment step rather than
    /// from reaching the resource.
    #[must_use]
    pub const fn is_payment_error(&self) -> bool {
        matches!(
            self,
            Self::NoOfferAvailable
                | Self::UnsupportedPaymentMethod { .. }
                | Self::InvoiceResolution(_)
                | Self::PaymentFailed { .. }
                | Self::InvalidPaymentRequired(_)
                | Self::Aborted(_)
        )
    }

    /// Returns the payment made before this error, if any.
    #[must_use]
    pub fn receipt(&self) -> Option<&PaymentReceipt> {
        match self {
            Self::RetryFailed { receipt, .. } => Some(receipt),
            _ => None,
        }
    }
}

impl From<OfferError> for FetchError {
    fn from(err: OfferError) -> Self {
        match err {
            OfferError::NoOfferAvailable => Self::NoOfferAvailable,
            OfferError::UnsupportedPaymentMethod { offered } => {
                Self::UnsupportedPaymentMethod { offered }
            }
            other @ (OfferError::IncompleteDetails(_) | OfferError::InvalidInvoice(_)) => {
                Self::InvoiceResolution(other.to_string())
            }
        }
    }
}
