//! Error types for the L402 core.

/// Errors raised while choosing an offer and locating its invoice.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OfferError {
    /// The 402 response listed no offers, or the selector accepted none.
    #[error("no payment offer available")]
    NoOfferAvailable,

    /// The selected offer has no payment method of a supported type.
    #[error("no supported payment method in offer (offered: {offered:?})")]
    UnsupportedPaymentMethod {
        /// Payment types the offer listed.
        offered: Vec<String>,
    },

    /// The payment method neither embeds an invoice nor carries a full
    /// resolution triple.
    #[error("incomplete payment details: missing {0}")]
    IncompleteDetails(&'static str),

    /// An invoice string is malformed.
    #[error("invalid invoice: {0}")]
    InvalidInvoice(String),
}

/// Errors raised by a payment executor before it could report an outcome.
///
/// A payment that was attempted and failed is an
/// [`PaymentOutcome::Failed`](crate::executor::PaymentOutcome::Failed),
/// not an error.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// The executor could not be reached.
    #[error("payment executor unreachable: {0}")]
    Transport(String),

    /// The executor answered with something it should not have.
    #[error("payment executor returned an invalid response: {0}")]
    InvalidResponse(String),

    /// The executor rejected the request (bad credentials, unknown node).
    #[error("payment executor rejected the request ({status}): {message}")]
    Rejected {
        /// HTTP-like status code reported by the executor.
        status: u16,
        /// Message from the executor.
        message: String,
    },

    /// The operation is not offered by this executor.
    #[error("operation not supported by this executor: {0}")]
    Unsupported(&'static str),
}

/// Errors raised while building a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required value is missing or blank.
    #[error("missing required setting `{0}`")]
    Missing(&'static str),

    /// A value is present but unusable.
    #[error("invalid value for `{name}`: {reason}")]
    Invalid {
        /// Setting name.
        name: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}
