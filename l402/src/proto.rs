//! Wire format of an L402 resource server.
//!
//! Covers the signup response, the `402 Payment Required` body with its
//! payment offers, and the invoice-resolution request/response exchanged
//! with a `payment_request_url`.
//!
//! # 402 body
//!
//! ```json
//! {
//!   "offers": [
//!     {
//!       "id": "offer_a1b2",
//!       "payment_methods": [
//!         { "payment_type": "lightning", "payment_details": { "payment_request": "lnbc1..." } }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! Servers may instead list bare method names on each offer and put the
//! resolution endpoint on the envelope:
//!
//! ```json
//! {
//!   "offers": [{ "id": "offer_a1b2", "amount": 1, "currency": "USD", "payment_methods": ["lightning"] }],
//!   "payment_request_url": "https://api.example.com/l402/payment-request",
//!   "payment_context_token": "ctx_9f8e"
//! }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::LIGHTNING;

/// Bearer credential issued by the resource server at signup.
///
/// Attached as `Authorization: Bearer <token>` to every request after
/// signup. The [`Debug`] output only shows a short prefix.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountToken(String);

impl AccountToken {
    /// Wraps a token string as issued by the server.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the token is empty or whitespace.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for AccountToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(6).collect();
        f.debug_tuple("AccountToken")
            .field(&format!("{prefix}…"))
            .finish()
    }
}

impl fmt::Display for AccountToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Body of `GET /signup`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupResponse {
    /// The newly issued account token.
    pub id: String,
}

/// Body of a `402 Payment Required` response.
///
/// Accepts both the multi-offer envelope and the single-offer shape that
/// carries `payment_methods` at the top level. Use [`Self::offers`] to get
/// the normalized, ordered offer list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequired {
    /// Offers in server order; the first is the cheapest by convention.
    #[serde(default)]
    pub offers: Vec<Offer>,

    /// Payment methods of the single-offer shape.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub payment_methods: Vec<PaymentMethod>,

    /// Envelope-level invoice resolution endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_request_url: Option<String>,

    /// Envelope-level context token echoed back on invoice resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_context_token: Option<String>,

    /// Protocol version advertised by the server, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl PaymentRequired {
    /// Parses a 402 response body.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if the body is not a JSON object of the
    /// expected shape.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// Returns the offers in server order.
    ///
    /// The single-offer shape is returned as a one-element list.
    #[must_use]
    pub fn offers(&self) -> Vec<Offer> {
        if self.offers.is_empty() && !self.payment_methods.is_empty() {
            return vec![Offer {
                payment_methods: self.payment_methods.clone(),
                ..Offer::default()
            }];
        }
        self.offers.clone()
    }
}

/// One way to pay for a metered request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    /// Server-assigned offer identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Short human-readable title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Longer description, e.g. how many credits the offer buys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Price in the smallest unit of `currency`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,

    /// Currency of `amount` (e.g. `"USD"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,

    /// Accepted payment methods, in server preference order.
    #[serde(default)]
    pub payment_methods: Vec<PaymentMethod>,
}

/// A payment method listed on an [`Offer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PaymentMethod {
    /// Bare method name; details come from the 402 envelope.
    Named(String),
    /// Method with inline details.
    Detailed {
        /// Method type. Absent means Lightning.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payment_type: Option<String>,
        /// How to obtain the invoice.
        #[serde(default)]
        payment_details: PaymentDetails,
    },
}

impl PaymentMethod {
    /// Creates a Lightning method carrying an embedded invoice.
    #[must_use]
    pub fn lightning_invoice(invoice: impl Into<String>) -> Self {
        Self::Detailed {
            payment_type: Some(LIGHTNING.to_owned()),
            payment_details: PaymentDetails {
                payment_request: Some(invoice.into()),
                ..PaymentDetails::default()
            },
        }
    }

    /// Returns the declared method type, if any.
    #[must_use]
    pub fn payment_type(&self) -> Option<&str> {
        match self {
            Self::Named(name) => Some(name),
            Self::Detailed { payment_type, .. } => payment_type.as_deref(),
        }
    }

    /// Returns the inline details, if any.
    #[must_use]
    pub const fn details(&self) -> Option<&PaymentDetails> {
        match self {
            Self::Named(_) => None,
            Self::Detailed {
                payment_details, ..
            } => Some(payment_details),
        }
    }

    /// Returns `true` if this method is of the given payment type.
    ///
    /// Matching is ASCII case-insensitive. A method without a declared type
    /// counts as Lightning.
    #[must_use]
    pub fn is_type(&self, scheme: &str) -> bool {
        self.payment_type()
            .unwrap_or(LIGHTNING)
            .eq_ignore_ascii_case(scheme)
    }
}

/// Inline details of a [`PaymentMethod`].
///
/// Either `payment_request` is set, or the invoice must be fetched from
/// `payment_request_url` using `offer_id` and `payment_context_token`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    /// Embedded encoded invoice.
    #[serde(
        default,
        alias = "lightning_invoice",
        skip_serializing_if = "Option::is_none"
    )]
    pub payment_request: Option<String>,

    /// Endpoint that issues an invoice for the offer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_request_url: Option<String>,

    /// Offer being paid for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer_id: Option<String>,

    /// Opaque context token to echo back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_context_token: Option<String>,
}

/// Body of the invoice-resolution `POST {payment_request_url}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceRequest {
    /// Offer being paid for.
    pub offer_id: String,
    /// Requested payment method, always `"lightning"` here.
    pub payment_method: String,
    /// Context token from the 402 response.
    pub payment_context_token: String,
}

/// Response of the invoice-resolution endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceResponse {
    /// Issued payment request.
    #[serde(default)]
    pub payment_request: Option<IssuedPaymentRequest>,
}

impl InvoiceResponse {
    /// Returns the issued Lightning invoice, if present and non-empty.
    #[must_use]
    pub fn lightning_invoice(&self) -> Option<&str> {
        self.payment_request
            .as_ref()
            .and_then(|p| p.lightning_invoice.as_deref())
            .filter(|s| !s.trim().is_empty())
    }
}

/// Payment request object inside an [`InvoiceResponse`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedPaymentRequest {
    /// Encoded Lightning invoice.
    #[serde(default)]
    pub lightning_invoice: Option<String>,
}
