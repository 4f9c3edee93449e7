//! Encoded Lightning invoices.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::OfferError;

/// An encoded Lightning payment request (BOLT 11).
///
/// Only the outer shape is checked: the string must be non-empty, contain no
/// whitespace and carry the `ln` human-readable prefix. Decoding and signature
/// checks are left to the payment executor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Invoice(String);

impl Invoice {
    /// Parses an encoded invoice, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`OfferError::InvalidInvoice`] if the string is empty,
    /// contains inner whitespace, or lacks the `ln` prefix.
    pub fn parse(encoded: &str) -> Result<Self, OfferError> {
        let encoded = encoded.trim();
        if encoded.is_empty() {
            return Err(OfferError::InvalidInvoice("empty invoice".to_owned()));
        }
        if encoded.chars().any(char::is_whitespace) {
            return Err(OfferError::InvalidInvoice(
                "invoice contains whitespace".to_owned(),
            ));
        }
        let prefix = encoded.get(..2).unwrap_or_default();
        if !prefix.eq_ignore_ascii_case("ln") {
            return Err(OfferError::InvalidInvoice(format!(
                "expected an 'ln' prefix, got '{prefix}'"
            )));
        }
        Ok(Self(encoded.to_owned()))
    }

    /// Returns the encoded invoice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Invoice {
    type Err = OfferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Invoice {
    type Error = OfferError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Invoice> for String {
    fn from(value: Invoice) -> Self {
        value.0
    }
}

impl fmt::Display for Invoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
