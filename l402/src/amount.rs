//! Millisatoshi amounts.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An amount of bitcoin expressed in millisatoshis (1/1000 of a satoshi).
///
/// Lightning invoices, routing fees and offer prices are all quoted in
/// millisatoshis. Serializes as a bare integer.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MilliSatoshis(pub u64);

impl MilliSatoshis {
    /// Zero millisatoshis.
    pub const ZERO: Self = Self(0);

    /// Returns the raw millisatoshi value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for MilliSatoshis {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for MilliSatoshis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} msat", self.0)
    }
}
