#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types for the L402 pay-per-request protocol.
//!
//! L402 lets a client pay for individual HTTP requests over the Lightning
//! Network. A metered endpoint answers `402 Payment Required` with a list of
//! payment offers; the client settles one offer's invoice through a funded
//! node and retries the original request once.
//!
//! This crate is transport-agnostic. The HTTP client lives in `l402-http`
//! and the agent tool surface in `l402-mcp`.
//!
//! # Modules
//!
//! - [`amount`] - Millisatoshi amounts
//! - [`config`] - Node credentials and payment limits
//! - [`error`] - Configuration, offer and executor errors
//! - [`executor`] - The payment executor seam and its request/outcome types
//! - [`hooks`] - Lifecycle hooks around the payment step
//! - [`invoice`] - Encoded Lightning invoices
//! - [`offer`] - Offer selection and invoice source lookup
//! - [`proto`] - Wire format of the resource server

pub mod amount;
pub mod config;
pub mod error;
pub mod executor;
pub mod hooks;
pub mod invoice;
pub mod offer;
pub mod proto;

pub use amount::MilliSatoshis;
pub use config::{NodeConfig, PaymentLimits};
pub use error::{ConfigError, ExecutorError, OfferError};
pub use executor::{
    BoxFuture, InvoiceIssuer, NoPayments, PayInvoiceRequest, PaymentExecutor, PaymentOutcome,
    TestInvoiceRequest,
};
pub use hooks::{HookChain, HookDecision, PaymentContext, PaymentHooks, PaymentReceipt};
pub use invoice::Invoice;
pub use offer::{FirstOffer, InvoiceSource, MaxAmount, OfferSelector, PaymentPlan, plan_payment};
pub use proto::{AccountToken, Offer, PaymentMethod, PaymentRequired};

/// Payment type identifier for Lightning Network payment methods.
pub const LIGHTNING: &str = "lightning";
