#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! HTTP transport for the L402 pay-per-request protocol.
//!
//! [`MeteredClient`] fetches resources from an L402 server and pays for
//! them on the fly: when a request comes back `402 Payment Required`, the
//! client picks the first offer, obtains its Lightning invoice, has a
//! [`PaymentExecutor`](l402::PaymentExecutor) pay it, and retries the
//! request exactly once.
//!
//! ```rust,no_run
//! use l402::AccountToken;
//! use l402_http::{HttpPaymentExecutor, MeteredClient};
//! use l402_http::executor::ExecutorConfig;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let executor = HttpPaymentExecutor::new(ExecutorConfig::new("http://127.0.0.1:9735"))?;
//! let client = MeteredClient::builder("https://stock.l402.org".parse()?, "node-id", executor)
//!     .build()?;
//!
//! let token: AccountToken = client.signup().await?;
//! let quote = client.fetch("ticker/AAPL", &token).await?;
//! println!("{}", quote.text());
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`client`] - [`MeteredClient`] and its builder
//! - [`constants`] - Default endpoints, paths and timeouts
//! - [`error`] - [`FetchError`]
//! - [`executor`] - [`HttpPaymentExecutor`], a bridge to a node payment service
//! - [`middleware`] - The same pay-and-retry flow as a `reqwest-middleware` layer
//! - [`payment`] - The payment step shared by the client and the middleware
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation

pub mod client;
pub mod constants;
pub mod error;
pub mod executor;
pub mod middleware;
pub mod payment;

pub use client::{MeteredClient, MeteredClientBuilder, MeteredResponse};
pub use error::FetchError;
pub use executor::HttpPaymentExecutor;
pub use middleware::{L402Middleware, ReqwestWithL402};
pub use payment::PaymentFlow;
