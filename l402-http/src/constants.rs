//! HTTP-specific constants for the L402 client.

use std::time::Duration;

/// Default L402 resource server (the public stock-quote demo API).
pub const DEFAULT_BASE_URL: &str = "https://stock.l402.org/";

/// Path that issues a new account token.
pub const SIGNUP_PATH: &str = "signup";

/// Path that reports account info and remaining credits.
pub const INFO_PATH: &str = "info";

/// Path prefix of the stock-quote resource.
pub const TICKER_PATH: &str = "ticker";

/// Request timeout for resource-server calls.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Extra time the client waits for the executor past the payment timeout.
///
/// Applies both to the client-side deadline and to the executor's HTTP
/// socket, so a payment settled at the timeout is still reported.
pub const EXECUTOR_HTTP_GRACE: Duration = Duration::from_secs(5);
