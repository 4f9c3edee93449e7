//! Tool definitions and strict argument decoding.

use l402::{Invoice, MilliSatoshis};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::error::ToolError;
use crate::types::ToolDefinition;

/// Name of the account signup tool.
pub const SIGNUP: &str = "signup";
/// Name of the stock quote tool.
pub const GET_STOCK: &str = "get_stock";
/// Name of the account info tool.
pub const GET_USER_INFO: &str = "get_user_info";
/// Name of the direct invoice payment tool.
pub const PAY_LIGHTNING: &str = "pay_lightning";
/// Name of the test invoice tool.
pub const CREATE_INVOICE: &str = "create_invoice";

/// Default amount of `create_invoice`.
pub const DEFAULT_INVOICE_AMOUNT: MilliSatoshis = MilliSatoshis(50_000);
/// Default memo of `create_invoice`.
pub const DEFAULT_INVOICE_MEMO: &str = "Test Payment";

const MAX_TICKER_LEN: usize = 10;

/// A decoded tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    /// Create an account and return its bearer token.
    Signup,
    /// Fetch a stock quote, paying for it if needed.
    GetStock {
        /// Upper-cased ticker symbol.
        ticker: String,
        /// Account token from `signup`.
        bearer_token: String,
    },
    /// Fetch account info and credit balance.
    GetUserInfo {
        /// Account token from `signup`.
        bearer_token: String,
    },
    /// Pay an invoice from the node.
    PayLightning {
        /// Invoice to pay.
        payment_request: Invoice,
    },
    /// Create a test-mode invoice on the node.
    CreateInvoice {
        /// Invoice amount.
        amount: MilliSatoshis,
        /// Memo shown to the payer.
        memo: String,
    },
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct NoArgs {}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct StockArgs {
    ticker: String,
    bearer_token: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TokenArgs {
    bearer_token: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PayArgs {
    payment_request: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct InvoiceArgs {
    #[serde(default)]
    amount_msats: Option<u64>,
    #[serde(default)]
    memo: Option<String>,
}

fn decode<T: DeserializeOwned>(tool: &'static str, arguments: Value) -> Result<T, ToolError> {
    // Models often send `null` or nothing for tools without arguments.
    let arguments = if arguments.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        arguments
    };
    serde_json::from_value(arguments).map_err(|e| ToolError::invalid(tool, e.to_string()))
}

fn non_blank(tool: &'static str, field: &str, value: String) -> Result<String, ToolError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ToolError::invalid(tool, format!("`{field}` must not be empty")));
    }
    Ok(trimmed.to_owned())
}

/// Validates and normalizes a ticker symbol.
///
/// Accepts 1 to 10 ASCII letters, digits, `.` or `-`, returned upper-cased.
/// Anything else is rejected, since the ticker becomes a URL path segment.
///
/// # Errors
///
/// Returns [`ToolError::InvalidArguments`] for an invalid ticker.
pub fn normalize_ticker(ticker: &str) -> Result<String, ToolError> {
    let ticker = ticker.trim();
    let valid = !ticker.is_empty()
        && ticker.len() <= MAX_TICKER_LEN
        && ticker
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    if !valid {
        return Err(ToolError::invalid(
            GET_STOCK,
            format!("`{ticker}` is not a valid ticker symbol"),
        ));
    }
    Ok(ticker.to_ascii_uppercase())
}

impl ToolCall {
    /// Decodes a tool invocation from its name and JSON arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::UnknownTool`] for an unknown name and
    /// [`ToolError::InvalidArguments`] if the arguments do not match the
    /// tool's schema.
    pub fn decode(name: &str, arguments: Value) -> Result<Self, ToolError> {
        match name {
            SIGNUP => {
                decode::<NoArgs>(SIGNUP, arguments)?;
                Ok(Self::Signup)
            }
            GET_STOCK => {
                let args: StockArgs = decode(GET_STOCK, arguments)?;
                Ok(Self::GetStock {
                    ticker: normalize_ticker(&args.ticker)?,
                    bearer_token: non_blank(GET_STOCK, "bearer_token", args.bearer_token)?,
                })
            }
            GET_USER_INFO => {
                let args: TokenArgs = decode(GET_USER_INFO, arguments)?;
                Ok(Self::GetUserInfo {
                    bearer_token: non_blank(GET_USER_INFO, "bearer_token", args.bearer_token)?,
                })
            }
            PAY_LIGHTNING => {
                let args: PayArgs = decode(PAY_LIGHTNING, arguments)?;
                let payment_request = Invoice::parse(&args.payment_request)
                    .map_err(|e| ToolError::invalid(PAY_LIGHTNING, e.to_string()))?;
                Ok(Self::PayLightning { payment_request })
            }
            CREATE_INVOICE => {
                let args: InvoiceArgs = decode(CREATE_INVOICE, arguments)?;
                let amount = args.amount_msats.map_or(DEFAULT_INVOICE_AMOUNT, MilliSatoshis);
                if amount == MilliSatoshis::ZERO {
                    return Err(ToolError::invalid(
                        CREATE_INVOICE,
                        "`amount_msats` must be greater than zero",
                    ));
                }
                Ok(Self::CreateInvoice {
                    amount,
                    memo: args.memo.unwrap_or_else(|| DEFAULT_INVOICE_MEMO.to_owned()),
                })
            }
            other => Err(ToolError::UnknownTool(other.to_owned())),
        }
    }

    /// Returns the tool name of this invocation.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Signup => SIGNUP,
            Self::GetStock { .. } => GET_STOCK,
            Self::GetUserInfo { .. } => GET_USER_INFO,
            Self::PayLightning { .. } => PAY_LIGHTNING,
            Self::CreateInvoice { .. } => CREATE_INVOICE,
        }
    }
}

/// Returns the definitions of every tool, in a stable order.
#[must_use]
pub fn definitions() -> Vec<ToolDefinition> {
    let bearer_token = json!({
        "type": "string",
        "description": "Bearer token obtained from signup"
    });

    vec![
        ToolDefinition {
            name: SIGNUP.into(),
            description: "Create a new user account for the stock API".into(),
            input_schema: json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        },
        ToolDefinition {
            name: GET_STOCK.into(),
            description: "Get financial data for a specific stock symbol. \
                Pays for the request automatically when credits run out."
                .into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "ticker": {
                        "type": "string",
                        "description": "Stock ticker symbol (e.g., AAPL)"
                    },
                    "bearer_token": bearer_token.clone()
                },
                "required": ["ticker", "bearer_token"]
            }),
        },
        ToolDefinition {
            name: GET_USER_INFO.into(),
            description: "Get current user information including credit balance".into(),
            input_schema: json!({
                "type": "object",
                "properties": { "bearer_token": bearer_token },
                "required": ["bearer_token"]
            }),
        },
        ToolDefinition {
            name: PAY_LIGHTNING.into(),
            description: "Pay a Lightning Network invoice".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "payment_request": {
                        "type": "string",
                        "description": "The Lightning Network payment request/invoice to pay"
                    }
                },
                "required": ["payment_request"]
            }),
        },
        ToolDefinition {
            name: CREATE_INVOICE.into(),
            description: "Create a test-mode Lightning invoice payable to this node".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "amount_msats": {
                        "type": "integer",
                        "minimum": 1,
                        "description": "Invoice amount in millisatoshis (default 50000)"
                    },
                    "memo": {
                        "type": "string",
                        "description": "Memo shown to the payer (default \"Test Payment\")"
                    }
                },
                "required": []
            }),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_get_stock() {
        let call = ToolCall::decode(
            GET_STOCK,
            json!({"ticker": " aapl ", "bearer_token": "tok"}),
        )
        .unwrap();
        assert_eq!(
            call,
            ToolCall::GetStock {
                ticker: "AAPL".into(),
                bearer_token: "tok".into()
            }
        );
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let err = ToolCall::decode(
            GET_USER_INFO,
            json!({"bearer_token": "tok", "__import__": "os"}),
        )
        .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { tool: GET_USER_INFO, .. }));
    }

    #[test]
    fn test_missing_required_field() {
        let err = ToolCall::decode(GET_STOCK, json!({"ticker": "AAPL"})).unwrap_err();
        assert!(err.to_string().contains("bearer_token"));
    }

    #[test]
    fn test_ticker_must_be_a_path_segment() {
        for bad in ["", "../info", "AAPL/1", "WAYTOOLONGTICKER", "A B"] {
            assert!(normalize_ticker(bad).is_err(), "{bad} accepted");
        }
        assert_eq!(normalize_ticker("brk.b").unwrap(), "BRK.B");
    }

    #[test]
    fn test_signup_accepts_null_or_empty() {
        assert_eq!(ToolCall::decode(SIGNUP, Value::Null).unwrap(), ToolCall::Signup);
        assert_eq!(ToolCall::decode(SIGNUP, json!({})).unwrap(), ToolCall::Signup);
        assert!(ToolCall::decode(SIGNUP, json!({"x": 1})).is_err());
    }

    #[test]
    fn test_create_invoice_defaults() {
        let call = ToolCall::decode(CREATE_INVOICE, json!({})).unwrap();
        assert_eq!(
            call,
            ToolCall::CreateInvoice {
                amount: MilliSatoshis(50_000),
                memo: "Test Payment".into()
            }
        );
        assert!(ToolCall::decode(CREATE_INVOICE, json!({"amount_msats": 0})).is_err());
    }

    #[test]
    fn test_pay_lightning_validates_invoice() {
        assert!(ToolCall::decode(PAY_LIGHTNING, json!({"payment_request": "not-an-invoice"})).is_err());
        let call = ToolCall::decode(PAY_LIGHTNING, json!({"payment_request": "lnbc10n1abc"})).unwrap();
        assert_eq!(call.name(), PAY_LIGHTNING);
    }

    #[test]
    fn test_unknown_tool() {
        assert!(matches!(
            ToolCall::decode("rm_rf", json!({})),
            Err(ToolError::UnknownTool(name)) if name == "rm_rf"
        ));
    }

    #[test]
    fn test_definitions_cover_every_tool() {
        let names: Vec<_> = definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(
            names,
            [SIGNUP, GET_STOCK, GET_USER_INFO, PAY_LIGHTNING, CREATE_INVOICE]
        );
    }
}
