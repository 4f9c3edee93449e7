//! OpenAI function-calling rendering.
//!
//! Renders the tools as chat-completions `tools` entries and turns a
//! model's `tool_calls` back into [`ToolCall`]s. The `arguments` string is
//! parsed as JSON and decoded strictly; it is never evaluated.

use serde::{Deserialize, Serialize};

use crate::error::ToolError;
use crate::server::ToolServer;
use crate::tools::{self, ToolCall};

/// `"type"` of function tools and tool calls.
pub const FUNCTION: &str = "function";

/// `"role"` of a tool reply message.
pub const TOOL_ROLE: &str = "tool";

/// A function description inside a [`FunctionTool`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    /// Function name.
    pub name: String,
    /// Description shown to the model.
    pub description: String,
    /// JSON Schema of the arguments object.
    pub parameters: serde_json::Value,
}

/// An entry of the chat-completions `tools` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionTool {
    /// Always `"function"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// The function.
    pub function: FunctionDefinition,
}

/// Returns every tool as an OpenAI function definition.
#[must_use]
pub fn function_tools() -> Vec<FunctionTool> {
    tools::definitions()
        .into_iter()
        .map(|d| FunctionTool {
            kind: FUNCTION.to_owned(),
            function: FunctionDefinition {
                name: d.name,
                description: d.description,
                parameters: d.input_schema,
            },
        })
        .collect()
}

/// The function part of a model's tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Function name chosen by the model.
    pub name: String,
    /// Arguments, as a JSON-encoded string.
    pub arguments: String,
}

/// An entry of an assistant message's `tool_calls` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Call id, echoed in the reply.
    pub id: String,
    /// Always `"function"`.
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    /// The function call.
    pub function: FunctionCall,
}

fn function_kind() -> String {
    FUNCTION.to_owned()
}

/// A `{"role": "tool"}` message answering one tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolMessage {
    /// Always `"tool"`.
    pub role: String,
    /// Id of the call being answered.
    pub tool_call_id: String,
    /// Tool output, or the error text.
    pub content: String,
}

impl FunctionCall {
    /// Decodes the call into a typed [`ToolCall`].
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidArguments`] if `arguments` is not JSON or
    /// does not match the tool, and [`ToolError::UnknownTool`] for an
    /// unknown name.
    pub fn decode(&self) -> Result<ToolCall, ToolError> {
        let arguments = if self.arguments.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&self.arguments).map_err(|e| ToolError::InvalidArguments {
                tool: "function call",
                reason: format!("arguments are not valid JSON: {e}"),
            })?
        };
        ToolCall::decode(&self.name, arguments)
    }
}

impl ToolServer {
    /// Runs one OpenAI tool call and builds the reply message.
    ///
    /// Decoding errors and tool failures become the message content.
    pub async fn answer(&self, request: &ToolCallRequest) -> ToolMessage {
        let content = match request.function.decode() {
            Ok(call) => self.run(call).await.text(),
            Err(err) => err.to_string(),
        };
        ToolMessage {
            role: TOOL_ROLE.to_owned(),
            tool_call_id: request.id.clone(),
            content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_function_tool_wire_shape() {
        let tools = serde_json::to_value(function_tools()).unwrap();
        assert_eq!(tools[1]["type"], "function");
        assert_eq!(tools[1]["function"]["name"], "get_stock");
        assert_eq!(
            tools[1]["function"]["parameters"]["required"],
            json!(["ticker", "bearer_token"])
        );
    }

    #[test]
    fn test_decode_tool_call_from_wire() {
        let request: ToolCallRequest = serde_json::from_value(json!({
            "id": "call_1",
            "type": "function",
            "function": {
                "name": "get_stock",
                "arguments": "{\"ticker\": \"MSFT\", \"bearer_token\": \"tok\"}"
            }
        }))
        .unwrap();
        assert_eq!(
            request.function.decode().unwrap(),
            ToolCall::GetStock {
                ticker: "MSFT".into(),
                bearer_token: "tok".into()
            }
        );
    }

    #[test]
    fn test_non_json_literal_rejected() {
        let call = FunctionCall {
            name: "pay_lightning".into(),
            arguments: "{'payment_request': __import__('os').getcwd()}".into(),
        };
        assert!(matches!(call.decode(), Err(ToolError::InvalidArguments { .. })));
    }

    #[test]
    fn test_empty_arguments_for_signup() {
        let call = FunctionCall {
            name: "signup".into(),
            arguments: String::new(),
        };
        assert_eq!(call.decode().unwrap(), ToolCall::Signup);
    }
}
