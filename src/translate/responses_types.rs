//! Type definitions for the Responses API: what clients send to the gateway and
//! what the gateway sends back, including streaming events.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Request types (what clients send TO us)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponsesRequest {
    pub model: String,
    #[serde(deserialize_with = "deserialize_input")]
    pub input: Vec<InputItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel_tool_calls: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_response_id: Option<String>,
    // Forwarded untouched to the Responses endpoint (reasoning, store, text, ...)
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl ResponsesRequest {
    pub fn is_streaming(&self) -> bool {
        self.stream.unwrap_or(false)
    }
}

/// `input` is either a bare string (one user message) or a list of items.
fn deserialize_input<'de, D>(deserializer: D) -> Result<Vec<InputItem>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawInput {
        Text(String),
        Items(Vec<InputItem>),
    }

    Ok(match RawInput::deserialize(deserializer)? {
        RawInput::Text(text) => vec![InputItem::UserMessage(EasyMessage {
            content: MessageContent::Text(text),
        })],
        RawInput::Items(items) => items,
    })
}

/// One entry of the request `input` list.
///
/// Role messages arrive without a `type` field; every other item is tagged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireInputItem", into = "WireInputItem")]
pub enum InputItem {
    SystemMessage(EasyMessage),
    DeveloperMessage(EasyMessage),
    UserMessage(EasyMessage),
    AssistantMessage(EasyMessage),
    MessageInput(MessageItem),
    FunctionCall(FunctionCallItem),
    FunctionCallOutput(FunctionCallOutputItem),
    ItemReference(ItemReference),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
enum WireInputItem {
    Typed(TypedItem),
    Role(RoleItem),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TypedItem {
    Message(MessageItem),
    FunctionCall(FunctionCallItem),
    FunctionCallOutput(FunctionCallOutputItem),
    ItemReference(ItemReference),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
enum RoleItem {
    System(RoleBody),
    Developer(RoleBody),
    User(RoleBody),
    Assistant(RoleBody),
}

/// Role message as seen on the wire. A `type` other than `message` means the
/// item only fell through to the role shape because its real type is unknown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct RoleBody {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    item_type: Option<String>,
    content: MessageContent,
}

impl RoleBody {
    fn into_message(self) -> Result<EasyMessage, String> {
        match self.item_type.as_deref() {
            None | Some("message") => Ok(EasyMessage {
                content: self.content,
            }),
            Some(other) => Err(format!("unsupported input item type `{other}`")),
        }
    }
}

impl From<EasyMessage> for RoleBody {
    fn from(m: EasyMessage) -> Self {
        Self {
            item_type: None,
            content: m.content,
        }
    }
}

impl TryFrom<WireInputItem> for InputItem {
    type Error = String;

    fn try_from(wire: WireInputItem) -> Result<Self, Self::Error> {
        Ok(match wire {
            WireInputItem::Typed(TypedItem::Message(m)) => InputItem::MessageInput(m),
            WireInputItem::Typed(TypedItem::FunctionCall(c)) => InputItem::FunctionCall(c),
            WireInputItem::Typed(TypedItem::FunctionCallOutput(o)) => {
                InputItem::FunctionCallOutput(o)
            }
            WireInputItem::Typed(TypedItem::ItemReference(r)) => InputItem::ItemReference(r),
            WireInputItem::Role(RoleItem::System(b)) => InputItem::SystemMessage(b.into_message()?),
            WireInputItem::Role(RoleItem::Developer(b)) => {
                InputItem::DeveloperMessage(b.into_message()?)
            }
            WireInputItem::Role(RoleItem::User(b)) => InputItem::UserMessage(b.into_message()?),
            WireInputItem::Role(RoleItem::Assistant(b)) => {
                InputItem::AssistantMessage(b.into_message()?)
            }
        })
    }
}

impl From<InputItem> for WireInputItem {
    fn from(item: InputItem) -> Self {
        match item {
            InputItem::MessageInput(m) => WireInputItem::Typed(TypedItem::Message(m)),
            InputItem::FunctionCall(c) => WireInputItem::Typed(TypedItem::FunctionCall(c)),
            InputItem::FunctionCallOutput(o) => {
                WireInputItem::Typed(TypedItem::FunctionCallOutput(o))
            }
            InputItem::ItemReference(r) => WireInputItem::Typed(TypedItem::ItemReference(r)),
            InputItem::SystemMessage(m) => WireInputItem::Role(RoleItem::System(m.into())),
            InputItem::DeveloperMessage(m) => WireInputItem::Role(RoleItem::Developer(m.into())),
            InputItem::UserMessage(m) => WireInputItem::Role(RoleItem::User(m.into())),
            InputItem::AssistantMessage(m) => WireInputItem::Role(RoleItem::Assistant(m.into())),
        }
    }
}

/// Body of a role message (`{"role": ..., "content": ...}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EasyMessage {
    pub content: MessageContent,
}

/// A `type: "message"` item, as replayed from earlier response output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub role: MessageRole,
    pub content: MessageContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    Developer,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCallItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub call_id: String,
    pub name: String,
    pub arguments: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCallOutputItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub call_id: String,
    pub output: FunctionOutput,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemReference {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FunctionOutput {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    InputText {
        text: String,
    },
    OutputText {
        text: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        annotations: Vec<serde_json::Value>,
    },
    InputImage {
        #[serde(skip_serializing_if = "Option::is_none")]
        image_url: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        file_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
    InputFile {
        #[serde(skip_serializing_if = "Option::is_none")]
        file_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        file_data: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        filename: Option<String>,
    },
}

/// Tool declaration. Only `function` tools have a Chat Completions analogue;
/// built-in tools are kept for pass-through via `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    #[serde(rename = "type")]
    pub tool_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolChoice {
    Mode(String), // "auto", "required", "none"
    Function(ToolChoiceFunction),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolChoiceFunction {
    #[serde(rename = "type")]
    pub choice_type: String, // "function"
    pub name: String,
}

// ---------------------------------------------------------------------------
// Response types (what we send BACK to clients)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseObject {
    pub id: String,
    pub object: String, // "response"
    pub created_at: u64,
    pub model: String,
    pub status: ResponseStatus,
    pub output: Vec<OutputItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incomplete_details: Option<IncompleteDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<ResponseUsage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    InProgress,
    Completed,
    Incomplete,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncompleteDetails {
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputItem {
    Message {
        id: String,
        role: String, // "assistant"
        status: ItemStatus,
        content: Vec<OutputContent>,
    },
    FunctionCall {
        id: String,
        call_id: String,
        name: String,
        arguments: String,
        status: ItemStatus,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    InProgress,
    Completed,
    Incomplete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputContent {
    OutputText {
        text: String,
        #[serde(default)]
        annotations: Vec<serde_json::Value>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

// ---------------------------------------------------------------------------
// Streaming event types (SSE events we send back to clients)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutboundEvent {
    #[serde(rename = "response.created")]
    Created { response: ResponseObject },
    #[serde(rename = "response.output_item.added")]
    OutputItemAdded { output_index: u32, item: OutputItem },
    #[serde(rename = "response.output_item.done")]
    OutputItemDone { output_index: u32, item: OutputItem },
    #[serde(rename = "response.output_text.delta")]
    OutputTextDelta {
        item_id: String,
        output_index: u32,
        content_index: u32,
        delta: String,
    },
    #[serde(rename = "response.function_call_arguments.delta")]
    FunctionCallArgumentsDelta {
        item_id: String,
        output_index: u32,
        delta: String,
    },
    #[serde(rename = "response.completed")]
    Completed { response: ResponseObject },
    #[serde(rename = "error")]
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
        message: String,
    },
}

impl OutboundEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            OutboundEvent::Created { .. } => "response.created",
            OutboundEvent::OutputItemAdded { .. } => "response.output_item.added",
            OutboundEvent::OutputItemDone { .. } => "response.output_item.done",
            OutboundEvent::OutputTextDelta { .. } => "response.output_text.delta",
            OutboundEvent::FunctionCallArgumentsDelta { .. } => {
                "response.function_call_arguments.delta"
            }
            OutboundEvent::Completed { .. } => "response.completed",
            OutboundEvent::Error { .. } => "error",
        }
    }
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorResponse {
    pub fn new(error_type: &str, message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                error_type: error_type.to_string(),
                message: message.into(),
                code: None,
            },
        }
    }

    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.error.code = Some(code.into());
        self
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::new("invalid_request_error", msg)
    }

    pub fn unsupported_model(msg: impl Into<String>) -> Self {
        Self::new("unsupported_model", msg).with_code("unsupported_model")
    }

    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::new("rate_limit_error", msg)
    }

    pub fn api_error(msg: impl Into<String>) -> Self {
        Self::new("api_error", msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_and_typed_items_parse() {
        let req: ResponsesRequest = serde_json::from_value(serde_json::json!({
            "model": "gpt-4o",
            "input": [
                {"role": "system", "content": "be brief"},
                {"role": "user", "content": [{"type": "input_text", "text": "hi"}]},
                {"type": "message", "role": "assistant", "content": [{"type": "output_text", "text": "hello"}]},
                {"type": "function_call", "call_id": "call_1", "name": "foo", "arguments": "{}"},
                {"type": "function_call_output", "call_id": "call_1", "output": "42"},
                {"type": "item_reference", "id": "msg_123"}
            ]
        }))
        .unwrap();

        assert_eq!(req.input.len(), 6);
        assert!(matches!(req.input[0], InputItem::SystemMessage(_)));
        assert!(matches!(req.input[1], InputItem::UserMessage(_)));
        assert!(matches!(
            req.input[2],
            InputItem::MessageInput(MessageItem {
                role: MessageRole::Assistant,
                ..
            })
        ));
        assert!(matches!(req.input[3], InputItem::FunctionCall(_)));
        assert!(matches!(req.input[4], InputItem::FunctionCallOutput(_)));
        assert!(matches!(req.input[5], InputItem::ItemReference(_)));
    }

    #[test]
    fn test_string_input_becomes_user_message() {
        let req: ResponsesRequest =
            serde_json::from_str(r#"{"model":"m","input":"hello"}"#).unwrap();
        assert_eq!(
            req.input,
            vec![InputItem::UserMessage(EasyMessage {
                content: MessageContent::Text("hello".to_string())
            })]
        );
    }

    #[test]
    fn test_unknown_item_type_is_rejected() {
        let result: Result<ResponsesRequest, _> = serde_json::from_value(serde_json::json!({
            "model": "m",
            "input": [{"type": "reasoning", "summary": []}]
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_role_shaped_item_with_unknown_type_is_rejected() {
        let item = serde_json::json!({"type": "reasoning", "role": "user", "content": "x"});
        let err = serde_json::from_value::<InputItem>(item.clone())
            .unwrap_err()
            .to_string();
        assert!(err.contains("reasoning"), "{err}");

        let result: Result<ResponsesRequest, _> =
            serde_json::from_value(serde_json::json!({"model": "m", "input": [item]}));
        assert!(result.is_err());
    }

    #[test]
    fn test_role_message_with_message_type_is_accepted() {
        let req: ResponsesRequest = serde_json::from_value(serde_json::json!({
            "model": "m",
            "input": [{"type": "message", "role": "user", "content": "x"}]
        }))
        .unwrap();
        assert_eq!(req.input.len(), 1);
    }

    #[test]
    fn test_role_message_serializes_without_type() {
        let item = InputItem::DeveloperMessage(EasyMessage {
            content: MessageContent::Text("rules".to_string()),
        });
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json, serde_json::json!({"role": "developer", "content": "rules"}));
    }

    #[test]
    fn test_extra_fields_survive_for_passthrough() {
        let req: ResponsesRequest = serde_json::from_value(serde_json::json!({
            "model": "o3",
            "input": "hi",
            "reasoning": {"effort": "high"},
            "store": false
        }))
        .unwrap();
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["reasoning"]["effort"], "high");
        assert_eq!(json["store"], false);
    }

    #[test]
    fn test_event_type_tags() {
        let event = OutboundEvent::FunctionCallArgumentsDelta {
            item_id: "call_1".to_string(),
            output_index: 1,
            delta: "{}".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.event_name());

        let done = OutboundEvent::OutputItemDone {
            output_index: 0,
            item: OutputItem::FunctionCall {
                id: "call_1".to_string(),
                call_id: "call_1".to_string(),
                name: "foo".to_string(),
                arguments: "{}".to_string(),
                status: ItemStatus::Completed,
            },
        };
        let json = serde_json::to_value(&done).unwrap();
        assert_eq!(json["type"], "response.output_item.done");
        assert_eq!(json["item"]["type"], "function_call");
    }
}
