//! Translate Responses API requests into Chat Completions requests.
//!
//! Handles instructions, role messages, multi-part content (text, images),
//! function calls, function call outputs, and tool choice mapping. A single
//! input item maps to zero or one chat message; item references have no analogue.

use super::chat_types::{
    ChatCompletionRequest, ChatContent, ChatFunction, ChatMessage, ChatTool, ChatToolCall,
    ChatToolCallFunction, ChatToolChoice, ChatToolChoiceFunction, ChatToolChoiceSpecific,
    ContentPart as ChatPart, ImageUrlDetail, StreamOptions,
};
use super::responses_types::{
    ContentPart, FunctionCallItem, FunctionCallOutputItem, FunctionOutput, InputItem,
    MessageContent, MessageRole, ResponsesRequest, Tool, ToolChoice,
};

/// Translate a Responses API request into a Chat Completions request.
/// Pure function: the request is expected to be sanitized already.
pub fn responses_to_chat(req: &ResponsesRequest) -> ChatCompletionRequest {
    let mut messages = Vec::with_capacity(req.input.len() + 1);

    if let Some(ref instructions) = req.instructions {
        messages.push(ChatMessage::System {
            content: Some(ChatContent::Text(instructions.clone())),
        });
    }

    messages.extend(req.input.iter().filter_map(translate_item));

    let tools = req.tools.as_ref().and_then(|tools| {
        let translated: Vec<ChatTool> = tools.iter().filter_map(translate_tool).collect();
        if translated.is_empty() {
            None
        } else {
            Some(translated)
        }
    });

    let stream_options = req.stream.filter(|s| *s).map(|_| StreamOptions {
        include_usage: true,
    });

    ChatCompletionRequest {
        model: req.model.clone(),
        messages,
        max_tokens: req.max_output_tokens,
        temperature: req.temperature,
        top_p: req.top_p,
        stream: req.stream,
        stream_options,
        tools,
        tool_choice: req.tool_choice.as_ref().map(translate_tool_choice),
        parallel_tool_calls: req.parallel_tool_calls,
        user: req.user.clone(),
    }
}

fn translate_item(item: &InputItem) -> Option<ChatMessage> {
    match item {
        InputItem::SystemMessage(m) => Some(ChatMessage::System {
            content: reduce_content(&m.content),
        }),
        InputItem::DeveloperMessage(m) => Some(ChatMessage::Developer {
            content: reduce_content(&m.content),
        }),
        InputItem::UserMessage(m) => Some(ChatMessage::User {
            content: reduce_content(&m.content),
        }),
        InputItem::AssistantMessage(m) => Some(ChatMessage::Assistant {
            content: reduce_content(&m.content),
            tool_calls: None,
        }),
        InputItem::MessageInput(m) => {
            let content = reduce_content(&m.content);
            Some(match m.role {
                MessageRole::System => ChatMessage::System { content },
                MessageRole::Developer => ChatMessage::Developer { content },
                MessageRole::User => ChatMessage::User { content },
                MessageRole::Assistant => ChatMessage::Assistant {
                    content,
                    tool_calls: None,
                },
            })
        }
        InputItem::FunctionCall(call) => Some(translate_function_call(call)),
        InputItem::FunctionCallOutput(output) => Some(translate_function_output(output)),
        InputItem::ItemReference(_) => None,
    }
}

fn translate_function_call(call: &FunctionCallItem) -> ChatMessage {
    ChatMessage::Assistant {
        content: None,
        tool_calls: Some(vec![ChatToolCall {
            id: call.call_id.clone(),
            call_type: "function".to_string(),
            function: ChatToolCallFunction {
                name: call.name.clone(),
                arguments: call.arguments.clone(),
            },
        }]),
    }
}

fn translate_function_output(output: &FunctionCallOutputItem) -> ChatMessage {
    let text = match &output.output {
        FunctionOutput::Text(t) => t.clone(),
        FunctionOutput::Parts(parts) => parts
            .iter()
            .filter_map(|p| match p {
                ContentPart::OutputText { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect(),
    };

    ChatMessage::Tool {
        content: Some(ChatContent::Text(text)),
        tool_call_id: output.call_id.clone(),
    }
}

/// Reduce Responses content to a Chat Completions content value.
///
/// The first text part wins and later parts are discarded. Without any text,
/// image parts become an image-url list; file parts have no analogue. Empty
/// input yields `None`, which is sent as `null` rather than `""`.
pub fn reduce_content(content: &MessageContent) -> Option<ChatContent> {
    match content {
        MessageContent::Text(t) if t.is_empty() => None,
        MessageContent::Text(t) => Some(ChatContent::Text(t.clone())),
        MessageContent::Parts(parts) => {
            let first_text = parts.iter().find_map(|p| match p {
                ContentPart::InputText { text } | ContentPart::OutputText { text, .. } => {
                    Some(text)
                }
                _ => None,
            });
            if let Some(text) = first_text {
                return Some(ChatContent::Text(text.clone()));
            }

            let images: Vec<ChatPart> = parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::InputImage {
                        image_url: Some(url),
                        detail,
                        ..
                    } => Some(ChatPart::ImageUrl {
                        image_url: ImageUrlDetail {
                            url: url.clone(),
                            detail: detail.clone(),
                        },
                    }),
                    _ => None,
                })
                .collect();

            if images.is_empty() {
                None
            } else {
                Some(ChatContent::Parts(images))
            }
        }
    }
}

fn translate_tool(tool: &Tool) -> Option<ChatTool> {
    if tool.tool_type != "function" {
        return None;
    }
    let name = tool.name.clone()?;
    Some(ChatTool {
        tool_type: "function".to_string(),
        function: ChatFunction {
            name,
            description: tool.description.clone(),
            parameters: tool.parameters.clone(),
            strict: tool.strict,
        },
    })
}

fn translate_tool_choice(tc: &ToolChoice) -> ChatToolChoice {
    match tc {
        ToolChoice::Mode(mode) => ChatToolChoice::String(mode.clone()),
        ToolChoice::Function(f) => ChatToolChoice::Specific(ChatToolChoiceSpecific {
            choice_type: "function".to_string(),
            function: ChatToolChoiceFunction {
                name: f.name.clone(),
            },
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::responses_types::*;
    use serde_json::json;

    fn request(input: serde_json::Value) -> ResponsesRequest {
        serde_json::from_value(json!({ "model": "gpt-4o", "input": input })).unwrap()
    }

    #[test]
    fn test_instructions_become_leading_system_message() {
        let mut req = request(json!([{"role": "user", "content": "hi"}]));
        req.instructions = Some("You are helpful".to_string());

        let result = responses_to_chat(&req);

        assert_eq!(result.model, "gpt-4o");
        assert_eq!(result.messages.len(), 2);
        assert_eq!(result.messages[0].role(), "system");
        assert_eq!(result.messages[1].role(), "user");
    }

    #[test]
    fn test_simple_user_message_wire_shape() {
        let req = request(json!([{"role": "user", "content": "hi"}]));
        let result = serde_json::to_value(responses_to_chat(&req)).unwrap();
        assert_eq!(result["messages"], json!([{"role": "user", "content": "hi"}]));
    }

    #[test]
    fn test_function_call_and_output() {
        let req = request(json!([
            {"type": "function_call", "call_id": "call_1", "name": "lookup", "arguments": "{\"q\":1}"},
            {"type": "function_call_output", "call_id": "call_1", "output": "found"}
        ]));

        let result = responses_to_chat(&req);
        let json = serde_json::to_value(&result.messages).unwrap();

        assert_eq!(
            json[0],
            json!({
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "lookup", "arguments": "{\"q\":1}"}
                }]
            })
        );
        assert_eq!(
            json[1],
            json!({"role": "tool", "content": "found", "tool_call_id": "call_1"})
        );
    }

    #[test]
    fn test_structured_output_keeps_only_output_text() {
        let req = request(json!([
            {"type": "function_call", "call_id": "c", "name": "f", "arguments": "{}"},
            {"type": "function_call_output", "call_id": "c", "output": [
                {"type": "output_text", "text": "a"},
                {"type": "input_image", "image_url": "https://x/y.png"},
                {"type": "input_text", "text": "ignored"},
                {"type": "output_text", "text": "b"}
            ]}
        ]));

        let result = responses_to_chat(&req);
        assert_eq!(
            result.messages[1].content(),
            Some(&ChatContent::Text("ab".to_string()))
        );
    }

    #[test]
    fn test_first_text_part_short_circuits() {
        let content = MessageContent::Parts(vec![
            ContentPart::InputImage {
                image_url: Some("https://x/a.png".to_string()),
                file_id: None,
                detail: None,
            },
            ContentPart::InputText {
                text: "first".to_string(),
            },
            ContentPart::InputText {
                text: "second".to_string(),
            },
        ]);
        assert_eq!(
            reduce_content(&content),
            Some(ChatContent::Text("first".to_string()))
        );
    }

    #[test]
    fn test_images_without_text_become_parts() {
        let content = MessageContent::Parts(vec![
            ContentPart::InputImage {
                image_url: Some("https://x/a.png".to_string()),
                file_id: None,
                detail: Some("low".to_string()),
            },
            ContentPart::InputFile {
                file_id: Some("file_1".to_string()),
                file_data: None,
                filename: None,
            },
        ]);
        let reduced = reduce_content(&content);
        assert_eq!(
            reduced,
            Some(ChatContent::Parts(vec![ChatPart::ImageUrl {
                image_url: ImageUrlDetail {
                    url: "https://x/a.png".to_string(),
                    detail: Some("low".to_string()),
                },
            }]))
        );
    }

    #[test]
    fn test_empty_content_is_null_not_empty_string() {
        assert_eq!(reduce_content(&MessageContent::Text(String::new())), None);
        assert_eq!(reduce_content(&MessageContent::Parts(Vec::new())), None);

        let req = request(json!([{"role": "assistant", "content": ""}]));
        let json = serde_json::to_value(responses_to_chat(&req)).unwrap();
        assert_eq!(json["messages"][0]["content"], serde_json::Value::Null);
    }

    #[test]
    fn test_item_reference_is_dropped() {
        let req = request(json!([
            {"type": "item_reference", "id": "msg_1"},
            {"role": "user", "content": "next"}
        ]));
        let result = responses_to_chat(&req);
        assert_eq!(result.messages.len(), 1);
        assert_eq!(result.messages[0].role(), "user");
    }

    #[test]
    fn test_tools_and_named_tool_choice() {
        let req: ResponsesRequest = serde_json::from_value(json!({
            "model": "gpt-4o",
            "input": "weather?",
            "tools": [
                {"type": "function", "name": "get_weather", "description": "Weather", "parameters": {"type": "object"}},
                {"type": "web_search_preview"}
            ],
            "tool_choice": {"type": "function", "name": "get_weather"},
            "max_output_tokens": 256,
            "stream": true
        }))
        .unwrap();

        let result = responses_to_chat(&req);
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["tools"].as_array().map(Vec::len), Some(1));
        assert_eq!(json["tools"][0]["function"]["name"], "get_weather");
        assert_eq!(
            json["tool_choice"],
            json!({"type": "function", "function": {"name": "get_weather"}})
        );
        assert_eq!(json["max_tokens"], 256);
        assert_eq!(json["stream_options"]["include_usage"], true);
    }

    #[test]
    fn test_tool_choice_mode_passes_through() {
        let choice = translate_tool_choice(&ToolChoice::Mode("required".to_string()));
        assert_eq!(choice, ChatToolChoice::String("required".to_string()));
    }
}
