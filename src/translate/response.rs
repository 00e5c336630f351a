use super::chat_types::{ChatCompletionResponse, ChatUsage};
use super::responses_types::{
    IncompleteDetails, ItemStatus, OutputContent, OutputItem, ResponseObject, ResponseStatus,
    ResponseUsage,
};

/// Translate a Chat Completion response into a Responses API response object.
/// Pure function: `model` is what the client originally requested.
pub fn chat_to_responses(resp: &ChatCompletionResponse, model: &str) -> ResponseObject {
    let mut output = Vec::new();

    for choice in &resp.choices {
        if let Some(ref text) = choice.message.content {
            if !text.is_empty() {
                output.push(OutputItem::Message {
                    id: message_item_id(&resp.id, choice.index),
                    role: "assistant".to_string(),
                    status: ItemStatus::Completed,
                    content: vec![OutputContent::OutputText {
                        text: text.clone(),
                        annotations: Vec::new(),
                    }],
                });
            }
        }

        if let Some(ref tool_calls) = choice.message.tool_calls {
            for tc in tool_calls {
                output.push(OutputItem::FunctionCall {
                    id: tc.id.clone(),
                    call_id: tc.id.clone(),
                    name: tc.function.name.clone(),
                    arguments: tc.function.arguments.clone(),
                    status: ItemStatus::Completed,
                });
            }
        }
    }

    let incomplete_reason = resp
        .choices
        .first()
        .and_then(|c| c.finish_reason.as_deref())
        .and_then(incomplete_reason);

    let status = if incomplete_reason.is_some() {
        ResponseStatus::Incomplete
    } else {
        ResponseStatus::Completed
    };

    ResponseObject {
        id: resp.id.clone(),
        object: "response".to_string(),
        created_at: resp.created,
        model: model.to_string(),
        status,
        output,
        incomplete_details: incomplete_reason.map(|reason| IncompleteDetails {
            reason: reason.to_string(),
        }),
        usage: resp.usage.as_ref().map(map_usage),
    }
}

/// Item id used for the assistant message synthesized from a choice.
pub fn message_item_id(response_id: &str, choice_index: u32) -> String {
    format!("msg_{response_id}_{choice_index}")
}

/// Map a Chat Completions finish_reason to a Responses `incomplete_details.reason`.
/// Returns `None` when the choice finished normally.
pub fn incomplete_reason(finish_reason: &str) -> Option<&'static str> {
    match finish_reason {
        "length" => Some("max_output_tokens"),
        "content_filter" => Some("content_filter"),
        _ => None,
    }
}

pub fn map_usage(usage: &ChatUsage) -> ResponseUsage {
    ResponseUsage {
        input_tokens: usage.prompt_tokens,
        output_tokens: usage.completion_tokens,
        total_tokens: usage.total_tokens,
    }
}
