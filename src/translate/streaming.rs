//! Per-stream state for translating Chat Completions chunks into Responses events.
//!
//! The [`StreamAccumulator`] processes `ChatCompletionChunk`s one at a time and
//! emits the corresponding Responses stream events (`response.created`,
//! `response.output_text.delta`, ...). It never buffers across chunks: each
//! chunk expands to its own events immediately.

use std::collections::HashMap;

use super::chat_types::{ChatCompletionChunk, ChunkChoice, ChunkToolCall};
use super::response::{incomplete_reason, map_usage, message_item_id};
use super::responses_types::{
    IncompleteDetails, ItemStatus, OutboundEvent, OutputItem, ResponseObject, ResponseStatus,
};

/// Output slot `i` belongs to choice `i`'s message. Tool calls are numbered
/// after every choice index seen so far, starting at 1 for a single choice.
const FIRST_TOOL_OUTPUT_INDEX: u32 = 1;

/// What we know about one streamed tool call.
#[derive(Debug, Clone)]
struct ToolCallSlot {
    id: Option<String>,
    output_index: u32,
    announced: bool,
}

/// State owned by a single fallback stream.
///
/// Usage:
///   let mut acc = StreamAccumulator::new("gpt-4o");
///   for chunk in chunks {
///       for event in acc.process_chunk(&chunk) {
///           // forward as SSE
///       }
///   }
#[derive(Debug)]
pub struct StreamAccumulator {
    requested_model: String,
    response_id: Option<String>,
    model: Option<String>,
    created_at: u64,
    created_sent: bool,
    next_output_index: u32,
    // (choice index, tool-call index) -> slot
    tool_calls: HashMap<(u32, u32), ToolCallSlot>,
}

impl StreamAccumulator {
    pub fn new(requested_model: &str) -> Self {
        Self {
            requested_model: requested_model.to_string(),
            response_id: None,
            model: None,
            created_at: 0,
            created_sent: false,
            next_output_index: FIRST_TOOL_OUTPUT_INDEX,
            tool_calls: HashMap::new(),
        }
    }

    /// Upstream response id, once the first chunk has been seen.
    pub fn response_id(&self) -> Option<&str> {
        self.response_id.as_deref()
    }

    /// Process a single chunk, returning zero or more Responses events in order.
    pub fn process_chunk(&mut self, chunk: &ChatCompletionChunk) -> Vec<OutboundEvent> {
        let mut events = Vec::new();

        if self.response_id.is_none() {
            self.response_id = Some(chunk.id.clone());
            self.created_at = chunk.created;
            if !chunk.model.is_empty() {
                self.model = Some(chunk.model.clone());
            }
        }

        if !self.created_sent {
            self.created_sent = true;
            events.push(OutboundEvent::Created {
                response: self.snapshot(ResponseStatus::InProgress, None),
            });
        }

        // keep tool slots clear of the message slots of this chunk's choices
        if let Some(max_choice) = chunk.choices.iter().map(|c| c.index).max() {
            self.next_output_index = self.next_output_index.max(max_choice + 1);
        }

        for choice in &chunk.choices {
            self.process_choice(choice, chunk, &mut events);
        }

        events
    }

    fn process_choice(
        &mut self,
        choice: &ChunkChoice,
        chunk: &ChatCompletionChunk,
        events: &mut Vec<OutboundEvent>,
    ) {
        if let Some(text) = choice.delta.content.as_deref().filter(|s| !s.is_empty()) {
            events.push(OutboundEvent::OutputTextDelta {
                item_id: message_item_id(self.current_response_id(), choice.index),
                output_index: choice.index,
                content_index: 0,
                delta: text.to_string(),
            });
        }

        if let Some(ref tool_calls) = choice.delta.tool_calls {
            for tc in tool_calls {
                self.process_tool_fragment(choice.index, tc, events);
            }
        }

        if let Some(ref reason) = choice.finish_reason {
            let incomplete = incomplete_reason(reason);
            let status = if incomplete.is_some() {
                ResponseStatus::Incomplete
            } else {
                ResponseStatus::Completed
            };
            let mut response = self.snapshot(status, incomplete);
            response.usage = chunk.usage.as_ref().map(map_usage);
            events.push(OutboundEvent::Completed { response });
        }
    }

    fn process_tool_fragment(
        &mut self,
        choice_index: u32,
        tc: &ChunkToolCall,
        events: &mut Vec<OutboundEvent>,
    ) {
        let next_output_index = &mut self.next_output_index;
        let slot = self
            .tool_calls
            .entry((choice_index, tc.index))
            .or_insert_with(|| {
                let output_index = *next_output_index;
                *next_output_index += 1;
                ToolCallSlot {
                    id: None,
                    output_index,
                    announced: false,
                }
            });

        if slot.id.is_none() {
            if let Some(id) = tc.id.as_deref().filter(|s| !s.is_empty()) {
                slot.id = Some(id.to_string());
            }
        }

        let item_id = slot
            .id
            .clone()
            .unwrap_or_else(|| format!("call_{}", tc.index));

        let function = match tc.function {
            Some(ref f) => f,
            None => return,
        };

        if !slot.announced {
            if let Some(ref name) = function.name {
                slot.announced = true;
                events.push(OutboundEvent::OutputItemAdded {
                    output_index: slot.output_index,
                    item: OutputItem::FunctionCall {
                        id: item_id.clone(),
                        call_id: item_id.clone(),
                        name: name.clone(),
                        arguments: String::new(),
                        status: ItemStatus::InProgress,
                    },
                });
            }
        }

        if let Some(args) = function.arguments.as_deref().filter(|s| !s.is_empty()) {
            events.push(OutboundEvent::FunctionCallArgumentsDelta {
                item_id,
                output_index: slot.output_index,
                delta: args.to_string(),
            });
        }
    }

    fn current_response_id(&self) -> &str {
        self.response_id.as_deref().unwrap_or_default()
    }

    fn snapshot(&self, status: ResponseStatus, incomplete: Option<&str>) -> ResponseObject {
        ResponseObject {
            id: self.current_response_id().to_string(),
            object: "response".to_string(),
            created_at: self.created_at,
            model: self
                .model
                .clone()
                .unwrap_or_else(|| self.requested_model.clone()),
            status,
            output: Vec::new(),
            incomplete_details: incomplete.map(|reason| IncompleteDetails {
                reason: reason.to_string(),
            }),
            usage: None,
        }
    }
}
