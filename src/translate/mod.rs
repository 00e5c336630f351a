//! API translation between the Responses and Chat Completions formats.
//!
//! The core of the gateway's fallback path: converts requests, responses, and
//! streaming events between the two API formats. All translation functions are
//! pure (no I/O) and total: unsupported sub-cases degrade to dropped output.

pub mod chat_types;
pub mod request;
pub mod response;
pub mod responses_types;
pub mod streaming;
