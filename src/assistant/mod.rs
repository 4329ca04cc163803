//! Conversational Responder
//!
//! Answers free-text questions about the cached sales data through a
//! prioritized list of remote models, with local keyword-based answers when
//! every model fails.

pub mod context;
pub mod fallback;
pub mod llm;
pub mod responder;

pub use fallback::{classify, Intent, NO_DATA_MESSAGE};
pub use llm::{CompletionProvider, LlmClient, ModelProvider};
pub use responder::{ConversationalResponder, Reply, ReplySource};
