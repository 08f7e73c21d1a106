//! Conversation context and grounding assembly
//!
//! - Follow-up detection and history merging
//! - Bounded interaction log
//! - Grounding text for the language model

mod conversation;
mod grounding;

pub use conversation::{ContextDecision, ContextManager, ConversationTurn};
pub use grounding::{GroundingBuilder, PaperExcerpt, GROUNDING_INSTRUCTION};
