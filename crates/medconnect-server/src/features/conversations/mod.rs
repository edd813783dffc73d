//! Chat sessions and the encrypted conversation log
//!
//! Prompts and responses may contain PHI and are stored through the codec.

pub mod commands;
pub mod queries;
pub mod routes;
pub mod types;

pub use commands::{
    AppendConversationCommand, AppendConversationError, CreateSessionCommand, CreateSessionError,
};
pub use queries::{ListConversationsError, ListConversationsQuery};
pub use routes::chat_routes;
pub use types::{derive_title, ChatSession, Conversation};
