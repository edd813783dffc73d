pub mod append;
pub mod create_session;

pub use append::{AppendConversationCommand, AppendConversationError};
pub use create_session::{CreateSessionCommand, CreateSessionError};
