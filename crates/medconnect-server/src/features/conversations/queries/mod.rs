pub mod list;

pub use list::{ListConversationsError, ListConversationsQuery};
