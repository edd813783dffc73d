pub mod upsert;

pub use upsert::{UpsertProfileCommand, UpsertProfileError, UpsertProfileResponse};
