//! Patient profiles
//!
//! `medical_history` and `contact_number` are stored encrypted. A SHA-256
//! digest of the contact number is kept beside it for exact-match lookup.

pub mod commands;
pub mod queries;
pub mod routes;
pub mod types;

pub use commands::{UpsertProfileCommand, UpsertProfileError, UpsertProfileResponse};
pub use queries::{GetProfileError, GetProfileQuery};
pub use routes::patient_routes;
pub use types::{Gender, PatientProfile};
