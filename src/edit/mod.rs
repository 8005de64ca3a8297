//! Structural mutations of the formula tree and the inbound payloads that drive them.
pub mod engine;
pub mod error;
pub mod payload;

pub use engine::{Edit, EditStatus};
pub use error::EditError;
pub use payload::Payload;
