//! 📐 Schema: the flat record and its closed enumerations.
//!
//! Leaf module. Knows nothing about updates, HTTP, or buffers.

pub mod kinds;
pub mod record;

pub use kinds::{ChatKind, MemberStatusKind, MessageKind, UpdateKind};
pub use record::{FIELD_NAMES, NormalizedRecord, is_known_field};
