//! Shared domain types.

pub mod id;

pub use id::{ClassId, ListenerId, ManagerId};
