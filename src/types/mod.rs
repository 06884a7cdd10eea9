//! Shared types used across layers.

mod pagination;
mod response;

pub use pagination::{AttributeValue, LastKey, Page, PageCursor, PageRequest};
pub use response::{Created, MessageResponse};
