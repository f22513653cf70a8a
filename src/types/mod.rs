//! Library value types
//!
//! Ready-made values for content that has no dedicated record type.

pub mod any;
pub mod bytes;
pub mod list;

pub use any::AnyElement;
pub use bytes::Bytes;
pub use list::SpaceSeparated;
