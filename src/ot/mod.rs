//! Operational transform engine.
//!
//! Pure functions over [`Operation`](crate::models::Operation) values. Nothing
//! here holds state, so every function may be called from any task without
//! synchronization.
//!
//! Offsets are flat UTF-16 code units. Positions past the end of a document
//! clamp to the end and lengths never go below zero.

pub mod apply;
pub mod diff;
pub mod transform;

pub use apply::{apply, apply_all, utf16_to_byte};
pub use diff::diff;
pub use transform::{transform, transform_batch};
