//! Request extractors: caller roles and submitted values.

pub mod roles;
pub mod submission;

pub use roles::*;
pub use submission::*;
