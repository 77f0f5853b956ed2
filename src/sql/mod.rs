//! Safe SQL builder: identifiers from model definitions only, values as parameters.

pub mod builder;
pub mod filter;
pub mod params;

pub use builder::*;
pub use filter::*;
pub use params::*;
