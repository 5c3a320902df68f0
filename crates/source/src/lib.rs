pub mod backend;
pub mod envelope;
pub mod error;
mod location;
mod select;

pub use crate::envelope::Envelope;
pub use crate::location::S3Location;
pub use crate::select::{Driver, Selector, SourceHandle, SourceSettings};
