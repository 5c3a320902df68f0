mod constraint;
mod distribution;
mod flag;
mod nullable;
mod segment;
mod variant;

pub use self::constraint::Constraint;
pub use self::distribution::Distribution;
pub use self::flag::Flag;
pub use self::nullable::null_as_default;
pub use self::segment::Segment;
pub use self::variant::Variant;
