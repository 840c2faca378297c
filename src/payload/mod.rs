/// Schema-driven request synthesis.
pub mod builder;
pub mod datatype;

pub use builder::{build_request, PayloadBuilder};
pub use datatype::{wire_datatype, DatatypeTable};
