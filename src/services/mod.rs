//! Core services for document access, composition and resolution

pub mod compose;
pub mod generators;
pub mod matchers;
pub(crate) mod params;
pub mod resolve;
pub mod wrapper;
