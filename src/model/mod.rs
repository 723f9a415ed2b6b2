//! The proto-like working model which the presolve context rewrites.
//!
//! The schema mirrors the serialized model format of the surrounding system:
//! variables are unions of closed intervals, constraints are a tagged union
//! with optional enforcement literals, and the objective carries its own
//! integer domain next to a floating offset and scaling factor.
mod constraint;
mod working_model;

pub use constraint::*;
pub use working_model::*;
