//! The shared mutable state of the presolver.
//!
//! [`PresolveContext`] owns the working model and every index structure the
//! rewrite rules read and mutate: the variable domains, the affine-relation
//! repositories, the literal↔value encoding tables, the constraint-variable
//! usage graph, and the objective in canonical form. Rules call the context
//! operations; the context keeps the invariants.
mod affine_relation;
mod context;
mod encoding;
mod objective;

pub use affine_relation::*;
pub use context::*;
