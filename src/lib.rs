//! # Gourd
//! Gourd is the presolving core of a constraint programming solver. It
//! rewrites a combinatorial optimisation model, consisting of integer
//! variables with finite domains, a catalog of constraints, and an optional
//! linear objective, into an equivalent but simpler model before a search
//! engine attempts to solve it.
//!
//! The heart of the crate is the [`presolve::PresolveContext`]: the shared
//! mutable state every rewrite rule reads and mutates. It owns the working
//! [`model::Model`], the [`Domain`] of every variable, the affine-relation
//! union-finds tracking `x = c·y + o` equivalences, the literal↔(variable =
//! value) encoding tables, the constraint↔variable usage graph, and the
//! objective in canonical form.
//!
//! # Using the context
//! Rewrite rules interact with the model exclusively through the context
//! operations:
//! ```rust
//! use gourd::basic_types::Domain;
//! use gourd::model::Model;
//! use gourd::presolve::PresolveContext;
//!
//! let mut context = PresolveContext::new(Model::default());
//!
//! let x = context.new_variable(Domain::from_bounds(0, 4));
//! let _ = context
//!     .intersect_domain_with(x, &Domain::from_bounds(2, 10))
//!     .expect("the intersection is non-empty");
//!
//! assert_eq!(2, context.min_of(x));
//! assert_eq!(4, context.max_of(x));
//! ```
//!
//! Infeasibility is latched: any operation that empties a domain returns
//! [`basic_types::EmptyDomain`] and sets the sticky
//! [`presolve::PresolveContext::is_unsat`] flag, after which the driver is
//! expected to unwind.

pub mod basic_types;
pub mod containers;
pub mod model;
pub mod presolve;
pub mod statistics;

pub(crate) mod asserts;
pub(crate) mod math;

pub use crate::basic_types::Domain;
pub use crate::basic_types::EmptyDomain;
pub use crate::basic_types::VariableRef;
pub use crate::presolve::PresolveContext;
