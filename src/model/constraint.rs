use itertools::Itertools;

use crate::basic_types::VariableRef;

/// A linear constraint `Σ coeffs[i] · vars[i] ∈ domain`.
///
/// `vars` and `coeffs` are parallel vectors; the domain is a union of closed
/// intervals in the proto pair encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearConstraint {
    pub vars: Vec<VariableRef>,
    pub coeffs: Vec<i64>,
    pub domain: Vec<(i64, i64)>,
}

impl LinearConstraint {
    /// Iterate over the `(variable, coefficient)` terms. Panics when the
    /// parallel vectors disagree in length.
    pub fn terms(&self) -> impl Iterator<Item = (VariableRef, i64)> + '_ {
        self.vars.iter().copied().zip_eq(self.coeffs.iter().copied())
    }
}

/// A linear expression `offset + Σ coeffs[i] · vars[i]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinearExpression {
    pub vars: Vec<VariableRef>,
    pub coeffs: Vec<i64>,
    pub offset: i64,
}

impl LinearExpression {
    pub fn terms(&self) -> impl Iterator<Item = (VariableRef, i64)> + '_ {
        self.vars.iter().copied().zip_eq(self.coeffs.iter().copied())
    }
}

/// The tagged union of constraint kinds.
///
/// [`ConstraintKind::Nop`] marks a constraint that presolve has emptied;
/// constraints are never removed from the model so that indices stay stable.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConstraintKind {
    #[default]
    Nop,
    Linear(LinearConstraint),
    BoolAnd {
        literals: Vec<VariableRef>,
    },
    BoolOr {
        literals: Vec<VariableRef>,
    },
    BoolXor {
        literals: Vec<VariableRef>,
    },
    Interval {
        start: VariableRef,
        size: VariableRef,
        end: VariableRef,
    },
    /// A disjunctive scheduling constraint over interval constraints,
    /// referenced by their constraint indices.
    NoOverlap {
        intervals: Vec<usize>,
    },
}

/// A constraint of the working model: a kind plus enforcement literals.
///
/// The constraint is vacuously satisfied whenever any enforcement literal is
/// false.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Constraint {
    pub enforcement: Vec<VariableRef>,
    pub kind: ConstraintKind,
}

impl Constraint {
    pub fn new(kind: ConstraintKind) -> Constraint {
        Constraint {
            enforcement: vec![],
            kind,
        }
    }

    pub fn enforced(enforcement: Vec<VariableRef>, kind: ConstraintKind) -> Constraint {
        Constraint { enforcement, kind }
    }

    pub fn is_nop(&self) -> bool {
        matches!(self.kind, ConstraintKind::Nop) && self.enforcement.is_empty()
    }

    /// Empty the constraint, turning it into a no-op while keeping its index.
    pub fn clear(&mut self) {
        self.enforcement.clear();
        self.kind = ConstraintKind::Nop;
    }

    /// The sorted, deduplicated indices of the variables the constraint
    /// references, including its enforcement literals.
    pub fn used_variables(&self) -> Vec<usize> {
        let mut variables: Vec<usize> = self
            .enforcement
            .iter()
            .map(|reference| reference.index())
            .collect();

        match &self.kind {
            ConstraintKind::Nop => {}
            ConstraintKind::Linear(linear) => {
                variables.extend(linear.vars.iter().map(|reference| reference.index()));
            }
            ConstraintKind::BoolAnd { literals }
            | ConstraintKind::BoolOr { literals }
            | ConstraintKind::BoolXor { literals } => {
                variables.extend(literals.iter().map(|reference| reference.index()));
            }
            ConstraintKind::Interval { start, size, end } => {
                variables.extend([start.index(), size.index(), end.index()]);
            }
            ConstraintKind::NoOverlap { .. } => {}
        }

        variables.sort_unstable();
        variables.dedup();
        variables
    }

    /// The sorted indices of the interval constraints this constraint
    /// references.
    pub fn used_intervals(&self) -> Vec<usize> {
        match &self.kind {
            ConstraintKind::NoOverlap { intervals } => {
                let mut intervals = intervals.clone();
                intervals.sort_unstable();
                intervals.dedup();
                intervals
            }
            _ => vec![],
        }
    }
}
