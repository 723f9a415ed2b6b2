use crate::basic_types::Domain;
use crate::basic_types::VariableRef;
use crate::model::Constraint;

/// An integer variable of the model: its domain as a union of closed
/// intervals in the proto pair encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegerVariableData {
    pub domain: Vec<(i64, i64)>,
}

impl IntegerVariableData {
    pub fn from_domain(domain: &Domain) -> IntegerVariableData {
        IntegerVariableData {
            domain: domain.intervals().to_vec(),
        }
    }

    pub fn read_domain(&self) -> Domain {
        Domain::from_intervals(self.domain.iter().copied())
    }
}

/// The linear objective in proto form. The user-visible objective value is
/// `scaling_factor · (raw + offset)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Objective {
    pub vars: Vec<VariableRef>,
    pub coeffs: Vec<i64>,
    /// Union of closed intervals constraining the raw objective value; empty
    /// means unconstrained.
    pub domain: Vec<(i64, i64)>,
    pub offset: f64,
    pub scaling_factor: f64,
}

impl Default for Objective {
    fn default() -> Objective {
        Objective {
            vars: vec![],
            coeffs: vec![],
            domain: vec![],
            offset: 0.0,
            scaling_factor: 1.0,
        }
    }
}

/// The working model rewritten by presolve.
///
/// Variables and constraints are append-only; constraints may be emptied into
/// no-ops but their indices never shift.
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub variables: Vec<IntegerVariableData>,
    pub constraints: Vec<Constraint>,
    pub objective: Option<Objective>,
}

impl Model {
    /// Append a variable and return its index.
    pub fn add_variable(&mut self, data: IntegerVariableData) -> usize {
        self.variables.push(data);
        self.variables.len() - 1
    }

    /// Append a constraint and return its index.
    pub fn add_constraint(&mut self, constraint: Constraint) -> usize {
        self.constraints.push(constraint);
        self.constraints.len() - 1
    }
}
