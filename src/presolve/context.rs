use std::collections::BTreeMap;

use log::warn;

use crate::basic_types::Domain;
use crate::basic_types::EmptyDomain;
use crate::basic_types::VariableRef;
use crate::containers::HashMap;
use crate::containers::HashSet;
use crate::containers::KeyedVec;
use crate::containers::SparseBitset;
use crate::gourd_assert_eq_simple;
use crate::gourd_assert_moderate;
use crate::gourd_assert_simple;
use crate::model::Constraint;
use crate::model::ConstraintKind;
use crate::model::IntegerVariableData;
use crate::model::LinearConstraint;
use crate::model::LinearExpression;
use crate::model::Model;
use crate::presolve::AffineRelations;
use crate::presolve::Relation;
use crate::statistics::log_statistic;

/// The pseudo constraint index under which objective membership is recorded
/// in [`PresolveContext::var_to_constraints`].
pub const OBJECTIVE_CONSTRAINT_INDEX: isize = -1;

/// Selects one of the two affine-relation repositories of the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RelationRepository {
    /// The general repository holding any `x = c·y + o`.
    Affine,
    /// The restricted repository holding only `|c| = 1, o = 0` relations.
    Equivalence,
}

/// The shared mutable state of a presolve pass.
///
/// The context owns the working model and maintains, for every variable, its
/// current [`Domain`]; the affine and equivalence union-finds; the
/// literal↔(variable = value) encoding tables; the bipartite
/// constraint↔variable usage graph; and the objective in canonical form.
///
/// All tables are keyed on positive variable indices; reference signs are
/// folded in and out at the operation boundary. Infeasibility is latched in
/// a sticky flag: once set, domain-mutating operations degrade to errors and
/// relation stores to no-ops so that callers can unwind without extra
/// checks.
#[derive(Debug, Default)]
pub struct PresolveContext {
    pub working_model: Model,

    /// The current domain of every variable, keyed by positive reference.
    pub(crate) domains: KeyedVec<VariableRef, Domain>,
    /// Variables whose domain (or representative) changed since the driver
    /// last drained this set.
    pub(crate) modified_domains: SparseBitset,
    pub(crate) is_unsat: bool,

    /// When set, rewrites that drop feasible solutions are disabled.
    pub keep_all_feasible_solutions: bool,
    pub enable_stats: bool,
    pub(crate) num_presolve_operations: u64,
    pub(crate) stats_by_rule_name: BTreeMap<String, u64>,

    /// The canonical variable fixed to each already-seen constant.
    pub(crate) constant_to_ref: HashMap<i64, usize>,

    pub(crate) affine_relations: AffineRelations,
    pub(crate) var_equiv_relations: AffineRelations,
    /// Indices of the constraints that define a stored affine relation, so
    /// that downstream passes can drop them.
    pub(crate) affine_constraints: HashSet<usize>,
    /// Recorded `target = |ref|` facts, keyed by target reference.
    pub(crate) abs_relations: HashMap<VariableRef, usize>,

    /// Full encodings: `(variable, value)` to a literal equivalent to
    /// `variable = value`.
    pub(crate) encoding: HashMap<(usize, i64), VariableRef>,
    /// Literals known to imply `variable = value`.
    pub(crate) eq_half_encoding: HashMap<(usize, i64), HashSet<VariableRef>>,
    /// Literals known to imply `variable ≠ value`.
    pub(crate) neq_half_encoding: HashMap<(usize, i64), HashSet<VariableRef>>,

    /// Per constraint, the sorted variable indices it uses.
    pub(crate) constraint_to_vars: Vec<Vec<usize>>,
    /// Per constraint, the sorted interval-constraint indices it references.
    pub(crate) constraint_to_intervals: Vec<Vec<usize>>,
    /// Per constraint, the variable of its single-variable linear form, if
    /// it has one.
    pub(crate) constraint_to_linear1_var: Vec<Option<usize>>,
    /// Per variable, the constraints using it;
    /// [`OBJECTIVE_CONSTRAINT_INDEX`] marks objective membership.
    pub(crate) var_to_constraints: Vec<HashSet<isize>>,
    /// Per variable, how many single-variable linear constraints use it.
    pub(crate) var_to_num_linear1: Vec<usize>,
    /// Per interval constraint, how many constraints reference it.
    pub(crate) interval_usage: Vec<usize>,

    /// The sparse canonical objective; zero coefficients are absent.
    pub(crate) objective_map: HashMap<usize, i64>,
    pub(crate) objective_domain: Domain,
    pub(crate) objective_offset: f64,
    pub(crate) objective_scaling_factor: f64,
    pub(crate) objective_domain_is_constraining: bool,
}

impl PresolveContext {
    pub fn new(working_model: Model) -> PresolveContext {
        let mut context = PresolveContext {
            working_model,
            objective_domain: Domain::all_values(),
            objective_scaling_factor: 1.0,
            ..Default::default()
        };
        context.initialize_new_domains();
        context
    }

    pub fn is_unsat(&self) -> bool {
        self.is_unsat
    }

    /// Latch the model as infeasible.
    pub fn notify_model_is_unsat(&mut self) {
        self.is_unsat = true;
    }

    /// Create the internal structures for any new variables of the working
    /// model.
    pub(crate) fn initialize_new_domains(&mut self) {
        let mut newly_fixed = Vec::new();
        for index in self.domains.len()..self.working_model.variables.len() {
            let domain = self.working_model.variables[index].read_domain();
            let reference = self.domains.push(domain);
            if self.domains[reference].is_empty() {
                self.notify_model_is_unsat();
                return;
            }
            if self.domains[reference].is_fixed() {
                newly_fixed.push(index);
            }
        }

        let num_variables = self.domains.len();
        self.modified_domains.grow_to(num_variables);
        self.var_to_constraints
            .resize(num_variables, HashSet::default());
        self.var_to_num_linear1.resize(num_variables, 0);
        self.affine_relations.grow_to(num_variables);
        self.var_equiv_relations.grow_to(num_variables);

        for variable in newly_fixed {
            self.exploit_fixed_domain(variable);
        }
    }

    /// Append a variable with the given domain and return its (positive)
    /// reference. An empty domain proves the model infeasible.
    pub fn new_variable(&mut self, domain: Domain) -> VariableRef {
        let index = self
            .working_model
            .add_variable(IntegerVariableData::from_domain(&domain));
        self.initialize_new_domains();
        VariableRef::from_index(index)
    }

    pub fn new_bool_variable(&mut self) -> VariableRef {
        self.new_variable(Domain::from_bounds(0, 1))
    }

    /// The canonical variable fixed to `value`; allocated on first use.
    pub fn get_or_create_constant(&mut self, value: i64) -> VariableRef {
        if let Some(&variable) = self.constant_to_ref.get(&value) {
            return VariableRef::from_index(variable);
        }
        let index = self.working_model.add_variable(IntegerVariableData {
            domain: vec![(value, value)],
        });
        let _ = self.constant_to_ref.insert(value, index);
        self.initialize_new_domains();
        VariableRef::from_index(index)
    }

    /// A fixed variable either becomes the canonical variable for its value
    /// or is merged with the existing one.
    pub(crate) fn exploit_fixed_domain(&mut self, variable: usize) {
        gourd_assert_simple!(self.domains[VariableRef::from_index(variable)].is_fixed());
        let value = self.domains[VariableRef::from_index(variable)].min();
        match self.constant_to_ref.get(&value).copied() {
            Some(representative) if representative != variable => {
                let _ =
                    self.add_relation(variable, representative, 1, 0, RelationRepository::Affine);
                let _ = self.add_relation(
                    variable,
                    representative,
                    1,
                    0,
                    RelationRepository::Equivalence,
                );
            }
            Some(_) => {}
            None => {
                let _ = self.constant_to_ref.insert(value, variable);
            }
        }
    }

    pub fn domain_is_empty(&self, reference: VariableRef) -> bool {
        self.domains[reference.positive()].is_empty()
    }

    pub fn is_fixed(&self, reference: VariableRef) -> bool {
        gourd_assert_moderate!(!self.domain_is_empty(reference));
        self.domains[reference.positive()].is_fixed()
    }

    /// Whether the referenced variable has a domain within `[0, 1]`.
    pub fn can_be_used_as_literal(&self, reference: VariableRef) -> bool {
        self.var_can_be_literal(reference.index())
    }

    pub(crate) fn var_can_be_literal(&self, variable: usize) -> bool {
        let domain = &self.domains[VariableRef::from_index(variable)];
        !domain.is_empty() && domain.min() >= 0 && domain.max() <= 1
    }

    pub fn literal_is_true(&self, literal: VariableRef) -> bool {
        gourd_assert_simple!(self.can_be_used_as_literal(literal));
        let domain = &self.domains[literal.positive()];
        if literal.is_positive() {
            domain.min() == 1
        } else {
            domain.max() == 0
        }
    }

    pub fn literal_is_false(&self, literal: VariableRef) -> bool {
        gourd_assert_simple!(self.can_be_used_as_literal(literal));
        let domain = &self.domains[literal.positive()];
        if literal.is_positive() {
            domain.max() == 0
        } else {
            domain.min() == 1
        }
    }

    /// The minimum of the signed view of the referenced domain.
    pub fn min_of(&self, reference: VariableRef) -> i64 {
        gourd_assert_moderate!(!self.domain_is_empty(reference));
        let domain = &self.domains[reference.positive()];
        if reference.is_positive() {
            domain.min()
        } else {
            0i64.saturating_sub(domain.max())
        }
    }

    /// The maximum of the signed view of the referenced domain.
    pub fn max_of(&self, reference: VariableRef) -> i64 {
        gourd_assert_moderate!(!self.domain_is_empty(reference));
        let domain = &self.domains[reference.positive()];
        if reference.is_positive() {
            domain.max()
        } else {
            0i64.saturating_sub(domain.min())
        }
    }

    /// The signed view of the referenced domain.
    pub fn domain_of(&self, reference: VariableRef) -> Domain {
        let domain = &self.domains[reference.positive()];
        if reference.is_positive() {
            domain.clone()
        } else {
            domain.negation()
        }
    }

    pub fn domain_contains(&self, reference: VariableRef, value: i64) -> bool {
        if reference.is_positive() {
            self.domains[reference.positive()].contains(value)
        } else {
            value
                .checked_neg()
                .is_some_and(|negated| self.domains[reference.positive()].contains(negated))
        }
    }

    /// A lower bound of `offset + Σ cᵢ·xᵢ` by interval arithmetic, without
    /// building intermediate domains.
    pub fn min_of_expression(&self, expression: &LinearExpression) -> i64 {
        let mut result = expression.offset;
        for (variable, coeff) in expression.terms() {
            let bound = if coeff > 0 {
                self.min_of(variable)
            } else {
                self.max_of(variable)
            };
            result = result.saturating_add(coeff.saturating_mul(bound));
        }
        result
    }

    /// An upper bound of `offset + Σ cᵢ·xᵢ` by interval arithmetic.
    pub fn max_of_expression(&self, expression: &LinearExpression) -> i64 {
        let mut result = expression.offset;
        for (variable, coeff) in expression.terms() {
            let bound = if coeff > 0 {
                self.max_of(variable)
            } else {
                self.min_of(variable)
            };
            result = result.saturating_add(coeff.saturating_mul(bound));
        }
        result
    }

    /// Intersect the referenced domain with `domain` (negated first for a
    /// negative reference).
    ///
    /// Returns `Ok(true)` iff the domain shrank; intersecting with a
    /// superset is a no-op. An empty result latches infeasibility.
    pub fn intersect_domain_with(
        &mut self,
        reference: VariableRef,
        domain: &Domain,
    ) -> Result<bool, EmptyDomain> {
        if self.is_unsat {
            return Err(EmptyDomain);
        }
        gourd_assert_moderate!(!self.domain_is_empty(reference));

        let variable = reference.positive();
        let target = if reference.is_positive() {
            domain.clone()
        } else {
            domain.negation()
        };

        if self.domains[variable].is_included_in(&target) {
            return Ok(false);
        }
        self.domains[variable] = self.domains[variable].intersection_with(&target);
        self.modified_domains.set(variable.index());

        if self.domains[variable].is_empty() {
            self.notify_model_is_unsat();
            return Err(EmptyDomain);
        }

        // Mirror the restriction onto the affine representative, so reading
        // the representative after narrowing a class member stays exact.
        let relation = self.get_affine_relation(variable);
        if relation.representative != variable.index() {
            let image = self
                .domains[variable]
                .addition_with(&Domain::constant(-relation.offset));
            let image = if relation.coeff > 0 {
                image.inverse_multiplication_by(relation.coeff)
            } else {
                image.negation().inverse_multiplication_by(-relation.coeff)
            };
            let _ = self.intersect_domain_with(
                VariableRef::from_index(relation.representative),
                &image,
            )?;
        }

        Ok(true)
    }

    pub fn set_literal_to_false(&mut self, literal: VariableRef) -> Result<(), EmptyDomain> {
        let value = if literal.is_positive() { 0 } else { 1 };
        let _ = self.intersect_domain_with(literal.positive(), &Domain::constant(value))?;
        Ok(())
    }

    pub fn set_literal_to_true(&mut self, literal: VariableRef) -> Result<(), EmptyDomain> {
        self.set_literal_to_false(literal.negated())
    }

    pub(crate) fn repository(&self, repository: RelationRepository) -> &AffineRelations {
        match repository {
            RelationRepository::Affine => &self.affine_relations,
            RelationRepository::Equivalence => &self.var_equiv_relations,
        }
    }

    fn repository_mut(&mut self, repository: RelationRepository) -> &mut AffineRelations {
        match repository {
            RelationRepository::Affine => &mut self.affine_relations,
            RelationRepository::Equivalence => &mut self.var_equiv_relations,
        }
    }

    /// Add `x = coeff·y + offset` to the chosen repository.
    ///
    /// For unit coefficients the union is steered so that a literal-usable
    /// representative stays representative: once a variable plays a Boolean
    /// role, every equivalent variable must present a literal interface.
    pub(crate) fn add_relation(
        &mut self,
        x: usize,
        y: usize,
        coeff: i64,
        offset: i64,
        repository: RelationRepository,
    ) -> bool {
        if coeff.abs() != 1 {
            return self
                .repository_mut(repository)
                .try_add(x, y, coeff, offset, true, true);
        }

        let rep_x = self.repository(repository).get(x).representative;
        let rep_y = self.repository(repository).get(y).representative;
        let allow_rep_x = self.var_can_be_literal(rep_x);
        let allow_rep_y = self.var_can_be_literal(rep_y);
        if allow_rep_x || allow_rep_y {
            self.repository_mut(repository)
                .try_add(x, y, coeff, offset, allow_rep_x, allow_rep_y)
        } else {
            self.repository_mut(repository)
                .try_add(x, y, coeff, offset, true, true)
        }
    }

    /// Record the affine relation `ref_x = coeff·ref_y + offset`, defined by
    /// constraint `ct`, in both repositories as applicable.
    pub fn store_affine_relation(
        &mut self,
        ct: usize,
        ref_x: VariableRef,
        ref_y: VariableRef,
        coeff: i64,
        offset: i64,
    ) {
        if self.is_unsat {
            return;
        }
        if self.is_fixed(ref_x) || self.is_fixed(ref_y) {
            return;
        }

        let x = ref_x.index();
        let y = ref_y.index();
        let coeff = if ref_x.is_positive() == ref_y.is_positive() {
            coeff
        } else {
            -coeff
        };
        let offset = if ref_x.is_positive() { offset } else { -offset };

        let mut added = self.add_relation(x, y, coeff, offset, RelationRepository::Affine);
        if (coeff == 1 || coeff == -1) && offset == 0 {
            added |= self.add_relation(x, y, coeff, offset, RelationRepository::Equivalence);
        }

        if added {
            // The domains did not change, but any constraint containing a
            // variable whose representative changed must be revisited.
            if self.get_affine_relation(VariableRef::from_index(x)).representative != x {
                self.modified_domains.set(x);
            }
            if self.get_affine_relation(VariableRef::from_index(y)).representative != y {
                self.modified_domains.set(y);
            }
            let _ = self.affine_constraints.insert(ct);
        }
    }

    /// Record that the literals `ref_a` and `ref_b` must take the same
    /// truth value.
    ///
    /// Equal references are a no-op; a reference equal to the negation of
    /// the other proves infeasibility. Otherwise a two-variable linear
    /// equality is appended so that propagation and usage counting see the
    /// link, and the matching affine relation is stored.
    pub fn store_boolean_equality_relation(&mut self, ref_a: VariableRef, ref_b: VariableRef) {
        gourd_assert_simple!(self.can_be_used_as_literal(ref_a));
        gourd_assert_simple!(self.can_be_used_as_literal(ref_b));
        if ref_a == ref_b {
            return;
        }
        if ref_a == ref_b.negated() {
            self.notify_model_is_unsat();
            return;
        }

        let var_a = ref_a.positive();
        let var_b = ref_b.positive();
        if self.get_affine_relation(var_a).representative == var_b.index()
            || self.get_affine_relation(var_b).representative == var_a.index()
        {
            return;
        }

        if ref_a.is_positive() == ref_b.is_positive() {
            // a = b.
            let ct = self.working_model.add_constraint(Constraint::new(
                ConstraintKind::Linear(LinearConstraint {
                    vars: vec![var_a, var_b],
                    coeffs: vec![1, -1],
                    domain: vec![(0, 0)],
                }),
            ));
            self.store_affine_relation(ct, var_a, var_b, 1, 0);
        } else {
            // a = 1 - b.
            let ct = self.working_model.add_constraint(Constraint::new(
                ConstraintKind::Linear(LinearConstraint {
                    vars: vec![var_a, var_b],
                    coeffs: vec![1, 1],
                    domain: vec![(1, 1)],
                }),
            ));
            self.store_affine_relation(ct, var_a, var_b, -1, 1);
        }
    }

    /// Record `target = |ref|`. Returns false when a different relation for
    /// the same target already exists.
    pub fn store_abs_relation(&mut self, target_ref: VariableRef, reference: VariableRef) -> bool {
        match self.abs_relations.get(&target_ref).copied() {
            Some(existing) => existing == reference.index(),
            None => {
                let _ = self.abs_relations.insert(target_ref, reference.index());
                true
            }
        }
    }

    /// The relation of the referenced variable to its affine representative,
    /// with that representative itself rewritten through the equivalence
    /// repository so that the public representative is always an
    /// equivalence-class canonical.
    pub fn get_affine_relation(&self, reference: VariableRef) -> Relation {
        let mut relation = self.affine_relations.get(reference.index());
        let canonical = self.var_equiv_relations.get(relation.representative);
        relation.representative = canonical.representative;
        if canonical.coeff == -1 {
            relation.coeff = -relation.coeff;
        }
        if !reference.is_positive() {
            relation.coeff = -relation.coeff;
            relation.offset = -relation.offset;
        }
        relation
    }

    /// The signed equivalence-class representative of the reference.
    pub fn get_variable_representative(&self, reference: VariableRef) -> VariableRef {
        let relation = self.var_equiv_relations.get(reference.index());
        gourd_assert_eq_simple!(relation.coeff.abs(), 1);
        gourd_assert_eq_simple!(relation.offset, 0);
        let representative = VariableRef::from_index(relation.representative);
        if reference.is_positive() == (relation.coeff == 1) {
            representative
        } else {
            representative.negated()
        }
    }

    /// The representative literal of `literal` under the affine relations.
    ///
    /// When the relation was recorded before the representative was narrowed
    /// to `[0, 1]`, the representative may not be usable as a literal; the
    /// literal is then returned unchanged. Otherwise exactly one polarity of
    /// the representative is consistent with the relation at both Boolean
    /// values, and that polarity is composed with the sign of `literal`.
    pub fn get_literal_representative(&self, literal: VariableRef) -> VariableRef {
        gourd_assert_simple!(self.can_be_used_as_literal(literal));
        let relation = self.get_affine_relation(literal.positive());

        if !self.var_can_be_literal(relation.representative) {
            return literal;
        }

        let positive_possible = relation.offset == 0 || relation.coeff + relation.offset == 1;
        let negative_possible = relation.offset == 1 || relation.coeff + relation.offset == 0;
        gourd_assert_moderate!(positive_possible != negative_possible);

        let representative = VariableRef::from_index(relation.representative);
        if literal.is_positive() == positive_possible {
            representative
        } else {
            representative.negated()
        }
    }

    /// Whether the variable is not the representative of a class with at
    /// least two members.
    pub(crate) fn variable_is_not_representative_of_equivalence_class(
        &self,
        variable: usize,
    ) -> bool {
        if self.affine_relations.class_size(variable) == 1 {
            return true;
        }
        self.get_affine_relation(VariableRef::from_index(variable)).representative != variable
    }

    /// Whether the variable appears in exactly one constraint and can be
    /// removed together with it.
    ///
    /// If the variable is equivalent to another one (but not the
    /// representative), its single constraint must be the affine defining
    /// one, and the caller is expected to handle that case.
    pub fn variable_is_unique_and_removable(&self, reference: VariableRef) -> bool {
        if !self.constraint_variable_graph_is_up_to_date() {
            return false;
        }
        let variable = reference.index();
        self.var_to_constraints[variable].len() == 1
            && self.variable_is_not_representative_of_equivalence_class(variable)
            && !self.keep_all_feasible_solutions
    }

    /// Like [`Self::variable_is_unique_and_removable`], but for a variable
    /// whose only other occurrence is the objective.
    pub fn variable_with_cost_is_unique_and_removable(&self, reference: VariableRef) -> bool {
        if !self.constraint_variable_graph_is_up_to_date() {
            return false;
        }
        let variable = reference.index();
        !self.keep_all_feasible_solutions
            && self.var_to_constraints[variable].contains(&OBJECTIVE_CONSTRAINT_INDEX)
            && self.var_to_constraints[variable].len() == 2
            && self.variable_is_not_representative_of_equivalence_class(variable)
    }

    /// Even an equivalence-class member is unneeded once its defining
    /// constraints are gone.
    pub fn variable_is_not_used_anymore(&self, reference: VariableRef) -> bool {
        if !self.constraint_variable_graph_is_up_to_date() {
            return false;
        }
        self.var_to_constraints[reference.index()].is_empty()
    }

    /// Whether every constraint touching the variable is a single-variable
    /// linear constraint, i.e. a domain-restricting half-reification.
    pub fn variable_is_only_used_in_encoding(&self, reference: VariableRef) -> bool {
        if !self.constraint_variable_graph_is_up_to_date() {
            return false;
        }
        let variable = reference.index();
        self.var_to_num_linear1[variable] == self.var_to_constraints[variable].len()
    }

    pub fn constraint_variable_graph_is_up_to_date(&self) -> bool {
        self.constraint_to_vars.len() == self.working_model.constraints.len()
    }

    pub(crate) fn update_linear1_usage(&mut self, c: usize) {
        if let Some(old_var) = self.constraint_to_linear1_var[c] {
            self.var_to_num_linear1[old_var] -= 1;
        }
        self.constraint_to_linear1_var[c] = match &self.working_model.constraints[c].kind {
            ConstraintKind::Linear(linear) if linear.vars.len() == 1 => {
                Some(linear.vars[0].index())
            }
            _ => None,
        };
        if let Some(variable) = self.constraint_to_linear1_var[c] {
            self.var_to_num_linear1[variable] += 1;
        }
    }

    /// Register the usage of constraint `c` in the graph from scratch.
    pub(crate) fn add_variable_usage(&mut self, c: usize) {
        self.constraint_to_vars[c] = self.working_model.constraints[c].used_variables();
        self.constraint_to_intervals[c] = self.working_model.constraints[c].used_intervals();
        for &variable in &self.constraint_to_vars[c] {
            let _ = self.var_to_constraints[variable].insert(c as isize);
        }
        for &interval in &self.constraint_to_intervals[c] {
            self.interval_usage[interval] += 1;
        }
        self.update_linear1_usage(c);
    }

    /// Reconcile the graph entry of constraint `c` with its current form.
    pub fn update_constraint_variable_usage(&mut self, c: usize) {
        gourd_assert_eq_simple!(
            self.constraint_to_vars.len(),
            self.working_model.constraints.len()
        );

        // Interval usage is not diffed as updates to it are infrequent.
        for &interval in &self.constraint_to_intervals[c] {
            self.interval_usage[interval] -= 1;
        }
        self.constraint_to_intervals[c] = self.working_model.constraints[c].used_intervals();
        for &interval in &self.constraint_to_intervals[c] {
            self.interval_usage[interval] += 1;
        }

        // For the variables, a merge over the two sorted vectors avoids a
        // remove() followed by an insert() for the variables that stayed.
        let new_usage = self.working_model.constraints[c].used_variables();
        let old_usage = std::mem::take(&mut self.constraint_to_vars[c]);
        let mut i = 0;
        for &variable in &new_usage {
            while i < old_usage.len() && old_usage[i] < variable {
                let _ = self.var_to_constraints[old_usage[i]].remove(&(c as isize));
                i += 1;
            }
            if i < old_usage.len() && old_usage[i] == variable {
                i += 1;
            } else {
                let _ = self.var_to_constraints[variable].insert(c as isize);
            }
        }
        for &variable in &old_usage[i..] {
            let _ = self.var_to_constraints[variable].remove(&(c as isize));
        }
        self.constraint_to_vars[c] = new_usage;

        self.update_linear1_usage(c);
    }

    /// Register the usage of every constraint appended since the last call.
    pub fn update_new_constraints_variable_usage(&mut self) {
        let old_size = self.constraint_to_vars.len();
        let new_size = self.working_model.constraints.len();
        gourd_assert_simple!(old_size <= new_size);
        self.constraint_to_vars.resize(new_size, vec![]);
        self.constraint_to_linear1_var.resize(new_size, None);
        self.constraint_to_intervals.resize(new_size, vec![]);
        self.interval_usage.resize(new_size, 0);
        for c in old_size..new_size {
            self.add_variable_usage(c);
        }
    }

    /// Debug invariant: the stored usage of every constraint matches a fresh
    /// recomputation.
    pub fn constraint_variable_usage_is_consistent(&self) -> bool {
        if self.is_unsat {
            return true;
        }
        if self.constraint_to_vars.len() != self.working_model.constraints.len() {
            warn!("wrong constraint_to_vars size");
            return false;
        }
        for (c, constraint) in self.working_model.constraints.iter().enumerate() {
            if self.constraint_to_vars[c] != constraint.used_variables() {
                warn!("wrong variable usage for constraint {c}: {constraint:?}");
                return false;
            }
        }
        true
    }

    /// Count an application of the named presolve rule.
    pub fn update_rule_stats(&mut self, name: &str) {
        if self.enable_stats {
            log::debug!("{} : {name}", self.num_presolve_operations);
            *self.stats_by_rule_name.entry(name.to_string()).or_insert(0) += 1;
        }
        self.num_presolve_operations += 1;
    }

    pub fn clear_stats(&mut self) {
        self.stats_by_rule_name.clear();
    }

    pub fn num_presolve_operations(&self) -> u64 {
        self.num_presolve_operations
    }

    /// Emit the presolve counters through the statistic logger.
    pub fn log_stats(&self) {
        log_statistic("numPresolveOperations", self.num_presolve_operations);
        for (name, count) in &self.stats_by_rule_name {
            log_statistic(name, count);
        }
    }

    /// Remove and return the variables whose domain changed since the last
    /// drain, in modification order.
    pub fn drain_modified_domains(&mut self) -> Vec<usize> {
        self.modified_domains.drain()
    }

    pub fn domain_is_modified(&self, reference: VariableRef) -> bool {
        self.modified_domains.contains(reference.index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersecting_shrinks_the_domain_and_marks_it_modified() {
        let mut context = PresolveContext::new(Model::default());
        let x = context.new_variable(Domain::from_bounds(0, 4));

        let shrunk = context
            .intersect_domain_with(x, &Domain::from_bounds(2, i64::MAX))
            .expect("domain stays non-empty");

        assert!(shrunk);
        assert_eq!(Domain::from_bounds(2, 4), context.domain_of(x));
        assert!(context.domain_is_modified(x));
        assert_eq!(2, context.min_of(x));
        assert_eq!(4, context.max_of(x));
    }

    #[test]
    fn intersecting_with_a_superset_is_a_no_op() {
        let mut context = PresolveContext::new(Model::default());
        let x = context.new_variable(Domain::from_bounds(1, 3));

        let shrunk = context
            .intersect_domain_with(x, &Domain::from_bounds(0, 10))
            .expect("superset cannot empty the domain");

        assert!(!shrunk);
        assert!(!context.domain_is_modified(x));
    }

    #[test]
    fn emptying_a_domain_latches_unsatisfiability() {
        let mut context = PresolveContext::new(Model::default());
        let x = context.new_variable(Domain::from_bounds(0, 4));

        let result = context.intersect_domain_with(x, &Domain::from_bounds(7, 9));

        assert_eq!(Err(EmptyDomain), result);
        assert!(context.is_unsat());
        // Later mutations are safe and keep reporting infeasibility.
        assert_eq!(
            Err(EmptyDomain),
            context.intersect_domain_with(x, &Domain::from_bounds(0, 4))
        );
    }

    #[test]
    fn negated_references_see_the_mirrored_domain() {
        let mut context = PresolveContext::new(Model::default());
        let x = context.new_variable(Domain::from_bounds(2, 5));

        assert_eq!(-5, context.min_of(x.negated()));
        assert_eq!(-2, context.max_of(x.negated()));
        assert!(context.domain_contains(x.negated(), -3));
        assert!(!context.domain_contains(x.negated(), 3));
        assert_eq!(
            Domain::from_bounds(-5, -2),
            context.domain_of(x.negated())
        );
    }

    #[test]
    fn intersecting_through_a_negated_reference() {
        let mut context = PresolveContext::new(Model::default());
        let x = context.new_variable(Domain::from_bounds(0, 10));

        let _ = context
            .intersect_domain_with(x.negated(), &Domain::from_bounds(-7, -3))
            .expect("non-empty");

        assert_eq!(Domain::from_bounds(3, 7), context.domain_of(x));
    }

    #[test]
    fn literal_assignment_respects_polarity() {
        let mut context = PresolveContext::new(Model::default());
        let a = context.new_bool_variable();
        let b = context.new_bool_variable();

        context.set_literal_to_true(a).expect("free literal");
        context
            .set_literal_to_false(b.negated())
            .expect("free literal");

        assert!(context.literal_is_true(a));
        assert!(context.literal_is_false(a.negated()));
        assert!(context.literal_is_true(b));
    }

    #[test]
    fn boolean_equality_propagates_truth_to_the_other_literal() {
        let mut context = PresolveContext::new(Model::default());
        let a = context.new_bool_variable();
        let b = context.new_bool_variable();

        context.store_boolean_equality_relation(a, b);
        context.set_literal_to_true(a).expect("free literal");

        assert!(context.literal_is_true(b));
        assert_eq!(
            context.get_literal_representative(a),
            context.get_literal_representative(b)
        );
    }

    #[test]
    fn opposite_literal_equality_is_infeasible() {
        let mut context = PresolveContext::new(Model::default());
        let a = context.new_bool_variable();

        context.store_boolean_equality_relation(a, a.negated());

        assert!(context.is_unsat());
    }

    #[test]
    fn fixing_a_variable_pins_its_affine_equal() {
        let mut context = PresolveContext::new(Model::default());
        let x = context.new_variable(Domain::from_bounds(0, 2));
        let y = context.new_variable(Domain::from_bounds(0, 2));

        // x = y through a two-variable linear equality.
        let ct = context.working_model.add_constraint(Constraint::new(
            ConstraintKind::Linear(LinearConstraint {
                vars: vec![x, y],
                coeffs: vec![1, -1],
                domain: vec![(0, 0)],
            }),
        ));
        context.store_affine_relation(ct, x, y, 1, 0);

        let _ = context
            .intersect_domain_with(x, &Domain::constant(1))
            .expect("non-empty");

        assert_eq!(1, context.min_of(y));
        assert_eq!(1, context.max_of(y));
    }

    #[test]
    fn fixed_variables_share_the_canonical_constant() {
        let mut context = PresolveContext::new(Model::default());
        let five = context.get_or_create_constant(5);
        let also_five = context.get_or_create_constant(5);
        assert_eq!(five, also_five);

        // A variable later fixed at creation merges with the constant.
        let x = context.new_variable(Domain::constant(5));
        let relation = context.get_affine_relation(x);
        assert_eq!(five.index(), relation.representative);
        assert_eq!((1, 0), (relation.coeff, relation.offset));
    }

    #[test]
    fn representative_of_a_representative_is_itself() {
        let mut context = PresolveContext::new(Model::default());
        let x = context.new_variable(Domain::from_bounds(0, 9));
        let y = context.new_variable(Domain::from_bounds(0, 9));
        let z = context.new_variable(Domain::from_bounds(0, 9));

        let ct = context.working_model.add_constraint(Default::default());
        context.store_affine_relation(ct, x, y, 1, 2);
        context.store_affine_relation(ct, y, z, 1, 3);

        let relation = context.get_affine_relation(x);
        let rep_relation =
            context.get_affine_relation(VariableRef::from_index(relation.representative));
        assert_eq!(relation.representative, rep_relation.representative);
        assert_eq!((1, 0), (rep_relation.coeff, rep_relation.offset));
    }

    #[test]
    fn variable_usage_graph_tracks_rewrites() {
        let mut context = PresolveContext::new(Model::default());
        let x = context.new_variable(Domain::from_bounds(0, 5));
        let y = context.new_variable(Domain::from_bounds(0, 5));

        let c = context.working_model.add_constraint(Constraint::new(
            ConstraintKind::Linear(LinearConstraint {
                vars: vec![x, y],
                coeffs: vec![1, 1],
                domain: vec![(0, 5)],
            }),
        ));
        context.update_new_constraints_variable_usage();
        assert!(context.constraint_variable_usage_is_consistent());
        assert!(context.var_to_constraints[x.index()].contains(&(c as isize)));

        // Rewrite the constraint to use only y.
        context.working_model.constraints[c].kind = ConstraintKind::Linear(LinearConstraint {
            vars: vec![y],
            coeffs: vec![1],
            domain: vec![(0, 5)],
        });
        context.update_constraint_variable_usage(c);

        assert!(context.constraint_variable_usage_is_consistent());
        assert!(!context.var_to_constraints[x.index()].contains(&(c as isize)));
        assert!(context.variable_is_only_used_in_encoding(y));
        assert!(context.variable_is_not_used_anymore(x));
    }

    #[test]
    fn unique_and_removable_respects_the_feasibility_flag() {
        let mut context = PresolveContext::new(Model::default());
        let x = context.new_variable(Domain::from_bounds(0, 5));

        let _ = context.working_model.add_constraint(Constraint::new(
            ConstraintKind::Linear(LinearConstraint {
                vars: vec![x],
                coeffs: vec![1],
                domain: vec![(0, 3)],
            }),
        ));
        context.update_new_constraints_variable_usage();

        assert!(context.variable_is_unique_and_removable(x));
        context.keep_all_feasible_solutions = true;
        assert!(!context.variable_is_unique_and_removable(x));
    }

    #[test]
    fn cost_variables_tolerate_the_objective_sentinel() {
        let mut context = PresolveContext::new(Model::default());
        let x = context.new_variable(Domain::from_bounds(0, 5));

        let _ = context.working_model.add_constraint(Constraint::new(
            ConstraintKind::Linear(LinearConstraint {
                vars: vec![x],
                coeffs: vec![1],
                domain: vec![(0, 3)],
            }),
        ));
        context.update_new_constraints_variable_usage();
        let _ = context.var_to_constraints[x.index()].insert(OBJECTIVE_CONSTRAINT_INDEX);

        assert!(context.variable_with_cost_is_unique_and_removable(x));
        assert!(!context.variable_is_unique_and_removable(x));
    }

    #[test]
    fn creating_a_variable_with_an_empty_domain_is_infeasible() {
        let mut context = PresolveContext::new(Model::default());
        let _ = context.new_variable(Domain::empty());
        assert!(context.is_unsat());
    }

    #[test]
    fn variable_representative_carries_the_negation_sign() {
        let mut context = PresolveContext::new(Model::default());
        let x = context.new_variable(Domain::from_bounds(-5, 5));
        let y = context.new_variable(Domain::from_bounds(-5, 5));

        // x = -y.
        let ct = context.working_model.add_constraint(Constraint::new(
            ConstraintKind::Linear(LinearConstraint {
                vars: vec![x, y],
                coeffs: vec![1, 1],
                domain: vec![(0, 0)],
            }),
        ));
        context.store_affine_relation(ct, x, y, -1, 0);

        assert_eq!(
            context.get_variable_representative(x),
            context.get_variable_representative(y).negated()
        );
    }

    #[test]
    fn expression_bounds_use_interval_arithmetic() {
        let mut context = PresolveContext::new(Model::default());
        let x = context.new_variable(Domain::from_bounds(1, 3));
        let y = context.new_variable(Domain::from_bounds(-2, 4));

        let expression = LinearExpression {
            vars: vec![x, y],
            coeffs: vec![2, -1],
            offset: 5,
        };

        assert_eq!(3, context.min_of_expression(&expression));
        assert_eq!(13, context.max_of_expression(&expression));
    }

    #[test]
    fn interval_usage_counts_no_overlap_references() {
        let mut context = PresolveContext::new(Model::default());
        let start = context.new_variable(Domain::from_bounds(0, 10));
        let size = context.new_variable(Domain::constant(1));
        let end = context.new_variable(Domain::from_bounds(0, 11));

        let interval = context
            .working_model
            .add_constraint(Constraint::new(ConstraintKind::Interval { start, size, end }));
        let _ = context
            .working_model
            .add_constraint(Constraint::new(ConstraintKind::NoOverlap {
                intervals: vec![interval],
            }));
        context.update_new_constraints_variable_usage();

        assert_eq!(1, context.interval_usage[interval]);
        assert_eq!(0, context.interval_usage[interval + 1]);
        assert!(context.constraint_variable_usage_is_consistent());
    }

    #[test]
    fn rule_stats_count_every_operation() {
        let mut context = PresolveContext::new(Model::default());
        context.enable_stats = true;
        context.update_rule_stats("linear: example rule");
        context.update_rule_stats("linear: example rule");
        context.update_rule_stats("bool_or: other rule");

        assert_eq!(3, context.num_presolve_operations());
        assert_eq!(
            Some(&2),
            context.stats_by_rule_name.get("linear: example rule")
        );

        context.clear_stats();
        assert!(context.stats_by_rule_name.is_empty());
        assert_eq!(3, context.num_presolve_operations());
    }

    #[test]
    fn abs_relations_reject_conflicts_only() {
        let mut context = PresolveContext::new(Model::default());
        let target = context.new_variable(Domain::from_bounds(0, 5));
        let x = context.new_variable(Domain::from_bounds(-5, 5));
        let y = context.new_variable(Domain::from_bounds(-5, 5));

        assert!(context.store_abs_relation(target, x));
        assert!(context.store_abs_relation(target, x));
        assert!(!context.store_abs_relation(target, y));
    }
}
