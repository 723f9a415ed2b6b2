//! The objective of the working model in canonical form.

use itertools::Itertools;

use crate::basic_types::Domain;
use crate::basic_types::EmptyDomain;
use crate::basic_types::VariableRef;
use crate::gourd_assert_eq_simple;
use crate::gourd_assert_simple;
use crate::math::gcd64;
use crate::model::ConstraintKind;
use crate::presolve::PresolveContext;
use crate::presolve::OBJECTIVE_CONSTRAINT_INDEX;

impl PresolveContext {
    /// Load the objective of the working model into the sparse canonical
    /// form, folding reference signs into the coefficients and erasing zero
    /// entries.
    pub fn read_objective_from_proto(&mut self) {
        let Some(objective) = self.working_model.objective.clone() else {
            return;
        };

        self.objective_offset = objective.offset;
        self.objective_scaling_factor = if objective.scaling_factor == 0.0 {
            1.0
        } else {
            objective.scaling_factor
        };

        if objective.domain.is_empty() {
            self.objective_domain_is_constraining = false;
            self.objective_domain = Domain::all_values();
        } else {
            // Canonicalization may relax this once the implied domain of the
            // objective expression is known.
            self.objective_domain_is_constraining = true;
            self.objective_domain = Domain::from_intervals(objective.domain.iter().copied());
        }

        self.objective_map.clear();
        for (reference, coeff) in objective
            .vars
            .iter()
            .copied()
            .zip_eq(objective.coeffs.iter().copied())
        {
            let coeff = if reference.is_positive() { coeff } else { -coeff };
            let variable = reference.index();

            let entry = self.objective_map.entry(variable).or_insert(0);
            *entry += coeff;
            if *entry == 0 {
                let _ = self.objective_map.remove(&variable);
                let _ = self.var_to_constraints[variable].remove(&OBJECTIVE_CONSTRAINT_INDEX);
            } else {
                let _ = self.var_to_constraints[variable].insert(OBJECTIVE_CONSTRAINT_INDEX);
            }
        }
    }

    /// Rewrite the objective into its canonical form.
    ///
    /// Objective-only variables are fixed to their cheapest endpoint, fixed
    /// variables are absorbed into the offset, the remaining entries are
    /// rewritten through their affine representatives, the objective domain
    /// is tightened by the implied domain of the expression, and the
    /// coefficients are divided by their GCD with the floating scaling
    /// factor and offset compensating.
    pub fn canonicalize_objective(&mut self) -> Result<(), EmptyDomain> {
        let mut offset_change: i64 = 0;

        // Iterate a snapshot: entries are erased and created while the map
        // is rewritten through the affine representatives.
        let snapshot: Vec<usize> = self.objective_map.keys().copied().collect();
        for variable in snapshot {
            let Some(&coeff) = self.objective_map.get(&variable) else {
                continue;
            };
            let reference = VariableRef::from_index(variable);

            // A variable appearing nowhere else can be fixed to the endpoint
            // minimizing its contribution. Whether it was in an affine
            // relation does not matter: with no relations left it is free.
            if !self.keep_all_feasible_solutions
                && !self.objective_domain_is_constraining
                && self.constraint_variable_graph_is_up_to_date()
                && self.var_to_constraints[variable].len() == 1
                && self.var_to_constraints[variable].contains(&OBJECTIVE_CONSTRAINT_INDEX)
            {
                self.update_rule_stats("objective: variable not used elsewhere");
                let target = if coeff > 0 {
                    self.min_of(reference)
                } else {
                    self.max_of(reference)
                };
                let _ = self.intersect_domain_with(reference, &Domain::constant(target))?;
            }

            if self.is_fixed(reference) {
                offset_change += coeff * self.min_of(reference);
                let _ = self.objective_map.remove(&variable);
                let _ = self.var_to_constraints[variable].remove(&OBJECTIVE_CONSTRAINT_INDEX);
                continue;
            }

            let relation = self.get_affine_relation(reference);
            if relation.representative == variable {
                continue;
            }

            let _ = self.objective_map.remove(&variable);
            let _ = self.var_to_constraints[variable].remove(&OBJECTIVE_CONSTRAINT_INDEX);

            // Substitute variable = coeff_rel · representative + offset_rel.
            offset_change += coeff * relation.offset;
            let new_coeff = {
                let entry = self.objective_map.entry(relation.representative).or_insert(0);
                *entry += coeff * relation.coeff;
                *entry
            };
            if new_coeff == 0 {
                let _ = self.objective_map.remove(&relation.representative);
                let _ = self.var_to_constraints[relation.representative]
                    .remove(&OBJECTIVE_CONSTRAINT_INDEX);
            } else {
                let _ = self.var_to_constraints[relation.representative]
                    .insert(OBJECTIVE_CONSTRAINT_INDEX);
                let representative = VariableRef::from_index(relation.representative);
                if self.is_fixed(representative) {
                    offset_change += new_coeff * self.min_of(representative);
                    let _ = self.objective_map.remove(&relation.representative);
                    let _ = self.var_to_constraints[relation.representative]
                        .remove(&OBJECTIVE_CONSTRAINT_INDEX);
                }
            }
        }

        // Accumulate the implied domain over sorted entries so the result is
        // deterministic.
        let mut entries: Vec<(usize, i64)> = self
            .objective_map
            .iter()
            .map(|(&variable, &coeff)| (variable, coeff))
            .collect();
        entries.sort_unstable();

        let mut implied_domain = Domain::constant(0);
        let mut gcd: i64 = 0;
        for &(variable, coeff) in &entries {
            gcd = gcd64(gcd, coeff);
            implied_domain = implied_domain
                .addition_with(
                    &self
                        .domain_of(VariableRef::from_index(variable))
                        .multiplication_by(coeff),
                )
                .relax_if_too_complex();
        }

        // The objective domain never includes the offset.
        self.objective_domain = self
            .objective_domain
            .addition_with(&Domain::constant(-offset_change))
            .intersection_with(&implied_domain);
        self.objective_domain = self
            .objective_domain
            .simplify_using_implied_domain(&implied_domain);
        self.objective_offset += offset_change as f64;

        if gcd > 1 {
            for coeff in self.objective_map.values_mut() {
                *coeff /= gcd;
            }
            self.objective_domain = self.objective_domain.inverse_multiplication_by(gcd);
            self.objective_offset /= gcd as f64;
            self.objective_scaling_factor *= gcd as f64;
        }

        if self.objective_domain.is_empty() {
            self.notify_model_is_unsat();
            return Err(EmptyDomain);
        }

        // When the objective domain does not cut off any low value of the
        // expression, reductions of the objective value are always safe.
        self.objective_domain_is_constraining = !implied_domain
            .intersection_with(&Domain::from_bounds(i64::MIN, self.objective_domain.max()))
            .is_included_in(&self.objective_domain);
        Ok(())
    }

    /// Replace `var_in_equality` in the objective using the linear equality
    /// constraint at `equality_index`.
    ///
    /// The objective coefficient of the variable must be an exact multiple
    /// of its coefficient in the equality. Returns the variables that newly
    /// entered the objective.
    pub fn substitute_variable_in_objective(
        &mut self,
        var_in_equality: VariableRef,
        coeff_in_equality: i64,
        equality_index: usize,
    ) -> Vec<VariableRef> {
        gourd_assert_simple!(var_in_equality.is_positive());
        gourd_assert_simple!(coeff_in_equality != 0);
        let constraint = &self.working_model.constraints[equality_index];
        gourd_assert_simple!(constraint.enforcement.is_empty());
        let ConstraintKind::Linear(equality) = constraint.kind.clone() else {
            panic!("objective substitution requires a linear equality constraint");
        };

        let variable = var_in_equality.index();
        let coeff_in_objective = self.objective_map[&variable];
        gourd_assert_eq_simple!(coeff_in_objective % coeff_in_equality, 0);
        let multiplier = coeff_in_objective / coeff_in_equality;

        let mut new_vars_in_objective = Vec::new();
        for (reference, coeff) in equality.terms() {
            let term_variable = reference.index();
            let coeff = if reference.is_positive() { coeff } else { -coeff };
            if term_variable == variable {
                continue;
            }

            let entry = self.objective_map.entry(term_variable).or_insert(0);
            if *entry == 0 {
                new_vars_in_objective.push(VariableRef::from_index(term_variable));
            }
            *entry -= coeff * multiplier;
            if *entry == 0 {
                let _ = self.objective_map.remove(&term_variable);
                let _ = self.var_to_constraints[term_variable].remove(&OBJECTIVE_CONSTRAINT_INDEX);
            } else {
                let _ = self.var_to_constraints[term_variable].insert(OBJECTIVE_CONSTRAINT_INDEX);
            }
        }

        let _ = self.objective_map.remove(&variable);
        let _ = self.var_to_constraints[variable].remove(&OBJECTIVE_CONSTRAINT_INDEX);

        // The equality has a fixed right-hand side which shifts both the
        // floating offset and the objective domain.
        let rhs = Domain::from_intervals(equality.domain.iter().copied());
        gourd_assert_simple!(rhs.is_fixed());
        let Some(offset) = rhs.min().checked_mul(multiplier) else {
            panic!("overflow in the substituted objective offset");
        };
        self.objective_offset += offset as f64;
        self.objective_domain = self
            .objective_domain
            .addition_with(&Domain::constant(-offset));

        // The equality was constraining, so the objective domain now is.
        self.objective_domain_is_constraining = true;

        new_vars_in_objective
    }

    /// Write the canonical objective back to the working model, with the
    /// entries in sorted key order for determinism. An empty objective
    /// domain proves the model infeasible instead.
    pub fn write_objective_to_proto(&mut self) {
        if self.objective_domain.is_empty() {
            self.notify_model_is_unsat();
            return;
        }

        let mut entries: Vec<(usize, i64)> = self
            .objective_map
            .iter()
            .map(|(&variable, &coeff)| (variable, coeff))
            .collect();
        entries.sort_unstable();

        let objective = self.working_model.objective.get_or_insert_with(Default::default);
        objective.offset = self.objective_offset;
        objective.scaling_factor = self.objective_scaling_factor;
        objective.domain = self.objective_domain.intervals().to_vec();
        objective.vars.clear();
        objective.coeffs.clear();
        for (variable, coeff) in entries {
            objective.vars.push(VariableRef::from_index(variable));
            objective.coeffs.push(coeff);
        }
    }

    /// The canonical objective coefficient of the variable; zero when
    /// absent.
    pub fn objective_coefficient(&self, reference: VariableRef) -> i64 {
        gourd_assert_simple!(reference.is_positive());
        self.objective_map
            .get(&reference.index())
            .copied()
            .unwrap_or(0)
    }

    pub fn objective_map_contains(&self, reference: VariableRef) -> bool {
        self.objective_map.contains_key(&reference.index())
    }

    pub fn objective_domain(&self) -> &Domain {
        &self.objective_domain
    }

    pub fn objective_offset(&self) -> f64 {
        self.objective_offset
    }

    pub fn objective_scaling_factor(&self) -> f64 {
        self.objective_scaling_factor
    }

    pub fn objective_domain_is_constraining(&self) -> bool {
        self.objective_domain_is_constraining
    }
}
