//! The literal↔(variable = value) encoding tables of the context.

use log::debug;

use crate::basic_types::Domain;
use crate::basic_types::VariableRef;
use crate::gourd_assert_simple;
use crate::model::Constraint;
use crate::model::ConstraintKind;
use crate::model::LinearConstraint;
use crate::presolve::PresolveContext;

impl PresolveContext {
    /// Append the implication `a => b` as an enforced Boolean conjunction.
    pub fn add_implication(&mut self, a: VariableRef, b: VariableRef) {
        let _ = self.working_model.add_constraint(Constraint::enforced(
            vec![a],
            ConstraintKind::BoolAnd { literals: vec![b] },
        ));
    }

    /// Append the half-reified restriction `literal => reference ∈ domain`
    /// as an enforced single-variable linear constraint.
    pub fn add_imply_in_domain(
        &mut self,
        literal: VariableRef,
        reference: VariableRef,
        domain: &Domain,
    ) {
        let _ = self.working_model.add_constraint(Constraint::enforced(
            vec![literal],
            ConstraintKind::Linear(LinearConstraint {
                vars: vec![reference],
                coeffs: vec![1],
                domain: domain.intervals().to_vec(),
            }),
        ));
    }

    /// Record the full encoding `literal ⇔ (reference = value)`.
    ///
    /// A duplicate key merges the two literals through a Boolean equality.
    /// For a two-value domain the complementary value is encoded as the
    /// negation and the arithmetic identity linking variable and literal is
    /// appended together with its affine relation; for larger domains the
    /// two half-reified implications are installed instead.
    pub fn insert_var_value_encoding(
        &mut self,
        literal: VariableRef,
        reference: VariableRef,
        value: i64,
    ) {
        let variable = reference.index();
        let var_value = if reference.is_positive() { value } else { -value };
        let key = (variable, var_value);

        if let Some(previous) = self.encoding.get(&key).copied() {
            if literal != previous {
                self.store_boolean_equality_relation(literal, previous);
            }
            return;
        }
        let _ = self.encoding.insert(key, literal);

        let positive = VariableRef::from_index(variable);
        if self.domain_of(positive).size() == 2 {
            let var_min = self.min_of(positive);
            let var_max = self.max_of(positive);
            let other_value = if var_value == var_min { var_max } else { var_min };
            let other_key = (variable, other_value);

            if let Some(previous_other) = self.encoding.get(&other_key).copied() {
                // The other value of the domain is already encoded.
                if previous_other != literal.negated() {
                    self.store_boolean_equality_relation(literal, previous_other.negated());
                }
            } else {
                let _ = self.encoding.insert(other_key, literal.negated());

                // Variable and literal are linked by an arithmetic identity:
                // either var = min + (max - min)·lit or the mirrored form.
                if literal.is_positive() == (var_value == var_max) {
                    let ct = self.working_model.add_constraint(Constraint::new(
                        ConstraintKind::Linear(LinearConstraint {
                            vars: vec![positive, literal.positive()],
                            coeffs: vec![1, var_min - var_max],
                            domain: vec![(var_min, var_min)],
                        }),
                    ));
                    self.store_affine_relation(
                        ct,
                        positive,
                        literal.positive(),
                        var_max - var_min,
                        var_min,
                    );
                } else {
                    let ct = self.working_model.add_constraint(Constraint::new(
                        ConstraintKind::Linear(LinearConstraint {
                            vars: vec![positive, literal.positive()],
                            coeffs: vec![1, var_max - var_min],
                            domain: vec![(var_max, var_max)],
                        }),
                    ));
                    self.store_affine_relation(
                        ct,
                        positive,
                        literal.positive(),
                        var_min - var_max,
                        var_max,
                    );
                }
            }
        } else {
            debug!("insert lit({literal}) <=> var({positive}) == {var_value}");
            let _ = self
                .eq_half_encoding
                .entry(key)
                .or_default()
                .insert(literal);
            self.add_imply_in_domain(literal, positive, &Domain::constant(var_value));
            let _ = self
                .neq_half_encoding
                .entry(key)
                .or_default()
                .insert(literal.negated());
            self.add_imply_in_domain(
                literal.negated(),
                positive,
                &Domain::constant(var_value).complement(),
            );
        }
    }

    /// Record the half encoding `literal => (variable = value)` when
    /// `imply_eq`, or `literal => (variable ≠ value)` otherwise.
    ///
    /// When the opposite half map holds the negated literal under the same
    /// key, the two halves prove a full encoding, which is installed;
    /// a conflicting previous encoding literal is merged through a Boolean
    /// equality. Returns whether the half encoding was new.
    pub(crate) fn insert_half_var_value_encoding(
        &mut self,
        literal: VariableRef,
        variable: usize,
        value: i64,
        imply_eq: bool,
    ) -> bool {
        let key = (variable, value);
        let direct_map = if imply_eq {
            &mut self.eq_half_encoding
        } else {
            &mut self.neq_half_encoding
        };
        if !direct_map.entry(key).or_default().insert(literal) {
            return false;
        }

        debug!(
            "collect lit({literal}) implies x{variable} {} {value}",
            if imply_eq { "==" } else { "!=" }
        );
        self.update_rule_stats("variables: detect half reified value encoding");

        let other_map = if imply_eq {
            &self.neq_half_encoding
        } else {
            &self.eq_half_encoding
        };
        let halves_meet = other_map
            .get(&key)
            .is_some_and(|literals| literals.contains(&literal.negated()));
        if halves_meet {
            let imply_eq_literal = if imply_eq { literal } else { literal.negated() };
            match self.encoding.get(&key).copied() {
                None => {
                    let _ = self.encoding.insert(key, imply_eq_literal);
                    debug!("detect and store lit({imply_eq_literal}) <=> x{variable} == {value}");
                    self.update_rule_stats("variables: detect fully reified value encoding");
                }
                Some(previous) if previous != imply_eq_literal => {
                    self.store_boolean_equality_relation(imply_eq_literal, previous);
                    self.update_rule_stats(
                        "variables: merge equivalent var value encoding literals",
                    );
                }
                Some(_) => {}
            }
        }
        true
    }

    /// Record `literal => (variable = value)`.
    pub fn store_literal_implies_var_eq_value(
        &mut self,
        literal: VariableRef,
        variable: VariableRef,
        value: i64,
    ) -> bool {
        gourd_assert_simple!(variable.is_positive());
        self.insert_half_var_value_encoding(literal, variable.index(), value, true)
    }

    /// Record `literal => (variable ≠ value)`.
    pub fn store_literal_implies_var_neq_value(
        &mut self,
        literal: VariableRef,
        variable: VariableRef,
        value: i64,
    ) -> bool {
        gourd_assert_simple!(variable.is_positive());
        self.insert_half_var_value_encoding(literal, variable.index(), value, false)
    }

    /// The representative of the encoding literal of `reference = value`,
    /// if one is recorded.
    pub fn has_var_value_encoding(
        &self,
        reference: VariableRef,
        value: i64,
    ) -> Option<VariableRef> {
        let variable = reference.index();
        let var_value = if reference.is_positive() { value } else { -value };
        self.encoding
            .get(&(variable, var_value))
            .map(|&literal| self.get_literal_representative(literal))
    }

    /// The literal equivalent to `reference = value`, creating it on demand.
    pub fn get_or_create_literal_for_equality(
        &mut self,
        reference: VariableRef,
        value: i64,
    ) -> VariableRef {
        let variable = reference.index();
        let var_value = if reference.is_positive() { value } else { -value };

        // A value outside the domain encodes as the false literal.
        if !self.domains[reference.positive()].contains(var_value) {
            return self.get_or_create_constant(0);
        }

        let key = (variable, var_value);
        if let Some(literal) = self.encoding.get(&key).copied() {
            return self.get_literal_representative(literal);
        }

        let positive = VariableRef::from_index(variable);
        if self.domains[positive].size() == 1 {
            let true_literal = self.get_or_create_constant(1);
            let _ = self.encoding.insert(key, true_literal);
            return true_literal;
        }

        let var_min = self.min_of(positive);
        let var_max = self.max_of(positive);
        if self.domains[positive].size() == 2 {
            let other_value = if var_value == var_min { var_max } else { var_min };
            if let Some(other_literal) = self.encoding.get(&(variable, other_value)).copied() {
                // The domain may have shrunk to two values after the other
                // encoding was created; the negation covers this value now.
                let literal = self.get_literal_representative(other_literal.negated());
                let _ = self.encoding.insert(key, literal);
                return literal;
            }

            if var_min == 0 && var_max == 1 {
                // A Boolean variable is its own encoding literal.
                let representative = self.get_literal_representative(positive);
                let _ = self.encoding.insert((variable, 1), representative);
                let _ = self.encoding.insert((variable, 0), representative.negated());
                return if var_value == 1 {
                    representative
                } else {
                    representative.negated()
                };
            }

            let literal = self.new_bool_variable();
            self.insert_var_value_encoding(literal, positive, var_max);
            let representative = self.get_literal_representative(literal);
            return if var_value == var_max {
                representative
            } else {
                representative.negated()
            };
        }

        let literal = self.new_bool_variable();
        self.insert_var_value_encoding(literal, positive, var_value);
        self.get_literal_representative(literal)
    }
}
