use crate::gourd_assert_moderate;
use crate::gourd_assert_simple;

/// A variable expressed in terms of the representative of its equivalence
/// class: `variable = coeff · representative + offset` with `coeff ≠ 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    pub representative: usize,
    pub coeff: i64,
    pub offset: i64,
}

/// A union-find over affine facts `x = coeff · y + offset`.
///
/// Every non-representative entry points directly at its class
/// representative, so lookups are constant time and merges rewrite the
/// members of the absorbed class. Classes only ever merge; a representative
/// relates to itself as `(1, 0)`.
#[derive(Debug, Default, Clone)]
pub struct AffineRelations {
    /// `entries[v]` expresses `v` in terms of its class representative.
    entries: Vec<Relation>,
    /// The members of the class rooted at each representative, including the
    /// representative itself. Only meaningful at representative indices.
    class_members: Vec<Vec<usize>>,
}

impl AffineRelations {
    /// Register variables `entries.len()..new_len` as singleton classes.
    pub fn grow_to(&mut self, new_len: usize) {
        for variable in self.entries.len()..new_len {
            self.entries.push(Relation {
                representative: variable,
                coeff: 1,
                offset: 0,
            });
            self.class_members.push(vec![variable]);
        }
    }

    pub fn num_variables(&self) -> usize {
        self.entries.len()
    }

    /// The relation of `variable` to its class representative.
    pub fn get(&self, variable: usize) -> Relation {
        let relation = self.entries[variable];
        gourd_assert_moderate!(
            self.entries[relation.representative].representative == relation.representative,
            "non-representatives must point directly at their representative"
        );
        relation
    }

    /// The number of variables in the class of `variable`.
    pub fn class_size(&self, variable: usize) -> usize {
        self.class_members[self.entries[variable].representative].len()
    }

    /// Record `x = coeff · y + offset`, merging the two classes.
    ///
    /// `allow_rep_x`/`allow_rep_y` restrict which current representative may
    /// root the merged class. Returns true iff the classes were distinct and
    /// an orientation with integer coefficients was available; when `x` and
    /// `y` are already in one class nothing is checked or changed.
    pub fn try_add(
        &mut self,
        x: usize,
        y: usize,
        coeff: i64,
        offset: i64,
        allow_rep_x: bool,
        allow_rep_y: bool,
    ) -> bool {
        gourd_assert_simple!(coeff != 0);
        gourd_assert_simple!(allow_rep_x || allow_rep_y);

        let rel_x = self.entries[x];
        let rel_y = self.entries[y];
        if rel_x.representative == rel_y.representative {
            return false;
        }

        // x = coeff·y + offset and y = cy·rep_y + oy give
        //   cx·rep_x + ox = rhs_coeff·rep_y + rhs_offset.
        let Some(rhs_coeff) = coeff.checked_mul(rel_y.coeff) else {
            return false;
        };
        let Some(rhs_offset) = coeff
            .checked_mul(rel_y.offset)
            .and_then(|value| value.checked_add(offset))
        else {
            return false;
        };

        // Orientation "into y": rep_x is rewritten in terms of rep_y, which
        // stays representative. Requires cx to divide both sides.
        let into_y = (allow_rep_y
            && rhs_coeff % rel_x.coeff == 0
            && (rhs_offset - rel_x.offset) % rel_x.coeff == 0)
            .then(|| {
                (
                    rel_x.representative,
                    rel_y.representative,
                    rhs_coeff / rel_x.coeff,
                    (rhs_offset - rel_x.offset) / rel_x.coeff,
                )
            });
        // Orientation "into x": the mirror image.
        let into_x = (allow_rep_x
            && rel_x.coeff % rhs_coeff == 0
            && (rel_x.offset - rhs_offset) % rhs_coeff == 0)
            .then(|| {
                (
                    rel_y.representative,
                    rel_x.representative,
                    rel_x.coeff / rhs_coeff,
                    (rel_x.offset - rhs_offset) / rhs_coeff,
                )
            });

        // Prefer absorbing the smaller class when both orientations work.
        let chosen = match (into_y, into_x) {
            (Some(a), Some(b)) => {
                if self.class_members[b.0].len() < self.class_members[a.0].len() {
                    Some(b)
                } else {
                    Some(a)
                }
            }
            (a, b) => a.or(b),
        };
        let Some((old_rep, new_rep, coeff, offset)) = chosen else {
            return false;
        };

        self.absorb(old_rep, new_rep, coeff, offset)
    }

    /// Rewrite the class rooted at `old_rep` in terms of `new_rep`, given
    /// `old_rep = coeff · new_rep + offset`. Fails without mutating on
    /// arithmetic overflow in any composed member relation.
    fn absorb(&mut self, old_rep: usize, new_rep: usize, coeff: i64, offset: i64) -> bool {
        gourd_assert_simple!(coeff != 0);

        let mut rewritten = Vec::with_capacity(self.class_members[old_rep].len());
        for &member in &self.class_members[old_rep] {
            let relation = self.entries[member];
            // member = cm·old_rep + om = cm·coeff·new_rep + cm·offset + om.
            let Some(new_coeff) = relation.coeff.checked_mul(coeff) else {
                return false;
            };
            let Some(new_offset) = relation
                .coeff
                .checked_mul(offset)
                .and_then(|value| value.checked_add(relation.offset))
            else {
                return false;
            };
            rewritten.push((
                member,
                Relation {
                    representative: new_rep,
                    coeff: new_coeff,
                    offset: new_offset,
                },
            ));
        }

        for (member, relation) in rewritten {
            self.entries[member] = relation;
        }
        let members = std::mem::take(&mut self.class_members[old_rep]);
        self.class_members[new_rep].extend(members);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relations(num_variables: usize) -> AffineRelations {
        let mut relations = AffineRelations::default();
        relations.grow_to(num_variables);
        relations
    }

    #[test]
    fn fresh_variables_are_their_own_representative() {
        let relations = relations(3);
        for variable in 0..3 {
            assert_eq!(
                Relation {
                    representative: variable,
                    coeff: 1,
                    offset: 0
                },
                relations.get(variable)
            );
            assert_eq!(1, relations.class_size(variable));
        }
    }

    #[test]
    fn adding_a_relation_merges_the_classes() {
        let mut relations = relations(2);
        // x0 = 2·x1 + 1.
        assert!(relations.try_add(0, 1, 2, 1, true, true));

        assert_eq!(
            Relation {
                representative: 1,
                coeff: 2,
                offset: 1
            },
            relations.get(0)
        );
        assert_eq!(2, relations.class_size(0));
        assert_eq!(2, relations.class_size(1));
    }

    #[test]
    fn relations_compose_along_merges() {
        let mut relations = relations(3);
        // x0 = 2·x1 + 1 and x1 = 3·x2, hence x0 = 6·x2 + 1.
        assert!(relations.try_add(0, 1, 2, 1, true, true));
        assert!(relations.try_add(1, 2, 3, 0, true, true));

        assert_eq!(
            Relation {
                representative: 2,
                coeff: 6,
                offset: 1
            },
            relations.get(0)
        );
        assert_eq!(3, relations.class_size(2));
    }

    #[test]
    fn adding_within_one_class_reports_nothing_new() {
        let mut relations = relations(2);
        assert!(relations.try_add(0, 1, 1, 0, true, true));
        assert!(!relations.try_add(0, 1, 1, 0, true, true));
        assert!(!relations.try_add(1, 0, 1, 0, true, true));
    }

    #[test]
    fn divisibility_dictates_the_orientation() {
        let mut relations = relations(2);
        // x0 = 2·x1 can only keep x1 as representative: x1 = x0 / 2 is not
        // an integer relation.
        assert!(relations.try_add(0, 1, 2, 0, true, true));
        assert_eq!(1, relations.get(0).representative);
        assert_eq!(1, relations.get(1).representative);
    }

    #[test]
    fn representative_steering_is_honoured_for_unit_coefficients() {
        let mut relations = relations(2);
        // x0 = x1 + 5, but only x0 may root the class.
        assert!(relations.try_add(0, 1, 1, 5, true, false));
        assert_eq!(0, relations.get(1).representative);
        assert_eq!(
            Relation {
                representative: 0,
                coeff: 1,
                offset: -5
            },
            relations.get(1)
        );
    }

    #[test]
    fn steering_against_divisibility_fails() {
        let mut relations = relations(2);
        // x0 = 2·x1 with x0 forced as representative has no integer form.
        assert!(!relations.try_add(0, 1, 2, 0, true, false));
        assert_eq!(1, relations.class_size(0));
    }

    #[test]
    fn representatives_normalize_to_identity() {
        let mut relations = relations(2);
        assert!(relations.try_add(0, 1, -1, 0, true, true));
        let representative = relations.get(0).representative;
        assert_eq!(
            Relation {
                representative,
                coeff: 1,
                offset: 0
            },
            relations.get(representative)
        );
    }
}
