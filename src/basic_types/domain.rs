use crate::gourd_assert_moderate;
use crate::gourd_assert_simple;
use crate::math::NumExt;

/// Past this many intervals, [`Domain::relax_if_too_complex`] widens a domain
/// to its hull.
const MAX_NUM_INTERVALS: usize = 64;

/// A finite union of disjoint closed 64-bit integer intervals.
///
/// The intervals are stored sorted and non-adjacent: for consecutive entries
/// `[a, b]` and `[a', b']` we have `b + 1 < a'`. All constructors normalize
/// their input to this form, so equality of domains is equality of the
/// representation.
///
/// Arithmetic saturates at the 64-bit boundaries, which keeps every operation
/// a sound over-approximation near the representable extremes.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Domain {
    intervals: Vec<(i64, i64)>,
}

/// Negation that avoids the single non-representable case `-i64::MIN`.
fn negated_bound(value: i64) -> i64 {
    value.checked_neg().unwrap_or(i64::MAX)
}

impl Domain {
    pub fn empty() -> Domain {
        Domain { intervals: vec![] }
    }

    /// The domain containing every representable value.
    pub fn all_values() -> Domain {
        Domain::from_bounds(i64::MIN, i64::MAX)
    }

    pub fn constant(value: i64) -> Domain {
        Domain::from_bounds(value, value)
    }

    /// The single interval `[lower_bound, upper_bound]`, empty when the
    /// bounds cross.
    pub fn from_bounds(lower_bound: i64, upper_bound: i64) -> Domain {
        if lower_bound > upper_bound {
            Domain::empty()
        } else {
            Domain {
                intervals: vec![(lower_bound, upper_bound)],
            }
        }
    }

    /// Build a domain from arbitrary closed intervals: empty intervals are
    /// dropped, the rest are sorted and overlapping or adjacent ones merged.
    pub fn from_intervals(intervals: impl IntoIterator<Item = (i64, i64)>) -> Domain {
        let mut intervals: Vec<_> = intervals
            .into_iter()
            .filter(|(lower, upper)| lower <= upper)
            .collect();
        intervals.sort_unstable();

        let mut normalized: Vec<(i64, i64)> = Vec::with_capacity(intervals.len());
        for (lower, upper) in intervals {
            match normalized.last_mut() {
                Some((_, last_upper)) if lower <= last_upper.saturating_add(1) => {
                    *last_upper = (*last_upper).max(upper);
                }
                _ => normalized.push((lower, upper)),
            }
        }

        Domain {
            intervals: normalized,
        }
    }

    /// The intervals of the domain, sorted and non-adjacent.
    pub fn intervals(&self) -> &[(i64, i64)] {
        &self.intervals
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Whether the domain contains exactly one value.
    pub fn is_fixed(&self) -> bool {
        matches!(self.intervals.as_slice(), [(lower, upper)] if lower == upper)
    }

    pub fn min(&self) -> i64 {
        gourd_assert_simple!(!self.is_empty());
        self.intervals[0].0
    }

    pub fn max(&self) -> i64 {
        gourd_assert_simple!(!self.is_empty());
        self.intervals[self.intervals.len() - 1].1
    }

    /// The number of values in the domain, saturating at `u64::MAX`.
    pub fn size(&self) -> u64 {
        self.intervals
            .iter()
            .fold(0u64, |total, &(lower, upper)| {
                total.saturating_add(upper.abs_diff(lower).saturating_add(1))
            })
    }

    pub fn contains(&self, value: i64) -> bool {
        self.intervals
            .binary_search_by(|&(lower, upper)| {
                if value < lower {
                    std::cmp::Ordering::Greater
                } else if value > upper {
                    std::cmp::Ordering::Less
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }

    /// Whether there is a domain value in the closed range `[lower, upper]`.
    fn has_value_in_range(&self, lower: i64, upper: i64) -> bool {
        if lower > upper {
            return false;
        }
        self.intervals
            .iter()
            .any(|&(a, b)| a <= upper && lower <= b)
    }

    pub fn is_included_in(&self, other: &Domain) -> bool {
        self.intervals
            .iter()
            .all(|&(lower, upper)| {
                other
                    .intervals
                    .iter()
                    .any(|&(a, b)| a <= lower && upper <= b)
            })
    }

    pub fn intersection_with(&self, other: &Domain) -> Domain {
        let mut result = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < self.intervals.len() && j < other.intervals.len() {
            let (a_lower, a_upper) = self.intervals[i];
            let (b_lower, b_upper) = other.intervals[j];
            let lower = a_lower.max(b_lower);
            let upper = a_upper.min(b_upper);
            if lower <= upper {
                result.push((lower, upper));
            }
            if a_upper < b_upper {
                i += 1;
            } else {
                j += 1;
            }
        }
        Domain { intervals: result }
    }

    pub fn union_with(&self, other: &Domain) -> Domain {
        Domain::from_intervals(
            self.intervals
                .iter()
                .chain(other.intervals.iter())
                .copied(),
        )
    }

    /// The domain `{-v : v ∈ self}`.
    pub fn negation(&self) -> Domain {
        Domain {
            intervals: self
                .intervals
                .iter()
                .rev()
                .map(|&(lower, upper)| (negated_bound(upper), negated_bound(lower)))
                .collect(),
        }
    }

    /// The set of representable values not in the domain.
    pub fn complement(&self) -> Domain {
        let mut result = Vec::new();
        let mut next_lower = i64::MIN;
        for &(lower, upper) in &self.intervals {
            if next_lower < lower {
                result.push((next_lower, lower - 1));
            }
            if upper == i64::MAX {
                return Domain { intervals: result };
            }
            next_lower = upper + 1;
        }
        result.push((next_lower, i64::MAX));
        Domain { intervals: result }
    }

    /// The Minkowski sum `{a + b : a ∈ self, b ∈ other}` with saturating
    /// bounds. The result has at most `|self| · |other|` intervals before
    /// normalization; callers accumulating sums should follow up with
    /// [`Domain::relax_if_too_complex`].
    pub fn addition_with(&self, other: &Domain) -> Domain {
        Domain::from_intervals(self.intervals.iter().flat_map(|&(a_lower, a_upper)| {
            other.intervals.iter().map(move |&(b_lower, b_upper)| {
                (
                    a_lower.saturating_add(b_lower),
                    a_upper.saturating_add(b_upper),
                )
            })
        }))
    }

    /// The domain `{coeff · v : v ∈ self}`.
    ///
    /// For `|coeff| > 1` the exact result is a scatter of multiples; it is
    /// computed exactly for small domains and widened to the continuous
    /// superset `[coeff · min, coeff · max]`-style hull of each interval
    /// otherwise.
    pub fn multiplication_by(&self, coeff: i64) -> Domain {
        match coeff {
            0 => {
                if self.is_empty() {
                    Domain::empty()
                } else {
                    Domain::constant(0)
                }
            }
            1 => self.clone(),
            -1 => self.negation(),
            _ => {
                if self.size() <= MAX_NUM_INTERVALS as u64 {
                    Domain::from_intervals(self.iter_values().map(|value| {
                        let multiple = value.saturating_mul(coeff);
                        (multiple, multiple)
                    }))
                } else {
                    Domain::from_intervals(self.intervals.iter().map(|&(lower, upper)| {
                        let a = lower.saturating_mul(coeff);
                        let b = upper.saturating_mul(coeff);
                        (a.min(b), a.max(b))
                    }))
                }
            }
        }
    }

    /// The domain `{v : coeff · v ∈ self}` for a positive `coeff`.
    pub fn inverse_multiplication_by(&self, coeff: i64) -> Domain {
        gourd_assert_simple!(coeff > 0);
        Domain::from_intervals(self.intervals.iter().filter_map(|&(lower, upper)| {
            let new_lower = lower.div_ceil(coeff);
            let new_upper = upper.div_floor(coeff);
            (new_lower <= new_upper).then_some((new_lower, new_upper))
        }))
    }

    /// Widen the domain to its hull `[min, max]` when the interval count
    /// exceeds the complexity bound; otherwise return it unchanged.
    pub fn relax_if_too_complex(self) -> Domain {
        if self.intervals.len() > MAX_NUM_INTERVALS {
            Domain::from_bounds(self.min(), self.max())
        } else {
            self
        }
    }

    /// Simplify the representation knowing the value also lies in
    /// `implied_domain`: consecutive intervals are merged whenever the gap
    /// between them holds no implied value. The result `R` satisfies
    /// `R ∩ implied = self ∩ implied` with as few intervals as possible.
    pub fn simplify_using_implied_domain(&self, implied_domain: &Domain) -> Domain {
        let restricted = self.intersection_with(implied_domain);

        let mut result: Vec<(i64, i64)> = Vec::with_capacity(restricted.intervals.len());
        for &(lower, upper) in &restricted.intervals {
            match result.last_mut() {
                Some((_, last_upper))
                    if !implied_domain
                        .has_value_in_range(last_upper.saturating_add(1), lower - 1) =>
                {
                    *last_upper = upper;
                }
                _ => result.push((lower, upper)),
            }
        }
        let result = Domain { intervals: result };
        gourd_assert_moderate!(
            result.intersection_with(implied_domain) == restricted,
            "simplification must preserve the implied values"
        );
        result
    }

    /// Iterate over the values of the domain in increasing order.
    pub fn iter_values(&self) -> impl Iterator<Item = i64> + '_ {
        self.intervals
            .iter()
            .flat_map(|&(lower, upper)| lower..=upper)
    }
}

impl std::fmt::Debug for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, (lower, upper)) in self.intervals.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if lower == upper {
                write!(f, "{lower}")?;
            } else {
                write!(f, "[{lower}, {upper}]")?;
            }
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_sorts_and_merges_adjacent_intervals() {
        let domain = Domain::from_intervals([(5, 7), (0, 2), (3, 4), (10, 10)]);
        assert_eq!(&[(0, 7), (10, 10)], domain.intervals());
    }

    #[test]
    fn empty_intervals_are_dropped() {
        let domain = Domain::from_intervals([(3, 1)]);
        assert!(domain.is_empty());
    }

    #[test]
    fn queries_on_a_union_of_intervals() {
        let domain = Domain::from_intervals([(0, 2), (5, 8)]);
        assert_eq!(0, domain.min());
        assert_eq!(8, domain.max());
        assert_eq!(7, domain.size());
        assert!(domain.contains(2));
        assert!(domain.contains(5));
        assert!(!domain.contains(3));
        assert!(!domain.is_fixed());
        assert!(Domain::constant(4).is_fixed());
    }

    #[test]
    fn intersection_keeps_common_values_only() {
        let left = Domain::from_intervals([(0, 5), (10, 15)]);
        let right = Domain::from_intervals([(4, 12)]);
        assert_eq!(
            Domain::from_intervals([(4, 5), (10, 12)]),
            left.intersection_with(&right)
        );
    }

    #[test]
    fn intersection_with_superset_is_identity() {
        let domain = Domain::from_intervals([(1, 3), (7, 9)]);
        assert_eq!(domain, domain.intersection_with(&Domain::all_values()));
        assert!(domain.is_included_in(&Domain::all_values()));
    }

    #[test]
    fn negation_reverses_and_mirrors_intervals() {
        let domain = Domain::from_intervals([(1, 2), (5, 5)]);
        assert_eq!(Domain::from_intervals([(-5, -5), (-2, -1)]), domain.negation());
        assert_eq!(domain, domain.negation().negation());
    }

    #[test]
    fn complement_covers_the_gaps() {
        let domain = Domain::from_intervals([(0, 1), (5, 5)]);
        let complement = domain.complement();
        assert!(complement.contains(-1));
        assert!(complement.contains(2));
        assert!(complement.contains(4));
        assert!(complement.contains(6));
        assert!(!complement.contains(0));
        assert!(!complement.contains(5));
        assert_eq!(Domain::all_values(), domain.union_with(&complement));
    }

    #[test]
    fn addition_is_the_minkowski_sum() {
        let left = Domain::from_intervals([(0, 1), (10, 10)]);
        let right = Domain::constant(5);
        assert_eq!(
            Domain::from_intervals([(5, 6), (15, 15)]),
            left.addition_with(&right)
        );
    }

    #[test]
    fn multiplication_by_scalar_scatters_small_domains() {
        let domain = Domain::from_bounds(0, 2);
        assert_eq!(
            Domain::from_intervals([(0, 0), (3, 3), (6, 6)]),
            domain.multiplication_by(3)
        );
        assert_eq!(
            Domain::from_intervals([(-6, -6), (-3, -3), (0, 0)]),
            domain.multiplication_by(-3)
        );
    }

    #[test]
    fn multiplication_of_large_domains_is_a_superset() {
        let domain = Domain::from_bounds(0, 1000);
        let scaled = domain.multiplication_by(2);
        assert!(domain
            .iter_values()
            .take(100)
            .all(|value| scaled.contains(2 * value)));
    }

    #[test]
    fn inverse_multiplication_keeps_exact_multiples() {
        let domain = Domain::from_intervals([(2, 7), (9, 9)]);
        // {2..7, 9} has multiples of three {3, 6, 9}, i.e. quotients {1, 2, 3}.
        assert_eq!(Domain::from_bounds(1, 3), domain.inverse_multiplication_by(3));
        // {9} holds no multiple of two, so the second interval vanishes.
        assert_eq!(Domain::from_bounds(1, 3), domain.inverse_multiplication_by(2));
    }

    #[test]
    fn relaxation_widens_only_complex_domains() {
        let scattered =
            Domain::from_intervals((0..100).map(|i| (3 * i, 3 * i)));
        let relaxed = scattered.clone().relax_if_too_complex();
        assert_eq!(Domain::from_bounds(0, 297), relaxed);

        let simple = Domain::from_intervals([(0, 1), (5, 6)]);
        assert_eq!(simple.clone(), simple.relax_if_too_complex());
    }

    #[test]
    fn simplification_merges_gaps_without_implied_values() {
        let domain = Domain::from_intervals([(0, 2), (5, 7)]);
        let implied = Domain::from_intervals([(1, 2), (6, 6)]);
        // No implied value lies in the gap [3, 4], so one interval suffices.
        let simplified = domain.simplify_using_implied_domain(&implied);
        assert_eq!(&[(1, 6)], simplified.intervals());
    }

    #[test]
    fn simplification_preserves_gaps_with_implied_values() {
        let domain = Domain::from_intervals([(0, 2), (5, 7)]);
        let implied = Domain::from_bounds(0, 10);
        let simplified = domain.simplify_using_implied_domain(&implied);
        assert_eq!(domain, simplified);
    }

    #[test]
    fn saturation_at_the_representable_extremes() {
        let all = Domain::all_values();
        assert_eq!(i64::MAX, all.negation().max());
        assert_eq!(
            i64::MAX,
            Domain::constant(i64::MAX).addition_with(&Domain::constant(1)).max()
        );
    }
}
