/// A fixed-universe set of indices which supports iterating over the set
/// members without scanning the whole universe.
///
/// Membership is a dense bit per index; the members are additionally kept in
/// an insertion-ordered list so that clearing and draining cost time
/// proportional to the number of set members rather than the universe size.
///
/// The presolve context uses this to track the variables whose domain changed
/// since the driver last inspected them.
#[derive(Debug, Default, Clone)]
pub struct SparseBitset {
    is_member: Vec<bool>,
    members: Vec<usize>,
}

impl SparseBitset {
    /// Grow the universe to `new_len` indices. Shrinking is not supported.
    pub fn grow_to(&mut self, new_len: usize) {
        if new_len > self.is_member.len() {
            self.is_member.resize(new_len, false);
        }
    }

    pub fn universe_len(&self) -> usize {
        self.is_member.len()
    }

    /// Add `index` to the set. Indices outside the universe panic.
    pub fn set(&mut self, index: usize) {
        if !self.is_member[index] {
            self.is_member[index] = true;
            self.members.push(index);
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        self.is_member.get(index).copied().unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Iterate over the members in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.members.iter().copied()
    }

    /// Remove and return all members, in insertion order.
    pub fn drain(&mut self) -> Vec<usize> {
        for &index in &self.members {
            self.is_member[index] = false;
        }
        std::mem::take(&mut self.members)
    }

    pub fn clear(&mut self) {
        let _ = self.drain();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_members_are_observed_through_contains() {
        let mut bitset = SparseBitset::default();
        bitset.grow_to(10);

        bitset.set(3);
        bitset.set(7);

        assert!(bitset.contains(3));
        assert!(bitset.contains(7));
        assert!(!bitset.contains(4));
        assert!(!bitset.contains(15));
    }

    #[test]
    fn setting_twice_does_not_duplicate_members() {
        let mut bitset = SparseBitset::default();
        bitset.grow_to(5);

        bitset.set(2);
        bitset.set(2);

        assert_eq!(vec![2], bitset.drain());
    }

    #[test]
    fn draining_empties_the_set_and_preserves_insertion_order() {
        let mut bitset = SparseBitset::default();
        bitset.grow_to(5);

        bitset.set(4);
        bitset.set(0);
        bitset.set(2);

        assert_eq!(vec![4, 0, 2], bitset.drain());
        assert!(bitset.is_empty());
        assert!(!bitset.contains(4));
    }

    #[test]
    fn growing_preserves_members() {
        let mut bitset = SparseBitset::default();
        bitset.grow_to(2);
        bitset.set(1);

        bitset.grow_to(8);
        bitset.set(6);

        assert!(bitset.contains(1));
        assert!(bitset.contains(6));
    }
}
