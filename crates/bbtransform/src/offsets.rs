//! Cumulative position-delta ledger.
//!
//! [`Offsets`] records how much longer (or shorter) the rendered output is
//! than the source up to a given source position. Each entry stores the
//! *running total* of all deltas at or before its position, so a lookup is a
//! single floor search in the ordered map.
//!
//! ```rust
//! use bbtransform::Offsets;
//!
//! let mut offsets = Offsets::new();
//! offsets.add(1, 3); // "<" became "&lt;"
//! offsets.add(4, 4); // "&" became "&amp;"
//!
//! assert_eq!(offsets.compute_offset_from_index(0), 0);
//! assert_eq!(offsets.compute_offset_from_index(2), 3);
//! assert_eq!(offsets.compute_offset_from_index(4), 7);
//! assert_eq!(offsets.to_output(5), 12);
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Bound;

/// Sorted map from source position to cumulative length delta.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Offsets {
    entries: BTreeMap<usize, isize>,
}

impl Offsets {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that an edit at `position` changed the output length by `delta`.
    ///
    /// Additions at the same position merge into one entry. Entries after
    /// `position` are shifted as well, so the ledger stays consistent even
    /// when edits arrive out of order.
    pub fn add(&mut self, position: usize, delta: isize) {
        let previous = self
            .entries
            .range(..position)
            .next_back()
            .map(|(_, total)| *total)
            .unwrap_or(0);

        *self.entries.entry(position).or_insert(previous) += delta;

        for (_, total) in self
            .entries
            .range_mut((Bound::Excluded(position), Bound::Unbounded))
        {
            *total += delta;
        }
    }

    /// Returns the cumulative delta of the last entry at or before `index`.
    pub fn compute_offset_from_index(&self, index: usize) -> isize {
        self.entries
            .range(..=index)
            .next_back()
            .map(|(_, total)| *total)
            .unwrap_or(0)
    }

    /// Shifts a source index by the recorded text-filter edits.
    ///
    /// For a character the filter emitted unchanged, inside text that no
    /// renderer rewrote, this is its position in the output. For a substituted
    /// character it lands on the last byte of the replacement. Markup replaced
    /// by renderers is not in the ledger, so positions after a rendered tag
    /// are only shifted by the text edits.
    pub fn to_output(&self, index: usize) -> usize {
        let shifted = index as isize + self.compute_offset_from_index(index);
        shifted.max(0) as usize
    }

    /// Iterates `(position, cumulative delta)` pairs in position order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, isize)> + '_ {
        self.entries.iter().map(|(pos, total)| (*pos, *total))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Offsets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn additions() -> impl Strategy<Value = Vec<(usize, isize)>> {
        prop::collection::vec((0usize..64, 0isize..20), 0..40)
    }

    proptest! {
        #[test]
        fn offset_is_sum_of_deltas_at_or_before(adds in additions(), index in 0usize..80) {
            let mut offsets = Offsets::new();
            for (pos, delta) in &adds {
                offsets.add(*pos, *delta);
            }
            let expected: isize = adds
                .iter()
                .filter(|(pos, _)| *pos <= index)
                .map(|(_, delta)| *delta)
                .sum();
            prop_assert_eq!(offsets.compute_offset_from_index(index), expected);
        }

        #[test]
        fn offset_is_monotonic_for_positive_deltas(adds in additions()) {
            let mut offsets = Offsets::new();
            for (pos, delta) in &adds {
                offsets.add(*pos, *delta);
            }
            let mut last = 0;
            for index in 0..80 {
                let current = offsets.compute_offset_from_index(index);
                prop_assert!(current >= last);
                last = current;
            }
        }
    }
}
