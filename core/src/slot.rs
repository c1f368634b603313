use dealer_common::types::{SlotCandidate, StorageLayout};

/// Brute-force search order over mapping slots.
///
/// Without a layout hint both conventions are tried at each index before
/// moving on (`solidity@0, vyper@0, solidity@1, ...`). With a hint only that
/// layout is walked. Iteration ends after `max_slot`, inclusive.
#[derive(Debug, Clone)]
pub struct CandidateIter {
    next: Option<SlotCandidate>,
    layout: Option<StorageLayout>,
    max_slot: u64,
}

impl CandidateIter {
    pub fn new(start: u64, layout: Option<StorageLayout>, max_slot: u64) -> Self {
        let first = SlotCandidate::new(layout.unwrap_or(StorageLayout::Solidity), start);

        Self {
            next: (start <= max_slot).then_some(first),
            layout,
            max_slot,
        }
    }
}

impl Iterator for CandidateIter {
    type Item = SlotCandidate;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;

        self.next = match (self.layout, current.layout) {
            (None, StorageLayout::Solidity) => {
                Some(SlotCandidate::new(StorageLayout::Vyper, current.slot))
            }
            _ => current
                .slot
                .checked_add(1)
                .filter(|slot| *slot <= self.max_slot)
                .map(|slot| {
                    SlotCandidate::new(self.layout.unwrap_or(StorageLayout::Solidity), slot)
                }),
        };

        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use StorageLayout::{Solidity, Vyper};

    fn collect(start: u64, layout: Option<StorageLayout>, max_slot: u64) -> Vec<(StorageLayout, u64)> {
        CandidateIter::new(start, layout, max_slot)
            .map(|c| (c.layout, c.slot))
            .collect()
    }

    #[test]
    fn test_alternates_layouts_without_hint() {
        assert_eq!(
            collect(0, None, 2),
            vec![
                (Solidity, 0),
                (Vyper, 0),
                (Solidity, 1),
                (Vyper, 1),
                (Solidity, 2),
                (Vyper, 2),
            ]
        );
    }

    #[test]
    fn test_fixed_layout_sweeps_indices() {
        assert_eq!(
            collect(0, Some(Vyper), 3),
            vec![(Vyper, 0), (Vyper, 1), (Vyper, 2), (Vyper, 3)]
        );
        assert_eq!(collect(2, Some(Solidity), 3), vec![(Solidity, 2), (Solidity, 3)]);
    }

    #[test]
    fn test_starts_at_hinted_slot() {
        assert_eq!(
            collect(9, None, 10),
            vec![(Solidity, 9), (Vyper, 9), (Solidity, 10), (Vyper, 10)]
        );
    }

    #[test]
    fn test_single_slot_bound() {
        assert_eq!(collect(51, Some(Solidity), 51), vec![(Solidity, 51)]);
        assert_eq!(collect(0, None, 0), vec![(Solidity, 0), (Vyper, 0)]);
    }

    #[test]
    fn test_start_past_bound_is_empty() {
        assert!(collect(11, None, 10).is_empty());
    }

    #[test]
    fn test_bound_of_ten_yields_twenty_two_candidates() {
        assert_eq!(CandidateIter::new(0, None, 10).count(), 22);
    }

    #[test]
    fn test_max_index_does_not_overflow() {
        assert_eq!(
            collect(u64::MAX, None, u64::MAX),
            vec![(Solidity, u64::MAX), (Vyper, u64::MAX)]
        );
    }
}
