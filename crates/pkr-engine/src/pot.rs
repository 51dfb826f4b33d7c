use pkr_core::Chips;
use std::collections::BTreeMap;
use std::collections::HashSet;

/// One pot and the players eligible to win it.
///
/// Contributors include folded players; fold status filters winners at
/// distribution time, not here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pot {
    pub amount: Chips,
    pub contributors: HashSet<String>,
}

impl Pot {
    pub fn can_win(&self, player_id: &str) -> bool {
        self.contributors.contains(player_id)
    }
}

/// Splits per-street bets into a main pot and side pots.
///
/// Pots are ordered by eligibility: every later pot's contributor set is a
/// subset of the one before it.
#[derive(Debug, Clone)]
pub struct PotManager {
    pots: Vec<Pot>,
}

impl Default for PotManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PotManager {
    /// Starts with a single empty main pot that absorbs the first slice.
    pub fn new() -> Self {
        Self {
            pots: vec![Pot::default()],
        }
    }
    pub fn pots(&self) -> &[Pot] {
        &self.pots
    }
    /// Total chips across all pots.
    pub fn total(&self) -> Chips {
        self.pots.iter().map(|p| p.amount).sum()
    }
    /// Folds one betting round's bets into the pot structure.
    ///
    /// Slices the bets at each distinct all-in level: repeatedly take the
    /// minimum remaining bet m, move m from every remaining player into one
    /// slice, and drop players who hit zero. Each slice merges into the last
    /// pot when the contributor sets match, otherwise opens a new side pot.
    pub fn accumulate(&mut self, bets: &BTreeMap<String, Chips>) {
        let mut bets = bets
            .iter()
            .filter(|(_, amount)| **amount > 0)
            .map(|(id, amount)| (id.clone(), *amount))
            .collect::<BTreeMap<String, Chips>>();
        while !bets.is_empty() {
            let m = bets.values().copied().min().unwrap_or(0);
            let slice = Pot {
                amount: m * bets.len() as Chips,
                contributors: bets.keys().cloned().collect(),
            };
            bets.retain(|_, amount| {
                *amount -= m;
                *amount > 0
            });
            self.merge(slice);
        }
    }
    fn merge(&mut self, slice: Pot) {
        let last = self.pots.last_mut().expect("at least the main pot");
        if last.contributors.is_empty() && last.amount == 0 {
            *last = slice;
        } else if last.contributors == slice.contributors {
            last.amount += slice.amount;
        } else {
            self.pots.push(slice);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bets(entries: &[(&str, Chips)]) -> BTreeMap<String, Chips> {
        entries
            .iter()
            .map(|(id, amount)| (id.to_string(), *amount))
            .collect()
    }

    #[test]
    fn single_level_forms_one_pot() {
        let mut pots = PotManager::new();
        pots.accumulate(&bets(&[("a", 100), ("b", 100), ("c", 100)]));
        assert_eq!(pots.pots().len(), 1);
        assert_eq!(pots.pots()[0].amount, 300);
        assert_eq!(pots.total(), 300);
    }

    #[test]
    fn uneven_bets_slice_into_side_pots() {
        let mut pots = PotManager::new();
        pots.accumulate(&bets(&[("a", 100), ("b", 200), ("c", 500)]));
        let pots = pots.pots();
        assert_eq!(pots.len(), 3);
        assert_eq!(pots[0].amount, 300);
        assert_eq!(pots[1].amount, 200);
        assert_eq!(pots[2].amount, 300);
        assert_eq!(pots[0].contributors.len(), 3);
        assert_eq!(pots[1].contributors.len(), 2);
        assert_eq!(pots[2].contributors.len(), 1);
        assert!(pots[2].can_win("c"));
        assert!(!pots[2].can_win("a"));
    }

    #[test]
    fn eligibility_shrinks_monotonically() {
        let mut pots = PotManager::new();
        pots.accumulate(&bets(&[("a", 50), ("b", 120), ("c", 700), ("d", 700)]));
        for pair in pots.pots().windows(2) {
            assert!(pair[1].contributors.is_subset(&pair[0].contributors));
        }
    }

    #[test]
    fn equal_contributors_merge_across_streets() {
        let mut pots = PotManager::new();
        pots.accumulate(&bets(&[("a", 20), ("b", 20)]));
        pots.accumulate(&bets(&[("a", 50), ("b", 50)]));
        assert_eq!(pots.pots().len(), 1);
        assert_eq!(pots.total(), 140);
    }

    #[test]
    fn zero_bets_are_ignored() {
        let mut pots = PotManager::new();
        pots.accumulate(&bets(&[("a", 0), ("b", 0)]));
        assert_eq!(pots.pots().len(), 1);
        assert_eq!(pots.total(), 0);
    }
}
