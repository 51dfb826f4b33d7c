use super::player::Player;
use super::player::PlayerStatus;
use super::pot::Pot;
use pkr_cards::evaluate;
use pkr_cards::Card;
use pkr_core::Chips;
use std::collections::HashMap;

/// Payouts for a single pot.
#[derive(Debug, Clone)]
pub struct PotResult {
    pub amount: Chips,
    pub winners: Vec<(String, Chips)>,
}

/// Maps pots onto payouts at showdown.
///
/// For each pot, non-folded contributors are scored against the board and
/// the pot splits equally among the best hands. Remainder chips from the
/// integer split go one at a time to winners in `priority` order: seats
/// clockwise starting immediately left of the dealer.
///
/// A pot with no eligible winner is skipped. That cannot happen at a real
/// showdown; the guard exists so a malformed pot never panics the table.
pub fn distribute(
    pots: &[Pot],
    players: &HashMap<String, Player>,
    board: &[Card],
    priority: &[String],
) -> Vec<PotResult> {
    let position = |id: &String| {
        priority
            .iter()
            .position(|p| p == id)
            .unwrap_or(priority.len())
    };
    let mut results = Vec::new();
    for pot in pots {
        if pot.amount == 0 {
            continue;
        }
        let mut best = 0u32;
        let mut winners: Vec<String> = Vec::new();
        for id in &pot.contributors {
            let player = match players.get(id) {
                Some(p) if p.status != PlayerStatus::Folded => p,
                _ => continue,
            };
            let mut cards = player.hole_cards.clone();
            cards.extend_from_slice(board);
            let score = evaluate(&cards);
            if score > best || winners.is_empty() {
                best = score;
                winners = vec![id.clone()];
            } else if score == best {
                winners.push(id.clone());
            }
        }
        if winners.is_empty() {
            log::warn!("pot of {} has no eligible winner, skipping", pot.amount);
            continue;
        }
        winners.sort_by_key(position);
        let share = pot.amount / winners.len() as Chips;
        let remainder = pot.amount % winners.len() as Chips;
        results.push(PotResult {
            amount: pot.amount,
            winners: winners
                .into_iter()
                .enumerate()
                .map(|(i, id)| {
                    let bonus = if (i as Chips) < remainder { 1 } else { 0 };
                    (id, share + bonus)
                })
                .collect(),
        });
    }
    results
}

/// Flattens per-pot results into per-player totals.
pub fn payouts(results: &[PotResult]) -> HashMap<String, Chips> {
    let mut totals: HashMap<String, Chips> = HashMap::new();
    for result in results {
        for (id, amount) in &result.winners {
            *totals.entry(id.clone()).or_default() += amount;
        }
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn player(id: &str, hole: &str, status: PlayerStatus) -> (String, Player) {
        let mut p = Player::new(id, 0);
        p.status = status;
        p.hole_cards = Card::parse(hole).unwrap();
        (id.to_string(), p)
    }

    fn pot(amount: Chips, contributors: &[&str]) -> Pot {
        Pot {
            amount,
            contributors: contributors
                .iter()
                .map(|s| s.to_string())
                .collect::<HashSet<_>>(),
        }
    }

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn best_hand_takes_the_pot() {
        let players = HashMap::from([
            player("a", "As Ad", PlayerStatus::AllIn),
            player("b", "Ks Kd", PlayerStatus::AllIn),
        ]);
        let board = Card::parse("2c 7d 9h Jc 3s").unwrap();
        let results = distribute(
            &[pot(200, &["a", "b"])],
            &players,
            &board,
            &ids(&["a", "b"]),
        );
        assert_eq!(payouts(&results).get("a"), Some(&200));
    }

    #[test]
    fn folded_contributor_cannot_win() {
        let players = HashMap::from([
            player("a", "As Ad", PlayerStatus::Folded),
            player("b", "Ks Kd", PlayerStatus::Playing),
        ]);
        let board = Card::parse("2c 7d 9h Jc 3s").unwrap();
        let results = distribute(
            &[pot(200, &["a", "b"])],
            &players,
            &board,
            &ids(&["a", "b"]),
        );
        assert_eq!(payouts(&results).get("b"), Some(&200));
    }

    #[test]
    fn side_pots_pay_by_eligibility() {
        // a wins the main pot, b wins the first side pot, c wins nothing.
        let players = HashMap::from([
            player("a", "As Ad", PlayerStatus::AllIn),
            player("b", "Ks Kd", PlayerStatus::AllIn),
            player("c", "2s 7d", PlayerStatus::AllIn),
        ]);
        let board = Card::parse("3c 8d 9h Jc 4s").unwrap();
        let results = distribute(
            &[
                pot(300, &["a", "b", "c"]),
                pot(200, &["b", "c"]),
                pot(300, &["c"]),
            ],
            &players,
            &board,
            &ids(&["a", "b", "c"]),
        );
        let totals = payouts(&results);
        assert_eq!(totals.get("a"), Some(&300));
        assert_eq!(totals.get("b"), Some(&200));
        assert_eq!(totals.get("c"), Some(&300));
    }

    #[test]
    fn split_pot_remainder_goes_left_of_dealer() {
        let players = HashMap::from([
            player("a", "As Kd", PlayerStatus::Playing),
            player("b", "Ad Ks", PlayerStatus::Playing),
            player("c", "2s 7d", PlayerStatus::Playing),
        ]);
        let board = Card::parse("Ac Kc 9h Jc 3s").unwrap();
        // b sits immediately left of the dealer.
        let results = distribute(
            &[pot(301, &["a", "b", "c"])],
            &players,
            &board,
            &ids(&["b", "c", "a"]),
        );
        let totals = payouts(&results);
        assert_eq!(totals.get("b"), Some(&151));
        assert_eq!(totals.get("a"), Some(&150));
        assert_eq!(totals.get("c"), None);
    }

    #[test]
    fn empty_pot_is_skipped() {
        let players = HashMap::new();
        let results = distribute(&[pot(0, &[])], &players, &[], &[]);
        assert!(results.is_empty());
    }
}
