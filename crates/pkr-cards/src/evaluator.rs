use super::card::Card;
use super::rank::Rank;

/// Standard hand classes, weakest to strongest.
///
/// The discriminant is the high byte of an evaluated score, so categories
/// compare the same way scores do.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum HandCategory {
    HighCard = 0,
    Pair = 1,
    TwoPair = 2,
    Trips = 3,
    Straight = 4,
    Flush = 5,
    FullHouse = 6,
    Quads = 7,
    StraightFlush = 8,
    RoyalFlush = 9,
}

impl HandCategory {
    /// Recovers the category from an evaluated score.
    pub fn of(score: u32) -> Self {
        match score >> 24 {
            0 => Self::HighCard,
            1 => Self::Pair,
            2 => Self::TwoPair,
            3 => Self::Trips,
            4 => Self::Straight,
            5 => Self::Flush,
            6 => Self::FullHouse,
            7 => Self::Quads,
            8 => Self::StraightFlush,
            _ => Self::RoyalFlush,
        }
    }
}

impl std::fmt::Display for HandCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::HighCard => "High Card",
                Self::Pair => "Pair",
                Self::TwoPair => "Two Pair",
                Self::Trips => "Three of a Kind",
                Self::Straight => "Straight",
                Self::Flush => "Flush",
                Self::FullHouse => "Full House",
                Self::Quads => "Four of a Kind",
                Self::StraightFlush => "Straight Flush",
                Self::RoyalFlush => "Royal Flush",
            }
        )
    }
}

/// Scores the best 5-card hand among 5 to 7 cards.
///
/// Returns a 32-bit score where strictly greater means strictly stronger and
/// equality means an exact tie: the hand category occupies the high byte and
/// the kicker ranks pack into the low 24 bits, most significant first. Every
/// 5-card subset (at most C(7,5) = 21) is classified and the maximum wins.
///
/// Fewer than 5 cards scores 0; callers must not rank such hands.
pub fn evaluate(cards: &[Card]) -> u32 {
    let n = cards.len();
    if n < 5 {
        return 0;
    }
    let mut best = 0;
    for mask in 0u32..(1u32 << n) {
        if mask.count_ones() != 5 {
            continue;
        }
        let mut five = [cards[0]; 5];
        let mut k = 0;
        for (i, card) in cards.iter().enumerate() {
            if mask & (1 << i) != 0 {
                five[k] = *card;
                k += 1;
            }
        }
        best = best.max(evaluate5(five));
    }
    best
}

fn evaluate5(mut cards: [Card; 5]) -> u32 {
    cards.sort_by(|a, b| b.rank().cmp(&a.rank()));
    let ranks = cards.map(|c| u8::from(c.rank()) as u32);

    let flush = cards.iter().all(|c| c.suit() == cards[0].suit());
    let straight = is_straight(&cards);

    if flush && straight {
        if cards[0].rank() == Rank::Ace && cards[1].rank() == Rank::King {
            return score(HandCategory::RoyalFlush, 0);
        }
        return score(HandCategory::StraightFlush, straight_high(&cards));
    }

    // Rank multiplicities for the paired categories.
    let mut counts = [0u8; 13];
    for card in &cards {
        counts[u8::from(card.rank()) as usize] += 1;
    }
    let mut four = None;
    let mut three = None;
    let mut pairs = Vec::new();
    for r in (0..13u32).rev() {
        match counts[r as usize] {
            4 => four = Some(r),
            3 => three = Some(r),
            2 => pairs.push(r),
            _ => {}
        }
    }

    if let Some(four) = four {
        let kicker = ranks.iter().copied().find(|r| *r != four).unwrap_or(0);
        return score(HandCategory::Quads, (four << 4) | kicker);
    }
    if let (Some(three), Some(pair)) = (three, pairs.first().copied()) {
        return score(HandCategory::FullHouse, (three << 4) | pair);
    }
    if flush {
        return score(HandCategory::Flush, pack(&ranks, |_| true));
    }
    if straight {
        return score(HandCategory::Straight, straight_high(&cards));
    }
    if let Some(three) = three {
        let kickers = pack(&ranks, |r| r != three);
        return score(HandCategory::Trips, (three << 8) | kickers);
    }
    if pairs.len() == 2 {
        let (hi, lo) = (pairs[0], pairs[1]);
        let kicker = ranks
            .iter()
            .copied()
            .find(|r| *r != hi && *r != lo)
            .unwrap_or(0);
        return score(HandCategory::TwoPair, (hi << 8) | (lo << 4) | kicker);
    }
    if let Some(pair) = pairs.first().copied() {
        let kickers = pack(&ranks, |r| r != pair);
        return score(HandCategory::Pair, (pair << 12) | kickers);
    }
    score(HandCategory::HighCard, pack(&ranks, |_| true))
}

/// Nibble-packs the descending ranks that pass the filter.
fn pack(ranks: &[u32; 5], keep: impl Fn(u32) -> bool) -> u32 {
    ranks
        .iter()
        .copied()
        .filter(|r| keep(*r))
        .fold(0, |acc, r| (acc << 4) | r)
}

fn score(category: HandCategory, kickers: u32) -> u32 {
    ((category as u32) << 24) | kickers
}

/// Cards sorted descending by rank.
fn is_straight(cards: &[Card; 5]) -> bool {
    // Wheel: A-5-4-3-2 sorts as A,5,4,3,2.
    if cards[0].rank() == Rank::Ace && cards[1].rank() == Rank::Five {
        return (1..4).all(|i| u8::from(cards[i].rank()) == u8::from(cards[i + 1].rank()) + 1)
            && cards[4].rank() == Rank::Two;
    }
    (0..4).all(|i| u8::from(cards[i].rank()) == u8::from(cards[i + 1].rank()) + 1)
}

/// High card of a straight, where the wheel counts as five-high.
fn straight_high(cards: &[Card; 5]) -> u32 {
    if cards[0].rank() == Rank::Ace && cards[1].rank() == Rank::Five {
        u8::from(Rank::Five) as u32
    } else {
        u8::from(cards[0].rank()) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(s: &str) -> u32 {
        evaluate(&Card::parse(s).unwrap())
    }

    #[test]
    fn too_few_cards_score_zero() {
        assert_eq!(eval("As Kd"), 0);
    }

    #[test]
    fn categories_are_totally_ordered() {
        let hands = [
            "As Kd 9h 7c 2s", // high card
            "As Ad 9h 7c 2s", // pair
            "As Ad 9h 9c 2s", // two pair
            "As Ad Ah 9c 2s", // trips
            "6s 5d 4h 3c 2s", // straight
            "As Ks 9s 7s 2s", // flush
            "As Ad Ah 9c 9s", // full house
            "As Ad Ah Ac 2s", // quads
            "6s 5s 4s 3s 2s", // straight flush
            "As Ks Qs Js Ts", // royal flush
        ];
        for pair in hands.windows(2) {
            assert!(
                eval(pair[0]) < eval(pair[1]),
                "{} should lose to {}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn wheel_is_five_high() {
        let wheel = eval("As 2d 3h 4c 5s");
        let six_high = eval("2d 3h 4c 5s 6s");
        assert_eq!(HandCategory::of(wheel), HandCategory::Straight);
        assert!(wheel < six_high);
    }

    #[test]
    fn kickers_break_pair_ties() {
        let king_kicker = eval("As Ad Kh 7c 2s");
        let queen_kicker = eval("As Ad Qh 7c 2s");
        assert!(king_kicker > queen_kicker);
    }

    #[test]
    fn identical_hands_tie() {
        assert_eq!(eval("As Ad Kh 7c 2s"), eval("Ah Ac Kd 7s 2c"));
    }

    #[test]
    fn best_five_of_seven() {
        // Board gives a straight to the five; hole cards are irrelevant.
        let seven = eval("As Ad 2c 3c 4c 5c 9d");
        assert_eq!(HandCategory::of(seven), HandCategory::Straight);
        // Pair of aces plus board straight: straight wins.
        assert!(seven > eval("As Ad 2c 3c 9h 5c 9d"));
    }

    #[test]
    fn two_pair_orders_by_top_pair() {
        let aces_up = eval("As Ad 3h 3c 2s");
        let kings_up = eval("Ks Kd Qh Qc As");
        assert!(aces_up > kings_up);
    }

    #[test]
    fn full_house_orders_by_trips() {
        let nines_full = eval("9s 9d 9h Ac As");
        let aces_full = eval("As Ad Ah 2c 2s");
        assert!(aces_full > nines_full);
    }
}
