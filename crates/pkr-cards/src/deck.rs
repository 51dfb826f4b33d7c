use super::card::Card;
use super::rank::Rank;
use super::suit::Suit;

/// An ordered deck of cards supporting secure shuffles and front draws.
///
/// A fresh deck holds all 52 cards in suit-major order. [`Deck::shuffle`]
/// runs Fisher-Yates over the thread-local CSPRNG; every hand deals from a
/// freshly created and shuffled deck so deck state never leaks between
/// hands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck(Vec<Card>);

impl Default for Deck {
    fn default() -> Self {
        Self::new()
    }
}

impl Deck {
    /// Creates a fresh 52-card deck.
    pub fn new() -> Self {
        Self(
            (0..Suit::COUNT)
                .flat_map(|s| (0..Rank::COUNT).map(move |r| Card::from((Rank::from(r), Suit::from(s)))))
                .collect(),
        )
    }
    /// Creates an already-shuffled deck.
    pub fn shuffled() -> Self {
        let mut deck = Self::new();
        deck.shuffle();
        deck
    }
    /// Fisher-Yates shuffle over a cryptographically secure random source.
    pub fn shuffle(&mut self) {
        use rand::seq::SliceRandom;
        self.0.shuffle(&mut rand::rng());
    }
    /// Draws and removes the first n cards.
    ///
    /// Returns an empty vector when fewer than n cards remain; callers deal
    /// from fresh decks so this only trips on misuse.
    pub fn draw(&mut self, n: usize) -> Vec<Card> {
        if n > self.0.len() {
            return Vec::new();
        }
        self.0.drain(..n).collect()
    }
    /// Number of cards remaining.
    pub fn size(&self) -> usize {
        self.0.len()
    }
    /// Tests whether a card is still in the deck.
    pub fn contains(&self, card: &Card) -> bool {
        self.0.contains(card)
    }
}

/// A deck with a known card order, for dealing out scripted hands.
impl From<Vec<Card>> for Deck {
    fn from(cards: Vec<Card>) -> Self {
        Self(cards)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn fresh_deck_is_complete() {
        let deck = Deck::new();
        assert_eq!(deck.size(), 52);
    }

    #[test]
    fn shuffle_draw_is_a_permutation() {
        let mut deck = Deck::shuffled();
        let drawn = deck.draw(52);
        assert_eq!(deck.size(), 0);
        let unique = drawn.iter().collect::<HashSet<_>>();
        assert_eq!(unique.len(), 52);
        for card in Deck::new().draw(52) {
            assert!(unique.contains(&card));
        }
    }

    #[test]
    fn draw_removes_from_front() {
        let mut deck = Deck::from(Card::parse("As Kd 2c").unwrap());
        assert_eq!(deck.draw(2), Card::parse("As Kd").unwrap());
        assert_eq!(deck.size(), 1);
    }

    #[test]
    fn overdraw_returns_nothing() {
        let mut deck = Deck::from(Card::parse("As").unwrap());
        assert!(deck.draw(2).is_empty());
        assert_eq!(deck.size(), 1);
    }
}
