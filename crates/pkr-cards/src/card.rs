use super::rank::Rank;
use super::suit::Suit;

/// A playing card encoded as a single byte.
///
/// The layout is `(suit << 4) | rank`: the low nibble holds the rank
/// (`2 = 0` .. `A = 12`), the high nibble the suit. The same layout widened
/// to 32 bits is what gets persisted and shipped over the wire, so the
/// numeric representation is part of the external contract.
///
/// # Parsing
///
/// Cards parse from two-character strings like `"As"` (ace of spades) or
/// `"Tc"` (ten of clubs). Use [`Card::parse`] for a concatenated run of
/// cards.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Card(u8);

impl Card {
    /// Extracts the rank component (2 through Ace).
    pub fn rank(&self) -> Rank {
        Rank::from(self.0 & 0xF)
    }
    /// Extracts the suit component (clubs, diamonds, hearts, spades).
    pub fn suit(&self) -> Suit {
        Suit::from(self.0 >> 4)
    }
}

/// (Rank, Suit) isomorphism
impl From<(Rank, Suit)> for Card {
    fn from((r, s): (Rank, Suit)) -> Self {
        Self((u8::from(s) << 4) | u8::from(r))
    }
}

/// u8 isomorphism
/// the raw (suit << 4) | rank byte
impl From<Card> for u8 {
    fn from(c: Card) -> u8 {
        c.0
    }
}
impl From<u8> for Card {
    fn from(n: u8) -> Self {
        Self(n)
    }
}

/// u32 widening
/// same layout zero-extended, the storage representation
impl From<Card> for u32 {
    fn from(c: Card) -> u32 {
        c.0 as u32
    }
}
impl From<u32> for Card {
    fn from(n: u32) -> Self {
        Self(n as u8)
    }
}

impl std::fmt::Display for Card {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}{}", self.rank(), self.suit())
    }
}

impl serde::Serialize for Card {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// str isomorphism
impl TryFrom<&str> for Card {
    type Error = String;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.trim().len() {
            2 => {
                let rank = Rank::try_from(&s.trim()[0..1])?;
                let suit = Suit::try_from(&s.trim()[1..2])?;
                Ok(Card::from((rank, suit)))
            }
            _ => Err("2 characters".into()),
        }
    }
}

impl Card {
    /// Parses a string of concatenated card notations into a vector of cards.
    ///
    /// Whitespace is ignored. Each card is two characters: rank then suit.
    /// Returns an error if any card fails to parse.
    pub fn parse(s: &str) -> Result<Vec<Self>, String> {
        s.replace(char::is_whitespace, "")
            .chars()
            .collect::<Vec<_>>()
            .chunks(2)
            .map(|pair| pair.iter().collect::<String>())
            .map(|pair| Self::try_from(pair.as_str()))
            .collect::<Result<Vec<Self>, _>>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bijective_rank_suit() {
        let card = Card::try_from("Qh").unwrap();
        assert_eq!(card, Card::from((card.rank(), card.suit())));
    }

    #[test]
    fn bijective_u8() {
        let card = Card::from((Rank::Ten, Suit::Spade));
        assert_eq!(card, Card::from(u8::from(card)));
    }

    #[test]
    fn encoding_layout() {
        let card = Card::from((Rank::Ace, Suit::Spade));
        assert_eq!(u8::from(card), (3 << 4) | 12);
    }

    #[test]
    fn display_roundtrip() {
        for s in ["As", "Tc", "2d", "Kh"] {
            assert_eq!(Card::try_from(s).unwrap().to_string(), s);
        }
    }

    #[test]
    fn parse_many() {
        let cards = Card::parse("As Kd 2c").unwrap();
        assert_eq!(cards.len(), 3);
        assert_eq!(cards[1].to_string(), "Kd");
        assert!(Card::parse("Xx").is_err());
    }
}
