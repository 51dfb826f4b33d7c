/// Card suit. Suits carry no strength; the ordering is only the encoding
/// order (clubs low, spades high).
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Suit {
    Club = 0,
    Diamond = 1,
    Heart = 2,
    Spade = 3,
}

impl Suit {
    pub const COUNT: u8 = 4;
}

/// u8 isomorphism
impl From<u8> for Suit {
    fn from(n: u8) -> Self {
        match n {
            0 => Self::Club,
            1 => Self::Diamond,
            2 => Self::Heart,
            3 => Self::Spade,
            _ => panic!("suit out of range: {}", n),
        }
    }
}
impl From<Suit> for u8 {
    fn from(s: Suit) -> u8 {
        s as u8
    }
}

impl std::fmt::Display for Suit {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Club => 'c',
                Self::Diamond => 'd',
                Self::Heart => 'h',
                Self::Spade => 's',
            }
        )
    }
}

/// str isomorphism
impl TryFrom<&str> for Suit {
    type Error = String;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "c" | "C" => Ok(Self::Club),
            "d" | "D" => Ok(Self::Diamond),
            "h" | "H" => Ok(Self::Heart),
            "s" | "S" => Ok(Self::Spade),
            _ => Err(format!("invalid suit: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bijective_u8() {
        for n in 0..Suit::COUNT {
            assert_eq!(n, u8::from(Suit::from(n)));
        }
    }
}
