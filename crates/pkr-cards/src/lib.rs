//! Cards, decks, and hand evaluation.
//!
//! The 52-card universe, cryptographically shuffled decks, and the 5-of-7
//! best-hand scorer used at showdown.
//!
//! ## Types
//!
//! - [`Rank`] / [`Suit`] — card components
//! - [`Card`] — single-byte card encoding with string notation
//! - [`Deck`] — ordered 52-card deck with secure shuffle and front draws
//!
//! ## Evaluation
//!
//! - [`evaluate`] — maps 5 to 7 cards onto a totally ordered 32-bit score
//! - [`HandCategory`] — the nine-plus-one standard hand classes
mod card;
mod deck;
mod evaluator;
mod rank;
mod suit;

pub use card::*;
pub use deck::*;
pub use evaluator::*;
pub use rank::*;
pub use suit::*;
