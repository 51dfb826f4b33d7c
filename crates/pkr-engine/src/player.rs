use super::error::TableError;
use pkr_cards::Card;
use pkr_core::Chips;

/// Where a player is in the hand lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerStatus {
    SittingOut,
    Playing,
    Folded,
    AllIn,
}

/// A player seated at (or tombstoned from) a table.
///
/// `seat_index` is -1 for a player removed mid-hand but kept in the player
/// map so their committed bets still reach the pot at street end.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: String,
    pub seat_index: i32,
    pub chips: Chips,
    pub current_bet: Chips,
    pub status: PlayerStatus,
    pub hole_cards: Vec<Card>,
    pub has_acted: bool,
}

impl Player {
    pub fn new(id: impl Into<String>, chips: Chips) -> Self {
        Self {
            id: id.into(),
            seat_index: -1,
            chips,
            current_bet: 0,
            status: PlayerStatus::SittingOut,
            hole_cards: Vec::new(),
            has_acted: false,
        }
    }
    /// Still contesting the hand (not folded, not sitting out).
    pub fn is_active(&self) -> bool {
        !matches!(self.status, PlayerStatus::Folded | PlayerStatus::SittingOut)
    }
    /// Able to take an action this street.
    pub fn can_act(&self) -> bool {
        self.is_active() && self.status != PlayerStatus::AllIn
    }
    /// Dealt into the current hand. A player who sits down while a hand is
    /// running is Playing but holds no cards until the next deal.
    pub fn in_hand(&self) -> bool {
        !self.hole_cards.is_empty()
    }
    /// SittingOut → Playing.
    pub fn sit_down(&mut self) -> Result<(), TableError> {
        match self.status {
            PlayerStatus::SittingOut => {
                self.status = PlayerStatus::Playing;
                Ok(())
            }
            _ => Err(TableError::InvalidStatusTransition),
        }
    }
    /// Any non-all-in status → SittingOut.
    ///
    /// Returns whether the player was mid-hand, in which case the stand-up
    /// doubles as a fold. The current bet is deliberately left in place so
    /// pot accumulation at street end still counts it.
    pub fn stand_up(&mut self) -> Result<bool, TableError> {
        match self.status {
            PlayerStatus::SittingOut => Ok(false),
            PlayerStatus::Playing => {
                self.hole_cards.clear();
                self.has_acted = true;
                self.status = PlayerStatus::SittingOut;
                Ok(true)
            }
            PlayerStatus::Folded => {
                self.status = PlayerStatus::SittingOut;
                Ok(false)
            }
            PlayerStatus::AllIn => Err(TableError::CannotStandUpAllIn),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sit_down_requires_sitting_out() {
        let mut player = Player::new("p1", 1000);
        assert!(player.sit_down().is_ok());
        assert_eq!(player.status, PlayerStatus::Playing);
        assert_eq!(
            player.sit_down().unwrap_err(),
            TableError::InvalidStatusTransition
        );
    }

    #[test]
    fn stand_up_mid_hand_folds_but_keeps_bet() {
        let mut player = Player::new("p1", 1000);
        player.sit_down().unwrap();
        player.current_bet = 40;
        player.hole_cards = pkr_cards::Card::parse("As Kd").unwrap();
        let was_in_hand = player.stand_up().unwrap();
        assert!(was_in_hand);
        assert_eq!(player.status, PlayerStatus::SittingOut);
        assert_eq!(player.current_bet, 40);
        assert!(player.hole_cards.is_empty());
    }

    #[test]
    fn stand_up_is_idempotent_when_sitting_out() {
        let mut player = Player::new("p1", 1000);
        assert_eq!(player.stand_up().unwrap(), false);
    }

    #[test]
    fn stand_up_rejected_while_all_in() {
        let mut player = Player::new("p1", 0);
        player.status = PlayerStatus::AllIn;
        assert_eq!(
            player.stand_up().unwrap_err(),
            TableError::CannotStandUpAllIn
        );
    }

    #[test]
    fn folded_player_is_not_active() {
        let mut player = Player::new("p1", 1000);
        player.status = PlayerStatus::Folded;
        assert!(!player.is_active());
        assert!(!player.can_act());
        player.status = PlayerStatus::AllIn;
        assert!(player.is_active());
        assert!(!player.can_act());
    }
}
