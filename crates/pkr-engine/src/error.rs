use thiserror::Error;

/// Errors surfaced by table command processing.
///
/// Validation failures return to the caller and are never logged above
/// debug; resource conflicts log at warn. [`TableError::code`] is the wire
/// error code carried in ERROR frames.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("not your turn")]
    NotYourTurn,
    #[error("cannot check: there is an outstanding bet")]
    CannotCheck,
    #[error("bet amount is below minimum")]
    BetTooLow,
    #[error("insufficient chips")]
    InsufficientChips,
    #[error("already all-in or no chips")]
    AlreadyAllIn,
    #[error("seat is already occupied")]
    SeatOccupied,
    #[error("seat index out of range")]
    SeatOutOfRange,
    #[error("player already at table")]
    DuplicatePlayer,
    #[error("player not found at table")]
    PlayerNotFound,
    #[error("cannot leave while all-in")]
    CannotLeaveAllIn,
    #[error("cannot stand up while all-in")]
    CannotStandUpAllIn,
    #[error("invalid player status transition")]
    InvalidStatusTransition,
    #[error("table command queue is full")]
    QueueFull,
    #[error("table did not reply in time")]
    CommandTimeout,
    #[error("table is closed")]
    TableClosed,
}

impl TableError {
    /// Stable snake_case code for the wire ERROR payload.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotYourTurn => "not_your_turn",
            Self::CannotCheck => "cannot_check",
            Self::BetTooLow => "bet_too_low",
            Self::InsufficientChips => "insufficient_chips",
            Self::AlreadyAllIn => "already_all_in",
            Self::SeatOccupied => "seat_occupied",
            Self::SeatOutOfRange => "seat_out_of_range",
            Self::DuplicatePlayer => "duplicate_player",
            Self::PlayerNotFound => "player_not_found",
            Self::CannotLeaveAllIn => "cannot_leave_all_in",
            Self::CannotStandUpAllIn => "cannot_stand_up_all_in",
            Self::InvalidStatusTransition => "invalid_status_transition",
            Self::QueueFull => "queue_full",
            Self::CommandTimeout => "command_timeout",
            Self::TableClosed => "table_closed",
        }
    }
}
