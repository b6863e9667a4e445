//! Copy (physical unit of a book) model and its reservation state machine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::AppError;

/// Lifecycle of a copy with respect to reservations.
///
/// Persisted as the `is_reserved` / `is_claimed` column pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CopyState {
    /// On the shelf, can be reserved
    Available,
    /// Held for a user, waiting to be picked up
    Reserved,
    /// Handed over to the user by staff
    Claimed,
}

/// Events driving [`CopyState`] transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyEvent {
    Reserve,
    Claim,
    Return,
    Cancel,
    Expire,
}

impl CopyEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            CopyEvent::Reserve => "reserve",
            CopyEvent::Claim => "claim",
            CopyEvent::Return => "return",
            CopyEvent::Cancel => "cancel",
            CopyEvent::Expire => "expire",
        }
    }
}

impl CopyState {
    /// Map the persisted flags to a state. A claimed copy is always `Claimed`.
    pub fn from_flags(is_reserved: bool, is_claimed: bool) -> Self {
        match (is_reserved, is_claimed) {
            (_, true) => CopyState::Claimed,
            (true, false) => CopyState::Reserved,
            (false, false) => CopyState::Available,
        }
    }

    /// `(is_reserved, is_claimed)` for this state
    pub fn flags(&self) -> (bool, bool) {
        match self {
            CopyState::Available => (false, false),
            CopyState::Reserved => (true, false),
            CopyState::Claimed => (true, true),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CopyState::Available => "available",
            CopyState::Reserved => "reserved",
            CopyState::Claimed => "claimed",
        }
    }

    /// Apply an event, rejecting transitions the lifecycle does not allow
    pub fn transition(self, event: CopyEvent) -> Result<CopyState, AppError> {
        use CopyEvent::*;
        use CopyState::*;

        match (self, event) {
            (Available, Reserve) => Ok(Reserved),
            (Reserved, Claim) => Ok(Claimed),
            (Claimed, Return) => Ok(Available),
            (Reserved, Cancel) | (Reserved, Expire) => Ok(Available),
            (Reserved, Reserve) | (Claimed, Reserve) => Err(AppError::CopyNotAvailable(
                "Copy is already reserved".to_string(),
            )),
            (state, event) => Err(AppError::Conflict(format!(
                "Cannot {} a copy that is {}",
                event.as_str(),
                state.as_str()
            ))),
        }
    }
}

impl std::fmt::Display for CopyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Copy row from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookCopy {
    pub id: i32,
    pub book_id: i32,
    pub library_id: Option<i32>,
    pub barcode: String,
    /// Free-text condition ("good", "worn cover", ...)
    pub condition: String,
    pub is_reserved: bool,
    pub is_claimed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BookCopy {
    pub fn state(&self) -> CopyState {
        CopyState::from_flags(self.is_reserved, self.is_claimed)
    }
}

/// Copy as returned by the API, with its derived state
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CopyDetails {
    #[serde(flatten)]
    pub copy: BookCopy,
    pub state: CopyState,
}

impl From<BookCopy> for CopyDetails {
    fn from(copy: BookCopy) -> Self {
        let state = copy.state();
        Self { copy, state }
    }
}

/// Create copy request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCopy {
    pub book_id: i32,
    pub library_id: Option<i32>,
    #[validate(length(min = 1, max = 255, message = "Condition must be 1-255 characters"))]
    pub condition: Option<String>,
}

/// Update copy request (condition and location only; state changes go
/// through reserve/claim/return)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateCopy {
    pub library_id: Option<i32>,
    #[validate(length(min = 1, max = 255, message = "Condition must be 1-255 characters"))]
    pub condition: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_round_trip() {
        for state in [CopyState::Available, CopyState::Reserved, CopyState::Claimed] {
            let (reserved, claimed) = state.flags();
            assert_eq!(CopyState::from_flags(reserved, claimed), state);
        }
    }

    #[test]
    fn test_claimed_flag_wins() {
        assert_eq!(CopyState::from_flags(false, true), CopyState::Claimed);
    }

    #[test]
    fn test_full_lifecycle() {
        let state = CopyState::Available;
        let state = state.transition(CopyEvent::Reserve).unwrap();
        assert_eq!(state, CopyState::Reserved);
        let state = state.transition(CopyEvent::Claim).unwrap();
        assert_eq!(state, CopyState::Claimed);
        let state = state.transition(CopyEvent::Return).unwrap();
        assert_eq!(state, CopyState::Available);
    }

    #[test]
    fn test_reserve_twice_rejected() {
        let err = CopyState::Reserved.transition(CopyEvent::Reserve).unwrap_err();
        assert!(matches!(err, AppError::CopyNotAvailable(_)));

        let err = CopyState::Claimed.transition(CopyEvent::Reserve).unwrap_err();
        assert!(matches!(err, AppError::CopyNotAvailable(_)));
    }

    #[test]
    fn test_expire_and_cancel_only_from_reserved() {
        assert_eq!(
            CopyState::Reserved.transition(CopyEvent::Expire).unwrap(),
            CopyState::Available
        );
        assert_eq!(
            CopyState::Reserved.transition(CopyEvent::Cancel).unwrap(),
            CopyState::Available
        );
        assert!(CopyState::Claimed.transition(CopyEvent::Expire).is_err());
        assert!(CopyState::Claimed.transition(CopyEvent::Cancel).is_err());
        assert!(CopyState::Available.transition(CopyEvent::Expire).is_err());
    }

    #[test]
    fn test_claim_requires_reservation() {
        let err = CopyState::Available.transition(CopyEvent::Claim).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert!(CopyState::Available.transition(CopyEvent::Return).is_err());
    }
}
