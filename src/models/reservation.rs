//! Reservation model and expiry rules

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::copy::CopyState;

/// Reservation row from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Reservation {
    pub id: i32,
    pub user_id: i32,
    pub copy_id: i32,
    pub reservation_date: DateTime<Utc>,
    /// Date after which an unclaimed reservation is released
    pub final_date: DateTime<Utc>,
}

/// Reservation joined with its copy and book for display
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ReservationDetails {
    pub id: i32,
    pub user_id: i32,
    pub copy_id: i32,
    pub reservation_date: DateTime<Utc>,
    pub final_date: DateTime<Utc>,
    pub barcode: String,
    pub book_id: i32,
    pub book_title: String,
    pub is_claimed: bool,
}

/// Create reservation request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateReservation {
    pub copy_id: i32,
}

/// Query parameters for reservation listings
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ReservationQuery {
    /// Only reservations of this user (admin listing)
    pub user_id: Option<i32>,
    /// Only reservations already past their final date
    pub overdue: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Row examined by the expiry sweep
#[derive(Debug, Clone, FromRow)]
pub struct ExpiryCandidate {
    pub reservation_id: i32,
    pub copy_id: i32,
    pub reservation_date: DateTime<Utc>,
    pub is_reserved: bool,
    pub is_claimed: bool,
}

impl ExpiryCandidate {
    pub fn copy_state(&self) -> CopyState {
        CopyState::from_flags(self.is_reserved, self.is_claimed)
    }
}

/// Outcome of one sweep iteration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct SweepReport {
    /// Deleted reservation ids
    pub expired: Vec<i32>,
    /// Copies made available again
    pub released_copies: Vec<i32>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.expired.is_empty()
    }
}

/// Cutoff instant: reservations made strictly before it are past the grace window
pub fn expiry_cutoff(now: DateTime<Utc>, grace: Duration) -> DateTime<Utc> {
    now - grace
}

/// A reservation is abandoned when it is older than the grace window and its
/// copy was never claimed.
pub fn is_expired(
    reservation_date: DateTime<Utc>,
    copy_state: CopyState,
    now: DateTime<Utc>,
    grace: Duration,
) -> bool {
    copy_state != CopyState::Claimed && reservation_date < expiry_cutoff(now, grace)
}

/// Partition candidates into the reservation ids to delete and the copy ids to release
pub fn select_expired(
    candidates: &[ExpiryCandidate],
    now: DateTime<Utc>,
    grace: Duration,
) -> SweepReport {
    let mut report = SweepReport::default();
    for candidate in candidates
        .iter()
        .filter(|c| is_expired(c.reservation_date, c.copy_state(), now, grace))
    {
        report.expired.push(candidate.reservation_id);
        report.released_copies.push(candidate.copy_id);
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: i32, age_hours: i64, claimed: bool, now: DateTime<Utc>) -> ExpiryCandidate {
        ExpiryCandidate {
            reservation_id: id,
            copy_id: id * 10,
            reservation_date: now - Duration::hours(age_hours),
            is_reserved: true,
            is_claimed: claimed,
        }
    }

    #[test]
    fn test_old_unclaimed_reservation_expires() {
        let now = Utc::now();
        let grace = Duration::hours(48);
        assert!(is_expired(now - Duration::hours(49), CopyState::Reserved, now, grace));
    }

    #[test]
    fn test_young_reservation_kept() {
        let now = Utc::now();
        let grace = Duration::hours(48);
        assert!(!is_expired(now - Duration::hours(47), CopyState::Reserved, now, grace));
        // exactly at the boundary is not older than the window
        assert!(!is_expired(now - grace, CopyState::Reserved, now, grace));
    }

    #[test]
    fn test_claimed_reservation_kept() {
        let now = Utc::now();
        let grace = Duration::hours(48);
        assert!(!is_expired(now - Duration::days(30), CopyState::Claimed, now, grace));
    }

    #[test]
    fn test_select_expired() {
        let now = Utc::now();
        let candidates = vec![
            candidate(1, 72, false, now),
            candidate(2, 12, false, now),
            candidate(3, 100, true, now),
            candidate(4, 49, false, now),
        ];

        let report = select_expired(&candidates, now, Duration::hours(48));
        assert_eq!(report.expired, vec![1, 4]);
        assert_eq!(report.released_copies, vec![10, 40]);
        assert!(!report.is_empty());
    }

    #[test]
    fn test_select_expired_empty() {
        let report = select_expired(&[], Utc::now(), Duration::hours(48));
        assert!(report.is_empty());
        assert_eq!(report, SweepReport::default());
    }
}
