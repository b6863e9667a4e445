//! Data models for Bibliotheca

pub mod book;
pub mod copy;
pub mod library;
pub mod reservation;
pub mod review;
pub mod user;

// Re-export commonly used types
pub use book::{Book, BookSummary};
pub use copy::{BookCopy, CopyDetails, CopyEvent, CopyState};
pub use library::Library;
pub use reservation::{Reservation, ReservationDetails, SweepReport};
pub use review::Review;
pub use user::{Role, User, UserClaims};
