//! Repository layer for database operations

pub mod books;
pub mod copies;
pub mod libraries;
pub mod reservations;
pub mod reviews;
pub mod users;

use sqlx::{Pool, Postgres};

pub const DEFAULT_PER_PAGE: i64 = 20;
pub const MAX_PER_PAGE: i64 = 100;

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub books: books::BooksRepository,
    pub copies: copies::CopiesRepository,
    pub reservations: reservations::ReservationsRepository,
    pub reviews: reviews::ReviewsRepository,
    pub users: users::UsersRepository,
    pub libraries: libraries::LibrariesRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: books::BooksRepository::new(pool.clone()),
            copies: copies::CopiesRepository::new(pool.clone()),
            reservations: reservations::ReservationsRepository::new(pool.clone()),
            reviews: reviews::ReviewsRepository::new(pool.clone()),
            users: users::UsersRepository::new(pool.clone()),
            libraries: libraries::LibrariesRepository::new(pool.clone()),
            pool,
        }
    }
}

/// Resolve `(page, per_page, offset)` from optional query parameters.
/// Pages are 1-based; `per_page` is clamped to `1..=MAX_PER_PAGE`.
/// The offset saturates, so an absurd page yields an empty result.
pub fn pagination(page: Option<i64>, per_page: Option<i64>) -> (i64, i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
    (page, per_page, (page - 1).saturating_mul(per_page))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults() {
        assert_eq!(pagination(None, None), (1, 20, 0));
    }

    #[test]
    fn test_pagination_clamps() {
        assert_eq!(pagination(Some(0), Some(1000)), (1, 100, 0));
        assert_eq!(pagination(Some(3), Some(10)), (3, 10, 20));
        assert_eq!(pagination(Some(-2), Some(0)), (1, 1, 0));
    }

    #[test]
    fn test_pagination_huge_page_saturates() {
        let (page, per_page, offset) = pagination(Some(i64::MAX), None);
        assert_eq!(page, i64::MAX);
        assert_eq!(per_page, DEFAULT_PER_PAGE);
        assert_eq!(offset, i64::MAX);

        let (_, _, offset) = pagination(Some(i64::MAX), Some(MAX_PER_PAGE));
        assert_eq!(offset, i64::MAX);
    }
}
