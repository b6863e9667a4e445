//! Reviews service

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        review::{CreateReview, Review, UpdateReview},
        user::UserClaims,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct ReviewsService {
    repository: Repository,
}

impl ReviewsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list_for_book(&self, book_id: i32) -> AppResult<Vec<Review>> {
        self.repository.books.get_by_id(book_id).await?;
        self.repository.reviews.list_for_book(book_id).await
    }

    /// One review per user and book
    pub async fn create(&self, claims: &UserClaims, data: CreateReview) -> AppResult<Review> {
        data.validate()?;
        self.repository.books.get_by_id(data.book_id).await?;

        if self.repository.reviews.exists_for(claims.user_id, data.book_id).await? {
            return Err(AppError::Conflict("You already reviewed this book".to_string()));
        }

        self.repository.reviews.create(claims.user_id, &data).await
    }

    pub async fn update(&self, claims: &UserClaims, id: i32, data: UpdateReview) -> AppResult<Review> {
        data.validate()?;
        let review = self.repository.reviews.get_by_id(id).await?;
        claims.require_owner_or_admin(review.user_id)?;
        self.repository.reviews.update(id, &data).await
    }

    pub async fn delete(&self, claims: &UserClaims, id: i32) -> AppResult<()> {
        let review = self.repository.reviews.get_by_id(id).await?;
        claims.require_owner_or_admin(review.user_id)?;
        self.repository.reviews.delete(id).await
    }
}
