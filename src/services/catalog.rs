//! Catalog service: books and their physical copies

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    isbn,
    models::{
        book::{Book, BookQuery, BookSummary, CreateBook, UpdateBook},
        copy::{CopyDetails, CreateCopy, UpdateCopy},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

/// Normalise an optional ISBN to ISBN-13, rejecting malformed values
fn checked_isbn(raw: Option<&str>) -> AppResult<Option<String>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(value) => isbn::to_isbn13(value)
            .map(Some)
            .ok_or_else(|| AppError::Validation(format!("Invalid ISBN: {}", value))),
    }
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Search books
    pub async fn search_books(&self, query: &BookQuery) -> AppResult<(Vec<BookSummary>, i64)> {
        self.repository.books.search(query).await
    }

    /// Get a book with its aggregates
    pub async fn get_book(&self, id: i32) -> AppResult<BookSummary> {
        self.repository.books.get_summary(id).await
    }

    /// Create a new book
    pub async fn create_book(&self, book: CreateBook) -> AppResult<Book> {
        book.validate()?;
        let isbn = checked_isbn(book.isbn.as_deref())?;
        let created = self.repository.books.create(&book, isbn).await?;
        tracing::info!(book_id = created.id, title = %created.title, "Book created");
        Ok(created)
    }

    /// Update an existing book
    pub async fn update_book(&self, id: i32, book: UpdateBook) -> AppResult<Book> {
        book.validate()?;
        let isbn = checked_isbn(book.isbn.as_deref())?;
        self.repository.books.update(id, &book, isbn).await
    }

    /// Delete a book and its copies
    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.repository.books.delete(id).await?;
        tracing::info!(book_id = id, "Book deleted");
        Ok(())
    }

    /// List copies of a book
    pub async fn list_copies(&self, book_id: i32) -> AppResult<Vec<CopyDetails>> {
        self.repository.books.get_by_id(book_id).await?;
        let copies = self.repository.copies.list_for_book(book_id).await?;
        Ok(copies.into_iter().map(CopyDetails::from).collect())
    }

    pub async fn get_copy(&self, id: i32) -> AppResult<CopyDetails> {
        Ok(self.repository.copies.get_by_id(id).await?.into())
    }

    /// Add a copy; the barcode is generated from the book's ISBN
    pub async fn create_copy(&self, copy: CreateCopy) -> AppResult<CopyDetails> {
        copy.validate()?;
        if let Some(library_id) = copy.library_id {
            self.repository.libraries.get_by_id(library_id).await?;
        }
        let created = self.repository.copies.create(&copy).await?;
        tracing::info!(copy_id = created.id, barcode = %created.barcode, "Copy created");
        Ok(created.into())
    }

    pub async fn update_copy(&self, id: i32, copy: UpdateCopy) -> AppResult<CopyDetails> {
        copy.validate()?;
        if let Some(library_id) = copy.library_id {
            self.repository.libraries.get_by_id(library_id).await?;
        }
        Ok(self.repository.copies.update(id, &copy).await?.into())
    }

    pub async fn delete_copy(&self, id: i32) -> AppResult<()> {
        self.repository.copies.delete(id).await
    }

    /// Staff hands a reserved copy to its borrower
    pub async fn claim_copy(&self, id: i32) -> AppResult<CopyDetails> {
        let copy = self.repository.copies.claim(id).await?;
        tracing::info!(copy_id = id, "Copy claimed");
        Ok(copy.into())
    }

    /// Borrower brings a claimed copy back
    pub async fn return_copy(&self, id: i32) -> AppResult<CopyDetails> {
        let copy = self.repository.copies.return_copy(id).await?;
        tracing::info!(copy_id = id, "Copy returned");
        Ok(copy.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_isbn() {
        assert_eq!(checked_isbn(None).unwrap(), None);
        assert_eq!(checked_isbn(Some("  ")).unwrap(), None);
        assert_eq!(
            checked_isbn(Some("2-07-040850-7")).unwrap().as_deref(),
            Some("9782070408504")
        );
        assert!(matches!(
            checked_isbn(Some("12345")),
            Err(AppError::Validation(_))
        ));
    }
}
