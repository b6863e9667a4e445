//! Libraries service

use validator::Validate;

use crate::{
    error::AppResult,
    models::library::{CreateLibrary, Library, UpdateLibrary},
    repository::Repository,
};

#[derive(Clone)]
pub struct LibrariesService {
    repository: Repository,
}

impl LibrariesService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self) -> AppResult<Vec<Library>> {
        self.repository.libraries.list().await
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Library> {
        self.repository.libraries.get_by_id(id).await
    }

    pub async fn create(&self, data: CreateLibrary) -> AppResult<Library> {
        data.validate()?;
        self.repository.libraries.create(&data).await
    }

    pub async fn update(&self, id: i32, data: UpdateLibrary) -> AppResult<Library> {
        data.validate()?;
        self.repository.libraries.update(id, &data).await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.libraries.delete(id).await
    }
}
