use crate::auth::{enforce, visibility_for, Actor, Requirement};
use crate::database::models::{CategoryRecord, PostRecord};
use crate::database::repositories::{CategoryRepository, PostRepository};
use crate::database::Database;
use crate::error::{PostboardError, PostboardResult};
use crate::posts::required_field;
use serde::Deserialize;

/// Categories are owned by no one: anyone reads them, only ADMIN edits.
#[derive(Clone)]
pub struct CategoryService {
    database: Database,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCategoryInput {
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCategoryInput {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl CategoryService {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub fn list(&self) -> PostboardResult<Vec<CategoryRecord>> {
        Ok(self
            .database
            .with_repositories(|repos| repos.categories().list())?)
    }

    pub fn get(&self, category_id: i64) -> PostboardResult<CategoryRecord> {
        self.database
            .with_repositories(|repos| repos.categories().get(category_id))?
            .ok_or_else(|| PostboardError::not_found(format!("category {category_id}")))
    }

    /// Posts filed under the category that `actor` may read.
    pub fn posts_in_category(
        &self,
        actor: &Actor,
        category_id: i64,
    ) -> PostboardResult<Vec<PostRecord>> {
        self.get(category_id)?;
        let visibility = visibility_for(actor);
        Ok(self
            .database
            .with_repositories(|repos| repos.posts().list_in_category(category_id, visibility))?)
    }

    pub fn create(
        &self,
        actor: &Actor,
        input: CreateCategoryInput,
    ) -> PostboardResult<CategoryRecord> {
        enforce(actor, &Requirement::admin())?;
        let title = required_field("title", &input.title)?;
        let id = self.database.with_repositories(|repos| {
            repos
                .categories()
                .create(&title, input.description.as_deref())
        })?;
        tracing::info!(category_id = id, actor_id = actor.id, "category created");
        self.get(id)
    }

    pub fn update(
        &self,
        actor: &Actor,
        category_id: i64,
        input: UpdateCategoryInput,
    ) -> PostboardResult<CategoryRecord> {
        let mut category = self.get(category_id)?;
        enforce(actor, &Requirement::admin())?;

        if let Some(title) = input.title.as_deref() {
            category.title = required_field("title", title)?;
        }
        if let Some(description) = input.description {
            category.description = Some(description);
        }
        self.database
            .with_repositories(|repos| repos.categories().update(&category))?;
        tracing::info!(category_id, actor_id = actor.id, "category updated");
        Ok(category)
    }

    pub fn delete(&self, actor: &Actor, category_id: i64) -> PostboardResult<()> {
        self.get(category_id)?;
        enforce(actor, &Requirement::admin())?;
        self.database
            .with_repositories(|repos| repos.categories().delete(category_id))?;
        tracing::info!(category_id, actor_id = actor.id, "category deleted");
        Ok(())
    }
}
