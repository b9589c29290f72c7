use crate::auth::{can_read, enforce, visibility_for, Actor, Requirement};
use crate::database::models::{
    CategoryRecord, CommentRecord, NewPost, PostRecord, ReactionKind, ReactionRecord,
    ReactionTally, Status, TargetKind,
};
use crate::database::repositories::{
    CategoryRepository, CommentRepository, PostRepository, ReactionRepository, SqliteRepositories,
};
use crate::database::Database;
use crate::error::{retry_on_conflict, PostboardError, PostboardResult};
use crate::pagination::{Page, PageRequest};
use crate::reactions::{ReactionEngine, ReactionTarget, ToggleOutcome};
use crate::threading::{ThreadEntry, ThreadGraph};
use crate::utils::now_utc_iso;
use serde::{Deserialize, Serialize};

#[derive(Clone)]
pub struct PostService {
    database: Database,
    reactions: ReactionEngine,
    threads: ThreadGraph,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePostInput {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub categories: Vec<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePostInput {
    pub title: Option<String>,
    pub content: Option<String>,
    pub status: Option<Status>,
    /// Added to the post's existing categories.
    #[serde(default)]
    pub categories: Vec<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: PostRecord,
    pub categories: Vec<CategoryRecord>,
    pub reactions: ReactionTally,
}

/// Result of a reaction toggle plus the target's counts afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct ReactionSummary {
    pub outcome: ToggleOutcome,
    pub reactions: ReactionTally,
}

impl PostService {
    pub fn new(database: Database) -> Self {
        Self {
            reactions: ReactionEngine::new(database.clone()),
            threads: ThreadGraph::new(database.clone()),
            database,
        }
    }

    pub fn create_post(&self, actor: &Actor, input: CreatePostInput) -> PostboardResult<PostView> {
        let title = required_field("title", &input.title)?;
        let content = required_field("content", &input.content)?;

        let post_id = self.database.with_transaction(|repos| {
            ensure_categories_exist(&repos, &input.categories)?;
            let posts = repos.posts();
            let post_id = posts.create(&NewPost {
                author_id: actor.id,
                title,
                content,
                status: Status::Active,
                publish_date: now_utc_iso(),
            })?;
            posts.add_categories(post_id, &input.categories)?;
            Ok(post_id)
        })?;

        tracing::info!(post_id, author_id = actor.id, "post created");
        self.get_post(actor, post_id)
    }

    pub fn get_post(&self, actor: &Actor, post_id: i64) -> PostboardResult<PostView> {
        let view = self.database.with_repositories(|repos| {
            let post = readable_post(&repos, actor, post_id)?;
            let categories = repos.posts().categories_of(post_id)?;
            let reactions = repos.reactions().tally(TargetKind::Post, post_id)?;
            Ok(PostView {
                post,
                categories,
                reactions,
            })
        })?;
        Ok(view)
    }

    /// Posts `actor` may read, newest first.
    pub fn list_posts(
        &self,
        actor: &Actor,
        request: PageRequest,
    ) -> PostboardResult<Page<PostRecord>> {
        let visibility = visibility_for(actor);
        let (items, total) = self.database.with_repositories(|repos| {
            let posts = repos.posts();
            let items = posts.list(visibility, request.limit(), request.offset())?;
            Ok((items, posts.count(visibility)?))
        })?;
        Ok(request.paginate(items, total))
    }

    pub fn list_own_posts(
        &self,
        actor: &Actor,
        request: PageRequest,
    ) -> PostboardResult<Page<PostRecord>> {
        let (items, total) = self.database.with_repositories(|repos| {
            let posts = repos.posts();
            let items = posts.list_by_author(actor.id, request.limit(), request.offset())?;
            Ok((items, posts.count_by_author(actor.id)?))
        })?;
        Ok(request.paginate(items, total))
    }

    pub fn update_post(
        &self,
        actor: &Actor,
        post_id: i64,
        input: UpdatePostInput,
    ) -> PostboardResult<PostView> {
        let title = input
            .title
            .as_deref()
            .map(|title| required_field("title", title))
            .transpose()?;
        let content = input
            .content
            .as_deref()
            .map(|content| required_field("content", content))
            .transpose()?;

        self.database.with_transaction(|repos| {
            let mut post = readable_post(&repos, actor, post_id)?;
            enforce(actor, &Requirement::owner_or_admin(post.author_id))?;
            ensure_categories_exist(&repos, &input.categories)?;

            if let Some(title) = title {
                post.title = title;
            }
            if let Some(content) = content {
                post.content = content;
            }
            if let Some(status) = input.status {
                post.status = status;
            }
            post.updated_at = Some(now_utc_iso());

            let posts = repos.posts();
            posts.update(&post)?;
            posts.add_categories(post_id, &input.categories)?;
            Ok(())
        })?;

        tracing::info!(post_id, actor_id = actor.id, "post updated");
        self.get_post(actor, post_id)
    }

    /// Deletes the post together with its comments and every reaction on
    /// either.
    pub fn delete_post(&self, actor: &Actor, post_id: i64) -> PostboardResult<()> {
        self.database.with_transaction(|repos| {
            let post = readable_post(&repos, actor, post_id)?;
            enforce(actor, &Requirement::owner_or_admin(post.author_id))?;

            let comment_ids = repos.comments().list_ids_for_post(post_id)?;
            let reactions = repos.reactions();
            reactions.delete_for_targets(TargetKind::Comment, &comment_ids)?;
            reactions.delete_for_targets(TargetKind::Post, &[post_id])?;
            repos.posts().delete(post_id)
        })?;
        tracing::info!(post_id, actor_id = actor.id, "post deleted");
        Ok(())
    }

    pub fn categories_of_post(
        &self,
        actor: &Actor,
        post_id: i64,
    ) -> PostboardResult<Vec<CategoryRecord>> {
        Ok(self.database.with_repositories(|repos| {
            readable_post(&repos, actor, post_id)?;
            repos.posts().categories_of(post_id)
        })?)
    }

    /// Top-level comment. A missing or inactive post reads as not found here.
    pub fn create_comment(
        &self,
        actor: &Actor,
        post_id: i64,
        content: &str,
    ) -> PostboardResult<CommentRecord> {
        self.threads
            .start_thread(actor, post_id, content)
            .map_err(|err| match err {
                PostboardError::TargetUnavailable(what) => {
                    PostboardError::not_found(format!("{what} (missing or inactive)"))
                }
                other => other,
            })
    }

    pub fn list_comments(
        &self,
        actor: &Actor,
        post_id: i64,
        request: PageRequest,
    ) -> PostboardResult<Page<CommentRecord>> {
        let visibility = visibility_for(actor);
        let (items, total) = self.database.with_repositories(|repos| {
            readable_post(&repos, actor, post_id)?;
            let comments = repos.comments();
            let items =
                comments.list_for_post(post_id, visibility, request.limit(), request.offset())?;
            Ok((items, comments.count_for_post(post_id, visibility)?))
        })?;
        Ok(request.paginate(items, total))
    }

    pub fn comment_thread(&self, actor: &Actor, post_id: i64) -> PostboardResult<Vec<ThreadEntry>> {
        self.database
            .with_repositories(|repos| readable_post(&repos, actor, post_id))?;
        self.threads.thread(actor, post_id)
    }

    pub fn react(
        &self,
        actor: &Actor,
        post_id: i64,
        kind: ReactionKind,
    ) -> PostboardResult<ReactionSummary> {
        self.database
            .with_repositories(|repos| readable_post(&repos, actor, post_id))?;
        let target = ReactionTarget::post(post_id);
        let outcome = retry_on_conflict(|| self.reactions.toggle(actor, target, kind))?;
        Ok(ReactionSummary {
            outcome,
            reactions: self.reactions.tally(target)?,
        })
    }

    pub fn list_reactions(
        &self,
        actor: &Actor,
        post_id: i64,
        request: PageRequest,
    ) -> PostboardResult<Page<ReactionRecord>> {
        self.database
            .with_repositories(|repos| readable_post(&repos, actor, post_id))?;
        self.reactions.list(ReactionTarget::post(post_id), request)
    }

    pub fn remove_reaction(
        &self,
        actor: &Actor,
        post_id: i64,
        kind: ReactionKind,
    ) -> PostboardResult<()> {
        self.database
            .with_repositories(|repos| readable_post(&repos, actor, post_id))?;
        self.reactions
            .remove(actor, ReactionTarget::post(post_id), kind)
    }
}

/// Resolves a post the actor may see; anything else is `NotFound`.
fn readable_post(
    repos: &SqliteRepositories<'_>,
    actor: &Actor,
    post_id: i64,
) -> anyhow::Result<PostRecord> {
    match repos.posts().get(post_id)? {
        Some(post) if can_read(actor, post.author_id, post.status) => Ok(post),
        _ => Err(PostboardError::not_found(format!("post {post_id}")).into()),
    }
}

fn ensure_categories_exist(
    repos: &SqliteRepositories<'_>,
    category_ids: &[i64],
) -> anyhow::Result<()> {
    let categories = repos.categories();
    for id in category_ids {
        if categories.get(*id)?.is_none() {
            return Err(PostboardError::not_found(format!("category {id}")).into());
        }
    }
    Ok(())
}

pub(crate) fn required_field(name: &str, value: &str) -> PostboardResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PostboardError::invalid(format!("{name} is required")));
    }
    Ok(trimmed.to_string())
}
