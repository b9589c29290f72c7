mod categories;
mod comments;
mod password_resets;
mod posts;
mod reactions;
mod users;

use super::models::{
    CategoryRecord, CommentRecord, NewComment, NewPost, NewUser, PasswordResetRecord,
    PostRecord, ReactionKind, ReactionRecord, ReactionTally, Role, TargetKind, UserRecord,
    Visibility,
};
use anyhow::Result;
use rusqlite::Connection;

pub trait UserRepository {
    fn create(&self, record: &NewUser) -> Result<i64>;
    fn get(&self, id: i64) -> Result<Option<UserRecord>>;
    fn find_by_login_or_email(&self, login_or_email: &str) -> Result<Option<UserRecord>>;
    fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>>;
    fn list(&self) -> Result<Vec<UserRecord>>;
    fn update_profile(&self, id: i64, full_name: &str, email: &str, login: &str) -> Result<()>;
    fn update_role(&self, id: i64, role: Role) -> Result<()>;
    fn update_password(&self, id: i64, password_hash: &str) -> Result<()>;
    fn delete(&self, id: i64) -> Result<()>;
}

pub trait PasswordResetRepository {
    fn create(&self, record: &PasswordResetRecord) -> Result<()>;
    fn get(&self, token: &str) -> Result<Option<PasswordResetRecord>>;
    fn delete(&self, token: &str) -> Result<()>;
}

pub trait PostRepository {
    fn create(&self, record: &NewPost) -> Result<i64>;
    fn get(&self, id: i64) -> Result<Option<PostRecord>>;
    fn list(&self, visibility: Visibility, limit: usize, offset: usize)
        -> Result<Vec<PostRecord>>;
    fn count(&self, visibility: Visibility) -> Result<usize>;
    fn list_by_author(&self, author_id: i64, limit: usize, offset: usize)
        -> Result<Vec<PostRecord>>;
    fn count_by_author(&self, author_id: i64) -> Result<usize>;
    fn list_in_category(
        &self,
        category_id: i64,
        visibility: Visibility,
    ) -> Result<Vec<PostRecord>>;
    fn list_ids_by_author(&self, author_id: i64) -> Result<Vec<i64>>;
    fn update(&self, record: &PostRecord) -> Result<()>;
    fn delete(&self, id: i64) -> Result<()>;
    fn add_categories(&self, post_id: i64, category_ids: &[i64]) -> Result<()>;
    fn categories_of(&self, post_id: i64) -> Result<Vec<CategoryRecord>>;
}

pub trait CommentRepository {
    fn create(&self, record: &NewComment) -> Result<i64>;
    fn get(&self, id: i64) -> Result<Option<CommentRecord>>;
    fn list_for_post(
        &self,
        post_id: i64,
        visibility: Visibility,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CommentRecord>>;
    fn count_for_post(&self, post_id: i64, visibility: Visibility) -> Result<usize>;
    /// Every comment on the post, oldest first.
    fn list_all_for_post(&self, post_id: i64) -> Result<Vec<CommentRecord>>;
    fn list_ids_for_post(&self, post_id: i64) -> Result<Vec<i64>>;
    fn list_ids_by_author(&self, author_id: i64) -> Result<Vec<i64>>;
    fn update(&self, record: &CommentRecord) -> Result<()>;
    /// Detaches direct replies of `parent_id`, making them top-level comments.
    fn detach_replies(&self, parent_id: i64) -> Result<usize>;
    fn delete(&self, id: i64) -> Result<()>;
}

pub trait CategoryRepository {
    fn create(&self, title: &str, description: Option<&str>) -> Result<i64>;
    fn get(&self, id: i64) -> Result<Option<CategoryRecord>>;
    fn list(&self) -> Result<Vec<CategoryRecord>>;
    fn update(&self, record: &CategoryRecord) -> Result<()>;
    fn delete(&self, id: i64) -> Result<()>;
}

pub trait ReactionRepository {
    fn find(
        &self,
        author_id: i64,
        target_kind: TargetKind,
        target_id: i64,
    ) -> Result<Option<ReactionRecord>>;
    fn insert(
        &self,
        author_id: i64,
        target_kind: TargetKind,
        target_id: i64,
        kind: ReactionKind,
        created_at: &str,
    ) -> Result<i64>;
    fn set_kind(&self, id: i64, kind: ReactionKind) -> Result<()>;
    fn delete(&self, id: i64) -> Result<()>;
    fn list_for_target(
        &self,
        target_kind: TargetKind,
        target_id: i64,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ReactionRecord>>;
    fn count_for_target(&self, target_kind: TargetKind, target_id: i64) -> Result<usize>;
    fn tally(&self, target_kind: TargetKind, target_id: i64) -> Result<ReactionTally>;
    fn delete_for_targets(&self, target_kind: TargetKind, target_ids: &[i64]) -> Result<()>;
    fn delete_by_author(&self, author_id: i64) -> Result<()>;
}

/// Borrowed view over a connection (or an open transaction) that hands out
/// rusqlite-backed repositories.
pub struct SqliteRepositories<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRepositories<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn users(&self) -> impl UserRepository + '_ {
        users::SqliteUserRepository { conn: self.conn }
    }

    pub fn password_resets(&self) -> impl PasswordResetRepository + '_ {
        password_resets::SqlitePasswordResetRepository { conn: self.conn }
    }

    pub fn posts(&self) -> impl PostRepository + '_ {
        posts::SqlitePostRepository { conn: self.conn }
    }

    pub fn comments(&self) -> impl CommentRepository + '_ {
        comments::SqliteCommentRepository { conn: self.conn }
    }

    pub fn categories(&self) -> impl CategoryRepository + '_ {
        categories::SqliteCategoryRepository { conn: self.conn }
    }

    pub fn reactions(&self) -> impl ReactionRepository + '_ {
        reactions::SqliteReactionRepository { conn: self.conn }
    }

    pub fn conn(&self) -> &'conn Connection {
        self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::Status;
    use crate::database::MIGRATIONS;

    fn setup_conn() -> Connection {
        let conn = Connection::open_in_memory().expect("in-memory db");
        conn.execute_batch(MIGRATIONS).expect("base migrations");
        conn
    }

    fn insert_user(repos: &SqliteRepositories<'_>, login: &str) -> i64 {
        repos
            .users()
            .create(&NewUser {
                login: login.into(),
                email: format!("{login}@example.com"),
                full_name: login.to_uppercase(),
                password_hash: "hash".into(),
                role: Role::User,
                status: Status::Active,
                created_at: "2024-01-01T00:00:00Z".into(),
            })
            .unwrap()
    }

    fn insert_post(repos: &SqliteRepositories<'_>, author_id: i64, status: Status) -> i64 {
        repos
            .posts()
            .create(&NewPost {
                author_id,
                title: "Title".into(),
                content: "Body".into(),
                status,
                publish_date: "2024-01-01T00:00:01Z".into(),
            })
            .unwrap()
    }

    #[test]
    fn user_and_post_repositories_work() {
        let conn = setup_conn();
        let repos = SqliteRepositories::new(&conn);

        let alice = insert_user(&repos, "alice");
        let fetched = repos.users().find_by_login_or_email("alice@example.com").unwrap().unwrap();
        assert_eq!(fetched.id, alice);
        assert_eq!(fetched.role, Role::User);

        let post_id = insert_post(&repos, alice, Status::Active);
        let post = repos.posts().get(post_id).unwrap().unwrap();
        assert_eq!(post.author_id, alice);
        assert_eq!(post.status, Status::Active);
    }

    #[test]
    fn visibility_filter_hides_foreign_inactive_posts() {
        let conn = setup_conn();
        let repos = SqliteRepositories::new(&conn);
        let alice = insert_user(&repos, "alice");
        let bob = insert_user(&repos, "bob");

        insert_post(&repos, alice, Status::Active);
        insert_post(&repos, alice, Status::Inactive);
        insert_post(&repos, bob, Status::Inactive);

        let posts = repos.posts();
        assert_eq!(posts.count(Visibility::All).unwrap(), 3);
        assert_eq!(posts.count(Visibility::ActiveOrAuthoredBy(alice)).unwrap(), 2);
        assert_eq!(posts.count(Visibility::ActiveOrAuthoredBy(bob)).unwrap(), 2);
        let visible = posts.list(Visibility::ActiveOrAuthoredBy(bob), 10, 0).unwrap();
        assert!(visible
            .iter()
            .all(|p| p.status == Status::Active || p.author_id == bob));
    }

    #[test]
    fn reaction_key_is_unique_per_author_and_target() {
        let conn = setup_conn();
        let repos = SqliteRepositories::new(&conn);
        let alice = insert_user(&repos, "alice");
        let post_id = insert_post(&repos, alice, Status::Active);

        let reactions = repos.reactions();
        reactions
            .insert(alice, TargetKind::Post, post_id, ReactionKind::Like, "t0")
            .unwrap();
        let duplicate =
            reactions.insert(alice, TargetKind::Post, post_id, ReactionKind::Dislike, "t1");
        assert!(duplicate.is_err());

        let tally = reactions.tally(TargetKind::Post, post_id).unwrap();
        assert_eq!(tally, ReactionTally { likes: 1, dislikes: 0 });
    }

    #[test]
    fn deleting_a_parent_comment_detaches_its_replies() {
        let conn = setup_conn();
        let repos = SqliteRepositories::new(&conn);
        let alice = insert_user(&repos, "alice");
        let post_id = insert_post(&repos, alice, Status::Active);

        let comments = repos.comments();
        let parent = comments
            .create(&NewComment {
                post_id,
                parent_comment_id: None,
                author_id: alice,
                content: "parent".into(),
                publish_date: "t0".into(),
            })
            .unwrap();
        let child = comments
            .create(&NewComment {
                post_id,
                parent_comment_id: Some(parent),
                author_id: alice,
                content: "child".into(),
                publish_date: "t1".into(),
            })
            .unwrap();

        assert_eq!(comments.detach_replies(parent).unwrap(), 1);
        comments.delete(parent).unwrap();

        let child = comments.get(child).unwrap().unwrap();
        assert_eq!(child.parent_comment_id, None);
        assert_eq!(child.post_id, post_id);
    }
}
