//! Fixtures shared by the service tests.

use crate::auth::{Actor, Role};
use crate::database::models::{NewComment, NewPost, NewUser, Status};
use crate::database::repositories::{CommentRepository, PostRepository, UserRepository};
use crate::database::Database;

pub(crate) fn database() -> Database {
    Database::open_in_memory().expect("in-memory database")
}

pub(crate) fn user(db: &Database, login: &str, role: Role) -> Actor {
    let id = db
        .with_repositories(|repos| {
            repos.users().create(&NewUser {
                login: login.into(),
                email: format!("{login}@example.com"),
                full_name: login.to_uppercase(),
                password_hash: "unused".into(),
                role,
                status: Status::Active,
                created_at: "2024-01-01T00:00:00Z".into(),
            })
        })
        .expect("insert user");
    Actor::new(id, role)
}

pub(crate) fn post(db: &Database, author: &Actor, status: Status) -> i64 {
    db.with_repositories(|repos| {
        repos.posts().create(&NewPost {
            author_id: author.id,
            title: "Title".into(),
            content: "Body".into(),
            status,
            publish_date: crate::utils::now_utc_iso(),
        })
    })
    .expect("insert post")
}

pub(crate) fn comment(db: &Database, post_id: i64, parent: Option<i64>, author: &Actor) -> i64 {
    db.with_repositories(|repos| {
        repos.comments().create(&NewComment {
            post_id,
            parent_comment_id: parent,
            author_id: author.id,
            content: "comment".into(),
            publish_date: crate::utils::now_utc_iso(),
        })
    })
    .expect("insert comment")
}
