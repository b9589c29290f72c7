//! Comment threads.
//!
//! Comments form a forest rooted at each post. Every comment carries the id
//! of the post it was written under, copied from the post itself rather than
//! from its parent, so a reply chain of any depth stays anchored to one post.
//! Parents must exist when a reply is attached and comments are never moved
//! to another parent, so the forest cannot contain cycles.

use crate::auth::{can_read, enforce, Actor, Requirement};
use crate::database::models::{CommentRecord, NewComment, Status, TargetKind};
use crate::database::repositories::{
    CommentRepository, PostRepository, ReactionRepository, SqliteRepositories,
};
use crate::database::Database;
use crate::error::{PostboardError, PostboardResult};
use crate::utils::now_utc_iso;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone)]
pub struct ThreadGraph {
    database: Database,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentChanges {
    pub content: Option<String>,
    pub status: Option<Status>,
}

/// One comment of a thread listing. Entries come in depth-first order,
/// oldest reply first, so a client rebuilds the nesting from `depth` alone.
/// `reply_to` names the nearest visible ancestor, which differs from
/// `parent_comment_id` when the direct parent is hidden from the reader.
#[derive(Debug, Clone, Serialize)]
pub struct ThreadEntry {
    #[serde(flatten)]
    pub comment: CommentRecord,
    pub depth: usize,
    pub reply_to: Option<i64>,
}

impl ThreadGraph {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Adds a top-level comment to an ACTIVE post.
    pub fn start_thread(
        &self,
        actor: &Actor,
        post_id: i64,
        content: &str,
    ) -> PostboardResult<CommentRecord> {
        self.attach(actor, post_id, None, content)
    }

    /// Adds a reply under `parent_comment_id`, which must belong to `post_id`.
    pub fn attach_reply(
        &self,
        actor: &Actor,
        post_id: i64,
        parent_comment_id: i64,
        content: &str,
    ) -> PostboardResult<CommentRecord> {
        self.attach(actor, post_id, Some(parent_comment_id), content)
    }

    fn attach(
        &self,
        actor: &Actor,
        post_id: i64,
        parent_comment_id: Option<i64>,
        content: &str,
    ) -> PostboardResult<CommentRecord> {
        let content = required_content(content)?;
        let record = self.database.with_transaction(|repos| {
            match repos.posts().get(post_id)? {
                Some(post) if post.status == Status::Active => {}
                _ => {
                    return Err(PostboardError::TargetUnavailable(format!("post {post_id}")).into())
                }
            }
            if let Some(parent_id) = parent_comment_id {
                // A parent on another post is not part of this thread.
                match repos.comments().get(parent_id)? {
                    Some(parent) if parent.post_id == post_id => {}
                    _ => return Err(PostboardError::ParentNotFound(parent_id).into()),
                }
            }

            let comments = repos.comments();
            let id = comments.create(&NewComment {
                post_id,
                parent_comment_id,
                author_id: actor.id,
                content,
                publish_date: now_utc_iso(),
            })?;
            comments
                .get(id)?
                .with_context(|| format!("comment {id} missing right after insert"))
        })?;

        tracing::info!(
            comment_id = record.id,
            post_id,
            parent_comment_id = ?parent_comment_id,
            author_id = actor.id,
            "comment attached"
        );
        Ok(record)
    }

    /// A comment is readable only while its post is readable too.
    pub fn get_comment(&self, actor: &Actor, comment_id: i64) -> PostboardResult<CommentRecord> {
        Ok(self
            .database
            .with_repositories(|repos| readable(&repos, actor, comment_id))?)
    }

    /// Applies `changes` to a comment its author or an ADMIN may modify.
    /// Depth plays no part in the decision.
    pub fn update_comment(
        &self,
        actor: &Actor,
        comment_id: i64,
        changes: CommentChanges,
    ) -> PostboardResult<CommentRecord> {
        let content = changes.content.as_deref().map(required_content).transpose()?;
        if content.is_none() && changes.status.is_none() {
            return Err(PostboardError::invalid("nothing to update"));
        }

        let updated = self.database.with_transaction(|repos| {
            let mut comment = readable(&repos, actor, comment_id)?;
            let comments = repos.comments();
            enforce(actor, &Requirement::owner_or_admin(comment.author_id))?;

            if let Some(content) = content {
                comment.content = content;
            }
            if let Some(status) = changes.status {
                comment.status = status;
            }
            comment.updated_at = Some(now_utc_iso());
            comments.update(&comment)?;
            Ok(comment)
        })?;

        tracing::info!(comment_id, actor_id = actor.id, "comment updated");
        Ok(updated)
    }

    /// Deletes a comment and its reactions. Direct replies become top-level
    /// comments on the same post; the number re-rooted is returned.
    pub fn delete_comment(&self, actor: &Actor, comment_id: i64) -> PostboardResult<usize> {
        let rerooted = self.database.with_transaction(|repos| {
            let comment = readable(&repos, actor, comment_id)?;
            let comments = repos.comments();
            enforce(actor, &Requirement::owner_or_admin(comment.author_id))?;

            let rerooted = comments.detach_replies(comment_id)?;
            repos
                .reactions()
                .delete_for_targets(TargetKind::Comment, &[comment_id])?;
            comments.delete(comment_id)?;
            Ok(rerooted)
        })?;

        tracing::info!(comment_id, actor_id = actor.id, rerooted, "comment deleted");
        Ok(rerooted)
    }

    /// The post's comments in thread order, restricted to what `actor` may
    /// read. Callers check that the post itself is readable.
    pub fn thread(&self, actor: &Actor, post_id: i64) -> PostboardResult<Vec<ThreadEntry>> {
        let comments = self
            .database
            .with_repositories(|repos| repos.comments().list_all_for_post(post_id))?;
        Ok(flatten_thread(comments, |comment| {
            can_read(actor, comment.author_id, comment.status)
        }))
    }
}

/// Existence check. A comment counts as missing when the actor may not read
/// it or the post it hangs under.
fn readable(
    repos: &SqliteRepositories<'_>,
    actor: &Actor,
    comment_id: i64,
) -> anyhow::Result<CommentRecord> {
    let missing = || PostboardError::not_found(format!("comment {comment_id}"));
    let comment = match repos.comments().get(comment_id)? {
        Some(comment) if can_read(actor, comment.author_id, comment.status) => comment,
        _ => return Err(missing().into()),
    };
    match repos.posts().get(comment.post_id)? {
        Some(post) if can_read(actor, post.author_id, post.status) => Ok(comment),
        _ => Err(missing().into()),
    }
}

fn required_content(content: &str) -> PostboardResult<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(PostboardError::invalid("comment content is required"));
    }
    Ok(trimmed.to_string())
}

/// Flattens one post's comments into display order.
///
/// Comments rejected by `visible` are left out, and their visible replies
/// hang off the nearest visible ancestor instead (or become roots). Parents
/// always have smaller ids than their replies, so ancestors resolve in one
/// ascending pass and the walk uses an explicit stack, whatever the depth.
pub fn flatten_thread<F>(mut comments: Vec<CommentRecord>, visible: F) -> Vec<ThreadEntry>
where
    F: Fn(&CommentRecord) -> bool,
{
    comments.sort_by_key(|comment| comment.id);

    // Nearest visible comment at or above each id.
    let mut anchor: HashMap<i64, Option<i64>> = HashMap::with_capacity(comments.len());
    let mut children: HashMap<Option<i64>, Vec<CommentRecord>> = HashMap::new();
    for comment in comments {
        let reply_to = comment
            .parent_comment_id
            .and_then(|parent| anchor.get(&parent).copied().flatten());
        if visible(&comment) {
            anchor.insert(comment.id, Some(comment.id));
            children.entry(reply_to).or_default().push(comment);
        } else {
            anchor.insert(comment.id, reply_to);
        }
    }

    let mut ordered = Vec::with_capacity(anchor.len());
    let mut stack: Vec<(CommentRecord, usize, Option<i64>)> = children
        .remove(&None)
        .unwrap_or_default()
        .into_iter()
        .rev()
        .map(|comment| (comment, 0, None))
        .collect();
    while let Some((comment, depth, reply_to)) = stack.pop() {
        if let Some(replies) = children.remove(&Some(comment.id)) {
            stack.extend(
                replies
                    .into_iter()
                    .rev()
                    .map(|reply| (reply, depth + 1, Some(comment.id))),
            );
        }
        ordered.push(ThreadEntry {
            comment,
            depth,
            reply_to,
        });
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::error::DenyReason;
    use crate::reactions::{ReactionEngine, ReactionTarget};
    use crate::test_support;
    use crate::database::models::ReactionKind;

    #[test]
    fn reply_chains_stay_anchored_to_their_post() {
        let db = test_support::database();
        let author = test_support::user(&db, "author", Role::User);
        let post_id = test_support::post(&db, &author, Status::Active);
        let graph = ThreadGraph::new(db);

        let root = graph.start_thread(&author, post_id, "root").unwrap();
        let mut parent = root.id;
        for depth in 1..=12 {
            let reply = graph
                .attach_reply(&author, post_id, parent, &format!("depth {depth}"))
                .unwrap();
            assert_eq!(reply.post_id, post_id);
            assert_eq!(reply.parent_comment_id, Some(parent));
            parent = reply.id;
        }

        let thread = graph.thread(&author, post_id).unwrap();
        assert_eq!(thread.len(), 13);
        for (depth, entry) in thread.iter().enumerate() {
            assert_eq!(entry.comment.post_id, post_id);
            assert_eq!(entry.depth, depth);
        }
        assert_eq!(thread[12].reply_to, Some(thread[11].comment.id));
    }

    #[test]
    fn reply_to_missing_parent_is_rejected() {
        let db = test_support::database();
        let author = test_support::user(&db, "author", Role::User);
        let post_id = test_support::post(&db, &author, Status::Active);
        let graph = ThreadGraph::new(db);

        let err = graph.attach_reply(&author, post_id, 404, "hello").unwrap_err();
        assert!(matches!(err, PostboardError::ParentNotFound(404)));
    }

    #[test]
    fn reply_to_parent_on_another_post_is_rejected() {
        let db = test_support::database();
        let author = test_support::user(&db, "author", Role::User);
        let first = test_support::post(&db, &author, Status::Active);
        let second = test_support::post(&db, &author, Status::Active);
        let foreign = test_support::comment(&db, first, None, &author);
        let graph = ThreadGraph::new(db);

        let err = graph.attach_reply(&author, second, foreign, "hi").unwrap_err();
        assert!(matches!(err, PostboardError::ParentNotFound(id) if id == foreign));
    }

    #[test]
    fn comments_need_an_active_post() {
        let db = test_support::database();
        let author = test_support::user(&db, "author", Role::User);
        let hidden = test_support::post(&db, &author, Status::Inactive);
        let parent = test_support::comment(&db, hidden, None, &author);
        let graph = ThreadGraph::new(db);

        for result in [
            graph.start_thread(&author, hidden, "x"),
            graph.start_thread(&author, 9999, "x"),
            graph.attach_reply(&author, hidden, parent, "x"),
        ] {
            assert!(matches!(result, Err(PostboardError::TargetUnavailable(_))));
        }
    }

    #[test]
    fn blank_content_is_invalid() {
        let db = test_support::database();
        let author = test_support::user(&db, "author", Role::User);
        let post_id = test_support::post(&db, &author, Status::Active);
        let graph = ThreadGraph::new(db);

        assert!(matches!(
            graph.start_thread(&author, post_id, "   "),
            Err(PostboardError::InvalidInput(_))
        ));
    }

    #[test]
    fn only_author_or_admin_may_touch_a_reply() {
        let db = test_support::database();
        let u1 = test_support::user(&db, "u1", Role::User);
        let u2 = test_support::user(&db, "u2", Role::User);
        let admin = test_support::user(&db, "root", Role::Admin);
        let post_id = test_support::post(&db, &u1, Status::Active);
        let graph = ThreadGraph::new(db);

        let c1 = graph.start_thread(&u1, post_id, "first").unwrap();
        let c2 = graph.attach_reply(&u2, post_id, c1.id, "reply").unwrap();
        assert_eq!(c2.post_id, post_id);

        let denied = graph.delete_comment(&u1, c2.id).unwrap_err();
        assert!(matches!(denied, PostboardError::Forbidden(DenyReason::NotOwner)));
        let denied = graph
            .update_comment(
                &u1,
                c2.id,
                CommentChanges {
                    content: Some("hijack".into()),
                    status: None,
                },
            )
            .unwrap_err();
        assert!(matches!(denied, PostboardError::Forbidden(DenyReason::NotOwner)));

        let edited = graph
            .update_comment(
                &admin,
                c2.id,
                CommentChanges {
                    content: Some("moderated".into()),
                    status: None,
                },
            )
            .unwrap();
        assert_eq!(edited.content, "moderated");
        assert!(edited.updated_at.is_some());

        let own = graph
            .update_comment(
                &u1,
                c1.id,
                CommentChanges {
                    content: Some("edited".into()),
                    status: None,
                },
            )
            .unwrap();
        assert_eq!(own.content, "edited");
    }

    #[test]
    fn missing_comment_is_reported_before_authorization() {
        let db = test_support::database();
        let stranger = test_support::user(&db, "stranger", Role::User);
        let graph = ThreadGraph::new(db);

        assert!(matches!(
            graph.delete_comment(&stranger, 777),
            Err(PostboardError::NotFound(_))
        ));
        assert!(matches!(
            graph.update_comment(
                &stranger,
                777,
                CommentChanges {
                    content: Some("x".into()),
                    status: None
                }
            ),
            Err(PostboardError::NotFound(_))
        ));
    }

    #[test]
    fn deleting_a_comment_reroots_replies_and_drops_reactions() {
        let db = test_support::database();
        let author = test_support::user(&db, "author", Role::User);
        let fan = test_support::user(&db, "fan", Role::User);
        let post_id = test_support::post(&db, &author, Status::Active);
        let graph = ThreadGraph::new(db.clone());
        let engine = ReactionEngine::new(db.clone());

        let parent = graph.start_thread(&author, post_id, "parent").unwrap();
        let reply = graph.attach_reply(&fan, post_id, parent.id, "reply").unwrap();
        let nested = graph.attach_reply(&author, post_id, reply.id, "nested").unwrap();
        engine
            .toggle(&fan, ReactionTarget::comment(parent.id), ReactionKind::Like)
            .unwrap();

        assert_eq!(graph.delete_comment(&author, parent.id).unwrap(), 1);

        let reply = graph.get_comment(&fan, reply.id).unwrap();
        assert_eq!(reply.parent_comment_id, None);
        assert_eq!(reply.post_id, post_id);
        let nested = graph.get_comment(&fan, nested.id).unwrap();
        assert_eq!(nested.parent_comment_id, Some(reply.id));

        // The re-rooted reply keeps its own ownership rule.
        assert!(matches!(
            graph.delete_comment(&author, reply.id),
            Err(PostboardError::Forbidden(DenyReason::NotOwner))
        ));
        assert_eq!(
            engine.tally(ReactionTarget::comment(parent.id)).unwrap(),
            Default::default()
        );

        let thread = graph.thread(&fan, post_id).unwrap();
        let ids: Vec<(i64, usize)> = thread.iter().map(|e| (e.comment.id, e.depth)).collect();
        assert_eq!(ids, vec![(reply.id, 0), (nested.id, 1)]);
    }

    #[test]
    fn inactive_comments_are_hidden_from_strangers() {
        let db = test_support::database();
        let author = test_support::user(&db, "author", Role::User);
        let stranger = test_support::user(&db, "stranger", Role::User);
        let admin = test_support::user(&db, "admin", Role::Admin);
        let post_id = test_support::post(&db, &author, Status::Active);
        let graph = ThreadGraph::new(db);

        let comment = graph.start_thread(&author, post_id, "soon hidden").unwrap();
        graph
            .update_comment(
                &author,
                comment.id,
                CommentChanges {
                    content: None,
                    status: Some(Status::Inactive),
                },
            )
            .unwrap();

        assert!(matches!(
            graph.get_comment(&stranger, comment.id),
            Err(PostboardError::NotFound(_))
        ));
        assert!(matches!(
            graph.delete_comment(&stranger, comment.id),
            Err(PostboardError::NotFound(_))
        ));
        assert!(graph.get_comment(&author, comment.id).is_ok());
        assert!(graph.get_comment(&admin, comment.id).is_ok());
    }

    #[test]
    fn comments_under_a_hidden_post_are_hidden_with_it() {
        let db = test_support::database();
        let owner = test_support::user(&db, "owner", Role::User);
        let commenter = test_support::user(&db, "commenter", Role::User);
        let admin = test_support::user(&db, "admin", Role::Admin);
        let post_id = test_support::post(&db, &owner, Status::Inactive);
        let comment_id = test_support::comment(&db, post_id, None, &commenter);
        let graph = ThreadGraph::new(db);

        // The comment itself is ACTIVE and the commenter wrote it.
        assert!(matches!(
            graph.get_comment(&commenter, comment_id),
            Err(PostboardError::NotFound(_))
        ));
        assert!(matches!(
            graph.delete_comment(&commenter, comment_id),
            Err(PostboardError::NotFound(_))
        ));
        assert_eq!(graph.get_comment(&owner, comment_id).unwrap().id, comment_id);
        assert_eq!(graph.get_comment(&admin, comment_id).unwrap().id, comment_id);
    }

    fn record(id: i64, parent: Option<i64>, status: Status) -> CommentRecord {
        CommentRecord {
            id,
            post_id: 1,
            parent_comment_id: parent,
            author_id: 1,
            content: format!("c{id}"),
            status,
            publish_date: format!("2024-01-01T00:00:{id:02}Z"),
            updated_at: None,
        }
    }

    fn layout(thread: &[ThreadEntry]) -> Vec<(i64, usize, Option<i64>)> {
        thread
            .iter()
            .map(|entry| (entry.comment.id, entry.depth, entry.reply_to))
            .collect()
    }

    #[test]
    fn thread_promotes_replies_of_hidden_comments() {
        let comments = vec![
            record(4, Some(1), Status::Active),
            record(1, None, Status::Active),
            record(2, Some(1), Status::Inactive),
            record(3, Some(2), Status::Active),
            record(5, Some(99), Status::Active),
            record(6, Some(2), Status::Inactive),
            record(7, Some(6), Status::Active),
        ];
        let thread = flatten_thread(comments, |c| c.status == Status::Active);

        assert_eq!(
            layout(&thread),
            vec![
                (1, 0, None),
                (3, 1, Some(1)),
                (4, 1, Some(1)),
                (7, 1, Some(1)),
                (5, 0, None),
            ]
        );
        // The stored parent is kept as written.
        assert_eq!(thread[1].comment.parent_comment_id, Some(2));
    }

    #[test]
    fn deep_chains_serialize_and_drop_on_a_small_stack() {
        let worker = std::thread::Builder::new()
            .stack_size(2 * 1024 * 1024)
            .spawn(|| {
                let comments: Vec<CommentRecord> = (1..=100_000)
                    .map(|id| record(id, if id == 1 { None } else { Some(id - 1) }, Status::Active))
                    .collect();
                let thread = flatten_thread(comments, |_| true);
                assert_eq!(thread.len(), 100_000);
                assert_eq!(thread[99_999].depth, 99_999);

                let json = serde_json::to_string(&thread).unwrap();
                drop(thread);
                let parsed: Vec<serde_json::Value> = serde_json::from_str(&json).unwrap();
                assert_eq!(parsed[99_999]["depth"], 99_999);
                assert_eq!(parsed[99_999]["reply_to"], 99_999);
            })
            .unwrap();
        worker.join().unwrap();
    }
}
