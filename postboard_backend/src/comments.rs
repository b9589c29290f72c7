use crate::auth::Actor;
use crate::database::models::{CommentRecord, ReactionKind, ReactionRecord, ReactionTally};
use crate::database::Database;
use crate::error::{retry_on_conflict, PostboardResult};
use crate::pagination::{Page, PageRequest};
use crate::posts::ReactionSummary;
use crate::reactions::{ReactionEngine, ReactionTarget};
use crate::threading::{CommentChanges, ThreadGraph};
use serde::Serialize;

/// Use cases addressed by comment id. Top-level comments are created through
/// [`crate::posts::PostService::create_comment`].
#[derive(Clone)]
pub struct CommentService {
    reactions: ReactionEngine,
    threads: ThreadGraph,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: CommentRecord,
    pub reactions: ReactionTally,
}

impl CommentService {
    pub fn new(database: Database) -> Self {
        Self {
            reactions: ReactionEngine::new(database.clone()),
            threads: ThreadGraph::new(database),
        }
    }

    pub fn get_comment(&self, actor: &Actor, comment_id: i64) -> PostboardResult<CommentView> {
        let comment = self.threads.get_comment(actor, comment_id)?;
        let reactions = self.reactions.tally(ReactionTarget::comment(comment_id))?;
        Ok(CommentView { comment, reactions })
    }

    pub fn update_comment(
        &self,
        actor: &Actor,
        comment_id: i64,
        changes: CommentChanges,
    ) -> PostboardResult<CommentRecord> {
        self.threads.update_comment(actor, comment_id, changes)
    }

    pub fn delete_comment(&self, actor: &Actor, comment_id: i64) -> PostboardResult<usize> {
        self.threads.delete_comment(actor, comment_id)
    }

    pub fn reply(
        &self,
        actor: &Actor,
        post_id: i64,
        parent_comment_id: i64,
        content: &str,
    ) -> PostboardResult<CommentRecord> {
        self.threads
            .attach_reply(actor, post_id, parent_comment_id, content)
    }

    pub fn react(
        &self,
        actor: &Actor,
        comment_id: i64,
        kind: ReactionKind,
    ) -> PostboardResult<ReactionSummary> {
        self.threads.get_comment(actor, comment_id)?;
        let target = ReactionTarget::comment(comment_id);
        let outcome = retry_on_conflict(|| self.reactions.toggle(actor, target, kind))?;
        Ok(ReactionSummary {
            outcome,
            reactions: self.reactions.tally(target)?,
        })
    }

    pub fn list_reactions(
        &self,
        actor: &Actor,
        comment_id: i64,
        request: PageRequest,
    ) -> PostboardResult<Page<ReactionRecord>> {
        self.threads.get_comment(actor, comment_id)?;
        self.reactions
            .list(ReactionTarget::comment(comment_id), request)
    }

    pub fn remove_reaction(
        &self,
        actor: &Actor,
        comment_id: i64,
        kind: ReactionKind,
    ) -> PostboardResult<()> {
        self.threads.get_comment(actor, comment_id)?;
        self.reactions
            .remove(actor, ReactionTarget::comment(comment_id), kind)
    }
}
