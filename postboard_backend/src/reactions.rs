//! Like/dislike reactions on posts and comments.
//!
//! An actor holds at most one reaction per target. [`ReactionEngine::toggle`]
//! is the only write path: it creates, flips or removes that reaction inside
//! a single store transaction, and the `(author, target)` unique key rejects
//! any second row that slips past the lookup.

use crate::auth::Actor;
use crate::database::models::{ReactionKind, ReactionRecord, ReactionTally, Status, TargetKind};
use crate::database::repositories::{
    CommentRepository, PostRepository, ReactionRepository, SqliteRepositories,
};
use crate::database::Database;
use crate::error::{PostboardError, PostboardResult};
use crate::pagination::{Page, PageRequest};
use crate::utils::now_utc_iso;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ReactionTarget {
    pub kind: TargetKind,
    pub id: i64,
}

impl ReactionTarget {
    pub fn post(id: i64) -> Self {
        Self {
            kind: TargetKind::Post,
            id,
        }
    }

    pub fn comment(id: i64) -> Self {
        Self {
            kind: TargetKind::Comment,
            id,
        }
    }
}

impl fmt::Display for ReactionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TargetKind::Post => write!(f, "post {}", self.id),
            TargetKind::Comment => write!(f, "comment {}", self.id),
        }
    }
}

/// What a toggle did. Exactly one of these happens per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ToggleOutcome {
    Created { kind: ReactionKind },
    Updated { from: ReactionKind, to: ReactionKind },
    Removed { kind: ReactionKind },
}

impl ToggleOutcome {
    /// The actor's reaction after the toggle, if any.
    pub fn current(&self) -> Option<ReactionKind> {
        match *self {
            ToggleOutcome::Created { kind } => Some(kind),
            ToggleOutcome::Updated { to, .. } => Some(to),
            ToggleOutcome::Removed { .. } => None,
        }
    }
}

/// Parses a client-supplied reaction kind.
pub fn parse_kind(raw: &str) -> PostboardResult<ReactionKind> {
    raw.parse::<ReactionKind>().map_err(|_| {
        PostboardError::invalid(format!(
            "reaction type must be either LIKE or DISLIKE, got `{raw}`"
        ))
    })
}

#[derive(Clone)]
pub struct ReactionEngine {
    database: Database,
}

impl ReactionEngine {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub fn toggle(
        &self,
        actor: &Actor,
        target: ReactionTarget,
        requested: ReactionKind,
    ) -> PostboardResult<ToggleOutcome> {
        let outcome = self.database.with_transaction(|repos| {
            ensure_interactive(&repos, target)?;
            apply_toggle(&repos, actor.id, target, requested)
        })?;
        tracing::debug!(
            actor_id = actor.id,
            target = %target,
            outcome = ?outcome,
            "reaction toggled"
        );
        Ok(outcome)
    }

    /// Removes the actor's reaction only if it is of `kind`.
    pub fn remove(
        &self,
        actor: &Actor,
        target: ReactionTarget,
        kind: ReactionKind,
    ) -> PostboardResult<()> {
        self.database.with_transaction(|repos| {
            let reactions = repos.reactions();
            match reactions.find(actor.id, target.kind, target.id)? {
                Some(existing) if existing.kind == kind => reactions.delete(existing.id),
                _ => Err(PostboardError::not_found(format!("{kind} on {target}")).into()),
            }
        })?;
        tracing::debug!(actor_id = actor.id, target = %target, kind = %kind, "reaction removed");
        Ok(())
    }

    pub fn list(
        &self,
        target: ReactionTarget,
        request: PageRequest,
    ) -> PostboardResult<Page<ReactionRecord>> {
        let (items, total) = self.database.with_repositories(|repos| {
            let reactions = repos.reactions();
            let items = reactions.list_for_target(
                target.kind,
                target.id,
                request.limit(),
                request.offset(),
            )?;
            let total = reactions.count_for_target(target.kind, target.id)?;
            Ok((items, total))
        })?;
        Ok(request.paginate(items, total))
    }

    pub fn tally(&self, target: ReactionTarget) -> PostboardResult<ReactionTally> {
        Ok(self
            .database
            .with_repositories(|repos| repos.reactions().tally(target.kind, target.id))?)
    }
}

fn ensure_interactive(repos: &SqliteRepositories<'_>, target: ReactionTarget) -> anyhow::Result<()> {
    let status = match target.kind {
        TargetKind::Post => repos.posts().get(target.id)?.map(|post| post.status),
        TargetKind::Comment => repos.comments().get(target.id)?.map(|comment| comment.status),
    };
    if status == Some(Status::Active) {
        Ok(())
    } else {
        Err(PostboardError::TargetUnavailable(target.to_string()).into())
    }
}

fn apply_toggle(
    repos: &SqliteRepositories<'_>,
    author_id: i64,
    target: ReactionTarget,
    requested: ReactionKind,
) -> anyhow::Result<ToggleOutcome> {
    let reactions = repos.reactions();
    match reactions.find(author_id, target.kind, target.id)? {
        None => {
            reactions.insert(author_id, target.kind, target.id, requested, &now_utc_iso())?;
            Ok(ToggleOutcome::Created { kind: requested })
        }
        Some(existing) if existing.kind == requested => {
            reactions.delete(existing.id)?;
            Ok(ToggleOutcome::Removed { kind: requested })
        }
        Some(existing) => {
            reactions.set_kind(existing.id, requested)?;
            Ok(ToggleOutcome::Updated {
                from: existing.kind,
                to: requested,
            })
        }
    }
}
