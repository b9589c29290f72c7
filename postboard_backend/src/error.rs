use rusqlite::ffi;
use serde::Serialize;
use std::fmt;

/// Stable reason codes carried by every authorization denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DenyReason {
    /// The actor's role is not in the required set.
    Role,
    /// The actor neither owns the resource nor holds an exempt role.
    NotOwner,
    /// The account exists but is not allowed to sign in.
    InactiveAccount,
}

impl DenyReason {
    pub fn code(&self) -> &'static str {
        match self {
            DenyReason::Role => "role",
            DenyReason::NotOwner => "not-owner",
            DenyReason::InactiveAccount => "inactive-account",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Forbidden: {}", self.code())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PostboardError {
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
    #[error("{0}")]
    Forbidden(DenyReason),
    #[error("{0} not found")]
    NotFound(String),
    #[error("parent comment {0} not found")]
    ParentNotFound(i64),
    #[error("{0} is unavailable")]
    TargetUnavailable(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Internal(anyhow::Error),
}

pub type PostboardResult<T> = Result<T, PostboardError>;

impl PostboardError {
    pub fn not_found(what: impl Into<String>) -> Self {
        PostboardError::NotFound(what.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        PostboardError::InvalidInput(message.into())
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, PostboardError::Conflict(_))
    }
}

/// Store failures become `Internal`, except unique-key violations, which
/// surface as `Conflict` so callers can tell a lost race from a broken store.
/// A `PostboardError` raised inside a store closure comes back out unchanged.
impl From<anyhow::Error> for PostboardError {
    fn from(err: anyhow::Error) -> Self {
        let err = match err.downcast::<PostboardError>() {
            Ok(inner) => return inner,
            Err(err) => err,
        };
        if let Some(rusqlite::Error::SqliteFailure(failure, message)) =
            err.downcast_ref::<rusqlite::Error>()
        {
            if failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                || failure.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
            {
                return PostboardError::Conflict(
                    message
                        .clone()
                        .unwrap_or_else(|| "unique constraint violated".into()),
                );
            }
        }
        PostboardError::Internal(err)
    }
}

/// Runs `op`, repeating it once if the first attempt lost a write race.
pub fn retry_on_conflict<T>(mut op: impl FnMut() -> PostboardResult<T>) -> PostboardResult<T> {
    match op() {
        Err(err) if err.is_conflict() => {
            tracing::debug!(error = %err, "retrying after write conflict");
            op()
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn deny_reasons_render_stable_codes() {
        assert_eq!(DenyReason::Role.to_string(), "Forbidden: role");
        assert_eq!(DenyReason::NotOwner.to_string(), "Forbidden: not-owner");
        assert_eq!(
            PostboardError::Forbidden(DenyReason::NotOwner).to_string(),
            "Forbidden: not-owner"
        );
    }

    #[test]
    fn unique_violation_maps_to_conflict() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (k TEXT UNIQUE); INSERT INTO t VALUES ('a');")
            .unwrap();
        let err = conn
            .execute("INSERT INTO t VALUES ('a')", [])
            .map_err(anyhow::Error::from)
            .unwrap_err();
        assert!(PostboardError::from(err).is_conflict());
    }

    #[test]
    fn core_errors_survive_a_trip_through_anyhow() {
        let wrapped = anyhow::Error::from(PostboardError::ParentNotFound(3));
        assert!(matches!(
            PostboardError::from(wrapped),
            PostboardError::ParentNotFound(3)
        ));
    }

    #[test]
    fn conflicts_are_retried_exactly_once() {
        let mut attempts = 0;
        let result: PostboardResult<()> = retry_on_conflict(|| {
            attempts += 1;
            Err(PostboardError::Conflict("race".into()))
        });
        assert!(result.unwrap_err().is_conflict());
        assert_eq!(attempts, 2);

        let mut attempts = 0;
        let result = retry_on_conflict(|| {
            attempts += 1;
            if attempts == 1 {
                Err(PostboardError::Conflict("race".into()))
            } else {
                Ok(attempts)
            }
        });
        assert_eq!(result.unwrap(), 2);
    }

    #[test]
    fn other_store_errors_stay_internal() {
        let err = anyhow::anyhow!("disk on fire");
        assert!(matches!(PostboardError::from(err), PostboardError::Internal(_)));
    }
}
