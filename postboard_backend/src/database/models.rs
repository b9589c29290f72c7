use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} `{value}`")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Enums persisted as upper-case TEXT columns. Parsing is case-insensitive so
/// `like`, `Like` and `LIKE` are all accepted from clients.
macro_rules! text_enum {
    ($name:ident, $label:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                match raw.trim().to_ascii_uppercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(UnknownVariant {
                        kind: $label,
                        value: raw.to_string(),
                    }),
                }
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                let text = value.as_str()?;
                text.parse().map_err(|err| FromSqlError::Other(Box::new(err)))
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
}

text_enum!(Role, "role", { User => "USER", Admin => "ADMIN" });

/// Lifecycle flag shared by users, posts and comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Active,
    Inactive,
}

text_enum!(Status, "status", { Active => "ACTIVE", Inactive => "INACTIVE" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReactionKind {
    Like,
    Dislike,
}

text_enum!(ReactionKind, "reaction kind", { Like => "LIKE", Dislike => "DISLIKE" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TargetKind {
    Post,
    Comment,
}

text_enum!(TargetKind, "target kind", { Post => "POST", Comment => "COMMENT" });

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub login: String,
    pub email: String,
    pub full_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub status: Status,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub login: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub role: Role,
    pub status: Status,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordResetRecord {
    pub token: String,
    pub user_id: i64,
    pub expires_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: i64,
    pub author_id: i64,
    pub title: String,
    pub content: String,
    pub status: Status,
    pub publish_date: String,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub author_id: i64,
    pub title: String,
    pub content: String,
    pub status: Status,
    pub publish_date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: i64,
    pub post_id: i64,
    pub parent_comment_id: Option<i64>,
    pub author_id: i64,
    pub content: String,
    pub status: Status,
    pub publish_date: String,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: i64,
    pub parent_comment_id: Option<i64>,
    pub author_id: i64,
    pub content: String,
    pub publish_date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionRecord {
    pub id: i64,
    pub author_id: i64,
    pub target_kind: TargetKind,
    pub target_id: i64,
    pub kind: ReactionKind,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionTally {
    pub likes: i64,
    pub dislikes: i64,
}

/// Row filter applied to post and comment listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Every row regardless of status.
    All,
    /// ACTIVE rows plus the given author's own rows.
    ActiveOrAuthoredBy(i64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_enums_parse_case_insensitively() {
        assert_eq!("like".parse::<ReactionKind>().unwrap(), ReactionKind::Like);
        assert_eq!(" Dislike ".parse::<ReactionKind>().unwrap(), ReactionKind::Dislike);
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(Status::Inactive.to_string(), "INACTIVE");
    }

    #[test]
    fn unknown_variant_names_the_kind() {
        let err = "love".parse::<ReactionKind>().unwrap_err();
        assert_eq!(err.to_string(), "unknown reaction kind `love`");
    }
}
