use crate::accounts::{create_account, validate_email, validate_login, AccountInput};
use crate::auth::{enforce, Actor, Requirement, Role};
use crate::database::models::{TargetKind, UserRecord};
use crate::database::repositories::{
    CommentRepository, PostRepository, ReactionRepository, UserRepository,
};
use crate::database::Database;
use crate::error::{PostboardError, PostboardResult};
use crate::posts::required_field;
use serde::Deserialize;

#[derive(Clone)]
pub struct UserService {
    database: Database,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserInput {
    pub login: String,
    pub email: String,
    #[serde(alias = "fullName")]
    pub full_name: String,
    pub password: String,
    #[serde(alias = "passwordConfirmation")]
    pub password_confirmation: String,
    pub role: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProfileInput {
    #[serde(alias = "fullName")]
    pub full_name: String,
    pub email: String,
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateRoleInput {
    pub role: String,
}

impl UserService {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub fn list_users(&self) -> PostboardResult<Vec<UserRecord>> {
        Ok(self.database.with_repositories(|repos| repos.users().list())?)
    }

    pub fn get_user(&self, user_id: i64) -> PostboardResult<UserRecord> {
        self.database
            .with_repositories(|repos| repos.users().get(user_id))?
            .ok_or_else(|| PostboardError::not_found(format!("user {user_id}")))
    }

    /// Admin-provisioned account with an explicit role.
    pub fn create_user(&self, actor: &Actor, input: CreateUserInput) -> PostboardResult<UserRecord> {
        enforce(actor, &Requirement::admin())?;
        let role = parse_role(&input.role)?;
        create_account(
            &self.database,
            AccountInput {
                login: input.login,
                email: input.email,
                full_name: input.full_name,
                password: input.password,
                password_confirmation: input.password_confirmation,
            },
            role,
        )
    }

    pub fn update_self(
        &self,
        actor: &Actor,
        input: UpdateProfileInput,
    ) -> PostboardResult<UserRecord> {
        let mut user = self.get_user(actor.id)?;
        user.full_name = required_field("full name", &input.full_name)?;
        user.email = validate_email(&input.email)?;
        user.login = validate_login(&input.login)?;

        self.database.with_repositories(|repos| {
            repos
                .users()
                .update_profile(user.id, &user.full_name, &user.email, &user.login)
        })?;
        tracing::info!(user_id = user.id, "profile updated");
        Ok(user)
    }

    pub fn update_role(
        &self,
        actor: &Actor,
        user_id: i64,
        input: UpdateRoleInput,
    ) -> PostboardResult<UserRecord> {
        let mut user = self.get_user(user_id)?;
        enforce(actor, &Requirement::admin())?;
        user.role = parse_role(&input.role)?;

        self.database
            .with_repositories(|repos| repos.users().update_role(user_id, user.role))?;
        tracing::info!(user_id, actor_id = actor.id, role = %user.role, "role changed");
        Ok(user)
    }

    /// Removes the account together with everything it authored and every
    /// reaction attached to that content.
    pub fn delete_user(&self, actor: &Actor, user_id: i64) -> PostboardResult<()> {
        self.get_user(user_id)?;
        enforce(actor, &Requirement::admin())?;

        self.database.with_transaction(|repos| {
            let posts = repos.posts();
            let comments = repos.comments();
            let reactions = repos.reactions();

            let post_ids = posts.list_ids_by_author(user_id)?;
            for post_id in &post_ids {
                let on_post = comments.list_ids_for_post(*post_id)?;
                reactions.delete_for_targets(TargetKind::Comment, &on_post)?;
            }
            reactions.delete_for_targets(TargetKind::Post, &post_ids)?;
            for post_id in &post_ids {
                posts.delete(*post_id)?;
            }

            let comment_ids = comments.list_ids_by_author(user_id)?;
            reactions.delete_for_targets(TargetKind::Comment, &comment_ids)?;
            for comment_id in &comment_ids {
                comments.detach_replies(*comment_id)?;
                comments.delete(*comment_id)?;
            }

            reactions.delete_by_author(user_id)?;
            repos.users().delete(user_id)
        })?;
        tracing::info!(user_id, actor_id = actor.id, "user deleted");
        Ok(())
    }
}

fn parse_role(raw: &str) -> PostboardResult<Role> {
    raw.parse::<Role>()
        .map_err(|err| PostboardError::invalid(err.to_string()))
}
