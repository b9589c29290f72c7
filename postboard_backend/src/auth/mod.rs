//! Identity and access control: who is acting, and may they act.
//!
//! Every request is resolved to an [`Actor`] by the [`ClaimVerifier`]; the
//! [`policy`] module then decides whether that actor satisfies a
//! [`Requirement`] before anything is mutated.

mod claims;
pub mod password;
pub mod policy;

pub use claims::{ClaimVerifier, Claims};
pub use policy::{authorize, can_read, enforce, visibility_for, Decision, Requirement};

pub use crate::database::models::Role;
use serde::Serialize;

/// Identity extracted from a verified credential, valid for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub id: i64,
    pub role: Role,
}

impl Actor {
    pub fn new(id: i64, role: Role) -> Self {
        Self { id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
