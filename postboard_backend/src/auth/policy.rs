//! Authorization decisions.
//!
//! One rule covers every resource type: an actor satisfies a requirement if
//! their role is in the requirement's role set, or, for ownership
//! requirements, if they are the resource's owner. Callers resolve the
//! resource (and answer `NotFound`) before asking.
//!
//! Read access is shared and lives here too: ACTIVE resources are readable by
//! everyone, INACTIVE ones only by their owner or an ADMIN.

use super::{Actor, Role};
use crate::database::models::{Status, Visibility};
use crate::error::{DenyReason, PostboardError, PostboardResult};

pub const ADMIN_ONLY: &[Role] = &[Role::Admin];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Allowed iff the actor's role is in the set.
    AnyRole(&'static [Role]),
    /// Allowed iff the actor owns the resource or their role is in the set.
    OwnerOrRole {
        owner_id: i64,
        any_of: &'static [Role],
    },
}

impl Requirement {
    pub fn admin() -> Self {
        Requirement::AnyRole(ADMIN_ONLY)
    }

    /// "Author or ADMIN", the gate on post and comment mutation.
    pub fn owner_or_admin(owner_id: i64) -> Self {
        Requirement::OwnerOrRole {
            owner_id,
            any_of: ADMIN_ONLY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }
}

pub fn authorize(actor: &Actor, requirement: &Requirement) -> Decision {
    match *requirement {
        Requirement::AnyRole(any_of) => {
            if any_of.contains(&actor.role) {
                Decision::Allowed
            } else {
                Decision::Denied(DenyReason::Role)
            }
        }
        Requirement::OwnerOrRole { owner_id, any_of } => {
            if any_of.contains(&actor.role) || actor.id == owner_id {
                Decision::Allowed
            } else {
                Decision::Denied(DenyReason::NotOwner)
            }
        }
    }
}

/// [`authorize`], turning a denial into `PostboardError::Forbidden`.
pub fn enforce(actor: &Actor, requirement: &Requirement) -> PostboardResult<()> {
    match authorize(actor, requirement) {
        Decision::Allowed => Ok(()),
        Decision::Denied(reason) => {
            tracing::info!(
                actor_id = actor.id,
                role = %actor.role,
                reason = reason.code(),
                "authorization denied"
            );
            Err(PostboardError::Forbidden(reason))
        }
    }
}

pub fn can_read(actor: &Actor, owner_id: i64, status: Status) -> bool {
    status == Status::Active || actor.is_admin() || actor.id == owner_id
}

/// Listing filter equivalent to [`can_read`].
pub fn visibility_for(actor: &Actor) -> Visibility {
    if actor.is_admin() {
        Visibility::All
    } else {
        Visibility::ActiveOrAuthoredBy(actor.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: i64 = 7;

    #[test]
    fn ownership_rule_allows_exactly_owner_or_admin() {
        let requirement = Requirement::owner_or_admin(OWNER);
        let cases = [
            (Actor::new(OWNER, Role::User), true),
            (Actor::new(OWNER, Role::Admin), true),
            (Actor::new(8, Role::Admin), true),
            (Actor::new(8, Role::User), false),
        ];
        for (actor, expected) in cases {
            assert_eq!(
                authorize(&actor, &requirement).is_allowed(),
                expected,
                "actor {actor:?}"
            );
        }
    }

    #[test]
    fn non_owner_denial_carries_not_owner_reason() {
        let decision = authorize(&Actor::new(1, Role::User), &Requirement::owner_or_admin(2));
        assert_eq!(decision, Decision::Denied(DenyReason::NotOwner));
    }

    #[test]
    fn role_requirement_ignores_ownership() {
        let requirement = Requirement::admin();
        assert_eq!(
            authorize(&Actor::new(1, Role::User), &requirement),
            Decision::Denied(DenyReason::Role)
        );
        assert!(authorize(&Actor::new(1, Role::Admin), &requirement).is_allowed());
    }

    #[test]
    fn multi_role_sets_are_honoured() {
        const EVERYONE: &[Role] = &[Role::User, Role::Admin];
        assert!(authorize(&Actor::new(3, Role::User), &Requirement::AnyRole(EVERYONE)).is_allowed());
    }

    #[test]
    fn inactive_resources_are_readable_by_owner_and_admin_only() {
        let owner = Actor::new(OWNER, Role::User);
        let stranger = Actor::new(8, Role::User);
        let admin = Actor::new(9, Role::Admin);

        assert!(can_read(&stranger, OWNER, Status::Active));
        assert!(!can_read(&stranger, OWNER, Status::Inactive));
        assert!(can_read(&owner, OWNER, Status::Inactive));
        assert!(can_read(&admin, OWNER, Status::Inactive));

        assert_eq!(visibility_for(&admin), Visibility::All);
        assert_eq!(visibility_for(&stranger), Visibility::ActiveOrAuthoredBy(8));
    }

    #[test]
    fn enforce_maps_denial_to_forbidden() {
        let err = enforce(&Actor::new(1, Role::User), &Requirement::admin()).unwrap_err();
        assert!(matches!(err, PostboardError::Forbidden(DenyReason::Role)));
    }
}
