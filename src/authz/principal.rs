use uuid::Uuid;

use super::Role;

/// The authenticated actor every decision is made for.
///
/// Resolved outside the core (token verification + account lookup); the
/// engine reads only the role and the active flag. An inactive principal is
/// treated exactly like an absent one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: Role,
    pub active: bool,
}

impl Principal {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role, active: true }
    }

    pub fn inactive(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role, active: false }
    }
}
