use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The four account roles, strictly ranked SuperAdmin > Admin > SuperUser > User.
///
/// The ordering is informational: every access rule in this module compares
/// roles by explicit set membership, not by rank. The rules are asymmetric
/// (an assigned SuperUser may modify a project it can never delete), so a
/// numeric lattice would encode the wrong model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Admin,
    SuperUser,
    User,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::SuperAdmin, Role::Admin, Role::SuperUser, Role::User];

    /// Display rank, highest first. Not consulted by any access rule.
    pub fn rank(self) -> u8 {
        match self {
            Role::SuperAdmin => 3,
            Role::Admin => 2,
            Role::SuperUser => 1,
            Role::User => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Admin => "admin",
            Role::SuperUser => "super_user",
            Role::User => "user",
        }
    }

    pub fn parse(value: &str) -> Option<Role> {
        match value {
            "super_admin" => Some(Role::SuperAdmin),
            "admin" => Some(Role::Admin),
            "super_user" => Some(Role::SuperUser),
            "user" => Some(Role::User),
            _ => None,
        }
    }

    /// Roles this role may set on a managed account.
    pub fn assignable_roles(self) -> &'static [Role] {
        match self {
            Role::SuperAdmin => &[Role::SuperAdmin, Role::Admin, Role::SuperUser, Role::User],
            Role::Admin => &[Role::SuperUser, Role::User],
            Role::SuperUser => &[Role::User],
            Role::User => &[],
        }
    }

    pub fn can_assign(self, target: Role) -> bool {
        self.assignable_roles().contains(&target)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_round_trip() {
        for role in Role::ALL {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("root"), None);
    }

    #[test]
    fn assignable_roles_table() {
        assert_eq!(Role::SuperAdmin.assignable_roles(), Role::ALL);
        assert_eq!(Role::Admin.assignable_roles(), &[Role::SuperUser, Role::User]);
        assert_eq!(Role::SuperUser.assignable_roles(), &[Role::User]);
        assert!(Role::User.assignable_roles().is_empty());

        assert!(Role::Admin.can_assign(Role::User));
        assert!(!Role::Admin.can_assign(Role::Admin));
        assert!(!Role::SuperUser.can_assign(Role::SuperUser));
    }

    #[test]
    fn rank_is_strictly_ordered() {
        assert!(Role::SuperAdmin.rank() > Role::Admin.rank());
        assert!(Role::Admin.rank() > Role::SuperUser.rank());
        assert!(Role::SuperUser.rank() > Role::User.rank());
    }
}
