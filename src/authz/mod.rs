//! Authorization core - role hierarchy, policy engine, assignment rules
//!
//! Pure decision logic over (principal, surface, operation, entity snapshot).
//! Nothing in here touches the database or the HTTP layer: handlers resolve a
//! [`Principal`], ask the [`PolicyEngine`] for a [`Decision`] or a visibility
//! filter, and apply the answer to their own I/O. Every function fails closed
//! when the principal is absent or inactive.

mod engine;
mod principal;
mod role;
mod validation;

pub use engine::{
    PolicyEngine, ProjectFilter, ProjectRef, ReportFilter, ReportRef, Snapshot, TaskFilter,
    TaskRef, UserFilter,
};
pub use principal::Principal;
pub use role::Role;
pub use validation::{validate_assignment, ValidationError};

/// The access surface a request arrives through.
///
/// The administrative surface gates whole modules by role before any
/// entity-level rule; the API surface admits every authenticated principal
/// and relies on visibility filters. The two intentionally disagree about
/// the User role on projects, so every surface-sensitive decision takes
/// this parameter instead of duplicating the logic per call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Admin,
    Api,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn from_bool(allowed: bool) -> Self {
        if allowed {
            Decision::Allow
        } else {
            Decision::Deny
        }
    }

    pub fn is_allow(self) -> bool {
        matches!(self, Decision::Allow)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    View,
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    User,
    Project,
    Task,
    Report,
}
