use super::{Principal, Role};

/// Write-time rule violation, carrying the reason shown to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0}")]
    InvalidAssignment(&'static str),
}

/// Cross-field rule for task assignment: an assigner may only hand tasks to
/// roles below its own management ceiling.
///
/// Applies only when a candidate is actually provided; an unassigned task is
/// always valid. SuperAdmin is unconstrained, and the User role carries no
/// rule here because the administrative surface already stops it at the
/// module gate.
pub fn validate_assignment(
    assigner: &Principal,
    candidate: Option<&Principal>,
) -> Result<(), ValidationError> {
    let Some(candidate) = candidate else {
        return Ok(());
    };

    match assigner.role {
        Role::Admin if !matches!(candidate.role, Role::SuperUser | Role::User) => Err(
            ValidationError::InvalidAssignment(
                "Admins can only assign tasks to Super Users or Users",
            ),
        ),
        Role::SuperUser if candidate.role != Role::User => Err(
            ValidationError::InvalidAssignment("Super Users can only assign tasks to Users"),
        ),
        _ => Ok(()),
    }
}
