use uuid::Uuid;

use super::{Action, Decision, EntityKind, Principal, Role, Surface};

/// Owner fields of a project, as stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectRef {
    pub created_by: Uuid,
    pub assigned_to: Option<Uuid>,
}

/// Owner fields of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskRef {
    pub assigned_by: Uuid,
    pub assigned_to: Option<Uuid>,
}

/// Owner field of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportRef {
    pub author: Uuid,
}

/// Entity snapshot handed to [`PolicyEngine::authorize`] for targeted
/// actions. Carries only the fields the rules read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Snapshot {
    User { role: Role },
    Project(ProjectRef),
    Task(TaskRef),
    Report(ReportRef),
}

/// Visibility filter for account listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserFilter {
    All,
    Roles(&'static [Role]),
    Nothing,
}

impl UserFilter {
    pub fn permits(&self, role: Role) -> bool {
        match self {
            UserFilter::All => true,
            UserFilter::Roles(roles) => roles.contains(&role),
            UserFilter::Nothing => false,
        }
    }
}

/// Visibility filter for project listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectFilter {
    All,
    CreatedByOrAssignedTo(Uuid),
    AssignedTo(Uuid),
    Nothing,
}

impl ProjectFilter {
    pub fn permits(&self, project: ProjectRef) -> bool {
        match *self {
            ProjectFilter::All => true,
            ProjectFilter::CreatedByOrAssignedTo(id) => {
                project.created_by == id || project.assigned_to == Some(id)
            }
            ProjectFilter::AssignedTo(id) => project.assigned_to == Some(id),
            ProjectFilter::Nothing => false,
        }
    }
}

/// Visibility filter for task listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskFilter {
    All,
    AssignedByOrTo(Uuid),
    AssignedTo(Uuid),
    Nothing,
}

impl TaskFilter {
    pub fn permits(&self, task: TaskRef) -> bool {
        match *self {
            TaskFilter::All => true,
            TaskFilter::AssignedByOrTo(id) => {
                task.assigned_by == id || task.assigned_to == Some(id)
            }
            TaskFilter::AssignedTo(id) => task.assigned_to == Some(id),
            TaskFilter::Nothing => false,
        }
    }
}

/// Visibility filter for report listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFilter {
    All,
    AuthoredBy(Uuid),
    Nothing,
}

impl ReportFilter {
    pub fn permits(&self, report: ReportRef) -> bool {
        match *self {
            ReportFilter::All => true,
            ReportFilter::AuthoredBy(id) => report.author == id,
            ReportFilter::Nothing => false,
        }
    }
}

/// The policy engine: pure decision functions, one instance injected into
/// the application state and consulted identically by every surface.
///
/// Rules are written as explicit role-set matches. Visibility comes back as
/// filter values the repository translates into queries; mutation checks
/// take the freshest stored owner fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyEngine;

impl PolicyEngine {
    pub fn new() -> Self {
        Self
    }

    /// Absent and inactive principals are indistinguishable to every rule.
    fn actor<'a>(&self, principal: Option<&'a Principal>) -> Option<&'a Principal> {
        principal.filter(|p| p.active)
    }

    // ---- user management (administrative surface) ----

    pub fn user_filter(&self, principal: Option<&Principal>) -> UserFilter {
        match self.actor(principal) {
            Some(p) => match p.role {
                Role::SuperAdmin => UserFilter::All,
                Role::Admin => UserFilter::Roles(&[Role::SuperUser, Role::User]),
                Role::SuperUser => UserFilter::Roles(&[Role::User]),
                Role::User => UserFilter::Nothing,
            },
            None => UserFilter::Nothing,
        }
    }

    pub fn can_view_users(&self, principal: Option<&Principal>) -> Decision {
        Decision::from_bool(self.user_filter(principal) != UserFilter::Nothing)
    }

    /// Modify or delete a managed account. SuperAdmin always passes; Admin
    /// is stopped by SuperAdmin/Admin targets, SuperUser by anything above
    /// a plain User.
    pub fn can_manage_user(&self, principal: Option<&Principal>, target: Role) -> Decision {
        let Some(p) = self.actor(principal) else {
            return Decision::Deny;
        };
        let allowed = match p.role {
            Role::SuperAdmin => true,
            Role::Admin => !matches!(target, Role::SuperAdmin | Role::Admin),
            Role::SuperUser => matches!(target, Role::User),
            Role::User => false,
        };
        Decision::from_bool(allowed)
    }

    pub fn can_add_user(&self, principal: Option<&Principal>) -> Decision {
        let Some(p) = self.actor(principal) else {
            return Decision::Deny;
        };
        Decision::from_bool(matches!(
            p.role,
            Role::SuperAdmin | Role::Admin | Role::SuperUser
        ))
    }

    /// Roles the principal may set on a managed account; empty when the
    /// principal is absent or inactive.
    pub fn assignable_roles(&self, principal: Option<&Principal>) -> &'static [Role] {
        match self.actor(principal) {
            Some(p) => p.role.assignable_roles(),
            None => &[],
        }
    }

    // ---- module gates ----

    /// Coarse per-module check applied by the administrative surface before
    /// any entity-level rule. The API surface admits every active
    /// principal and scopes with visibility filters instead.
    pub fn can_access_module(
        &self,
        principal: Option<&Principal>,
        kind: EntityKind,
        surface: Surface,
    ) -> Decision {
        let Some(p) = self.actor(principal) else {
            return Decision::Deny;
        };
        let allowed = match (surface, kind) {
            (Surface::Api, _) | (Surface::Admin, EntityKind::User) => true,
            (Surface::Admin, _) => {
                matches!(p.role, Role::SuperAdmin | Role::Admin | Role::SuperUser)
            }
        };
        Decision::from_bool(allowed)
    }

    // ---- projects ----

    pub fn project_filter(&self, principal: Option<&Principal>, surface: Surface) -> ProjectFilter {
        let Some(p) = self.actor(principal) else {
            return ProjectFilter::Nothing;
        };
        match p.role {
            Role::SuperAdmin => ProjectFilter::All,
            Role::Admin => ProjectFilter::CreatedByOrAssignedTo(p.user_id),
            Role::SuperUser => ProjectFilter::AssignedTo(p.user_id),
            // The two surfaces diverge here: the administrative surface
            // shuts the User role out at the module gate, the API surface
            // falls through to the assigned-to scope.
            Role::User => match surface {
                Surface::Admin => ProjectFilter::Nothing,
                Surface::Api => ProjectFilter::AssignedTo(p.user_id),
            },
        }
    }

    pub fn can_create_project(&self, principal: Option<&Principal>) -> Decision {
        let Some(p) = self.actor(principal) else {
            return Decision::Deny;
        };
        Decision::from_bool(matches!(
            p.role,
            Role::SuperAdmin | Role::Admin | Role::SuperUser
        ))
    }

    pub fn can_modify_project(
        &self,
        principal: Option<&Principal>,
        project: ProjectRef,
    ) -> Decision {
        let Some(p) = self.actor(principal) else {
            return Decision::Deny;
        };
        let allowed = match p.role {
            Role::SuperAdmin => true,
            Role::Admin => project.created_by == p.user_id,
            Role::SuperUser => project.assigned_to == Some(p.user_id),
            Role::User => false,
        };
        Decision::from_bool(allowed)
    }

    /// Stricter than modify: an assigned SuperUser may edit a project but
    /// never delete it.
    pub fn can_delete_project(
        &self,
        principal: Option<&Principal>,
        project: ProjectRef,
    ) -> Decision {
        let Some(p) = self.actor(principal) else {
            return Decision::Deny;
        };
        let allowed = match p.role {
            Role::SuperAdmin => true,
            Role::Admin => project.created_by == p.user_id,
            Role::SuperUser | Role::User => false,
        };
        Decision::from_bool(allowed)
    }

    // ---- tasks ----

    pub fn task_filter(&self, principal: Option<&Principal>, surface: Surface) -> TaskFilter {
        let Some(p) = self.actor(principal) else {
            return TaskFilter::Nothing;
        };
        match p.role {
            Role::SuperAdmin => TaskFilter::All,
            Role::Admin | Role::SuperUser => TaskFilter::AssignedByOrTo(p.user_id),
            Role::User => match surface {
                Surface::Admin => TaskFilter::Nothing,
                Surface::Api => TaskFilter::AssignedTo(p.user_id),
            },
        }
    }

    pub fn can_create_task(&self, principal: Option<&Principal>, surface: Surface) -> Decision {
        self.can_access_module(principal, EntityKind::Task, surface)
    }

    /// Administrative task mutation is the module gate, deliberately coarser
    /// than the project rules; API mutation follows visibility.
    pub fn can_modify_task(
        &self,
        principal: Option<&Principal>,
        surface: Surface,
        task: TaskRef,
    ) -> Decision {
        match surface {
            Surface::Admin => self.can_access_module(principal, EntityKind::Task, surface),
            Surface::Api => {
                Decision::from_bool(self.task_filter(principal, surface).permits(task))
            }
        }
    }

    // ---- reports ----

    pub fn report_filter(&self, principal: Option<&Principal>, surface: Surface) -> ReportFilter {
        let Some(p) = self.actor(principal) else {
            return ReportFilter::Nothing;
        };
        match surface {
            Surface::Admin if !matches!(p.role, Role::SuperAdmin | Role::Admin | Role::SuperUser) => {
                ReportFilter::Nothing
            }
            _ => match p.role {
                Role::SuperAdmin => ReportFilter::All,
                _ => ReportFilter::AuthoredBy(p.user_id),
            },
        }
    }

    pub fn can_create_report(&self, principal: Option<&Principal>, surface: Surface) -> Decision {
        self.can_access_module(principal, EntityKind::Report, surface)
    }

    pub fn can_modify_report(
        &self,
        principal: Option<&Principal>,
        surface: Surface,
        report: ReportRef,
    ) -> Decision {
        match surface {
            Surface::Admin => self.can_access_module(principal, EntityKind::Report, surface),
            Surface::Api => {
                Decision::from_bool(self.report_filter(principal, surface).permits(report))
            }
        }
    }

    // ---- facade ----

    /// Single entry point for callers that want a yes/no answer. Targeted
    /// actions without a snapshot, and snapshots of the wrong kind, are
    /// denied: an absent target never grants anything.
    pub fn authorize(
        &self,
        principal: Option<&Principal>,
        surface: Surface,
        action: Action,
        entity: EntityKind,
        snapshot: Option<Snapshot>,
    ) -> Decision {
        let decision = self.authorize_inner(principal, surface, action, entity, snapshot);
        if !decision.is_allow() {
            tracing::debug!(
                actor = ?principal.map(|p| p.user_id),
                ?surface,
                ?action,
                ?entity,
                "authorization denied"
            );
        }
        decision
    }

    fn authorize_inner(
        &self,
        principal: Option<&Principal>,
        surface: Surface,
        action: Action,
        entity: EntityKind,
        snapshot: Option<Snapshot>,
    ) -> Decision {
        match (entity, action) {
            (EntityKind::User, Action::List) => self.can_view_users(principal),
            (EntityKind::User, Action::Create) => self.can_add_user(principal),
            (EntityKind::User, Action::View) => match snapshot {
                Some(Snapshot::User { role }) => {
                    Decision::from_bool(self.user_filter(principal).permits(role))
                }
                _ => Decision::Deny,
            },
            (EntityKind::User, Action::Update | Action::Delete) => match snapshot {
                Some(Snapshot::User { role }) => self.can_manage_user(principal, role),
                _ => Decision::Deny,
            },

            (EntityKind::Project, Action::List) => Decision::from_bool(
                self.project_filter(principal, surface) != ProjectFilter::Nothing,
            ),
            (EntityKind::Project, Action::Create) => self.can_create_project(principal),
            (EntityKind::Project, Action::View) => match snapshot {
                Some(Snapshot::Project(p)) => {
                    Decision::from_bool(self.project_filter(principal, surface).permits(p))
                }
                _ => Decision::Deny,
            },
            (EntityKind::Project, Action::Update) => match snapshot {
                Some(Snapshot::Project(p)) => self.can_modify_project(principal, p),
                _ => Decision::Deny,
            },
            (EntityKind::Project, Action::Delete) => match snapshot {
                Some(Snapshot::Project(p)) => self.can_delete_project(principal, p),
                _ => Decision::Deny,
            },

            (EntityKind::Task, Action::List) => {
                Decision::from_bool(self.task_filter(principal, surface) != TaskFilter::Nothing)
            }
            (EntityKind::Task, Action::Create) => self.can_create_task(principal, surface),
            (EntityKind::Task, Action::View) => match snapshot {
                Some(Snapshot::Task(t)) => {
                    Decision::from_bool(self.task_filter(principal, surface).permits(t))
                }
                _ => Decision::Deny,
            },
            (EntityKind::Task, Action::Update | Action::Delete) => match snapshot {
                Some(Snapshot::Task(t)) => self.can_modify_task(principal, surface, t),
                _ => Decision::Deny,
            },

            (EntityKind::Report, Action::List) => Decision::from_bool(
                self.report_filter(principal, surface) != ReportFilter::Nothing,
            ),
            (EntityKind::Report, Action::Create) => self.can_create_report(principal, surface),
            (EntityKind::Report, Action::View) => match snapshot {
                Some(Snapshot::Report(r)) => {
                    Decision::from_bool(self.report_filter(principal, surface).permits(r))
                }
                _ => Decision::Deny,
            },
            (EntityKind::Report, Action::Update | Action::Delete) => match snapshot {
                Some(Snapshot::Report(r)) => self.can_modify_report(principal, surface, r),
                _ => Decision::Deny,
            },
        }
    }
}
