//! Role to capability mapping.
//!
//! Views decide what to show from a [`Capabilities`] set, never from the role
//! directly.

use crate::types::{ClassroomRole, ClassroomUser, ClassroomUserStatus};

/// Something a classroom member may see or do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Capability {
    ViewDashboard,
    ViewAssignments,
    ViewStudents,
    ViewRubrics,
    ViewSettings,
    GradeWork,
    EditRubrics,
    InviteStudents,
    InviteStaff,
    ManageMembers,
    CreateClassroom,
}

impl Capability {
    const ALL: [Capability; 11] = [
        Capability::ViewDashboard,
        Capability::ViewAssignments,
        Capability::ViewStudents,
        Capability::ViewRubrics,
        Capability::ViewSettings,
        Capability::GradeWork,
        Capability::EditRubrics,
        Capability::InviteStudents,
        Capability::InviteStaff,
        Capability::ManageMembers,
        Capability::CreateClassroom,
    ];

    fn bit(self) -> u32 {
        1 << self as u32
    }
}

/// Set of capabilities granted to a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities(u32);

impl Capabilities {
    pub fn contains(self, cap: Capability) -> bool {
        self.0 & cap.bit() != 0
    }

    pub fn iter(self) -> impl Iterator<Item = Capability> {
        Capability::ALL.into_iter().filter(move |c| self.contains(*c))
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl FromIterator<Capability> for Capabilities {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Capabilities(iter.into_iter().fold(0, |acc, c| acc | c.bit()))
    }
}

/// Capabilities of `role`. Students get none of the staff views.
pub fn capabilities(role: ClassroomRole) -> Capabilities {
    use Capability::*;
    match role {
        ClassroomRole::Student => Capabilities::default(),
        ClassroomRole::Ta => [ViewDashboard, ViewAssignments, ViewStudents, ViewRubrics, GradeWork, InviteStudents]
            .into_iter()
            .collect(),
        ClassroomRole::Professor => Capability::ALL.into_iter().collect(),
    }
}

/// True when `role` ranks at least `required` (Student < TA < Professor).
pub fn require_at_least(role: ClassroomRole, required: ClassroomRole) -> bool {
    role >= required
}

/// A membership change offered on one roster row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberAction {
    /// Invite the user into the classroom (and its organization) with the
    /// role they requested.
    Invite,
    /// Turn down a join request.
    Deny,
    /// Withdraw a pending organization invitation.
    Revoke,
    /// Remove an active member.
    Remove,
}

impl MemberAction {
    pub fn label(self) -> &'static str {
        match self {
            MemberAction::Invite => "invite",
            MemberAction::Deny => "deny",
            MemberAction::Revoke => "revoke",
            MemberAction::Remove => "remove",
        }
    }
}

/// Actions a viewer with `caps` may take on `member`.
///
/// Only member managers get any, nobody acts on their own row, and rows of
/// staff (TA or above) also need [`Capability::InviteStaff`]. What is offered
/// follows the member's status: requests can be invited or denied, pending
/// organization invites revoked, active members removed.
pub fn member_actions(caps: Capabilities, viewer_id: Option<i64>, member: &ClassroomUser) -> Vec<MemberAction> {
    if !caps.contains(Capability::ManageMembers) || viewer_id == Some(member.id) {
        return Vec::new();
    }
    if require_at_least(member.classroom_role, ClassroomRole::Ta) && !caps.contains(Capability::InviteStaff) {
        return Vec::new();
    }
    match member.status {
        ClassroomUserStatus::Requested => vec![MemberAction::Invite, MemberAction::Deny],
        ClassroomUserStatus::NotInOrg => vec![MemberAction::Invite],
        ClassroomUserStatus::OrgInvited => vec![MemberAction::Revoke],
        ClassroomUserStatus::Active => vec![MemberAction::Remove],
        ClassroomUserStatus::Removed => Vec::new(),
    }
}

/// Capability needed to issue an invite token for `role`.
pub fn invite_capability(role: ClassroomRole) -> Capability {
    match role {
        ClassroomRole::Student => Capability::InviteStudents,
        ClassroomRole::Ta | ClassroomRole::Professor => Capability::InviteStaff,
    }
}
