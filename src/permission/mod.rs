//! Club-scoped authorization.
//!
//! Every decision is a pure function of one user's membership in one club.
//! The membership row is loaded once per request into a [`ClubAccess`] and
//! then asked about each [`Action`] the request wants to perform.

use crate::club::ClubError;
use crate::orm::members;
use sea_orm::{entity::*, query::*, ConnectionTrait, DbErr};

pub use crate::orm::members::Role;

/// Something a user may attempt against a club.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// See the club page and its polls.
    ViewClub,
    /// Become a member.
    JoinClub,
    EditClub,
    CreatePoll,
    /// Cast a vote in one of the club's polls.
    VotePoll,
    ManageRoles,
    UpdateRole,
    /// Remove a membership. The target's role and user id decide whether an
    /// admin is removing themself or somebody else.
    RemoveMember { target_role: Role, target_user_id: i32 },
    ViewProposals,
    CreateProposal,
    VoteProposal,
    RetractProposalVote,
    /// Delete a proposal created by `creator_id`.
    DeleteProposal { creator_id: i32 },
}

impl Action {
    /// Notice shown when the action is refused.
    pub fn denial(&self) -> &'static str {
        match self {
            Action::ViewClub => "You must be a member to view this club.",
            Action::JoinClub => "You are already a member of this club.",
            Action::EditClub => "Only club admins can edit this club.",
            Action::CreatePoll => "Only club admins can create polls.",
            Action::VotePoll => "You must be logged in to vote.",
            Action::ManageRoles => "Only club admins can manage roles.",
            Action::UpdateRole => "Only club admins can update roles.",
            Action::RemoveMember { target_role, .. } => {
                if *target_role == Role::Admin {
                    "You cannot remove other admins from the club."
                } else {
                    "Only club admins can remove members."
                }
            }
            Action::ViewProposals => "You must be a member to view proposals.",
            Action::CreateProposal => "You must be a member to create proposals.",
            Action::VoteProposal => "You must be a member to vote on proposals.",
            Action::RetractProposalVote => "You must be a member to withdraw a proposal vote.",
            Action::DeleteProposal { .. } => "You do not have permission to delete this proposal.",
        }
    }
}

/// Membership state of one user (or a guest) in one club.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClubAccess {
    /// None is a guest.
    pub user_id: Option<i32>,
    /// None when the user is not a member.
    pub role: Option<Role>,
}

impl ClubAccess {
    pub fn new(user_id: Option<i32>, role: Option<Role>) -> Self {
        Self {
            user_id,
            // Guests never hold a role.
            role: user_id.and(role),
        }
    }

    pub fn guest() -> Self {
        Self::default()
    }

    /// Reads the membership of `user_id` in `club_id`.
    pub async fn load<C>(db: &C, user_id: Option<i32>, club_id: i32) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let user_id = match user_id {
            Some(id) => id,
            None => return Ok(Self::guest()),
        };

        let membership = members::Entity::find()
            .filter(members::Column::ClubId.eq(club_id))
            .filter(members::Column::UserId.eq(user_id))
            .one(db)
            .await?;

        Ok(Self::new(Some(user_id), membership.map(|m| m.role)))
    }

    pub fn is_user(&self) -> bool {
        self.user_id.is_some()
    }

    pub fn is_member(&self) -> bool {
        self.role.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.role == Some(Role::Admin)
    }

    /// Decides whether this user may perform `action` in the club.
    pub fn can(&self, action: &Action) -> bool {
        let user_id = match self.user_id {
            Some(id) => id,
            None => return false,
        };

        match action {
            Action::JoinClub => !self.is_member(),
            Action::VotePoll => true,
            Action::ViewClub
            | Action::ViewProposals
            | Action::CreateProposal
            | Action::VoteProposal
            | Action::RetractProposalVote => self.is_member(),
            Action::EditClub | Action::CreatePoll | Action::ManageRoles | Action::UpdateRole => {
                self.is_admin()
            }
            Action::RemoveMember {
                target_role,
                target_user_id,
            } => self.is_admin() && (*target_role != Role::Admin || *target_user_id == user_id),
            Action::DeleteProposal { creator_id } => *creator_id == user_id || self.is_admin(),
        }
    }

    /// Like [`ClubAccess::can`], but produces the refusal as an error.
    pub fn require(&self, action: &Action) -> Result<(), ClubError> {
        if self.can(action) {
            Ok(())
        } else {
            Err(ClubError::PermissionDenied(action.denial()))
        }
    }
}
