//! Vote casting and the cascades that keep votes consistent with
//! memberships and proposals.
//!
//! Uniqueness of (poll, user) and (proposal, user) is enforced by unique
//! indexes. The existence checks here only produce a friendlier error; a
//! concurrent insert that slips past them is still rejected by the store and
//! mapped to the same error.

use super::ClubError;
use crate::db::is_unique_violation;
use crate::orm::{members, poll_options, poll_votes, polls, proposal_votes, proposals};
use crate::permission::{Action, ClubAccess};
use chrono::NaiveDateTime;
use sea_orm::{
    entity::*, query::*, ActiveValue::Set, ConnectionTrait, DatabaseConnection, PaginatorTrait,
    TransactionTrait,
};

/// Outcome of withdrawing a proposal vote.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Retraction {
    Retracted,
    /// The user had no vote on the proposal.
    NothingToRetract,
}

/// Records `user_id`'s choice of `option_id` in a poll.
///
/// Poll votes are final; there is no way to change or withdraw one.
pub async fn cast_poll_vote<C>(
    db: &C,
    poll_id: i32,
    user_id: i32,
    option_id: i32,
    now: NaiveDateTime,
) -> Result<poll_votes::Model, ClubError>
where
    C: ConnectionTrait,
{
    let poll = polls::Entity::find_by_id(poll_id)
        .one(db)
        .await?
        .ok_or(ClubError::NotFound("Poll"))?;

    if !poll.is_active_at(now) {
        return Err(ClubError::PollClosed);
    }

    poll_options::Entity::find()
        .filter(poll_options::Column::Id.eq(option_id))
        .filter(poll_options::Column::PollId.eq(poll.id))
        .one(db)
        .await?
        .ok_or(ClubError::NotFound("Poll option"))?;

    let existing = poll_votes::Entity::find()
        .filter(poll_votes::Column::PollId.eq(poll.id))
        .filter(poll_votes::Column::UserId.eq(user_id))
        .one(db)
        .await?;

    if existing.is_some() {
        return Err(ClubError::DuplicateVote);
    }

    poll_votes::ActiveModel {
        poll_id: Set(poll.id),
        option_id: Set(option_id),
        user_id: Set(user_id),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ClubError::DuplicateVote
        } else {
            ClubError::Database(e)
        }
    })
}

/// Loads a proposal and the caller's access to its club.
async fn proposal_with_access<C>(
    db: &C,
    proposal_id: i32,
    user_id: i32,
) -> Result<(proposals::Model, ClubAccess), ClubError>
where
    C: ConnectionTrait,
{
    let proposal = proposals::Entity::find_by_id(proposal_id)
        .one(db)
        .await?
        .ok_or(ClubError::NotFound("Proposal"))?;
    let access = ClubAccess::load(db, Some(user_id), proposal.club_id).await?;
    Ok((proposal, access))
}

/// Adds `user_id`'s support to a proposal. Members only.
pub async fn cast_proposal_vote<C>(
    db: &C,
    proposal_id: i32,
    user_id: i32,
    now: NaiveDateTime,
) -> Result<proposal_votes::Model, ClubError>
where
    C: ConnectionTrait,
{
    let (proposal, access) = proposal_with_access(db, proposal_id, user_id).await?;
    access.require(&Action::VoteProposal)?;

    let existing = proposal_votes::Entity::find()
        .filter(proposal_votes::Column::ProposalId.eq(proposal.id))
        .filter(proposal_votes::Column::UserId.eq(user_id))
        .one(db)
        .await?;

    if existing.is_some() {
        return Err(ClubError::DuplicateProposalVote);
    }

    proposal_votes::ActiveModel {
        proposal_id: Set(proposal.id),
        user_id: Set(user_id),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ClubError::DuplicateProposalVote
        } else {
            ClubError::Database(e)
        }
    })
}

/// Withdraws `user_id`'s support from a proposal, if there is any. Members only.
pub async fn retract_proposal_vote<C>(
    db: &C,
    proposal_id: i32,
    user_id: i32,
) -> Result<Retraction, ClubError>
where
    C: ConnectionTrait,
{
    let (proposal, access) = proposal_with_access(db, proposal_id, user_id).await?;
    access.require(&Action::RetractProposalVote)?;

    let res = proposal_votes::Entity::delete_many()
        .filter(proposal_votes::Column::ProposalId.eq(proposal.id))
        .filter(proposal_votes::Column::UserId.eq(user_id))
        .exec(db)
        .await?;

    if res.rows_affected == 0 {
        Ok(Retraction::NothingToRetract)
    } else {
        Ok(Retraction::Retracted)
    }
}

/// Number of votes a proposal has received.
pub async fn proposal_vote_count<C>(db: &C, proposal_id: i32) -> Result<u64, ClubError>
where
    C: ConnectionTrait,
{
    let count = proposal_votes::Entity::find()
        .filter(proposal_votes::Column::ProposalId.eq(proposal_id))
        .count(db)
        .await?;
    Ok(count as u64)
}

/// Removes a membership together with everything the member contributed to
/// the club: their poll votes, their proposal votes, and the proposals they
/// authored (including other members' votes on those proposals).
///
/// All of it happens in one transaction. Returns the removed membership.
pub async fn remove_member(
    db: &DatabaseConnection,
    club_id: i32,
    requester_id: i32,
    member_id: i32,
) -> Result<members::Model, ClubError> {
    let member = members::Entity::find_by_id(member_id)
        .filter(members::Column::ClubId.eq(club_id))
        .one(db)
        .await?
        .ok_or(ClubError::NotFound("Member"))?;

    ClubAccess::load(db, Some(requester_id), club_id)
        .await?
        .require(&Action::RemoveMember {
            target_role: member.role,
            target_user_id: member.user_id,
        })?;

    let txn = db.begin().await?;

    let poll_ids: Vec<i32> = polls::Entity::find()
        .filter(polls::Column::ClubId.eq(club_id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|poll| poll.id)
        .collect();

    if !poll_ids.is_empty() {
        poll_votes::Entity::delete_many()
            .filter(poll_votes::Column::UserId.eq(member.user_id))
            .filter(poll_votes::Column::PollId.is_in(poll_ids))
            .exec(&txn)
            .await?;
    }

    let club_proposals = proposals::Entity::find()
        .filter(proposals::Column::ClubId.eq(club_id))
        .all(&txn)
        .await?;
    let proposal_ids: Vec<i32> = club_proposals.iter().map(|p| p.id).collect();
    let authored_ids: Vec<i32> = club_proposals
        .iter()
        .filter(|p| p.created_by == member.user_id)
        .map(|p| p.id)
        .collect();

    if !proposal_ids.is_empty() {
        proposal_votes::Entity::delete_many()
            .filter(proposal_votes::Column::UserId.eq(member.user_id))
            .filter(proposal_votes::Column::ProposalId.is_in(proposal_ids))
            .exec(&txn)
            .await?;
    }

    if !authored_ids.is_empty() {
        proposal_votes::Entity::delete_many()
            .filter(proposal_votes::Column::ProposalId.is_in(authored_ids.clone()))
            .exec(&txn)
            .await?;
        proposals::Entity::delete_many()
            .filter(proposals::Column::Id.is_in(authored_ids))
            .exec(&txn)
            .await?;
    }

    members::Entity::delete_many()
        .filter(members::Column::Id.eq(member.id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    log::info!(
        "Removed user {} from club {} (requested by {})",
        member.user_id,
        club_id,
        requester_id
    );

    Ok(member)
}

/// Deletes a proposal and its votes. Allowed for the proposal's creator and
/// the club's admins. Returns the deleted proposal.
pub async fn delete_proposal(
    db: &DatabaseConnection,
    proposal_id: i32,
    requester_id: i32,
) -> Result<proposals::Model, ClubError> {
    let (proposal, access) = proposal_with_access(db, proposal_id, requester_id).await?;
    access.require(&Action::DeleteProposal {
        creator_id: proposal.created_by,
    })?;

    let txn = db.begin().await?;

    proposal_votes::Entity::delete_many()
        .filter(proposal_votes::Column::ProposalId.eq(proposal.id))
        .exec(&txn)
        .await?;
    proposals::Entity::delete_many()
        .filter(proposals::Column::Id.eq(proposal.id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    Ok(proposal)
}
