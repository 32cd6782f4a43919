//! Club lifecycle and membership operations.
//!
//! Every operation takes the connection and the acting user explicitly; the
//! HTTP layer is responsible for resolving both.

pub mod error;
pub mod summary;
pub mod voting;

pub use error::ClubError;
pub use voting::{
    cast_poll_vote, cast_proposal_vote, delete_proposal, proposal_vote_count, remove_member,
    retract_proposal_vote, Retraction,
};

use crate::db::is_unique_violation;
use crate::orm::{clubs, members, poll_options, polls, proposals};
use crate::permission::{Action, ClubAccess, Role};
use chrono::{NaiveDateTime, Utc};
use sea_orm::{
    entity::*, query::*, ActiveValue::Set, ConnectionTrait, DatabaseConnection, DbErr,
    TransactionTrait,
};

/// Fields of a club a user submits when creating or editing it.
#[derive(Clone, Debug, Default)]
pub struct ClubDetails {
    pub name: String,
    pub description: String,
    /// None means the club has no logo; editing with None clears it.
    pub logo_url: Option<String>,
}

#[derive(Clone, Debug)]
pub struct NewPoll {
    pub title: String,
    pub description: String,
    pub ends_at: NaiveDateTime,
    /// Option texts in display order.
    pub options: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct NewProposal {
    pub title: String,
    pub description: String,
}

/// Outcome of a join request.
#[derive(Clone, Debug, PartialEq)]
pub enum JoinOutcome {
    Joined(members::Model),
    AlreadyMember,
}

pub async fn find_club<C>(db: &C, club_id: i32) -> Result<clubs::Model, ClubError>
where
    C: ConnectionTrait,
{
    clubs::Entity::find_by_id(club_id)
        .one(db)
        .await?
        .ok_or(ClubError::NotFound("Club"))
}

/// All clubs, used as the candidate pool for search.
pub async fn all_clubs<C>(db: &C) -> Result<Vec<clubs::Model>, DbErr>
where
    C: ConnectionTrait,
{
    clubs::Entity::find()
        .order_by_asc(clubs::Column::Name)
        .all(db)
        .await
}

/// Clubs `user_id` belongs to, by name and then newest first.
pub async fn clubs_for_user<C>(db: &C, user_id: i32) -> Result<Vec<clubs::Model>, DbErr>
where
    C: ConnectionTrait,
{
    clubs::Entity::find()
        .inner_join(members::Entity)
        .filter(members::Column::UserId.eq(user_id))
        .order_by_asc(clubs::Column::Name)
        .order_by_desc(clubs::Column::CreatedAt)
        .all(db)
        .await
}

/// Creates a club and makes its creator the first admin.
pub async fn create_club(
    db: &DatabaseConnection,
    creator_id: i32,
    details: ClubDetails,
) -> Result<clubs::Model, ClubError> {
    let now = Utc::now().naive_utc();
    let txn = db.begin().await?;

    let club = clubs::ActiveModel {
        name: Set(details.name),
        description: Set(details.description),
        logo_url: Set(details.logo_url),
        creator_id: Set(creator_id),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    members::ActiveModel {
        user_id: Set(creator_id),
        club_id: Set(club.id),
        role: Set(Role::Admin),
        joined_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    log::info!("User {} created club {} ({})", creator_id, club.id, club.name);

    Ok(club)
}

/// Applies edits to a club. Admins only. The creator never changes.
pub async fn update_club<C>(
    db: &C,
    club_id: i32,
    requester_id: i32,
    details: ClubDetails,
) -> Result<clubs::Model, ClubError>
where
    C: ConnectionTrait,
{
    let club = find_club(db, club_id).await?;
    ClubAccess::load(db, Some(requester_id), club.id)
        .await?
        .require(&Action::EditClub)?;

    let mut active: clubs::ActiveModel = club.into();
    active.name = Set(details.name);
    active.description = Set(details.description);
    active.logo_url = Set(details.logo_url);

    Ok(active.update(db).await?)
}

/// Adds `user_id` to a club as a plain member.
pub async fn join_club<C>(db: &C, club_id: i32, user_id: i32) -> Result<JoinOutcome, ClubError>
where
    C: ConnectionTrait,
{
    let club = find_club(db, club_id).await?;
    let access = ClubAccess::load(db, Some(user_id), club.id).await?;
    if !access.can(&Action::JoinClub) {
        return Ok(JoinOutcome::AlreadyMember);
    }

    let inserted = members::ActiveModel {
        user_id: Set(user_id),
        club_id: Set(club.id),
        role: Set(Role::default()),
        joined_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await;

    match inserted {
        Ok(member) => Ok(JoinOutcome::Joined(member)),
        Err(e) if is_unique_violation(&e) => Ok(JoinOutcome::AlreadyMember),
        Err(e) => Err(e.into()),
    }
}

/// Creates a poll with its options. Admins only.
pub async fn create_poll(
    db: &DatabaseConnection,
    club_id: i32,
    requester_id: i32,
    new_poll: NewPoll,
) -> Result<polls::Model, ClubError> {
    let club = find_club(db, club_id).await?;
    ClubAccess::load(db, Some(requester_id), club.id)
        .await?
        .require(&Action::CreatePoll)?;

    let txn = db.begin().await?;

    let poll = polls::ActiveModel {
        club_id: Set(club.id),
        title: Set(new_poll.title),
        description: Set(new_poll.description),
        created_by: Set(requester_id),
        created_at: Set(Utc::now().naive_utc()),
        ends_at: Set(new_poll.ends_at),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    for (position, text) in new_poll.options.into_iter().enumerate() {
        poll_options::ActiveModel {
            poll_id: Set(poll.id),
            text: Set(text),
            position: Set(position as i32),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;

    Ok(poll)
}

/// Creates a proposal. Members only.
pub async fn create_proposal<C>(
    db: &C,
    club_id: i32,
    requester_id: i32,
    new_proposal: NewProposal,
) -> Result<proposals::Model, ClubError>
where
    C: ConnectionTrait,
{
    let club = find_club(db, club_id).await?;
    ClubAccess::load(db, Some(requester_id), club.id)
        .await?
        .require(&Action::CreateProposal)?;

    Ok(proposals::ActiveModel {
        club_id: Set(club.id),
        title: Set(new_proposal.title),
        description: Set(new_proposal.description),
        created_by: Set(requester_id),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

/// Changes a member's role. Admins only.
///
/// The role arrives already parsed; an unrecognised role string is rejected
/// with `ClubError::InvalidRole` when it is parsed.
pub async fn update_member_role<C>(
    db: &C,
    club_id: i32,
    requester_id: i32,
    member_id: i32,
    role: Role,
) -> Result<members::Model, ClubError>
where
    C: ConnectionTrait,
{
    let member = members::Entity::find_by_id(member_id)
        .filter(members::Column::ClubId.eq(club_id))
        .one(db)
        .await?
        .ok_or(ClubError::NotFound("Member"))?;

    ClubAccess::load(db, Some(requester_id), club_id)
        .await?
        .require(&Action::UpdateRole)?;

    let mut active: members::ActiveModel = member.into();
    active.role = Set(role);
    Ok(active.update(db).await?)
}
