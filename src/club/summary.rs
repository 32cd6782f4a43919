//! Read models assembled for club pages.

use crate::orm::{members, poll_options, poll_votes, polls, proposal_votes, proposals, users};
use chrono::NaiveDateTime;
use sea_orm::{entity::*, query::*, ConnectionTrait, DbErr};
use std::collections::{HashMap, HashSet};

/// A membership with the member's display name.
#[derive(Clone, Debug)]
pub struct MemberRow {
    pub member: members::Model,
    pub name: String,
}

#[derive(Clone, Debug)]
pub struct OptionTally {
    pub option: poll_options::Model,
    pub votes: usize,
}

/// A poll with per-option counts and the viewer's own choice.
#[derive(Clone, Debug)]
pub struct PollSummary {
    pub poll: polls::Model,
    pub options: Vec<OptionTally>,
    pub total_votes: usize,
    /// Option the viewer picked, if they voted.
    pub viewer_choice: Option<i32>,
}

impl PollSummary {
    pub fn has_voted(&self) -> bool {
        self.viewer_choice.is_some()
    }

    pub fn is_viewer_choice(&self, tally: &OptionTally) -> bool {
        self.viewer_choice == Some(tally.option.id)
    }
}

#[derive(Clone, Debug)]
pub struct ProposalSummary {
    pub proposal: proposals::Model,
    pub author: String,
    pub votes: usize,
    pub viewer_voted: bool,
}

/// Club roster, oldest membership first.
pub async fn list_members<C>(db: &C, club_id: i32) -> Result<Vec<MemberRow>, DbErr>
where
    C: ConnectionTrait,
{
    let rows = members::Entity::find()
        .filter(members::Column::ClubId.eq(club_id))
        .order_by_asc(members::Column::JoinedAt)
        .find_also_related(users::Entity)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(member, user)| MemberRow {
            name: user.map(|u| u.name).unwrap_or_default(),
            member,
        })
        .collect())
}

/// Polls of a club still open at `now`, soonest ending first.
pub async fn active_polls<C>(
    db: &C,
    club_id: i32,
    viewer_id: i32,
    now: NaiveDateTime,
) -> Result<Vec<PollSummary>, DbErr>
where
    C: ConnectionTrait,
{
    let polls = polls::Entity::find()
        .filter(polls::Column::ClubId.eq(club_id))
        .filter(polls::Column::EndsAt.gte(now))
        .order_by_asc(polls::Column::EndsAt)
        .all(db)
        .await?;

    if polls.is_empty() {
        return Ok(Vec::new());
    }

    let poll_ids: Vec<i32> = polls.iter().map(|p| p.id).collect();

    let options = poll_options::Entity::find()
        .filter(poll_options::Column::PollId.is_in(poll_ids.clone()))
        .order_by_asc(poll_options::Column::Position)
        .all(db)
        .await?;

    let votes = poll_votes::Entity::find()
        .filter(poll_votes::Column::PollId.is_in(poll_ids))
        .all(db)
        .await?;

    let mut per_option: HashMap<i32, usize> = HashMap::new();
    let mut viewer_choices: HashMap<i32, i32> = HashMap::new();
    for vote in &votes {
        *per_option.entry(vote.option_id).or_default() += 1;
        if vote.user_id == viewer_id {
            viewer_choices.insert(vote.poll_id, vote.option_id);
        }
    }

    let mut options_by_poll: HashMap<i32, Vec<OptionTally>> = HashMap::new();
    for option in options {
        let votes = per_option.get(&option.id).copied().unwrap_or(0);
        options_by_poll
            .entry(option.poll_id)
            .or_default()
            .push(OptionTally { option, votes });
    }

    Ok(polls
        .into_iter()
        .map(|poll| {
            let options = options_by_poll.remove(&poll.id).unwrap_or_default();
            let total_votes = options.iter().map(|o| o.votes).sum();
            PollSummary {
                viewer_choice: viewer_choices.get(&poll.id).copied(),
                poll,
                options,
                total_votes,
            }
        })
        .collect())
}

/// Proposals of a club, newest first, with vote counts.
pub async fn list_proposals<C>(
    db: &C,
    club_id: i32,
    viewer_id: i32,
) -> Result<Vec<ProposalSummary>, DbErr>
where
    C: ConnectionTrait,
{
    let rows = proposals::Entity::find()
        .filter(proposals::Column::ClubId.eq(club_id))
        .order_by_desc(proposals::Column::CreatedAt)
        .find_also_related(users::Entity)
        .all(db)
        .await?;

    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let proposal_ids: Vec<i32> = rows.iter().map(|(p, _)| p.id).collect();
    let votes = proposal_votes::Entity::find()
        .filter(proposal_votes::Column::ProposalId.is_in(proposal_ids))
        .all(db)
        .await?;

    let mut counts: HashMap<i32, usize> = HashMap::new();
    let mut viewer_votes: HashSet<i32> = HashSet::new();
    for vote in &votes {
        *counts.entry(vote.proposal_id).or_default() += 1;
        if vote.user_id == viewer_id {
            viewer_votes.insert(vote.proposal_id);
        }
    }

    Ok(rows
        .into_iter()
        .map(|(proposal, author)| ProposalSummary {
            votes: counts.get(&proposal.id).copied().unwrap_or(0),
            viewer_voted: viewer_votes.contains(&proposal.id),
            author: author.map(|u| u.name).unwrap_or_default(),
            proposal,
        })
        .collect())
}
