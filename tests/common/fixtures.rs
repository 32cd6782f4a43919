//! Test fixtures for creating test data
#![allow(dead_code)]

use chrono::{Duration, Utc};
use clubhouse::orm::{clubs, members, poll_options, polls, proposals, users};
use clubhouse::permission::Role;
use sea_orm::{entity::*, ActiveValue::Set, DatabaseConnection, DbErr};

/// Create a test user. The password hash is a placeholder; these users never log in.
pub async fn create_test_user(db: &DatabaseConnection, name: &str) -> Result<users::Model, DbErr> {
    users::ActiveModel {
        name: Set(name.to_owned()),
        password: Set("not-a-real-hash".to_owned()),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Create a club owned by `creator_id` without making anyone a member.
pub async fn create_test_club(
    db: &DatabaseConnection,
    creator_id: i32,
    name: &str,
    description: &str,
) -> Result<clubs::Model, DbErr> {
    clubs::ActiveModel {
        name: Set(name.to_owned()),
        description: Set(description.to_owned()),
        logo_url: Set(None),
        creator_id: Set(creator_id),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn add_test_member(
    db: &DatabaseConnection,
    club_id: i32,
    user_id: i32,
    role: Role,
) -> Result<members::Model, DbErr> {
    members::ActiveModel {
        user_id: Set(user_id),
        club_id: Set(club_id),
        role: Set(role),
        joined_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Create a poll ending `ends_in` from now (negative for an ended poll),
/// with one option per entry of `options`.
pub async fn create_test_poll(
    db: &DatabaseConnection,
    club_id: i32,
    created_by: i32,
    ends_in: Duration,
    options: &[&str],
) -> Result<(polls::Model, Vec<poll_options::Model>), DbErr> {
    let now = Utc::now().naive_utc();
    let poll = polls::ActiveModel {
        club_id: Set(club_id),
        title: Set("Test poll".to_owned()),
        description: Set(String::new()),
        created_by: Set(created_by),
        created_at: Set(now),
        ends_at: Set(now + ends_in),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let mut created = Vec::with_capacity(options.len());
    for (position, text) in options.iter().enumerate() {
        created.push(
            poll_options::ActiveModel {
                poll_id: Set(poll.id),
                text: Set((*text).to_owned()),
                position: Set(position as i32),
                ..Default::default()
            }
            .insert(db)
            .await?,
        );
    }

    Ok((poll, created))
}

pub async fn create_test_proposal(
    db: &DatabaseConnection,
    club_id: i32,
    created_by: i32,
    title: &str,
) -> Result<proposals::Model, DbErr> {
    proposals::ActiveModel {
        club_id: Set(club_id),
        title: Set(title.to_owned()),
        description: Set(String::new()),
        created_by: Set(created_by),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}
