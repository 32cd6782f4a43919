//! Integration tests for poll voting: one vote per user and poll, closed
//! polls refuse votes, options must belong to the poll.

mod common;

use chrono::{Duration, Utc};
use clubhouse::club::{cast_poll_vote, ClubError};
use clubhouse::orm::poll_votes;
use clubhouse::permission::Role;
use common::*;
use sea_orm::{entity::*, query::*, DatabaseConnection, PaginatorTrait};

async fn votes_for(db: &DatabaseConnection, poll_id: i32, user_id: i32) -> usize {
    poll_votes::Entity::find()
        .filter(poll_votes::Column::PollId.eq(poll_id))
        .filter(poll_votes::Column::UserId.eq(user_id))
        .count(db)
        .await
        .expect("Failed to count votes")
}

#[actix_rt::test]
async fn test_second_vote_is_rejected() {
    let db = setup_test_database().await.expect("Failed to set up database");
    let admin = create_test_user(&db, "admin").await.unwrap();
    let voter = create_test_user(&db, "voter").await.unwrap();
    let club = create_test_club(&db, admin.id, "Chess Club", "").await.unwrap();
    add_test_member(&db, club.id, admin.id, Role::Admin).await.unwrap();
    add_test_member(&db, club.id, voter.id, Role::Member).await.unwrap();
    let (poll, options) =
        create_test_poll(&db, club.id, admin.id, Duration::days(1), &["Yes", "No"])
            .await
            .unwrap();

    let now = Utc::now().naive_utc();
    let vote = cast_poll_vote(&db.conn, poll.id, voter.id, options[0].id, now)
        .await
        .expect("First vote should succeed");
    assert_eq!(vote.option_id, options[0].id);

    // Same option or a different one, the answer is the same.
    for option in &options {
        let again = cast_poll_vote(&db.conn, poll.id, voter.id, option.id, now).await;
        assert!(
            matches!(again, Err(ClubError::DuplicateVote)),
            "Expected DuplicateVote, got {:?}",
            again
        );
    }

    assert_eq!(votes_for(&db, poll.id, voter.id).await, 1);
}

#[actix_rt::test]
async fn test_unique_index_rejects_duplicate_insert() {
    let db = setup_test_database().await.expect("Failed to set up database");
    let admin = create_test_user(&db, "admin").await.unwrap();
    let club = create_test_club(&db, admin.id, "Chess Club", "").await.unwrap();
    let (poll, options) =
        create_test_poll(&db, club.id, admin.id, Duration::days(1), &["Yes", "No"])
            .await
            .unwrap();

    let now = Utc::now().naive_utc();
    let insert = || poll_votes::ActiveModel {
        poll_id: Set(poll.id),
        option_id: Set(options[1].id),
        user_id: Set(admin.id),
        created_at: Set(now),
        ..Default::default()
    };

    insert().insert(&db.conn).await.expect("First insert should succeed");
    let err = insert()
        .insert(&db.conn)
        .await
        .expect_err("Second insert should hit the unique index");
    assert!(clubhouse::db::is_unique_violation(&err), "Unexpected error: {}", err);
}

#[actix_rt::test]
async fn test_closed_poll_refuses_votes() {
    let db = setup_test_database().await.expect("Failed to set up database");
    let admin = create_test_user(&db, "admin").await.unwrap();
    let voter = create_test_user(&db, "voter").await.unwrap();
    let club = create_test_club(&db, admin.id, "Chess Club", "").await.unwrap();
    add_test_member(&db, club.id, voter.id, Role::Member).await.unwrap();
    let (poll, options) =
        create_test_poll(&db, club.id, admin.id, Duration::hours(-1), &["Yes", "No"])
            .await
            .unwrap();

    let result = cast_poll_vote(
        &db.conn,
        poll.id,
        voter.id,
        options[0].id,
        Utc::now().naive_utc(),
    )
    .await;

    assert!(matches!(result, Err(ClubError::PollClosed)), "Got {:?}", result);
    assert_eq!(votes_for(&db, poll.id, voter.id).await, 0);
}

#[actix_rt::test]
async fn test_poll_is_open_until_its_end_time() {
    let db = setup_test_database().await.expect("Failed to set up database");
    let admin = create_test_user(&db, "admin").await.unwrap();
    let club = create_test_club(&db, admin.id, "Chess Club", "").await.unwrap();
    let (poll, options) =
        create_test_poll(&db, club.id, admin.id, Duration::hours(2), &["Yes", "No"])
            .await
            .unwrap();

    // Exactly at the end time the poll still accepts votes.
    cast_poll_vote(&db.conn, poll.id, admin.id, options[0].id, poll.ends_at)
        .await
        .expect("Vote at the end time should be accepted");

    let voter = create_test_user(&db, "late").await.unwrap();
    let late = poll.ends_at + Duration::seconds(1);
    let result = cast_poll_vote(&db.conn, poll.id, voter.id, options[0].id, late).await;
    assert!(matches!(result, Err(ClubError::PollClosed)));
}

#[actix_rt::test]
async fn test_option_from_another_poll_is_not_found() {
    let db = setup_test_database().await.expect("Failed to set up database");
    let admin = create_test_user(&db, "admin").await.unwrap();
    let club = create_test_club(&db, admin.id, "Chess Club", "").await.unwrap();
    let (poll, _) = create_test_poll(&db, club.id, admin.id, Duration::days(1), &["A", "B"])
        .await
        .unwrap();
    let (_, foreign) = create_test_poll(&db, club.id, admin.id, Duration::days(1), &["C", "D"])
        .await
        .unwrap();

    let now = Utc::now().naive_utc();
    let result = cast_poll_vote(&db.conn, poll.id, admin.id, foreign[0].id, now).await;
    assert!(matches!(result, Err(ClubError::NotFound(_))), "Got {:?}", result);

    let missing = cast_poll_vote(&db.conn, poll.id + 100, admin.id, foreign[0].id, now).await;
    assert!(matches!(missing, Err(ClubError::NotFound(_))));

    assert_eq!(votes_for(&db, poll.id, admin.id).await, 0);
}
