//! Integration tests for proposal votes, retraction and deletion.

mod common;

use chrono::Utc;
use clubhouse::club::{
    cast_proposal_vote, delete_proposal, proposal_vote_count, retract_proposal_vote, ClubError,
    Retraction,
};
use clubhouse::club::summary::list_proposals;
use clubhouse::orm::{proposal_votes, proposals};
use clubhouse::permission::Role;
use common::*;
use sea_orm::{entity::*, query::*, PaginatorTrait};

#[actix_rt::test]
async fn test_cast_then_retract_restores_count() {
    let db = setup_test_database().await.expect("Failed to set up database");
    let author = create_test_user(&db, "author").await.unwrap();
    let voter = create_test_user(&db, "voter").await.unwrap();
    let club = create_test_club(&db, author.id, "Book Club", "").await.unwrap();
    add_test_member(&db, club.id, author.id, Role::Admin).await.unwrap();
    add_test_member(&db, club.id, voter.id, Role::Member).await.unwrap();
    let proposal = create_test_proposal(&db, club.id, author.id, "Read more poetry")
        .await
        .unwrap();

    cast_proposal_vote(&db.conn, proposal.id, author.id, Utc::now().naive_utc())
        .await
        .unwrap();
    let before = proposal_vote_count(&db.conn, proposal.id).await.unwrap();
    assert_eq!(before, 1);

    cast_proposal_vote(&db.conn, proposal.id, voter.id, Utc::now().naive_utc())
        .await
        .unwrap();
    assert_eq!(proposal_vote_count(&db.conn, proposal.id).await.unwrap(), 2);

    let retracted = retract_proposal_vote(&db.conn, proposal.id, voter.id)
        .await
        .unwrap();
    assert_eq!(retracted, Retraction::Retracted);
    assert_eq!(proposal_vote_count(&db.conn, proposal.id).await.unwrap(), before);

    // The vote can be cast again after retracting.
    cast_proposal_vote(&db.conn, proposal.id, voter.id, Utc::now().naive_utc())
        .await
        .expect("Re-voting after a retraction should succeed");
}

#[actix_rt::test]
async fn test_duplicate_proposal_vote() {
    let db = setup_test_database().await.expect("Failed to set up database");
    let member = create_test_user(&db, "member").await.unwrap();
    let club = create_test_club(&db, member.id, "Book Club", "").await.unwrap();
    add_test_member(&db, club.id, member.id, Role::Member).await.unwrap();
    let proposal = create_test_proposal(&db, club.id, member.id, "Meet on Fridays")
        .await
        .unwrap();

    let now = Utc::now().naive_utc();
    cast_proposal_vote(&db.conn, proposal.id, member.id, now)
        .await
        .unwrap();
    let again = cast_proposal_vote(&db.conn, proposal.id, member.id, now).await;
    assert!(matches!(again, Err(ClubError::DuplicateProposalVote)), "Got {:?}", again);
    assert_eq!(proposal_vote_count(&db.conn, proposal.id).await.unwrap(), 1);
}

#[actix_rt::test]
async fn test_retract_without_vote() {
    let db = setup_test_database().await.expect("Failed to set up database");
    let member = create_test_user(&db, "member").await.unwrap();
    let club = create_test_club(&db, member.id, "Book Club", "").await.unwrap();
    add_test_member(&db, club.id, member.id, Role::Member).await.unwrap();
    let proposal = create_test_proposal(&db, club.id, member.id, "Meet on Fridays")
        .await
        .unwrap();

    let result = retract_proposal_vote(&db.conn, proposal.id, member.id)
        .await
        .unwrap();
    assert_eq!(result, Retraction::NothingToRetract);
}

#[actix_rt::test]
async fn test_non_member_cannot_vote_or_retract() {
    let db = setup_test_database().await.expect("Failed to set up database");
    let member = create_test_user(&db, "member").await.unwrap();
    let outsider = create_test_user(&db, "outsider").await.unwrap();
    let club = create_test_club(&db, member.id, "Book Club", "").await.unwrap();
    add_test_member(&db, club.id, member.id, Role::Member).await.unwrap();
    let proposal = create_test_proposal(&db, club.id, member.id, "Meet on Fridays")
        .await
        .unwrap();

    let vote = cast_proposal_vote(&db.conn, proposal.id, outsider.id, Utc::now().naive_utc()).await;
    assert!(matches!(vote, Err(ClubError::PermissionDenied(_))), "Got {:?}", vote);

    let retract = retract_proposal_vote(&db.conn, proposal.id, outsider.id).await;
    assert!(matches!(retract, Err(ClubError::PermissionDenied(_))));

    assert_eq!(proposal_vote_count(&db.conn, proposal.id).await.unwrap(), 0);
}

#[actix_rt::test]
async fn test_delete_proposal_by_creator_and_admin() {
    let db = setup_test_database().await.expect("Failed to set up database");
    let admin = create_test_user(&db, "admin").await.unwrap();
    let author = create_test_user(&db, "author").await.unwrap();
    let bystander = create_test_user(&db, "bystander").await.unwrap();
    let club = create_test_club(&db, admin.id, "Book Club", "").await.unwrap();
    add_test_member(&db, club.id, admin.id, Role::Admin).await.unwrap();
    add_test_member(&db, club.id, author.id, Role::Member).await.unwrap();
    add_test_member(&db, club.id, bystander.id, Role::Secretary).await.unwrap();

    let first = create_test_proposal(&db, club.id, author.id, "First").await.unwrap();
    let second = create_test_proposal(&db, club.id, author.id, "Second").await.unwrap();
    for voter in [&admin, &author, &bystander] {
        cast_proposal_vote(&db.conn, first.id, voter.id, Utc::now().naive_utc())
            .await
            .unwrap();
    }

    // A member who is neither the author nor an admin is refused.
    let refused = delete_proposal(&db.conn, first.id, bystander.id).await;
    assert!(matches!(refused, Err(ClubError::PermissionDenied(_))), "Got {:?}", refused);
    assert_eq!(proposal_vote_count(&db.conn, first.id).await.unwrap(), 3);

    // The author deletes one, an admin deletes the other.
    delete_proposal(&db.conn, first.id, author.id).await.unwrap();
    delete_proposal(&db.conn, second.id, admin.id).await.unwrap();

    let remaining = proposals::Entity::find()
        .filter(proposals::Column::ClubId.eq(club.id))
        .count(&db.conn)
        .await
        .unwrap();
    assert_eq!(remaining, 0);

    let orphaned_votes = proposal_votes::Entity::find()
        .filter(proposal_votes::Column::ProposalId.eq(first.id))
        .count(&db.conn)
        .await
        .unwrap();
    assert_eq!(orphaned_votes, 0);

    let missing = delete_proposal(&db.conn, first.id, admin.id).await;
    assert!(matches!(missing, Err(ClubError::NotFound(_))));
}

#[actix_rt::test]
async fn test_failed_delete_keeps_votes() {
    let db = setup_test_database().await.expect("Failed to set up database");
    let author = create_test_user(&db, "author").await.unwrap();
    let voter = create_test_user(&db, "voter").await.unwrap();
    let club = create_test_club(&db, author.id, "Book Club", "").await.unwrap();
    add_test_member(&db, club.id, author.id, Role::Admin).await.unwrap();
    add_test_member(&db, club.id, voter.id, Role::Member).await.unwrap();
    let proposal = create_test_proposal(&db, club.id, author.id, "Read more poetry")
        .await
        .unwrap();
    for user in [&author, &voter] {
        cast_proposal_vote(&db.conn, proposal.id, user.id, Utc::now().naive_utc())
            .await
            .unwrap();
    }

    // Votes go first, so the proposal delete fails after they are gone.
    fail_deletes_on(&db, "proposals").await.unwrap();

    let result = delete_proposal(&db.conn, proposal.id, author.id).await;
    assert!(matches!(result, Err(ClubError::Database(_))), "Got {:?}", result);

    assert_eq!(proposal_vote_count(&db.conn, proposal.id).await.unwrap(), 2);
    assert!(proposals::Entity::find_by_id(proposal.id)
        .one(&db.conn)
        .await
        .unwrap()
        .is_some());
}

#[actix_rt::test]
async fn test_proposal_list_marks_viewer_votes() {
    let db = setup_test_database().await.expect("Failed to set up database");
    let author = create_test_user(&db, "author").await.unwrap();
    let viewer = create_test_user(&db, "viewer").await.unwrap();
    let club = create_test_club(&db, author.id, "Book Club", "").await.unwrap();
    add_test_member(&db, club.id, author.id, Role::Admin).await.unwrap();
    add_test_member(&db, club.id, viewer.id, Role::Member).await.unwrap();

    let backed = create_test_proposal(&db, club.id, author.id, "Backed").await.unwrap();
    let skipped = create_test_proposal(&db, club.id, author.id, "Skipped").await.unwrap();
    let now = Utc::now().naive_utc();
    cast_proposal_vote(&db.conn, backed.id, viewer.id, now).await.unwrap();
    cast_proposal_vote(&db.conn, backed.id, author.id, now).await.unwrap();
    cast_proposal_vote(&db.conn, skipped.id, author.id, now).await.unwrap();

    let listed = list_proposals(&db.conn, club.id, viewer.id).await.unwrap();
    assert_eq!(listed.len(), 2);
    let find = |id: i32| {
        listed
            .iter()
            .find(|s| s.proposal.id == id)
            .expect("Proposal should be listed")
    };

    assert_eq!(find(backed.id).votes, 2);
    assert!(find(backed.id).viewer_voted);
    assert_eq!(find(skipped.id).votes, 1);
    assert!(!find(skipped.id).viewer_voted);
    assert_eq!(find(skipped.id).author, "author");
}
