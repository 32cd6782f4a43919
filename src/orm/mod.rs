pub mod clubs;
pub mod members;
pub mod poll_options;
pub mod poll_votes;
pub mod polls;
pub mod proposal_votes;
pub mod proposals;
pub mod users;
