use sea_orm::DbErr;
use std::fmt;

/// Reasons a club operation can refuse to run.
///
/// `Display` is the notice shown to the user.
#[derive(Debug)]
pub enum ClubError {
    /// Authorization failed; nothing was changed.
    PermissionDenied(&'static str),
    /// A referenced club, member, poll, option or proposal does not exist.
    NotFound(&'static str),
    /// The user already has a vote in this poll.
    DuplicateVote,
    /// The user already voted for this proposal.
    DuplicateProposalVote,
    /// The poll's end time has passed.
    PollClosed,
    /// Submitted role is not one of the known roles.
    InvalidRole(String),
    /// Store failure. Any open transaction was rolled back.
    Database(DbErr),
}

impl fmt::Display for ClubError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClubError::PermissionDenied(reason) => f.write_str(reason),
            ClubError::NotFound(what) => write!(f, "{} not found.", what),
            ClubError::DuplicateVote => f.write_str("You have already voted in this poll."),
            ClubError::DuplicateProposalVote => {
                f.write_str("You have already voted on this proposal.")
            }
            ClubError::PollClosed => f.write_str("This poll has ended."),
            ClubError::InvalidRole(role) => write!(f, "Invalid role selected: {:?}.", role),
            ClubError::Database(_) => {
                f.write_str("Something went wrong. No changes were made, please try again.")
            }
        }
    }
}

impl std::error::Error for ClubError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClubError::Database(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DbErr> for ClubError {
    fn from(e: DbErr) -> Self {
        ClubError::Database(e)
    }
}
