use crate::inflight::Action;
use crate::model::{InvalidParameter, MemberId};
use crate::policy::PolicyRejection;
use crate::store::StoreError;
use thiserror::Error;

pub const GENERIC_MESSAGE: &str = "Something went wrong, please try again";

/// Failure of a user action. By the time a caller sees one, it has already
/// been shown through the notifier.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error(transparent)]
    Policy(#[from] PolicyRejection),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    InvalidParameter(#[from] InvalidParameter),
    #[error("no guide named {0:?}")]
    GuideNotFound(String),
    #[error("student {0} is not a member of this group")]
    NotAMember(MemberId),
    #[error("student {0} is already a member of this group")]
    AlreadyMember(MemberId),
    #[error("group is not loaded")]
    NotLoaded,
    #[error("no removal is awaiting confirmation")]
    NothingToConfirm,
    #[error("already {0}")]
    Busy(Action),
}

impl ActionError {
    /// Text for the notification banner: the server's own message when there
    /// is one, then the error's description, then a generic fallback.
    pub fn user_message(&self) -> String {
        if let ActionError::Store(e) = self {
            if let Some(message) = e.server_message() {
                return message.to_owned();
            }
            if let StoreError::Status { status: 401, .. } = e {
                return "Session expired, please log in again".to_owned();
            }
        }
        let message = self.to_string();
        if message.trim().is_empty() {
            GENERIC_MESSAGE.to_owned()
        } else {
            message
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_fallback_chain() {
        let server = ActionError::Store(StoreError::Status {
            status: 400,
            message: "Student already assigned".into(),
            from_server: true,
        });
        assert_eq!(server.user_message(), "Student already assigned");

        let transport = ActionError::Store(StoreError::Transport("connection refused".into()));
        assert_eq!(transport.user_message(), "connection refused");

        let empty = ActionError::Store(StoreError::Transport(String::new()));
        assert_eq!(empty.user_message(), GENERIC_MESSAGE);

        let expired = ActionError::Store(StoreError::Status {
            status: 401,
            message: "401 Unauthorized".into(),
            from_server: false,
        });
        assert_eq!(expired.user_message(), "Session expired, please log in again");

        let policy = ActionError::from(PolicyRejection::NoSelection);
        assert_eq!(policy.user_message(), "no students selected");
    }
}
