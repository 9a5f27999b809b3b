use crate::model::{
    EvaluationParameter, Group, GroupId, Guide, GuideId, Member, MemberId, ParameterDraft,
    ParameterId,
};
use crate::policy::PolicyRejection;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

pub use self::rest::RestGroupStore;
pub use self::sql::SqlGroupStore;

mod rest;
mod sql;

/// A response body that did not have the declared shape.
#[derive(Debug, Error)]
#[error("unexpected response from {endpoint}: {source}")]
pub struct ParseError {
    pub endpoint: String,
    #[source]
    pub source: serde_json::Error,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not logged in")]
    Unauthenticated,
    /// Non-success HTTP status. `message` is the server's own text when it
    /// sent one, the status line otherwise.
    #[error("{message}")]
    Status {
        status: u16,
        message: String,
        from_server: bool,
    },
    #[error("{0}")]
    Transport(String),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Rejected(String),
    #[error("rejected by store: {0}")]
    Policy(#[from] PolicyRejection),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Message the server itself attached to the failure, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            StoreError::Status {
                message,
                from_server: true,
                ..
            } => Some(message.as_str()),
            StoreError::Rejected(message) => Some(message.as_str()),
            _ => None,
        }
    }
}

/// `{ "data": ... }` wrapper used by every read endpoint.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// `{ "message": ... }` body of error responses.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

/// Decode an enveloped response body, naming `endpoint` on failure.
pub fn decode_envelope<T: DeserializeOwned>(endpoint: &str, body: &[u8]) -> Result<T, ParseError> {
    serde_json::from_slice::<Envelope<T>>(body)
        .map(|envelope| envelope.data)
        .map_err(|source| ParseError {
            endpoint: endpoint.to_owned(),
            source,
        })
}

/// Source of truth for groups, guides and evaluation parameters. Mutations
/// send deltas only and their results are never trusted: callers re-fetch.
#[allow(async_fn_in_trait)]
pub trait GroupStore {
    async fn group(&self, id: &GroupId) -> Result<Group, StoreError>;
    async fn add_students(&self, id: &GroupId, students: &[MemberId]) -> Result<(), StoreError>;
    async fn remove_student(&self, id: &GroupId, student: &MemberId) -> Result<(), StoreError>;
    async fn delete_group(&self, id: &GroupId) -> Result<(), StoreError>;
    async fn available_students(&self, id: &GroupId) -> Result<Vec<Member>, StoreError>;
    async fn guides(&self) -> Result<Vec<Guide>, StoreError>;
    async fn set_guide(&self, id: &GroupId, guide: &GuideId) -> Result<(), StoreError>;
    async fn parameters(&self) -> Result<Vec<EvaluationParameter>, StoreError>;
    async fn create_parameter(&self, draft: &ParameterDraft) -> Result<(), StoreError>;
    async fn update_parameter(
        &self,
        id: &ParameterId,
        draft: &ParameterDraft,
    ) -> Result<(), StoreError>;
    async fn delete_parameter(&self, id: &ParameterId) -> Result<(), StoreError>;
}
