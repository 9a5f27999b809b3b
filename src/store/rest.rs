use super::{ErrorBody, GroupStore, StoreError, decode_envelope};
use crate::model::{
    EvaluationParameter, Group, GroupId, Guide, GuideId, Member, MemberId, ParameterDraft,
    ParameterId,
};
use crate::session::AuthSession;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method, Url};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, trace};

const PARAMETERS: [&str; 2] = ["admin", "evaluation-parameters"];

/// Group store reached through the admin REST API.
#[derive(Clone, Debug)]
pub struct RestGroupStore {
    client: Client,
    base_url: Url,
    session: AuthSession,
}

impl RestGroupStore {
    pub fn new(
        base_url: &str,
        session: AuthSession,
        timeout: Option<Duration>,
    ) -> Result<Self, StoreError> {
        let base_url = Url::parse(base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| {
                StoreError::Transport(format!("invalid API base url {base_url:?}"))
            })?;
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url,
            session,
        })
    }

    /// Resolve an endpoint below the base url. Each segment is percent-encoded,
    /// so an id can never reach a different path or add a query.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, StoreError> {
        if let Some(bad) = segments.iter().find(|s| matches!(**s, "" | "." | "..")) {
            return Err(StoreError::Rejected(format!("invalid identifier {bad:?}")));
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                StoreError::Transport(format!("invalid API base url {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        url: &Url,
        body: Option<Value>,
    ) -> Result<Vec<u8>, StoreError> {
        let token = self
            .session
            .bearer_token()
            .ok_or(StoreError::Unauthenticated)?;
        debug!(%method, %url, "sending request");
        let mut request = self
            .client
            .request(method, url.clone())
            .header(AUTHORIZATION, format!("Bearer {token}"));
        if let Some(body) = body {
            trace!(%body, "request payload");
            request = request.json(&body);
        }
        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        if status.is_success() {
            return Ok(bytes.to_vec());
        }
        let server_message = serde_json::from_slice::<ErrorBody>(&bytes)
            .ok()
            .map(|b| b.message)
            .filter(|m| !m.trim().is_empty());
        debug!(%status, ?server_message, "request failed");
        Err(match server_message {
            Some(message) => StoreError::Status {
                status: status.as_u16(),
                message,
                from_server: true,
            },
            None => StoreError::Status {
                status: status.as_u16(),
                message: status.to_string(),
                from_server: false,
            },
        })
    }
}

impl GroupStore for RestGroupStore {
    async fn group(&self, id: &GroupId) -> Result<Group, StoreError> {
        let url = self.endpoint(&["admin", "get-group", id.0.as_str()])?;
        let body = self.send(Method::GET, &url, None).await?;
        Ok(decode_envelope(url.path(), &body)?)
    }

    async fn add_students(&self, id: &GroupId, students: &[MemberId]) -> Result<(), StoreError> {
        let url = self.endpoint(&["admin", "update-group", id.0.as_str()])?;
        self.send(Method::PUT, &url, Some(json!({ "addStudentIds": students })))
            .await?;
        Ok(())
    }

    async fn remove_student(&self, id: &GroupId, student: &MemberId) -> Result<(), StoreError> {
        let url = self.endpoint(&["admin", "update-group", id.0.as_str()])?;
        self.send(Method::PUT, &url, Some(json!({ "removeStudentId": student })))
            .await?;
        Ok(())
    }

    async fn delete_group(&self, id: &GroupId) -> Result<(), StoreError> {
        let url = self.endpoint(&["admin", "delete-group", id.0.as_str()])?;
        self.send(Method::DELETE, &url, None).await?;
        Ok(())
    }

    async fn available_students(&self, id: &GroupId) -> Result<Vec<Member>, StoreError> {
        let url = self.endpoint(&["admin", "groups", id.0.as_str(), "students", "available"])?;
        let body = self.send(Method::GET, &url, None).await?;
        Ok(decode_envelope(url.path(), &body)?)
    }

    async fn guides(&self) -> Result<Vec<Guide>, StoreError> {
        let url = self.endpoint(&["admin", "get-guides"])?;
        let body = self.send(Method::GET, &url, None).await?;
        Ok(decode_envelope(url.path(), &body)?)
    }

    async fn set_guide(&self, id: &GroupId, guide: &GuideId) -> Result<(), StoreError> {
        let url = self.endpoint(&["update-group-guide", id.0.as_str()])?;
        self.send(Method::PUT, &url, Some(json!({ "guideId": guide })))
            .await?;
        Ok(())
    }

    async fn parameters(&self) -> Result<Vec<EvaluationParameter>, StoreError> {
        let url = self.endpoint(&PARAMETERS)?;
        let body = self.send(Method::GET, &url, None).await?;
        Ok(decode_envelope(url.path(), &body)?)
    }

    async fn create_parameter(&self, draft: &ParameterDraft) -> Result<(), StoreError> {
        let url = self.endpoint(&PARAMETERS)?;
        self.send(Method::POST, &url, Some(json!(draft))).await?;
        Ok(())
    }

    async fn update_parameter(
        &self,
        id: &ParameterId,
        draft: &ParameterDraft,
    ) -> Result<(), StoreError> {
        let url = self.endpoint(&[PARAMETERS[0], PARAMETERS[1], id.0.as_str()])?;
        self.send(Method::PUT, &url, Some(json!(draft))).await?;
        Ok(())
    }

    async fn delete_parameter(&self, id: &ParameterId) -> Result<(), StoreError> {
        let url = self.endpoint(&[PARAMETERS[0], PARAMETERS[1], id.0.as_str()])?;
        self.send(Method::DELETE, &url, None).await?;
        Ok(())
    }
}
