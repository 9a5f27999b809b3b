use crate::error::ActionError;
use crate::inflight::{Action, InFlight};
use crate::model::{EvaluationParameter, ParameterDraft, ParameterId};
use crate::notify::Notifier;
use crate::store::GroupStore;
use std::sync::{Mutex, PoisonError};
use tracing::info;

/// Administrative list of evaluation parameters. Every change is followed by
/// a fresh listing from the store.
pub struct ParameterController<S> {
    store: S,
    notifier: Notifier,
    parameters: Mutex<Vec<EvaluationParameter>>,
    saving: InFlight,
    deleting: InFlight,
}

impl<S: GroupStore> ParameterController<S> {
    pub fn new(store: S, notifier: Notifier) -> Self {
        Self {
            store,
            notifier,
            parameters: Mutex::new(Vec::new()),
            saving: InFlight::default(),
            deleting: InFlight::default(),
        }
    }

    pub fn parameters(&self) -> Vec<EvaluationParameter> {
        self.parameters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn publish<T>(
        &self,
        result: Result<T, ActionError>,
        success: Option<&str>,
    ) -> Result<T, ActionError> {
        match (&result, success) {
            (Ok(_), Some(message)) => self.notifier.success(message),
            (Ok(_), None) => {}
            (Err(e), _) => self.notifier.error(e.user_message()),
        }
        result
    }

    async fn refresh(&self) -> Result<Vec<EvaluationParameter>, ActionError> {
        let parameters = self.store.parameters().await?;
        *self
            .parameters
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = parameters.clone();
        Ok(parameters)
    }

    pub async fn load(&self) -> Result<Vec<EvaluationParameter>, ActionError> {
        let result = self.refresh().await;
        self.publish(result, None)
    }

    pub async fn create(
        &self,
        name: &str,
        description: &str,
        marks: &str,
    ) -> Result<Vec<EvaluationParameter>, ActionError> {
        let result = self.save(None, name, description, marks).await;
        self.publish(result, Some("Parameter added successfully"))
    }

    pub async fn update(
        &self,
        id: &ParameterId,
        name: &str,
        description: &str,
        marks: &str,
    ) -> Result<Vec<EvaluationParameter>, ActionError> {
        let result = self.save(Some(id), name, description, marks).await;
        self.publish(result, Some("Parameter updated successfully"))
    }

    async fn save(
        &self,
        id: Option<&ParameterId>,
        name: &str,
        description: &str,
        marks: &str,
    ) -> Result<Vec<EvaluationParameter>, ActionError> {
        let _guard = self
            .saving
            .begin()
            .ok_or(ActionError::Busy(Action::SaveParameter))?;
        let draft = ParameterDraft::new(name, description, marks)?;
        match id {
            Some(id) => self.store.update_parameter(id, &draft).await?,
            None => self.store.create_parameter(&draft).await?,
        }
        info!(name = %draft.name, marks = draft.marks, "parameter saved");
        self.refresh().await
    }

    pub async fn delete(&self, id: &ParameterId) -> Result<Vec<EvaluationParameter>, ActionError> {
        let result = self.try_delete(id).await;
        self.publish(result, Some("Parameter deleted successfully"))
    }

    async fn try_delete(&self, id: &ParameterId) -> Result<Vec<EvaluationParameter>, ActionError> {
        let _guard = self
            .deleting
            .begin()
            .ok_or(ActionError::Busy(Action::DeleteParameter))?;
        self.store.delete_parameter(id).await?;
        info!(parameter = %id, "parameter deleted");
        self.refresh().await
    }
}
