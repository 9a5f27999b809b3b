use crate::model::{
    EvaluationParameter, Group, GroupId, Guide, GuideId, Member, MemberId, ParameterDraft,
    ParameterId,
};
use crate::store::{GroupStore, StoreError};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// In-memory store recording every call it receives.
#[derive(Clone, Default)]
pub struct FakeStore {
    state: Arc<Mutex<FakeState>>,
}

#[derive(Default)]
pub struct FakeState {
    pub groups: BTreeMap<GroupId, Group>,
    pub available: Vec<Member>,
    pub guides: Vec<Guide>,
    pub parameters: Vec<EvaluationParameter>,
    pub calls: Vec<String>,
    pub fail_next: Option<StoreError>,
    /// Fail the call at this position in `calls`, counting from zero.
    pub fail_at: Option<(usize, StoreError)>,
    pub delay: Option<Duration>,
}

pub fn member(n: usize) -> Member {
    Member::new(format!("s{n}"), format!("Student {n}"), format!("EN{n:03}"))
}

pub fn group_with(id: &str, members: usize) -> Group {
    Group {
        id: GroupId::from(id),
        name: format!("Group {id}"),
        members: (0..members).map(member).collect(),
        ..Group::default()
    }
}

impl FakeStore {
    pub fn with_group(group: Group) -> Self {
        let store = Self::default();
        {
            let mut state = store.state();
            let taken = group.member_count();
            state.available = (taken..taken + 5).map(member).collect();
            state.groups.insert(group.id.clone(), group);
        }
        store
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    async fn enter(&self, call: String) -> Result<(), StoreError> {
        let (delay, failure) = {
            let mut state = self.state();
            state.calls.push(call);
            let index = state.calls.len() - 1;
            let pending = state.fail_at.take();
            let failure = match pending {
                Some((at, e)) if at == index => Some(e),
                pending => {
                    state.fail_at = pending;
                    None
                }
            };
            (state.delay, failure)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(e) = failure {
            return Err(e);
        }
        match self.state().fail_next.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl GroupStore for FakeStore {
    async fn group(&self, id: &GroupId) -> Result<Group, StoreError> {
        self.enter(format!("group {id}")).await?;
        self.state()
            .groups
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("group {id}")))
    }

    async fn add_students(&self, id: &GroupId, students: &[MemberId]) -> Result<(), StoreError> {
        self.enter(format!("add {id}")).await?;
        let mut state = self.state();
        let mut added = Vec::new();
        for student in students {
            let pos = state
                .available
                .iter()
                .position(|m| &m.id == student)
                .ok_or_else(|| StoreError::Rejected(format!("student {student} is not available")))?;
            added.push(state.available.remove(pos));
        }
        let group = state
            .groups
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("group {id}")))?;
        group.members.extend(added);
        Ok(())
    }

    async fn remove_student(&self, id: &GroupId, student: &MemberId) -> Result<(), StoreError> {
        self.enter(format!("remove {id} {student}")).await?;
        let mut state = self.state();
        let group = state
            .groups
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("group {id}")))?;
        let pos = group
            .members
            .iter()
            .position(|m| &m.id == student)
            .ok_or_else(|| StoreError::NotFound(format!("student {student}")))?;
        let removed = group.members.remove(pos);
        state.available.push(removed);
        Ok(())
    }

    async fn delete_group(&self, id: &GroupId) -> Result<(), StoreError> {
        self.enter(format!("delete {id}")).await?;
        self.state()
            .groups
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("group {id}")))
    }

    async fn available_students(&self, id: &GroupId) -> Result<Vec<Member>, StoreError> {
        self.enter(format!("available {id}")).await?;
        Ok(self.state().available.clone())
    }

    async fn guides(&self) -> Result<Vec<Guide>, StoreError> {
        self.enter("guides".to_owned()).await?;
        Ok(self.state().guides.clone())
    }

    async fn set_guide(&self, id: &GroupId, guide: &GuideId) -> Result<(), StoreError> {
        self.enter(format!("guide {id} {guide}")).await?;
        let mut state = self.state();
        let guide = state
            .guides
            .iter()
            .find(|g| &g.id == guide)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("guide {guide}")))?;
        let group = state
            .groups
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("group {id}")))?;
        group.guide = Some(guide);
        Ok(())
    }

    async fn parameters(&self) -> Result<Vec<EvaluationParameter>, StoreError> {
        self.enter("parameters".to_owned()).await?;
        Ok(self.state().parameters.clone())
    }

    async fn create_parameter(&self, draft: &ParameterDraft) -> Result<(), StoreError> {
        self.enter(format!("create {}", draft.name)).await?;
        let mut state = self.state();
        let id = ParameterId(format!("p{}", state.parameters.len() + 1));
        state.parameters.push(EvaluationParameter {
            id,
            name: draft.name.clone(),
            description: draft.description.clone(),
            marks: draft.marks,
        });
        Ok(())
    }

    async fn update_parameter(
        &self,
        id: &ParameterId,
        draft: &ParameterDraft,
    ) -> Result<(), StoreError> {
        self.enter(format!("update {id}")).await?;
        let mut state = self.state();
        let parameter = state
            .parameters
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("parameter {id}")))?;
        parameter.name = draft.name.clone();
        parameter.description = draft.description.clone();
        parameter.marks = draft.marks;
        Ok(())
    }

    async fn delete_parameter(&self, id: &ParameterId) -> Result<(), StoreError> {
        self.enter(format!("delete parameter {id}")).await?;
        let mut state = self.state();
        let before = state.parameters.len();
        state.parameters.retain(|p| &p.id != id);
        if state.parameters.len() == before {
            return Err(StoreError::NotFound(format!("parameter {id}")));
        }
        Ok(())
    }
}
