use crate::error::ActionError;
use crate::inflight::{Action, InFlight};
use crate::model::{Group, GroupId, Guide, Member, MemberId};
use crate::notify::Notifier;
use crate::policy::MembershipPolicy;
use crate::store::GroupStore;
use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// What the group detail view currently shows.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum ViewState {
    #[default]
    Idle,
    Loading,
    Loaded(Group),
    Mutating(Group),
}

impl ViewState {
    pub fn group(&self) -> Option<&Group> {
        match self {
            ViewState::Loaded(group) | ViewState::Mutating(group) => Some(group),
            ViewState::Idle | ViewState::Loading => None,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Drives one group detail view: fetch, check, mutate, then re-fetch the
/// authoritative group. Local state is only ever replaced by what the store
/// returns, never patched.
pub struct GroupDetailController<S> {
    store: S,
    notifier: Notifier,
    policy: MembershipPolicy,
    state: Mutex<ViewState>,
    selection: Mutex<BTreeSet<MemberId>>,
    pending_removal: Mutex<Option<(GroupId, MemberId)>>,
    guides: Mutex<Vec<Guide>>,
    adding: InFlight,
    removing: InFlight,
    changing_guide: InFlight,
    deleting: InFlight,
}

impl<S: GroupStore> GroupDetailController<S> {
    pub fn new(store: S, notifier: Notifier, policy: MembershipPolicy) -> Self {
        Self {
            store,
            notifier,
            policy,
            state: Mutex::new(ViewState::Idle),
            selection: Mutex::new(BTreeSet::new()),
            pending_removal: Mutex::new(None),
            guides: Mutex::new(Vec::new()),
            adding: InFlight::default(),
            removing: InFlight::default(),
            changing_guide: InFlight::default(),
            deleting: InFlight::default(),
        }
    }

    pub fn state(&self) -> ViewState {
        lock(&self.state).clone()
    }

    fn set_state(&self, state: ViewState) {
        *lock(&self.state) = state;
    }

    /// Publish the outcome of an action through the notifier.
    fn report<T>(&self, result: Result<T, ActionError>, success: &str) -> Result<T, ActionError> {
        match &result {
            Ok(_) => self.notifier.success(success),
            Err(e) => self.notifier.error(e.user_message()),
        }
        result
    }

    fn report_failure<T>(&self, result: Result<T, ActionError>) -> Result<T, ActionError> {
        if let Err(e) = &result {
            self.notifier.error(e.user_message());
        }
        result
    }

    fn current_group(&self, id: &GroupId) -> Result<Group, ActionError> {
        match &*lock(&self.state) {
            ViewState::Loaded(group) if &group.id == id => Ok(group.clone()),
            _ => Err(ActionError::NotLoaded),
        }
    }

    /// Replace the view with the store's copy of the group. On failure the
    /// view goes back to `fallback`.
    async fn resync(&self, id: &GroupId, fallback: ViewState) -> Result<Group, ActionError> {
        match self.store.group(id).await {
            Ok(group) => {
                debug!(group = %id, members = group.member_count(), "group loaded");
                self.set_state(ViewState::Loaded(group.clone()));
                Ok(group)
            }
            Err(e) => {
                self.set_state(fallback);
                Err(e.into())
            }
        }
    }

    pub async fn load_group_details(&self, id: &GroupId) -> Result<Group, ActionError> {
        let previous = std::mem::replace(&mut *lock(&self.state), ViewState::Loading);
        let fallback = match previous {
            ViewState::Loaded(group) | ViewState::Mutating(group) => ViewState::Loaded(group),
            ViewState::Idle | ViewState::Loading => ViewState::Idle,
        };
        let result = self.resync(id, fallback).await;
        self.report_failure(result)
    }

    pub async fn available_students(&self, id: &GroupId) -> Result<Vec<Member>, ActionError> {
        let result: Result<_, ActionError> =
            self.store.available_students(id).await.map_err(Into::into);
        self.report_failure(result)
    }

    pub fn select(&self, member: MemberId) {
        lock(&self.selection).insert(member);
    }

    pub fn selection(&self) -> Vec<MemberId> {
        lock(&self.selection).iter().cloned().collect()
    }

    /// Add the currently selected students.
    pub async fn add_selected(
        &self,
        id: &GroupId,
        override_enabled: bool,
    ) -> Result<Group, ActionError> {
        let selection = self.selection();
        self.add_members(id, &selection, override_enabled).await
    }

    pub async fn add_members(
        &self,
        id: &GroupId,
        members: &[MemberId],
        override_enabled: bool,
    ) -> Result<Group, ActionError> {
        let result = self.try_add_members(id, members, override_enabled).await;
        self.report(result, "Students added successfully")
    }

    async fn try_add_members(
        &self,
        id: &GroupId,
        members: &[MemberId],
        override_enabled: bool,
    ) -> Result<Group, ActionError> {
        let _guard = self
            .adding
            .begin()
            .ok_or(ActionError::Busy(Action::AddMembers))?;
        let group = self.current_group(id)?;
        let mut batch: Vec<MemberId> = Vec::with_capacity(members.len());
        for member in members {
            if group.has_member(member) {
                return Err(ActionError::AlreadyMember(member.clone()));
            }
            if !batch.contains(member) {
                batch.push(member.clone());
            }
        }
        self.policy
            .check_addition(group.member_count(), batch.len(), override_enabled)?;
        self.set_state(ViewState::Mutating(group.clone()));
        if let Err(e) = self.store.add_students(id, &batch).await {
            self.set_state(ViewState::Loaded(group));
            return Err(e.into());
        }
        info!(group = %id, added = batch.len(), override_enabled, "students added");
        let fresh = self.resync(id, ViewState::Loaded(group)).await?;
        lock(&self.selection).clear();
        Ok(fresh)
    }

    /// First step of a removal: remember which student to remove and return
    /// it so the caller can ask for confirmation.
    pub fn request_removal(&self, id: &GroupId, member: &MemberId) -> Result<Member, ActionError> {
        let result = self.current_group(id).and_then(|group| {
            group
                .member(member)
                .cloned()
                .ok_or_else(|| ActionError::NotAMember(member.clone()))
        });
        if result.is_ok() {
            *lock(&self.pending_removal) = Some((id.clone(), member.clone()));
        }
        self.report_failure(result)
    }

    pub fn cancel_removal(&self) {
        lock(&self.pending_removal).take();
    }

    /// Second step of a removal: commit the pending request.
    pub async fn confirm_removal(&self) -> Result<Group, ActionError> {
        let result = self.try_confirm_removal().await;
        self.report(result, "Student removed successfully")
    }

    async fn try_confirm_removal(&self) -> Result<Group, ActionError> {
        let _guard = self
            .removing
            .begin()
            .ok_or(ActionError::Busy(Action::RemoveMember))?;
        let (id, member) = lock(&self.pending_removal)
            .take()
            .ok_or(ActionError::NothingToConfirm)?;
        let group = self.current_group(&id)?;
        if !group.has_member(&member) {
            return Err(ActionError::NotAMember(member));
        }
        self.policy.check_removal(group.member_count(), 1)?;
        self.set_state(ViewState::Mutating(group.clone()));
        if let Err(e) = self.store.remove_student(&id, &member).await {
            self.set_state(ViewState::Loaded(group));
            return Err(e.into());
        }
        info!(group = %id, %member, "student removed");
        self.resync(&id, ViewState::Loaded(group)).await
    }

    /// Fetch the guide list used to resolve names in `change_guide`.
    pub async fn load_guides(&self) -> Result<Vec<Guide>, ActionError> {
        let result = match self.store.guides().await {
            Ok(guides) => {
                *lock(&self.guides) = guides.clone();
                Ok(guides)
            }
            Err(e) => Err(e.into()),
        };
        self.report_failure(result)
    }

    pub async fn change_guide(&self, id: &GroupId, guide_name: &str) -> Result<Group, ActionError> {
        let result = self.try_change_guide(id, guide_name).await;
        self.report(result, "Guide updated successfully")
    }

    async fn try_change_guide(&self, id: &GroupId, guide_name: &str) -> Result<Group, ActionError> {
        let _guard = self
            .changing_guide
            .begin()
            .ok_or(ActionError::Busy(Action::ChangeGuide))?;
        let guide = Guide::find_by_name(&lock(&self.guides), guide_name)
            .cloned()
            .ok_or_else(|| ActionError::GuideNotFound(guide_name.to_owned()))?;
        let group = self.current_group(id)?;
        self.set_state(ViewState::Mutating(group.clone()));
        if let Err(e) = self.store.set_guide(id, &guide.id).await {
            self.set_state(ViewState::Loaded(group));
            return Err(e.into());
        }
        info!(group = %id, guide = %guide.name, "guide changed");
        self.resync(id, ViewState::Loaded(group)).await
    }

    pub async fn delete_group(&self, id: &GroupId) -> Result<(), ActionError> {
        let result = self.try_delete_group(id).await;
        self.report(result, "Group deleted successfully")
    }

    async fn try_delete_group(&self, id: &GroupId) -> Result<(), ActionError> {
        let _guard = self
            .deleting
            .begin()
            .ok_or(ActionError::Busy(Action::DeleteGroup))?;
        self.store.delete_group(id).await?;
        info!(group = %id, "group deleted");
        let mut state = lock(&self.state);
        if state.group().is_some_and(|g| &g.id == id) {
            *state = ViewState::Idle;
        }
        Ok(())
    }
}
