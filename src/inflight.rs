use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// User actions that must not run twice at the same time.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Action {
    AddMembers,
    RemoveMember,
    ChangeGuide,
    DeleteGroup,
    SaveParameter,
    DeleteParameter,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Action::AddMembers => "adding students",
            Action::RemoveMember => "removing a student",
            Action::ChangeGuide => "changing the guide",
            Action::DeleteGroup => "deleting the group",
            Action::SaveParameter => "saving a parameter",
            Action::DeleteParameter => "deleting a parameter",
        })
    }
}

/// In-flight flag for one action. The flag is raised by `begin` and lowered
/// when the returned guard is dropped.
#[derive(Debug, Default)]
pub struct InFlight(AtomicBool);

pub struct InFlightGuard<'a>(&'a AtomicBool);

impl InFlight {
    pub fn begin(&self) -> Option<InFlightGuard<'_>> {
        if self.0.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(InFlightGuard(&self.0))
        }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
