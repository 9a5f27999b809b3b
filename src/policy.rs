use serde::Deserialize;
use thiserror::Error;

/// Why a membership change was refused before reaching the store.
#[derive(Clone, Copy, Debug, Error, Eq, PartialEq)]
pub enum PolicyRejection {
    #[error("no students selected")]
    NoSelection,
    #[error("a group cannot have more than {cap} members ({total} requested)")]
    HardCapExceeded { total: usize, cap: usize },
    #[error("a group cannot exceed {cap} members without override ({total} requested)")]
    SoftCapExceeded { total: usize, cap: usize },
    #[error("a group must keep at least {minimum} members ({remaining} would remain)")]
    MinimumMembers { remaining: usize, minimum: usize },
}

/// Group size limits. A group normally holds up to `soft_cap` members, may be
/// raised to `hard_cap` with an explicit override, and can never shrink below
/// `minimum` through a removal.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct MembershipPolicy {
    pub minimum: usize,
    pub soft_cap: usize,
    pub hard_cap: usize,
}

impl Default for MembershipPolicy {
    fn default() -> Self {
        Self {
            minimum: 3,
            soft_cap: 4,
            hard_cap: 5,
        }
    }
}

impl MembershipPolicy {
    pub fn check_addition(
        &self,
        current: usize,
        requested: usize,
        override_enabled: bool,
    ) -> Result<(), PolicyRejection> {
        if requested == 0 {
            return Err(PolicyRejection::NoSelection);
        }
        let total = current + requested;
        if total > self.hard_cap {
            Err(PolicyRejection::HardCapExceeded {
                total,
                cap: self.hard_cap,
            })
        } else if total > self.soft_cap && !override_enabled {
            Err(PolicyRejection::SoftCapExceeded {
                total,
                cap: self.soft_cap,
            })
        } else {
            Ok(())
        }
    }

    pub fn check_removal(&self, current: usize, removing: usize) -> Result<(), PolicyRejection> {
        if removing == 0 {
            return Err(PolicyRejection::NoSelection);
        }
        let remaining = current.saturating_sub(removing);
        if remaining < self.minimum {
            return Err(PolicyRejection::MinimumMembers {
                remaining,
                minimum: self.minimum,
            });
        }
        Ok(())
    }

    /// Limits that hold whatever the caller asked for: used by stores, which
    /// never see the override flag.
    pub fn check_stored_size(&self, total: usize) -> Result<(), PolicyRejection> {
        if total > self.hard_cap {
            return Err(PolicyRejection::HardCapExceeded {
                total,
                cap: self.hard_cap,
            });
        }
        Ok(())
    }
}
