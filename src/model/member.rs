use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(pub String);

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MemberId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

/// A student's membership record within a group.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    #[serde(rename = "_id", alias = "id")]
    pub id: MemberId,
    pub name: String,
    #[serde(default)]
    pub enrollment_number: String,
}

impl Member {
    pub fn new(id: impl Into<String>, name: impl Into<String>, enrollment: impl Into<String>) -> Self {
        Self {
            id: MemberId(id.into()),
            name: name.into(),
            enrollment_number: enrollment.into(),
        }
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.enrollment_number.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} ({})", self.name, self.enrollment_number)
        }
    }
}
