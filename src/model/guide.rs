use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuideId(pub String);

impl fmt::Display for GuideId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Guide {
    #[serde(rename = "_id", alias = "id")]
    pub id: GuideId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Guide {
    /// Find a guide by display name, ignoring case and surrounding blanks.
    pub fn find_by_name<'a>(guides: &'a [Guide], name: &str) -> Option<&'a Guide> {
        let name = name.trim();
        guides.iter().find(|g| g.name.trim().eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guide(id: &str, name: &str) -> Guide {
        Guide {
            id: GuideId(id.into()),
            name: name.into(),
            email: None,
        }
    }

    #[test]
    fn test_find_by_name() {
        let guides = vec![guide("g1", "Ada Lovelace"), guide("g2", "Alan Turing")];
        assert_eq!(
            Guide::find_by_name(&guides, "  alan turing ").map(|g| &g.id),
            Some(&GuideId("g2".into()))
        );
        assert!(Guide::find_by_name(&guides, "Grace Hopper").is_none());
    }
}
