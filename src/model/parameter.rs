use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Clone, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterId(pub String);

impl fmt::Display for ParameterId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A criterion projects are scored against, worth `marks` points.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct EvaluationParameter {
    #[serde(rename = "_id", alias = "id")]
    pub id: ParameterId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub marks: u32,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidParameter {
    #[error("parameter name cannot be empty")]
    EmptyName,
    #[error("marks must be a positive integer, got {0:?}")]
    Marks(String),
}

/// A validated parameter body, ready to be submitted for creation or update.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ParameterDraft {
    pub name: String,
    pub description: String,
    pub marks: u32,
}

impl ParameterDraft {
    pub fn new(name: &str, description: &str, marks: &str) -> Result<Self, InvalidParameter> {
        let name = name.trim();
        if name.is_empty() {
            return Err(InvalidParameter::EmptyName);
        }
        let marks = match marks.trim().parse::<u32>() {
            Ok(m) if m > 0 => m,
            _ => return Err(InvalidParameter::Marks(marks.to_owned())),
        };
        Ok(Self {
            name: name.to_owned(),
            description: description.trim().to_owned(),
            marks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marks_must_be_positive_integer() {
        assert_eq!(ParameterDraft::new("Demo", "", "10").unwrap().marks, 10);
        assert_eq!(ParameterDraft::new("Demo", "", " 7 ").unwrap().marks, 7);
        for bad in ["0", "-3", "2.5", "ten", ""] {
            assert_eq!(
                ParameterDraft::new("Demo", "", bad),
                Err(InvalidParameter::Marks(bad.into()))
            );
        }
    }

    #[test]
    fn test_name_is_required() {
        assert_eq!(
            ParameterDraft::new("   ", "desc", "5"),
            Err(InvalidParameter::EmptyName)
        );
    }
}
