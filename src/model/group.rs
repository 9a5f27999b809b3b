use super::{Guide, Member, MemberId};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub String);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GroupId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Division {
    pub course: String,
    pub semester: u8,
}

/// A student project team as stored remotely. Member order is the store's order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(rename = "_id", alias = "id")]
    pub id: GroupId,
    pub name: String,
    #[serde(default)]
    pub project_title: String,
    #[serde(default)]
    pub project_description: String,
    #[serde(default)]
    pub project_technology: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub division: Option<Division>,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub guide: Option<Guide>,
}

impl Group {
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn member(&self, id: &MemberId) -> Option<&Member> {
        self.members.iter().find(|m| &m.id == id)
    }

    pub fn has_member(&self, id: &MemberId) -> bool {
        self.member(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_store_document() {
        let group: Group = serde_json::from_str(
            r#"{
                "_id": "g1",
                "name": "Team Rocket",
                "projectTitle": "Attendance tracker",
                "year": 2024,
                "division": {"course": "MCA", "semester": 3},
                "members": [
                    {"_id": "s1", "name": "Asha", "enrollmentNumber": "EN001"},
                    {"_id": "s2", "name": "Ravi"}
                ],
                "guide": {"_id": "t1", "name": "Dr. Rao"}
            }"#,
        )
        .unwrap();
        assert_eq!(group.id, GroupId("g1".into()));
        assert_eq!(group.member_count(), 2);
        assert!(group.has_member(&MemberId("s2".into())));
        assert!(!group.has_member(&MemberId("s3".into())));
        assert_eq!(group.members[1].enrollment_number, "");
        assert_eq!(group.division.unwrap().semester, 3);
        assert_eq!(group.guide.unwrap().name, "Dr. Rao");
    }
}
