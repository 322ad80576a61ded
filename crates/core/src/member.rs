use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

fn re_member_id() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"(?i)^[a-f0-9]{24}$").expect("invalid regex"))
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid member id: '{0}'")]
pub struct MemberIdError(pub String);

/// Identifier of a household member: exactly 24 hexadecimal characters.
/// Case is preserved as given.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MemberId(String);

impl MemberId {
    /// Returns `None` for anything that is not a well-formed id, including
    /// the empty string.
    pub fn parse(s: &str) -> Option<Self> {
        re_member_id()
            .is_match(s)
            .then(|| MemberId(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for MemberId {
    type Err = MemberIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MemberId::parse(s).ok_or_else(|| MemberIdError(s.to_string()))
    }
}

impl TryFrom<String> for MemberId {
    type Error = MemberIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MemberId> for String {
    fn from(id: MemberId) -> Self {
        id.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A household member as returned by the member registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
}

impl Member {
    pub fn member_id(&self) -> Option<MemberId> {
        MemberId::parse(&self.id)
    }
}

/// The selectable members for tagging imported rows.
#[derive(Debug, Clone, Default)]
pub struct MemberDirectory {
    members: Vec<Member>,
}

impl MemberDirectory {
    pub fn new(members: Vec<Member>) -> Self {
        Self { members }
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// `(id, display name)` pairs in registry order.
    pub fn options(&self) -> impl Iterator<Item = (&str, &str)> {
        self.members.iter().map(|m| (m.id.as_str(), m.name.as_str()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.iter().any(|m| m.id == id)
    }

    /// Case-insensitive lookup by display name.
    pub fn find_by_name(&self, name: &str) -> Option<&Member> {
        self.members
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name.trim()))
    }
}
