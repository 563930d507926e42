use crate::money::Currency;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Owner,
    Member,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::Owner => "OWNER",
            Role::Member => "MEMBER",
        };
        write!(f, "{}", s)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroupMember {
    pub email: String,
    pub role: Role,
    pub joined_at: DateTime<Utc>,
}

impl GroupMember {
    pub fn is_owner(&self) -> bool {
        self.role == Role::Owner
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub owner_email: String,
    pub currency: Currency,
    /// Members in insertion order; the owner is always present.
    pub members: Vec<GroupMember>,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Group {
    pub fn member(&self, email: &str) -> Option<&GroupMember> {
        self.members.iter().find(|m| m.email == email)
    }

    pub fn is_member(&self, email: &str) -> bool {
        self.member(email).is_some()
    }

    pub fn is_owner(&self, email: &str) -> bool {
        self.owner_email == email
    }
}
