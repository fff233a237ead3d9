use serde::{Deserialize, Serialize};

/// Account role carried inside an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    /// Wire value sent to and received from the backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    /// Label shown in the navbar badge and the sign-up form.
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::User => "User",
        }
    }

    /// The other role (used by the sign-up role selector)
    pub fn toggled(&self) -> Self {
        match self {
            Role::Admin => Role::User,
            Role::User => Role::Admin,
        }
    }
}

/// Profile of the signed-in user.
///
/// This is the record persisted in the `user` slot. The backend may send
/// the id as `id`, `_id` or both; `id` wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "IdentityRecord")]
pub struct Identity {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

#[derive(Deserialize)]
struct IdentityRecord {
    id: Option<String>,
    #[serde(rename = "_id")]
    mongo_id: Option<String>,
    name: String,
    email: String,
    #[serde(default)]
    role: Role,
}

impl TryFrom<IdentityRecord> for Identity {
    type Error = String;

    fn try_from(record: IdentityRecord) -> Result<Self, Self::Error> {
        let id = pick_id(record.id, record.mongo_id).ok_or("missing field `id`")?;
        Ok(Self {
            id,
            name: record.name,
            email: record.email,
            role: record.role,
        })
    }
}

/// Prefer `id`, fall back to `_id`
pub(crate) fn pick_id(id: Option<String>, mongo_id: Option<String>) -> Option<String> {
    id.or(mongo_id)
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// An identity restored from storage must at least name a user.
    pub fn is_well_formed(&self) -> bool {
        !self.id.trim().is_empty() && !self.email.trim().is_empty()
    }
}

/// Operations a view may offer, checked in one place instead of comparing
/// role strings at every call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ViewBoard,
    CreateTask,
    EditTask,
    ToggleStatus,
    DeleteTask,
}

impl Capability {
    pub fn permitted(self, identity: Option<&Identity>) -> bool {
        match identity {
            None => false,
            Some(identity) => match self {
                Capability::ViewBoard
                | Capability::CreateTask
                | Capability::EditTask
                | Capability::ToggleStatus => true,
                Capability::DeleteTask => identity.is_admin(),
            },
        }
    }
}
