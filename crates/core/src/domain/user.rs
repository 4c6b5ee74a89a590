use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Empty or blank identifiers mean "nobody selected".
    pub fn non_empty(raw: impl AsRef<str>) -> Option<Self> {
        let trimmed = raw.as_ref().trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "STAFF")]
    Staff,
    #[serde(rename = "ADMIN")]
    Admin,
    #[serde(rename = "SUPER-ADMIN")]
    SuperAdmin,
    #[serde(rename = "REVIEWER")]
    Reviewer,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin | Self::SuperAdmin)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionSet {
    #[serde(default)]
    pub can_view: bool,
    #[serde(default)]
    pub can_create: bool,
    #[serde(default)]
    pub can_update: bool,
    #[serde(default)]
    pub can_delete: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PermissionModule {
    Procurement,
    Finance,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capability {
    View,
    Create,
    Update,
    Delete,
}

impl PermissionSet {
    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::View => self.can_view,
            Capability::Create => self.can_create,
            Capability::Update => self.can_update,
            Capability::Delete => self.can_delete,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmploymentInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_employment_info_locked: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(alias = "_id")]
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: Role,
    #[serde(rename = "procurementRole", default)]
    pub procurement_role: PermissionSet,
    #[serde(rename = "financeRole", default)]
    pub finance_role: PermissionSet,
    #[serde(rename = "employmentInfo", default)]
    pub employment_info: EmploymentInfo,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    pub fn permissions(&self, module: PermissionModule) -> &PermissionSet {
        match module {
            PermissionModule::Procurement => &self.procurement_role,
            PermissionModule::Finance => &self.finance_role,
        }
    }

    pub fn permits(&self, module: PermissionModule, capability: Capability) -> bool {
        self.role == Role::SuperAdmin || self.permissions(module).allows(capability)
    }
}

/// The author snapshot embedded in comments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    #[serde(alias = "_id")]
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role,
        }
    }
}
