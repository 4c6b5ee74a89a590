use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCode {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    pub code: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    #[serde(alias = "_id")]
    pub id: ProjectId,
    pub title: String,
    pub project_code: String,
    #[serde(default)]
    pub account_code: Vec<AccountCode>,
}

impl Project {
    /// Label used by the "expense charged to" selector.
    pub fn charge_label(&self) -> String {
        format!("{} - {}", self.title, self.project_code)
    }

    pub fn find_by_label<'a>(projects: &'a [Project], label: &str) -> Option<&'a Project> {
        projects.iter().find(|project| project.charge_label() == label)
    }
}
