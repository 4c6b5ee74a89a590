//! In-progress request state: scalar fields plus editable item-group rows.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::debug;

use crate::calculator::aggregate;
use crate::domain::item_group::LineItem;
use crate::domain::project::{AccountCode, Project};
use crate::domain::request::{
    FieldConstraint, FieldSpec, Request, ACCOUNT_CODE, EXPENSE_CHARGED_TO,
};
use crate::domain::user::UserId;
use crate::errors::DomainError;

/// A row paired with its edit-mode flag, so the two can never drift apart.
#[derive(Clone, Debug, PartialEq)]
pub struct EditableRow<G> {
    pub row: G,
    pub is_editing: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: String,
    pub reason: String,
}

impl ValidationIssue {
    fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { field: field.into(), reason: reason.into() }
    }
}

#[derive(Clone, Debug)]
pub struct DraftStore<G> {
    request: Request<G>,
    rows: Vec<EditableRow<G>>,
    projects: Vec<Project>,
    budget: Decimal,
}

impl<G> DraftStore<G>
where
    G: LineItem,
{
    /// Wraps an existing request; its rows start locked, as when re-opening a saved request.
    pub fn new(mut request: Request<G>, projects: Vec<Project>) -> Self {
        let rows = std::mem::take(&mut request.item_groups)
            .into_iter()
            .map(|mut row| {
                row.recompute();
                EditableRow { row, is_editing: false }
            })
            .collect();

        let mut store = Self { request, rows, projects, budget: Decimal::ZERO };
        store.refresh_totals();
        store
    }

    pub fn request(&self) -> &Request<G> {
        &self.request
    }

    pub fn rows(&self) -> &[EditableRow<G>] {
        &self.rows
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn budget(&self) -> Decimal {
        self.budget
    }

    /// Snapshot of the request with its rows and derived total filled in.
    pub fn snapshot(&self) -> Request<G> {
        let mut request = self.request.clone();
        request.item_groups = self.rows.iter().map(|entry| entry.row.clone()).collect();
        request.total = self.budget;
        request
    }

    pub fn set_field(&mut self, name: &str, value: impl Into<String>) -> Result<(), DomainError> {
        let value = value.into();
        match name {
            EXPENSE_CHARGED_TO => {
                self.request.project = Project::find_by_label(&self.projects, &value)
                    .map(|project| project.id.clone());
                self.request.account_code.clear();
                debug!(
                    event_name = "draft.expense_charged_to_changed",
                    request_kind = %self.request.kind,
                    project_resolved = self.request.project.is_some(),
                    "dependent account code reset"
                );
                self.request.expense_charged_to = value;
            }
            ACCOUNT_CODE => self.request.account_code = value,
            other => {
                if self.request.kind.field_spec(other).is_none() {
                    return Err(DomainError::UnknownField { field: other.to_string() });
                }
                self.request.fields.insert(other.to_string(), Value::String(value));
            }
        }
        Ok(())
    }

    pub fn set_reviewer(&mut self, reviewer: impl AsRef<str>) {
        self.request.reviewed_by = UserId::non_empty(reviewer);
    }

    pub fn set_approver(&mut self, approver: impl AsRef<str>) {
        self.request.approved_by = UserId::non_empty(approver);
    }

    pub fn set_copied_to(&mut self, users: Vec<UserId>) {
        self.request.copied_to = users;
    }

    /// Account codes of the currently selected project.
    pub fn account_code_options(&self) -> &[AccountCode] {
        self.request
            .project
            .as_ref()
            .and_then(|id| self.projects.iter().find(|project| &project.id == id))
            .map(|project| project.account_code.as_slice())
            .unwrap_or(&[])
    }

    /// Appends an empty row in edit mode and returns its index.
    pub fn add_item_group(&mut self) -> usize {
        self.rows.push(EditableRow { row: G::default(), is_editing: true });
        self.refresh_totals();
        self.rows.len() - 1
    }

    pub fn remove_item_group(&mut self, index: usize) -> Result<G, DomainError> {
        self.check_index(index)?;
        let removed = self.rows.remove(index);
        self.refresh_totals();
        Ok(removed.row)
    }

    pub fn update_item_group(
        &mut self,
        index: usize,
        field: G::Field,
        value: &str,
    ) -> Result<(), DomainError> {
        self.check_index(index)?;
        let entry = &mut self.rows[index];
        if !entry.is_editing {
            return Err(DomainError::RowLocked { index });
        }
        entry.row.set(field, value)?;
        self.refresh_totals();
        Ok(())
    }

    /// Flips edit mode for one row and returns the new state.
    pub fn toggle_row_edit(&mut self, index: usize) -> Result<bool, DomainError> {
        self.check_index(index)?;
        let entry = &mut self.rows[index];
        entry.is_editing = !entry.is_editing;
        Ok(entry.is_editing)
    }

    /// Form-level constraint check run before any submission leaves the client.
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        for spec in self.request.kind.schema() {
            let value = self.request.field(spec.name).unwrap_or_default();
            if let Some(issue) = check_field(spec, value.trim()) {
                issues.push(issue);
            }
        }

        for (index, entry) in self.rows.iter().enumerate() {
            for field in entry.row.negative_inputs() {
                issues.push(ValidationIssue::new(
                    format!("itemGroups[{index}].{field}"),
                    "must be zero or greater",
                ));
            }
        }
        issues
    }

    pub fn ensure_valid(&self) -> Result<(), DomainError> {
        let issues = self.validate();
        if issues.is_empty() {
            return Ok(());
        }
        Err(DomainError::InvalidFields(issues.into_iter().map(|issue| issue.field).collect()))
    }

    fn check_index(&self, index: usize) -> Result<(), DomainError> {
        if index < self.rows.len() {
            Ok(())
        } else {
            Err(DomainError::RowOutOfRange { index, len: self.rows.len() })
        }
    }

    fn refresh_totals(&mut self) {
        self.budget = aggregate(self.rows.iter().map(|entry| &entry.row));
        self.request.total = self.budget;
    }
}

fn check_field(spec: &FieldSpec, value: &str) -> Option<ValidationIssue> {
    if value.is_empty() {
        return spec.required.then(|| ValidationIssue::new(spec.name, "is required"));
    }

    match spec.constraint {
        FieldConstraint::Text => None,
        FieldConstraint::Date => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .is_err()
            .then(|| ValidationIssue::new(spec.name, "must be a date (YYYY-MM-DD)")),
        FieldConstraint::Digits => (!value.chars().all(|ch| ch.is_ascii_digit()))
            .then(|| ValidationIssue::new(spec.name, "must contain digits only")),
        FieldConstraint::Number { min, max } => match value.parse::<i64>() {
            Ok(number) if (min..=max).contains(&number) => None,
            _ => Some(ValidationIssue::new(
                spec.name,
                format!("must be a whole number between {min} and {max}"),
            )),
        },
    }
}
