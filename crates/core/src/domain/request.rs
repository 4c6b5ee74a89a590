use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::domain::comment::Comment;
use crate::domain::project::ProjectId;
use crate::domain::status::RequestStatus;
use crate::domain::user::UserId;

pub const EXPENSE_CHARGED_TO: &str = "expenseChargedTo";
pub const ACCOUNT_CODE: &str = "accountCode";

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub String);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Purchase,
    Payment,
    Advance,
    Travel,
    Expense,
    Concept,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldConstraint {
    Text,
    /// ISO `YYYY-MM-DD`.
    Date,
    Digits,
    Number { min: i64, max: i64 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub required: bool,
    pub constraint: FieldConstraint,
}

const fn text(name: &'static str, required: bool) -> FieldSpec {
    FieldSpec { name, required, constraint: FieldConstraint::Text }
}

const fn date(name: &'static str, required: bool) -> FieldSpec {
    FieldSpec { name, required, constraint: FieldConstraint::Date }
}

const fn number(name: &'static str, required: bool, min: i64, max: i64) -> FieldSpec {
    FieldSpec { name, required, constraint: FieldConstraint::Number { min, max } }
}

const CHARGE_FIELDS: [FieldSpec; 2] = [text(EXPENSE_CHARGED_TO, true), text(ACCOUNT_CODE, true)];

const PURCHASE_FIELDS: &[FieldSpec] = &[
    text("department", true),
    text("suggestedSupplier", true),
    text("address", true),
    text("city", false),
    date("dateRequired", true),
    text("purpose", true),
    CHARGE_FIELDS[0],
    CHARGE_FIELDS[1],
];

const PAYMENT_FIELDS: &[FieldSpec] = &[
    text("department", true),
    text("payee", true),
    text("amountInWords", false),
    text("purpose", true),
    text("bankName", false),
    FieldSpec { name: "accountNumber", required: false, constraint: FieldConstraint::Digits },
    CHARGE_FIELDS[0],
    CHARGE_FIELDS[1],
];

const ADVANCE_FIELDS: &[FieldSpec] = &[
    text("department", true),
    text("purpose", true),
    date("startDate", true),
    date("endDate", true),
    CHARGE_FIELDS[0],
    CHARGE_FIELDS[1],
];

const TRAVEL_FIELDS: &[FieldSpec] = &[
    text("department", true),
    text("destination", true),
    text("purpose", true),
    date("departureDate", true),
    date("returnDate", true),
    number("numberOfTravellers", false, 1, 50),
    CHARGE_FIELDS[0],
    CHARGE_FIELDS[1],
];

const EXPENSE_FIELDS: &[FieldSpec] = &[
    text("department", true),
    text("purpose", true),
    date("expenseDate", true),
    CHARGE_FIELDS[0],
    CHARGE_FIELDS[1],
];

const CONCEPT_FIELDS: &[FieldSpec] = &[
    text("title", true),
    text("background", true),
    text("objectives", true),
    date("startDate", false),
    date("endDate", false),
    number("durationMonths", false, 1, 120),
    CHARGE_FIELDS[0],
    CHARGE_FIELDS[1],
];

impl RequestKind {
    pub const ALL: [RequestKind; 6] =
        [Self::Purchase, Self::Payment, Self::Advance, Self::Travel, Self::Expense, Self::Concept];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::Payment => "payment",
            Self::Advance => "advance",
            Self::Travel => "travel",
            Self::Expense => "expense",
            Self::Concept => "concept",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value.trim().to_ascii_lowercase())
    }

    /// Path segment of the backend resource serving this kind.
    pub fn resource(&self) -> &'static str {
        match self {
            Self::Purchase => "purchase-requests",
            Self::Payment => "payment-requests",
            Self::Advance => "advance-requests",
            Self::Travel => "travel-requests",
            Self::Expense => "expense-requests",
            Self::Concept => "concept-notes",
        }
    }

    pub fn uses_travel_rows(&self) -> bool {
        matches!(self, Self::Travel)
    }

    pub fn schema(&self) -> &'static [FieldSpec] {
        match self {
            Self::Purchase => PURCHASE_FIELDS,
            Self::Payment => PAYMENT_FIELDS,
            Self::Advance => ADVANCE_FIELDS,
            Self::Travel => TRAVEL_FIELDS,
            Self::Expense => EXPENSE_FIELDS,
            Self::Concept => CONCEPT_FIELDS,
        }
    }

    pub fn field_spec(&self, name: &str) -> Option<&'static FieldSpec> {
        self.schema().iter().find(|spec| spec.name == name)
    }
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One request of any kind, generic over its row type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request<G> {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
    /// Not part of the backend payload; see [`Request::tagged`].
    #[serde(skip_deserializing, default = "untagged_kind")]
    pub kind: RequestKind,
    #[serde(default)]
    pub status: RequestStatus,
    #[serde(default, deserialize_with = "optional_user_id")]
    pub reviewed_by: Option<UserId>,
    #[serde(default, deserialize_with = "optional_user_id")]
    pub approved_by: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectId>,
    #[serde(default)]
    pub expense_charged_to: String,
    #[serde(default)]
    pub account_code: String,
    #[serde(default)]
    pub item_groups: Vec<G>,
    #[serde(default)]
    pub copied_to: Vec<UserId>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub total: Decimal,
    /// Kind-specific scalar fields keyed by their wire name.
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

impl<G> Request<G> {
    pub fn new(kind: RequestKind) -> Self {
        Self {
            id: None,
            kind,
            status: RequestStatus::Draft,
            reviewed_by: None,
            approved_by: None,
            project: None,
            expense_charged_to: String::new(),
            account_code: String::new(),
            item_groups: Vec::new(),
            copied_to: Vec::new(),
            comments: Vec::new(),
            total: Decimal::ZERO,
            fields: BTreeMap::new(),
        }
    }

    /// Current value of a scalar field, typed or kind-specific.
    pub fn field(&self, name: &str) -> Option<String> {
        match name {
            EXPENSE_CHARGED_TO => Some(self.expense_charged_to.clone()),
            ACCOUNT_CODE => Some(self.account_code.clone()),
            _ => self.fields.get(name).and_then(|value| match value {
                Value::String(text) => Some(text.clone()),
                Value::Number(number) => Some(number.to_string()),
                Value::Bool(flag) => Some(flag.to_string()),
                _ => None,
            }),
        }
    }

    /// Scalar fields of this kind's schema, in schema order.
    pub fn scalar_fields(&self) -> Vec<(&'static str, String)> {
        self.kind
            .schema()
            .iter()
            .map(|spec| (spec.name, self.field(spec.name).unwrap_or_default()))
            .collect()
    }

    /// Sets the kind the caller fetched or loaded this request as.
    pub fn tagged(mut self, kind: RequestKind) -> Self {
        self.kind = kind;
        self.fields.remove("kind");
        self
    }

    pub fn has_reviewer(&self) -> bool {
        self.reviewed_by.is_some()
    }
}

fn untagged_kind() -> RequestKind {
    RequestKind::Purchase
}

fn optional_user_id<'de, D>(deserializer: D) -> Result<Option<UserId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(UserId::non_empty))
}
