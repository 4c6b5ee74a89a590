use std::fmt::Debug;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::calculator::{compute_total, compute_travel_total};
use crate::errors::DomainError;

/// A billable row whose total is always derived from its other inputs.
pub trait LineItem: Clone + Debug + Default + PartialEq + Serialize + DeserializeOwned {
    type Field: Copy + Debug + FromStr<Err = DomainError>;

    fn label(&self) -> &str;
    fn total(&self) -> Decimal;
    /// Sets one input and recomputes the total.
    fn set(&mut self, field: Self::Field, value: &str) -> Result<(), DomainError>;
    fn recompute(&mut self);
    /// Names of numeric inputs currently below zero.
    fn negative_inputs(&self) -> Vec<&'static str>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemGroupField {
    Description,
    Frequency,
    Quantity,
    UnitCost,
}

impl FromStr for ItemGroupField {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "description" => Ok(Self::Description),
            "frequency" => Ok(Self::Frequency),
            "quantity" => Ok(Self::Quantity),
            "unitCost" | "unit_cost" => Ok(Self::UnitCost),
            other => Err(DomainError::UnknownField { field: other.to_string() }),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemGroup {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub frequency: Option<Decimal>,
    #[serde(default)]
    pub quantity: Option<Decimal>,
    #[serde(default)]
    pub unit_cost: Option<Decimal>,
    #[serde(default)]
    total: Decimal,
}

impl ItemGroup {
    pub fn with_values(
        description: impl Into<String>,
        frequency: Option<Decimal>,
        quantity: Option<Decimal>,
        unit_cost: Option<Decimal>,
    ) -> Self {
        let mut row = Self {
            description: description.into(),
            frequency,
            quantity,
            unit_cost,
            total: Decimal::ZERO,
        };
        row.recompute();
        row
    }
}

impl LineItem for ItemGroup {
    type Field = ItemGroupField;

    fn label(&self) -> &str {
        &self.description
    }

    fn total(&self) -> Decimal {
        self.total
    }

    fn set(&mut self, field: ItemGroupField, value: &str) -> Result<(), DomainError> {
        match field {
            ItemGroupField::Description => self.description = value.to_string(),
            ItemGroupField::Frequency => self.frequency = parse_amount("frequency", value)?,
            ItemGroupField::Quantity => self.quantity = parse_amount("quantity", value)?,
            ItemGroupField::UnitCost => self.unit_cost = parse_amount("unitCost", value)?,
        }
        self.recompute();
        Ok(())
    }

    fn recompute(&mut self) {
        self.total = compute_total(self.frequency, self.quantity, self.unit_cost);
    }

    fn negative_inputs(&self) -> Vec<&'static str> {
        [("frequency", self.frequency), ("quantity", self.quantity), ("unitCost", self.unit_cost)]
            .into_iter()
            .filter(|(_, value)| value.is_some_and(|value| value.is_sign_negative()))
            .map(|(name, _)| name)
            .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TravelItemField {
    Expense,
    DaysNumber,
    Rate,
}

impl FromStr for TravelItemField {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "expense" => Ok(Self::Expense),
            "daysNumber" | "days_number" => Ok(Self::DaysNumber),
            "rate" => Ok(Self::Rate),
            other => Err(DomainError::UnknownField { field: other.to_string() }),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelItemGroup {
    #[serde(default)]
    pub expense: String,
    #[serde(default)]
    pub days_number: Option<Decimal>,
    #[serde(default)]
    pub rate: Option<Decimal>,
    #[serde(default)]
    total: Decimal,
}

impl TravelItemGroup {
    pub fn with_values(
        expense: impl Into<String>,
        days_number: Option<Decimal>,
        rate: Option<Decimal>,
    ) -> Self {
        let mut row = Self { expense: expense.into(), days_number, rate, total: Decimal::ZERO };
        row.recompute();
        row
    }
}

impl LineItem for TravelItemGroup {
    type Field = TravelItemField;

    fn label(&self) -> &str {
        &self.expense
    }

    fn total(&self) -> Decimal {
        self.total
    }

    fn set(&mut self, field: TravelItemField, value: &str) -> Result<(), DomainError> {
        match field {
            TravelItemField::Expense => self.expense = value.to_string(),
            TravelItemField::DaysNumber => self.days_number = parse_amount("daysNumber", value)?,
            TravelItemField::Rate => self.rate = parse_amount("rate", value)?,
        }
        self.recompute();
        Ok(())
    }

    fn recompute(&mut self) {
        self.total = compute_travel_total(self.days_number, self.rate);
    }

    fn negative_inputs(&self) -> Vec<&'static str> {
        [("daysNumber", self.days_number), ("rate", self.rate)]
            .into_iter()
            .filter(|(_, value)| value.is_some_and(|value| value.is_sign_negative()))
            .map(|(name, _)| name)
            .collect()
    }
}

fn parse_amount(field: &'static str, value: &str) -> Result<Option<Decimal>, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    trimmed.parse::<Decimal>().map(Some).map_err(|_| DomainError::InvalidNumber {
        field: field.to_string(),
        value: value.to_string(),
    })
}
