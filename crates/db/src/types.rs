use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Fixed 5-level severity scale. Level 1 is the most urgent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
#[serde(into = "i16", try_from = "i16")]
pub enum Urgency {
    #[sea_orm(num_value = 1)]
    SafetyHazard,
    #[sea_orm(num_value = 2)]
    Urgent,
    #[sea_orm(num_value = 3)]
    Important,
    #[sea_orm(num_value = 4)]
    Moderate,
    #[sea_orm(num_value = 5)]
    Minor,
}

impl Urgency {
    pub fn level(self) -> i16 {
        match self {
            Urgency::SafetyHazard => 1,
            Urgency::Urgent => 2,
            Urgency::Important => 3,
            Urgency::Moderate => 4,
            Urgency::Minor => 5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Urgency::SafetyHazard => "Safety Hazard or Work Stoppage",
            Urgency::Urgent => "Urgent Issue",
            Urgency::Important => "Important Issue",
            Urgency::Moderate => "Moderate Issue",
            Urgency::Minor => "Minor Issue or Suggestion",
        }
    }
}

impl From<Urgency> for i16 {
    fn from(urgency: Urgency) -> i16 {
        urgency.level()
    }
}

impl TryFrom<i16> for Urgency {
    type Error = String;

    fn try_from(level: i16) -> Result<Self, Self::Error> {
        match level {
            1 => Ok(Urgency::SafetyHazard),
            2 => Ok(Urgency::Urgent),
            3 => Ok(Urgency::Important),
            4 => Ok(Urgency::Moderate),
            5 => Ok(Urgency::Minor),
            other => Err(format!("urgency must be between 1 and 5, got {other}")),
        }
    }
}

/// Fields a ticket list may filter on. Anything outside this allow-list in a
/// stored view marks the view as corrupt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FilterField {
    Urgency,
    IsResolved,
    Technician,
    Item,
    Location,
    SubmittedBy,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FilterOp {
    Eq,
    In,
    IsNull,
}

/// Fields a ticket list may be ordered by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SortField {
    SubmittedAt,
    Urgency,
    ShortDescription,
    Item,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

pub const MAX_FILTER_CLAUSES: usize = 5;
pub const MAX_SORT_KEYS: usize = 3;
pub const DEFAULT_PAGE_SIZE: u64 = 25;
pub const MAX_PAGE_SIZE: u64 = 100;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterClause {
    pub field: FilterField,
    pub op: FilterOp,
    #[serde(default)]
    pub value: serde_json::Value,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: SortField,
    #[serde(default)]
    pub direction: SortDirection,
}

/// The resolved query shape for the ticket list: filters, sort order, free
/// text search and page size. This is what a saved view persists.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TicketListShape {
    #[serde(default)]
    pub filters: Vec<FilterClause>,
    #[serde(default)]
    pub sorts: Vec<SortSpec>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

impl Default for TicketListShape {
    /// System-wide default: unresolved tickets, newest first.
    fn default() -> Self {
        Self {
            filters: vec![FilterClause {
                field: FilterField::IsResolved,
                op: FilterOp::Eq,
                value: serde_json::Value::Bool(false),
            }],
            sorts: vec![SortSpec {
                field: SortField::SubmittedAt,
                direction: SortDirection::Desc,
            }],
            search: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl TicketListShape {
    /// Enforces the clause/sort bounds and the page size range.
    pub fn clamped(mut self) -> Self {
        self.filters.truncate(MAX_FILTER_CLAUSES);
        self.sorts.truncate(MAX_SORT_KEYS);
        self.page_size = self.page_size.clamp(1, MAX_PAGE_SIZE);
        if let Some(search) = &self.search
            && search.trim().is_empty()
        {
            self.search = None;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urgency_rejects_out_of_range_levels() {
        assert!(Urgency::try_from(0).is_err());
        assert!(Urgency::try_from(6).is_err());
        assert_eq!(Urgency::try_from(1).unwrap(), Urgency::SafetyHazard);
        assert_eq!(Urgency::try_from(5).unwrap(), Urgency::Minor);
    }

    #[test]
    fn urgency_serializes_as_level_number() {
        let json = serde_json::to_value(Urgency::Important).unwrap();
        assert_eq!(json, serde_json::json!(3));
        let back: Urgency = serde_json::from_value(serde_json::json!(3)).unwrap();
        assert_eq!(back, Urgency::Important);
        assert!(serde_json::from_value::<Urgency>(serde_json::json!(9)).is_err());
    }

    #[test]
    fn unknown_filter_field_fails_decode() {
        let raw = serde_json::json!({
            "filters": [{"field": "condition", "op": "eq", "value": 1}],
            "sorts": []
        });
        assert!(serde_json::from_value::<TicketListShape>(raw).is_err());
    }

    #[test]
    fn clamped_enforces_bounds() {
        let shape = TicketListShape {
            filters: vec![
                FilterClause {
                    field: FilterField::Urgency,
                    op: FilterOp::Eq,
                    value: serde_json::json!(1),
                };
                8
            ],
            sorts: vec![
                SortSpec {
                    field: SortField::Urgency,
                    direction: SortDirection::Asc,
                };
                5
            ],
            search: Some("   ".to_string()),
            page_size: 10_000,
        }
        .clamped();

        assert_eq!(shape.filters.len(), MAX_FILTER_CLAUSES);
        assert_eq!(shape.sorts.len(), MAX_SORT_KEYS);
        assert_eq!(shape.page_size, MAX_PAGE_SIZE);
        assert!(shape.search.is_none());
    }
}
