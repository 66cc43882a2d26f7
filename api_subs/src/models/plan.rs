use std::fmt;

use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use common::error::{AppError, Res};
use db::models::plan::PlanFeature;
use serde::{Serialize, Serializer};
use uuid::Uuid;

/// Billing period of a plan.
///
/// Only `monthly` and `yearly` can be written through the catalogue; rows
/// holding anything else are still readable and surface as `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanInterval {
    Monthly,
    Yearly,
    Other(String),
}

impl PlanInterval {
    pub fn parse(value: &str) -> Res<Self> {
        match value.trim().to_lowercase().as_str() {
            "monthly" => Ok(PlanInterval::Monthly),
            "yearly" => Ok(PlanInterval::Yearly),
            other => Err(AppError::InvalidArgument(format!(
                "invalid billing interval '{}', expected monthly or yearly",
                other
            ))),
        }
    }

    pub fn from_stored(value: String) -> Self {
        Self::parse(&value).unwrap_or(PlanInterval::Other(value))
    }

    pub fn as_str(&self) -> &str {
        match self {
            PlanInterval::Monthly => "monthly",
            PlanInterval::Yearly => "yearly",
            PlanInterval::Other(value) => value,
        }
    }
}

impl fmt::Display for PlanInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PlanInterval {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: BigDecimal,
    pub currency_id: Uuid,
    pub interval: PlanInterval,
    pub features: Vec<PlanFeature>,
    pub is_active: bool,
    pub is_public: bool,
    pub sort_order: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Plan {
    /// A plan is free iff its price is exactly zero.
    pub fn is_free(&self) -> bool {
        self.price == BigDecimal::from(0)
    }
}

impl From<db::models::plan::Plan> for Plan {
    fn from(row: db::models::plan::Plan) -> Self {
        Plan {
            id: row.id,
            name: row.name,
            description: row.description,
            price: row.price,
            currency_id: row.currency_id,
            interval: PlanInterval::from_stored(row.billing_interval),
            features: row.features.0,
            is_active: row.is_active,
            is_public: row.is_public,
            sort_order: row.sort_order,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Catalogue input for creating or replacing a plan.
#[derive(Debug, Clone)]
pub struct PlanDraft {
    pub name: String,
    pub description: String,
    pub price: BigDecimal,
    pub currency_id: Uuid,
    pub interval: PlanInterval,
    pub features: Vec<PlanFeature>,
    pub is_active: bool,
    pub is_public: bool,
    pub sort_order: i32,
}

impl PlanDraft {
    pub(crate) fn into_write_request(self) -> db::dtos::plan::PlanWriteRequest {
        db::dtos::plan::PlanWriteRequest {
            name: self.name,
            description: self.description,
            price: self.price,
            currency_id: self.currency_id,
            billing_interval: self.interval.as_str().to_string(),
            features: self.features,
            is_active: self.is_active,
            is_public: self.is_public,
            sort_order: self.sort_order,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn parses_known_intervals_case_insensitively() {
        assert_eq!(PlanInterval::parse("Monthly").unwrap(), PlanInterval::Monthly);
        assert_eq!(PlanInterval::parse("yearly").unwrap(), PlanInterval::Yearly);
        assert!(matches!(
            PlanInterval::parse("weekly"),
            Err(AppError::InvalidArgument(_))
        ));
    }

    #[test]
    fn stored_unknown_interval_is_kept() {
        let interval = PlanInterval::from_stored("quarterly".to_string());
        assert_eq!(interval, PlanInterval::Other("quarterly".to_string()));
        assert_eq!(interval.to_string(), "quarterly");
    }

    #[test]
    fn zero_price_in_any_scale_is_free() {
        let mut plan = Plan {
            id: Uuid::new_v4(),
            name: "Basic".to_string(),
            description: "Starter plan".to_string(),
            price: BigDecimal::from_str("0.00").unwrap(),
            currency_id: Uuid::new_v4(),
            interval: PlanInterval::Monthly,
            features: vec![],
            is_active: true,
            is_public: true,
            sort_order: 0,
            created_at: chrono::Utc::now().naive_utc(),
            updated_at: chrono::Utc::now().naive_utc(),
        };
        assert!(plan.is_free());

        plan.price = BigDecimal::from_str("9.99").unwrap();
        assert!(!plan.is_free());
    }
}
