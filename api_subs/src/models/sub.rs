use std::{collections::HashMap, fmt, str::FromStr};

use chrono::{Months, NaiveDateTime};
use common::error::{AppError, Res};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::plan::{Plan, PlanInterval};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Cancelled,
    Expired,
    Pending,
    Failed,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Cancelled => "cancelled",
            SubscriptionStatus::Expired => "expired",
            SubscriptionStatus::Pending => "pending",
            SubscriptionStatus::Failed => "failed",
        }
    }
}

impl FromStr for SubscriptionStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Res<Self> {
        match value {
            "active" => Ok(SubscriptionStatus::Active),
            "cancelled" => Ok(SubscriptionStatus::Cancelled),
            "expired" => Ok(SubscriptionStatus::Expired),
            "pending" => Ok(SubscriptionStatus::Pending),
            "failed" => Ok(SubscriptionStatus::Failed),
            other => Err(AppError::InvalidArgument(format!(
                "invalid subscription status '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub status: SubscriptionStatus,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub renewal_date: Option<NaiveDateTime>,
    pub cancellation_date: Option<NaiveDateTime>,
    pub last_payment_date: Option<NaiveDateTime>,
    pub next_payment_attempt: Option<NaiveDateTime>,
    pub payment_method_id: Option<String>,
    pub metadata: HashMap<String, String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Subscription {
    /// Checks the entity invariants against the plan the subscription points at.
    pub fn validate(&self, plan: &Plan) -> Res<()> {
        if self.end_date <= self.start_date {
            return Err(AppError::ValidationFailed(
                "end date must be after start date".to_string(),
            ));
        }
        if let Some(renewal) = self.renewal_date {
            if renewal < self.start_date {
                return Err(AppError::ValidationFailed(
                    "renewal date cannot be before start date".to_string(),
                ));
            }
        }
        if let Some(cancelled) = self.cancellation_date {
            if cancelled < self.start_date || cancelled > self.end_date {
                return Err(AppError::ValidationFailed(
                    "cancellation date must lie between start and end date".to_string(),
                ));
            }
        }
        match (plan.is_free(), &self.payment_method_id) {
            (true, Some(_)) => Err(AppError::ValidationFailed(
                "free plans cannot carry a payment method".to_string(),
            )),
            (false, None) => Err(AppError::ValidationFailed(
                "paid plans require a payment method".to_string(),
            )),
            _ => Ok(()),
        }
    }

    pub fn is_active(&self, now: NaiveDateTime) -> bool {
        self.status == SubscriptionStatus::Active && now < self.end_date
    }

    pub fn has_expired(&self, now: NaiveDateTime) -> bool {
        now > self.end_date
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == SubscriptionStatus::Cancelled
    }

    pub fn needs_renewal(&self, now: NaiveDateTime) -> bool {
        self.status == SubscriptionStatus::Active
            && self.renewal_date.is_some_and(|renewal| now > renewal)
    }

    /// `now` pulled into the subscription's [start, end] window.
    pub fn cancellation_point(&self, now: NaiveDateTime) -> NaiveDateTime {
        now.max(self.start_date).min(self.end_date)
    }

    pub fn summary(&self, now: NaiveDateTime) -> SubscriptionSummary {
        SubscriptionSummary {
            id: self.id,
            user_id: self.user_id,
            plan_id: self.plan_id,
            status: self.status.to_string(),
            start_date: self.start_date,
            end_date: self.end_date,
            renewal_date: self.renewal_date,
            cancellation_date: self.cancellation_date,
            last_payment_date: self.last_payment_date,
            next_payment_attempt: self.next_payment_attempt,
            payment_method_id: self.payment_method_id.clone(),
            metadata: self.metadata.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            is_active: self.is_active(now),
        }
    }

    pub(crate) fn to_write_request(&self) -> db::dtos::subscription::SubscriptionWriteRequest {
        db::dtos::subscription::SubscriptionWriteRequest {
            user_id: self.user_id,
            plan_id: self.plan_id,
            status: self.status.to_string(),
            start_date: self.start_date,
            end_date: self.end_date,
            renewal_date: self.renewal_date,
            cancellation_date: self.cancellation_date,
            last_payment_date: self.last_payment_date,
            next_payment_attempt: self.next_payment_attempt,
            payment_method_id: self.payment_method_id.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

impl TryFrom<db::models::subscription::UserSubscription> for Subscription {
    type Error = AppError;

    fn try_from(row: db::models::subscription::UserSubscription) -> Res<Self> {
        let status = row.status.parse().map_err(|_| {
            AppError::Internal(format!(
                "subscription {} has unknown status '{}'",
                row.id, row.status
            ))
        })?;
        Ok(Subscription {
            id: row.id,
            user_id: row.user_id,
            plan_id: row.plan_id,
            status,
            start_date: row.start_date,
            end_date: row.end_date,
            renewal_date: row.renewal_date,
            cancellation_date: row.cancellation_date,
            last_payment_date: row.last_payment_date,
            next_payment_attempt: row.next_payment_attempt,
            payment_method_id: row.payment_method_id,
            metadata: row.metadata.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Caller-facing view of a subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionSummary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub status: String,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub renewal_date: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub cancellation_date: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub last_payment_date: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub next_payment_attempt: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub payment_method_id: Option<String>,
    pub metadata: HashMap<String, String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub is_active: bool,
}

/// Renewal point for a subscription ending at `end`.
///
/// Monthly and yearly plans both renew one calendar month before the end,
/// never earlier than `start`. Other intervals have no renewal point.
pub fn renewal_date(
    interval: &PlanInterval,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Option<NaiveDateTime> {
    match interval {
        PlanInterval::Monthly | PlanInterval::Yearly => end
            .checked_sub_months(Months::new(1))
            .map(|renewal| renewal.max(start)),
        PlanInterval::Other(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use bigdecimal::BigDecimal;
    use chrono::{Duration, NaiveDate};

    use super::*;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn plan(price: &str) -> Plan {
        Plan {
            id: Uuid::new_v4(),
            name: "Plan".to_string(),
            description: "".to_string(),
            price: BigDecimal::from_str(price).unwrap(),
            currency_id: Uuid::new_v4(),
            interval: PlanInterval::Monthly,
            features: vec![],
            is_active: true,
            is_public: true,
            sort_order: 0,
            created_at: at(2025, 1, 1),
            updated_at: at(2025, 1, 1),
        }
    }

    fn subscription(start: NaiveDateTime, end: NaiveDateTime) -> Subscription {
        Subscription {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            plan_id: Uuid::new_v4(),
            status: SubscriptionStatus::Active,
            start_date: start,
            end_date: end,
            renewal_date: None,
            cancellation_date: None,
            last_payment_date: None,
            next_payment_attempt: None,
            payment_method_id: None,
            metadata: HashMap::new(),
            created_at: start,
            updated_at: start,
        }
    }

    #[test]
    fn status_parses_the_five_values_only() {
        for status in ["active", "cancelled", "expired", "pending", "failed"] {
            assert_eq!(SubscriptionStatus::from_str(status).unwrap().as_str(), status);
        }
        assert!(matches!(
            SubscriptionStatus::from_str("paused"),
            Err(AppError::InvalidArgument(_))
        ));
    }

    #[test]
    fn renewal_is_one_month_before_end_for_both_intervals() {
        let start = at(2025, 1, 1);
        let end = at(2026, 1, 1);
        assert_eq!(
            renewal_date(&PlanInterval::Monthly, start, end),
            Some(at(2025, 12, 1))
        );
        assert_eq!(
            renewal_date(&PlanInterval::Yearly, start, end),
            Some(at(2025, 12, 1))
        );
        assert_eq!(
            renewal_date(&PlanInterval::Other("weekly".into()), start, end),
            None
        );
    }

    #[test]
    fn renewal_clamps_to_month_end_and_start() {
        assert_eq!(
            renewal_date(&PlanInterval::Monthly, at(2025, 1, 1), at(2025, 3, 31)),
            Some(at(2025, 2, 28))
        );
        let start = at(2025, 3, 1);
        assert_eq!(
            renewal_date(&PlanInterval::Monthly, start, start + Duration::days(10)),
            Some(start)
        );
    }

    #[test]
    fn validate_rejects_each_broken_invariant() {
        let start = at(2025, 1, 1);
        let free = plan("0");

        let inverted = subscription(start, start);
        assert!(matches!(inverted.validate(&free), Err(AppError::ValidationFailed(_))));

        let mut early_renewal = subscription(start, at(2025, 2, 1));
        early_renewal.renewal_date = Some(at(2024, 12, 31));
        assert!(matches!(early_renewal.validate(&free), Err(AppError::ValidationFailed(_))));

        let mut late_cancel = subscription(start, at(2025, 2, 1));
        late_cancel.cancellation_date = Some(at(2025, 2, 2));
        assert!(matches!(late_cancel.validate(&free), Err(AppError::ValidationFailed(_))));

        let mut free_with_card = subscription(start, at(2025, 2, 1));
        free_with_card.payment_method_id = Some("pm-1".to_string());
        assert!(matches!(free_with_card.validate(&free), Err(AppError::ValidationFailed(_))));

        let paid_without_card = subscription(start, at(2025, 2, 1));
        assert!(matches!(
            paid_without_card.validate(&plan("9.99")),
            Err(AppError::ValidationFailed(_))
        ));
    }

    #[test]
    fn predicates_follow_status_and_dates() {
        let mut sub = subscription(at(2025, 1, 1), at(2025, 2, 1));
        sub.renewal_date = Some(at(2025, 1, 15));

        let mid = at(2025, 1, 20);
        assert!(sub.is_active(mid));
        assert!(sub.needs_renewal(mid));
        assert!(!sub.has_expired(mid));

        let after = at(2025, 3, 1);
        assert!(!sub.is_active(after));
        assert!(sub.has_expired(after));

        sub.status = SubscriptionStatus::Cancelled;
        assert!(sub.is_cancelled());
        assert!(!sub.is_active(mid));
        assert!(!sub.needs_renewal(mid));
    }

    #[test]
    fn cancellation_point_stays_inside_window() {
        let sub = subscription(at(2025, 1, 1), at(2025, 2, 1));
        assert_eq!(sub.cancellation_point(at(2024, 6, 1)), at(2025, 1, 1));
        assert_eq!(sub.cancellation_point(at(2025, 1, 10)), at(2025, 1, 10));
        assert_eq!(sub.cancellation_point(at(2025, 6, 1)), at(2025, 2, 1));
    }

    #[test]
    fn summary_omits_absent_dates() {
        let sub = subscription(at(2025, 1, 1), at(2025, 2, 1));
        let json = serde_json::to_value(sub.summary(at(2025, 1, 10))).unwrap();
        assert_eq!(json["status"], "active");
        assert_eq!(json["is_active"], true);
        assert!(json.get("renewal_date").is_none());
        assert!(json.get("payment_method_id").is_none());
    }
}
