#![allow(dead_code)]

use std::{collections::HashMap, str::FromStr, sync::Arc};

use api_subs::{
    models::plan::{Plan, PlanDraft, PlanInterval},
    ports::PlanStore,
    services::{
        currency::CurrencyService,
        plan::PlanService,
        sub::{NewSubscription, SubscriptionLifecycle},
    },
    store::memory::{
        MemoryCurrencyStore, MemoryPlanStore, MemorySubscriptionStore, MemoryUserStore,
    },
};
use bigdecimal::BigDecimal;
use chrono::{Duration, NaiveDateTime, SubsecRound, Utc};
use db::models::{currency::Currency, user::User};
use uuid::Uuid;

pub struct Fixture {
    pub users: Arc<MemoryUserStore>,
    pub currencies: Arc<MemoryCurrencyStore>,
    pub plans: Arc<MemoryPlanStore>,
    pub subscriptions: Arc<MemorySubscriptionStore>,
    pub lifecycle: SubscriptionLifecycle,
    pub catalogue: PlanService,
    pub money: CurrencyService,
    pub usd: Currency,
}

impl Fixture {
    pub fn new() -> Self {
        let users = Arc::new(MemoryUserStore::new());
        let currencies = Arc::new(MemoryCurrencyStore::new());
        let subscriptions = Arc::new(MemorySubscriptionStore::new());
        let plans = Arc::new(MemoryPlanStore::referenced_by(subscriptions.clone()));
        let usd = currencies.add("USD", true).unwrap();

        let lifecycle =
            SubscriptionLifecycle::new(subscriptions.clone(), plans.clone(), users.clone());
        let catalogue = PlanService::new(plans.clone(), currencies.clone());
        let money = CurrencyService::new(currencies.clone());

        Fixture {
            users,
            currencies,
            plans,
            subscriptions,
            lifecycle,
            catalogue,
            money,
            usd,
        }
    }

    pub fn user(&self, name: &str) -> User {
        self.users
            .add(&format!("{}@example.com", name.to_lowercase()), name)
            .unwrap()
    }

    pub fn draft(&self, name: &str, price: &str, interval: PlanInterval) -> PlanDraft {
        PlanDraft {
            name: name.to_string(),
            description: format!("{} plan", name),
            price: BigDecimal::from_str(price).unwrap(),
            currency_id: self.usd.id,
            interval,
            features: vec![],
            is_active: true,
            is_public: true,
            sort_order: 0,
        }
    }

    pub async fn plan(&self, name: &str, price: &str, interval: PlanInterval) -> Plan {
        self.plans
            .create(self.draft(name, price, interval))
            .await
            .unwrap()
    }
}

pub fn now() -> NaiveDateTime {
    Utc::now().naive_utc().trunc_subsecs(6)
}

pub fn new_subscription(
    user: &User,
    plan: &Plan,
    days: i64,
    payment_method_id: Option<&str>,
) -> NewSubscription {
    let start = now();
    NewSubscription {
        user_id: user.id,
        plan_id: plan.id,
        start_date: start,
        end_date: start + Duration::days(days),
        payment_method_id: payment_method_id.map(str::to_string),
        metadata: HashMap::new(),
    }
}

pub fn missing_id() -> Uuid {
    Uuid::new_v4()
}
