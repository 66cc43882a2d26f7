use std::sync::Arc;

use common::error::{AppError, Res, ResExt};
use db::{dtos::currency::CurrencyWriteRequest, models::currency::Currency};
use uuid::Uuid;

use crate::ports::CurrencyStore;

/// Currencies plans can be priced in.
#[derive(Clone)]
pub struct CurrencyService {
    currencies: Arc<dyn CurrencyStore>,
}

/// Trims the fields and upper-cases the code. Every field is required.
fn normalize(draft: CurrencyWriteRequest) -> Res<CurrencyWriteRequest> {
    let draft = CurrencyWriteRequest {
        code: draft.code.trim().to_uppercase(),
        name: draft.name.trim().to_string(),
        symbol: draft.symbol.trim().to_string(),
        is_active: draft.is_active,
    };
    for (field, value) in [
        ("code", &draft.code),
        ("name", &draft.name),
        ("symbol", &draft.symbol),
    ] {
        if value.is_empty() {
            return Err(AppError::InvalidArgument(format!(
                "currency {} is required",
                field
            )));
        }
    }
    Ok(draft)
}

impl CurrencyService {
    pub fn new(currencies: Arc<dyn CurrencyStore>) -> Self {
        Self { currencies }
    }

    pub async fn list_active_currencies(&self) -> Res<Vec<Currency>> {
        self.currencies
            .get_all_active()
            .await
            .context("listing currencies")
    }

    pub async fn create_currency(&self, draft: CurrencyWriteRequest) -> Res<Currency> {
        let currency = self
            .currencies
            .create(normalize(draft)?)
            .await
            .context("creating currency")?;
        log::info!("Created currency {} ({})", currency.id, currency.code);
        Ok(currency)
    }

    pub async fn update_currency(
        &self,
        currency_id: Uuid,
        draft: CurrencyWriteRequest,
    ) -> Res<Currency> {
        let currency = self
            .currencies
            .update(currency_id, normalize(draft)?)
            .await
            .context("updating currency")?;
        log::info!("Updated currency {} ({})", currency.id, currency.code);
        Ok(currency)
    }
}
