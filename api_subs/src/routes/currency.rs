use std::sync::Arc;

use actix_web::{
    Responder, get,
    web::{self},
};
use common::{error::Res, http::Success};

use crate::services::currency::CurrencyService;

/// Lists the currencies plans can be priced in.
#[get("")]
pub async fn get_currencies(currencies: web::Data<Arc<CurrencyService>>) -> Res<impl Responder> {
    Success::ok(currencies.list_active_currencies().await?)
}
