use db::dtos::currency::CurrencyWriteRequest;
use serde::Deserialize;

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct CurrencyRequest {
    pub code: String,
    pub name: String,
    pub symbol: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl From<CurrencyRequest> for CurrencyWriteRequest {
    fn from(req: CurrencyRequest) -> Self {
        CurrencyWriteRequest {
            code: req.code,
            name: req.name,
            symbol: req.symbol,
            is_active: req.is_active,
        }
    }
}
