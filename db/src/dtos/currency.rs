/// Column values written by both insert and update.
#[derive(Debug, Clone)]
pub struct CurrencyWriteRequest {
    pub code: String,
    pub name: String,
    pub symbol: String,
    pub is_active: bool,
}
