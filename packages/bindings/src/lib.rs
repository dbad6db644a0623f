use napi::Result as NapiResult;
use napi_derive::napi;

use personal_finance_core::debt::{amortization, prepayment};
use personal_finance_core::investment::projection;
use personal_finance_core::taxes::tables::TaxTable;
use personal_finance_core::taxes::withholding;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Debt
// ---------------------------------------------------------------------------

#[napi]
pub fn amortization_schedule(input_json: String) -> NapiResult<String> {
    let input: amortization::LoanTerms =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = amortization::build_amortization_schedule(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn simulate_prepayments(input_json: String) -> NapiResult<String> {
    let input: prepayment::PrepaymentInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = prepayment::simulate_prepayments(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Investment
// ---------------------------------------------------------------------------

#[napi]
pub fn project_investment(input_json: String) -> NapiResult<String> {
    let input: projection::InvestmentTerms =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = projection::project_investment(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Taxes
// ---------------------------------------------------------------------------

/// Withholding for a salary. `table_json` overrides the built-in 2026 table.
#[napi]
pub fn calculate_withholding(input_json: String, table_json: Option<String>) -> NapiResult<String> {
    let input: withholding::TaxInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let table: TaxTable = match table_json {
        Some(json) => serde_json::from_str(&json).map_err(to_napi_error)?,
        None => TaxTable::colombia_2026(),
    };
    let output = withholding::calculate_withholding(&input, &table).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn default_tax_table() -> NapiResult<String> {
    serde_json::to_string(&TaxTable::colombia_2026()).map_err(to_napi_error)
}
