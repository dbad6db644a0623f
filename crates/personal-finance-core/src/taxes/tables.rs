//! Fiscal-year configuration for the withholding calculator.
//!
//! A `TaxTable` is plain data: load one from JSON/YAML or start from
//! [`TaxTable::colombia_2026`]. Several tables can coexist; nothing here is
//! global.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::FinanceError;
use crate::types::{Money, Rate};
use crate::FinanceResult;

/// Published tables round their accumulated tax; differences up to this many
/// tax units from the bracket arithmetic are accepted silently.
pub const ACCUMULATED_TAX_TOLERANCE_UNITS: Decimal = dec!(1);

/// One row of the progressive withholding table, in tax units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxBracket {
    /// Inclusive upper bound; `None` for the open top bracket.
    pub upper_bound: Option<Decimal>,
    pub marginal_rate: Rate,
    /// Tax owed at this bracket's lower edge.
    pub accumulated_tax: Decimal,
}

/// Solidarity-fund rate by minimum-wage multiple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolidarityBracket {
    /// Inclusive upper bound in minimum-wage multiples; `None` when open.
    pub up_to_multiple: Option<Decimal>,
    pub rate: Rate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxTable {
    pub fiscal_year: u16,
    /// Money value of one tax unit (UVT).
    pub tax_unit_value: Money,
    pub minimum_wage: Money,
    pub transport_allowance: Money,
    /// Allowance is paid while base salary ≤ this many minimum wages.
    pub allowance_max_wage_multiple: Decimal,
    pub pension_rate: Rate,
    pub health_rate: Rate,
    /// Solidarity fund applies from this many minimum wages.
    pub solidarity_min_wage_multiple: Decimal,
    pub solidarity_brackets: Vec<SolidarityBracket>,
    pub withholding_brackets: Vec<TaxBracket>,
    /// Monthly deduction per dependent, in tax units.
    pub dependent_deduction_units: Decimal,
    pub max_dependents: u32,
    /// Monthly cap on the prepaid-health deduction, in tax units.
    pub prepaid_health_cap_units: Decimal,
}

fn bracket(upper_bound: Option<Decimal>, marginal_rate: Rate, accumulated_tax: Decimal) -> TaxBracket {
    TaxBracket {
        upper_bound,
        marginal_rate,
        accumulated_tax,
    }
}

fn solidarity(up_to_multiple: Option<Decimal>, rate: Rate) -> SolidarityBracket {
    SolidarityBracket {
        up_to_multiple,
        rate,
    }
}

impl TaxTable {
    /// Colombia 2026: Art. 383 ET withholding on labour income, Ley 100
    /// solidarity fund, 2026 UVT, minimum wage and transport allowance.
    pub fn colombia_2026() -> Self {
        TaxTable {
            fiscal_year: 2026,
            tax_unit_value: dec!(52_374),
            minimum_wage: dec!(1_750_905),
            transport_allowance: dec!(249_095),
            allowance_max_wage_multiple: dec!(2),
            pension_rate: dec!(0.04),
            health_rate: dec!(0.04),
            solidarity_min_wage_multiple: dec!(4),
            solidarity_brackets: vec![
                solidarity(Some(dec!(16)), dec!(0.01)),
                solidarity(Some(dec!(17)), dec!(0.012)),
                solidarity(Some(dec!(18)), dec!(0.014)),
                solidarity(Some(dec!(19)), dec!(0.016)),
                solidarity(Some(dec!(20)), dec!(0.018)),
                solidarity(None, dec!(0.02)),
            ],
            withholding_brackets: vec![
                bracket(Some(dec!(95)), dec!(0), dec!(0)),
                bracket(Some(dec!(150)), dec!(0.19), dec!(0)),
                bracket(Some(dec!(360)), dec!(0.28), dec!(10.45)),
                bracket(Some(dec!(640)), dec!(0.33), dec!(69.25)),
                bracket(Some(dec!(945)), dec!(0.35), dec!(161.65)),
                bracket(Some(dec!(2300)), dec!(0.37), dec!(268.40)),
                bracket(None, dec!(0.39), dec!(769.75)),
            ],
            dependent_deduction_units: dec!(6),
            max_dependents: 4,
            prepaid_health_cap_units: dec!(16),
        }
    }

    /// Salary threshold above which the transport allowance stops.
    pub fn allowance_ceiling(&self) -> Money {
        self.allowance_max_wage_multiple * self.minimum_wage
    }

    /// Salary threshold from which the solidarity fund applies.
    pub fn solidarity_threshold(&self) -> Money {
        self.solidarity_min_wage_multiple * self.minimum_wage
    }

    /// Money to tax units. Unrounded; zero when the unit value is zero.
    pub fn to_units(&self, amount: Money) -> Decimal {
        amount.checked_div(self.tax_unit_value).unwrap_or(Decimal::ZERO)
    }

    /// Tax units to money. Unrounded.
    pub fn from_units(&self, units: Decimal) -> Money {
        units * self.tax_unit_value
    }

    /// Reject tables the calculator cannot evaluate meaningfully.
    pub fn validate(&self) -> FinanceResult<()> {
        let invalid = |msg: String| -> FinanceResult<()> { Err(FinanceError::InvalidTable(msg)) };

        if self.tax_unit_value <= Decimal::ZERO {
            return invalid("tax_unit_value must be positive".into());
        }
        if self.minimum_wage <= Decimal::ZERO {
            return invalid("minimum_wage must be positive".into());
        }
        if self.transport_allowance < Decimal::ZERO {
            return invalid("transport_allowance must be non-negative".into());
        }
        if self.allowance_max_wage_multiple < Decimal::ZERO
            || self.solidarity_min_wage_multiple < Decimal::ZERO
        {
            return invalid("wage multiples must be non-negative".into());
        }
        if self.dependent_deduction_units < Decimal::ZERO || self.prepaid_health_cap_units < Decimal::ZERO {
            return invalid("deduction caps must be non-negative".into());
        }
        for (name, rate) in [("pension_rate", self.pension_rate), ("health_rate", self.health_rate)] {
            if !is_unit_rate(rate) {
                return invalid(format!("{name} must be between 0 and 1"));
            }
        }

        self.validate_solidarity()?;
        self.validate_withholding()
    }

    fn validate_solidarity(&self) -> FinanceResult<()> {
        let bounds: Vec<Option<Decimal>> = self
            .solidarity_brackets
            .iter()
            .map(|b| b.up_to_multiple)
            .collect();
        check_bounds("solidarity_brackets", &bounds)?;

        if let Some(i) = self.solidarity_brackets.iter().position(|b| !is_unit_rate(b.rate)) {
            return Err(FinanceError::InvalidTable(format!(
                "solidarity_brackets[{i}].rate must be between 0 and 1"
            )));
        }
        Ok(())
    }

    fn validate_withholding(&self) -> FinanceResult<()> {
        let bounds: Vec<Option<Decimal>> = self
            .withholding_brackets
            .iter()
            .map(|b| b.upper_bound)
            .collect();
        check_bounds("withholding_brackets", &bounds)?;

        if let Some(i) = self
            .withholding_brackets
            .iter()
            .position(|b| !is_unit_rate(b.marginal_rate))
        {
            return Err(FinanceError::InvalidTable(format!(
                "withholding_brackets[{i}].marginal_rate must be between 0 and 1"
            )));
        }
        Ok(())
    }

    /// Brackets whose `accumulated_tax` differs from what the brackets below
    /// accumulate by more than [`ACCUMULATED_TAX_TOLERANCE_UNITS`].
    ///
    /// The table's own values are still used for the calculation; a mismatch
    /// is reported, not corrected.
    pub fn accumulated_tax_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let mut lower = Decimal::ZERO;
        let mut expected = Decimal::ZERO;
        for (i, b) in self.withholding_brackets.iter().enumerate() {
            if (b.accumulated_tax - expected).abs() > ACCUMULATED_TAX_TOLERANCE_UNITS {
                warnings.push(format!(
                    "withholding_brackets[{i}].accumulated_tax is {} but the brackets below accumulate {expected}",
                    b.accumulated_tax
                ));
            }
            if let Some(upper) = b.upper_bound {
                expected += (upper - lower) * b.marginal_rate;
                lower = upper;
            }
        }
        warnings
    }
}

impl Default for TaxTable {
    fn default() -> Self {
        Self::colombia_2026()
    }
}

fn is_unit_rate(rate: Rate) -> bool {
    rate >= Decimal::ZERO && rate <= Decimal::ONE
}

/// Non-empty, strictly ascending positive bounds with exactly one open bracket
/// at the top.
fn check_bounds(name: &str, bounds: &[Option<Decimal>]) -> FinanceResult<()> {
    let Some((last, closed)) = bounds.split_last() else {
        return Err(FinanceError::InvalidTable(format!("{name} must not be empty")));
    };
    if last.is_some() {
        return Err(FinanceError::InvalidTable(format!(
            "{name} must end with an open bracket"
        )));
    }

    let mut previous = Decimal::ZERO;
    for (i, bound) in closed.iter().enumerate() {
        match bound {
            None => {
                return Err(FinanceError::InvalidTable(format!(
                    "{name}[{i}] is open but is not the last bracket"
                )))
            }
            Some(b) if *b <= previous => {
                return Err(FinanceError::InvalidTable(format!(
                    "{name}[{i}] bound {b} is not above {previous}"
                )))
            }
            Some(b) => previous = *b,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_is_valid() {
        let table = TaxTable::colombia_2026();
        assert!(table.validate().is_ok());
        assert_eq!(table.allowance_ceiling(), dec!(3_501_810));
        assert_eq!(table.solidarity_threshold(), dec!(7_003_620));
    }

    #[test]
    fn test_unit_conversion() {
        let table = TaxTable::colombia_2026();
        assert_eq!(table.to_units(dec!(5_237_400)), dec!(100));
        assert_eq!(table.from_units(dec!(2)), dec!(104_748));
    }

    #[test]
    fn test_builtin_table_accumulates_exactly() {
        assert!(TaxTable::colombia_2026().accumulated_tax_warnings().is_empty());
    }

    #[test]
    fn test_rounded_accumulated_tax_is_accepted() {
        // Art. 383 publishes accumulations rounded to whole tax units.
        let mut table = TaxTable::colombia_2026();
        for (bracket, rounded) in table
            .withholding_brackets
            .iter_mut()
            .zip([dec!(0), dec!(0), dec!(10), dec!(69), dec!(162), dec!(268), dec!(770)])
        {
            bracket.accumulated_tax = rounded;
        }
        assert!(table.validate().is_ok());
        assert!(table.accumulated_tax_warnings().is_empty());
    }

    #[test]
    fn test_inconsistent_accumulated_tax_is_reported() {
        let mut table = TaxTable::colombia_2026();
        table.withholding_brackets[4].accumulated_tax = dec!(169.45);
        assert!(table.validate().is_ok());
        let warnings = table.accumulated_tax_warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("withholding_brackets[4]"));
    }

    #[test]
    fn test_zero_unit_value_converts_to_zero_units() {
        let mut table = TaxTable::colombia_2026();
        table.tax_unit_value = Decimal::ZERO;
        assert_eq!(table.to_units(dec!(1_000_000)), Decimal::ZERO);
    }

    #[test]
    fn test_rejects_missing_open_bracket() {
        let mut table = TaxTable::colombia_2026();
        table.solidarity_brackets.pop();
        assert!(matches!(table.validate(), Err(FinanceError::InvalidTable(_))));
    }

    #[test]
    fn test_rejects_descending_bounds() {
        let mut table = TaxTable::colombia_2026();
        table.withholding_brackets[2].upper_bound = Some(dec!(100));
        assert!(table.validate().is_err());
    }

    #[test]
    fn test_rejects_rate_above_one() {
        let mut table = TaxTable::colombia_2026();
        table.health_rate = dec!(4);
        assert!(table.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_unit_value() {
        let mut table = TaxTable::colombia_2026();
        table.tax_unit_value = Decimal::ZERO;
        assert!(table.validate().is_err());
    }

    #[test]
    fn test_table_round_trips_through_json() {
        let table = TaxTable::colombia_2026();
        let json = serde_json::to_string(&table).unwrap();
        let back: TaxTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back, table);
    }
}
