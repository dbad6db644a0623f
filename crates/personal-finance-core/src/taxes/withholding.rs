//! Payroll deductions and progressive income-tax withholding on a salary.
//!
//! Social-security contributions are computed on the base salary only; the
//! transport allowance is paid on top and never contributes. Withholding is
//! evaluated in tax units against the injected [`TaxTable`].

use log::{debug, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::rounding::{percent_of, round_money};
use crate::taxes::tables::{TaxBracket, TaxTable};
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::validation::ValidationErrors;
use crate::FinanceResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SalaryPeriodicity {
    #[default]
    Monthly,
    Annual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxInput {
    /// Base salary for the stated periodicity, allowance excluded.
    pub salary: Money,
    #[serde(default)]
    pub periodicity: SalaryPeriodicity,
    #[serde(default)]
    pub dependents: u32,
    /// Monthly prepaid-health premium.
    #[serde(default)]
    pub prepaid_health: Money,
    /// Monthly voluntary pension contribution.
    #[serde(default)]
    pub voluntary_pension: Money,
}

impl TaxInput {
    pub fn monthly(salary: Money) -> Self {
        TaxInput {
            salary,
            periodicity: SalaryPeriodicity::Monthly,
            dependents: 0,
            prepaid_health: Decimal::ZERO,
            voluntary_pension: Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineConcept {
    BaseSalary,
    TransportAllowance,
    TotalEarned,
    ContributionBase,
    Pension,
    Health,
    PrepaidHealth,
    VoluntaryPension,
    Dependents,
    SolidarityFund,
    Withholding,
}

/// One row of the payslip breakdown. Deductions carry a negative amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub concept: LineConcept,
    pub amount: Money,
    pub is_deduction: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
}

impl LineItem {
    fn earning(concept: LineConcept, amount: Money) -> Self {
        LineItem {
            concept,
            amount,
            is_deduction: false,
            count: None,
        }
    }

    fn deduction(concept: LineConcept, amount: Money) -> Self {
        LineItem {
            concept,
            amount: -amount,
            is_deduction: true,
            count: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MandatoryDeductions {
    pub pension: Money,
    pub health: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxResult {
    pub fiscal_year: u16,
    pub base_salary: Money,
    pub transport_allowance: Money,
    pub gross_monthly: Money,
    pub gross_annual: Money,
    pub pension: Money,
    pub health: Money,
    pub solidarity_fund: Money,
    pub prepaid_health: Money,
    pub voluntary_pension: Money,
    pub dependents_deduction: Money,
    pub taxable_base: Money,
    /// Taxable base in tax units, four decimals.
    pub taxable_base_units: Decimal,
    pub withholding: Money,
    pub total_deductions: Money,
    pub net_monthly: Money,
    pub net_annual: Money,
    pub effective_rate_pct: Decimal,
    pub marginal_rate_pct: Decimal,
    pub line_items: Vec<LineItem>,
}

// ---------------------------------------------------------------------------
// Bracket evaluation
// ---------------------------------------------------------------------------

/// Bracket containing `base_units` together with its lower edge.
fn locate(base_units: Decimal, brackets: &[TaxBracket]) -> Option<(&TaxBracket, Decimal)> {
    let first = brackets.first()?;
    if first.upper_bound.is_some_and(|upper| base_units <= upper) {
        return None;
    }

    let mut lower = Decimal::ZERO;
    for b in brackets {
        match b.upper_bound {
            Some(upper) if base_units > upper => lower = upper,
            _ => return Some((b, lower)),
        }
    }
    None
}

/// Tax in units for a taxable base in units. Zero at or below the first
/// bracket's bound.
pub fn evaluate_bracket(base_units: Decimal, brackets: &[TaxBracket]) -> Decimal {
    match locate(base_units, brackets) {
        Some((b, lower)) => b.accumulated_tax + (base_units - lower) * b.marginal_rate,
        None => Decimal::ZERO,
    }
}

pub fn marginal_rate(base_units: Decimal, brackets: &[TaxBracket]) -> Rate {
    locate(base_units, brackets)
        .map(|(b, _)| b.marginal_rate)
        .unwrap_or(Decimal::ZERO)
}

/// Monthly withholding in money for a monthly taxable base in money. Zero when
/// the table's tax unit value is zero.
pub fn withholding_tax(taxable_base: Money, table: &TaxTable) -> Money {
    let units = table.to_units(taxable_base);
    round_money(table.from_units(evaluate_bracket(units, &table.withholding_brackets)))
}

// ---------------------------------------------------------------------------
// Contributions
// ---------------------------------------------------------------------------

pub fn mandatory_deductions(base_salary: Money, table: &TaxTable) -> MandatoryDeductions {
    MandatoryDeductions {
        pension: round_money(base_salary * table.pension_rate),
        health: round_money(base_salary * table.health_rate),
    }
}

/// Solidarity-fund contribution. Zero below the wage threshold or with a zero
/// minimum wage; otherwise the rate of the first bracket whose bound covers the
/// salary's multiple of the minimum wage.
pub fn solidarity_fund_contribution(base_salary: Money, table: &TaxTable) -> Money {
    if base_salary < table.solidarity_threshold() {
        return Decimal::ZERO;
    }

    let Some(multiple) = base_salary.checked_div(table.minimum_wage) else {
        return Decimal::ZERO;
    };
    let rate = table
        .solidarity_brackets
        .iter()
        .find(|b| b.up_to_multiple.map_or(true, |upper| multiple <= upper))
        .or(table.solidarity_brackets.last())
        .map(|b| b.rate)
        .unwrap_or(Decimal::ZERO);

    round_money(base_salary * rate)
}

pub fn non_taxable_allowance(base_salary: Money, table: &TaxTable) -> Money {
    if base_salary <= table.allowance_ceiling() {
        table.transport_allowance
    } else {
        Decimal::ZERO
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn validate_tax_input(input: &TaxInput) -> FinanceResult<()> {
    let mut errors = ValidationErrors::new();
    errors.positive("salary", "Salary", input.salary);
    errors.non_negative("prepaid_health", "Prepaid health", input.prepaid_health);
    errors.non_negative("voluntary_pension", "Voluntary pension", input.voluntary_pension);
    errors.into_result()
}

/// Full payslip: contributions, withholding, net pay and the line breakdown.
pub fn calculate_withholding(
    input: &TaxInput,
    table: &TaxTable,
) -> FinanceResult<ComputationOutput<TaxResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_tax_input(input)?;
    table.validate()?;
    for note in table.accumulated_tax_warnings() {
        warn!("tax table {}: {note}", table.fiscal_year);
        warnings.push(note);
    }

    let base_salary = match input.periodicity {
        SalaryPeriodicity::Monthly => round_money(input.salary),
        SalaryPeriodicity::Annual => round_money(input.salary / Decimal::from(12)),
    };

    let allowance = non_taxable_allowance(base_salary, table);
    let gross_monthly = round_money(base_salary + allowance);
    let MandatoryDeductions { pension, health } = mandatory_deductions(base_salary, table);
    let solidarity_fund = solidarity_fund_contribution(base_salary, table);

    let prepaid_cap = round_money(table.from_units(table.prepaid_health_cap_units));
    let prepaid_health = input.prepaid_health.min(prepaid_cap);
    if input.prepaid_health > prepaid_cap {
        warnings.push(format!(
            "Prepaid health deduction capped at {prepaid_cap} ({} tax units)",
            table.prepaid_health_cap_units
        ));
    }

    let dependents = input.dependents.min(table.max_dependents);
    if input.dependents > table.max_dependents {
        warnings.push(format!(
            "Only {} of {} dependents are deductible",
            table.max_dependents, input.dependents
        ));
    }
    let dependents_deduction = round_money(
        Decimal::from(dependents) * table.from_units(table.dependent_deduction_units),
    );
    let voluntary_pension = input.voluntary_pension;

    let taxable_base = round_money(
        base_salary
            - pension
            - health
            - solidarity_fund
            - prepaid_health
            - voluntary_pension
            - dependents_deduction,
    )
    .max(Decimal::ZERO);
    let taxable_units = table.to_units(taxable_base);
    let withholding = withholding_tax(taxable_base, table);
    debug!("taxable base {taxable_base} ({taxable_units} units), withholding {withholding}");

    let total_deductions = round_money(pension + health + solidarity_fund + withholding);
    let net_monthly = round_money(base_salary - total_deductions + allowance);
    let twelve = Decimal::from(12);

    let mut line_items = vec![LineItem::earning(LineConcept::BaseSalary, base_salary)];
    if allowance > Decimal::ZERO {
        line_items.push(LineItem::earning(LineConcept::TransportAllowance, allowance));
        line_items.push(LineItem::earning(LineConcept::TotalEarned, gross_monthly));
    }
    line_items.push(LineItem::earning(LineConcept::ContributionBase, base_salary));
    line_items.push(LineItem::deduction(LineConcept::Pension, pension));
    line_items.push(LineItem::deduction(LineConcept::Health, health));
    if prepaid_health > Decimal::ZERO {
        line_items.push(LineItem::deduction(LineConcept::PrepaidHealth, prepaid_health));
    }
    if voluntary_pension > Decimal::ZERO {
        line_items.push(LineItem::deduction(
            LineConcept::VoluntaryPension,
            voluntary_pension,
        ));
    }
    if dependents_deduction > Decimal::ZERO {
        line_items.push(LineItem {
            count: Some(dependents),
            ..LineItem::deduction(LineConcept::Dependents, dependents_deduction)
        });
    }
    if solidarity_fund > Decimal::ZERO {
        line_items.push(LineItem::deduction(LineConcept::SolidarityFund, solidarity_fund));
    }
    if withholding > Decimal::ZERO {
        line_items.push(LineItem::deduction(LineConcept::Withholding, withholding));
    }

    let result = TaxResult {
        fiscal_year: table.fiscal_year,
        base_salary,
        transport_allowance: allowance,
        gross_monthly,
        gross_annual: round_money(gross_monthly * twelve),
        pension,
        health,
        solidarity_fund,
        prepaid_health,
        voluntary_pension,
        dependents_deduction,
        taxable_base,
        taxable_base_units: taxable_units.round_dp(4),
        withholding,
        total_deductions,
        net_monthly,
        net_annual: round_money(net_monthly * twelve),
        effective_rate_pct: percent_of(withholding, gross_monthly),
        marginal_rate_pct: round_money(
            marginal_rate(taxable_units, &table.withholding_brackets) * Decimal::ONE_HUNDRED,
        ),
        line_items,
    };

    Ok(with_metadata(
        "Progressive withholding on labour income with statutory contributions",
        &serde_json::json!({
            "fiscal_year": table.fiscal_year,
            "salary": input.salary.to_string(),
            "periodicity": input.periodicity,
            "dependents": input.dependents,
            "tax_unit_value": table.tax_unit_value.to_string(),
        }),
        warnings,
        start,
        result,
    ))
}
