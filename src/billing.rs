// billing.rs
// Pure billing arithmetic: meter deltas -> electricity due -> total due.
// No I/O here; the generation pipeline in state/invoices.rs feeds this and
// persists the result.

use crate::errors::ApiError;

/// 10% surcharge applied to the outstanding electricity component.
pub const FINE_RATE: f64 = 0.10;

/// Default cost per unit when a bulk run does not override it.
pub const DEFAULT_COST_PER_UNIT: f64 = 10.0;

/// Everything the calculator needs, already resolved from the tenant
/// record and any per-request overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct BillingInputs {
    pub main_last_month: f64,
    pub main_current_month: f64,
    pub inverter_last_month: f64,
    pub inverter_current_month: f64,
    pub motor_units: f64,
    pub cost_per_unit: f64,
    pub rent: f64,
    pub maintenance_amount: f64,
    pub existing_fine: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BillCharges {
    pub main_units: f64,
    pub inverter_units: f64,
    pub total_units: f64,
    /// Electricity component with the existing fine already folded in.
    pub electricity_due: f64,
    pub total_due: f64,
}

/// Computes the bill. A current reading below the previous month's is a
/// data-entry error and is rejected rather than credited back to the
/// tenant; the message names the offending meter.
pub fn compute_bill(inputs: &BillingInputs) -> Result<BillCharges, ApiError> {
    if inputs.cost_per_unit <= 0.0 {
        return Err(ApiError::InvalidInput(format!(
            "costPerUnit must be positive, got {}",
            inputs.cost_per_unit
        )));
    }

    let main_units = inputs.main_current_month - inputs.main_last_month;
    if main_units < 0.0 {
        return Err(ApiError::InvalidInput(format!(
            "main meter reading went backwards ({} -> {})",
            inputs.main_last_month, inputs.main_current_month
        )));
    }

    let inverter_units = inputs.inverter_current_month - inputs.inverter_last_month;
    if inverter_units < 0.0 {
        return Err(ApiError::InvalidInput(format!(
            "inverter meter reading went backwards ({} -> {})",
            inputs.inverter_last_month, inputs.inverter_current_month
        )));
    }

    let total_units = main_units + inverter_units + inputs.motor_units;
    let electricity_due = total_units * inputs.cost_per_unit + inputs.existing_fine;
    let total_due = inputs.rent + electricity_due + inputs.maintenance_amount;

    Ok(BillCharges {
        main_units,
        inverter_units,
        total_units,
        electricity_due,
        total_due,
    })
}

/// 10% fine on the outstanding electricity due. Compounds when applied to
/// a balance that already includes an earlier fine.
pub fn fine_amount(due_electricity_bill: f64) -> f64 {
    due_electricity_bill * FINE_RATE
}

/// Applies a payment to an outstanding balance, floored at zero: an
/// overpayment settles the balance, it never goes negative.
pub fn apply_payment(total_due: f64, amount: f64) -> f64 {
    (total_due - amount).max(0.0)
}
