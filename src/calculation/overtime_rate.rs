//! Overtime rate and pay calculation.
//!
//! The rate multipliers are fixed policy constants, kept in one table so
//! that tests assert against the same values the engine uses.

use rust_decimal::Decimal;

use crate::models::OvertimeType;

use super::round_to_cents;

/// Multiplier for regular weekday overtime.
const REGULAR_MULTIPLIER: Decimal = Decimal::from_parts(150, 0, 0, false, 2);
/// Multiplier for weekend overtime.
const WEEKEND_MULTIPLIER: Decimal = Decimal::from_parts(200, 0, 0, false, 2);
/// Multiplier for public holiday overtime.
const HOLIDAY_MULTIPLIER: Decimal = Decimal::from_parts(250, 0, 0, false, 2);
/// Multiplier for night shift overtime.
const NIGHT_SHIFT_MULTIPLIER: Decimal = Decimal::from_parts(175, 0, 0, false, 2);

/// Returns the rate multiplier for an overtime type.
///
/// # Examples
///
/// ```
/// use payroll_engine::calculation::overtime_multiplier;
/// use payroll_engine::models::OvertimeType;
/// use rust_decimal::Decimal;
///
/// assert_eq!(overtime_multiplier(OvertimeType::Regular), Decimal::new(150, 2));
/// assert_eq!(overtime_multiplier(OvertimeType::Holiday), Decimal::new(250, 2));
/// ```
pub fn overtime_multiplier(overtime_type: OvertimeType) -> Decimal {
    match overtime_type {
        OvertimeType::Regular => REGULAR_MULTIPLIER,
        OvertimeType::Weekend => WEEKEND_MULTIPLIER,
        OvertimeType::Holiday => HOLIDAY_MULTIPLIER,
        OvertimeType::NightShift => NIGHT_SHIFT_MULTIPLIER,
    }
}

/// Computes the overtime hourly rate for a basic hourly rate.
///
/// The result is the basic rate multiplied by the type's fixed
/// multiplier, rounded to cents.
///
/// # Examples
///
/// ```
/// use payroll_engine::calculation::overtime_rate;
/// use payroll_engine::models::OvertimeType;
/// use rust_decimal::Decimal;
///
/// let rate = overtime_rate(OvertimeType::Holiday, Decimal::new(50, 0));
/// assert_eq!(rate, Decimal::new(12500, 2)); // 125.00
/// ```
pub fn overtime_rate(overtime_type: OvertimeType, basic_hourly_rate: Decimal) -> Decimal {
    round_to_cents(basic_hourly_rate * overtime_multiplier(overtime_type))
}

/// Computes the overtime pay for hours worked at an overtime rate.
///
/// # Examples
///
/// ```
/// use payroll_engine::calculation::overtime_pay;
/// use rust_decimal::Decimal;
///
/// let pay = overtime_pay(Decimal::new(4, 0), Decimal::new(12500, 2));
/// assert_eq!(pay, Decimal::new(50000, 2)); // 500.00
/// ```
pub fn overtime_pay(hours: Decimal, overtime_rate: Decimal) -> Decimal {
    round_to_cents(hours * overtime_rate)
}
