//! Time-shift arithmetic for replicas.
//!
//! Replica `i` of a run is the template moved forward by `step_interval * i`
//! units. Minutes, hours and days are fixed-length; months are calendar months
//! and clamp to the last day of the target month (Jan 31 + 1 month = Feb 28/29).

use crate::models::{DerivedParams, FailureReason, JobSpec, StepUnit, TemplateItem};
use chrono::{DateTime, Months, TimeDelta, Utc};

/// Move `timestamp` forward by `amount` units. `None` when the result is out of range.
pub fn shift(timestamp: DateTime<Utc>, amount: u64, unit: StepUnit) -> Option<DateTime<Utc>> {
    match unit {
        StepUnit::Month => {
            let months = u32::try_from(amount).ok()?;
            timestamp.checked_add_months(Months::new(months))
        }
        StepUnit::Minute | StepUnit::Hour | StepUnit::Day => {
            let amount = i64::try_from(amount).ok()?;
            let delta = match unit {
                StepUnit::Minute => TimeDelta::try_minutes(amount)?,
                StepUnit::Hour => TimeDelta::try_hours(amount)?,
                _ => TimeDelta::try_days(amount)?,
            };
            timestamp.checked_add_signed(delta)
        }
    }
}

/// Parameters for replica `index` of `spec`
pub fn derive_params(
    template: &TemplateItem,
    spec: &JobSpec,
    index: u32,
) -> Result<DerivedParams, FailureReason> {
    let offset_amount = u64::from(spec.step_interval) * u64::from(index);
    let out_of_range = || FailureReason::UnitOfWork {
        index,
        message: format!(
            "shifting by {offset_amount} {} leaves the representable time range",
            spec.step_unit
        ),
    };

    let starts_at = shift(template.starts_at, offset_amount, spec.step_unit).ok_or_else(out_of_range)?;
    let ends_at = shift(template.ends_at, offset_amount, spec.step_unit).ok_or_else(out_of_range)?;

    Ok(DerivedParams {
        index,
        offset_amount,
        step_unit: spec.step_unit,
        starts_at,
        ends_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_fixed_units() {
        let base = at(2024, 3, 10, 9, 0);
        assert_eq!(shift(base, 90, StepUnit::Minute), Some(at(2024, 3, 10, 10, 30)));
        assert_eq!(shift(base, 24, StepUnit::Hour), Some(at(2024, 3, 11, 9, 0)));
        assert_eq!(shift(base, 3, StepUnit::Day), Some(at(2024, 3, 13, 9, 0)));
    }

    #[test]
    fn test_months_clamp_to_month_end() {
        assert_eq!(shift(at(2024, 1, 31, 12, 0), 1, StepUnit::Month), Some(at(2024, 2, 29, 12, 0)));
        assert_eq!(shift(at(2023, 1, 31, 12, 0), 1, StepUnit::Month), Some(at(2023, 2, 28, 12, 0)));
        assert_eq!(shift(at(2024, 11, 15, 8, 0), 3, StepUnit::Month), Some(at(2025, 2, 15, 8, 0)));
    }

    #[test]
    fn test_overflow_is_none() {
        assert_eq!(shift(at(2024, 1, 1, 0, 0), u64::MAX, StepUnit::Day), None);
        assert_eq!(shift(at(2024, 1, 1, 0, 0), u64::from(u32::MAX) + 1, StepUnit::Month), None);
    }

    #[test]
    fn test_derive_params_scales_with_index() {
        let template = TemplateItem::new("5", at(2024, 6, 1, 10, 0), at(2024, 6, 1, 11, 0));
        let spec = JobSpec::new("5").with_step(2, StepUnit::Hour);

        let params = derive_params(&template, &spec, 3).unwrap();
        assert_eq!(params.index, 3);
        assert_eq!(params.offset_amount, 6);
        assert_eq!(params.starts_at, at(2024, 6, 1, 16, 0));
        assert_eq!(params.ends_at, at(2024, 6, 1, 17, 0));
    }

    #[test]
    fn test_derive_params_overflow_is_unit_of_work_failure() {
        let template = TemplateItem::new("5", DateTime::<Utc>::MAX_UTC, DateTime::<Utc>::MAX_UTC);
        let spec = JobSpec::new("5").with_step(1, StepUnit::Day);

        let err = derive_params(&template, &spec, 1).unwrap_err();
        assert_eq!(err.code(), "unit_of_work");
    }
}
