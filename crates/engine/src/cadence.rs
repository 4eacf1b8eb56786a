//! Recurrence intervals for recurring invoice templates.

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cadence {
    Weekly,
    Biweekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl Cadence {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Biweekly => "biweekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Yearly => "yearly",
        }
    }

    /// Next generation date, one unit after `previous`.
    ///
    /// Month based cadences land on the `anchor` day of month when the target
    /// month has it, and on the last day of the month otherwise, so a
    /// schedule starting on the 31st goes Jan 31, Feb 28, Mar 31.
    pub fn advance(self, previous: NaiveDate, anchor: NaiveDate) -> ResultEngine<NaiveDate> {
        let next = match self {
            Self::Weekly => previous.checked_add_days(Days::new(7)),
            Self::Biweekly => previous.checked_add_days(Days::new(14)),
            Self::Monthly => add_months_anchored(previous, anchor, 1),
            Self::Quarterly => add_months_anchored(previous, anchor, 3),
            Self::Yearly => add_months_anchored(previous, anchor, 12),
        };
        next.ok_or_else(|| {
            EngineError::Validation(format!("cannot advance {previous} by one {} unit", self.as_str()))
        })
    }
}

impl TryFrom<&str> for Cadence {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "weekly" => Ok(Self::Weekly),
            "biweekly" => Ok(Self::Biweekly),
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            "yearly" => Ok(Self::Yearly),
            other => Err(EngineError::Validation(format!("invalid cadence: {other}"))),
        }
    }
}

fn add_months_anchored(previous: NaiveDate, anchor: NaiveDate, months: u32) -> Option<NaiveDate> {
    // chrono clamps to the end of a shorter month; the anchor puts the day back.
    let target = previous.checked_add_months(Months::new(months))?;
    let day = anchor.day().min(days_in_month(target.year(), target.month())?);
    NaiveDate::from_ymd_opt(target.year(), target.month(), day)
}

fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let last = first.checked_add_months(Months::new(1))?.pred_opt()?;
    Some(last.day())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn weekly_and_biweekly_add_days() {
        let start = date(2025, 12, 29);
        assert_eq!(Cadence::Weekly.advance(start, start).unwrap(), date(2026, 1, 5));
        assert_eq!(Cadence::Biweekly.advance(start, start).unwrap(), date(2026, 1, 12));
    }

    #[test]
    fn monthly_keeps_month_end() {
        let anchor = date(2025, 1, 31);
        let feb = Cadence::Monthly.advance(anchor, anchor).unwrap();
        assert_eq!(feb, date(2025, 2, 28));
        let mar = Cadence::Monthly.advance(feb, anchor).unwrap();
        assert_eq!(mar, date(2025, 3, 31));
        let apr = Cadence::Monthly.advance(mar, anchor).unwrap();
        assert_eq!(apr, date(2025, 4, 30));
    }

    #[test]
    fn monthly_handles_leap_years() {
        let anchor = date(2024, 1, 30);
        assert_eq!(Cadence::Monthly.advance(anchor, anchor).unwrap(), date(2024, 2, 29));
    }

    #[test]
    fn quarterly_and_yearly() {
        let anchor = date(2025, 11, 30);
        assert_eq!(Cadence::Quarterly.advance(anchor, anchor).unwrap(), date(2026, 2, 28));
        let leap = date(2024, 2, 29);
        assert_eq!(Cadence::Yearly.advance(leap, leap).unwrap(), date(2025, 2, 28));
        assert_eq!(
            Cadence::Yearly.advance(date(2027, 2, 28), leap).unwrap(),
            date(2028, 2, 29)
        );
    }

    #[test]
    fn advances_from_previous_not_today() {
        let anchor = date(2025, 1, 15);
        let mut next = anchor;
        for _ in 0..3 {
            next = Cadence::Monthly.advance(next, anchor).unwrap();
        }
        assert_eq!(next, date(2025, 4, 15));
    }

    #[test]
    fn parses_names() {
        for cadence in [
            Cadence::Weekly,
            Cadence::Biweekly,
            Cadence::Monthly,
            Cadence::Quarterly,
            Cadence::Yearly,
        ] {
            assert_eq!(Cadence::try_from(cadence.as_str()).unwrap(), cadence);
        }
        assert!(Cadence::try_from("daily").is_err());
    }
}
