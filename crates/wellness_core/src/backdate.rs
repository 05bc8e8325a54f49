//! crates/wellness_core/src/backdate.rs
//!
//! Optional backdating of logged activities: the last token of a command
//! may name a historical date, constrained to the trailing 31-day window.

use chrono::{DateTime, NaiveDate, Utc};

/// How far back an activity may be dated, in days.
pub const BACKDATE_WINDOW_DAYS: i64 = 31;

/// Accepted date shapes, day-month-year preferred. Parsing is strict: an
/// ambiguous or partial token must fail rather than guess, so that real
/// words in a journal entry are never mistaken for dates.
const DATE_FORMATS: &[&str] = &[
    "%d-%m-%Y",
    "%d/%m/%Y",
    "%d.%m.%Y",
    "%d-%b-%Y",
    "%d-%B-%Y",
    "%Y-%m-%d",
];

/// Outcome of trying to read a token as a backdate.
#[derive(Debug, Clone, PartialEq)]
pub enum BackdateOutcome {
    /// The token is not a date; treat it as part of the value.
    NotADate,
    /// The token is a date but falls outside the allowed window. The
    /// command must abort rather than silently ignore it.
    OutOfRange(NaiveDate),
    /// A valid backdate, fixed to midday to avoid day-boundary ambiguity.
    Backdated(DateTime<Utc>),
}

/// Strictly parses a calendar date, preferring day-month-year.
pub fn parse_strict_date(token: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(token, fmt).ok())
}

/// Classifies the trailing token of a log command. The window is inclusive
/// on both ends: exactly 31 days ago is accepted, 32 is not.
pub fn parse_backdate(token: &str, today: NaiveDate) -> BackdateOutcome {
    let Some(date) = parse_strict_date(token) else {
        return BackdateOutcome::NotADate;
    };

    let earliest = today - chrono::Duration::days(BACKDATE_WINDOW_DAYS);
    if date < earliest || date > today {
        return BackdateOutcome::OutOfRange(date);
    }

    let midday = date
        .and_hms_opt(12, 0, 0)
        .expect("midday is a valid time")
        .and_utc();
    BackdateOutcome::Backdated(midday)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
    }

    #[test]
    fn day_month_year_is_preferred() {
        // 03-04 must read as 3rd of April, not March 4th.
        assert_eq!(
            parse_strict_date("03-04-2024"),
            NaiveDate::from_ymd_opt(2024, 4, 3)
        );
    }

    #[test]
    fn month_names_parse() {
        assert_eq!(
            parse_strict_date("22-MARCH-2018"),
            NaiveDate::from_ymd_opt(2018, 3, 22)
        );
        assert_eq!(
            parse_strict_date("22-mar-2018"),
            NaiveDate::from_ymd_opt(2018, 3, 22)
        );
    }

    #[test]
    fn partial_or_ambiguous_tokens_fail() {
        assert_eq!(parse_strict_date("yesterday"), None);
        assert_eq!(parse_strict_date("22-03"), None);
        assert_eq!(parse_strict_date("20"), None);
        assert_eq!(parse_strict_date("pushups"), None);
    }

    #[test]
    fn backdate_fixes_time_to_midday() {
        match parse_backdate("09-06-2024", today()) {
            BackdateOutcome::Backdated(at) => {
                assert_eq!(at.date_naive(), NaiveDate::from_ymd_opt(2024, 6, 9).unwrap());
                assert_eq!(at.time(), chrono::NaiveTime::from_hms_opt(12, 0, 0).unwrap());
            }
            other => panic!("expected backdate, got {other:?}"),
        }
    }

    #[test]
    fn window_is_inclusive_at_31_days() {
        let boundary = today() - Duration::days(31);
        let token = boundary.format("%d-%m-%Y").to_string();
        assert!(matches!(
            parse_backdate(&token, today()),
            BackdateOutcome::Backdated(_)
        ));

        let too_old = today() - Duration::days(32);
        let token = too_old.format("%d-%m-%Y").to_string();
        assert_eq!(
            parse_backdate(&token, today()),
            BackdateOutcome::OutOfRange(too_old)
        );
    }

    #[test]
    fn future_dates_are_out_of_range() {
        let tomorrow = today() + Duration::days(1);
        let token = tomorrow.format("%d-%m-%Y").to_string();
        assert_eq!(
            parse_backdate(&token, today()),
            BackdateOutcome::OutOfRange(tomorrow)
        );
    }

    #[test]
    fn today_itself_is_allowed() {
        let token = today().format("%d-%m-%Y").to_string();
        assert!(matches!(
            parse_backdate(&token, today()),
            BackdateOutcome::Backdated(_)
        ));
    }

    #[test]
    fn non_dates_pass_through() {
        assert_eq!(parse_backdate("ran 5k", today()), BackdateOutcome::NotADate);
    }
}
