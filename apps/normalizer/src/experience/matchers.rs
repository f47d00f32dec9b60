//! Duration matchers: one pure function per textual date/duration pattern.
//!
//! Each matcher sees an already-normalized duration string (commas turned to
//! spaces, whitespace collapsed, en/em dashes unified to `-`) plus today's
//! date, and returns a `MatchOutcome`. A date pattern that matched but spans a
//! negative interval is `Rejected`: it is discarded, never clamped, and no
//! later matcher gets a second look at that text.
//!
//! `DURATION_MATCHERS` fixes the evaluation order; the calculator stops at the
//! first outcome other than `NoMatch`.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

pub type Months = u32;

/// Largest count a unit mention may carry. Anything above is not a tenure.
pub const MAX_YEARS: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// The pattern does not apply; try the next matcher.
    NoMatch,
    Months(Months),
    /// The pattern applies but the span is negative. The entry is unmatched.
    Rejected,
}

impl From<Option<Months>> for MatchOutcome {
    fn from(months: Option<Months>) -> Self {
        months.map_or(MatchOutcome::NoMatch, MatchOutcome::Months)
    }
}

/// A named matcher, so logs and tests can say which pattern fired.
#[derive(Clone, Copy)]
pub struct DurationMatcher {
    pub name: &'static str,
    pub matches: fn(&str, NaiveDate) -> MatchOutcome,
}

/// Priority order. Earlier entries shadow later ones.
pub const DURATION_MATCHERS: &[DurationMatcher] = &[
    DurationMatcher {
        name: "explicit_units",
        matches: explicit_units,
    },
    DurationMatcher {
        name: "worded_range",
        matches: worded_range,
    },
    DurationMatcher {
        name: "year_range",
        matches: year_range,
    },
    DurationMatcher {
        name: "numeric_range",
        matches: numeric_range,
    },
    DurationMatcher {
        name: "single_worded_date",
        matches: single_worded_date,
    },
    DurationMatcher {
        name: "single_year",
        matches: single_year,
    },
    DurationMatcher {
        name: "years_anywhere",
        matches: years_anywhere,
    },
    DurationMatcher {
        name: "bare_number",
        matches: bare_number,
    },
    DurationMatcher {
        name: "qualified_years",
        matches: qualified_years,
    },
];

const PRESENT: &str = "present|current|now|today|date";

static YEARS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(?:years?|yrs?)\b").unwrap());
static MONTHS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(?:months?|mos?)\b").unwrap());
static WORDED_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b([a-z]{{3,9}})\.?\s+(\d{{4}})\s*(?:-+|to|until)\s*(?:([a-z]{{3,9}})\.?\s+(\d{{4}})|({PRESENT}))\b"
    ))
    .unwrap()
});
static YEAR_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b(\d{{4}})\s*(?:-+|to|until)\s*(\d{{4}}|{PRESENT})\b"
    ))
    .unwrap()
});
static NUMERIC_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b(\d{{1,2}})[/-](\d{{4}})\s*(?:-+|to|until)\s*(?:(\d{{1,2}})[/-](\d{{4}})|({PRESENT}))\b"
    ))
    .unwrap()
});
static SINGLE_WORDED_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^([a-z]{3,9})\.?\s+(\d{4})$").unwrap());
static SINGLE_YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})$").unwrap());
static ANY_YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").unwrap());
static BARE_NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+(?:\.\d+)?$").unwrap());
static QUALIFIED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:(?:over|more than|about|approximately|around|nearly|almost|at least)\s*(\d+(?:\.\d+)?)\s*\+?|(\d+(?:\.\d+)?)\s*\+)\s*(?:years?|yrs?)\b",
    )
    .unwrap()
});

/// Normalizes free-form duration text before matching.
pub fn normalize_duration(raw: &str) -> String {
    raw.replace(',', " ")
        .replace(['\u{2013}', '\u{2014}'], "-")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whole months between two (year, month) points, months 1-based.
pub fn months_between(start: (i32, u32), end: (i32, u32)) -> Option<Months> {
    let diff = (end.0 - start.0) * 12 + (end.1 as i32 - start.1 as i32);
    u32::try_from(diff).ok()
}

/// 1-based month number for an English month name or abbreviation.
pub fn month_index(name: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    let lower = name.trim_end_matches('.').to_ascii_lowercase();
    if lower.len() < 3 {
        return None;
    }
    let prefix = lower.get(..3)?;
    let idx = MONTHS.iter().position(|m| *m == prefix)?;
    // Reject words that merely start like a month ("marketing", "decade").
    let full = [
        "january", "february", "march", "april", "may", "june", "july", "august", "september",
        "october", "november", "december",
    ][idx];
    if lower == prefix || lower == "sept" || full.starts_with(lower.as_str()) {
        Some(idx as u32 + 1)
    } else {
        None
    }
}

fn today_ym(today: NaiveDate) -> (i32, u32) {
    (today.year(), today.month())
}

/// A matched date span: negative means `Rejected`.
fn span(start: (i32, u32), end: (i32, u32)) -> MatchOutcome {
    months_between(start, end).map_or(MatchOutcome::Rejected, MatchOutcome::Months)
}

fn is_present(word: &str) -> bool {
    matches!(
        word.to_ascii_lowercase().as_str(),
        "present" | "current" | "now" | "today" | "date"
    )
}

fn parse_f64(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn years_to_months(years: f64) -> Option<Months> {
    if years <= 0.0 || years > MAX_YEARS {
        return None;
    }
    Some((years * 12.0).round() as Months)
}

/// 1. "N years" and/or "M months" anywhere; both add up.
pub fn explicit_units(text: &str, _today: NaiveDate) -> MatchOutcome {
    let years = YEARS_RE
        .captures(text)
        .and_then(|c| parse_f64(&c[1]));
    let months = MONTHS_RE
        .captures(text)
        .and_then(|c| parse_f64(&c[1]));
    if years.is_none() && months.is_none() {
        return MatchOutcome::NoMatch;
    }
    let total = years.unwrap_or(0.0) * 12.0 + months.unwrap_or(0.0);
    if !(0.0..=MAX_YEARS * 12.0).contains(&total) {
        return MatchOutcome::NoMatch;
    }
    MatchOutcome::Months(total.round() as Months)
}

/// 2. "<Month Year> - <Month Year|Present>". Candidates whose words are not
/// month names are skipped.
pub fn worded_range(text: &str, today: NaiveDate) -> MatchOutcome {
    WORDED_RANGE_RE
        .captures_iter(text)
        .find_map(|caps| {
            let start_month = month_index(&caps[1])?;
            let start_year: i32 = caps[2].parse().ok()?;
            let end = if caps.get(5).is_some() {
                today_ym(today)
            } else {
                let end_month = month_index(caps.get(3)?.as_str())?;
                let end_year: i32 = caps.get(4)?.as_str().parse().ok()?;
                (end_year, end_month)
            };
            Some(span((start_year, start_month), end))
        })
        .unwrap_or(MatchOutcome::NoMatch)
}

/// 3. "<YYYY> - <YYYY|Present>", counted in whole years.
pub fn year_range(text: &str, today: NaiveDate) -> MatchOutcome {
    let Some(caps) = YEAR_RANGE_RE.captures(text) else {
        return MatchOutcome::NoMatch;
    };
    let Ok(start) = caps[1].parse::<i32>() else {
        return MatchOutcome::NoMatch;
    };
    let end = if is_present(&caps[2]) {
        today.year()
    } else {
        match caps[2].parse::<i32>() {
            Ok(year) => year,
            Err(_) => return MatchOutcome::NoMatch,
        }
    };
    span((start, 1), (end, 1))
}

/// 4. "MM/YYYY - MM/YYYY|Present" (also `MM-YYYY`).
pub fn numeric_range(text: &str, today: NaiveDate) -> MatchOutcome {
    let parsed = NUMERIC_RANGE_RE.captures(text).and_then(|caps| {
        let start_month: u32 = caps[1].parse().ok().filter(|m| (1..=12).contains(m))?;
        let start_year: i32 = caps[2].parse().ok()?;
        let end = if caps.get(5).is_some() {
            today_ym(today)
        } else {
            let end_month: u32 = caps
                .get(3)?
                .as_str()
                .parse()
                .ok()
                .filter(|m| (1..=12).contains(m))?;
            (caps.get(4)?.as_str().parse().ok()?, end_month)
        };
        Some(((start_year, start_month), end))
    });
    match parsed {
        Some((start, end)) => span(start, end),
        None => MatchOutcome::NoMatch,
    }
}

/// 5. A lone "<Month Year>": open range ending today.
pub fn single_worded_date(text: &str, today: NaiveDate) -> MatchOutcome {
    let start = SINGLE_WORDED_DATE_RE.captures(text).and_then(|caps| {
        let month = month_index(&caps[1])?;
        let year: i32 = caps[2].parse().ok()?;
        Some((year, month))
    });
    match start {
        Some(start) => span(start, today_ym(today)),
        None => MatchOutcome::NoMatch,
    }
}

/// 6. A lone "<YYYY>": open range from January of that year.
pub fn single_year(text: &str, today: NaiveDate) -> MatchOutcome {
    match SINGLE_YEAR_RE
        .captures(text)
        .and_then(|caps| caps[1].parse::<i32>().ok())
    {
        Some(year) => span((year, 1), today_ym(today)),
        None => MatchOutcome::NoMatch,
    }
}

/// 7. Any two 4-digit years in the text; first and last form the range.
pub fn years_anywhere(text: &str, _today: NaiveDate) -> MatchOutcome {
    let years: Vec<i32> = ANY_YEAR_RE
        .find_iter(text)
        .filter_map(|m| m.as_str().parse().ok())
        .collect();
    match (years.first(), years.last()) {
        (Some(&first), Some(&last)) if years.len() >= 2 => span((first, 1), (last, 1)),
        _ => MatchOutcome::NoMatch,
    }
}

/// 8. A bare number is a literal year count.
pub fn bare_number(text: &str, _today: NaiveDate) -> MatchOutcome {
    if !BARE_NUMBER_RE.is_match(text) {
        return MatchOutcome::NoMatch;
    }
    parse_f64(text).and_then(years_to_months).into()
}

/// 9. "over 5 years", "about 3 yrs", "5+ years": the count is a lower bound.
pub fn qualified_years(text: &str, _today: NaiveDate) -> MatchOutcome {
    QUALIFIED_RE
        .captures(text)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str().to_string()))
        .and_then(|count| parse_f64(&count))
        .and_then(years_to_months)
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    #[test]
    fn test_normalize_duration() {
        assert_eq!(
            normalize_duration("Jan,  2018 \u{2013} Dec 2020"),
            "Jan 2018 - Dec 2020"
        );
        assert_eq!(normalize_duration("2015\u{2014}2017"), "2015-2017");
    }

    #[test]
    fn test_month_index() {
        assert_eq!(month_index("Jan"), Some(1));
        assert_eq!(month_index("january"), Some(1));
        assert_eq!(month_index("Sept"), Some(9));
        assert_eq!(month_index("Dec."), Some(12));
        assert_eq!(month_index("marketing"), None);
        assert_eq!(month_index("from"), None);
        assert_eq!(month_index("ma"), None);
    }

    #[test]
    fn test_months_between_rejects_negative() {
        assert_eq!(months_between((2018, 1), (2020, 12)), Some(35));
        assert_eq!(months_between((2020, 1), (2015, 1)), None);
        assert_eq!(months_between((2020, 5), (2020, 5)), Some(0));
    }

    #[test]
    fn test_explicit_units_years_and_months() {
        assert_eq!(explicit_units("2 years 3 months", today()), MatchOutcome::Months(27));
        assert_eq!(explicit_units("3 yrs", today()), MatchOutcome::Months(36));
        assert_eq!(explicit_units("8 mos", today()), MatchOutcome::Months(8));
        assert_eq!(explicit_units("1.5 years", today()), MatchOutcome::Months(18));
        assert_eq!(explicit_units("Jan 2018 - Dec 2020", today()), MatchOutcome::NoMatch);
    }

    #[test]
    fn test_worded_range() {
        assert_eq!(worded_range("Jan 2018 - Dec 2020", today()), MatchOutcome::Months(35));
        assert_eq!(worded_range("March 2019 to Present", today()), MatchOutcome::Months(63));
        assert_eq!(worded_range("Dec 2020 - Jan 2018", today()), MatchOutcome::Rejected);
        assert_eq!(worded_range("2015 - 2017", today()), MatchOutcome::NoMatch);
    }

    #[test]
    fn test_worded_range_skips_non_month_words() {
        assert_eq!(
            worded_range("from Jan 2018 - Dec 2018", today()),
            MatchOutcome::Months(11)
        );
    }

    #[test]
    fn test_year_range() {
        assert_eq!(year_range("2015 - 2017", today()), MatchOutcome::Months(24));
        assert_eq!(year_range("2020 to present", today()), MatchOutcome::Months(48));
        assert_eq!(year_range("2020 - 2015", today()), MatchOutcome::Rejected);
    }

    #[test]
    fn test_numeric_range() {
        assert_eq!(numeric_range("01/2018 - 06/2019", today()), MatchOutcome::Months(17));
        assert_eq!(numeric_range("3-2022 - present", today()), MatchOutcome::Months(27));
        assert_eq!(numeric_range("13/2018 - 06/2019", today()), MatchOutcome::NoMatch);
    }

    #[test]
    fn test_single_dates() {
        assert_eq!(single_worded_date("June 2023", today()), MatchOutcome::Months(12));
        assert_eq!(single_worded_date("June 2023 - 2024", today()), MatchOutcome::NoMatch);
        assert_eq!(single_year("2022", today()), MatchOutcome::Months(29));
        assert_eq!(single_year("2030", today()), MatchOutcome::Rejected);
    }

    #[test]
    fn test_years_anywhere() {
        assert_eq!(
            years_anywhere("Joined 2012 and left in 2016", today()),
            MatchOutcome::Months(48)
        );
        assert_eq!(years_anywhere("Only 2012", today()), MatchOutcome::NoMatch);
        assert_eq!(years_anywhere("2019 then 2011", today()), MatchOutcome::Rejected);
    }

    #[test]
    fn test_bare_number() {
        assert_eq!(bare_number("3", today()), MatchOutcome::Months(36));
        assert_eq!(bare_number("2.5", today()), MatchOutcome::Months(30));
        assert_eq!(bare_number("0", today()), MatchOutcome::NoMatch);
        assert_eq!(bare_number("3 roles", today()), MatchOutcome::NoMatch);
    }

    #[test]
    fn test_qualified_years() {
        assert_eq!(qualified_years("5+ years", today()), MatchOutcome::Months(60));
        assert_eq!(qualified_years("over 4 years", today()), MatchOutcome::Months(48));
        assert_eq!(qualified_years("a few years", today()), MatchOutcome::NoMatch);
    }

    #[test]
    fn test_plus_years_is_not_an_explicit_unit() {
        assert_eq!(explicit_units("5+ years", today()), MatchOutcome::NoMatch);
    }

    #[test]
    fn test_reversed_ranges_within_one_year_are_rejected() {
        assert_eq!(worded_range("Jun 2018 - Jan 2018", today()), MatchOutcome::Rejected);
        assert_eq!(numeric_range("06/2018 - 01/2018", today()), MatchOutcome::Rejected);
    }

    #[test]
    fn test_absurd_counts_are_not_durations() {
        assert_eq!(explicit_units("99999999999 years", today()), MatchOutcome::NoMatch);
        assert_eq!(explicit_units("100 years", today()), MatchOutcome::Months(1200));
        assert_eq!(bare_number(&"9".repeat(400), today()), MatchOutcome::NoMatch);
        assert_eq!(bare_number("250", today()), MatchOutcome::NoMatch);
        assert_eq!(qualified_years("over 9999 years", today()), MatchOutcome::NoMatch);
    }

    #[test]
    fn test_matcher_order_is_fixed() {
        let names: Vec<_> = DURATION_MATCHERS.iter().map(|m| m.name).collect();
        assert_eq!(
            names,
            vec![
                "explicit_units",
                "worded_range",
                "year_range",
                "numeric_range",
                "single_worded_date",
                "single_year",
                "years_anywhere",
                "bare_number",
                "qualified_years",
            ]
        );
    }
}
