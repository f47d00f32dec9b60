//! Experience Calculator: folds per-entry durations into one total.
//!
//! Flow per entry: normalize → run `DURATION_MATCHERS` in order → first hit
//! wins, and a rejected span ends the entry unmatched. When nothing matched
//! anywhere, the total falls back to an estimate of
//! `ESTIMATED_MONTHS_PER_ENTRY` per entry. Totals saturate instead of
//! overflowing.

use chrono::{NaiveDate, Utc};
use tracing::{debug, info};

use crate::experience::matchers::{normalize_duration, MatchOutcome, Months, DURATION_MATCHERS};
use crate::models::resume::{Experience, ExperiencePeriod};

/// Average tenure assumed when no duration could be parsed.
pub const ESTIMATED_MONTHS_PER_ENTRY: Months = 24;

pub const NO_ENTRIES: &str = "0 years";
pub const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, Copy)]
pub struct ExperienceCalculator {
    today: NaiveDate,
}

impl Default for ExperienceCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl ExperienceCalculator {
    /// Calculator whose "present" is the current UTC date.
    pub fn new() -> Self {
        Self {
            today: Utc::now().date_naive(),
        }
    }

    /// Calculator pinned to a fixed "present", for reproducible results.
    pub fn with_today(today: NaiveDate) -> Self {
        Self { today }
    }

    /// Parses one duration string. `None` when no matcher accepted it or the
    /// first matching pattern spans a negative interval.
    pub fn parse_duration(&self, raw: &str) -> Option<Months> {
        let normalized = normalize_duration(raw);
        if normalized.is_empty() {
            return None;
        }
        for matcher in DURATION_MATCHERS {
            match (matcher.matches)(&normalized, self.today) {
                MatchOutcome::NoMatch => continue,
                MatchOutcome::Months(months) => {
                    debug!("Duration {:?} matched {} → {} months", raw, matcher.name, months);
                    return Some(months);
                }
                MatchOutcome::Rejected => {
                    debug!("Duration {:?} rejected by {}: negative span", raw, matcher.name);
                    return None;
                }
            }
        }
        None
    }

    /// Per-entry view: one period for every entry that carries a duration.
    pub fn periods(&self, entries: &[Experience]) -> Vec<ExperiencePeriod> {
        entries
            .iter()
            .filter(|e| !e.duration.trim().is_empty())
            .map(|e| ExperiencePeriod {
                raw_duration: e.duration.clone(),
                months: self.parse_duration(&e.duration),
            })
            .collect()
    }

    /// Human-readable total for a work history.
    pub fn calculate(&self, entries: &[Experience]) -> String {
        if entries.is_empty() {
            return NO_ENTRIES.to_string();
        }

        let periods = self.periods(entries);
        let attempted_parsing = !periods.is_empty();
        let parsed: Vec<Months> = periods.iter().filter_map(|p| p.months).collect();
        let has_valid_durations = !parsed.is_empty();

        let total_months = if has_valid_durations {
            parsed.iter().fold(0, |acc: Months, m| acc.saturating_add(*m))
        } else if attempted_parsing {
            let estimate = Months::try_from(entries.len())
                .unwrap_or(Months::MAX)
                .saturating_mul(ESTIMATED_MONTHS_PER_ENTRY);
            info!(
                "No parsable durations in {} entries, estimating {} months",
                entries.len(),
                estimate
            );
            estimate
        } else {
            return UNKNOWN.to_string();
        };

        let formatted = format_months(total_months);
        debug!("Total experience: {} ({} months)", formatted, total_months);
        formatted
    }
}

/// Convenience wrapper using today's date.
pub fn calculate_total_experience(entries: &[Experience]) -> String {
    ExperienceCalculator::new().calculate(entries)
}

/// "2 years 3 months", "1 year", "5 months". A zero unit is omitted unless
/// both are zero.
pub fn format_months(total: Months) -> String {
    let years = total / 12;
    let months = total % 12;
    let plural = |n: Months, unit: &str| {
        if n == 1 {
            format!("{n} {unit}")
        } else {
            format!("{n} {unit}s")
        }
    };
    match (years, months) {
        (0, m) => plural(m, "month"),
        (y, 0) => plural(y, "year"),
        (y, m) => format!("{} {}", plural(y, "year"), plural(m, "month")),
    }
}
