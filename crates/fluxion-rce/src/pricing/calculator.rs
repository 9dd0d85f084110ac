// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of FluxION.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! Price window calculator
//!
//! Pure functions over one business day of 15-minute RCE price records.
//! Nothing here mutates its input or keeps state between calls; functions
//! degrade to an empty result, `None` or `0.0` instead of failing.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike};
use chrono_tz::Tz;
use fluxion_rce_types::{
    PERIOD_MINUTES, PERIODS_PER_HOUR, PriceDirection, PriceRecord, PriceSummary,
};
use tracing::debug;

/// A contiguous run of price periods selected by a window search
///
/// Holds references into the searched records, in chronological order.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceWindow<'a> {
    records: Vec<&'a PriceRecord>,
    average_price: f64,
}

impl<'a> PriceWindow<'a> {
    fn from_candidate(candidate: &[&'a PriceRecord]) -> Self {
        Self {
            records: candidate.to_vec(),
            average_price: window_average(candidate),
        }
    }

    /// Start of the first period in the window
    pub fn start(&self) -> Option<NaiveDateTime> {
        self.records.first().map(|record| record.period_start())
    }

    /// End of the last period in the window
    pub fn end(&self) -> Option<NaiveDateTime> {
        self.records.last().map(|record| record.period_end)
    }

    pub fn start_hour(&self) -> Option<u32> {
        self.start().map(|start| start.hour())
    }

    pub fn average_price(&self) -> f64 {
        self.average_price
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[&'a PriceRecord] {
        &self.records
    }
}

/// Extract the price of every record, in input order
pub fn prices(records: &[PriceRecord]) -> Vec<f64> {
    records.iter().map(|record| record.price).collect()
}

/// Arithmetic mean, `0.0` for an empty list
pub fn calculate_average(prices: &[f64]) -> f64 {
    if prices.is_empty() {
        return 0.0;
    }
    prices.iter().sum::<f64>() / prices.len() as f64
}

/// Median, `0.0` for an empty list
///
/// An even number of values yields the mean of the two middle ones.
#[expect(clippy::integer_division)]
pub fn calculate_median(prices: &[f64]) -> f64 {
    if prices.is_empty() {
        return 0.0;
    }

    let mut sorted = prices.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Relative difference of `current` against `reference` in percent
///
/// Returns `0.0` when the reference is zero.
pub fn calculate_percentage_difference(current: f64, reference: f64) -> f64 {
    if reference == 0.0 {
        return 0.0;
    }
    (current - reference) / reference * 100.0
}

/// First price per hour, keyed by the two-digit hour of the period label
///
/// Labels look like `"10:00 - 10:15"`. Records with a missing or malformed
/// label are skipped; later records of an hour never replace the first one.
pub fn get_hourly_prices(records: &[PriceRecord]) -> BTreeMap<String, f64> {
    let mut hourly = BTreeMap::new();

    for record in records {
        let Some(hour) = record.period_label.as_deref().and_then(hour_label) else {
            continue;
        };
        hourly.entry(hour.to_owned()).or_insert(record.price);
    }

    hourly
}

fn hour_label(label: &str) -> Option<&str> {
    let (start, _) = label.split_once(" - ")?;
    if !start.contains(':') || start.chars().count() < 5 {
        return None;
    }

    let hour = start.get(..2)?;
    hour.chars().all(|c| c.is_ascii_digit()).then_some(hour)
}

/// Every record sitting at the dataset's minimum or maximum price
///
/// Ties are all kept, ordered by period end. Empty input gives an empty list.
pub fn find_extreme_records(
    records: &[PriceRecord],
    direction: PriceDirection,
) -> Vec<&PriceRecord> {
    let Some(target) = extreme_price(records, direction) else {
        return Vec::new();
    };

    let mut extremes: Vec<&PriceRecord> = records
        .iter()
        .filter(|record| record.price == target)
        .collect();
    extremes.sort_by_key(|record| record.period_end);
    extremes
}

fn extreme_price(records: &[PriceRecord], direction: PriceDirection) -> Option<f64> {
    records
        .iter()
        .map(|record| record.price)
        .reduce(|best, price| {
            if direction.is_better(price, best) {
                price
            } else {
                best
            }
        })
}

/// Time span from the start of the first extreme period to the end of the last one
pub fn extreme_range(
    records: &[PriceRecord],
    direction: PriceDirection,
) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let extremes = find_extreme_records(records, direction);
    let (start, _) = period_bounds(extremes.first()?);
    let (_, end) = period_bounds(extremes.last()?);
    Some((start, end))
}

/// Start and end of a record's period
///
/// The `"HH:MM - HH:MM"` label on the record's business date takes
/// precedence; the period end timestamp is used when there is no usable label.
pub fn period_bounds(record: &PriceRecord) -> (NaiveDateTime, NaiveDateTime) {
    record
        .period_label
        .as_deref()
        .and_then(|label| label_bounds(label, record.business_date))
        .unwrap_or_else(|| (record.period_start(), record.period_end))
}

fn label_bounds(label: &str, date: NaiveDate) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let (start, end) = label.split_once(" - ")?;
    let start = date.and_time(NaiveTime::parse_from_str(start.trim(), "%H:%M").ok()?);
    let mut end = date.and_time(NaiveTime::parse_from_str(end.trim(), "%H:%M").ok()?);
    // "23:45 - 00:00" ends on the following day
    if end <= start {
        end += Duration::days(1);
    }
    Some((start, end))
}

/// Best contiguous window of `duration_hours` inside `[start_hour, end_hour)`
///
/// Candidates may start at any quarter hour. Only windows whose periods are
/// exactly 15 minutes apart qualify; the first candidate with the best mean
/// price wins.
pub fn find_optimal_window(
    records: &[PriceRecord],
    start_hour: u32,
    end_hour: u32,
    duration_hours: u32,
    direction: PriceDirection,
) -> Option<PriceWindow<'_>> {
    let periods = window_periods(duration_hours)?;
    let filtered = filter_by_start_hour(records, start_hour, end_hour);
    if filtered.len() < periods {
        debug!(
            "Not enough records for a {}h window in {}-{}h: {} available",
            duration_hours,
            start_hour,
            end_hour,
            filtered.len()
        );
        return None;
    }

    let mut best: Option<PriceWindow<'_>> = None;
    for candidate in filtered.windows(periods) {
        if !is_continuous(candidate) {
            continue;
        }

        let average = window_average(candidate);
        if best
            .as_ref()
            .is_none_or(|current| direction.is_better(average, current.average_price))
        {
            best = Some(PriceWindow::from_candidate(candidate));
        }
    }

    if let Some(window) = &best {
        debug!(
            "Selected {:?} {}h window starting {:?} (avg {:.2})",
            direction,
            duration_hours,
            window.start(),
            window.average_price
        );
    }

    best
}

/// Up to `top_n` best windows starting on a full hour
///
/// With `distinct_start_hour` no two results share a wall-clock start hour,
/// even when the records span more than one day.
pub fn find_top_windows(
    records: &[PriceRecord],
    start_hour: u32,
    end_hour: u32,
    duration_hours: u32,
    top_n: usize,
    direction: PriceDirection,
    distinct_start_hour: bool,
) -> Vec<PriceWindow<'_>> {
    let Some(periods) = window_periods(duration_hours) else {
        return Vec::new();
    };
    if top_n == 0 {
        return Vec::new();
    }

    let filtered = filter_by_start_hour(records, start_hour, end_hour);
    if filtered.len() < periods {
        return Vec::new();
    }

    let mut candidates: Vec<PriceWindow<'_>> = filtered
        .windows(periods)
        .filter(|candidate| is_continuous(candidate))
        .map(PriceWindow::from_candidate)
        .filter(|window| window.start().is_some_and(|start| start.minute() == 0))
        .collect();

    // Stable: equal averages (0.0 and -0.0 included) keep chronological order
    match direction {
        PriceDirection::Lowest => {
            candidates.sort_by(|a, b| compare_averages(a.average_price, b.average_price));
        }
        PriceDirection::Highest => {
            candidates.sort_by(|a, b| compare_averages(b.average_price, a.average_price));
        }
    }

    let mut used_hours = HashSet::new();
    let mut results = Vec::with_capacity(top_n);
    for window in candidates {
        let Some(hour) = window.start_hour() else {
            continue;
        };
        if distinct_start_hour && !used_hours.insert(hour) {
            continue;
        }

        results.push(window);
        if results.len() >= top_n {
            break;
        }
    }

    debug!(
        "Found {} of {} requested {:?} windows in {}-{}h",
        results.len(),
        top_n,
        direction,
        start_hour,
        end_hour
    );

    results
}

/// Count, average, median and extremes of the records' prices
pub fn summarize(records: &[PriceRecord]) -> Option<PriceSummary> {
    let prices = prices(records);
    let min = prices.iter().copied().reduce(f64::min)?;
    let max = prices.iter().copied().reduce(f64::max)?;

    Some(PriceSummary {
        count: prices.len(),
        average: calculate_average(&prices),
        median: calculate_median(&prices),
        min,
        max,
        range: max - min,
    })
}

/// `"HH:MM - HH:MM"`
pub fn format_time_range(start: NaiveDateTime, end: NaiveDateTime) -> String {
    format!("{} - {}", start.format("%H:%M"), end.format("%H:%M"))
}

/// Attach a time zone to a market wall-clock time
///
/// Ambiguous times (DST fall-back) resolve to the earlier instant; times
/// skipped by a DST jump are read as UTC.
pub fn localize(tz: Tz, moment: NaiveDateTime) -> DateTime<Tz> {
    tz.from_local_datetime(&moment)
        .earliest()
        .unwrap_or_else(|| tz.from_utc_datetime(&moment))
}

/// Gross price per kWh from a net PLN/MWh price
///
/// Non-positive prices count as free.
pub fn to_gross_kwh_price(price_pln_per_mwh: f64, tax_rate: f64) -> f64 {
    if price_pln_per_mwh <= 0.0 {
        return 0.0;
    }
    round_to(price_pln_per_mwh / 1000.0 * (1.0 + tax_rate), 6)
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Whole number of hours from a decimal, `None` for fractional or negative input
#[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn whole_hours(value: f64) -> Option<u32> {
    if !value.is_finite() || value.fract() != 0.0 || value < 0.0 || value > f64::from(u32::MAX) {
        return None;
    }
    Some(value as u32)
}

fn window_periods(duration_hours: u32) -> Option<usize> {
    if duration_hours == 0 {
        return None;
    }
    usize::try_from(duration_hours.checked_mul(PERIODS_PER_HOUR)?).ok()
}

/// Records whose period starts in `[start_hour, end_hour)`, sorted by period end
fn filter_by_start_hour(
    records: &[PriceRecord],
    start_hour: u32,
    end_hour: u32,
) -> Vec<&PriceRecord> {
    let mut filtered: Vec<&PriceRecord> = records
        .iter()
        .filter(|record| (start_hour..end_hour).contains(&record.period_start().hour()))
        .collect();
    filtered.sort_by_key(|record| record.period_end);
    filtered
}

/// Prices are finite, so `partial_cmp` only fails for values that never occur
fn compare_averages(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

fn is_continuous(window: &[&PriceRecord]) -> bool {
    let step = Duration::minutes(PERIOD_MINUTES);
    window
        .windows(2)
        .all(|pair| pair[1].period_end == pair[0].period_end + step)
}

fn window_average(window: &[&PriceRecord]) -> f64 {
    if window.is_empty() {
        return 0.0;
    }
    window.iter().map(|record| record.price).sum::<f64>() / window.len() as f64
}
