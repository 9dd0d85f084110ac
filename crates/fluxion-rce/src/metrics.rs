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

//! Data-driven table of derived price metrics
//!
//! Every metric is a row of [`METRICS`]: the day it reads and the kind of
//! computation applied to that day's records. [`evaluate`] turns a row into a
//! value for one snapshot at one moment.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDateTime, Timelike};
use fluxion_rce_types::{PriceDirection, PriceRecord};
use serde::Serialize;
use tracing::debug;

use crate::config::{HourWindow, RceConfig};
use crate::pricing::PriceWindow;
use crate::pricing::calculator::{
    calculate_average, calculate_median, calculate_percentage_difference, extreme_range,
    find_extreme_records, find_top_windows, format_time_range, get_hourly_prices, localize,
    period_bounds, prices, round_to, to_gross_kwh_price,
};
use crate::snapshot::PriceSnapshot;

/// Which business day a metric reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataDay {
    Today,
    Tomorrow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
    Average,
    Median,
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DayPart {
    Morning,
    Evening,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeEdge {
    Start,
    End,
}

/// How a metric is computed from its day's records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Price of the period covering now
    CurrentPrice,
    /// Gross PLN/kWh price of the period covering now
    CurrentKwhPrice,
    /// Price of the period covering now shifted by whole hours
    PriceAtHourOffset(i64),
    /// Tomorrow's price at the current quarter hour
    PriceAtCurrentTime,
    Statistic(Statistic),
    /// `"HH:MM - HH:MM"` span of the extreme-price periods
    ExtremeRange(PriceDirection),
    /// `"HH:MM"` start or end of the extreme-price span
    ExtremeTime(PriceDirection, RangeEdge),
    ExtremeTimestamp(PriceDirection, RangeEdge),
    /// Whether now falls in one of the extreme-price periods
    ExtremeWindowActive(PriceDirection),
    CurrentVsAverage,
    TomorrowVsTodayAverage,
    BestWindowPrice { part: DayPart, rank: usize },
    BestWindowStart { part: DayPart, rank: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricId {
    TodayPrice,
    TodayKwhPrice,
    NextHourPrice,
    Next2HoursPrice,
    Next3HoursPrice,
    PreviousHourPrice,
    TodayAvgPrice,
    TodayMedianPrice,
    TodayMinPrice,
    TodayMaxPrice,
    TodayMinPriceRange,
    TodayMaxPriceRange,
    TodayMinPriceHourStart,
    TodayMinPriceHourEnd,
    TodayMaxPriceHourStart,
    TodayMaxPriceHourEnd,
    TodayMinPriceHourStartTimestamp,
    TodayMinPriceHourEndTimestamp,
    TodayMaxPriceHourStartTimestamp,
    TodayMaxPriceHourEndTimestamp,
    TodayMinPriceWindowActive,
    TodayMaxPriceWindowActive,
    TodayCurrentVsAverage,
    TodayMorningBestPrice,
    TodayMorning2ndBestPrice,
    TodayMorningBestPriceStartTimestamp,
    TodayMorning2ndBestPriceStartTimestamp,
    TodayEveningBestPrice,
    TodayEvening2ndBestPrice,
    TodayEveningBestPriceStartTimestamp,
    TodayEvening2ndBestPriceStartTimestamp,
    TomorrowPrice,
    TomorrowAvgPrice,
    TomorrowMedianPrice,
    TomorrowMinPrice,
    TomorrowMaxPrice,
    TomorrowMinPriceRange,
    TomorrowMaxPriceRange,
    TomorrowMinPriceHourStart,
    TomorrowMinPriceHourEnd,
    TomorrowMaxPriceHourStart,
    TomorrowMaxPriceHourEnd,
    TomorrowMinPriceHourStartTimestamp,
    TomorrowMinPriceHourEndTimestamp,
    TomorrowMaxPriceHourStartTimestamp,
    TomorrowMaxPriceHourEndTimestamp,
    TomorrowVsTodayAverage,
    TomorrowMorningBestPrice,
    TomorrowMorning2ndBestPrice,
    TomorrowMorningBestPriceStartTimestamp,
    TomorrowMorning2ndBestPriceStartTimestamp,
    TomorrowEveningBestPrice,
    TomorrowEvening2ndBestPrice,
    TomorrowEveningBestPriceStartTimestamp,
    TomorrowEvening2ndBestPriceStartTimestamp,
}

impl MetricId {
    pub fn definition(self) -> Option<&'static MetricDefinition> {
        METRICS.iter().find(|definition| definition.id == self)
    }

    pub fn key(self) -> &'static str {
        self.definition().map_or("unknown", |definition| definition.key)
    }
}

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// One row of the metric table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricDefinition {
    pub id: MetricId,
    /// Stable snake_case name used in output
    pub key: &'static str,
    pub day: DataDay,
    pub kind: MetricKind,
    pub unit: Option<&'static str>,
}

const PLN_MWH: Option<&str> = Some("PLN/MWh");
const PLN_KWH: Option<&str> = Some("PLN/kWh");
const PERCENT: Option<&str> = Some("%");

const fn metric(
    id: MetricId,
    key: &'static str,
    day: DataDay,
    kind: MetricKind,
    unit: Option<&'static str>,
) -> MetricDefinition {
    MetricDefinition {
        id,
        key,
        day,
        kind,
        unit,
    }
}

use DataDay::{Today, Tomorrow};
use DayPart::{Evening, Morning};
use MetricKind as K;
use PriceDirection::{Highest, Lowest};
use RangeEdge::{End, Start};

#[rustfmt::skip]
pub static METRICS: &[MetricDefinition] = &[
    metric(MetricId::TodayPrice, "today_price", Today, K::CurrentPrice, PLN_MWH),
    metric(MetricId::TodayKwhPrice, "today_kwh_price", Today, K::CurrentKwhPrice, PLN_KWH),
    metric(MetricId::NextHourPrice, "next_hour_price", Today, K::PriceAtHourOffset(1), PLN_MWH),
    metric(MetricId::Next2HoursPrice, "next_2_hours_price", Today, K::PriceAtHourOffset(2), PLN_MWH),
    metric(MetricId::Next3HoursPrice, "next_3_hours_price", Today, K::PriceAtHourOffset(3), PLN_MWH),
    metric(MetricId::PreviousHourPrice, "previous_hour_price", Today, K::PriceAtHourOffset(-1), PLN_MWH),
    metric(MetricId::TodayAvgPrice, "today_avg_price", Today, K::Statistic(Statistic::Average), PLN_MWH),
    metric(MetricId::TodayMedianPrice, "today_median_price", Today, K::Statistic(Statistic::Median), PLN_MWH),
    metric(MetricId::TodayMinPrice, "today_min_price", Today, K::Statistic(Statistic::Min), PLN_MWH),
    metric(MetricId::TodayMaxPrice, "today_max_price", Today, K::Statistic(Statistic::Max), PLN_MWH),
    metric(MetricId::TodayMinPriceRange, "today_min_price_range", Today, K::ExtremeRange(Lowest), None),
    metric(MetricId::TodayMaxPriceRange, "today_max_price_range", Today, K::ExtremeRange(Highest), None),
    metric(MetricId::TodayMinPriceHourStart, "today_min_price_hour_start", Today, K::ExtremeTime(Lowest, Start), None),
    metric(MetricId::TodayMinPriceHourEnd, "today_min_price_hour_end", Today, K::ExtremeTime(Lowest, End), None),
    metric(MetricId::TodayMaxPriceHourStart, "today_max_price_hour_start", Today, K::ExtremeTime(Highest, Start), None),
    metric(MetricId::TodayMaxPriceHourEnd, "today_max_price_hour_end", Today, K::ExtremeTime(Highest, End), None),
    metric(MetricId::TodayMinPriceHourStartTimestamp, "today_min_price_hour_start_timestamp", Today, K::ExtremeTimestamp(Lowest, Start), None),
    metric(MetricId::TodayMinPriceHourEndTimestamp, "today_min_price_hour_end_timestamp", Today, K::ExtremeTimestamp(Lowest, End), None),
    metric(MetricId::TodayMaxPriceHourStartTimestamp, "today_max_price_hour_start_timestamp", Today, K::ExtremeTimestamp(Highest, Start), None),
    metric(MetricId::TodayMaxPriceHourEndTimestamp, "today_max_price_hour_end_timestamp", Today, K::ExtremeTimestamp(Highest, End), None),
    metric(MetricId::TodayMinPriceWindowActive, "today_min_price_window_active", Today, K::ExtremeWindowActive(Lowest), None),
    metric(MetricId::TodayMaxPriceWindowActive, "today_max_price_window_active", Today, K::ExtremeWindowActive(Highest), None),
    metric(MetricId::TodayCurrentVsAverage, "today_current_vs_average", Today, K::CurrentVsAverage, PERCENT),
    metric(MetricId::TodayMorningBestPrice, "today_morning_best_price", Today, K::BestWindowPrice { part: Morning, rank: 0 }, PLN_MWH),
    metric(MetricId::TodayMorning2ndBestPrice, "today_morning_2nd_best_price", Today, K::BestWindowPrice { part: Morning, rank: 1 }, PLN_MWH),
    metric(MetricId::TodayMorningBestPriceStartTimestamp, "today_morning_best_price_start_timestamp", Today, K::BestWindowStart { part: Morning, rank: 0 }, None),
    metric(MetricId::TodayMorning2ndBestPriceStartTimestamp, "today_morning_2nd_best_price_start_timestamp", Today, K::BestWindowStart { part: Morning, rank: 1 }, None),
    metric(MetricId::TodayEveningBestPrice, "today_evening_best_price", Today, K::BestWindowPrice { part: Evening, rank: 0 }, PLN_MWH),
    metric(MetricId::TodayEvening2ndBestPrice, "today_evening_2nd_best_price", Today, K::BestWindowPrice { part: Evening, rank: 1 }, PLN_MWH),
    metric(MetricId::TodayEveningBestPriceStartTimestamp, "today_evening_best_price_start_timestamp", Today, K::BestWindowStart { part: Evening, rank: 0 }, None),
    metric(MetricId::TodayEvening2ndBestPriceStartTimestamp, "today_evening_2nd_best_price_start_timestamp", Today, K::BestWindowStart { part: Evening, rank: 1 }, None),
    metric(MetricId::TomorrowPrice, "tomorrow_price", Tomorrow, K::PriceAtCurrentTime, PLN_MWH),
    metric(MetricId::TomorrowAvgPrice, "tomorrow_avg_price", Tomorrow, K::Statistic(Statistic::Average), PLN_MWH),
    metric(MetricId::TomorrowMedianPrice, "tomorrow_median_price", Tomorrow, K::Statistic(Statistic::Median), PLN_MWH),
    metric(MetricId::TomorrowMinPrice, "tomorrow_min_price", Tomorrow, K::Statistic(Statistic::Min), PLN_MWH),
    metric(MetricId::TomorrowMaxPrice, "tomorrow_max_price", Tomorrow, K::Statistic(Statistic::Max), PLN_MWH),
    metric(MetricId::TomorrowMinPriceRange, "tomorrow_min_price_range", Tomorrow, K::ExtremeRange(Lowest), None),
    metric(MetricId::TomorrowMaxPriceRange, "tomorrow_max_price_range", Tomorrow, K::ExtremeRange(Highest), None),
    metric(MetricId::TomorrowMinPriceHourStart, "tomorrow_min_price_hour_start", Tomorrow, K::ExtremeTime(Lowest, Start), None),
    metric(MetricId::TomorrowMinPriceHourEnd, "tomorrow_min_price_hour_end", Tomorrow, K::ExtremeTime(Lowest, End), None),
    metric(MetricId::TomorrowMaxPriceHourStart, "tomorrow_max_price_hour_start", Tomorrow, K::ExtremeTime(Highest, Start), None),
    metric(MetricId::TomorrowMaxPriceHourEnd, "tomorrow_max_price_hour_end", Tomorrow, K::ExtremeTime(Highest, End), None),
    metric(MetricId::TomorrowMinPriceHourStartTimestamp, "tomorrow_min_price_hour_start_timestamp", Tomorrow, K::ExtremeTimestamp(Lowest, Start), None),
    metric(MetricId::TomorrowMinPriceHourEndTimestamp, "tomorrow_min_price_hour_end_timestamp", Tomorrow, K::ExtremeTimestamp(Lowest, End), None),
    metric(MetricId::TomorrowMaxPriceHourStartTimestamp, "tomorrow_max_price_hour_start_timestamp", Tomorrow, K::ExtremeTimestamp(Highest, Start), None),
    metric(MetricId::TomorrowMaxPriceHourEndTimestamp, "tomorrow_max_price_hour_end_timestamp", Tomorrow, K::ExtremeTimestamp(Highest, End), None),
    metric(MetricId::TomorrowVsTodayAverage, "tomorrow_vs_today_average", Tomorrow, K::TomorrowVsTodayAverage, PERCENT),
    metric(MetricId::TomorrowMorningBestPrice, "tomorrow_morning_best_price", Tomorrow, K::BestWindowPrice { part: Morning, rank: 0 }, PLN_MWH),
    metric(MetricId::TomorrowMorning2ndBestPrice, "tomorrow_morning_2nd_best_price", Tomorrow, K::BestWindowPrice { part: Morning, rank: 1 }, PLN_MWH),
    metric(MetricId::TomorrowMorningBestPriceStartTimestamp, "tomorrow_morning_best_price_start_timestamp", Tomorrow, K::BestWindowStart { part: Morning, rank: 0 }, None),
    metric(MetricId::TomorrowMorning2ndBestPriceStartTimestamp, "tomorrow_morning_2nd_best_price_start_timestamp", Tomorrow, K::BestWindowStart { part: Morning, rank: 1 }, None),
    metric(MetricId::TomorrowEveningBestPrice, "tomorrow_evening_best_price", Tomorrow, K::BestWindowPrice { part: Evening, rank: 0 }, PLN_MWH),
    metric(MetricId::TomorrowEvening2ndBestPrice, "tomorrow_evening_2nd_best_price", Tomorrow, K::BestWindowPrice { part: Evening, rank: 1 }, PLN_MWH),
    metric(MetricId::TomorrowEveningBestPriceStartTimestamp, "tomorrow_evening_best_price_start_timestamp", Tomorrow, K::BestWindowStart { part: Evening, rank: 0 }, None),
    metric(MetricId::TomorrowEvening2ndBestPriceStartTimestamp, "tomorrow_evening_2nd_best_price_start_timestamp", Tomorrow, K::BestWindowStart { part: Evening, rank: 1 }, None),
];

/// Computed value of one metric
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Price(f64),
    Percent(f64),
    Timestamp(DateTime<FixedOffset>),
    Text(String),
    Flag(bool),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Price(value) => write!(f, "{value}"),
            Self::Percent(value) => write!(f, "{value:.2}"),
            Self::Timestamp(value) => write!(f, "{}", value.to_rfc3339()),
            Self::Text(value) => f.write_str(value),
            Self::Flag(value) => f.write_str(if *value { "on" } else { "off" }),
        }
    }
}

/// Evaluate one metric against a snapshot
///
/// `now` is the wall-clock time in the configured zone. `None` means the
/// metric is currently unavailable, typically because its day has no data.
pub fn evaluate(
    id: MetricId,
    snapshot: &PriceSnapshot,
    config: &RceConfig,
    now: NaiveDateTime,
) -> Option<MetricValue> {
    let definition = id.definition()?;
    let records = match definition.day {
        DataDay::Today => snapshot.today(now),
        DataDay::Tomorrow => snapshot.tomorrow(now),
    };
    if records.is_empty() {
        // Window flags stay off for a missing day as long as any data was fetched
        if matches!(definition.kind, MetricKind::ExtremeWindowActive(_)) && !snapshot.is_empty() {
            return Some(MetricValue::Flag(false));
        }
        debug!("No {:?} data for metric {}", definition.day, definition.key);
        return None;
    }

    match definition.kind {
        MetricKind::CurrentPrice => current_price(snapshot, config, &records, now).map(MetricValue::Price),
        MetricKind::CurrentKwhPrice => snapshot
            .record_at(now)
            .map(|record| MetricValue::Price(to_gross_kwh_price(record.price, config.tax_rate))),
        MetricKind::PriceAtHourOffset(hours) => snapshot
            .price_at_hour_offset(now, hours)
            .map(MetricValue::Price),
        MetricKind::PriceAtCurrentTime => snapshot
            .tomorrow_record_at_time(now)
            .map(|record| MetricValue::Price(round_to(record.price, 2))),
        MetricKind::Statistic(statistic) => {
            Some(MetricValue::Price(statistic_of(&records, statistic)?))
        }
        MetricKind::ExtremeRange(direction) => extreme_range(&records, direction)
            .map(|(start, end)| MetricValue::Text(format_time_range(start, end))),
        MetricKind::ExtremeTime(direction, edge) => extreme_range(&records, direction)
            .map(|range| MetricValue::Text(pick_edge(range, edge).format("%H:%M").to_string())),
        MetricKind::ExtremeTimestamp(direction, edge) => {
            let range = extreme_range(&records, direction)?;
            localize_in(config, pick_edge(range, edge)).map(MetricValue::Timestamp)
        }
        MetricKind::ExtremeWindowActive(direction) => {
            let active = find_extreme_records(&records, direction).into_iter().any(|record| {
                let (start, end) = period_bounds(record);
                start <= now && now < end
            });
            Some(MetricValue::Flag(active))
        }
        MetricKind::CurrentVsAverage => {
            let current = current_price(snapshot, config, &records, now)?;
            let average = calculate_average(&prices(&records));
            Some(MetricValue::Percent(round_to(
                calculate_percentage_difference(current, average),
                2,
            )))
        }
        MetricKind::TomorrowVsTodayAverage => {
            let today = snapshot.today(now);
            if today.is_empty() {
                return None;
            }
            let tomorrow_avg = calculate_average(&prices(&records));
            let today_avg = calculate_average(&prices(&today));
            Some(MetricValue::Percent(round_to(
                calculate_percentage_difference(tomorrow_avg, today_avg),
                2,
            )))
        }
        MetricKind::BestWindowPrice { part, rank } => {
            let windows = best_windows(&records, config, part, rank);
            let window = windows.get(rank)?;
            Some(MetricValue::Price(round_to(window.average_price(), 2)))
        }
        MetricKind::BestWindowStart { part, rank } => {
            let windows = best_windows(&records, config, part, rank);
            let start = windows.get(rank)?.start()?;
            localize_in(config, start).map(MetricValue::Timestamp)
        }
    }
}

/// Evaluate every metric in table order
pub fn evaluate_all(
    snapshot: &PriceSnapshot,
    config: &RceConfig,
    now: NaiveDateTime,
) -> Vec<(&'static MetricDefinition, Option<MetricValue>)> {
    METRICS
        .iter()
        .map(|definition| (definition, evaluate(definition.id, snapshot, config, now)))
        .collect()
}

fn current_price(
    snapshot: &PriceSnapshot,
    config: &RceConfig,
    today: &[PriceRecord],
    now: NaiveDateTime,
) -> Option<f64> {
    if config.use_hourly_prices {
        let hour = format!("{:02}", now.hour());
        return get_hourly_prices(today).get(&hour).copied();
    }
    snapshot.record_at(now).map(|record| record.price)
}

fn statistic_of(records: &[PriceRecord], statistic: Statistic) -> Option<f64> {
    let prices = prices(records);
    match statistic {
        Statistic::Average => Some(calculate_average(&prices)),
        Statistic::Median => Some(calculate_median(&prices)),
        Statistic::Min => prices.iter().copied().reduce(f64::min),
        Statistic::Max => prices.iter().copied().reduce(f64::max),
    }
}

fn pick_edge((start, end): (NaiveDateTime, NaiveDateTime), edge: RangeEdge) -> NaiveDateTime {
    match edge {
        RangeEdge::Start => start,
        RangeEdge::End => end,
    }
}

fn best_windows<'a>(
    records: &'a [PriceRecord],
    config: &RceConfig,
    part: DayPart,
    rank: usize,
) -> Vec<PriceWindow<'a>> {
    let HourWindow {
        start_hour,
        end_hour,
    } = match part {
        DayPart::Morning => config.morning_window,
        DayPart::Evening => config.evening_window,
    };
    find_top_windows(
        records,
        start_hour,
        end_hour,
        config.best_window_duration_hours,
        rank + 1,
        PriceDirection::Highest,
        true,
    )
}

fn localize_in(config: &RceConfig, moment: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
    let tz = config.tz().ok()?;
    Some(localize(tz, moment).fixed_offset())
}
