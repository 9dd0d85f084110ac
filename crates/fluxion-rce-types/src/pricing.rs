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

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::RecordParseError;

// ============= RCE Pricing Types =============

/// Length of one RCE pricing period in minutes
pub const PERIOD_MINUTES: i64 = 15;

/// Number of pricing periods in one hour
pub const PERIODS_PER_HOUR: u32 = 4;

/// Wall-clock format of the upstream `dtime` field
pub const DTIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format of the upstream `business_date` field
const BUSINESS_DATE_FORMAT: &str = "%Y-%m-%d";

/// Which end of the price scale a search is looking for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceDirection {
    /// Cheapest prices (minimum)
    Lowest,
    /// Most expensive prices (maximum)
    Highest,
}

impl PriceDirection {
    pub fn from_want_max(want_max: bool) -> Self {
        if want_max {
            Self::Highest
        } else {
            Self::Lowest
        }
    }

    pub fn want_max(self) -> bool {
        matches!(self, Self::Highest)
    }

    /// Strict comparison: equal values never win, so the first candidate seen keeps its place.
    pub fn is_better(self, candidate: f64, best: f64) -> bool {
        match self {
            Self::Lowest => candidate < best,
            Self::Highest => candidate > best,
        }
    }
}

/// A single 15-minute RCE price period
///
/// Identified by the moment the period *ends*. All timestamps are wall-clock
/// times in the market's time zone for the business day they belong to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    /// End of the pricing period (upstream `dtime`)
    pub period_end: NaiveDateTime,

    /// Human readable "HH:MM - HH:MM" label (upstream `period`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_label: Option<String>,

    /// Price in PLN/MWh, may be negative
    pub price: f64,

    /// Calendar day the period was published for
    pub business_date: NaiveDate,

    /// Upstream publication timestamp, carried through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_ts: Option<String>,
}

impl PriceRecord {
    pub fn new(period_end: NaiveDateTime, price: f64) -> Self {
        Self {
            period_end,
            period_label: None,
            price,
            business_date: period_end.date(),
            publication_ts: None,
        }
    }

    /// Start of the pricing period (`period_end - 15min`)
    pub fn period_start(&self) -> NaiveDateTime {
        self.period_end - Duration::minutes(PERIOD_MINUTES)
    }

    /// Whether `moment` falls inside `[period_start, period_end)`
    pub fn covers(&self, moment: NaiveDateTime) -> bool {
        self.period_start() <= moment && moment < self.period_end
    }
}

/// One element of the upstream payload's `value` array, as received
///
/// Every field is optional so that a single malformed element never fails
/// deserialization of the whole payload; validation happens in
/// [`PriceRecord::try_from`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPriceRecord {
    #[serde(default)]
    pub dtime: Option<String>,

    #[serde(default)]
    pub period: Option<String>,

    /// Arrives either as a JSON number or as a numeric string
    #[serde(default)]
    pub rce_pln: Option<serde_json::Value>,

    #[serde(default)]
    pub business_date: Option<String>,

    #[serde(default)]
    pub publication_ts: Option<String>,
}

impl TryFrom<&RawPriceRecord> for PriceRecord {
    type Error = RecordParseError;

    fn try_from(raw: &RawPriceRecord) -> Result<Self, Self::Error> {
        let dtime = raw
            .dtime
            .as_deref()
            .ok_or(RecordParseError::MissingField("dtime"))?;
        let period_end = NaiveDateTime::parse_from_str(dtime.trim(), DTIME_FORMAT).map_err(
            |source| RecordParseError::InvalidTimestamp {
                value: dtime.to_owned(),
                source,
            },
        )?;

        let price = parse_price(
            raw.rce_pln
                .as_ref()
                .ok_or(RecordParseError::MissingField("rce_pln"))?,
        )?;

        // Records without a business date belong to the day their period ends on
        let business_date = match raw.business_date.as_deref() {
            Some(value) => NaiveDate::parse_from_str(value.trim(), BUSINESS_DATE_FORMAT).map_err(
                |source| RecordParseError::InvalidBusinessDate {
                    value: value.to_owned(),
                    source,
                },
            )?,
            None => period_end.date(),
        };

        Ok(Self {
            period_end,
            period_label: raw.period.clone(),
            price,
            business_date,
            publication_ts: raw.publication_ts.clone(),
        })
    }
}

impl From<&PriceRecord> for RawPriceRecord {
    /// Back to the upstream shape, so saved records can be read again
    fn from(record: &PriceRecord) -> Self {
        Self {
            dtime: Some(record.period_end.format(DTIME_FORMAT).to_string()),
            period: record.period_label.clone(),
            rce_pln: Some(serde_json::Value::from(record.price)),
            business_date: Some(record.business_date.format(BUSINESS_DATE_FORMAT).to_string()),
            publication_ts: record.publication_ts.clone(),
        }
    }
}

fn parse_price(value: &serde_json::Value) -> Result<f64, RecordParseError> {
    let price = match value {
        serde_json::Value::Number(number) => number
            .as_f64()
            .ok_or_else(|| RecordParseError::InvalidPrice(number.to_string()))?,
        serde_json::Value::String(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| RecordParseError::InvalidPrice(text.clone()))?,
        other => return Err(RecordParseError::InvalidPrice(other.to_string())),
    };

    if price.is_finite() {
        Ok(price)
    } else {
        Err(RecordParseError::NonFinitePrice(price))
    }
}

/// Simple statistics over one set of price records
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceSummary {
    pub count: usize,
    pub average: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    /// `max - min`
    pub range: f64,
}
