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

//! "Find cheapest window" request handling
//!
//! Validates the request at the boundary, runs the window search over the
//! caller's records for today and shapes the result into hourly buckets.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDateTime, Timelike};
use chrono_tz::Tz;
use fluxion_rce_types::{PriceDirection, PriceRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::pricing::calculator::{calculate_average, find_optimal_window, localize, round_to};

pub const DEFAULT_SERVICE_START_HOUR: u32 = 8;
pub const DEFAULT_SERVICE_END_HOUR: u32 = 16;
pub const MIN_SERVICE_DURATION_HOURS: u32 = 1;
pub const MAX_SERVICE_DURATION_HOURS: u32 = 8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("duration must be a full number of hours")]
    InvalidDuration,

    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: u32,
        max: u32,
    },

    #[error("{field} must be an integer")]
    InvalidHour { field: &'static str },

    #[error("start_hour must be lower than end_hour")]
    StartNotBeforeEnd,

    #[error("duration_hours must fit between start_hour and end_hour")]
    DurationDoesNotFit,

    #[error("no RCE price data for today")]
    NoData,

    #[error("no matching price window found")]
    NoWindow,
}

fn default_start_hour() -> u32 {
    DEFAULT_SERVICE_START_HOUR
}

fn default_end_hour() -> u32 {
    DEFAULT_SERVICE_END_HOUR
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheapestWindowRequest {
    pub duration_hours: u32,

    #[serde(default = "default_start_hour")]
    pub start_hour: u32,

    #[serde(default = "default_end_hour")]
    pub end_hour: u32,
}

impl CheapestWindowRequest {
    pub fn new(duration_hours: u32) -> Self {
        Self {
            duration_hours,
            start_hour: DEFAULT_SERVICE_START_HOUR,
            end_hour: DEFAULT_SERVICE_END_HOUR,
        }
    }

    /// Build a request from loosely typed JSON service data
    ///
    /// `duration_hours` is required; the hour bounds fall back to 8 and 16.
    pub fn from_json(data: &Value) -> Result<Self, ServiceError> {
        let duration_hours = data
            .get("duration_hours")
            .ok_or(ServiceError::InvalidDuration)
            .and_then(duration_from_json)?;
        let start_hour = hour_from_json(data, "start_hour", DEFAULT_SERVICE_START_HOUR)?;
        let end_hour = hour_from_json(data, "end_hour", DEFAULT_SERVICE_END_HOUR)?;

        let request = Self {
            duration_hours,
            start_hour,
            end_hour,
        };
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<(), ServiceError> {
        check_range(
            "duration_hours",
            self.duration_hours,
            MIN_SERVICE_DURATION_HOURS,
            MAX_SERVICE_DURATION_HOURS,
        )?;
        check_range("start_hour", self.start_hour, 0, 23)?;
        check_range("end_hour", self.end_hour, 1, 24)?;

        if self.start_hour >= self.end_hour {
            return Err(ServiceError::StartNotBeforeEnd);
        }
        if self.duration_hours > self.end_hour - self.start_hour {
            return Err(ServiceError::DurationDoesNotFit);
        }
        Ok(())
    }
}

fn check_range(field: &'static str, value: u32, min: u32, max: u32) -> Result<(), ServiceError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ServiceError::OutOfRange {
            field,
            value: i64::from(value),
            min,
            max,
        })
    }
}

/// Duration from JSON: a non-negative integer or a string of digits
///
/// Booleans, fractional numbers (even `2.0`) and other strings are rejected.
pub fn duration_from_json(value: &Value) -> Result<u32, ServiceError> {
    let hours = match value {
        Value::Number(number) => {
            if let Some(hours) = number.as_u64() {
                hours
            } else if let Some(negative) = number.as_i64() {
                return Err(ServiceError::OutOfRange {
                    field: "duration_hours",
                    value: negative,
                    min: MIN_SERVICE_DURATION_HOURS,
                    max: MAX_SERVICE_DURATION_HOURS,
                });
            } else {
                return Err(ServiceError::InvalidDuration);
            }
        }
        Value::String(text) if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) => {
            text.parse::<u64>().map_err(|_| ServiceError::InvalidDuration)?
        }
        Value::Null | Value::Bool(_) | Value::String(_) | Value::Array(_) | Value::Object(_) => {
            return Err(ServiceError::InvalidDuration);
        }
    };

    u32::try_from(hours).map_err(|_| ServiceError::OutOfRange {
        field: "duration_hours",
        value: i64::try_from(hours).unwrap_or(i64::MAX),
        min: MIN_SERVICE_DURATION_HOURS,
        max: MAX_SERVICE_DURATION_HOURS,
    })
}

fn hour_from_json(data: &Value, field: &'static str, default: u32) -> Result<u32, ServiceError> {
    let Some(value) = data.get(field) else {
        return Ok(default);
    };

    let hour = match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().and_then(whole_number)),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_) => None,
    }
    .ok_or(ServiceError::InvalidHour { field })?;

    u32::try_from(hour).map_err(|_| ServiceError::OutOfRange {
        field,
        value: hour,
        min: 0,
        max: 24,
    })
}

/// `6.0` counts as `6`; fractional values do not
#[expect(clippy::cast_possible_truncation)]
fn whole_number(value: f64) -> Option<i64> {
    (value.is_finite() && value.fract() == 0.0 && value.abs() <= f64::from(u32::MAX))
        .then(|| value as i64)
}

/// Average price of one clock hour inside the selected window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyPrice {
    pub start: String,
    pub end: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheapestWindowResponse {
    pub start: String,
    pub end: String,
    pub average_price: f64,
    pub prices: Vec<HourlyPrice>,
}

/// Find the cheapest window in today's records
///
/// Timestamps in the response are RFC 3339 in `tz`, aligned to whole hours.
pub fn find_cheapest_window(
    today: &[PriceRecord],
    request: &CheapestWindowRequest,
    tz: Tz,
) -> Result<CheapestWindowResponse, ServiceError> {
    request.validate()?;

    if today.is_empty() {
        return Err(ServiceError::NoData);
    }

    let window = find_optimal_window(
        today,
        request.start_hour,
        request.end_hour,
        request.duration_hours,
        PriceDirection::Lowest,
    )
    .ok_or(ServiceError::NoWindow)?;

    let mut hourly: BTreeMap<NaiveDateTime, Vec<f64>> = BTreeMap::new();
    for record in window.records() {
        let Some(hour_start) = truncate_to_hour(record.period_start()) else {
            continue;
        };
        hourly.entry(hour_start).or_default().push(record.price);
    }

    let (Some(first), Some(last)) = (hourly.keys().next(), hourly.keys().next_back()) else {
        return Err(ServiceError::NoWindow);
    };
    let window_start = *first;
    let window_end = *last + Duration::hours(1);

    let prices: Vec<HourlyPrice> = hourly
        .iter()
        .map(|(hour_start, prices)| HourlyPrice {
            start: localize(tz, *hour_start).to_rfc3339(),
            end: localize(tz, *hour_start + Duration::hours(1)).to_rfc3339(),
            price: round_to(calculate_average(prices), 2),
        })
        .collect();

    let all_prices: Vec<f64> = window.records().iter().map(|record| record.price).collect();
    let response = CheapestWindowResponse {
        start: localize(tz, window_start).to_rfc3339(),
        end: localize(tz, window_end).to_rfc3339(),
        average_price: round_to(calculate_average(&all_prices), 2),
        prices,
    };

    info!(
        "Cheapest {}h window between {}:00 and {}:00: {} - {} (avg {:.2})",
        request.duration_hours,
        request.start_hour,
        request.end_hour,
        response.start,
        response.end,
        response.average_price
    );
    debug!("Hourly breakdown: {:?}", response.prices);

    Ok(response)
}

fn truncate_to_hour(moment: NaiveDateTime) -> Option<NaiveDateTime> {
    moment.with_minute(0)?.with_second(0)?.with_nanosecond(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn quarter_data(date: NaiveDate) -> Vec<PriceRecord> {
        let prices_by_hour = [
            (8, [100.0, 110.0, 120.0, 130.0]),
            (9, [200.0, 210.0, 220.0, 230.0]),
            (10, [50.0, 60.0, 70.0, 80.0]),
            (11, [90.0, 100.0, 110.0, 120.0]),
        ];

        let mut records = Vec::new();
        for (hour, prices) in prices_by_hour {
            for (quarter, price) in (0_i64..).zip(prices) {
                let start = date.and_hms_opt(hour, 0, 0).unwrap() + Duration::minutes(15 * quarter);
                records.push(PriceRecord {
                    business_date: date,
                    ..PriceRecord::new(start + Duration::minutes(15), price)
                });
            }
        }
        records
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 20).unwrap()
    }

    #[test]
    fn test_request_defaults() {
        let request: CheapestWindowRequest =
            serde_json::from_value(json!({"duration_hours": 2})).unwrap();
        assert_eq!(request, CheapestWindowRequest::new(2));
        assert_eq!(request.start_hour, 8);
        assert_eq!(request.end_hour, 16);
    }

    #[test]
    fn test_duration_from_json() {
        assert_eq!(duration_from_json(&json!(2)), Ok(2));
        assert_eq!(duration_from_json(&json!("3")), Ok(3));
        assert_eq!(duration_from_json(&json!(1.5)), Err(ServiceError::InvalidDuration));
        assert_eq!(duration_from_json(&json!(2.0)), Err(ServiceError::InvalidDuration));
        assert_eq!(duration_from_json(&json!(true)), Err(ServiceError::InvalidDuration));
        assert_eq!(duration_from_json(&json!("2h")), Err(ServiceError::InvalidDuration));
        assert_eq!(duration_from_json(&json!("")), Err(ServiceError::InvalidDuration));
        assert!(matches!(
            duration_from_json(&json!(-1)),
            Err(ServiceError::OutOfRange { value: -1, .. })
        ));
    }

    #[test]
    fn test_from_json_validates() {
        let request = CheapestWindowRequest::from_json(&json!({
            "duration_hours": "2",
            "start_hour": 6,
            "end_hour": "12"
        }))
        .unwrap();
        assert_eq!(request.start_hour, 6);
        assert_eq!(request.end_hour, 12);

        assert_eq!(
            CheapestWindowRequest::from_json(&json!({"duration_hours": 9})),
            Err(ServiceError::OutOfRange {
                field: "duration_hours",
                value: 9,
                min: 1,
                max: 8
            })
        );
        assert_eq!(
            CheapestWindowRequest::from_json(&json!({"start_hour": 8})),
            Err(ServiceError::InvalidDuration)
        );
        assert!(CheapestWindowRequest::from_json(&json!({"duration_hours": 1, "end_hour": 25})).is_err());
    }

    #[test]
    fn test_from_json_whole_float_hours() {
        let request = CheapestWindowRequest::from_json(&json!({
            "duration_hours": 2,
            "start_hour": 6.0,
            "end_hour": 12.0
        }))
        .unwrap();
        assert_eq!(request.start_hour, 6);
        assert_eq!(request.end_hour, 12);

        assert_eq!(
            CheapestWindowRequest::from_json(&json!({"duration_hours": 2, "start_hour": 6.5})),
            Err(ServiceError::InvalidHour { field: "start_hour" })
        );
        assert_eq!(
            CheapestWindowRequest::from_json(&json!({"duration_hours": 2, "end_hour": -1.0})),
            Err(ServiceError::OutOfRange {
                field: "end_hour",
                value: -1,
                min: 0,
                max: 24
            })
        );
    }

    #[test]
    fn test_validate_bounds() {
        let inverted = CheapestWindowRequest {
            duration_hours: 1,
            start_hour: 16,
            end_hour: 8,
        };
        assert_eq!(inverted.validate(), Err(ServiceError::StartNotBeforeEnd));

        let too_long = CheapestWindowRequest {
            duration_hours: 3,
            start_hour: 10,
            end_hour: 12,
        };
        assert_eq!(too_long.validate(), Err(ServiceError::DurationDoesNotFit));

        assert!(CheapestWindowRequest::new(8).validate().is_ok());
    }

    #[test]
    fn test_hourly_averages() {
        let records = quarter_data(today());
        let response = find_cheapest_window(
            &records,
            &CheapestWindowRequest::new(2),
            chrono_tz::Europe::Warsaw,
        )
        .unwrap();

        assert_eq!(response.average_price, 85.0);
        assert_eq!(response.prices.len(), 2);
        assert_eq!(response.prices[0].price, 65.0);
        assert_eq!(response.prices[1].price, 105.0);
        assert_eq!(response.start, "2024-05-20T10:00:00+02:00");
        assert_eq!(response.end, "2024-05-20T12:00:00+02:00");
        assert_eq!(response.prices[1].start, "2024-05-20T11:00:00+02:00");
    }

    #[test]
    fn test_errors() {
        let tz = chrono_tz::Europe::Warsaw;
        assert_eq!(
            find_cheapest_window(&[], &CheapestWindowRequest::new(2), tz),
            Err(ServiceError::NoData)
        );

        let records = quarter_data(today());
        let late = CheapestWindowRequest {
            duration_hours: 2,
            start_hour: 14,
            end_hour: 20,
        };
        assert_eq!(
            find_cheapest_window(&records, &late, tz),
            Err(ServiceError::NoWindow)
        );

        let does_not_fit = CheapestWindowRequest {
            duration_hours: 4,
            start_hour: 8,
            end_hour: 10,
        };
        assert_eq!(
            find_cheapest_window(&records, &does_not_fit, tz),
            Err(ServiceError::DurationDoesNotFit)
        );
    }
}
