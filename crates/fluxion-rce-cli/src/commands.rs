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

//! Subcommand implementations
//!
//! Each command returns its rendered output; printing is left to the binary.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use fluxion_rce::pricing::calculator::{find_top_windows, whole_hours};
use fluxion_rce::{
    CheapestWindowRequest, PriceDirection, PriceSnapshot, PseClient, RceConfig, evaluate_all,
    find_cheapest_window, parse_payload,
};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::cli::{
    CheapestWindowArgs, DayArg, FetchArgs, JsonFormatter, MetricsArgs, TableFormatter,
    TopWindowsArgs, WindowRow,
};

const AT_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"];

/// Config from `path`, or the defaults
pub fn load_config(path: Option<&Path>) -> Result<RceConfig> {
    match path {
        Some(path) => RceConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(RceConfig::default()),
    }
}

/// Wall-clock time in `tz`, either parsed from `--at` or taken from the system clock
pub fn current_time(at: Option<&str>, tz: Tz) -> Result<NaiveDateTime> {
    let Some(text) = at else {
        return Ok(Utc::now().with_timezone(&tz).naive_local());
    };

    AT_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text.trim(), format).ok())
        .with_context(|| format!("Invalid --at value '{text}', expected YYYY-MM-DD HH:MM"))
}

/// Records for today and tomorrow
///
/// Reads `input` when given, otherwise asks the API. A failed request for
/// tomorrow is not an error, the prices are usually published in the afternoon.
pub fn load_snapshot(
    input: Option<&Path>,
    config: &RceConfig,
    now: NaiveDateTime,
) -> Result<PriceSnapshot> {
    let records = match input {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            parse_payload(&content)
                .with_context(|| format!("Failed to parse price records from {}", path.display()))?
        }
        None => {
            let client = PseClient::new(config.api_url.clone());
            let today = now.date();
            let mut records = client
                .fetch_day(today)
                .with_context(|| format!("Failed to fetch prices for {today}"))?;

            if let Some(tomorrow) = today.succ_opt() {
                match client.fetch_day(tomorrow) {
                    Ok(mut more) => records.append(&mut more),
                    Err(e) => warn!("Prices for {tomorrow} unavailable: {e}"),
                }
            }
            records
        }
    };

    info!("Loaded {} price records", records.len());
    Ok(PriceSnapshot::new(records, Utc::now()))
}

pub fn metrics(
    snapshot: &PriceSnapshot,
    config: &RceConfig,
    now: NaiveDateTime,
    args: &MetricsArgs,
) -> Result<String> {
    let rows = evaluate_all(snapshot, config, now);
    debug!(
        "{} of {} metrics available",
        rows.iter().filter(|(_, value)| value.is_some()).count(),
        rows.len()
    );

    if args.json {
        Ok(JsonFormatter::format_metrics(&rows, args.available_only)?)
    } else {
        Ok(TableFormatter::format_metrics(&rows, args.available_only))
    }
}

pub fn cheapest_window(
    snapshot: &PriceSnapshot,
    config: &RceConfig,
    now: NaiveDateTime,
    args: &CheapestWindowArgs,
) -> Result<String> {
    // Same validation as a JSON request body
    let request = CheapestWindowRequest::from_json(&json!({
        "duration_hours": args.duration,
        "start_hour": args.start_hour,
        "end_hour": args.end_hour,
    }))?;

    let response = find_cheapest_window(&snapshot.today(now), &request, config.tz()?)?;

    if args.json {
        Ok(JsonFormatter::format_cheapest_window(&response)?)
    } else {
        Ok(TableFormatter::format_cheapest_window(&response))
    }
}

pub fn top_windows(
    snapshot: &PriceSnapshot,
    config: &RceConfig,
    now: NaiveDateTime,
    args: &TopWindowsArgs,
) -> Result<String> {
    let Some(duration_hours) = whole_hours(args.duration).filter(|hours| *hours > 0) else {
        bail!("--duration must be a positive whole number of hours, got {}", args.duration);
    };
    if args.start_hour > 23 || args.end_hour > 24 || args.start_hour >= args.end_hour {
        bail!(
            "Invalid hour range {}-{}, expected 0 <= start < end <= 24",
            args.start_hour,
            args.end_hour
        );
    }

    let records = match args.day {
        DayArg::Today => snapshot.today(now),
        DayArg::Tomorrow => snapshot.tomorrow(now),
    };
    let direction = PriceDirection::from_want_max(!args.lowest);
    let windows = find_top_windows(
        &records,
        args.start_hour,
        args.end_hour,
        duration_hours,
        args.count,
        direction,
        !args.allow_same_start_hour,
    );

    let tz = config.tz()?;
    let rows: Vec<WindowRow> = windows
        .iter()
        .enumerate()
        .filter_map(|(index, window)| WindowRow::from_window(index + 1, window, tz))
        .collect();

    if args.json {
        Ok(JsonFormatter::format_windows(&rows)?)
    } else {
        Ok(TableFormatter::format_windows(&rows))
    }
}

/// Download one business day; returns the JSON unless it was written to `--output`
pub fn fetch(config: &RceConfig, now: NaiveDateTime, args: &FetchArgs) -> Result<Option<String>> {
    let date = match args.date.as_deref() {
        Some(text) => NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
            .with_context(|| format!("Invalid --date value '{text}', expected YYYY-MM-DD"))?,
        None => now.date(),
    };

    let client = PseClient::new(config.api_url.clone());
    let records = client
        .fetch_day(date)
        .with_context(|| format!("Failed to fetch prices for {date}"))?;
    if records.is_empty() {
        warn!("No prices published for {date} yet");
    }

    let body = JsonFormatter::format_records(&records)?;
    match &args.output {
        Some(path) => {
            fs::write(path, body).with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Saved {} records to {}", records.len(), path.display());
            Ok(None)
        }
        None => Ok(Some(body)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use chrono::{Duration, Timelike};
    use fluxion_rce::PriceRecord;
    use tempfile::NamedTempFile;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 2).unwrap()
    }

    /// 96 periods, cheap around noon and expensive in the evening
    fn records_for(date: NaiveDate) -> Vec<PriceRecord> {
        (1..=96_i64)
            .map(|index| {
                let end = date.and_hms_opt(0, 0, 0).unwrap() + Duration::minutes(15 * index);
                let start_hour = (end - Duration::minutes(15)).hour();
                let price = match start_hour {
                    11..=13 => 40.0,
                    18..=20 => 600.0,
                    _ => 300.0,
                };
                let mut record = PriceRecord::new(end, price);
                record.business_date = date;
                record
            })
            .collect()
    }

    fn snapshot() -> PriceSnapshot {
        let mut records = records_for(day());
        records.extend(records_for(day().succ_opt().unwrap()));
        PriceSnapshot::new(records, Utc::now())
    }

    fn noon() -> NaiveDateTime {
        day().and_hms_opt(12, 10, 0).unwrap()
    }

    #[test]
    fn test_current_time_formats() {
        let tz = chrono_tz::Europe::Warsaw;
        assert_eq!(current_time(Some("2024-06-02 12:10"), tz).unwrap(), noon());
        assert_eq!(current_time(Some("2024-06-02T12:10"), tz).unwrap(), noon());
        assert!(current_time(Some("02.06.2024"), tz).is_err());
    }

    #[test]
    fn test_load_config_default_and_file() {
        assert_eq!(load_config(None).unwrap(), RceConfig::default());

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "tax_rate = 0.08").unwrap();
        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.tax_rate, 0.08);
    }

    #[test]
    fn test_load_snapshot_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"dtime": "2024-06-02 12:15:00", "period": "12:00 - 12:15", "rce_pln": "41.0", "business_date": "2024-06-02"}}]"#
        )
        .unwrap();

        let snapshot = load_snapshot(Some(file.path()), &RceConfig::default(), noon()).unwrap();
        assert_eq!(snapshot.records().len(), 1);
        assert_eq!(snapshot.record_at(noon()).map(|record| record.price), Some(41.0));
    }

    #[test]
    fn test_load_snapshot_missing_file() {
        let missing = Path::new("/nonexistent/prices.json");
        assert!(load_snapshot(Some(missing), &RceConfig::default(), noon()).is_err());
    }

    #[test]
    fn test_cheapest_window_json() {
        let args = CheapestWindowArgs {
            duration: "3".to_owned(),
            start_hour: 8,
            end_hour: 16,
            json: true,
        };
        let output = cheapest_window(&snapshot(), &RceConfig::default(), noon(), &args).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["start"], "2024-06-02T11:00:00+02:00");
        assert_eq!(value["end"], "2024-06-02T14:00:00+02:00");
        assert_eq!(value["average_price"], 40.0);
        assert_eq!(value["prices"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_cheapest_window_rejects_fractional_duration() {
        let args = CheapestWindowArgs {
            duration: "2.5".to_owned(),
            start_hour: 8,
            end_hour: 16,
            json: false,
        };
        assert!(cheapest_window(&snapshot(), &RceConfig::default(), noon(), &args).is_err());
    }

    fn top_args(day: DayArg, lowest: bool) -> TopWindowsArgs {
        TopWindowsArgs {
            day,
            start_hour: 0,
            end_hour: 24,
            duration: 1.0,
            count: 2,
            lowest,
            allow_same_start_hour: false,
            json: true,
        }
    }

    #[test]
    fn test_top_windows_most_expensive_tomorrow() {
        let output = top_windows(
            &snapshot(),
            &RceConfig::default(),
            noon(),
            &top_args(DayArg::Tomorrow, false),
        )
        .unwrap();
        let rows: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(rows[0]["rank"], 1);
        assert_eq!(rows[0]["start"], "2024-06-03T18:00:00+02:00");
        assert_eq!(rows[0]["average_price"], 600.0);
        assert_eq!(rows[1]["start"], "2024-06-03T19:00:00+02:00");
    }

    #[test]
    fn test_top_windows_cheapest_today() {
        let output = top_windows(
            &snapshot(),
            &RceConfig::default(),
            noon(),
            &top_args(DayArg::Today, true),
        )
        .unwrap();
        let rows: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(rows[0]["start"], "2024-06-02T11:00:00+02:00");
        assert_eq!(rows[0]["average_price"], 40.0);
    }

    #[test]
    fn test_top_windows_rejects_bad_arguments() {
        let config = RceConfig::default();
        let mut args = top_args(DayArg::Today, false);
        args.duration = 1.5;
        assert!(top_windows(&snapshot(), &config, noon(), &args).is_err());

        let mut args = top_args(DayArg::Today, false);
        args.start_hour = 20;
        args.end_hour = 8;
        assert!(top_windows(&snapshot(), &config, noon(), &args).is_err());
    }

    #[test]
    fn test_metrics_json_has_today_price() {
        let args = MetricsArgs {
            available_only: true,
            json: true,
        };
        let output = metrics(&snapshot(), &RceConfig::default(), noon(), &args).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["today_price"], 40.0);
        assert_eq!(value["tomorrow_max_price"], 600.0);
    }
}
