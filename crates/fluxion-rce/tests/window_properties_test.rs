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

// Properties of the window search over realistic quarter-hour days:
// extremes, idempotence, continuity across gaps, distinct top-N start hours,
// zero-value conventions and stable re-ranking.

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use fluxion_rce::pricing::calculator::{
    calculate_average, calculate_median, calculate_percentage_difference, find_extreme_records,
    find_optimal_window, find_top_windows,
};
use fluxion_rce::{PriceDirection, PriceRecord};

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
}

fn midnight() -> NaiveDateTime {
    day().and_hms_opt(0, 0, 0).unwrap()
}

/// Record for the quarter-hour period starting `index * 15min` after midnight
fn quarter(index: i64, price: f64) -> PriceRecord {
    PriceRecord {
        business_date: day(),
        ..PriceRecord::new(midnight() + Duration::minutes(15 * (index + 1)), price)
    }
}

/// Duck-curve day: cheap night, expensive morning, solar dip, evening peak
fn create_duck_curve_day() -> Vec<PriceRecord> {
    (0..96_i64)
        .map(|i| {
            let hour = i / 4;
            let price = match hour {
                0..=5 => 320.0 - (i % 4) as f64,
                6..=9 => 520.0 + (i % 4) as f64 * 10.0,
                10..=15 => 40.0 - (hour - 10) as f64 * 15.0 + (i % 4) as f64,
                16..=20 => 700.0 + (hour - 16) as f64 * 20.0 - (i % 4) as f64 * 5.0,
                _ => 450.0,
            };
            quarter(i, price)
        })
        .collect()
}

/// The example block from 08:00 to 12:00 used by the cheapest-window service
fn create_service_example() -> Vec<PriceRecord> {
    let hours = [
        [100.0, 110.0, 120.0, 130.0],
        [200.0, 210.0, 220.0, 230.0],
        [50.0, 60.0, 70.0, 80.0],
        [90.0, 100.0, 110.0, 120.0],
    ];
    (32_i64..)
        .zip(hours.into_iter().flatten())
        .map(|(index, price)| quarter(index, price))
        .collect()
}

#[test]
fn extremes_are_non_empty_exact_and_sorted() {
    let mut records = create_duck_curve_day();
    records.reverse();

    for direction in [PriceDirection::Highest, PriceDirection::Lowest] {
        let extremes = find_extreme_records(&records, direction);
        let target = records
            .iter()
            .map(|r| r.price)
            .reduce(if direction.want_max() { f64::max } else { f64::min })
            .unwrap();

        assert!(!extremes.is_empty());
        assert!(extremes.iter().all(|r| r.price == target));
        assert!(extremes.windows(2).all(|w| w[0].period_end <= w[1].period_end));
    }
}

#[test]
fn optimal_window_is_idempotent() {
    let records = create_duck_curve_day();

    let first = find_optimal_window(&records, 0, 24, 3, PriceDirection::Lowest).unwrap();
    let second = find_optimal_window(&records, 0, 24, 3, PriceDirection::Lowest).unwrap();

    assert_eq!(first, second);
    assert_eq!(
        first.average_price().to_bits(),
        second.average_price().to_bits()
    );
}

#[test]
fn cheapest_two_hours_is_ten_to_noon() {
    let records = create_service_example();

    let window = find_optimal_window(&records, 8, 16, 2, PriceDirection::Lowest).unwrap();

    assert_eq!(window.len(), 8);
    assert_eq!(window.average_price(), 85.0);
    assert_eq!(window.start(), day().and_hms_opt(10, 0, 0));
    assert_eq!(window.end(), day().and_hms_opt(12, 0, 0));
}

#[test]
fn unordered_input_gives_same_window() {
    let records = create_service_example();
    let mut shuffled = records.clone();
    shuffled.reverse();
    shuffled.swap(1, 9);

    let ordered = find_optimal_window(&records, 8, 16, 2, PriceDirection::Lowest).unwrap();
    let unordered = find_optimal_window(&shuffled, 8, 16, 2, PriceDirection::Lowest).unwrap();

    assert_eq!(ordered.start(), unordered.start());
    assert_eq!(ordered.average_price(), unordered.average_price());
}

#[test]
fn window_never_straddles_gap() {
    // 10:00-14:00 at 500 with cheap periods on both sides of a missing
    // 12:15-12:45 half hour; joining them would give the cheapest "window"
    let records: Vec<PriceRecord> = (40..56_i64)
        .filter(|i| !(49..=50).contains(i))
        .map(|i| quarter(i, if matches!(i, 48 | 51..=53) { 1.0 } else { 500.0 }))
        .collect();

    let window = find_optimal_window(&records, 10, 16, 1, PriceDirection::Lowest).unwrap();

    let step = Duration::minutes(15);
    assert!(
        window
            .records()
            .windows(2)
            .all(|pair| pair[1].period_end - pair[0].period_end == step)
    );
    assert_eq!(window.start(), day().and_hms_opt(12, 45, 0));
    assert_eq!(window.average_price(), 125.75);
}

#[test]
fn top_windows_have_distinct_start_hours() {
    let records = create_duck_curve_day();

    let windows = find_top_windows(&records, 16, 21, 1, 2, PriceDirection::Highest, true);

    assert_eq!(windows.len(), 2);
    assert_ne!(windows[0].start_hour(), windows[1].start_hour());
    for window in &windows {
        assert_eq!(window.start().unwrap().minute(), 0);
    }
    assert!(windows[0].average_price() >= windows[1].average_price());
}

#[test]
fn top_windows_rank_hour_aligned_candidates() {
    // Peak 17:00-18:30: the 17:15 and 17:30 windows are just as expensive
    // but only full-hour starts are ranked
    let records: Vec<PriceRecord> = (64..80_i64)
        .map(|i| quarter(i, if (68..74).contains(&i) { 900.0 } else { 100.0 }))
        .collect();

    let windows = find_top_windows(&records, 16, 20, 1, 2, PriceDirection::Highest, true);
    let hours: Vec<u32> = windows.iter().filter_map(|w| w.start_hour()).collect();

    assert_eq!(hours, vec![17, 18]);

    let all = find_top_windows(&records, 16, 20, 1, 10, PriceDirection::Highest, false);
    assert_eq!(all.len(), 4);
}

#[test]
fn zero_value_conventions() {
    assert_eq!(calculate_average(&[]), 0.0);
    assert_eq!(calculate_median(&[]), 0.0);
    for x in [-250.0, 0.0, 1.5, 1e9] {
        assert_eq!(calculate_percentage_difference(x, 0.0), 0.0);
    }
}

#[test]
fn reranking_top_windows_is_stable() {
    let records = create_duck_curve_day();
    let windows = find_top_windows(&records, 0, 24, 1, 8, PriceDirection::Lowest, true);
    assert_eq!(windows.len(), 8);

    let mut reranked = windows.clone();
    reranked.sort_by(|a, b| a.average_price().total_cmp(&b.average_price()));

    assert_eq!(reranked, windows);
}

#[test]
fn distinct_start_hour_applies_across_days() {
    let next_day = |record: PriceRecord| PriceRecord {
        period_end: record.period_end + Duration::days(1),
        business_date: record.business_date + Duration::days(1),
        ..record
    };
    let mut records: Vec<PriceRecord> = (72..80_i64)
        .map(|i| quarter(i, if i < 76 { 900.0 } else { 700.0 }))
        .collect();
    records.extend((72..76_i64).map(|i| next_day(quarter(i, 800.0))));

    let distinct = find_top_windows(&records, 0, 24, 1, 2, PriceDirection::Highest, true);
    let prices: Vec<f64> = distinct.iter().map(|w| w.average_price()).collect();
    assert_eq!(prices, vec![900.0, 700.0]);

    let any = find_top_windows(&records, 0, 24, 1, 2, PriceDirection::Highest, false);
    let prices: Vec<f64> = any.iter().map(|w| w.average_price()).collect();
    assert_eq!(prices, vec![900.0, 800.0]);
}
