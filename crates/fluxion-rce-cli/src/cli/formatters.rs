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

//! Output formatters for the CLI

use chrono_tz::Tz;
use comfy_table::{Attribute, Cell, Color, Table, presets::UTF8_FULL};
use fluxion_rce::pricing::calculator::{localize, round_to};
use fluxion_rce::{
    CheapestWindowResponse, MetricDefinition, MetricValue, PriceRecord, PriceWindow,
    RawPriceRecord,
};
use serde::Serialize;
use serde_json::{Map, Value, json};

/// Formatter for pretty terminal tables
#[derive(Debug)]
pub struct TableFormatter;

/// Formatter for machine readable JSON
#[derive(Debug)]
pub struct JsonFormatter;

/// One ranked window, ready for output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowRow {
    pub rank: usize,
    pub start: String,
    pub end: String,
    pub average_price: f64,
    pub periods: usize,
}

impl WindowRow {
    /// `None` for an empty window
    pub fn from_window(rank: usize, window: &PriceWindow<'_>, tz: Tz) -> Option<Self> {
        Some(Self {
            rank,
            start: localize(tz, window.start()?).to_rfc3339(),
            end: localize(tz, window.end()?).to_rfc3339(),
            average_price: round_to(window.average_price(), 2),
            periods: window.len(),
        })
    }
}

type MetricRow = (&'static MetricDefinition, Option<MetricValue>);

impl TableFormatter {
    /// Metric table, one row per metric in table order
    pub fn format_metrics(rows: &[MetricRow], available_only: bool) -> String {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec![
            Cell::new("Metric").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
            Cell::new("Unit").add_attribute(Attribute::Bold),
        ]);

        for (definition, value) in rows {
            let value_cell = match value {
                Some(value) => Cell::new(value.to_string()),
                None if available_only => continue,
                None => Cell::new("unavailable").fg(Color::DarkGrey),
            };
            table.add_row(vec![
                Cell::new(definition.key),
                value_cell,
                Cell::new(definition.unit.unwrap_or("")),
            ]);
        }

        table.to_string()
    }

    pub fn format_cheapest_window(response: &CheapestWindowResponse) -> String {
        let mut output = format!(
            "Cheapest window: {} -> {} (average {:.2} PLN/MWh)\n\n",
            response.start, response.end, response.average_price
        );

        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec![
            Cell::new("Start").add_attribute(Attribute::Bold),
            Cell::new("End").add_attribute(Attribute::Bold),
            Cell::new("Price\n(PLN/MWh)").add_attribute(Attribute::Bold),
        ]);
        for hour in &response.prices {
            table.add_row(vec![
                Cell::new(&hour.start),
                Cell::new(&hour.end),
                Cell::new(format!("{:.2}", hour.price)),
            ]);
        }

        output.push_str(&table.to_string());
        output
    }

    /// Ranked windows, the best one highlighted
    pub fn format_windows(rows: &[WindowRow]) -> String {
        if rows.is_empty() {
            return "No matching windows".to_owned();
        }

        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec![
            Cell::new("#").add_attribute(Attribute::Bold),
            Cell::new("Start").add_attribute(Attribute::Bold),
            Cell::new("End").add_attribute(Attribute::Bold),
            Cell::new("Average\n(PLN/MWh)").add_attribute(Attribute::Bold),
            Cell::new("Periods").add_attribute(Attribute::Bold),
        ]);

        for row in rows {
            let average = Cell::new(format!("{:.2}", row.average_price));
            let average = if row.rank == 1 {
                average.fg(Color::Green).add_attribute(Attribute::Bold)
            } else {
                average
            };
            table.add_row(vec![
                Cell::new(row.rank),
                Cell::new(&row.start),
                Cell::new(&row.end),
                average,
                Cell::new(row.periods),
            ]);
        }

        table.to_string()
    }
}

impl JsonFormatter {
    /// Object keyed by metric name; unavailable metrics are `null`
    pub fn format_metrics(rows: &[MetricRow], available_only: bool) -> serde_json::Result<String> {
        let mut object = Map::new();
        for (definition, value) in rows {
            match value {
                Some(value) => {
                    object.insert(definition.key.to_owned(), serde_json::to_value(value)?);
                }
                None if available_only => {}
                None => {
                    object.insert(definition.key.to_owned(), Value::Null);
                }
            }
        }
        serde_json::to_string_pretty(&Value::Object(object))
    }

    pub fn format_cheapest_window(response: &CheapestWindowResponse) -> serde_json::Result<String> {
        serde_json::to_string_pretty(response)
    }

    pub fn format_windows(rows: &[WindowRow]) -> serde_json::Result<String> {
        serde_json::to_string_pretty(rows)
    }

    /// Records in the API's own `{"value": [...]}` shape
    pub fn format_records(records: &[PriceRecord]) -> serde_json::Result<String> {
        let raw: Vec<RawPriceRecord> = records.iter().map(RawPriceRecord::from).collect();
        serde_json::to_string_pretty(&json!({ "value": raw }))
    }
}
