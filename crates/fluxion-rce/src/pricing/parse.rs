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

//! Upstream payload parsing
//!
//! Each element of the payload is validated on its own. Bad elements are
//! logged and dropped; only a payload that is not JSON at all is an error.

use fluxion_rce_types::{PriceRecord, RawPriceRecord};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::Result;

/// Either the API envelope `{"value": [...]}` or a bare array of records
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PricePayload {
    Envelope { value: Vec<Value> },
    Bare(Vec<Value>),
}

/// Convert raw records, dropping the ones that fail validation
pub fn parse_records(raw: &[RawPriceRecord]) -> Vec<PriceRecord> {
    let mut skipped = 0_usize;
    let records: Vec<PriceRecord> = raw
        .iter()
        .filter_map(|item| match PriceRecord::try_from(item) {
            Ok(record) => Some(record),
            Err(e) => {
                skipped += 1;
                warn!("Skipping price record {:?}: {}", item.dtime, e);
                None
            }
        })
        .collect();

    debug!(
        "Parsed {} price records ({} skipped)",
        records.len(),
        skipped
    );
    records
}

/// Parse a JSON payload from the price API or a saved file
pub fn parse_payload(json: &str) -> Result<Vec<PriceRecord>> {
    let items = match serde_json::from_str::<PricePayload>(json)? {
        PricePayload::Envelope { value } | PricePayload::Bare(value) => value,
    };

    let raw: Vec<RawPriceRecord> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(raw) => Some(raw),
            Err(e) => {
                warn!("Skipping malformed price element: {}", e);
                None
            }
        })
        .collect();

    Ok(parse_records(&raw))
}
