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

//! RCE electricity price windows
//!
//! Parsing, best-window search and derived metrics for 15-minute RCE prices
//! published by PSE.

pub mod config;
pub mod error;
pub mod metrics;
pub mod pricing;
pub mod service;
pub mod snapshot;

// Re-export main types
pub use config::{HourWindow, RceConfig};
pub use error::{RceError, Result};
pub use metrics::{METRICS, MetricDefinition, MetricId, MetricValue, evaluate, evaluate_all};
pub use pricing::{PriceWindow, PseClient, parse_payload, parse_records};
pub use service::{
    CheapestWindowRequest, CheapestWindowResponse, HourlyPrice, ServiceError, find_cheapest_window,
};
pub use snapshot::PriceSnapshot;

pub use fluxion_rce_types::{PriceDirection, PriceRecord, PriceSummary, RawPriceRecord};
