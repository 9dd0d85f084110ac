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

//! Per-record parse errors for upstream RCE price data

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordParseError {
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("invalid period end timestamp `{value}`: {source}")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("invalid business date `{value}`: {source}")]
    InvalidBusinessDate {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("invalid price value: {0}")]
    InvalidPrice(String),

    #[error("price is not a finite number: {0}")]
    NonFinitePrice(f64),
}
