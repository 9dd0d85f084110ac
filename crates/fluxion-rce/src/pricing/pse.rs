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

use chrono::NaiveDate;
use fluxion_rce_types::PriceRecord;
use reqwest::blocking::Client;
use tracing::{info, warn};

use crate::error::{RceError, Result};
use crate::pricing::parse::parse_payload;

/// Public RCE price endpoint of the Polish transmission system operator
pub const PSE_API_URL: &str = "https://api.raporty.pse.pl/api/rce-pln";

/// Fields requested from the API
pub const API_SELECT: &str = "dtime,period,rce_pln,business_date,publication_ts";

/// Page size, enough for one day of 15-minute periods
pub const API_FIRST: u32 = 200;

/// Blocking client for the PSE RCE price API
#[derive(Debug, Clone)]
pub struct PseClient {
    client: Client,
    api_url: String,
}

impl Default for PseClient {
    fn default() -> Self {
        Self::new(PSE_API_URL)
    }
}

impl PseClient {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.into(),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Fetch and parse all records published for `date`
    pub fn fetch_day(&self, date: NaiveDate) -> Result<Vec<PriceRecord>> {
        let filter = format!("business_date eq '{}'", date.format("%Y-%m-%d"));
        let first = API_FIRST.to_string();

        info!("Fetching RCE prices for {} from {}", date, self.api_url);

        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("$select", API_SELECT),
                ("$filter", filter.as_str()),
                ("$first", first.as_str()),
            ])
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(RceError::Status {
                status: status.as_u16(),
                url: self.api_url.clone(),
            });
        }

        let body = response.text()?;
        let records = parse_payload(&body)?;

        if records.is_empty() {
            warn!("No RCE price records returned for {}", date);
        } else {
            info!("Fetched {} RCE price records for {}", records.len(), date);
        }

        Ok(records)
    }
}
