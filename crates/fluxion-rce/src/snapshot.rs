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

//! One refresh worth of price records, split by business day

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use fluxion_rce_types::PriceRecord;

/// Immutable view over the records returned by one price refresh
///
/// All `now` arguments are wall-clock times in the market's time zone.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSnapshot {
    records: Vec<PriceRecord>,
    fetched_at: DateTime<Utc>,
}

impl PriceSnapshot {
    pub fn new(records: Vec<PriceRecord>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            records,
            fetched_at,
        }
    }

    pub fn records(&self) -> &[PriceRecord] {
        &self.records
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records published for `date`, in input order
    pub fn records_for(&self, date: NaiveDate) -> Vec<PriceRecord> {
        self.records
            .iter()
            .filter(|record| record.business_date == date)
            .cloned()
            .collect()
    }

    pub fn today(&self, now: NaiveDateTime) -> Vec<PriceRecord> {
        self.records_for(now.date())
    }

    pub fn tomorrow(&self, now: NaiveDateTime) -> Vec<PriceRecord> {
        match now.date().succ_opt() {
            Some(date) => self.records_for(date),
            None => Vec::new(),
        }
    }

    pub fn is_tomorrow_available(&self, now: NaiveDateTime) -> bool {
        now.date()
            .succ_opt()
            .is_some_and(|date| self.records.iter().any(|record| record.business_date == date))
    }

    /// The record whose period contains `moment`
    pub fn record_at(&self, moment: NaiveDateTime) -> Option<&PriceRecord> {
        self.records.iter().find(|record| record.covers(moment))
    }

    /// Price of the period covering `now` shifted by `hours` (negative looks back)
    pub fn price_at_hour_offset(&self, now: NaiveDateTime, hours: i64) -> Option<f64> {
        let moment = now.checked_add_signed(Duration::try_hours(hours)?)?;
        self.record_at(moment).map(|record| record.price)
    }

    /// Tomorrow's record for the same quarter hour as `now`
    pub fn tomorrow_record_at_time(&self, now: NaiveDateTime) -> Option<&PriceRecord> {
        let tomorrow = now.date().succ_opt()?;
        let moment = tomorrow.and_time(now.time());
        self.records
            .iter()
            .filter(|record| record.business_date == tomorrow)
            .find(|record| record.covers(moment))
    }
}
