//! Calendar months of a reporting year.
//!
//! Ledger months always iterate January..December, whatever order the
//! source rows arrive in.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::ForecastError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Month {
    January = 1,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

const SPANISH: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];

impl Month {
    pub const ALL: [Month; 12] = [
        Month::January,
        Month::February,
        Month::March,
        Month::April,
        Month::May,
        Month::June,
        Month::July,
        Month::August,
        Month::September,
        Month::October,
        Month::November,
        Month::December,
    ];

    /// 1-based month number.
    pub fn number(self) -> u32 {
        self as u32
    }

    pub fn from_number(n: u32) -> Option<Month> {
        n.checked_sub(1)
            .and_then(|i| Self::ALL.get(i as usize))
            .copied()
    }

    /// Zero-based position in the year, for indexing per-month arrays.
    pub fn index(self) -> usize {
        self as usize - 1
    }

    /// Months from January up to and including `self`.
    pub fn through(self) -> impl Iterator<Item = Month> {
        Self::ALL.into_iter().take(self.index() + 1)
    }

    pub fn previous(self) -> Option<Month> {
        Self::from_number(self.number() - 1)
    }

    pub fn short_name(self) -> &'static str {
        chrono::Month::try_from(self.number() as u8)
            .ok()
            .and_then(|m| m.name().get(..3))
            .unwrap_or("")
    }

    /// Month from a date or datetime cell ("2024-03-15", "15/03/2024",
    /// "2024-03-15 08:00:00").
    pub fn from_date_str(raw: &str) -> Option<Month> {
        let raw = raw.trim();
        let date = DATE_FORMATS
            .iter()
            .find_map(|f| NaiveDate::parse_from_str(raw, f).ok())
            .or_else(|| {
                NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                    .ok()
                    .map(|dt| dt.date())
            })?;
        Self::from_number(date.month())
    }
}

impl FromStr for Month {
    type Err = ForecastError;

    /// Accepts month numbers ("3", "03", "3.0"), English names or
    /// abbreviations ("Mar", "March") and Spanish names ("Marzo").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(n) = trimmed.parse::<f64>() {
            if n.fract() == 0.0 && n >= 1.0 {
                if let Some(m) = Self::from_number(n as u32) {
                    return Ok(m);
                }
            }
        } else {
            let lower = trimmed.to_lowercase();
            if let Some(pos) = SPANISH.iter().position(|name| *name == lower) {
                return Ok(Self::ALL[pos]);
            }
            if let Ok(m) = lower.parse::<chrono::Month>() {
                if let Some(month) = Self::from_number(m.number_from_month()) {
                    return Ok(month);
                }
            }
        }
        Err(ForecastError::InvalidData(format!("Unrecognised month: '{s}'")))
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}
