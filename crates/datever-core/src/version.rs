//! Date-based API version identifiers
//!
//! Copyright (c) 2025 Datever Team
//! Licensed under the Apache-2.0 license

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Format every version identifier is parsed from and rendered to
pub const VERSION_FORMAT: &str = "%Y-%m-%d";

/// An API revision, named by the calendar day it was introduced
///
/// Ordering is chronological, so a later date is a newer version. Two
/// identifiers naming the same day are the same version regardless of how
/// the day was spelled when parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionIdentifier(NaiveDate);

impl VersionIdentifier {
    /// Create a version from a calendar date
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Create a version from year, month and day
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self, VersionError> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or_else(|| VersionError::InvalidFormat(format!("{:04}-{:02}-{:02}", year, month, day)))
    }

    /// Parse a `YYYY-MM-DD` version string
    pub fn parse(version_str: &str) -> Result<Self, VersionError> {
        NaiveDate::parse_from_str(version_str, VERSION_FORMAT)
            .map(Self)
            .map_err(|_| VersionError::InvalidFormat(version_str.to_string()))
    }

    /// The version in effect today, in local time
    pub fn today() -> Self {
        Self(Local::now().date_naive())
    }

    /// The underlying date
    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for VersionIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(VERSION_FORMAT))
    }
}

impl FromStr for VersionIdentifier {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<NaiveDate> for VersionIdentifier {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl Serialize for VersionIdentifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VersionIdentifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Version parsing error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("Invalid version format: expected YYYY-MM-DD, got '{0}'")]
    InvalidFormat(String),
}
