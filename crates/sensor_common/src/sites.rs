//! Site overview table.
//!
//! A handful of monitored sites with map coordinates and an operational
//! status. Lives in memory; admins replace it wholesale.

use crate::error::{Result, SensorError};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const NORMAL_COLOR: &str = "#00FF00";
pub const ALERT_COLOR: &str = "#FF0000";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SiteStatus {
    Normal,
    Critical,
    Maintenance,
    Other(String),
}

impl SiteStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Normal => "Normal",
            Self::Critical => "Critical",
            Self::Maintenance => "Maintenance",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for SiteStatus {
    fn from(s: String) -> Self {
        match s.trim() {
            "Normal" => Self::Normal,
            "Critical" => Self::Critical,
            "Maintenance" => Self::Maintenance,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<SiteStatus> for String {
    fn from(s: SiteStatus) -> Self {
        s.as_str().to_string()
    }
}

impl fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    #[serde(rename = "Site Name")]
    pub name: String,
    #[serde(rename = "Lat")]
    pub lat: f64,
    #[serde(rename = "Lon")]
    pub lon: f64,
    #[serde(rename = "Status")]
    pub status: SiteStatus,
}

impl Site {
    pub fn new(name: &str, lat: f64, lon: f64, status: SiteStatus) -> Self {
        Self { name: name.to_string(), lat, lon, status }
    }

    /// Map marker colour: green only when the site is Normal
    pub fn marker_color(&self) -> &'static str {
        if self.status == SiteStatus::Normal {
            NORMAL_COLOR
        } else {
            ALERT_COLOR
        }
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(SensorError::InvalidSite("site name is blank".to_string()));
        }
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(SensorError::InvalidSite(format!(
                "{}: latitude {} out of range",
                self.name, self.lat
            )));
        }
        if !(-180.0..=180.0).contains(&self.lon) {
            return Err(SensorError::InvalidSite(format!(
                "{}: longitude {} out of range",
                self.name, self.lon
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSummary {
    pub total: usize,
    pub critical: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteTable {
    sites: Vec<Site>,
}

impl SiteTable {
    pub fn new(sites: Vec<Site>) -> Result<Self> {
        sites.iter().try_for_each(Site::validate)?;
        Ok(Self { sites })
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn summary(&self) -> SiteSummary {
        SiteSummary {
            total: self.sites.len(),
            critical: self
                .sites
                .iter()
                .filter(|s| s.status == SiteStatus::Critical)
                .count(),
        }
    }

    /// Swap in an edited table. Nothing changes if any row is invalid.
    pub fn replace(&mut self, sites: Vec<Site>) -> Result<()> {
        *self = Self::new(sites)?;
        Ok(())
    }
}

impl Default for SiteTable {
    fn default() -> Self {
        Self {
            sites: vec![
                Site::new("RBS Chonburi", 13.3611, 100.9847, SiteStatus::Normal),
                Site::new("Central Ayutthaya", 14.3532, 100.5700, SiteStatus::Critical),
                Site::new("RBS Rayong", 12.6828, 101.2816, SiteStatus::Maintenance),
                Site::new("Robinson Saraburi", 14.5290, 100.9130, SiteStatus::Normal),
            ],
        }
    }
}
