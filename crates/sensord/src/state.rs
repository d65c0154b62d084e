//! Shared service state.
//!
//! The core is stateless; whatever the dashboard remembers between requests
//! (the loaded sensor table, the last probe results, the edited site table)
//! lives here.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sensor_common::session::SessionCookie;
use sensor_common::sheet::{SheetClient, TableSource};
use sensor_common::{AccountBook, Config, EndpointProber, ProbeStatus, SiteTable, Table};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::warn;

/// Last loaded sensor table and the probe results that belong to it
#[derive(Debug, Default)]
pub struct SensorCache {
    table: Option<Table>,
    loaded_at: Option<Instant>,
    results: Option<Vec<ProbeStatus>>,
    probed_at: Option<DateTime<Utc>>,
}

impl SensorCache {
    pub fn is_fresh(&self, max_age: Duration) -> bool {
        matches!(self.loaded_at, Some(at) if at.elapsed() < max_age) && self.table.is_some()
    }

    pub fn table(&self) -> Option<&Table> {
        self.table.as_ref()
    }

    pub fn results(&self) -> Option<&[ProbeStatus]> {
        self.results.as_deref()
    }

    pub fn probed_at(&self) -> Option<DateTime<Utc>> {
        self.probed_at
    }

    /// Results and their timestamp, only when they were computed for `table`
    pub fn results_for(&self, table: &Table) -> (Option<&[ProbeStatus]>, Option<DateTime<Utc>>) {
        if self.table.as_ref() == Some(table) {
            (self.results(), self.results.as_ref().and(self.probed_at))
        } else {
            (None, None)
        }
    }

    /// Keep a freshly loaded table. Results survive only if the table did not
    /// change; otherwise rows are Unknown until the next cycle.
    pub fn store_table(&mut self, table: Table) {
        if self.table.as_ref() != Some(&table) {
            self.results = None;
            self.probed_at = None;
        }
        self.table = Some(table);
        self.loaded_at = Some(Instant::now());
    }

    /// Record a finished cycle together with the table it probed
    pub fn store_results(&mut self, table: Table, results: Vec<ProbeStatus>) {
        if self.table.as_ref() != Some(&table) {
            self.loaded_at = Some(Instant::now());
        }
        self.table = Some(table);
        self.results = Some(results);
        self.probed_at = Some(Utc::now());
    }
}

pub struct AppState {
    pub config: Config,
    pub prober: EndpointProber,
    pub sheets: SheetClient,
    pub cookie: SessionCookie,
    pub sites: RwLock<SiteTable>,
    pub sensors: RwLock<SensorCache>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let prober = EndpointProber::http(
            Duration::from_secs(config.probe.timeout_secs),
            config.probe.workers,
        )
        .context("Failed to build probe client")?;

        let sheets = SheetClient::new(Duration::from_secs(config.sources.fetch_timeout_secs))
            .context("Failed to build sheet client")?;

        let cookie = SessionCookie::new(config.session.cookie_name.clone(), config.session.ttl_days);

        Ok(Self {
            config,
            prober,
            sheets,
            cookie,
            sites: RwLock::new(SiteTable::default()),
            sensors: RwLock::new(SensorCache::default()),
            start_time: Instant::now(),
        })
    }

    pub fn sensor_source(&self) -> TableSource {
        TableSource::parse(&self.config.sources.sensor_table_url)
    }

    /// Fresh read of the member sheet. Unreachable or malformed sheets give
    /// an empty book.
    pub async fn load_accounts(&self) -> AccountBook {
        let source = TableSource::parse(&self.config.sources.user_db_url);
        let text = match self.sheets.fetch_text(&source).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Account sheet unavailable: {}", e);
                return AccountBook::default();
            }
        };
        AccountBook::from_csv(&text).unwrap_or_else(|e| {
            warn!("Account sheet unreadable: {}", e);
            AccountBook::default()
        })
    }

    /// Current sensor table, reloading it when the cached copy is stale
    pub async fn current_table(&self) -> Table {
        let max_age = Duration::from_secs(self.config.sources.table_cache_secs);
        {
            let cache = self.sensors.read().await;
            if cache.is_fresh(max_age) {
                if let Some(table) = cache.table() {
                    return table.clone();
                }
            }
        }

        let table = self
            .sheets
            .load_table(&self.sensor_source(), &self.config.probe.url_column)
            .await;
        self.sensors.write().await.store_table(table.clone());
        table
    }
}
