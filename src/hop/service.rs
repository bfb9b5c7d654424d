use crate::api::ApiClient;
use crate::api::types::{HopData, UsageData};
use crate::error::{EkiwiError, Result};
use crate::hop::table::HourOfPowerTable;
use crate::logging::{StructuredLogger, get_logger};
use chrono::{Days, NaiveDate, Utc};
use chrono_tz::Tz;
use serde_json::json;
use std::sync::{Arc, RwLock};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Hour of Power reads and writes for the logged-in connection
pub struct HourOfPowerService {
    client: Arc<ApiClient>,
    table: &'static HourOfPowerTable,
    tz: Tz,
    last_window: RwLock<Option<String>>,
    last_average: RwLock<Option<f64>>,
    logger: StructuredLogger,
}

impl HourOfPowerService {
    pub fn new(client: Arc<ApiClient>, tz: Tz) -> Self {
        Self {
            client,
            table: HourOfPowerTable::global(),
            tz,
            last_window: RwLock::new(None),
            last_average: RwLock::new(None),
            logger: get_logger("hop"),
        }
    }

    /// Selectable window labels in display order
    pub fn options(&self) -> Vec<String> {
        self.table.all_labels()
    }

    /// Label returned by the most recent successful read or write
    pub fn last_window(&self) -> Option<String> {
        self.last_window.read().ok().and_then(|g| g.clone())
    }

    pub fn last_average_utilisation(&self) -> Option<f64> {
        self.last_average.read().ok().and_then(|g| *g)
    }

    /// Fetch the currently configured window
    pub async fn get_current_window(&self) -> Result<String> {
        let endpoint = self.hop_endpoint().await?;
        let data: HopData = crate::api::decode("hop", self.client.get(&endpoint).await?)?;
        let label = self.table.interval_to_label(data.start.interval)?.to_string();

        self.logger.debug(&format!(
            "Current Hour of Power is {} (interval {})",
            label, data.start.interval
        ));
        self.remember_window(&label);
        Ok(label)
    }

    /// Move the window to start at `label`. Peak and unknown labels are
    /// rejected before any network traffic.
    pub async fn set_window(&self, label: &str) -> Result<()> {
        let interval = self.table.label_to_interval(label)?;
        let endpoint = self.hop_endpoint().await?;

        self.logger.info(&format!(
            "Setting Hour of Power to {} (interval {})",
            label, interval
        ));
        self.client
            .post(&endpoint, json!({ "start": interval }))
            .await?;
        self.remember_window(label.trim());
        Ok(())
    }

    /// Mean daily HOP saving over the `days` days before today
    pub async fn get_average_utilisation(&self, days: u32) -> Result<f64> {
        self.get_average_utilisation_on(days, self.today()).await
    }

    /// [`Self::get_average_utilisation`] with an explicit "today".
    ///
    /// The sum is divided by `days`, not by the number of days returned.
    pub async fn get_average_utilisation_on(&self, days: u32, today: NaiveDate) -> Result<f64> {
        if days == 0 {
            return Err(EkiwiError::validation("days", "Must be greater than 0"));
        }
        let start = today
            .checked_sub_days(Days::new(u64::from(days)))
            .ok_or_else(|| EkiwiError::validation("days", "Window reaches before year 1"))?;
        let end = today
            .pred_opt()
            .ok_or_else(|| EkiwiError::validation("today", "No previous day"))?;

        let usage = self.fetch_usage(start, end).await?;
        let total: f64 = usage
            .usage
            .values()
            .map(|d| d.percent_consumption_adjustment)
            .sum();
        let average = total / f64::from(days);

        self.logger.debug(&format!(
            "Average HOP utilisation over {} days ({} reported): {:.2}",
            days,
            usage.usage.len(),
            average
        ));
        if let Ok(mut slot) = self.last_average.write() {
            *slot = Some(average);
        }
        Ok(average)
    }

    /// HOP saving recorded for a single day
    pub async fn get_utilisation_on(&self, date: NaiveDate) -> Result<f64> {
        let usage = self.fetch_usage(date, date).await?;
        let key = date.format(DATE_FORMAT).to_string();
        usage
            .usage
            .get(&key)
            .map(|d| d.percent_consumption_adjustment)
            .ok_or_else(|| EkiwiError::not_found(format!("No usage reported for {}", key)))
    }

    /// Current date in the provider timezone
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.tz).date_naive()
    }

    async fn fetch_usage(&self, start: NaiveDate, end: NaiveDate) -> Result<UsageData> {
        let customer = self.client.customer().await?;
        let endpoint = format!(
            "/consumption/averages/{}/{}/?start_date={}&end_date={}&group_by=day",
            customer.customer_id,
            customer.connection_id,
            start.format(DATE_FORMAT),
            end.format(DATE_FORMAT)
        );
        crate::api::decode("usage", self.client.get(&endpoint).await?)
    }

    async fn hop_endpoint(&self) -> Result<String> {
        let customer = self.client.customer().await?;
        Ok(format!(
            "/hop/{}/{}/",
            customer.customer_id, customer.connection_id
        ))
    }

    fn remember_window(&self, label: &str) {
        if let Ok(mut slot) = self.last_window.write() {
            *slot = Some(label.to_string());
        }
    }
}
