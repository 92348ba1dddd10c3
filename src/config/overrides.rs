use crate::config::types::Config;

/// Command-line values layered on top of the file configuration
///
/// `None` leaves the file (or default) value untouched.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub output: Option<String>,
    pub max_loads: Option<u32>,
    pub delay_secs: Option<f64>,
    pub concurrency: Option<usize>,
    pub batch_size: Option<usize>,
    pub no_enrich: bool,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub proxy: Option<String>,
    pub summary: Option<String>,
    pub time_budget_secs: Option<u64>,
    pub incremental_save: bool,
}

impl Overrides {
    /// Applies the overrides in place
    ///
    /// Validation is left to the caller so that overridden values are checked
    /// with the same rules as file values.
    pub fn apply(&self, config: &mut Config) {
        if let Some(path) = &self.output {
            config.output.path = path.clone();
        }
        if let Some(max_loads) = self.max_loads {
            config.crawler.max_loads = max_loads;
        }
        if let Some(delay) = self.delay_secs {
            config.crawler.min_interval_ms = (delay.max(0.0) * 1000.0).round() as u64;
        }
        if let Some(concurrency) = self.concurrency {
            config.enrichment.concurrency = concurrency;
        }
        if let Some(batch_size) = self.batch_size {
            config.enrichment.batch_size = batch_size;
        }
        if self.no_enrich {
            config.enrichment.enabled = false;
        }
        if let Some(start) = &self.start_date {
            config.filter.start_date = Some(start.clone());
        }
        if let Some(end) = &self.end_date {
            config.filter.end_date = Some(end.clone());
        }
        if let Some(proxy) = &self.proxy {
            config.crawler.proxy = Some(proxy.clone());
        }
        if let Some(summary) = &self.summary {
            config.output.summary_path = Some(summary.clone());
        }
        if let Some(budget) = self.time_budget_secs {
            config.crawler.time_budget_secs = Some(budget);
        }
        if self.incremental_save {
            config.output.incremental_save = true;
        }
    }
}
