//! Recorder installation.

use {anyhow::Result, tracing::info};

/// Histograms with explicit bucket boundaries; everything else uses the
/// exporter's summary defaults.
#[cfg(feature = "prometheus")]
const HISTOGRAM_BUCKETS: &[(&str, &[f64])] = &[
    (
        crate::router::GENERATION_DURATION_SECONDS,
        crate::buckets::GENERATION_DURATION,
    ),
    (
        crate::router::RATE_LIMIT_WAIT_SECONDS,
        crate::buckets::RATE_LIMIT_WAIT,
    ),
];

/// Handle to whatever recorder [`init_metrics`] installed.
#[derive(Clone, Default)]
pub struct MetricsHandle {
    #[cfg(feature = "prometheus")]
    prometheus: Option<metrics_exporter_prometheus::PrometheusHandle>,
}

impl MetricsHandle {
    /// Prometheus text exposition of the current values.
    ///
    /// Empty when nothing was installed.
    #[must_use]
    pub fn render(&self) -> String {
        #[cfg(feature = "prometheus")]
        if let Some(handle) = &self.prometheus {
            return handle.render();
        }
        String::new()
    }

    /// Whether a recorder is collecting values.
    #[must_use]
    pub fn is_recording(&self) -> bool {
        #[cfg(feature = "prometheus")]
        {
            self.prometheus.is_some()
        }
        #[cfg(not(feature = "prometheus"))]
        {
            false
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MetricsRecorderConfig {
    pub enabled: bool,
    /// Labels attached to every series, e.g. `("instance", "bot-1")`.
    pub global_labels: Vec<(String, String)>,
}

/// Install the global recorder. Call once at startup.
///
/// # Errors
///
/// Fails if bucket configuration is rejected or another global recorder
/// is already installed.
pub fn init_metrics(config: MetricsRecorderConfig) -> Result<MetricsHandle> {
    if !config.enabled {
        info!("metrics collection is disabled");
        return Ok(MetricsHandle::default());
    }

    #[cfg(feature = "prometheus")]
    {
        let mut builder = metrics_exporter_prometheus::PrometheusBuilder::new();
        for (name, buckets) in HISTOGRAM_BUCKETS {
            builder = builder.set_buckets_for_metric(
                metrics_exporter_prometheus::Matcher::Full((*name).to_string()),
                buckets,
            )?;
        }
        for (key, value) in config.global_labels {
            builder = builder.add_global_label(key, value);
        }
        let handle = builder.install_recorder()?;
        info!(histograms = HISTOGRAM_BUCKETS.len(), "prometheus recorder installed");
        Ok(MetricsHandle {
            prometheus: Some(handle),
        })
    }

    #[cfg(not(feature = "prometheus"))]
    {
        info!(
            labels = config.global_labels.len(),
            "metrics enabled but built without the prometheus exporter"
        );
        Ok(MetricsHandle::default())
    }
}
