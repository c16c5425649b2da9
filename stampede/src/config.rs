use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::Context as _;
use serde::Deserialize;
use stampede_core::{ReportMetrics, RunOptions, Stage, ThresholdSet};

use crate::cli::RunArgs;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_SUMMARY_EXPORT: &str = "results/stress-summary.json";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct ConfigYaml {
    pub base_url: Option<String>,

    #[serde(rename = "startVUs")]
    pub start_vus: Option<u64>,

    #[serde(default)]
    pub stages: Vec<StageYaml>,

    #[serde(default)]
    pub thresholds: BTreeMap<String, ThresholdExprYaml>,

    pub iteration_timeout: Option<YamlSeconds>,
    pub request_timeout: Option<YamlSeconds>,
    pub control_interval: Option<YamlSeconds>,
    pub summary_export: Option<String>,

    #[serde(default)]
    pub report: ReportYaml,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct StageYaml {
    pub duration: YamlSeconds,
    pub target: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum ThresholdExprYaml {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct ReportYaml {
    pub title: Option<String>,
    pub requests: Option<String>,
    pub successes: Option<String>,
    pub error_rate: Option<String>,
    pub latency: Option<String>,
}

/// Duration in seconds as written; may be negative so stage validation can report it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct YamlSeconds(f64);

impl YamlSeconds {
    fn positive(self, field: &str) -> anyhow::Result<Duration> {
        if !self.0.is_finite() || self.0 <= 0.0 {
            anyhow::bail!("`{field}` must be a positive duration (got {}s)", self.0);
        }
        Duration::try_from_secs_f64(self.0).with_context(|| format!("`{field}` is too large"))
    }
}

impl<'de> Deserialize<'de> for YamlSeconds {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct V;

        impl<'de> serde::de::Visitor<'de> for V {
            type Value = YamlSeconds;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("duration as string (e.g. 10s, 1m30s), integer seconds, or float seconds")
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(YamlSeconds(v as f64))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(YamlSeconds(v as f64))
            }

            fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(YamlSeconds(v))
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                let v = v.trim();
                let (sign, body) = match v.strip_prefix('-') {
                    Some(rest) => (-1.0, rest.trim_start()),
                    None => (1.0, v),
                };
                let d = humantime::parse_duration(body).map_err(E::custom)?;
                Ok(YamlSeconds(sign * d.as_secs_f64()))
            }
        }

        deserializer.deserialize_any(V)
    }
}

pub(crate) async fn load_config_from_yaml(path: &Path) -> anyhow::Result<ConfigYaml> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read config YAML: {}", path.display()))?;

    serde_yaml::from_slice(&bytes)
        .with_context(|| format!("failed to parse YAML: {}", path.display()))
}

/// The built-in ticket stress profile.
pub(crate) fn ticket_stress_profile() -> ConfigYaml {
    let stage = |secs: u64, target: i64| StageYaml {
        duration: YamlSeconds(secs as f64),
        target,
    };
    let threshold = |expr: &str| ThresholdExprYaml::One(expr.to_string());

    ConfigYaml {
        stages: vec![
            stage(30, 5),
            stage(60, 10),
            stage(30, 20),
            stage(60, 20),
            stage(30, 50),
            stage(120, 50),
            stage(30, 0),
        ],
        thresholds: BTreeMap::from([
            ("http_req_duration".to_string(), threshold("p(95)<5000")),
            ("ticket_errors".to_string(), threshold("rate<0.1")),
            ("response_time".to_string(), threshold("p(90)<3000")),
        ]),
        report: ReportYaml {
            title: Some("TICKETERO STRESS TEST RESULTS".to_string()),
            successes: Some(crate::scenario::TICKETS_CREATED.to_string()),
            error_rate: Some(crate::scenario::TICKET_ERRORS.to_string()),
            ..ReportYaml::default()
        },
        ..ConfigYaml::default()
    }
}

/// Everything a run needs after merging the config file with CLI and env overrides.
#[derive(Debug)]
pub(crate) struct ResolvedConfig {
    pub base_url: String,
    pub options: RunOptions,
    pub summary_export: String,
    pub report: ReportMetrics,
}

pub(crate) fn resolve(args: &RunArgs, file: ConfigYaml) -> anyhow::Result<ResolvedConfig> {
    let ConfigYaml {
        base_url,
        start_vus,
        stages,
        thresholds,
        iteration_timeout,
        request_timeout,
        control_interval,
        summary_export,
        report,
    } = file;

    let base_url = args
        .base_url
        .clone()
        .or(base_url)
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
        .trim_end_matches('/')
        .to_string();

    let stages = if args.stages.is_empty() {
        stages
            .into_iter()
            .enumerate()
            .map(|(idx, s)| Stage::checked(idx, s.duration.0, s.target))
            .collect::<stampede_core::Result<Vec<_>>>()
            .context("invalid stages")?
    } else {
        args.stages
            .iter()
            .map(|s| Stage::new(s.duration, s.target))
            .collect()
    };

    let thresholds = thresholds
        .into_iter()
        .map(|(metric, expr)| ThresholdSet {
            metric,
            expressions: match expr {
                ThresholdExprYaml::One(s) => vec![s],
                ThresholdExprYaml::Many(v) => v,
            },
        })
        .collect();

    let control_interval = match (args.control_interval, control_interval) {
        (Some(d), _) => d,
        (None, Some(s)) => s.positive("controlInterval")?,
        (None, None) => stampede_core::DEFAULT_CONTROL_INTERVAL,
    };

    let options = RunOptions {
        start_vus: start_vus.unwrap_or(0),
        stages,
        thresholds,
        control_interval,
        iteration_timeout: iteration_timeout
            .map(|s| s.positive("iterationTimeout"))
            .transpose()?,
        request_timeout: request_timeout
            .map(|s| s.positive("requestTimeout"))
            .transpose()?,
        think_time: crate::scenario::ticket_think_time(),
    };

    let summary_export = args
        .summary_export
        .clone()
        .or(summary_export)
        .unwrap_or_else(|| DEFAULT_SUMMARY_EXPORT.to_string());
    stampede_core::validate_output_path(&summary_export).context("invalid summary export path")?;

    let defaults = ReportMetrics::default();
    let report = ReportMetrics {
        title: report.title.unwrap_or(defaults.title),
        requests: report.requests.unwrap_or(defaults.requests),
        successes: report.successes.or(defaults.successes),
        error_rate: report.error_rate.unwrap_or(defaults.error_rate),
        latency: report.latency.unwrap_or(defaults.latency),
    };

    Ok(ResolvedConfig {
        base_url,
        options,
        summary_export,
        report,
    })
}
