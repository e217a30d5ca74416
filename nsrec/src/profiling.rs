//! Per-stage timing of preprocessing workers.
//!
//! Timings compile to no-ops unless the `profiling` feature is enabled. With
//! the feature, each finished [Timing] adds its laps to process-wide
//! per-stage totals, which can be queried by [stage_summaries].

use crate::common::*;
use std::time::Duration;

#[cfg(feature = "profiling")]
mod registry {
    use super::*;
    use dashmap::DashMap;
    use once_cell::sync::Lazy;

    pub static PROFILING_CONFIG: Lazy<ProfilingConfig> =
        Lazy::new(|| match envy::prefixed(ENV_PREFIX).from_env::<ProfilingConfig>() {
            Ok(config) => config,
            Err(err) => {
                warn!(
                    "failed to load profiling environment variables, fallback to default values: {:?}",
                    err
                );
                Default::default()
            }
        });

    /// Accumulated laps keyed by timing name and stage name.
    pub static STAGES: Lazy<DashMap<(&'static str, &'static str), StageSummary>> =
        Lazy::new(DashMap::new);
}

/// The environment variable prefix of profiling options.
pub const ENV_PREFIX: &str = "NSREC_";

/// A summary is logged each time a timing finishes this many records.
#[cfg(feature = "profiling")]
const SUMMARY_INTERVAL: usize = 1000;

/// Profiling options read from `NSREC_`-prefixed environment variables.
///
/// `NSREC_PROFILING_WHITELIST=digit_worker,box_worker` limits profiling to
/// the listed timings. All timings are profiled if it is unset.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProfilingConfig {
    pub profiling_whitelist: Option<HashSet<String>>,
}

impl ProfilingConfig {
    pub fn is_enabled(&self, name: &str) -> bool {
        self.profiling_whitelist
            .as_ref()
            .map(|whitelist| whitelist.contains(name))
            .unwrap_or(true)
    }
}

/// The accumulated time spent in one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSummary {
    pub stage: &'static str,
    /// The position of the stage within a record.
    pub position: usize,
    pub count: usize,
    pub total: Duration,
}

impl StageSummary {
    pub fn mean(&self) -> Duration {
        match u32::try_from(self.count) {
            Ok(count) if count > 0 => self.total / count,
            _ => Duration::ZERO,
        }
    }
}

/// The stage timing of a single record.
#[derive(Debug)]
pub struct Timing {
    #[cfg(feature = "profiling")]
    name: &'static str,
    #[cfg(feature = "profiling")]
    instant: std::time::Instant,
    #[cfg(feature = "profiling")]
    laps: Vec<(&'static str, Duration)>,
}

impl Timing {
    pub fn new(name: &'static str) -> Self {
        #[cfg(feature = "profiling")]
        {
            Self {
                name,
                instant: std::time::Instant::now(),
                laps: vec![],
            }
        }

        #[cfg(not(feature = "profiling"))]
        {
            let _ = name;
            Self {}
        }
    }

    /// Close the current stage and start the next one.
    pub fn lap(&mut self, stage: &'static str) {
        #[cfg(feature = "profiling")]
        {
            let now = std::time::Instant::now();
            self.laps.push((stage, now - self.instant));
            self.instant = now;
        }

        #[cfg(not(feature = "profiling"))]
        let _ = stage;
    }

    /// Add the laps to the stage totals of this timing name.
    pub fn finish(self) {
        #[cfg(feature = "profiling")]
        {
            if !registry::PROFILING_CONFIG.is_enabled(self.name) {
                return;
            }

            let mut num_records = 0;
            for (position, (stage, elapsed)) in self.laps.into_iter().enumerate() {
                trace!("{}: {}\t{:?}", self.name, stage, elapsed);

                let mut entry = registry::STAGES
                    .entry((self.name, stage))
                    .or_insert_with(|| StageSummary {
                        stage,
                        position,
                        count: 0,
                        total: Duration::ZERO,
                    });
                entry.count += 1;
                entry.total += elapsed;
                if position == 0 {
                    num_records = entry.count;
                }
            }

            if num_records > 0 && num_records % SUMMARY_INTERVAL == 0 {
                report(self.name);
            }
        }
    }
}

/// The accumulated stages of a timing name in stage order.
///
/// It is always empty without the `profiling` feature.
pub fn stage_summaries(name: &str) -> Vec<StageSummary> {
    #[cfg(feature = "profiling")]
    {
        registry::STAGES
            .iter()
            .filter(|entry| entry.key().0 == name)
            .map(|entry| entry.value().clone())
            .sorted_by_key(|summary| summary.position)
            .collect()
    }

    #[cfg(not(feature = "profiling"))]
    {
        let _ = name;
        vec![]
    }
}

#[cfg(feature = "profiling")]
fn report(name: &str) {
    let summaries = stage_summaries(name);
    let records = summaries.first().map(|summary| summary.count).unwrap_or(0);
    info!("profiling '{}' over {} records", name, records);
    summaries.iter().for_each(|summary| {
        info!("- {}\tmean {:?}", summary.stage, summary.mean());
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finished_timings_accumulate_stages() {
        for _ in 0..3 {
            let mut timing = Timing::new("accumulate_test");
            timing.lap("decode");
            timing.lap("resize");
            timing.finish();
        }
        let summaries = stage_summaries("accumulate_test");

        #[cfg(feature = "profiling")]
        {
            let stages: Vec<_> = summaries.iter().map(|summary| summary.stage).collect();
            assert_eq!(stages, ["decode", "resize"]);
            assert!(summaries.iter().all(|summary| summary.count == 3));
            assert!(summaries[0].mean() <= summaries[0].total);
        }

        #[cfg(not(feature = "profiling"))]
        assert!(summaries.is_empty());
    }

    #[test]
    fn whitelist_selects_timings() {
        assert!(ProfilingConfig::default().is_enabled("digit_worker"));

        let config: ProfilingConfig =
            serde_json::from_str(r#"{ "profiling_whitelist": ["box_worker"] }"#).unwrap();
        assert!(config.is_enabled("box_worker"));
        assert!(!config.is_enabled("digit_worker"));
    }

    #[cfg(feature = "profiling")]
    #[test]
    fn whitelist_from_environment() {
        let vars = vec![(
            "NSREC_PROFILING_WHITELIST".to_string(),
            "digit_worker,box_worker".to_string(),
        )];
        let config: ProfilingConfig = envy::prefixed(ENV_PREFIX).from_iter(vars).unwrap();
        let whitelist = config.profiling_whitelist.unwrap();
        assert_eq!(whitelist.len(), 2);
        assert!(whitelist.contains("digit_worker"));
    }

    #[test]
    fn mean_of_empty_stage_is_zero() {
        let summary = StageSummary {
            stage: "decode",
            position: 0,
            count: 0,
            total: Duration::from_millis(5),
        };
        assert_eq!(summary.mean(), Duration::ZERO);
    }
}
