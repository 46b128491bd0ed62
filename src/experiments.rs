use log::{info, warn};

use crate::{
    cache::{Associativity, Cache, CacheConfig, CacheStats, ReplacementPolicy},
    results::{ResultRecord, ResultTable},
    trace::TraceFile,
};

/// Largest size exponent a sweep accepts. Traces carry 32-bit addresses, so
/// nothing bigger than the address space is simulated.
pub const MAX_SIZE_EXP: u32 = 31;

/// Parameter grid for one sweep. Sizes are given as powers of two.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub cache_size_exps: Vec<u32>,
    pub line_size_exps: Vec<u32>,
    pub associativities: Vec<Associativity>,
    pub policies: Vec<ReplacementPolicy>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            cache_size_exps: vec![8, 9, 10, 11],
            line_size_exps: vec![4, 5, 6],
            associativities: vec![
                Associativity::Direct,
                Associativity::Ways(2),
                Associativity::Ways(4),
                Associativity::Fully,
            ],
            policies: vec![ReplacementPolicy::Lru, ReplacementPolicy::Fifo],
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    pub label: String, // Label to be printed for the Result
    pub config: CacheConfig,
}

fn size_from_exp(exp: u32) -> Option<usize> {
    if exp > MAX_SIZE_EXP {
        warn!("Skipping size exponent {exp}: above the limit of {MAX_SIZE_EXP}");
        return None;
    }
    1usize.checked_shl(exp)
}

/// Expand the grid in cache size, line size, associativity, policy order.
/// Lines that do not fit in the cache are skipped silently; exponents above
/// [`MAX_SIZE_EXP`] and other invalid geometries are skipped with a warning.
pub fn scenarios(sweep: &SweepConfig) -> Vec<ScenarioConfig> {
    let cache_sizes: Vec<(u32, usize)> = sweep
        .cache_size_exps
        .iter()
        .filter_map(|&exp| size_from_exp(exp).map(|size| (exp, size)))
        .collect();
    let line_sizes: Vec<(u32, usize)> = sweep
        .line_size_exps
        .iter()
        .filter_map(|&exp| size_from_exp(exp).map(|size| (exp, size)))
        .collect();

    let mut scenarios = Vec::new();
    for &(cache_exp, cache_size) in &cache_sizes {
        for &(line_exp, line_size) in &line_sizes {
            if line_exp >= cache_exp {
                continue;
            }
            for &associativity in &sweep.associativities {
                for &policy in &sweep.policies {
                    let config = CacheConfig {
                        cache_size,
                        line_size,
                        associativity,
                        policy,
                    };
                    if let Err(err) = config.validate() {
                        warn!("Skipping {config}: {err}");
                        continue;
                    }
                    scenarios.push(ScenarioConfig {
                        label: config.to_string(),
                        config,
                    });
                }
            }
        }
    }
    scenarios
}

pub fn to_record(config: &CacheConfig, stats: &CacheStats) -> ResultRecord {
    ResultRecord {
        cache_size: config.cache_size as u64,
        line_size: config.line_size as u64,
        associativity: config.associativity_label(),
        policy: config.policy.to_string(),
        hits: Some(stats.hits),
        accesses: Some(stats.accesses),
        // four decimals, as the result table has always been written
        hit_rate: (stats.hit_rate() * 10_000.0).round() / 10_000.0,
    }
}

pub fn run_scenarios(trace: &TraceFile, scenarios: &[ScenarioConfig]) -> ResultTable {
    let total = scenarios.len();
    scenarios
        .iter()
        .enumerate()
        .map(|(idx, scenario)| {
            let mut cache = Cache::new(scenario.config.clone());
            let stats = cache.run_trace(&trace.entries);
            info!(
                "Experiment {}/{}: {} on {}: hit {:.2}% ({} misses, {} evictions)",
                idx + 1,
                total,
                scenario.label,
                trace.name,
                stats.hit_rate() * 100.0,
                stats.misses,
                stats.evictions
            );
            to_record(&scenario.config, &stats)
        })
        .collect()
}
