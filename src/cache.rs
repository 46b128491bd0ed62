use std::{fmt, str::FromStr};

use crate::{error::ConfigError, trace::TraceAccess};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Associativity {
    Direct,
    Ways(usize),
    Fully,
}

impl fmt::Display for Associativity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Associativity::Direct => write!(f, "direct"),
            Associativity::Ways(n) => write!(f, "{n}way"),
            Associativity::Fully => write!(f, "fully"),
        }
    }
}

impl FromStr for Associativity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "direct" | "1way" => Ok(Associativity::Direct),
            "fully" => Ok(Associativity::Fully),
            other => other
                .strip_suffix("way")
                .and_then(|n| n.parse::<usize>().ok())
                .filter(|n| *n >= 2 && n.is_power_of_two())
                .map(Associativity::Ways)
                .ok_or_else(|| ConfigError::UnknownAssociativity(s.trim().to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplacementPolicy {
    Lru,
    Fifo,
}

impl fmt::Display for ReplacementPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplacementPolicy::Lru => write!(f, "LRU"),
            ReplacementPolicy::Fifo => write!(f, "FIFO"),
        }
    }
}

impl FromStr for ReplacementPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lru" => Ok(ReplacementPolicy::Lru),
            "fifo" => Ok(ReplacementPolicy::Fifo),
            _ => Err(ConfigError::UnknownPolicy(s.trim().to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub cache_size: usize, // in Bytes
    pub line_size: usize,  // in Bytes
    pub associativity: Associativity,
    pub policy: ReplacementPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_size: 1024,
            line_size: 32,
            associativity: Associativity::Fully,
            policy: ReplacementPolicy::Lru,
        }
    }
}

impl CacheConfig {
    pub fn num_lines(&self) -> usize {
        self.cache_size / self.line_size.max(1)
    }

    pub fn ways(&self) -> usize {
        match self.associativity {
            Associativity::Direct => 1,
            Associativity::Ways(n) => n,
            Associativity::Fully => self.num_lines(),
        }
    }

    pub fn num_sets(&self) -> usize {
        (self.num_lines() / self.ways().max(1)).max(1)
    }

    /// Name written to the result table. A set size equal to the whole cache
    /// is reported as `fully` whatever way count was requested.
    pub fn associativity_label(&self) -> String {
        let ways = self.ways();
        if ways == 1 {
            "direct".to_string()
        } else if ways == self.num_lines() {
            "fully".to_string()
        } else {
            format!("{ways}way")
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.cache_size.is_power_of_two() || !self.line_size.is_power_of_two() {
            return Err(ConfigError::InvalidGeometry(format!(
                "cache size {} and line size {} must be powers of two",
                self.cache_size, self.line_size
            )));
        }
        if self.line_size >= self.cache_size {
            return Err(ConfigError::InvalidGeometry(format!(
                "line size {} must be smaller than cache size {}",
                self.line_size, self.cache_size
            )));
        }
        if self.ways() > self.num_lines() {
            return Err(ConfigError::InvalidGeometry(format!(
                "{} needs {} lines per set but the cache only has {}",
                self.associativity,
                self.ways(),
                self.num_lines()
            )));
        }
        Ok(())
    }
}

impl fmt::Display for CacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cache={}B, Line={}B, Assoc={}, Policy={}",
            self.cache_size, self.line_size, self.associativity, self.policy
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub accesses: u64,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        if self.accesses == 0 {
            0.0
        } else {
            self.hits as f64 / self.accesses as f64
        }
    }
}

pub struct Cache {
    config: CacheConfig,
    sets: Vec<CacheSet>,
    global_tick: u64,
    num_sets: usize,
}

impl Cache {
    pub fn new(config: CacheConfig) -> Self {
        let num_sets = config.num_sets();
        let ways = config.ways().max(1);
        let sets = (0..num_sets).map(|_| CacheSet::new(ways)).collect();
        Self {
            config,
            sets,
            global_tick: 1,
            num_sets,
        }
    }

    pub fn run_trace(&mut self, trace: &[TraceAccess]) -> CacheStats {
        let mut stats = CacheStats::default();
        for access in trace {
            self.process_access(access, &mut stats);
        }
        stats
    }

    fn process_access(&mut self, access: &TraceAccess, stats: &mut CacheStats) {
        stats.accesses += 1;
        let block_address = access.address / self.config.line_size as u64;
        let set_index = (block_address % self.num_sets as u64) as usize;
        let tag = block_address / self.num_sets as u64;

        let set = &mut self.sets[set_index];
        if let Some(line_idx) = set.find_line(tag) {
            // FIFO keeps the fill time, LRU moves to the latest use
            let refresh = self.config.policy == ReplacementPolicy::Lru;
            if refresh {
                set.touch(line_idx, self.global_tick);
            }
            stats.hits += 1;
        } else {
            if set.insert_new(tag, self.global_tick).is_some() {
                stats.evictions += 1;
            }
            stats.misses += 1;
        }
        self.global_tick += 1;
    }
}

#[derive(Clone)]
struct CacheLine {
    tag: u64,
    stamp: u64, // last use under LRU, fill time under FIFO
    valid: bool,
}

impl CacheLine {
    fn invalid() -> Self {
        Self {
            tag: 0,
            stamp: 0,
            valid: false,
        }
    }
}

struct CacheSet {
    lines: Vec<CacheLine>,
}

impl CacheSet {
    fn new(ways: usize) -> Self {
        Self {
            lines: vec![CacheLine::invalid(); ways],
        }
    }

    fn find_line(&self, tag: u64) -> Option<usize> {
        self.lines
            .iter()
            .position(|line| line.valid && line.tag == tag)
    }

    fn touch(&mut self, idx: usize, tick: u64) {
        if let Some(line) = self.lines.get_mut(idx) {
            line.stamp = tick;
        }
    }

    /// Fill an empty way if there is one, otherwise replace the line with the
    /// oldest stamp. Returns the evicted line.
    fn insert_new(&mut self, tag: u64, tick: u64) -> Option<CacheLine> {
        let new_line = CacheLine {
            tag,
            stamp: tick,
            valid: true,
        };
        if let Some(idx) = self.lines.iter().position(|line| !line.valid) {
            self.lines[idx] = new_line;
            return None;
        }
        let idx = self
            .lines
            .iter()
            .enumerate()
            .min_by_key(|(_, line)| line.stamp)
            .map(|(idx, _)| idx)
            .unwrap_or(0);
        Some(std::mem::replace(&mut self.lines[idx], new_line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::AccessKind;

    fn loads(addresses: &[u64]) -> Vec<TraceAccess> {
        addresses
            .iter()
            .map(|&address| TraceAccess {
                kind: AccessKind::Load,
                address,
                size: 4,
            })
            .collect()
    }

    fn config(
        cache: usize,
        line: usize,
        assoc: Associativity,
        policy: ReplacementPolicy,
    ) -> CacheConfig {
        CacheConfig {
            cache_size: cache,
            line_size: line,
            associativity: assoc,
            policy,
        }
    }

    #[test]
    fn geometry_follows_associativity() {
        let direct = config(1024, 32, Associativity::Direct, ReplacementPolicy::Lru);
        assert_eq!(direct.num_lines(), 32);
        assert_eq!(direct.num_sets(), 32);
        let four = config(1024, 32, Associativity::Ways(4), ReplacementPolicy::Lru);
        assert_eq!(four.num_sets(), 8);
        let fully = config(1024, 32, Associativity::Fully, ReplacementPolicy::Lru);
        assert_eq!(fully.num_sets(), 1);
        assert_eq!(fully.ways(), 32);
    }

    #[test]
    fn labels_match_result_table_names() {
        assert_eq!(
            config(1024, 32, Associativity::Direct, ReplacementPolicy::Lru).associativity_label(),
            "direct"
        );
        assert_eq!(
            config(1024, 32, Associativity::Ways(2), ReplacementPolicy::Lru).associativity_label(),
            "2way"
        );
        // 4 lines total, so 4-way is the whole cache
        assert_eq!(
            config(256, 64, Associativity::Ways(4), ReplacementPolicy::Lru).associativity_label(),
            "fully"
        );
    }

    #[test]
    fn rejects_impossible_geometry() {
        let lru = ReplacementPolicy::Lru;
        assert!(config(256, 256, Associativity::Direct, lru).validate().is_err());
        assert!(config(256, 64, Associativity::Ways(8), lru).validate().is_err());
        assert!(config(1000, 10, Associativity::Direct, lru).validate().is_err());
        assert!(CacheConfig::default().validate().is_ok());
    }

    #[test]
    fn parses_names() {
        assert_eq!("direct".parse::<Associativity>().unwrap(), Associativity::Direct);
        assert_eq!("4way".parse::<Associativity>().unwrap(), Associativity::Ways(4));
        assert_eq!("FULLY".parse::<Associativity>().unwrap(), Associativity::Fully);
        assert!("3way".parse::<Associativity>().is_err());
        assert_eq!("lru".parse::<ReplacementPolicy>().unwrap(), ReplacementPolicy::Lru);
        assert_eq!("FIFO".parse::<ReplacementPolicy>().unwrap(), ReplacementPolicy::Fifo);
        assert!("random".parse::<ReplacementPolicy>().is_err());
        assert_eq!(Associativity::Ways(2).to_string(), "2way");
        assert_eq!(ReplacementPolicy::Fifo.to_string(), "FIFO");
    }

    #[test]
    fn spatial_locality_hits_within_a_line() {
        let mut cache = Cache::new(config(256, 16, Associativity::Direct, ReplacementPolicy::Lru));
        let stats = cache.run_trace(&loads(&[0x0, 0x4, 0x8, 0xC, 0x10]));
        assert_eq!(stats.accesses, 5);
        assert_eq!(stats.hits, 3);
        assert_eq!(stats.misses, 2);
        assert!((stats.hit_rate() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn direct_mapped_conflicts_thrash() {
        // 0x000 and 0x100 map to the same set of a 256B direct-mapped cache
        let trace = loads(&[0x000, 0x100, 0x000, 0x100]);
        let mut direct = Cache::new(config(256, 16, Associativity::Direct, ReplacementPolicy::Lru));
        let stats = direct.run_trace(&trace);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.evictions, 3);

        let two_way = config(256, 16, Associativity::Ways(2), ReplacementPolicy::Lru);
        assert_eq!(Cache::new(two_way).run_trace(&trace).hits, 2);
    }

    #[test]
    fn lru_and_fifo_diverge_on_reuse() {
        // two-line fully associative cache; A is reused before C arrives
        let (a, b, c) = (0x00, 0x10, 0x20);
        let trace = loads(&[a, b, a, c, a]);

        let mut lru = Cache::new(config(32, 16, Associativity::Fully, ReplacementPolicy::Lru));
        // C evicts B, A stays
        assert_eq!(lru.run_trace(&trace).hits, 2);

        let mut fifo = Cache::new(config(32, 16, Associativity::Fully, ReplacementPolicy::Fifo));
        // C evicts A (oldest fill), last A misses
        assert_eq!(fifo.run_trace(&trace).hits, 1);
    }

    #[test]
    fn stores_are_counted_like_loads() {
        let trace = vec![
            TraceAccess {
                kind: AccessKind::Store,
                address: 0x00,
                size: 4,
            },
            TraceAccess {
                kind: AccessKind::Load,
                address: 0x100,
                size: 4,
            },
            TraceAccess {
                kind: AccessKind::Load,
                address: 0x04,
                size: 4,
            },
        ];
        let mut cache = Cache::new(config(256, 16, Associativity::Direct, ReplacementPolicy::Lru));
        let stats = cache.run_trace(&trace);
        assert_eq!(stats.accesses, 3);
        assert_eq!(stats.misses, 3);
        assert_eq!(stats.evictions, 2);
        assert_eq!(stats.hit_rate(), 0.0);
    }
}
