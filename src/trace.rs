use std::{
    fmt,
    fs::File,
    io::{self, BufRead, BufReader, Write},
    path::Path,
};

use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    Load,
    Store,
}

impl fmt::Display for AccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessKind::Load => write!(f, "l"),
            AccessKind::Store => write!(f, "s"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceAccess {
    pub kind: AccessKind,
    pub address: u64,
    pub size: u32, // in Bytes
}

impl fmt::Display for TraceAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} 0x{:08X} {}", self.kind, self.address, self.size)
    }
}

#[derive(Debug, Clone)]
pub struct TraceFile {
    pub name: String,
    pub entries: Vec<TraceAccess>,
}

impl TraceFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Unable to open trace file {}", path.display()))?;
        let name = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::parse(name, BufReader::new(file))
    }

    /// Parse `<op> <address> [size]` lines. Ops: `l`/`r` load, `s`/`w` store.
    pub fn parse(name: impl Into<String>, reader: impl BufRead) -> Result<Self> {
        let mut entries = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line.context("Failed to read line from trace")?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let mut parts = trimmed.split_whitespace();
            let op = parts
                .next()
                .with_context(|| format!("Trace line {} missing op", idx + 1))?;
            let addr = parts
                .next()
                .with_context(|| format!("Trace line {} missing address", idx + 1))?;
            let size = match parts.next() {
                Some(token) => token.parse::<u32>().with_context(|| {
                    format!("Trace line {}: invalid access size '{}'", idx + 1, token)
                })?,
                None => 4,
            };
            if parts.next().is_some() {
                bail!("Trace line {} has extra tokens", idx + 1);
            }
            let kind = match op.to_ascii_lowercase().chars().next() {
                Some('l') | Some('r') => AccessKind::Load,
                Some('s') | Some('w') => AccessKind::Store,
                _ => bail!("Trace line {} has invalid op '{}'", idx + 1, op),
            };
            let address = parse_address(addr).with_context(|| {
                format!("Trace line {}: invalid address literal '{}'", idx + 1, addr)
            })?;
            entries.push(TraceAccess {
                kind,
                address,
                size,
            });
        }
        Ok(Self {
            name: name.into(),
            entries,
        })
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        for access in &self.entries {
            writeln!(writer, "{access}")?;
        }
        writer.flush()
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("Unable to create trace file {}", path.display()))?;
        self.write_to(io::BufWriter::new(file))
            .with_context(|| format!("Failed to write trace file {}", path.display()))
    }
}

/// Hex address with or without a `0x` prefix. Addresses are 32 bits wide.
fn parse_address(token: &str) -> io::Result<u64> {
    let token = token.trim();
    let hex = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);
    u32::from_str_radix(hex, 16)
        .map(u64::from)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Synthetic access patterns for exercising the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TracePattern {
    /// Word-by-word walk through memory (spatial locality)
    Sequential,
    /// Cycle over 16 words (temporal locality)
    Repeated,
    /// Uniform over the first 4KB
    Random,
    /// Sequential walk with every fourth access a store
    Mixed,
}

const WORD: u64 = 4;
const REPEATED_WORDS: u64 = 16;
const RANDOM_WORDS: u64 = 1024;

pub fn generate(pattern: TracePattern, count: usize, rng: &mut impl Rng) -> TraceFile {
    let entries = (0..count as u64)
        .map(|i| {
            let (kind, address) = match pattern {
                TracePattern::Sequential => (AccessKind::Load, i * WORD),
                TracePattern::Repeated => (AccessKind::Load, (i % REPEATED_WORDS) * WORD),
                TracePattern::Random => {
                    (AccessKind::Load, rng.random_range(0..RANDOM_WORDS) * WORD)
                }
                TracePattern::Mixed => {
                    let kind = if i % 4 == 0 {
                        AccessKind::Store
                    } else {
                        AccessKind::Load
                    };
                    (kind, i * WORD)
                }
            };
            TraceAccess {
                kind,
                address,
                size: WORD as u32,
            }
        })
        .collect();
    let name = pattern
        .to_possible_value()
        .map(|v| v.get_name().to_string())
        .unwrap_or_else(|| format!("{pattern:?}"));
    TraceFile { name, entries }
}
