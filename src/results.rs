use std::{
    fmt,
    io::{Read, Write},
    path::Path,
    str::FromStr,
};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::{error::AnalysisError, pipeline::SeriesOrder};

/// Columns that every result table must carry.
pub const REQUIRED_COLUMNS: [&str; 5] =
    ["CacheSize", "LineSize", "Associativity", "Policy", "HitRate"];

/// The configuration fields a record can be selected or grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    CacheSize,
    LineSize,
    Associativity,
    Policy,
}

impl Field {
    pub const ALL: [Field; 4] = [
        Field::CacheSize,
        Field::LineSize,
        Field::Associativity,
        Field::Policy,
    ];

    /// Column name used in the CSV header.
    pub fn column(self) -> &'static str {
        match self {
            Field::CacheSize => "CacheSize",
            Field::LineSize => "LineSize",
            Field::Associativity => "Associativity",
            Field::Policy => "Policy",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Field::CacheSize | Field::LineSize)
    }

    pub fn axis_label(self) -> &'static str {
        match self {
            Field::CacheSize => "Cache Size (bytes)",
            Field::LineSize => "Line Size (bytes)",
            Field::Associativity => "Associativity",
            Field::Policy => "Replacement Policy",
        }
    }

    /// Display order used when this field is the varying dimension of a chart.
    ///
    /// Sizes sort numerically, associativity follows the curated
    /// `direct, 2way, 4way, fully` sequence, and policy names sort lexically.
    pub fn default_order(self) -> SeriesOrder {
        match self {
            Field::CacheSize | Field::LineSize => SeriesOrder::Numeric,
            Field::Associativity => SeriesOrder::associativity(),
            Field::Policy => SeriesOrder::Lexical,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for Field {
    type Err = AnalysisError;

    // Accepts `CacheSize`, `cache_size`, `cache-size`, ...
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "cachesize" => Ok(Field::CacheSize),
            "linesize" => Ok(Field::LineSize),
            "associativity" | "assoc" => Ok(Field::Associativity),
            "policy" => Ok(Field::Policy),
            _ => Err(AnalysisError::UnknownField(s.trim().to_string())),
        }
    }
}

/// A single field value. Sizes are integers, categorical fields are text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldValue {
    Int(u64),
    Text(String),
}

impl FieldValue {
    /// Parse `raw` as a value of `field`. Text is kept verbatim (exact match).
    pub fn parse_for(field: Field, raw: &str) -> Result<Self, AnalysisError> {
        let raw = raw.trim();
        if field.is_numeric() {
            raw.parse::<u64>()
                .map(FieldValue::Int)
                .map_err(|_| AnalysisError::InvalidValue {
                    field,
                    value: raw.to_string(),
                })
        } else {
            Ok(FieldValue::Text(raw.to_string()))
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(v) => write!(f, "{v}"),
            FieldValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

/// One experiment observation, i.e. one row of the result CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    #[serde(rename = "CacheSize")]
    pub cache_size: u64, // in Bytes
    #[serde(rename = "LineSize")]
    pub line_size: u64, // in Bytes
    #[serde(rename = "Associativity")]
    pub associativity: String,
    #[serde(rename = "Policy")]
    pub policy: String,
    #[serde(rename = "Hits", default)]
    pub hits: Option<u64>,
    #[serde(rename = "Accesses", default)]
    pub accesses: Option<u64>,
    #[serde(rename = "HitRate")]
    pub hit_rate: f64,
}

impl ResultRecord {
    pub fn new(
        cache_size: u64,
        line_size: u64,
        associativity: &str,
        policy: &str,
        hit_rate: f64,
    ) -> Self {
        Self {
            cache_size,
            line_size,
            associativity: associativity.to_string(),
            policy: policy.to_string(),
            hits: None,
            accesses: None,
            hit_rate,
        }
    }

    pub fn value(&self, field: Field) -> FieldValue {
        match field {
            Field::CacheSize => FieldValue::Int(self.cache_size),
            Field::LineSize => FieldValue::Int(self.line_size),
            Field::Associativity => FieldValue::Text(self.associativity.clone()),
            Field::Policy => FieldValue::Text(self.policy.clone()),
        }
    }

    /// Exact comparison of one field against `value`, without allocating.
    pub fn matches(&self, field: Field, value: &FieldValue) -> bool {
        match (field, value) {
            (Field::CacheSize, FieldValue::Int(v)) => self.cache_size == *v,
            (Field::LineSize, FieldValue::Int(v)) => self.line_size == *v,
            (Field::Associativity, FieldValue::Text(v)) => self.associativity == *v,
            (Field::Policy, FieldValue::Text(v)) => self.policy == *v,
            _ => false,
        }
    }
}

/// The loaded result CSV. Row order is file order and is never changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    records: Vec<ResultRecord>,
}

impl ResultTable {
    pub fn new(records: Vec<ResultRecord>) -> Self {
        Self { records }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("Unable to open result table {}", path.display()))?;
        Self::from_reader(file).with_context(|| format!("Invalid result table {}", path.display()))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = reader
            .headers()
            .context("Failed to read CSV header")?
            .clone();
        for column in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h == column) {
                bail!("missing required column `{column}`");
            }
        }
        let mut records = Vec::new();
        for (idx, row) in reader.deserialize::<ResultRecord>().enumerate() {
            // +2: one for the header, one for 1-based line numbers
            let record = row.with_context(|| format!("Malformed row on line {}", idx + 2))?;
            records.push(record);
        }
        Ok(Self { records })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = std::fs::File::create(path)
            .with_context(|| format!("Unable to create {}", path.display()))?;
        self.to_writer(file)
            .with_context(|| format!("Failed to write result table {}", path.display()))
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(writer);
        for record in &self.records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn records(&self) -> &[ResultRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResultRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<ResultRecord> for ResultTable {
    fn from_iter<I: IntoIterator<Item = ResultRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ResultTable {
    type Item = &'a ResultRecord;
    type IntoIter = std::slice::Iter<'a, ResultRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
CacheSize,LineSize,Associativity,Policy,Hits,Accesses,HitRate
256,16,direct,LRU,812,1000,0.8120
256,16,direct,FIFO,,,0.8100
";

    #[test]
    fn loads_rows_in_file_order() {
        let table = ResultTable::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        let first = &table.records()[0];
        assert_eq!(first.cache_size, 256);
        assert_eq!(first.line_size, 16);
        assert_eq!(first.associativity, "direct");
        assert_eq!(first.policy, "LRU");
        assert_eq!(first.hits, Some(812));
        assert_eq!(first.accesses, Some(1000));
        assert!((first.hit_rate - 0.812).abs() < 1e-12);
        assert_eq!(table.records()[1].policy, "FIFO");
        assert_eq!(table.records()[1].hits, None);
    }

    #[test]
    fn counter_columns_are_optional() {
        let csv = "CacheSize,LineSize,Associativity,Policy,HitRate\n1024, 32, fully, LRU, 0.88\n";
        let table = ResultTable::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.records()[0].accesses, None);
        assert_eq!(table.records()[0].associativity, "fully");
    }

    #[test]
    fn missing_required_column_fails() {
        let csv = "CacheSize,LineSize,Associativity,HitRate\n1024,32,fully,0.88\n";
        let err = ResultTable::from_reader(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("Policy"), "{err}");
    }

    #[test]
    fn malformed_row_reports_line() {
        let csv = "CacheSize,LineSize,Associativity,Policy,HitRate\n\
                   1024,32,fully,LRU,0.88\n\
                   big,32,fully,LRU,0.5\n";
        let err = ResultTable::from_reader(csv.as_bytes()).unwrap_err();
        assert!(format!("{err:#}").contains("line 3"), "{err:#}");
    }

    #[test]
    fn written_table_loads_back() {
        let table: ResultTable = [
            ResultRecord::new(512, 32, "fully", "LRU", 0.86),
            ResultRecord::new(1024, 64, "2way", "FIFO", 0.9),
        ]
        .into_iter()
        .collect();
        let mut buf = Vec::new();
        table.to_writer(&mut buf).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.starts_with("CacheSize,LineSize,Associativity,Policy,Hits,Accesses,HitRate"));
        assert_eq!(ResultTable::from_reader(buf.as_slice()).unwrap(), table);
    }

    #[test]
    fn field_names_parse_loosely() {
        assert_eq!("CacheSize".parse::<Field>().unwrap(), Field::CacheSize);
        assert_eq!("line_size".parse::<Field>().unwrap(), Field::LineSize);
        assert_eq!("ASSOCIATIVITY".parse::<Field>().unwrap(), Field::Associativity);
        assert_eq!("policy".parse::<Field>().unwrap(), Field::Policy);
        assert_eq!(
            "ways".parse::<Field>().unwrap_err(),
            AnalysisError::UnknownField("ways".into())
        );
    }

    #[test]
    fn numeric_fields_reject_text_values() {
        assert_eq!(
            FieldValue::parse_for(Field::CacheSize, " 2048 ").unwrap(),
            FieldValue::Int(2048)
        );
        assert!(FieldValue::parse_for(Field::LineSize, "32B").is_err());
        assert_eq!(
            FieldValue::parse_for(Field::Policy, "LRU").unwrap(),
            FieldValue::from("LRU")
        );
    }

    #[test]
    fn matches_is_exact_and_type_strict() {
        let record = ResultRecord::new(1024, 32, "fully", "LRU", 0.5);
        assert!(record.matches(Field::CacheSize, &FieldValue::Int(1024)));
        assert!(!record.matches(Field::Policy, &FieldValue::from("lru")));
        assert!(!record.matches(Field::CacheSize, &FieldValue::from("1024")));
    }
}
