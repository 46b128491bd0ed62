//! Selection, deduplication and ordering of result records into chart series.
//!
//! Every function here is a pure view over a borrowed [`ResultTable`]: calling
//! one twice with the same arguments yields the same output.

use std::{collections::HashSet, fmt};

use log::debug;

use crate::{
    error::AnalysisError,
    results::{Field, FieldValue, ResultRecord, ResultTable},
};

/// Curated display order for associativity.
pub const ASSOCIATIVITY_ORDER: [&str; 4] = ["direct", "2way", "4way", "fully"];

/// Conjunction of exact `field == value` terms. Setting a field twice keeps the
/// last value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    terms: Vec<(Field, FieldValue)>,
}

impl Constraints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: Field, value: impl Into<FieldValue>) -> Self {
        self.set(field, value.into());
        self
    }

    pub fn set(&mut self, field: Field, value: FieldValue) {
        match self.terms.iter_mut().find(|(f, _)| *f == field) {
            Some(term) => term.1 = value,
            None => self.terms.push((field, value)),
        }
    }

    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        self.terms
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Field, FieldValue)> {
        self.terms.iter()
    }

    pub fn matches(&self, record: &ResultRecord) -> bool {
        self.terms
            .iter()
            .all(|(field, value)| record.matches(*field, value))
    }
}

impl FromIterator<(Field, FieldValue)> for Constraints {
    fn from_iter<I: IntoIterator<Item = (Field, FieldValue)>>(iter: I) -> Self {
        let mut constraints = Constraints::new();
        for (field, value) in iter {
            constraints.set(field, value);
        }
        constraints
    }
}

impl fmt::Display for Constraints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            return f.write_str("(none)");
        }
        for (idx, (field, value)) in self.terms.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{field}={value}")?;
        }
        Ok(())
    }
}

/// Parse one `Field=value` term, e.g. `LineSize=32` or `policy=LRU`.
pub fn parse_constraint(term: &str) -> Result<(Field, FieldValue), AnalysisError> {
    let (name, raw) = term
        .split_once('=')
        .ok_or_else(|| AnalysisError::InvalidConstraint(term.to_string()))?;
    if raw.trim().is_empty() {
        return Err(AnalysisError::InvalidConstraint(term.to_string()));
    }
    let field: Field = name.parse()?;
    let value = FieldValue::parse_for(field, raw)?;
    Ok((field, value))
}

/// Every record matching all `constraints`, in table order.
pub fn select<'a>(table: &'a ResultTable, constraints: &Constraints) -> Vec<&'a ResultRecord> {
    table
        .iter()
        .filter(|record| constraints.matches(record))
        .collect()
}

/// Keep the first record seen for each distinct value of `varying`.
/// Output follows first-occurrence order.
pub fn dedupe<'a, I>(records: I, varying: Field) -> Vec<&'a ResultRecord>
where
    I: IntoIterator<Item = &'a ResultRecord>,
{
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| seen.insert(record.value(varying)))
        .collect()
}

/// How the points of a series are laid out along the x axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeriesOrder {
    /// Ascending by value.
    Numeric,
    /// Ascending by the value's text form.
    Lexical,
    /// Exactly these slots, in this order. Slots without data are filled with
    /// a zero hit rate and flagged; values outside the list are dropped.
    Curated(Vec<FieldValue>),
}

impl SeriesOrder {
    pub fn associativity() -> Self {
        SeriesOrder::Curated(
            ASSOCIATIVITY_ORDER
                .iter()
                .map(|name| FieldValue::from(*name))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint {
    pub value: FieldValue,
    pub hit_rate: f64,
    /// Set when the slot had no matching record and `hit_rate` is a stand-in.
    pub filled: bool,
}

impl SeriesPoint {
    fn measured(record: &ResultRecord, varying: Field) -> Self {
        Self {
            value: record.value(varying),
            hit_rate: record.hit_rate,
            filled: false,
        }
    }

    fn gap(value: FieldValue) -> Self {
        Self {
            value,
            hit_rate: 0.0,
            filled: true,
        }
    }
}

/// One report line: the slot value, then its hit rate or `no data`.
impl fmt::Display for SeriesPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.value.to_string();
        if self.filled {
            write!(f, "{value:<10} no data")
        } else {
            write!(f, "{value:<10} hit {:>6.2}%", self.hit_rate * 100.0)
        }
    }
}

/// Select with `fixed`, dedupe on `varying`, then order the points.
pub fn build_series(
    table: &ResultTable,
    fixed: &Constraints,
    varying: Field,
    order: &SeriesOrder,
) -> Vec<SeriesPoint> {
    let selected = select(table, fixed);
    let unique = dedupe(selected.iter().copied(), varying);
    debug!(
        "{varying} series [{fixed}]: {} selected, {} after dedupe",
        selected.len(),
        unique.len()
    );
    let mut points: Vec<SeriesPoint> = unique
        .into_iter()
        .map(|record| SeriesPoint::measured(record, varying))
        .collect();

    match order {
        SeriesOrder::Numeric => {
            points.sort_by(|a, b| a.value.cmp(&b.value));
            points
        }
        SeriesOrder::Lexical => {
            points.sort_by_key(|p| p.value.to_string());
            points
        }
        SeriesOrder::Curated(slots) => {
            let dropped = points.iter().filter(|p| !slots.contains(&p.value)).count();
            if dropped > 0 {
                debug!("{varying} series [{fixed}]: {dropped} value(s) outside the display order");
            }
            slots
                .iter()
                .map(|slot| {
                    points
                        .iter()
                        .find(|p| &p.value == slot)
                        .cloned()
                        .unwrap_or_else(|| SeriesPoint::gap(slot.clone()))
                })
                .collect()
        }
    }
}
