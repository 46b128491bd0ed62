use std::fmt;

use crate::{
    error::AnalysisError,
    results::{ResultRecord, ResultTable},
};

/// Aggregate statistics over every row of a result table, duplicates included.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub mean_hit_rate: f64,
    pub max_hit_rate: f64,
    pub min_hit_rate: f64,
    /// First record (in table order) reaching `max_hit_rate`.
    pub best: ResultRecord,
}

pub fn summarize(table: &ResultTable) -> Result<Summary, AnalysisError> {
    let mut rows = table.iter();
    let first = rows.next().ok_or(AnalysisError::EmptyInput)?;

    let mut best = first;
    let mut min_hit_rate = first.hit_rate;
    let mut total = first.hit_rate;
    for record in rows {
        total += record.hit_rate;
        // strict comparison keeps the earliest record on ties
        if record.hit_rate > best.hit_rate {
            best = record;
        }
        if record.hit_rate < min_hit_rate {
            min_hit_rate = record.hit_rate;
        }
    }

    let count = table.len();
    Ok(Summary {
        count,
        mean_hit_rate: total / count as f64,
        max_hit_rate: best.hit_rate,
        min_hit_rate,
        best: best.clone(),
    })
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total experiments: {}", self.count)?;
        writeln!(f, "Average hit rate: {:.2}%", self.mean_hit_rate * 100.0)?;
        writeln!(f, "Highest hit rate: {:.2}%", self.max_hit_rate * 100.0)?;
        writeln!(f, "Lowest hit rate: {:.2}%", self.min_hit_rate * 100.0)?;
        writeln!(f)?;
        writeln!(f, "Best configuration:")?;
        writeln!(f, "  Cache Size: {} bytes", self.best.cache_size)?;
        writeln!(f, "  Line Size: {} bytes", self.best.line_size)?;
        writeln!(f, "  Associativity: {}", self.best.associativity)?;
        writeln!(f, "  Policy: {}", self.best.policy)?;
        write!(f, "  Hit Rate: {:.2}%", self.best.hit_rate * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rates: &[f64]) -> ResultTable {
        rates
            .iter()
            .enumerate()
            .map(|(idx, &rate)| ResultRecord::new(256 << idx, 32, "fully", "LRU", rate))
            .collect()
    }

    #[test]
    fn summarizes_raw_rows() {
        let summary = summarize(&table(&[0.80, 0.95, 0.60])).unwrap();
        assert_eq!(summary.count, 3);
        assert_eq!(summary.max_hit_rate, 0.95);
        assert_eq!(summary.min_hit_rate, 0.60);
        assert!((summary.mean_hit_rate - 0.783_333).abs() < 1e-4);
        assert_eq!(summary.best.hit_rate, 0.95);
        assert_eq!(summary.best.cache_size, 512);
    }

    #[test]
    fn duplicates_count_towards_the_summary() {
        let rows = ResultTable::new(vec![
            ResultRecord::new(1024, 32, "fully", "LRU", 0.88),
            ResultRecord::new(1024, 32, "fully", "LRU", 0.50),
        ]);
        let summary = summarize(&rows).unwrap();
        assert_eq!(summary.count, 2);
        assert!((summary.mean_hit_rate - 0.69).abs() < 1e-9);
        assert_eq!(summary.min_hit_rate, 0.50);
    }

    #[test]
    fn ties_pick_first_record() {
        let summary = summarize(&table(&[0.7, 0.9, 0.9, 0.1])).unwrap();
        assert_eq!(summary.best.cache_size, 512);
    }

    #[test]
    fn empty_table_is_an_error() {
        assert_eq!(
            summarize(&ResultTable::default()).unwrap_err(),
            AnalysisError::EmptyInput
        );
    }

    #[test]
    fn renders_report_block() {
        let text = summarize(&table(&[0.80, 0.95, 0.60])).unwrap().to_string();
        assert!(text.contains("Total experiments: 3"));
        assert!(text.contains("Average hit rate: 78.33%"));
        assert!(text.contains("Highest hit rate: 95.00%"));
        assert!(text.contains("Lowest hit rate: 60.00%"));
        assert!(text.contains("  Cache Size: 512 bytes"));
        assert!(text.contains("  Associativity: fully"));
        assert!(text.ends_with("  Hit Rate: 95.00%"));
    }

    #[test]
    fn summarize_is_idempotent() {
        let rows = table(&[0.3, 0.6]);
        assert_eq!(summarize(&rows).unwrap(), summarize(&rows).unwrap());
    }
}
