use std::fmt;

use crate::{
    pipeline::{Constraints, SeriesOrder, SeriesPoint, build_series},
    results::{Field, ResultTable},
};

/// The fixed values the four comparison charts hold constant.
#[derive(Debug, Clone)]
pub struct ChartBaseline {
    pub cache_size: u64, // in Bytes
    pub line_size: u64,  // in Bytes
    pub associativity: String,
    pub policy: String,
    /// Extra policy drawn next to `policy` on the size sweeps.
    pub companion_policy: Option<String>,
}

impl Default for ChartBaseline {
    fn default() -> Self {
        Self {
            cache_size: 1024,
            line_size: 32,
            associativity: "fully".to_string(),
            policy: "LRU".to_string(),
            companion_policy: Some("FIFO".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Line,
    Bar,
}

#[derive(Debug, Clone)]
pub struct SeriesSpec {
    pub label: String,
    pub fixed: Constraints,
}

/// Everything needed to compute one chart from a result table.
#[derive(Debug, Clone)]
pub struct ChartSpec {
    pub title: String,
    pub subtitle: String,
    pub varying: Field,
    pub order: SeriesOrder,
    pub kind: ChartKind,
    pub series: Vec<SeriesSpec>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub points: Vec<SeriesPoint>,
}

/// A chart with its series computed, ready for the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub title: String,
    pub subtitle: String,
    pub varying: Field,
    pub kind: ChartKind,
    pub series: Vec<Series>,
}

impl ChartSpec {
    pub fn build(&self, table: &ResultTable) -> Chart {
        let series = self
            .series
            .iter()
            .map(|spec| Series {
                label: spec.label.clone(),
                points: build_series(table, &spec.fixed, self.varying, &self.order),
            })
            .collect();
        Chart {
            title: self.title.clone(),
            subtitle: self.subtitle.clone(),
            varying: self.varying,
            kind: self.kind,
            series,
        }
    }
}

impl Chart {
    pub fn caption(&self) -> String {
        format!("{} ({})", self.title, self.subtitle)
    }
}

impl fmt::Display for Chart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== {} ==", self.caption())?;
        for series in &self.series {
            writeln!(f, "  {}", series.label)?;
            if series.points.is_empty() {
                writeln!(f, "    (no matching results)")?;
            }
            for point in &series.points {
                writeln!(f, "    {point}")?;
            }
        }
        Ok(())
    }
}

pub fn standard_charts(base: &ChartBaseline) -> Vec<ChartSpec> {
    vec![
        cache_size_sweep(base),
        line_size_sweep(base),
        associativity_sweep(base),
        policy_sweep(base),
    ]
}

fn describe_associativity(name: &str) -> String {
    match name {
        "fully" => "Fully Associative".to_string(),
        "direct" => "Direct-Mapped".to_string(),
        other => other.to_string(),
    }
}

fn size_sweep_series(base: &ChartBaseline, fixed: Constraints) -> Vec<SeriesSpec> {
    let mut series = vec![SeriesSpec {
        label: base.policy.clone(),
        fixed: fixed.clone().with(Field::Policy, base.policy.as_str()),
    }];
    if let Some(companion) = &base.companion_policy {
        if companion != &base.policy {
            series.push(SeriesSpec {
                label: companion.clone(),
                fixed: fixed.with(Field::Policy, companion.as_str()),
            });
        }
    }
    series
}

pub fn cache_size_sweep(base: &ChartBaseline) -> ChartSpec {
    let fixed = Constraints::new()
        .with(Field::LineSize, base.line_size)
        .with(Field::Associativity, base.associativity.as_str());
    ChartSpec {
        title: "Hit Rate vs Cache Size".to_string(),
        subtitle: format!(
            "Line Size={}B, {}",
            base.line_size,
            describe_associativity(&base.associativity)
        ),
        varying: Field::CacheSize,
        order: Field::CacheSize.default_order(),
        kind: ChartKind::Line,
        series: size_sweep_series(base, fixed),
    }
}

pub fn line_size_sweep(base: &ChartBaseline) -> ChartSpec {
    let fixed = Constraints::new()
        .with(Field::CacheSize, base.cache_size)
        .with(Field::Associativity, base.associativity.as_str());
    ChartSpec {
        title: "Hit Rate vs Line Size".to_string(),
        subtitle: format!(
            "Cache Size={}B, {}",
            base.cache_size,
            describe_associativity(&base.associativity)
        ),
        varying: Field::LineSize,
        order: Field::LineSize.default_order(),
        kind: ChartKind::Line,
        series: size_sweep_series(base, fixed),
    }
}

pub fn associativity_sweep(base: &ChartBaseline) -> ChartSpec {
    let fixed = Constraints::new()
        .with(Field::CacheSize, base.cache_size)
        .with(Field::LineSize, base.line_size)
        .with(Field::Policy, base.policy.as_str());
    ChartSpec {
        title: "Hit Rate vs Associativity".to_string(),
        subtitle: format!(
            "Cache Size={}B, Line Size={}B, {}",
            base.cache_size, base.line_size, base.policy
        ),
        varying: Field::Associativity,
        order: Field::Associativity.default_order(),
        kind: ChartKind::Bar,
        series: vec![SeriesSpec {
            label: base.policy.clone(),
            fixed,
        }],
    }
}

pub fn policy_sweep(base: &ChartBaseline) -> ChartSpec {
    let fixed = Constraints::new()
        .with(Field::CacheSize, base.cache_size)
        .with(Field::LineSize, base.line_size)
        .with(Field::Associativity, base.associativity.as_str());
    ChartSpec {
        title: "Hit Rate vs Replacement Policy".to_string(),
        subtitle: format!(
            "Cache Size={}B, Line Size={}B, {}",
            base.cache_size,
            base.line_size,
            describe_associativity(&base.associativity)
        ),
        varying: Field::Policy,
        order: Field::Policy.default_order(),
        kind: ChartKind::Bar,
        series: vec![SeriesSpec {
            label: "all policies".to_string(),
            fixed,
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        pipeline::ASSOCIATIVITY_ORDER,
        results::{FieldValue, ResultRecord},
    };

    fn table() -> ResultTable {
        ResultTable::new(vec![
            ResultRecord::new(512, 32, "fully", "LRU", 0.86),
            ResultRecord::new(1024, 32, "fully", "LRU", 0.88),
            ResultRecord::new(1024, 32, "fully", "LRU", 0.50),
            ResultRecord::new(2048, 32, "fully", "LRU", 0.90),
            ResultRecord::new(1024, 32, "fully", "FIFO", 0.87),
            ResultRecord::new(1024, 16, "fully", "LRU", 0.80),
            ResultRecord::new(1024, 32, "direct", "LRU", 0.85),
        ])
    }

    #[test]
    fn default_baseline_matches_documented_constraints() {
        let specs = standard_charts(&ChartBaseline::default());
        assert_eq!(specs.len(), 4);

        let cache = &specs[0];
        assert_eq!(cache.varying, Field::CacheSize);
        assert_eq!(cache.order, SeriesOrder::Numeric);
        assert_eq!(
            cache.series[0].fixed.to_string(),
            "LineSize=32, Associativity=fully, Policy=LRU"
        );
        assert_eq!(cache.series[1].fixed.get(Field::Policy), Some(&FieldValue::from("FIFO")));

        let line = &specs[1];
        assert_eq!(
            line.series[0].fixed.to_string(),
            "CacheSize=1024, Associativity=fully, Policy=LRU"
        );

        let assoc = &specs[2];
        assert_eq!(assoc.order, SeriesOrder::associativity());
        assert_eq!(assoc.series.len(), 1);
        assert_eq!(
            assoc.series[0].fixed.to_string(),
            "CacheSize=1024, LineSize=32, Policy=LRU"
        );

        let policy = &specs[3];
        assert_eq!(policy.order, SeriesOrder::Lexical);
        assert_eq!(
            policy.series[0].fixed.to_string(),
            "CacheSize=1024, LineSize=32, Associativity=fully"
        );
    }

    #[test]
    fn companion_series_can_be_disabled() {
        let base = ChartBaseline {
            companion_policy: None,
            ..ChartBaseline::default()
        };
        let specs = standard_charts(&base);
        assert_eq!(specs[0].series.len(), 1);
        assert_eq!(specs[1].series.len(), 1);
    }

    #[test]
    fn builds_all_four_charts() {
        let table = table();
        let charts: Vec<Chart> = standard_charts(&ChartBaseline::default())
            .iter()
            .map(|spec| spec.build(&table))
            .collect();

        let lru: Vec<(FieldValue, f64)> = charts[0].series[0]
            .points
            .iter()
            .map(|p| (p.value.clone(), p.hit_rate))
            .collect();
        assert_eq!(
            lru,
            vec![
                (FieldValue::Int(512), 0.86),
                (FieldValue::Int(1024), 0.88),
                (FieldValue::Int(2048), 0.90),
            ]
        );
        assert_eq!(charts[0].series[1].points.len(), 1);

        let lines: Vec<FieldValue> = charts[1].series[0]
            .points
            .iter()
            .map(|p| p.value.clone())
            .collect();
        assert_eq!(lines, vec![FieldValue::Int(16), FieldValue::Int(32)]);

        let assoc = &charts[2].series[0].points;
        assert_eq!(assoc.len(), ASSOCIATIVITY_ORDER.len());
        assert_eq!(assoc[0].hit_rate, 0.85);
        assert!(assoc[1].filled && assoc[2].filled);
        assert_eq!(assoc[3].hit_rate, 0.88);

        let policies: Vec<String> = charts[3].series[0]
            .points
            .iter()
            .map(|p| p.value.to_string())
            .collect();
        assert_eq!(policies, vec!["FIFO", "LRU"]);
    }

    #[test]
    fn display_marks_missing_slots() {
        let chart = associativity_sweep(&ChartBaseline::default()).build(&table());
        let text = chart.to_string();
        assert!(text.starts_with(
            "== Hit Rate vs Associativity (Cache Size=1024B, Line Size=32B, LRU) =="
        ));
        assert!(text.contains("direct     hit  85.00%"));
        assert!(text.contains("4way       no data"));
    }
}
