use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct TableRowCounts {
    pub documents: usize,
    pub chunks: usize,
    pub scenarios: usize,
    pub runs: usize,
    pub events: usize,
}

impl TableRowCounts {
    pub fn total(&self) -> usize {
        self.documents + self.chunks + self.scenarios + self.runs + self.events
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PercentileSummary {
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

/// JSON rendering of the dataset stats report; the Markdown report carries
/// the same content.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetStatsReport {
    pub manifest_version: u32,
    pub generated_at: String,
    pub total_rows: usize,
    pub table_rows: TableRowCounts,
    pub accuracy: Option<f64>,
    pub hallucination_rate: Option<f64>,
    pub relevance_at_5: Option<f64>,
    pub relevance_at_10: Option<f64>,
    pub cost_percentiles: Option<PercentileSummary>,
    pub latency_percentiles: Option<PercentileSummary>,
    pub retrieval_strategies: Vec<ValueCount>,
    pub top_domains: Vec<ValueCount>,
}
