use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The named kind of work a Session drives to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pipeline {
    CsvImport,
    BatchEnrichment,
    ShelfScan,
}

impl Pipeline {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CsvImport => "csv_import",
            Self::BatchEnrichment => "batch_enrichment",
            Self::ShelfScan => "shelf_scan",
        }
    }

    pub fn policy(self) -> PipelinePolicy {
        match self {
            Self::BatchEnrichment => PipelinePolicy {
                updates_threshold: 5,
                time_threshold: Duration::from_secs(10),
            },
            Self::CsvImport => PipelinePolicy {
                updates_threshold: 20,
                time_threshold: Duration::from_secs(30),
            },
            Self::ShelfScan => PipelinePolicy {
                updates_threshold: 1,
                time_threshold: Duration::from_secs(60),
            },
        }
    }
}

impl std::fmt::Display for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed-at-compile-time throttle policy for a pipeline (§3 PipelinePolicy table).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelinePolicy {
    pub updates_threshold: u32,
    pub time_threshold: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_table_matches_spec() {
        assert_eq!(Pipeline::BatchEnrichment.policy().updates_threshold, 5);
        assert_eq!(
            Pipeline::BatchEnrichment.policy().time_threshold,
            Duration::from_secs(10)
        );
        assert_eq!(Pipeline::CsvImport.policy().updates_threshold, 20);
        assert_eq!(Pipeline::ShelfScan.policy().updates_threshold, 1);
        assert_eq!(
            Pipeline::ShelfScan.policy().time_threshold,
            Duration::from_secs(60)
        );
    }

    #[test]
    fn serializes_snake_case() {
        let v = serde_json::to_string(&Pipeline::BatchEnrichment).unwrap();
        assert_eq!(v, "\"batch_enrichment\"");
    }
}
