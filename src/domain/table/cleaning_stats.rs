// ============================================================
// CLEANING STATS
// ============================================================

use serde::{Deserialize, Serialize};

/// Counters produced once by the cleaning pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningStats {
    pub original_rows: usize,
    pub duplicates_removed: usize,
    pub empty_rows_removed: usize,
    pub final_rows: usize,
    pub columns_count: usize,
}
