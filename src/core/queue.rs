use crate::config::PipelineConfig;
use crate::io::history::ProcessingHistory;
use crate::types::SceneRecord;

/// Deduplicated scenes ordered by tile, then acquisition date (both ascending).
///
/// Pairing consumes the queue from the end, so the latest scene of the last
/// tile comes off first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessingQueue {
    records: Vec<SceneRecord>,
}

impl ProcessingQueue {
    /// Sort the catalogue and drop every scene already in `history`.
    ///
    /// The sort is stable: scenes with equal tile and date keep their
    /// discovery order.
    pub fn build(mut records: Vec<SceneRecord>, history: &ProcessingHistory) -> Self {
        records.sort_by(|a, b| {
            a.tile_id
                .cmp(&b.tile_id)
                .then_with(|| a.acquisition_date.cmp(&b.acquisition_date))
        });

        let total = records.len();
        records.retain(|record| !history.contains(&record.file_name));
        log::info!(
            "Processing list constructed: {} new scene(s), {} already processed",
            records.len(),
            total - records.len()
        );

        Self { records }
    }

    /// Remove scenes outside the granule allow-list or in an excluded month
    pub fn retain_eligible(mut self, config: &PipelineConfig) -> Self {
        self.records.retain(|record| {
            if !config.allows_tile(&record.tile_id) {
                log::debug!("Skipping {}: tile not in granule list", record.file_name);
                return false;
            }
            match record.acquisition_month() {
                Some(month) if config.excludes_month(month) => {
                    log::debug!("Skipping {}: month {:02} excluded", record.file_name, month);
                    false
                }
                _ => true,
            }
        });
        self
    }

    pub fn records(&self) -> &[SceneRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<SceneRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
