//! End-to-end run: scan, deduplicate, pair, compute, threshold, write

use crate::config::PipelineConfig;
use crate::core::indices::{IndexEngine, SceneBands};
use crate::core::pairing::PairingMachine;
use crate::core::queue::ProcessingQueue;
use crate::core::threshold::SeedThresholder;
use crate::io::catalog::SceneCatalog;
use crate::io::history::{HistoryStore, ProcessingHistory};
use crate::io::raster::RasterIo;
use crate::io::writer::ResultWriter;
use crate::types::{BandData, BurnResult, Product, SceneRecord, ScenePair};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Outcome of one pipeline run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Scenes found by the catalogue scan
    pub scenes_found: usize,
    /// Scenes left after deduplication and eligibility filters
    pub queued: usize,
    pub pairs_processed: usize,
    /// Scenes dropped by a tile mismatch during pairing
    pub dropped: Vec<String>,
    pub outputs: Vec<PathBuf>,
    /// Entries newly added to the processing history
    pub history_added: usize,
    pub elapsed: Duration,
}

/// Queue and history as seen at the start of a run
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub queue: ProcessingQueue,
    pub history: ProcessingHistory,
    pub scenes_found: usize,
}

/// Bands of the scene that becomes the next `post`
struct CachedBands {
    file_name: String,
    bands: SceneBands,
}

/// Burn seed pipeline over one working directory
pub struct BurnSeedPipeline<'a, R: RasterIo, H: HistoryStore> {
    config: &'a PipelineConfig,
    raster_io: R,
    history_store: H,
    engine: IndexEngine,
    thresholder: SeedThresholder,
}

impl<'a, R: RasterIo, H: HistoryStore> BurnSeedPipeline<'a, R, H> {
    pub fn new(config: &'a PipelineConfig, raster_io: R, history_store: H) -> Self {
        Self {
            config,
            raster_io,
            history_store,
            engine: IndexEngine::new(config.savi_l),
            thresholder: SeedThresholder::with_sieve_size(
                config.thresholds.clone(),
                config.sieve_size,
            ),
        }
    }

    /// Scan the working directory and build the queue of new, eligible scenes
    pub fn plan(&self) -> BurnResult<RunPlan> {
        let history = self.history_store.load()?;
        let records = SceneCatalog::new()?.scan(&self.config.working_dir)?;
        let scenes_found = records.len();

        let queue = ProcessingQueue::build(records, &history).retain_eligible(self.config);
        log::debug!("Queue: {:?}", queue.records().iter().map(|r| &r.file_name).collect::<Vec<_>>());
        Ok(RunPlan {
            queue,
            history,
            scenes_found,
        })
    }

    /// Run the full pipeline and persist the updated history
    pub fn run(&self) -> BurnResult<RunSummary> {
        let start = Instant::now();
        let RunPlan {
            queue,
            mut history,
            scenes_found,
        } = self.plan()?;
        let queued = queue.len();

        log::info!("Starting processing");
        let mut machine = PairingMachine::new(queue.into_records(), self.config.min_scene_size_gib)?;

        let mut summary = RunSummary {
            scenes_found,
            queued,
            ..RunSummary::default()
        };

        let mut cache: Option<CachedBands> = None;
        for pair in machine.by_ref() {
            log::info!("Pairing {} -> {}", pair.pre.file_name, pair.post.file_name);
            let (outputs, pre_bands) = self.process_pair(&pair, cache.take())?;
            summary.outputs.extend(outputs);
            summary.pairs_processed += 1;
            cache = Some(CachedBands {
                file_name: pair.pre.file_name.clone(),
                bands: pre_bands,
            });
        }
        summary.dropped = machine.dropped().iter().map(|r| r.file_name.clone()).collect();

        log::info!("Writing output file");
        summary.history_added = history.extend_from_records(machine.history_records());
        self.history_store.save(&history)?;

        summary.elapsed = start.elapsed();
        log::info!(
            "Processed {} pair(s), wrote {} raster(s) in {:.1?}",
            summary.pairs_processed,
            summary.outputs.len(),
            summary.elapsed
        );
        Ok(summary)
    }

    fn read_scene(&self, record: &SceneRecord) -> BurnResult<SceneBands> {
        let reader = self.raster_io.open_read(&record.path())?;
        SceneBands::read(&reader, &self.config.bands)
    }

    /// Compute, threshold and write one pair. Returns the written paths and
    /// the pre scene bands for reuse as the next post.
    fn process_pair(
        &self,
        pair: &ScenePair,
        cached: Option<CachedBands>,
    ) -> BurnResult<(Vec<PathBuf>, SceneBands)> {
        let post = match cached {
            Some(cached) if cached.file_name == pair.post.file_name => {
                log::debug!("Reusing bands of {}", cached.file_name);
                cached.bands
            }
            _ => self.read_scene(&pair.post)?,
        };
        let pre = self.read_scene(&pair.pre)?;

        let indices = self.engine.compute(&pre, &post)?;
        let seed = self
            .thresholder
            .apply(&indices.dsavi.data, &indices.post_nbr.data, &indices.dnbr2.data)?;

        log::info!("Saving data");
        let writer = ResultWriter::new(&self.raster_io, &self.config.output_dir);
        let base = &indices.post_nbr.profile;
        let products = [
            (Product::PostNbr, BandData::Float32(indices.post_nbr.data)),
            (Product::DNbr2, BandData::Float32(indices.dnbr2.data)),
            (Product::DSavi, BandData::Float32(indices.dsavi.data)),
            (Product::BurnSeed, BandData::UInt8(seed)),
        ];
        let outputs = products
            .into_iter()
            .map(|(product, data)| writer.write_product(pair, product, base, data))
            .collect::<BurnResult<Vec<_>>>()?;

        Ok((outputs, pre))
    }
}
