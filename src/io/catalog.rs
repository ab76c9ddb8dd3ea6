use crate::types::{BurnError, BurnResult, SceneRecord};
use regex::Regex;
use std::path::Path;
use walkdir::WalkDir;

/// File name suffix of the standardised surface reflectance ARD product
pub const SCENE_SUFFIX: &str = "vmsk_sharp_rad_srefdem_stdsref.tif";

/// Underscore-delimited field holding the acquisition date
pub const DATE_FIELD: usize = 1;

/// Underscore-delimited field holding the tile (granule) id
pub const TILE_FIELD: usize = 3;

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Fields of a scene file name, e.g.
/// `SEN2_20190415_lat57lon366_T30VVJ_ORB080_utm30n_osgb_vmsk_sharp_rad_srefdem_stdsref.tif`
#[derive(Debug, Clone, PartialEq)]
pub struct SceneName<'a> {
    fields: Vec<&'a str>,
}

impl<'a> SceneName<'a> {
    pub fn parse(file_name: &'a str) -> BurnResult<Self> {
        let fields: Vec<&str> = file_name.split('_').collect();
        if fields.len() <= TILE_FIELD {
            return Err(BurnError::InvalidSceneName(format!(
                "{} has {} underscore-delimited field(s), expected at least {}",
                file_name,
                fields.len(),
                TILE_FIELD + 1
            )));
        }
        if fields[DATE_FIELD].is_empty() || fields[TILE_FIELD].is_empty() {
            return Err(BurnError::InvalidSceneName(format!(
                "{} has an empty date or tile field",
                file_name
            )));
        }
        Ok(Self { fields })
    }

    pub fn field(&self, index: usize) -> Option<&'a str> {
        self.fields.get(index).copied()
    }

    pub fn acquisition_date(&self) -> &'a str {
        self.fields[DATE_FIELD]
    }

    pub fn tile_id(&self) -> &'a str {
        self.fields[TILE_FIELD]
    }
}

/// Recursive scanner for scene files below a root directory
pub struct SceneCatalog {
    pattern: Regex,
}

impl SceneCatalog {
    /// Scanner for the standard reflectance product
    pub fn new() -> BurnResult<Self> {
        Self::with_suffix(SCENE_SUFFIX)
    }

    /// Scanner matching `*<suffix>`
    pub fn with_suffix(suffix: &str) -> BurnResult<Self> {
        let pattern = Regex::new(&format!("^.*{}$", regex::escape(suffix)))
            .map_err(|e| BurnError::Configuration(format!("Regex error: {}", e)))?;
        Ok(Self { pattern })
    }

    /// Whether a file name looks like a scene product
    pub fn matches(&self, file_name: &str) -> bool {
        self.pattern.is_match(file_name)
    }

    /// Walk `root` and return one record per matching scene file.
    ///
    /// Entries are visited in file name order so repeated runs see the same
    /// discovery order. A missing root is reported as an I/O error.
    pub fn scan<P: AsRef<Path>>(&self, root: P) -> BurnResult<Vec<SceneRecord>> {
        let root = root.as_ref();
        log::info!("Scanning for scenes under {}", root.display());

        let mut records = Vec::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(|e| BurnError::Io(e.into()))?;
            // symlinked scenes count; directory links are not followed
            if !entry.path().is_file() {
                continue;
            }

            let file_name = match entry.file_name().to_str() {
                Some(name) => name,
                None => {
                    log::warn!("Skipping non UTF-8 file name: {}", entry.path().display());
                    continue;
                }
            };
            if !self.matches(file_name) {
                continue;
            }

            let directory = match entry.path().parent() {
                Some(dir) => dir,
                None => continue,
            };
            let size_bytes = std::fs::metadata(entry.path())?.len();

            match Self::record(directory, file_name, size_bytes) {
                Ok(record) => {
                    log::debug!("Found scene {}", record);
                    records.push(record);
                }
                Err(e) => log::warn!("Cannot catalogue scene: {}", e),
            }
        }

        log::info!("Found {} scene(s)", records.len());
        Ok(records)
    }

    /// Build a record from a file's location, name and size in bytes
    pub fn record(directory: &Path, file_name: &str, size_bytes: u64) -> BurnResult<SceneRecord> {
        let name = SceneName::parse(file_name)?;
        Ok(SceneRecord {
            file_name: file_name.to_string(),
            directory: directory.to_path_buf(),
            tile_id: name.tile_id().to_string(),
            size_gib: size_bytes as f64 / BYTES_PER_GIB,
            acquisition_date: name.acquisition_date().to_string(),
        })
    }
}
