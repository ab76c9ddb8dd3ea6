#![allow(dead_code)]

use burnseed::io::raster::{RasterInfo, RasterIo, RasterReader, RasterWriter};
use burnseed::types::{BandData, BandType, BurnError, BurnResult, RasterProfile};
use ndarray::Array2;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub const GIB: u64 = 1024 * 1024 * 1024;

pub const BAND_COUNT: usize = 10;

#[derive(Debug, Clone)]
pub struct MemRaster {
    pub profile: RasterProfile,
    pub bands: Vec<Option<BandData>>,
}

#[derive(Default)]
struct Store {
    scenes: HashMap<PathBuf, (RasterProfile, Vec<Array2<f32>>)>,
    written: HashMap<PathBuf, MemRaster>,
    opens: HashMap<PathBuf, usize>,
}

/// Raster backend holding everything in memory
#[derive(Clone, Default)]
pub struct MemoryRasterIo {
    store: Rc<RefCell<Store>>,
}

pub struct MemReader {
    info: RasterInfo,
    bands: Vec<Array2<f32>>,
}

pub struct MemWriter {
    path: PathBuf,
    store: Rc<RefCell<Store>>,
}

pub fn profile(width: usize, height: usize, tag: f64) -> RasterProfile {
    RasterProfile {
        width,
        height,
        count: BAND_COUNT,
        dtype: BandType::Float32,
        geo_transform: [tag, 10.0, 0.0, 6_400_000.0, 0.0, -10.0],
        crs: "EPSG:27700".to_string(),
        no_data: Some(0.0),
        compress: None,
    }
}

impl MemoryRasterIo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_scene(&self, path: &Path, profile: RasterProfile, bands: Vec<Array2<f32>>) {
        self.store
            .borrow_mut()
            .scenes
            .insert(path.to_path_buf(), (profile, bands));
    }

    pub fn written(&self, path: &Path) -> Option<MemRaster> {
        self.store.borrow().written.get(path).cloned()
    }

    pub fn written_count(&self) -> usize {
        self.store.borrow().written.len()
    }

    pub fn open_count(&self, path: &Path) -> usize {
        self.store.borrow().opens.get(path).copied().unwrap_or(0)
    }
}

impl RasterIo for MemoryRasterIo {
    type Reader = MemReader;
    type Writer = MemWriter;

    fn open_read(&self, path: &Path) -> BurnResult<MemReader> {
        let mut store = self.store.borrow_mut();
        *store.opens.entry(path.to_path_buf()).or_insert(0) += 1;

        let (profile, bands) = store
            .scenes
            .get(path)
            .cloned()
            .ok_or_else(|| BurnError::Processing(format!("no raster at {}", path.display())))?;

        Ok(MemReader {
            info: RasterInfo {
                name: path.display().to_string(),
                band_count: bands.len(),
                width: profile.width,
                height: profile.height,
                profile,
            },
            bands,
        })
    }

    fn open_write(&self, path: &Path, profile: &RasterProfile) -> BurnResult<MemWriter> {
        self.store.borrow_mut().written.insert(
            path.to_path_buf(),
            MemRaster {
                profile: profile.clone(),
                bands: vec![None; profile.count],
            },
        );
        Ok(MemWriter {
            path: path.to_path_buf(),
            store: Rc::clone(&self.store),
        })
    }
}

impl RasterReader for MemReader {
    fn info(&self) -> &RasterInfo {
        &self.info
    }

    fn read_band(&self, index: usize) -> BurnResult<Array2<f32>> {
        index
            .checked_sub(1)
            .and_then(|i| self.bands.get(i))
            .cloned()
            .ok_or_else(|| BurnError::Processing(format!("band {} out of range", index)))
    }
}

impl RasterWriter for MemWriter {
    fn write_band(&mut self, index: usize, data: &BandData) -> BurnResult<()> {
        let mut store = self.store.borrow_mut();
        let raster = store
            .written
            .get_mut(&self.path)
            .ok_or_else(|| BurnError::Processing("raster vanished".to_string()))?;
        let slot = index
            .checked_sub(1)
            .and_then(|i| raster.bands.get_mut(i))
            .ok_or_else(|| BurnError::Processing(format!("band {} out of range", index)))?;
        *slot = Some(data.clone());
        Ok(())
    }
}

/// Surface reflectance values for one land cover
#[derive(Debug, Clone, Copy)]
pub struct Reflectance {
    pub red: f32,
    pub nir: f32,
    pub swir1: f32,
    pub swir2: f32,
}

pub const VEGETATION: Reflectance = Reflectance {
    red: 500.0,
    nir: 3000.0,
    swir1: 1500.0,
    swir2: 1000.0,
};

pub const BURNT: Reflectance = Reflectance {
    red: 800.0,
    nir: 1000.0,
    swir1: 2000.0,
    swir2: 1800.0,
};

/// Ten band scene with `cover(row, col)` deciding each pixel's reflectance.
/// Red, NIR, SWIR1 and SWIR2 sit in bands 3, 7, 9 and 10.
pub fn scene_bands<F>(rows: usize, cols: usize, cover: F) -> Vec<Array2<f32>>
where
    F: Fn(usize, usize) -> Reflectance,
{
    let mut bands = vec![Array2::<f32>::zeros((rows, cols)); BAND_COUNT];
    for row in 0..rows {
        for col in 0..cols {
            let r = cover(row, col);
            bands[2][[row, col]] = r.red;
            bands[6][[row, col]] = r.nir;
            bands[8][[row, col]] = r.swir1;
            bands[9][[row, col]] = r.swir2;
        }
    }
    bands
}

pub fn scene_name(date: &str, tile: &str, orbit: &str) -> String {
    format!(
        "SEN2_{}_lat57lon366_{}_{}_utm30n_osgb_vmsk_sharp_rad_srefdem_stdsref.tif",
        date, tile, orbit
    )
}

/// Create a sparse scene file of the given size and return its path
pub fn touch_scene(dir: &Path, name: &str, size_bytes: u64) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    let file = File::create(&path).unwrap();
    file.set_len(size_bytes).unwrap();
    path
}
