use crate::config::BandMapping;
use crate::io::raster::RasterReader;
use crate::types::{BurnError, BurnResult, IndexImage, IndexRaster, RasterProfile};
use ndarray::{Array2, Zip};
use num_traits::Float;

/// Fixed SAVI scale factor; the sign is flipped so the index rises after fire
const SAVI_SCALE: f32 = 1.5;

/// Default SAVI soil brightness correction
pub const DEFAULT_SAVI_L: f32 = 0.5;

/// `(a - b) / (a + b)` with no guard against a zero denominator
pub fn normalized_difference<T: Float>(a: T, b: T) -> T {
    (a - b) / (a + b)
}

/// Reversed SAVI for one pixel: `-1.5 * (nir - red) / (nir + red + L)`
pub fn savi_pixel(nir: f32, red: f32, l: f32) -> f32 {
    -SAVI_SCALE * ((nir - red) / (nir + red + l))
}

fn zip_map<F>(a: &Array2<f32>, b: &Array2<f32>, f: F) -> Array2<f32>
where
    F: Fn(f32, f32) -> f32 + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        Zip::from(a).and(b).par_map_collect(|&x, &y| f(x, y))
    }
    #[cfg(not(feature = "parallel"))]
    {
        Zip::from(a).and(b).map_collect(|&x, &y| f(x, y))
    }
}

fn join<A, B, RA, RB>(a: A, b: B) -> (RA, RB)
where
    A: FnOnce() -> RA + Send,
    B: FnOnce() -> RB + Send,
    RA: Send,
    RB: Send,
{
    #[cfg(feature = "parallel")]
    {
        rayon::join(a, b)
    }
    #[cfg(not(feature = "parallel"))]
    {
        (a(), b())
    }
}

/// Normalised Burn Ratio, `(swir1 - nir) / (swir1 + nir)`.
///
/// Reversed from the usual definition so that, like the other indices, it
/// increases where fire has occurred.
pub fn nbr(swir1: &Array2<f32>, nir: &Array2<f32>) -> IndexImage {
    zip_map(swir1, nir, normalized_difference::<f32>)
}

/// NBR2, `(swir2 - swir1) / (swir2 + swir1)`
pub fn nbr2(swir2: &Array2<f32>, swir1: &Array2<f32>) -> IndexImage {
    zip_map(swir2, swir1, normalized_difference::<f32>)
}

/// Soil Adjusted Vegetation Index with the sign flipped
pub fn savi(nir: &Array2<f32>, red: &Array2<f32>, l: f32) -> IndexImage {
    zip_map(nir, red, move |n, r| savi_pixel(n, r, l))
}

/// The four bands needed from one scene, read as float32
#[derive(Debug, Clone)]
pub struct SceneBands {
    pub red: Array2<f32>,
    pub nir: Array2<f32>,
    pub swir1: Array2<f32>,
    pub swir2: Array2<f32>,
    pub profile: RasterProfile,
}

impl SceneBands {
    pub fn read<R: RasterReader>(reader: &R, bands: &BandMapping) -> BurnResult<Self> {
        let info = reader.info();
        log::info!(
            "Reading {}: {} bands, {}x{}, CRS {}",
            info.name,
            info.band_count,
            info.width,
            info.height,
            if info.crs().is_empty() { "<none>" } else { info.crs() }
        );
        if bands.max_index() > info.band_count {
            return Err(BurnError::Processing(format!(
                "{} has {} band(s), band {} is required",
                info.name,
                info.band_count,
                bands.max_index()
            )));
        }

        let scene = Self {
            red: reader.read_band(bands.red)?,
            nir: reader.read_band(bands.nir)?,
            swir1: reader.read_band(bands.swir1)?,
            swir2: reader.read_band(bands.swir2)?,
            profile: info.profile.clone(),
        };
        log::debug!("Image data read: {}", info.name);
        Ok(scene)
    }

    pub fn dim(&self) -> (usize, usize) {
        self.red.dim()
    }

    fn check_shape(&self) -> BurnResult<()> {
        let dim = self.dim();
        if [&self.nir, &self.swir1, &self.swir2].iter().any(|b| b.dim() != dim) {
            return Err(BurnError::Processing(
                "bands of one scene differ in shape".to_string(),
            ));
        }
        Ok(())
    }
}

/// Index rasters computed for one scene pair
#[derive(Debug, Clone)]
pub struct SpectralIndices {
    pub post_nbr: IndexRaster,
    pub dnbr2: IndexRaster,
    pub dsavi: IndexRaster,
}

/// Computes postNBR, dNBR2 and dSAVI for a pre/post scene pair.
///
/// Zero denominators are not masked: they surface as NaN or infinity in the
/// output rasters.
#[derive(Debug, Clone)]
pub struct IndexEngine {
    savi_l: f32,
}

impl Default for IndexEngine {
    fn default() -> Self {
        Self::new(DEFAULT_SAVI_L)
    }
}

impl IndexEngine {
    pub fn new(savi_l: f32) -> Self {
        Self { savi_l }
    }

    pub fn compute(&self, pre: &SceneBands, post: &SceneBands) -> BurnResult<SpectralIndices> {
        pre.check_shape()?;
        post.check_shape()?;
        if pre.dim() != post.dim() {
            return Err(BurnError::Processing(format!(
                "pre scene is {:?} but post scene is {:?}; scenes must be aligned",
                pre.dim(),
                post.dim()
            )));
        }

        log::info!("Calculating postNBR");
        let post_nbr = nbr(&post.swir1, &post.nir);

        log::info!("Calculating dNBR2 and dSAVI");
        let l = self.savi_l;
        let (dnbr2, dsavi) = join(
            || nbr2(&post.swir2, &post.swir1) - nbr2(&pre.swir2, &pre.swir1),
            || savi(&post.nir, &post.red, l) - savi(&pre.nir, &pre.red, l),
        );

        let raster = |data: IndexImage| IndexRaster {
            data,
            profile: pre.profile.clone(),
        };
        Ok(SpectralIndices {
            post_nbr: raster(post_nbr),
            dnbr2: raster(dnbr2),
            dsavi: raster(dsavi),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BandType;
    use approx::assert_abs_diff_eq;

    fn profile(tag: f64) -> RasterProfile {
        RasterProfile {
            width: 2,
            height: 2,
            count: 12,
            dtype: BandType::Float32,
            geo_transform: [tag, 10.0, 0.0, 0.0, 0.0, -10.0],
            crs: String::new(),
            no_data: None,
            compress: None,
        }
    }

    fn bands(red: f32, nir: f32, swir1: f32, swir2: f32, tag: f64) -> SceneBands {
        SceneBands {
            red: Array2::from_elem((2, 2), red),
            nir: Array2::from_elem((2, 2), nir),
            swir1: Array2::from_elem((2, 2), swir1),
            swir2: Array2::from_elem((2, 2), swir2),
            profile: profile(tag),
        }
    }

    #[test]
    fn test_nbr_value() {
        let swir1 = Array2::from_elem((1, 1), 200.0);
        let nir = Array2::from_elem((1, 1), 100.0);
        assert_abs_diff_eq!(nbr(&swir1, &nir)[[0, 0]], 1.0f32 / 3.0, epsilon = 1e-5);
    }

    #[test]
    fn test_savi_value() {
        // -1.5 * (300 - 100) / (300 + 100 + 0.5)
        assert_abs_diff_eq!(savi_pixel(300.0, 100.0, 0.5), -0.749_064f32, epsilon = 1e-5);
    }

    #[test]
    fn test_zero_denominator_propagates() {
        let zero = Array2::from_elem((1, 1), 0.0f32);
        assert!(nbr(&zero, &zero)[[0, 0]].is_nan());

        let swir1 = Array2::from_elem((1, 1), 100.0f32);
        let nir = Array2::from_elem((1, 1), -100.0f32);
        assert!(nbr(&swir1, &nir)[[0, 0]].is_infinite());
    }

    #[test]
    fn test_pair_differences_and_pre_profile() {
        let pre = bands(100.0, 300.0, 200.0, 100.0, 1.0);
        let post = bands(150.0, 200.0, 300.0, 250.0, 2.0);

        let indices = IndexEngine::default().compute(&pre, &post).unwrap();

        assert_abs_diff_eq!(indices.post_nbr.data[[0, 0]], 0.2f32, epsilon = 1e-6);

        let expected_dnbr2: f32 = (250.0 - 300.0) / (250.0 + 300.0) - (100.0 - 200.0) / (100.0 + 200.0);
        assert_abs_diff_eq!(indices.dnbr2.data[[1, 1]], expected_dnbr2, epsilon = 1e-6);

        let expected_dsavi: f32 = savi_pixel(200.0, 150.0, 0.5) - savi_pixel(300.0, 100.0, 0.5);
        assert_abs_diff_eq!(indices.dsavi.data[[0, 1]], expected_dsavi, epsilon = 1e-6);

        // georeferencing comes from the pre scene
        assert_eq!(indices.dsavi.profile.geo_transform[0], 1.0);
    }

    #[test]
    fn test_misaligned_scenes_rejected() {
        let pre = bands(1.0, 2.0, 3.0, 4.0, 0.0);
        let mut post = bands(1.0, 2.0, 3.0, 4.0, 0.0);
        post.red = Array2::zeros((3, 3));
        assert!(IndexEngine::default().compute(&pre, &post).is_err());
    }
}
