use crate::config::ThresholdConfig;
use crate::types::{BurnError, BurnResult, IndexImage, SeedMask};
use ndarray::{Array2, Zip};
use std::collections::VecDeque;

/// Default minimum clump size kept by the sieve
pub const DEFAULT_SIEVE_SIZE: usize = 3;

const NEIGHBOURS_8: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Turns index rasters into a binary burn seed mask
#[derive(Debug, Clone)]
pub struct SeedThresholder {
    thresholds: ThresholdConfig,
    sieve_size: usize,
}

impl SeedThresholder {
    pub fn new(thresholds: ThresholdConfig) -> Self {
        Self::with_sieve_size(thresholds, DEFAULT_SIEVE_SIZE)
    }

    pub fn with_sieve_size(thresholds: ThresholdConfig, sieve_size: usize) -> Self {
        Self {
            thresholds,
            sieve_size,
        }
    }

    pub fn thresholds(&self) -> &ThresholdConfig {
        &self.thresholds
    }

    /// Build the seed mask.
    ///
    /// A pixel is a seed where `dsavi >= threshdsavi` and
    /// `postnbr >= threshpostnbr`, unless `dnbr2 >= threshdnbr2` (cloud edges).
    /// Seed clumps smaller than the sieve size (8-connected) are then removed.
    pub fn apply(
        &self,
        dsavi: &IndexImage,
        post_nbr: &IndexImage,
        dnbr2: &IndexImage,
    ) -> BurnResult<SeedMask> {
        if dsavi.dim() != post_nbr.dim() || dnbr2.dim() != post_nbr.dim() {
            return Err(BurnError::Processing(format!(
                "index shapes differ: dSAVI {:?}, postNBR {:?}, dNBR2 {:?}",
                dsavi.dim(),
                post_nbr.dim(),
                dnbr2.dim()
            )));
        }

        log::info!("Calculating thresholding");
        log::debug!("Thresholds used: {:?}", self.thresholds);
        let t = &self.thresholds;

        let mut mask = Array2::<u8>::zeros(post_nbr.dim());
        Zip::from(&mut mask)
            .and(dsavi)
            .and(post_nbr)
            .for_each(|m, &savi, &nbr| {
                if savi >= t.threshdsavi && nbr >= t.threshpostnbr {
                    *m = 1;
                }
            });
        // evaluated after the seed rule so it overrides it
        Zip::from(&mut mask).and(dnbr2).for_each(|m, &d| {
            if d >= t.threshdnbr2 {
                *m = 0;
            }
        });

        let removed = sieve(&mut mask, self.sieve_size);
        log::debug!("Sieve removed {} pixel(s)", removed);
        Ok(mask)
    }
}

/// Clear every 8-connected clump of non-zero pixels smaller than `min_size`.
///
/// Unlike GDAL's sieve filter, small background holes inside a clump are left
/// as they are. Returns the number of pixels cleared.
pub fn sieve(mask: &mut SeedMask, min_size: usize) -> usize {
    let (rows, cols) = mask.dim();
    let mut visited = Array2::<bool>::from_elem((rows, cols), false);
    let mut queue = VecDeque::new();
    let mut clump = Vec::new();
    let mut removed = 0;

    for row in 0..rows {
        for col in 0..cols {
            if mask[[row, col]] == 0 || visited[[row, col]] {
                continue;
            }

            clump.clear();
            visited[[row, col]] = true;
            queue.push_back((row, col));
            while let Some((r, c)) = queue.pop_front() {
                clump.push((r, c));
                for (dr, dc) in NEIGHBOURS_8 {
                    let nr = r as isize + dr;
                    let nc = c as isize + dc;
                    if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
                        continue;
                    }
                    let (nr, nc) = (nr as usize, nc as usize);
                    if mask[[nr, nc]] != 0 && !visited[[nr, nc]] {
                        visited[[nr, nc]] = true;
                        queue.push_back((nr, nc));
                    }
                }
            }

            if clump.len() < min_size {
                for &(r, c) in &clump {
                    mask[[r, c]] = 0;
                }
                removed += clump.len();
            }
        }
    }

    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn thresholder() -> SeedThresholder {
        SeedThresholder::new(ThresholdConfig::default())
    }

    #[test]
    fn test_cloud_edge_rule_overrides_seed_rule() {
        let high = Array2::from_elem((3, 3), 0.9f32);
        let mask = thresholder().apply(&high, &high, &high).unwrap();
        assert!(mask.iter().all(|&v| v == 0));
    }

    #[test]
    fn test_seed_rule_uses_inclusive_thresholds() {
        let t = ThresholdConfig::default();
        let dsavi = Array2::from_elem((3, 3), t.threshdsavi);
        let post_nbr = Array2::from_elem((3, 3), t.threshpostnbr);
        let dnbr2 = Array2::from_elem((3, 3), 0.0f32);

        let mask = thresholder().apply(&dsavi, &post_nbr, &dnbr2).unwrap();
        assert!(mask.iter().all(|&v| v == 1));
    }

    #[test]
    fn test_both_conditions_required() {
        let dsavi = array![[0.9f32, 0.9, 0.9], [0.0, 0.0, 0.0]];
        let post_nbr = array![[0.9f32, 0.9, 0.9], [0.9, 0.9, 0.9]];
        let dnbr2 = Array2::zeros((2, 3));

        let mask = thresholder().apply(&dsavi, &post_nbr, &dnbr2).unwrap();
        assert_eq!(mask, array![[1u8, 1, 1], [0, 0, 0]]);
    }

    #[test]
    fn test_nan_pixels_are_never_seeds() {
        let dsavi = Array2::from_elem((3, 3), f32::NAN);
        let post_nbr = Array2::from_elem((3, 3), 0.9f32);
        let dnbr2 = Array2::from_elem((3, 3), f32::NAN);

        let mask = thresholder().apply(&dsavi, &post_nbr, &dnbr2).unwrap();
        assert!(mask.iter().all(|&v| v == 0));
    }

    #[test]
    fn test_sieve_removes_isolated_pixel() {
        let mut mask = Array2::<u8>::zeros((5, 5));
        mask[[2, 2]] = 1;
        assert_eq!(sieve(&mut mask, 3), 1);
        assert_eq!(mask[[2, 2]], 0);
    }

    #[test]
    fn test_sieve_keeps_diagonal_chain() {
        let mut mask = Array2::<u8>::zeros((5, 5));
        mask[[1, 1]] = 1;
        mask[[2, 2]] = 1;
        mask[[3, 3]] = 1;
        assert_eq!(sieve(&mut mask, 3), 0);
        assert_eq!(mask.sum(), 3);
    }

    #[test]
    fn test_sieve_keeps_background_holes() {
        let mut mask = array![[1u8, 1, 1], [1, 0, 1], [1, 1, 1]];
        assert_eq!(sieve(&mut mask, 3), 0);
        assert_eq!(mask[[1, 1]], 0);
    }

    #[test]
    fn test_sieve_mixed_clumps() {
        let mut mask = array![
            [1u8, 1, 0, 0, 0],
            [0, 0, 0, 1, 0],
            [0, 0, 0, 1, 1],
            [1, 0, 0, 0, 0],
        ];
        assert_eq!(sieve(&mut mask, 3), 3);
        assert_eq!(
            mask,
            array![
                [0u8, 0, 0, 0, 0],
                [0, 0, 0, 1, 0],
                [0, 0, 0, 1, 1],
                [0, 0, 0, 0, 0],
            ]
        );
    }

    #[test]
    fn test_mismatched_shapes_rejected() {
        let a = Array2::<f32>::zeros((2, 2));
        let b = Array2::<f32>::zeros((3, 3));
        assert!(thresholder().apply(&a, &a, &b).is_err());
    }
}
