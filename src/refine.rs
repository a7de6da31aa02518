//! Mask refinement: softened display mask, halo suppression, limb merge.

use crate::config::{LimbConfig, RefineConfig};
use crate::limbs::{LimbCoverage, LimbReconstructor};
use crate::pose::PoseResult;
use crate::raster::{gaussian_blur, subtract_alpha, AlphaMask};

/// Turns a raw segmentation mask into the alpha used for compositing.
///
/// Every pass:
/// 1. `solid` keeps an untouched copy of the raw mask
/// 2. `display` = blur(solid, `edge_smooth_px`)
/// 3. every `halo_every` cycles, `ring` = blur(solid, `halo_blur_px`) with
///    `solid` cut out, cached in between
/// 4. `display *= 1 - halo_alpha * ring`
/// 5. limb and hand layers are unioned on top
///
/// All rasters are reused and only reallocated when the resolution changes.
pub struct MaskRefiner {
    config: RefineConfig,
    limbs: LimbReconstructor,
    solid: AlphaMask,
    display: AlphaMask,
    ring: AlphaMask,
    ring_valid: bool,
    scratch: Vec<f32>,
    coverage: LimbCoverage,
}

impl MaskRefiner {
    pub fn new(config: RefineConfig, limb_config: LimbConfig) -> Self {
        Self {
            config,
            limbs: LimbReconstructor::new(limb_config),
            solid: AlphaMask::new(0, 0),
            display: AlphaMask::new(0, 0),
            ring: AlphaMask::new(0, 0),
            ring_valid: false,
            scratch: Vec::new(),
            coverage: LimbCoverage::default(),
        }
    }

    /// Refine `raw` for processed cycle `cycle`, merging limbs from `pose`
    /// when one is cached.
    pub fn refine(&mut self, raw: &AlphaMask, pose: Option<&PoseResult>, cycle: u64) -> &AlphaMask {
        let _span = tracing::debug_span!("refine", cycle).entered();
        let (width, height) = raw.dimensions();

        if self.ring.ensure_size(width, height) {
            tracing::debug!(width, height, "refinement buffers reallocated");
            self.ring_valid = false;
        }

        self.solid.copy_from(raw);
        self.display.copy_from(raw);
        gaussian_blur(&mut self.display, self.config.edge_smooth_px, &mut self.scratch);

        if !self.ring_valid || cycle % self.config.halo_every.get() == 0 {
            self.recompute_ring();
        }
        subtract_alpha(&mut self.display, &self.ring, self.config.halo_alpha);

        self.coverage = match pose {
            Some(pose) => self.limbs.apply(pose, &mut self.display),
            None => LimbCoverage::default(),
        };

        &self.display
    }

    fn recompute_ring(&mut self) {
        self.ring.copy_from(&self.solid);
        gaussian_blur(&mut self.ring, self.config.halo_blur_px, &mut self.scratch);
        subtract_alpha(&mut self.ring, &self.solid, 1.0);
        self.ring_valid = true;
    }

    /// Output of the last [`refine`](Self::refine) call
    pub fn display(&self) -> &AlphaMask {
        &self.display
    }

    /// Cached halo ring
    pub fn ring(&self) -> &AlphaMask {
        &self.ring
    }

    /// Limbs merged by the last refinement
    pub fn coverage(&self) -> LimbCoverage {
        self.coverage
    }
}
