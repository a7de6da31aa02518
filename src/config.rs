//! Pipeline tuning constants.
//!
//! Everything the pipeline tunes lives in one immutable [`PipelineConfig`]
//! built once at startup, either from defaults or from a TOML file where
//! any omitted field keeps its default.

use serde::Deserialize;
use std::fs;
use std::num::NonZeroU64;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub scheduler: SchedulerConfig,
    pub refine: RefineConfig,
    pub limbs: LimbConfig,
    pub compositor: CompositorConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Processing cadence cap, 1..=120
    pub target_fps: u32,
    /// Slack subtracted from the frame budget, ms, below one budget
    pub budget_tolerance_ms: f64,
    /// Run segmentation every Nth processed cycle
    pub seg_every: NonZeroU64,
    /// Run pose detection every Nth processed cycle
    pub pose_every: NonZeroU64,
    /// Width of the downsampled pose input, 32..=1024
    pub pose_input_width: u32,
    /// Weight of the previous value in the frame-time EMA, [0, 1)
    pub frame_time_smoothing: f64,
    /// Length of the fps / cpu window, ms
    pub stats_window_ms: f64,
}

/// Cadence constant; zero fails at compile time.
const fn every(n: u64) -> NonZeroU64 {
    match NonZeroU64::new(n) {
        Some(n) => n,
        None => panic!("cadence must be non-zero"),
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            target_fps: 30,
            budget_tolerance_ms: 0.5,
            seg_every: every(2),
            pose_every: every(3),
            pose_input_width: 256,
            frame_time_smoothing: 0.8,
            stats_window_ms: 1000.0,
        }
    }
}

impl SchedulerConfig {
    pub fn frame_budget_ms(&self) -> f64 {
        1000.0 / self.target_fps as f64
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RefineConfig {
    /// Outward edge softening of the display mask, px, [0, 64]
    pub edge_smooth_px: f32,
    /// Blur used to extract the halo ring, px, [0, 32]
    pub halo_blur_px: f32,
    /// Fraction of the halo ring removed from the display mask, [0, 1]
    pub halo_alpha: f32,
    /// Recompute the halo ring every Nth processed cycle
    pub halo_every: NonZeroU64,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            edge_smooth_px: 15.0,
            halo_blur_px: 3.0,
            halo_alpha: 1.0,
            halo_every: every(4),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LimbConfig {
    /// Landmarks at or below this visibility are ignored, [0, 1]
    pub visibility_threshold: f32,
    pub shoulder_keep_out: bool,
    pub keep_out_for_palms: bool,
    /// Keep-out radius as a fraction of shoulder width, [0, 2]
    pub keep_out_radius_k: f32,
    /// Feather applied to the forearm layer when merged, px
    pub arm_feather_px: f32,
    /// Feather applied to the hand layer when merged, px
    pub palm_feather_px: f32,
    /// Number of segments in a tapered forearm stroke, >= 1
    pub taper_steps: usize,
    pub palm_forward_k: f32,
    /// Hand semi-major axis bounds as fractions of frame width
    pub palm_semi_major_min: f32,
    pub palm_semi_major_max: f32,
    pub palm_minor_to_major: f32,
    pub palm_outline_scale: f32,
}

impl Default for LimbConfig {
    fn default() -> Self {
        Self {
            visibility_threshold: 0.2,
            shoulder_keep_out: true,
            keep_out_for_palms: true,
            keep_out_radius_k: 0.28,
            arm_feather_px: 8.0,
            palm_feather_px: 18.0,
            taper_steps: 18,
            palm_forward_k: 1.0,
            palm_semi_major_min: 0.10,
            palm_semi_major_max: 0.30,
            palm_minor_to_major: 0.5,
            palm_outline_scale: 0.94,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct CompositorConfig {
    /// Inward feather of the cutout, px, [0, 16]
    pub feather_inner_px: f32,
    /// Flat fill for the `color` background
    pub background_color: [u8; 3],
    /// Linear downscale factor for the `blur` background, >= 1
    pub blur_downscale: u32,
    pub blur_px: f32,
    /// Blur passes over the downscaled background, 1..=8
    pub blur_passes: u32,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            feather_inner_px: 1.0,
            background_color: [0x10, 0x13, 0x18],
            blur_downscale: 3,
            blur_px: 6.0,
            blur_passes: 2,
        }
    }
}

fn check(ok: bool, field: &'static str, reason: impl Into<String>) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: reason.into(),
        })
    }
}

fn in_range(value: f32, lo: f32, hi: f32) -> bool {
    value.is_finite() && value >= lo && value <= hi
}

impl PipelineConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.scheduler;
        check(
            (1..=120).contains(&s.target_fps),
            "scheduler.target_fps",
            "must be within 1..=120",
        )?;
        check(
            s.budget_tolerance_ms >= 0.0 && s.budget_tolerance_ms < s.frame_budget_ms(),
            "scheduler.budget_tolerance_ms",
            "must be non-negative and below the frame budget",
        )?;
        check(
            (32..=1024).contains(&s.pose_input_width),
            "scheduler.pose_input_width",
            "must be within 32..=1024",
        )?;
        check(
            (0.0..1.0).contains(&s.frame_time_smoothing),
            "scheduler.frame_time_smoothing",
            "must be within [0, 1)",
        )?;
        check(
            s.stats_window_ms > 0.0,
            "scheduler.stats_window_ms",
            "must be positive",
        )?;

        let r = &self.refine;
        check(
            in_range(r.edge_smooth_px, 0.0, 64.0),
            "refine.edge_smooth_px",
            "must be within [0, 64]",
        )?;
        check(
            in_range(r.halo_blur_px, 0.0, 32.0),
            "refine.halo_blur_px",
            "must be within [0, 32]",
        )?;
        check(
            in_range(r.halo_alpha, 0.0, 1.0),
            "refine.halo_alpha",
            "must be within [0, 1]",
        )?;

        let l = &self.limbs;
        check(
            in_range(l.visibility_threshold, 0.0, 1.0),
            "limbs.visibility_threshold",
            "must be within [0, 1]",
        )?;
        check(
            in_range(l.keep_out_radius_k, 0.0, 2.0),
            "limbs.keep_out_radius_k",
            "must be within [0, 2]",
        )?;
        check(
            in_range(l.arm_feather_px, 0.0, 64.0) && in_range(l.palm_feather_px, 0.0, 64.0),
            "limbs.*_feather_px",
            "must be within [0, 64]",
        )?;
        check(l.taper_steps >= 1, "limbs.taper_steps", "must be >= 1")?;
        check(
            in_range(l.palm_semi_major_min, 0.0, 1.0)
                && in_range(l.palm_semi_major_max, l.palm_semi_major_min, 1.0),
            "limbs.palm_semi_major_*",
            "must satisfy 0 <= min <= max <= 1",
        )?;
        check(
            in_range(l.palm_minor_to_major, 0.0, 1.0),
            "limbs.palm_minor_to_major",
            "must be within [0, 1]",
        )?;
        check(
            in_range(l.palm_outline_scale, 0.0, 1.0),
            "limbs.palm_outline_scale",
            "must be within [0, 1]",
        )?;

        let c = &self.compositor;
        check(
            in_range(c.feather_inner_px, 0.0, 16.0),
            "compositor.feather_inner_px",
            "must be within [0, 16]",
        )?;
        check(
            c.blur_downscale >= 1,
            "compositor.blur_downscale",
            "must be >= 1",
        )?;
        check(
            in_range(c.blur_px, 0.0, 64.0),
            "compositor.blur_px",
            "must be within [0, 64]",
        )?;
        check(
            (1..=8).contains(&c.blur_passes),
            "compositor.blur_passes",
            "must be within 1..=8",
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        PipelineConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = PipelineConfig::from_toml(
            r#"
            [scheduler]
            target_fps = 24
            seg_every = 1

            [refine]
            halo_alpha = 0.5
            "#,
        )
        .unwrap();
        assert_eq!(config.scheduler.target_fps, 24);
        assert_eq!(config.scheduler.seg_every.get(), 1);
        assert_eq!(config.scheduler.pose_every.get(), 3);
        assert_eq!(config.refine.halo_alpha, 0.5);
        assert_eq!(config.limbs, LimbConfig::default());
    }

    #[test]
    fn zero_cadence_is_rejected() {
        let err = PipelineConfig::from_toml("[scheduler]\npose_every = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        let err = PipelineConfig::from_toml("[refine]\nhalo_every = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn zero_blur_passes_are_rejected() {
        let err = PipelineConfig::from_toml("[compositor]\nblur_passes = 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "compositor.blur_passes",
                ..
            }
        ));
    }

    #[test]
    fn halo_alpha_out_of_range_is_rejected() {
        let mut config = PipelineConfig::default();
        config.refine.halo_alpha = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = PipelineConfig::from_toml("[scheduler\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[limbs]\nkeep_out_radius_k = 0.4").unwrap();
        let config = PipelineConfig::load(file.path()).unwrap();
        assert_eq!(config.limbs.keep_out_radius_k, 0.4);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = PipelineConfig::load("/nonexistent/stagecam.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/stagecam.toml"));
    }
}
