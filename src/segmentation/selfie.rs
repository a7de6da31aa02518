use super::preprocess::{Preprocessor, TensorLayout};
use super::types::SegmentationModel;
use crate::inference::load_session;
use crate::raster::AlphaMask;
use anyhow::{anyhow, bail, Result};
use image::RgbImage;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;

/// Landscape selfie segmentation model (MediaPipe family, exported to ONNX)
///
/// Input: `[1, 144, 256, 3]` RGB in [0, 1]. Output: one or two channel
/// person probability (or logits) at the same resolution.
pub struct SelfieSegmenter {
    session: Session,
    preprocessor: Preprocessor,
    scale: OutputScale,
    width: u32,
    height: u32,
}

impl SelfieSegmenter {
    /// Default landscape input: 256x144
    pub const DEFAULT_INPUT: (u32, u32) = (256, 144);

    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let (width, height) = Self::DEFAULT_INPUT;
        Self::with_input_size(model_path, width, height)
    }

    pub fn with_input_size<P: AsRef<Path>>(model_path: P, width: u32, height: u32) -> Result<Self> {
        let path = model_path.as_ref();

        tracing::info!("Loading segmentation model from {}", path.display());

        let session = load_session(path)?;

        tracing::info!("Segmentation model loaded ({}x{} input)", width, height);

        Ok(Self {
            session,
            preprocessor: Preprocessor::new(width, height, TensorLayout::Nhwc),
            scale: OutputScale::default(),
            width,
            height,
        })
    }
}

impl SegmentationModel for SelfieSegmenter {
    fn segment(&mut self, frame: &RgbImage) -> Result<AlphaMask> {
        let _span = tracing::debug_span!("selfie_segment").entered();

        let input = self.preprocessor.preprocess(frame)?;
        let input_value =
            Tensor::from_array(input).map_err(|e| anyhow!("Failed to build input tensor: {e}"))?;

        let outputs = self
            .session
            .run(ort::inputs![input_value])
            .map_err(|e| anyhow!("Failed to run segmentation inference: {e}"))?;

        let output = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| anyhow!("Unexpected segmentation output: {e}"))?;
        let shape: Vec<usize> = output.shape().to_vec();
        let raw: Vec<f32> = output.iter().copied().collect();

        let expected = (self.width * self.height) as usize;
        let Some(mut values) = person_channel(expected, &shape, raw) else {
            bail!(
                "Segmentation output shape {:?} does not fit a {}x{} mask",
                shape,
                self.width,
                self.height
            );
        };

        self.scale.apply(&mut values);

        let (frame_width, frame_height) = frame.dimensions();
        Preprocessor::postprocess_mask(values, self.width, self.height, frame_width, frame_height)
    }

    fn input_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Pull the person channel out of a model output.
///
/// Handles `[1, H, W, 1]` / `[1, 1, H, W]` single channel outputs and
/// `[1, H, W, 2]` / `[1, 2, H, W]` background/person pairs.
pub(crate) fn person_channel(expected: usize, shape: &[usize], raw: Vec<f32>) -> Option<Vec<f32>> {
    if raw.len() == expected {
        Some(raw)
    } else if raw.len() == expected * 2 {
        let planar = shape.len() == 4 && shape[1] == 2;
        if planar {
            Some(raw[expected..].to_vec())
        } else {
            Some(raw.chunks_exact(2).map(|pair| pair[1]).collect())
        }
    } else {
        None
    }
}

/// Whether the model emits logits or probabilities.
///
/// Decided from the first output and kept for the session, so a frame whose
/// logits happen to stay near [0, 1] is not read differently.
#[derive(Debug, Default)]
pub(crate) struct OutputScale {
    logits: Option<bool>,
}

impl OutputScale {
    /// Map `values` to [0, 1] in place.
    pub(crate) fn apply(&mut self, values: &mut [f32]) {
        let logits = *self.logits.get_or_insert_with(|| {
            let logits = values.iter().any(|&v| !(-0.01..=1.01).contains(&v));
            tracing::debug!(logits, "Segmentation output scale detected");
            logits
        });
        for v in values.iter_mut() {
            if logits {
                *v = 1.0 / (1.0 + (-*v).exp());
            }
            *v = v.clamp(0.0, 1.0);
        }
    }
}
