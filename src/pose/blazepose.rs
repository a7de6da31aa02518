use super::landmarks::{Landmark, LandmarkIndex, PoseResult};
use super::PoseModel;
use crate::inference::load_session;
use crate::segmentation::{Preprocessor, TensorLayout};
use anyhow::{anyhow, bail, Result};
use image::RgbImage;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;

/// BlazePose model input resolution.
const INPUT_SIZE: u32 = 256;

/// Values per landmark in the model output: x, y, z, visibility, presence.
const VALUES_PER_LANDMARK: usize = 5;

/// Subject-present score below which the result is discarded.
const PRESENCE_THRESHOLD: f32 = 0.5;

/// BlazePose full-body landmark model exported to ONNX.
///
/// Outputs `[1, 195]` landmarks (39 x 5, pixel units of the 256x256 input)
/// and a `[1, 1]` subject-present score. Only the 33 body landmarks are kept.
pub struct BlazePoseLandmarker {
    session: Session,
    preprocessor: Preprocessor,
}

impl BlazePoseLandmarker {
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let path = model_path.as_ref();

        tracing::info!("Loading pose model from {}", path.display());

        let session = load_session(path)?;

        tracing::info!("Pose model loaded");

        Ok(Self {
            session,
            preprocessor: Preprocessor::new(INPUT_SIZE, INPUT_SIZE, TensorLayout::Nhwc),
        })
    }
}

impl PoseModel for BlazePoseLandmarker {
    fn detect(&mut self, frame: &RgbImage) -> Result<Option<PoseResult>> {
        let _span = tracing::debug_span!("blazepose_detect").entered();

        let input = self.preprocessor.preprocess(frame)?;
        let input_value =
            Tensor::from_array(input).map_err(|e| anyhow!("Failed to build input tensor: {e}"))?;

        let outputs = self
            .session
            .run(ort::inputs![input_value])
            .map_err(|e| anyhow!("Failed to run pose inference: {e}"))?;

        if outputs.len() < 2 {
            bail!("Pose model expected 2 outputs, got {}", outputs.len());
        }

        let landmarks: Vec<f32> = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| anyhow!("Unexpected landmark output: {e}"))?
            .iter()
            .copied()
            .collect();
        let presence: Vec<f32> = outputs[1]
            .try_extract_array::<f32>()
            .map_err(|e| anyhow!("Unexpected presence output: {e}"))?
            .iter()
            .copied()
            .collect();

        decode_landmarks(&landmarks, &presence, INPUT_SIZE as f32)
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Turn raw model outputs into a normalized [`PoseResult`].
///
/// Returns `Ok(None)` when the presence score says no subject is in view.
pub(crate) fn decode_landmarks(
    raw: &[f32],
    presence: &[f32],
    input_size: f32,
) -> Result<Option<PoseResult>> {
    let Some(&score) = presence.first() else {
        bail!("Pose presence output is empty");
    };
    if sigmoid(score) < PRESENCE_THRESHOLD {
        return Ok(None);
    }

    let needed = LandmarkIndex::COUNT * VALUES_PER_LANDMARK;
    if raw.len() < needed {
        bail!(
            "Pose landmark output has {} values, expected at least {}",
            raw.len(),
            needed
        );
    }

    let landmarks = raw[..needed]
        .chunks_exact(VALUES_PER_LANDMARK)
        .map(|v| Landmark::with_visibility(v[0] / input_size, v[1] / input_size, sigmoid(v[3])))
        .collect();

    Ok(Some(PoseResult::new(landmarks)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn raw_output(x: f32, y: f32, visibility_logit: f32) -> Vec<f32> {
        let mut raw = Vec::new();
        for _ in 0..39 {
            raw.extend_from_slice(&[x, y, 0.0, visibility_logit, 0.0]);
        }
        raw
    }

    #[test]
    fn absent_subject_yields_none() {
        let raw = raw_output(128.0, 128.0, 5.0);
        assert!(decode_landmarks(&raw, &[-4.0], 256.0).unwrap().is_none());
    }

    #[test]
    fn landmarks_are_normalized_and_truncated_to_body() {
        let raw = raw_output(64.0, 192.0, 0.0);
        let pose = decode_landmarks(&raw, &[4.0], 256.0).unwrap().unwrap();
        assert_eq!(pose.landmarks.len(), LandmarkIndex::COUNT);
        let lm = pose.landmarks[LandmarkIndex::LeftWrist as usize];
        assert_relative_eq!(lm.x, 0.25);
        assert_relative_eq!(lm.y, 0.75);
        assert_relative_eq!(lm.visibility.unwrap(), 0.5);
    }

    #[test]
    fn short_output_is_an_error() {
        assert!(decode_landmarks(&[0.0; 10], &[4.0], 256.0).is_err());
        assert!(decode_landmarks(&raw_output(0.0, 0.0, 0.0), &[], 256.0).is_err());
    }
}
