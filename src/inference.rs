//! Shared ONNX Runtime session setup for the segmentation and pose models.

use anyhow::{anyhow, Result};
use ort::execution_providers::ExecutionProviderDispatch;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use std::path::Path;

/// Upper bound on intra-op threads per session; the two models share the
/// frame thread's time budget.
const MAX_INTRA_THREADS: usize = 4;

fn execution_providers() -> Vec<ExecutionProviderDispatch> {
    #[cfg(feature = "cuda")]
    {
        vec![ort::execution_providers::CUDAExecutionProvider::default().build()]
    }
    #[cfg(not(feature = "cuda"))]
    {
        vec![]
    }
}

/// Descriptor shown on the HUD's GPU line.
pub fn execution_provider_label() -> &'static str {
    if cfg!(feature = "cuda") {
        "ONNX Runtime / CUDA"
    } else {
        "ONNX Runtime / CPU"
    }
}

/// Build an inference session for the model at `path`.
pub fn load_session(path: &Path) -> Result<Session> {
    let threads = num_cpus::get().clamp(1, MAX_INTRA_THREADS);
    let session = Session::builder()
        .map_err(|e| anyhow!("Failed to create ONNX session builder: {e}"))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| anyhow!("Failed to set optimization level: {e}"))?
        .with_intra_threads(threads)
        .map_err(|e| anyhow!("Failed to set intra-op threads: {e}"))?
        .with_execution_providers(execution_providers())
        .map_err(|e| anyhow!("Failed to register execution providers: {e}"))?
        .commit_from_file(path)
        .map_err(|e| anyhow!("Failed to load model from {}: {e}", path.display()))?;

    tracing::debug!(threads, provider = execution_provider_label(), "ONNX session ready");
    Ok(session)
}
