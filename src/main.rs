use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::Receiver;
use stagecam::capture::{CaptureSource, WebcamCapture};
use stagecam::config::PipelineConfig;
use stagecam::control::{ControlEvent, Controller};
use stagecam::output::{OutputSink, V4L2Output};
use stagecam::pipeline::Pipeline;
use stagecam::scheduler::FrameScheduler;
use stagecam::services::{BackgroundService, PrivacyLevel, PrivacyService};
use stagecam::{inference, pose, segmentation};
use std::time::{Duration, Instant};

/// Poll interval while the camera has no new frame
const FRAME_POLL: Duration = Duration::from_millis(2);

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input webcam device index
    #[arg(short, long, default_value_t = 0)]
    input_device: u32,

    /// Output v4l2loopback device path
    #[arg(short, long, default_value = "/dev/video10")]
    output_device: String,

    /// Capture resolution width
    #[arg(long, default_value_t = 1280)]
    capture_width: u32,

    /// Capture resolution height
    #[arg(long, default_value_t = 720)]
    capture_height: u32,

    /// Output resolution width
    #[arg(long, default_value_t = 1280)]
    output_width: u32,

    /// Output resolution height
    #[arg(long, default_value_t = 720)]
    output_height: u32,

    /// Target frames per second (overrides the config file)
    #[arg(long)]
    fps: Option<u32>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Path to the selfie segmentation model (ONNX file)
    #[arg(long)]
    seg_model: String,

    /// Path to the pose landmark model (ONNX file)
    #[arg(long)]
    pose_model: String,

    /// Show matte visualization (grayscale silhouette) instead of the composite
    #[arg(long)]
    show_matte: bool,

    /// TOML file with pipeline tuning
    #[arg(long)]
    config: Option<String>,

    /// Do not mirror the camera image
    #[arg(long)]
    no_mirror: bool,

    /// User whose backgrounds can be listed and uploaded
    #[arg(long)]
    user_id: Option<String>,

    /// Background service base URL
    #[arg(long, default_value = "http://127.0.0.1:8000")]
    api_url: String,

    /// Base URL of the `<level>_privacy.json` documents
    #[arg(long, default_value = "http://127.0.0.1:8000/privacy")]
    privacy_url: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path).context("Failed to load pipeline config")?,
        None => PipelineConfig::default(),
    };
    if let Some(fps) = args.fps {
        config.scheduler.target_fps = fps;
        config.validate().context("Invalid --fps")?;
    }

    tracing::info!("stagecam starting");
    tracing::info!("Capture: {}x{}", args.capture_width, args.capture_height);
    tracing::info!("Output: {}x{}", args.output_width, args.output_height);
    tracing::info!("Target FPS: {}", config.scheduler.target_fps);

    let mut capture = WebcamCapture::new(
        args.input_device,
        args.capture_width,
        args.capture_height,
        config.scheduler.target_fps,
        !args.no_mirror,
    )
    .context("Failed to initialize webcam capture")?;

    let mut output = V4L2Output::new(&args.output_device, args.output_width, args.output_height)
        .context("Failed to initialize v4l2loopback output")?;

    let segmenter = segmentation::create_default_model(&args.seg_model)
        .context("Failed to load segmentation model")?;
    let pose_model =
        pose::create_default_model(&args.pose_model).context("Failed to load pose model")?;
    tracing::info!("Models loaded ({})", inference::execution_provider_label());

    let controller = Controller::new(
        BackgroundService::new(&args.api_url, args.user_id.clone())
            .context("Failed to create background service client")?,
        PrivacyService::new(&args.privacy_url)
            .context("Failed to create privacy service client")?,
    );
    let mut pipeline = Pipeline::new(&config, segmenter, pose_model).with_matte_view(args.show_matte);
    pipeline.apply_control(controller.privacy_event(PrivacyLevel::default()));

    let (events_tx, events_rx) = crossbeam_channel::unbounded();
    controller
        .spawn(events_tx)
        .context("Failed to start control thread")?;

    run_pipeline(&mut capture, &mut output, &mut pipeline, &config, &events_rx)
}

fn run_pipeline<C, O>(
    capture: &mut C,
    output: &mut O,
    pipeline: &mut Pipeline,
    config: &PipelineConfig,
    events: &Receiver<ControlEvent>,
) -> Result<()>
where
    C: CaptureSource,
    O: OutputSink,
{
    let mut scheduler = FrameScheduler::new(config.scheduler.clone());
    scheduler.stats_mut().gpu = Some(inference::execution_provider_label().to_string());
    let origin = Instant::now();

    let (cw, ch) = capture.resolution();
    let (ow, oh) = output.resolution();
    tracing::info!("Starting main pipeline loop ({}x{} -> {}x{})", cw, ch, ow, oh);
    tracing::info!("Type `help` for commands, press Ctrl+C to stop");

    loop {
        for event in events.try_iter() {
            pipeline.apply_control(event);
        }

        if pipeline.step(capture, &mut scheduler, origin.elapsed())? {
            output
                .write_frame(pipeline.output())
                .context("Failed to write frame")?;
        }

        if scheduler.roll_window(origin.elapsed()) {
            let stats = scheduler.stats();
            tracing::info!(
                "Cycle {}: fps={}, frame={:.1}ms, cpu={:.0}%, mem={}MB",
                scheduler.cycle(),
                stats.fps,
                stats.frame_ms.unwrap_or(0.0),
                stats.cpu_load * 100.0,
                stats.memory_mb.map_or_else(|| "-".to_string(), |mb| mb.to_string())
            );
        }

        let wait = scheduler.time_until_next(origin.elapsed());
        if !wait.is_zero() {
            std::thread::sleep(wait);
        } else if !capture.is_ready() {
            std::thread::sleep(FRAME_POLL);
        }
    }
}
