use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use image::{Rgb, RgbImage};
use stagecam::compositor::BackgroundState;
use stagecam::config::PipelineConfig;
use stagecam::control::{ControlEvent, Controller};
use stagecam::pipeline::Pipeline;
use stagecam::pose::{Landmark, LandmarkIndex, PoseModel, PoseResult};
use stagecam::raster::AlphaMask;
use stagecam::scheduler::{FrameScheduler, PerfSnapshot, Tick};
use stagecam::segmentation::SegmentationModel;
use stagecam::services::{BackgroundService, PrivacyLevel, PrivacyService};

const FILL: Rgb<u8> = Rgb([0x10, 0x13, 0x18]);

/// Segmenter returning a centered disk, counting its calls.
struct DiskSegmenter {
    calls: Arc<AtomicUsize>,
}

impl SegmentationModel for DiskSegmenter {
    fn segment(&mut self, frame: &RgbImage) -> Result<AlphaMask> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (w, h) = frame.dimensions();
        let (cx, cy, r) = (w as f32 / 2.0, h as f32 / 2.0, h as f32 / 4.0);
        Ok(AlphaMask::from_fn(w, h, |x, y| {
            let (dx, dy) = (x as f32 + 0.5 - cx, y as f32 + 0.5 - cy);
            if dx * dx + dy * dy <= r * r {
                1.0
            } else {
                0.0
            }
        }))
    }

    fn input_size(&self) -> (u32, u32) {
        (256, 144)
    }
}

/// Segmenter that never finds anyone.
struct EmptySegmenter;

impl SegmentationModel for EmptySegmenter {
    fn segment(&mut self, frame: &RgbImage) -> Result<AlphaMask> {
        Ok(AlphaMask::new(frame.width(), frame.height()))
    }

    fn input_size(&self) -> (u32, u32) {
        (256, 144)
    }
}

struct FixedPose {
    pose: Option<PoseResult>,
    calls: Arc<AtomicUsize>,
}

impl PoseModel for FixedPose {
    fn detect(&mut self, _frame: &RgbImage) -> Result<Option<PoseResult>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.pose.clone())
    }
}

fn camera() -> RgbImage {
    RgbImage::from_pixel(320, 240, Rgb([220, 180, 140]))
}

/// Left arm raised into view at half confidence, right arm hidden.
fn left_hand_pose() -> PoseResult {
    let mut landmarks = vec![Landmark::with_visibility(0.5, 0.5, 0.0); LandmarkIndex::COUNT];
    let mut set = |index: LandmarkIndex, x: f32, y: f32, visibility: f32| {
        landmarks[index as usize] = Landmark::with_visibility(x, y, visibility);
    };
    set(LandmarkIndex::LeftShoulder, 0.40, 0.35, 0.9);
    set(LandmarkIndex::RightShoulder, 0.60, 0.35, 0.9);
    set(LandmarkIndex::LeftElbow, 0.25, 0.55, 0.5);
    set(LandmarkIndex::LeftWrist, 0.20, 0.75, 0.5);
    set(LandmarkIndex::LeftIndex, 0.17, 0.85, 0.5);
    set(LandmarkIndex::LeftPinky, 0.22, 0.86, 0.5);
    PoseResult::new(landmarks)
}

#[test]
fn decimation_over_six_cycles() {
    let seg_calls = Arc::new(AtomicUsize::new(0));
    let pose_calls = Arc::new(AtomicUsize::new(0));
    let config = PipelineConfig::default();
    let mut pipeline = Pipeline::new(
        &config,
        Box::new(DiskSegmenter {
            calls: seg_calls.clone(),
        }),
        Box::new(FixedPose {
            pose: None,
            calls: pose_calls.clone(),
        }),
    );
    let mut scheduler = FrameScheduler::new(config.scheduler.clone());

    let frame = camera();
    let mut drawn = Vec::new();
    for i in 0..6u64 {
        let ts = Duration::from_millis(i * 34);
        match scheduler.tick(ts, true) {
            Tick::Process(plan) => {
                drawn.push(pipeline.run_cycle(&frame, &plan, &PerfSnapshot::default()));
                scheduler.finish_cycle(Duration::from_millis(5));
            }
            Tick::Skip(reason) => panic!("tick {i} skipped: {reason:?}"),
        }
    }

    assert_eq!(scheduler.cycle(), 6);
    assert_eq!(seg_calls.load(Ordering::SeqCst), 3);
    assert_eq!(pose_calls.load(Ordering::SeqCst), 2);
    // Background-only first cycle, then a redraw on every segmentation delivery.
    assert_eq!(drawn, vec![true, true, false, true, false, true]);
}

#[test]
fn color_background_without_a_person_is_flat() {
    let mut pipeline = Pipeline::new(
        &PipelineConfig::default(),
        Box::new(EmptySegmenter),
        Box::new(FixedPose {
            pose: None,
            calls: Arc::default(),
        }),
    );
    pipeline.apply_control(ControlEvent::ToggleHud);
    pipeline.apply_control(ControlEvent::Background(BackgroundState::color()));

    for cycle in 1..=4 {
        let plan = stagecam::scheduler::CyclePlan {
            cycle,
            run_segmentation: true,
            run_pose: true,
        };
        pipeline.run_cycle(&camera(), &plan, &PerfSnapshot::default());
        assert!(pipeline.output().pixels().all(|p| *p == FILL));
    }
}

#[test]
fn half_confidence_hand_is_merged_into_the_mask() {
    let mut pipeline = Pipeline::new(
        &PipelineConfig::default(),
        Box::new(EmptySegmenter),
        Box::new(FixedPose {
            pose: Some(left_hand_pose()),
            calls: Arc::default(),
        }),
    );
    let frame = camera();
    let plan = |cycle, run_segmentation, run_pose| stagecam::scheduler::CyclePlan {
        cycle,
        run_segmentation,
        run_pose,
    };
    // Pose lands first; the next segmentation delivery draws with it.
    pipeline.run_cycle(&frame, &plan(1, false, true), &PerfSnapshot::default());
    assert!(pipeline.latest_pose().is_some());
    assert!(!pipeline.refiner().coverage().any());
    pipeline.run_cycle(&frame, &plan(2, true, false), &PerfSnapshot::default());

    let coverage = pipeline.refiner().coverage();
    assert!(coverage.left_forearm);
    assert!(coverage.left_palm);
    assert!(!coverage.right_forearm);
    assert!(!coverage.right_palm);

    let display = pipeline.refiner().display();
    // Around the hand, between wrist and fingertips.
    let hand = display.get((0.19 * 320.0) as u32, (0.80 * 240.0) as u32);
    assert!(hand > 0.5, "hand alpha {hand}");
    // Nothing reaches up to the shoulder.
    assert_eq!(display.get(128, 84), 0.0);
    // The hidden right side contributes nothing.
    assert_eq!(display.get(250, 200), 0.0);
}

/// Serve one HTTP response on a local port; returns the base URL.
fn serve_once(path: &'static str, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut request_line = String::new();
        reader.read_line(&mut request_line).unwrap();
        loop {
            let mut header = String::new();
            reader.read_line(&mut header).unwrap();
            if header == "\r\n" || header.is_empty() {
                break;
            }
        }
        let (status, body) = if request_line.contains(path) {
            ("200 OK", body)
        } else {
            ("404 Not Found", "")
        };
        let mut stream = stream;
        write!(
            stream,
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
        .unwrap();
    });
    format!("http://{addr}/privacy")
}

#[test]
fn privacy_document_becomes_the_overlay() {
    let base = serve_once(
        "/privacy/high_privacy.json",
        r#"{"employee": {
            "full_name": "Ada Lovelace",
            "position": "Analyst",
            "company": "",
            "contact": {"email": "ada@example.com"},
            "branding": {"slogan": "Poetical\\nscience"}
        }}"#,
    );
    let controller = Controller::new(
        BackgroundService::new("http://127.0.0.1:9", None).unwrap(),
        PrivacyService::new(base).unwrap(),
    );

    let mut pipeline = Pipeline::new(
        &PipelineConfig::default(),
        Box::new(EmptySegmenter),
        Box::new(FixedPose {
            pose: None,
            calls: Arc::default(),
        }),
    );
    pipeline.apply_control(ControlEvent::ToggleHud);
    pipeline.apply_control(controller.privacy_event(PrivacyLevel::High));

    let state = pipeline.compositor().state();
    assert_eq!(state.privacy, PrivacyLevel::High);
    assert_eq!(state.overlay.slogan, vec!["Poetical", "science"]);
    assert_eq!(
        state.overlay.lines,
        vec!["Ada Lovelace", "Analyst", "Email: ada@example.com"]
    );

    let plan = stagecam::scheduler::CyclePlan {
        cycle: 1,
        run_segmentation: false,
        run_pose: false,
    };
    pipeline.run_cycle(&camera(), &plan, &PerfSnapshot::default());
    // Card in the bottom-left corner only.
    assert_ne!(pipeline.output().get_pixel(40, 200), &FILL);
    assert_eq!(pipeline.output().get_pixel(300, 20), &FILL);
}
