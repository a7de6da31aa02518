use image::RgbImage;

use super::font::{draw_text, fit_text};
use super::panel::Panel;
use crate::scheduler::PerfSnapshot;

const PAD: i32 = 12;
const MAX_WIDTH: i32 = 320;
const WIDTH_FRACTION: f32 = 0.36;
const BASE_HEIGHT: i32 = 146;
const GPU_LINE_HEIGHT: i32 = 16;
const RADIUS: f32 = 10.0;
const PANEL_ALPHA: f32 = 0.43;
const TEXT_SCALE: i32 = 2;
const WHITE: [u8; 3] = [255, 255, 255];

/// Top-right panel for a frame of `frame_width` pixels.
pub fn hud_panel(frame_width: u32, has_gpu: bool) -> Panel {
    let width = MAX_WIDTH.min((frame_width as f32 * WIDTH_FRACTION).round() as i32);
    Panel {
        x: frame_width as i32 - width - PAD,
        y: PAD,
        width,
        height: BASE_HEIGHT + if has_gpu { GPU_LINE_HEIGHT } else { 0 },
        radius: RADIUS,
    }
}

/// HUD text, one entry per line: text, alpha, gap below.
fn hud_lines(perf: &PerfSnapshot) -> Vec<(String, f32, i32)> {
    let frame = perf
        .frame_ms
        .map(|ms| format!("{ms:.1}"))
        .unwrap_or_else(|| "-".to_string());
    let mut cpu = format!("CPU (main): {}%", (perf.cpu_load * 100.0).round() as u32);
    if perf.cores > 0 {
        cpu.push_str(&format!("  cores: {}", perf.cores));
    }

    let mut lines = vec![
        (format!("FPS: {}   frame: {frame} ms", perf.fps), 1.0, 18),
        (cpu, 1.0, 16),
    ];
    if let Some(mb) = perf.memory_mb {
        lines.push((format!("Memory: {mb} MB"), 1.0, 18));
    }
    if let Some(gpu) = &perf.gpu {
        lines.push((format!("GPU: {gpu}"), 0.9, 18));
    }
    lines.push(("Press G to toggle HUD".to_string(), 0.7, 18));
    lines
}

pub fn draw_hud(img: &mut RgbImage, perf: &PerfSnapshot) {
    let panel = hud_panel(img.width(), perf.gpu.is_some());
    panel.fill(img, [0, 0, 0], PANEL_ALPHA);

    let x = panel.x + 12;
    let max_width = panel.width - 24;
    let mut y = panel.y + 10;
    for (text, alpha, gap) in hud_lines(perf) {
        let text = fit_text(&text, max_width, TEXT_SCALE);
        draw_text(img, x, y, &text, TEXT_SCALE, WHITE, alpha);
        y += gap;
    }
}
