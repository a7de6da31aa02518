//! Final frame assembly: background, masked foreground, overlays.

mod background;
mod font;
mod hud;
mod panel;

pub use background::{BackgroundMode, BackgroundState};

use background::BackgroundRenderer;
use hud::draw_hud;
use panel::Panel;

use image::RgbImage;

use crate::config::CompositorConfig;
use crate::raster::{gaussian_blur, masked_copy, AlphaMask};
use crate::scheduler::PerfSnapshot;
use crate::services::{OverlayText, PrivacyLevel};

const OVERLAY_MARGIN: i32 = 12;
const OVERLAY_PAD: i32 = 12;
const OVERLAY_LINE_HEIGHT: i32 = 16;
const OVERLAY_SCALE: i32 = 2;
const OVERLAY_RADIUS: f32 = 10.0;
const OVERLAY_ALPHA: f32 = 0.45;
const LOGO_GAP: i32 = 6;

/// User-selected state read at the start of every composite.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineState {
    pub background: BackgroundState,
    pub privacy: PrivacyLevel,
    pub overlay: OverlayText,
    pub hud_on: bool,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            background: BackgroundState::default(),
            privacy: PrivacyLevel::default(),
            overlay: OverlayText::default(),
            hud_on: true,
        }
    }
}

pub struct Compositor {
    config: CompositorConfig,
    state: PipelineState,
    background: BackgroundRenderer,
    cutout: AlphaMask,
    scratch: Vec<f32>,
    out: RgbImage,
}

impl Compositor {
    pub fn new(config: CompositorConfig) -> Self {
        Self {
            background: BackgroundRenderer::new(config.clone()),
            config,
            state: PipelineState::default(),
            cutout: AlphaMask::new(0, 0),
            scratch: Vec::new(),
            out: RgbImage::new(0, 0),
        }
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn set_background(&mut self, background: BackgroundState) {
        tracing::info!(mode = ?background.mode, "Background selected");
        self.state.background = background;
        self.background.invalidate();
    }

    /// Switch the privacy level along with the overlay rendered for it.
    /// `Hidden` always clears the overlay.
    pub fn set_privacy(&mut self, level: PrivacyLevel, overlay: OverlayText) {
        tracing::info!(%level, "Privacy level selected");
        self.state.privacy = level;
        self.state.overlay = if level == PrivacyLevel::Hidden {
            OverlayText::default()
        } else {
            overlay
        };
    }

    pub fn toggle_hud(&mut self) -> bool {
        self.state.hud_on = !self.state.hud_on;
        self.state.hud_on
    }

    /// Compose one output frame.
    ///
    /// `mask` is the refined alpha for `frame`; without one only the
    /// background is drawn.
    pub fn compose(
        &mut self,
        frame: &RgbImage,
        mask: Option<&AlphaMask>,
        perf: &PerfSnapshot,
    ) -> &RgbImage {
        let _span = tracing::debug_span!("composite").entered();
        let (width, height) = frame.dimensions();
        if self.out.dimensions() != (width, height) {
            self.out = RgbImage::new(width, height);
        }

        self.background
            .render(&self.state.background, frame, &mut self.out);

        if let Some(mask) = mask.filter(|m| m.dimensions() == (width, height)) {
            self.cutout.copy_from(mask);
            gaussian_blur(
                &mut self.cutout,
                self.config.feather_inner_px,
                &mut self.scratch,
            );
            masked_copy(&mut self.out, frame, &self.cutout);
        }

        if self.state.privacy != PrivacyLevel::Hidden && !self.state.overlay.is_empty() {
            draw_overlay(&mut self.out, &self.state.overlay);
        }
        if self.state.hud_on {
            draw_hud(&mut self.out, perf);
        }
        &self.out
    }

    /// Last composed frame
    pub fn output(&self) -> &RgbImage {
        &self.out
    }
}

/// Employee card in the bottom-left corner.
fn draw_overlay(img: &mut RgbImage, overlay: &OverlayText) {
    let lines: Vec<(&str, f32)> = overlay
        .slogan
        .iter()
        .map(|s| (s.as_str(), 0.9))
        .chain(overlay.lines.iter().map(|s| (s.as_str(), 1.0)))
        .collect();

    let max_text = img.width() as i32 - 2 * (OVERLAY_MARGIN + OVERLAY_PAD);
    let fitted: Vec<(String, f32)> = lines
        .iter()
        .map(|(text, alpha)| (font::fit_text(text, max_text, OVERLAY_SCALE), *alpha))
        .collect();
    let text_width = fitted
        .iter()
        .map(|(text, _)| font::text_width(text, OVERLAY_SCALE))
        .max()
        .unwrap_or(0);

    let logo_height = overlay
        .logo
        .as_ref()
        .map_or(0, |logo| logo.height() as i32 + LOGO_GAP);
    let logo_width = overlay.logo.as_ref().map_or(0, |logo| logo.width() as i32);
    let content_height = logo_height + fitted.len() as i32 * OVERLAY_LINE_HEIGHT;

    let panel = Panel {
        x: OVERLAY_MARGIN,
        y: img.height() as i32 - OVERLAY_MARGIN - content_height - 2 * OVERLAY_PAD,
        width: text_width.max(logo_width) + 2 * OVERLAY_PAD,
        height: content_height + 2 * OVERLAY_PAD,
        radius: OVERLAY_RADIUS,
    };
    panel.fill(img, [0, 0, 0], OVERLAY_ALPHA);

    let x = panel.x + OVERLAY_PAD;
    let mut y = panel.y + OVERLAY_PAD;
    if let Some(logo) = &overlay.logo {
        panel::blit(img, logo, x, y);
        y += logo_height;
    }
    for (text, alpha) in &fitted {
        font::draw_text(img, x, y, text, OVERLAY_SCALE, [255, 255, 255], *alpha);
        y += OVERLAY_LINE_HEIGHT;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    const FILL: Rgb<u8> = Rgb([0x10, 0x13, 0x18]);

    fn solid_frame(width: u32, height: u32, color: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb(color))
    }

    fn camera(width: u32, height: u32) -> RgbImage {
        solid_frame(width, height, [220, 180, 140])
    }

    fn compositor() -> Compositor {
        let mut c = Compositor::new(CompositorConfig::default());
        c.toggle_hud();
        c
    }

    #[test]
    fn no_mask_means_background_only() {
        let mut c = compositor();
        let out = c.compose(&camera(64, 48), None, &PerfSnapshot::default());
        assert!(out.pixels().all(|p| *p == FILL));
    }

    #[test]
    fn opaque_mask_shows_the_camera_inside() {
        let mut c = compositor();
        let mask = AlphaMask::from_fn(64, 48, |x, _| if x < 32 { 1.0 } else { 0.0 });
        let out = c.compose(&camera(64, 48), Some(&mask), &PerfSnapshot::default());
        assert_eq!(out.get_pixel(10, 24), &Rgb([220, 180, 140]));
        assert_eq!(out.get_pixel(60, 24), &FILL);
        // The 1 px feather softens the boundary.
        let edge = out.get_pixel(32, 24)[0];
        assert!(edge > FILL[0] && edge < 220);
    }

    #[test]
    fn mismatched_mask_is_ignored() {
        let mut c = compositor();
        let mask = AlphaMask::filled(32, 24, 1.0);
        let out = c.compose(&camera(64, 48), Some(&mask), &PerfSnapshot::default());
        assert!(out.pixels().all(|p| *p == FILL));
    }

    #[test]
    fn hud_toggle_is_observational() {
        let mut c = Compositor::new(CompositorConfig::default());
        assert!(c.state().hud_on);
        let with_hud = c.compose(&camera(320, 240), None, &PerfSnapshot::default()).clone();
        assert!(!c.toggle_hud());
        let without = c.compose(&camera(320, 240), None, &PerfSnapshot::default()).clone();
        assert_ne!(with_hud, without);
        assert!(without.pixels().all(|p| *p == FILL));
        // Away from the panel both agree.
        assert_eq!(with_hud.get_pixel(5, 230), without.get_pixel(5, 230));
    }

    #[test]
    fn overlay_is_drawn_bottom_left_unless_hidden() {
        let mut c = compositor();
        let overlay = OverlayText {
            lines: vec!["Ada Lovelace".into(), "Email: ada@example.com".into()],
            ..OverlayText::default()
        };
        c.set_privacy(PrivacyLevel::High, overlay.clone());
        let out = c.compose(&camera(320, 240), None, &PerfSnapshot::default()).clone();
        assert_ne!(out.get_pixel(40, 200), &FILL);
        assert_eq!(out.get_pixel(300, 10), &FILL);

        c.set_privacy(PrivacyLevel::Hidden, overlay);
        assert!(c.state().overlay.is_empty());
        let out = c.compose(&camera(320, 240), None, &PerfSnapshot::default());
        assert!(out.pixels().all(|p| *p == FILL));
    }

    #[test]
    fn background_selection_applies_on_next_frame() {
        let mut c = compositor();
        c.set_background(BackgroundState::image(solid_frame(8, 8, [1, 2, 3])));
        let out = c.compose(&camera(32, 24), None, &PerfSnapshot::default());
        assert_eq!(out.get_pixel(5, 5), &Rgb([1, 2, 3]));

        c.set_background(BackgroundState::color());
        let out = c.compose(&camera(32, 24), None, &PerfSnapshot::default());
        assert_eq!(out.get_pixel(5, 5), &FILL);
    }
}
