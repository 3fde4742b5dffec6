use macroquad::prelude::{
    clear_background, draw_circle, draw_line, draw_rectangle, draw_text, get_fps,
    get_screen_data, measure_text, screen_height, screen_width, set_camera, set_default_camera,
    Camera2D, Color, Rect,
};

use crate::config::SimulationConfig;
use crate::hypha::Tip;
use crate::simulation::ColonyStats;
use crate::types::{RenderSegment, Resource, Rgba};

const BACKGROUND: Color = Color::new(0.2, 0.1, 0.2, 1.0);
const GRADIENT_COLOR: Color = Color::new(0.0, 0.0, 1.0, 0.5);
const RESOURCE_COLOR: Color = Color::new(1.0, 0.85, 0.2, 0.9);
const MIN_LINE_WIDTH: f32 = 0.5;

fn to_color(c: Rgba) -> Color {
    Color::new(c.r, c.g, c.b, c.a)
}

/// Camera showing the whole simulation domain.
pub fn domain_camera(config: &SimulationConfig) -> Camera2D {
    Camera2D::from_display_rect(Rect::new(
        0.0,
        0.0,
        config.domain_width,
        config.domain_height,
    ))
}

pub fn set_world_camera(camera: &Camera2D) {
    set_camera(camera);
}

pub fn reset_camera() {
    set_default_camera();
}

pub fn clear_world() {
    clear_background(BACKGROUND);
}

pub fn draw_segments(segments: impl Iterator<Item = RenderSegment>) {
    for seg in segments {
        draw_line(
            seg.start.x,
            seg.start.y,
            seg.end.x,
            seg.end.y,
            seg.thickness.max(MIN_LINE_WIDTH),
            to_color(seg.color),
        );
    }
}

// Diagnostic overlay: last steering direction from each active head
pub fn draw_gradients(tips: &[Tip], length: f32) {
    for tip in tips.iter().filter(|t| t.active) {
        let head = tip.head();
        let end = head + tip.gradient * length;
        draw_line(head.x, head.y, end.x, end.y, 1.0, GRADIENT_COLOR);
    }
}

pub fn draw_resources(resources: &[Resource]) {
    for r in resources {
        draw_circle(r.position.x, r.position.y, 6.0, RESOURCE_COLOR);
    }
}

pub fn draw_stats_and_help(stats: &ColonyStats, paused: bool, speed: f32) {
    let text = format!(
        "Tips: {} active / {} frozen | Resources: {} | Indexed: {} | Speed: {:.1}x | FPS: {}{}",
        stats.active_tips,
        stats.frozen_tips,
        stats.resources,
        stats.indexed_points,
        speed,
        get_fps(),
        if paused { " [PAUSED]" } else { "" }
    );
    draw_rectangle(0.0, 0.0, screen_width(), 28.0, Color::new(0.0, 0.0, 0.0, 0.5));
    draw_text(&text, 10.0, 20.0, 20.0, Color::new(1.0, 1.0, 1.0, 0.9));

    let hint_text = "Press F1 for controls";
    let hint_font_size = 16.0;
    let hint_width = measure_text(hint_text, None, hint_font_size as u16, 1.0).width;
    draw_text(
        hint_text,
        screen_width() - hint_width - 10.0,
        screen_height() - 25.0,
        hint_font_size,
        Color::new(0.7, 0.7, 0.7, 0.6),
    );
}

pub fn draw_help_popup() {
    let lines = [
        "Right click  - spawn growth tip",
        "Left click   - spawn resource",
        "Space        - pause / resume",
        "R            - reset",
        "G            - toggle gradient overlay",
        "Shift+Left/Right - slower / faster",
        "0            - reset speed",
        "P            - screenshot",
        "F1           - close help",
        "Esc          - quit",
    ];
    let w = 420.0;
    let h = 40.0 + lines.len() as f32 * 24.0;
    let x = (screen_width() - w) / 2.0;
    let y = (screen_height() - h) / 2.0;
    draw_rectangle(x, y, w, h, Color::new(0.05, 0.05, 0.1, 0.9));
    for (i, line) in lines.iter().enumerate() {
        draw_text(
            line,
            x + 20.0,
            y + 36.0 + i as f32 * 24.0,
            20.0,
            Color::new(0.9, 0.9, 0.9, 1.0),
        );
    }
}

/// Capture a screenshot of the current screen
pub fn capture_screenshot(filename: &str) -> Result<(), Box<dyn std::error::Error>> {
    let screen_image = get_screen_data();

    let width = screen_image.width as u32;
    let height = screen_image.height as u32;
    let bytes = &screen_image.bytes;

    let mut img = image::RgbaImage::new(width, height);

    // OpenGL origin is bottom-left, image origin is top-left: flip rows
    for y in 0..height {
        for x in 0..width {
            let idx = (y * width + x) as usize * 4;
            if idx + 3 < bytes.len() {
                let px = [bytes[idx], bytes[idx + 1], bytes[idx + 2], bytes[idx + 3]];
                img.put_pixel(x, height - 1 - y, image::Rgba(px));
            }
        }
    }

    img.save(filename)?;

    Ok(())
}
