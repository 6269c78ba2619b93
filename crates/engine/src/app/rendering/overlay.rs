use crate::app::{HudBanner, LoopMetricsSnapshot};

use super::raster::{blend_pixel_clipped, draw_filled_rect, draw_rect_outline};

const GLYPH_WIDTH: i32 = 3;
const GLYPH_HEIGHT: i32 = 5;
const OVERLAY_TEXT_SCALE: i32 = 2;
const BANNER_TITLE_SCALE: i32 = 6;
const BANNER_SUBTITLE_SCALE: i32 = 3;
const OVERLAY_PADDING: i32 = 8;
const OVERLAY_TEXT_COLOR: [u8; 4] = [236, 240, 246, 255];
const OVERLAY_PANEL_BG_COLOR: [u8; 4] = [10, 12, 16, 200];
const OVERLAY_PANEL_BORDER_COLOR: [u8; 4] = [92, 106, 126, 255];
const BANNER_TITLE_COLOR: [u8; 4] = [255, 255, 255, 255];
const BANNER_SUBTITLE_COLOR: [u8; 4] = [210, 210, 220, 255];
const BANNER_SHADE_COLOR: [u8; 4] = [0, 0, 0, 150];

/// Engine-side facts shown in the debug overlay.
#[derive(Debug, Clone, Copy)]
pub(crate) struct OverlayData {
    pub(crate) metrics: LoopMetricsSnapshot,
    pub(crate) render_fps_cap: Option<u32>,
    pub(crate) slow_frame_delay_ms: u64,
    pub(crate) entity_count: usize,
}

pub(crate) fn overlay_lines(data: &OverlayData, scene_lines: &[String]) -> Vec<String> {
    let cap = data
        .render_fps_cap
        .map(|cap| cap.to_string())
        .unwrap_or_else(|| "off".to_string());
    let mut lines = vec![
        format!("fps {:.0} (cap {cap})", data.metrics.fps),
        format!("tps {:.0}", data.metrics.tps),
        format!("frame {:.1}ms", data.metrics.frame_time_ms),
        format!("entities {}", data.entity_count),
    ];
    if data.slow_frame_delay_ms > 0 {
        lines.push(format!("slow frame {}ms", data.slow_frame_delay_ms));
    }
    lines.extend(scene_lines.iter().cloned());
    lines
}

pub(crate) fn draw_overlay(frame: &mut [u8], width: u32, height: u32, lines: &[String]) {
    if lines.is_empty() {
        return;
    }
    let advance_x = (GLYPH_WIDTH + 1) * OVERLAY_TEXT_SCALE;
    let advance_y = (GLYPH_HEIGHT + 2) * OVERLAY_TEXT_SCALE;
    let widest = lines.iter().map(|line| line.chars().count()).max().unwrap_or(0) as i32;
    let panel_w = widest * advance_x + OVERLAY_PADDING * 2;
    let panel_h = lines.len() as i32 * advance_y + OVERLAY_PADDING * 2;
    let panel_x = width as i32 - panel_w - OVERLAY_PADDING;
    let panel_y = OVERLAY_PADDING;

    draw_filled_rect(
        frame,
        width,
        height,
        panel_x,
        panel_y,
        panel_w,
        panel_h,
        OVERLAY_PANEL_BG_COLOR,
    );
    draw_rect_outline(
        frame,
        width,
        height,
        panel_x,
        panel_y,
        panel_w,
        panel_h,
        OVERLAY_PANEL_BORDER_COLOR,
    );
    for (index, line) in lines.iter().enumerate() {
        draw_text_clipped(
            frame,
            width,
            height,
            panel_x + OVERLAY_PADDING,
            panel_y + OVERLAY_PADDING + index as i32 * advance_y,
            line,
            OVERLAY_TEXT_COLOR,
            OVERLAY_TEXT_SCALE,
        );
    }
}

/// Dims the whole frame and centres a title with a subtitle below it.
pub(crate) fn draw_banner(frame: &mut [u8], width: u32, height: u32, banner: &HudBanner) {
    draw_filled_rect(
        frame,
        width,
        height,
        0,
        0,
        width as i32,
        height as i32,
        BANNER_SHADE_COLOR,
    );
    let center_y = height as i32 / 2;
    let title_h = GLYPH_HEIGHT * BANNER_TITLE_SCALE;
    draw_text_centered(
        frame,
        width,
        height,
        center_y - title_h,
        &banner.title,
        BANNER_TITLE_COLOR,
        BANNER_TITLE_SCALE,
    );
    draw_text_centered(
        frame,
        width,
        height,
        center_y + BANNER_SUBTITLE_SCALE * 2,
        &banner.subtitle,
        BANNER_SUBTITLE_COLOR,
        BANNER_SUBTITLE_SCALE,
    );
}

pub(crate) fn text_width_px(text: &str, scale: i32) -> i32 {
    let count = text.chars().count() as i32;
    if count == 0 {
        return 0;
    }
    count * (GLYPH_WIDTH + 1) * scale - scale
}

#[allow(clippy::too_many_arguments)]
fn draw_text_centered(
    frame: &mut [u8],
    width: u32,
    height: u32,
    y: i32,
    text: &str,
    color: [u8; 4],
    scale: i32,
) {
    let x = (width as i32 - text_width_px(text, scale)) / 2;
    draw_text_clipped(frame, width, height, x, y, text, color, scale);
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn draw_text_clipped(
    frame: &mut [u8],
    width: u32,
    height: u32,
    x: i32,
    y: i32,
    text: &str,
    color: [u8; 4],
    scale: i32,
) {
    let scale = scale.max(1);
    for (index, ch) in text.chars().enumerate() {
        let origin_x = x + index as i32 * (GLYPH_WIDTH + 1) * scale;
        for (row, bits) in glyph_rows(ch).iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                    continue;
                }
                let px = origin_x + col * scale;
                let py = y + row as i32 * scale;
                if py >= height as i32 {
                    continue;
                }
                for sy in 0..scale {
                    for sx in 0..scale {
                        blend_pixel_clipped(frame, width, px + sx, py + sy, color);
                    }
                }
            }
        }
    }
}

/// 3x5 bitmap font, one byte per row with the low three bits used.
/// Lowercase letters share the uppercase shapes.
const FONT: &[(char, [u8; 5])] = &[
    (' ', [0b000, 0b000, 0b000, 0b000, 0b000]),
    ('A', [0b010, 0b101, 0b111, 0b101, 0b101]),
    ('B', [0b110, 0b101, 0b110, 0b101, 0b110]),
    ('C', [0b011, 0b100, 0b100, 0b100, 0b011]),
    ('D', [0b110, 0b101, 0b101, 0b101, 0b110]),
    ('E', [0b111, 0b100, 0b110, 0b100, 0b111]),
    ('F', [0b111, 0b100, 0b110, 0b100, 0b100]),
    ('G', [0b011, 0b100, 0b101, 0b101, 0b011]),
    ('H', [0b101, 0b101, 0b111, 0b101, 0b101]),
    ('I', [0b111, 0b010, 0b010, 0b010, 0b111]),
    ('J', [0b001, 0b001, 0b001, 0b101, 0b010]),
    ('K', [0b101, 0b101, 0b110, 0b101, 0b101]),
    ('L', [0b100, 0b100, 0b100, 0b100, 0b111]),
    ('M', [0b101, 0b111, 0b111, 0b101, 0b101]),
    ('N', [0b110, 0b101, 0b101, 0b101, 0b101]),
    ('O', [0b010, 0b101, 0b101, 0b101, 0b010]),
    ('P', [0b110, 0b101, 0b110, 0b100, 0b100]),
    ('Q', [0b010, 0b101, 0b101, 0b110, 0b011]),
    ('R', [0b110, 0b101, 0b110, 0b101, 0b101]),
    ('S', [0b011, 0b100, 0b010, 0b001, 0b110]),
    ('T', [0b111, 0b010, 0b010, 0b010, 0b010]),
    ('U', [0b101, 0b101, 0b101, 0b101, 0b111]),
    ('V', [0b101, 0b101, 0b101, 0b101, 0b010]),
    ('W', [0b101, 0b101, 0b111, 0b111, 0b101]),
    ('X', [0b101, 0b101, 0b010, 0b101, 0b101]),
    ('Y', [0b101, 0b101, 0b010, 0b010, 0b010]),
    ('Z', [0b111, 0b001, 0b010, 0b100, 0b111]),
    ('0', [0b111, 0b101, 0b101, 0b101, 0b111]),
    ('1', [0b010, 0b110, 0b010, 0b010, 0b111]),
    ('2', [0b110, 0b001, 0b010, 0b100, 0b111]),
    ('3', [0b110, 0b001, 0b010, 0b001, 0b110]),
    ('4', [0b101, 0b101, 0b111, 0b001, 0b001]),
    ('5', [0b111, 0b100, 0b110, 0b001, 0b110]),
    ('6', [0b011, 0b100, 0b111, 0b101, 0b111]),
    ('7', [0b111, 0b001, 0b010, 0b010, 0b010]),
    ('8', [0b111, 0b101, 0b111, 0b101, 0b111]),
    ('9', [0b111, 0b101, 0b111, 0b001, 0b110]),
    ('!', [0b010, 0b010, 0b010, 0b000, 0b010]),
    ('?', [0b110, 0b001, 0b010, 0b000, 0b010]),
    (':', [0b000, 0b010, 0b000, 0b010, 0b000]),
    ('.', [0b000, 0b000, 0b000, 0b000, 0b010]),
    (',', [0b000, 0b000, 0b000, 0b010, 0b100]),
    ('\'', [0b010, 0b010, 0b000, 0b000, 0b000]),
    ('-', [0b000, 0b000, 0b111, 0b000, 0b000]),
    ('+', [0b000, 0b010, 0b111, 0b010, 0b000]),
    ('=', [0b000, 0b111, 0b000, 0b111, 0b000]),
    ('_', [0b000, 0b000, 0b000, 0b000, 0b111]),
    ('/', [0b001, 0b001, 0b010, 0b100, 0b100]),
    ('%', [0b101, 0b001, 0b010, 0b100, 0b101]),
    ('(', [0b001, 0b010, 0b010, 0b010, 0b001]),
    (')', [0b100, 0b010, 0b010, 0b010, 0b100]),
];

const UNKNOWN_GLYPH: [u8; 5] = [0b111, 0b101, 0b101, 0b101, 0b111];

fn glyph_rows(ch: char) -> [u8; 5] {
    let upper = ch.to_ascii_uppercase();
    FONT.iter()
        .find(|(glyph, _)| *glyph == upper)
        .map(|(_, rows)| *rows)
        .unwrap_or(UNKNOWN_GLYPH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banner_strings_have_glyphs() {
        for text in [
            "You win!",
            "Thanks for playing! :)",
            "You died!",
            "Press R to start again!",
        ] {
            for ch in text.chars() {
                let upper = ch.to_ascii_uppercase();
                assert!(
                    FONT.iter().any(|(glyph, _)| *glyph == upper),
                    "missing glyph {ch:?} in {text:?}"
                );
            }
        }
    }

    #[test]
    fn text_width_accounts_for_scale_and_spacing() {
        assert_eq!(text_width_px("", 3), 0);
        assert_eq!(text_width_px("A", 1), 3);
        assert_eq!(text_width_px("AB", 2), 14);
    }

    #[test]
    fn text_drawing_near_edges_never_panics() {
        let mut frame = vec![0; 8 * 8 * 4];
        draw_text_clipped(&mut frame, 8, 8, -5, -5, "HELLO", [255; 4], 3);
        draw_text_clipped(&mut frame, 8, 8, 6, 6, "HELLO", [255; 4], 3);
        draw_text_clipped(&mut frame, 0, 0, 0, 0, "HELLO", [255; 4], 1);
    }

    #[test]
    fn overlay_lines_include_scene_lines_last() {
        let data = OverlayData {
            metrics: LoopMetricsSnapshot {
                fps: 59.6,
                tps: 60.0,
                frame_time_ms: 16.7,
            },
            render_fps_cap: None,
            slow_frame_delay_ms: 0,
            entity_count: 7,
        };
        let lines = overlay_lines(&data, &["state running".to_string()]);

        assert_eq!(lines[0], "fps 60 (cap off)");
        assert_eq!(lines[3], "entities 7");
        assert_eq!(lines.last().map(String::as_str), Some("state running"));
    }

    #[test]
    fn banner_writes_pixels() {
        let mut frame = vec![0; 200 * 120 * 4];
        draw_banner(
            &mut frame,
            200,
            120,
            &HudBanner {
                title: "You win!".to_string(),
                subtitle: "Thanks".to_string(),
            },
        );
        assert!(frame
            .chunks_exact(4)
            .any(|px| px == BANNER_TITLE_COLOR));
    }
}
