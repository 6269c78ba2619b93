//! Clipped software drawing into an RGBA8 frame.

#[derive(Debug, Clone)]
pub(crate) struct LoadedSprite {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) rgba: Vec<u8>,
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SpriteStyle {
    pub(crate) scale: f32,
    pub(crate) flip_x: bool,
    pub(crate) tint: Option<[u8; 4]>,
}

pub(crate) fn write_pixel_rgba_clipped(frame: &mut [u8], width: u32, x: i32, y: i32, color: [u8; 4]) {
    if x < 0 || y < 0 || x >= width as i32 {
        return;
    }
    let Some(offset) = (y as usize)
        .checked_mul(width as usize)
        .and_then(|row| row.checked_add(x as usize))
        .and_then(|pixel| pixel.checked_mul(4))
    else {
        return;
    };
    if let Some(slot) = frame.get_mut(offset..offset + 4) {
        slot.copy_from_slice(&color);
    }
}

pub(crate) fn blend_pixel_clipped(frame: &mut [u8], width: u32, x: i32, y: i32, color: [u8; 4]) {
    if color[3] == 255 {
        write_pixel_rgba_clipped(frame, width, x, y, color);
        return;
    }
    if x < 0 || y < 0 || x >= width as i32 {
        return;
    }
    let offset = (y as usize * width as usize + x as usize) * 4;
    let Some(slot) = frame.get_mut(offset..offset + 4) else {
        return;
    };
    let alpha = color[3] as u32;
    for channel in 0..3 {
        let blended = (color[channel] as u32 * alpha + slot[channel] as u32 * (255 - alpha)) / 255;
        slot[channel] = blended as u8;
    }
    slot[3] = 255;
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn draw_filled_rect(
    frame: &mut [u8],
    width: u32,
    height: u32,
    x: i32,
    y: i32,
    rect_width: i32,
    rect_height: i32,
    color: [u8; 4],
) {
    let start_x = x.max(0);
    let start_y = y.max(0);
    let end_x = x.saturating_add(rect_width).min(width as i32);
    let end_y = y.saturating_add(rect_height).min(height as i32);
    for py in start_y..end_y {
        for px in start_x..end_x {
            blend_pixel_clipped(frame, width, px, py, color);
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn draw_rect_outline(
    frame: &mut [u8],
    width: u32,
    height: u32,
    x: i32,
    y: i32,
    rect_width: i32,
    rect_height: i32,
    color: [u8; 4],
) {
    if rect_width <= 1 || rect_height <= 1 {
        return;
    }
    let right = x + rect_width - 1;
    let bottom = y + rect_height - 1;
    draw_filled_rect(frame, width, height, x, y, rect_width, 1, color);
    draw_filled_rect(frame, width, height, x, bottom, rect_width, 1, color);
    draw_filled_rect(frame, width, height, x, y, 1, rect_height, color);
    draw_filled_rect(frame, width, height, right, y, 1, rect_height, color);
}

pub(crate) fn tint_color(color: [u8; 4], tint: Option<[u8; 4]>) -> [u8; 4] {
    let Some(tint) = tint else {
        return color;
    };
    let mut out = color;
    for channel in 0..3 {
        out[channel] = ((color[channel] as u16 * tint[channel] as u16) / 255) as u8;
    }
    out
}

fn normalized_scale(scale: f32) -> f32 {
    if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        1.0
    }
}

/// Nearest-neighbour blit centred on `(center_x, center_y)`.
pub(crate) fn draw_sprite_centered(
    frame: &mut [u8],
    width: u32,
    height: u32,
    center_x: i32,
    center_y: i32,
    sprite: &LoadedSprite,
    style: SpriteStyle,
) {
    if sprite.width == 0 || sprite.height == 0 || width == 0 || height == 0 {
        return;
    }
    if sprite.rgba.len() < sprite.width as usize * sprite.height as usize * 4 {
        return;
    }

    let scale = normalized_scale(style.scale);
    let scaled_w = (sprite.width as f32 * scale).round().max(1.0) as i32;
    let scaled_h = (sprite.height as f32 * scale).round().max(1.0) as i32;
    let left = center_x - scaled_w / 2;
    let top = center_y - scaled_h / 2;

    for out_y in top.max(0)..(top + scaled_h).min(height as i32) {
        let src_y = (((out_y - top) as f32 / scale) as u32).min(sprite.height - 1);
        for out_x in left.max(0)..(left + scaled_w).min(width as i32) {
            let mut src_x = (((out_x - left) as f32 / scale) as u32).min(sprite.width - 1);
            if style.flip_x {
                src_x = sprite.width - 1 - src_x;
            }
            let src = (src_y as usize * sprite.width as usize + src_x as usize) * 4;
            let texel = [
                sprite.rgba[src],
                sprite.rgba[src + 1],
                sprite.rgba[src + 2],
                sprite.rgba[src + 3],
            ];
            if texel[3] == 0 {
                continue;
            }
            blend_pixel_clipped(frame, width, out_x, out_y, tint_color(texel, style.tint));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_pixel_sprite() -> LoadedSprite {
        LoadedSprite {
            width: 2,
            height: 1,
            rgba: vec![255, 0, 0, 255, 0, 0, 255, 255],
        }
    }

    fn pixel(frame: &[u8], width: u32, x: usize, y: usize) -> [u8; 4] {
        let offset = (y * width as usize + x) * 4;
        [frame[offset], frame[offset + 1], frame[offset + 2], frame[offset + 3]]
    }

    #[test]
    fn out_of_bounds_writes_are_ignored() {
        let mut frame = vec![0; 4 * 4 * 4];
        write_pixel_rgba_clipped(&mut frame, 4, -1, 0, [255; 4]);
        write_pixel_rgba_clipped(&mut frame, 4, 4, 0, [255; 4]);
        write_pixel_rgba_clipped(&mut frame, 4, 0, 4, [255; 4]);
        draw_filled_rect(&mut frame, 4, 4, -10, -10, 100, 100, [9, 9, 9, 255]);
        assert!(frame.chunks_exact(4).all(|px| px == [9, 9, 9, 255]));
    }

    #[test]
    fn flipped_sprite_swaps_columns() {
        let mut frame = vec![0; 2 * 4];
        let style = SpriteStyle {
            scale: 1.0,
            flip_x: true,
            tint: None,
        };
        draw_sprite_centered(&mut frame, 2, 1, 1, 0, &two_pixel_sprite(), style);
        assert_eq!(pixel(&frame, 2, 0, 0), [0, 0, 255, 255]);
        assert_eq!(pixel(&frame, 2, 1, 0), [255, 0, 0, 255]);
    }

    #[test]
    fn tint_multiplies_channels() {
        assert_eq!(
            tint_color([200, 100, 50, 255], Some([255, 0, 0, 255])),
            [200, 0, 0, 255]
        );
        assert_eq!(tint_color([1, 2, 3, 4], None), [1, 2, 3, 4]);
    }

    #[test]
    fn scaled_sprite_covers_scaled_area() {
        let mut frame = vec![0; 4 * 2 * 4];
        let style = SpriteStyle {
            scale: 2.0,
            flip_x: false,
            tint: None,
        };
        draw_sprite_centered(&mut frame, 4, 2, 2, 1, &two_pixel_sprite(), style);
        assert_eq!(pixel(&frame, 4, 1, 1), [255, 0, 0, 255]);
        assert_eq!(pixel(&frame, 4, 2, 0), [0, 0, 255, 255]);
    }
}
