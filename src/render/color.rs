use image::Rgba;

const GOLDEN_ANGLE_DEGREES: f32 = 137.5;
const INSTANCE_SATURATION: f32 = 0.7;
const INSTANCE_LIGHTNESS: f32 = 0.5;

/// Hue for the `index`th instance, rotating by the golden angle so
/// neighbouring instances stay visually distinct.
pub fn golden_angle_hue(index: usize) -> f32 {
    (index as f32 * GOLDEN_ANGLE_DEGREES) % 360.0
}

pub fn instance_color(index: usize, alpha: u8) -> Rgba<u8> {
    let [r, g, b] = hsl_to_rgb(golden_angle_hue(index), INSTANCE_SATURATION, INSTANCE_LIGHTNESS);
    Rgba([r, g, b, alpha])
}

/// `hue` in degrees, `saturation` and `lightness` in `[0, 1]`.
pub fn hsl_to_rgb(hue: f32, saturation: f32, lightness: f32) -> [u8; 3] {
    let hue = hue.rem_euclid(360.0);
    let chroma = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let sector = hue / 60.0;
    let x = chroma * (1.0 - (sector % 2.0 - 1.0).abs());
    let (r, g, b) = match sector as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    let m = lightness - chroma / 2.0;
    let to_byte = |v: f32| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    [to_byte(r), to_byte(g), to_byte(b)]
}
