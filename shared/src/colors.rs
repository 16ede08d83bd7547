const DIVISION_SATURATION: f64 = 0.55;
const DIVISION_LIGHTNESS: f64 = 0.45;

/// Deterministic division color: CRC32 of the name picks the hue, saturation
/// and lightness are fixed so every division stays readable on white.
pub fn division_color(name: &str) -> (u8, u8, u8) {
    let hash = crc32fast::hash(name.trim().as_bytes());
    let hue = f64::from(hash % 360);
    hsl_to_rgb(hue, DIVISION_SATURATION, DIVISION_LIGHTNESS)
}

/// `#rrggbb` form of [`division_color`].
pub fn division_color_hex(name: &str) -> String {
    let (r, g, b) = division_color(name);
    format!("#{r:02x}{g:02x}{b:02x}")
}

/// Convert HSL to RGB.
pub fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (u8, u8, u8) {
    if s.abs() < f64::EPSILON {
        let v = (l * 255.0).round() as u8;
        return (v, v, v);
    }

    let q = if l < 0.5 {
        l * (1.0 + s)
    } else {
        l + s - l * s
    };
    let p = 2.0 * l - q;
    let h = h / 360.0;

    let r = hue_to_rgb(p, q, h + 1.0 / 3.0);
    let g = hue_to_rgb(p, q, h);
    let b = hue_to_rgb(p, q, h - 1.0 / 3.0);

    (
        (r * 255.0).round() as u8,
        (g * 255.0).round() as u8,
        (b * 255.0).round() as u8,
    )
}

fn hue_to_rgb(p: f64, q: f64, mut t: f64) -> f64 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 1.0 / 2.0 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}
