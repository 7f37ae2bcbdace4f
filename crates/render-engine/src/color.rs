//! CSS-style color parsing for text and shape overlays.

use montage_project_model::format_number;

/// Fill used when a shape color cannot be parsed (`#8f8cae`).
pub const DEFAULT_SHAPE_RGB: [u8; 3] = [143, 140, 174];

const NAMED_COLORS: &[(&str, [u8; 3])] = &[
    ("black", [0, 0, 0]),
    ("white", [255, 255, 255]),
    ("red", [255, 0, 0]),
    ("green", [0, 128, 0]),
    ("lime", [0, 255, 0]),
    ("blue", [0, 0, 255]),
    ("yellow", [255, 255, 0]),
    ("orange", [255, 165, 0]),
    ("purple", [128, 0, 128]),
    ("gray", [128, 128, 128]),
    ("grey", [128, 128, 128]),
];

/// Parse `#rgb`, `#rrggbb`, `rgb(r,g,b)`, `rgba(r,g,b,a)` or a basic color name.
///
/// Returns the color plus the alpha carried by an `rgba()` form.
pub fn parse_color(color: &str) -> Option<([u8; 3], Option<f64>)> {
    let c = color.trim().to_ascii_lowercase();

    if let Some(inner) = c.strip_prefix("rgba(").and_then(|s| s.strip_suffix(')')) {
        let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
        if parts.len() >= 4 {
            let rgb = parse_components(&parts[..3])?;
            let alpha = parts[3].parse::<f64>().ok()?.clamp(0.0, 1.0);
            return Some((rgb, Some(alpha)));
        }
        return None;
    }
    if let Some(inner) = c.strip_prefix("rgb(").and_then(|s| s.strip_suffix(')')) {
        let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
        if parts.len() >= 3 {
            return Some((parse_components(&parts[..3])?, None));
        }
        return None;
    }

    let hex = c.strip_prefix('#').unwrap_or(&c);
    if let Some(rgb) = parse_hex(hex) {
        return Some((rgb, None));
    }
    NAMED_COLORS
        .iter()
        .find(|(name, _)| *name == c)
        .map(|(_, rgb)| (*rgb, None))
}

fn parse_components(parts: &[&str]) -> Option<[u8; 3]> {
    let mut rgb = [0u8; 3];
    for (slot, part) in rgb.iter_mut().zip(parts) {
        let value = part.parse::<f64>().ok()?;
        *slot = value.round().clamp(0.0, 255.0) as u8;
    }
    Some(rgb)
}

fn parse_hex(hex: &str) -> Option<[u8; 3]> {
    if !hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return None;
    }
    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|ch| [ch, ch]).collect(),
        6 => hex.to_string(),
        _ => return None,
    };
    let byte = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).ok();
    Some([byte(0)?, byte(2)?, byte(4)?])
}

/// Render a color as an ffmpeg color with alpha (`0xrrggbb@a`).
///
/// An `rgba()` alpha wins over `alpha`. Unparseable input is passed through
/// with the alpha suffix so ffmpeg can try its own color names.
pub fn ffmpeg_color(color: &str, alpha: f64) -> String {
    let alpha = alpha.clamp(0.0, 1.0);
    if color.trim().is_empty() {
        return format!("black@{}", format_number(alpha));
    }
    match parse_color(color) {
        Some(([r, g, b], own_alpha)) => format!(
            "0x{r:02x}{g:02x}{b:02x}@{}",
            format_number(own_alpha.unwrap_or(alpha))
        ),
        None => format!("{}@{}", color.trim(), format_number(alpha)),
    }
}

/// RGBA fill for a rasterized shape; falls back to [`DEFAULT_SHAPE_RGB`].
pub fn shape_rgba(color: Option<&str>, alpha: f64) -> [u8; 4] {
    let [r, g, b] = color
        .and_then(parse_color)
        .map(|(rgb, _)| rgb)
        .unwrap_or(DEFAULT_SHAPE_RGB);
    [r, g, b, (alpha.clamp(0.0, 1.0) * 255.0) as u8]
}
