use crate::error::RenderError;

#[derive(Debug, Clone, Copy)]
pub struct MapStyle {
    pub width: u32,
    pub height: u32,
    pub padding: u32,
    pub stroke_width: f32,
}

impl Default for MapStyle {
    fn default() -> Self {
        // 10x8 inches at 150 dpi
        Self {
            width: 1500,
            height: 1200,
            padding: 40,
            stroke_width: 2.0,
        }
    }
}

/// SVG document with the track drawn as a red line over a white background.
/// `coords` are `(lat, lon)` pairs in travel order.
pub fn render_trace_svg(coords: &[(f64, f64)], style: &MapStyle) -> Result<String, RenderError> {
    if coords.is_empty() {
        return Err(RenderError::RenderFailed("No points to draw".to_string()));
    }

    let width = style.width as f64;
    let height = style.height as f64;
    let padding = style.padding as f64;
    let view_width = width - 2.0 * padding;
    let view_height = height - 2.0 * padding;
    if view_width <= 0.0 || view_height <= 0.0 {
        return Err(RenderError::RenderFailed("Invalid viewport size".to_string()));
    }

    let projected: Vec<(f64, f64)> = coords
        .iter()
        .map(|(lat, lon)| mercator_project(*lat, *lon))
        .collect();
    let fitted = fit_to_viewport(&projected, padding, view_width, view_height);

    let mut svg = String::new();
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = style.width,
        h = style.height
    ));
    svg.push_str(r#"<rect width="100%" height="100%" fill="white"/>"#);

    let distinct = fitted.windows(2).any(|pair| pair[0] != pair[1]);
    if distinct {
        let path = fitted
            .iter()
            .enumerate()
            .map(|(idx, (x, y))| {
                let cmd = if idx == 0 { 'M' } else { 'L' };
                format!("{cmd}{x:.2},{y:.2}")
            })
            .collect::<Vec<_>>()
            .join(" ");
        svg.push_str(&format!(
            r#"<path d="{}" fill="none" stroke="red" stroke-width="{:.1}" stroke-linecap="round" stroke-linejoin="round"/>"#,
            path, style.stroke_width
        ));
    } else {
        let (x, y) = fitted[0];
        svg.push_str(&format!(
            r#"<circle cx="{x:.2}" cy="{y:.2}" r="{:.1}" fill="red"/>"#,
            style.stroke_width
        ));
    }

    svg.push_str("</svg>");
    Ok(svg)
}

/// Spherical web mercator, both axes in radians.
fn mercator_project(lat: f64, lon: f64) -> (f64, f64) {
    let x = lon.to_radians();
    let y = (lat.to_radians().tan() + (1.0 / lat.to_radians().cos())).ln();
    (x, y)
}

/// Uniform scale so the trace keeps its shape, centered, with north up.
fn fit_to_viewport(
    points: &[(f64, f64)],
    padding: f64,
    view_width: f64,
    view_height: f64,
) -> Vec<(f64, f64)> {
    let min_x = points.iter().map(|(x, _)| *x).fold(f64::INFINITY, f64::min);
    let max_x = points.iter().map(|(x, _)| *x).fold(f64::NEG_INFINITY, f64::max);
    let min_y = points.iter().map(|(_, y)| *y).fold(f64::INFINITY, f64::min);
    let max_y = points.iter().map(|(_, y)| *y).fold(f64::NEG_INFINITY, f64::max);

    let range_x = max_x - min_x;
    let range_y = max_y - min_y;

    let scale = match (range_x > f64::EPSILON, range_y > f64::EPSILON) {
        (true, true) => (view_width / range_x).min(view_height / range_y),
        (true, false) => view_width / range_x,
        (false, true) => view_height / range_y,
        (false, false) => 0.0,
    };

    let offset_x = padding + (view_width - range_x * scale) / 2.0;
    let offset_y = padding + (view_height - range_y * scale) / 2.0;

    points
        .iter()
        .map(|(x, y)| (offset_x + (x - min_x) * scale, offset_y + (max_y - y) * scale))
        .collect()
}
