use std::path::{Path, PathBuf};

use tiny_skia::{Color, ColorU8, FilterQuality, Pixmap, PixmapPaint, Transform};

use crate::error::RenderError;
use crate::pipeline::render::{render_trace_svg, MapStyle};
use crate::types::track::EnrichedPoint;

const ROTATION_DEGREES: f32 = 10.0;
const SHIFT_PIXELS: i32 = 30;
const BRIGHTNESS_FACTOR: f32 = 1.2;

/// Files written for one saved track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapImages {
    pub base: PathBuf,
    pub rotated: PathBuf,
    pub shifted: PathBuf,
    pub bright: PathBuf,
}

/// Renders the trace map for `track_id` plus its three derived variants into `dir`.
pub fn write_track_maps(
    points: &[EnrichedPoint],
    track_id: i64,
    dir: &Path,
) -> Result<MapImages, RenderError> {
    let coords: Vec<(f64, f64)> = points.iter().map(|p| (p.lat, p.lon)).collect();
    let style = MapStyle::default();
    let svg = render_trace_svg(&coords, &style)?;
    let base = rasterize(&svg, style.width, style.height)?;

    std::fs::create_dir_all(dir)?;
    let images = MapImages {
        base: dir.join(format!("map{track_id}.png")),
        rotated: dir.join(format!("map{track_id}_rotated.png")),
        shifted: dir.join(format!("map{track_id}_shifted.png")),
        bright: dir.join(format!("map{track_id}_bright.png")),
    };

    write_png(&base, &images.base)?;
    write_png(&rotated(&base, ROTATION_DEGREES)?, &images.rotated)?;
    write_png(&shifted(&base, SHIFT_PIXELS)?, &images.shifted)?;
    write_png(&brightened(&base, BRIGHTNESS_FACTOR), &images.bright)?;

    Ok(images)
}

pub fn rasterize(svg: &str, width: u32, height: u32) -> Result<Pixmap, RenderError> {
    // traces carry no text, so an empty font database is enough
    let fontdb = usvg::fontdb::Database::new();
    let options = usvg::Options::default();
    let tree = usvg::Tree::from_str(svg, &options, &fontdb)
        .map_err(|e| RenderError::RenderFailed(format!("Failed to parse SVG: {}", e)))?;

    let mut pixmap = white_canvas(width, height)?;

    let transform = Transform::from_scale(
        width as f32 / tree.size().width(),
        height as f32 / tree.size().height(),
    );
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    Ok(pixmap)
}

/// Counter-clockwise rotation about the image center; uncovered corners are white.
pub fn rotated(src: &Pixmap, degrees: f32) -> Result<Pixmap, RenderError> {
    let mut out = white_canvas(src.width(), src.height())?;
    let cx = src.width() as f32 / 2.0;
    let cy = src.height() as f32 / 2.0;
    let paint = PixmapPaint {
        quality: FilterQuality::Bilinear,
        ..PixmapPaint::default()
    };
    // positive angles turn clockwise in screen space
    out.draw_pixmap(
        0,
        0,
        src.as_ref(),
        &paint,
        Transform::from_rotate_at(-degrees, cx, cy),
        None,
    );
    Ok(out)
}

/// Moves the image right by `dx` pixels, filling the exposed band with white.
pub fn shifted(src: &Pixmap, dx: i32) -> Result<Pixmap, RenderError> {
    let mut out = white_canvas(src.width(), src.height())?;
    out.draw_pixmap(
        dx,
        0,
        src.as_ref(),
        &PixmapPaint::default(),
        Transform::identity(),
        None,
    );
    Ok(out)
}

pub fn brightened(src: &Pixmap, factor: f32) -> Pixmap {
    let mut out = src.clone();
    let scale = |channel: u8| (channel as f32 * factor).round().clamp(0.0, 255.0) as u8;
    for pixel in out.pixels_mut() {
        let color = pixel.demultiply();
        *pixel = ColorU8::from_rgba(
            scale(color.red()),
            scale(color.green()),
            scale(color.blue()),
            color.alpha(),
        )
        .premultiply();
    }
    out
}

fn white_canvas(width: u32, height: u32) -> Result<Pixmap, RenderError> {
    let mut pixmap = Pixmap::new(width, height)
        .ok_or_else(|| RenderError::RenderFailed("Failed to create pixmap".to_string()))?;
    pixmap.fill(Color::WHITE);
    Ok(pixmap)
}

fn write_png(pixmap: &Pixmap, path: &Path) -> Result<(), RenderError> {
    let bytes = pixmap
        .encode_png()
        .map_err(|e| RenderError::RenderFailed(format!("Failed to encode PNG: {}", e)))?;
    std::fs::write(path, bytes)?;
    Ok(())
}
