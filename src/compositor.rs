//! # Image Compositing Module
//!
//! Questo modulo crea la cover e il collage 2x2 di una cartella.
//!
//! ## Caratteristiche
//! - **Aspect ratio**: fisso, dalla prima candidata, dalla prima immagine della cartella, o manuale "W:H"
//! - **Fit**: larghezza da altezza, altezza da larghezza, o fit-within nel box configurato
//! - **Dimensioni pari**: sempre quando è richiesto il collage (quadranti esatti)
//! - **Resize-and-pad**: immagine in letterbox centrata su uno sfondo sfocato della stessa immagine
//! - **Collage**: quattro quadranti `w/2 x h/2`, ordine TL, TR, BL, BR
//! - **Qualità**: JPEG salvati alla qualità massima
//! - **Limiti**: lato massimo `MAX_DIMENSION`, area massima `MAX_PIXELS`; oltre, la composizione fallisce con `PackError::Config`
//!
//! ## Sfondo sfocato
//! Lo sfondo full-bleed viene costruito a risoluzione ridotta (`BACKDROP_DOWNSCALE`),
//! sfocato con un Gaussian blur forte e riportato alla dimensione di destinazione.
//!
//! ## Naming
//! ```text
//! cover + collage:  <nome>_cover.jpg, <nome>_collage.jpg
//! solo uno dei due: <nome>.jpg
//! ```

use crate::config::{AspectMode, Config, FitMode};
use crate::error::PackError;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Encoding quality for composites
pub const JPEG_QUALITY: u8 = 100;

/// Largest side of a composite (JPEG limit, kept even)
pub const MAX_DIMENSION: u32 = 65_534;
/// Largest area of a composite
pub const MAX_PIXELS: u64 = 100_000_000;

/// Backdrop is blurred at 1/BACKDROP_DOWNSCALE of the target size
const BACKDROP_DOWNSCALE: u32 = 8;
/// Gaussian sigma applied at backdrop resolution
const BLUR_SIGMA: f32 = 6.0;

/// Output resolution of a composition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositionTarget {
    pub width: u32,
    pub height: u32,
}

/// Parse a "W:H" ratio into width/height
pub fn parse_ratio(value: &str) -> Option<f64> {
    let (w, h) = value.trim().split_once(':')?;
    let w: f64 = w.trim().parse().ok()?;
    let h: f64 = h.trim().parse().ok()?;
    (w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0).then(|| w / h)
}

fn ratio_of(path: &Path) -> Option<f64> {
    match image::image_dimensions(path) {
        Ok((w, h)) if w > 0 && h > 0 => Some(w as f64 / h as f64),
        Ok(_) => None,
        Err(e) => {
            warn!(path = %path.display(), "Cannot read image dimensions: {}", e);
            None
        }
    }
}

/// Target aspect ratio for the configured mode, falling back to the fixed box
pub fn resolve_ratio(
    config: &Config,
    first_candidate: Option<&Path>,
    first_folder_image: Option<&Path>,
) -> f64 {
    let fixed = config.width as f64 / config.height as f64;

    let resolved = match config.aspect_mode {
        AspectMode::Fixed => None,
        AspectMode::FirstCandidate => first_candidate.and_then(ratio_of),
        AspectMode::FirstFolderImage => first_folder_image.and_then(ratio_of),
        AspectMode::Manual => config.manual_ratio.as_deref().and_then(parse_ratio),
    };

    match resolved {
        Some(ratio) => {
            debug!(mode = ?config.aspect_mode, ratio, "Resolved aspect ratio");
            ratio
        }
        None => {
            if config.aspect_mode != AspectMode::Fixed {
                warn!(mode = ?config.aspect_mode, "Aspect ratio unavailable, using fixed size");
            }
            fixed
        }
    }
}

fn round_dimension(value: f64, even: bool) -> u32 {
    if even {
        ((value / 2.0).round() as u32).max(1) * 2
    } else {
        (value.round() as u32).max(1)
    }
}

/// Fit the `max_width` x `max_height` box to `ratio`.
///
/// With `even` both sides are rounded to the nearest even number.
/// `None` when a side exceeds `MAX_DIMENSION` or the area exceeds `MAX_PIXELS`.
pub fn fit_dimensions(max_width: u32, max_height: u32, ratio: f64, fit: FitMode, even: bool) -> Option<CompositionTarget> {
    if !ratio.is_finite() || ratio <= 0.0 {
        return None;
    }
    let (w, h) = (max_width as f64, max_height as f64);

    let (width, height) = match fit {
        FitMode::WidthFromHeight => (h * ratio, h),
        FitMode::HeightFromWidth => (w, w / ratio),
        FitMode::FitWithin => {
            if w / h > ratio {
                (h * ratio, h)
            } else {
                (w, w / ratio)
            }
        }
    };

    let limit = MAX_DIMENSION as f64;
    if !(width.is_finite() && height.is_finite()) || width > limit || height > limit {
        return None;
    }

    let target = CompositionTarget {
        width: round_dimension(width, even),
        height: round_dimension(height, even),
    };
    let fits = target.width <= MAX_DIMENSION
        && target.height <= MAX_DIMENSION
        && target.width as u64 * target.height as u64 <= MAX_PIXELS;
    fits.then_some(target)
}

/// Composition target for a folder
pub fn resolve_target(
    config: &Config,
    collage: bool,
    first_candidate: Option<&Path>,
    first_folder_image: Option<&Path>,
) -> Result<CompositionTarget, PackError> {
    let ratio = resolve_ratio(config, first_candidate, first_folder_image);
    let target = fit_dimensions(config.width, config.height, ratio, config.fit_mode, collage).ok_or_else(|| {
        PackError::Config(format!(
            "Aspect ratio {:.4} on a {}x{} box exceeds {} px per side or {} px in total",
            ratio, config.width, config.height, MAX_DIMENSION, MAX_PIXELS
        ))
    })?;
    info!("Composition target: {}x{}", target.width, target.height);
    Ok(target)
}

/// Size of `source` scaled to fit entirely inside `bounds`
pub fn letterbox_dimensions(source: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = (source.0.max(1) as f64, source.1.max(1) as f64);
    let (box_w, box_h) = bounds;
    let scale = (box_w as f64 / src_w).min(box_h as f64 / src_h);

    let w = ((src_w * scale).round() as u32).clamp(1, box_w.max(1));
    let h = ((src_h * scale).round() as u32).clamp(1, box_h.max(1));
    (w, h)
}

fn blurred_backdrop(image: &DynamicImage, width: u32, height: u32) -> RgbImage {
    let small_w = (width / BACKDROP_DOWNSCALE).max(1);
    let small_h = (height / BACKDROP_DOWNSCALE).max(1);

    let fill = image.resize_to_fill(small_w, small_h, FilterType::Triangle).to_rgb8();
    let blurred = imageops::blur(&fill, BLUR_SIGMA);
    imageops::resize(&blurred, width, height, FilterType::Triangle)
}

/// Letterbox `image` into `width` x `height` over a blurred copy of itself
pub fn compose_padded(image: &DynamicImage, width: u32, height: u32) -> RgbImage {
    let mut canvas = blurred_backdrop(image, width, height);

    let (fit_w, fit_h) = letterbox_dimensions((image.width(), image.height()), (width, height));
    let fitted = image.resize_exact(fit_w, fit_h, FilterType::Lanczos3).to_rgb8();

    let x = (width - fit_w) / 2;
    let y = (height - fit_h) / 2;
    imageops::overlay(&mut canvas, &fitted, x as i64, y as i64);
    canvas
}

fn save_jpeg(image: &RgbImage, output: &Path) -> Result<(), PackError> {
    let mut writer = BufWriter::new(File::create(output)?);
    JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY).encode_image(image)?;
    Ok(())
}

/// Cover/collage file names for a folder
pub fn output_names(folder_name: &str, cover: bool, collage: bool) -> (Option<String>, Option<String>) {
    match (cover, collage) {
        (true, true) => (
            Some(format!("{}_cover.jpg", folder_name)),
            Some(format!("{}_collage.jpg", folder_name)),
        ),
        (true, false) => (Some(format!("{}.jpg", folder_name)), None),
        (false, true) => (None, Some(format!("{}.jpg", folder_name))),
        (false, false) => (None, None),
    }
}

/// Builds cover and collage images at a fixed target
pub struct ImageCompositor {
    target: CompositionTarget,
}

impl ImageCompositor {
    pub fn new(target: CompositionTarget) -> Self {
        Self { target }
    }

    /// Padded cover of `source`, written to `output`
    pub fn compose_cover(&self, source: &Path, output: &Path) -> Result<PathBuf, PackError> {
        let image = image::open(source)?;
        let cover = compose_padded(&image, self.target.width, self.target.height);
        save_jpeg(&cover, output)?;
        info!(
            "🖼️ Cover {}x{} from {} -> {}",
            self.target.width,
            self.target.height,
            source.display(),
            output.display()
        );
        Ok(output.to_path_buf())
    }

    /// 2x2 collage of `sources` (TL, TR, BL, BR), written to `output`
    pub fn compose_collage(&self, sources: [&Path; 4], output: &Path) -> Result<PathBuf, PackError> {
        let quad_w = self.target.width / 2;
        let quad_h = self.target.height / 2;
        if quad_w == 0 || quad_h == 0 {
            return Err(PackError::Config(format!(
                "Target {}x{} too small for a collage",
                self.target.width, self.target.height
            )));
        }

        let mut canvas = RgbImage::new(self.target.width, self.target.height);
        let positions = [(0, 0), (quad_w, 0), (0, quad_h), (quad_w, quad_h)];

        for (source, (x, y)) in sources.iter().zip(positions) {
            let image = image::open(source)?;
            let tile = compose_padded(&image, quad_w, quad_h);
            imageops::overlay(&mut canvas, &tile, x as i64, y as i64);
            debug!("Collage tile {} at ({}, {})", source.display(), x, y);
        }

        save_jpeg(&canvas, output)?;
        info!(
            "🧩 Collage {}x{} -> {}",
            self.target.width,
            self.target.height,
            output.display()
        );
        Ok(output.to_path_buf())
    }
}
