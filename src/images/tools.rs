use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::Path;

use image::imageops::FilterType;
use image::io::Reader;
use image::{DynamicImage, GenericImageView, ImageFormat};

use crate::images::{EngineError, FitDimensions, ImageEngine, ImageMetadata};

/// Compute the destination size and source crop rectangle for a resize.
///
/// With `crop` the output is exactly the requested box (never larger than the
/// source), cut from the centre of the source. Without `crop` the source is
/// shrunk to fit inside the box keeping its aspect ratio. Returns `None` when
/// the result would be the same size as the source or larger.
pub fn resize_dimensions(
    orig_width: u32,
    orig_height: u32,
    width: u32,
    height: Option<u32>,
    crop: bool,
) -> Option<FitDimensions> {
    let height = height.unwrap_or(0);
    if orig_width == 0 || orig_height == 0 || (width == 0 && height == 0) {
        return None;
    }

    let fit = if crop {
        let aspect_ratio = orig_width as f64 / orig_height as f64;
        let mut new_width = width.min(orig_width);
        let mut new_height = height.min(orig_height);

        if new_width == 0 {
            new_width = (new_height as f64 * aspect_ratio) as u32;
        }
        if new_height == 0 {
            new_height = (new_width as f64 / aspect_ratio) as u32;
        }

        let size_ratio = (new_width as f64 / orig_width as f64)
            .max(new_height as f64 / orig_height as f64);
        if size_ratio <= 0.0 {
            return None;
        }

        let crop_width = ((new_width as f64 / size_ratio).round() as u32).min(orig_width);
        let crop_height = ((new_height as f64 / size_ratio).round() as u32).min(orig_height);

        FitDimensions {
            width: new_width,
            height: new_height,
            src_x: (orig_width - crop_width) / 2,
            src_y: (orig_height - crop_height) / 2,
            src_width: crop_width,
            src_height: crop_height,
        }
    } else {
        let (new_width, new_height) = constrain_dimensions(orig_width, orig_height, width, height);
        FitDimensions {
            width: new_width,
            height: new_height,
            src_x: 0,
            src_y: 0,
            src_width: orig_width,
            src_height: orig_height,
        }
    };

    if fit.width >= orig_width && fit.height >= orig_height {
        return None;
    }
    if fit.width == 0 || fit.height == 0 || fit.src_width == 0 || fit.src_height == 0 {
        return None;
    }

    Some(fit)
}

// Shrink (width, height) to fit within (max_width, max_height); a zero limit is unbounded
fn constrain_dimensions(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if max_width == 0 && max_height == 0 {
        return (width, height);
    }

    let mut width_ratio = 1.0_f64;
    let mut height_ratio = 1.0_f64;
    let mut did_width = false;
    let mut did_height = false;

    if max_width > 0 && width > max_width {
        width_ratio = max_width as f64 / width as f64;
        did_width = true;
    }
    if max_height > 0 && height > max_height {
        height_ratio = max_height as f64 / height as f64;
        did_height = true;
    }

    let smaller_ratio = width_ratio.min(height_ratio);
    let larger_ratio = width_ratio.max(height_ratio);

    let ratio = if (width as f64 * larger_ratio) as u32 > max_width
        || (height as f64 * larger_ratio) as u32 > max_height
    {
        smaller_ratio
    } else {
        larger_ratio
    };

    let mut new_width = (width as f64 * ratio) as u32;
    let mut new_height = (height as f64 * ratio) as u32;

    // Float truncation can land one pixel short of the limit
    if did_width && new_width + 1 == max_width {
        new_width = max_width;
    }
    if did_height && new_height + 1 == max_height {
        new_height = max_height;
    }

    (new_width, new_height)
}

/// Image engine backed by the `image` crate.
#[derive(Debug, Clone)]
pub struct ImageCrateEngine {
    jpeg_quality: u8,
    filter: FilterType,
}

impl ImageCrateEngine {
    pub fn new(jpeg_quality: u8) -> Self {
        Self {
            jpeg_quality: jpeg_quality.clamp(1, 100),
            filter: FilterType::Lanczos3,
        }
    }

    // Open a reader whose decoder is picked from the file content, not its name
    fn open_sniffed(path: &Path) -> Result<(Reader<BufReader<File>>, ImageFormat), EngineError> {
        let reader = Reader::open(path)?.with_guessed_format()?;
        let format = reader
            .format()
            .ok_or_else(|| EngineError::Decode(format!("Unrecognized image: {}", path.display())))?;
        Ok((reader, format))
    }

    fn decode(path: &Path) -> Result<(DynamicImage, ImageFormat), EngineError> {
        let (reader, format) = Self::open_sniffed(path)?;
        let img = reader
            .decode()
            .map_err(|e| EngineError::Decode(format!("Failed to load {}: {}", path.display(), e)))?;
        Ok((img, format))
    }

    fn metadata(path: &Path, width: u32, height: u32, format: ImageFormat) -> Result<ImageMetadata, EngineError> {
        if width == 0 || height == 0 {
            return Err(EngineError::Decode(format!("Empty image: {}", path.display())));
        }
        Ok(ImageMetadata { width, height, format })
    }

    fn output_format(path: &Path) -> Result<ImageFormat, EngineError> {
        ImageFormat::from_path(path).map_err(|e| {
            EngineError::Unsupported(format!("No image format for {}: {}", path.display(), e))
        })
    }

    fn encode_image(&self, img: DynamicImage, format: ImageFormat) -> Result<Vec<u8>, EngineError> {
        let mut output = Vec::new();

        match format {
            ImageFormat::Jpeg => {
                let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
                let mut encoder =
                    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut output, self.jpeg_quality);
                encoder
                    .encode_image(&rgb)
                    .map_err(|e| EngineError::Encode(format!("JPEG encoding failed: {}", e)))?;
            }
            other => {
                img.write_to(&mut Cursor::new(&mut output), other)
                    .map_err(|e| EngineError::Encode(format!("{:?} encoding failed: {}", other, e)))?;
            }
        }

        Ok(output)
    }
}

impl Default for ImageCrateEngine {
    fn default() -> Self {
        Self::new(90)
    }
}

impl ImageEngine for ImageCrateEngine {
    fn read_metadata(&self, path: &Path) -> Result<ImageMetadata, EngineError> {
        let (reader, format) = Self::open_sniffed(path)?;

        // Header only; the pixel data is not touched
        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| EngineError::Decode(format!("Failed to read {}: {}", path.display(), e)))?;

        Self::metadata(path, width, height, format)
    }

    fn validate(&self, path: &Path) -> Result<ImageMetadata, EngineError> {
        let (img, format) = Self::decode(path)?;
        let (width, height) = img.dimensions();
        Self::metadata(path, width, height, format)
    }

    fn resize(&self, path: &Path, fit: &FitDimensions) -> Result<Vec<u8>, EngineError> {
        // Encoder follows the extension, decoder follows the content
        let format = Self::output_format(path)?;
        let (img, _) = Self::decode(path)?;

        let resized = img
            .crop_imm(fit.src_x, fit.src_y, fit.src_width, fit.src_height)
            .resize_exact(fit.width, fit.height, self.filter);

        self.encode_image(resized, format)
    }
}
