//! Stamp (seal/signature) image overlay.
//!
//! The image is decoded once per compilation by [`StampOverlay::prepare`] and
//! then drawn on every page of each content document by
//! [`PreparedStamp::apply`].

use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};
use lopdf::content::Operation;
use lopdf::{Document, Object, Stream, dictionary};
use std::path::Path;

use super::request::StampOptions;
use crate::config::{StampLayout, StampPosition};
use crate::error::{PageError, StampError};
use crate::pages;

const XOBJECT_NAME: &str = "BpStamp";
const GSTATE_NAME: &str = "BpStampGs";

/// Lower-left corner of a stamp of size `stamp` on a page of size `page`.
///
/// # Examples
///
/// ```
/// use bidpack::compile::stamp::stamp_origin;
/// use bidpack::config::StampPosition;
///
/// let origin = stamp_origin(StampPosition::TopRight, (600.0, 800.0), (100.0, 50.0), 20.0);
/// assert_eq!(origin, (480.0, 730.0));
/// ```
pub fn stamp_origin(
    position: StampPosition,
    page: (f32, f32),
    stamp: (f32, f32),
    margin: f32,
) -> (f32, f32) {
    let (page_w, page_h) = page;
    let (w, h) = stamp;

    match position {
        StampPosition::BottomLeft => (margin, margin),
        StampPosition::TopRight => (page_w - w - margin, page_h - h - margin),
        StampPosition::TopLeft => (margin, page_h - h - margin),
        StampPosition::Center => ((page_w - w) / 2.0, (page_h - h) / 2.0),
        StampPosition::BottomRight => (page_w - w - margin, margin),
    }
}

/// Size of an image fitted into a `box_size` square, then multiplied by `scale`.
pub fn fit_to_box(pixel_width: u32, pixel_height: u32, box_size: f32, scale: f32) -> (f32, f32) {
    let longer = pixel_width.max(pixel_height).max(1) as f32;
    let ratio = box_size / longer * scale;
    (pixel_width as f32 * ratio, pixel_height as f32 * ratio)
}

/// Prepares stamp images according to a [`StampLayout`].
#[derive(Debug, Clone, Default)]
pub struct StampOverlay {
    layout: StampLayout,
}

impl StampOverlay {
    /// Create an overlay with the given layout.
    pub fn new(layout: StampLayout) -> Self {
        Self { layout }
    }

    /// Decode the stamp image and build its PDF image objects.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The image file cannot be read ([`StampError::Unreadable`])
    /// - The image is not a decodable PNG or JPEG ([`StampError::UnsupportedImage`])
    /// - Opacity or scale are out of range ([`StampError::InvalidOptions`])
    pub fn prepare(&self, options: &StampOptions) -> Result<PreparedStamp, StampError> {
        if !(0.0..=1.0).contains(&options.opacity) {
            return Err(StampError::InvalidOptions(format!(
                "opacity {} is outside 0..=1",
                options.opacity
            )));
        }

        let scale = options.effective_scale();
        if !(scale > 0.0 && scale.is_finite()) {
            return Err(StampError::InvalidOptions(format!(
                "scale {scale} must be positive"
            )));
        }

        let image = decode_image(&options.image_path)?;
        let (pixel_width, pixel_height) = image.dimensions();
        if pixel_width == 0 || pixel_height == 0 {
            return Err(StampError::UnsupportedImage {
                path: options.image_path.clone(),
                reason: "image has no pixels".to_string(),
            });
        }

        let (image, soft_mask) = image_streams(&image)?;
        let size = fit_to_box(pixel_width, pixel_height, self.layout.box_size, scale);

        tracing::debug!(
            image = %options.image_path.display(),
            pixel_width,
            pixel_height,
            width = size.0,
            height = size.1,
            position = %options.position,
            "prepared stamp"
        );

        Ok(PreparedStamp {
            image,
            soft_mask,
            size,
            opacity: options.opacity,
            position: options.position,
            margin: self.layout.margin,
        })
    }
}

fn decode_image(path: &Path) -> Result<DynamicImage, StampError> {
    let unreadable = |source| StampError::Unreadable {
        path: path.to_path_buf(),
        source,
    };

    let reader = ImageReader::open(path)
        .map_err(unreadable)?
        .with_guessed_format()
        .map_err(unreadable)?;

    match reader.format() {
        Some(ImageFormat::Png | ImageFormat::Jpeg) => {}
        other => {
            return Err(StampError::UnsupportedImage {
                path: path.to_path_buf(),
                reason: match other {
                    Some(format) => format!("{format:?} images are not supported"),
                    None => "unrecognized image format".to_string(),
                },
            });
        }
    }

    reader.decode().map_err(|e| StampError::UnsupportedImage {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// DeviceRGB image stream plus a DeviceGray soft mask when the image has alpha.
fn image_streams(image: &DynamicImage) -> Result<(Stream, Option<Stream>), PageError> {
    let (width, height) = image.dimensions();

    let mut rgb = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        image.to_rgb8().into_raw(),
    );
    rgb.compress()?;

    if !image.color().has_alpha() {
        return Ok((rgb, None));
    }

    let alpha: Vec<u8> = image.to_rgba8().pixels().map(|p| p.0[3]).collect();
    let mut mask = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
        },
        alpha,
    );
    mask.compress()?;

    Ok((rgb, Some(mask)))
}

/// A decoded stamp ready to be drawn onto documents.
#[derive(Debug, Clone)]
pub struct PreparedStamp {
    image: Stream,
    soft_mask: Option<Stream>,
    size: (f32, f32),
    opacity: f32,
    position: StampPosition,
    margin: f32,
}

impl PreparedStamp {
    /// Drawn width and height in points.
    pub fn size(&self) -> (f32, f32) {
        self.size
    }

    /// Whether the stamp carries an alpha channel.
    pub fn has_soft_mask(&self) -> bool {
        self.soft_mask.is_some()
    }

    /// Draw the stamp on every page of `doc`.
    ///
    /// The image objects are added once and shared by all pages.
    ///
    /// # Returns
    ///
    /// The number of stamped pages.
    pub fn apply(&self, doc: &mut Document) -> Result<usize, StampError> {
        let page_ids = pages::page_ids(doc);
        if page_ids.is_empty() {
            return Ok(0);
        }

        let mut image = self.image.clone();
        if let Some(mask) = &self.soft_mask {
            let mask_id = doc.add_object(mask.clone());
            image.dict.set("SMask", mask_id);
        }
        let image_id = doc.add_object(image);
        let gstate_id = doc.add_object(dictionary! {
            "Type" => "ExtGState",
            "ca" => Object::Real(self.opacity),
            "CA" => Object::Real(self.opacity),
        });

        let (w, h) = self.size;
        for &page_id in &page_ids {
            let mediabox = pages::page_box(doc, page_id);
            let (x, y) = stamp_origin(
                self.position,
                (mediabox.width(), mediabox.height()),
                self.size,
                self.margin,
            );

            pages::add_resource(doc, page_id, "XObject", XOBJECT_NAME, image_id.into())?;
            pages::add_resource(doc, page_id, "ExtGState", GSTATE_NAME, gstate_id.into())?;

            let operations = vec![
                Operation::new("q", vec![]),
                Operation::new("gs", vec![Object::Name(GSTATE_NAME.as_bytes().to_vec())]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Real(w),
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Real(h),
                        Object::Real(mediabox.llx + x),
                        Object::Real(mediabox.lly + y),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(XOBJECT_NAME.as_bytes().to_vec())]),
                Operation::new("Q", vec![]),
            ];
            pages::overlay_content(doc, page_id, pages::encode_operations(operations)?)?;
        }

        Ok(page_ids.len())
    }
}
