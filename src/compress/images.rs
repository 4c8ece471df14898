//! Recompression of embedded raster images.
//!
//! Only 8-bit DeviceRGB and DeviceGray images stored as DCT or Flate (or
//! unfiltered) are touched. Each is decoded, optionally downsampled, and
//! re-encoded as baseline JPEG; the new stream replaces the old one only when
//! it is smaller.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

/// Outcome of a recompression pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageStatistics {
    /// Image streams that matched the supported formats.
    pub examined: usize,
    /// Image streams replaced by a smaller JPEG.
    pub recompressed: usize,
    /// Bytes saved across replaced streams.
    pub bytes_saved: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColorSpace {
    Rgb,
    Gray,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Dct,
    Flate,
    Raw,
}

/// Recompress every supported image in `doc` at `quality`, scaled by `factor`.
pub fn recompress_images(doc: &mut Document, quality: u8, factor: f32) -> ImageStatistics {
    let mut stats = ImageStatistics::default();

    let candidates: Vec<ObjectId> = doc
        .objects
        .iter()
        .filter_map(|(id, obj)| match obj {
            Object::Stream(stream) if classify(&stream.dict).is_some() => Some(*id),
            _ => None,
        })
        .collect();

    for id in candidates {
        stats.examined += 1;

        let Some(Object::Stream(stream)) = doc.objects.get(&id) else {
            continue;
        };

        match recompress_stream(stream, quality, factor) {
            Some(replacement) => {
                let saved = stream.content.len() - replacement.content.len();
                stats.recompressed += 1;
                stats.bytes_saved += saved;
                tracing::trace!(object = ?id, saved, "recompressed image");
                doc.objects.insert(id, Object::Stream(replacement));
            }
            None => tracing::trace!(object = ?id, "kept original image"),
        }
    }

    if stats.examined > 0 {
        tracing::debug!(
            examined = stats.examined,
            recompressed = stats.recompressed,
            bytes_saved = stats.bytes_saved,
            "image recompression pass"
        );
    }

    stats
}

fn classify(dict: &Dictionary) -> Option<(ColorSpace, Encoding)> {
    let is_image = matches!(dict.get(b"Subtype"), Ok(Object::Name(name)) if name == b"Image");
    if !is_image || dict.has(b"ImageMask") {
        return None;
    }

    if !matches!(dict.get(b"BitsPerComponent"), Ok(Object::Integer(8))) {
        return None;
    }

    let color = match dict.get(b"ColorSpace") {
        Ok(Object::Name(name)) if name == b"DeviceRGB" => ColorSpace::Rgb,
        Ok(Object::Name(name)) if name == b"DeviceGray" => ColorSpace::Gray,
        _ => return None,
    };

    let encoding = match dict.get(b"Filter") {
        Err(_) => Encoding::Raw,
        Ok(Object::Name(name)) => filter_encoding(name)?,
        Ok(Object::Array(filters)) if filters.len() == 1 => match &filters[0] {
            Object::Name(name) => filter_encoding(name)?,
            _ => return None,
        },
        Ok(_) => return None,
    };

    Some((color, encoding))
}

fn filter_encoding(name: &[u8]) -> Option<Encoding> {
    match name {
        b"DCTDecode" => Some(Encoding::Dct),
        b"FlateDecode" => Some(Encoding::Flate),
        _ => None,
    }
}

fn dimension(dict: &Dictionary, key: &[u8]) -> Option<u32> {
    match dict.get(key) {
        Ok(Object::Integer(value)) if *value > 0 => u32::try_from(*value).ok(),
        _ => None,
    }
}

fn decode(stream: &Stream, color: ColorSpace, encoding: Encoding) -> Option<DynamicImage> {
    if encoding == Encoding::Dct {
        return image::load_from_memory_with_format(&stream.content, ImageFormat::Jpeg).ok();
    }

    let width = dimension(&stream.dict, b"Width")?;
    let height = dimension(&stream.dict, b"Height")?;
    let raw = match encoding {
        Encoding::Flate => stream.decompressed_content().ok()?,
        _ => stream.content.clone(),
    };

    match color {
        ColorSpace::Rgb => RgbImage::from_raw(width, height, raw).map(DynamicImage::ImageRgb8),
        ColorSpace::Gray => GrayImage::from_raw(width, height, raw).map(DynamicImage::ImageLuma8),
    }
}

fn encode_jpeg(image: &DynamicImage, color: ColorSpace, quality: u8) -> Option<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
    let result = match color {
        ColorSpace::Rgb => encoder.encode_image(&image.to_rgb8()),
        ColorSpace::Gray => encoder.encode_image(&image.to_luma8()),
    };
    result.ok().map(|_| buffer)
}

fn recompress_stream(stream: &Stream, quality: u8, factor: f32) -> Option<Stream> {
    let (color, encoding) = classify(&stream.dict)?;
    let mut image = decode(stream, color, encoding)?;

    if factor > 0.0 && factor < 1.0 {
        let width = ((image.width() as f32 * factor).round() as u32).max(1);
        let height = ((image.height() as f32 * factor).round() as u32).max(1);
        image = image.resize_exact(width, height, FilterType::Lanczos3);
    }

    let encoded = encode_jpeg(&image, color, quality)?;
    if encoded.len() >= stream.content.len() {
        return None;
    }

    let mut dict = stream.dict.clone();
    dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
    dict.set("Width", i64::from(image.width()));
    dict.set("Height", i64::from(image.height()));
    dict.remove(b"DecodeParms");

    Some(Stream::new(dict, encoded).with_compression(false))
}
