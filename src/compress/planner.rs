//! Size-driven compression planning.
//!
//! | original size | target KB | quality | scale | metadata | annotations |
//! |---|---|---|---|---|---|
//! | > 10 MB | 5500 | 25 | 0.55 | strip | strip |
//! | > 5 MB | 1500 | 35 | 0.65 | strip | strip |
//! | > 1 MB | 800 | 45 | 0.75 | strip | strip |
//! | otherwise | 70 % of original | 60 | 0.85 | strip | keep |

use serde::{Deserialize, Serialize};

use crate::config::CompressionTier;

const KB_PER_MB: f64 = 1024.0;

/// Parameters for one compression run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressionSettings {
    /// Size the run tries to get under, in kilobytes.
    #[serde(rename = "targetSizeKB")]
    pub target_size_kb: u64,

    /// JPEG quality for recompressed images (0-100).
    pub image_quality: u8,

    /// Uniform page scale factor (0-1).
    pub page_scale: f32,

    /// Strip the document information dictionary.
    pub remove_metadata: bool,

    /// Strip annotations and optional content.
    pub remove_annotations: bool,

    /// Flate-compress streams before saving.
    pub compress_streams: bool,
}

/// Settings for an input of `original_size_kb` kilobytes.
///
/// # Examples
///
/// ```
/// use bidpack::compress::planner::plan;
///
/// let settings = plan(12.0 * 1024.0);
/// assert_eq!(settings.target_size_kb, 5500);
/// assert_eq!(settings.image_quality, 25);
/// ```
pub fn plan(original_size_kb: f64) -> CompressionSettings {
    let size_mb = original_size_kb / KB_PER_MB;

    let (target_size_kb, image_quality, page_scale, remove_annotations) = if size_mb > 10.0 {
        (5500, 25, 0.55, true)
    } else if size_mb > 5.0 {
        (1500, 35, 0.65, true)
    } else if size_mb > 1.0 {
        (800, 45, 0.75, true)
    } else {
        let target = (original_size_kb * 0.7).round().max(1.0) as u64;
        (target, 60, 0.85, false)
    };

    CompressionSettings {
        target_size_kb,
        image_quality,
        page_scale,
        remove_metadata: true,
        remove_annotations,
        compress_streams: true,
    }
}

/// Settings for an input of `original_size_kb` kilobytes at a given tier.
///
/// `Recommended` is [`plan`]; `Light` keeps more quality and allows a larger
/// target; `Extreme` goes the other way.
pub fn plan_for_tier(original_size_kb: f64, tier: CompressionTier) -> CompressionSettings {
    let base = plan(original_size_kb);

    match tier {
        CompressionTier::Recommended => base,
        CompressionTier::Light => CompressionSettings {
            target_size_kb: scale_target(base.target_size_kb, 1.5),
            image_quality: base.image_quality.saturating_add(15).min(95),
            page_scale: (base.page_scale + 0.15).min(1.0),
            ..base
        },
        CompressionTier::Extreme => CompressionSettings {
            target_size_kb: scale_target(base.target_size_kb, 0.6),
            image_quality: base.image_quality.saturating_sub(15).max(10),
            page_scale: (base.page_scale - 0.15).max(0.3),
            ..base
        },
    }
}

fn scale_target(target_kb: u64, factor: f64) -> u64 {
    (target_kb as f64 * factor).round().max(1.0) as u64
}
