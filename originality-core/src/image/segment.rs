//! Geometric segments and query orientations.
//!
//! Registration hashes nine regions of an image so that a cropped half or
//! quadrant of a registered image still finds a close stored hash. Regions
//! are cut at the integer midpoint (`w / 2`, `h / 2`); on odd dimensions the
//! second half is one pixel wider, and that asymmetry is kept as-is.

use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// One of the nine registered image regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    Full,
    TopHalf,
    BottomHalf,
    LeftHalf,
    RightHalf,
    #[serde(rename = "q1_top_left")]
    Q1TopLeft,
    #[serde(rename = "q2_top_right")]
    Q2TopRight,
    #[serde(rename = "q3_bottom_left")]
    Q3BottomLeft,
    #[serde(rename = "q4_bottom_right")]
    Q4BottomRight,
}

impl Segment {
    /// All segments in registration order.
    pub const ALL: [Segment; 9] = [
        Segment::Full,
        Segment::TopHalf,
        Segment::BottomHalf,
        Segment::LeftHalf,
        Segment::RightHalf,
        Segment::Q1TopLeft,
        Segment::Q2TopRight,
        Segment::Q3BottomLeft,
        Segment::Q4BottomRight,
    ];

    /// Tag stored alongside the hash.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::TopHalf => "top_half",
            Self::BottomHalf => "bottom_half",
            Self::LeftHalf => "left_half",
            Self::RightHalf => "right_half",
            Self::Q1TopLeft => "q1_top_left",
            Self::Q2TopRight => "q2_top_right",
            Self::Q3BottomLeft => "q3_bottom_left",
            Self::Q4BottomRight => "q4_bottom_right",
        }
    }

    /// Parse a stored tag. Unknown tags yield `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == tag)
    }

    /// Crop rectangle `(x, y, width, height)` of this segment for a `w` x `h` image.
    pub fn bounds(&self, w: u32, h: u32) -> (u32, u32, u32, u32) {
        let (mx, my) = (w / 2, h / 2);
        match self {
            Self::Full => (0, 0, w, h),
            Self::TopHalf => (0, 0, w, my),
            Self::BottomHalf => (0, my, w, h - my),
            Self::LeftHalf => (0, 0, mx, h),
            Self::RightHalf => (mx, 0, w - mx, h),
            Self::Q1TopLeft => (0, 0, mx, my),
            Self::Q2TopRight => (mx, 0, w - mx, my),
            Self::Q3BottomLeft => (0, my, mx, h - my),
            Self::Q4BottomRight => (mx, my, w - mx, h - my),
        }
    }

    /// Cut this segment out of `image`.
    pub fn crop(&self, image: &DynamicImage) -> DynamicImage {
        if *self == Self::Full {
            return image.clone();
        }
        let (x, y, width, height) = self.bounds(image.width(), image.height());
        image.crop_imm(x, y, width, height)
    }
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Orientation applied to a query image before hashing.
///
/// Rotations expand the canvas to the rotated content, so 90 and 270 degree
/// variants swap width and height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Original,
    Rotate90,
    Rotate180,
    Rotate270,
    MirrorHorizontal,
}

impl Orientation {
    /// Query variants in scan order.
    pub const ALL: [Orientation; 5] = [
        Orientation::Original,
        Orientation::Rotate90,
        Orientation::Rotate180,
        Orientation::Rotate270,
        Orientation::MirrorHorizontal,
    ];

    pub fn apply(&self, image: &DynamicImage) -> DynamicImage {
        match self {
            Self::Original => image.clone(),
            Self::Rotate90 => image.rotate90(),
            Self::Rotate180 => image.rotate180(),
            Self::Rotate270 => image.rotate270(),
            Self::MirrorHorizontal => image.fliph(),
        }
    }
}
