//! Minimal geometry for viewport math.
//!
//! Points and rects are normalized to the unit square unless a function
//! says otherwise; sizes are in pixels.

/// A point in normalized coordinates (0..=1 on both axes).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const CENTER: Point = Point { x: 0.5, y: 0.5 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A size in pixels. Fractional values are allowed mid-computation and
/// rounded when concrete pixel dimensions are needed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Crop to the given aspect ratio (short side over long side, in
    /// (0, 1]), shrinking the long axis. Invalid ratios leave the size
    /// unchanged.
    pub fn cropped_to_aspect_ratio(self, aspect_ratio: f64) -> Size {
        if !(aspect_ratio > 0.0 && aspect_ratio <= 1.0) {
            crate::util::debug_failure(&format!("invalid aspect ratio {}", aspect_ratio));
            return self;
        }
        if self.width > self.height {
            Size::new(self.width, self.width * aspect_ratio)
        } else {
            Size::new(self.height * aspect_ratio, self.height)
        }
    }

    /// Scale down proportionally so the long side is at most `max_dimension`.
    /// Sizes already within the limit are returned unchanged.
    pub fn scaled_to_fit(self, max_dimension: f64) -> Size {
        if self.width > self.height {
            if self.width <= max_dimension {
                return self;
            }
            let factor = max_dimension / self.width;
            Size::new(max_dimension, self.height * factor)
        } else {
            if self.height <= max_dimension {
                return self;
            }
            let factor = max_dimension / self.height;
            Size::new(self.width * factor, max_dimension)
        }
    }

    /// Round to whole pixels and clear the low bit of each axis. Video
    /// encoders reject odd dimensions.
    pub fn even_pixels(self) -> (u32, u32) {
        let width = (self.width.round().max(0.0) as u32) & !1;
        let height = (self.height.round().max(0.0) as u32) & !1;
        (width, height)
    }
}

/// A rectangle in normalized coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    /// The whole frame.
    pub const FULL: Rect = Rect {
        origin: Point { x: 0.0, y: 0.0 },
        size: Size {
            width: 1.0,
            height: 1.0,
        },
    };

    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    /// A usable crop region: positive area, contained in the unit square.
    pub fn is_valid_viewport(&self) -> bool {
        self.size.width > 0.0
            && self.size.height > 0.0
            && self.origin.x >= 0.0
            && self.origin.y >= 0.0
            && self.origin.x + self.size.width <= 1.0 + f64::EPSILON
            && self.origin.y + self.size.height <= 1.0 + f64::EPSILON
    }
}
