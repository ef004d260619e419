//! Conversion between source-image pixel space and display space.
//!
//! The editor draws keypoints into a bounded display frame whose size is
//! fixed once per session. Mapping is a per-axis linear scale with no
//! rotation or shear:
//!
//! ```text
//! display = source * display_size / source_size
//! ```
//!
//! Keypoint positions are always stored in source space; display
//! coordinates are derived on demand and never written back anywhere
//! except through [`CoordinateMapper::to_source`].

use crate::types::{Dimensions, Point, SessionError, Size};

/// Default bound for the longer side of the display frame.
pub const DEFAULT_MAX_DISPLAY_SIDE: f64 = 512.0;

/// Bidirectional source ↔ display mapping for one session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    source: Dimensions,
    display: Size,
}

impl CoordinateMapper {
    /// Create a mapper between explicit source and display sizes.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Configuration`] if the source has a
    /// zero-length axis or the display size is not finite and positive.
    pub fn new(source: Dimensions, display: Size) -> Result<Self, SessionError> {
        validate_source(source)?;
        if !(display.width.is_finite()
            && display.height.is_finite()
            && display.width > 0.0
            && display.height > 0.0)
        {
            return Err(SessionError::Configuration(format!(
                "display size must be positive, got {}x{}",
                display.width, display.height
            )));
        }
        Ok(Self { source, display })
    }

    /// Fit the source image inside a `max_side` × `max_side` square.
    ///
    /// The longer side is clamped to `max_side` and the shorter side is
    /// scaled by the same factor, preserving aspect ratio. Images that
    /// already fit are shown at their native size.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Configuration`] if the source has a
    /// zero-length axis or `max_side` is not finite and positive.
    pub fn fit(source: Dimensions, max_side: f64) -> Result<Self, SessionError> {
        validate_source(source)?;
        if !(max_side.is_finite() && max_side > 0.0) {
            return Err(SessionError::Configuration(format!(
                "display bound must be positive, got {max_side}"
            )));
        }
        let w = f64::from(source.width);
        let h = f64::from(source.height);
        let longer = w.max(h);
        let scale = if longer > max_side {
            max_side / longer
        } else {
            1.0
        };
        Self::new(source, Size::new(w * scale, h * scale))
    }

    /// Source image dimensions.
    #[must_use]
    pub const fn source(&self) -> Dimensions {
        self.source
    }

    /// Display frame size.
    #[must_use]
    pub const fn display(&self) -> Size {
        self.display
    }

    /// Map a source-space point into display space.
    #[must_use]
    pub fn to_display(&self, p: Point) -> Point {
        Point::new(
            p.x * self.display.width / f64::from(self.source.width),
            p.y * self.display.height / f64::from(self.source.height),
        )
    }

    /// Map a display-space point back into source space.
    #[must_use]
    pub fn to_source(&self, p: Point) -> Point {
        Point::new(
            p.x * f64::from(self.source.width) / self.display.width,
            p.y * f64::from(self.source.height) / self.display.height,
        )
    }
}

fn validate_source(source: Dimensions) -> Result<(), SessionError> {
    if source.is_degenerate() {
        return Err(SessionError::Configuration(format!(
            "source image has a zero-length axis ({source})"
        )));
    }
    Ok(())
}
