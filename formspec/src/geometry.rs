//! Coordinate systems of the formspec DSL and their translation to pixels.
//!
//! Positions in a formspec come in two flavors selected by the
//! `real_coordinates[]` directive:
//!
//! * *Grid mode* (legacy): values are inventory-slot units; a position is
//!   `padding + (container_offset + value) * spacing`, and an element size is
//!   `value * spacing - (spacing - imgsize)` so that a row of slot-sized
//!   elements abuts exactly.
//! * *Real-coordinate mode*: values are plain multiples of the image size,
//!   `(value + container_offset) * imgsize`, with none of the grid-specific
//!   corrections.
//!
//! The image size itself is fitted once per regeneration from the screen
//! size, the declared inventory-grid size, and the user's scaling
//! preferences; spacing, padding, and the standard button height are linear
//! in it. All pixel quantities are `f32` so the grid↔pixel translation is
//! invertible within floating-point tolerance.

use euclid::{Box2D, Point2D, Size2D, Vector2D, point2, size2, vec2};

// -------------------------------------------------------------------------------------------------

/// Unit tag: formspec grid units (inventory-slot units in legacy mode,
/// image-size multiples in real-coordinate mode).
#[derive(Debug)]
pub enum Gu {}

/// Unit tag: physical pixels of the screen the form is laid out for.
#[derive(Debug)]
pub enum Px {}

/// A point in grid units.
pub type GuPoint = Point2D<f32, Gu>;
/// A vector in grid units.
pub type GuVector = Vector2D<f32, Gu>;
/// A size in grid units.
pub type GuSize = Size2D<f32, Gu>;
/// A point in pixels.
pub type PxPoint = Point2D<f32, Px>;
/// A vector in pixels.
pub type PxVector = Vector2D<f32, Px>;
/// A size in pixels.
pub type PxSize = Size2D<f32, Px>;
/// A rectangle in pixels.
pub type PxRect = Box2D<f32, Px>;

// -------------------------------------------------------------------------------------------------

/// Host display characteristics affecting layout.
///
/// This is a plain value passed into regeneration rather than read from any
/// global settings store, so independent menus (and tests) don't share it.
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub struct DisplayMetrics {
    /// User preference multiplying every derived size.
    pub gui_scaling: f32,
    /// Display density relative to 96 DPI (1.0 = 96 DPI).
    pub density: f32,
    /// Whether to use the touch-screen fitting constants, which aim for a
    /// smaller number of visible grid cells.
    pub touch_ui: bool,
}

impl DisplayMetrics {
    fn dpi(&self) -> f32 {
        self.density * 96.0
    }
}

impl Default for DisplayMetrics {
    fn default() -> Self {
        DisplayMetrics {
            gui_scaling: 1.0,
            density: 1.0,
            touch_ui: false,
        }
    }
}

/// Pixel metrics derived from one fitted image size: everything element
/// parsers need to turn DSL coordinates into pixel rectangles.
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub struct LayoutScale {
    /// Side length of one inventory image (slot), in pixels.
    pub imgsize: f32,
    /// Center-to-center distance of adjacent grid slots.
    pub spacing: PxVector,
    /// Padding around the form contents (incorporating the border of the
    /// outer inventory slots).
    pub padding: PxVector,
    /// Standard half-height-derived button height.
    pub button_height: f32,
}

impl LayoutScale {
    /// Derives spacing, padding, and button height from an image size.
    ///
    /// The slot spacing is 5/4 image size horizontally and 15/13 vertically;
    /// padding is 3/8 image size; the button height is 0.35 of the vertical
    /// spacing.
    pub fn from_imgsize(imgsize: f32) -> Self {
        LayoutScale {
            imgsize,
            spacing: vec2(imgsize * 5.0 / 4.0, imgsize * 15.0 / 13.0),
            padding: vec2(imgsize * 3.0 / 8.0, imgsize * 3.0 / 8.0),
            button_height: imgsize * 15.0 / 13.0 * 0.35,
        }
    }

    /// Chooses the image size for a form of `invsize` grid cells on a screen
    /// of `screen` pixels.
    ///
    /// In locked (fixed-base-resolution) mode the image size depends only on
    /// density and scaling. Otherwise we prefer 1/15 of the screen height
    /// (1/10 on touch), scale down if the whole form would not fit either
    /// axis, and on non-touch displays never go below 0.3 inch.
    pub fn fit(
        screen: PxSize,
        invsize: GuSize,
        locked: bool,
        metrics: &DisplayMetrics,
    ) -> Self {
        let use_imgsize = if locked {
            // In fixed-size mode, the image size is 0.53 inch times
            // gui_scaling, chosen so that a 15.5-image-wide menu just fits an
            // 800 px window at 96 DPI and scaling 1.00.
            0.5555 * metrics.dpi() * metrics.gui_scaling
        } else if metrics.touch_ui {
            let prefer = screen.height / 10.0 * metrics.gui_scaling;
            let fit_x = screen.width / ((12.0 / 8.0) * (0.5 + invsize.width));
            let fit_y = screen.height / ((15.0 / 11.0) * (0.85 + invsize.height));
            prefer.min(fit_x).min(fit_y)
        } else {
            let prefer = screen.height / 15.0 * metrics.gui_scaling;
            let fit_x = screen.width / ((5.0 / 4.0) * (0.5 + invsize.width));
            let fit_y = screen.height / ((15.0 / 13.0) * (0.85 * invsize.height));
            let min_imgsize = 0.3 * metrics.dpi() * metrics.gui_scaling;
            min_imgsize.max(prefer.min(fit_x).min(fit_y))
        };
        Self::from_imgsize(use_imgsize)
    }

    /// Grid-mode position: `padding + (offset + pos) * spacing`.
    pub fn grid_pos(&self, offset: GuVector, pos: GuPoint) -> PxPoint {
        point2(
            self.padding.x + (offset.x + pos.x) * self.spacing.x,
            self.padding.y + (offset.y + pos.y) * self.spacing.y,
        )
    }

    /// Grid-mode size for element bodies that should abut:
    /// `geom * spacing - (spacing - imgsize)`.
    pub fn grid_size(&self, geom: GuSize) -> PxSize {
        size2(
            geom.width * self.spacing.x - (self.spacing.x - self.imgsize),
            geom.height * self.spacing.y - (self.spacing.y - self.imgsize),
        )
    }

    /// Grid-mode size without the abutting correction (used by elements that
    /// scale with the spacing, such as scrollbars).
    pub fn grid_size_raw(&self, geom: GuSize) -> PxSize {
        size2(geom.width * self.spacing.x, geom.height * self.spacing.y)
    }

    /// Real-coordinate-mode position: `(pos + offset) * imgsize`.
    pub fn real_pos(&self, offset: GuVector, pos: GuPoint) -> PxPoint {
        point2(
            (pos.x + offset.x) * self.imgsize,
            (pos.y + offset.y) * self.imgsize,
        )
    }

    /// Real-coordinate-mode size: `geom * imgsize`.
    pub fn real_size(&self, geom: GuSize) -> PxSize {
        size2(geom.width * self.imgsize, geom.height * self.imgsize)
    }

    /// Inverse of [`Self::grid_pos`], for hit tests and tests.
    pub fn grid_pos_inverse(&self, offset: GuVector, pos: PxPoint) -> GuPoint {
        point2(
            (pos.x - self.padding.x) / self.spacing.x - offset.x,
            (pos.y - self.padding.y) / self.spacing.y - offset.y,
        )
    }
}

/// Places a rectangle of `size` on `screen` according to the `position[]` and
/// `anchor[]` directive values (both screen/size fractions), plus a pixel
/// offset from fixed-size centering.
pub fn anchored_rect(
    screen: PxSize,
    size: PxSize,
    position: euclid::default::Vector2D<f32>,
    anchor: euclid::default::Vector2D<f32>,
    extra: PxVector,
) -> PxRect {
    let min = point2::<_, Px>(
        screen.width * position.x - anchor.x * size.width + extra.x,
        screen.height * position.y - anchor.y * size.height + extra.y,
    );
    PxRect::new(min, min + vec2(size.width, size.height))
}

// -------------------------------------------------------------------------------------------------

/// Error from [`parse_vec2`]: a position/geometry token list without exactly
/// two numeric components.
#[derive(Clone, Debug, Eq, PartialEq, displaydoc::Display)]
#[displaydoc("invalid 2-component vector {input:?}")]
#[non_exhaustive]
pub struct VectorError {
    /// The offending token list.
    pub input: String,
}

impl core::error::Error for VectorError {}

/// Parses `"x,y"` into grid units. Anything but exactly 2 comma-separated
/// numeric components is an error (and the caller drops the element).
pub fn parse_vec2(input: &str) -> Result<GuVector, VectorError> {
    let err = || VectorError {
        input: input.to_owned(),
    };
    let mut parts = input.split(',');
    let x = parts.next().ok_or_else(err)?;
    let y = parts.next().ok_or_else(err)?;
    if parts.next().is_some() {
        return Err(err());
    }
    Ok(vec2(
        x.trim().parse::<f32>().map_err(|_| err())?,
        y.trim().parse::<f32>().map_err(|_| err())?,
    ))
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn fit_free_mode_prefers_fifteenth_of_height() {
        // Large screen so neither fit_x nor fit_y constrains.
        let scale = LayoutScale::fit(
            size2(4000.0, 1500.0),
            size2(8.0, 9.0),
            false,
            &DisplayMetrics::default(),
        );
        assert_eq!(scale.imgsize, 100.0);
        assert_eq!(scale.spacing, vec2(125.0, 100.0 * 15.0 / 13.0));
        assert_eq!(scale.padding, vec2(37.5, 37.5));
        assert_eq!(scale.button_height, 100.0 * 15.0 / 13.0 * 0.35);
    }

    #[test]
    fn fit_is_clamped_by_width() {
        // 300 px wide, 8.0 cells: fit_x = 300 / (1.25 * 8.5) ≈ 28.2 < 600/15 = 40.
        let scale = LayoutScale::fit(
            size2(300.0, 600.0),
            size2(8.0, 4.0),
            false,
            &DisplayMetrics {
                // Zero minimum so the clamp under test is the width one.
                density: 0.0,
                ..DisplayMetrics::default()
            },
        );
        let expected = 300.0 / ((5.0 / 4.0) * 8.5);
        assert_eq!(scale.imgsize, expected);
    }

    #[test]
    fn fit_locked_mode_ignores_screen() {
        let metrics = DisplayMetrics::default();
        let a = LayoutScale::fit(size2(800.0, 600.0), size2(8.0, 9.0), true, &metrics);
        let b = LayoutScale::fit(size2(123.0, 456.0), size2(1.0, 1.0), true, &metrics);
        assert_eq!(a.imgsize, b.imgsize);
        assert_eq!(a.imgsize, 0.5555 * 96.0);
    }

    #[test]
    fn grid_translation_round_trips() {
        let scale = LayoutScale::from_imgsize(48.0);
        let offset: GuVector = vec2(1.5, 0.25);
        for &(x, y) in &[(0.0, 0.0), (3.25, 7.5), (-1.0, 2.0)] {
            let px = scale.grid_pos(offset, point2(x, y));
            let back = scale.grid_pos_inverse(offset, px);
            assert!((back.x - x).abs() < 1e-4 && (back.y - y).abs() < 1e-4);
        }
    }

    #[test]
    fn real_mode_is_pure_scaling() {
        let scale = LayoutScale::from_imgsize(64.0);
        assert_eq!(
            scale.real_pos(vec2(1.0, 0.0), point2(0.5, 2.0)),
            point2(96.0, 128.0),
        );
        assert_eq!(scale.real_size(size2(3.0, 1.0)), size2(192.0, 64.0));
    }

    #[test]
    fn anchored_rect_centering() {
        let rect = anchored_rect(
            size2(800.0, 600.0),
            size2(200.0, 100.0),
            euclid::default::Vector2D::new(0.5, 0.5),
            euclid::default::Vector2D::new(0.5, 0.5),
            vec2(0.0, 0.0),
        );
        assert_eq!(rect, PxRect::new(point2(300.0, 250.0), point2(500.0, 350.0)));
    }

    #[test]
    fn vec2_rejects_wrong_arity() {
        assert!(parse_vec2("1,2").is_ok());
        assert!(parse_vec2("1").is_err());
        assert!(parse_vec2("1,2,3").is_err());
        assert!(parse_vec2("1,banana").is_err());
    }
}
