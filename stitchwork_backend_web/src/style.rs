// Copyright 2026 the Stitchwork Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! CSS helpers shared by the strategies.

use alloc::format;
use alloc::string::String;

use kurbo::{Affine, Rect};
use web_sys::CssStyleDeclaration;

/// Formats a 2D affine transform as a CSS `matrix()` value.
#[must_use]
pub fn css_matrix(transform: Affine) -> String {
    let [a, b, c, d, e, f] = transform.as_coeffs();
    format!("matrix({a},{b},{c},{d},{e},{f})")
}

/// Formats a rectangle as a CSS `clip-path` polygon in the element's local
/// frame.
#[must_use]
pub fn clip_polygon(rect: Rect) -> String {
    let Rect { x0, y0, x1, y1 } = rect;
    format!("polygon({x0}px {y0}px,{x1}px {y0}px,{x1}px {y1}px,{x0}px {y1}px)")
}

/// Makes an element an absolutely positioned surface at the host's origin.
pub(crate) fn init_surface(style: &CssStyleDeclaration) {
    let _ = style.set_property("position", "absolute");
    let _ = style.set_property("left", "0");
    let _ = style.set_property("top", "0");
    let _ = style.set_property("transform-origin", "0 0");
}

/// Places and sizes a surface over `rect`.
pub(crate) fn place_rect(style: &CssStyleDeclaration, rect: Rect) {
    let _ = style.set_property("left", &format!("{}px", rect.x0));
    let _ = style.set_property("top", &format!("{}px", rect.y0));
    let _ = style.set_property("width", &format!("{}px", rect.width()));
    let _ = style.set_property("height", &format!("{}px", rect.height()));
}

pub(crate) fn set_z_index(style: &CssStyleDeclaration, index: u32) {
    let _ = style.set_property("z-index", &format!("{index}"));
}

pub(crate) fn set_shown(style: &CssStyleDeclaration, visible: bool) {
    if visible {
        let _ = style.remove_property("display");
    } else {
        let _ = style.set_property("display", "none");
    }
}

/// Backing-store size in pixels for a surface covering `rect`.
pub(crate) fn pixel_size(rect: Rect) -> (u32, u32) {
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "fit bounds are finite and non-negative in size; saturating is fine"
    )]
    let size = |v: f64| v.max(0.0).ceil() as u32;
    (size(rect.width()), size(rect.height()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_lists_coefficients_in_css_order() {
        let transform = Affine::new([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(css_matrix(transform), "matrix(1,2,3,4,5,6)");
    }

    #[test]
    fn clip_polygon_walks_corners_clockwise() {
        let rect = Rect::new(0.0, 1.5, 10.0, 20.0);
        assert_eq!(
            clip_polygon(rect),
            "polygon(0px 1.5px,10px 1.5px,10px 20px,0px 20px)"
        );
    }

    #[test]
    fn pixel_size_rounds_up() {
        assert_eq!(pixel_size(Rect::new(0.0, 0.0, 10.2, 3.0)), (11, 3));
        assert_eq!(pixel_size(Rect::ZERO), (0, 0));
    }
}
