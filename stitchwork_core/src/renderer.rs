// Copyright 2026 the Stitchwork Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend renderer tags.

use core::fmt;

/// The backend technology a drawable renders with.
///
/// This is a closed set. Every drawable carries exactly one renderer for its
/// whole life; a node that switches renderer gets a fresh drawable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Renderer {
    /// Canvas 2D bitmap, repainted per block.
    Canvas,
    /// SVG elements inside a per-block `<svg>` root.
    Svg,
    /// One DOM element per drawable.
    Dom,
    /// WebGL draw batch, repainted per block.
    WebGl,
}

impl Renderer {
    /// Number of renderer tags.
    pub const COUNT: usize = 4;

    /// All renderer tags, in [`index`](Self::index) order.
    pub const ALL: [Self; Self::COUNT] = [Self::Canvas, Self::Svg, Self::Dom, Self::WebGl];

    /// Returns a dense index suitable for per-renderer tables.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Canvas => 0,
            Self::Svg => 1,
            Self::Dom => 2,
            Self::WebGl => 3,
        }
    }

    /// Whether this is the DOM renderer.
    ///
    /// DOM blocks always hold a single drawable: after a DOM block is opened
    /// the stitchers reset their current renderer to neutral, so the next
    /// drawable opens a new block even when it is also DOM.
    #[inline]
    #[must_use]
    pub const fn is_dom(self) -> bool {
        matches!(self, Self::Dom)
    }

    /// Whether blocks of this renderer repaint every member through
    /// [`draw`](crate::backend::RenderStrategy::draw) instead of keeping a
    /// persistent element per drawable.
    #[inline]
    #[must_use]
    pub const fn is_immediate(self) -> bool {
        matches!(self, Self::Canvas | Self::WebGl)
    }

    /// Whether blocks of this renderer size their surface to the bounds of
    /// their members.
    #[inline]
    #[must_use]
    pub const fn supports_fit(self) -> bool {
        !self.is_dom()
    }

    /// Returns a short lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Canvas => "canvas",
            Self::Svg => "svg",
            Self::Dom => "dom",
            Self::WebGl => "webgl",
        }
    }
}

impl fmt::Display for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_matches_all_order() {
        for (i, renderer) in Renderer::ALL.iter().enumerate() {
            assert_eq!(renderer.index(), i, "{renderer} out of order");
        }
    }

    #[test]
    fn capabilities() {
        assert!(Renderer::Dom.is_dom());
        assert!(!Renderer::Dom.supports_fit());
        assert!(Renderer::Canvas.is_immediate());
        assert!(Renderer::WebGl.is_immediate());
        assert!(!Renderer::Svg.is_immediate());
        assert!(Renderer::Svg.supports_fit());
    }
}
