// Copyright 2026 the Stitchwork Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Web render strategies for stitchwork.
//!
//! This crate implements [`RenderStrategy`] for every renderer on top of
//! `web-sys`:
//!
//! - [`DomStrategy`]: one positioned `<div>` per drawable.
//! - [`SvgStrategy`]: one `<svg>` per block, one `<g>` per drawable, shared
//!   gradients and filters in the block's `<defs>`.
//! - [`CanvasStrategy`]: one 2D `<canvas>` per block, repainted as a whole.
//! - [`WebGlStrategy`]: one WebGL `<canvas>` per block, members batched into
//!   a single vertex buffer.
//!
//! What a node actually looks like is up to the application's
//! [`NodePainter`]. Block surfaces are stacked inside their backbone's host
//! element with `z-index` set to the block's position; the root backbone's
//! host is the container passed to [`install`], a nested backbone's host is
//! the `<div>` of its backing DOM drawable.
//!
//! [`RenderStrategy`]: stitchwork_core::backend::RenderStrategy

#![no_std]

extern crate alloc;

mod canvas;
mod dom;
mod stage;
mod style;
mod svg;
mod webgl;

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

pub use canvas::CanvasStrategy;
pub use dom::DomStrategy;
pub use stage::Stage;
pub use style::{clip_polygon, css_matrix};
pub use svg::{SvgStrategy, paint_id, paint_ref};
pub use webgl::{Vertex, WebGlStrategy};

use stitchwork_core::Display;
use stitchwork_core::backend::{BackendError, DrawableView};
use stitchwork_core::id::PaintKey;
use web_sys::{CanvasRenderingContext2d, Document, Element, HtmlElement};

/// Application hooks that render one node into a backend object.
///
/// Coordinates handed to the painter are in the owning backbone's frame; the
/// strategies position block surfaces so that frame lines up.
pub trait NodePainter {
    /// Writes a DOM drawable's content into its element.
    ///
    /// The element's position, size and `display` are managed by
    /// [`DomStrategy`].
    fn update_dom(&self, element: &HtmlElement, drawable: &DrawableView) {
        _ = (element, drawable);
    }

    /// Writes an SVG drawable's content into its `<g>` element.
    ///
    /// Shared paints are referenced with [`paint_ref`].
    fn update_svg(&self, group: &Element, drawable: &DrawableView) {
        _ = (group, drawable);
    }

    /// Builds the `<defs>` entry (gradient, pattern, filter) for a shared
    /// paint. The strategy assigns its `id`.
    fn svg_paint(&self, document: &Document, paint: PaintKey) -> Option<Element> {
        _ = (document, paint);
        None
    }

    /// Draws a Canvas drawable. Returns whether anything was drawn.
    fn paint_canvas(&self, context: &CanvasRenderingContext2d, drawable: &DrawableView) -> bool {
        _ = (context, drawable);
        false
    }

    /// Appends a WebGL drawable's triangles to `out`.
    fn webgl_vertices(&self, drawable: &DrawableView, out: &mut Vec<Vertex>) {
        _ = (drawable, out);
    }
}

/// Registers a strategy for every renderer on `display`, all rendering into
/// `root`.
///
/// `root` should establish a containing block (e.g. `position: relative`).
///
/// # Errors
///
/// Returns [`BackendError::CreateFailed`] if `root` is not attached to a
/// document.
pub fn install(
    display: &mut Display,
    root: HtmlElement,
    painter: Rc<dyn NodePainter>,
) -> Result<(), BackendError> {
    let stage = Rc::new(RefCell::new(Stage::new(root)?));
    display.register_strategy(Box::new(DomStrategy::new(&stage, &painter)));
    display.register_strategy(Box::new(SvgStrategy::new(&stage, &painter)));
    display.register_strategy(Box::new(CanvasStrategy::new(&stage, &painter)));
    display.register_strategy(Box::new(WebGlStrategy::new(&stage, &painter)));
    Ok(())
}
