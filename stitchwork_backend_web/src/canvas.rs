// Copyright 2026 the Stitchwork Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canvas 2D blocks.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use kurbo::Rect;
use stitchwork_core::backend::{BackendError, BlockView, DrawableView, PaintOutcome, RenderStrategy};
use stitchwork_core::id::BlockId;
use stitchwork_core::renderer::Renderer;
use wasm_bindgen::JsCast as _;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::style::{init_surface, pixel_size, place_rect, set_z_index};
use crate::{NodePainter, Stage};

struct CanvasBlock {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
    /// Fit bounds the backing store was last sized to.
    bounds: Rect,
}

/// Renders each Canvas block into its own 2D `<canvas>`.
///
/// The canvas covers the block's fit bounds; before each member is drawn the
/// context is translated so the painter draws in backbone coordinates.
pub struct CanvasStrategy {
    stage: Rc<RefCell<Stage>>,
    painter: Rc<dyn NodePainter>,
    blocks: Vec<Option<CanvasBlock>>,
}

impl core::fmt::Debug for CanvasStrategy {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CanvasStrategy")
            .field("stage", &self.stage)
            .field("blocks_len", &self.blocks.len())
            .finish_non_exhaustive()
    }
}

impl CanvasStrategy {
    /// Creates a strategy placing canvases on `stage`.
    #[must_use]
    pub fn new(stage: &Rc<RefCell<Stage>>, painter: &Rc<dyn NodePainter>) -> Self {
        Self {
            stage: Rc::clone(stage),
            painter: Rc::clone(painter),
            blocks: Vec::new(),
        }
    }

    fn block(&self, block: BlockId) -> Option<&CanvasBlock> {
        self.blocks.get(block.index() as usize)?.as_ref()
    }
}

impl RenderStrategy for CanvasStrategy {
    fn renderer(&self) -> Renderer {
        Renderer::Canvas
    }

    fn create_block(&mut self, block: &BlockView) -> Result<(), BackendError> {
        let created = {
            let stage = self.stage.borrow();
            let canvas: HtmlCanvasElement = stage
                .document()
                .create_element("canvas")
                .map_err(|_| BackendError::CreateFailed("canvas"))?
                .unchecked_into();
            let context: CanvasRenderingContext2d = canvas
                .get_context("2d")
                .ok()
                .flatten()
                .ok_or(BackendError::CreateFailed("canvas 2d context"))?
                .dyn_into()
                .map_err(|_| BackendError::CreateFailed("canvas 2d context"))?;
            let style = canvas.style();
            init_surface(&style);
            let _ = style.set_property("pointer-events", "none");
            set_z_index(&style, block.index);
            stage.place(&canvas, block)?;
            CanvasBlock {
                canvas,
                context,
                bounds: Rect::ZERO,
            }
        };
        let slot = block.id.index() as usize;
        if self.blocks.len() <= slot {
            self.blocks.resize_with(slot + 1, || None);
        }
        self.blocks[slot] = Some(created);
        Ok(())
    }

    fn dispose_block(&mut self, block: BlockId) {
        if let Some(canvas) = self
            .blocks
            .get_mut(block.index() as usize)
            .and_then(Option::take)
        {
            canvas.canvas.remove();
        }
    }

    fn order_block(&mut self, block: &BlockView) {
        if let Some(canvas) = self.block(block.id) {
            set_z_index(&canvas.canvas.style(), block.index);
        }
    }

    fn fit_block(&mut self, block: &BlockView) {
        let Some(canvas) = self
            .blocks
            .get_mut(block.id.index() as usize)
            .and_then(Option::as_mut)
        else {
            return;
        };
        let rect = block.fit_bounds;
        place_rect(&canvas.canvas.style(), rect);
        let (width, height) = pixel_size(rect);
        // Resizing the backing store also clears it.
        canvas.canvas.set_width(width);
        canvas.canvas.set_height(height);
        canvas.bounds = rect;
    }

    fn clear_block(&mut self, block: &BlockView) {
        if let Some(canvas) = self.block(block.id) {
            let context = &canvas.context;
            let _ = context.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);
            context.clear_rect(
                0.0,
                0.0,
                f64::from(canvas.canvas.width()),
                f64::from(canvas.canvas.height()),
            );
        }
    }

    fn draw(&mut self, block: &BlockView, drawable: &DrawableView) -> PaintOutcome {
        let Some(canvas) = self.block(block.id) else {
            return PaintOutcome::Unavailable;
        };
        if !drawable.visible {
            return PaintOutcome::Empty;
        }
        let context = &canvas.context;
        context.save();
        let _ = context.set_transform(1.0, 0.0, 0.0, 1.0, -canvas.bounds.x0, -canvas.bounds.y0);
        let painted = self.painter.paint_canvas(context, drawable);
        context.restore();
        if painted {
            PaintOutcome::Painted
        } else {
            PaintOutcome::Empty
        }
    }
}
