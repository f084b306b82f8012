// Copyright 2026 the Stitchwork Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! DOM drawables: one positioned `<div>` per drawable.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use stitchwork_core::backend::{
    BackboneView, BackendError, BlockView, DrawableView, RenderStrategy,
};
use stitchwork_core::id::{BlockId, DrawableId, INVALID};
use stitchwork_core::renderer::Renderer;
use wasm_bindgen::JsCast as _;
use web_sys::HtmlElement;

use crate::style::{clip_polygon, css_matrix, init_surface, place_rect, set_shown, set_z_index};
use crate::{NodePainter, Stage};

/// Renders DOM drawables as absolutely positioned `<div>` elements.
///
/// A DOM block holds exactly one drawable, so the block's surface is the
/// drawable's own element. Elements stay with their pooled slot after the
/// drawable is released and are reused when the slot is bound again.
///
/// This strategy also applies every backbone's transform and clip, to the
/// root container or to the backing drawable's element.
pub struct DomStrategy {
    stage: Rc<RefCell<Stage>>,
    painter: Rc<dyn NodePainter>,
    /// Member slot per block slot.
    members: Vec<u32>,
}

impl core::fmt::Debug for DomStrategy {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DomStrategy")
            .field("stage", &self.stage)
            .field("members_len", &self.members.len())
            .finish_non_exhaustive()
    }
}

impl DomStrategy {
    /// Creates a strategy placing elements on `stage`.
    #[must_use]
    pub fn new(stage: &Rc<RefCell<Stage>>, painter: &Rc<dyn NodePainter>) -> Self {
        Self {
            stage: Rc::clone(stage),
            painter: Rc::clone(painter),
            members: Vec::new(),
        }
    }

    fn member(&self, block: BlockId) -> u32 {
        self.members
            .get(block.index() as usize)
            .copied()
            .unwrap_or(INVALID)
    }

    fn set_member(&mut self, block: BlockId, drawable: u32) {
        let slot = block.index() as usize;
        if self.members.len() <= slot {
            self.members.resize(slot + 1, INVALID);
        }
        self.members[slot] = drawable;
    }
}

impl RenderStrategy for DomStrategy {
    fn renderer(&self) -> Renderer {
        Renderer::Dom
    }

    fn initialize_drawable(&mut self, drawable: &DrawableView) {
        let idx = drawable.id.index();
        let mut stage = self.stage.borrow_mut();
        if stage.element(idx).is_some() {
            return;
        }
        let Ok(el) = stage.document().create_element("div") else {
            // Reported when the drawable joins a block.
            return;
        };
        let el: HtmlElement = el.unchecked_into();
        init_surface(&el.style());
        let _ = el.style().set_property("isolation", "isolate");
        stage.put_element(idx, el);
    }

    fn release_drawable(&mut self, drawable: DrawableId) {
        if let Some(el) = self.stage.borrow().element(drawable.index()) {
            el.remove();
            let _ = el.style().remove_property("transform");
            let _ = el.style().remove_property("clip-path");
        }
    }

    fn update_drawable(&mut self, drawable: &DrawableView) -> bool {
        let stage = self.stage.borrow();
        if let Some(el) = stage.element(drawable.id.index()) {
            self.painter.update_dom(el, drawable);
            let style = el.style();
            place_rect(&style, drawable.bounds);
            set_shown(&style, drawable.visible);
        }
        true
    }

    fn order_block(&mut self, block: &BlockView) {
        let member = self.member(block.id);
        if let Some(el) = self.stage.borrow().element(member) {
            set_z_index(&el.style(), block.index);
        }
    }

    fn on_add_to_block(
        &mut self,
        block: &BlockView,
        drawable: &DrawableView,
    ) -> Result<(), BackendError> {
        {
            let stage = self.stage.borrow();
            let el = stage
                .element(drawable.id.index())
                .ok_or(BackendError::CreateFailed("div"))?;
            stage.place(el, block)?;
            set_z_index(&el.style(), block.index);
        }
        self.set_member(block.id, drawable.id.index());
        Ok(())
    }

    fn on_remove_from_block(&mut self, block: BlockId, drawable: DrawableId) {
        if let Some(el) = self.stage.borrow().element(drawable.index()) {
            el.remove();
        }
        if self.member(block) == drawable.index() {
            self.set_member(block, INVALID);
        }
    }

    fn dispose_block(&mut self, block: BlockId) {
        if (block.index() as usize) < self.members.len() {
            self.set_member(block, INVALID);
        }
    }

    fn update_backbone(&mut self, backbone: &BackboneView) {
        let stage = self.stage.borrow();
        let Some(host) = stage.host(backbone.drawable) else {
            return;
        };
        let style = host.style();
        let _ = style.set_property("transform-origin", "0 0");
        let _ = style.set_property("transform", &css_matrix(backbone.transform));
        match backbone.clip {
            Some(clip) => {
                let _ = style.set_property("clip-path", &clip_polygon(clip));
            }
            None => {
                let _ = style.remove_property("clip-path");
            }
        }
    }
}
