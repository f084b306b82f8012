// Copyright 2026 the Stitchwork Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! SVG blocks: one `<svg>` root per block, one `<g>` per drawable.

use alloc::format;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;

use stitchwork_core::backend::{BackendError, BlockView, DrawableView, RenderStrategy};
use stitchwork_core::id::{BlockId, DrawableId, PaintKey, ResourceKey};
use stitchwork_core::renderer::Renderer;
use wasm_bindgen::JsCast as _;
use web_sys::{Element, SvgElement};

use crate::style::{init_surface, place_rect, set_z_index};
use crate::{NodePainter, Stage};

const SVG_NS: &str = "http://www.w3.org/2000/svg";

/// Returns the `id` of a shared paint's `<defs>` entry in `block`.
///
/// Ids depend only on the block handle and paint key, so repeated writes are
/// idempotent.
#[must_use]
pub fn paint_id(block: BlockId, paint: PaintKey) -> String {
    format!("sw-b{}g{}-p{}", block.index(), block.generation(), paint.0)
}

/// Returns a `url(#…)` reference to a shared paint, for `fill`, `stroke` or
/// `filter` attributes.
#[must_use]
pub fn paint_ref(block: BlockId, paint: PaintKey) -> String {
    format!("url(#{})", paint_id(block, paint))
}

struct SvgBlock {
    root: SvgElement,
    defs: Element,
    paints: Vec<(PaintKey, Element)>,
    /// Member order last written to the DOM.
    order: Vec<DrawableId>,
}

/// Renders SVG drawables as `<g>` groups inside a per-block `<svg>` root.
///
/// The root's `viewBox` tracks the block's fit bounds, so painters draw in
/// backbone coordinates. Gradients and filters live once per block in its
/// `<defs>`, created on first reference and removed when the last member
/// referencing them leaves.
pub struct SvgStrategy {
    stage: Rc<RefCell<Stage>>,
    painter: Rc<dyn NodePainter>,
    blocks: Vec<Option<SvgBlock>>,
    groups: Vec<Option<Element>>,
}

impl core::fmt::Debug for SvgStrategy {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SvgStrategy")
            .field("stage", &self.stage)
            .field("blocks_len", &self.blocks.len())
            .field("groups_len", &self.groups.len())
            .finish_non_exhaustive()
    }
}

impl SvgStrategy {
    /// Creates a strategy placing block roots on `stage`.
    #[must_use]
    pub fn new(stage: &Rc<RefCell<Stage>>, painter: &Rc<dyn NodePainter>) -> Self {
        Self {
            stage: Rc::clone(stage),
            painter: Rc::clone(painter),
            blocks: Vec::new(),
            groups: Vec::new(),
        }
    }

    fn block(&self, block: BlockId) -> Option<&SvgBlock> {
        self.blocks.get(block.index() as usize)?.as_ref()
    }

    fn block_mut(&mut self, block: BlockId) -> Option<&mut SvgBlock> {
        self.blocks.get_mut(block.index() as usize)?.as_mut()
    }

    fn group(&self, drawable: DrawableId) -> Option<&Element> {
        self.groups.get(drawable.index() as usize)?.as_ref()
    }

    fn create_root(&self, block: &BlockView) -> Result<SvgBlock, BackendError> {
        let stage = self.stage.borrow();
        let document = stage.document();
        let root: SvgElement = document
            .create_element_ns(Some(SVG_NS), "svg")
            .map_err(|_| BackendError::CreateFailed("svg root"))?
            .unchecked_into();
        let defs = document
            .create_element_ns(Some(SVG_NS), "defs")
            .map_err(|_| BackendError::CreateFailed("svg defs"))?;
        root.append_child(&defs)
            .map_err(|_| BackendError::CreateFailed("svg defs"))?;
        let style = root.style();
        init_surface(&style);
        let _ = style.set_property("overflow", "visible");
        set_z_index(&style, block.index);
        stage.place(&root, block)?;
        Ok(SvgBlock {
            root,
            defs,
            paints: Vec::new(),
            order: Vec::new(),
        })
    }
}

impl RenderStrategy for SvgStrategy {
    fn renderer(&self) -> Renderer {
        Renderer::Svg
    }

    fn initialize_drawable(&mut self, drawable: &DrawableView) {
        let slot = drawable.id.index() as usize;
        if self.groups.get(slot).is_some_and(Option::is_some) {
            return;
        }
        let Ok(group) = self
            .stage
            .borrow()
            .document()
            .create_element_ns(Some(SVG_NS), "g")
        else {
            return;
        };
        if self.groups.len() <= slot {
            self.groups.resize_with(slot + 1, || None);
        }
        self.groups[slot] = Some(group);
    }

    fn release_drawable(&mut self, drawable: DrawableId) {
        if let Some(group) = self.group(drawable) {
            group.remove();
        }
    }

    fn update_drawable(&mut self, drawable: &DrawableView) -> bool {
        if let Some(group) = self.group(drawable.id) {
            self.painter.update_svg(group, drawable);
            if drawable.visible {
                let _ = group.remove_attribute("display");
            } else {
                let _ = group.set_attribute("display", "none");
            }
        }
        true
    }

    fn create_block(&mut self, block: &BlockView) -> Result<(), BackendError> {
        let created = self.create_root(block)?;
        let slot = block.id.index() as usize;
        if self.blocks.len() <= slot {
            self.blocks.resize_with(slot + 1, || None);
        }
        self.blocks[slot] = Some(created);
        Ok(())
    }

    fn dispose_block(&mut self, block: BlockId) {
        if let Some(svg) = self
            .blocks
            .get_mut(block.index() as usize)
            .and_then(Option::take)
        {
            svg.root.remove();
        }
    }

    fn order_block(&mut self, block: &BlockView) {
        if let Some(svg) = self.block(block.id) {
            set_z_index(&svg.root.style(), block.index);
        }
    }

    fn fit_block(&mut self, block: &BlockView) {
        let Some(svg) = self.block(block.id) else {
            return;
        };
        let rect = block.fit_bounds;
        place_rect(&svg.root.style(), rect);
        let view_box = format!("{} {} {} {}", rect.x0, rect.y0, rect.width(), rect.height());
        let _ = svg.root.set_attribute("viewBox", &view_box);
    }

    fn arrange_block(&mut self, block: &BlockView, members: &[DrawableId]) {
        let Some(svg) = self.block(block.id) else {
            return;
        };
        if svg.order == members {
            return;
        }
        // Re-appending moves an existing child to the end.
        for &member in members {
            if let Some(group) = self.group(member) {
                let _ = svg.root.append_child(group);
            }
        }
        if let Some(svg) = self.block_mut(block.id) {
            svg.order.clear();
            svg.order.extend_from_slice(members);
        }
    }

    fn on_add_to_block(
        &mut self,
        block: &BlockView,
        drawable: &DrawableView,
    ) -> Result<(), BackendError> {
        let svg = self
            .block(block.id)
            .ok_or(BackendError::CreateFailed("svg root"))?;
        let group = self
            .group(drawable.id)
            .ok_or(BackendError::CreateFailed("svg group"))?;
        svg.root
            .append_child(group)
            .map_err(|_| BackendError::CreateFailed("svg group"))?;
        Ok(())
    }

    fn on_remove_from_block(&mut self, block: BlockId, drawable: DrawableId) {
        if let Some(group) = self.group(drawable) {
            group.remove();
        }
        if let Some(svg) = self.block_mut(block) {
            svg.order.retain(|&member| member != drawable);
        }
    }

    fn create_paint(&mut self, block: BlockId, paint: PaintKey) -> Option<ResourceKey> {
        let element = {
            let stage = self.stage.borrow();
            self.painter.svg_paint(stage.document(), paint)?
        };
        let svg = self.block_mut(block)?;
        let _ = element.set_attribute("id", &paint_id(block, paint));
        svg.defs.append_child(&element).ok()?;
        svg.paints.push((paint, element));
        Some(ResourceKey(u64::from(paint.0)))
    }

    fn destroy_paint(&mut self, block: BlockId, paint: PaintKey, resource: Option<ResourceKey>) {
        _ = resource;
        let Some(svg) = self.block_mut(block) else {
            return;
        };
        if let Some(position) = svg.paints.iter().position(|(key, _)| *key == paint) {
            let (_, element) = svg.paints.swap_remove(position);
            element.remove();
        }
    }
}
