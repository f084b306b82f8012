// Copyright 2026 the Stitchwork Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backbones: ordered block lists behind a transform/clip boundary.
//!
//! A root backbone renders directly into the host container. A nested
//! backbone is backed by a DOM drawable that sits in its parent's display
//! order like any other drawable, so the nested content is composited as a
//! unit wherever that drawable lands.
//!
//! ```text
//!   root backbone
//!     ├── block 0 (canvas)  [a, b]
//!     ├── block 1 (dom)     [n] ── nested backbone
//!     │                             ├── block 0 (svg) [x, y]
//!     │                             └── block 1 (dom) [z]
//!     └── block 2 (canvas)  [c]
//!
//!   flatten(root) = a, b, x, y, z, c
//! ```

use alloc::vec::Vec;

use kurbo::{Affine, Rect};

use crate::backend::BackboneView;
use crate::display::Display;
use crate::id::{BackboneId, BlockId, DrawableId, INVALID, InstanceId};
use crate::renderer::Renderer;
use crate::trace::Tracer;

/// Struct-of-arrays storage for all backbones.
#[derive(Debug, Default)]
pub struct BackboneStore {
    /// Block slots in paint order, back to front.
    pub(crate) blocks: Vec<Vec<u32>>,
    /// Backing drawable slot; [`INVALID`] for a root backbone.
    pub(crate) drawable: Vec<u32>,
    pub(crate) parent: Vec<u32>,
    pub(crate) transform: Vec<Affine>,
    pub(crate) clip: Vec<Option<Rect>>,

    /// Range committed by the last stitch; the next stitch walks it as the
    /// old list.
    pub(crate) previous_first: Vec<u32>,
    pub(crate) previous_last: Vec<u32>,

    pub(crate) dirty: Vec<bool>,
    pub(crate) live: Vec<bool>,
    pub(crate) generation: Vec<u32>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,
}

impl BackboneStore {
    /// Creates an empty store with room for `capacity` backbones.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            blocks: Vec::with_capacity(capacity),
            drawable: Vec::with_capacity(capacity),
            parent: Vec::with_capacity(capacity),
            transform: Vec::with_capacity(capacity),
            clip: Vec::with_capacity(capacity),
            previous_first: Vec::with_capacity(capacity),
            previous_last: Vec::with_capacity(capacity),
            dirty: Vec::with_capacity(capacity),
            live: Vec::with_capacity(capacity),
            generation: Vec::with_capacity(capacity),
            free_list: Vec::new(),
            len: 0,
        }
    }

    pub(crate) fn acquire(&mut self, parent: u32, drawable: u32) -> BackboneId {
        let idx = if let Some(idx) = self.free_list.pop() {
            let i = idx as usize;
            self.blocks[i].clear();
            self.transform[i] = Affine::IDENTITY;
            self.clip[i] = None;
            self.previous_first[i] = INVALID;
            self.previous_last[i] = INVALID;
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.blocks.push(Vec::new());
            self.drawable.push(INVALID);
            self.parent.push(INVALID);
            self.transform.push(Affine::IDENTITY);
            self.clip.push(None);
            self.previous_first.push(INVALID);
            self.previous_last.push(INVALID);
            self.dirty.push(false);
            self.live.push(false);
            self.generation.push(0);
            idx
        };
        let i = idx as usize;
        self.drawable[i] = drawable;
        self.parent[i] = parent;
        self.live[i] = true;
        // New backbones apply their (identity) transform once.
        self.dirty[i] = true;
        BackboneId {
            idx,
            generation: self.generation[i],
        }
    }

    /// Returns whether the handle refers to a live backbone.
    #[must_use]
    pub fn is_alive(&self, id: BackboneId) -> bool {
        id.idx < self.len
            && self.generation[id.idx as usize] == id.generation
            && self.live[id.idx as usize]
    }

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: BackboneId) {
        assert!(self.is_alive(id), "stale BackboneId: {id:?}");
    }

    pub(crate) fn id_at(&self, idx: u32) -> Option<BackboneId> {
        (idx != INVALID).then(|| BackboneId {
            idx,
            generation: self.generation[idx as usize],
        })
    }
}

impl Display {
    /// Creates a root backbone.
    pub fn create_backbone(&mut self) -> BackboneId {
        self.backbones.acquire(INVALID, INVALID)
    }

    /// Creates a backbone nested inside `parent`.
    ///
    /// Returns the backbone and its backing DOM drawable. The caller places
    /// the drawable in `parent`'s display order; it hosts the nested
    /// backbone's blocks and applies its transform and clip.
    ///
    /// # Panics
    ///
    /// Panics if `parent` is stale.
    pub fn create_nested_backbone(
        &mut self,
        parent: BackboneId,
        instance: InstanceId,
    ) -> (BackboneId, DrawableId) {
        self.backbones.validate(parent);
        let drawable = self.create_drawable(Renderer::Dom, instance);
        let backbone = self.backbones.acquire(parent.idx, drawable.idx);
        self.drawables.backbone[drawable.idx as usize] = backbone.idx;
        (backbone, drawable)
    }

    /// Disposes a backbone and its blocks.
    ///
    /// Member drawables stay alive, detached from any block. A nested
    /// backbone's backing drawable is disposed with it.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or if a live backbone is nested inside
    /// this one (dispose the inner one first).
    pub fn dispose_backbone(&mut self, id: BackboneId) {
        self.backbones.validate(id);
        let idx = id.idx;
        assert!(
            !(0..self.backbones.len).any(|other| self.backbones.live[other as usize]
                && self.backbones.parent[other as usize] == idx),
            "cannot dispose backbone with nested backbones"
        );

        let blocks = core::mem::take(&mut self.backbones.blocks[idx as usize]);
        let mut tracer = Tracer::none();
        for block in blocks {
            let members: Vec<u32> = self.member_slots(block).collect();
            for member in members {
                self.detach(member, false);
                self.drawables.old_previous[member as usize] = INVALID;
                self.drawables.old_next[member as usize] = INVALID;
            }
            self.dispose_block(block, &mut tracer);
        }

        let i = idx as usize;
        self.backbones.previous_first[i] = INVALID;
        self.backbones.previous_last[i] = INVALID;
        let drawable = self.backbones.drawable[i];
        self.backbones.drawable[i] = INVALID;
        self.backbones.parent[i] = INVALID;
        self.backbones.live[i] = false;
        self.backbones.dirty[i] = false;
        self.backbones.generation[i] += 1;
        self.backbones.free_list.push(idx);

        if let Some(drawable) = self.drawables.id_at(drawable) {
            self.drawables.backbone[drawable.idx as usize] = INVALID;
            self.dispose_drawable(drawable);
        }
    }

    /// Sets the transform applied to everything inside a backbone.
    pub fn set_backbone_transform(&mut self, id: BackboneId, transform: Affine) {
        self.backbones.validate(id);
        let i = id.idx as usize;
        if self.backbones.transform[i] != transform {
            self.backbones.transform[i] = transform;
            self.backbones.dirty[i] = true;
        }
    }

    /// Sets (or clears) the clip applied to everything inside a backbone.
    pub fn set_backbone_clip(&mut self, id: BackboneId, clip: Option<Rect>) {
        self.backbones.validate(id);
        let i = id.idx as usize;
        if self.backbones.clip[i] != clip {
            self.backbones.clip[i] = clip;
            self.backbones.dirty[i] = true;
        }
    }

    /// Returns a backbone's transform.
    #[must_use]
    pub fn backbone_transform(&self, id: BackboneId) -> Affine {
        self.backbones.validate(id);
        self.backbones.transform[id.idx as usize]
    }

    /// Returns a backbone's clip.
    #[must_use]
    pub fn backbone_clip(&self, id: BackboneId) -> Option<Rect> {
        self.backbones.validate(id);
        self.backbones.clip[id.idx as usize]
    }

    /// Returns the drawable backing a nested backbone.
    #[must_use]
    pub fn backbone_drawable(&self, id: BackboneId) -> Option<DrawableId> {
        self.backbones.validate(id);
        self.drawables.id_at(self.backbones.drawable[id.idx as usize])
    }

    /// Returns the nested backbone a drawable backs, if any.
    #[must_use]
    pub fn nested_backbone(&self, drawable: DrawableId) -> Option<BackboneId> {
        self.drawables.validate(drawable);
        self.backbones
            .id_at(self.drawables.backbone[drawable.idx as usize])
    }

    /// Returns the parent of a nested backbone.
    #[must_use]
    pub fn backbone_parent(&self, id: BackboneId) -> Option<BackboneId> {
        self.backbones.validate(id);
        self.backbones.id_at(self.backbones.parent[id.idx as usize])
    }

    /// Returns the range the last stitch committed for a backbone.
    #[must_use]
    pub fn stitched_range(&self, id: BackboneId) -> (Option<DrawableId>, Option<DrawableId>) {
        self.backbones.validate(id);
        let i = id.idx as usize;
        (
            self.drawables.id_at(self.backbones.previous_first[i]),
            self.drawables.id_at(self.backbones.previous_last[i]),
        )
    }

    /// Iterates a backbone's blocks in paint order, back to front.
    #[must_use]
    pub fn blocks(&self, id: BackboneId) -> impl Iterator<Item = BlockId> + '_ {
        self.backbones.validate(id);
        self.backbones.blocks[id.idx as usize]
            .iter()
            .map(|&block| BlockId {
                idx: block,
                generation: self.blocks.generation[block as usize],
            })
    }

    /// Returns the display order a backbone renders, with every nested
    /// backbone's backing drawable expanded into that backbone's content.
    #[must_use]
    pub fn flatten(&self, id: BackboneId) -> Vec<DrawableId> {
        self.backbones.validate(id);
        let mut out = Vec::new();
        self.flatten_into(id.idx, &mut out);
        out
    }

    fn flatten_into(&self, backbone: u32, out: &mut Vec<DrawableId>) {
        for &block in &self.backbones.blocks[backbone as usize] {
            for member in self.member_slots(block) {
                let nested = self.drawables.backbone[member as usize];
                if nested == INVALID {
                    out.extend(self.drawables.id_at(member));
                } else {
                    self.flatten_into(nested, out);
                }
            }
        }
    }

    pub(crate) fn backbone_view(&self, idx: u32) -> BackboneView {
        let i = idx as usize;
        BackboneView {
            id: BackboneId {
                idx,
                generation: self.backbones.generation[i],
            },
            drawable: self.drawables.id_at(self.backbones.drawable[i]),
            transform: self.backbones.transform[i],
            clip: self.backbones.clip[i],
        }
    }

    /// Applies dirty backbone transforms and clips through the DOM strategy.
    pub(crate) fn flush_backbones(&mut self) -> u32 {
        let mut updated = 0;
        for idx in 0..self.backbones.len {
            let i = idx as usize;
            if !self.backbones.live[i] || !self.backbones.dirty[i] {
                continue;
            }
            self.backbones.dirty[i] = false;
            let view = self.backbone_view(idx);
            if let Some(strategy) = self.strategies.get_mut(Renderer::Dom) {
                strategy.update_backbone(&view);
            }
            updated += 1;
        }
        updated
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use kurbo::{Affine, Rect, Vec2};

    use super::*;
    use crate::testing::{Call, RecordingStrategy, frame};

    #[test]
    fn nested_backbone_flattens_in_place() {
        let (mut display, _log) = RecordingStrategy::display();
        let root = display.create_backbone();
        let a = display.create_drawable(Renderer::Canvas, InstanceId(0));
        let (inner, host) = display.create_nested_backbone(root, InstanceId(1));
        let c = display.create_drawable(Renderer::Canvas, InstanceId(2));
        let x = display.create_drawable(Renderer::Svg, InstanceId(3));
        let y = display.create_drawable(Renderer::Dom, InstanceId(4));

        frame(&mut display, inner, &[x, y]);
        frame(&mut display, root, &[a, host, c]);

        assert_eq!(display.flatten(root), vec![a, x, y, c]);
        assert_eq!(display.flatten(inner), vec![x, y]);
        assert_eq!(display.backbone_parent(inner), Some(root));
        assert_eq!(display.backbone_drawable(inner), Some(host));
        assert_eq!(display.backbone_drawable(root), None);
        assert_eq!(display.nested_backbone(host), Some(inner));
        assert_eq!(display.nested_backbone(a), None);
        display.check_invariants(root);
        display.check_invariants(inner);
    }

    #[test]
    fn transform_and_clip_flush_once() {
        let (mut display, log) = RecordingStrategy::display();
        let root = display.create_backbone();
        let (inner, _host) = display.create_nested_backbone(root, InstanceId(0));
        display.update(&mut Tracer::none());
        log.borrow_mut().clear();

        let shift = Affine::translate(Vec2::new(5.0, 0.0));
        display.set_backbone_transform(inner, shift);
        display.set_backbone_clip(inner, Some(Rect::new(0.0, 0.0, 50.0, 50.0)));
        display.set_backbone_transform(inner, shift);
        let summary = display.update(&mut Tracer::none());
        assert_eq!(summary.backbones_updated, 1);
        assert_eq!(
            log.borrow()
                .iter()
                .filter(|call| matches!(call, Call::UpdateBackbone(id) if *id == inner))
                .count(),
            1
        );

        let summary = display.update(&mut Tracer::none());
        assert_eq!(summary.backbones_updated, 0);
        assert_eq!(display.backbone_transform(inner), shift);
    }

    #[test]
    fn dispose_backbone_releases_blocks_and_host() {
        let (mut display, _log) = RecordingStrategy::display();
        let root = display.create_backbone();
        let a = display.create_drawable(Renderer::Canvas, InstanceId(0));
        let (inner, host) = display.create_nested_backbone(root, InstanceId(1));
        let x = display.create_drawable(Renderer::Svg, InstanceId(2));
        frame(&mut display, inner, &[x]);
        frame(&mut display, root, &[a, host]);

        display.dispose_backbone(inner);
        assert!(!display.backbones.is_alive(inner));
        assert!(!display.drawables.is_alive(host));
        assert!(display.drawables.is_alive(x));
        assert_eq!(display.drawable_block(x), None);
        assert_eq!(display.flatten(root), vec![a]);
        assert_eq!(display.stitched_range(root), (Some(a), Some(a)));
    }

    #[test]
    #[should_panic(expected = "cannot dispose backbone with nested backbones")]
    fn dispose_parent_first_panics() {
        let (mut display, _log) = RecordingStrategy::display();
        let root = display.create_backbone();
        let _nested = display.create_nested_backbone(root, InstanceId(0));
        display.dispose_backbone(root);
    }
}
