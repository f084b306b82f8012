// Copyright 2026 the Stitchwork Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pooled drawable storage and display-order lists.
//!
//! A *drawable* is the render proxy for exactly one (node instance,
//! renderer) pair. Drawables are stored struct-of-arrays style and recycled
//! through per-renderer free lists: releasing a drawable bumps its slot's
//! generation and parks the slot on its renderer's free list, and the next
//! acquisition for that renderer reuses it. Reuse is deterministic (last
//! released, first reused), never dependent on allocator timing.
//!
//! Each drawable carries two sets of list links:
//!
//! - `previous` / `next`: the display order the caller is building for the
//!   frame being stitched (see [`relink`](crate::display::Display::relink));
//! - `old_previous` / `old_next`: the order committed by the last stitch,
//!   which is also the order block membership follows.
//!
//! A stitch reads both and, when it finishes, copies the new links over the
//! old ones for every drawable in the stitched range.

use alloc::vec::Vec;

use kurbo::Rect;

use crate::backend::DrawableView;
use crate::id::{BackboneId, BlockId, DrawableId, INVALID, InstanceId, PaintKey};
use crate::renderer::Renderer;

/// Struct-of-arrays storage for all drawables, with per-renderer pools.
#[derive(Debug)]
pub struct DrawableStore {
    // -- Identity --
    pub(crate) renderer: Vec<Renderer>,
    pub(crate) instance: Vec<InstanceId>,

    // -- State flags --
    pub(crate) live: Vec<bool>,
    pub(crate) dirty: Vec<bool>,

    // -- Structure --
    pub(crate) block: Vec<u32>,
    pub(crate) previous: Vec<u32>,
    pub(crate) next: Vec<u32>,
    pub(crate) old_previous: Vec<u32>,
    pub(crate) old_next: Vec<u32>,
    /// Nested backbone this drawable backs.
    pub(crate) backbone: Vec<u32>,

    // -- Stitch bookkeeping --
    pub(crate) pending_removal: Vec<bool>,
    pub(crate) pending_block: Vec<u32>,

    // -- Node-supplied state --
    pub(crate) bounds: Vec<Rect>,
    pub(crate) visible: Vec<bool>,
    pub(crate) paints: Vec<Vec<PaintKey>>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) free: [Vec<u32>; Renderer::COUNT],
    pub(crate) len: u32,
}

impl Default for DrawableStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawableStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty store with room for `capacity` drawables.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            renderer: Vec::with_capacity(capacity),
            instance: Vec::with_capacity(capacity),
            live: Vec::with_capacity(capacity),
            dirty: Vec::with_capacity(capacity),
            block: Vec::with_capacity(capacity),
            previous: Vec::with_capacity(capacity),
            next: Vec::with_capacity(capacity),
            old_previous: Vec::with_capacity(capacity),
            old_next: Vec::with_capacity(capacity),
            backbone: Vec::with_capacity(capacity),
            pending_removal: Vec::with_capacity(capacity),
            pending_block: Vec::with_capacity(capacity),
            bounds: Vec::with_capacity(capacity),
            visible: Vec::with_capacity(capacity),
            paints: Vec::with_capacity(capacity),
            generation: Vec::with_capacity(capacity),
            free: core::array::from_fn(|_| Vec::new()),
            len: 0,
        }
    }

    // -- Pool API --

    /// Binds a pooled (or new) slot to `renderer` and `instance`.
    ///
    /// The drawable starts clean, visible, with empty bounds, no paints, no
    /// block, and no list links.
    pub(crate) fn acquire(&mut self, renderer: Renderer, instance: InstanceId) -> DrawableId {
        let idx = if let Some(idx) = self.free[renderer.index()].pop() {
            debug_assert!(
                !self.live[idx as usize],
                "pooled drawable slot {idx} is still live"
            );
            self.reset(idx);
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.renderer.push(renderer);
            self.instance.push(instance);
            self.live.push(false);
            self.dirty.push(false);
            self.block.push(INVALID);
            self.previous.push(INVALID);
            self.next.push(INVALID);
            self.old_previous.push(INVALID);
            self.old_next.push(INVALID);
            self.backbone.push(INVALID);
            self.pending_removal.push(false);
            self.pending_block.push(INVALID);
            self.bounds.push(Rect::ZERO);
            self.visible.push(true);
            self.paints.push(Vec::new());
            self.generation.push(0);
            idx
        };

        let i = idx as usize;
        self.renderer[i] = renderer;
        self.instance[i] = instance;
        self.live[i] = true;

        DrawableId {
            idx,
            generation: self.generation[i],
        }
    }

    /// Returns a drawable's slot to its renderer's pool.
    ///
    /// Returns `false` (and does nothing) if the handle is stale, which
    /// covers double release.
    pub(crate) fn release(&mut self, id: DrawableId) -> bool {
        debug_assert!(self.is_alive(id), "drawable {id:?} disposed twice");
        if !self.is_alive(id) {
            return false;
        }
        let idx = id.idx;
        self.reset(idx);
        self.live[idx as usize] = false;
        // Bump generation so old handles immediately fail validation.
        self.generation[idx as usize] += 1;
        self.free[self.renderer[idx as usize].index()].push(idx);
        true
    }

    /// Clears every per-drawable field except identity and generation.
    fn reset(&mut self, idx: u32) {
        let i = idx as usize;
        self.dirty[i] = false;
        self.block[i] = INVALID;
        self.previous[i] = INVALID;
        self.next[i] = INVALID;
        self.old_previous[i] = INVALID;
        self.old_next[i] = INVALID;
        self.backbone[i] = INVALID;
        self.pending_removal[i] = false;
        self.pending_block[i] = INVALID;
        self.bounds[i] = Rect::ZERO;
        self.visible[i] = true;
        self.paints[i].clear();
    }

    /// Returns whether the handle refers to a live drawable.
    #[must_use]
    pub fn is_alive(&self, id: DrawableId) -> bool {
        id.idx < self.len
            && self.generation[id.idx as usize] == id.generation
            && self.live[id.idx as usize]
    }

    /// Returns the number of live drawables.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.iter().filter(|live| **live).count()
    }

    /// Returns the number of pooled slots waiting for `renderer`.
    #[must_use]
    pub fn pooled(&self, renderer: Renderer) -> usize {
        self.free[renderer.index()].len()
    }

    // -- Property getters --

    /// Returns the renderer of a drawable.
    #[must_use]
    pub fn renderer(&self, id: DrawableId) -> Renderer {
        self.validate(id);
        self.renderer[id.idx as usize]
    }

    /// Returns the node instance a drawable renders.
    #[must_use]
    pub fn instance(&self, id: DrawableId) -> InstanceId {
        self.validate(id);
        self.instance[id.idx as usize]
    }

    /// Returns whether a drawable has unflushed changes.
    #[must_use]
    pub fn is_dirty(&self, id: DrawableId) -> bool {
        self.validate(id);
        self.dirty[id.idx as usize]
    }

    /// Returns a drawable's bounds.
    #[must_use]
    pub fn bounds(&self, id: DrawableId) -> Rect {
        self.validate(id);
        self.bounds[id.idx as usize]
    }

    /// Returns whether a drawable is visible.
    #[must_use]
    pub fn visible(&self, id: DrawableId) -> bool {
        self.validate(id);
        self.visible[id.idx as usize]
    }

    /// Returns the paints a drawable references.
    #[must_use]
    pub fn paints(&self, id: DrawableId) -> &[PaintKey] {
        self.validate(id);
        &self.paints[id.idx as usize]
    }

    /// Returns the next drawable in the order being built.
    #[must_use]
    pub fn next(&self, id: DrawableId) -> Option<DrawableId> {
        self.validate(id);
        self.id_at(self.next[id.idx as usize])
    }

    /// Returns the previous drawable in the order being built.
    #[must_use]
    pub fn previous(&self, id: DrawableId) -> Option<DrawableId> {
        self.validate(id);
        self.id_at(self.previous[id.idx as usize])
    }

    /// Returns the next drawable in the order committed by the last stitch.
    #[must_use]
    pub fn old_next(&self, id: DrawableId) -> Option<DrawableId> {
        self.validate(id);
        self.id_at(self.old_next[id.idx as usize])
    }

    /// Returns the previous drawable in the order committed by the last
    /// stitch.
    #[must_use]
    pub fn old_previous(&self, id: DrawableId) -> Option<DrawableId> {
        self.validate(id);
        self.id_at(self.old_previous[id.idx as usize])
    }

    /// Iterates the order being built, from `first` to `last` inclusive.
    #[must_use]
    pub fn list(&self, first: Option<DrawableId>, last: Option<DrawableId>) -> DrawableList<'_> {
        DrawableList::new(self, slot(first), slot(last), Links::New)
    }

    /// Iterates the committed order, from `first` to `last` inclusive.
    #[must_use]
    pub fn old_list(
        &self,
        first: Option<DrawableId>,
        last: Option<DrawableId>,
    ) -> DrawableList<'_> {
        DrawableList::new(self, slot(first), slot(last), Links::Old)
    }

    // -- Internal helpers --

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: DrawableId) {
        assert!(
            self.is_alive(id),
            "stale DrawableId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    /// Converts a raw slot into a handle, `None` for [`INVALID`].
    #[must_use]
    pub(crate) fn id_at(&self, idx: u32) -> Option<DrawableId> {
        (idx != INVALID).then(|| DrawableId {
            idx,
            generation: self.generation[idx as usize],
        })
    }

    /// Builds the strategy-facing snapshot of slot `idx`.
    pub(crate) fn view(
        &self,
        idx: u32,
        block: Option<BlockId>,
        backbone: Option<BackboneId>,
    ) -> DrawableView {
        let i = idx as usize;
        DrawableView {
            id: DrawableId {
                idx,
                generation: self.generation[i],
            },
            instance: self.instance[i],
            renderer: self.renderer[i],
            bounds: self.bounds[i],
            visible: self.visible[i],
            block,
            backbone,
        }
    }
}

/// Returns the raw slot of an optional handle.
#[inline]
pub(crate) fn slot(id: Option<DrawableId>) -> u32 {
    id.map_or(INVALID, |id| id.idx)
}

/// Which set of links a [`DrawableList`] follows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Links {
    New,
    Old,
}

/// An iterator over a display-order list, inclusive of both ends.
///
/// Created by [`DrawableStore::list`] and [`DrawableStore::old_list`].
#[derive(Debug)]
pub struct DrawableList<'a> {
    store: &'a DrawableStore,
    current: u32,
    last: u32,
    links: Links,
}

impl<'a> DrawableList<'a> {
    pub(crate) fn new(store: &'a DrawableStore, first: u32, last: u32, links: Links) -> Self {
        Self {
            store,
            current: first,
            last,
            links,
        }
    }
}

impl Iterator for DrawableList<'_> {
    type Item = DrawableId;

    fn next(&mut self) -> Option<DrawableId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = if idx == self.last {
            INVALID
        } else {
            match self.links {
                Links::New => self.store.next[idx as usize],
                Links::Old => self.store.old_next[idx as usize],
            }
        };
        self.store.id_at(idx)
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    fn link(store: &mut DrawableStore, ids: &[DrawableId]) {
        for pair in ids.windows(2) {
            store.next[pair[0].idx as usize] = pair[1].idx;
            store.previous[pair[1].idx as usize] = pair[0].idx;
        }
    }

    #[test]
    fn acquire_and_release() {
        let mut store = DrawableStore::new();
        let id = store.acquire(Renderer::Canvas, InstanceId(1));
        assert!(store.is_alive(id));
        assert_eq!(store.renderer(id), Renderer::Canvas);
        assert_eq!(store.instance(id), InstanceId(1));
        assert!(store.release(id));
        assert!(!store.is_alive(id));
        assert_eq!(store.pooled(Renderer::Canvas), 1);
    }

    #[test]
    fn pool_round_trip_matches_fresh_drawable() {
        let mut store = DrawableStore::new();
        let fresh = store.acquire(Renderer::Svg, InstanceId(1));
        let fresh_view = store.view(fresh.idx, None, None);

        store.bounds[fresh.idx as usize] = Rect::new(0.0, 0.0, 5.0, 5.0);
        store.visible[fresh.idx as usize] = false;
        store.dirty[fresh.idx as usize] = true;
        store.paints[fresh.idx as usize].push(PaintKey(3));
        store.release(fresh);

        let reused = store.acquire(Renderer::Svg, InstanceId(1));
        assert_eq!(reused.idx, fresh.idx, "same-renderer slot is reused");
        assert_ne!(reused.generation, fresh.generation);
        let reused_view = store.view(reused.idx, None, None);
        assert_eq!(reused_view.bounds, fresh_view.bounds);
        assert_eq!(reused_view.visible, fresh_view.visible);
        assert!(!store.is_dirty(reused));
        assert!(store.paints(reused).is_empty());
        assert_eq!(store.next(reused), None);
        assert_eq!(store.old_next(reused), None);
    }

    #[test]
    fn pools_are_keyed_by_renderer() {
        let mut store = DrawableStore::new();
        let canvas = store.acquire(Renderer::Canvas, InstanceId(1));
        store.release(canvas);
        let dom = store.acquire(Renderer::Dom, InstanceId(2));
        assert_ne!(dom.idx, canvas.idx, "a DOM drawable never takes a canvas slot");
        assert_eq!(store.pooled(Renderer::Canvas), 1);
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "disposed twice"))]
    fn release_twice_is_rejected() {
        let mut store = DrawableStore::new();
        let id = store.acquire(Renderer::Dom, InstanceId(0));
        assert!(store.release(id));
        assert!(!store.release(id));
        assert_eq!(store.pooled(Renderer::Dom), 1);
    }

    #[test]
    #[should_panic(expected = "stale DrawableId")]
    fn stale_handle_panics() {
        let mut store = DrawableStore::new();
        let id = store.acquire(Renderer::Dom, InstanceId(0));
        store.release(id);
        let _ = store.renderer(id);
    }

    #[test]
    fn list_iterates_inclusive_range() {
        let mut store = DrawableStore::new();
        let ids: Vec<_> = (0..4)
            .map(|i| store.acquire(Renderer::Canvas, InstanceId(i)))
            .collect();
        link(&mut store, &ids);

        let all: Vec<_> = store.list(Some(ids[0]), Some(ids[3])).collect();
        assert_eq!(all, ids);
        let middle: Vec<_> = store.list(Some(ids[1]), Some(ids[2])).collect();
        assert_eq!(middle, vec![ids[1], ids[2]]);
        assert_eq!(store.list(None, None).count(), 0);
        assert_eq!(store.old_list(Some(ids[0]), Some(ids[3])).count(), 1);
    }
}
