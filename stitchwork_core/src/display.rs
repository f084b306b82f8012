// Copyright 2026 the Stitchwork Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The display context: arenas, pools, dirty trackers, and strategies.
//!
//! A [`Display`] is the explicit context every stitching and update
//! operation runs against. Independent displays share nothing, so several
//! can coexist in one process.
//!
//! # Frame flow
//!
//! ```text
//!   node layer ──► set_bounds / set_visible / set_paints / mark_dirty
//!        │
//!        ├──► relink(new order) ──► Stitcher::stitch ──► blocks reconciled
//!        │
//!        ▼
//!   Display::update
//!     1. drawable PAINT  ──► update_drawable        (DOM, SVG)
//!     2. block FIT       ──► fit ──► fit_block      (SVG, Canvas, WebGL)
//!     3. block REPAINT   ──► clear? ──► draw* ──► finish_block_paint
//!                                                  (Canvas, WebGL)
//!                        ──► arrange_block          (DOM, SVG)
//!     4. dirty backbones ──► update_backbone
//! ```

use alloc::boxed::Box;
use alloc::vec::Vec;

use kurbo::Rect;
use understory_dirty::{CycleHandling, DirtyTracker};

use crate::backbone::BackboneStore;
use crate::backend::{DrawableView, PaintOutcome, RenderStrategy, Strategies};
use crate::block::BlockStore;
use crate::count_map::CountMap;
use crate::dirty;
use crate::drawable::{DrawableList, DrawableStore, Links};
use crate::id::{
    BackboneId, BlockId, BlockPaint, DrawableId, INVALID, InstanceId, PaintKey, ResourceKey,
};
use crate::renderer::Renderer;
use crate::stitch::{ChangeInterval, IncrementalStitcher, StitchRequest, StitchStats, Stitcher};
use crate::trace::{
    BlockEvent, BlockEventKind, FailureKind, ResourceFailureEvent, Tracer, UpdateSummary,
};

#[cfg(feature = "trace-rich")]
use crate::trace::{DrawableChange, DrawableField};

/// Runtime configuration for a [`Display`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplayOptions {
    /// Initial drawable arena capacity.
    pub drawable_capacity: usize,
    /// Initial block arena capacity.
    pub block_capacity: usize,
    /// Initial backbone arena capacity.
    pub backbone_capacity: usize,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            drawable_capacity: 64,
            block_capacity: 16,
            backbone_capacity: 4,
        }
    }
}

/// Creates a paint resource through the owning block's strategy.
fn create_paint(strategies: &mut Strategies, key: &BlockPaint) -> Option<ResourceKey> {
    strategies
        .get_mut(key.renderer)
        .and_then(|strategy| strategy.create_paint(key.block, key.paint))
}

/// Destroys a paint resource through the owning block's strategy.
fn destroy_paint(strategies: &mut Strategies, key: &BlockPaint, resource: Option<ResourceKey>) {
    if let Some(strategy) = strategies.get_mut(key.renderer) {
        strategy.destroy_paint(key.block, key.paint, resource);
    }
}

/// Owns every drawable, block, and backbone of one rendered scene.
pub struct Display {
    pub(crate) drawables: DrawableStore,
    pub(crate) blocks: BlockStore,
    pub(crate) backbones: BackboneStore,
    pub(crate) strategies: Strategies,
    /// Shared paint resources, counted per (block, paint).
    pub(crate) paints: CountMap<BlockPaint, Option<ResourceKey>, Strategies>,

    // -- Dirty tracking --
    pub(crate) drawable_dirty: DirtyTracker<u32>,
    pub(crate) block_dirty: DirtyTracker<u32>,

    pub(crate) frame_index: u64,

    #[cfg(feature = "trace-rich")]
    pub(crate) changes: Vec<DrawableChange>,
}

impl core::fmt::Debug for Display {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Display")
            .field("frame_index", &self.frame_index)
            .field("drawables", &self.drawables.live_count())
            .field("blocks", &self.blocks.live_count())
            .field("strategies", &self.strategies)
            .finish_non_exhaustive()
    }
}

impl Default for Display {
    fn default() -> Self {
        Self::new()
    }
}

impl Display {
    /// Creates an empty display with default options and no strategies.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(DisplayOptions::default())
    }

    /// Creates an empty display with the given options.
    #[must_use]
    pub fn with_options(options: DisplayOptions) -> Self {
        Self {
            drawables: DrawableStore::with_capacity(options.drawable_capacity),
            blocks: BlockStore::with_capacity(options.block_capacity),
            backbones: BackboneStore::with_capacity(options.backbone_capacity),
            strategies: Strategies::default(),
            paints: CountMap::new(create_paint, destroy_paint),
            drawable_dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            block_dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            frame_index: 0,
            #[cfg(feature = "trace-rich")]
            changes: Vec::new(),
        }
    }

    /// Installs the strategy for its renderer, returning the one it
    /// replaces.
    pub fn register_strategy(
        &mut self,
        strategy: Box<dyn RenderStrategy>,
    ) -> Option<Box<dyn RenderStrategy>> {
        self.strategies.insert(strategy)
    }

    /// Returns the number of completed [`update`](Self::update) calls.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Returns the drawable store for read access.
    #[must_use]
    pub fn drawables(&self) -> &DrawableStore {
        &self.drawables
    }

    /// Returns the block store for read access.
    #[must_use]
    pub fn block_store(&self) -> &BlockStore {
        &self.blocks
    }

    // -- Drawable lifecycle --

    /// Binds a pooled drawable to `renderer` and `instance`.
    ///
    /// The new drawable is dirty, so its first update initializes its
    /// backend object.
    pub fn create_drawable(&mut self, renderer: Renderer, instance: InstanceId) -> DrawableId {
        let id = self.drawables.acquire(renderer, instance);
        let view = self.drawable_view(id.idx);
        if let Some(strategy) = self.strategies.get_mut(renderer) {
            strategy.initialize_drawable(&view);
        }
        self.record(id.idx, RecordField::Created);
        self.queue(id.idx);
        id
    }

    /// Detaches a drawable from its block and returns it to its renderer's
    /// pool.
    ///
    /// Disposing twice is a debug assertion and a no-op in release builds.
    ///
    /// # Panics
    ///
    /// Panics if the drawable backs a nested backbone; dispose that backbone
    /// instead.
    pub fn dispose_drawable(&mut self, id: DrawableId) {
        debug_assert!(self.drawables.is_alive(id), "drawable {id:?} disposed twice");
        if !self.drawables.is_alive(id) {
            return;
        }
        let idx = id.idx;
        let i = idx as usize;
        assert!(
            self.drawables.backbone[i] == INVALID,
            "drawable backs a nested backbone; dispose the backbone instead"
        );
        if self.drawables.block[i] != INVALID {
            self.detach(idx, true);
        }
        self.drawable_dirty.remove_key(idx);

        let renderer = self.drawables.renderer[i];
        if let Some(strategy) = self.strategies.get_mut(renderer) {
            strategy.release_drawable(id);
        }
        self.drawables.release(id);
        self.record(idx, RecordField::Disposed);
    }

    // -- Dirty marking --

    /// Flags a drawable's appearance as changed.
    ///
    /// Queues the drawable for its backend update and, the first time, its
    /// block for repaint when the block is immediate-mode. Idempotent until
    /// the next [`update`](Self::update).
    pub fn mark_dirty(&mut self, id: DrawableId) {
        self.drawables.validate(id);
        self.record(id.idx, RecordField::Appearance);
        self.queue(id.idx);
    }

    fn queue(&mut self, drawable: u32) {
        let i = drawable as usize;
        if self.drawables.dirty[i] {
            return;
        }
        self.drawables.dirty[i] = true;
        self.drawable_dirty.mark(drawable, dirty::PAINT);
        let block = self.drawables.block[i];
        if block != INVALID && self.drawables.renderer[i].is_immediate() {
            self.block_dirty.mark(block, dirty::REPAINT);
        }
    }

    /// Sets a drawable's bounds.
    pub fn set_bounds(&mut self, id: DrawableId, bounds: Rect) {
        self.drawables.validate(id);
        let i = id.idx as usize;
        if self.drawables.bounds[i] == bounds {
            return;
        }
        self.drawables.bounds[i] = bounds;
        self.mark_fit(id.idx);
        self.record(id.idx, RecordField::Bounds);
        self.queue(id.idx);
    }

    /// Shows or hides a drawable.
    pub fn set_visible(&mut self, id: DrawableId, visible: bool) {
        self.drawables.validate(id);
        let i = id.idx as usize;
        if self.drawables.visible[i] == visible {
            return;
        }
        self.drawables.visible[i] = visible;
        self.mark_fit(id.idx);
        self.record(id.idx, RecordField::Visibility);
        self.queue(id.idx);
    }

    /// Replaces the shared paints a drawable references.
    ///
    /// While attached, the owning block's paint counts are rebalanced so
    /// resources no member references any more are destroyed.
    pub fn set_paints(&mut self, id: DrawableId, paints: &[PaintKey]) {
        self.drawables.validate(id);
        let i = id.idx as usize;
        if self.drawables.paints[i] == paints {
            return;
        }
        let block = self.drawables.block[i];
        if let Some(block_id) = self.blocks.id_at(block) {
            let renderer = self.blocks.renderer[block as usize];
            for &paint in paints {
                self.paints.increment(
                    &mut self.strategies,
                    BlockPaint {
                        block: block_id,
                        renderer,
                        paint,
                    },
                    1,
                );
            }
            for &paint in &self.drawables.paints[i] {
                self.paints.decrement(
                    &mut self.strategies,
                    &BlockPaint {
                        block: block_id,
                        renderer,
                        paint,
                    },
                    1,
                );
            }
        }
        self.drawables.paints[i].clear();
        self.drawables.paints[i].extend_from_slice(paints);
        self.record(id.idx, RecordField::Paints);
        self.queue(id.idx);
    }

    fn mark_fit(&mut self, drawable: u32) {
        let block = self.drawables.block[drawable as usize];
        if block != INVALID && self.blocks.renderer[block as usize].supports_fit() {
            self.block_dirty.mark(block, dirty::FIT);
        }
    }

    // -- Display order --

    /// Links `order` as the new display order, replacing the previous and
    /// next pointers of every listed drawable.
    ///
    /// The committed (old) order is untouched until the next stitch.
    ///
    /// # Panics
    ///
    /// Panics if any handle is stale.
    pub fn relink(&mut self, order: &[DrawableId]) {
        let mut previous = INVALID;
        for &id in order {
            self.drawables.validate(id);
            let i = id.idx as usize;
            self.drawables.previous[i] = previous;
            self.drawables.next[i] = INVALID;
            if previous != INVALID {
                self.drawables.next[previous as usize] = id.idx;
            }
            previous = id.idx;
        }
    }

    /// Iterates the order being built, from `first` to `last` inclusive.
    #[must_use]
    pub fn list(&self, first: Option<DrawableId>, last: Option<DrawableId>) -> DrawableList<'_> {
        self.drawables.list(first, last)
    }

    /// Iterates the order committed by the last stitch, from `first` to
    /// `last` inclusive.
    #[must_use]
    pub fn old_list(
        &self,
        first: Option<DrawableId>,
        last: Option<DrawableId>,
    ) -> DrawableList<'_> {
        self.drawables.old_list(first, last)
    }

    /// Returns the block a drawable belongs to.
    #[must_use]
    pub fn drawable_block(&self, id: DrawableId) -> Option<BlockId> {
        self.drawables.validate(id);
        self.blocks.id_at(self.drawables.block[id.idx as usize])
    }

    pub(crate) fn drawable_view(&self, idx: u32) -> DrawableView {
        let i = idx as usize;
        self.drawables.view(
            idx,
            self.blocks.id_at(self.drawables.block[i]),
            self.backbones.id_at(self.drawables.backbone[i]),
        )
    }

    // -- Stitching --

    /// Stitches `backbone` to the new order `first ..= last` with an
    /// [`IncrementalStitcher`], using the range committed by the previous
    /// stitch as the old order.
    pub fn stitch(
        &mut self,
        backbone: BackboneId,
        first: Option<DrawableId>,
        last: Option<DrawableId>,
        intervals: &[ChangeInterval],
        tracer: &mut Tracer<'_>,
    ) -> StitchStats {
        let (old_first, old_last) = self.stitched_range(backbone);
        let request = StitchRequest {
            backbone,
            first,
            last,
            old_first,
            old_last,
            intervals,
        };
        IncrementalStitcher::new().stitch(self, &request, tracer)
    }

    // -- Frame flush --

    /// Flushes all queued work to the render strategies.
    pub fn update(&mut self, tracer: &mut Tracer<'_>) -> UpdateSummary {
        let mut summary = UpdateSummary {
            frame_index: self.frame_index,
            ..UpdateSummary::default()
        };

        // 1. Retained drawables.
        let dirty_drawables: Vec<u32> = self
            .drawable_dirty
            .drain(dirty::PAINT)
            .deterministic()
            .run()
            .collect();
        for idx in dirty_drawables {
            let i = idx as usize;
            if !self.drawables.live[i] {
                continue;
            }
            let renderer = self.drawables.renderer[i];
            if renderer.is_immediate() {
                // Repainted with the block.
                self.drawables.dirty[i] = false;
                continue;
            }
            let view = self.drawable_view(idx);
            let proceed = self
                .strategies
                .get_mut(renderer)
                .is_none_or(|strategy| strategy.update_drawable(&view));
            if proceed {
                self.drawables.dirty[i] = false;
                summary.drawables_updated += 1;
            } else {
                self.drawable_dirty.mark(idx, dirty::PAINT);
            }
        }

        // 2. Fit bounds.
        let dirty_fits: Vec<u32> = self
            .block_dirty
            .drain(dirty::FIT)
            .deterministic()
            .run()
            .collect();
        for idx in dirty_fits {
            if !self.blocks.live[idx as usize] || !self.fit(idx) {
                continue;
            }
            summary.blocks_fitted += 1;
            let view = self.block_view(idx);
            if let Some(strategy) = self.strategies.get_mut(view.renderer) {
                strategy.fit_block(&view);
            }
            tracer.block(&BlockEvent {
                frame_index: self.frame_index,
                block: view.id,
                renderer: view.renderer,
                kind: BlockEventKind::Fitted,
            });
        }

        // 3. Repaints and member arrangement.
        let dirty_blocks: Vec<u32> = self
            .block_dirty
            .drain(dirty::REPAINT)
            .deterministic()
            .run()
            .collect();
        for idx in dirty_blocks {
            let b = idx as usize;
            if !self.blocks.live[b] {
                continue;
            }
            if self.blocks.failed[b] {
                summary.failed_blocks += 1;
                continue;
            }
            if self.blocks.renderer[b].is_immediate() {
                summary.blocks_repainted += 1;
                summary.drawables_drawn += self.repaint(idx, tracer);
            } else {
                self.arrange(idx);
                summary.blocks_arranged += 1;
            }
        }

        // 4. Backbones.
        summary.backbones_updated = self.flush_backbones();

        #[cfg(feature = "trace-rich")]
        {
            if !self.changes.is_empty() {
                tracer.drawable_changes(self.frame_index, &self.changes);
                self.changes.clear();
            }
        }

        tracer.update_summary(&summary);
        self.frame_index += 1;
        summary
    }

    /// Hands a retained block's members, in order, to its strategy.
    fn arrange(&mut self, block: u32) {
        let view = self.block_view(block);
        let members: Vec<DrawableId> = self
            .member_slots(block)
            .filter_map(|member| self.drawables.id_at(member))
            .collect();
        if let Some(strategy) = self.strategies.get_mut(view.renderer) {
            strategy.arrange_block(&view, &members);
        }
    }

    /// Clears (if needed) and redraws every member of an immediate block.
    ///
    /// Returns the number of members drawn.
    fn repaint(&mut self, block: u32, tracer: &mut Tracer<'_>) -> u32 {
        let b = block as usize;
        let renderer = self.blocks.renderer[b];
        let view = self.block_view(block);
        let members: Vec<u32> = self.member_slots(block).collect();
        let Some(strategy) = self.strategies.get_mut(renderer) else {
            return 0;
        };

        if self.blocks.painted_last[b] {
            strategy.clear_block(&view);
        }
        let mut painted = false;
        let mut drawn = 0;
        for member in members {
            let m = member as usize;
            let drawable = self.drawables.view(
                member,
                Some(view.id),
                self.backbones.id_at(self.drawables.backbone[m]),
            );
            drawn += 1;
            match strategy.draw(&view, &drawable) {
                PaintOutcome::Painted => painted = true,
                PaintOutcome::Empty => {}
                PaintOutcome::Unavailable => {
                    self.blocks.failed[b] = true;
                    tracer.resource_failure(&ResourceFailureEvent {
                        frame_index: self.frame_index,
                        block: view.id,
                        renderer,
                        drawable: Some(drawable.id),
                        kind: FailureKind::Paint,
                    });
                    break;
                }
            }
        }
        strategy.finish_block_paint(&view);
        self.blocks.painted_last[b] = painted;
        drawn
    }

    // -- Consistency --

    /// Checks the block structure of a backbone against the order its last
    /// stitch committed.
    ///
    /// # Panics
    ///
    /// Panics (in every build profile) on the first violated invariant:
    ///
    /// - every block is live, owned by this backbone, and indexed by its
    ///   position;
    /// - walking a block's range visits exactly its members, each of which
    ///   points back at the block;
    /// - the blocks' ranges concatenate to the committed order;
    /// - neighboring blocks that are not DOM never share a renderer;
    /// - DOM blocks hold exactly one drawable;
    /// - a nested backbone's backing drawable is placed in its parent.
    pub fn check_invariants(&self, id: BackboneId) {
        self.backbones.validate(id);
        let i = id.idx as usize;
        let mut concatenated = Vec::new();
        let mut previous: Option<Renderer> = None;
        for (position, &block) in self.backbones.blocks[i].iter().enumerate() {
            let b = block as usize;
            assert!(self.blocks.live[b], "block {block} in backbone is not live");
            assert_eq!(self.blocks.backbone[b], id.idx, "block {block} owned elsewhere");
            assert_eq!(
                self.blocks.index[b] as usize, position,
                "block {block} index out of date"
            );
            let renderer = self.blocks.renderer[b];
            let mut count = 0;
            for member in self.member_slots(block) {
                assert_eq!(
                    self.drawables.block[member as usize], block,
                    "drawable {member} walked in block {block} but owned by another"
                );
                assert_eq!(
                    self.drawables.renderer[member as usize], renderer,
                    "drawable {member} renderer differs from block {block}"
                );
                concatenated.push(member);
                count += 1;
            }
            assert_eq!(
                count, self.blocks.members[b],
                "block {block} range does not match its member count"
            );
            assert!(count > 0, "block {block} is empty");
            if renderer.is_dom() {
                assert_eq!(count, 1, "DOM block {block} holds {count} drawables");
            }
            if let Some(previous) = previous {
                assert!(
                    renderer.is_dom() || previous.is_dom() || renderer != previous,
                    "neighboring {renderer} blocks were not merged"
                );
            }
            previous = Some(renderer);
        }

        let committed: Vec<u32> = DrawableList::new(
            &self.drawables,
            self.backbones.previous_first[i],
            self.backbones.previous_last[i],
            Links::Old,
        )
        .map(DrawableId::index)
        .collect();
        assert_eq!(
            concatenated, committed,
            "blocks do not cover the committed order"
        );

        let parent = self.backbones.parent[i];
        let host = self.backbones.drawable[i];
        if parent != INVALID && host != INVALID {
            let block = self.drawables.block[host as usize];
            if block != INVALID {
                assert_eq!(
                    self.blocks.backbone[block as usize], parent,
                    "nested backbone host placed outside its parent"
                );
            }
        }
    }

    // -- Rich tracing --

    #[cfg_attr(
        not(feature = "trace-rich"),
        expect(unused_variables, reason = "only recorded with trace-rich")
    )]
    fn record(&mut self, drawable: u32, field: RecordField) {
        #[cfg(feature = "trace-rich")]
        self.changes.push(DrawableChange {
            drawable_index: drawable,
            field: match field {
                RecordField::Created => DrawableField::Created,
                RecordField::Disposed => DrawableField::Disposed,
                RecordField::Bounds => DrawableField::Bounds,
                RecordField::Visibility => DrawableField::Visibility,
                RecordField::Paints => DrawableField::Paints,
                RecordField::Appearance => DrawableField::Appearance,
            },
        });
    }
}

/// Local mirror of the rich-trace field tags, available in every build.
#[derive(Clone, Copy)]
enum RecordField {
    Created,
    Disposed,
    Bounds,
    Visibility,
    Paints,
    Appearance,
}
