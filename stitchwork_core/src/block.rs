// Copyright 2026 the Stitchwork Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Blocks: contiguous same-renderer runs of drawables.
//!
//! A block is bound to one backend surface (a DOM layer, an SVG root, a
//! canvas bitmap, a WebGL batch). Its membership is the inclusive range
//! `first ..= last` of the committed display order; the stitchers keep that
//! range, the per-drawable `block` field, and the member count in agreement.
//!
//! Storage follows the same struct-of-arrays and per-renderer pool layout as
//! [`DrawableStore`](crate::drawable::DrawableStore). The membership
//! operations live on [`Display`] because they need the drawable store, the
//! render strategies, and the dirty trackers together.

use alloc::vec::Vec;

use kurbo::Rect;

use crate::backend::BlockView;
use crate::dirty;
use crate::display::Display;
use crate::drawable::{DrawableList, Links};
use crate::id::{BackboneId, BlockId, BlockPaint, DrawableId, INVALID};
use crate::renderer::Renderer;
use crate::trace::{BlockEvent, BlockEventKind, FailureKind, ResourceFailureEvent, Tracer};

/// Struct-of-arrays storage for all blocks.
#[derive(Debug)]
pub struct BlockStore {
    pub(crate) renderer: Vec<Renderer>,
    pub(crate) backbone: Vec<u32>,

    // -- Membership --
    pub(crate) first: Vec<u32>,
    pub(crate) last: Vec<u32>,
    pub(crate) members: Vec<u32>,

    // -- Layout --
    /// Position in the backbone's block list; [`INVALID`] until first
    /// ordered.
    pub(crate) index: Vec<u32>,
    pub(crate) fit_bounds: Vec<Rect>,

    // -- Surface state --
    pub(crate) painted_last: Vec<bool>,
    pub(crate) failed: Vec<bool>,

    // -- Allocation --
    pub(crate) live: Vec<bool>,
    pub(crate) generation: Vec<u32>,
    pub(crate) free: [Vec<u32>; Renderer::COUNT],
    pub(crate) len: u32,
}

impl Default for BlockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty store with room for `capacity` blocks.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            renderer: Vec::with_capacity(capacity),
            backbone: Vec::with_capacity(capacity),
            first: Vec::with_capacity(capacity),
            last: Vec::with_capacity(capacity),
            members: Vec::with_capacity(capacity),
            index: Vec::with_capacity(capacity),
            fit_bounds: Vec::with_capacity(capacity),
            painted_last: Vec::with_capacity(capacity),
            failed: Vec::with_capacity(capacity),
            live: Vec::with_capacity(capacity),
            generation: Vec::with_capacity(capacity),
            free: core::array::from_fn(|_| Vec::new()),
            len: 0,
        }
    }

    pub(crate) fn acquire(&mut self, renderer: Renderer, backbone: u32) -> BlockId {
        let idx = if let Some(idx) = self.free[renderer.index()].pop() {
            debug_assert!(!self.live[idx as usize], "pooled block {idx} is still live");
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.renderer.push(renderer);
            self.backbone.push(INVALID);
            self.first.push(INVALID);
            self.last.push(INVALID);
            self.members.push(0);
            self.index.push(INVALID);
            self.fit_bounds.push(Rect::ZERO);
            self.painted_last.push(false);
            self.failed.push(false);
            self.live.push(false);
            self.generation.push(0);
            idx
        };

        let i = idx as usize;
        self.renderer[i] = renderer;
        self.backbone[i] = backbone;
        self.first[i] = INVALID;
        self.last[i] = INVALID;
        self.members[i] = 0;
        self.index[i] = INVALID;
        self.fit_bounds[i] = Rect::ZERO;
        self.painted_last[i] = false;
        self.failed[i] = false;
        self.live[i] = true;

        BlockId {
            idx,
            generation: self.generation[i],
        }
    }

    pub(crate) fn release(&mut self, idx: u32) {
        let i = idx as usize;
        debug_assert!(self.live[i], "block {idx} released twice");
        debug_assert_eq!(
            self.members[i], 0,
            "block {idx} released with live members"
        );
        self.live[i] = false;
        self.backbone[i] = INVALID;
        self.first[i] = INVALID;
        self.last[i] = INVALID;
        self.generation[i] += 1;
        self.free[self.renderer[i].index()].push(idx);
    }

    /// Returns whether the handle refers to a live block.
    #[must_use]
    pub fn is_alive(&self, id: BlockId) -> bool {
        id.idx < self.len
            && self.generation[id.idx as usize] == id.generation
            && self.live[id.idx as usize]
    }

    /// Returns the number of live blocks.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.iter().filter(|live| **live).count()
    }

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: BlockId) {
        assert!(self.is_alive(id), "stale BlockId: {id:?}");
    }

    pub(crate) fn id_at(&self, idx: u32) -> Option<BlockId> {
        (idx != INVALID).then(|| BlockId {
            idx,
            generation: self.generation[idx as usize],
        })
    }
}

// ---------------------------------------------------------------------------
// Block operations on the display
// ---------------------------------------------------------------------------

impl Display {
    /// Builds the strategy-facing snapshot of block slot `idx`.
    pub(crate) fn block_view(&self, idx: u32) -> BlockView {
        let i = idx as usize;
        let backbone = self.blocks.backbone[i];
        BlockView {
            id: BlockId {
                idx,
                generation: self.blocks.generation[i],
            },
            renderer: self.blocks.renderer[i],
            backbone: BackboneId {
                idx: backbone,
                generation: self.backbones.generation[backbone as usize],
            },
            backbone_drawable: self
                .drawables
                .id_at(self.backbones.drawable[backbone as usize]),
            index: self.blocks.index[i],
            fit_bounds: self.blocks.fit_bounds[i],
        }
    }

    /// Iterates the members of block slot `idx` in display order.
    pub(crate) fn member_slots(&self, idx: u32) -> impl Iterator<Item = u32> + '_ {
        let i = idx as usize;
        DrawableList::new(
            &self.drawables,
            self.blocks.first[i],
            self.blocks.last[i],
            Links::Old,
        )
        .map(DrawableId::index)
    }

    /// Creates a block for `renderer` in `backbone` and requests its surface.
    ///
    /// A surface failure leaves the block in place, marked failed.
    pub(crate) fn create_block(
        &mut self,
        renderer: Renderer,
        backbone: u32,
        tracer: &mut Tracer<'_>,
    ) -> u32 {
        let id = self.blocks.acquire(renderer, backbone);
        let view = self.block_view(id.idx);
        let result = match self.strategies.get_mut(renderer) {
            Some(strategy) => strategy.create_block(&view),
            None => Err(crate::backend::BackendError::Unsupported(renderer)),
        };
        tracer.block(&BlockEvent {
            frame_index: self.frame_index,
            block: id,
            renderer,
            kind: BlockEventKind::Created,
        });
        if let Err(error) = result {
            self.blocks.failed[id.idx as usize] = true;
            tracer.resource_failure(&ResourceFailureEvent {
                frame_index: self.frame_index,
                block: id,
                renderer,
                drawable: None,
                kind: FailureKind::Create(error),
            });
        }
        id.idx
    }

    /// Destroys an empty block's surface and returns the slot to the pool.
    pub(crate) fn dispose_block(&mut self, idx: u32, tracer: &mut Tracer<'_>) {
        let i = idx as usize;
        debug_assert_eq!(
            self.blocks.members[i], 0,
            "disposing block {idx} that still has members"
        );
        let renderer = self.blocks.renderer[i];
        let id = BlockId {
            idx,
            generation: self.blocks.generation[i],
        };
        if let Some(strategy) = self.strategies.get_mut(renderer) {
            strategy.dispose_block(id);
        }
        self.block_dirty.remove_key(idx);
        self.blocks.release(idx);
        tracer.block(&BlockEvent {
            frame_index: self.frame_index,
            block: id,
            renderer,
            kind: BlockEventKind::Disposed,
        });
    }

    /// Queues a block for repaint, and for refit when its renderer fits.
    pub(crate) fn mark_block(&mut self, idx: u32) {
        self.block_dirty.mark(idx, dirty::REPAINT);
        if self.blocks.renderer[idx as usize].supports_fit() {
            self.block_dirty.mark(idx, dirty::FIT);
        }
    }

    /// Adds drawable slot `drawable` to block slot `block`.
    ///
    /// Takes a reference on each of the drawable's paints inside the block
    /// and runs the strategy's attach hook. A failing hook marks the block
    /// failed; membership is recorded either way.
    pub(crate) fn attach(&mut self, drawable: u32, block: u32, tracer: &mut Tracer<'_>) {
        let d = drawable as usize;
        let b = block as usize;
        debug_assert_eq!(
            self.drawables.block[d], INVALID,
            "drawable {drawable} attached while owned by block {}",
            self.drawables.block[d]
        );
        debug_assert_eq!(
            self.drawables.renderer[d], self.blocks.renderer[b],
            "renderer mismatch attaching drawable {drawable} to block {block}"
        );

        self.drawables.block[d] = block;
        self.blocks.members[b] += 1;

        let renderer = self.blocks.renderer[b];
        let block_id = BlockId {
            idx: block,
            generation: self.blocks.generation[b],
        };
        for &paint in &self.drawables.paints[d] {
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

        let block_view = self.block_view(block);
        let drawable_view = self.drawable_view(drawable);
        let result = match self.strategies.get_mut(renderer) {
            Some(strategy) => strategy.on_add_to_block(&block_view, &drawable_view),
            None => Ok(()),
        };
        if let Err(error) = result {
            self.blocks.failed[b] = true;
            tracer.resource_failure(&ResourceFailureEvent {
                frame_index: self.frame_index,
                block: block_id,
                renderer,
                drawable: Some(drawable_view.id),
                kind: FailureKind::Attach(error),
            });
        }
        self.mark_block(block);
    }

    /// Removes drawable slot `drawable` from its block.
    ///
    /// With `splice` set (outside a stitch), the committed order is repaired
    /// around the drawable: the block's range and the backbone's stitched
    /// range skip it, its old neighbors are linked to each other, and a
    /// block left empty is disposed.
    pub(crate) fn detach(&mut self, drawable: u32, splice: bool) {
        let d = drawable as usize;
        let block = self.drawables.block[d];
        debug_assert_ne!(block, INVALID, "drawable {drawable} detached without a block");
        if block == INVALID {
            return;
        }
        let b = block as usize;
        let renderer = self.blocks.renderer[b];
        let block_id = BlockId {
            idx: block,
            generation: self.blocks.generation[b],
        };

        for &paint in &self.drawables.paints[d] {
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
        if let Some(strategy) = self.strategies.get_mut(renderer) {
            strategy.on_remove_from_block(
                block_id,
                DrawableId {
                    idx: drawable,
                    generation: self.drawables.generation[d],
                },
            );
        }

        self.drawables.block[d] = INVALID;
        self.blocks.members[b] -= 1;

        if !splice {
            self.mark_block(block);
            return;
        }

        let prev = self.drawables.old_previous[d];
        let next = self.drawables.old_next[d];
        if self.blocks.members[b] == 0 {
            self.blocks.first[b] = INVALID;
            self.blocks.last[b] = INVALID;
        } else {
            if self.blocks.first[b] == drawable {
                self.blocks.first[b] = next;
            }
            if self.blocks.last[b] == drawable {
                self.blocks.last[b] = prev;
            }
        }

        let backbone = self.blocks.backbone[b] as usize;
        if self.backbones.previous_first[backbone] == drawable {
            self.backbones.previous_first[backbone] = next;
        }
        if self.backbones.previous_last[backbone] == drawable {
            self.backbones.previous_last[backbone] = prev;
        }
        if prev != INVALID {
            self.drawables.old_next[prev as usize] = next;
        }
        if next != INVALID {
            self.drawables.old_previous[next as usize] = prev;
        }
        self.drawables.old_previous[d] = INVALID;
        self.drawables.old_next[d] = INVALID;

        if self.blocks.members[b] == 0 {
            self.backbones.blocks[backbone].retain(|&other| other != block);
            self.dispose_block(block, &mut Tracer::none());
            self.reindex(backbone as u32, &mut Tracer::none());
        } else {
            self.mark_block(block);
        }
    }

    /// Assigns positional indices to a backbone's blocks, notifying the
    /// strategy of every block whose position changed.
    pub(crate) fn reindex(&mut self, backbone: u32, tracer: &mut Tracer<'_>) -> u32 {
        let mut reordered = 0;
        for position in 0..self.backbones.blocks[backbone as usize].len() {
            let block = self.backbones.blocks[backbone as usize][position];
            #[expect(
                clippy::cast_possible_truncation,
                reason = "block lists are indexed by u32 slots"
            )]
            let position = position as u32;
            let b = block as usize;
            if self.blocks.index[b] == position {
                continue;
            }
            self.blocks.index[b] = position;
            reordered += 1;
            let view = self.block_view(block);
            if let Some(strategy) = self.strategies.get_mut(view.renderer) {
                strategy.order_block(&view);
            }
            tracer.block(&BlockEvent {
                frame_index: self.frame_index,
                block: view.id,
                renderer: view.renderer,
                kind: BlockEventKind::Reordered,
            });
        }
        reordered
    }

    /// Recomputes a block's fit bounds from its visible members.
    ///
    /// Returns whether the bounds changed. A block with no visible members
    /// fits to [`Rect::ZERO`].
    pub(crate) fn fit(&mut self, block: u32) -> bool {
        let mut union: Option<Rect> = None;
        for member in self.member_slots(block) {
            let m = member as usize;
            if !self.drawables.visible[m] {
                continue;
            }
            let bounds = self.drawables.bounds[m];
            union = Some(union.map_or(bounds, |acc| acc.union(bounds)));
        }
        let fitted = union.unwrap_or(Rect::ZERO);
        let b = block as usize;
        if self.blocks.fit_bounds[b] == fitted {
            return false;
        }
        self.blocks.fit_bounds[b] = fitted;
        true
    }

    // -- Public block queries --

    /// Iterates the members of a block in display order.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn block_members(&self, block: BlockId) -> DrawableList<'_> {
        self.blocks.validate(block);
        let i = block.idx as usize;
        DrawableList::new(
            &self.drawables,
            self.blocks.first[i],
            self.blocks.last[i],
            Links::Old,
        )
    }

    /// Returns the number of drawables in a block.
    #[must_use]
    pub fn block_len(&self, block: BlockId) -> u32 {
        self.blocks.validate(block);
        self.blocks.members[block.idx as usize]
    }

    /// Returns a block's renderer.
    #[must_use]
    pub fn block_renderer(&self, block: BlockId) -> Renderer {
        self.blocks.validate(block);
        self.blocks.renderer[block.idx as usize]
    }

    /// Returns a block's current fit bounds.
    #[must_use]
    pub fn block_fit_bounds(&self, block: BlockId) -> Rect {
        self.blocks.validate(block);
        self.blocks.fit_bounds[block.idx as usize]
    }

    /// Returns a block's position in its backbone.
    #[must_use]
    pub fn block_index(&self, block: BlockId) -> u32 {
        self.blocks.validate(block);
        self.blocks.index[block.idx as usize]
    }

    /// Returns whether a block's backend resources failed.
    #[must_use]
    pub fn block_failed(&self, block: BlockId) -> bool {
        self.blocks.validate(block);
        self.blocks.failed[block.idx as usize]
    }

    /// Clears a block's failed flag and queues it for repaint.
    ///
    /// Call this once the backend can serve the block again (for example
    /// after a WebGL context is restored).
    pub fn reset_failed(&mut self, block: BlockId) {
        self.blocks.validate(block);
        self.blocks.failed[block.idx as usize] = false;
        self.blocks.painted_last[block.idx as usize] = false;
        self.mark_block(block.idx);
    }

    /// Returns the resource a block holds for `paint`, if any member
    /// references it.
    #[must_use]
    pub fn block_paint(
        &self,
        block: BlockId,
        paint: crate::id::PaintKey,
    ) -> Option<crate::id::ResourceKey> {
        self.blocks.validate(block);
        let key = BlockPaint {
            block,
            renderer: self.blocks.renderer[block.idx as usize],
            paint,
        };
        self.paints.get(&key).copied().flatten()
    }

    /// Returns how many members of a block reference `paint`.
    #[must_use]
    pub fn block_paint_count(&self, block: BlockId, paint: crate::id::PaintKey) -> u32 {
        self.blocks.validate(block);
        self.paints.count(&BlockPaint {
            block,
            renderer: self.blocks.renderer[block.idx as usize],
            paint,
        })
    }
}
