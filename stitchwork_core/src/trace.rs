// Copyright 2026 the Stitchwork Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for stitching and display updates.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! stitchers and [`Display::update`](crate::display::Display::update) call as
//! they work. All method bodies default to no-ops, so implementing only the
//! events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`): gates [`DrawableChange`] batches and the
//!   corresponding `TraceSink` method.

use crate::backend::BackendError;
use crate::id::{BackboneId, BlockId, DrawableId};
use crate::renderer::Renderer;
use crate::stitch::StitchStats;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which stitcher produced a [`StitchEvent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StitchKind {
    /// [`RebuildStitcher`](crate::stitch::RebuildStitcher).
    Rebuild,
    /// [`IncrementalStitcher`](crate::stitch::IncrementalStitcher).
    Incremental,
}

/// What happened to a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockEventKind {
    /// The block was created and its surface requested.
    Created,
    /// The block was disposed.
    Disposed,
    /// The block's fit bounds changed.
    Fitted,
    /// The block's paint-order index changed.
    Reordered,
}

/// Where a backend resource failure was reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// [`RenderStrategy::create_block`](crate::backend::RenderStrategy::create_block)
    /// failed.
    Create(BackendError),
    /// [`RenderStrategy::on_add_to_block`](crate::backend::RenderStrategy::on_add_to_block)
    /// failed.
    Attach(BackendError),
    /// [`RenderStrategy::draw`](crate::backend::RenderStrategy::draw) reported
    /// an unavailable surface.
    Paint,
}

/// Which aspect of a drawable changed.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DrawableField {
    /// Bound to a pooled slot.
    Created,
    /// Returned to the pool.
    Disposed,
    /// Bounds changed.
    Bounds,
    /// Visibility changed.
    Visibility,
    /// Paint references changed.
    Paints,
    /// Marked dirty without a specific property.
    Appearance,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a stitch pass reaches the cleaned state.
#[derive(Clone, Copy, Debug)]
pub struct StitchEvent {
    /// Display frame counter at the time of the stitch.
    pub frame_index: u64,
    /// Backbone that was stitched.
    pub backbone: BackboneId,
    /// Which stitcher ran.
    pub kind: StitchKind,
    /// Number of change intervals supplied.
    pub intervals: u32,
    /// Work done by the pass.
    pub stats: StitchStats,
}

/// Emitted on block lifecycle and layout changes.
#[derive(Clone, Copy, Debug)]
pub struct BlockEvent {
    /// Display frame counter.
    pub frame_index: u64,
    /// The block.
    pub block: BlockId,
    /// Its renderer.
    pub renderer: Renderer,
    /// What happened.
    pub kind: BlockEventKind,
}

/// Emitted when a backend cannot provide a native resource.
#[derive(Clone, Copy, Debug)]
pub struct ResourceFailureEvent {
    /// Display frame counter.
    pub frame_index: u64,
    /// The block marked failed.
    pub block: BlockId,
    /// Its renderer.
    pub renderer: Renderer,
    /// The drawable involved, if the failure was per-drawable.
    pub drawable: Option<DrawableId>,
    /// Where the failure was reported.
    pub kind: FailureKind,
}

/// Per-update work summary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    /// Display frame counter.
    pub frame_index: u64,
    /// Drawables whose retained backend object was updated.
    pub drawables_updated: u32,
    /// Blocks whose fit bounds were recomputed.
    pub blocks_fitted: u32,
    /// Immediate-mode blocks that were repainted.
    pub blocks_repainted: u32,
    /// Retained-mode blocks whose member order was handed to the backend.
    pub blocks_arranged: u32,
    /// Drawables drawn during repaints.
    pub drawables_drawn: u32,
    /// Backbones whose transform or clip was applied.
    pub backbones_updated: u32,
    /// Blocks skipped because they are marked failed.
    pub failed_blocks: u32,
}

/// A per-update drawable change record.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawableChange {
    /// Slot index of the drawable.
    pub drawable_index: u32,
    /// Which aspect changed.
    pub field: DrawableField,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from stitching and display updates.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a stitch pass finishes.
    fn on_stitch(&mut self, e: &StitchEvent) {
        _ = e;
    }

    /// Called on block lifecycle and layout changes.
    fn on_block(&mut self, e: &BlockEvent) {
        _ = e;
    }

    /// Called when a backend resource failure marks a block failed.
    fn on_resource_failure(&mut self, e: &ResourceFailureEvent) {
        _ = e;
    }

    /// Called at the end of every display update.
    fn on_update_summary(&mut self, s: &UpdateSummary) {
        _ = s;
    }

    /// Called with the drawable changes flushed by a display update
    /// (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    fn on_drawable_changes(&mut self, frame_index: u64, changes: &[DrawableChange]) {
        _ = (frame_index, changes);
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`StitchEvent`].
    #[inline]
    pub fn stitch(&mut self, e: &StitchEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_stitch(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`BlockEvent`].
    #[inline]
    pub fn block(&mut self, e: &BlockEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_block(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`ResourceFailureEvent`].
    #[inline]
    pub fn resource_failure(&mut self, e: &ResourceFailureEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_resource_failure(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits an [`UpdateSummary`].
    #[inline]
    pub fn update_summary(&mut self, s: &UpdateSummary) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_update_summary(s);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = s;
        }
    }

    /// Emits drawable changes (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn drawable_changes(&mut self, frame_index: u64, changes: &[DrawableChange]) {
        if let Some(s) = &mut self.sink {
            s.on_drawable_changes(frame_index, changes);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
