// Copyright 2026 the Stitchwork Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records. [`decode`] reads them back
//! as an iterator of [`RecordedEvent`].
//!
//! Handles are recorded as raw `(index, generation)` pairs ([`RawId`]), since
//! a recording outlives the display that issued them. Drawable-change batches
//! store only their count, and [`BackendError::CreateFailed`] loses the name
//! of the object that could not be created.

use stitchwork_core::backend::BackendError;
use stitchwork_core::id::{BackboneId, BlockId, DrawableId};
use stitchwork_core::renderer::Renderer;
use stitchwork_core::stitch::StitchStats;
use stitchwork_core::trace::{
    BlockEvent, BlockEventKind, DrawableChange, FailureKind, ResourceFailureEvent, StitchEvent,
    StitchKind, TraceSink, UpdateSummary,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_STITCH: u8 = 1;
const TAG_BLOCK: u8 = 2;
const TAG_RESOURCE_FAILURE: u8 = 3;
const TAG_UPDATE_SUMMARY: u8 = 4;
const TAG_DRAWABLE_CHANGES_COUNT: u8 = 5;

const FAILURE_CREATE: u8 = 0;
const FAILURE_ATTACH: u8 = 1;
const FAILURE_PAINT: u8 = 2;

const ERROR_CONTEXT_LOST: u8 = 0;
const ERROR_CREATE_FAILED: u8 = 1;
const ERROR_UNSUPPORTED: u8 = 2;

// ---------------------------------------------------------------------------
// Decoded types
// ---------------------------------------------------------------------------

/// A handle as recorded: slot index plus generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RawId {
    /// Slot index.
    pub index: u32,
    /// Slot generation.
    pub generation: u32,
}

impl From<BlockId> for RawId {
    fn from(id: BlockId) -> Self {
        Self {
            index: id.index(),
            generation: id.generation(),
        }
    }
}

impl From<DrawableId> for RawId {
    fn from(id: DrawableId) -> Self {
        Self {
            index: id.index(),
            generation: id.generation(),
        }
    }
}

impl From<BackboneId> for RawId {
    fn from(id: BackboneId) -> Self {
        Self {
            index: id.index(),
            generation: id.generation(),
        }
    }
}

/// A recorded [`BackendError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordedError {
    /// [`BackendError::ContextLost`].
    ContextLost,
    /// [`BackendError::CreateFailed`], without the object name.
    CreateFailed,
    /// [`BackendError::Unsupported`].
    Unsupported(Renderer),
}

/// A recorded [`FailureKind`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordedFailure {
    /// [`FailureKind::Create`].
    Create(RecordedError),
    /// [`FailureKind::Attach`].
    Attach(RecordedError),
    /// [`FailureKind::Paint`].
    Paint,
}

/// A decoded event from a binary recording.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordedEvent {
    /// A [`StitchEvent`].
    Stitch {
        /// Display frame counter.
        frame_index: u64,
        /// Backbone that was stitched.
        backbone: RawId,
        /// Which stitcher ran.
        kind: StitchKind,
        /// Number of change intervals supplied.
        intervals: u32,
        /// Work done by the pass.
        stats: StitchStats,
    },
    /// A [`BlockEvent`].
    Block {
        /// Display frame counter.
        frame_index: u64,
        /// The block.
        block: RawId,
        /// Its renderer.
        renderer: Renderer,
        /// What happened.
        kind: BlockEventKind,
    },
    /// A [`ResourceFailureEvent`].
    ResourceFailure {
        /// Display frame counter.
        frame_index: u64,
        /// The block marked failed.
        block: RawId,
        /// Its renderer.
        renderer: Renderer,
        /// The drawable involved, if any.
        drawable: Option<RawId>,
        /// Where the failure was reported.
        kind: RecordedFailure,
    },
    /// An [`UpdateSummary`].
    UpdateSummary(UpdateSummary),
    /// Drawable-change count for a frame.
    DrawableChangesCount {
        /// Display frame counter.
        frame_index: u64,
        /// Number of drawable changes.
        count: u32,
    },
}

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Discards everything recorded so far.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_id(&mut self, id: RawId) {
        self.write_u32(id.index);
        self.write_u32(id.generation);
    }

    fn write_option_id(&mut self, id: Option<RawId>) {
        match id {
            Some(id) => {
                self.write_u8(1);
                self.write_id(id);
            }
            None => {
                self.write_u8(0);
                self.write_u32(0);
                self.write_u32(0);
            }
        }
    }

    fn write_renderer(&mut self, renderer: Renderer) {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "there are four renderer tags"
        )]
        self.write_u8(renderer.index() as u8);
    }

    fn write_error(&mut self, error: BackendError) {
        match error {
            BackendError::ContextLost => {
                self.write_u8(ERROR_CONTEXT_LOST);
                self.write_u8(0);
            }
            BackendError::CreateFailed(_) => {
                self.write_u8(ERROR_CREATE_FAILED);
                self.write_u8(0);
            }
            BackendError::Unsupported(renderer) => {
                self.write_u8(ERROR_UNSUPPORTED);
                self.write_renderer(renderer);
            }
        }
    }
}

impl TraceSink for RecorderSink {
    fn on_stitch(&mut self, e: &StitchEvent) {
        self.write_u8(TAG_STITCH);
        self.write_u64(e.frame_index);
        self.write_id(e.backbone.into());
        self.write_u8(match e.kind {
            StitchKind::Rebuild => 0,
            StitchKind::Incremental => 1,
        });
        self.write_u32(e.intervals);
        let s = &e.stats;
        self.write_u32(s.blocks_created);
        self.write_u32(s.blocks_reused);
        self.write_u32(s.blocks_disposed);
        self.write_u32(s.drawables_added);
        self.write_u32(s.drawables_removed);
        self.write_u32(s.drawables_moved);
        self.write_u8(u8::from(s.fast_path));
    }

    fn on_block(&mut self, e: &BlockEvent) {
        self.write_u8(TAG_BLOCK);
        self.write_u64(e.frame_index);
        self.write_id(e.block.into());
        self.write_renderer(e.renderer);
        self.write_u8(match e.kind {
            BlockEventKind::Created => 0,
            BlockEventKind::Disposed => 1,
            BlockEventKind::Fitted => 2,
            BlockEventKind::Reordered => 3,
        });
    }

    fn on_resource_failure(&mut self, e: &ResourceFailureEvent) {
        self.write_u8(TAG_RESOURCE_FAILURE);
        self.write_u64(e.frame_index);
        self.write_id(e.block.into());
        self.write_renderer(e.renderer);
        self.write_option_id(e.drawable.map(RawId::from));
        match e.kind {
            FailureKind::Create(error) => {
                self.write_u8(FAILURE_CREATE);
                self.write_error(error);
            }
            FailureKind::Attach(error) => {
                self.write_u8(FAILURE_ATTACH);
                self.write_error(error);
            }
            FailureKind::Paint => {
                self.write_u8(FAILURE_PAINT);
                self.write_u8(0);
                self.write_u8(0);
            }
        }
    }

    fn on_update_summary(&mut self, s: &UpdateSummary) {
        self.write_u8(TAG_UPDATE_SUMMARY);
        self.write_u64(s.frame_index);
        self.write_u32(s.drawables_updated);
        self.write_u32(s.blocks_fitted);
        self.write_u32(s.blocks_repainted);
        self.write_u32(s.blocks_arranged);
        self.write_u32(s.drawables_drawn);
        self.write_u32(s.backbones_updated);
        self.write_u32(s.failed_blocks);
    }

    fn on_drawable_changes(&mut self, frame_index: u64, changes: &[DrawableChange]) {
        self.write_u8(TAG_DRAWABLE_CHANGES_COUNT);
        self.write_u64(frame_index);
        self.write_u32(u32::try_from(changes.len()).unwrap_or(u32::MAX));
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
///
/// Iteration stops at the first truncated record or unknown tag.
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.pos..self.pos + N)?;
        self.pos += N;
        bytes.try_into().ok()
    }

    fn read_u8(&mut self) -> Option<u8> {
        Some(self.take::<1>()?[0])
    }

    fn read_u32(&mut self) -> Option<u32> {
        Some(u32::from_le_bytes(self.take()?))
    }

    fn read_u64(&mut self) -> Option<u64> {
        Some(u64::from_le_bytes(self.take()?))
    }

    fn read_id(&mut self) -> Option<RawId> {
        Some(RawId {
            index: self.read_u32()?,
            generation: self.read_u32()?,
        })
    }

    fn read_option_id(&mut self) -> Option<Option<RawId>> {
        let present = self.read_u8()?;
        let id = self.read_id()?;
        Some((present != 0).then_some(id))
    }

    fn read_renderer(&mut self) -> Option<Renderer> {
        Renderer::ALL.get(usize::from(self.read_u8()?)).copied()
    }

    fn read_error(&mut self) -> Option<RecordedError> {
        let tag = self.read_u8()?;
        let operand = self.read_u8()?;
        Some(match tag {
            ERROR_CONTEXT_LOST => RecordedError::ContextLost,
            ERROR_CREATE_FAILED => RecordedError::CreateFailed,
            _ => RecordedError::Unsupported(*Renderer::ALL.get(usize::from(operand))?),
        })
    }

    fn decode_stitch(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Stitch {
            frame_index: self.read_u64()?,
            backbone: self.read_id()?,
            kind: match self.read_u8()? {
                0 => StitchKind::Rebuild,
                _ => StitchKind::Incremental,
            },
            intervals: self.read_u32()?,
            stats: StitchStats {
                blocks_created: self.read_u32()?,
                blocks_reused: self.read_u32()?,
                blocks_disposed: self.read_u32()?,
                drawables_added: self.read_u32()?,
                drawables_removed: self.read_u32()?,
                drawables_moved: self.read_u32()?,
                fast_path: self.read_u8()? != 0,
            },
        })
    }

    fn decode_block(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Block {
            frame_index: self.read_u64()?,
            block: self.read_id()?,
            renderer: self.read_renderer()?,
            kind: match self.read_u8()? {
                0 => BlockEventKind::Created,
                1 => BlockEventKind::Disposed,
                2 => BlockEventKind::Fitted,
                _ => BlockEventKind::Reordered,
            },
        })
    }

    fn decode_resource_failure(&mut self) -> Option<RecordedEvent> {
        let frame_index = self.read_u64()?;
        let block = self.read_id()?;
        let renderer = self.read_renderer()?;
        let drawable = self.read_option_id()?;
        let kind = match self.read_u8()? {
            FAILURE_CREATE => RecordedFailure::Create(self.read_error()?),
            FAILURE_ATTACH => RecordedFailure::Attach(self.read_error()?),
            _ => {
                self.take::<2>()?;
                RecordedFailure::Paint
            }
        };
        Some(RecordedEvent::ResourceFailure {
            frame_index,
            block,
            renderer,
            drawable,
            kind,
        })
    }

    fn decode_update_summary(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::UpdateSummary(UpdateSummary {
            frame_index: self.read_u64()?,
            drawables_updated: self.read_u32()?,
            blocks_fitted: self.read_u32()?,
            blocks_repainted: self.read_u32()?,
            blocks_arranged: self.read_u32()?,
            drawables_drawn: self.read_u32()?,
            backbones_updated: self.read_u32()?,
            failed_blocks: self.read_u32()?,
        }))
    }

    fn decode_drawable_changes_count(&mut self) -> Option<RecordedEvent> {
        let frame_index = self.read_u64()?;
        let count = self.read_u32()?;
        Some(RecordedEvent::DrawableChangesCount { frame_index, count })
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_STITCH => self.decode_stitch(),
            TAG_BLOCK => self.decode_block(),
            TAG_RESOURCE_FAILURE => self.decode_resource_failure(),
            TAG_UPDATE_SUMMARY => self.decode_update_summary(),
            TAG_DRAWABLE_CHANGES_COUNT => self.decode_drawable_changes_count(),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
