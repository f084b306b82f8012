// Copyright 2026 the Stitchwork Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use stitchwork_core::trace::{
    BlockEvent, BlockEventKind, DrawableChange, DrawableField, FailureKind, ResourceFailureEvent,
    StitchEvent, StitchKind, TraceSink, UpdateSummary,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    /// Print only the count of drawable changes, not each change.
    compact_changes: bool,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("compact_changes", &self.compact_changes)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::with_writer(Box::new(std::io::stderr()))
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self::with_writer(writer)
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer,
            compact_changes: false,
        }
    }

    /// Prints one summary line per drawable-change batch instead of one line
    /// per change.
    #[must_use]
    pub fn compact_changes(mut self, compact: bool) -> Self {
        self.compact_changes = compact;
        self
    }

    /// Consumes the sink and returns its writer.
    pub fn into_writer(self) -> W {
        self.writer
    }
}

fn stitch_name(kind: StitchKind) -> &'static str {
    match kind {
        StitchKind::Rebuild => "rebuild",
        StitchKind::Incremental => "incremental",
    }
}

fn block_kind_name(kind: BlockEventKind) -> &'static str {
    match kind {
        BlockEventKind::Created => "created",
        BlockEventKind::Disposed => "disposed",
        BlockEventKind::Fitted => "fitted",
        BlockEventKind::Reordered => "reordered",
    }
}

fn field_name(field: DrawableField) -> &'static str {
    match field {
        DrawableField::Created => "created",
        DrawableField::Disposed => "disposed",
        DrawableField::Bounds => "bounds",
        DrawableField::Visibility => "visibility",
        DrawableField::Paints => "paints",
        DrawableField::Appearance => "appearance",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_stitch(&mut self, e: &StitchEvent) {
        let s = &e.stats;
        if s.fast_path {
            let _ = writeln!(
                self.writer,
                "[stitch] frame={} backbone={:?} kind={} fast-path",
                e.frame_index,
                e.backbone,
                stitch_name(e.kind),
            );
            return;
        }
        let _ = writeln!(
            self.writer,
            "[stitch] frame={} backbone={:?} kind={} intervals={} \
             created={} reused={} disposed={} added={} removed={} moved={}",
            e.frame_index,
            e.backbone,
            stitch_name(e.kind),
            e.intervals,
            s.blocks_created,
            s.blocks_reused,
            s.blocks_disposed,
            s.drawables_added,
            s.drawables_removed,
            s.drawables_moved,
        );
    }

    fn on_block(&mut self, e: &BlockEvent) {
        let _ = writeln!(
            self.writer,
            "[block] frame={} {:?} renderer={} {}",
            e.frame_index,
            e.block,
            e.renderer,
            block_kind_name(e.kind),
        );
    }

    fn on_resource_failure(&mut self, e: &ResourceFailureEvent) {
        let reason = match e.kind {
            FailureKind::Create(err) => format!("create: {err}"),
            FailureKind::Attach(err) => format!("attach: {err}"),
            FailureKind::Paint => "paint: surface unavailable".to_owned(),
        };
        match e.drawable {
            Some(drawable) => {
                let _ = writeln!(
                    self.writer,
                    "[FAILED] frame={} {:?} renderer={} drawable={:?} {reason}",
                    e.frame_index, e.block, e.renderer, drawable,
                );
            }
            None => {
                let _ = writeln!(
                    self.writer,
                    "[FAILED] frame={} {:?} renderer={} {reason}",
                    e.frame_index, e.block, e.renderer,
                );
            }
        }
    }

    fn on_update_summary(&mut self, s: &UpdateSummary) {
        let _ = writeln!(
            self.writer,
            "[update] frame={} drawables={} fitted={} repainted={} arranged={} drawn={} \
             backbones={} failed={}",
            s.frame_index,
            s.drawables_updated,
            s.blocks_fitted,
            s.blocks_repainted,
            s.blocks_arranged,
            s.drawables_drawn,
            s.backbones_updated,
            s.failed_blocks,
        );
    }

    fn on_drawable_changes(&mut self, frame_index: u64, changes: &[DrawableChange]) {
        if self.compact_changes {
            let _ = writeln!(
                self.writer,
                "[changes] frame={frame_index} count={}",
                changes.len()
            );
            return;
        }
        for c in changes {
            let _ = writeln!(
                self.writer,
                "[change] frame={frame_index} drawable={} {}",
                c.drawable_index,
                field_name(c.field),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Rect;
    use stitchwork_core::stitch::ChangeInterval;
    use stitchwork_core::trace::Tracer;
    use stitchwork_core::{Display, InstanceId, Renderer};

    /// Runs one stitch and update of `renderers` with no strategies
    /// registered, so every block fails to create.
    fn trace_frame(sink: &mut dyn TraceSink, renderers: &[Renderer]) {
        let mut display = Display::new();
        let root = display.create_backbone();
        let order: Vec<_> = renderers
            .iter()
            .enumerate()
            .map(|(i, &r)| display.create_drawable(r, InstanceId(u32::try_from(i).unwrap())))
            .collect();
        for &d in &order {
            display.set_bounds(d, Rect::new(0.0, 0.0, 10.0, 10.0));
        }
        display.relink(&order);
        let mut tracer = Tracer::new(sink);
        display.stitch(
            root,
            order.first().copied(),
            order.last().copied(),
            &[ChangeInterval::FULL],
            &mut tracer,
        );
        display.update(&mut tracer);
    }

    fn lines(sink: PrettyPrintSink<Vec<u8>>) -> String {
        String::from_utf8(sink.into_writer()).unwrap()
    }

    #[test]
    fn stitch_and_update_lines() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        trace_frame(&mut sink, &[Renderer::Canvas, Renderer::Canvas]);
        let output = lines(sink);
        assert!(output.contains("[stitch] frame=0"), "got: {output}");
        assert!(output.contains("kind=incremental"), "got: {output}");
        assert!(output.contains("created=1"), "got: {output}");
        assert!(output.contains("[block] frame=0"), "got: {output}");
        assert!(output.contains("renderer=canvas created"), "got: {output}");
        assert!(output.contains("[update] frame=0"), "got: {output}");
    }

    #[test]
    fn missing_strategy_is_reported_as_failure() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        trace_frame(&mut sink, &[Renderer::Svg]);
        let output = lines(sink);
        assert!(output.contains("[FAILED]"), "got: {output}");
        assert!(
            output.contains("create: renderer svg unsupported"),
            "got: {output}"
        );
    }

    #[test]
    fn drawable_changes_per_line_or_compact() {
        let changes = [
            DrawableChange {
                drawable_index: 3,
                field: DrawableField::Bounds,
            },
            DrawableChange {
                drawable_index: 4,
                field: DrawableField::Paints,
            },
        ];

        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_drawable_changes(9, &changes);
        let output = lines(sink);
        assert!(output.contains("[change] frame=9 drawable=3 bounds"), "got: {output}");
        assert!(output.contains("[change] frame=9 drawable=4 paints"), "got: {output}");

        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new()).compact_changes(true);
        sink.on_drawable_changes(9, &changes);
        assert_eq!(lines(sink), "[changes] frame=9 count=2\n");
    }
}
