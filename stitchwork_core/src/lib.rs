// Copyright 2026 the Stitchwork Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drawable/block stitching for a retained-mode 2D scene renderer.
//!
//! `stitchwork_core` turns a flat, ordered list of *drawables* (one per
//! rendered node) into *blocks*: backend surfaces such as a `<canvas>`, an
//! `<svg>` root, a WebGL batch or a single DOM element, each holding a
//! maximal run of drawables that share a renderer. Blocks hang off a
//! *backbone*, the container that keeps them in display order. It is
//! `no_std` compatible (with `alloc`) and stores drawables, blocks and
//! backbones in struct-of-arrays stores with generational handles.
//!
//! # Architecture
//!
//! ```text
//!   scene changes
//!       │
//!       ▼
//!   Display::create_drawable / set_* / relink
//!       │
//!       ▼
//!   Stitcher::stitch(old order, new order, ChangeIntervals)
//!       │            blocks created, reused, disposed
//!       ▼
//!   Display::update() ──► RenderStrategy hooks (per renderer)
//!       │
//!       ▼
//!   UpdateSummary ──► Tracer
//! ```
//!
//! **[`display`]**: The [`Display`](display::Display) owns every store, the
//! registered strategies, dirty tracking and the paint reference counts.
//!
//! **[`drawable`]**, **[`block`]**, **[`backbone`]**: The three stores and
//! the operations on them. Drawable slots are pooled per renderer.
//!
//! **[`stitch`]**: [`RebuildStitcher`](stitch::RebuildStitcher) and
//! [`IncrementalStitcher`](stitch::IncrementalStitcher), which partition a
//! new display order into blocks.
//!
//! **[`backend`]**: The [`RenderStrategy`](backend::RenderStrategy) trait
//! that renderer implementations provide.
//!
//! **[`count_map`]**: Reference counting for per-block shared paint
//! resources.
//!
//! **[`dirty`]**: Dirty channels for drawables and blocks via
//! `understory_dirty`.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! stitch and update instrumentation, with the zero-overhead
//! [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-drawable
//!   change events.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod backbone;
pub mod backend;
pub mod block;
pub mod count_map;
pub mod dirty;
pub mod display;
pub mod drawable;
pub mod id;
pub mod renderer;
pub mod stitch;
pub mod trace;

#[cfg(test)]
mod testing;

pub use display::{Display, DisplayOptions};
pub use id::{BackboneId, BlockId, DrawableId, InstanceId, PaintKey, ResourceKey};
pub use renderer::Renderer;
