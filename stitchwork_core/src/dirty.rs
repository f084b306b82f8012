// Copyright 2026 the Stitchwork Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants.
//!
//! Stitchwork uses [`understory_dirty`] trackers to queue work between model
//! changes and the next [`Display::update`](crate::display::Display::update).
//! There is one tracker for drawables and one for blocks, each keyed by raw
//! slot index.
//!
//! # Propagation
//!
//! Dirtiness flows *up* the render structure, never down:
//!
//! - Marking a drawable dirty queues it on [`PAINT`] and, the first time,
//!   queues its owning block on [`REPAINT`] if that block repaints all of
//!   its members (Canvas and WebGL).
//! - Bounds and visibility changes additionally queue the owning block on
//!   [`FIT`] when its renderer supports fitted surfaces.
//! - Membership changes made by a stitch queue both block channels. A
//!   retained block drained from [`REPAINT`] has its member order handed to
//!   its strategy instead of being repainted.
//!
//! The per-object dirty flags stored next to the trackers make every mark
//! idempotent; a drained channel is only refilled by a fresh change.

use understory_dirty::Channel;

/// Drawable tracker: the drawable's backend object must be brought up to
/// date with its node.
pub const PAINT: Channel = Channel::new(0);

/// Block tracker: the block's surface must be repainted.
pub const REPAINT: Channel = Channel::new(0);

/// Block tracker: the block's fit bounds must be recomputed.
pub const FIT: Channel = Channel::new(1);
