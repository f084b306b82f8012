// Copyright 2026 the Stitchwork Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::id::DrawableId;

/// One changed region of a backbone's display order.
///
/// `before` and `after` are unchanged drawables present in both the old and
/// the new order; everything strictly between them in the old order is
/// replaced by everything strictly between them in the new order. `None`
/// stands for the start (for `before`) or the end (for `after`) of the list.
///
/// ```text
///   old:  a  b [c  d] e  f        before = b, after = e
///   new:  a  b [x  c  y] e  f
/// ```
///
/// Intervals passed to a stitch must be in display order and must not
/// overlap, though two intervals may share a bounding drawable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChangeInterval {
    /// Last unchanged drawable before the change.
    pub before: Option<DrawableId>,
    /// First unchanged drawable after the change.
    pub after: Option<DrawableId>,
}

impl ChangeInterval {
    /// An interval covering the whole list.
    pub const FULL: Self = Self {
        before: None,
        after: None,
    };

    /// Creates an interval bounded by `before` and `after`.
    #[must_use]
    pub const fn new(before: Option<DrawableId>, after: Option<DrawableId>) -> Self {
        Self { before, after }
    }

    /// Whether this interval covers the whole list.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.before.is_none() && self.after.is_none()
    }
}
