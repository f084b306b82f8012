// Copyright 2026 the Stitchwork Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pretty-printing, recording, and JSON snapshots for stitchwork
//! diagnostics.
//!
//! This crate provides [`TraceSink`](stitchwork_core::trace::TraceSink)
//! implementations for development and post-mortem analysis, plus a way to
//! dump the current block layout:
//!
//! - [`pretty::PrettyPrintSink`] writes one human-readable line per event.
//! - [`recorder::RecorderSink`] keeps a compact binary recording, read back
//!   with [`recorder::decode`].
//! - [`snapshot::backbone_json`] describes a backbone's blocks and their
//!   members as JSON.

pub mod pretty;
pub mod recorder;
pub mod snapshot;
