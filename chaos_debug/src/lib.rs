// Copyright 2026 the Chaos Show Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Event sinks for watching a show from a terminal or a log file.
//!
//! - [`pretty::PrettyPrintSink`]: one human-readable line per event.
//! - [`json::JsonLinesSink`]: one JSON object per line, in the same shape
//!   the browser backend puts in `CustomEvent.detail`, tagged with `type`.
//!
//! Both write to any [`Write`](std::io::Write) and swallow write errors:
//! diagnostics never stop a show.

pub mod json;
pub mod pretty;
