// Copyright 2026 the Chaos Show Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The seam between the core and a host platform.
//!
//! A [`Platform`] names the concrete element host, tween engine, and filter
//! sink a show runs on. The browser backend provides one over `web-sys`;
//! [`headless::Headless`](crate::headless::Headless) provides an in-memory
//! one for tests and simulation.

use crate::filter::FilterSink;
use crate::pool::ElementHost;
use crate::tween::TweenEngine;

/// A set of host services the engine is generic over.
pub trait Platform: 'static {
    /// A reference to a document node.
    type Node: Clone + PartialEq;
    /// Creates and detaches nodes.
    type Elements: ElementHost<Node = Self::Node>;
    /// Runs tweens on nodes.
    type Tweens: TweenEngine<Target = Self::Node>;
    /// Writes the page-root filter.
    type Filter: FilterSink;
}

/// The host services an engine is built from.
pub struct PlatformParts<P: Platform> {
    /// Element host.
    pub elements: P::Elements,
    /// Tween engine.
    pub tweens: P::Tweens,
    /// Root filter sink.
    pub filter: P::Filter,
}

impl<P: Platform> core::fmt::Debug for PlatformParts<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PlatformParts").finish_non_exhaustive()
    }
}
