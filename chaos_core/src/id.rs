// Copyright 2026 the Chaos Show Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Identity types shared by the registries.

use alloc::borrow::Cow;
use alloc::format;
use core::fmt;

/// A handle to an element tracked by an [`ElementPool`](crate::pool::ElementPool).
///
/// Contains both a slot index and a generation counter so that a handle
/// outliving its element (released, purged, or evicted) is detected instead of
/// aliasing whatever element reuses the slot.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId {
    /// Slot index into the pool's arrays.
    pub(crate) idx: u32,
    /// Generation counter; must match the pool's generation for this slot.
    pub(crate) generation: u32,
}

impl ElementId {
    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElementId({}@gen{})", self.idx, self.generation)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "el-{}-{}", self.idx, self.generation)
    }
}

/// Declares a caller-chosen string key type.
///
/// Keys are usually `&'static str` literals, so they are stored as
/// `Cow<'static, str>` and only allocate for generated names.
macro_rules! string_key {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(Cow<'static, str>);

        impl $name {
            /// Creates a key from a static string without allocating.
            #[inline]
            #[must_use]
            pub const fn from_static(key: &'static str) -> Self {
                Self(Cow::Borrowed(key))
            }

            /// Creates a generated key such as `timer#7`.
            #[must_use]
            pub fn numbered(n: u64) -> Self {
                Self(Cow::Owned(format!(concat!($prefix, "#{}"), n)))
            }

            /// Returns the key text.
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&'static str> for $name {
            fn from(key: &'static str) -> Self {
                Self::from_static(key)
            }
        }

        impl From<alloc::string::String> for $name {
            fn from(key: alloc::string::String) -> Self {
                Self(Cow::Owned(key))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({:?})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_key!(
    /// Identifies a managed interval or timeout in an
    /// [`IntervalRegistry`](crate::interval::IntervalRegistry).
    ///
    /// Registering a second timer under an existing key replaces the first.
    TimerKey,
    "timer"
);

string_key!(
    /// Identifies a managed tween in a
    /// [`TweenRegistry`](crate::tween::TweenRegistry).
    TweenKey,
    "tween"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_compare_by_text() {
        let a = TimerKey::from_static("watchdog");
        let b: TimerKey = alloc::string::String::from("watchdog").into();
        assert_eq!(a, b, "borrowed and owned keys are equal");
        assert_eq!(TweenKey::numbered(3).as_str(), "tween#3");
    }

    #[test]
    fn element_id_formats() {
        let id = ElementId {
            idx: 4,
            generation: 2,
        };
        assert_eq!(format!("{id:?}"), "ElementId(4@gen2)");
        assert_eq!(format!("{id}"), "el-4-2");
    }
}
