// Copyright 2026 the Chaos Show Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The page-root filter.

use alloc::string::String;

use chaos_core::error::HostError;
use chaos_core::filter::FilterSink;
use wasm_bindgen::JsCast as _;
use web_sys::{CssStyleDeclaration, Document, HtmlElement};

use crate::dom::js_error;

/// `style.filter` on the document element (`<html>`).
#[derive(Clone, Debug)]
pub struct RootFilter {
    style: CssStyleDeclaration,
}

impl RootFilter {
    /// The root filter of `document`.
    pub fn new(document: &Document) -> Result<Self, HostError> {
        let root = document
            .document_element()
            .and_then(|el| el.dyn_into::<HtmlElement>().ok())
            .ok_or_else(|| HostError::from("document has no HTML root element"))?;
        Ok(Self { style: root.style() })
    }
}

impl FilterSink for RootFilter {
    fn write(&mut self, value: &str) -> Result<(), HostError> {
        self.style.set_property("filter", value).map_err(js_error)
    }

    fn read(&self) -> Option<String> {
        self.style.get_property_value("filter").ok()
    }
}
