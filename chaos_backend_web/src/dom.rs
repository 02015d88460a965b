// Copyright 2026 the Chaos Show Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Real DOM elements for the element pool.

use alloc::format;
use alloc::string::String;

use chaos_core::error::HostError;
use chaos_core::pool::ElementHost;
use wasm_bindgen::{JsCast as _, JsValue};
use web_sys::{Document, Element, HtmlElement};

/// Creates and detaches elements in one document.
#[derive(Clone, Debug)]
pub struct DomHost {
    document: Document,
    body: Element,
}

impl DomHost {
    /// A host over `document`. Fails if the document has no body yet.
    pub fn new(document: Document) -> Result<Self, HostError> {
        let body = document
            .body()
            .ok_or_else(|| HostError::from("document has no body"))?;
        Ok(Self {
            document,
            body: body.into(),
        })
    }

    /// A host over the window's document.
    pub fn from_window() -> Result<Self, HostError> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| HostError::from("no window document"))?;
        Self::new(document)
    }

    /// The document.
    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }
}

impl ElementHost for DomHost {
    type Node = Element;

    fn create(&mut self, tag: &str, style: &[(&str, &str)]) -> Result<Element, HostError> {
        let element = self.document.create_element(tag).map_err(js_error)?;
        if !style.is_empty() {
            let Some(html) = element.dyn_ref::<HtmlElement>() else {
                return Err(HostError::new(format!("<{tag}> cannot take inline style")));
            };
            let css = html.style();
            for (name, value) in style {
                css.set_property(name, value).map_err(js_error)?;
            }
        }
        Ok(element)
    }

    fn append(&mut self, node: &Element, container: Option<&Element>) -> Result<(), HostError> {
        container
            .unwrap_or(&self.body)
            .append_child(node)
            .map(drop)
            .map_err(js_error)
    }

    fn is_attached(&self, node: &Element) -> bool {
        node.parent_node().is_some()
    }

    fn detach(&mut self, node: &Element) {
        node.remove();
    }

    fn document_node_count(&self) -> usize {
        self.document.get_elements_by_tag_name("*").length() as usize
    }

    fn body(&self) -> Element {
        self.body.clone()
    }
}

/// Turns a thrown JS value into a [`HostError`].
pub(crate) fn js_error(value: JsValue) -> HostError {
    if let Some(err) = value.dyn_ref::<js_sys::Error>() {
        return HostError::new(String::from(err.message()));
    }
    match value.as_string() {
        Some(text) => HostError::new(text),
        None => HostError::new(format!("{value:?}")),
    }
}
