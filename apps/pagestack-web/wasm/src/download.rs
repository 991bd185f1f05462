//! Browser save-as for finished PDFs
//!
//! Wraps the bytes in a `Blob`, points a temporary anchor at an object URL
//! and clicks it. There is no retry; a failure surfaces once to the caller.

use pagestack_core::Deliverable;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Blob, BlobPropertyBag, HtmlElement, Url};

pub fn trigger_download(deliverable: &Deliverable) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window available"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("No document available"))?;

    let array = js_sys::Uint8Array::new_with_length(deliverable.bytes.len() as u32);
    array.copy_from(&deliverable.bytes);
    let parts = js_sys::Array::new();
    parts.push(&array.buffer());

    let options = BlobPropertyBag::new();
    options.set_type(deliverable.mime_type);
    let blob = Blob::new_with_u8_array_sequence_and_options(&parts, &options)?;

    let url = Url::create_object_url_with_blob(&blob)?;
    let anchor = document.create_element("a")?;
    anchor.set_attribute("href", &url)?;
    anchor.set_attribute("download", &deliverable.file_name)?;

    let clicked = anchor
        .dyn_into::<HtmlElement>()
        .map(|a| a.click())
        .map_err(|_| JsValue::from_str("Failed to create download link"));

    Url::revoke_object_url(&url)?;
    clicked
}
