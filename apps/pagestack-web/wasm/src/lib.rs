//! WASM bindings for the PageStack merge tools
//!
//! All state lives in Rust inside `PageStackSession`; JavaScript only wires
//! DOM events, reads files and renders notifications.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { PageStackSession } from './pkg/pagestack_wasm.js';
//!
//! await init();
//!
//! const session = new PageStackSession('{"intake":"pdfAndImages"}');
//! session.setNotificationCallback(({ level, message, durationMs }) => toast(level, message, durationMs));
//! const id = session.addFile(file.name, file.type, new Uint8Array(await file.arrayBuffer()));
//! session.setRange(id, "1-3, 5");
//! session.moveEntry(2, 0);           // drag gesture
//! session.setOutputName("bundle");
//! session.runAndDownload();          // save dialog
//! session.reset();
//! ```

pub mod download;
pub mod logging;
pub mod session;

use wasm_bindgen::prelude::*;

pub use session::PageStackSession;

#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    logging::init_console_logging();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "PageStack WASM initialized");
}

#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Header/trailer check for a PDF without a full parse
#[wasm_bindgen]
pub fn quick_validate(bytes: &[u8]) -> Result<(), JsValue> {
    pagestack_core::probe::quick_validate(bytes).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Page count of a PDF, for showing file info before it is added
#[wasm_bindgen]
pub fn get_page_count(bytes: &[u8]) -> Result<u32, JsValue> {
    pagestack_core::get_page_count(bytes).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Preview which zero-based pages a range expression selects
#[wasm_bindgen]
pub fn parse_range(expr: &str, total_pages: u32) -> Vec<u32> {
    pagestack_core::parse_page_range(expr, total_pages)
}

#[wasm_bindgen]
pub fn format_bytes(bytes: usize) -> String {
    pagestack_core::format_bytes(bytes)
}
