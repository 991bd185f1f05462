//! JavaScript-facing session
//!
//! Thin wrapper over `pagestack_core::Session`. Methods ending in
//! `_internal` hold the logic and return core errors so they can be tested
//! natively; the exported methods convert to `JsValue` at the boundary.

use crate::download::trigger_download;
use pagestack_core::{
    Deliverable, EntryId, Notification, PageStackError, Session, SessionConfig, SessionStatus,
};
use serde::Serialize;
use wasm_bindgen::prelude::*;

fn to_js(e: PageStackError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn to_js_value<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// One merge tool's worth of state, held in Rust memory
#[wasm_bindgen]
pub struct PageStackSession {
    inner: Session,
    notification_callback: Option<js_sys::Function>,
    progress_callback: Option<js_sys::Function>,
}

impl PageStackSession {
    fn new_internal(config_json: Option<&str>) -> Result<Self, PageStackError> {
        let config = match config_json {
            Some(json) => SessionConfig::from_json(json)?,
            None => SessionConfig::default(),
        };
        Ok(Self {
            inner: Session::new(config),
            notification_callback: None,
            progress_callback: None,
        })
    }

    fn add_file_internal(
        &mut self,
        name: &str,
        mime: &str,
        bytes: &[u8],
    ) -> Result<u32, PageStackError> {
        self.inner
            .add_file(name, mime, bytes.to_vec())
            .map(|id| id.0)
    }

    fn set_range_internal(&mut self, id: u32, range: &str) -> Result<Vec<u32>, PageStackError> {
        self.inner.set_range(EntryId(id), range)?;
        self.inner.effective_pages(EntryId(id))
    }

    fn run_internal(&mut self) -> Result<Deliverable, PageStackError> {
        let total = self.inner.entries().len() as u32;
        self.report_progress(0, total, "Assembling...");
        let result = self.inner.run();
        self.report_progress(total, total, "Complete");
        result
    }

    fn status_label(&self) -> &'static str {
        match self.inner.status() {
            SessionStatus::Idle => "idle",
            SessionStatus::Ready => "ready",
            SessionStatus::Processing => "processing",
            SessionStatus::Error => "error",
        }
    }

    /// Push queued notifications to the JS callback, if one is registered
    fn flush_notifications(&mut self) {
        let Some(callback) = self.notification_callback.clone() else {
            return;
        };
        for notification in self.inner.drain_notifications() {
            if let Ok(value) = to_js_value(&notification) {
                let _ = callback.call1(&JsValue::null(), &value);
            }
        }
    }

    fn report_progress(&self, current: u32, total: u32, message: &str) {
        if let Some(ref callback) = self.progress_callback {
            let _ = callback.call3(
                &JsValue::null(),
                &JsValue::from(current),
                &JsValue::from(total),
                &JsValue::from_str(message),
            );
        }
    }
}

#[wasm_bindgen]
impl PageStackSession {
    /// `config_json` is optional; missing fields take the merge defaults
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<PageStackSession, JsValue> {
        Self::new_internal(config_json.as_deref()).map_err(to_js)
    }

    /// Callback signature: (notification: {level, message, durationMs}) => void
    #[wasm_bindgen(js_name = setNotificationCallback)]
    pub fn set_notification_callback(&mut self, callback: js_sys::Function) {
        self.notification_callback = Some(callback);
    }

    /// Callback signature: (current: number, total: number, message: string) => void
    #[wasm_bindgen(js_name = setProgressCallback)]
    pub fn set_progress_callback(&mut self, callback: js_sys::Function) {
        self.progress_callback = Some(callback);
    }

    /// Add a picked or dropped file; returns its entry id
    #[wasm_bindgen(js_name = addFile)]
    pub fn add_file(&mut self, name: &str, mime: &str, bytes: &[u8]) -> Result<u32, JsValue> {
        let result = self.add_file_internal(name, mime, bytes);
        self.flush_notifications();
        result.map_err(to_js)
    }

    #[wasm_bindgen(js_name = removeEntry)]
    pub fn remove_entry(&mut self, id: u32) -> Result<(), JsValue> {
        self.inner.remove(EntryId(id)).map_err(to_js)
    }

    /// Drag gesture: move the entry at `from` to position `to`
    #[wasm_bindgen(js_name = moveEntry)]
    pub fn move_entry(&mut self, from: usize, to: usize) -> Result<(), JsValue> {
        self.inner.move_entry(from, to).map_err(to_js)
    }

    /// new_order is an array of current indices in the desired new order
    #[wasm_bindgen(js_name = reorderEntries)]
    pub fn reorder_entries(&mut self, new_order: &[usize]) -> Result<(), JsValue> {
        self.inner.reorder(new_order).map_err(to_js)
    }

    /// Returns the zero-based pages a run would take from this entry
    #[wasm_bindgen(js_name = setRange)]
    pub fn set_range(&mut self, id: u32, range: &str) -> Result<Vec<u32>, JsValue> {
        self.set_range_internal(id, range).map_err(to_js)
    }

    #[wasm_bindgen(js_name = setOutputName)]
    pub fn set_output_name(&mut self, name: &str) {
        self.inner.set_output_name(name);
    }

    #[wasm_bindgen(getter, js_name = outputFileName)]
    pub fn output_file_name(&self) -> String {
        self.inner.output_file_name()
    }

    #[wasm_bindgen(getter)]
    pub fn status(&self) -> String {
        self.status_label().to_string()
    }

    #[wasm_bindgen(getter, js_name = acceptAttribute)]
    pub fn accept_attribute(&self) -> String {
        self.inner.config().intake.accept_attribute().to_string()
    }

    #[wasm_bindgen(js_name = canRun)]
    pub fn can_run(&self) -> bool {
        self.inner.can_run()
    }

    #[wasm_bindgen(js_name = getEntryCount)]
    pub fn get_entry_count(&self) -> usize {
        self.inner.entries().len()
    }

    #[wasm_bindgen(js_name = getSelectedPageCount)]
    pub fn get_selected_page_count(&self) -> u32 {
        self.inner.selected_page_count()
    }

    /// File list rows: [{id, name, kind, pageCount, selectedPages, ...}]
    #[wasm_bindgen(js_name = getEntries)]
    pub fn get_entries(&self) -> Result<JsValue, JsValue> {
        to_js_value(&self.inner.summaries())
    }

    #[wasm_bindgen(js_name = getPageInfo)]
    pub fn get_page_info(&self, id: u32, page_num: u32) -> Result<JsValue, JsValue> {
        let info = self.inner.page_info(EntryId(id), page_num).map_err(to_js)?;
        to_js_value(&info)
    }

    #[wasm_bindgen(js_name = getLastMetrics)]
    pub fn get_last_metrics(&self) -> Result<JsValue, JsValue> {
        to_js_value(&self.inner.last_metrics())
    }

    /// Pending notifications when no callback is registered
    #[wasm_bindgen(js_name = drainNotifications)]
    pub fn drain_notifications(&mut self) -> Result<JsValue, JsValue> {
        let notifications: Vec<Notification> = self.inner.drain_notifications();
        to_js_value(&notifications)
    }

    /// Assemble and return the PDF bytes
    pub fn run(&mut self) -> Result<js_sys::Uint8Array, JsValue> {
        let result = self.run_internal();
        self.flush_notifications();
        let deliverable = result.map_err(to_js)?;

        let array = js_sys::Uint8Array::new_with_length(deliverable.bytes.len() as u32);
        array.copy_from(&deliverable.bytes);
        Ok(array)
    }

    /// Assemble and open the save dialog with the chosen file name
    #[wasm_bindgen(js_name = runAndDownload)]
    pub fn run_and_download(&mut self) -> Result<(), JsValue> {
        let result = self.run_internal();
        self.flush_notifications();
        let deliverable = result.map_err(to_js)?;

        trigger_download(&deliverable).map_err(|e| {
            let message = e
                .as_string()
                .unwrap_or_else(|| "Download failed".to_string());
            tracing::warn!(file = %deliverable.file_name, error = %message, "download failed");
            self.inner.report_failure(&message);
            self.flush_notifications();
            JsValue::from_str(&message)
        })
    }

    pub fn reset(&mut self) {
        self.inner.reset();
    }
}
