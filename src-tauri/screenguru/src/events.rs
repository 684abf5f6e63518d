//! core 事件到 webview 的桥接。

use screenguru_core::api::AlbumTarget;
use screenguru_core::emitter::{EventSink, GlobalEmitter};
use screenguru_core::upload::UploadObserver;
use tauri::Emitter;

/// 把 core 的全局事件原样转发给前端。
pub struct TauriEventSink {
    app: tauri::AppHandle,
}

impl TauriEventSink {
    pub fn new(app: tauri::AppHandle) -> Self {
        Self { app }
    }
}

impl EventSink for TauriEventSink {
    fn emit(&self, event: &str, payload: serde_json::Value) {
        let _ = self.app.emit(event, payload);
    }
}

/// 把上传管线的进度翻译成 `upload-*` 事件，前端的上传浮层只消费这些事件。
pub struct EmitterUploadObserver;

impl UploadObserver for EmitterUploadObserver {
    fn on_started(&self, total: usize) {
        GlobalEmitter::global().emit_upload_started(total);
    }

    fn on_progress(&self, completed: usize, total: usize) {
        GlobalEmitter::global().emit_upload_progress(completed, total);
    }

    fn on_finished(&self, target: &AlbumTarget) {
        GlobalEmitter::global().emit_upload_finished(target);
    }

    fn on_failed(&self, message: &str) {
        GlobalEmitter::global().emit_upload_failed(message);
    }
}
