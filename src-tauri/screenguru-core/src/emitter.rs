//! 全局事件发送器模块。
//!
//! core 不直接依赖 Tauri：事件通过注入的 [EventSink] 发出，
//! app 侧在启动时注入一个把事件转发给 webview 的实现，
//! CLI 等无界面场景可以不初始化（`try_global` 返回 None，事件静默丢弃）。

use serde_json::json;
use std::sync::OnceLock;

use crate::api::AlbumTarget;

/// 事件出口：`emit(event, payload)` 把事件交给宿主（Tauri webview、测试记录器等）。
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &str, payload: serde_json::Value);
}

/// 全局事件发送器。
pub struct GlobalEmitter {
    sink: Box<dyn EventSink>,
}

static GLOBAL_EMITTER: OnceLock<GlobalEmitter> = OnceLock::new();

impl GlobalEmitter {
    /// 初始化全局 emitter（必须在首次使用前调用，重复初始化报错）。
    pub fn init_global(sink: Box<dyn EventSink>) -> Result<(), String> {
        GLOBAL_EMITTER
            .set(GlobalEmitter { sink })
            .map_err(|_| "Global emitter already initialized".to_string())
    }

    /// 获取全局 emitter 引用。
    ///
    /// # Panics
    /// 如果尚未初始化，会 panic
    pub fn global() -> &'static GlobalEmitter {
        GLOBAL_EMITTER
            .get()
            .expect("Global emitter not initialized. Call GlobalEmitter::init_global() first.")
    }

    /// 尝试获取全局 emitter 引用（未初始化返回 None）。
    pub fn try_global() -> Option<&'static GlobalEmitter> {
        GLOBAL_EMITTER.get()
    }

    /// 发送通用事件。
    pub fn emit(&self, event: &str, payload: serde_json::Value) {
        self.sink.emit(event, payload);
    }

    /// 批次开始：前端据此显示上传浮层并把计数器置为 `0 / total`。
    pub fn emit_upload_started(&self, total: usize) {
        self.emit("upload-started", json!({ "total": total }));
    }

    /// 单个文件上传成功后的计数更新。
    pub fn emit_upload_progress(&self, completed: usize, total: usize) {
        self.emit(
            "upload-progress",
            json!({ "completed": completed, "total": total }),
        );
    }

    /// 批次全部成功：前端隐藏浮层并跳转到画册页。
    pub fn emit_upload_finished(&self, target: &AlbumTarget) {
        self.emit(
            "upload-finished",
            json!({
                "sessionId": target.session_id,
                "albumId": target.album_id,
                "redirect": format!("/{}/{}", target.session_id, target.album_id),
            }),
        );
    }

    /// 批次失败：前端隐藏浮层，页面停留原地。
    pub fn emit_upload_failed(&self, message: &str) {
        self.emit("upload-failed", json!({ "message": message }));
    }

    /// 设置变更事件（保持多窗口间同步）。
    pub fn emit_setting_change(&self, changes: serde_json::Value) {
        self.emit("setting-change", changes);
    }
}
