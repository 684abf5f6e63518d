use tauri_plugin_dialog::{DialogExt, MessageDialogButtons, MessageDialogKind};

pub fn show_error(app: &tauri::AppHandle, msg: String) {
    app.dialog()
        .message(msg)
        .title("ScreenGuru")
        .kind(MessageDialogKind::Error)
        .blocking_show();
}

/// 异步上下文里的阻塞报错弹窗（对应页面版 alert()），不占住 runtime 线程。
pub async fn alert(app: &tauri::AppHandle, msg: &str) {
    let app = app.clone();
    let msg = msg.to_string();
    let _ = tokio::task::spawn_blocking(move || show_error(&app, msg)).await;
}

/// 阻塞式确认框（对应页面版 confirm()）。取消/关闭都算 false。
pub async fn confirm(app: &tauri::AppHandle, msg: &str) -> bool {
    let app = app.clone();
    let msg = msg.to_string();
    tokio::task::spawn_blocking(move || {
        app.dialog()
            .message(msg)
            .title("ScreenGuru")
            .buttons(MessageDialogButtons::OkCancel)
            .blocking_show()
    })
    .await
    .unwrap_or(false)
}
