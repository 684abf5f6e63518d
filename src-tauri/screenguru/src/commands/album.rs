// Album 相关命令（链接复制 / 打开 / 删除图片）

use screenguru_core::api::ApiClient;

use crate::utils;

fn write_clipboard(app: &tauri::AppHandle, text: &str) -> bool {
    use tauri_plugin_clipboard_manager::ClipboardExt;
    match app.clipboard().write_text(text.to_string()) {
        Ok(()) => true,
        Err(e) => {
            // 复制失败只记日志，不弹窗（前端的「скопировано!」反馈不出现而已）
            eprintln!("Failed to copy URL: {}", e);
            fallback_write_clipboard(text)
        }
    }
}

#[cfg(target_os = "linux")]
fn fallback_write_clipboard(text: &str) -> bool {
    match arboard::Clipboard::new().and_then(|mut c| c.set_text(text.to_string())) {
        Ok(()) => true,
        Err(e) => {
            eprintln!("Failed to copy URL (arboard fallback): {}", e);
            false
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn fallback_write_clipboard(_text: &str) -> bool {
    false
}

/// 复制画册链接。返回是否复制成功，前端据此显示反馈。
#[tauri::command]
pub async fn copy_album_url(
    app: tauri::AppHandle,
    session_id: String,
    album_id: String,
) -> Result<bool, String> {
    let url = ApiClient::global().album_url(&session_id, &album_id);
    Ok(write_clipboard(&app, &url))
}

/// 复制单张图片链接。
#[tauri::command]
pub async fn copy_image_url(
    app: tauri::AppHandle,
    session_id: String,
    album_id: String,
    filename: String,
) -> Result<bool, String> {
    let url = ApiClient::global().image_url(&session_id, &album_id, &filename);
    Ok(write_clipboard(&app, &url))
}

/// 在系统浏览器里打开画册页。
#[tauri::command]
pub async fn open_album(
    app: tauri::AppHandle,
    session_id: String,
    album_id: String,
) -> Result<(), String> {
    use tauri_plugin_opener::OpenerExt;
    let url = ApiClient::global().album_url(&session_id, &album_id);
    app.opener()
        .open_url(url, None::<&str>)
        .map_err(|e| e.to_string())
}

/// 删除一张图片：先阻塞确认，取消返回 Ok(false)；
/// 服务端报错时弹窗并返回 Err，前端保持 DOM 不变。
#[tauri::command]
pub async fn delete_image(
    app: tauri::AppHandle,
    album_id: String,
    filename: String,
) -> Result<bool, String> {
    if !utils::dialog::confirm(&app, "Вы уверены, что хотите удалить это изображение?").await {
        return Ok(false);
    }

    if let Err(e) = ApiClient::global().delete_image(&album_id, &filename).await {
        eprintln!("Error deleting image: {}", e);
        utils::dialog::alert(&app, "Ошибка при удалении изображения").await;
        return Err(e.to_string());
    }
    Ok(true)
}
