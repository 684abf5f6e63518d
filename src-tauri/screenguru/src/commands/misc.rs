// Misc 命令

use screenguru_core::api::ApiClient;
use screenguru_core::emitter::GlobalEmitter;
use screenguru_core::image_type;

use crate::utils;

/// 删除整个用户资料（所有画册和图片）。
/// 确认后调用服务端，服务端负责清掉会话 cookie；
/// 成功时发 `user-deleted`，前端跳回首页。
#[tauri::command]
pub async fn delete_user(app: tauri::AppHandle) -> Result<bool, String> {
    let confirmed = utils::dialog::confirm(
        &app,
        "Вы уверены, что хотите удалить весь профиль со всеми альбомами и изображениями? Это действие необратимо!",
    )
    .await;
    if !confirmed {
        return Ok(false);
    }

    if let Err(e) = ApiClient::global().delete_user().await {
        eprintln!("Error deleting user: {}", e);
        utils::dialog::alert(&app, "Ошибка при удалении профиля").await;
        return Err(e.to_string());
    }

    GlobalEmitter::global().emit("user-deleted", serde_json::json!({}));
    Ok(true)
}

/// 读会话 ID（尽力而为的 cookie 辅助，不在关键路径上）。
#[tauri::command]
pub async fn get_session_id() -> Result<Option<String>, String> {
    Ok(ApiClient::global().session_id())
}

/// 文件选择器/前端提示用的图片扩展名列表。
#[tauri::command]
pub fn get_supported_image_types() -> Vec<String> {
    image_type::supported_image_extensions()
}
