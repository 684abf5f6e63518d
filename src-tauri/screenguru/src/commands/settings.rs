// Settings 相关命令

use screenguru_core::api::ApiClient;
use screenguru_core::settings::Settings;

#[tauri::command]
pub async fn get_theme() -> Result<String, String> {
    Settings::global().get_theme().await
}

/// 持久化主题。应用主题（data-theme 属性切换）由前端完成，
/// 这里只负责存储并通过 setting-change 事件同步其它窗口。
#[tauri::command]
pub async fn set_theme(theme: String) -> Result<(), String> {
    Settings::global().set_theme(theme).await
}

#[tauri::command]
pub async fn get_server_base_url() -> Result<String, String> {
    Settings::global().get_server_base_url().await
}

/// 改服务端地址后整体换新全局 ApiClient（cookie 会话随之重建）。
#[tauri::command]
pub async fn set_server_base_url(url: String) -> Result<(), String> {
    Settings::global().set_server_base_url(url).await?;
    ApiClient::rebuild_global().await.map_err(|e| e.to_string())
}
