// Changelog 相关命令

use screenguru_core::api::ApiClient;
use screenguru_core::changelog::{self, ChangelogNotice};
use screenguru_core::settings::Settings;

/// 手动检查 changelog（启动时的自动检查在 lib.rs，走同一套逻辑）。
/// 没有未读内容时返回 None，前端不弹窗。
#[tauri::command]
pub async fn check_changelog() -> Result<Option<ChangelogNotice>, String> {
    let content = match ApiClient::global()
        .fetch_changelog()
        .await
        .map_err(|e| e.to_string())?
    {
        Some(content) => content,
        None => return Ok(None),
    };

    let last_seen = Settings::global().get_last_seen_version().await?;
    Ok(changelog::collect_unseen(&content, last_seen.as_deref()))
}

/// 用户关闭弹窗时调用：此刻才把展示过的最新版本记为已读
/// （只展示不关闭不算已读）。
#[tauri::command]
pub async fn dismiss_changelog(version: String) -> Result<(), String> {
    Settings::global().set_last_seen_version(Some(version)).await
}
