mod commands;
mod events;
#[cfg(not(any(target_os = "android", target_os = "ios")))]
mod secret_hud;
mod utils;

use commands::*;

use screenguru_core::api::ApiClient;
use screenguru_core::emitter::GlobalEmitter;
use screenguru_core::settings::Settings;
use std::process;
use tokio::time::{sleep, Duration};

/// 初始化全局状态。
fn init_globals(app_handle: tauri::AppHandle) -> Result<(), String> {
    println!("ScreenGuru v{} bootstrap...", env!("CARGO_PKG_VERSION"));
    println!("Initializing Globals...");

    Settings::init_global().map_err(|e| format!("Failed to initialize settings: {}", e))?;
    println!("  ✓ Settings initialized");

    GlobalEmitter::init_global(Box::new(events::TauriEventSink::new(app_handle)))
        .map_err(|e| format!("Failed to initialize global emitter: {}", e))?;
    println!("  ✓ Global emitter initialized");

    // ApiClient 依赖 Settings 的异步 getter，setup 阶段同步等待一次
    tauri::async_runtime::block_on(ApiClient::init_global())
        .map_err(|e| format!("Failed to initialize api client: {}", e))?;
    println!("  ✓ Api client initialized");

    Ok(())
}

/// 启动后延迟 1 秒检查 changelog（对应页面版 setTimeout(checkChangelog, 1000)）。
/// 有未读版本段时发 `changelog-available`，由前端弹窗；
/// 已读版本只在用户关掉弹窗时（dismiss_changelog 命令）写回。
fn spawn_changelog_check() {
    tauri::async_runtime::spawn(async move {
        sleep(Duration::from_millis(1000)).await;

        let api = ApiClient::global();
        let content = match api.fetch_changelog().await {
            Ok(Some(content)) => content,
            Ok(None) => return,
            Err(e) => {
                eprintln!("Error fetching changelog: {}", e);
                return;
            }
        };

        let last_seen = match Settings::global().get_last_seen_version().await {
            Ok(v) => v,
            Err(e) => {
                eprintln!("Error reading last seen version: {}", e);
                return;
            }
        };

        if let Some(notice) = screenguru_core::changelog::collect_unseen(&content, last_seen.as_deref())
        {
            if let Ok(payload) = serde_json::to_value(&notice) {
                GlobalEmitter::global().emit("changelog-available", payload);
            }
        }
    });
}

/// Tauri 应用入口。
pub fn run() {
    let mut builder = tauri::Builder::default()
        .plugin(tauri_plugin_clipboard_manager::init())
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_opener::init());

    #[cfg(not(any(target_os = "android", target_os = "ios")))]
    {
        builder = builder.plugin(tauri_plugin_global_shortcut::Builder::new().build());
    }

    builder
        .setup(|app| {
            if let Err(e) = init_globals(app.handle().clone()) {
                utils::dialog::show_error(app.handle(), format!("Произошла фатальная ошибка: {}", e));
                eprintln!("Fatal bootstrap error: {}", e);
                process::exit(1);
            }

            // 秘密 HUD（F8）
            #[cfg(not(any(target_os = "android", target_os = "ios")))]
            if let Err(e) = secret_hud::init(app.handle()) {
                eprintln!("Failed to register secret HUD shortcut: {}", e);
            }

            spawn_changelog_check();
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            // --- Upload ---
            upload_files,
            pick_and_upload,
            // --- Album ---
            copy_album_url,
            copy_image_url,
            open_album,
            delete_image,
            // --- Settings ---
            get_theme,
            set_theme,
            get_server_base_url,
            set_server_base_url,
            // --- Changelog ---
            check_changelog,
            dismiss_changelog,
            // --- Misc ---
            delete_user,
            get_session_id,
            get_supported_image_types,
        ])
        .run(tauri::generate_context!())
        .unwrap_or_else(|e| {
            eprintln!("Fatal error while running tauri application: {}", e);
            process::exit(1);
        });
}
