//! 秘密 HUD：F8 触发的彩蛋动画序列。
//!
//! 后端只按固定节奏发事件，伪聊天框/闪光的绘制全在前端。
//! 时序与页面版一致：逐字符打字（100ms）→ 400ms → MSK 时间 →
//! 600ms → 闪光 → 600ms → 打开文件选择 → 2s 后清场。

use screenguru_core::emitter::GlobalEmitter;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::time::{sleep, Duration};

static HUD_RUNNING: AtomicBool = AtomicBool::new(false);

const HUD_COMMAND: &str = "/время";

pub fn init(app: &tauri::AppHandle) -> Result<(), String> {
    use tauri_plugin_global_shortcut::{GlobalShortcutExt, ShortcutState};

    app.global_shortcut()
        .on_shortcut("F8", move |_app, _shortcut, event| {
            // 动画进行中忽略重复触发
            if event.state() == ShortcutState::Pressed
                && !HUD_RUNNING.swap(true, Ordering::SeqCst)
            {
                tauri::async_runtime::spawn(run_secret_flow());
            }
        })
        .map_err(|e| format!("Failed to register F8 shortcut: {}", e))
}

async fn run_secret_flow() {
    let emitter = GlobalEmitter::global();

    // 1. 显示伪聊天框，逐字符“打字”
    emitter.emit("secret-chat-show", json!({}));
    let mut typed = String::new();
    for ch in HUD_COMMAND.chars() {
        sleep(Duration::from_millis(100)).await;
        typed.push(ch);
        emitter.emit("secret-chat-input", json!({ "text": typed }));
    }

    sleep(Duration::from_millis(400)).await;

    // 2. 输出 MSK 时间（UTC+3）
    let msk = chrono::Utc::now() + chrono::Duration::hours(3);
    emitter.emit(
        "secret-chat-time",
        json!({ "time": format!("{} (MSK)", msk.format("%H:%M:%S")) }),
    );

    sleep(Duration::from_millis(600)).await;

    // 3. 闪光（截图效果）
    emitter.emit("secret-flash", json!({}));

    sleep(Duration::from_millis(600)).await;

    // 4. 进入文件选择
    emitter.emit("secret-pick-files", json!({}));

    // 清场
    sleep(Duration::from_millis(2000)).await;
    emitter.emit("secret-chat-hide", json!({}));
    HUD_RUNNING.store(false, Ordering::SeqCst);
}
