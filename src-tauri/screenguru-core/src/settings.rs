//! 持久化设置（settings.json）。
//!
//! 对应页面版里的 localStorage：`screenguru_theme` / `last_seen_version`
//! 两个键原样保留，另加桌面端必需的 `server_base_url`。
//! 全部键加载进内存 cell，写入时整体序列化并原子替换文件。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tokio::sync::Mutex as TokioMutex;

use crate::emitter::GlobalEmitter;

/// 默认主题（无 data-theme 属性的那个）。
pub const DEFAULT_THEME: &str = "crystal";

/// 默认服务端地址（与服务端默认监听 0.0.0.0:8000 对应）。
pub const DEFAULT_SERVER_BASE_URL: &str = "http://localhost:8000";

fn atomic_replace_file(tmp: &Path, dest: &Path) -> Result<(), String> {
    if !tmp.exists() {
        return Err(format!(
            "Failed to replace settings file: temporary file does not exist: {}",
            tmp.display()
        ));
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create destination directory: {}", e))?;
    }

    #[cfg(target_os = "windows")]
    {
        use std::os::windows::ffi::OsStrExt;
        use windows_sys::Win32::Storage::FileSystem::{
            MoveFileExW, MOVEFILE_REPLACE_EXISTING, MOVEFILE_WRITE_THROUGH,
        };

        let tmp_w: Vec<u16> = tmp.as_os_str().encode_wide().chain(Some(0)).collect();
        let dest_w: Vec<u16> = dest.as_os_str().encode_wide().chain(Some(0)).collect();

        let ok = unsafe {
            MoveFileExW(
                tmp_w.as_ptr(),
                dest_w.as_ptr(),
                MOVEFILE_REPLACE_EXISTING | MOVEFILE_WRITE_THROUGH,
            )
        };
        if ok == 0 {
            return Err(format!(
                "Failed to replace settings file: {}",
                std::io::Error::last_os_error()
            ));
        }
        Ok(())
    }

    #[cfg(not(target_os = "windows"))]
    {
        fs::rename(tmp, dest).map_err(|e| format!("Failed to replace settings file: {}", e))?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SettingKey {
    /// 界面主题
    Theme,
    /// changelog 弹窗已读到的版本
    LastSeenVersion,
    /// 服务端地址
    ServerBaseUrl,
}

/// 用于序列化的值类型
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    String(String),
    OptionString(Option<String>),
}

impl SettingValue {
    fn as_string(&self) -> Option<String> {
        match self {
            SettingValue::String(s) => Some(s.clone()),
            SettingValue::OptionString(Some(s)) => Some(s.clone()),
            SettingValue::OptionString(None) => None,
        }
    }

    fn as_option_string(&self) -> Option<String> {
        self.as_string()
    }
}

static CELLS: OnceLock<HashMap<SettingKey, TokioMutex<SettingValue>>> = OnceLock::new();

pub struct Settings;

static SETTINGS: OnceLock<Settings> = OnceLock::new();

impl Settings {
    /// 初始化全局 Settings（必须在首次使用前调用）。
    pub fn init_global() -> Result<(), String> {
        let settings_file = Self::get_settings_file();
        let cells = Self::load_settings_map(&settings_file)?;

        CELLS
            .set(cells)
            .map_err(|_| "Settings already initialized".to_string())?;
        SETTINGS
            .set(Settings)
            .map_err(|_| "Settings already initialized".to_string())?;

        Ok(())
    }

    /// 获取全局 Settings 引用。
    pub fn global() -> &'static Settings {
        SETTINGS
            .get()
            .expect("Settings not initialized. Call Settings::init_global() first.")
    }

    fn cells() -> &'static HashMap<SettingKey, TokioMutex<SettingValue>> {
        CELLS
            .get()
            .expect("Settings not initialized. Call Settings::init_global() first.")
    }

    fn get_settings_file() -> PathBuf {
        crate::app_paths::screenguru_data_dir().join("settings.json")
    }

    fn all_keys() -> &'static [SettingKey] {
        &[
            SettingKey::Theme,
            SettingKey::LastSeenVersion,
            SettingKey::ServerBaseUrl,
        ]
    }

    fn default_value(key: SettingKey) -> SettingValue {
        match key {
            SettingKey::Theme => SettingValue::String(DEFAULT_THEME.to_string()),
            SettingKey::LastSeenVersion => SettingValue::OptionString(None),
            SettingKey::ServerBaseUrl => {
                SettingValue::String(DEFAULT_SERVER_BASE_URL.to_string())
            }
        }
    }

    /// JSON 键名沿用页面版 localStorage 的写法（snake_case）。
    fn key_to_json_string(key: SettingKey) -> &'static str {
        match key {
            SettingKey::Theme => "screenguru_theme",
            SettingKey::LastSeenVersion => "last_seen_version",
            SettingKey::ServerBaseUrl => "server_base_url",
        }
    }

    fn json_value_to_setting_value(
        key: SettingKey,
        json: &serde_json::Value,
    ) -> Option<SettingValue> {
        match key {
            SettingKey::Theme | SettingKey::ServerBaseUrl => match json {
                serde_json::Value::String(s) if !s.trim().is_empty() => {
                    Some(SettingValue::String(s.clone()))
                }
                _ => None,
            },
            SettingKey::LastSeenVersion => match json {
                serde_json::Value::String(s) if !s.trim().is_empty() => {
                    Some(SettingValue::OptionString(Some(s.clone())))
                }
                _ => Some(SettingValue::OptionString(None)),
            },
        }
    }

    fn setting_value_to_json(val: &SettingValue) -> serde_json::Value {
        match val {
            SettingValue::String(s) => serde_json::Value::String(s.clone()),
            SettingValue::OptionString(Some(s)) => serde_json::Value::String(s.clone()),
            SettingValue::OptionString(None) => serde_json::Value::Null,
        }
    }

    fn load_settings_map(
        file: &Path,
    ) -> Result<HashMap<SettingKey, TokioMutex<SettingValue>>, String> {
        let json_value = if file.exists() {
            let content =
                fs::read_to_string(file).map_err(|e| format!("Failed to read settings file: {}", e))?;
            if content.trim().is_empty() {
                None
            } else {
                match serde_json::from_str::<serde_json::Value>(&content) {
                    Ok(json) => Some(json),
                    Err(e) => {
                        // 损坏的设置文件降级到默认值，不阻塞启动
                        eprintln!("[Warn] Failed to parse settings JSON: {}", e);
                        None
                    }
                }
            }
        } else {
            None
        };

        let mut cells = HashMap::new();
        for key in Self::all_keys() {
            let value = json_value
                .as_ref()
                .and_then(|json| json.get(Self::key_to_json_string(*key)))
                .and_then(|v| Self::json_value_to_setting_value(*key, v))
                .unwrap_or_else(|| Self::default_value(*key));
            cells.insert(*key, TokioMutex::new(value));
        }

        Ok(cells)
    }

    /// 序列化当前所有设置并原子写盘。
    async fn save(&self) -> Result<(), String> {
        let cells = Self::cells();
        let mut json_map = serde_json::Map::new();
        for key in Self::all_keys() {
            if let Some(cell) = cells.get(key) {
                let val = cell.lock().await;
                json_map.insert(
                    Self::key_to_json_string(*key).to_string(),
                    Self::setting_value_to_json(&val),
                );
            }
        }

        let file = Self::get_settings_file();
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create settings directory: {}", e))?;
        }

        let content = serde_json::to_string_pretty(&serde_json::Value::Object(json_map))
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;
        let tmp = file.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(|e| format!("Failed to write temp settings file: {}", e))?;
        atomic_replace_file(&tmp, &file)?;
        Ok(())
    }

    /// 发送设置变更事件。
    async fn emit_setting_change(key: SettingKey, value: &SettingValue) {
        if let Some(emitter) = GlobalEmitter::try_global() {
            let changes = serde_json::json!({
                Self::key_to_json_string(key): Self::setting_value_to_json(value)
            });
            emitter.emit_setting_change(changes);
        }
    }

    async fn set_value(&self, key: SettingKey, new_value: SettingValue) -> Result<(), String> {
        let cells = Self::cells();
        if let Some(cell) = cells.get(&key) {
            let mut val = cell.lock().await;
            *val = new_value.clone();
        }
        Self::emit_setting_change(key, &new_value).await;
        self.save().await
    }

    // ========== Getter 方法 ==========

    pub async fn get_theme(&self) -> Result<String, String> {
        let cells = Self::cells();
        if let Some(cell) = cells.get(&SettingKey::Theme) {
            let val = cell.lock().await;
            Ok(val.as_string().unwrap_or_else(|| DEFAULT_THEME.to_string()))
        } else {
            Ok(DEFAULT_THEME.to_string())
        }
    }

    pub async fn get_last_seen_version(&self) -> Result<Option<String>, String> {
        let cells = Self::cells();
        if let Some(cell) = cells.get(&SettingKey::LastSeenVersion) {
            let val = cell.lock().await;
            Ok(val.as_option_string())
        } else {
            Ok(None)
        }
    }

    pub async fn get_server_base_url(&self) -> Result<String, String> {
        let cells = Self::cells();
        if let Some(cell) = cells.get(&SettingKey::ServerBaseUrl) {
            let val = cell.lock().await;
            Ok(val
                .as_string()
                .unwrap_or_else(|| DEFAULT_SERVER_BASE_URL.to_string()))
        } else {
            Ok(DEFAULT_SERVER_BASE_URL.to_string())
        }
    }

    // ========== Setter 方法 ==========

    /// 主题名不做校验：存什么用什么（与页面版行为一致）。
    pub async fn set_theme(&self, theme: String) -> Result<(), String> {
        self.set_value(SettingKey::Theme, SettingValue::String(theme))
            .await
    }

    pub async fn set_last_seen_version(&self, version: Option<String>) -> Result<(), String> {
        let normalized = version.and_then(|s| {
            let t = s.trim().to_string();
            if t.is_empty() {
                None
            } else {
                Some(t)
            }
        });
        self.set_value(
            SettingKey::LastSeenVersion,
            SettingValue::OptionString(normalized),
        )
        .await
    }

    pub async fn set_server_base_url(&self, url: String) -> Result<(), String> {
        let t = url.trim().trim_end_matches('/').to_string();
        if t.is_empty() {
            return Err("Server base URL must not be empty".to_string());
        }
        self.set_value(SettingKey::ServerBaseUrl, SettingValue::String(t))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_settings_file() -> PathBuf {
        std::env::temp_dir().join(format!("screenguru-settings-{}.json", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_load_defaults_when_file_missing() {
        let file = temp_settings_file();
        let cells = Settings::load_settings_map(&file).unwrap();
        let theme = cells
            .get(&SettingKey::Theme)
            .unwrap()
            .try_lock()
            .unwrap()
            .as_string();
        assert_eq!(theme.as_deref(), Some(DEFAULT_THEME));
        let last_seen = cells
            .get(&SettingKey::LastSeenVersion)
            .unwrap()
            .try_lock()
            .unwrap()
            .as_option_string();
        assert_eq!(last_seen, None);
    }

    #[test]
    fn test_theme_round_trip_through_file() {
        let file = temp_settings_file();
        fs::write(
            &file,
            r#"{"screenguru_theme":"mint","last_seen_version":"1.2.0"}"#,
        )
        .unwrap();

        let cells = Settings::load_settings_map(&file).unwrap();
        let theme = cells
            .get(&SettingKey::Theme)
            .unwrap()
            .try_lock()
            .unwrap()
            .as_string();
        assert_eq!(theme.as_deref(), Some("mint"));
        let last_seen = cells
            .get(&SettingKey::LastSeenVersion)
            .unwrap()
            .try_lock()
            .unwrap()
            .as_option_string();
        assert_eq!(last_seen.as_deref(), Some("1.2.0"));

        let _ = fs::remove_file(&file);
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let file = temp_settings_file();
        fs::write(&file, "{ not json").unwrap();
        let cells = Settings::load_settings_map(&file).unwrap();
        let theme = cells
            .get(&SettingKey::Theme)
            .unwrap()
            .try_lock()
            .unwrap()
            .as_string();
        assert_eq!(theme.as_deref(), Some(DEFAULT_THEME));
        let _ = fs::remove_file(&file);
    }

    #[test]
    fn test_atomic_replace() {
        let dest = temp_settings_file();
        let tmp = dest.with_extension("json.tmp");
        fs::write(&tmp, "{}").unwrap();
        atomic_replace_file(&tmp, &dest).unwrap();
        assert!(dest.exists());
        assert!(!tmp.exists());
        let _ = fs::remove_file(&dest);
    }
}
