// Upload 相关命令

use std::path::{Path, PathBuf};
use std::sync::Arc;

use screenguru_core::api::{ApiClient, ExistingAlbum};
use screenguru_core::image_type;
use screenguru_core::upload::{self, ImageSubmitter, PendingFile, UploadObserver};

use crate::events::EmitterUploadObserver;
use crate::utils;

async fn read_pending_files(paths: &[String]) -> Result<Vec<PendingFile>, String> {
    let mut files = Vec::with_capacity(paths.len());
    for p in paths {
        files.push(PendingFile::from_path(Path::new(p)).await?);
    }
    Ok(files)
}

/// 跑完整个上传流程：解析目的地 → 有界并发批量上传。
/// 成功返回跳转路径 `/{session_id}/{album_id}`；失败用阻塞弹窗报告后返回 Err。
async fn run_upload(
    app: &tauri::AppHandle,
    paths: Vec<String>,
    album_id: Option<String>,
    page_path: Option<String>,
) -> Result<String, String> {
    let files = read_pending_files(&paths).await?;
    if files.is_empty() {
        return Err("Nothing to upload".to_string());
    }

    let api = ApiClient::global();

    let existing = album_id
        .filter(|id| !id.is_empty())
        .map(|album_id| ExistingAlbum {
            album_id,
            page_path: page_path.unwrap_or_default(),
        });

    let target = match api.resolve_target(existing).await {
        Ok(target) => target,
        Err(e) => {
            eprintln!("Error creating album: {}", e);
            utils::dialog::alert(app, "Ошибка при создании альбома").await;
            return Err(e.to_string());
        }
    };

    let redirect = format!("/{}/{}", target.session_id, target.album_id);

    let submitter: Arc<dyn ImageSubmitter> = api;
    let observer: Arc<dyn UploadObserver> = Arc::new(EmitterUploadObserver);
    if let Err(e) = upload::run_batch(files, target, submitter, observer).await {
        eprintln!("Batch upload error: {}", e);
        utils::dialog::alert(app, &format!("Ошибка при загрузке: {}", e)).await;
        return Err(e.to_string());
    }

    Ok(redirect)
}

/// 上传一组本地文件（拖放场景：前端把拖进来的路径原样传过来）。
///
/// `album_id` 非空表示往现有画册追加，session 从 `page_path` 第一段取；
/// 否则先向服务端申请新画册。
#[tauri::command]
pub async fn upload_files(
    app: tauri::AppHandle,
    paths: Vec<String>,
    album_id: Option<String>,
    page_path: Option<String>,
) -> Result<String, String> {
    run_upload(&app, paths, album_id, page_path).await
}

/// 点击上传区/秘密 HUD 时走的流程：先弹系统文件选择器，再复用 upload_files。
/// 用户取消返回 Ok(None)。
#[tauri::command]
pub async fn pick_and_upload(
    app: tauri::AppHandle,
    album_id: Option<String>,
    page_path: Option<String>,
) -> Result<Option<String>, String> {
    use tauri_plugin_dialog::{DialogExt, FilePath};

    let picker_app = app.clone();
    let picked = tokio::task::spawn_blocking(move || {
        let extensions = image_type::supported_image_extensions();
        let ext_refs: Vec<&str> = extensions.iter().map(|s| s.as_str()).collect();
        picker_app
            .dialog()
            .file()
            .add_filter("Изображения", &ext_refs)
            .blocking_pick_files()
    })
    .await
    .map_err(|e| format!("File picker task failed: {}", e))?;

    let Some(picked) = picked else {
        return Ok(None);
    };

    let paths: Vec<String> = picked
        .into_iter()
        .filter_map(|fp| match fp {
            FilePath::Path(p) => Some(p),
            FilePath::Url(u) => u.to_file_path().ok(),
        })
        .map(|p: PathBuf| p.to_string_lossy().to_string())
        .collect();

    if paths.is_empty() {
        return Ok(None);
    }

    run_upload(&app, paths, album_id, page_path).await.map(Some)
}
