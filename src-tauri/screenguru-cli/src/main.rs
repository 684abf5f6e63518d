//! ScreenGuru CLI
//!
//! 目前支持：
//! - `upload`：把本地文件批量上传到 ScreenGuru（与桌面端同一条有界并发管线）
//!   - 不指定 `--album-id` 时自动向服务端申请新画册
//! - `changelog`：拉取 changelog 并打印未读的版本段（`--all` 打印全部）
//! - `theme get` / `theme set`：读写持久化主题

use clap::{Args, Parser, Subcommand};
use screenguru_core::{
    api::{ApiClient, ExistingAlbum},
    changelog,
    image_type::MAX_UPLOAD_BYTES,
    settings::Settings,
    upload::{self, ImageSubmitter, PendingFile, UploadObserver},
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "screenguru-cli")]
#[command(version)]
#[command(about = "ScreenGuru 命令行工具（批量上传等）", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 批量上传本地文件
    Upload(UploadArgs),

    /// 检查 changelog
    Changelog(ChangelogArgs),

    /// 主题读写
    #[command(subcommand)]
    Theme(ThemeCommands),
}

#[derive(Args, Debug)]
struct UploadArgs {
    /// 要上传的文件
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// 往现有画册追加（需要同时给 --page-path 或让服务端的会话 cookie 生效）
    #[arg(long = "album-id")]
    album_id: Option<String>,

    /// 现有画册所在页面路径（形如 /{session_id}/{album_id}），session 从第一段取
    #[arg(long = "page-path")]
    page_path: Option<String>,

    /// 覆盖设置里的服务端地址
    #[arg(long = "server")]
    server: Option<String>,
}

#[derive(Args, Debug)]
struct ChangelogArgs {
    /// 忽略已读版本，打印全部版本段
    #[arg(long = "all", default_value_t = false)]
    all: bool,

    /// 覆盖设置里的服务端地址
    #[arg(long = "server")]
    server: Option<String>,
}

#[derive(Subcommand, Debug)]
enum ThemeCommands {
    /// 打印当前主题
    Get,
    /// 设置并持久化主题
    Set { theme: String },
}

/// 终端版进度浮层：`show/update/hide` 对应成打印行。
struct ConsoleObserver;

impl UploadObserver for ConsoleObserver {
    fn on_started(&self, total: usize) {
        println!("Uploading 0 / {} ...", total);
    }

    fn on_progress(&self, completed: usize, total: usize) {
        println!("Uploading {} / {} ...", completed, total);
    }

    fn on_finished(&self, _target: &screenguru_core::api::AlbumTarget) {}

    fn on_failed(&self, message: &str) {
        eprintln!("Upload failed: {}", message);
    }
}

async fn build_client(server_override: Option<&str>) -> Result<ApiClient, String> {
    match server_override {
        Some(server) => ApiClient::new(server).map_err(|e| e.to_string()),
        None => ApiClient::from_settings().await.map_err(|e| e.to_string()),
    }
}

async fn cmd_upload(args: UploadArgs) -> Result<(), String> {
    let api = Arc::new(build_client(args.server.as_deref()).await?);

    let mut files = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let file = PendingFile::from_path(path).await?;
        // 服务端单文件上限是硬错误，上传前挡掉省一次往返
        if file.bytes.len() as u64 > MAX_UPLOAD_BYTES {
            return Err(format!(
                "{}: file exceeds the {} MiB upload limit",
                path.display(),
                MAX_UPLOAD_BYTES / (1024 * 1024)
            ));
        }
        files.push(file);
    }

    let existing = args
        .album_id
        .filter(|id| !id.is_empty())
        .map(|album_id| ExistingAlbum {
            album_id,
            page_path: args.page_path.unwrap_or_default(),
        });

    let target = api
        .resolve_target(existing)
        .await
        .map_err(|e| e.to_string())?;

    let album_url = api.album_url(&target.session_id, &target.album_id);
    let submitter: Arc<dyn ImageSubmitter> = api;
    upload::run_batch(files, target, submitter, Arc::new(ConsoleObserver))
        .await
        .map_err(|e| e.to_string())?;

    println!("Done: {}", album_url);
    Ok(())
}

async fn cmd_changelog(args: ChangelogArgs) -> Result<(), String> {
    let api = build_client(args.server.as_deref()).await?;
    let Some(content) = api.fetch_changelog().await.map_err(|e| e.to_string())? else {
        println!("No changelog available.");
        return Ok(());
    };

    let last_seen = if args.all {
        None
    } else {
        Settings::global().get_last_seen_version().await?
    };

    match changelog::collect_unseen(&content, last_seen.as_deref()) {
        Some(notice) => {
            for section in &notice.sections {
                println!("== {} ==", section.version);
                println!("{}\n", section.body_html);
            }
        }
        None => println!("Already up to date."),
    }
    Ok(())
}

async fn cmd_theme(cmd: ThemeCommands) -> Result<(), String> {
    match cmd {
        ThemeCommands::Get => {
            println!("{}", Settings::global().get_theme().await?);
            Ok(())
        }
        ThemeCommands::Set { theme } => Settings::global().set_theme(theme).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = Settings::init_global() {
        eprintln!("Failed to initialize settings: {}", e);
        return ExitCode::FAILURE;
    }

    let result = match cli.command {
        Commands::Upload(args) => cmd_upload(args).await,
        Commands::Changelog(args) => cmd_changelog(args).await,
        Commands::Theme(cmd) => cmd_theme(cmd).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
