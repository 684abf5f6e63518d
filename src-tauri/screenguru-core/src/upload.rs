//! 有界并发上传管线。
//!
//! 与页面版语义一致：共享游标 + `min(3, total)` 个 worker，每个 worker
//! 依次认领下一个未认领的下标，对认领到的文件先转码（失败则回退原文件）
//! 再提交。单个文件提交失败会让整个批次的收尾失败，但不会主动打断
//! 兄弟 worker —— 已经发出的请求照常跑完，worker 也会继续认领。

use async_trait::async_trait;
use futures_util::stream::{FuturesUnordered, StreamExt};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::api::AlbumTarget;
use crate::error::ApiError;
use crate::image_type;
use crate::transcode;

/// 固定并发上限：同时最多 3 个在途上传。不可配置，也不随文件数自适应
/// （只有 `min` 收紧）。
pub const UPLOAD_CONCURRENCY: usize = 3;

/// 一个待上传文件：名字、声明的媒体类型、内容。
/// 批次期间只读，整个生命周期归上传管线所有。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl PendingFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// 从磁盘读取一个文件，媒体类型按扩展名/内容推断（浏览器行为）。
    pub async fn from_path(path: &Path) -> Result<Self, String> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image")
            .to_string();
        let mime = image_type::detect_mime(path, &bytes);
        Ok(Self { name, mime, bytes })
    }
}

/// 文件提交的接缝：生产实现是 [crate::api::ApiClient]，测试用假实现。
#[async_trait]
pub trait ImageSubmitter: Send + Sync {
    async fn submit_image(&self, album_id: &str, file: &PendingFile) -> Result<(), ApiError>;
}

/// 进度浮层的观察者接口（页面版 `showUploadProgress` 返回的句柄）。
///
/// 调用顺序相对一个批次是串行的：`on_started` 一次，`on_progress` 若干次
/// （计数只增不减），最后恰好一次 `on_finished` 或 `on_failed`（两者都隐藏浮层）。
/// 不支持批次重叠。
pub trait UploadObserver: Send + Sync {
    /// 批次开始，计数器置 `0 / total`，浮层显示。
    fn on_started(&self, total: usize);
    /// 一个文件上传成功，计数器更新为 `completed / total`。
    fn on_progress(&self, completed: usize, total: usize);
    /// 全部成功：隐藏浮层并跳转到 `/{session_id}/{album_id}`。
    fn on_finished(&self, target: &AlbumTarget);
    /// 首个失败浮出：隐藏浮层，页面停留原地。
    fn on_failed(&self, message: &str);
}

/// 跑完一个上传批次。
///
/// 成功时（所有 worker 返回之后）通知 `on_finished`；任何 worker 失败则
/// 立即通知 `on_failed` 并返回该错误 —— 此时兄弟 worker 仍在跑，它们的
/// 结果不再有意义，但不会被主动取消。
pub async fn run_batch(
    files: Vec<PendingFile>,
    target: AlbumTarget,
    submitter: Arc<dyn ImageSubmitter>,
    observer: Arc<dyn UploadObserver>,
) -> Result<(), ApiError> {
    let total = files.len();
    observer.on_started(total);

    let files = Arc::new(files);
    let cursor = Arc::new(AtomicUsize::new(0));
    let completed = Arc::new(AtomicUsize::new(0));

    let num_workers = UPLOAD_CONCURRENCY.min(total);
    let mut handles = FuturesUnordered::new();
    for _ in 0..num_workers {
        handles.push(tokio::spawn(upload_worker(
            Arc::clone(&files),
            target.album_id.clone(),
            Arc::clone(&cursor),
            Arc::clone(&completed),
            Arc::clone(&submitter),
            Arc::clone(&observer),
        )));
    }

    let mut first_err: Option<ApiError> = None;
    while let Some(joined) = handles.next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                first_err = Some(e);
                break;
            }
            Err(e) => {
                first_err = Some(ApiError::Internal(format!("upload worker panicked: {}", e)));
                break;
            }
        }
    }

    match first_err {
        None => {
            observer.on_finished(&target);
            Ok(())
        }
        Some(e) => {
            observer.on_failed(&e.to_string());
            Err(e)
        }
    }
}

async fn upload_worker(
    files: Arc<Vec<PendingFile>>,
    album_id: String,
    cursor: Arc<AtomicUsize>,
    completed: Arc<AtomicUsize>,
    submitter: Arc<dyn ImageSubmitter>,
    observer: Arc<dyn UploadObserver>,
) -> Result<(), ApiError> {
    loop {
        // 原子认领下一个下标，两个 worker 不会拿到同一个文件
        let index = cursor.fetch_add(1, Ordering::SeqCst);
        if index >= files.len() {
            return Ok(());
        }
        let file = &files[index];

        // 转码是尽力而为的瘦身步骤，失败只打警告并回退原文件
        let outgoing = {
            let input = file.clone();
            match tokio::task::spawn_blocking(move || transcode::transcode(&input)).await {
                Ok(Ok(converted)) => converted,
                Ok(Err(e)) => {
                    eprintln!("[upload] Conversion failed, uploading original: {}", e);
                    file.clone()
                }
                Err(e) => {
                    eprintln!("[upload] Conversion task failed, uploading original: {}", e);
                    file.clone()
                }
            }
        };

        submitter.submit_image(&album_id, &outgoing).await?;

        let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
        observer.on_progress(done, files.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Mutex;
    use tokio::time::{sleep, Duration};

    /// 记录型假服务端：统计在途并发峰值，可指定某个文件名提交失败。
    struct FakeSubmitter {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        submitted: Mutex<Vec<String>>,
        fail_on: Option<String>,
    }

    impl FakeSubmitter {
        fn new(fail_on: Option<&str>) -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                submitted: Mutex::new(Vec::new()),
                fail_on: fail_on.map(|s| s.to_string()),
            }
        }
    }

    #[async_trait]
    impl ImageSubmitter for FakeSubmitter {
        async fn submit_image(&self, _album_id: &str, file: &PendingFile) -> Result<(), ApiError> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);
            sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail_on.as_deref() == Some(file.name.as_str()) {
                return Err(ApiError::Upload {
                    filename: file.name.clone(),
                    message: "HTTP 500 Internal Server Error".to_string(),
                });
            }
            self.submitted.lock().unwrap().push(file.name.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        started_total: AtomicUsize,
        progress: Mutex<Vec<(usize, usize)>>,
        finished: AtomicBool,
        failed: Mutex<Option<String>>,
    }

    impl UploadObserver for RecordingObserver {
        fn on_started(&self, total: usize) {
            self.started_total.store(total, Ordering::SeqCst);
        }
        fn on_progress(&self, completed: usize, total: usize) {
            self.progress.lock().unwrap().push((completed, total));
        }
        fn on_finished(&self, _target: &AlbumTarget) {
            self.finished.store(true, Ordering::SeqCst);
        }
        fn on_failed(&self, message: &str) {
            *self.failed.lock().unwrap() = Some(message.to_string());
        }
    }

    fn make_files(n: usize) -> Vec<PendingFile> {
        (0..n)
            .map(|i| PendingFile::new(format!("file{}.txt", i), "text/plain", vec![b'x'; 16]))
            .collect()
    }

    fn target() -> AlbumTarget {
        AlbumTarget {
            album_id: "alb".to_string(),
            session_id: "sess".to_string(),
        }
    }

    #[tokio::test]
    async fn test_seven_files_cap_three_all_succeed() {
        let submitter = Arc::new(FakeSubmitter::new(None));
        let observer = Arc::new(RecordingObserver::default());

        run_batch(
            make_files(7),
            target(),
            Arc::clone(&submitter) as Arc<dyn ImageSubmitter>,
            Arc::clone(&observer) as Arc<dyn UploadObserver>,
        )
        .await
        .unwrap();

        // 7 个全部提交，每个恰好一次
        let mut submitted = submitter.submitted.lock().unwrap().clone();
        submitted.sort();
        assert_eq!(submitted.len(), 7);
        submitted.dedup();
        assert_eq!(submitted.len(), 7);

        // 在途并发从不超过 3
        assert!(submitter.max_in_flight.load(Ordering::SeqCst) <= 3);

        // 计数单调递增到 7，之后才允许跳转
        let progress = observer.progress.lock().unwrap().clone();
        assert_eq!(progress.len(), 7);
        for window in progress.windows(2) {
            assert!(window[1].0 > window[0].0);
        }
        assert_eq!(progress.last().unwrap().0, 7);
        assert!(observer.finished.load(Ordering::SeqCst));
        assert!(observer.failed.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fourth_failure_fails_batch_without_navigation() {
        let submitter = Arc::new(FakeSubmitter::new(Some("file3.txt")));
        let observer = Arc::new(RecordingObserver::default());

        let err = run_batch(
            make_files(7),
            target(),
            Arc::clone(&submitter) as Arc<dyn ImageSubmitter>,
            Arc::clone(&observer) as Arc<dyn UploadObserver>,
        )
        .await
        .unwrap_err();

        match err {
            ApiError::Upload { filename, .. } => assert_eq!(filename, "file3.txt"),
            other => panic!("unexpected error: {}", other),
        }

        // 浮层收到失败（隐藏），且绝不跳转
        assert!(!observer.finished.load(Ordering::SeqCst));
        let failed = observer.failed.lock().unwrap().clone();
        assert!(failed.unwrap().contains("file3.txt"));
    }

    #[tokio::test]
    async fn test_single_file_uses_one_worker() {
        let submitter = Arc::new(FakeSubmitter::new(None));
        let observer = Arc::new(RecordingObserver::default());

        run_batch(
            make_files(1),
            target(),
            Arc::clone(&submitter) as Arc<dyn ImageSubmitter>,
            Arc::clone(&observer) as Arc<dyn UploadObserver>,
        )
        .await
        .unwrap();

        assert_eq!(submitter.max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(observer.started_total.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_batch_finishes_immediately() {
        let submitter = Arc::new(FakeSubmitter::new(None));
        let observer = Arc::new(RecordingObserver::default());

        run_batch(
            Vec::new(),
            target(),
            Arc::clone(&submitter) as Arc<dyn ImageSubmitter>,
            Arc::clone(&observer) as Arc<dyn UploadObserver>,
        )
        .await
        .unwrap();

        assert!(observer.finished.load(Ordering::SeqCst));
        assert!(submitter.submitted.lock().unwrap().is_empty());
    }
}
