//! 错误类型定义。
//!
//! core 内部以类型化错误传播；Tauri command 边界统一转成 String
//! （`map_err(|e| e.to_string())`）。

use thiserror::Error;

/// 图片解码失败（转码输入不可读）。
///
/// 调用方的契约是「回退到原始文件继续上传」，该错误永远不会让整个批次失败。
#[derive(Debug, Error)]
#[error("failed to decode image: {0}")]
pub struct DecodeError(#[from] pub image::ImageError);

/// 与 ScreenGuru 服务端交互产生的错误。
#[derive(Debug, Error)]
pub enum ApiError {
    /// 画册分配失败（非 2xx 响应、响应体缺少 album_id/session_id、或请求本身失败）。
    /// 批次在任何上传开始前就中止。
    #[error("failed to create album: {0}")]
    AlbumCreation(String),

    /// 单个文件提交失败（非 2xx 响应）。携带文件名，整个批次不再跳转。
    #[error("upload failed for {filename}: {message}")]
    Upload { filename: String, message: String },

    /// delete-image / delete-user 返回非 2xx。页面状态保持不变。
    #[error("delete failed: {0}")]
    Delete(String),

    /// 传输层错误（连接失败、响应体读取失败等）。
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// 基础设施错误（URL 解析、worker join 等，正常流程不应出现）。
    #[error("internal error: {0}")]
    Internal(String),
}
