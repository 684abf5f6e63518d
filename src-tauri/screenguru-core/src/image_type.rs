//! 支持的图片扩展名与 MIME 类型，集中定义供后端各处一致使用。
//!
//! 服务端只接受 jpeg/png/gif/webp；客户端允许用户选择更多格式，
//! 上传前会统一转码为 WebP，所以这里的列表比服务端的宽。

use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

/// 转码目标格式。
pub const TARGET_EXTENSION: &str = "webp";
pub const TARGET_MIME: &str = "image/webp";

/// 服务端单文件上传上限（与服务端 MaxFileSize 保持一致）。
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// 客户端可选择的图片扩展名（小写，不含点号）。
const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "bmp", "tiff", "tif",
];

/// 扩展名到 MIME 的映射。
const EXT_MIME: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("bmp", "image/bmp"),
    ("tiff", "image/tiff"),
    ("tif", "image/tiff"),
];

static MIME_BY_EXT: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();

fn mime_by_ext_map() -> &'static HashMap<&'static str, &'static str> {
    MIME_BY_EXT.get_or_init(|| EXT_MIME.iter().copied().collect())
}

/// 声明的媒体类型是否表示图片（与浏览器 `file.type.startsWith('image/')` 一致）。
#[inline]
pub fn is_image_mime(mime: &str) -> bool {
    mime.starts_with("image/")
}

/// 判断扩展名是否为支持的图片类型。`ext` 可含点号、任意大小写。
#[inline]
pub fn is_supported_image_ext(ext: &str) -> bool {
    let e = ext.trim().trim_start_matches('.').to_lowercase();
    !e.is_empty() && IMAGE_EXTENSIONS.contains(&e.as_str())
}

/// 推断一个待上传文件的「声明媒体类型」：
/// 先按扩展名查表（浏览器行为），查不到再按内容 infer 嗅探，
/// 都失败则回落到 `application/octet-stream`（上传时原样透传，不转码）。
pub fn detect_mime(path: &Path, bytes: &[u8]) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    if let Some(mime) = mime_by_ext_map().get(ext.as_str()) {
        return (*mime).to_string();
    }
    if let Some(kind) = infer::get(bytes) {
        return kind.mime_type().to_string();
    }
    "application/octet-stream".to_string()
}

/// 返回支持的图片扩展名列表（供文件选择器过滤、前端提示等使用）。
pub fn supported_image_extensions() -> Vec<String> {
    IMAGE_EXTENSIONS.iter().map(|s| (*s).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_detect_mime_by_extension() {
        assert_eq!(detect_mime(&PathBuf::from("a.PNG"), &[]), "image/png");
        assert_eq!(detect_mime(&PathBuf::from("b.jpeg"), &[]), "image/jpeg");
    }

    #[test]
    fn test_detect_mime_fallback() {
        // 无扩展名、无法嗅探的内容回落到 octet-stream
        assert_eq!(
            detect_mime(&PathBuf::from("noext"), &[0x00, 0x01]),
            "application/octet-stream"
        );
        // 无扩展名但内容是 PNG 魔数时按内容嗅探
        let png_magic = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
        assert_eq!(detect_mime(&PathBuf::from("noext"), &png_magic), "image/png");
    }

    #[test]
    fn test_is_image_mime() {
        assert!(is_image_mime("image/png"));
        assert!(is_image_mime("image/webp"));
        assert!(!is_image_mime("text/plain"));
        assert!(!is_image_mime("application/octet-stream"));
    }

    #[test]
    fn test_supported_ext() {
        assert!(is_supported_image_ext(".JPG"));
        assert!(is_supported_image_ext("webp"));
        assert!(!is_supported_image_ext("exe"));
        assert!(!is_supported_image_ext(""));
    }
}
