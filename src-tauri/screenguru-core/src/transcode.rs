//! 上传前的客户端转码：统一转成有损 WebP 给流量瘦身。
//!
//! 纯粹是尽力而为 —— 非图片原样放行，解码失败由调用方回退原文件，
//! 任何情况下都不允许让上传中止。

use crate::error::DecodeError;
use crate::image_type::{TARGET_EXTENSION, TARGET_MIME};
use crate::upload::PendingFile;

/// 有损 WebP 质量（最高 100，与页面版 canvas.toBlob 的 0.82 对应）。
const WEBP_QUALITY: f32 = 82.0;

/// 把一个待上传文件转码为 WebP。
///
/// - 声明类型不是 `image/*`：原样返回（成功）。
/// - 解码失败：[DecodeError]，调用方回退到原文件。
/// - 成功：新文件名为原名把最后一个扩展名段换成 `.webp`，类型 `image/webp`。
pub fn transcode(file: &PendingFile) -> Result<PendingFile, DecodeError> {
    if !crate::image_type::is_image_mime(&file.mime) {
        return Ok(file.clone());
    }

    let img = image::load_from_memory(&file.bytes)?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let encoded = webp::Encoder::from_rgba(rgba.as_raw(), width, height).encode(WEBP_QUALITY);

    Ok(PendingFile {
        name: replace_final_extension(&file.name, TARGET_EXTENSION),
        mime: TARGET_MIME.to_string(),
        bytes: encoded.to_vec(),
    })
}

/// 只替换最后一个扩展名段（`archive.tar.gz` → `archive.tar.webp`）；
/// 没有扩展名时直接追加。
fn replace_final_extension(name: &str, ext: &str) -> String {
    match name.rfind('.') {
        // 隐藏文件那种前导点不算扩展名
        Some(idx) if idx > 0 => format!("{}.{}", &name[..idx], ext),
        _ => format!("{}.{}", name, ext),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::png::PngEncoder;
    use image::{ColorType, ImageEncoder, RgbaImage};

    fn png_file(name: &str) -> PendingFile {
        let img = RgbaImage::from_fn(4, 4, |x, y| {
            image::Rgba([(x * 60) as u8, (y * 60) as u8, 128, 255])
        });
        let mut bytes = Vec::new();
        PngEncoder::new(&mut bytes)
            .write_image(img.as_raw(), 4, 4, ColorType::Rgba8)
            .unwrap();
        PendingFile::new(name, "image/png", bytes)
    }

    #[test]
    fn test_non_image_passes_through_unchanged() {
        let file = PendingFile::new("notes.txt", "text/plain", b"hello".to_vec());
        let out = transcode(&file).unwrap();
        assert_eq!(out, file);
    }

    #[test]
    fn test_image_becomes_webp() {
        let out = transcode(&png_file("shot.png")).unwrap();
        assert_eq!(out.mime, "image/webp");
        assert_eq!(out.name, "shot.webp");
        // WebP 容器魔数：RIFF....WEBP
        assert_eq!(&out.bytes[0..4], b"RIFF");
        assert_eq!(&out.bytes[8..12], b"WEBP");
    }

    #[test]
    fn test_only_final_extension_segment_replaced() {
        let out = transcode(&png_file("scan.2024.backup.png")).unwrap();
        assert_eq!(out.name, "scan.2024.backup.webp");
    }

    #[test]
    fn test_undecodable_image_is_decode_error() {
        let file = PendingFile::new("broken.png", "image/png", vec![0xde, 0xad, 0xbe, 0xef]);
        assert!(transcode(&file).is_err());
    }

    #[test]
    fn test_replace_final_extension_edge_cases() {
        assert_eq!(replace_final_extension("a.png", "webp"), "a.webp");
        assert_eq!(replace_final_extension("a.tar.gz", "webp"), "a.tar.webp");
        assert_eq!(replace_final_extension("noext", "webp"), "noext.webp");
        assert_eq!(replace_final_extension(".hidden", "webp"), ".hidden.webp");
    }
}
