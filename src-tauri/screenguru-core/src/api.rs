//! ScreenGuru 服务端 HTTP 客户端。
//!
//! 所有请求携带 cookie（服务端用 30 天的 `session_id` cookie 把画册归到用户名下），
//! 不设请求超时（与页面版 fetch 行为一致，用平台默认值）。

use arc_swap::ArcSwap;
use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use serde::Deserialize;
use std::sync::{Arc, OnceLock};
use url::Url;

use crate::error::ApiError;
use crate::settings::Settings;
use crate::upload::{ImageSubmitter, PendingFile};

/// 会话 cookie 名（与服务端 SessionCookieName 一致）。
pub const SESSION_COOKIE_NAME: &str = "session_id";

/// 一次上传批次的目的地，整批解析一次后只读。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumTarget {
    pub album_id: String,
    pub session_id: String,
}

/// 页面上下文里已经绑定的画册（在画册页里追加上传时使用）。
#[derive(Debug, Clone)]
pub struct ExistingAlbum {
    pub album_id: String,
    /// 当前页面路径（形如 `/{session_id}/{album_id}`），session 从第一段取。
    pub page_path: String,
}

#[derive(Debug, Deserialize)]
struct CreateAlbumResponse {
    album_id: Option<String>,
    session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChangelogResponse {
    data: Option<ChangelogData>,
}

#[derive(Debug, Deserialize)]
struct ChangelogData {
    content: Option<String>,
}

pub struct ApiClient {
    http: reqwest::Client,
    jar: Arc<Jar>,
    base: Url,
}

/// 全局客户端：用 ArcSwap 包一层，改服务端地址后可整体换新（cookie jar 随之重建）。
static API_CLIENT: OnceLock<ArcSwap<ApiClient>> = OnceLock::new();

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let base = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| ApiError::Internal(format!("Invalid server base URL: {}", e)))?;
        let jar = Arc::new(Jar::default());
        let http = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .user_agent(concat!("ScreenGuru-Desktop/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ApiError::Network)?;
        Ok(Self { http, jar, base })
    }

    /// 按当前设置构建客户端。
    pub async fn from_settings() -> Result<Self, ApiError> {
        let base = Settings::global()
            .get_server_base_url()
            .await
            .map_err(ApiError::Internal)?;
        Self::new(&base)
    }

    /// 初始化全局客户端（必须在首次使用前调用）。
    pub async fn init_global() -> Result<(), ApiError> {
        let client = Self::from_settings().await?;
        API_CLIENT
            .set(ArcSwap::from_pointee(client))
            .map_err(|_| ApiError::Internal("ApiClient already initialized".to_string()))?;
        Ok(())
    }

    /// 获取全局客户端引用。
    ///
    /// # Panics
    /// 如果尚未初始化，会 panic
    pub fn global() -> Arc<ApiClient> {
        API_CLIENT
            .get()
            .expect("ApiClient not initialized. Call ApiClient::init_global() first.")
            .load_full()
    }

    /// 服务端地址变更后整体换新全局客户端。
    pub async fn rebuild_global() -> Result<(), ApiError> {
        let client = Self::from_settings().await?;
        API_CLIENT
            .get()
            .ok_or_else(|| ApiError::Internal("ApiClient not initialized".to_string()))?
            .store(Arc::new(client));
        Ok(())
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base.as_str().trim_end_matches('/'), path)
    }

    /// 画册页 URL：`{base}/{session_id}/{album_id}`。
    pub fn album_url(&self, session_id: &str, album_id: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base.as_str().trim_end_matches('/'),
            session_id,
            album_id
        )
    }

    /// 单张图片 URL：`{base}/{session_id}/{album_id}/{filename}`。
    pub fn image_url(&self, session_id: &str, album_id: &str, filename: &str) -> String {
        format!("{}/{}", self.album_url(session_id, album_id), filename)
    }

    /// 解析本次批次的目的地。
    ///
    /// 页面上下文里已有画册时直接从路径取 session，不发请求；
    /// 否则向服务端申请新画册。任何失败都在上传开始前中止批次。
    pub async fn resolve_target(
        &self,
        existing: Option<ExistingAlbum>,
    ) -> Result<AlbumTarget, ApiError> {
        if let Some(existing) = existing {
            if !existing.album_id.is_empty() {
                let session_id = existing
                    .page_path
                    .split('/')
                    .find(|p| !p.is_empty())
                    .unwrap_or("")
                    .to_string();
                return Ok(AlbumTarget {
                    album_id: existing.album_id,
                    session_id,
                });
            }
        }
        self.create_album().await
    }

    /// `POST /create-album` → `{album_id, session_id}`。
    ///
    /// 非 2xx、响应体不完整、请求失败一律归为 AlbumCreation（页面版也是单一 alert）。
    pub async fn create_album(&self) -> Result<AlbumTarget, ApiError> {
        let resp = self
            .http
            .post(self.endpoint("/create-album"))
            .send()
            .await
            .map_err(|e| ApiError::AlbumCreation(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ApiError::AlbumCreation(format!("HTTP {}", resp.status())));
        }

        let body: CreateAlbumResponse = resp
            .json()
            .await
            .map_err(|e| ApiError::AlbumCreation(e.to_string()))?;

        match (body.album_id, body.session_id) {
            (Some(album_id), Some(session_id)) if !album_id.is_empty() && !session_id.is_empty() => {
                Ok(AlbumTarget {
                    album_id,
                    session_id,
                })
            }
            _ => Err(ApiError::AlbumCreation("Failed to create album".to_string())),
        }
    }

    /// `POST /upload`：multipart（`image` + `album_id`），带 XHR 标头。
    pub async fn upload_image(&self, album_id: &str, file: &PendingFile) -> Result<(), ApiError> {
        let part = reqwest::multipart::Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(&file.mime)?;
        let form = reqwest::multipart::Form::new()
            .part("image", part)
            .text("album_id", album_id.to_string());

        let resp = self
            .http
            .post(self.endpoint("/upload"))
            .header("X-Requested-With", "XMLHttpRequest")
            .multipart(form)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ApiError::Upload {
                filename: file.name.clone(),
                message: format!("HTTP {}", resp.status()),
            });
        }
        Ok(())
    }

    /// `POST /delete-image`：multipart（`album_id` + `filename`）。
    pub async fn delete_image(&self, album_id: &str, filename: &str) -> Result<(), ApiError> {
        let form = reqwest::multipart::Form::new()
            .text("album_id", album_id.to_string())
            .text("filename", filename.to_string());

        let resp = self
            .http
            .post(self.endpoint("/delete-image"))
            .multipart(form)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ApiError::Delete(format!("HTTP {}", resp.status())));
        }
        Ok(())
    }

    /// `POST /delete-user`：服务端负责清掉会话 cookie。
    pub async fn delete_user(&self) -> Result<(), ApiError> {
        let resp = self.http.post(self.endpoint("/delete-user")).send().await?;
        if !resp.status().is_success() {
            return Err(ApiError::Delete(format!("HTTP {}", resp.status())));
        }
        Ok(())
    }

    /// `GET /changelog` → `{data: {content}}`，缺 content 时返回 None（页面版同样静默）。
    pub async fn fetch_changelog(&self) -> Result<Option<String>, ApiError> {
        let resp = self.http.get(self.endpoint("/changelog")).send().await?;
        if !resp.status().is_success() {
            return Ok(None);
        }
        let body: ChangelogResponse = resp.json().await?;
        Ok(body.data.and_then(|d| d.content))
    }

    /// 从 cookie jar 里读会话 ID（尽力而为，非关键路径）。
    pub fn session_id(&self) -> Option<String> {
        let header = self.jar.cookies(&self.base)?;
        let cookies = header.to_str().ok()?;
        let prefix = format!("{}=", SESSION_COOKIE_NAME);
        for cookie in cookies.split(';') {
            let cookie = cookie.trim();
            if let Some(value) = cookie.strip_prefix(&prefix) {
                return Some(value.to_string());
            }
        }
        None
    }
}

#[async_trait]
impl ImageSubmitter for ApiClient {
    async fn submit_image(&self, album_id: &str, file: &PendingFile) -> Result<(), ApiError> {
        self.upload_image(album_id, file).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ApiClient {
        ApiClient::new("http://localhost:8000/").unwrap()
    }

    #[test]
    fn test_url_builders() {
        let c = client();
        assert_eq!(c.album_url("sess", "alb"), "http://localhost:8000/sess/alb");
        assert_eq!(
            c.image_url("sess", "alb", "shot.webp"),
            "http://localhost:8000/sess/alb/shot.webp"
        );
        assert_eq!(c.endpoint("/upload"), "http://localhost:8000/upload");
    }

    #[test]
    fn test_session_id_read_from_jar() {
        let c = client();
        assert_eq!(c.session_id(), None);
        let url = Url::parse("http://localhost:8000").unwrap();
        c.jar.add_cookie_str("session_id=abc123; Path=/", &url);
        assert_eq!(c.session_id().as_deref(), Some("abc123"));
    }

    #[tokio::test]
    async fn test_resolve_target_prefers_page_context() {
        // 页面里已经有 album_id 时不应发任何请求（base 指向不可达地址也必须成功）
        let c = ApiClient::new("http://127.0.0.1:1").unwrap();
        let target = c
            .resolve_target(Some(ExistingAlbum {
                album_id: "alb42".to_string(),
                page_path: "/sess7/alb42".to_string(),
            }))
            .await
            .unwrap();
        assert_eq!(target.album_id, "alb42");
        assert_eq!(target.session_id, "sess7");
    }
}
