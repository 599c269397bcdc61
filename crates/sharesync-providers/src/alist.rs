//! Alist provider client.
//!
//! JSON REST, `Authorization: Bearer <token>`, per spec §4.1.1.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::Value;
use sharesync_core::domain::base_file_info::FileExt;
use sharesync_core::domain::errors::CoreError;
use sharesync_core::domain::{BaseFileInfo, RelationshipItem, SourceType};
use sharesync_core::ports::{ListingFilter, OrderBy, OrderDirection, ProviderClient, Speed, TransferExt, UserInfo};
use tracing::debug;

use crate::error::{with_retry, ProviderError};
use crate::listing::bfs_list;
use crate::rate_limit::CallLimiter;

const BASE_URL: &str = "https://alist.example.invalid";
const SLOW_PAUSE: Duration = Duration::from_secs(3);

#[derive(Debug, Deserialize)]
struct AlistEnvelope<T> {
    code: i32,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct AlistFileItem {
    name: String,
    size: u64,
    is_dir: bool,
    #[serde(default)]
    modified: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AlistListData {
    #[serde(default)]
    content: Vec<AlistFileItem>,
}

fn to_base_file_info(item: AlistFileItem, parent_path: &str, parent_id: &str) -> BaseFileInfo {
    let updated = item
        .modified
        .as_deref()
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&chrono::Utc));
    BaseFileInfo {
        file_id: format!("{}/{}", parent_path.trim_end_matches('/'), item.name),
        file_name: item.name.clone(),
        file_path: format!("{}/{}", parent_path.trim_end_matches('/'), item.name),
        is_folder: item.is_dir,
        file_size: item.size,
        parent_id: parent_id.to_string(),
        created_at: None,
        updated_at: updated,
        file_ext: FileExt::new(),
    }
}

pub struct AlistClient {
    http: Client,
    base_url: String,
    token: String,
    limiter: CallLimiter,
}

impl AlistClient {
    pub fn new(raw_credentials: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: BASE_URL.to_string(),
            token: raw_credentials.trim().to_string(),
            limiter: CallLimiter::per_second(5),
        }
    }

    fn authed(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
    }

    async fn list_one_level(&self, path: String) -> Result<Vec<BaseFileInfo>, CoreError> {
        if self.token.is_empty() {
            return Err(CoreError::Auth("alist client has no bearer token".into()));
        }

        let result: Result<Vec<BaseFileInfo>, ProviderError> = with_retry("alist.list", || {
            let path = path.clone();
            async move {
                self.limiter.acquire().await;
                let resp = self
                    .authed(Method::POST, "/api/fs/list")
                    .json(&serde_json::json!({"path": path, "refresh": false}))
                    .send()
                    .await?;
                classify_response_status(resp.status().as_u16())?;
                let parsed: AlistEnvelope<AlistListData> = resp.json().await?;
                if parsed.code != 200 {
                    if parsed.code == 401 {
                        return Err(ProviderError::Unauthorized(parsed.message));
                    }
                    return Err(ProviderError::Business(parsed.message));
                }
                let content = parsed.data.map(|d| d.content).unwrap_or_default();
                Ok(content
                    .into_iter()
                    .map(|item| to_base_file_info(item, &path, &path))
                    .collect())
            }
        })
        .await;

        result.map_err(CoreError::from)
    }
}

fn classify_response_status(status: u16) -> Result<(), ProviderError> {
    match status {
        200..=299 => Ok(()),
        401 | 403 => Err(ProviderError::Unauthorized(format!("http {status}"))),
        404 => Err(ProviderError::NotFound(format!("http {status}"))),
        429 => Err(ProviderError::RateLimited {
            retry_after: Duration::from_secs(1),
        }),
        500..=599 => Err(ProviderError::ServerError(format!("http {status}"))),
        other => Err(ProviderError::InvalidResponse(format!("unexpected http {other}"))),
    }
}

#[async_trait]
impl ProviderClient for AlistClient {
    async fn get_user_info(&self) -> Result<UserInfo, CoreError> {
        if self.token.is_empty() {
            return Err(CoreError::Auth("alist client has no bearer token".into()));
        }
        self.limiter.acquire().await;

        #[derive(Debug, Deserialize)]
        struct MeData {
            username: String,
            #[serde(default)]
            base_path: String,
        }

        let result: Result<AlistEnvelope<MeData>, ProviderError> = with_retry("alist.get_user_info", || async {
            let resp = self.authed(Method::GET, "/api/me").send().await?;
            classify_response_status(resp.status().as_u16())?;
            Ok(resp.json().await?)
        })
        .await;
        let envelope = result.map_err(CoreError::from)?;
        let data = envelope.data.unwrap_or(MeData {
            username: String::new(),
            base_path: String::new(),
        });
        if !data.base_path.is_empty() {
            debug!(base_path = data.base_path, "alist user base path");
        }

        Ok(UserInfo {
            user_id: data.username.clone(),
            display_name: data.username,
            quota_used: 0,
            quota_total: 0,
            is_vip: false,
            is_supervip: false,
        })
    }

    async fn list_disk(
        &self,
        path: &str,
        file_id: Option<&str>,
        recursive: bool,
        speed: Speed,
        _order_by: OrderBy,
        _direction: OrderDirection,
        filter: &dyn ListingFilter,
    ) -> Result<Vec<BaseFileInfo>, CoreError> {
        debug!(path, recursive, ?speed, "alist list_disk");
        bfs_list(path, file_id, recursive, speed, SLOW_PAUSE, filter, |path, _parent| {
            self.list_one_level(path)
        })
        .await
    }

    async fn list_share(
        &self,
        _source_type: SourceType,
        _source_id: &str,
        path: &str,
        recursive: bool,
        speed: Speed,
        filter: &dyn ListingFilter,
    ) -> Result<Vec<BaseFileInfo>, CoreError> {
        if path.is_empty() || path == "/" {
            return Err(CoreError::Validation(
                "list_share path must be non-empty and non-root".into(),
            ));
        }
        // Alist's share listing and disk listing are the same endpoint, so
        // `source_type`/`source_id` carry no meaning here.
        self.list_disk(path, None, recursive, speed, OrderBy::Name, OrderDirection::Asc, filter).await
    }

    async fn mkdir(
        &self,
        path: &str,
        parent_id: Option<&str>,
        name: &str,
        return_if_exists: bool,
    ) -> Result<BaseFileInfo, CoreError> {
        let full_path = format!("{}/{}", path.trim_end_matches('/'), name);

        let result: Result<BaseFileInfo, ProviderError> = with_retry("alist.mkdir", || async {
            self.limiter.acquire().await;
            let resp = self
                .authed(Method::POST, "/api/fs/mkdir")
                .json(&serde_json::json!({"path": full_path}))
                .send()
                .await?;
            classify_response_status(resp.status().as_u16())?;
            let parsed: AlistEnvelope<Value> = resp.json().await?;
            if parsed.code != 200 && !(return_if_exists && parsed.message.contains("exist")) {
                return Err(ProviderError::Business(parsed.message));
            }
            Ok(BaseFileInfo {
                file_id: full_path.clone(),
                file_name: name.to_string(),
                file_path: full_path.clone(),
                is_folder: true,
                file_size: 0,
                parent_id: parent_id.unwrap_or_default().to_string(),
                created_at: None,
                updated_at: None,
                file_ext: FileExt::new(),
            })
        })
        .await;

        result.map_err(CoreError::from)
    }

    async fn remove(&self, paths: &[String], ids: &[String]) -> Result<bool, CoreError> {
        let targets: Vec<String> = if !paths.is_empty() { paths.to_vec() } else { ids.to_vec() };
        if targets.is_empty() {
            return Ok(true);
        }
        let (dir, names): (String, Vec<String>) = {
            let parent = targets[0]
                .rsplit_once('/')
                .map(|(p, _)| p.to_string())
                .unwrap_or_else(|| "/".to_string());
            let names = targets
                .iter()
                .filter_map(|p| p.rsplit_once('/').map(|(_, n)| n.to_string()))
                .collect();
            (parent, names)
        };

        let result: Result<bool, ProviderError> = with_retry("alist.remove", || {
            let dir = dir.clone();
            let names = names.clone();
            async move {
                self.limiter.acquire().await;
                let resp = self
                    .authed(Method::POST, "/api/fs/remove")
                    .json(&serde_json::json!({"dir": dir, "names": names}))
                    .send()
                    .await?;
                classify_response_status(resp.status().as_u16())?;
                let parsed: AlistEnvelope<Value> = resp.json().await?;
                Ok(parsed.code == 200)
            }
        })
        .await;

        result.map_err(CoreError::from)
    }

    async fn transfer(
        &self,
        _source_type: SourceType,
        _source_id: &str,
        source_path: &str,
        target_path: &str,
        _target_id: Option<&str>,
        file_ids: &[String],
        _ext: TransferExt,
    ) -> Result<bool, CoreError> {
        if file_ids.is_empty() {
            return Ok(true);
        }
        let names = file_ids.to_vec();
        let src_dir = source_path.to_string();
        let dst_dir = target_path.to_string();

        let result: Result<bool, ProviderError> = with_retry("alist.transfer", || {
            let names = names.clone();
            let src_dir = src_dir.clone();
            let dst_dir = dst_dir.clone();
            async move {
                self.limiter.acquire().await;
                let resp = self
                    .authed(Method::POST, "/api/fs/copy")
                    .json(&serde_json::json!({
                        "src_dir": src_dir,
                        "dst_dir": dst_dir,
                        "names": names,
                    }))
                    .send()
                    .await?;
                classify_response_status(resp.status().as_u16())?;
                let parsed: AlistEnvelope<Value> = resp.json().await?;
                Ok(parsed.code == 200)
            }
        })
        .await;

        result.map_err(CoreError::from)
    }

    async fn get_relationships(&self, _kind: SourceType) -> Result<Vec<RelationshipItem>, CoreError> {
        Ok(Vec::new())
    }

    async fn rename(&self, path: &str, new_name: &str) -> Result<BaseFileInfo, CoreError> {
        let path = path.to_string();
        let new_name = new_name.to_string();

        let result: Result<BaseFileInfo, ProviderError> = with_retry("alist.rename", || {
            let path = path.clone();
            let new_name = new_name.clone();
            async move {
                self.limiter.acquire().await;
                let resp = self
                    .authed(Method::POST, "/api/fs/rename")
                    .json(&serde_json::json!({"path": path, "name": new_name}))
                    .send()
                    .await?;
                classify_response_status(resp.status().as_u16())?;
                let parsed: AlistEnvelope<Value> = resp.json().await?;
                if parsed.code != 200 {
                    return Err(ProviderError::Business(parsed.message));
                }
                let parent = path.rsplit_once('/').map(|(p, _)| p).unwrap_or("/").to_string();
                Ok(BaseFileInfo {
                    file_id: format!("{parent}/{new_name}"),
                    file_name: new_name.clone(),
                    file_path: format!("{parent}/{new_name}"),
                    is_folder: false,
                    file_size: 0,
                    parent_id: parent,
                    created_at: None,
                    updated_at: None,
                    file_ext: FileExt::new(),
                })
            }
        })
        .await;

        result.map_err(CoreError::from)
    }

    async fn move_item(&self, path: &str, target_path: &str) -> Result<bool, CoreError> {
        let src_dir = path.rsplit_once('/').map(|(p, _)| p.to_string()).unwrap_or_else(|| "/".to_string());
        let name = path.rsplit_once('/').map(|(_, n)| n.to_string()).unwrap_or_default();
        let dst_dir = target_path.to_string();

        let result: Result<bool, ProviderError> = with_retry("alist.move", || {
            let src_dir = src_dir.clone();
            let dst_dir = dst_dir.clone();
            let name = name.clone();
            async move {
                self.limiter.acquire().await;
                let resp = self
                    .authed(Method::POST, "/api/fs/move")
                    .json(&serde_json::json!({"src_dir": src_dir, "dst_dir": dst_dir, "names": [name]}))
                    .send()
                    .await?;
                classify_response_status(resp.status().as_u16())?;
                let parsed: AlistEnvelope<Value> = resp.json().await?;
                Ok(parsed.code == 200)
            }
        })
        .await;

        result.map_err(CoreError::from)
    }

    async fn copy_item(&self, path: &str, target_path: &str) -> Result<bool, CoreError> {
        self.transfer(SourceType::Friend, "", path, target_path, None, &[path.to_string()], TransferExt::default())
            .await
    }

    async fn search(&self, keyword: &str, path: Option<&str>) -> Result<Vec<BaseFileInfo>, CoreError> {
        let parent_path = path.unwrap_or("/").to_string();
        let keyword = keyword.to_string();

        let result: Result<Vec<BaseFileInfo>, ProviderError> = with_retry("alist.search", || {
            let parent_path = parent_path.clone();
            let keyword = keyword.clone();
            async move {
                self.limiter.acquire().await;
                let resp = self
                    .authed(Method::POST, "/api/fs/search")
                    .json(&serde_json::json!({"parent": parent_path, "keywords": keyword}))
                    .send()
                    .await?;
                classify_response_status(resp.status().as_u16())?;
                let parsed: AlistEnvelope<AlistListData> = resp.json().await?;
                let content = parsed.data.map(|d| d.content).unwrap_or_default();
                Ok(content
                    .into_iter()
                    .map(|item| to_base_file_info(item, &parent_path, &parent_path))
                    .collect())
            }
        })
        .await;

        result.map_err(CoreError::from)
    }

    async fn get_recycle_list(&self) -> Result<Vec<BaseFileInfo>, CoreError> {
        Ok(Vec::new())
    }

    async fn restore(&self, _ids: &[String]) -> Result<bool, CoreError> {
        Ok(false)
    }

    async fn clear_recycle(&self) -> Result<bool, CoreError> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_client_stores_bearer_token() {
        let client = AlistClient::new("my-token");
        assert_eq!(client.token, "my-token");
    }

    #[test]
    fn to_base_file_info_builds_nested_path() {
        let item = AlistFileItem {
            name: "report.pdf".into(),
            size: 1024,
            is_dir: false,
            modified: Some("2026-01-02T03:04:05Z".into()),
        };
        let info = to_base_file_info(item, "/shared", "/shared");
        assert_eq!(info.file_path, "/shared/report.pdf");
        assert!(info.updated_at.is_some());
    }

    #[test]
    fn classify_maps_status_codes() {
        assert!(classify_response_status(200).is_ok());
        assert!(matches!(classify_response_status(403), Err(ProviderError::Unauthorized(_))));
    }
}
