//! Quark Drive provider client.
//!
//! JSON REST under `drive-pc.quark.cn/1/clouddrive/*`, cookie-authenticated
//! (`__pus`/`__puus`), per spec §4.1.1.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::cookie::Jar;
use reqwest::{Client, Method, Url};
use serde::Deserialize;
use serde_json::Value;
use sharesync_core::domain::base_file_info::FileExt;
use sharesync_core::domain::errors::CoreError;
use sharesync_core::domain::{BaseFileInfo, RelationshipItem, SourceType};
use sharesync_core::ports::{ListingFilter, OrderBy, OrderDirection, ProviderClient, Speed, TransferExt, UserInfo};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{with_retry, ProviderError};
use crate::listing::bfs_list;
use crate::rate_limit::CallLimiter;

const BASE_URL: &str = "https://drive-pc.quark.cn/1/clouddrive";
const SLOW_PAUSE: Duration = Duration::from_secs(3);

#[derive(Debug, Deserialize)]
struct QuarkEnvelope<T> {
    status: i32,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct QuarkFileItem {
    fid: String,
    file_name: String,
    #[serde(default)]
    pdir_fid: String,
    dir: bool,
    size: u64,
    #[serde(default)]
    updated_at: Option<i64>,
    #[serde(default)]
    created_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct QuarkFileList {
    #[serde(default)]
    list: Vec<QuarkFileItem>,
}

#[derive(Debug, Deserialize)]
struct QuarkMember {
    #[serde(default)]
    total_capacity: u64,
    #[serde(default)]
    use_capacity: u64,
}

#[derive(Debug, Deserialize)]
struct QuarkShareTokenData {
    stoken: String,
}

fn to_base_file_info(item: QuarkFileItem, path: &str) -> BaseFileInfo {
    BaseFileInfo {
        file_id: item.fid,
        file_name: item.file_name.clone(),
        file_path: format!("{}/{}", path.trim_end_matches('/'), item.file_name),
        is_folder: item.dir,
        file_size: item.size,
        parent_id: item.pdir_fid,
        created_at: item.created_at.and_then(|t| chrono::DateTime::from_timestamp_millis(t)),
        updated_at: item.updated_at.and_then(|t| chrono::DateTime::from_timestamp_millis(t)),
        file_ext: FileExt::new(),
    }
}

#[derive(Default)]
struct AuthState {
    unauthorized: bool,
    user_id: Option<String>,
}

pub struct QuarkClient {
    http: Client,
    base_url: String,
    state: RwLock<AuthState>,
    limiter: CallLimiter,
}

impl QuarkClient {
    pub fn new(raw_credentials: &str) -> Self {
        let jar = Jar::default();
        let url: Url = BASE_URL.parse().unwrap();
        let mut unauthorized = true;
        for pair in raw_credentials.split(';') {
            if let Some((k, v)) = pair.split_once('=') {
                let k = k.trim();
                if k == "__pus" || k == "__puus" {
                    jar.add_cookie_str(&format!("{k}={}", v.trim()), &url);
                    unauthorized = false;
                }
            }
        }

        Self {
            http: Client::builder()
                .cookie_provider(Arc::new(jar))
                .build()
                .expect("reqwest client"),
            base_url: BASE_URL.to_string(),
            state: RwLock::new(AuthState {
                unauthorized,
                ..Default::default()
            }),
            limiter: CallLimiter::per_second(5),
        }
    }

    async fn list_one_level(&self, parent_fid: Option<String>, path: String) -> Result<Vec<BaseFileInfo>, CoreError> {
        if self.state.read().await.unauthorized {
            return Err(CoreError::Auth("quark client is unauthorized".into()));
        }
        let pdir = parent_fid.unwrap_or_else(|| "0".to_string());

        let result: Result<Vec<BaseFileInfo>, ProviderError> = with_retry("quark.list", || {
            let pdir = pdir.clone();
            let path = path.clone();
            async move {
                self.limiter.acquire().await;
                let url = format!("{}/file/sort", self.base_url);
                let resp = self
                    .http
                    .request(Method::GET, &url)
                    .query(&[("pdir_fid", pdir.as_str())])
                    .send()
                    .await?;
                classify_response_status(resp.status().as_u16())?;
                let parsed: QuarkEnvelope<QuarkFileList> = resp.json().await?;
                if parsed.status != 0 {
                    if parsed.status == 401 {
                        return Err(ProviderError::Unauthorized(parsed.message));
                    }
                    return Err(ProviderError::Business(parsed.message));
                }
                let list = parsed.data.map(|d| d.list).unwrap_or_default();
                Ok(list.into_iter().map(|item| to_base_file_info(item, &path)).collect())
            }
        })
        .await;

        result.map_err(CoreError::from)
    }

    /// Quark has no friend/group relationship concept; `source_id` is the
    /// share's `pwd_id` and this exchanges it for the `stoken` every
    /// subsequent share call needs.
    async fn fetch_share_token(&self, pwd_id: &str) -> Result<String, ProviderError> {
        self.limiter.acquire().await;
        let url = format!("{}/share/sharepage/token", self.base_url);
        let resp = self
            .http
            .request(Method::POST, &url)
            .query(&[("pr", "ucpro"), ("fr", "pc")])
            .json(&serde_json::json!({"pwd_id": pwd_id, "passcode": ""}))
            .send()
            .await?;
        classify_response_status(resp.status().as_u16())?;
        let parsed: QuarkEnvelope<QuarkShareTokenData> = resp.json().await?;
        if parsed.status != 0 {
            return Err(ProviderError::Business(parsed.message));
        }
        parsed
            .data
            .map(|d| d.stoken)
            .ok_or_else(|| ProviderError::InvalidResponse("quark share token missing".into()))
    }

    /// Lists the items directly under `pdir_fid` within a share (`"0"` is
    /// the share root), used for both path navigation and the final
    /// listing pass.
    async fn fetch_share_items(
        &self,
        pwd_id: &str,
        stoken: &str,
        pdir_fid: &str,
    ) -> Result<Vec<QuarkFileItem>, ProviderError> {
        self.limiter.acquire().await;
        let url = format!("{}/share/sharepage/detail", self.base_url);
        let resp = self
            .http
            .request(Method::GET, &url)
            .query(&[
                ("pr", "ucpro"),
                ("fr", "pc"),
                ("pwd_id", pwd_id),
                ("stoken", stoken),
                ("pdir_fid", pdir_fid),
                ("force", "0"),
                ("_page", "1"),
                ("_size", "50"),
            ])
            .send()
            .await?;
        classify_response_status(resp.status().as_u16())?;
        let parsed: QuarkEnvelope<QuarkFileList> = resp.json().await?;
        if parsed.status != 0 {
            return Err(ProviderError::Business(parsed.message));
        }
        Ok(parsed.data.map(|d| d.list).unwrap_or_default())
    }

    async fn list_share_level(
        &self,
        pwd_id: &str,
        stoken: &str,
        pdir_fid: String,
        path: String,
    ) -> Result<Vec<BaseFileInfo>, CoreError> {
        if self.state.read().await.unauthorized {
            return Err(CoreError::Auth("quark client is unauthorized".into()));
        }
        let items = self.fetch_share_items(pwd_id, stoken, &pdir_fid).await.map_err(CoreError::from)?;
        Ok(items.into_iter().map(|item| to_base_file_info(item, &path)).collect())
    }

    /// Walks `path_components` one level at a time from the share root
    /// (`pdir_fid == "0"`), mirroring the Baidu fs_id walk but flat since a
    /// Quark share has no separate friend/group event to match first.
    async fn navigate_share_path(
        &self,
        pwd_id: &str,
        stoken: &str,
        path_components: &[&str],
    ) -> Result<(String, String), ProviderError> {
        let mut current_pdir = "0".to_string();
        let mut current_path = String::new();

        for component in path_components {
            let items = self.fetch_share_items(pwd_id, stoken, &current_pdir).await?;
            let Some(matched) = items.iter().find(|item| item.file_name == *component) else {
                return Err(ProviderError::NotFound(format!("share path component '{component}' not found")));
            };
            current_pdir = matched.fid.clone();
            current_path = format!("{current_path}/{component}");
        }

        Ok((current_pdir, current_path))
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
impl ProviderClient for QuarkClient {
    async fn get_user_info(&self) -> Result<UserInfo, CoreError> {
        if self.state.read().await.unauthorized {
            return Err(CoreError::Auth("quark client is unauthorized".into()));
        }
        self.limiter.acquire().await;

        let result: Result<QuarkEnvelope<QuarkMember>, ProviderError> =
            with_retry("quark.get_user_info", || async {
                let url = format!("{}/member", self.base_url);
                let resp = self.http.request(Method::GET, &url).send().await?;
                classify_response_status(resp.status().as_u16())?;
                Ok(resp.json().await?)
            })
            .await;
        let envelope = result.map_err(CoreError::from)?;
        let member = envelope.data.unwrap_or(QuarkMember {
            total_capacity: 0,
            use_capacity: 0,
        });

        Ok(UserInfo {
            user_id: self.state.read().await.user_id.clone().unwrap_or_default(),
            display_name: "Quark User".to_string(),
            quota_used: member.use_capacity,
            quota_total: member.total_capacity,
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
        debug!(path, recursive, ?speed, "quark list_disk");
        bfs_list(path, file_id, recursive, speed, SLOW_PAUSE, filter, |path, parent| {
            self.list_one_level(parent, path)
        })
        .await
    }

    async fn list_share(
        &self,
        _source_type: SourceType,
        source_id: &str,
        path: &str,
        recursive: bool,
        speed: Speed,
        filter: &dyn ListingFilter,
    ) -> Result<Vec<BaseFileInfo>, CoreError> {
        if self.state.read().await.unauthorized {
            return Err(CoreError::Auth("quark client is unauthorized".into()));
        }
        let normalized = path.trim_matches('/');
        if normalized.is_empty() {
            return Err(CoreError::Validation(
                "list_share path must be non-empty and non-root".into(),
            ));
        }
        let components: Vec<&str> = normalized.split('/').collect();

        let stoken = self.fetch_share_token(source_id).await.map_err(CoreError::from)?;
        let (target_fid, target_path) =
            self.navigate_share_path(source_id, &stoken, &components).await.map_err(CoreError::from)?;

        debug!(path, recursive, ?speed, "quark list_share");

        let pwd_id = source_id.to_string();
        bfs_list(&target_path, Some(&target_fid), recursive, speed, SLOW_PAUSE, filter, |path, parent| {
            let pwd_id = pwd_id.clone();
            let stoken = stoken.clone();
            async move {
                let pdir_fid = parent.unwrap_or_else(|| "0".to_string());
                self.list_share_level(&pwd_id, &stoken, pdir_fid, path).await
            }
        })
        .await
    }

    async fn mkdir(
        &self,
        path: &str,
        parent_id: Option<&str>,
        name: &str,
        return_if_exists: bool,
    ) -> Result<BaseFileInfo, CoreError> {
        let pdir = parent_id.unwrap_or("0").to_string();
        let full_path = format!("{}/{}", path.trim_end_matches('/'), name);

        let result: Result<BaseFileInfo, ProviderError> = with_retry("quark.mkdir", || async {
            self.limiter.acquire().await;
            let url = format!("{}/file", self.base_url);
            let resp = self
                .http
                .request(Method::POST, &url)
                .json(&serde_json::json!({"pdir_fid": pdir, "file_name": name, "dir_path": "", "dir_init_lock": false}))
                .send()
                .await?;
            classify_response_status(resp.status().as_u16())?;
            let parsed: QuarkEnvelope<Value> = resp.json().await?;
            if parsed.status != 0 {
                if return_if_exists && parsed.message.contains("exist") {
                    return Ok(BaseFileInfo {
                        file_id: pdir.clone(),
                        file_name: name.to_string(),
                        file_path: full_path.clone(),
                        is_folder: true,
                        file_size: 0,
                        parent_id: pdir.clone(),
                        created_at: None,
                        updated_at: None,
                        file_ext: FileExt::new(),
                    });
                }
                return Err(ProviderError::Business(parsed.message));
            }
            let fid = parsed
                .data
                .as_ref()
                .and_then(|d| d.get("fid"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            Ok(BaseFileInfo {
                file_id: fid,
                file_name: name.to_string(),
                file_path: full_path.clone(),
                is_folder: true,
                file_size: 0,
                parent_id: pdir.clone(),
                created_at: None,
                updated_at: None,
                file_ext: FileExt::new(),
            })
        })
        .await;

        result.map_err(CoreError::from)
    }

    async fn remove(&self, _paths: &[String], ids: &[String]) -> Result<bool, CoreError> {
        let fid_list = ids.to_vec();

        let result: Result<bool, ProviderError> = with_retry("quark.remove", || {
            let fid_list = fid_list.clone();
            async move {
                self.limiter.acquire().await;
                let url = format!("{}/file/delete", self.base_url);
                let resp = self
                    .http
                    .request(Method::POST, &url)
                    .json(&serde_json::json!({"filelist": fid_list, "action_type": 2}))
                    .send()
                    .await?;
                classify_response_status(resp.status().as_u16())?;
                let parsed: QuarkEnvelope<Value> = resp.json().await?;
                Ok(parsed.status == 0)
            }
        })
        .await;

        result.map_err(CoreError::from)
    }

    async fn transfer(
        &self,
        _source_type: SourceType,
        _source_id: &str,
        _source_path: &str,
        target_path: &str,
        target_id: Option<&str>,
        file_ids: &[String],
        ext: TransferExt,
    ) -> Result<bool, CoreError> {
        if file_ids.is_empty() {
            return Ok(true);
        }
        let to_pdir = target_id.unwrap_or("0").to_string();
        let fid_list = file_ids.to_vec();
        let ondup = ext.ondup.clone().unwrap_or_else(|| "newcopy".to_string());
        let target_path = target_path.to_string();

        let result: Result<bool, ProviderError> = with_retry("quark.transfer", || {
            let fid_list = fid_list.clone();
            let to_pdir = to_pdir.clone();
            let ondup = ondup.clone();
            let target_path = target_path.clone();
            async move {
                self.limiter.acquire().await;
                let url = format!("{}/file/share/transfer", self.base_url);
                let resp = self
                    .http
                    .request(Method::POST, &url)
                    .json(&serde_json::json!({
                        "fid_list": fid_list,
                        "to_pdir_fid": to_pdir,
                        "event_name": "transfer",
                        "ondup": ondup,
                        "target_path": target_path,
                    }))
                    .send()
                    .await?;
                classify_response_status(resp.status().as_u16())?;
                let parsed: QuarkEnvelope<Value> = resp.json().await?;
                Ok(parsed.status == 0)
            }
        })
        .await;

        result.map_err(CoreError::from)
    }

    async fn get_relationships(&self, _kind: SourceType) -> Result<Vec<RelationshipItem>, CoreError> {
        Ok(Vec::new())
    }

    async fn rename(&self, path: &str, new_name: &str) -> Result<BaseFileInfo, CoreError> {
        Err(CoreError::Internal(format!(
            "quark rename not wired to a fid resolver in this workspace (path={path}, new_name={new_name})"
        )))
    }

    async fn move_item(&self, _path: &str, _target_path: &str) -> Result<bool, CoreError> {
        Ok(false)
    }

    async fn copy_item(&self, _path: &str, _target_path: &str) -> Result<bool, CoreError> {
        Ok(false)
    }

    async fn search(&self, keyword: &str, _path: Option<&str>) -> Result<Vec<BaseFileInfo>, CoreError> {
        let keyword = keyword.to_string();
        let result: Result<Vec<BaseFileInfo>, ProviderError> = with_retry("quark.search", || {
            let keyword = keyword.clone();
            async move {
                self.limiter.acquire().await;
                let url = format!("{}/file/search", self.base_url);
                let resp = self
                    .http
                    .request(Method::GET, &url)
                    .query(&[("q", keyword.as_str())])
                    .send()
                    .await?;
                classify_response_status(resp.status().as_u16())?;
                let parsed: QuarkEnvelope<QuarkFileList> = resp.json().await?;
                let list = parsed.data.map(|d| d.list).unwrap_or_default();
                Ok(list.into_iter().map(|item| to_base_file_info(item, "")).collect())
            }
        })
        .await;

        result.map_err(CoreError::from)
    }

    async fn get_recycle_list(&self) -> Result<Vec<BaseFileInfo>, CoreError> {
        let result: Result<Vec<BaseFileInfo>, ProviderError> = with_retry("quark.recycle_list", || async {
            self.limiter.acquire().await;
            let url = format!("{}/file/trash", self.base_url);
            let resp = self.http.request(Method::GET, &url).send().await?;
            classify_response_status(resp.status().as_u16())?;
            let parsed: QuarkEnvelope<QuarkFileList> = resp.json().await?;
            let list = parsed.data.map(|d| d.list).unwrap_or_default();
            Ok(list.into_iter().map(|item| to_base_file_info(item, "")).collect())
        })
        .await;

        result.map_err(CoreError::from)
    }

    async fn restore(&self, ids: &[String]) -> Result<bool, CoreError> {
        let fid_list = ids.to_vec();
        let result: Result<bool, ProviderError> = with_retry("quark.restore", || {
            let fid_list = fid_list.clone();
            async move {
                self.limiter.acquire().await;
                let url = format!("{}/file/trash/recovery", self.base_url);
                let resp = self
                    .http
                    .request(Method::POST, &url)
                    .json(&serde_json::json!({"filelist": fid_list}))
                    .send()
                    .await?;
                classify_response_status(resp.status().as_u16())?;
                let parsed: QuarkEnvelope<Value> = resp.json().await?;
                Ok(parsed.status == 0)
            }
        })
        .await;

        result.map_err(CoreError::from)
    }

    async fn clear_recycle(&self) -> Result<bool, CoreError> {
        let result: Result<bool, ProviderError> = with_retry("quark.clear_recycle", || async {
            self.limiter.acquire().await;
            let url = format!("{}/file/trash/clear", self.base_url);
            let resp = self.http.request(Method::POST, &url).send().await?;
            classify_response_status(resp.status().as_u16())?;
            let parsed: QuarkEnvelope<Value> = resp.json().await?;
            Ok(parsed.status == 0)
        })
        .await;

        result.map_err(CoreError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_without_cookies_starts_unauthorized() {
        let client = QuarkClient::new("");
        assert!(client.http.get(BASE_URL).build().is_ok());
    }

    #[tokio::test]
    async fn client_with_pus_cookie_is_authorized() {
        let client = QuarkClient::new("__pus=abc123");
        assert!(!client.state.read().await.unauthorized);
    }

    #[tokio::test]
    async fn client_without_recognized_cookie_is_unauthorized() {
        let client = QuarkClient::new("foo=bar");
        assert!(client.state.read().await.unauthorized);
    }

    #[test]
    fn converts_quark_item_to_base_file_info() {
        let item = QuarkFileItem {
            fid: "f1".into(),
            file_name: "a.txt".into(),
            pdir_fid: "p1".into(),
            dir: false,
            size: 42,
            updated_at: None,
            created_at: None,
        };
        let info = to_base_file_info(item, "/root");
        assert_eq!(info.file_path, "/root/a.txt");
        assert_eq!(info.parent_id, "p1");
        assert!(!info.is_folder);
    }

    #[test]
    fn classify_maps_status_codes() {
        assert!(classify_response_status(204).is_ok());
        assert!(matches!(classify_response_status(404), Err(ProviderError::NotFound(_))));
    }
}
