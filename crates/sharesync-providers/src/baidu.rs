//! Baidu Pan provider client.
//!
//! Cookie-jar-based, per spec §4.1.1: carries `BDUSS` (required),
//! `STOKEN`/`PTOKEN`/`BAIDUID` (optional), and memoizes `bdstoken` (scraped
//! from `/disk/home`) and `logid` (base64 of `BAIDUID`) on first use.

use std::collections::HashMap;
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

const BASE_URL: &str = "https://pan.baidu.com";
const SLOW_PAUSE: Duration = Duration::from_secs(3);

struct Credentials {
    bduss: String,
    stoken: Option<String>,
    ptoken: Option<String>,
    baiduid: Option<String>,
}

fn parse_credentials(raw: &str) -> Result<Credentials, ProviderError> {
    let mut fields: HashMap<&str, &str> = HashMap::new();
    for pair in raw.split(';') {
        if let Some((k, v)) = pair.split_once('=') {
            fields.insert(k.trim(), v.trim());
        }
    }
    let bduss = fields
        .get("BDUSS")
        .ok_or_else(|| ProviderError::Unauthorized("credentials missing BDUSS".into()))?
        .to_string();
    Ok(Credentials {
        bduss,
        stoken: fields.get("STOKEN").map(|s| s.to_string()),
        ptoken: fields.get("PTOKEN").map(|s| s.to_string()),
        baiduid: fields.get("BAIDUID").map(|s| s.to_string()),
    })
}

#[derive(Default)]
struct AuthState {
    bdstoken: Option<String>,
    logid: Option<String>,
    user_id: Option<String>,
    unauthorized: bool,
}

pub struct BaiduClient {
    http: Client,
    base_url: String,
    credentials: Credentials,
    state: RwLock<AuthState>,
    limiter: CallLimiter,
}

#[derive(Debug, Deserialize)]
struct DiskHomeResponse {
    #[serde(default)]
    bdstoken: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QuotaResponse {
    used: u64,
    total: u64,
}

#[derive(Debug, Deserialize)]
struct BaiduListItem {
    fs_id: i64,
    path: String,
    server_filename: String,
    size: u64,
    isdir: i32,
    #[serde(default)]
    server_mtime: Option<i64>,
    #[serde(default)]
    server_ctime: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    errno: i32,
    #[serde(default)]
    list: Vec<BaiduListItem>,
}

fn to_base_file_info(item: BaiduListItem, parent_id: &str) -> BaseFileInfo {
    BaseFileInfo {
        file_id: item.fs_id.to_string(),
        file_name: item.server_filename,
        file_path: item.path,
        is_folder: item.isdir != 0,
        file_size: item.size,
        parent_id: parent_id.to_string(),
        created_at: item.server_ctime.and_then(|t| chrono::DateTime::from_timestamp(t, 0)),
        updated_at: item.server_mtime.and_then(|t| chrono::DateTime::from_timestamp(t, 0)),
        file_ext: FileExt::new(),
    }
}

/// One matched share event: the root item a `file_path`'s first component
/// resolved to, plus the `msg_id`/sharer identity needed to navigate deeper
/// or later transfer out of it.
#[derive(Debug, Clone)]
struct ShareEvent {
    msg_id: String,
    sharer_uk: String,
    root_fs_id: String,
    root_name: String,
}

fn value_as_id_string(value: Option<&Value>) -> Option<String> {
    let value = value?;
    value.as_str().map(str::to_string).or_else(|| value.as_i64().map(|n| n.to_string()))
}

fn to_share_file_info(
    item: &Value,
    path_base: &str,
    fs_id: &str,
    sharer_uk: &str,
    msg_id: &str,
    single_file: bool,
) -> BaseFileInfo {
    let item_fs_id = value_as_id_string(item.get("fs_id")).unwrap_or_default();
    let name = item.get("server_filename").and_then(Value::as_str).unwrap_or_default().to_string();
    let is_folder = item.get("isdir").and_then(Value::as_i64).unwrap_or(0) != 0;
    let size = item.get("size").and_then(Value::as_u64).unwrap_or(0);
    let file_path = if single_file {
        path_base.to_string()
    } else {
        format!("{}/{name}", path_base.trim_end_matches('/'))
    };

    let mut file_ext = FileExt::new();
    file_ext.insert("from_uk".to_string(), Value::String(sharer_uk.to_string()));
    file_ext.insert("msg_id".to_string(), Value::String(msg_id.to_string()));

    BaseFileInfo {
        file_id: item_fs_id,
        file_name: name,
        file_path,
        is_folder,
        file_size: size,
        parent_id: fs_id.to_string(),
        created_at: item.get("server_ctime").and_then(Value::as_i64).and_then(|t| chrono::DateTime::from_timestamp(t, 0)),
        updated_at: item.get("server_mtime").and_then(Value::as_i64).and_then(|t| chrono::DateTime::from_timestamp(t, 0)),
        file_ext,
    }
}

impl BaiduClient {
    pub fn new(raw_credentials: &str) -> Self {
        let credentials = match parse_credentials(raw_credentials) {
            Ok(c) => c,
            Err(_) => Credentials {
                bduss: String::new(),
                stoken: None,
                ptoken: None,
                baiduid: None,
            },
        };

        let jar = Jar::default();
        let url: Url = BASE_URL.parse().unwrap();
        let mut cookie_str = format!("BDUSS={}", credentials.bduss);
        if let Some(ref s) = credentials.stoken {
            cookie_str.push_str(&format!("; STOKEN={s}"));
        }
        if let Some(ref p) = credentials.ptoken {
            cookie_str.push_str(&format!("; PTOKEN={p}"));
        }
        if let Some(ref b) = credentials.baiduid {
            cookie_str.push_str(&format!("; BAIDUID={b}"));
        }
        jar.add_cookie_str(&cookie_str, &url);

        let state = AuthState {
            logid: credentials.baiduid.as_ref().map(|b| base64_encode(b.as_bytes())),
            unauthorized: credentials.bduss.is_empty(),
            ..Default::default()
        };

        Self {
            http: Client::builder()
                .cookie_provider(Arc::new(jar))
                .build()
                .expect("reqwest client"),
            base_url: BASE_URL.to_string(),
            credentials,
            state: RwLock::new(state),
            limiter: CallLimiter::per_second(5),
        }
    }

    async fn ensure_bdstoken(&self) -> Result<String, ProviderError> {
        if let Some(tok) = self.state.read().await.bdstoken.clone() {
            return Ok(tok);
        }

        self.limiter.acquire().await;
        let url = format!("{}/disk/home", self.base_url);
        let resp = self
            .http
            .request(Method::GET, &url)
            .send()
            .await?
            .error_for_status()
            .map_err(ProviderError::Network)?;
        let body = resp.text().await?;

        let token = extract_bdstoken(&body)
            .ok_or_else(|| ProviderError::InvalidResponse("bdstoken not found in /disk/home".into()))?;

        self.state.write().await.bdstoken = Some(token.clone());
        Ok(token)
    }

    async fn mark_unauthorized_if_needed(&self, errno: i32) -> Result<(), ProviderError> {
        if matches!(errno, -6 | -7 | 111 | 112) {
            self.state.write().await.unauthorized = true;
            return Err(ProviderError::Unauthorized(format!("baidu errno {errno}")));
        }
        Ok(())
    }

    async fn list_one_level(&self, path: String) -> Result<Vec<BaseFileInfo>, CoreError> {
        if self.state.read().await.unauthorized {
            return Err(CoreError::Auth("baidu client is unauthorized".into()));
        }
        let bdstoken = self.ensure_bdstoken().await?;
        let path_for_call = path.clone();

        let result: Result<Vec<BaseFileInfo>, ProviderError> = with_retry("baidu.list", || {
            let path = path_for_call.clone();
            let bdstoken = bdstoken.clone();
            async move {
                self.limiter.acquire().await;
                let url = format!("{}/api/list", self.base_url);
                let resp = self
                    .http
                    .request(Method::GET, &url)
                    .query(&[("dir", path.as_str()), ("bdstoken", bdstoken.as_str())])
                    .send()
                    .await?;
                classify_response_status(resp.status().as_u16())?;
                let parsed: ListResponse = resp.json().await?;
                if parsed.errno != 0 {
                    self.mark_unauthorized_if_needed(parsed.errno).await?;
                    return Err(ProviderError::Business(format!("baidu errno {}", parsed.errno)));
                }
                Ok(parsed
                    .list
                    .into_iter()
                    .map(|item| to_base_file_info(item, &path))
                    .collect())
            }
        })
        .await;

        result.map_err(CoreError::from)
    }

    async fn current_uk(&self) -> Result<String, ProviderError> {
        if let Some(uk) = self.state.read().await.user_id.clone() {
            return Ok(uk);
        }
        self.credentials.baiduid.clone().ok_or_else(|| {
            ProviderError::InvalidResponse("baidu user id unknown, call get_user_info first".into())
        })
    }

    /// Fetches the raw share-event records for a friend/group relationship,
    /// per spec §4.1's `from_uk`/`msg_id`/`fs_id` triple walk.
    async fn fetch_share_messages(&self, source_type: SourceType, source_id: &str) -> Result<Vec<Value>, ProviderError> {
        self.limiter.acquire().await;

        let body: Value = match source_type {
            SourceType::Friend => {
                let url = format!("{}/mbox/msg/sessioninfo", self.base_url);
                let resp = self
                    .http
                    .request(Method::POST, &url)
                    .query(&[("clienttype", "0"), ("web", "1")])
                    .form(&[("type", "2"), ("to_uk", source_id)])
                    .send()
                    .await?;
                classify_response_status(resp.status().as_u16())?;
                resp.json().await?
            }
            SourceType::Group => {
                let url = format!("{}/mbox/group/listshare", self.base_url);
                let resp = self
                    .http
                    .request(Method::GET, &url)
                    .query(&[
                        ("clienttype", "0"),
                        ("web", "1"),
                        ("type", "2"),
                        ("gid", source_id),
                        ("limit", "50"),
                        ("desc", "1"),
                    ])
                    .send()
                    .await?;
                classify_response_status(resp.status().as_u16())?;
                resp.json().await?
            }
        };

        let errno = body.get("errno").and_then(Value::as_i64).unwrap_or(0);
        if errno != 0 {
            self.mark_unauthorized_if_needed(errno as i32).await?;
            return Err(ProviderError::Business(format!("baidu share list errno {errno}")));
        }

        let records = body.get("records").cloned().unwrap_or(Value::Null);
        let messages = match source_type {
            SourceType::Friend => records.get("list").and_then(Value::as_array).cloned().unwrap_or_default(),
            SourceType::Group => records.get("msg_list").and_then(Value::as_array).cloned().unwrap_or_default(),
        };
        Ok(messages)
    }

    /// Finds the share event whose root item's name matches `root_name`,
    /// mirroring `get_share_list`'s root-name match across the friend
    /// (`filelist.list`) and group (`file_list`) envelope shapes.
    async fn find_share_event(
        &self,
        source_type: SourceType,
        source_id: &str,
        root_name: &str,
    ) -> Result<ShareEvent, ProviderError> {
        let messages = self.fetch_share_messages(source_type, source_id).await?;

        for event in &messages {
            let Some(msg_id) = value_as_id_string(event.get("msg_id")) else {
                continue;
            };
            let sharer_uk = match source_type {
                SourceType::Friend => event.get("from_uk"),
                SourceType::Group => event.get("uk"),
            };
            let Some(sharer_uk) = value_as_id_string(sharer_uk) else {
                continue;
            };
            let root_items = match source_type {
                SourceType::Friend => event.get("filelist").and_then(|f| f.get("list")).and_then(Value::as_array),
                SourceType::Group => event.get("file_list").and_then(Value::as_array),
            };
            let Some(root_item) = root_items.and_then(|items| items.first()) else {
                continue;
            };
            let Some(root_item_name) = root_item.get("server_filename").and_then(Value::as_str) else {
                continue;
            };
            let Some(root_fs_id) = value_as_id_string(root_item.get("fs_id")) else {
                continue;
            };

            if root_item_name == root_name {
                return Ok(ShareEvent {
                    msg_id,
                    sharer_uk,
                    root_fs_id,
                    root_name: root_item_name.to_string(),
                });
            }
        }

        Err(ProviderError::NotFound(format!("no share event rooted at '{root_name}'")))
    }

    /// Lists the items directly under `fs_id` within a share, via the same
    /// `shareinfo` detail endpoint used for both path navigation and the
    /// final listing pass.
    async fn fetch_share_detail(
        &self,
        source_type: SourceType,
        source_id: &str,
        sharer_uk: &str,
        msg_id: &str,
        fs_id: &str,
    ) -> Result<Vec<Value>, ProviderError> {
        self.limiter.acquire().await;
        let url = format!("{}/mbox/msg/shareinfo", self.base_url);

        let resp = match source_type {
            SourceType::Friend => {
                let to_uk = self.current_uk().await?;
                self.http
                    .request(Method::POST, &url)
                    .query(&[
                        ("from_uk", sharer_uk),
                        ("msg_id", msg_id),
                        ("to_uk", to_uk.as_str()),
                        ("type", "1"),
                        ("num", "50"),
                        ("page", "1"),
                        ("fs_id", fs_id),
                    ])
                    .send()
                    .await?
            }
            SourceType::Group => {
                self.http
                    .request(Method::POST, &url)
                    .query(&[
                        ("from_uk", sharer_uk),
                        ("msg_id", msg_id),
                        ("type", "2"),
                        ("num", "50"),
                        ("page", "1"),
                        ("fs_id", fs_id),
                        ("gid", source_id),
                        ("limit", "50"),
                        ("desc", "1"),
                    ])
                    .send()
                    .await?
            }
        };

        classify_response_status(resp.status().as_u16())?;
        let body: Value = resp.json().await?;
        let errno = body.get("errno").and_then(Value::as_i64).unwrap_or(0);
        if errno != 0 {
            self.mark_unauthorized_if_needed(errno as i32).await?;
            return Err(ProviderError::Business(format!("baidu share detail errno {errno}")));
        }
        Ok(body.get("records").and_then(Value::as_array).cloned().unwrap_or_default())
    }

    /// Walks `path_components[1..]` one level at a time from the matched
    /// share event's root, returning the fs_id and display path of the
    /// final target.
    async fn navigate_share_path(
        &self,
        source_type: SourceType,
        source_id: &str,
        path_components: &[&str],
    ) -> Result<(ShareEvent, String, String), ProviderError> {
        let share_event = self.find_share_event(source_type, source_id, path_components[0]).await?;
        let mut current_fs_id = share_event.root_fs_id.clone();
        let mut current_path = format!("/{}", share_event.root_name);

        let remaining = &path_components[1..];
        for (idx, component) in remaining.iter().enumerate() {
            let is_last = idx == remaining.len() - 1;
            let items = self
                .fetch_share_detail(source_type, source_id, &share_event.sharer_uk, &share_event.msg_id, &current_fs_id)
                .await?;

            let Some(matched) =
                items.iter().find(|item| item.get("server_filename").and_then(Value::as_str) == Some(*component))
            else {
                return Err(ProviderError::NotFound(format!("share path component '{component}' not found")));
            };

            let is_dir = matched.get("isdir").and_then(Value::as_i64).unwrap_or(0) != 0;
            if !is_dir && !is_last {
                return Err(ProviderError::InvalidResponse(format!(
                    "share path component '{component}' is a file but further components remain"
                )));
            }

            current_fs_id = value_as_id_string(matched.get("fs_id"))
                .ok_or_else(|| ProviderError::InvalidResponse("share item missing fs_id".into()))?;
            current_path = format!("{current_path}/{component}");
        }

        Ok((share_event, current_fs_id, current_path))
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

fn extract_bdstoken(html: &str) -> Option<String> {
    let marker = "\"bdstoken\":\"";
    let start = html.find(marker)? + marker.len();
    let end = html[start..].find('"')? + start;
    Some(html[start..end].to_string())
}

fn base64_encode(bytes: &[u8]) -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    let mut out = String::new();
    for chunk in bytes.chunks(3) {
        let b = [chunk[0], *chunk.get(1).unwrap_or(&0), *chunk.get(2).unwrap_or(&0)];
        let n = ((b[0] as u32) << 16) | ((b[1] as u32) << 8) | (b[2] as u32);
        out.push(ALPHABET[(n >> 18 & 0x3f) as usize] as char);
        out.push(ALPHABET[(n >> 12 & 0x3f) as usize] as char);
        out.push(if chunk.len() > 1 { ALPHABET[(n >> 6 & 0x3f) as usize] as char } else { '=' });
        out.push(if chunk.len() > 2 { ALPHABET[(n & 0x3f) as usize] as char } else { '=' });
    }
    out
}

#[async_trait]
impl ProviderClient for BaiduClient {
    async fn get_user_info(&self) -> Result<UserInfo, CoreError> {
        if self.state.read().await.unauthorized {
            return Err(CoreError::Auth("baidu client is unauthorized".into()));
        }
        self.limiter.acquire().await;

        let quota_url = format!("{}/api/quota", self.base_url);
        let result: Result<QuotaResponse, ProviderError> = with_retry("baidu.get_user_info", || async {
            let resp = self.http.request(Method::GET, &quota_url).send().await?;
            classify_response_status(resp.status().as_u16())?;
            Ok(resp.json::<QuotaResponse>().await?)
        })
        .await;
        let quota = result.map_err(CoreError::from)?;

        let user_id = self
            .state
            .read()
            .await
            .user_id
            .clone()
            .or_else(|| self.credentials.baiduid.clone())
            .unwrap_or_default();

        Ok(UserInfo {
            user_id,
            display_name: "Baidu Pan User".to_string(),
            quota_used: quota.used,
            quota_total: quota.total,
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
        debug!(path, recursive, ?speed, "baidu list_disk");
        bfs_list(path, file_id, recursive, speed, SLOW_PAUSE, filter, |path, _parent| {
            self.list_one_level(path)
        })
        .await
    }

    async fn list_share(
        &self,
        source_type: SourceType,
        source_id: &str,
        path: &str,
        recursive: bool,
        speed: Speed,
        filter: &dyn ListingFilter,
    ) -> Result<Vec<BaseFileInfo>, CoreError> {
        if self.state.read().await.unauthorized {
            return Err(CoreError::Auth("baidu client is unauthorized".into()));
        }
        let normalized = path.trim_matches('/');
        if normalized.is_empty() {
            return Err(CoreError::Validation(
                "list_share path must be non-empty and non-root".into(),
            ));
        }
        let components: Vec<&str> = normalized.split('/').collect();

        let (share_event, target_fs_id, target_path) =
            self.navigate_share_path(source_type, source_id, &components).await.map_err(CoreError::from)?;

        debug!(path, recursive, ?speed, msg_id = %share_event.msg_id, "baidu list_share");

        let sharer_uk = share_event.sharer_uk;
        let msg_id = share_event.msg_id;

        bfs_list(&target_path, Some(&target_fs_id), recursive, speed, SLOW_PAUSE, filter, |path, parent_id| {
            let sharer_uk = sharer_uk.clone();
            let msg_id = msg_id.clone();
            async move {
                let fs_id = parent_id.unwrap_or_default();
                let items = self
                    .fetch_share_detail(source_type, source_id, &sharer_uk, &msg_id, &fs_id)
                    .await
                    .map_err(CoreError::from)?;

                let single_file = items.len() == 1
                    && value_as_id_string(items[0].get("fs_id")).as_deref() == Some(fs_id.as_str())
                    && items[0].get("isdir").and_then(Value::as_i64).unwrap_or(0) == 0;

                Ok(items
                    .iter()
                    .map(|item| to_share_file_info(item, &path, &fs_id, &sharer_uk, &msg_id, single_file))
                    .collect())
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
        let bdstoken = self.ensure_bdstoken().await.map_err(CoreError::from)?;
        let full_path = format!("{}/{}", path.trim_end_matches('/'), name);

        let result: Result<BaseFileInfo, ProviderError> = with_retry("baidu.mkdir", || async {
            self.limiter.acquire().await;
            let url = format!("{}/api/create", self.base_url);
            let resp = self
                .http
                .request(Method::POST, &url)
                .query(&[("bdstoken", bdstoken.as_str())])
                .form(&[("path", full_path.as_str()), ("isdir", "1")])
                .send()
                .await?;
            classify_response_status(resp.status().as_u16())?;
            let parsed: Value = resp.json().await?;
            let errno = parsed.get("errno").and_then(Value::as_i64).unwrap_or(-1);
            if errno == -8 && return_if_exists {
                return Ok(BaseFileInfo {
                    file_id: parent_id.unwrap_or_default().to_string(),
                    file_name: name.to_string(),
                    file_path: full_path.clone(),
                    is_folder: true,
                    file_size: 0,
                    parent_id: parent_id.unwrap_or_default().to_string(),
                    created_at: None,
                    updated_at: None,
                    file_ext: FileExt::new(),
                });
            }
            if errno != 0 {
                return Err(ProviderError::Business(format!("baidu mkdir errno {errno}")));
            }
            let fs_id = parsed.get("fs_id").and_then(Value::as_i64).unwrap_or(0);
            Ok(BaseFileInfo {
                file_id: fs_id.to_string(),
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
        let bdstoken = self.ensure_bdstoken().await.map_err(CoreError::from)?;
        let targets: Vec<String> = if !paths.is_empty() {
            paths.to_vec()
        } else {
            ids.to_vec()
        };
        let filelist = serde_json::to_string(&targets).unwrap_or_default();

        let result: Result<bool, ProviderError> = with_retry("baidu.remove", || async {
            self.limiter.acquire().await;
            let url = format!("{}/api/filemanager", self.base_url);
            let resp = self
                .http
                .request(Method::POST, &url)
                .query(&[("opera", "delete"), ("bdstoken", bdstoken.as_str())])
                .form(&[("filelist", filelist.as_str())])
                .send()
                .await?;
            classify_response_status(resp.status().as_u16())?;
            let parsed: Value = resp.json().await?;
            Ok(parsed.get("errno").and_then(Value::as_i64).unwrap_or(-1) == 0)
        })
        .await;

        result.map_err(CoreError::from)
    }

    async fn transfer(
        &self,
        source_type: SourceType,
        source_id: &str,
        _source_path: &str,
        target_path: &str,
        _target_id: Option<&str>,
        file_ids: &[String],
        ext: TransferExt,
    ) -> Result<bool, CoreError> {
        if file_ids.is_empty() {
            return Ok(true);
        }

        let msg_id = ext
            .msg_id
            .ok_or_else(|| CoreError::Validation("baidu transfer requires ext.msg_id from list_share".into()))?;
        let from_uk = ext
            .from_uk
            .ok_or_else(|| CoreError::Validation("baidu transfer requires ext.from_uk from list_share".into()))?;
        let to_uk = self.current_uk().await.map_err(CoreError::from)?;
        let bdstoken = self.ensure_bdstoken().await.map_err(CoreError::from)?;
        let logid = self.state.read().await.logid.clone().unwrap_or_default();

        let share_type = match source_type {
            SourceType::Friend => "1",
            SourceType::Group => "2",
        };
        let fs_ids = serde_json::to_string(file_ids).unwrap_or_default();
        let ondup = ext.ondup.unwrap_or_else(|| "newcopy".to_string());
        let is_async = if ext.async_transfer.unwrap_or(true) { "1" } else { "0" };
        let gid = if source_type == SourceType::Group { ext.gid.as_deref() } else { None };

        let result: Result<bool, ProviderError> = with_retry("baidu.transfer", || async {
            self.limiter.acquire().await;
            let url = format!("{}/mbox/msg/transfer", self.base_url);
            let mut form: Vec<(&str, &str)> = vec![
                ("from_uk", from_uk.as_str()),
                ("to_uk", to_uk.as_str()),
                ("msg_id", msg_id.as_str()),
                ("path", target_path),
                ("ondup", ondup.as_str()),
                ("async", is_async),
                ("fs_ids", fs_ids.as_str()),
                ("type", share_type),
            ];
            if let Some(gid) = gid {
                form.push(("gid", gid));
            }

            let resp = self
                .http
                .request(Method::POST, &url)
                .query(&[
                    ("channel", "chunlei"),
                    ("clienttype", "0"),
                    ("web", "1"),
                    ("logId", logid.as_str()),
                    ("bdstoken", bdstoken.as_str()),
                ])
                .form(&form)
                .send()
                .await?;
            classify_response_status(resp.status().as_u16())?;
            let parsed: Value = resp.json().await?;
            let errno = parsed.get("errno").and_then(Value::as_i64).unwrap_or(-1);
            if errno != 0 {
                self.mark_unauthorized_if_needed(errno as i32).await?;
                return Err(ProviderError::Business(format!("baidu transfer errno {errno}")));
            }
            Ok(true)
        })
        .await;

        result.map_err(CoreError::from)
    }

    async fn get_relationships(&self, _kind: SourceType) -> Result<Vec<RelationshipItem>, CoreError> {
        Ok(Vec::new())
    }

    async fn rename(&self, path: &str, new_name: &str) -> Result<BaseFileInfo, CoreError> {
        let bdstoken = self.ensure_bdstoken().await.map_err(CoreError::from)?;
        let newname = new_name.to_string();
        let path = path.to_string();

        let result: Result<BaseFileInfo, ProviderError> = with_retry("baidu.rename", || {
            let path = path.clone();
            let newname = newname.clone();
            async move {
                self.limiter.acquire().await;
                let body = serde_json::json!([{"path": path, "newname": newname}]);
                let filelist = serde_json::to_string(&body).unwrap_or_default();
                let url = format!("{}/api/filemanager", self.base_url);
                let resp = self
                    .http
                    .request(Method::POST, &url)
                    .query(&[("opera", "rename"), ("bdstoken", bdstoken.as_str())])
                    .form(&[("filelist", filelist.as_str())])
                    .send()
                    .await?;
                classify_response_status(resp.status().as_u16())?;
                let parsed: Value = resp.json().await?;
                if parsed.get("errno").and_then(Value::as_i64).unwrap_or(-1) != 0 {
                    return Err(ProviderError::Business("baidu rename failed".into()));
                }
                let parent = path.rsplit_once('/').map(|(p, _)| p).unwrap_or("/").to_string();
                Ok(BaseFileInfo {
                    file_id: String::new(),
                    file_name: newname.clone(),
                    file_path: format!("{parent}/{newname}"),
                    is_folder: false,
                    file_size: 0,
                    parent_id: String::new(),
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
        let bdstoken = self.ensure_bdstoken().await.map_err(CoreError::from)?;
        let body = serde_json::json!([{"path": path, "dest": target_path, "newname": ""}]);
        let filelist = serde_json::to_string(&body).unwrap_or_default();

        let result: Result<bool, ProviderError> = with_retry("baidu.move", || async {
            self.limiter.acquire().await;
            let url = format!("{}/api/filemanager", self.base_url);
            let resp = self
                .http
                .request(Method::POST, &url)
                .query(&[("opera", "move"), ("bdstoken", bdstoken.as_str())])
                .form(&[("filelist", filelist.as_str())])
                .send()
                .await?;
            classify_response_status(resp.status().as_u16())?;
            let parsed: Value = resp.json().await?;
            Ok(parsed.get("errno").and_then(Value::as_i64).unwrap_or(-1) == 0)
        })
        .await;

        result.map_err(CoreError::from)
    }

    async fn copy_item(&self, path: &str, target_path: &str) -> Result<bool, CoreError> {
        let bdstoken = self.ensure_bdstoken().await.map_err(CoreError::from)?;
        let body = serde_json::json!([{"path": path, "dest": target_path, "newname": ""}]);
        let filelist = serde_json::to_string(&body).unwrap_or_default();

        let result: Result<bool, ProviderError> = with_retry("baidu.copy", || async {
            self.limiter.acquire().await;
            let url = format!("{}/api/filemanager", self.base_url);
            let resp = self
                .http
                .request(Method::POST, &url)
                .query(&[("opera", "copy"), ("bdstoken", bdstoken.as_str())])
                .form(&[("filelist", filelist.as_str())])
                .send()
                .await?;
            classify_response_status(resp.status().as_u16())?;
            let parsed: Value = resp.json().await?;
            Ok(parsed.get("errno").and_then(Value::as_i64).unwrap_or(-1) == 0)
        })
        .await;

        result.map_err(CoreError::from)
    }

    async fn search(&self, keyword: &str, path: Option<&str>) -> Result<Vec<BaseFileInfo>, CoreError> {
        let bdstoken = self.ensure_bdstoken().await.map_err(CoreError::from)?;
        let search_dir = path.unwrap_or("/").to_string();
        let keyword = keyword.to_string();

        let result: Result<Vec<BaseFileInfo>, ProviderError> = with_retry("baidu.search", || {
            let search_dir = search_dir.clone();
            let keyword = keyword.clone();
            async move {
                self.limiter.acquire().await;
                let url = format!("{}/api/search", self.base_url);
                let resp = self
                    .http
                    .request(Method::GET, &url)
                    .query(&[
                        ("key", keyword.as_str()),
                        ("dir", search_dir.as_str()),
                        ("bdstoken", bdstoken.as_str()),
                    ])
                    .send()
                    .await?;
                classify_response_status(resp.status().as_u16())?;
                let parsed: ListResponse = resp.json().await?;
                if parsed.errno != 0 {
                    return Err(ProviderError::Business(format!("baidu search errno {}", parsed.errno)));
                }
                Ok(parsed
                    .list
                    .into_iter()
                    .map(|item| to_base_file_info(item, ""))
                    .collect())
            }
        })
        .await;

        result.map_err(CoreError::from)
    }

    async fn get_recycle_list(&self) -> Result<Vec<BaseFileInfo>, CoreError> {
        let bdstoken = self.ensure_bdstoken().await.map_err(CoreError::from)?;
        let result: Result<Vec<BaseFileInfo>, ProviderError> = with_retry("baidu.recycle_list", || async {
            self.limiter.acquire().await;
            let url = format!("{}/api/recycle/list", self.base_url);
            let resp = self
                .http
                .request(Method::GET, &url)
                .query(&[("bdstoken", bdstoken.as_str())])
                .send()
                .await?;
            classify_response_status(resp.status().as_u16())?;
            let parsed: ListResponse = resp.json().await?;
            Ok(parsed.list.into_iter().map(|item| to_base_file_info(item, "")).collect())
        })
        .await;

        result.map_err(CoreError::from)
    }

    async fn restore(&self, ids: &[String]) -> Result<bool, CoreError> {
        let bdstoken = self.ensure_bdstoken().await.map_err(CoreError::from)?;
        let fidlist = serde_json::to_string(ids).unwrap_or_default();

        let result: Result<bool, ProviderError> = with_retry("baidu.restore", || async {
            self.limiter.acquire().await;
            let url = format!("{}/api/recycle/restore", self.base_url);
            let resp = self
                .http
                .request(Method::POST, &url)
                .query(&[("bdstoken", bdstoken.as_str())])
                .form(&[("fidlist", fidlist.as_str())])
                .send()
                .await?;
            classify_response_status(resp.status().as_u16())?;
            let parsed: Value = resp.json().await?;
            Ok(parsed.get("errno").and_then(Value::as_i64).unwrap_or(-1) == 0)
        })
        .await;

        result.map_err(CoreError::from)
    }

    async fn clear_recycle(&self) -> Result<bool, CoreError> {
        let bdstoken = self.ensure_bdstoken().await.map_err(CoreError::from)?;
        let result: Result<bool, ProviderError> = with_retry("baidu.clear_recycle", || async {
            self.limiter.acquire().await;
            let url = format!("{}/api/recycle/clear", self.base_url);
            let resp = self
                .http
                .request(Method::POST, &url)
                .query(&[("bdstoken", bdstoken.as_str())])
                .send()
                .await?;
            classify_response_status(resp.status().as_u16())?;
            let parsed: Value = resp.json().await?;
            Ok(parsed.get("errno").and_then(Value::as_i64).unwrap_or(-1) == 0)
        })
        .await;

        result.map_err(CoreError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_credential_string() {
        let creds = parse_credentials("BDUSS=abc;STOKEN=def;PTOKEN=ghi;BAIDUID=jkl").unwrap();
        assert_eq!(creds.bduss, "abc");
        assert_eq!(creds.stoken.as_deref(), Some("def"));
        assert_eq!(creds.ptoken.as_deref(), Some("ghi"));
        assert_eq!(creds.baiduid.as_deref(), Some("jkl"));
    }

    #[test]
    fn rejects_credentials_missing_bduss() {
        assert!(parse_credentials("STOKEN=def").is_err());
    }

    #[test]
    fn new_client_without_bduss_starts_unauthorized() {
        let client = BaiduClient::new("STOKEN=def");
        assert!(client.credentials.bduss.is_empty());
    }

    #[test]
    fn extracts_bdstoken_from_html() {
        let html = r#"var locals = {"bdstoken":"abc123def456","other":"x"};"#;
        assert_eq!(extract_bdstoken(html).as_deref(), Some("abc123def456"));
    }

    #[test]
    fn missing_bdstoken_returns_none() {
        assert!(extract_bdstoken("<html>no token here</html>").is_none());
    }

    #[test]
    fn classify_maps_status_codes() {
        assert!(classify_response_status(200).is_ok());
        assert!(matches!(
            classify_response_status(401),
            Err(ProviderError::Unauthorized(_))
        ));
        assert!(matches!(classify_response_status(429), Err(ProviderError::RateLimited { .. })));
        assert!(matches!(classify_response_status(503), Err(ProviderError::ServerError(_))));
    }

    #[test]
    fn base64_encode_matches_known_vector() {
        assert_eq!(base64_encode(b"hello"), "aGVsbG8=");
    }
}
