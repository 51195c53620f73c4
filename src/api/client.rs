use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{header, Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use url::Url;

use super::response::{read_envelope, require_data};
use crate::ability::context::PermissionSource;
use crate::auth::{SessionStore, TokenManager};
use crate::config::AppConfig;
use crate::enhance::{EnhanceRequest, Setting};
use crate::error::{ClientError, ClientResult};
use crate::models::{
    decode_permissions, Credits, DownloadVideo, EnhanceJob, Feature, Id, Role, RolePermission, SideMenuItem,
    UploadedVideo, User,
};
use crate::poller::JobSource;
use crate::types::{ApiEnvelope, PageQuery};

#[derive(Debug, Deserialize)]
struct CreatedRecord {
    id: Id,
}

/// Authenticated client for the Elpix backend.
///
/// Every call asks the [`TokenManager`] for a bearer token first, so an
/// expired token is refreshed once before the request goes out.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    tokens: Arc<TokenManager>,
}

impl ApiClient {
    pub fn new(base_url: &str, store: Arc<dyn SessionStore>, config: &AppConfig) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(config.api.request_timeout())
            .build()?;
        let tokens = Arc::new(TokenManager::new(http.clone(), base_url, store)?);
        Ok(Self::with_tokens(http, tokens))
    }

    pub fn with_tokens(http: Client, tokens: Arc<TokenManager>) -> Self {
        Self {
            base_url: tokens.base_url().to_string(),
            http,
            tokens,
        }
    }

    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> ClientResult<Url> {
        let endpoint = endpoint.trim_start_matches('/');
        Ok(Url::parse(&format!("{}/{}", self.base_url, endpoint))?)
    }

    async fn request(&self, method: Method, url: Url) -> ClientResult<RequestBuilder> {
        let token = self.tokens.bearer().await?;
        Ok(self
            .http
            .request(method, url)
            .header(header::AUTHORIZATION, format!("Bearer {}", token)))
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ClientResult<ApiEnvelope<T>> {
        let response = builder.send().await?;
        read_envelope(response).await
    }

    // Generic helpers, one per REST verb the dashboard uses

    pub async fn get_all<T: DeserializeOwned>(&self, endpoint: &str) -> ClientResult<ApiEnvelope<T>> {
        let builder = self.request(Method::GET, self.url(endpoint)?).await?;
        self.send(builder).await
    }

    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> ClientResult<ApiEnvelope<T>> {
        let mut url = self.url(endpoint)?;
        url.query_pairs_mut()
            .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        let builder = self.request(Method::GET, url).await?;
        self.send(builder).await
    }

    pub async fn get_by_id<T: DeserializeOwned>(&self, endpoint: &str, id: &Id) -> ClientResult<ApiEnvelope<T>> {
        self.get_all(&format!("{}/{}", endpoint.trim_end_matches('/'), id)).await
    }

    pub async fn create<B, T>(&self, endpoint: &str, body: &B) -> ClientResult<ApiEnvelope<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::POST, self.url(endpoint)?).await?.json(body);
        self.send(builder).await
    }

    pub async fn update<B, T>(&self, endpoint: &str, id: &Id, body: &B) -> ClientResult<ApiEnvelope<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(&format!("{}/{}", endpoint.trim_end_matches('/'), id))?;
        let builder = self.request(Method::PATCH, url).await?.json(body);
        self.send(builder).await
    }

    pub async fn update_with_query<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> ClientResult<ApiEnvelope<T>> {
        let mut url = self.url(endpoint)?;
        url.query_pairs_mut()
            .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        let builder = self.request(Method::PATCH, url).await?;
        self.send(builder).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str, id: &Id) -> ClientResult<ApiEnvelope<T>> {
        let url = self.url(&format!("{}/{}", endpoint.trim_end_matches('/'), id))?;
        let builder = self.request(Method::DELETE, url).await?;
        self.send(builder).await
    }

    // Permissions

    pub async fn role_permissions(&self, role_id: &str) -> ClientResult<Vec<RolePermission>> {
        let envelope: ApiEnvelope<Value> = self
            .get_with_query("/api/v1/role/permission", &[("roleId", role_id.to_string())])
            .await?;
        if !envelope.is_success() {
            tracing::warn!(role_id, status = ?envelope.status, "permission fetch was not successful");
            return Ok(Vec::new());
        }
        Ok(decode_permissions(envelope.data))
    }

    /// Permission matrix for the role editor
    pub async fn permission_matrix(&self, role_id: &str) -> ClientResult<Vec<RolePermission>> {
        let envelope: ApiEnvelope<Value> = self
            .get_with_query("/api/v1/permission", &[("roleId", role_id.to_string())])
            .await?;
        Ok(decode_permissions(envelope.data))
    }

    pub async fn set_access_active(&self, access_id: &str, is_active: bool) -> ClientResult<String> {
        let endpoint = format!("/api/v1/permission/{}/change-active", access_id);
        let envelope: ApiEnvelope<Value> = self
            .update_with_query(&endpoint, &[("isActive", is_active.to_string())])
            .await?;
        Ok(envelope.message_or_default())
    }

    pub async fn side_menu(&self) -> ClientResult<Vec<SideMenuItem>> {
        let envelope: ApiEnvelope<Value> = self.get_all("/api/v1/menu/side").await?;
        // Anything but an array is an empty menu
        match envelope.data {
            Some(data @ Value::Array(_)) => Ok(serde_json::from_value(data)?),
            _ => Ok(Vec::new()),
        }
    }

    pub async fn roles(&self, page: &PageQuery) -> ClientResult<Vec<Role>> {
        let envelope: ApiEnvelope<Vec<Role>> = self.get_with_query("/api/v1/role", &page.to_pairs()).await?;
        Ok(envelope.data.unwrap_or_default())
    }

    // Enhancement jobs

    pub async fn enhance_job(&self, id: &Id) -> ClientResult<Option<EnhanceJob>> {
        let envelope: ApiEnvelope<EnhanceJob> = self.get_by_id("/api/v1/enhance", id).await?;
        Ok(envelope.data)
    }

    pub async fn active_jobs(&self) -> ClientResult<Vec<EnhanceJob>> {
        let envelope: ApiEnvelope<Vec<EnhanceJob>> = self.get_all("/api/v1/enhance/process").await?;
        Ok(envelope.data.unwrap_or_default())
    }

    /// Submit a job; returns the new job id and the server message
    pub async fn create_enhance(&self, request: &EnhanceRequest) -> ClientResult<(Id, String)> {
        let envelope: ApiEnvelope<CreatedRecord> = self.create("/api/v1/enhance", request).await?;
        let message = envelope.message_or_default();
        let record = require_data(envelope, "job id")?;
        Ok((record.id, message))
    }

    /// Feature groups with their selectable models
    pub async fn ml_features(&self) -> ClientResult<Vec<Feature>> {
        let envelope: ApiEnvelope<Vec<Feature>> = self.get_all("/api/v1/tensorpix/ml-models").await?;
        Ok(envelope.data.unwrap_or_default())
    }

    pub async fn credits(&self) -> ClientResult<Credits> {
        let envelope: ApiEnvelope<Credits> = self.get_all("/api/v1/tensorpix/credits").await?;
        Ok(envelope.data.unwrap_or_default())
    }

    pub async fn enhance_settings(&self) -> ClientResult<Vec<Setting>> {
        let envelope: ApiEnvelope<Vec<Setting>> = self.get_all("/api/v1/tensorpix/settings").await?;
        Ok(envelope.data.unwrap_or_default())
    }

    // Videos

    pub async fn videos(&self, page: &PageQuery) -> ClientResult<Vec<UploadedVideo>> {
        let envelope: ApiEnvelope<Vec<UploadedVideo>> =
            self.get_with_query("/api/v1/video", &page.to_pairs()).await?;
        Ok(envelope.data.unwrap_or_default())
    }

    pub async fn video(&self, id: &Id) -> ClientResult<UploadedVideo> {
        let envelope: ApiEnvelope<UploadedVideo> = self.get_by_id("/api/v1/video", id).await?;
        require_data(envelope, "video")
    }

    pub async fn delete_video(&self, id: &Id) -> ClientResult<String> {
        let envelope: ApiEnvelope<Value> = self.delete("/api/v1/video", id).await?;
        Ok(envelope.message_or_default())
    }

    pub async fn enhanced_videos(&self, page: &PageQuery) -> ClientResult<Vec<DownloadVideo>> {
        let envelope: ApiEnvelope<Vec<DownloadVideo>> = self
            .get_with_query("/api/v1/enhance/video", &page.to_pairs())
            .await?;
        Ok(envelope.data.unwrap_or_default())
    }

    pub async fn enhanced_video(&self, id: &Id) -> ClientResult<DownloadVideo> {
        let envelope: ApiEnvelope<DownloadVideo> = self.get_by_id("/api/v1/enhance/video", id).await?;
        require_data(envelope, "enhanced video")
    }

    /// Multipart upload of a local file to the worksheet
    pub async fn upload_video(&self, path: &Path) -> ClientResult<(Id, String)> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("video")
            .to_string();
        let bytes = tokio::fs::read(path).await?;
        let size = bytes.len();

        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.clone());
        let form = reqwest::multipart::Form::new().part("file", part);

        tracing::info!(file = %file_name, size, "uploading video");

        let builder = self
            .request(Method::POST, self.url("/api/v1/video")?)
            .await?
            .multipart(form);
        let envelope: ApiEnvelope<CreatedRecord> = self.send(builder).await?;
        let message = envelope.message_or_default();
        let record = require_data(envelope, "video id")?;
        Ok((record.id, message))
    }

    /// Stream a processed video to `dest`. Relative `file` paths resolve
    /// against the API base URL. Returns the number of bytes written.
    pub async fn download(&self, file: &str, dest: &Path) -> ClientResult<u64> {
        let url = match Url::parse(file) {
            Ok(url) => url,
            Err(_) => self.url(file)?,
        };

        let response = self.request(Method::GET, url).await?.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::api(status.as_u16(), "Failed to fetch video"));
        }

        let mut out = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            out.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        out.flush().await?;

        tracing::info!(dest = %dest.display(), bytes = written, "download complete");
        Ok(written)
    }

    pub async fn profile(&self) -> ClientResult<User> {
        let envelope: ApiEnvelope<User> = self.get_all("/api/v1/profile").await?;
        require_data(envelope, "profile")
    }
}

#[async_trait]
impl PermissionSource for ApiClient {
    async fn role_permissions(&self, role_id: &str) -> ClientResult<Vec<RolePermission>> {
        ApiClient::role_permissions(self, role_id).await
    }
}

#[async_trait]
impl JobSource for ApiClient {
    async fn fetch_job(&self, id: &Id) -> ClientResult<Option<EnhanceJob>> {
        self.enhance_job(id).await
    }

    async fn fetch_active_jobs(&self) -> ClientResult<Vec<EnhanceJob>> {
        self.active_jobs().await
    }
}
