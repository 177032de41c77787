use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{
    Backup, CatalogApi, RestoreMode, DirPatch, DirRef, FsListing, ItemPatch, ManualDir, ManualItem,
};
use crate::error::{ApiError, ApiResult};

/// REST client for a running library server.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct RootResponse {
    root: String,
}

#[derive(Deserialize)]
struct BackupsResponse {
    #[serde(default)]
    items: Vec<Backup>,
}

#[derive(Serialize)]
struct CatalogIdBody<'a> {
    id: &'a str,
}

#[derive(Serialize)]
struct RunBackupBody {
    include_config: bool,
}

#[derive(Serialize)]
struct RestoreBody<'a> {
    name: &'a str,
    include_db: bool,
    include_config: bool,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> ApiResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        tracing::trace!(%method, %url, "backend request");
        self.client
            .request(method, url)
            .header(reqwest::header::ACCEPT, "application/json")
    }

    /// Turn a non-success response into its body text, untouched.
    async fn check(resp: Response) -> ApiResult<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await?;
        Err(ApiError::backend(status.as_u16(), body))
    }

    async fn get_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ApiResult<T> {
        let resp = Self::check(builder.send().await?).await?;
        resp.json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn send(&self, builder: RequestBuilder) -> ApiResult<()> {
        Self::check(builder.send().await?).await?;
        Ok(())
    }

    fn dir_url(id: &str) -> String {
        format!("/api/v1/manual/dirs/{}", urlencoding::encode(id))
    }

    fn item_url(id: &str) -> String {
        format!("/api/v1/manual/items/{}", urlencoding::encode(id))
    }
}

#[async_trait]
impl CatalogApi for HttpBackend {
    async fn discovered_auto_root(&self) -> ApiResult<String> {
        let resp: RootResponse = self
            .get_json(self.request(Method::GET, "/api/v1/library/auto/root"))
            .await?;
        Ok(resp.root)
    }

    async fn list_path(&self, path: &str) -> ApiResult<FsListing> {
        self.get_json(
            self.request(Method::GET, "/api/v1/library/auto/list")
                .query(&[("path", path)]),
        )
        .await
    }

    async fn directory_children(&self, parent_id: &str) -> ApiResult<Vec<ManualDir>> {
        let dirs: Option<Vec<ManualDir>> = self
            .get_json(
                self.request(Method::GET, "/api/v1/manual/dirs")
                    .query(&[("parent_id", parent_id)]),
            )
            .await?;
        Ok(dirs.unwrap_or_default())
    }

    async fn directory_items(&self, dir_id: &str) -> ApiResult<Vec<ManualItem>> {
        let items: Option<Vec<ManualItem>> = self
            .get_json(
                self.request(Method::GET, "/api/v1/manual/items")
                    .query(&[("dir_id", dir_id)]),
            )
            .await?;
        Ok(items.unwrap_or_default())
    }

    async fn directory_ancestors(&self, dir_id: &str) -> ApiResult<Vec<DirRef>> {
        let chain: Option<Vec<DirRef>> = self
            .get_json(
                self.request(Method::GET, "/api/v1/manual/path")
                    .query(&[("dir_id", dir_id)]),
            )
            .await?;
        Ok(chain.unwrap_or_default())
    }

    async fn update_directory(&self, id: &str, patch: DirPatch) -> ApiResult<()> {
        self.send(self.request(Method::PUT, &Self::dir_url(id)).json(&patch))
            .await
    }

    async fn update_item(&self, id: &str, patch: ItemPatch) -> ApiResult<()> {
        self.send(self.request(Method::PUT, &Self::item_url(id)).json(&patch))
            .await
    }

    async fn delete_directory(&self, id: &str) -> ApiResult<()> {
        self.send(self.request(Method::DELETE, &Self::dir_url(id)))
            .await
    }

    async fn delete_item(&self, id: &str) -> ApiResult<()> {
        self.send(self.request(Method::DELETE, &Self::item_url(id)))
            .await
    }

    async fn catalog_delete(&self, catalog_id: &str) -> ApiResult<()> {
        self.send(
            self.request(Method::POST, "/api/v1/catalog/imports/delete")
                .json(&CatalogIdBody { id: catalog_id }),
        )
        .await
    }

    async fn catalog_delete_full(&self, catalog_id: &str) -> ApiResult<()> {
        self.send(
            self.request(Method::POST, "/api/v1/catalog/imports/delete_full")
                .json(&CatalogIdBody { id: catalog_id }),
        )
        .await
    }

    async fn upload_panels(&self) -> ApiResult<serde_json::Value> {
        self.get_json(self.request(Method::GET, "/api/v1/upload/status"))
            .await
    }

    async fn settings(&self) -> ApiResult<serde_json::Value> {
        self.get_json(self.request(Method::GET, "/api/v1/settings"))
            .await
    }

    async fn log_jobs(&self) -> ApiResult<serde_json::Value> {
        self.get_json(self.request(Method::GET, "/api/v1/jobs"))
            .await
    }

    async fn backups(&self) -> ApiResult<Vec<Backup>> {
        let resp: BackupsResponse = self
            .get_json(self.request(Method::GET, "/api/v1/backups"))
            .await?;
        Ok(resp.items)
    }

    async fn run_backup(&self) -> ApiResult<()> {
        self.send(
            self.request(Method::POST, "/api/v1/backups/run")
                .json(&RunBackupBody {
                    include_config: true,
                }),
        )
        .await
    }

    async fn restore_backup(&self, name: &str, mode: RestoreMode) -> ApiResult<()> {
        self.send(
            self.request(Method::POST, "/api/v1/backups/restore")
                .json(&RestoreBody {
                    name,
                    include_db: mode.include_db(),
                    include_config: mode.include_config(),
                }),
        )
        .await
    }

    async fn reset_database(&self) -> ApiResult<()> {
        self.send(
            self.request(Method::POST, "/api/v1/db/reset")
                .json(&serde_json::json!({})),
        )
        .await
    }

    async fn restart(&self) -> ApiResult<()> {
        self.send(
            self.request(Method::POST, "/api/v1/restart")
                .json(&serde_json::json!({})),
        )
        .await
    }
}
