//! Socrata (SODA 2.x) registry implementation.
//!
//! ## Endpoints
//!
//! ```text
//! GET  https://{domain}/api/views/{dataset}.json   # column metadata
//! GET  https://{domain}/resource/{dataset}.json    # active feeds, paged
//! POST https://{domain}/resource/{dataset}.json    # upsert keyed by :id
//! ```

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::config::{SocrataParams, StartupConfig};
use crate::error::{AppError, Result};
use crate::models::{FeedRecord, RegistryConfig, fields};
use crate::registry::schema::{CoercionTable, ColumnMeta, RegistrySchema};
use crate::registry::{ActiveFeeds, FeedRegistry, UpdateAck};
use crate::utils::http;
use crate::utils::{RetryPolicy, with_retry};

/// Registry backed by a Socrata dataset.
pub struct SocrataRegistry {
    client: Client,
    params: SocrataParams,
    dataset_id: String,
    page_size: usize,
    retry: RetryPolicy,
    coercion: CoercionTable,
    base_url: Option<Url>,
}

impl SocrataRegistry {
    /// Create a registry client without schema validation.
    ///
    /// Rows are written without coercion until a table is installed with
    /// [`with_coercion`](Self::with_coercion).
    pub fn new(
        client: Client,
        params: SocrataParams,
        dataset_id: impl Into<String>,
        config: &RegistryConfig,
    ) -> Self {
        Self {
            client,
            params,
            dataset_id: dataset_id.into(),
            page_size: config.page_size.max(1),
            retry: RetryPolicy::from_registry_config(config),
            coercion: CoercionTable::default(),
            base_url: None,
        }
    }

    /// Connect to the registry and validate its schema.
    ///
    /// Fails if the dataset lacks any column the scheduler relies on.
    pub async fn connect(startup: &StartupConfig, config: &RegistryConfig) -> Result<Self> {
        let client = http::create_client(config)?;
        let registry = Self::new(client, startup.socrata.clone(), &startup.dataset_id, config);

        let columns = registry.fetch_columns().await?;
        let coercion = RegistrySchema::feed_registry().validate(&columns)?;
        log::info!(
            "Registry schema OK: {} columns at {}",
            columns.len(),
            registry.location()
        );

        Ok(registry.with_coercion(coercion))
    }

    /// Install a write coercion table.
    pub fn with_coercion(mut self, coercion: CoercionTable) -> Self {
        self.coercion = coercion;
        self
    }

    /// Send requests to `url` instead of `https://{domain}/`.
    ///
    /// `url` must end with a slash for the endpoint paths to join under it.
    pub fn with_base_url(mut self, url: Url) -> Self {
        self.base_url = Some(url);
        self
    }

    fn base_url(&self) -> Result<Url> {
        match &self.base_url {
            Some(url) => Ok(url.clone()),
            None => Ok(Url::parse(&format!("https://{}/", self.params.domain))?),
        }
    }

    /// Row endpoint of the dataset.
    pub fn resource_url(&self) -> Result<Url> {
        Ok(self
            .base_url()?
            .join(&format!("resource/{}.json", self.dataset_id))?)
    }

    /// Metadata endpoint of the dataset.
    pub fn metadata_url(&self) -> Result<Url> {
        Ok(self
            .base_url()?
            .join(&format!("api/views/{}.json", self.dataset_id))?)
    }

    /// Query URL for one page of active feeds, system fields included.
    pub fn page_url(&self, offset: usize) -> Result<Url> {
        let mut url = self.resource_url()?;
        url.query_pairs_mut()
            .append_pair("$where", &format!("{} = true", fields::ACTIVE))
            .append_pair("$$exclude_system_fields", "false")
            .append_pair("$order", fields::ROW_ID)
            .append_pair("$limit", &self.page_size.to_string())
            .append_pair("$offset", &offset.to_string());
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.basic_auth(&self.params.username, Some(&self.params.password));
        match &self.params.app_token {
            Some(token) => request.header("X-App-Token", token),
            None => request,
        }
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        permanent: fn(String) -> AppError,
    ) -> Result<T> {
        let response = request
            .send()
            .await
            .map_err(|e| http::classify_transport_error(e, permanent))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| http::classify_transport_error(e, permanent))?;

        if !status.is_success() {
            return Err(http::classify_status(status, &body, permanent));
        }

        serde_json::from_str(&body).map_err(|e| permanent(format!("unexpected response body: {e}")))
    }

    /// Fetch the dataset's column metadata.
    pub async fn fetch_columns(&self) -> Result<Vec<ColumnMeta>> {
        let url = self.metadata_url()?;
        let metadata: DatasetMetadata = with_retry(self.retry, "registry metadata", || {
            self.send_json(
                self.authorize(self.client.get(url.clone())),
                AppError::RegistryQuery,
            )
        })
        .await?;
        Ok(metadata.columns)
    }

    async fn fetch_page(&self, offset: usize) -> Result<Vec<Value>> {
        let url = self.page_url(offset)?;
        with_retry(self.retry, "registry query", || {
            self.send_json(
                self.authorize(self.client.get(url.clone())),
                AppError::RegistryQuery,
            )
        })
        .await
    }
}

#[async_trait]
impl FeedRegistry for SocrataRegistry {
    async fn list_active(&self) -> Result<ActiveFeeds> {
        let mut snapshot = ActiveFeeds::default();
        let mut offset = 0;

        loop {
            let rows = self.fetch_page(offset).await?;
            let count = rows.len();
            log::debug!("Registry page at offset {}: {} rows", offset, count);

            for row in rows {
                snapshot.push_row(row);
            }

            if count < self.page_size {
                break;
            }
            offset += count;
        }

        Ok(snapshot)
    }

    async fn update(&self, feed: &FeedRecord) -> Result<UpdateAck> {
        if feed.row_id.is_none() {
            return Err(AppError::RegistryWrite(format!(
                "feed {} has no {} and cannot be updated in place",
                feed.name(),
                fields::ROW_ID
            )));
        }

        let row = self
            .coercion
            .coerce(feed.to_row()?)
            .map_err(|e| AppError::RegistryWrite(e.to_string()))?;
        let body = vec![Value::Object(row)];
        let url = self.resource_url()?;

        let response: UpsertResponse = with_retry(self.retry, "registry update", || {
            self.send_json(
                self.authorize(self.client.post(url.clone()).json(&body)),
                AppError::RegistryWrite,
            )
        })
        .await?;

        response.into_ack(feed.name())
    }

    fn location(&self) -> String {
        format!("https://{}/d/{}", self.params.domain, self.dataset_id)
    }
}

/// Subset of `/api/views/{id}.json`.
#[derive(Debug, Deserialize)]
struct DatasetMetadata {
    #[serde(default)]
    columns: Vec<ColumnMeta>,
}

/// Body returned by a SODA upsert.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpsertResponse {
    #[serde(rename = "Rows Updated", default)]
    pub rows_updated: u64,
    #[serde(rename = "Rows Created", default)]
    pub rows_created: u64,
    #[serde(rename = "Rows Deleted", default)]
    pub rows_deleted: u64,
    #[serde(rename = "Errors", default)]
    pub errors: u64,
}

impl UpsertResponse {
    /// Check that exactly an in-place update happened.
    pub fn into_ack(self, feed_name: &str) -> Result<UpdateAck> {
        if self.errors > 0 {
            return Err(AppError::RegistryWrite(format!(
                "upsert for {} reported {} error(s)",
                feed_name, self.errors
            )));
        }
        if self.rows_created > 0 || self.rows_deleted > 0 {
            return Err(AppError::RegistryWrite(format!(
                "upsert for {} created {} and deleted {} row(s) instead of updating",
                feed_name, self.rows_created, self.rows_deleted
            )));
        }
        if self.rows_updated == 0 {
            log::warn!("Upsert for {} reported no updated rows", feed_name);
        }
        Ok(UpdateAck {
            rows_updated: self.rows_updated,
            rows_created: self.rows_created,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::parse_timestamp;
    use mockito::{Matcher, Server, ServerGuard};
    use serde_json::json;
    use std::collections::HashMap;

    fn registry(page_size: usize) -> SocrataRegistry {
        let config = RegistryConfig {
            page_size,
            ..RegistryConfig::default()
        };
        let params = SocrataParams {
            domain: "data.example.gov".to_string(),
            username: "bot".to_string(),
            password: "secret".to_string(),
            app_token: None,
        };
        SocrataRegistry::new(Client::new(), params, "abcd-1234", &config)
    }

    #[test]
    fn test_urls() {
        let registry = registry(1000);
        assert_eq!(
            registry.resource_url().unwrap().as_str(),
            "https://data.example.gov/resource/abcd-1234.json"
        );
        assert_eq!(
            registry.metadata_url().unwrap().as_str(),
            "https://data.example.gov/api/views/abcd-1234.json"
        );
        assert_eq!(registry.location(), "https://data.example.gov/d/abcd-1234");
    }

    #[test]
    fn test_page_url_query() {
        let url = registry(50).page_url(100).unwrap();
        let query: HashMap<String, String> = url.query_pairs().into_owned().collect();

        assert_eq!(query["$where"], "active = true");
        assert_eq!(query["$$exclude_system_fields"], "false");
        assert_eq!(query["$order"], ":id");
        assert_eq!(query["$limit"], "50");
        assert_eq!(query["$offset"], "100");
    }

    #[test]
    fn test_upsert_response_parsing() {
        let response: UpsertResponse = serde_json::from_str(
            r#"{"By RowIdentifier": 0, "Rows Updated": 1, "Rows Deleted": 0, "Rows Created": 0, "Errors": 0, "By SID": 1}"#,
        )
        .unwrap();
        let ack = response.into_ack("mdot").unwrap();
        assert_eq!(ack.rows_updated, 1);
    }

    #[test]
    fn test_upsert_errors_and_creations_fail() {
        let errored = UpsertResponse {
            errors: 1,
            ..UpsertResponse::default()
        };
        assert!(matches!(
            errored.into_ack("x"),
            Err(AppError::RegistryWrite(_))
        ));

        let created = UpsertResponse {
            rows_created: 1,
            ..UpsertResponse::default()
        };
        assert!(matches!(
            created.into_ack("x"),
            Err(AppError::RegistryWrite(_))
        ));
    }

    const AUTH: &str = "Basic Ym90OnNlY3JldA==";

    fn registry_at(server: &ServerGuard, page_size: usize) -> SocrataRegistry {
        let config = RegistryConfig {
            page_size,
            max_retries: 2,
            retry_delay_ms: 0,
            ..RegistryConfig::default()
        };
        let params = SocrataParams {
            domain: "data.example.gov".to_string(),
            username: "bot".to_string(),
            password: "secret".to_string(),
            app_token: Some("xyzzy".to_string()),
        };
        let base = Url::parse(&format!("{}/", server.url())).unwrap();
        SocrataRegistry::new(Client::new(), params, "abcd-1234", &config).with_base_url(base)
    }

    fn page_query(offset: &str) -> Matcher {
        Matcher::AllOf(vec![
            Matcher::UrlEncoded("$where".into(), "active = true".into()),
            Matcher::UrlEncoded("$$exclude_system_fields".into(), "false".into()),
            Matcher::UrlEncoded("$order".into(), ":id".into()),
            Matcher::UrlEncoded("$limit".into(), "2".into()),
            Matcher::UrlEncoded("$offset".into(), offset.into()),
        ])
    }

    fn row(id: &str, name: &str) -> Value {
        json!({
            ":id": id,
            "feedname": name,
            "active": true,
            "datafeed_frequency_update": "1h",
        })
    }

    #[tokio::test]
    async fn test_list_active_pages_until_short_page() {
        let mut server = Server::new_async().await;
        let first = server
            .mock("GET", "/resource/abcd-1234.json")
            .match_query(page_query("0"))
            .match_header("authorization", AUTH)
            .match_header("x-app-token", "xyzzy")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!([row("row-1", "a"), row("row-2", "b")]).to_string())
            .expect(1)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/resource/abcd-1234.json")
            .match_query(page_query("2"))
            .match_header("authorization", AUTH)
            .with_status(200)
            .with_body(json!([row("row-3", "c")]).to_string())
            .expect(1)
            .create_async()
            .await;

        let snapshot = registry_at(&server, 2).list_active().await.unwrap();

        first.assert_async().await;
        second.assert_async().await;
        let names: Vec<&str> = snapshot.feeds.iter().map(FeedRecord::name).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert!(snapshot.unreadable.is_empty());
    }

    #[tokio::test]
    async fn test_list_active_sets_aside_unreadable_rows() {
        let mut server = Server::new_async().await;
        let mut broken = row("row-2", "odot");
        broken["active"] = json!("maybe");
        let _page = server
            .mock("GET", "/resource/abcd-1234.json")
            .match_query(page_query("0"))
            .with_status(200)
            .with_body(json!([row("row-1", "mdot"), broken]).to_string())
            .create_async()
            .await;
        let _empty = server
            .mock("GET", "/resource/abcd-1234.json")
            .match_query(page_query("2"))
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let snapshot = registry_at(&server, 2).list_active().await.unwrap();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.feeds[0].name(), "mdot");
        assert_eq!(snapshot.unreadable[0].row_id.as_deref(), Some("row-2"));
        assert!(snapshot.unreadable[0].message.contains("maybe"));
    }

    #[tokio::test]
    async fn test_unavailable_registry_is_retried_then_reported() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/resource/abcd-1234.json")
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body("busy")
            .expect(3)
            .create_async()
            .await;

        let err = registry_at(&server, 2).list_active().await.unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, AppError::RegistryUnavailable(_)));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_rejected_query_is_not_retried() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/resource/abcd-1234.json")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"message": "no such column: active"}"#)
            .expect(1)
            .create_async()
            .await;

        let err = registry_at(&server, 2).list_active().await.unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, AppError::RegistryQuery(_)));
    }

    #[tokio::test]
    async fn test_update_posts_one_row_keyed_by_id() {
        let mut server = Server::new_async().await;
        let mut feed = FeedRecord::from_row(json!({
            ":id": "row-1",
            ":created_at": "2021-01-01T00:00:00.000Z",
            "feedname": "mdot",
            "active": true,
            "datafeed_frequency_update": "1h",
            "lastingestedtosandbox": "2021-03-04T12:00:00.000",
            "url": "https://example.com/mdot",
        }))
        .unwrap();
        feed.mark_ingested(parse_timestamp("2021-03-04T13:01:00.000").unwrap());

        let mock = server
            .mock("POST", "/resource/abcd-1234.json")
            .match_header("authorization", AUTH)
            .match_header("x-app-token", "xyzzy")
            .match_body(Matcher::Json(json!([{
                ":id": "row-1",
                "feedname": "mdot",
                "active": true,
                "datafeed_frequency_update": "1h",
                "lastingestedtosandbox": "2021-03-04T13:01:00.000",
                "url": "https://example.com/mdot",
            }])))
            .with_status(200)
            .with_body(r#"{"Rows Updated": 1, "Rows Created": 0, "Rows Deleted": 0, "Errors": 0}"#)
            .expect(1)
            .create_async()
            .await;

        let ack = registry_at(&server, 2).update(&feed).await.unwrap();

        mock.assert_async().await;
        assert_eq!(ack.rows_updated, 1);
        assert_eq!(ack.rows_created, 0);
    }

    #[tokio::test]
    async fn test_update_that_creates_a_row_fails() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/resource/abcd-1234.json")
            .with_status(200)
            .with_body(r#"{"Rows Updated": 0, "Rows Created": 1, "Rows Deleted": 0, "Errors": 0}"#)
            .create_async()
            .await;

        let feed = FeedRecord::from_row(row("row-9", "ghost")).unwrap();
        let err = registry_at(&server, 2).update(&feed).await.unwrap_err();

        assert!(matches!(err, AppError::RegistryWrite(_)));
        assert!(err.to_string().contains("ghost"));
    }

    #[tokio::test]
    async fn test_fetch_columns_feeds_schema_validation() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/views/abcd-1234.json")
            .match_header("authorization", AUTH)
            .with_status(200)
            .with_body(
                json!({
                    "id": "abcd-1234",
                    "columns": [
                        {"fieldName": "feedname", "dataTypeName": "text"},
                        {"fieldName": "active", "dataTypeName": "checkbox"},
                        {"fieldName": "datafeed_frequency_update", "dataTypeName": "text"},
                        {"fieldName": "lastingestedtosandbox", "dataTypeName": "calendar_date"},
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let columns = registry_at(&server, 2).fetch_columns().await.unwrap();

        assert_eq!(columns.len(), 4);
        assert!(RegistrySchema::feed_registry().validate(&columns).is_ok());
    }

    #[tokio::test]
    async fn test_update_without_row_id_is_refused() {
        let feed = FeedRecord::new("orphan", "1h");
        let err = registry(10).update(&feed).await.unwrap_err();
        assert!(matches!(err, AppError::RegistryWrite(_)));
        assert!(err.to_string().contains("orphan"));
    }
}
