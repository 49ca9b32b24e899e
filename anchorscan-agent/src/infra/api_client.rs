use anchorscan_config::ApiConfig;
use anchorscan_core::ports::AnchorApi;
use anchorscan_core::{AnchorError, Result};
use anchorscan_model::{
    AnchorId, RelationshipUpdate, ScanDataEntry, ScanJob, TagRecord,
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

const JOBS_PATH: &str = "scan-by-anchor/";
const ROSTER_PATH: &str = "get-tags-by-event/";
const SCAN_DATA_PATH: &str = "scan_data";
const RELATIONSHIP_PATH: &str = "jet-rel/230";

/// Job backend client over HTTPS with bearer authentication.
#[derive(Clone)]
pub struct HttpAnchorApi {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl std::fmt::Debug for HttpAnchorApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpAnchorApi")
            .field("base_url", &self.base_url.as_str())
            .field("has_token", &self.token.is_some())
            .finish()
    }
}

impl HttpAnchorApi {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| {
                AnchorError::InvalidConfig(format!(
                    "failed to build HTTP client: {err}"
                ))
            })?;
        Ok(Self::with_client(
            client,
            config.base_url.clone(),
            config.token.clone(),
        ))
    }

    /// Uses a caller-supplied client. The base URL gains a trailing slash
    /// so relative endpoint paths append instead of replacing the last
    /// segment.
    pub fn with_client(client: Client, mut base_url: Url, token: Option<String>) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            client,
            base_url,
            token,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|err| {
                AnchorError::InvalidConfig(format!("bad endpoint path {path}: {err}"))
            })
    }

    fn endpoint_with_query(&self, path: &str, key: &str, value: &str) -> Result<Url> {
        let mut url = self.endpoint(path)?;
        url.query_pairs_mut().append_pair(key, value);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|err| AnchorError::Network(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(AnchorError::Unauthorized(body))
            }
            _ => Err(AnchorError::Http {
                status: status.as_u16(),
                body,
            }),
        }
    }

    async fn get_list<T: DeserializeOwned>(&self, url: Url) -> Result<Vec<T>> {
        debug!(url = %url, "GET");
        let response = self.send(self.client.get(url)).await?;
        let body = response
            .bytes()
            .await
            .map_err(|err| AnchorError::Network(err.to_string()))?;
        decode_list(&body)
    }

    async fn post_json<B: Serialize + ?Sized>(&self, url: Url, body: &B) -> Result<String> {
        debug!(url = %url, "POST");
        let response = self.send(self.client.post(url).json(body)).await?;
        response
            .text()
            .await
            .map_err(|err| AnchorError::Network(err.to_string()))
    }
}

/// Accepts a JSON array, a single object, or `null`/empty for "nothing".
fn decode_list<T: DeserializeOwned>(body: &[u8]) -> Result<Vec<T>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    match serde_json::from_slice::<Value>(body)? {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| match serde_json::from_value(item) {
                Ok(parsed) => Some(parsed),
                Err(err) => {
                    warn!(error = %err, "skipping malformed list entry");
                    None
                }
            })
            .collect()),
        object @ Value::Object(_) => Ok(vec![serde_json::from_value(object)?]),
        other => Err(AnchorError::Decode(serde::de::Error::custom(format!(
            "expected a list, got {other}"
        )))),
    }
}

#[async_trait]
impl AnchorApi for HttpAnchorApi {
    async fn poll_jobs(&self, anchor_id: &AnchorId) -> Result<Vec<ScanJob>> {
        let url = self.endpoint_with_query(JOBS_PATH, "anchor_id", anchor_id.as_str())?;
        self.get_list(url).await
    }

    async fn fetch_roster(&self, event_id: &str) -> Result<Vec<TagRecord>> {
        let url = self.endpoint_with_query(ROSTER_PATH, "event_id", event_id)?;
        self.get_list(url).await
    }

    async fn upload_scan_data(&self, entries: &[ScanDataEntry]) -> Result<String> {
        let url = self.endpoint(SCAN_DATA_PATH)?;
        self.post_json(url, entries).await
    }

    async fn update_relationship(&self, update: &RelationshipUpdate) -> Result<String> {
        let url = self.endpoint(RELATIONSHIP_PATH)?;
        self.post_json(url, update).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(base: &str) -> HttpAnchorApi {
        HttpAnchorApi::with_client(Client::new(), Url::parse(base).unwrap(), None)
    }

    #[test]
    fn endpoints_append_to_base_path() {
        let api = api("https://example.com/api/v2");
        assert_eq!(
            api.endpoint(SCAN_DATA_PATH).unwrap().as_str(),
            "https://example.com/api/v2/scan_data"
        );
        assert_eq!(
            api.endpoint_with_query(JOBS_PATH, "anchor_id", "abc123def456")
                .unwrap()
                .as_str(),
            "https://example.com/api/v2/scan-by-anchor/?anchor_id=abc123def456"
        );
        assert_eq!(
            api.endpoint("/jet-rel/230").unwrap().as_str(),
            "https://example.com/api/v2/jet-rel/230"
        );
    }

    #[test]
    fn list_bodies_are_decoded_leniently() {
        let empty: Vec<TagRecord> = decode_list(b"").unwrap();
        assert!(empty.is_empty());
        let null: Vec<TagRecord> = decode_list(b"null").unwrap();
        assert!(null.is_empty());

        let single: Vec<TagRecord> =
            decode_list(br#"{"tag_id":"T1","tag_uuid":"u","tag_db_id":7}"#).unwrap();
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].db_id, "7");

        let mixed: Vec<TagRecord> = decode_list(
            br#"[{"tag_id":"T1","tag_uuid":"u","tag_db_id":"1"},{"nope":true}]"#,
        )
        .unwrap();
        assert_eq!(mixed.len(), 1);

        assert!(decode_list::<TagRecord>(b"42").is_err());
    }
}
