//! Firebase Realtime Database backend over the REST API.
//!
//! Pushes are `POST {path}.json` and answer with the generated child key.
//! Counters use the `{".sv": {"increment": n}}` server value, which the
//! database applies atomically and which treats a missing node as zero.

use super::{RemoteStore, StoreError, StoreResult};
use crate::config::FirebaseCredential;
use futures::future::BoxFuture;
use reqwest::{Client, Response, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

const LOCAL_HOSTS: &[&str] = &["localhost", "127.0.0.1", "[::1]"];

#[derive(Debug, Deserialize)]
struct PushResponse {
    name: String,
}

pub struct FirebaseStore {
    client: Client,
    base_url: Url,
    credential: FirebaseCredential,
}

impl FirebaseStore {
    pub fn new(database_url: &str, credential: FirebaseCredential) -> StoreResult<Self> {
        let base_url = Url::parse(database_url.trim_end_matches('/')).map_err(|e| {
            StoreError::Config(format!(
                "Invalid FIREBASE_DATABASE_URL '{}': {}",
                database_url, e
            ))
        })?;

        match base_url.scheme() {
            "https" => {}
            // Emulator only.
            "http" if base_url.host_str().is_some_and(|h| LOCAL_HOSTS.contains(&h)) => {}
            scheme => {
                return Err(StoreError::Config(format!(
                    "FIREBASE_DATABASE_URL must use https, got '{}'",
                    scheme
                )))
            }
        }

        Ok(Self {
            client: Client::new(),
            base_url,
            credential,
        })
    }

    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        let base_path = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{}/{}.json", base_path, path.trim_matches('/')));

        let mut query = url.query_pairs_mut();
        match &self.credential {
            FirebaseCredential::DatabaseSecret(secret) => query.append_pair("auth", secret),
            FirebaseCredential::AccessToken(token) => query.append_pair("access_token", token),
        };
        drop(query);

        url
    }

    async fn read_body(response: Response) -> StoreResult<String> {
        let status = response.status();
        let body = response.text().await.map_err(|e| e.without_url())?;
        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    async fn send_push(&self, collection: &str, value: &Value) -> StoreResult<String> {
        let response = self
            .client
            .post(self.endpoint(collection))
            .json(value)
            .send()
            .await
            // The URL carries the credential.
            .map_err(|e| e.without_url())?;

        let body = Self::read_body(response).await?;
        let pushed: PushResponse = serde_json::from_str(&body)
            .map_err(|e| StoreError::Decode(format!("push response '{}': {}", body, e)))?;

        debug!(collection = %collection, key = %pushed.name, "Pushed record");
        Ok(pushed.name)
    }

    async fn send_increment(&self, path: &str) -> StoreResult<i64> {
        let response = self
            .client
            .put(self.endpoint(path))
            .json(&json!({ ".sv": { "increment": 1 } }))
            .send()
            .await
            .map_err(|e| e.without_url())?;

        let body = Self::read_body(response).await?;
        let value: i64 = serde_json::from_str(body.trim())
            .map_err(|e| StoreError::Decode(format!("increment response '{}': {}", body, e)))?;

        debug!(path = %path, value, "Incremented counter");
        Ok(value)
    }
}

impl RemoteStore for FirebaseStore {
    fn backend(&self) -> &'static str {
        "firebase"
    }

    fn push<'a>(&'a self, collection: &'a str, value: &'a Value) -> BoxFuture<'a, StoreResult<String>> {
        Box::pin(self.send_push(collection, value))
    }

    fn increment<'a>(&'a self, path: &'a str) -> BoxFuture<'a, StoreResult<i64>> {
        Box::pin(self.send_increment(path))
    }
}
