use std::time::Duration;

use async_trait::async_trait;
use segmerge_core::error::StorageError;
use segmerge_core::storage::MergeStorage;
use segmerge_proto::EquivalenceSnapshot;
use tokio::task;
use tracing::debug;

use crate::error::HttpStoreError;

const MAIN_TO_OTHERS_KEY: &str = "main_to_others";
const OTHER_TO_MAIN_KEY: &str = "other_to_main";
const ORDERING_KEY: &str = "merge_ordering";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Remote key-value backend. Each logical key is addressed as
/// `{base_url}/{key}`; GET reads a key (404 means never written), POST
/// replaces it. Writes go out key by key and abort on the first failure.
///
/// The agent is blocking, so every request runs on the tokio blocking pool.
#[derive(Clone)]
pub struct HttpMergeStore {
    agent: ureq::Agent,
    base_url: String,
    token: Option<String>,
}

impl HttpMergeStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
        Self { agent, base_url: base_url.into().trim_end_matches('/').to_owned(), token: None }
    }

    /// Attach an opaque bearer token to every request. Acquiring the token is
    /// the host application's business.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn key_url(&self, key: &str) -> String { format!("{}/{}", self.base_url, key) }

    fn authorize(&self, request: ureq::Request) -> ureq::Request {
        match &self.token {
            Some(token) => request.set("Authorization", &format!("Bearer {token}")),
            None => request,
        }
    }

    fn get_key_blocking(&self, key: &str) -> Result<Option<String>, HttpStoreError> {
        let url = self.key_url(key);
        let request = self.authorize(self.agent.get(&url));
        match request.call() {
            Ok(response) => {
                let body = response.into_string().map_err(|e| HttpStoreError::Transport(e.to_string()))?;
                Ok(Some(body))
            }
            Err(ureq::Error::Status(404, _)) => Ok(None),
            Err(ureq::Error::Status(status, _)) => Err(HttpStoreError::Status { status, url }),
            Err(e) => Err(HttpStoreError::Transport(e.to_string())),
        }
    }

    fn post_key_blocking(&self, key: &str, body: &str) -> Result<(), HttpStoreError> {
        let url = self.key_url(key);
        let request = self.authorize(self.agent.post(&url)).set("Content-Type", "application/json");
        match request.send_string(body) {
            Ok(_) => Ok(()),
            Err(ureq::Error::Status(status, _)) => Err(HttpStoreError::Status { status, url }),
            Err(e) => Err(HttpStoreError::Transport(e.to_string())),
        }
    }

    fn store_blocking(&self, snapshot: EquivalenceSnapshot) -> Result<(), HttpStoreError> {
        let (main_to_others, other_to_main, ordering) = encode_components(&snapshot)?;
        self.post_key_blocking(MAIN_TO_OTHERS_KEY, &main_to_others)?;
        self.post_key_blocking(OTHER_TO_MAIN_KEY, &other_to_main)?;
        self.post_key_blocking(ORDERING_KEY, &ordering)?;
        debug!(groups = snapshot.main_to_others.len(), "stored merge state to {}", self.base_url);
        Ok(())
    }

    fn restore_blocking(&self) -> Result<EquivalenceSnapshot, HttpStoreError> {
        let main_to_others = self.get_key_blocking(MAIN_TO_OTHERS_KEY)?;
        let other_to_main = self.get_key_blocking(OTHER_TO_MAIN_KEY)?;
        let ordering = self.get_key_blocking(ORDERING_KEY)?;
        Ok(decode_components(main_to_others.as_deref(), other_to_main.as_deref(), ordering.as_deref())?)
    }
}

#[async_trait]
impl MergeStorage for HttpMergeStore {
    async fn store(&self, snapshot: &EquivalenceSnapshot) -> Result<(), StorageError> {
        let me = self.clone();
        let snapshot = snapshot.clone();
        task::spawn_blocking(move || me.store_blocking(snapshot)).await.map_err(HttpStoreError::Join)??;
        Ok(())
    }

    async fn restore(&self) -> Result<EquivalenceSnapshot, StorageError> {
        let me = self.clone();
        let snapshot = task::spawn_blocking(move || me.restore_blocking()).await.map_err(HttpStoreError::Join)??;
        Ok(snapshot)
    }
}

fn encode_components(snapshot: &EquivalenceSnapshot) -> Result<(String, String, String), serde_json::Error> {
    Ok((
        serde_json::to_string(&snapshot.main_to_others)?,
        serde_json::to_string(&snapshot.other_to_main)?,
        serde_json::to_string(&snapshot.ordering)?,
    ))
}

/// A key the backend never saw decodes as its empty form.
fn decode_components(
    main_to_others: Option<&str>,
    other_to_main: Option<&str>,
    ordering: Option<&str>,
) -> Result<EquivalenceSnapshot, serde_json::Error> {
    Ok(EquivalenceSnapshot {
        main_to_others: main_to_others.map(serde_json::from_str).transpose()?.unwrap_or_default(),
        other_to_main: other_to_main.map(serde_json::from_str).transpose()?.unwrap_or_default(),
        ordering: ordering.map(serde_json::from_str).transpose()?.unwrap_or_default(),
    })
}
