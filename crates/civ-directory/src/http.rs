//! HTTP client for the directory service.
//!
//! Mirrors the routes served by [`crate::service`]. The watch endpoint
//! returns newline-delimited JSON; [`HttpDirectory::watch`] hands the body
//! to a producer task that splits it into lines, decodes each line into a
//! [`StateSnapshot`] and forwards it over a bounded channel. The producer
//! stops when the body ends or when the returned stream is dropped.

use std::collections::BTreeMap;

use async_trait::async_trait;
use civ_types::{LabelSelector, StateSnapshot};
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::directory::{Directory, LogAppender, RecordSpec, WatchStream};
use crate::error::DirectoryError;

/// Buffered watch events between the producer task and the consumer.
const WATCH_BUFFER: usize = 256;

/// Directory backend that talks to a remote directory service.
#[derive(Debug, Clone)]
pub struct HttpDirectory {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDirectory {
    /// Create a client for the service at `base_url` (e.g. `http://127.0.0.1:7070`).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    /// Register (or re-register) a record with its labels and containers.
    pub async fn register(
        &self,
        scope: &str,
        name: &str,
        spec: &RecordSpec,
    ) -> Result<(), DirectoryError> {
        let response = self
            .client
            .put(self.record_url(scope, name))
            .json(spec)
            .send()
            .await?;
        check(response, scope, name).await?;
        Ok(())
    }

    /// Names of every scope known to the directory.
    pub async fn list_scopes(&self) -> Result<Vec<String>, DirectoryError> {
        let response = self
            .client
            .get(format!("{}/scopes", self.base_url))
            .send()
            .await?;
        let response = check(response, "", "").await?;
        Ok(response.json().await?)
    }

    /// Distinct values of label `key` across the records in `scope`.
    pub async fn label_values(&self, scope: &str, key: &str) -> Result<Vec<String>, DirectoryError> {
        let response = self
            .client
            .get(format!("{}/labels/{key}", self.scope_url(scope)))
            .send()
            .await?;
        let response = check(response, scope, "").await?;
        Ok(response.json().await?)
    }

    fn scope_url(&self, scope: &str) -> String {
        format!("{}/scopes/{scope}", self.base_url)
    }

    fn record_url(&self, scope: &str, name: &str) -> String {
        format!("{}/records/{name}", self.scope_url(scope))
    }
}

/// Map a non-success response to a [`DirectoryError`].
async fn check(
    response: reqwest::Response,
    scope: &str,
    name: &str,
) -> Result<reqwest::Response, DirectoryError> {
    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(DirectoryError::NotFound {
            scope: scope.to_owned(),
            name: name.to_owned(),
        });
    }
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "unable to read error body".to_owned());
        return Err(DirectoryError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

fn label_query(selector: Option<&LabelSelector>) -> Vec<(&'static str, String)> {
    selector
        .map(|s| vec![("label", s.to_string())])
        .unwrap_or_default()
}

#[async_trait]
impl LogAppender for HttpDirectory {
    async fn append_logs(
        &self,
        scope: &str,
        name: &str,
        text: String,
    ) -> Result<(), DirectoryError> {
        let response = self
            .client
            .post(format!("{}/logs", self.record_url(scope, name)))
            .body(text)
            .send()
            .await?;
        check(response, scope, name).await?;
        Ok(())
    }
}

#[async_trait]
impl Directory for HttpDirectory {
    async fn list_names(
        &self,
        scope: &str,
        selector: Option<&LabelSelector>,
    ) -> Result<Vec<String>, DirectoryError> {
        let response = self
            .client
            .get(format!("{}/records", self.scope_url(scope)))
            .query(&label_query(selector))
            .send()
            .await?;
        let response = check(response, scope, "").await?;
        Ok(response.json().await?)
    }

    async fn watch(
        &self,
        scope: &str,
        selector: Option<LabelSelector>,
    ) -> Result<WatchStream, DirectoryError> {
        let response = self
            .client
            .get(format!("{}/watch", self.scope_url(scope)))
            .query(&label_query(selector.as_ref()))
            .send()
            .await?;
        let response = check(response, scope, "").await?;

        let (tx, rx) = mpsc::channel(WATCH_BUFFER);
        let scope = scope.to_owned();
        tokio::spawn(async move {
            let mut body = response.bytes_stream();
            let mut pending: Vec<u8> = Vec::new();
            loop {
                let chunk = tokio::select! {
                    () = tx.closed() => break,
                    chunk = body.next() => chunk,
                };
                match chunk {
                    Some(Ok(bytes)) => {
                        pending.extend_from_slice(&bytes);
                        while let Some(end) = pending.iter().position(|b| *b == b'\n') {
                            let line: Vec<u8> = pending.drain(..=end).collect();
                            if line.iter().all(u8::is_ascii_whitespace) {
                                continue;
                            }
                            match serde_json::from_slice::<StateSnapshot>(&line) {
                                Ok(snapshot) => {
                                    if tx.send(snapshot).await.is_err() {
                                        debug!(scope = %scope, "watch receiver dropped");
                                        return;
                                    }
                                }
                                Err(e) => warn!(scope = %scope, error = %e, "undecodable watch event"),
                            }
                        }
                    }
                    Some(Err(e)) => {
                        warn!(scope = %scope, error = %e, "watch stream failed");
                        break;
                    }
                    None => break,
                }
            }
            debug!(scope = %scope, "watch stream closed");
        });

        let stream =
            futures::stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|s| (s, rx)) });
        Ok(stream.boxed())
    }

    async fn patch(
        &self,
        scope: &str,
        name: &str,
        annotations: BTreeMap<String, String>,
    ) -> Result<(), DirectoryError> {
        let response = self
            .client
            .patch(format!("{}/annotations", self.record_url(scope, name)))
            .json(&annotations)
            .send()
            .await?;
        check(response, scope, name).await?;
        Ok(())
    }

    async fn container_names(
        &self,
        scope: &str,
        name: &str,
    ) -> Result<Vec<String>, DirectoryError> {
        let response = self
            .client
            .get(format!("{}/containers", self.record_url(scope, name)))
            .send()
            .await?;
        let response = check(response, scope, name).await?;
        Ok(response.json().await?)
    }

    async fn logs(&self, scope: &str, name: &str) -> Result<String, DirectoryError> {
        let response = self
            .client
            .get(format!("{}/logs", self.record_url(scope, name)))
            .send()
            .await?;
        let response = check(response, scope, name).await?;
        Ok(response.text().await?)
    }
}
