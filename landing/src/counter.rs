use anyhow::{anyhow, Context, Result};
use tokio::sync::mpsc;
use viewcounter::{ViewsResponse, INCREMENT_PATH, VIEWS_PATH};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CounterUpdate {
    Views(u64),
    Failed(String),
}

#[derive(Clone)]
pub(crate) struct CounterClient {
    base: String,
    http: reqwest::Client,
}

impl CounterClient {
    pub(crate) fn new(base_url: &str) -> Self {
        Self {
            base: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub(crate) async fn views(&self) -> Result<u64> {
        let resp = self
            .http
            .get(self.url(VIEWS_PATH))
            .send()
            .await
            .context("view count request failed")?;
        read_views(resp).await
    }

    pub(crate) async fn increment(&self) -> Result<u64> {
        let resp = self
            .http
            .post(self.url(INCREMENT_PATH))
            .send()
            .await
            .context("view increment request failed")?;
        read_views(resp).await
    }
}

async fn read_views(resp: reqwest::Response) -> Result<u64> {
    if !resp.status().is_success() {
        return Err(anyhow!("counter HTTP {}", resp.status()));
    }
    let body: ViewsResponse = resp.json().await.context("counter JSON parse failed")?;
    Ok(body.views)
}

/// Record this visit: bump the counter once, then re-read it. Results come
/// back over `tx`; a failure is reported once and not retried.
pub(crate) fn spawn_visit(client: CounterClient, tx: mpsc::Sender<CounterUpdate>) {
    tokio::spawn(async move {
        match client.increment().await {
            Ok(v) => {
                log::info!("visit counted, {} views", v);
                tx.send(CounterUpdate::Views(v)).await.ok();
            }
            Err(e) => {
                log::warn!("increment failed: {:#}", e);
                tx.send(CounterUpdate::Failed(format!("{e:#}"))).await.ok();
                return;
            }
        }
        match client.views().await {
            Ok(v) => {
                tx.send(CounterUpdate::Views(v)).await.ok();
            }
            Err(e) => {
                log::warn!("refetch failed: {:#}", e);
                tx.send(CounterUpdate::Failed(format!("{e:#}"))).await.ok();
            }
        }
    });
}
