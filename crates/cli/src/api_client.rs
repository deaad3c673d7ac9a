use anyhow::{Context, Result};
use reqwest::Url;

/// Thin HTTP client for the Granary file API.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url).context("invalid server URL")?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
        })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).context("failed to build API URL")
    }

    pub async fn put_file(&self, name: &str, data: Vec<u8>) -> Result<()> {
        let url = self.url(&format!("/v1/files/{name}"))?;
        let response = self.http.put(url).body(data).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("upload failed ({status}): {body}");
        }
        Ok(())
    }

    pub async fn get_file(&self, name: &str) -> Result<Vec<u8>> {
        let url = self.url(&format!("/v1/files/{name}"))?;
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("download failed ({status}): {body}");
        }
        Ok(response.bytes().await?.to_vec())
    }

    pub async fn health(&self) -> Result<()> {
        let url = self.url("/v1/health")?;
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("server unhealthy ({status})");
        }
        Ok(())
    }
}
