//! `http(s)://` content adapter: a `GET` with optional headers, run on a
//! blocking task since `ureq` is a synchronous client. One `ureq::Agent` is
//! shared across both the `http` and `https` schemes.

use super::{ContentAdapter, FetchedContent};
use crate::error::{CodexError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io::Read as _;

pub struct HttpAdapter {
    agent: ureq::Agent,
    scheme: &'static str,
}

impl HttpAdapter {
    pub fn new(agent: ureq::Agent, scheme: &'static str) -> Self {
        Self { agent, scheme }
    }
}

#[async_trait]
impl ContentAdapter for HttpAdapter {
    fn scheme(&self) -> &'static str {
        self.scheme
    }

    async fn fetch(&self, uri: &str, headers: Option<&BTreeMap<String, String>>) -> Result<FetchedContent> {
        let agent = self.agent.clone();
        let uri = uri.to_string();
        let headers = headers.cloned();
        tokio::task::spawn_blocking(move || fetch_blocking(&agent, &uri, headers.as_ref()))
            .await
            .map_err(|e| CodexError::AdapterFailure(format!("http fetch task panicked: {e}")))?
    }
}

fn fetch_blocking(
    agent: &ureq::Agent,
    uri: &str,
    headers: Option<&BTreeMap<String, String>>,
) -> Result<FetchedContent> {
    let mut request = agent.get(uri);
    if let Some(headers) = headers {
        for (name, value) in headers {
            request = request.set(name, value);
        }
    }

    let response = request
        .call()
        .map_err(|e| CodexError::AdapterFailure(format!("GET {uri}: {e}")))?;

    let media_type = response
        .content_type()
        .to_string();

    let mut bytes = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut bytes)
        .map_err(|e| CodexError::AdapterFailure(format!("reading body of {uri}: {e}")))?;

    Ok(FetchedContent {
        media_type,
        bytes: Some(bytes.into()),
        json: None,
    })
}
