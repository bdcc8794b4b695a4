//! Backend stream API client

use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::header::AUTHORIZATION;

use crate::config::ShareConfig;
use crate::error::{Error, Result};

/// Creates and deletes backend relay streams
///
/// Implementations do their bookkeeping synchronously and return the
/// network part as a future; callers are free to never await it.
pub trait StreamBackend: Send + Sync + 'static {
    /// Ask the backend to relay `source` under `name`
    fn add_stream(&self, source: &str, name: &str) -> BoxFuture<'static, Result<()>>;

    /// Ask the backend to tear down `name`
    fn remove_stream(&self, name: &str) -> BoxFuture<'static, Result<()>>;
}

/// HTTP implementation of the stream API
///
/// `PUT {api}/streams?src=&name=` and `DELETE {api}/streams?src=`.
/// Response status codes are logged but never treated as failures.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    config: ShareConfig,
}

impl HttpBackend {
    pub fn new(config: ShareConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: ShareConfig) -> Self {
        Self { client, config }
    }
}

impl StreamBackend for HttpBackend {
    fn add_stream(&self, source: &str, name: &str) -> BoxFuture<'static, Result<()>> {
        let url = self.config.streams_url(&[("src", source), ("name", name)]);
        let authorization = self.config.authorization();
        let client = self.client.clone();

        async move {
            let mut request = client.put(url?);
            if let Some(auth) = authorization {
                request = request.header(AUTHORIZATION, auth);
            }

            let response = request.send().await?;
            tracing::debug!(status = %response.status(), "Add stream answered");
            Ok::<(), Error>(())
        }
        .boxed()
    }

    fn remove_stream(&self, name: &str) -> BoxFuture<'static, Result<()>> {
        let url = self.config.streams_url(&[("src", name)]);
        let client = self.client.clone();

        async move {
            let response = client.delete(url?).send().await?;
            tracing::debug!(status = %response.status(), "Remove stream answered");
            Ok::<(), Error>(())
        }
        .boxed()
    }
}
