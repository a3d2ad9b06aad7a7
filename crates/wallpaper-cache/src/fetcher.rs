//! Network transfer of wallpaper bytes into pending cache entries

use crate::error::{CacheError, Result};
use crate::store::PendingEntry;
use bytes::Bytes;
use futures::{Stream, StreamExt, TryStreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

const DEFAULT_USER_AGENT: &str = concat!("wallpaper-cache/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Source of image bytes for a URL
pub trait Transport: Send + Sync {
    /// Start a transfer. Failures before the first byte are returned here,
    /// failures mid-body as an `Err` item of the stream.
    fn open(&self, url: &str) -> impl Future<Output = Result<ByteStream>> + Send;
}

/// Immutable settings for the HTTP client, fixed at construction
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: Duration,
    pub user_agent: String,
    pub headers: Vec<(String, String)>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            headers: Vec::new(),
        }
    }
}

/// HTTP transport backed by a single `reqwest::Client`
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: HttpConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| CacheError::Config(format!("Invalid header name {}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| CacheError::Config(format!("Invalid header value: {}", e)))?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .default_headers(headers)
            .build()?;

        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    async fn open(&self, url: &str) -> Result<ByteStream> {
        debug!(url, "Requesting wallpaper");

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            warn!(status = %response.status(), url, "Failed to fetch wallpaper");
            return Err(CacheError::Network(format!(
                "{} returned status {}",
                url,
                response.status()
            )));
        }

        let expected = response.content_length();
        let stream = Box::pin(response.bytes_stream().map_err(CacheError::from));
        let stream: ByteStream = match expected {
            Some(len) => Box::pin(LengthChecked::new(stream, len)),
            None => stream,
        };
        Ok(stream)
    }
}

/// Fails the stream if it ends before the advertised `Content-Length`
struct LengthChecked<S> {
    inner: S,
    expected: u64,
    received: u64,
    done: bool,
}

impl<S> LengthChecked<S> {
    fn new(inner: S, expected: u64) -> Self {
        Self {
            inner,
            expected,
            received: 0,
            done: false,
        }
    }
}

impl<S> Stream for LengthChecked<S>
where
    S: Stream<Item = Result<Bytes>> + Unpin,
{
    type Item = Result<Bytes>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        use std::task::Poll;

        if self.done {
            return Poll::Ready(None);
        }

        match self.inner.poll_next_unpin(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                self.received += chunk.len() as u64;
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(None) if self.received < self.expected => {
                self.done = true;
                Poll::Ready(Some(Err(CacheError::Network(format!(
                    "body truncated: received {} of {} bytes",
                    self.received, self.expected
                )))))
            }
            other => other,
        }
    }
}

/// Drains transfers from a [`Transport`] into pending entries
#[derive(Debug, Clone)]
pub struct Fetcher<T> {
    transport: T,
}

impl<T: Transport> Fetcher<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Stream `url` into `pending`, returning the number of bytes written.
    ///
    /// On error the pending entry is left for the caller to drop, which
    /// deletes the temporary file.
    pub async fn transfer(&self, url: &str, pending: &mut PendingEntry) -> Result<u64> {
        let mut stream = self.transport.open(url).await?;
        let mut file = tokio::fs::File::from_std(pending.file().try_clone()?);
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        if written == 0 {
            return Err(CacheError::Network(format!("{} returned an empty body", url)));
        }

        debug!(url, key = %pending.key(), written, "Transfer complete");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use crate::types::ImageExtension;
    use futures::stream;
    use tempfile::tempdir;

    struct ScriptedTransport {
        chunks: Vec<std::result::Result<&'static str, &'static str>>,
    }

    impl Transport for ScriptedTransport {
        async fn open(&self, _url: &str) -> Result<ByteStream> {
            let items: Vec<Result<Bytes>> = self
                .chunks
                .iter()
                .map(|c| match *c {
                    Ok(text) => Ok(Bytes::from_static(text.as_bytes())),
                    Err(reason) => Err(CacheError::Network(reason.to_string())),
                })
                .collect();
            Ok(Box::pin(stream::iter(items)))
        }
    }

    #[tokio::test]
    async fn test_transfer_writes_all_chunks() {
        let dir = tempdir().unwrap();
        let store = Store::new(dir.path());
        store.init().unwrap();

        let fetcher = Fetcher::new(ScriptedTransport {
            chunks: vec![Ok("hello "), Ok("world")],
        });
        let mut pending = store.begin_write("k", ImageExtension::Jpg).unwrap();
        let written = fetcher.transfer("https://x.test/a.jpg", &mut pending).await.unwrap();
        assert_eq!(written, 11);

        let path = store.commit(pending, None).unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"hello world");
    }

    #[tokio::test]
    async fn test_transfer_error_mid_stream() {
        let dir = tempdir().unwrap();
        let store = Store::new(dir.path());
        store.init().unwrap();

        let fetcher = Fetcher::new(ScriptedTransport {
            chunks: vec![Ok("half"), Err("connection reset")],
        });
        let mut pending = store.begin_write("k", ImageExtension::Jpg).unwrap();
        let err = fetcher
            .transfer("https://x.test/a.jpg", &mut pending)
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::Network(_)));

        drop(pending);
        assert!(!store.exists("k"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_transfer_rejects_empty_body() {
        let dir = tempdir().unwrap();
        let store = Store::new(dir.path());
        store.init().unwrap();

        let fetcher = Fetcher::new(ScriptedTransport { chunks: vec![] });
        let mut pending = store.begin_write("k", ImageExtension::Jpg).unwrap();
        let err = fetcher
            .transfer("https://x.test/a.jpg", &mut pending)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("empty body"));
    }

    #[tokio::test]
    async fn test_length_checked_detects_truncation() {
        let inner = stream::iter(vec![Ok::<_, CacheError>(Bytes::from_static(b"abc"))]);
        let mut checked = LengthChecked::new(inner, 10);

        assert_eq!(checked.next().await.unwrap().unwrap(), Bytes::from_static(b"abc"));
        let err = checked.next().await.unwrap().unwrap_err();
        assert!(err.to_string().contains("received 3 of 10"));
        assert!(checked.next().await.is_none());
    }

    #[tokio::test]
    async fn test_length_checked_passes_complete_body() {
        let inner = stream::iter(vec![
            Ok::<_, CacheError>(Bytes::from_static(b"ab")),
            Ok(Bytes::from_static(b"cd")),
        ]);
        let collected: Vec<Bytes> = LengthChecked::new(inner, 4).try_collect().await.unwrap();
        assert_eq!(collected.concat(), b"abcd");
    }

    #[test]
    fn test_http_transport_rejects_bad_header() {
        let config = HttpConfig {
            headers: vec![("bad header".to_string(), "v".to_string())],
            ..HttpConfig::default()
        };
        let err = HttpTransport::new(config).unwrap_err();
        assert!(matches!(err, CacheError::Config(_)));
    }

    #[test]
    fn test_http_transport_accepts_auth_header() {
        let config = HttpConfig {
            headers: vec![("Authorization".to_string(), "Client-ID abc".to_string())],
            ..HttpConfig::default()
        };
        assert!(HttpTransport::new(config).is_ok());
    }
}
