//! Agent registration file retrieval.
//!
//! An agent's `tokenURI` points at its registration file using one of three
//! schemes:
//! - `data:` — inline, optionally `;base64`, decoded locally
//! - `ipfs://<cid>` — fetched through an HTTP gateway
//! - anything else — fetched directly as an http(s) URL

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use tracing::debug;

use super::cancel::CancelToken;

/// Agent-file retrieval errors.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("failed to fetch agent file from {url}: HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("failed to fetch agent file from {url}: {message}")]
    Transport { url: String, message: String },
    #[error("invalid data URI: {0}")]
    Decode(String),
    #[error("failed to build HTTP client: {0}")]
    Client(String),
    #[error("fetch cancelled")]
    Cancelled,
}

/// Standard alphabet, padding optional (as browsers' `atob`).
const DATA_URI_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// HTTP GET capability used for `ipfs://` and http(s) agent files.
///
/// Dropping the returned future must abort the request.
#[async_trait]
pub trait HttpFetch: Send + Sync {
    async fn get_text(&self, url: &str) -> Result<String, FetchError>;
}

/// [`HttpFetch`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestFetch {
    client: reqwest::Client,
}

impl ReqwestFetch {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpFetch for ReqwestFetch {
    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let transport = |e: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self.client.get(url).send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response.text().await.map_err(transport)
    }
}

/// Where an agent file lives, decided by URI prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentFileLocation<'a> {
    /// Inline `data:` URI (the full URI).
    Data(&'a str),
    /// IPFS content identifier.
    Ipfs(&'a str),
    /// Fetched as-is. Unknown schemes end up here too.
    Http(&'a str),
}

impl<'a> AgentFileLocation<'a> {
    pub fn parse(uri: &'a str) -> Self {
        if uri.starts_with("data:") {
            Self::Data(uri)
        } else if let Some(cid) = uri.strip_prefix("ipfs://") {
            Self::Ipfs(cid)
        } else {
            Self::Http(uri)
        }
    }
}

/// Decode a `data:` URI payload to text.
///
/// Metadata is everything between `data:` and the first `,`. If it mentions
/// `base64` the payload is base64, otherwise percent-encoded.
pub fn decode_data_uri(uri: &str) -> Result<String, FetchError> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| FetchError::Decode("missing data: prefix".to_string()))?;
    let (metadata, payload) = rest
        .split_once(',')
        .ok_or_else(|| FetchError::Decode("missing ',' before payload".to_string()))?;

    if metadata.contains("base64") {
        let bytes = DATA_URI_BASE64
            .decode(payload.trim())
            .map_err(|e| FetchError::Decode(format!("bad base64 payload: {e}")))?;
        String::from_utf8(bytes)
            .map_err(|e| FetchError::Decode(format!("payload is not UTF-8: {e}")))
    } else {
        percent_decode(payload)
    }
}

/// Strict percent-decoding: every `%` must start a two-digit hex escape.
fn percent_decode(payload: &str) -> Result<String, FetchError> {
    let mut rest = payload;
    while let Some(idx) = rest.find('%') {
        let escape = rest.get(idx + 1..idx + 3);
        if !escape.is_some_and(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit())) {
            let offset = payload.len() - rest.len() + idx;
            return Err(FetchError::Decode(format!(
                "bad percent-encoding at byte {offset}"
            )));
        }
        rest = &rest[idx + 3..];
    }

    let bytes = urlencoding::decode_binary(payload.as_bytes()).into_owned();
    String::from_utf8(bytes).map_err(|e| FetchError::Decode(format!("payload is not UTF-8: {e}")))
}

/// Resolves agent-file URIs to their text content.
#[derive(Clone)]
pub struct AgentFileFetcher {
    http: Arc<dyn HttpFetch>,
    ipfs_gateway: String,
}

impl AgentFileFetcher {
    /// `ipfs_gateway` is a bare host such as `ipfs.io`.
    pub fn new(http: Arc<dyn HttpFetch>, ipfs_gateway: impl Into<String>) -> Self {
        Self {
            http,
            ipfs_gateway: ipfs_gateway.into(),
        }
    }

    /// Gateway URL an `ipfs://` CID is fetched from.
    pub fn gateway_url(&self, cid: &str) -> String {
        format!("https://{}/ipfs/{}", self.ipfs_gateway, cid)
    }

    /// Fetch the agent file behind `uri`.
    ///
    /// Cancelling `cancel` drops the in-flight request and yields
    /// [`FetchError::Cancelled`].
    pub async fn fetch(&self, uri: &str, cancel: &CancelToken) -> Result<String, FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        let url = match AgentFileLocation::parse(uri) {
            AgentFileLocation::Data(data) => return decode_data_uri(data),
            AgentFileLocation::Ipfs(cid) => self.gateway_url(cid),
            AgentFileLocation::Http(url) => url.to_string(),
        };

        debug!("Fetching agent file from {}", url);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Agent file fetch from {} cancelled", url);
                Err(FetchError::Cancelled)
            }
            result = self.http.get_text(&url) => result,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};

    use super::*;

    /// Serves canned bodies and records every requested URL.
    #[derive(Default)]
    pub(crate) struct FakeHttp {
        pub bodies: HashMap<String, Result<String, u16>>,
        pub requested: Mutex<Vec<String>>,
        pub hang: bool,
    }

    impl FakeHttp {
        pub fn serving(url: &str, body: &str) -> Self {
            let mut bodies = HashMap::new();
            bodies.insert(url.to_string(), Ok(body.to_string()));
            Self {
                bodies,
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl HttpFetch for FakeHttp {
        async fn get_text(&self, url: &str) -> Result<String, FetchError> {
            self.requested.lock().unwrap().push(url.to_string());
            if self.hang {
                std::future::pending::<()>().await;
            }
            match self.bodies.get(url) {
                Some(Ok(body)) => Ok(body.clone()),
                Some(Err(status)) => Err(FetchError::Status {
                    url: url.to_string(),
                    status: *status,
                }),
                None => Err(FetchError::Status {
                    url: url.to_string(),
                    status: 404,
                }),
            }
        }
    }

    fn fetcher(http: FakeHttp) -> (AgentFileFetcher, Arc<FakeHttp>) {
        let http = Arc::new(http);
        (AgentFileFetcher::new(http.clone(), "ipfs.io"), http)
    }

    const CARD: &str = r#"{"services":[{"name":"ENS","endpoint":"alice.eth"}]}"#;

    #[test]
    fn location_dispatch_order() {
        assert_eq!(AgentFileLocation::parse("data:,x"), AgentFileLocation::Data("data:,x"));
        assert_eq!(
            AgentFileLocation::parse("ipfs://bafyabc"),
            AgentFileLocation::Ipfs("bafyabc")
        );
        assert_eq!(
            AgentFileLocation::parse("https://a.example/card.json"),
            AgentFileLocation::Http("https://a.example/card.json")
        );
        assert_eq!(
            AgentFileLocation::parse("ar://tx"),
            AgentFileLocation::Http("ar://tx")
        );
    }

    const PAYLOADS: &[&str] = &[
        CARD,
        "{}",
        "[]",
        r#"{"name":"Zoë agent","services":[{"name":"ENS","endpoint":"zoë.eth"}]}"#,
        r#"{"description":"100% sure, a+b=c? #1 & more"}"#,
        "{\n  \"services\": [\n    {\"name\": \"ENS\", \"endpoint\": \"a.eth\"}\n  ]\n}",
        r#"{"emoji":"🤖","cjk":"代理","path":"/a/b?c=d#e"}"#,
        r#"{"escaped":"%20 is a space, %zz is not"}"#,
    ];

    #[test]
    fn base64_data_uri_round_trips() {
        for payload in PAYLOADS {
            let uri = format!("data:application/json;base64,{}", STANDARD.encode(payload));
            assert_eq!(decode_data_uri(&uri).unwrap(), *payload, "{uri}");
        }
    }

    #[test]
    fn unpadded_base64_is_accepted() {
        assert_eq!(decode_data_uri("data:application/json;base64,e30").unwrap(), "{}");
        for payload in PAYLOADS {
            let uri = format!("data:application/json;base64,{}", STANDARD_NO_PAD.encode(payload));
            assert_eq!(decode_data_uri(&uri).unwrap(), *payload, "{uri}");
        }
    }

    #[test]
    fn percent_encoded_data_uri_round_trips() {
        for payload in PAYLOADS {
            let uri = format!("data:application/json,{}", urlencoding::encode(payload));
            assert_eq!(decode_data_uri(&uri).unwrap(), *payload, "{uri}");
        }
    }

    #[test]
    fn bad_percent_escapes_are_decode_errors() {
        for uri in [
            "data:application/json,%7B%zz%7D",
            "data:application/json,%7B%7D%4",
            "data:application/json,%",
            "data:application/json,%g0",
            "data:application/json,%é0",
        ] {
            assert!(
                matches!(decode_data_uri(uri), Err(FetchError::Decode(_))),
                "{uri} should be rejected"
            );
        }
        // %ff decodes to a byte that is not UTF-8 on its own.
        assert!(matches!(decode_data_uri("data:,%ff"), Err(FetchError::Decode(_))));
    }

    #[test]
    fn client_build_failure_is_not_a_transport_error() {
        let err = FetchError::Client("no TLS backend".to_string());
        assert_eq!(err.to_string(), "failed to build HTTP client: no TLS backend");
        assert!(!err.to_string().contains(" from "));
    }

    #[test]
    fn data_uri_without_metadata_is_percent_decoded() {
        assert_eq!(decode_data_uri("data:,hello%20world").unwrap(), "hello world");
    }

    #[test]
    fn data_uri_only_splits_on_first_comma() {
        assert_eq!(decode_data_uri("data:text/plain,a,b,c").unwrap(), "a,b,c");
    }

    #[test]
    fn malformed_data_uris_are_decode_errors() {
        assert!(matches!(
            decode_data_uri("data:application/json;base64,!!!not-base64"),
            Err(FetchError::Decode(_))
        ));
        assert!(matches!(
            decode_data_uri("data:application/json"),
            Err(FetchError::Decode(_))
        ));
        // 0xff is not valid UTF-8.
        assert!(matches!(
            decode_data_uri("data:;base64,/w=="),
            Err(FetchError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn data_uri_never_touches_the_network() {
        let (fetcher, http) = fetcher(FakeHttp::default());
        let uri = format!("data:application/json;base64,{}", STANDARD.encode(CARD));
        let text = fetcher.fetch(&uri, &CancelToken::new()).await.unwrap();
        assert_eq!(text, CARD);
        assert!(http.requested.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn ipfs_goes_through_gateway() {
        let (fetcher, http) = fetcher(FakeHttp::serving("https://ipfs.io/ipfs/bafyabc", CARD));
        let text = fetcher
            .fetch("ipfs://bafyabc", &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(text, CARD);
        assert_eq!(
            *http.requested.lock().unwrap(),
            vec!["https://ipfs.io/ipfs/bafyabc".to_string()]
        );
    }

    #[tokio::test]
    async fn http_status_is_reported() {
        let mut http = FakeHttp::default();
        http.bodies
            .insert("https://agent.example/card.json".to_string(), Err(503));
        let (fetcher, _) = fetcher(http);
        let err = fetcher
            .fetch("https://agent.example/card.json", &CancelToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 503, .. }));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn unknown_schemes_fall_through_to_direct_fetch() {
        let (fetcher, http) = fetcher(FakeHttp::serving("ar://tx", CARD));
        assert_eq!(
            fetcher.fetch("ar://tx", &CancelToken::new()).await.unwrap(),
            CARD
        );
        assert_eq!(*http.requested.lock().unwrap(), vec!["ar://tx".to_string()]);
    }

    #[tokio::test]
    async fn cancel_aborts_in_flight_fetch() {
        let (fetcher, _) = fetcher(FakeHttp {
            hang: true,
            ..Default::default()
        });
        let cancel = CancelToken::new();
        let task = tokio::spawn({
            let cancel = cancel.clone();
            async move { fetcher.fetch("https://slow.example/card.json", &cancel).await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();
        let result = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result, Err(FetchError::Cancelled)));
    }

    #[tokio::test]
    async fn already_cancelled_token_skips_fetch() {
        let (fetcher, http) = fetcher(FakeHttp::serving("https://a.example/c", CARD));
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(matches!(
            fetcher.fetch("https://a.example/c", &cancel).await,
            Err(FetchError::Cancelled)
        ));
        assert!(http.requested.lock().unwrap().is_empty());
    }
}
