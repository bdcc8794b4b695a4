//! Sharing configuration

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use url::Url;

use crate::error::{Error, Result};
use crate::naming::StreamName;

/// Port the relay backend listens on by default
pub const DEFAULT_PORT: u16 = 1984;

/// Codecs announced to the backend when none are configured
pub const DEFAULT_CODECS: &[&str] = &[
    "avc1.640029",
    "avc1.64002A",
    "avc1.640033",
    "hvc1.1.6.L153.B0",
    "mp4a.40.2",
    "mp4a.40.5",
    "flac",
    "opus",
];

/// Configuration shared by the registry, the backend client and the transport
#[derive(Debug, Clone)]
pub struct ShareConfig {
    /// Base of the HTTP stream API (e.g. `http://host:1984/api`)
    pub api_base: Url,

    /// Base of the WebSocket API (e.g. `ws://host:1984/api`)
    pub ws_base: Url,

    /// Basic auth user name (empty disables the credential header)
    pub username: String,

    /// Basic auth password (empty disables the credential header)
    pub password: String,

    /// Codec identifiers sent in the capability announcement
    pub codecs: Vec<String>,

    /// Inbound message buffer per socket
    pub channel_capacity: usize,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self::for_host("127.0.0.1", DEFAULT_PORT).expect("loopback base urls are valid")
    }
}

impl ShareConfig {
    /// Derive both API bases from a host and port
    pub fn for_host(host: &str, port: u16) -> Result<Self> {
        let api_base = parse_base(&format!("http://{host}:{port}/api"))?;
        let ws_base = parse_base(&format!("ws://{host}:{port}/api"))?;

        Ok(Self {
            api_base,
            ws_base,
            username: "admin".to_string(),
            password: "123456".to_string(),
            codecs: DEFAULT_CODECS.iter().map(|c| c.to_string()).collect(),
            channel_capacity: 256,
        })
    }

    /// Set the HTTP API base
    pub fn api_base(mut self, url: Url) -> Self {
        self.api_base = url;
        self
    }

    /// Set the WebSocket API base
    pub fn ws_base(mut self, url: Url) -> Self {
        self.ws_base = url;
        self
    }

    /// Set the basic auth credentials
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Replace the announced codec list
    pub fn codecs<I, S>(mut self, codecs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.codecs = codecs.into_iter().map(Into::into).collect();
        self
    }

    /// Set the inbound buffer per socket
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// `Authorization` header value, present only when both parts are set
    pub fn authorization(&self) -> Option<String> {
        if self.username.is_empty() || self.password.is_empty() {
            return None;
        }
        let token = STANDARD.encode(format!("{}:{}", self.username, self.password));
        Some(format!("Basic {token}"))
    }

    /// Comma separated codec list for the capability announcement
    pub fn codec_list(&self) -> String {
        self.codecs.join(",")
    }

    /// `{api_base}/streams?{params}`
    pub fn streams_url(&self, params: &[(&str, &str)]) -> Result<Url> {
        let mut url = join_segment(&self.api_base, "streams")?;
        url.query_pairs_mut().extend_pairs(params);
        Ok(url)
    }

    /// `{ws_base}/ws?src={name}`
    pub fn socket_url(&self, name: &StreamName) -> Result<Url> {
        let mut url = join_segment(&self.ws_base, "ws")?;
        url.query_pairs_mut().append_pair("src", name.as_str());
        Ok(url)
    }

    /// [`socket_url`](Self::socket_url) with the credentials embedded as
    /// userinfo, for handing to an external player
    ///
    /// Empty parts are left out.
    pub fn player_url(&self, name: &StreamName) -> Result<Url> {
        let mut url = self.socket_url(name)?;
        let invalid = |_| Error::InvalidConfig(format!("{} cannot carry credentials", self.ws_base));

        if !self.username.is_empty() {
            url.set_username(&self.username).map_err(invalid)?;
        }
        if !self.password.is_empty() {
            url.set_password(Some(&self.password)).map_err(invalid)?;
        }
        Ok(url)
    }
}

fn parse_base(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| Error::InvalidConfig(format!("{raw}: {e}")))
}

fn join_segment(base: &Url, segment: &str) -> Result<Url> {
    let mut url = base.clone();
    url.set_query(None);
    url.path_segments_mut()
        .map_err(|_| Error::InvalidConfig(format!("{base} cannot be a base url")))?
        .pop_if_empty()
        .push(segment);
    Ok(url)
}
