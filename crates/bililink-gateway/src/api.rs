//! Wire-level definitions for the Bilibili live API.
//!
//! Endpoint constants, the browser-like request headers the platform
//! expects from third-party callers, and the JSON reply envelopes.
//! A non-zero `code` in the envelope is the uniform signal for an
//! application-level failure, distinct from transport failure.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use bililink_core::error::{LinkError, Result};
use bililink_core::taxonomy::{Area, AreaGroup, Taxonomy};

pub const AREA_LIST_URL: &str =
    "https://api.live.bilibili.com/room/v1/Area/getList?show_pinyin=1";
pub const ROOM_UPDATE_URL: &str = "https://api.live.bilibili.com/room/v1/Room/update";
pub const START_LIVE_URL: &str = "https://api.live.bilibili.com/room/v1/Room/startLive";
pub const STOP_LIVE_URL: &str = "https://api.live.bilibili.com/room/v1/Room/stopLive";

/// Platform tag the start/stop/update endpoints expect.
pub const PLATFORM: &str = "android_link";

/// Headers the live API expects from a third-party web caller.
pub const DEFAULT_HEADERS: &[(&str, &str)] = &[
    ("accept", "application/json, text/plain, */*"),
    ("accept-language", "zh-CN,zh;q=0.9,en;q=0.8"),
    (
        "content-type",
        "application/x-www-form-urlencoded; charset=UTF-8",
    ),
    ("origin", "https://link.bilibili.com"),
    ("referer", "https://link.bilibili.com/p/center/index"),
    (
        "user-agent",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    ),
];

/// The uniform JSON reply envelope: `{ code, message, data }`.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

impl<T: DeserializeOwned> ApiEnvelope<T> {
    /// Parses an envelope from a response body.
    ///
    /// # Errors
    ///
    /// `LinkError::Application` on an unparsable payload; the platform
    /// occasionally serves HTML error pages with a 200 status.
    pub fn parse(body: &str) -> Result<Self> {
        serde_json::from_str(body)
            .map_err(|e| LinkError::application(format!("unparsable reply: {e}")))
    }

    /// True when the embedded application status code signals success.
    pub fn is_success(&self) -> bool {
        self.code == 0
    }

    /// Converts a non-zero code into an `Application` failure carrying
    /// the platform's message verbatim; the payload is ignored.
    pub fn check(self) -> Result<Option<T>> {
        if !self.is_success() {
            let message = if self.message.is_empty() {
                format!("platform error code {}", self.code)
            } else {
                self.message
            };
            return Err(LinkError::Application { message });
        }
        Ok(self.data)
    }

    /// Like [`ApiEnvelope::check`], but requires a payload.
    pub fn into_data(self) -> Result<T> {
        self.check()?
            .ok_or_else(|| LinkError::application("reply missing data"))
    }
}

/// `data` payload of the start-live endpoint.
#[derive(Debug, Deserialize)]
pub struct StartLiveData {
    pub rtmp: RtmpInfo,
}

/// RTMP ingest target issued for one session.
#[derive(Debug, Deserialize)]
pub struct RtmpInfo {
    /// Server address.
    pub addr: String,
    /// Stream key.
    pub code: String,
}

/// Area-list ids arrive as numbers or strings depending on the entry;
/// normalized to strings at this boundary.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum IdValue {
    Number(i64),
    Text(String),
}

impl IdValue {
    pub fn into_string(self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AreaGroupDto {
    pub id: IdValue,
    pub name: String,
    #[serde(default)]
    pub list: Vec<AreaDto>,
}

#[derive(Debug, Deserialize)]
pub struct AreaDto {
    pub id: IdValue,
    pub name: String,
}

impl From<AreaDto> for Area {
    fn from(dto: AreaDto) -> Self {
        Self {
            id: dto.id.into_string(),
            name: dto.name,
        }
    }
}

impl From<AreaGroupDto> for AreaGroup {
    fn from(dto: AreaGroupDto) -> Self {
        Self {
            id: dto.id.into_string(),
            name: dto.name,
            areas: dto.list.into_iter().map(Area::from).collect(),
        }
    }
}

/// Converts the raw area-list payload into the domain taxonomy.
pub fn taxonomy_from_dto(groups: Vec<AreaGroupDto>) -> Taxonomy {
    Taxonomy::new(groups.into_iter().map(AreaGroup::from).collect())
}

/// Encodes form fields as an `application/x-www-form-urlencoded` body.
pub fn encode_form(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}
