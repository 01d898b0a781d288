//! Gateway implementation against the Bilibili live API.
//!
//! Each operation is one remote round trip with no internal retry.
//! The anti-forgery token is attached to every mutating request; when
//! the token is absent the call is refused before any network I/O.

use async_trait::async_trait;
use tracing::{debug, warn};

use bililink_core::error::{LinkError, Result};
use bililink_core::session::gateway::SessionGateway;
use bililink_core::session::model::StreamCredentials;
use bililink_core::taxonomy::{Taxonomy, TaxonomyFetcher};
use bililink_core::transport::{HttpMethod, HttpResponse, Transport};

use crate::api::{
    self, ApiEnvelope, AreaGroupDto, StartLiveData, AREA_LIST_URL, DEFAULT_HEADERS, PLATFORM,
    ROOM_UPDATE_URL, START_LIVE_URL, STOP_LIVE_URL,
};

/// Remote session gateway over the Bilibili live API.
///
/// Generic over the [`Transport`] collaborator so the wire behavior is
/// testable without a network.
pub struct BiliGateway<T: Transport> {
    transport: T,
    /// Anti-forgery token read from the host page's `bili_jct` cookie.
    /// Read-only here; never written.
    csrf_token: Option<String>,
}

impl<T: Transport> BiliGateway<T> {
    pub fn new(transport: T, csrf_token: Option<String>) -> Self {
        let csrf_token = csrf_token.filter(|t| !t.is_empty());
        Self {
            transport,
            csrf_token,
        }
    }

    fn csrf(&self) -> Result<&str> {
        self.csrf_token
            .as_deref()
            .ok_or(LinkError::MissingCredential)
    }

    async fn post_form(&self, url: &str, fields: &[(&str, &str)]) -> Result<HttpResponse> {
        let body = api::encode_form(fields);
        debug!(url, "posting form request");
        let response = self
            .transport
            .request(HttpMethod::Post, url, DEFAULT_HEADERS, Some(body))
            .await?;
        if !response.is_success() {
            return Err(LinkError::transport(format!(
                "{} replied with HTTP {}",
                url, response.status
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl<T: Transport> SessionGateway for BiliGateway<T> {
    fn has_credential(&self) -> bool {
        self.csrf_token.is_some()
    }

    async fn update_title(&self, room_id: &str, title: &str) -> bool {
        let Ok(csrf) = self.csrf() else {
            warn!("title update refused: anti-forgery token missing");
            return false;
        };

        let fields = [
            ("room_id", room_id),
            ("platform", PLATFORM),
            ("title", title),
            ("csrf_token", csrf),
            ("csrf", csrf),
        ];

        let response = match self.post_form(ROOM_UPDATE_URL, &fields).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "title update request failed");
                return false;
            }
        };

        match ApiEnvelope::<serde_json::Value>::parse(&response.body) {
            Ok(envelope) if envelope.is_success() => true,
            Ok(envelope) => {
                warn!(code = envelope.code, message = %envelope.message, "title update rejected");
                false
            }
            Err(e) => {
                warn!(error = %e, "title update reply unparsable");
                false
            }
        }
    }

    async fn start_session(&self, room_id: &str, category_id: &str) -> Result<StreamCredentials> {
        let csrf = self.csrf()?;

        let fields = [
            ("room_id", room_id),
            ("platform", PLATFORM),
            ("area_v2", category_id),
            ("backup_stream", "0"),
            ("csrf_token", csrf),
            ("csrf", csrf),
        ];

        let response = self.post_form(START_LIVE_URL, &fields).await?;
        let data: StartLiveData = ApiEnvelope::parse(&response.body)?.into_data()?;

        debug!(room_id, "session started, credentials issued");
        Ok(StreamCredentials {
            server_address: data.rtmp.addr,
            stream_key: data.rtmp.code,
        })
    }

    async fn stop_session(&self, room_id: &str) -> Result<()> {
        let csrf = self.csrf()?;

        let fields = [
            ("room_id", room_id),
            ("platform", PLATFORM),
            ("csrf_token", csrf),
            ("csrf", csrf),
        ];

        let response = self.post_form(STOP_LIVE_URL, &fields).await?;
        // stopLive replies carry a bare status code without data
        ApiEnvelope::<serde_json::Value>::parse(&response.body)?.check()?;
        debug!(room_id, "session stopped");
        Ok(())
    }
}

#[async_trait]
impl<T: Transport> TaxonomyFetcher for BiliGateway<T> {
    /// Fetches the two-level area list.
    ///
    /// Any failure mode (network, malformed payload, embedded failure
    /// code, zero groups) collapses into `TaxonomyUnavailable` so the
    /// category cache stays untouched and the caller can offer a retry.
    async fn fetch_taxonomy(&self) -> Result<Taxonomy> {
        let response = self
            .transport
            .request(HttpMethod::Get, AREA_LIST_URL, DEFAULT_HEADERS, None)
            .await
            .map_err(|e| LinkError::taxonomy_unavailable(e.to_string()))?;

        if !response.is_success() {
            return Err(LinkError::taxonomy_unavailable(format!(
                "area list replied with HTTP {}",
                response.status
            )));
        }

        let groups: Vec<AreaGroupDto> = ApiEnvelope::parse(&response.body)
            .and_then(ApiEnvelope::into_data)
            .map_err(|e| LinkError::taxonomy_unavailable(e.to_string()))?;

        let taxonomy = api::taxonomy_from_dto(groups);
        if taxonomy.is_empty() {
            return Err(LinkError::taxonomy_unavailable("area list was empty"));
        }

        debug!(groups = taxonomy.groups.len(), "area list fetched");
        Ok(taxonomy)
    }
}
