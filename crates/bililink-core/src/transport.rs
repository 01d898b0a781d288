//! Transport collaborator trait.
//!
//! The hosting environment supplies the HTTP primitive; the gateway
//! never talks to the network directly. This keeps the gateway testable
//! with a fake transport and leaves timeout policy to the transport
//! layer.

use async_trait::async_trait;

use crate::error::Result;

/// HTTP method subset used by the gateway and the taxonomy fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// A completed HTTP exchange: status code plus body text.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    /// True for 2xx status codes.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues a single HTTP request and returns the response.
///
/// # Errors
///
/// Implementations return `LinkError::Transport` for connect, DNS or
/// timeout failures. Non-2xx responses are returned as values, not
/// errors; classifying them is the caller's concern.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(
        &self,
        method: HttpMethod,
        url: &str,
        headers: &[(&str, &str)],
        body: Option<String>,
    ) -> Result<HttpResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_names() {
        assert_eq!(HttpMethod::Get.as_str(), "GET");
        assert_eq!(HttpMethod::Post.as_str(), "POST");
    }

    #[test]
    fn test_status_classification() {
        let ok = HttpResponse {
            status: 204,
            body: String::new(),
        };
        assert!(ok.is_success());

        let bad = HttpResponse {
            status: 502,
            body: String::new(),
        };
        assert!(!bad.is_success());
    }
}
