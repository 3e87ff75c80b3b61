//! Blocking HTTP transport for the price rule endpoint.

use async_trait::async_trait;
use error_stack::Report;
use http::{Request, Response};

use unified_pricing_common::error::YieldError;
use unified_pricing_common::remote_config::HttpFetch;

/// [`HttpFetch`] backed by a `ureq` agent.
///
/// Error statuses are returned as responses so the loader can retry them.
///
/// The request blocks the calling thread. It suits the CLI's current-thread
/// runtime, where nothing else runs while a lookup waits, and must not be
/// used from an async host that multiplexes other work.
pub struct UreqFetch {
    agent: ureq::Agent,
}

impl UreqFetch {
    pub fn new() -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();
        Self { agent }
    }
}

impl Default for UreqFetch {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpFetch for UreqFetch {
    async fn fetch(
        &self,
        request: Request<Vec<u8>>,
    ) -> Result<Response<Vec<u8>>, Report<YieldError>> {
        let uri = request.uri().to_string();
        log::debug!("POST {}", uri);

        let response = self.agent.run(request).map_err(|e| {
            Report::new(YieldError::Http {
                message: format!("Failed to send request to {}: {}", uri, e),
            })
        })?;

        let (parts, mut body) = response.into_parts();
        let bytes = body.read_to_vec().map_err(|e| {
            Report::new(YieldError::Http {
                message: format!("Failed to read response from {}: {}", uri, e),
            })
        })?;

        log::debug!("{} answered {} ({} bytes)", uri, parts.status, bytes.len());
        Ok(Response::from_parts(parts, bytes))
    }
}
