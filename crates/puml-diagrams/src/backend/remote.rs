//! Remote rendering via a PlantUML server.
//!
//! The diagram travels in the URL path, encoded with [`crate::encoding`]:
//!
//! ```text
//! GET {base_uri}/{svg|png}/{encoded}   -> image bytes
//! GET {base_uri}/map/{encoded}         -> image-map data (optional)
//! ```
//!
//! Successful response bodies are written to disk verbatim. Anything that
//! leaves no image file behind is a failed render.

use std::path::Path;
use std::time::Duration;

use puml_config::DiagramFormat;
use ureq::{Agent, Proxy};

use super::{RenderBackend, RenderError, RenderJob, RenderOutput};
use crate::consts::{MAP_EXTENSION, MAP_SEGMENT};
use crate::encoding::encode;

const NAME: &str = "remote";

/// Backend fetching rendered diagrams from a PlantUML server.
pub struct RemoteBackend {
    base_uri: String,
    agent: Agent,
    timeout: Duration,
    fetch_map: bool,
}

/// Create HTTP agent with the specified timeout and proxy.
///
/// With `proxy` set to `None` the agent connects directly, ignoring any proxy
/// environment variables.
fn create_agent(timeout: Duration, proxy: Option<Proxy>) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .proxy(proxy)
        .build()
        .into()
}

impl RemoteBackend {
    /// Create a backend for the server at `base_uri`.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::BackendUnavailable` if `proxy` is not a valid
    /// proxy URI.
    pub fn new(
        base_uri: &str,
        timeout: Duration,
        proxy: Option<&str>,
    ) -> Result<Self, RenderError> {
        let proxy = proxy
            .map(|uri| {
                Proxy::new(uri).map_err(|e| RenderError::BackendUnavailable {
                    backend: NAME,
                    message: format!("invalid proxy {uri}: {e}"),
                })
            })
            .transpose()?;

        Ok(Self {
            base_uri: base_uri.trim_end_matches('/').to_owned(),
            agent: create_agent(timeout, proxy),
            timeout,
            fetch_map: false,
        })
    }

    /// Also fetch image-map data next to every image.
    #[must_use]
    pub fn with_map(mut self, fetch_map: bool) -> Self {
        self.fetch_map = fetch_map;
        self
    }

    /// URL of the `segment` rendering (`svg`, `png` or `map`) of `source`.
    #[must_use]
    pub fn url(&self, segment: &str, source: &str) -> String {
        format!("{}/{segment}/{}", self.base_uri, encode(source))
    }

    /// GET `url` and return the body of a successful response.
    fn fetch(&self, url: &str, target: &Path) -> Result<Vec<u8>, RenderError> {
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| self.transport_error(e, "request failed"))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            tracing::warn!(status, url, "rendering server returned an error status");
            return Err(RenderError::RenderFailed {
                backend: NAME,
                path: target.to_path_buf(),
            });
        }

        response
            .into_body()
            .read_to_vec()
            .map_err(|e| self.transport_error(e, "failed to read response"))
    }

    fn transport_error(&self, error: ureq::Error, context: &str) -> RenderError {
        match error {
            ureq::Error::Timeout(_) => RenderError::Timeout {
                backend: NAME,
                seconds: self.timeout.as_secs(),
            },
            e => RenderError::BackendUnavailable {
                backend: NAME,
                message: format!("{context}: {e}"),
            },
        }
    }

    /// Fetch `url` into `target`, leaving `target` untouched on failure.
    fn download(&self, url: &str, target: &Path) -> Result<(), RenderError> {
        let body = self.fetch(url, target)?;
        std::fs::write(target, body).map_err(|source| RenderError::Io {
            path: target.to_path_buf(),
            source,
        })
    }
}

impl RenderBackend for RemoteBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    fn map_sidecar(&self, _format: DiagramFormat) -> Option<&'static str> {
        self.fetch_map.then_some(MAP_EXTENSION)
    }

    fn render(&self, job: &RenderJob<'_>) -> Result<RenderOutput, RenderError> {
        let url = self.url(job.format.as_str(), job.source);
        tracing::debug!(url, "fetching diagram");

        let fetched = match self.download(&url, job.image_file) {
            Err(e @ RenderError::Io { .. }) => return Err(e),
            other => other,
        };
        if let Err(e) = &fetched {
            tracing::warn!(error = %e, "diagram fetch failed");
        }

        let map = if self.fetch_map {
            let map_file = job.sibling(MAP_EXTENSION);
            match self.download(&self.url(MAP_SEGMENT, job.source), &map_file) {
                Ok(()) => Some(map_file),
                Err(e) => {
                    tracing::debug!(error = %e, "map fetch failed, continuing without map");
                    None
                }
            }
        } else {
            None
        };

        if !job.image_file.is_file() {
            return Err(match fetched {
                Err(e) => e,
                Ok(()) => RenderError::RenderFailed {
                    backend: NAME,
                    path: job.image_file.to_path_buf(),
                },
            });
        }

        Ok(RenderOutput {
            image: job.image_file.to_path_buf(),
            map,
        })
    }
}
