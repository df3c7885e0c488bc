//! HTTP access to the hub
//!
//! Every request is a GET with Basic authentication:
//! - `/buffstatus.xml`     read the ring buffer
//! - `/3?{hex}=I=3`        send one modem message
//! - `/1?XB=M=1`           clear the ring buffer

use crate::constants::HUB_REQUEST_TIMEOUT_SECS;
use crate::error::{PortError, Result};
use reqwest::blocking::Client;
use std::time::Duration;
use tracing::trace;

const BUFFER_STATUS_PATH: &str = "/buffstatus.xml";
const CLEAR_BUFFER_PATH: &str = "/1?XB=M=1";

/// Path that sends a hex-encoded message
pub fn send_path(hex: &str) -> String {
    format!("/3?{}=I=3", hex)
}

/// Requests the hub channel needs
///
/// Lets the channel run against an in-memory hub in tests.
pub trait HubClient: Send + Sync {
    /// Body of the buffer status resource
    fn fetch_buffer(&self) -> Result<String>;

    /// Send a hex-encoded message
    fn send_hex(&self, hex: &str) -> Result<()>;

    /// Clear the hub ring buffer
    fn clear_buffer(&self) -> Result<()>;
}

/// `reqwest` based hub client
pub struct HttpHubClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
}

impl HttpHubClient {
    pub fn new(host: &str, port: u16, username: &str, password: &str) -> Result<Self> {
        let base_url = format!("http://{}:{}", host, port);
        let client = Client::builder()
            .timeout(Duration::from_secs(HUB_REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| PortError::HubRequest {
                url: base_url.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url,
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    fn get(&self, path: &str) -> Result<String> {
        let url = format!("{}{}", self.base_url, path);
        trace!("GET {}", url);

        let request_err = |reason: String| PortError::HubRequest {
            url: url.clone(),
            reason,
        };

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .map_err(|e| request_err(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(request_err(format!("HTTP {}", status)));
        }

        response.text().map_err(|e| request_err(e.to_string()))
    }
}

impl HubClient for HttpHubClient {
    fn fetch_buffer(&self) -> Result<String> {
        self.get(BUFFER_STATUS_PATH)
    }

    fn send_hex(&self, hex: &str) -> Result<()> {
        self.get(&send_path(hex)).map(|_| ())
    }

    fn clear_buffer(&self) -> Result<()> {
        self.get(CLEAR_BUFFER_PATH).map(|_| ())
    }
}
