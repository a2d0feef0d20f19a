//! REST client for the measurement server.
//!
//! Thin wrappers over the server's JSON endpoints: threshold fetch/update,
//! measurement persistence, history clearing, and the report binary
//! pass-through. Request failures are surfaced to the caller; nothing here
//! retries automatically.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::capture::MeasurementSink;
use crate::error::{Error, Result};
use crate::measurement::{Measurement, Thresholds};

/// Body for the save-measurement endpoint.
#[derive(Debug, Clone, Copy, Serialize)]
struct SaveRequest {
    shoulder_angle: f64,
    hip_angle: f64,
    tilt_angle: f64,
}

impl From<&Measurement> for SaveRequest {
    fn from(m: &Measurement) -> Self {
        Self {
            shoulder_angle: m.shoulder_angle,
            hip_angle: m.hip_angle,
            tilt_angle: m.tilt_angle,
        }
    }
}

/// Response from the save-measurement endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SaveResponse {
    /// Whether the server accepted the measurement.
    pub success: bool,
    /// Server-supplied reason when `success` is false.
    #[serde(default)]
    pub error: Option<String>,
}

/// Client for the measurement server's REST endpoints.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    http: reqwest::Client,
}

impl ApiClient {
    /// Create a client for the given base URL.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    /// Resolve an endpoint path against the base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the path does not join cleanly.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).map_err(|e| Error::InvalidUrl {
            url: format!("{}{path}", self.base_url),
            message: e.to_string(),
        })
    }

    /// Fetch the current threshold set.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    pub async fn fetch_thresholds(&self) -> Result<Thresholds> {
        let url = self.endpoint("/get_thresholds")?;
        debug!("fetching thresholds from {url}");
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(Error::api("fetch thresholds", response.status().as_u16()));
        }
        Ok(response.json().await?)
    }

    /// Submit a new threshold set; the server echoes the stored values.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    pub async fn update_thresholds(&self, thresholds: &Thresholds) -> Result<Thresholds> {
        let url = self.endpoint("/update_thresholds")?;
        let response = self.http.post(url).json(thresholds).send().await?;
        if !response.status().is_success() {
            return Err(Error::api("update thresholds", response.status().as_u16()));
        }
        let stored: Thresholds = response.json().await?;
        info!("thresholds updated: {stored:?}");
        Ok(stored)
    }

    /// Ask the server to clear its stored measurement history.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    pub async fn clear_history(&self) -> Result<()> {
        let url = self.endpoint("/clear_history")?;
        let response = self.http.post(url).send().await?;
        if !response.status().is_success() {
            return Err(Error::api("clear history", response.status().as_u16()));
        }
        info!("server history cleared");
        Ok(())
    }

    /// Download the server-generated report binary.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    pub async fn generate_report(&self) -> Result<Vec<u8>> {
        let url = self.endpoint("/generate_report")?;
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(Error::api("generate report", response.status().as_u16()));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl MeasurementSink for ApiClient {
    async fn save_measurement(&self, measurement: &Measurement) -> Result<()> {
        let url = self.endpoint("/capture_measurement")?;
        let response = self
            .http
            .post(url)
            .json(&SaveRequest::from(measurement))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::api("save measurement", response.status().as_u16()));
        }
        let body: SaveResponse = response.json().await?;
        if body.success {
            info!("measurement saved");
            Ok(())
        } else {
            Err(Error::save_rejected(
                body.error.unwrap_or_else(|| "unknown error".to_string()),
            ))
        }
    }
}

/// File name for a report downloaded at the given time.
#[must_use]
pub fn report_filename(now: DateTime<Utc>) -> String {
    format!("posture_report_{}.pdf", now.format("%Y%m%dT%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn client() -> ApiClient {
        ApiClient::new(Url::parse("http://localhost:5000").unwrap())
    }

    #[test]
    fn test_endpoint_joining() {
        let client = client();
        assert_eq!(
            client.endpoint("/get_thresholds").unwrap().as_str(),
            "http://localhost:5000/get_thresholds"
        );
        assert_eq!(
            client.endpoint("/capture_measurement").unwrap().as_str(),
            "http://localhost:5000/capture_measurement"
        );
    }

    #[test]
    fn test_save_request_serialization() {
        let m = Measurement::now(1.5, -2.0, 0.5);
        let body = serde_json::to_value(SaveRequest::from(&m)).unwrap();
        assert_eq!(body["shoulder_angle"], 1.5);
        assert_eq!(body["hip_angle"], -2.0);
        assert_eq!(body["tilt_angle"], 0.5);
        // Exactly the three angle fields, no timestamp
        assert_eq!(body.as_object().unwrap().len(), 3);
    }

    #[test]
    fn test_save_response_deserialization() {
        let ok: SaveResponse = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(ok.success);
        assert!(ok.error.is_none());

        let rejected: SaveResponse =
            serde_json::from_str(r#"{"success": false, "error": "no camera active"}"#).unwrap();
        assert!(!rejected.success);
        assert_eq!(rejected.error.as_deref(), Some("no camera active"));
    }

    #[test]
    fn test_report_filename() {
        let now = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
        assert_eq!(report_filename(now), "posture_report_20250314T092653.pdf");
    }
}
