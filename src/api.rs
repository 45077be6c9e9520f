use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::errors::FetchError;
use crate::models::{Identity, JobListing};

/// Blocking client for the matching service.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    client: reqwest::blocking::Client,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    full_name: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct IdentityResponse {
    id: String,
    #[serde(default)]
    full_name: String,
    #[serde(default)]
    email: String,
}

#[derive(Debug, Deserialize)]
pub struct UploadedResume {
    pub id: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub skills_detected: Vec<String>,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            base_url: config.api_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn login(&self, email: &str, password: &str) -> Result<Identity> {
        let response = self
            .client
            .post(self.url("/login"))
            .json(&LoginRequest { email, password })
            .send()
            .context("Failed to send login request")?;
        read_identity(response, "Login")
    }

    pub fn register(&self, full_name: &str, email: &str, password: &str) -> Result<Identity> {
        let response = self
            .client
            .post(self.url("/register"))
            .json(&RegisterRequest { full_name, email, password })
            .send()
            .context("Failed to send registration request")?;
        let mut identity = read_identity(response, "Registration")?;
        // The register endpoint only echoes the id.
        if identity.full_name.is_empty() {
            identity.full_name = full_name.to_string();
        }
        if identity.email.is_empty() {
            identity.email = email.to_string();
        }
        Ok(identity)
    }

    pub fn upload_resume(&self, user_id: &str, file: &Path) -> Result<UploadedResume> {
        let form = reqwest::blocking::multipart::Form::new()
            .text("user_id", user_id.to_string())
            .file("file", file)
            .with_context(|| format!("Failed to read resume file: {}", file.display()))?;

        let response = self
            .client
            .post(self.url("/upload_resume"))
            .multipart(form)
            .send()
            .context("Failed to upload resume")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().unwrap_or_default();
            return Err(anyhow!("Resume upload failed with status {}: {}", status, error_text));
        }

        response.json().context("Failed to parse upload response")
    }

    pub fn list_jobs(
        &self,
        query: Option<&str>,
        location: Option<&str>,
        limit: u32,
        skip: u32,
    ) -> Result<Vec<JobListing>> {
        let mut params: Vec<(&str, String)> =
            vec![("limit", limit.to_string()), ("skip", skip.to_string())];
        if let Some(q) = query.filter(|q| !q.is_empty()) {
            params.push(("q", q.to_string()));
        }
        if let Some(loc) = location.filter(|l| !l.is_empty()) {
            params.push(("location", loc.to_string()));
        }

        let response = self
            .client
            .get(self.url("/jobs"))
            .query(&params)
            .send()
            .context("Failed to fetch job listings")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().unwrap_or_default();
            return Err(anyhow!("Job search failed with status {}: {}", status, error_text));
        }

        response.json().context("Failed to parse job listings")
    }

    /// Raw body of the match list for a resume. Decoding is left to the
    /// caller so one bad record can be dropped without losing the rest.
    pub fn fetch_matches(&self, resume_id: &str) -> Result<String, FetchError> {
        let url = self.url(&format!("/matches/{resume_id}"));
        debug!("GET {url}");
        let response = self.client.get(&url).send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            warn!("Match request for resume {resume_id} returned {status}");
            return Err(FetchError::Rejected { status: status.as_u16(), body });
        }

        Ok(response.text()?)
    }
}

fn read_identity(response: reqwest::blocking::Response, action: &str) -> Result<Identity> {
    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().unwrap_or_default();
        return Err(anyhow!("{} failed with status {}: {}", action, status, error_text));
    }
    let body: IdentityResponse = response
        .json()
        .with_context(|| format!("Failed to parse {} response", action.to_lowercase()))?;
    Ok(Identity {
        id: body.id,
        full_name: body.full_name,
        email: body.email,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_for(url: &str) -> ApiClient {
        let config = Config {
            api_url: url.to_string(),
            ..Config::default()
        };
        ApiClient::new(&config).unwrap()
    }

    #[test]
    fn test_url_joining() {
        let client = client_for("http://localhost:8000/");
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(client.url("/matches/abc"), "http://localhost:8000/matches/abc");
        assert_eq!(client.url("jobs"), "http://localhost:8000/jobs");
    }

    #[test]
    fn test_upload_response_defaults_skills() {
        let body = r#"{"id": "651a", "filename": "cv.pdf"}"#;
        let uploaded: UploadedResume = serde_json::from_str(body).unwrap();
        assert_eq!(uploaded.id, "651a");
        assert!(uploaded.skills_detected.is_empty());
    }

    #[test]
    fn test_job_listing_tolerates_missing_fields() {
        let body = r#"[{"_id": "1", "title": "Data Engineer", "company": "Tech Corp",
                        "location": "Remote", "skills_required": ["python"], "url": null},
                       {"title": "Analyst"}]"#;
        let jobs: Vec<JobListing> = serde_json::from_str(body).unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].id.as_deref(), Some("1"));
        assert!(jobs[1].company.is_empty());
        assert!(jobs[1].skills_required.is_empty());
    }

    #[test]
    #[ignore] // needs a running matching service
    fn test_fetch_matches_live() {
        let client = client_for("http://localhost:8000");
        let result = client.fetch_matches("000000000000000000000000");
        assert!(result.is_ok() || result.is_err());
    }
}
