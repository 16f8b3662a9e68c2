use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use regex::Regex;
use reqwest::header::{HeaderMap, LINK};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::{debug, error, info, warn};
use url::Url;

use super::types::{ItemsPage, SitesResponse, TokenResponse};
use super::{
    AccessToken, HostDetails, Person, ProviderError, Recording, RecordingDetails,
    RecordingPeriod, RecordingProvider, Site,
};
use crate::config::WebexConfig;

const PEOPLE_PAGE_SIZE: &str = "100";

pub struct WebexClient {
    client: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl WebexClient {
    pub fn new(config: &WebexConfig) -> Self {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        info!("Initialized Webex client with base URL: {}", base_url);

        Self {
            client: reqwest::Client::new(),
            base_url,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ProviderError> {
        let mut url =
            Url::parse(&self.base_url).map_err(|e| ProviderError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ProviderError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GETs one page and returns its body plus the next page URL, if any.
    async fn get_page(
        &self,
        token: &AccessToken,
        url: Url,
    ) -> Result<(String, Option<Url>), ProviderError> {
        let endpoint = endpoint_name(&url);
        let response = self
            .client
            .get(url)
            .bearer_auth(token.secret())
            .send()
            .await
            .map_err(|source| ProviderError::Transport {
                endpoint: endpoint.clone(),
                source,
            })?;

        let status = response.status();
        let next = next_page_url(response.headers());
        let body = response
            .text()
            .await
            .map_err(|source| ProviderError::Transport {
                endpoint: endpoint.clone(),
                source,
            })?;

        if !status.is_success() {
            error!("Webex {} failed with status {}: {}", endpoint, status, body);
            return Err(ProviderError::Status {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }

        Ok((body, next))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        token: &AccessToken,
        url: Url,
    ) -> Result<T, ProviderError> {
        let endpoint = endpoint_name(&url);
        let (body, _) = self.get_page(token, url).await?;
        decode(&endpoint, &body)
    }

    /// Drains every page of an `items` listing, starting from `first`.
    /// Stops when a `next` link points back at a page already read.
    async fn collect_items<T: DeserializeOwned>(
        &self,
        token: &AccessToken,
        first: Url,
        first_body: Option<(String, Option<Url>)>,
    ) -> Result<Vec<T>, ProviderError> {
        let endpoint = endpoint_name(&first);
        let mut items = Vec::new();
        let (mut body, mut next) = match first_body {
            Some(page) => page,
            None => self.get_page(token, first.clone()).await?,
        };
        let mut visited = HashSet::from([first]);

        loop {
            let page: ItemsPage<T> = decode(&endpoint, &body)?;
            items.extend(page.items);

            let Some(url) = next else { break };
            if !self.is_api_origin(&url) {
                error!("Refusing {} pagination link outside the API: {}", endpoint, url);
                return Err(ProviderError::InvalidUrl(format!(
                    "pagination link {url} is outside {}",
                    self.base_url
                )));
            }
            if !visited.insert(url.clone()) {
                warn!("{} pagination revisits {}, stopping", endpoint, url);
                break;
            }

            debug!("Following {} pagination to {}", endpoint, url);
            (body, next) = self.get_page(token, url).await?;
        }

        Ok(items)
    }

    /// The bearer token only goes to the configured API host.
    fn is_api_origin(&self, url: &Url) -> bool {
        Url::parse(&self.base_url).is_ok_and(|base| base.origin() == url.origin())
    }
}

#[async_trait]
impl RecordingProvider for WebexClient {
    async fn exchange_code(&self, code: &str) -> Result<AccessToken, ProviderError> {
        let url = self.endpoint(&["access_token"])?;
        let endpoint = endpoint_name(&url);

        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];

        let response = self
            .client
            .post(url)
            .form(&params)
            .send()
            .await
            .map_err(|source| ProviderError::Transport {
                endpoint: endpoint.clone(),
                source,
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| ProviderError::Transport {
                endpoint: endpoint.clone(),
                source,
            })?;

        if !status.is_success() {
            error!("Webex token exchange failed with status {}: {}", status, body);
            return Err(ProviderError::Status {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = decode(&endpoint, &body)?;
        let value = token
            .access_token
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ProviderError::MissingField {
                endpoint: endpoint.clone(),
                field: "access_token",
            })?;

        info!("Obtained Webex access token (expires in {:?}s)", token.expires_in);
        Ok(match token.expires_in {
            Some(expires_in) => AccessToken::expiring(value, Utc::now(), expires_in),
            None => AccessToken::new(value),
        })
    }

    async fn list_sites(&self, token: &AccessToken) -> Result<Vec<Site>, ProviderError> {
        let url = self.endpoint(&["meetingPreferences", "sites"])?;
        let response: SitesResponse = self.get_json(token, url).await?;
        debug!("Listed {} site(s)", response.sites.len());
        Ok(response.sites)
    }

    async fn list_people(&self, token: &AccessToken) -> Result<Vec<Person>, ProviderError> {
        let mut url = self.endpoint(&["people"])?;
        url.query_pairs_mut().append_pair("max", PEOPLE_PAGE_SIZE);

        let people: Vec<Person> = self.collect_items(token, url, None).await?;
        info!("Retrieved {} people from the directory", people.len());
        Ok(people)
    }

    async fn host_details(
        &self,
        token: &AccessToken,
        person_id: &str,
    ) -> Result<HostDetails, ProviderError> {
        let url = self.endpoint(&["people", person_id])?;
        let details: HostDetails = self.get_json(token, url).await?;
        debug!("Got host emails for {}: {:?}", person_id, details.emails);
        Ok(details)
    }

    async fn list_recordings(
        &self,
        token: &AccessToken,
        period: &RecordingPeriod,
        site_url: &str,
        host_email: &str,
    ) -> Result<Vec<Recording>, ProviderError> {
        let mut url = self.endpoint(&["recordings"])?;
        url.query_pairs_mut()
            .append_pair("from", &period.query_from())
            .append_pair("to", &period.query_to())
            .append_pair("siteUrl", site_url)
            .append_pair("hostEmail", host_email);

        let first_page = match self.get_page(token, url.clone()).await {
            Ok(page) => page,
            Err(ProviderError::Status { status, .. })
                if status == StatusCode::UNAUTHORIZED.as_u16() =>
            {
                warn!("Unauthorized to list recordings of {}, skipping", host_email);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let mut recordings: Vec<Recording> =
            self.collect_items(token, url, Some(first_page)).await?;
        for recording in &mut recordings {
            if recording.host_email.is_empty() {
                recording.host_email = host_email.to_string();
            }
        }

        debug!("Listed {} recording(s) for {}", recordings.len(), host_email);
        Ok(recordings)
    }

    async fn recording_details(
        &self,
        token: &AccessToken,
        recording_id: &str,
        host_email: &str,
    ) -> Result<RecordingDetails, ProviderError> {
        let mut url = self.endpoint(&["recordings", recording_id])?;
        url.query_pairs_mut().append_pair("hostEmail", host_email);
        self.get_json(token, url).await
    }

    async fn download(&self, url: &str) -> Result<Bytes, ProviderError> {
        let endpoint = "recording download".to_string();
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| ProviderError::Transport {
                endpoint: endpoint.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }

        response
            .bytes()
            .await
            .map_err(|source| ProviderError::Transport { endpoint, source })
    }

    async fn delete_recording(
        &self,
        token: &AccessToken,
        recording_id: &str,
        host_email: &str,
    ) -> bool {
        let mut url = match self.endpoint(&["recordings", recording_id]) {
            Ok(url) => url,
            Err(e) => {
                error!("Cannot build delete URL for {}: {}", recording_id, e);
                return false;
            }
        };
        url.query_pairs_mut().append_pair("hostEmail", host_email);

        match self
            .client
            .delete(url)
            .bearer_auth(token.secret())
            .send()
            .await
        {
            Ok(response) => {
                let status = response.status();
                debug!("Delete recording {} responded {}", recording_id, status);
                status.is_success()
            }
            Err(e) => {
                error!("Delete recording {} failed: {}", recording_id, e);
                false
            }
        }
    }
}

fn endpoint_name(url: &Url) -> String {
    url.path().to_string()
}

fn decode<T: DeserializeOwned>(endpoint: &str, body: &str) -> Result<T, ProviderError> {
    serde_json::from_str(body).map_err(|e| ProviderError::Decode {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })
}

fn link_regex() -> &'static Regex {
    static LINK_NEXT: OnceLock<Regex> = OnceLock::new();
    LINK_NEXT.get_or_init(|| {
        Regex::new(r#"<([^>]+)>\s*;\s*rel="?next"?"#).expect("valid Link header regex")
    })
}

/// Extracts the `rel="next"` target of an RFC 5988 `Link` header.
pub fn next_link(link_header: &str) -> Option<&str> {
    link_header
        .split(',')
        .find_map(|part| link_regex().captures(part.trim()))
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
}

fn next_page_url(headers: &HeaderMap) -> Option<Url> {
    let link = headers.get(LINK)?.to_str().ok()?;
    next_link(link).and_then(|target| Url::parse(target).ok())
}
