use async_trait::async_trait;
use reqwest::{header, Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use url::Url;

use super::VideoId;
use crate::config::HttpConfig;
use crate::transcribe::processor::{self, Json3Payload, PlayerResponse};
use crate::transcribe::{CaptionTrack, TitleSource, TranscriptEntry, TranscriptSource};
use crate::FetchError;

const WATCH_URL: &str = "https://www.youtube.com/watch";
const PLAYER_URL: &str = "https://www.youtube.com/youtubei/v1/player";
const OEMBED_URL: &str = "https://www.youtube.com/oembed";

/// Innertube client the player request identifies as
const INNERTUBE_CLIENT_NAME: &str = "ANDROID";
const INNERTUBE_CLIENT_VERSION: &str = "20.10.38";

const CONSENT_FORM_MARKER: &str = "action=\"https://consent.youtube.com/s\"";
const CONSENT_VALUE_MARKER: &str = "name=\"v\" value=";
const RECAPTCHA_MARKER: &str = "class=\"g-recaptcha\"";
const API_KEY_MARKER: &str = "\"INNERTUBE_API_KEY\":";

/// YouTube caption and title client over the public web endpoints
#[derive(Clone)]
pub struct YoutubeClient {
    client: Client,
    accept_language: String,
}

#[derive(Debug, Deserialize)]
struct OEmbed {
    title: String,
}

impl YoutubeClient {
    pub fn new(config: &HttpConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            accept_language: config.accept_language.clone(),
        })
    }

    /// Get the innertube API key from the watch page, accepting the EU
    /// consent interstitial once if it is shown
    async fn fetch_api_key(&self, video_id: &VideoId) -> Result<String, FetchError> {
        let html = self.get_watch_page(video_id, None).await?;
        let consent = match classify_watch_page(&html)? {
            WatchPage::Ready { api_key } => return Ok(api_key.to_string()),
            WatchPage::Consent { consent } => consent.to_string(),
        };

        tracing::debug!("Accepting YouTube consent form");
        let html = self
            .get_watch_page(video_id, Some(consent_cookie(&consent)))
            .await?;
        api_key_after_consent(&html).map(str::to_string)
    }

    async fn get_watch_page(
        &self,
        video_id: &VideoId,
        cookie: Option<String>,
    ) -> Result<String, FetchError> {
        tracing::debug!("Fetching watch page for: {}", video_id);

        let mut request = self
            .client
            .get(WATCH_URL)
            .query(&[("v", video_id.as_str())])
            .header(header::ACCEPT_LANGUAGE, &self.accept_language);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }

        let response = ensure_success(request.send().await?)?;
        Ok(response.text().await?)
    }

    /// Ask the innertube player endpoint for the video's caption metadata
    async fn fetch_player_response(&self, video_id: &VideoId) -> Result<PlayerResponse, FetchError> {
        let api_key = self.fetch_api_key(video_id).await?;

        let body = json!({
            "context": {
                "client": {
                    "clientName": INNERTUBE_CLIENT_NAME,
                    "clientVersion": INNERTUBE_CLIENT_VERSION,
                }
            },
            "videoId": video_id.as_str(),
        });

        tracing::debug!("Requesting player response for: {}", video_id);
        let response = self
            .client
            .post(PLAYER_URL)
            .query(&[("key", api_key.as_str())])
            .header(header::ACCEPT_LANGUAGE, &self.accept_language)
            .json(&body)
            .send()
            .await?;

        let response = ensure_success(response)?;
        response
            .json::<PlayerResponse>()
            .await
            .map_err(|e| FetchError::MalformedResponse(format!("player response: {e}")))
    }
}

#[async_trait]
impl TranscriptSource for YoutubeClient {
    async fn list_tracks(&self, video_id: &VideoId) -> Result<Vec<CaptionTrack>, FetchError> {
        let response = self.fetch_player_response(video_id).await?;
        processor::caption_tracks(video_id, response)
    }

    async fn fetch_track(&self, track: &CaptionTrack) -> Result<Vec<TranscriptEntry>, FetchError> {
        let url = json3_track_url(&track.base_url)?;
        tracing::debug!("Downloading {} caption track", track.language_code);

        let response = ensure_success(self.client.get(url).send().await?)?;
        let payload = response
            .json::<Json3Payload>()
            .await
            .map_err(|e| FetchError::MalformedResponse(format!("caption track: {e}")))?;

        Ok(processor::transcript_entries(payload))
    }
}

#[async_trait]
impl TitleSource for YoutubeClient {
    async fn fetch_title(&self, video_id: &VideoId) -> anyhow::Result<String> {
        let watch_url = video_id.watch_url();
        let response = self
            .client
            .get(OEMBED_URL)
            .query(&[("url", watch_url.as_str()), ("format", "json")])
            .send()
            .await?
            .error_for_status()?;

        let oembed: OEmbed = response.json().await?;
        Ok(oembed.title)
    }
}

/// Treat HTTP 429 as rate limiting and any other non-2xx as a transport error
fn ensure_success(response: Response) -> Result<Response, FetchError> {
    if response.status() == StatusCode::TOO_MANY_REQUESTS {
        return Err(FetchError::RateLimited);
    }
    Ok(response.error_for_status()?)
}

/// What a fetched watch page offers
#[derive(Debug, PartialEq, Eq)]
enum WatchPage<'a> {
    /// Regular page carrying the innertube API key
    Ready { api_key: &'a str },
    /// EU consent interstitial, `consent` is the form's `v` value
    Consent { consent: &'a str },
}

fn classify_watch_page(html: &str) -> Result<WatchPage<'_>, FetchError> {
    if html.contains(CONSENT_FORM_MARKER) {
        return quoted_value_after(html, CONSENT_VALUE_MARKER)
            .map(|consent| WatchPage::Consent { consent })
            .ok_or_else(|| {
                FetchError::MalformedResponse("consent form has no 'v' value".to_string())
            });
    }

    match quoted_value_after(html, API_KEY_MARKER) {
        Some(api_key) => Ok(WatchPage::Ready { api_key }),
        None if html.contains(RECAPTCHA_MARKER) => Err(FetchError::RateLimited),
        None => Err(FetchError::MalformedResponse(
            "watch page has no innertube API key".to_string(),
        )),
    }
}

/// API key from the page fetched with the consent cookie
fn api_key_after_consent(html: &str) -> Result<&str, FetchError> {
    match classify_watch_page(html)? {
        WatchPage::Ready { api_key } => Ok(api_key),
        WatchPage::Consent { .. } => Err(FetchError::MalformedResponse(
            "consent cookie was not accepted".to_string(),
        )),
    }
}

fn consent_cookie(consent: &str) -> String {
    format!("CONSENT=YES+{consent}")
}

/// Rewrite a caption track URL to request the `json3` format
fn json3_track_url(base_url: &str) -> Result<Url, FetchError> {
    let mut url = Url::parse(base_url)
        .map_err(|e| FetchError::MalformedResponse(format!("caption track URL: {e}")))?;

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "fmt")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(pairs)
        .append_pair("fmt", "json3");

    Ok(url)
}

/// Value of the first double-quoted string following `marker`
fn quoted_value_after<'a>(html: &'a str, marker: &str) -> Option<&'a str> {
    let start = html.find(marker)? + marker.len();
    let rest = html[start..].trim_start().strip_prefix('"')?;
    let end = rest.find('"')?;
    let value = &rest[..end];
    (!value.is_empty()).then_some(value)
}
