use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::{AmadeusConfig, AmadeusError, Hotel, HotelSentiment};

const TOKEN_PATH: &str = "/v1/security/oauth2/token";
const BY_GEOCODE_PATH: &str = "/v1/reference-data/locations/hotels/by-geocode";
const BY_CITY_PATH: &str = "/v1/reference-data/locations/hotels/by-city";
const SENTIMENTS_PATH: &str = "/v2/e-reputation/hotel-sentiments";

const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(30);
const DEFAULT_TOKEN_LIFETIME: u64 = 1799;
const MAX_ERROR_BODY: usize = 512;

/// Center and radius of a hotel search.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoQuery {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Search radius in kilometers.
    pub radius_km: u32,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Deserialize)]
struct DataEnvelope<T> {
    #[serde(default)]
    data: Vec<T>,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Client for the Amadeus hotel APIs.
///
/// Access tokens are fetched with the client-credentials grant and reused
/// until shortly before they expire. Clones share the token cache.
#[derive(Clone)]
pub struct AmadeusClient {
    http: Client,
    config: Arc<AmadeusConfig>,
    token: Arc<Mutex<Option<CachedToken>>>,
}

impl AmadeusClient {
    /// Creates a client with the given configuration.
    pub fn new(config: AmadeusConfig) -> Self {
        Self {
            http: Client::new(),
            config: Arc::new(config),
            token: Default::default(),
        }
    }

    /// Returns a valid access token, requesting a new one if needed.
    pub async fn access_token(&self) -> Result<String, AmadeusError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() + TOKEN_REFRESH_MARGIN < token.expires_at {
                return Ok(token.value.clone());
            }
            debug!("access token is about to expire");
        }

        let resp = self
            .http
            .post(format!("{}{TOKEN_PATH}", self.config.base_url))
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
            ])
            .send()
            .await?;
        let token: TokenResponse = decode(resp).await?;
        let lifetime = token.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME);
        debug!("got an access token valid for {lifetime}s");

        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + Duration::from_secs(lifetime),
        });
        Ok(token.access_token)
    }

    /// Lists hotels within `radius_km` of a point.
    pub async fn hotels_by_geocode(
        &self,
        query: GeoQuery,
    ) -> Result<Vec<Hotel>, AmadeusError> {
        let params = [
            ("latitude", query.latitude.to_string()),
            ("longitude", query.longitude.to_string()),
            ("radius", query.radius_km.to_string()),
            ("radiusUnit", "KM".to_owned()),
            ("hotelSource", "ALL".to_owned()),
        ];
        let envelope: DataEnvelope<Hotel> =
            self.get(BY_GEOCODE_PATH, &params).await?;
        debug!("{} hotels near {query:?}", envelope.data.len());
        Ok(envelope.data)
    }

    /// Lists hotels of a city by its IATA code, e.g. `PAR`.
    pub async fn hotels_by_city(
        &self,
        city_code: &str,
        radius_km: u32,
    ) -> Result<Vec<Hotel>, AmadeusError> {
        let params = [
            ("cityCode", city_code.to_owned()),
            ("radius", radius_km.to_string()),
            ("radiusUnit", "KM".to_owned()),
            ("hotelSource", "ALL".to_owned()),
        ];
        let envelope: DataEnvelope<Hotel> =
            self.get(BY_CITY_PATH, &params).await?;
        debug!("{} hotels in {city_code}", envelope.data.len());
        Ok(envelope.data)
    }

    /// Fetches review scores of a hotel. Returns `None` when the API has
    /// no data for it.
    pub async fn hotel_sentiment(
        &self,
        hotel_id: &str,
    ) -> Result<Option<HotelSentiment>, AmadeusError> {
        let params = [("hotelIds", hotel_id.to_owned())];
        let envelope: DataEnvelope<HotelSentiment> =
            self.get(SENTIMENTS_PATH, &params).await?;
        Ok(envelope.data.into_iter().next())
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, AmadeusError> {
        let request = |token: &str| {
            self.http
                .get(format!("{}{path}", self.config.base_url))
                .bearer_auth(token)
                .query(params)
        };

        let token = self.access_token().await?;
        let resp = send(request(&token)).await?;
        if resp.status() != StatusCode::UNAUTHORIZED {
            return decode(resp).await;
        }

        // The token may have been revoked before its expiry.
        warn!("token rejected by {path}, refreshing");
        self.token.lock().await.take();
        let token = self.access_token().await?;
        decode(send(request(&token)).await?).await
    }
}

async fn send(request: RequestBuilder) -> Result<Response, AmadeusError> {
    Ok(request.send().await?)
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, AmadeusError> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        let body = if body.len() > MAX_ERROR_BODY {
            let truncated: String = body.chars().take(MAX_ERROR_BODY).collect();
            format!("{truncated}... [truncated]")
        } else {
            body
        };
        return Err(AmadeusError::Status { status, body });
    }
    trace!("response body: {body}");
    Ok(serde_json::from_str(&body)?)
}
