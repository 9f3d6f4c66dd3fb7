use roomscout_amadeus::{AmadeusClient, GeoQuery, format_hotel_list};
use roomscout_core::tool::{Error as ToolError, Tool, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;

use super::hotel_directory::NO_HOTELS;

/// Input of [`FindHotelsByCoordsTool`].
#[derive(Deserialize, JsonSchema)]
pub struct FindHotelsByCoordsParameters {
    #[schemars(
        description = "Coordinates of the location as [latitude, longitude]."
    )]
    coords: [f64; 2],
    #[schemars(description = "Search radius in kilometers.")]
    radius: u32,
}

impl FindHotelsByCoordsParameters {
    fn to_query(&self) -> Result<GeoQuery, ToolError> {
        let [latitude, longitude] = self.coords;
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(ToolError::invalid_input()
                .with_reason("latitude must be between -90 and 90"));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(ToolError::invalid_input()
                .with_reason("longitude must be between -180 and 180"));
        }
        if self.radius == 0 {
            return Err(ToolError::invalid_input()
                .with_reason("radius must be positive"));
        }
        Ok(GeoQuery {
            latitude,
            longitude,
            radius_km: self.radius,
        })
    }
}

/// Searches hotels around a point with the Amadeus hotel list API.
pub struct FindHotelsByCoordsTool {
    client: AmadeusClient,
    parameter_schema: Value,
}

impl FindHotelsByCoordsTool {
    /// Creates a new geo search tool.
    #[inline]
    pub fn new(client: AmadeusClient) -> Self {
        Self {
            client,
            parameter_schema: schema_for!(FindHotelsByCoordsParameters)
                .to_value(),
        }
    }
}

impl Tool for FindHotelsByCoordsTool {
    type Input = FindHotelsByCoordsParameters;

    fn name(&self) -> &str {
        "find_hotels_by_coords"
    }

    fn description(&self) -> &str {
        r#"
Returns the hotels within a radius of a location, one per line.
Each line starts with the hotel ID, which is used by other tools and should not be shown to the user."#
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn execute(
        &self,
        input: FindHotelsByCoordsParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let client = self.client.clone();
        async move {
            let query = input.to_query()?;
            let hotels = client.hotels_by_geocode(query).await.map_err(|err| {
                ToolError::execution_error().with_reason(err.to_string())
            })?;
            if hotels.is_empty() {
                return Ok(NO_HOTELS.to_owned());
            }
            Ok(format_hotel_list(&hotels))
        }
    }
}

#[cfg(test)]
mod tests {
    use roomscout_amadeus::AmadeusConfig;
    use roomscout_core::tool::ErrorKind;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn mock_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/security/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "token-1",
                "expires_in": 1799
            })))
            .mount(&server)
            .await;
        server
    }

    fn tool(server: &MockServer) -> FindHotelsByCoordsTool {
        let config = AmadeusConfig::new("key", "secret").with_base_url(server.uri());
        FindHotelsByCoordsTool::new(AmadeusClient::new(config))
    }

    fn params(coords: [f64; 2], radius: u32) -> FindHotelsByCoordsParameters {
        FindHotelsByCoordsParameters { coords, radius }
    }

    #[tokio::test]
    async fn test_search() {
        let server = mock_server().await;
        Mock::given(method("GET"))
            .and(path("/v1/reference-data/locations/hotels/by-geocode"))
            .and(query_param("latitude", "48.8566"))
            .and(query_param("radius", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{
                    "hotelId": "HNPARKGU",
                    "name": "TEST HOTEL PARIS",
                    "address": {
                        "lines": ["12 RUE DE RIVOLI"],
                        "cityName": "PARIS",
                        "countryCode": "FR"
                    }
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let output = tool(&server)
            .execute(params([48.8566, 2.3522], 5))
            .await
            .unwrap();
        assert_eq!(
            output,
            "ID:HNPARKGU - TEST HOTEL PARIS - 12 RUE DE RIVOLI - PARIS, FR\n"
        );
    }

    #[tokio::test]
    async fn test_no_hotels() {
        let server = mock_server().await;
        Mock::given(method("GET"))
            .and(path("/v1/reference-data/locations/hotels/by-geocode"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "data": [] })),
            )
            .mount(&server)
            .await;

        let output = tool(&server)
            .execute(params([35.68, 139.76], 1))
            .await
            .unwrap();
        assert_eq!(output, NO_HOTELS);
    }

    #[tokio::test]
    async fn test_invalid_coords() {
        let server = MockServer::start().await;
        let tool = tool(&server);

        let err = tool.execute(params([91.0, 0.0], 5)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        let err = tool.execute(params([0.0, -180.5], 5)).await.unwrap_err();
        assert_eq!(err.to_string(), "Error: longitude must be between -180 and 180");
        let err = tool.execute(params([0.0, 0.0], 0)).await.unwrap_err();
        assert_eq!(err.to_string(), "Error: radius must be positive");

        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_api_error() {
        let server = mock_server().await;
        Mock::given(method("GET"))
            .and(path("/v1/reference-data/locations/hotels/by-geocode"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = tool(&server)
            .execute(params([48.85, 2.35], 5))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExecutionError);
    }
}
