use roomscout_amadeus::AmadeusClient;
use roomscout_core::tool::{Error as ToolError, Tool, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;

/// Input of [`HotelRatingTool`].
#[derive(Deserialize, JsonSchema)]
pub struct HotelRatingParameters {
    #[schemars(
        description = "The hotel ID returned by `find_hotels_by_coords`."
    )]
    hotel_id: String,
}

/// Fetches review scores of a hotel.
pub struct HotelRatingTool {
    client: AmadeusClient,
    parameter_schema: Value,
}

impl HotelRatingTool {
    /// Creates a new rating tool.
    #[inline]
    pub fn new(client: AmadeusClient) -> Self {
        Self {
            client,
            parameter_schema: schema_for!(HotelRatingParameters).to_value(),
        }
    }
}

impl Tool for HotelRatingTool {
    type Input = HotelRatingParameters;

    fn name(&self) -> &str {
        "hotel_rating"
    }

    fn description(&self) -> &str {
        "Returns the overall rating and per-category review scores of a hotel."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn execute(
        &self,
        input: HotelRatingParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let client = self.client.clone();
        async move {
            let hotel_id = input.hotel_id.trim();
            if hotel_id.is_empty() {
                return Err(ToolError::invalid_input()
                    .with_reason("`hotel_id` must not be empty"));
            }
            let sentiment =
                client.hotel_sentiment(hotel_id).await.map_err(|err| {
                    ToolError::execution_error().with_reason(err.to_string())
                })?;
            Ok(match sentiment {
                Some(sentiment) => sentiment.to_string(),
                None => {
                    format!("No rating information found for hotel ID: {hotel_id}")
                }
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use roomscout_amadeus::AmadeusConfig;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const SENTIMENTS_PATH: &str = "/v2/e-reputation/hotel-sentiments";

    async fn setup() -> (MockServer, HotelRatingTool) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/security/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "token-1",
                "expires_in": 1799
            })))
            .expect(1)
            .mount(&server)
            .await;
        let config =
            AmadeusConfig::new("key", "secret").with_base_url(server.uri());
        let tool = HotelRatingTool::new(AmadeusClient::new(config));
        (server, tool)
    }

    fn params(hotel_id: &str) -> HotelRatingParameters {
        HotelRatingParameters {
            hotel_id: hotel_id.to_owned(),
        }
    }

    #[tokio::test]
    async fn test_rating() {
        let (server, tool) = setup().await;
        Mock::given(method("GET"))
            .and(path(SENTIMENTS_PATH))
            .and(query_param("hotelIds", "TELONMFS"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{
                    "hotelId": "TELONMFS",
                    "overallRating": 81,
                    "numberOfReviews": 2667,
                    "numberOfRatings": 2666,
                    "sentiments": { "staff": 89, "location": 92 }
                }]
            })))
            .mount(&server)
            .await;

        let output = tool.execute(params("TELONMFS")).await.unwrap();
        assert_eq!(
            output,
            "Hotel ID: TELONMFS\n\
             Overall Rating: 81/100\n\
             Number of Reviews: 2667\n\
             Number of Ratings: 2666\n\
             \n\
             Sentiment Scores:\n  - location: 92/100\n  - staff: 89/100\n"
        );
    }

    #[tokio::test]
    async fn test_no_rating() {
        let (server, tool) = setup().await;
        Mock::given(method("GET"))
            .and(path(SENTIMENTS_PATH))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "data": [] })),
            )
            .mount(&server)
            .await;

        let output = tool.execute(params(" XKPARC12 ")).await.unwrap();
        assert_eq!(output, "No rating information found for hotel ID: XKPARC12");
    }
}
