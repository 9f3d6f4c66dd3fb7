use std::future::ready;

use roomscout_core::tool::{Tool, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;

const HOTELS: &[(&str, &[&str])] = &[
    ("Paris", &["Hotel A", "Hotel B", "Hotel C"]),
    ("New York", &["Hotel D", "Hotel E", "Hotel F"]),
    ("Tokyo", &["Hotel G", "Hotel H", "Hotel I"]),
];

const DESCRIPTIONS: &[(&str, &str)] = &[
    ("Hotel A", "A budget-friendly hotel with basic amenities."),
    ("Hotel B", "A mid-range hotel with comfortable rooms and free breakfast."),
    ("Hotel C", "A luxury hotel with a spa and fine dining."),
    ("Hotel D", "A budget hotel located in the heart of the city."),
    ("Hotel E", "A boutique hotel with unique decor and personalized service."),
    ("Hotel F", "A family-friendly hotel with a pool and play area."),
    ("Hotel G", "A modern hotel with stunning views of the city skyline."),
    ("Hotel H", "An eco-friendly hotel with sustainable practices."),
    ("Hotel I", "A traditional hotel with a rich history."),
];

pub(crate) const NO_HOTELS: &str = "No hotels found.";
const NO_DESCRIPTION: &str = "Hotel description not available.";

fn unquote(s: &str) -> &str {
    s.trim_matches(|c| matches!(c, '\'' | '"' | ' '))
}

/// Extracts the city from inputs like `Paris` or `"hotels in Tokyo"`.
fn city_of(input: &str) -> &str {
    let input = unquote(input);
    match input.rsplit_once(" in ") {
        Some((_, city)) => unquote(city),
        None => input,
    }
}

fn lookup_city(input: &str) -> Option<&'static [&'static str]> {
    let city = city_of(input);
    HOTELS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(city))
        .map(|(_, hotels)| *hotels)
}

fn lookup_description(hotel: &str) -> Option<&'static str> {
    let hotel = unquote(hotel);
    DESCRIPTIONS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(hotel))
        .map(|(_, description)| *description)
}

/// Input of [`FindHotelsByCityTool`].
#[derive(Deserialize, JsonSchema)]
pub struct FindHotelsByCityParameters {
    #[schemars(description = "The name of the city to find hotels in.")]
    city: String,
}

/// Lists the hotels of a city from the built-in directory.
pub struct FindHotelsByCityTool {
    parameter_schema: Value,
}

impl FindHotelsByCityTool {
    /// Creates a new city lookup tool.
    #[inline]
    pub fn new() -> Self {
        Self {
            parameter_schema: schema_for!(FindHotelsByCityParameters)
                .to_value(),
        }
    }
}

impl Default for FindHotelsByCityTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for FindHotelsByCityTool {
    type Input = FindHotelsByCityParameters;

    fn name(&self) -> &str {
        "find_hotels_by_city"
    }

    fn description(&self) -> &str {
        r#"
Returns the hotels of a city as a comma separated list.
Known cities are Paris, New York and Tokyo."#
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn execute(
        &self,
        input: FindHotelsByCityParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let output = match lookup_city(&input.city) {
            Some(hotels) => hotels.join(", "),
            None => {
                debug!("no hotels for {:?}", input.city);
                NO_HOTELS.to_owned()
            }
        };
        ready(Ok(output))
    }
}

/// Input of [`DescribeHotelTool`].
#[derive(Deserialize, JsonSchema)]
pub struct DescribeHotelParameters {
    #[schemars(description = "The hotel name, e.g. \"Hotel A\".")]
    hotel: String,
}

/// Describes a hotel from the built-in directory.
pub struct DescribeHotelTool {
    parameter_schema: Value,
}

impl DescribeHotelTool {
    /// Creates a new hotel description tool.
    #[inline]
    pub fn new() -> Self {
        Self {
            parameter_schema: schema_for!(DescribeHotelParameters).to_value(),
        }
    }
}

impl Default for DescribeHotelTool {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for DescribeHotelTool {
    type Input = DescribeHotelParameters;

    fn name(&self) -> &str {
        "describe_hotel"
    }

    fn description(&self) -> &str {
        "Returns a short description of a hotel."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn execute(
        &self,
        input: DescribeHotelParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let description =
            lookup_description(&input.hotel).unwrap_or(NO_DESCRIPTION);
        ready(Ok(description.to_owned()))
    }
}
