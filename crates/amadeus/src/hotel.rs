use std::collections::BTreeMap;
use std::fmt::{self, Display, Write as _};

use serde::Deserialize;

/// A hotel as listed by the hotel list endpoints.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotel {
    /// Amadeus property code, e.g. `TELONMFS`.
    #[serde(default)]
    pub hotel_id: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Postal address.
    #[serde(default)]
    pub address: Address,
}

/// Postal address of a hotel.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    /// Street lines.
    #[serde(default)]
    pub lines: Vec<String>,
    /// City name.
    #[serde(default)]
    pub city_name: String,
    /// ISO country code.
    #[serde(default)]
    pub country_code: String,
}

impl Hotel {
    /// Renders `ID:{id} - {name} - {address lines} - {city}, {country}`.
    pub fn summary_line(&self) -> String {
        format!(
            "ID:{} - {} - {} - {}, {}",
            self.hotel_id.as_deref().unwrap_or("Unknown"),
            self.name.as_deref().unwrap_or("Unknown"),
            self.address.lines.join(", "),
            self.address.city_name,
            self.address.country_code,
        )
    }
}

/// Renders one [`Hotel::summary_line`] per hotel, each ending with a
/// newline.
pub fn format_hotel_list(hotels: &[Hotel]) -> String {
    hotels.iter().fold(String::new(), |mut out, hotel| {
        out.push_str(&hotel.summary_line());
        out.push('\n');
        out
    })
}

/// Review-based scores of a hotel.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelSentiment {
    /// Amadeus property code.
    #[serde(default)]
    pub hotel_id: Option<String>,
    /// Overall score out of 100.
    #[serde(default)]
    pub overall_rating: Option<u32>,
    /// Number of reviews the scores are based on.
    #[serde(default)]
    pub number_of_reviews: Option<u32>,
    /// Number of ratings the scores are based on.
    #[serde(default)]
    pub number_of_ratings: Option<u32>,
    /// Per-category scores out of 100, keyed by category.
    #[serde(default)]
    pub sentiments: BTreeMap<String, u32>,
}

struct OrUnknown<'a, T>(&'a Option<T>);

impl<T: Display> Display for OrUnknown<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(value) => value.fmt(f),
            None => f.write_str("Unknown"),
        }
    }
}

impl Display for HotelSentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        writeln!(out, "Hotel ID: {}", OrUnknown(&self.hotel_id))?;
        writeln!(out, "Overall Rating: {}/100", OrUnknown(&self.overall_rating))?;
        writeln!(out, "Number of Reviews: {}", OrUnknown(&self.number_of_reviews))?;
        writeln!(out, "Number of Ratings: {}", OrUnknown(&self.number_of_ratings))?;
        out.push_str("\nSentiment Scores:\n");
        for (category, score) in &self.sentiments {
            writeln!(out, "  - {category}: {score}/100")?;
        }
        f.write_str(&out)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_summary_line() {
        let hotel: Hotel = serde_json::from_value(json!({
            "chainCode": "RT",
            "name": "IBIS SHINJUKU",
            "hotelId": "RTTYOSHI",
            "geoCode": { "latitude": 35.69, "longitude": 139.70 },
            "address": {
                "lines": ["7-10-5 NISHISHINJUKU", "SHINJUKU-KU"],
                "cityName": "TOKYO",
                "countryCode": "JP"
            }
        }))
        .unwrap();
        assert_eq!(
            hotel.summary_line(),
            "ID:RTTYOSHI - IBIS SHINJUKU - 7-10-5 NISHISHINJUKU, SHINJUKU-KU - TOKYO, JP"
        );
    }

    #[test]
    fn test_missing_fields() {
        let hotel: Hotel = serde_json::from_value(json!({})).unwrap();
        assert_eq!(hotel.summary_line(), "ID:Unknown - Unknown -  - , ");

        let list = format_hotel_list(&[hotel.clone(), hotel]);
        assert_eq!(list.lines().count(), 2);
        assert!(list.ends_with('\n'));
        assert_eq!(format_hotel_list(&[]), "");
    }

    #[test]
    fn test_sentiment_display() {
        let sentiment: HotelSentiment = serde_json::from_value(json!({
            "type": "hotelSentiment",
            "hotelId": "TELONMFS",
            "overallRating": 81,
            "numberOfReviews": 2667,
            "numberOfRatings": 2667,
            "sentiments": {
                "sleepQuality": 78,
                "location": 89,
                "staff": 89
            }
        }))
        .unwrap();
        assert_eq!(
            sentiment.to_string(),
            "Hotel ID: TELONMFS\n\
             Overall Rating: 81/100\n\
             Number of Reviews: 2667\n\
             Number of Ratings: 2667\n\
             \n\
             Sentiment Scores:\n  - location: 89/100\n  - sleepQuality: 78/100\n  - staff: 89/100\n"
        );

        let partial: HotelSentiment =
            serde_json::from_value(json!({ "hotelId": "X" })).unwrap();
        assert!(partial.to_string().contains("Overall Rating: Unknown/100\n"));
    }
}
