//! A small client for the Amadeus self-service travel APIs.
//!
//! Only the endpoints the hotel tools need are covered: the OAuth2
//! client-credentials token, hotel lists by geocode or city, and hotel
//! sentiment scores.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod client;
mod config;
mod error;
mod hotel;

pub use client::{AmadeusClient, GeoQuery};
pub use config::AmadeusConfig;
pub use error::AmadeusError;
pub use hotel::{Address, Hotel, HotelSentiment, format_hotel_list};
