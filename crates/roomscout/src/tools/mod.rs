//! A set of built-in tools that models can use.

mod arithmetic;
mod geo_search;
mod hotel_directory;
mod rating;

pub use arithmetic::{MultiplyTool, SumPlusOneTool};
pub use geo_search::FindHotelsByCoordsTool;
pub use hotel_directory::{DescribeHotelTool, FindHotelsByCityTool};
pub use rating::HotelRatingTool;
