pub mod catalog;
pub mod forecast;
pub mod matcher;
pub mod openweather;
pub mod sheet;
pub mod snapshot;
pub mod usage;
pub mod wind;
