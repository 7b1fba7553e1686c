pub mod config;
pub mod weather_client;
