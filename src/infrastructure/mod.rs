pub mod config;
pub mod jwks;
pub mod telemetry;

pub use jwks::{DefaultJwksFetcher, JwksFetcher, JwksKeyResolver};
