pub mod error;
pub mod health;
pub mod openapi;
pub mod report;

use actix_cors::Cors;

use crate::model::CorsConfig;

/// Build the CORS middleware from configuration
pub fn cors(config: &CorsConfig) -> Cors {
    if config.allows_any_origin() {
        return Cors::permissive();
    }

    config
        .allowed_origins
        .iter()
        .fold(
            Cors::default()
                .allow_any_method()
                .allow_any_header()
                .supports_credentials()
                .max_age(3600),
            |cors, origin| cors.allowed_origin(origin),
        )
}
