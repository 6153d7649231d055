// Infrastructure layer - External dependencies and adapters
pub mod chunked_json;
pub mod config;
pub mod file_store;
pub mod http_response;
pub mod http_source;
pub mod view_mapper;
