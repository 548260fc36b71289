pub mod artifact_source;
pub mod file_source;
pub mod http_source;
