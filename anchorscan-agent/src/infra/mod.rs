pub mod api_client;
pub mod identity_file;
pub mod operator;
pub mod radio_bridge;
pub mod status_log;
