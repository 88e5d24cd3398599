pub mod activity_log;
pub mod db;
pub mod error;
pub mod menu_tree;
pub mod permission_cache;
pub mod permission_gate;
pub mod photo_storage;
pub mod security;
pub mod session;
pub mod sqlx_utils;
pub mod test_utils;
pub mod upload_limit;
pub mod utils;
