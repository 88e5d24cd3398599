pub mod activity_log;
pub mod employee;
pub mod menu;
pub mod menu_permission;
pub mod permission;
pub mod role_permission;
pub mod user;
