pub mod employee;
pub mod menu;
pub mod permission;
pub mod user;
