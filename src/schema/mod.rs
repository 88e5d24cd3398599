pub mod auth;
pub mod common;
pub mod employee;
pub mod health;
pub mod menu;
pub mod permission;
pub mod user;
