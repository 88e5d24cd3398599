pub mod auth;
pub mod employee;
#[cfg(test)]
mod employee_test;
pub mod health;
pub mod menu;
pub mod permission;
pub mod user;
