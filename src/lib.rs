pub mod app_config;
pub mod club;
pub mod db;
pub mod middleware;
pub mod orm;
pub mod permission;
pub mod search;
pub mod session;
pub mod user;
pub mod web;
