pub mod auth;
pub mod rest;
