//! Browser terminal server library.
//! This crate exposes internal modules for integration testing.
//! The binary entry point is in main.rs.

pub mod auth;
pub mod command;
pub mod config;
pub mod db;
pub mod error;
pub mod proto;
pub mod rooms;
pub mod routes;
pub mod session;
pub mod state;
pub mod ws;
