//! Library exports for the library management service
//!
//! This module exposes internal components for testing and potential library usage.

pub mod auth;
pub mod database;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod model;
pub mod payment;
pub mod policy;
pub mod route;
