pub mod auth;
pub mod complaints;
pub mod error;
pub mod lifecycle;
pub mod middleware;
pub mod uploads;
pub mod verifications;
