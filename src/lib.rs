//! Registration Saga - registration and payment orchestration
//!
//! Drives a user from a registration form through payment (mobile push or
//! hosted checkout) to a provisioned account, and lets them resume an
//! unfinished registration on another device through an emailed one-time
//! code.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
