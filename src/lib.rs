//! mailsweep - An unsubscribe automation engine
//!
//! This crate finds promotional senders the user never reads, drives each
//! sender's unsubscribe flow through a narrow browser surface, and records
//! whether the attempt actually stopped the mail so future suggestions get
//! better over time.

pub mod automation;
pub mod config;
pub mod domain;
pub mod extract;
pub mod providers;
pub mod scoring;
pub mod services;
pub mod storage;

pub use config::Settings;
pub use services::{EffectivenessStore, LearningLoop};
