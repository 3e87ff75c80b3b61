//! Unified pricing rules for ad slots.
//!
//! This crate resolves a price rule (a floor price plus metadata) for every ad
//! placement of a page and writes it as ad server targeting. Rules come from
//! one of three providers and the main-cohort rule can be overridden with a
//! floor derived from recent winning bids.
//!
//! # Modules
//!
//! - [`ad_unit_path`]: `{variable}` substitution in ad unit paths
//! - [`constants`]: Targeting keys, CPM bounds and the retry budget
//! - [`error`]: Error types and error handling utilities
//! - [`floor_price`]: Dynamic floor price strategies
//! - [`remote_config`]: Price rule endpoint client with bounded retries
//! - [`service`]: Provider selection, single-flight rule cache and targeting
//! - [`settings`]: Configuration management and validation
//! - [`slot`]: Ad slot, page targeting and auction history collaborators
//! - [`test_support`]: Testing utilities and mocks
//! - [`types`]: Price rule data model

pub mod ad_unit_path;
pub mod constants;
pub mod error;
pub mod floor_price;
pub mod remote_config;
pub mod service;
pub mod settings;
pub mod slot;
pub mod test_support;
pub mod types;
