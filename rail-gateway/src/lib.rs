//! Rail running-information gateway.
//!
//! Serves National Rail Darwin boards and service details as JSON, adds
//! delay summaries on top, and answers conditional requests with 304s so
//! polling clients don't download unchanged boards.

pub mod checksum;
pub mod config;
pub mod darwin;
pub mod delays;
pub mod domain;
pub mod stations;
pub mod web;
