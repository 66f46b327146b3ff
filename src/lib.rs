// Copyright 2026 factfetch contributors
// SPDX-License-Identifier: Apache-2.0

//! factfetch library — factsheet PDF acquisition for ISIN lists from a
//! jurisdiction-gated fund site.
//!
//! This library crate exposes the core modules for integration testing.

pub mod cli;
pub mod config;
pub mod download;
pub mod jurisdiction;
pub mod model;
pub mod orchestrator;
pub mod runlog;
pub mod session;
pub mod sink;
pub mod sources;
pub mod store;
