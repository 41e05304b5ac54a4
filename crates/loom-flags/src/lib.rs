// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Feature flags client handle for Loom.
//!
//! This crate defines the [`FlagClient`] contract that UI integrations consume
//! and ships [`LocalFlagClient`], an in-process implementation that evaluates
//! against an in-memory toggle snapshot.
//!
//! # Features
//!
//! - **Lifecycle events**: `ready`, `error`, `recovered` and `update`, with
//!   identity-based `on`/`off`
//! - **Bootstrap**: authoritative snapshots supplied at construction
//! - **Pluggable sources**: snapshots fetched through a [`ToggleSource`]
//! - **Storage**: the last applied snapshot persisted through a [`StorageProvider`]
//! - **Offline mode**: [`ClientConfig::offline`] never leaves the process
//!
//! # Example
//!
//! ```
//! use loom_flags::{ClientConfig, ClientEvent, EventHandler, FlagClient, LocalFlagClient};
//! use loom_flags_core::Toggle;
//!
//! let config = ClientConfig::new("https://flags.example.com/proxy", "proxy-secret", "web")
//!     .with_bootstrap(vec![Toggle::new("checkout.new_flow", true)]);
//! let client = LocalFlagClient::new(config);
//!
//! let on_ready = EventHandler::new(|_| println!("flags ready"));
//! client.on(ClientEvent::Ready, on_ready.clone()).unwrap();
//! client.start();
//!
//! assert!(client.is_enabled("checkout.new_flow"));
//! client.off(ClientEvent::Ready, &on_ready);
//! client.stop();
//! ```

mod client;
mod config;
mod error;
mod event;
mod local;
mod source;
mod storage;

pub use client::FlagClient;
pub use config::{ClientConfig, DEFAULT_REFRESH_INTERVAL_SECS};
pub use error::{FlagsError, Result};
pub use event::{ClientEvent, EventHandler, EventPayload, HandlerRegistry};
pub use local::LocalFlagClient;
pub use source::ToggleSource;
pub use storage::{InMemoryStorageProvider, StorageProvider, TOGGLES_KEY};

// Re-export core types for convenience
pub use loom_flags_core::{EvaluationContext, Toggle, Variant, VariantPayload};
