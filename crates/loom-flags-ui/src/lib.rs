// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Loom feature flags for component-tree UIs.
//!
//! A [`FlagProvider`] owns one [`FlagClient`] for a subtree and publishes a
//! [`FlagContextValue`] into a [`FlagContext`]. Accessor hooks read that
//! context, subscribe to the client events they care about and expose the
//! result as a [`StateSlot`] the host re-renders from.
//!
//! | hook | value |
//! |---|---|
//! | [`use_flags_status`] | [`FlagsStatus`] |
//! | [`use_flag`] | `bool` |
//! | [`use_variant`] | [`Variant`] |
//! | [`use_flags`] | `Vec<Toggle>` |
//! | [`use_update_context`] | [`UpdateContext`] |
//! | [`use_flag_client`] | `Rc<dyn FlagClient>` |
//!
//! Hooks used outside a provider log a diagnostic and return safe defaults.
//!
//! # Example
//!
//! ```
//! use loom_flags::{ClientConfig, Toggle};
//! use loom_flags_ui::{use_flag, use_flags_status, FlagProvider, ProviderProps};
//!
//! let config = ClientConfig::new("https://flags.example.com/proxy", "proxy-secret", "web")
//!     .with_bootstrap(vec![Toggle::new("checkout.new_flow", true)])
//!     .with_disable_refresh(true);
//! let provider = FlagProvider::new(ProviderProps::new().with_config(config));
//!
//! provider.render();
//! let context = provider.context();
//! let new_flow = use_flag(&context, "checkout.new_flow");
//! let status = use_flags_status(&context);
//! provider.mount();
//! provider.scheduler().run_until_idle();
//!
//! assert!(new_flow.get());
//! assert!(status.get().flags_ready);
//! ```

mod context;
mod hooks;
mod provider;
mod scheduler;
mod state;

pub use context::{use_flag_context, DetachedClient, FlagContext, FlagContextValue};
pub use hooks::{
	same_variant, use_flag, use_flag_client, use_flags, use_flags_status, use_update_context,
	use_variant, FlagHook, FlagsHook, FlagsStatus, FlagsStatusHook, UpdateContext, VariantHook,
};
pub use provider::{default_client_factory, ClientFactory, FlagProvider, ProviderProps};
pub use scheduler::{Scheduler, TaskHandle};
pub use state::{Latest, StateSlot, Subscription};

pub use loom_flags::{FlagClient, FlagsError};
pub use loom_flags_core::{Toggle, Variant};
