// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Provider session Modul for the locator
//!
//! Keeps exactly one subscription to the best available location provider,
//! remembers the latest fix and hands every new fix to a single consumer.
//! [`LocatorModule`] runs a session on the event bus.

pub mod config;
pub mod consumer;
pub mod error;
pub mod module;
pub mod session;

pub use config::SessionConfig;
pub use consumer::{FixConsumer, FixPublisher};
pub use error::SessionError;
pub use module::LocatorModule;
pub use session::{ProviderSession, SessionState};
