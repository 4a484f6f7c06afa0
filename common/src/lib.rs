// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Common Modul for the locator
//!
//! Provides the common data types that are used across every modul.

pub mod fix;
pub mod position;
pub mod provider;
pub mod serde;
pub mod test_helper;
