// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Max Wipfli <mail@maxwipfli.ch>

pub mod blocking;
pub mod dispatcher;
pub use dispatcher::{Dispatcher, DispatcherBuilder};
