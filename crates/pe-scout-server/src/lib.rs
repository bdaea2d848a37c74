// Copyright 2026 PE Scout Contributors
// SPDX-License-Identifier: MIT

//! HTTP surface for the PE Scout pipeline.

pub mod error;
pub mod rest;

pub use error::ApiError;
pub use rest::{router, start};
