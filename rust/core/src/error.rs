// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for circuit description operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading a circuit description
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid circuit JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid element at index {index}: {message}")]
    InvalidElement { index: usize, message: String },
}
