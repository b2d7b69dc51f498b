// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;

use crate::{data_types::Address, Error};

/// A wallet that manages the user's keys and lets the user pick an account.
#[async_trait]
pub trait AccountProvider: Send + Sync {
    /// Asks for access to the user's accounts. This may prompt the user, and fails if
    /// access is denied.
    async fn request_accounts(&self) -> Result<Vec<Address>, Error>;
}
