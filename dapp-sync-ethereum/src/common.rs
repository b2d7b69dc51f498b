// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use alloy::{
    dyn_abi::{DynSolType, DynSolValue, EventExt as _},
    json_abi::Event,
    rpc::types::eth::Log,
};
use dapp_sync::data_types::{ContractEvent, Token};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EthereumServiceError {
    /// The ABI has no function with this name
    #[error("unknown contract function `{0}`")]
    UnknownFunction(String),

    /// The ABI has no event with this name
    #[error("unknown contract event `{0}`")]
    UnknownEvent(String),

    #[error("Unsupported Ethereum type `{0}`")]
    UnsupportedEthereumTypeError(String),

    #[error("Event parsing error")]
    EventParsingError,

    /// ABI encoding or decoding error
    #[error(transparent)]
    AbiError(#[from] alloy::dyn_abi::Error),

    /// `serde_json` error
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    /// RPC error
    #[error(transparent)]
    RpcError(#[from] alloy::transports::TransportError),

    /// Waiting for a transaction receipt failed
    #[error(transparent)]
    PendingTransactionError(#[from] alloy::providers::PendingTransactionError),

    /// URL parsing error
    #[error(transparent)]
    UrlParseError(#[from] url::ParseError),
}

impl From<EthereumServiceError> for dapp_sync::Error {
    fn from(error: EthereumServiceError) -> Self {
        dapp_sync::Error::transport(error)
    }
}

/// Converts a token into the ABI value expected for `ty`.
pub fn token_to_value(token: &Token, ty: &DynSolType) -> Result<DynSolValue, EthereumServiceError> {
    let value = match (token, ty) {
        (Token::Address(address), DynSolType::Address) => DynSolValue::Address(*address),
        (Token::Uint(value), DynSolType::Uint(size)) => DynSolValue::Uint(*value, *size),
        (Token::String(value), DynSolType::String) => DynSolValue::String(value.clone()),
        (Token::Bool(value), DynSolType::Bool) => DynSolValue::Bool(*value),
        (_, ty) => {
            return Err(EthereumServiceError::UnsupportedEthereumTypeError(
                ty.sol_type_name().into_owned(),
            ))
        }
    };
    Ok(value)
}

/// Converts a decoded ABI value into a token.
pub fn value_to_token(value: DynSolValue) -> Result<Token, EthereumServiceError> {
    match value {
        DynSolValue::Address(address) => Ok(Token::Address(address)),
        DynSolValue::Uint(value, _) => Ok(Token::Uint(value)),
        DynSolValue::String(value) => Ok(Token::String(value)),
        DynSolValue::Bool(value) => Ok(Token::Bool(value)),
        other => Err(EthereumServiceError::UnsupportedEthereumTypeError(
            other
                .sol_type_name()
                .map_or_else(|| "unknown".to_owned(), |name| name.into_owned()),
        )),
    }
}

/// Decodes a log of `event` into its values, in declaration order.
pub fn parse_log(event: &Event, log: &Log) -> Result<ContractEvent, EthereumServiceError> {
    let decoded = event.decode_log(log.data())?;
    let mut indexed = decoded.indexed.into_iter();
    let mut body = decoded.body.into_iter();
    let values = event
        .inputs
        .iter()
        .map(|input| {
            let value = if input.indexed {
                indexed.next()
            } else {
                body.next()
            };
            value_to_token(value.ok_or(EthereumServiceError::EventParsingError)?)
        })
        .collect::<Result<_, _>>()?;
    Ok(ContractEvent {
        name: event.name.clone(),
        values,
        block_number: log.block_number,
    })
}
