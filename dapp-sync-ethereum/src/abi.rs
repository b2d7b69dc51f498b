// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! The contracts' JSON ABIs and the encoding of calls and decoding of outputs through them.

use alloy::{
    dyn_abi::{DynSolType, FunctionExt as _, JsonAbiExt as _, Specifier as _},
    json_abi::{Event, Function, JsonAbi},
    primitives::{address, Address, Bytes},
    rpc::types::eth::Log,
};
use dapp_sync::data_types::{ContractCall, ContractEvent, Token};

use crate::common::{parse_log, token_to_value, value_to_token, EthereumServiceError};

/// The ABI of the auction contract.
pub const AUCTION_ABI: &str = include_str!("../abi/auction.json");

/// The ABI of the guestbook contract.
pub const GUESTBOOK_ABI: &str = include_str!("../abi/guestbook.json");

/// Where the auction contract was deployed.
pub const AUCTION_ADDRESS: Address = address!("c07A7F67B553Ef997212e93899A4a7A9a1b39490");

/// Where the guestbook contract was deployed.
pub const GUESTBOOK_ADDRESS: Address = address!("A06E38F42F29467907EB8AbeC803d06AA2d75eBb");

/// A parsed contract ABI.
#[derive(Clone, Debug)]
pub struct ContractAbi {
    abi: JsonAbi,
}

impl ContractAbi {
    pub fn parse(json: &str) -> Result<Self, EthereumServiceError> {
        let abi = serde_json::from_str(json)?;
        Ok(Self { abi })
    }

    pub fn auction() -> Result<Self, EthereumServiceError> {
        Self::parse(AUCTION_ABI)
    }

    pub fn guestbook() -> Result<Self, EthereumServiceError> {
        Self::parse(GUESTBOOK_ABI)
    }

    /// Returns the function `name` taking `arity` arguments.
    pub fn function(&self, name: &str, arity: usize) -> Result<&Function, EthereumServiceError> {
        self.abi
            .function(name)
            .and_then(|overloads| {
                overloads
                    .iter()
                    .find(|function| function.inputs.len() == arity)
            })
            .ok_or_else(|| EthereumServiceError::UnknownFunction(name.to_owned()))
    }

    pub fn event(&self, name: &str) -> Result<&Event, EthereumServiceError> {
        self.abi
            .event(name)
            .and_then(|events| events.first())
            .ok_or_else(|| EthereumServiceError::UnknownEvent(name.to_owned()))
    }

    /// Encodes the selector and arguments of `call`.
    pub fn encode_call(&self, call: &ContractCall) -> Result<Bytes, EthereumServiceError> {
        let function = self.function(&call.function, call.args.len())?;
        let values = function
            .inputs
            .iter()
            .zip(&call.args)
            .map(|(input, token)| {
                let ty: DynSolType = input.resolve()?;
                token_to_value(token, &ty)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(function.abi_encode_input(&values)?.into())
    }

    /// Decodes what `call` returned.
    pub fn decode_output(
        &self,
        call: &ContractCall,
        data: &[u8],
    ) -> Result<Vec<Token>, EthereumServiceError> {
        let function = self.function(&call.function, call.args.len())?;
        function
            .abi_decode_output(data)?
            .into_iter()
            .map(value_to_token)
            .collect()
    }

    /// Decodes a log of the event `name`.
    pub fn decode_log(&self, name: &str, log: &Log) -> Result<ContractEvent, EthereumServiceError> {
        parse_log(self.event(name)?, log)
    }
}
