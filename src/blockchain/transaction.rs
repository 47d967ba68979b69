//! Mint transaction building.
//!
//! # Responsibilities
//! - Encode the mint call (`selector ‖ leftpad32(destination)`)
//! - Populate the fixed parts of every mint transaction (target, value, gas)
//! - Parse selectors and destination addresses from external input

use alloy::network::TransactionBuilder;
use alloy::primitives::{hex, Address, Bytes, U256};
use alloy::rpc::types::TransactionRequest;

use crate::config::schema::RelayerConfig;
use crate::config::ValidationError;

/// `mint(address)`.
pub const DEFAULT_MINT_SELECTOR: [u8; 4] = [0x6a, 0x62, 0x78, 0x42];

/// Parse a hex call selector, with or without `0x`.
pub fn parse_selector(raw: &str) -> Result<[u8; 4], String> {
    let bytes = hex::decode(raw.trim()).map_err(|e| format!("'{}' is not hex: {}", raw, e))?;
    <[u8; 4]>::try_from(bytes.as_slice())
        .map_err(|_| format!("'{}' must be exactly 4 bytes, got {}", raw, bytes.len()))
}

/// Parse a destination address.
///
/// Short hex strings are left-padded to 20 bytes, so `0xDEAD` names
/// `0x000…dead`. The zero address is rejected.
pub fn parse_destination(raw: &str) -> Option<Address> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if digits.is_empty() || digits.len() > 40 {
        return None;
    }
    let padded = format!("{:0>40}", digits);
    let bytes = hex::decode(padded).ok()?;
    let address = Address::from_slice(&bytes);
    (!address.is_zero()).then_some(address)
}

/// The invariant part of every mint transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintTemplate {
    /// Contract receiving the call.
    pub contract: Address,
    /// Function selector prepended to the argument.
    pub selector: [u8; 4],
    /// Fixed gas ceiling.
    pub gas_limit: u64,
}

impl MintTemplate {
    pub fn new(contract: Address, selector: [u8; 4], gas_limit: u64) -> Self {
        Self {
            contract,
            selector,
            gas_limit,
        }
    }

    /// Build the template from validated relayer settings.
    pub fn from_config(config: &RelayerConfig) -> Result<Self, ValidationError> {
        let contract = config.contract_address.parse::<Address>().map_err(|e| ValidationError {
            field: "relayer.contract_address",
            message: e.to_string(),
        })?;
        let selector = parse_selector(&config.call_selector).map_err(|message| ValidationError {
            field: "relayer.call_selector",
            message,
        })?;
        Ok(Self::new(contract, selector, config.gas_limit))
    }

    /// Call data for minting to `destination`.
    pub fn calldata(&self, destination: Address) -> Bytes {
        let mut data = Vec::with_capacity(4 + 32);
        data.extend_from_slice(&self.selector);
        data.extend_from_slice(destination.into_word().as_slice());
        Bytes::from(data)
    }

    /// Build an unsigned legacy transaction request.
    ///
    /// # Arguments
    /// * `from` - Sender paying for the call
    /// * `destination` - Address receiving the minted asset
    /// * `nonce` - Sender's cached next nonce
    /// * `gas_price` - Fee estimate in wei
    pub fn request(
        &self,
        from: Address,
        destination: Address,
        nonce: u64,
        gas_price: u128,
    ) -> TransactionRequest {
        TransactionRequest::default()
            .with_from(from)
            .with_to(self.contract)
            .with_value(U256::ZERO)
            .with_input(self.calldata(destination))
            .with_nonce(nonce)
            .with_gas_price(gas_price)
            .with_gas_limit(self.gas_limit)
    }
}
