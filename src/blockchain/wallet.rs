//! Sender key loading and transaction signing.
//!
//! # Security
//! - Private keys are loaded ONLY from environment variables
//! - Keys are never logged or serialized

use alloy::eips::eip2718::Encodable2718;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{keccak256, Address, Bytes};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;

use crate::blockchain::types::{GatewayError, GatewayResult, SignedTransaction};

/// A sender key bound to one chain.
#[derive(Clone)]
pub struct Wallet {
    /// Signing wallet wrapping the private key.
    wallet: EthereumWallet,
    /// Cached address of the key.
    address: Address,
    /// Chain ID for EIP-155 replay protection.
    chain_id: u64,
}

impl Wallet {
    /// Create a wallet from a hex-encoded private key string.
    ///
    /// # Arguments
    /// * `private_key_hex` - Hex string (with or without 0x prefix)
    /// * `chain_id` - Chain ID for transaction signing
    pub fn from_private_key(private_key_hex: &str, chain_id: u64) -> GatewayResult<Self> {
        let key_hex = private_key_hex.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| GatewayError::Wallet(format!("Invalid private key format: {}", e)))?;
        let address = signer.address();

        Ok(Self {
            wallet: EthereumWallet::from(signer),
            address,
            chain_id,
        })
    }

    /// Get the wallet's address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Sign a fully populated request (nonce, gas, destination) and encode it.
    pub async fn sign(&self, request: TransactionRequest) -> GatewayResult<SignedTransaction> {
        let nonce = request
            .nonce
            .ok_or_else(|| GatewayError::Wallet("Transaction request has no nonce".to_string()))?;

        let envelope = request
            .with_from(self.address)
            .with_chain_id(self.chain_id)
            .build(&self.wallet)
            .await
            .map_err(|e| GatewayError::Wallet(format!("Signing failed: {}", e)))?;

        let raw = envelope.encoded_2718();
        Ok(SignedTransaction {
            sender: self.address,
            nonce,
            hash: keccak256(&raw),
            raw: Bytes::from(raw),
        })
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .field("chain_id", &self.chain_id)
            .finish_non_exhaustive()
    }
}
