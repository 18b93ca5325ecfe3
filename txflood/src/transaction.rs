//! Signed CREATE transactions and the per-worker factory that produces them.
//!
//! Every payload is the same template transaction with a different sequence number
//! embedded in its asset (`asset.data.n`), re-signed after each mutation.
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use thiserror::Error;

pub const TRANSACTION_VERSION: &str = "2.0";

#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("Failed to encode transaction: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Input has no owner to verify against")]
    MissingOwner,

    #[error("Input is not signed")]
    Unsigned,

    #[error("Invalid base58 encoding: {0}")]
    Base58(#[from] bs58::decode::Error),

    #[error("Public key is not a valid ed25519 key")]
    InvalidKey,

    #[error("Signature is malformed or does not match")]
    BadSignature,

    #[error("Transaction id does not match its body")]
    IdMismatch,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    Create,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub data: AssetData,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetData {
    pub n: u64,
}

/// Reference to an output of an earlier transaction. Always `null` for CREATE.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLink {
    pub transaction_id: String,
    pub output_index: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Input {
    pub owners_before: Vec<String>,
    pub fulfills: Option<OutputLink>,
    /// base58 ed25519 signature over [`Transaction::signing_message`].
    pub fulfillment: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub public_keys: Vec<String>,
    pub amount: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// hex sha3-256 of the signed body with `id` unset
    pub id: Option<String>,
    pub version: String,
    pub operation: Operation,
    pub asset: Asset,
    pub metadata: Option<serde_json::Value>,
    pub inputs: Vec<Input>,
    pub outputs: Vec<Output>,
}

impl Transaction {
    /// Unsigned CREATE of one unit owned by `public_key`.
    pub fn create(public_key: &str) -> Self {
        Self {
            id: None,
            version: TRANSACTION_VERSION.to_string(),
            operation: Operation::Create,
            asset: Asset {
                data: AssetData { n: 0 },
            },
            metadata: None,
            inputs: vec![Input {
                owners_before: vec![public_key.to_string()],
                fulfills: None,
                fulfillment: None,
            }],
            outputs: vec![Output {
                public_keys: vec![public_key.to_string()],
                amount: "1".to_string(),
            }],
        }
    }

    /// The embedded sequence number.
    pub fn sequence(&self) -> u64 {
        self.asset.data.n
    }

    /// Bytes covered by the signature: the body with `id` and every fulfillment unset.
    pub fn signing_message(&self) -> Result<Vec<u8>, TransactionError> {
        let mut unsigned = self.clone();
        unsigned.id = None;
        for input in &mut unsigned.inputs {
            input.fulfillment = None;
        }
        Ok(serde_json::to_vec(&unsigned)?)
    }

    pub fn compute_id(&self) -> Result<String, TransactionError> {
        let mut body = self.clone();
        body.id = None;
        let encoded = serde_json::to_vec(&body)?;
        Ok(hex::encode(Sha3_256::digest(&encoded)))
    }

    /// Check every input's signature against its first owner, then the id.
    pub fn verify(&self) -> Result<(), TransactionError> {
        let message = self.signing_message()?;

        for input in &self.inputs {
            let owner = input
                .owners_before
                .first()
                .ok_or(TransactionError::MissingOwner)?;
            let fulfillment = input
                .fulfillment
                .as_ref()
                .ok_or(TransactionError::Unsigned)?;

            let key_bytes: [u8; 32] = bs58::decode(owner)
                .into_vec()?
                .try_into()
                .map_err(|_| TransactionError::InvalidKey)?;
            let key =
                VerifyingKey::from_bytes(&key_bytes).map_err(|_| TransactionError::InvalidKey)?;

            let signature_bytes: [u8; 64] = bs58::decode(fulfillment)
                .into_vec()?
                .try_into()
                .map_err(|_| TransactionError::BadSignature)?;
            let signature = Signature::from_bytes(&signature_bytes);

            key.verify(&message, &signature)
                .map_err(|_| TransactionError::BadSignature)?;
        }

        if self.id.as_deref() != Some(self.compute_id()?.as_str()) {
            return Err(TransactionError::IdMismatch);
        }

        Ok(())
    }
}

/// Produces an endless stream of signed payloads from one keypair.
///
/// The template is created once and mutated for every emission. Not meant to be
/// shared between workers; each sender owns its own factory.
pub struct TransactionFactory {
    signing_key: SigningKey,
    public_key: String,
    template: Transaction,
    counter: u64,
}

impl TransactionFactory {
    /// Factory with a freshly generated keypair.
    pub fn generate() -> Self {
        Self::new(SigningKey::generate(&mut OsRng))
    }

    pub fn new(signing_key: SigningKey) -> Self {
        let public_key = bs58::encode(signing_key.verifying_key().to_bytes()).into_string();
        let template = Transaction::create(&public_key);
        Self {
            signing_key,
            public_key,
            template,
            counter: 0,
        }
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// Sequence number the next [`TransactionFactory::next_signed`] call will embed.
    pub fn counter(&self) -> u64 {
        self.counter
    }

    pub fn restart(&mut self, n: u64) {
        self.counter = n;
    }

    /// Embed `n`, re-sign, and continue counting from `n + 1`.
    pub fn sign(&mut self, n: u64) -> Result<Transaction, TransactionError> {
        self.template.asset = Asset {
            data: AssetData { n },
        };

        let message = self.template.signing_message()?;
        let signature = self.signing_key.sign(&message);
        let fulfillment = bs58::encode(signature.to_bytes()).into_string();
        for input in &mut self.template.inputs {
            input.fulfillment = Some(fulfillment.clone());
        }
        self.template.id = Some(self.template.compute_id()?);

        self.counter = n.saturating_add(1);
        Ok(self.template.clone())
    }

    pub fn next_signed(&mut self) -> Result<Transaction, TransactionError> {
        self.sign(self.counter)
    }
}

impl Iterator for TransactionFactory {
    type Item = Result<Transaction, TransactionError>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_signed())
    }
}
