use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{error::HashParseError, transaction::Transaction};

/// Trait for any type that can be converted to a `Hash`
pub trait Hashable {
    fn hash(&self) -> Hash;
}

/// SHA-256 output
pub type SHA256 = [u8; 32];

/// Epoch id (u32 for the whole lifetime of the chain)
pub type Epoch = u32;

/// Maximum serialized size of a block, in bytes. The peer relay frame
/// size and the maximum transaction set size derive from this limit.
pub const BLOCK_SIZE_LIMIT: u64 = 2_000_000;

/// 32-byte hash, the identifier type used all across the chain
#[derive(Copy, Clone, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub enum Hash {
    /// SHA-256 hash
    SHA256(SHA256),
}

impl Default for Hash {
    fn default() -> Hash {
        Hash::SHA256([0; 32])
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Hash::SHA256(h) = self;
        f.write_str(&hex::encode(h))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for Hash {
    type Err = HashParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(HashParseError::Hex)?;
        let array = <SHA256>::try_from(bytes.as_slice())
            .map_err(|_| HashParseError::InvalidLength(bytes.len()))?;

        Ok(Hash::SHA256(array))
    }
}

impl Hash {
    /// Raw bytes of the hash
    pub fn as_bytes(&self) -> &[u8] {
        let Hash::SHA256(h) = self;
        h
    }
}

/// Compute the SHA-256 hash of a byte slice
pub fn calculate_sha256(bytes: &[u8]) -> Hash {
    let digest = Sha256::digest(bytes);
    let mut sha256: SHA256 = [0; 32];
    sha256.copy_from_slice(&digest);

    Hash::SHA256(sha256)
}

/// 20-byte hash of a public key, the address type of coin outputs and
/// storage contract payouts
#[derive(
    Copy, Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize,
)]
pub struct PublicKeyHash {
    pub(crate) hash: [u8; 20],
}

impl fmt::Display for PublicKeyHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.hash))
    }
}

impl FromStr for PublicKeyHash {
    type Err = HashParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(HashParseError::Hex)?;
        let hash = <[u8; 20]>::try_from(bytes.as_slice())
            .map_err(|_| HashParseError::InvalidLength(bytes.len()))?;

        Ok(PublicKeyHash { hash })
    }
}

impl PublicKeyHash {
    /// Build an address from its raw bytes
    pub fn from_bytes(hash: [u8; 20]) -> Self {
        PublicKeyHash { hash }
    }
}

/// Unspent output data structure (equivalent of Bitcoin's UTXO)
/// It is used to locate the output by its transaction identifier and its position
#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct OutputPointer {
    pub transaction_id: Hash,
    pub output_index: u32,
}

impl fmt::Display for OutputPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.transaction_id, self.output_index)
    }
}

impl OutputPointer {
    /// Identifier of this output in the ledger object namespace
    pub fn object_id(&self) -> ObjectId {
        let mut bytes = Vec::with_capacity(32 + 4 + 11);
        bytes.extend_from_slice(b"coin_output");
        bytes.extend_from_slice(self.transaction_id.as_bytes());
        bytes.extend_from_slice(&self.output_index.to_le_bytes());

        ObjectId(calculate_sha256(&bytes))
    }
}

/// Identifier of any ledger object a transaction can consume or
/// produce: coin outputs, storage contracts, contract revisions and
/// storage proofs all map into this single namespace. The transaction
/// pool uses it to detect conflicts between unconfirmed sets.
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct ObjectId(pub Hash);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Hash> for ObjectId {
    fn from(hash: Hash) -> Self {
        ObjectId(hash)
    }
}

/// Identifier of a pooled transaction set: the hash of the canonical
/// serialization of its ordered transaction list. Two sets with the
/// same transactions in the same order share the identifier.
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct SetId(pub Hash);

impl fmt::Display for SetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Checkpoint beacon: the highest consolidated block this node knows of
#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct CheckpointBeacon {
    /// Epoch of the highest consolidated block
    pub checkpoint: Epoch,
    /// Hash of the highest consolidated block
    pub hash_prev_block: Hash,
}

/// Block header structure
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// The block version number indicating the block validation rules
    pub version: u32,
    /// A checkpoint beacon for the epoch that this block is closing
    pub beacon: CheckpointBeacon,
    /// A root of the transactions in the block body
    pub txns_root: Hash,
    /// Proof-of-work nonce. Difficulty rules are not checked by this
    /// node; the field is carried for wire compatibility.
    pub nonce: u64,
    /// Wall-clock timestamp claimed by the miner
    pub timestamp: i64,
}

/// Block structure
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Header of the block
    pub block_header: BlockHeader,
    /// Transactions consolidated by the block, in dependency order
    pub txns: Vec<Transaction>,
}

impl Hashable for Block {
    fn hash(&self) -> Hash {
        calculate_sha256(&bincode::serialize(&self.block_header).unwrap())
    }
}

impl Hashable for CheckpointBeacon {
    fn hash(&self) -> Hash {
        calculate_sha256(&bincode::serialize(self).unwrap())
    }
}

impl Block {
    /// Serialized size of the whole block, in bytes
    pub fn encoded_size(&self) -> u64 {
        bincode::serialized_size(self).unwrap()
    }

    /// Root of the transaction list committed to by the header.
    ///
    /// This is a flat hash over the ordered transaction ids, not a
    /// Merkle tree: no part of this node proves inclusion to light
    /// clients.
    pub fn calculate_txns_root(txns: &[Transaction]) -> Hash {
        let mut bytes = Vec::with_capacity(32 * txns.len());
        for txn in txns {
            bytes.extend_from_slice(txn.hash().as_bytes());
        }

        calculate_sha256(&bytes)
    }
}

/// Blockchain state kept in memory by the chain manager: the ledger
/// side of the node, against which unconfirmed transaction sets are
/// validated.
#[derive(Clone, Debug, Default)]
pub struct ChainState {
    /// Highest consolidated block
    pub highest_block_checkpoint: CheckpointBeacon,
    /// Every unspent output in the chain
    pub unspent_outputs_pool: crate::utxo_pool::UnspentOutputsPool,
    /// Every live storage contract in the chain
    pub storage_contracts: crate::utxo_pool::StorageContractPool,
    /// Identifiers of every transaction consolidated by a block
    pub confirmed_transactions: std::collections::HashSet<Hash>,
}

impl ChainState {
    /// Whether a transaction has already been consolidated by a block
    pub fn transaction_confirmed(&self, transaction_id: &Hash) -> bool {
        self.confirmed_transactions.contains(transaction_id)
    }

    /// Epoch of the current tip
    pub fn block_epoch(&self) -> Epoch {
        self.highest_block_checkpoint.checkpoint
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_display_and_parse_round_trip() {
        let hash = calculate_sha256(b"beacon");
        let parsed: Hash = hash.to_string().parse().unwrap();

        assert_eq!(parsed, hash);
    }

    #[test]
    fn hash_parse_rejects_wrong_length() {
        assert!(matches!(
            "abcd".parse::<Hash>(),
            Err(HashParseError::InvalidLength(2))
        ));
        assert!("zz".parse::<Hash>().is_err());
    }

    #[test]
    fn output_pointer_object_id_depends_on_index() {
        let transaction_id = calculate_sha256(b"txn");
        let p0 = OutputPointer {
            transaction_id,
            output_index: 0,
        };
        let p1 = OutputPointer {
            transaction_id,
            output_index: 1,
        };

        assert_ne!(p0.object_id(), p1.object_id());
        assert_eq!(p0.object_id(), p0.object_id());
    }

    #[test]
    fn block_hash_commits_to_header_only() {
        let mut block = Block::default();
        let empty_hash = block.hash();

        block.txns.push(Transaction::default());
        assert_eq!(block.hash(), empty_hash);

        block.block_header.nonce = 1;
        assert_ne!(block.hash(), empty_hash);
    }
}
