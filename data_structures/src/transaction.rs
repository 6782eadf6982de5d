use serde::{Deserialize, Serialize};

use crate::{
    chain::{calculate_sha256, Epoch, Hash, Hashable, ObjectId, OutputPointer, PublicKeyHash, SetId},
    coin::Coin,
    fee::AbsoluteFee,
};

/// Input referencing an unspent coin output
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct Input {
    output_pointer: OutputPointer,
}

impl Input {
    /// Create a new Input from an OutputPointer
    pub fn new(output_pointer: OutputPointer) -> Self {
        Self { output_pointer }
    }

    /// Return the [`OutputPointer`](OutputPointer) of an input.
    pub fn output_pointer(&self) -> &OutputPointer {
        &self.output_pointer
    }
}

/// Coin output, spendable by the owner of `address`
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct CoinOutput {
    pub value: Coin,
    pub address: PublicKeyHash,
}

/// Agreement between a renter and a host to store a file for a span of
/// epochs. The host must submit a storage proof inside the proof window
/// to collect its share of the payout.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct StorageContract {
    /// Size of the stored file, in bytes
    pub file_size: u64,
    /// Commitment to the file contents
    pub file_root: Hash,
    /// First epoch at which a storage proof is accepted
    pub window_start: Epoch,
    /// Last epoch at which a storage proof is accepted
    pub window_end: Epoch,
    /// Total value locked by the contract
    pub payout: Coin,
    /// Renter address receiving the refund share of the payout
    pub renter: PublicKeyHash,
    /// Host address receiving the proof share of the payout
    pub host: PublicKeyHash,
}

/// Renegotiation of an existing storage contract. Only the file
/// commitment and the proof window can change; the locked payout is
/// fixed at contract creation.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct ContractRevision {
    /// Identifier of the revised contract
    pub parent_id: Hash,
    /// Strictly increasing revision counter
    pub revision_number: u64,
    pub file_size: u64,
    pub file_root: Hash,
    pub window_start: Epoch,
    pub window_end: Epoch,
}

/// Proof that a host still stores the file committed to by a contract
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct StorageProof {
    /// Identifier of the proven contract
    pub parent_id: Hash,
    /// Index of the file segment covered by the proof
    pub segment_index: u64,
}

/// Transaction data structure
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub coin_inputs: Vec<Input>,
    pub coin_outputs: Vec<CoinOutput>,
    pub storage_contracts: Vec<StorageContract>,
    pub contract_revisions: Vec<ContractRevision>,
    pub storage_proofs: Vec<StorageProof>,
    /// Fees claimable by the miner consolidating this transaction
    pub miner_fees: Vec<Coin>,
}

impl Hashable for Transaction {
    fn hash(&self) -> Hash {
        calculate_sha256(&bincode::serialize(self).unwrap())
    }
}

impl Transaction {
    /// Pointer to the coin output of this transaction at `output_index`
    pub fn output_pointer(&self, output_index: u32) -> OutputPointer {
        OutputPointer {
            transaction_id: self.hash(),
            output_index,
        }
    }

    /// Identifier of the storage contract declared at `index`
    pub fn storage_contract_id(&self, index: u32) -> Hash {
        let mut bytes = Vec::with_capacity(32 + 4 + 16);
        bytes.extend_from_slice(b"storage_contract");
        bytes.extend_from_slice(self.hash().as_bytes());
        bytes.extend_from_slice(&index.to_le_bytes());

        calculate_sha256(&bytes)
    }

    /// Canonical serialized size of the transaction, in bytes
    pub fn encoded_size(&self) -> u64 {
        bincode::serialized_size(self).unwrap()
    }

    /// Sum of the declared miner fees, `None` on overflow
    pub fn total_miner_fees(&self) -> Option<AbsoluteFee> {
        self.miner_fees
            .iter()
            .try_fold(Coin::from_motes(0), |sum, fee| sum.checked_add(*fee))
            .map(AbsoluteFee::from)
    }

    /// Identifiers of every ledger object this transaction consumes:
    /// parents of coin inputs, revised contracts and proven contracts.
    pub fn consumed_object_ids(&self) -> Vec<ObjectId> {
        let mut oids = Vec::new();
        for input in &self.coin_inputs {
            oids.push(input.output_pointer().object_id());
        }
        for revision in &self.contract_revisions {
            oids.push(ObjectId::from(revision.parent_id));
        }
        for proof in &self.storage_proofs {
            oids.push(ObjectId::from(proof.parent_id));
        }

        oids
    }

    /// Identifiers of every ledger object this transaction creates:
    /// new coin outputs and new storage contracts.
    pub fn created_object_ids(&self) -> Vec<ObjectId> {
        let mut oids = Vec::new();
        for output_index in 0..self.coin_outputs.len() {
            oids.push(self.output_pointer(output_index as u32).object_id());
        }
        for index in 0..self.storage_contracts.len() {
            oids.push(ObjectId::from(self.storage_contract_id(index as u32)));
        }

        oids
    }
}

/// Canonical serialized size of an ordered transaction list, in bytes.
///
/// This is the unit the transaction pool accounts in: the pool total
/// must always equal the sum of this value over every registered set.
pub fn transaction_set_size(txns: &[Transaction]) -> u64 {
    bincode::serialized_size(txns).unwrap()
}

/// Identifier of an ordered transaction list: the hash of its canonical
/// serialization. Sets with equal transactions in equal order collide,
/// which is how the pool deduplicates repeated submissions.
pub fn transaction_set_id(txns: &[Transaction]) -> SetId {
    SetId(calculate_sha256(&bincode::serialize(txns).unwrap()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transaction_spending(name: &[u8]) -> Transaction {
        Transaction {
            coin_inputs: vec![Input::new(OutputPointer {
                transaction_id: calculate_sha256(name),
                output_index: 0,
            })],
            coin_outputs: vec![CoinOutput {
                value: Coin::from_motes(100),
                address: PublicKeyHash::default(),
            }],
            ..Transaction::default()
        }
    }

    #[test]
    fn transaction_hash_is_stable() {
        let txn = transaction_spending(b"parent");

        assert_eq!(txn.hash(), txn.hash());
        assert_ne!(txn.hash(), transaction_spending(b"other").hash());
    }

    #[test]
    fn set_id_is_order_sensitive() {
        let a = transaction_spending(b"a");
        let b = transaction_spending(b"b");

        let ab = transaction_set_id(&[a.clone(), b.clone()]);
        let ba = transaction_set_id(&[b, a]);

        assert_ne!(ab, ba);
    }

    #[test]
    fn set_size_matches_encoded_size_sum_plus_prefix() {
        let txns = vec![transaction_spending(b"a"), transaction_spending(b"b")];
        let items: u64 = txns.iter().map(Transaction::encoded_size).sum();

        // bincode length prefix is 8 bytes
        assert_eq!(transaction_set_size(&txns), items + 8);
    }

    #[test]
    fn consumed_and_created_objects_are_disjoint() {
        let mut txn = transaction_spending(b"parent");
        txn.storage_contracts.push(StorageContract::default());
        txn.contract_revisions.push(ContractRevision {
            parent_id: calculate_sha256(b"contract"),
            revision_number: 2,
            ..ContractRevision::default()
        });

        let consumed = txn.consumed_object_ids();
        let created = txn.created_object_ids();

        assert_eq!(consumed.len(), 2);
        assert_eq!(created.len(), 2);
        assert!(consumed.iter().all(|oid| !created.contains(oid)));
    }
}
