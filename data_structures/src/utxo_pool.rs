use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{
    chain::{Epoch, Hash, ObjectId, OutputPointer},
    transaction::{CoinOutput, ContractRevision, StorageContract},
};

/// Unspent Outputs Pool
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct UnspentOutputsPool {
    /// Map of output pointer to a tuple of:
    /// * Coin output
    /// * The epoch of the block that consolidated the transaction
    map: HashMap<OutputPointer, (CoinOutput, Epoch)>,
}

impl UnspentOutputsPool {
    pub fn get(&self, k: &OutputPointer) -> Option<&CoinOutput> {
        self.map.get(k).map(|(output, _epoch)| output)
    }

    pub fn contains_key(&self, k: &OutputPointer) -> bool {
        self.map.contains_key(k)
    }

    pub fn insert(
        &mut self,
        k: OutputPointer,
        v: CoinOutput,
        epoch: Epoch,
    ) -> Option<(CoinOutput, Epoch)> {
        self.map.insert(k, (v, epoch))
    }

    pub fn remove(&mut self, k: &OutputPointer) -> Option<(CoinOutput, Epoch)> {
        self.map.remove(k)
    }

    pub fn iter(&self) -> std::collections::hash_map::Iter<OutputPointer, (CoinOutput, Epoch)> {
        self.map.iter()
    }

    /// Returns the epoch of the block that consolidated the transaction
    /// referenced by this OutputPointer.
    pub fn included_in_block_epoch(&self, k: &OutputPointer) -> Option<Epoch> {
        self.map.get(k).map(|(_output, epoch)| *epoch)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// A storage contract consolidated by the chain, together with its
/// latest revision number
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ContractRecord {
    pub contract: StorageContract,
    pub revision_number: u64,
}

/// Every live storage contract, by contract identifier
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct StorageContractPool {
    map: HashMap<Hash, ContractRecord>,
}

impl StorageContractPool {
    pub fn get(&self, id: &Hash) -> Option<&ContractRecord> {
        self.map.get(id)
    }

    pub fn contains_key(&self, id: &Hash) -> bool {
        self.map.contains_key(id)
    }

    pub fn insert(&mut self, id: Hash, contract: StorageContract) -> Option<ContractRecord> {
        self.map.insert(
            id,
            ContractRecord {
                contract,
                revision_number: 0,
            },
        )
    }

    /// Apply a revision to a stored contract. Missing contracts are
    /// ignored: revision validity is checked before diffs are applied.
    pub fn revise(&mut self, id: &Hash, revision: &ContractRevision) {
        if let Some(record) = self.map.get_mut(id) {
            record.revision_number = revision.revision_number;
            record.contract.file_size = revision.file_size;
            record.contract.file_root = revision.file_root;
            record.contract.window_start = revision.window_start;
            record.contract.window_end = revision.window_end;
        }
    }

    pub fn remove(&mut self, id: &Hash) -> Option<ContractRecord> {
        self.map.remove(id)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// The effects of validating a transaction set against the ledger:
/// every object the set creates or consumes. The transaction pool
/// stores one diff per admitted set and rebuilds its object index from
/// them; the chain manager applies the diff of a consolidated block.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Diff {
    utxos_to_add: HashMap<OutputPointer, CoinOutput>,
    utxos_to_remove: HashSet<OutputPointer>,
    contracts_to_add: HashMap<Hash, StorageContract>,
    contracts_to_revise: Vec<(Hash, ContractRevision)>,
    contracts_to_resolve: Vec<Hash>,
}

impl Diff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_utxo(&mut self, pointer: OutputPointer, output: CoinOutput) {
        self.utxos_to_add.insert(pointer, output);
    }

    pub fn remove_utxo(&mut self, pointer: OutputPointer) {
        self.utxos_to_remove.insert(pointer);
    }

    pub fn add_contract(&mut self, id: Hash, contract: StorageContract) {
        self.contracts_to_add.insert(id, contract);
    }

    pub fn revise_contract(&mut self, id: Hash, revision: ContractRevision) {
        self.contracts_to_revise.push((id, revision));
    }

    pub fn resolve_contract(&mut self, id: Hash) {
        self.contracts_to_resolve.push(id);
    }

    /// Pending created output for `pointer`, if this diff creates one
    pub fn get_created_utxo(&self, pointer: &OutputPointer) -> Option<&CoinOutput> {
        self.utxos_to_add.get(pointer)
    }

    /// Whether this diff spends `pointer`
    pub fn spends_utxo(&self, pointer: &OutputPointer) -> bool {
        self.utxos_to_remove.contains(pointer)
    }

    /// Pending created contract for `id`, if this diff creates one
    pub fn get_created_contract(&self, id: &Hash) -> Option<&StorageContract> {
        self.contracts_to_add.get(id)
    }

    /// Highest-numbered pending revision of contract `id`, if any
    pub fn latest_revision(&self, id: &Hash) -> Option<&ContractRevision> {
        self.contracts_to_revise
            .iter()
            .filter(|(revised_id, _)| revised_id == id)
            .map(|(_, revision)| revision)
            .max_by_key(|revision| revision.revision_number)
    }

    /// Whether this diff resolves contract `id` with a storage proof
    pub fn resolves_contract(&self, id: &Hash) -> bool {
        self.contracts_to_resolve.contains(id)
    }

    /// Identifiers of every ledger object this diff touches. The
    /// transaction pool maps each of them to the set that produced the
    /// diff, which is how double spends across sets are detected.
    pub fn related_object_ids(&self) -> HashSet<ObjectId> {
        let mut oids = HashSet::new();
        for pointer in self.utxos_to_add.keys() {
            oids.insert(pointer.object_id());
        }
        for pointer in &self.utxos_to_remove {
            oids.insert(pointer.object_id());
        }
        for id in self.contracts_to_add.keys() {
            oids.insert(ObjectId::from(*id));
        }
        for (id, _revision) in &self.contracts_to_revise {
            oids.insert(ObjectId::from(*id));
        }
        for id in &self.contracts_to_resolve {
            oids.insert(ObjectId::from(*id));
        }

        oids
    }

    /// Apply the diff onto the ledger state. Creations are applied
    /// before spends: an output created and consumed within the same
    /// set appears on both sides and must net out to nothing.
    pub fn apply(
        self,
        utxos: &mut UnspentOutputsPool,
        contracts: &mut StorageContractPool,
        epoch: Epoch,
    ) {
        for (pointer, output) in self.utxos_to_add {
            utxos.insert(pointer, output, epoch);
        }
        for pointer in self.utxos_to_remove {
            utxos.remove(&pointer);
        }
        for (id, contract) in self.contracts_to_add {
            contracts.insert(id, contract);
        }
        for (id, revision) in self.contracts_to_revise {
            contracts.revise(&id, &revision);
        }
        for id in self.contracts_to_resolve {
            contracts.remove(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{chain::calculate_sha256, coin::Coin};

    fn pointer(name: &[u8], index: u32) -> OutputPointer {
        OutputPointer {
            transaction_id: calculate_sha256(name),
            output_index: index,
        }
    }

    fn output(value: u64) -> CoinOutput {
        CoinOutput {
            value: Coin::from_motes(value),
            ..CoinOutput::default()
        }
    }

    #[test]
    fn diff_apply_spends_and_creates() {
        let mut utxos = UnspentOutputsPool::default();
        let mut contracts = StorageContractPool::default();
        utxos.insert(pointer(b"old", 0), output(10), 1);

        let mut diff = Diff::new();
        diff.remove_utxo(pointer(b"old", 0));
        diff.add_utxo(pointer(b"new", 0), output(7));
        diff.apply(&mut utxos, &mut contracts, 2);

        assert!(!utxos.contains_key(&pointer(b"old", 0)));
        assert_eq!(utxos.get(&pointer(b"new", 0)), Some(&output(7)));
        assert_eq!(utxos.included_in_block_epoch(&pointer(b"new", 0)), Some(2));
    }

    #[test]
    fn diff_apply_contract_lifecycle() {
        let mut utxos = UnspentOutputsPool::default();
        let mut contracts = StorageContractPool::default();
        let id = calculate_sha256(b"contract");

        let mut diff = Diff::new();
        diff.add_contract(id, StorageContract::default());
        diff.apply(&mut utxos, &mut contracts, 1);
        assert_eq!(contracts.get(&id).unwrap().revision_number, 0);

        let mut diff = Diff::new();
        diff.revise_contract(
            id,
            ContractRevision {
                parent_id: id,
                revision_number: 3,
                file_size: 64,
                ..ContractRevision::default()
            },
        );
        diff.apply(&mut utxos, &mut contracts, 2);
        let record = contracts.get(&id).unwrap();
        assert_eq!(record.revision_number, 3);
        assert_eq!(record.contract.file_size, 64);

        let mut diff = Diff::new();
        diff.resolve_contract(id);
        diff.apply(&mut utxos, &mut contracts, 3);
        assert!(!contracts.contains_key(&id));
    }

    #[test]
    fn related_object_ids_cover_every_side() {
        let mut diff = Diff::new();
        diff.add_utxo(pointer(b"created", 0), output(1));
        diff.remove_utxo(pointer(b"spent", 0));
        let contract_id = calculate_sha256(b"contract");
        diff.add_contract(contract_id, StorageContract::default());

        let oids = diff.related_object_ids();
        assert_eq!(oids.len(), 3);
        assert!(oids.contains(&pointer(b"spent", 0).object_id()));
        assert!(oids.contains(&ObjectId::from(contract_id)));
    }
}
