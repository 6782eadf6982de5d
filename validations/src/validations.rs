use basalt_data_structures::{
    chain::{Epoch, Hash, OutputPointer},
    coin::Coin,
    error::TransactionError,
    transaction::{CoinOutput, ContractRevision, StorageContract, Transaction},
    utxo_pool::{Diff, StorageContractPool, UnspentOutputsPool},
};

/// View of the confirmed ledger with a pending diff layered on top.
///
/// Transaction sets are validated in order against this view: outputs
/// and contracts created by earlier transactions of the set are visible
/// to later ones, and spends accumulate so that double spends within
/// the set are caught. Consuming the view yields the diff the pool
/// registers for the admitted set.
pub struct UtxoDiff<'a> {
    utxo_pool: &'a UnspentOutputsPool,
    contracts: &'a StorageContractPool,
    diff: Diff,
}

impl<'a> UtxoDiff<'a> {
    pub fn new(utxo_pool: &'a UnspentOutputsPool, contracts: &'a StorageContractPool) -> Self {
        UtxoDiff {
            utxo_pool,
            contracts,
            diff: Diff::new(),
        }
    }

    /// Spend an output visible from this view. Returns its value.
    pub fn spend(&mut self, pointer: OutputPointer) -> Result<Coin, TransactionError> {
        if self.diff.spends_utxo(&pointer) {
            return Err(TransactionError::OutputAlreadySpent { output: pointer });
        }
        let value = self
            .diff
            .get_created_utxo(&pointer)
            .or_else(|| self.utxo_pool.get(&pointer))
            .map(|output| output.value)
            .ok_or(TransactionError::MissingInput { output: pointer })?;
        self.diff.remove_utxo(pointer);

        Ok(value)
    }

    pub fn create_output(&mut self, pointer: OutputPointer, output: CoinOutput) {
        self.diff.add_utxo(pointer, output);
    }

    pub fn create_contract(&mut self, id: Hash, contract: StorageContract) {
        self.diff.add_contract(id, contract);
    }

    pub fn revise_contract(&mut self, revision: ContractRevision) {
        self.diff.revise_contract(revision.parent_id, revision);
    }

    pub fn resolve_contract(&mut self, id: Hash) {
        self.diff.resolve_contract(id);
    }

    /// Revision number of the contract as seen from this view: pending
    /// revisions first, then pending creations, then the chain.
    /// `None` if the contract does not exist or was already resolved.
    pub fn contract_revision_number(&self, id: &Hash) -> Option<u64> {
        if self.diff.resolves_contract(id) {
            return None;
        }
        self.diff
            .latest_revision(id)
            .map(|revision| revision.revision_number)
            .or_else(|| self.diff.get_created_contract(id).map(|_contract| 0))
            .or_else(|| self.contracts.get(id).map(|record| record.revision_number))
    }

    /// Proof window of the contract as seen from this view.
    pub fn contract_window(&self, id: &Hash) -> Option<(Epoch, Epoch)> {
        if self.diff.resolves_contract(id) {
            return None;
        }
        self.diff
            .latest_revision(id)
            .map(|revision| (revision.window_start, revision.window_end))
            .or_else(|| {
                self.diff
                    .get_created_contract(id)
                    .map(|contract| (contract.window_start, contract.window_end))
            })
            .or_else(|| {
                self.contracts
                    .get(id)
                    .map(|record| (record.contract.window_start, record.contract.window_end))
            })
    }

    pub fn take_diff(self) -> Diff {
        self.diff
    }
}

/// Validate a single transaction against the view, accumulating its
/// effects on success. `epoch` is the epoch the transaction would be
/// consolidated at.
pub fn validate_transaction(
    txn: &Transaction,
    view: &mut UtxoDiff<'_>,
    epoch: Epoch,
) -> Result<(), TransactionError> {
    // Spend the inputs and total their value
    let mut input_value = Coin::from_motes(0);
    for input in &txn.coin_inputs {
        let value = view.spend(*input.output_pointer())?;
        input_value = input_value
            .checked_add(value)
            .ok_or(TransactionError::ValueOverflow)?;
    }

    // Value committed to outputs, contract payouts and miner fees
    let mut committed = Coin::from_motes(0);
    for output in &txn.coin_outputs {
        committed = committed
            .checked_add(output.value)
            .ok_or(TransactionError::ValueOverflow)?;
    }
    for contract in &txn.storage_contracts {
        if contract.window_start <= epoch || contract.window_end <= contract.window_start {
            return Err(TransactionError::MalformedWindow {
                window_start: contract.window_start,
                window_end: contract.window_end,
            });
        }
        committed = committed
            .checked_add(contract.payout)
            .ok_or(TransactionError::ValueOverflow)?;
    }
    for fee in &txn.miner_fees {
        committed = committed
            .checked_add(*fee)
            .ok_or(TransactionError::ValueOverflow)?;
    }
    if input_value < committed {
        return Err(TransactionError::NegativeBalance {
            inputs: input_value,
            committed,
        });
    }

    // Revisions must supersede the latest visible revision
    for revision in &txn.contract_revisions {
        let current = view
            .contract_revision_number(&revision.parent_id)
            .ok_or(TransactionError::UnknownContract {
                id: revision.parent_id,
            })?;
        if revision.revision_number <= current {
            return Err(TransactionError::StaleRevision {
                id: revision.parent_id,
                current,
                new: revision.revision_number,
            });
        }
        if revision.window_end <= revision.window_start {
            return Err(TransactionError::MalformedWindow {
                window_start: revision.window_start,
                window_end: revision.window_end,
            });
        }
        view.revise_contract(revision.clone());
    }

    // Proofs must land inside the proof window and resolve the contract
    for proof in &txn.storage_proofs {
        let (window_start, window_end) =
            view.contract_window(&proof.parent_id)
                .ok_or(TransactionError::UnknownContract {
                    id: proof.parent_id,
                })?;
        if epoch < window_start || epoch > window_end {
            return Err(TransactionError::ProofWindowClosed {
                id: proof.parent_id,
                epoch,
            });
        }
        view.resolve_contract(proof.parent_id);
    }

    // Record the objects this transaction creates
    for (index, output) in txn.coin_outputs.iter().enumerate() {
        view.create_output(txn.output_pointer(index as u32), output.clone());
    }
    for (index, contract) in txn.storage_contracts.iter().enumerate() {
        let id = txn.storage_contract_id(index as u32);
        if view.contract_revision_number(&id).is_some() {
            return Err(TransactionError::ContractAlreadyExists { id });
        }
        view.create_contract(id, contract.clone());
    }

    Ok(())
}

/// The ledger's "try transaction set" primitive: validate an ordered
/// transaction set against the current tip and return the diff of
/// every object it creates and consumes. Later transactions may spend
/// outputs created by earlier ones. The caller must hold the chain
/// state fixed for the duration of the call.
pub fn validate_transaction_set(
    txns: &[Transaction],
    utxo_pool: &UnspentOutputsPool,
    contracts: &StorageContractPool,
    epoch: Epoch,
) -> Result<Diff, TransactionError> {
    let mut view = UtxoDiff::new(utxo_pool, contracts);
    for txn in txns {
        validate_transaction(txn, &mut view, epoch)?;
    }

    Ok(view.take_diff())
}

#[cfg(test)]
mod tests {
    use super::*;
    use basalt_data_structures::{
        chain::{calculate_sha256, PublicKeyHash},
        transaction::{Input, StorageProof},
    };

    fn pointer(name: &[u8], index: u32) -> OutputPointer {
        OutputPointer {
            transaction_id: calculate_sha256(name),
            output_index: index,
        }
    }

    fn output(value: u64) -> CoinOutput {
        CoinOutput {
            value: Coin::from_motes(value),
            address: PublicKeyHash::default(),
        }
    }

    fn ledger_with(outputs: &[(OutputPointer, u64)]) -> (UnspentOutputsPool, StorageContractPool) {
        let mut utxos = UnspentOutputsPool::default();
        for (ptr, value) in outputs {
            utxos.insert(*ptr, output(*value), 1);
        }

        (utxos, StorageContractPool::default())
    }

    fn spend(ptr: OutputPointer, value: u64, fee: u64) -> Transaction {
        Transaction {
            coin_inputs: vec![Input::new(ptr)],
            coin_outputs: vec![output(value)],
            miner_fees: vec![Coin::from_motes(fee)],
            ..Transaction::default()
        }
    }

    #[test]
    fn valid_spend_produces_a_complete_diff() {
        let ptr = pointer(b"genesis", 0);
        let (utxos, contracts) = ledger_with(&[(ptr, 100)]);
        let txn = spend(ptr, 90, 10);

        let diff =
            validate_transaction_set(std::slice::from_ref(&txn), &utxos, &contracts, 2).unwrap();

        assert!(diff.spends_utxo(&ptr));
        assert_eq!(
            diff.get_created_utxo(&txn.output_pointer(0)),
            Some(&output(90))
        );
    }

    #[test]
    fn missing_input_is_rejected() {
        let (utxos, contracts) = ledger_with(&[]);
        let ptr = pointer(b"nowhere", 0);
        let txn = spend(ptr, 1, 0);

        assert_eq!(
            validate_transaction_set(&[txn], &utxos, &contracts, 2),
            Err(TransactionError::MissingInput { output: ptr })
        );
    }

    #[test]
    fn double_spend_within_a_set_is_rejected() {
        let ptr = pointer(b"genesis", 0);
        let (utxos, contracts) = ledger_with(&[(ptr, 100)]);
        let txns = vec![spend(ptr, 50, 0), spend(ptr, 40, 0)];

        assert_eq!(
            validate_transaction_set(&txns, &utxos, &contracts, 2),
            Err(TransactionError::OutputAlreadySpent { output: ptr })
        );
    }

    #[test]
    fn later_transactions_may_spend_earlier_outputs() {
        let ptr = pointer(b"genesis", 0);
        let (utxos, contracts) = ledger_with(&[(ptr, 100)]);
        let first = spend(ptr, 80, 20);
        let second = spend(first.output_pointer(0), 80, 0);

        let diff = validate_transaction_set(
            &[first.clone(), second.clone()],
            &utxos,
            &contracts,
            2,
        )
        .unwrap();

        // The intermediate output nets out of the ledger state
        let (mut applied_utxos, mut applied_contracts) = ledger_with(&[(ptr, 100)]);
        diff.apply(&mut applied_utxos, &mut applied_contracts, 3);
        assert!(!applied_utxos.contains_key(&first.output_pointer(0)));
        assert!(applied_utxos.contains_key(&second.output_pointer(0)));
        assert!(!applied_utxos.contains_key(&ptr));
    }

    #[test]
    fn dependent_transactions_fail_out_of_order() {
        let ptr = pointer(b"genesis", 0);
        let (utxos, contracts) = ledger_with(&[(ptr, 100)]);
        let first = spend(ptr, 80, 20);
        let second = spend(first.output_pointer(0), 80, 0);

        assert!(matches!(
            validate_transaction_set(&[second, first], &utxos, &contracts, 2),
            Err(TransactionError::MissingInput { .. })
        ));
    }

    #[test]
    fn overspending_is_rejected() {
        let ptr = pointer(b"genesis", 0);
        let (utxos, contracts) = ledger_with(&[(ptr, 100)]);
        let txn = spend(ptr, 90, 20);

        assert_eq!(
            validate_transaction_set(&[txn], &utxos, &contracts, 2),
            Err(TransactionError::NegativeBalance {
                inputs: Coin::from_motes(100),
                committed: Coin::from_motes(110),
            })
        );
    }

    fn contract(payout: u64, window_start: Epoch, window_end: Epoch) -> StorageContract {
        StorageContract {
            file_size: 4096,
            file_root: calculate_sha256(b"file"),
            window_start,
            window_end,
            payout: Coin::from_motes(payout),
            renter: PublicKeyHash::default(),
            host: PublicKeyHash::default(),
        }
    }

    #[test]
    fn contract_lifecycle_validates_in_one_set() {
        let ptr = pointer(b"genesis", 0);
        let (utxos, contracts) = ledger_with(&[(ptr, 1_000)]);

        let create = Transaction {
            coin_inputs: vec![Input::new(ptr)],
            storage_contracts: vec![contract(1_000, 5, 10)],
            ..Transaction::default()
        };
        let contract_id = create.storage_contract_id(0);
        let revise = Transaction {
            contract_revisions: vec![ContractRevision {
                parent_id: contract_id,
                revision_number: 1,
                file_size: 8192,
                file_root: calculate_sha256(b"file2"),
                window_start: 2,
                window_end: 10,
            }],
            ..Transaction::default()
        };
        let prove = Transaction {
            storage_proofs: vec![StorageProof {
                parent_id: contract_id,
                segment_index: 0,
            }],
            ..Transaction::default()
        };

        let diff = validate_transaction_set(
            &[create, revise, prove],
            &utxos,
            &contracts,
            3,
        )
        .unwrap();
        assert!(diff.resolves_contract(&contract_id));
    }

    #[test]
    fn stale_revision_is_rejected() {
        let ptr = pointer(b"genesis", 0);
        let (utxos, contracts) = ledger_with(&[(ptr, 1_000)]);
        let create = Transaction {
            coin_inputs: vec![Input::new(ptr)],
            storage_contracts: vec![contract(1_000, 5, 10)],
            ..Transaction::default()
        };
        let contract_id = create.storage_contract_id(0);
        let revision = |number| Transaction {
            contract_revisions: vec![ContractRevision {
                parent_id: contract_id,
                revision_number: number,
                file_size: 0,
                file_root: Hash::default(),
                window_start: 5,
                window_end: 10,
            }],
            ..Transaction::default()
        };

        assert_eq!(
            validate_transaction_set(
                &[create, revision(1), revision(1)],
                &utxos,
                &contracts,
                2,
            ),
            Err(TransactionError::StaleRevision {
                id: contract_id,
                current: 1,
                new: 1,
            })
        );
    }

    #[test]
    fn proof_outside_the_window_is_rejected() {
        let ptr = pointer(b"genesis", 0);
        let (mut utxos, mut contracts) = ledger_with(&[(ptr, 1_000)]);

        // Consolidate a contract with proof window [5, 10]
        let create = Transaction {
            coin_inputs: vec![Input::new(ptr)],
            storage_contracts: vec![contract(1_000, 5, 10)],
            ..Transaction::default()
        };
        let contract_id = create.storage_contract_id(0);
        let diff = validate_transaction_set(
            std::slice::from_ref(&create),
            &utxos,
            &contracts,
            2,
        )
        .unwrap();
        diff.apply(&mut utxos, &mut contracts, 2);

        let prove = Transaction {
            storage_proofs: vec![StorageProof {
                parent_id: contract_id,
                segment_index: 0,
            }],
            ..Transaction::default()
        };

        assert_eq!(
            validate_transaction_set(std::slice::from_ref(&prove), &utxos, &contracts, 11),
            Err(TransactionError::ProofWindowClosed {
                id: contract_id,
                epoch: 11,
            })
        );
        assert!(
            validate_transaction_set(std::slice::from_ref(&prove), &utxos, &contracts, 7).is_ok()
        );
    }

    #[test]
    fn contract_window_must_open_in_the_future() {
        let ptr = pointer(b"genesis", 0);
        let (utxos, contracts) = ledger_with(&[(ptr, 1_000)]);
        let create = Transaction {
            coin_inputs: vec![Input::new(ptr)],
            storage_contracts: vec![contract(1_000, 2, 10)],
            ..Transaction::default()
        };

        assert!(matches!(
            validate_transaction_set(&[create], &utxos, &contracts, 2),
            Err(TransactionError::MalformedWindow { .. })
        ));
    }
}
