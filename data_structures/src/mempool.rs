use std::collections::{HashMap, HashSet};

use itertools::Itertools;

use crate::{
    chain::{Epoch, Hash, Hashable, ObjectId, SetId, BLOCK_SIZE_LIMIT},
    error::{TransactionError, TransactionPoolError},
    fee::{AbsoluteFee, RelativeFee, Zero},
    transaction::{transaction_set_id, transaction_set_size, Transaction},
    utxo_pool::Diff,
};

/// Pool byte occupancy below which transaction sets are admitted for free
pub const DEFAULT_POOL_SIZE_FOR_FEE: u64 = 500_000;
/// Soft target for the pool byte occupancy. The admission price grows
/// against the ratio between the current occupancy and this target.
pub const DEFAULT_POOL_SIZE_TARGET: u64 = 3_000_000;
/// Exponent of the admission fee curve. Values above one make the curve
/// convex: cheap while the pool is small, steep as it fills up.
pub const DEFAULT_POOL_FEE_EXPONENT: f64 = 3.0;
/// Fee rate charged when the pool sits exactly at its size target, in
/// motes per byte
pub const DEFAULT_BASE_FEE_PER_BYTE: f64 = 100.0;
/// Maximum canonical size of a single standard transaction, in bytes
pub const DEFAULT_TRANSACTION_SIZE_LIMIT: u64 = 32_000;
/// Maximum canonical size of a standard transaction set, in bytes
pub const DEFAULT_TRANSACTION_SET_SIZE_LIMIT: u64 = 250_000;
/// Epochs an unconfirmed transaction may linger in the pool before the
/// sets containing it are purged
pub const DEFAULT_TRANSACTION_MAX_AGE: Epoch = 144;

/// Admission policy constants of the transactions pool
#[derive(Clone, Debug)]
pub struct PoolPolicy {
    /// Occupancy below which admission is free, in bytes
    pub size_for_fee: u64,
    /// Soft occupancy target, in bytes. Not a hard cap: there is no
    /// absolute pool size ceiling other than what the fee curve makes
    /// uneconomical.
    pub size_target: u64,
    /// Exponent of the fee curve, must be greater than one
    pub fee_exponent: f64,
    /// Fee rate at the occupancy target, in motes per byte
    pub base_fee_per_byte: f64,
    /// Maximum canonical size of a single transaction, in bytes
    pub max_transaction_size: u64,
    /// Maximum canonical size of a whole set, in bytes. Never above the
    /// block size limit, or admitted sets could not be consolidated.
    pub max_set_size: u64,
    /// Maximum unconfirmed age of a pooled transaction, in epochs
    pub transaction_max_age: Epoch,
}

impl Default for PoolPolicy {
    fn default() -> Self {
        PoolPolicy {
            size_for_fee: DEFAULT_POOL_SIZE_FOR_FEE,
            size_target: DEFAULT_POOL_SIZE_TARGET,
            fee_exponent: DEFAULT_POOL_FEE_EXPONENT,
            base_fee_per_byte: DEFAULT_BASE_FEE_PER_BYTE,
            max_transaction_size: DEFAULT_TRANSACTION_SIZE_LIMIT,
            max_set_size: DEFAULT_TRANSACTION_SET_SIZE_LIMIT.min(BLOCK_SIZE_LIMIT),
            transaction_max_age: DEFAULT_TRANSACTION_MAX_AGE,
        }
    }
}

/// Fee rate required to extend a pool already holding `pool_bytes`
/// bytes, ignoring the free-admission threshold.
pub fn required_fee_per_byte_at_size(pool_bytes: u64, policy: &PoolPolicy) -> RelativeFee {
    #[allow(clippy::cast_precision_loss)]
    let ratio_to_target = pool_bytes as f64 / policy.size_target as f64;
    let fee_factor = ratio_to_target.powf(policy.fee_exponent);

    RelativeFee::from(policy.base_fee_per_byte * fee_factor)
}

/// Identifiers of every ledger object touched by any transaction of the
/// slice: parents of inputs, created outputs, created contracts and the
/// parents of revisions and proofs. Order independent.
pub fn related_object_ids(txns: &[Transaction]) -> HashSet<ObjectId> {
    let mut oids = HashSet::new();
    for txn in txns {
        oids.extend(txn.consumed_object_ids());
        oids.extend(txn.created_object_ids());
    }

    oids
}

/// The smallest prefix-closed subsequence of `superset` that satisfies
/// every dependency of `original`. Admission may return a superset
/// bigger than the candidate; peers only need the slice of it that
/// makes the candidate valid.
pub fn minimum_transaction_set(
    original: &[Transaction],
    superset: &[Transaction],
) -> Vec<Transaction> {
    let wanted: HashSet<Hash> = original.iter().map(Hashable::hash).collect();
    let mut needed_objects: HashSet<ObjectId> = HashSet::new();
    let mut keep = vec![false; superset.len()];

    // Walk backwards so that marking a transaction as required can pull
    // in its own prerequisites, which always appear earlier.
    for (index, txn) in superset.iter().enumerate().rev() {
        let required = wanted.contains(&txn.hash())
            || txn
                .created_object_ids()
                .iter()
                .any(|oid| needed_objects.contains(oid));
        if required {
            keep[index] = true;
            needed_objects.extend(txn.consumed_object_ids());
        }
    }

    superset
        .iter()
        .zip(keep)
        .filter_map(|(txn, keep)| keep.then(|| txn.clone()))
        .collect()
}

/// A pool of unconfirmed transaction sets.
///
/// Sets are admitted or rejected atomically. Every ledger object
/// touched by a pooled set is indexed, so that a candidate spending or
/// recreating an object owned by a pooled set is detected as a
/// double-spend conflict and merged or rejected. The caller supplies
/// the ledger validation callback and must run the whole
/// validate-then-mutate sequence inside the same critical section as
/// chain tip changes.
///
/// # Examples:
///
/// ```
/// # use basalt_data_structures::mempool::TransactionsPool;
/// let pool = TransactionsPool::new();
///
/// assert!(pool.is_empty());
/// assert_eq!(pool.total_bytes(), 0);
/// ```
#[derive(Clone, Debug, Default)]
pub struct TransactionsPool {
    policy: PoolPolicy,
    /// Admitted transaction sets
    sets: HashMap<SetId, Vec<Transaction>>,
    /// Ledger-produced effects of each admitted set
    set_diffs: HashMap<SetId, Diff>,
    /// Owner set of every ledger object touched by a pooled set
    object_index: HashMap<ObjectId, SetId>,
    /// Epoch at which each transaction was first admitted into any set.
    /// Survives set replacement, never decreases.
    first_seen: HashMap<Hash, Epoch>,
    /// Sum of the canonical sizes of all pooled sets
    total_pooled_bytes: u64,
    current_epoch: Epoch,
}

impl TransactionsPool {
    /// Makes a new empty pool of transactions with the default policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes a new empty pool of transactions with a custom policy.
    pub fn with_policy(policy: PoolPolicy) -> Self {
        TransactionsPool {
            policy,
            ..TransactionsPool::default()
        }
    }

    /// Returns `true` if the pool contains no transaction sets.
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Number of transaction sets in the pool.
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Number of transactions across every pooled set.
    pub fn transaction_count(&self) -> usize {
        self.sets.values().map(Vec::len).sum()
    }

    /// Sum of the canonical sizes of every pooled set, in bytes.
    pub fn total_bytes(&self) -> u64 {
        self.total_pooled_bytes
    }

    /// Returns `true` if the pool contains a set with this identifier.
    pub fn contains(&self, set_id: &SetId) -> bool {
        self.sets.contains_key(set_id)
    }

    /// The transactions of a pooled set.
    pub fn get(&self, set_id: &SetId) -> Option<&Vec<Transaction>> {
        self.sets.get(set_id)
    }

    /// The ledger diff produced when a pooled set was admitted.
    pub fn get_diff(&self, set_id: &SetId) -> Option<&Diff> {
        self.set_diffs.get(set_id)
    }

    /// Epoch at which a transaction was first admitted into the pool.
    pub fn first_seen(&self, transaction_id: &Hash) -> Option<Epoch> {
        self.first_seen.get(transaction_id).copied()
    }

    /// Iterate over the pooled sets, in unspecified order.
    pub fn transaction_sets(&self) -> impl Iterator<Item = (&SetId, &Vec<Transaction>)> {
        self.sets.iter()
    }

    /// Identifiers of the pooled sets, sorted for stable listings.
    pub fn sorted_set_ids(&self) -> Vec<SetId> {
        self.sets.keys().copied().sorted().collect()
    }

    /// Tell the pool about the current chain epoch. Used to stamp the
    /// first-seen epoch of admitted transactions. Monotonic.
    pub fn set_current_epoch(&mut self, epoch: Epoch) {
        if epoch > self.current_epoch {
            self.current_epoch = epoch;
        }
    }

    /// Fee rate currently required to extend the pool, in motes per
    /// byte. While the pool is nearly empty it can be extended for
    /// free.
    pub fn required_fee_per_byte(&self) -> RelativeFee {
        if self.total_pooled_bytes < self.policy.size_for_fee {
            return RelativeFee::zero();
        }

        required_fee_per_byte_at_size(self.total_pooled_bytes, &self.policy)
    }

    /// Submit a candidate transaction set for admission into the pool.
    ///
    /// The pipeline filters out already-confirmed transactions, checks
    /// composition and fees, resolves double-spend conflicts with
    /// pooled sets, validates the result against the ledger through
    /// `validate` and finally registers it. On success the admitted set
    /// is returned: the candidate itself, or the superset it was merged
    /// into. On error the pool is left exactly as it was.
    ///
    /// `validate` must atomically check the set against the current
    /// chain tip; the caller is responsible for making sure no tip
    /// change can interleave with this call.
    pub fn accept_transaction_set<C, V>(
        &mut self,
        candidate: Vec<Transaction>,
        is_confirmed: &C,
        validate: &mut V,
    ) -> Result<Vec<Transaction>, TransactionPoolError>
    where
        C: Fn(&Hash) -> bool,
        V: FnMut(&[Transaction]) -> Result<Diff, TransactionError>,
    {
        if candidate.is_empty() {
            return Err(TransactionPoolError::EmptySet);
        }

        // Remove all transactions that have already been confirmed.
        let candidate: Vec<Transaction> = candidate
            .into_iter()
            .filter(|txn| !is_confirmed(&txn.hash()))
            .collect();
        if candidate.is_empty() {
            return Err(TransactionPoolError::DuplicateSet);
        }

        let set_size = self.check_composition(&candidate)?;
        self.check_fees(&candidate, set_size)?;

        // A hit in the object index indicates a double-spend, or a
        // legal child of a pooled set. Both go through the resolver.
        let conflicts = self.find_conflicts(&related_object_ids(&candidate));
        if !conflicts.is_empty() {
            return self.handle_conflicts(candidate, conflicts, validate);
        }

        let diff = validate(&candidate).map_err(|e| TransactionPoolError::InvalidSet {
            msg: format!("provided transaction set is invalid: {e}"),
        })?;

        let set_id = transaction_set_id(&candidate);
        self.install(set_id, candidate, diff, set_size);

        Ok(self.sets[&set_id].clone())
    }

    /// Merge a candidate with every pooled set it conflicts with, or
    /// fail. Implemented as a loop rather than recursion: after the
    /// first pruning pass the candidate is fully deduplicated against
    /// the pool, so the recomputed conflict list can never prune again
    /// and the second iteration always reaches the merge.
    fn handle_conflicts<V>(
        &mut self,
        mut candidate: Vec<Transaction>,
        mut conflicts: HashSet<SetId>,
        validate: &mut V,
    ) -> Result<Vec<Transaction>, TransactionPoolError>
    where
        V: FnMut(&[Transaction]) -> Result<Diff, TransactionError>,
    {
        loop {
            let mut conflict_map: HashMap<Hash, SetId> = HashMap::new();
            for set_id in &conflicts {
                if let Some(txns) = self.sets.get(set_id) {
                    for txn in txns {
                        conflict_map.insert(txn.hash(), *set_id);
                    }
                }
            }

            // Discard transactions that are already pooled under one of
            // the conflicting sets: they contribute nothing new.
            let len_before = candidate.len();
            candidate.retain(|txn| !conflict_map.contains_key(&txn.hash()));
            if candidate.is_empty() {
                return Err(TransactionPoolError::DuplicateSet);
            }
            if candidate.len() < len_before {
                // Pruning may have shrunk the true conflict list. As an
                // example, the candidate {A, C} conflicting through C
                // with the pooled set {B} reduces to {A}, which may
                // conflict with nothing at all.
                conflicts = self.find_conflicts(&related_object_ids(&candidate));
                continue;
            }

            // Merge every conflicting set with the candidate. The
            // candidate goes last: it may spend outputs created by the
            // pooled sets, never the reverse.
            let merged: HashSet<SetId> = conflict_map.values().copied().collect();
            let mut superset: Vec<Transaction> = merged
                .iter()
                .filter_map(|set_id| self.sets.get(set_id))
                .flatten()
                .cloned()
                .collect();
            superset.extend(candidate);

            // A merged set is re-priced and re-checked as a whole.
            let set_size = self.check_composition(&superset)?;
            self.check_fees(&superset, set_size)?;

            let diff = validate(&superset).map_err(|e| TransactionPoolError::InvalidSet {
                msg: format!("transaction set has pooled prerequisites, but is still invalid: {e}"),
            })?;

            for set_id in &merged {
                self.evict(*set_id);
            }
            let set_id = transaction_set_id(&superset);
            self.install(set_id, superset, diff, set_size);

            return Ok(self.sets[&set_id].clone());
        }
    }

    /// Check that the candidate is neither a known set nor in violation
    /// of the standardness rules. Returns its canonical size.
    fn check_composition(&self, txns: &[Transaction]) -> Result<u64, TransactionPoolError> {
        if self.sets.contains_key(&transaction_set_id(txns)) {
            return Err(TransactionPoolError::DuplicateSet);
        }

        self.standard_transaction_set(txns)
    }

    /// Format and size rules a set must satisfy beyond ledger validity.
    fn standard_transaction_set(&self, txns: &[Transaction]) -> Result<u64, TransactionPoolError> {
        let set_size = transaction_set_size(txns);
        if set_size > self.policy.max_set_size {
            return Err(TransactionPoolError::NonStandard {
                reason: format!(
                    "set size {} exceeds the limit of {} bytes",
                    set_size, self.policy.max_set_size
                ),
            });
        }

        for txn in txns {
            let txn_size = txn.encoded_size();
            if txn_size > self.policy.max_transaction_size {
                return Err(TransactionPoolError::NonStandard {
                    reason: format!(
                        "transaction size {} exceeds the limit of {} bytes",
                        txn_size, self.policy.max_transaction_size
                    ),
                });
            }
            if txn.coin_inputs.is_empty()
                && txn.storage_contracts.is_empty()
                && txn.contract_revisions.is_empty()
                && txn.storage_proofs.is_empty()
            {
                return Err(TransactionPoolError::NonStandard {
                    reason: "transaction touches no ledger object".into(),
                });
            }
            if txn.coin_outputs.iter().any(|output| output.value.is_zero()) {
                return Err(TransactionPoolError::NonStandard {
                    reason: "transaction declares a zero-valued coin output".into(),
                });
            }
        }

        Ok(set_size)
    }

    /// Check that the declared miner fees justify extending the pool by
    /// `set_size` bytes at the current occupancy. Paying exactly the
    /// required fee is sufficient.
    fn check_fees(&self, txns: &[Transaction], set_size: u64) -> Result<(), TransactionPoolError> {
        let required = self.required_fee_per_byte().into_absolute(set_size);
        let offered = transaction_set_fees(txns).ok_or(TransactionPoolError::NonStandard {
            reason: "declared miner fees overflow".into(),
        })?;
        if offered < required {
            return Err(TransactionPoolError::InsufficientFee { required, offered });
        }

        Ok(())
    }

    /// Owner sets of every object in `oids`.
    fn find_conflicts(&self, oids: &HashSet<ObjectId>) -> HashSet<SetId> {
        oids.iter()
            .filter_map(|oid| self.object_index.get(oid))
            .copied()
            .collect()
    }

    /// Register an admitted set. `set_size` must be the canonical size
    /// of `txns`.
    fn install(&mut self, set_id: SetId, txns: Vec<Transaction>, diff: Diff, set_size: u64) {
        for oid in diff.related_object_ids() {
            self.object_index.insert(oid, set_id);
        }
        let epoch = self.current_epoch;
        for txn in &txns {
            self.first_seen.entry(txn.hash()).or_insert(epoch);
        }
        self.total_pooled_bytes += set_size;
        self.set_diffs.insert(set_id, diff);
        self.sets.insert(set_id, txns);
    }

    /// Remove a set, its diff, its byte accounting and every object
    /// index entry pointing at it. First-seen epochs are kept: they
    /// must survive set replacement.
    fn evict(&mut self, set_id: SetId) {
        if let Some(txns) = self.sets.remove(&set_id) {
            self.total_pooled_bytes -= transaction_set_size(&txns);
            self.set_diffs.remove(&set_id);
            self.object_index.retain(|_oid, owner| *owner != set_id);
        }
    }

    /// Rebuild the pool after a chain tip change: drop every confirmed
    /// transaction and re-admit what remains of each set through the
    /// normal pipeline, so that diffs are recomputed against the new
    /// tip. Returns how many sets were re-admitted and dropped.
    pub fn remove_confirmed<C, V>(&mut self, is_confirmed: &C, validate: &mut V) -> (usize, usize)
    where
        C: Fn(&Hash) -> bool,
        V: FnMut(&[Transaction]) -> Result<Diff, TransactionError>,
    {
        let previous: Vec<Vec<Transaction>> =
            self.sets.drain().map(|(_set_id, txns)| txns).collect();
        self.set_diffs.clear();
        self.object_index.clear();
        self.total_pooled_bytes = 0;

        let mut readmitted = 0;
        let mut dropped = 0;
        for txns in previous {
            let remainder: Vec<Transaction> = txns
                .into_iter()
                .filter(|txn| !is_confirmed(&txn.hash()))
                .collect();
            if remainder.is_empty() {
                continue;
            }
            match self.accept_transaction_set(remainder, is_confirmed, validate) {
                Ok(_) => readmitted += 1,
                Err(e) => {
                    log::debug!("dropping transaction set during tip change: {e}");
                    dropped += 1;
                }
            }
        }
        self.prune_first_seen();

        (readmitted, dropped)
    }

    /// Evict every set containing a transaction that has lingered
    /// unconfirmed beyond the maximum age. Returns how many sets were
    /// purged.
    pub fn purge_stale(&mut self) -> usize {
        let cutoff = self
            .current_epoch
            .saturating_sub(self.policy.transaction_max_age);
        let stale: Vec<SetId> = self
            .sets
            .iter()
            .filter(|(_set_id, txns)| {
                txns.iter().any(|txn| {
                    self.first_seen
                        .get(&txn.hash())
                        .is_some_and(|seen| *seen < cutoff)
                })
            })
            .map(|(set_id, _txns)| *set_id)
            .collect();

        let purged = stale.len();
        for set_id in stale {
            self.evict(set_id);
        }
        if purged > 0 {
            self.prune_first_seen();
        }

        purged
    }

    /// Drop first-seen entries of transactions that no longer live in
    /// any pooled set.
    fn prune_first_seen(&mut self) {
        let live: HashSet<Hash> = self
            .sets
            .values()
            .flatten()
            .map(Hashable::hash)
            .collect();
        self.first_seen
            .retain(|transaction_id, _epoch| live.contains(transaction_id));
    }
}

/// Sum of the miner fees declared across every transaction of the set,
/// `None` on overflow.
pub fn transaction_set_fees(txns: &[Transaction]) -> Option<AbsoluteFee> {
    txns.iter().try_fold(AbsoluteFee::zero(), |sum, txn| {
        sum.checked_add(txn.total_miner_fees()?)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        chain::{calculate_sha256, OutputPointer},
        coin::Coin,
        transaction::{CoinOutput, Input},
    };

    // Builds the diff the ledger would produce for a structurally
    // sound set: spend every input, create every output.
    fn permissive_validate(txns: &[Transaction]) -> Result<Diff, TransactionError> {
        let mut diff = Diff::new();
        for txn in txns {
            for input in &txn.coin_inputs {
                diff.remove_utxo(*input.output_pointer());
            }
            for (index, output) in txn.coin_outputs.iter().enumerate() {
                diff.add_utxo(txn.output_pointer(index as u32), output.clone());
            }
            for (index, contract) in txn.storage_contracts.iter().enumerate() {
                diff.add_contract(txn.storage_contract_id(index as u32), contract.clone());
            }
        }

        Ok(diff)
    }

    fn rejecting_validate(_txns: &[Transaction]) -> Result<Diff, TransactionError> {
        Err(TransactionError::MissingInput {
            output: OutputPointer::default(),
        })
    }

    fn never_confirmed(_id: &Hash) -> bool {
        false
    }

    fn output(value: u64) -> CoinOutput {
        CoinOutput {
            value: Coin::from_motes(value),
            ..CoinOutput::default()
        }
    }

    /// Transaction spending a synthetic confirmed output named `name`
    fn txn_from_genesis(name: &[u8]) -> Transaction {
        Transaction {
            coin_inputs: vec![Input::new(OutputPointer {
                transaction_id: calculate_sha256(name),
                output_index: 0,
            })],
            coin_outputs: vec![output(1_000)],
            ..Transaction::default()
        }
    }

    /// Transaction spending the first output of `parent`
    fn txn_spending(parent: &Transaction) -> Transaction {
        Transaction {
            coin_inputs: vec![Input::new(parent.output_pointer(0))],
            coin_outputs: vec![output(500)],
            ..Transaction::default()
        }
    }

    fn accept(
        pool: &mut TransactionsPool,
        txns: Vec<Transaction>,
    ) -> Result<Vec<Transaction>, TransactionPoolError> {
        let result = pool.accept_transaction_set(txns, &never_confirmed, &mut permissive_validate);
        assert_invariants(pool);

        result
    }

    fn assert_invariants(pool: &TransactionsPool) {
        // Byte accounting is exact at every observation point
        let sum: u64 = pool.sets.values().map(|txns| transaction_set_size(txns)).sum();
        assert_eq!(pool.total_pooled_bytes, sum);

        // Every set has exactly one diff and vice versa
        assert_eq!(pool.set_diffs.len(), pool.sets.len());
        for set_id in pool.sets.keys() {
            assert!(pool.set_diffs.contains_key(set_id));
        }

        // The object index points at live sets only, and every object of
        // every diff is owned by the set that produced it
        for owner in pool.object_index.values() {
            assert!(pool.sets.contains_key(owner));
        }
        for (set_id, diff) in &pool.set_diffs {
            for oid in diff.related_object_ids() {
                assert_eq!(pool.object_index.get(&oid), Some(set_id));
            }
        }

        // Pooled transactions all have a first-seen epoch
        for txn in pool.sets.values().flatten() {
            assert!(pool.first_seen.contains_key(&txn.hash()));
        }
    }

    #[test]
    fn empty_set_is_rejected() {
        let mut pool = TransactionsPool::new();

        assert_eq!(accept(&mut pool, vec![]), Err(TransactionPoolError::EmptySet));
    }

    #[test]
    fn duplicate_submission_is_idempotent() {
        let mut pool = TransactionsPool::new();
        let set = vec![txn_from_genesis(b"a")];

        assert!(accept(&mut pool, set.clone()).is_ok());
        let bytes_after_first = pool.total_bytes();

        assert_eq!(
            accept(&mut pool, set),
            Err(TransactionPoolError::DuplicateSet)
        );
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.total_bytes(), bytes_after_first);
    }

    #[test]
    fn byte_accounting_is_exact_across_submissions() {
        let mut pool = TransactionsPool::new();

        let a = txn_from_genesis(b"a");
        let b = txn_from_genesis(b"b");
        let c = txn_spending(&a);

        accept(&mut pool, vec![a.clone()]).unwrap();
        accept(&mut pool, vec![b]).unwrap();
        // Child of `a`: merges into a superset, evicting the set of `a`
        accept(&mut pool, vec![c]).unwrap();

        assert_eq!(pool.len(), 2);
        let sum: u64 = pool
            .transaction_sets()
            .map(|(_id, txns)| transaction_set_size(txns))
            .sum();
        assert_eq!(pool.total_bytes(), sum);
    }

    #[test]
    fn child_merges_after_its_parent() {
        let mut pool = TransactionsPool::new();
        let a = txn_from_genesis(b"a");
        let b = txn_from_genesis(b"b");
        let c = txn_spending(&a);

        accept(&mut pool, vec![a.clone()]).unwrap();
        let superset = accept(&mut pool, vec![b.clone(), c.clone()]).unwrap();

        assert_eq!(superset.len(), 3);
        let position = |txn: &Transaction| {
            superset
                .iter()
                .position(|t| t.hash() == txn.hash())
                .unwrap()
        };
        // The candidate may depend on outputs created by the pooled
        // set, so the pooled transactions must come first
        assert!(position(&a) < position(&c));
        assert!(position(&b) > position(&a));

        // The merged superset replaced the set of `a`
        assert_eq!(pool.len(), 1);
        assert!(!pool.contains(&transaction_set_id(&[a])));
    }

    #[test]
    fn two_conflicts_merge_in_a_single_pass() {
        let mut pool = TransactionsPool::new();
        let x = txn_from_genesis(b"x");
        let y = txn_from_genesis(b"y");

        accept(&mut pool, vec![x.clone()]).unwrap();
        accept(&mut pool, vec![y.clone()]).unwrap();

        // The candidate touches objects of both pooled sets without
        // repeating any of their transactions, so nothing is pruned
        // and both sets merge with the candidate in one pass
        let x_child = txn_spending(&x);
        let y_child = txn_spending(&y);
        let z = txn_from_genesis(b"z");
        let candidate = vec![x_child.clone(), y_child.clone(), z.clone()];
        let superset = accept(&mut pool, candidate.clone()).unwrap();

        assert_eq!(superset.len(), 5);
        assert_eq!(pool.len(), 1);
        // The candidate keeps its order, appended after the pooled sets
        let tail: Vec<Hash> = superset[2..].iter().map(Hashable::hash).collect();
        assert_eq!(
            tail,
            candidate.iter().map(Hashable::hash).collect::<Vec<Hash>>()
        );
        let position = |txn: &Transaction| {
            superset
                .iter()
                .position(|t| t.hash() == txn.hash())
                .unwrap()
        };
        assert!(position(&x) < position(&x_child));
        assert!(position(&y) < position(&y_child));
    }

    #[test]
    fn fully_duplicated_conflicts_leave_the_pool_alone() {
        let mut pool = TransactionsPool::new();
        let x = txn_from_genesis(b"x");
        let y = txn_from_genesis(b"y");
        let z = txn_from_genesis(b"z");

        accept(&mut pool, vec![x.clone()]).unwrap();
        accept(&mut pool, vec![y.clone()]).unwrap();

        // Every conflicting transaction of the candidate is an exact
        // duplicate of a pooled one, so pruning leaves only Z, which
        // conflicts with nothing and lands in its own set
        let superset = accept(&mut pool, vec![x.clone(), y.clone(), z.clone()]).unwrap();

        assert_eq!(superset.len(), 1);
        assert_eq!(superset[0].hash(), z.hash());
        assert_eq!(pool.len(), 3);
        assert!(pool.contains(&transaction_set_id(&[x])));
        assert!(pool.contains(&transaction_set_id(&[y])));
    }

    #[test]
    fn pruning_shrinks_the_conflict_list() {
        let mut pool = TransactionsPool::new();
        let a = txn_from_genesis(b"a");
        let b = txn_from_genesis(b"b");
        let c = txn_spending(&b);

        accept(&mut pool, vec![a.clone()]).unwrap();
        accept(&mut pool, vec![b.clone()]).unwrap();

        // {A, C}: A is an exact duplicate of a pooled set, C depends on
        // the other pooled set. After pruning A the only remaining
        // conflict is the set of B, so the set of A must survive.
        let superset = accept(&mut pool, vec![a.clone(), c.clone()]).unwrap();

        assert_eq!(superset.len(), 2);
        assert_eq!(superset[0].hash(), b.hash());
        assert_eq!(superset[1].hash(), c.hash());
        assert_eq!(pool.len(), 2);
        assert!(pool.contains(&transaction_set_id(&[a])));
    }

    #[test]
    fn candidate_subsumed_by_pooled_set_is_a_duplicate() {
        let mut pool = TransactionsPool::new();
        let a = txn_from_genesis(b"a");
        let b = txn_from_genesis(b"b");

        accept(&mut pool, vec![a.clone(), b]).unwrap();

        // {A} is not the same set, but every transaction in it is
        // already pooled
        assert_eq!(
            accept(&mut pool, vec![a]),
            Err(TransactionPoolError::DuplicateSet)
        );
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn confirmed_transactions_are_filtered_before_admission() {
        let mut pool = TransactionsPool::new();
        let a = txn_from_genesis(b"a");
        let b = txn_from_genesis(b"b");
        let confirmed_id = a.hash();
        let is_confirmed = move |id: &Hash| *id == confirmed_id;

        let admitted = pool
            .accept_transaction_set(vec![a.clone(), b.clone()], &is_confirmed, &mut permissive_validate)
            .unwrap();
        assert_eq!(admitted.len(), 1);
        assert_eq!(admitted[0].hash(), b.hash());

        // A candidate whose every transaction is confirmed is a
        // duplicate of chain history
        assert_eq!(
            pool.accept_transaction_set(vec![a], &is_confirmed, &mut permissive_validate),
            Err(TransactionPoolError::DuplicateSet)
        );
    }

    #[test]
    fn invalid_set_reports_the_ledger_error() {
        let mut pool = TransactionsPool::new();

        let result = pool.accept_transaction_set(
            vec![txn_from_genesis(b"a")],
            &never_confirmed,
            &mut rejecting_validate,
        );

        match result {
            Err(TransactionPoolError::InvalidSet { msg }) => {
                assert!(msg.starts_with("provided transaction set is invalid"));
            }
            other => panic!("expected InvalidSet, got {other:?}"),
        }
        assert!(pool.is_empty());
        assert_invariants(&pool);
    }

    #[test]
    fn invalid_merged_set_reports_a_distinct_message() {
        let mut pool = TransactionsPool::new();
        let a = txn_from_genesis(b"a");
        accept(&mut pool, vec![a.clone()]).unwrap();

        let result = pool.accept_transaction_set(
            vec![txn_spending(&a)],
            &never_confirmed,
            &mut rejecting_validate,
        );

        match result {
            Err(TransactionPoolError::InvalidSet { msg }) => {
                assert!(msg.contains("pooled prerequisites"));
            }
            other => panic!("expected InvalidSet, got {other:?}"),
        }
        // The conflicting set is untouched by the failed merge
        assert_eq!(pool.len(), 1);
        assert_invariants(&pool);
    }

    #[test]
    fn fee_gate_admits_at_exactly_the_required_fee() {
        let policy = PoolPolicy {
            // Fees apply from the very first byte
            size_for_fee: 0,
            size_target: 1_000,
            fee_exponent: 2.0,
            base_fee_per_byte: 10.0,
            ..PoolPolicy::default()
        };
        let mut pool = TransactionsPool::with_policy(policy);

        // The pool is extended for free while empty; fill it a little
        // so that the curve starts charging
        accept(&mut pool, vec![txn_from_genesis(b"fill")]).unwrap();

        // The fee value does not change the encoded size (fixed-width
        // integers), so the requirement can be computed on a probe
        let mut txn = txn_from_genesis(b"a");
        txn.miner_fees = vec![Coin::from_motes(0)];
        let set_size = transaction_set_size(std::slice::from_ref(&txn));
        let required = pool.required_fee_per_byte().into_absolute(set_size);
        assert!(required.as_motes() > 0);

        let mut underpaying = txn.clone();
        underpaying.miner_fees = vec![Coin::from_motes(required.as_motes() - 1)];
        match accept(&mut pool, vec![underpaying]) {
            Err(TransactionPoolError::InsufficientFee { required: r, offered }) => {
                assert_eq!(r, required);
                assert_eq!(offered.as_motes(), required.as_motes() - 1);
            }
            other => panic!("expected InsufficientFee, got {other:?}"),
        }
        assert!(pool.is_empty());

        let mut paying = txn;
        paying.miner_fees = vec![Coin::from_motes(required.as_motes())];
        assert!(accept(&mut pool, vec![paying]).is_ok());
    }

    #[test]
    fn fee_curve_is_zero_below_threshold_and_convex_above() {
        let policy = PoolPolicy::default();
        let pool = TransactionsPool::new();

        // Empty pool: always free
        assert!(pool.required_fee_per_byte().is_zero());

        // At the target the curve pays exactly the base rate
        let at_target = required_fee_per_byte_at_size(policy.size_target, &policy);
        assert!((at_target.as_f64() - policy.base_fee_per_byte).abs() < f64::EPSILON);

        // Doubling the occupancy multiplies the rate by 2^k
        let at_double = required_fee_per_byte_at_size(2 * policy.size_target, &policy);
        let expected = policy.base_fee_per_byte * 2f64.powf(policy.fee_exponent);
        assert!((at_double.as_f64() - expected).abs() < 1e-9);
    }

    #[test]
    fn non_standard_sets_are_rejected() {
        let mut pool = TransactionsPool::with_policy(PoolPolicy {
            max_transaction_size: 64,
            ..PoolPolicy::default()
        });

        // Oversized transaction
        let mut big = txn_from_genesis(b"a");
        big.coin_outputs = vec![output(1); 16];
        assert!(matches!(
            accept(&mut pool, vec![big]),
            Err(TransactionPoolError::NonStandard { .. })
        ));

        // Transaction touching no ledger object
        let detached = Transaction {
            coin_outputs: vec![output(1)],
            ..Transaction::default()
        };
        assert!(matches!(
            accept(&mut pool, vec![detached]),
            Err(TransactionPoolError::NonStandard { .. })
        ));

        // Zero-valued output
        let mut zero = txn_from_genesis(b"a");
        zero.coin_outputs = vec![output(0)];
        assert!(matches!(
            accept(&mut pool, vec![zero]),
            Err(TransactionPoolError::NonStandard { .. })
        ));

        assert!(pool.is_empty());
    }

    #[test]
    fn first_seen_survives_merge_and_remove_confirmed() {
        let mut pool = TransactionsPool::new();
        let a = txn_from_genesis(b"a");

        pool.set_current_epoch(7);
        accept(&mut pool, vec![a.clone()]).unwrap();
        assert_eq!(pool.first_seen(&a.hash()), Some(7));

        // Merging into a superset must not reset the first-seen epoch
        pool.set_current_epoch(9);
        let c = txn_spending(&a);
        accept(&mut pool, vec![c.clone()]).unwrap();
        assert_eq!(pool.first_seen(&a.hash()), Some(7));
        assert_eq!(pool.first_seen(&c.hash()), Some(9));

        // Confirming `a` re-admits {c} alone, keeping its epoch
        let confirmed_id = a.hash();
        let is_confirmed = move |id: &Hash| *id == confirmed_id;
        pool.set_current_epoch(10);
        let (readmitted, dropped) =
            pool.remove_confirmed(&is_confirmed, &mut permissive_validate);
        assert_eq!((readmitted, dropped), (1, 0));
        assert_eq!(pool.transaction_count(), 1);
        assert_eq!(pool.first_seen(&c.hash()), Some(9));
        assert_eq!(pool.first_seen(&a.hash()), None);
        assert_invariants(&pool);
    }

    #[test]
    fn stale_sets_are_purged_by_age() {
        let mut pool = TransactionsPool::with_policy(PoolPolicy {
            transaction_max_age: 10,
            ..PoolPolicy::default()
        });

        pool.set_current_epoch(1);
        accept(&mut pool, vec![txn_from_genesis(b"old")]).unwrap();
        pool.set_current_epoch(5);
        let fresh = txn_from_genesis(b"fresh");
        accept(&mut pool, vec![fresh.clone()]).unwrap();

        // Not old enough yet
        pool.set_current_epoch(11);
        assert_eq!(pool.purge_stale(), 0);

        pool.set_current_epoch(12);
        assert_eq!(pool.purge_stale(), 1);
        assert_eq!(pool.len(), 1);
        assert!(pool.contains(&transaction_set_id(&[fresh])));
        assert_invariants(&pool);
    }

    #[test]
    fn minimum_set_keeps_dependencies_only() {
        let a = txn_from_genesis(b"a");
        let b = txn_from_genesis(b"b");
        let c = txn_spending(&a);
        let superset = vec![a.clone(), b, c.clone()];

        let minimum = minimum_transaction_set(std::slice::from_ref(&c), &superset);

        assert_eq!(minimum.len(), 2);
        assert_eq!(minimum[0].hash(), a.hash());
        assert_eq!(minimum[1].hash(), c.hash());
    }

    #[test]
    fn minimum_set_of_independent_candidate_is_itself() {
        let a = txn_from_genesis(b"a");
        let b = txn_from_genesis(b"b");
        let superset = vec![a, b.clone()];

        let minimum = minimum_transaction_set(std::slice::from_ref(&b), &superset);

        assert_eq!(minimum.len(), 1);
        assert_eq!(minimum[0].hash(), b.hash());
    }
}
