//! Error type definitions for the data structure module.

use thiserror::Error;

use crate::{
    chain::{Epoch, Hash, OutputPointer},
    coin::Coin,
    fee::AbsoluteFee,
};

/// Errors while parsing a hash or an address from its string form
#[derive(Debug, PartialEq, Error)]
pub enum HashParseError {
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("invalid length: {0} bytes")]
    InvalidLength(usize),
}

/// Errors returned by the unconfirmed transaction admission pipeline.
///
/// Every variant is surfaced synchronously to the submitter; none of
/// them leaves the pool partially mutated.
#[derive(Debug, Eq, PartialEq, Error)]
pub enum TransactionPoolError {
    /// The candidate contained no transactions at all
    #[error("transaction set is empty")]
    EmptySet,
    /// The candidate is already pooled, or every transaction in it is
    /// already confirmed on the chain
    #[error("transaction set is a duplicate of a previously pooled set")]
    DuplicateSet,
    /// The candidate violates format or size rules
    #[error("transaction set is not standard: {reason}")]
    NonStandard { reason: String },
    /// The declared miner fees do not cover the current admission price
    #[error(
        "transaction set needs more miner fees to be accepted: required {required}, offered {offered}"
    )]
    InsufficientFee {
        required: AbsoluteFee,
        offered: AbsoluteFee,
    },
    /// The ledger rejected the candidate or its merged superset. The
    /// message tells the two cases apart.
    #[error("{msg}")]
    InvalidSet { msg: String },
    /// The pool cannot be reached, e.g. because the node is shutting down
    #[error("transaction pool is unavailable")]
    ResourceUnavailable,
}

/// Errors found while validating a transaction against the ledger
#[derive(Debug, Eq, PartialEq, Error)]
pub enum TransactionError {
    #[error("input {output} does not reference a known unspent output")]
    MissingInput { output: OutputPointer },
    #[error("output {output} is spent twice within the same transaction set")]
    OutputAlreadySpent { output: OutputPointer },
    #[error("transaction spends {inputs} but commits {committed} to outputs, contracts and fees")]
    NegativeBalance { inputs: Coin, committed: Coin },
    #[error("value committed by the transaction overflows")]
    ValueOverflow,
    #[error("revision or proof references unknown storage contract {id}")]
    UnknownContract { id: Hash },
    #[error("storage contract {id} already exists")]
    ContractAlreadyExists { id: Hash },
    #[error("revision {new} does not supersede revision {current} of contract {id}")]
    StaleRevision { id: Hash, current: u64, new: u64 },
    #[error("proof window of contract {id} is not open at epoch {epoch}")]
    ProofWindowClosed { id: Hash, epoch: Epoch },
    #[error("storage contract proof window is malformed (start {window_start}, end {window_end})")]
    MalformedWindow {
        window_start: Epoch,
        window_end: Epoch,
    },
}

/// Errors found while processing a block received from a peer
#[derive(Debug, Eq, PartialEq, Error)]
pub enum BlockError {
    #[error("block was already processed by this node")]
    KnownBlock,
    #[error("block does not extend the current tip: expected parent {expected}, found {found}")]
    UnknownParent { expected: Hash, found: Hash },
    #[error("block checkpoint {found} does not follow the current tip {current}")]
    WrongCheckpoint { current: Epoch, found: Epoch },
    #[error("block size {size} exceeds the block size limit {limit}")]
    ExceedsSizeLimit { size: u64, limit: u64 },
    #[error("block transaction root does not match its transaction list")]
    WrongTransactionsRoot,
    #[error("block contains a repeated transaction")]
    RepeatedTransaction,
    #[error("invalid block transactions: {0}")]
    InvalidTransactions(#[from] TransactionError),
}
