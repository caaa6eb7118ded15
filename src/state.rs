//! Per-handle error and transaction state

use crate::error::{Error, Result};

/// State of the handle's explicit transaction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TransactionState {
    /// No transaction is open; every recording call commits on its own.
    #[default]
    Idle,
    /// A transaction is open and no recording call has failed inside it.
    Open,
    /// A recording call failed inside the open transaction. Commit will roll
    /// everything back.
    Tainted { first_error: String },
}

impl TransactionState {
    pub fn is_open(&self) -> bool {
        !matches!(self, TransactionState::Idle)
    }
}

/// Last error message plus transaction state of one writer handle
#[derive(Debug, Default)]
pub struct WriterState {
    last_error: String,
    transaction: TransactionState,
}

impl WriterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_error(&self) -> &str {
        &self.last_error
    }

    pub fn clear_last_error(&mut self) {
        self.last_error.clear();
    }

    pub fn transaction(&self) -> &TransactionState {
        &self.transaction
    }

    /// Remember a failed lifecycle call without touching the transaction
    pub fn set_last_error(&mut self, error: &Error) {
        self.last_error = error.to_string();
    }

    /// Remember a failed recording call. The first failure inside an open
    /// transaction taints it.
    pub fn record_failure(&mut self, error: &Error) {
        self.set_last_error(error);
        if self.transaction == TransactionState::Open {
            self.transaction = TransactionState::Tainted {
                first_error: self.last_error.clone(),
            };
        }
    }

    /// Move from `Idle` to `Open`
    pub fn begin(&mut self) -> Result<()> {
        if self.transaction.is_open() {
            return Err(Error::TransactionState(
                "a transaction is already open".to_string(),
            ));
        }
        self.transaction = TransactionState::Open;
        Ok(())
    }

    /// Close the open transaction, returning the state it was in
    pub fn finish(&mut self) -> Result<TransactionState> {
        if !self.transaction.is_open() {
            return Err(Error::TransactionState(
                "no transaction is open".to_string(),
            ));
        }
        Ok(std::mem::take(&mut self.transaction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_twice_fails() {
        let mut state = WriterState::new();
        state.begin().unwrap();
        assert!(matches!(state.begin(), Err(Error::TransactionState(_))));
    }

    #[test]
    fn test_finish_without_begin_fails() {
        let mut state = WriterState::new();
        assert!(matches!(state.finish(), Err(Error::TransactionState(_))));
    }

    #[test]
    fn test_failure_taints_open_transaction_once() {
        let mut state = WriterState::new();
        state.begin().unwrap();
        state.record_failure(&Error::UnknownSymbol(7));
        state.record_failure(&Error::UnknownFile(9));

        assert_eq!(state.last_error(), "Unknown file id: 9");
        match state.finish().unwrap() {
            TransactionState::Tainted { first_error } => {
                assert_eq!(first_error, "Unknown symbol id: 7")
            }
            other => panic!("expected tainted transaction, got {:?}", other),
        }
        assert_eq!(state.transaction(), &TransactionState::Idle);
    }

    #[test]
    fn test_lifecycle_error_does_not_taint() {
        let mut state = WriterState::new();
        state.begin().unwrap();
        state.set_last_error(&Error::TransactionState("already open".to_string()));
        assert_eq!(state.transaction(), &TransactionState::Open);
    }

    #[test]
    fn test_failure_outside_transaction_only_sets_last_error() {
        let mut state = WriterState::new();
        state.record_failure(&Error::UnknownReference(3));
        assert_eq!(state.transaction(), &TransactionState::Idle);
        assert!(!state.last_error().is_empty());

        state.clear_last_error();
        assert_eq!(state.last_error(), "");
    }
}
