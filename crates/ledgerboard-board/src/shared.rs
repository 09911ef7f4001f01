//! Thread-safe handle around one [`Board`].

use std::sync::{Arc, Mutex};

use crate::board::Board;
use crate::error::BoardError;

/// Serializes whole board operations behind one lock.
///
/// The lock is held across the store mutation and the chain append, so
/// concurrent callers never interleave between the two.
#[derive(Debug, Clone, Default)]
pub struct SharedBoard {
    inner: Arc<Mutex<Board>>,
}

impl SharedBoard {
    pub fn new(board: Board) -> Self {
        Self {
            inner: Arc::new(Mutex::new(board)),
        }
    }

    /// Run one mutating operation with exclusive access.
    pub fn dispatch<T>(
        &self,
        operation: impl FnOnce(&mut Board) -> Result<T, BoardError>,
    ) -> Result<T, BoardError> {
        let mut board = self.inner.lock().map_err(|_| BoardError::Poisoned)?;
        operation(&mut board)
    }

    pub fn read<T>(&self, query: impl FnOnce(&Board) -> T) -> Result<T, BoardError> {
        let board = self.inner.lock().map_err(|_| BoardError::Poisoned)?;
        Ok(query(&board))
    }
}
