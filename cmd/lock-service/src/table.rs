use std::collections::HashMap;

use crate::error::LockError;

/// Lock state of one resource name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Unheld,
    Exclusive,
    /// Number of readers, never zero.
    Shared(usize),
}

/// Resource name to lock state for a single coordinator.
///
/// Only held names are stored: a missing key is `Unheld`, and the entry is
/// removed as soon as the last holder releases it. Every operation is an
/// immediate test-and-set; nothing here waits.
#[derive(Debug, Default)]
pub struct LockTable {
    locks: HashMap<String, LockState>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, name: &str) -> LockState {
        self.locks.get(name).copied().unwrap_or(LockState::Unheld)
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    /// Grants the exclusive lock only if nobody holds `name`.
    pub fn try_lock(&mut self, name: &str) -> bool {
        if self.locks.contains_key(name) {
            return false;
        }
        self.locks.insert(name.to_string(), LockState::Exclusive);
        true
    }

    /// Drops whatever is held on `name`.
    pub fn unlock(&mut self, name: &str) -> Result<(), LockError> {
        match self.locks.remove(name) {
            Some(_) => Ok(()),
            None => Err(LockError::NotLocked {
                name: name.to_string(),
            }),
        }
    }

    /// Adds a reader unless a writer holds `name`.
    pub fn try_rlock(&mut self, name: &str) -> bool {
        match self.locks.get_mut(name) {
            None => {
                self.locks.insert(name.to_string(), LockState::Shared(1));
                true
            }
            Some(LockState::Shared(readers)) => {
                *readers += 1;
                true
            }
            Some(LockState::Exclusive) | Some(LockState::Unheld) => false,
        }
    }

    /// Removes one reader; the last one removes the entry.
    pub fn runlock(&mut self, name: &str) -> Result<(), LockError> {
        match self.locks.get_mut(name) {
            None => Err(LockError::NotRLocked {
                name: name.to_string(),
            }),
            Some(LockState::Shared(readers)) if *readers > 1 => {
                *readers -= 1;
                Ok(())
            }
            // Last reader, or a writer released through the shared path.
            Some(_) => {
                self.locks.remove(name);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclusive_lock_is_test_and_set() {
        let mut table = LockTable::new();
        assert!(table.try_lock("obj1"));
        assert!(!table.try_lock("obj1"));
        assert_eq!(table.state("obj1"), LockState::Exclusive);
    }

    #[test]
    fn unlock_of_unheld_name_is_a_protocol_error() {
        let mut table = LockTable::new();
        assert_eq!(
            table.unlock("obj1"),
            Err(LockError::NotLocked {
                name: "obj1".into()
            })
        );
    }

    #[test]
    fn unlock_returns_name_to_unheld() {
        let mut table = LockTable::new();
        assert!(table.try_lock("obj1"));
        table.unlock("obj1").unwrap();
        assert_eq!(table.state("obj1"), LockState::Unheld);
        assert!(table.is_empty());
        assert!(table.try_lock("obj1"));
    }

    #[test]
    fn readers_stack_and_block_writers() {
        let mut table = LockTable::new();
        assert!(table.try_rlock("obj1"));
        assert!(table.try_rlock("obj1"));
        assert!(table.try_rlock("obj1"));
        assert_eq!(table.state("obj1"), LockState::Shared(3));
        assert!(!table.try_lock("obj1"));
        assert_eq!(table.state("obj1"), LockState::Shared(3));
    }

    #[test]
    fn writer_blocks_readers() {
        let mut table = LockTable::new();
        assert!(table.try_lock("obj1"));
        assert!(!table.try_rlock("obj1"));
        assert_eq!(table.state("obj1"), LockState::Exclusive);
    }

    #[test]
    fn shared_refcount_returns_to_unheld_then_errors() {
        let mut table = LockTable::new();
        let readers = 5;
        for _ in 0..readers {
            assert!(table.try_rlock("obj1"));
        }
        for _ in 0..readers {
            table.runlock("obj1").unwrap();
        }
        assert_eq!(table.state("obj1"), LockState::Unheld);
        assert_eq!(
            table.runlock("obj1"),
            Err(LockError::NotRLocked {
                name: "obj1".into()
            })
        );
    }

    #[test]
    fn names_are_independent() {
        let mut table = LockTable::new();
        assert!(table.try_lock("a"));
        assert!(table.try_rlock("b"));
        assert!(table.try_lock("c"));
        assert_eq!(table.len(), 3);
        table.unlock("a").unwrap();
        assert_eq!(table.state("b"), LockState::Shared(1));
    }

    #[test]
    fn interleaved_operations_never_mix_writer_and_readers() {
        // Small deterministic pseudo-random walk over every operation.
        let mut table = LockTable::new();
        let mut seed: u32 = 0x2545_f491;
        for _ in 0..2_000 {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            match seed % 4 {
                0 => {
                    table.try_lock("obj");
                }
                1 => {
                    table.try_rlock("obj");
                }
                2 => {
                    let _ = table.unlock("obj");
                }
                _ => {
                    let _ = table.runlock("obj");
                }
            }
            match table.state("obj") {
                LockState::Shared(readers) => assert!(readers >= 1),
                LockState::Exclusive | LockState::Unheld => {}
            }
            assert!(table.locks.values().all(|state| *state != LockState::Unheld));
        }
    }
}
