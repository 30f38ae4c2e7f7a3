//! Cross-process mutual exclusion.
//!
//! A [`SyncObject`] is a named OS-level lock for coordinating shared
//! resource hand-off between processes (for example a texture shared with
//! a capture tool). It is implemented over an exclusively locked file in
//! the system temp directory. This is distinct from intra-process thread
//! safety, which this crate does not provide.

use std::fs::{File, OpenOptions, TryLockError};
use std::path::PathBuf;

use parking_lot::Mutex;

use crate::error::GraphicsError;

/// A named cross-process mutual-exclusion primitive.
pub struct SyncObject {
    name: String,
    file: File,
    held: Mutex<bool>,
}

impl SyncObject {
    /// Create or open the named lock.
    ///
    /// Names are restricted to alphanumerics, `-`, `_`, and `.` so they
    /// map onto a file name on every platform. Two processes that create
    /// the same name contend on the same lock.
    pub fn create(name: &str) -> Result<Self, GraphicsError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(GraphicsError::InvalidParameter(format!(
                "invalid sync object name {name:?}"
            )));
        }

        let path = Self::path_for(name);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| {
                GraphicsError::InitializationFailed(format!(
                    "failed to open lock file {}: {e}",
                    path.display()
                ))
            })?;

        Ok(Self {
            name: name.to_string(),
            file,
            held: Mutex::new(false),
        })
    }

    fn path_for(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("vermilion-{name}.lock"))
    }

    /// Get the lock name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Block until the lock is acquired.
    ///
    /// # Errors
    ///
    /// [`GraphicsError::InvalidOperation`] when this object already holds
    /// the lock.
    pub fn acquire(&self) -> Result<(), GraphicsError> {
        let mut held = self.held.lock();
        if *held {
            return Err(GraphicsError::InvalidOperation(format!(
                "sync object {:?} is already held",
                self.name
            )));
        }
        self.file.lock().map_err(|e| {
            GraphicsError::InvalidOperation(format!("failed to lock {:?}: {e}", self.name))
        })?;
        *held = true;
        Ok(())
    }

    /// Try to acquire the lock without blocking.
    ///
    /// Returns `Ok(false)` when another process holds it.
    pub fn try_acquire(&self) -> Result<bool, GraphicsError> {
        let mut held = self.held.lock();
        if *held {
            return Err(GraphicsError::InvalidOperation(format!(
                "sync object {:?} is already held",
                self.name
            )));
        }
        match self.file.try_lock() {
            Ok(()) => {
                *held = true;
                Ok(true)
            }
            Err(TryLockError::WouldBlock) => Ok(false),
            Err(TryLockError::Error(e)) => Err(GraphicsError::InvalidOperation(format!(
                "failed to lock {:?}: {e}",
                self.name
            ))),
        }
    }

    /// Release the lock.
    ///
    /// # Errors
    ///
    /// [`GraphicsError::InvalidOperation`] when the lock is not held.
    pub fn release(&self) -> Result<(), GraphicsError> {
        let mut held = self.held.lock();
        if !*held {
            return Err(GraphicsError::InvalidOperation(format!(
                "sync object {:?} is not held",
                self.name
            )));
        }
        self.file.unlock().map_err(|e| {
            GraphicsError::InvalidOperation(format!("failed to unlock {:?}: {e}", self.name))
        })?;
        *held = false;
        Ok(())
    }
}

impl Drop for SyncObject {
    fn drop(&mut self) {
        let held = self.held.get_mut();
        if *held {
            if let Err(e) = self.file.unlock() {
                log::warn!("failed to release sync object {:?} on drop: {e}", self.name);
            }
        }
    }
}

impl std::fmt::Debug for SyncObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncObject")
            .field("name", &self.name)
            .field("held", &*self.held.lock())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_release_cycle() {
        let lock = SyncObject::create("vermilion-test-cycle").unwrap();
        lock.acquire().unwrap();
        lock.release().unwrap();
        lock.acquire().unwrap();
        lock.release().unwrap();
    }

    #[test]
    fn test_double_acquire_fails() {
        let lock = SyncObject::create("vermilion-test-double").unwrap();
        lock.acquire().unwrap();
        assert!(matches!(
            lock.acquire(),
            Err(GraphicsError::InvalidOperation(_))
        ));
        lock.release().unwrap();
    }

    #[test]
    fn test_release_unheld_fails() {
        let lock = SyncObject::create("vermilion-test-unheld").unwrap();
        assert!(matches!(
            lock.release(),
            Err(GraphicsError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_invalid_name_rejected() {
        assert!(SyncObject::create("").is_err());
        assert!(SyncObject::create("../escape").is_err());
        assert!(SyncObject::create("has space").is_err());
    }
}
