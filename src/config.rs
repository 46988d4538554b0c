//! Configuration surface recognized by the core (§6).
//!
//! Loading these from a file, environment, or CLI flags is an external
//! collaborator's job; this module only defines and validates the shapes.

use crate::error::{Result, StoreError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub data_path: PathBuf,
    #[serde(default)]
    pub wal: WalConfig,
    #[serde(default)]
    pub gc: GcConfig,
    #[serde(default)]
    pub locks: LockConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub encryption: EncryptionConfig,
    #[serde(default)]
    pub network: NetworkConfig,
}

impl StoreConfig {
    pub fn validate(&self) -> Result<()> {
        self.wal.validate()?;
        self.gc.validate()?;
        self.locks.validate()?;
        self.cache.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalConfig {
    pub dir: PathBuf,
    pub force_sync: bool,
    pub max_file_size: u64,
    pub buffer_size: usize,
}

impl Default for WalConfig {
    fn default() -> Self {
        WalConfig {
            dir: PathBuf::from("wal"),
            force_sync: true,
            max_file_size: 64 * 1024 * 1024,
            buffer_size: 64 * 1024,
        }
    }
}

impl WalConfig {
    fn validate(&self) -> Result<()> {
        if self.max_file_size == 0 {
            return Err(StoreError::ArgumentInvalid(
                "wal.max_file_size must be > 0".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcConfig {
    pub enabled: bool,
    pub retention: Duration,
    pub interval: Duration,
    pub max_per_run: usize,
    pub background: bool,
}

impl Default for GcConfig {
    fn default() -> Self {
        GcConfig {
            enabled: true,
            retention: Duration::from_secs(24 * 3600),
            interval: Duration::from_secs(60),
            max_per_run: 1000,
            background: true,
        }
    }
}

impl GcConfig {
    fn validate(&self) -> Result<()> {
        if self.enabled && self.max_per_run == 0 {
            return Err(StoreError::ArgumentInvalid(
                "gc.max_per_run must be > 0 when gc.enabled".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockConfig {
    pub deadlock_detection: bool,
    pub detection_interval: Duration,
}

impl Default for LockConfig {
    fn default() -> Self {
        LockConfig {
            deadlock_detection: true,
            detection_interval: Duration::from_millis(200),
        }
    }
}

impl LockConfig {
    fn validate(&self) -> Result<()> {
        if self.deadlock_detection && self.detection_interval.is_zero() {
            return Err(StoreError::ArgumentInvalid(
                "locks.detection_interval must be > 0 when deadlock_detection is enabled".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub max_items: usize,
    pub max_bytes: usize,
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            max_items: 10_000,
            max_bytes: 64 * 1024 * 1024,
            ttl: Duration::from_secs(300),
        }
    }
}

impl CacheConfig {
    fn validate(&self) -> Result<()> {
        if self.max_items == 0 {
            return Err(StoreError::ArgumentInvalid(
                "cache.max_items must be > 0".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EncryptionConfig {
    /// Hex-encoded 32-byte key; `None` means data-at-rest encryption is disabled.
    pub key: Option<String>,
    pub key_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub host: String,
    pub port: u16,
    pub max_connections: usize,
    pub receive_buffer_size: usize,
    pub send_buffer_size: usize,
    pub connection_timeout: Duration,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            host: "127.0.0.1".to_string(),
            port: 27117,
            max_connections: 256,
            receive_buffer_size: 64 * 1024,
            send_buffer_size: 64 * 1024,
            connection_timeout: Duration::from_secs(30),
        }
    }
}
