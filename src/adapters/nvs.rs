//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements both [`ConfigPort`] and [`StoragePort`] for the irrigation
//! controller.
//!
//! - Config validation: the configuration is validated before persistence.
//! - Namespace isolation: each subsystem uses its own namespace.
//! - Atomic writes: ESP-IDF NVS commits are atomic per nvs_commit().
//!
//! The configuration is stored as one postcard blob; the event ring
//! ([`EventLog`](super::event_log::EventLog)) uses its own namespace on the
//! same partition.

use crate::app::ports::{ConfigPort, StoragePort};
use crate::config::IrrigationConfig;
use crate::error::{ConfigStoreError, StorageError};
use log::info;

#[cfg(target_os = "espidf")]
use log::warn;

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

const CONFIG_NAMESPACE: &str = "irrigator";
const CONFIG_KEY: &str = "config";

/// Largest blob a single NVS entry is allowed to hold here.
pub const MAX_BLOB_SIZE: usize = 4000;

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: HashMap<String, Vec<u8>>,
}

impl NvsAdapter {
    /// Create a new NvsAdapter and initialise NVS flash.
    ///
    /// On first boot or after a version mismatch the NVS partition is
    /// erased and re-initialised automatically.
    pub fn new() -> Result<Self, StorageError> {
        #[cfg(target_os = "espidf")]
        {
            flash::init()?;
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: HashMap::new(),
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<Option<IrrigationConfig>, ConfigStoreError> {
        let mut buf = vec![0u8; MAX_BLOB_SIZE];
        let len = match self.read(CONFIG_NAMESPACE, CONFIG_KEY, &mut buf) {
            Ok(len) => len,
            Err(StorageError::NotFound) => {
                info!("NvsAdapter: no stored config");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let config: IrrigationConfig =
            postcard::from_bytes(&buf[..len]).map_err(|_| ConfigStoreError::Corrupted)?;
        config.validate()?;
        info!("NvsAdapter: loaded config ({} bytes, {} valves)", len, config.valves.len());
        Ok(Some(config))
    }

    fn save(&mut self, config: &IrrigationConfig) -> Result<(), ConfigStoreError> {
        config.validate()?;
        let bytes = postcard::to_allocvec(config).map_err(|_| StorageError::IoError)?;
        if bytes.len() > MAX_BLOB_SIZE {
            return Err(StorageError::Full.into());
        }
        self.write(CONFIG_NAMESPACE, CONFIG_KEY, &bytes)?;
        info!("NvsAdapter: config saved ({} bytes)", bytes.len());
        Ok(())
    }
}

#[cfg(not(target_os = "espidf"))]
impl StoragePort for NvsAdapter {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let data = self
            .store
            .get(&Self::composite_key(namespace, key))
            .ok_or(StorageError::NotFound)?;
        let len = data.len().min(buf.len());
        buf[..len].copy_from_slice(&data[..len]);
        Ok(len)
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.store
            .insert(Self::composite_key(namespace, key), data.to_vec());
        Ok(())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.store.remove(&Self::composite_key(namespace, key));
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.store.contains_key(&Self::composite_key(namespace, key))
    }
}

#[cfg(target_os = "espidf")]
impl StoragePort for NvsAdapter {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        flash::Namespace::open(namespace, false)
            .and_then(|ns| ns.get_blob(key, buf))
            .inspect_err(|e| {
                if *e != StorageError::NotFound {
                    warn!("NvsAdapter: read {}::{} failed ({})", namespace, key, e);
                }
            })
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        flash::Namespace::open(namespace, true)?.set_blob(key, data)
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        flash::Namespace::open(namespace, true)?.erase(key)
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        flash::Namespace::open(namespace, false).is_ok_and(|ns| ns.contains(key))
    }
}

/// Raw NVS calls, each checked and mapped onto [`StorageError`] in one place.
#[cfg(target_os = "espidf")]
mod flash {
    use esp_idf_svc::sys::{
        esp_err_t, nvs_close, nvs_commit, nvs_erase_key, nvs_find_key, nvs_flash_erase,
        nvs_flash_init, nvs_get_blob, nvs_handle_t, nvs_open, nvs_open_mode_t_NVS_READONLY,
        nvs_open_mode_t_NVS_READWRITE, nvs_set_blob, ESP_ERR_NVS_NEW_VERSION_FOUND,
        ESP_ERR_NVS_NOT_ENOUGH_SPACE, ESP_ERR_NVS_NOT_FOUND, ESP_ERR_NVS_NO_FREE_PAGES, ESP_OK,
    };
    use log::warn;

    use crate::error::StorageError;

    fn check(code: esp_err_t) -> Result<(), StorageError> {
        if code == ESP_OK as esp_err_t {
            Ok(())
        } else if code == ESP_ERR_NVS_NOT_FOUND as esp_err_t {
            Err(StorageError::NotFound)
        } else if code == ESP_ERR_NVS_NOT_ENOUGH_SPACE as esp_err_t {
            Err(StorageError::Full)
        } else {
            Err(StorageError::IoError)
        }
    }

    /// NUL-terminated NVS name, cut to the 15-byte limit.
    fn c_name(name: &str) -> [u8; 16] {
        let mut buf = [0u8; 16];
        let len = name.len().min(15);
        buf[..len].copy_from_slice(&name.as_bytes()[..len]);
        buf
    }

    /// Bring up the default partition, wiping it when its layout is stale.
    pub(super) fn init() -> Result<(), StorageError> {
        // SAFETY: called once from the main task before any other NVS use.
        let code = unsafe { nvs_flash_init() };
        if code == ESP_ERR_NVS_NO_FREE_PAGES as esp_err_t
            || code == ESP_ERR_NVS_NEW_VERSION_FOUND as esp_err_t
        {
            warn!("NVS: erasing and re-initialising flash partition");
            check(unsafe { nvs_flash_erase() })?;
            return check(unsafe { nvs_flash_init() });
        }
        check(code)
    }

    /// An open namespace; closed on drop.
    pub(super) struct Namespace(nvs_handle_t);

    impl Namespace {
        pub(super) fn open(name: &str, writable: bool) -> Result<Self, StorageError> {
            let name = c_name(name);
            let mode = if writable {
                nvs_open_mode_t_NVS_READWRITE
            } else {
                nvs_open_mode_t_NVS_READONLY
            };
            let mut handle: nvs_handle_t = 0;
            // SAFETY: `name` is NUL-terminated and outlives the call.
            check(unsafe { nvs_open(name.as_ptr().cast(), mode, &mut handle) })?;
            Ok(Self(handle))
        }

        pub(super) fn get_blob(&self, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
            let key = c_name(key);
            let mut size = buf.len();
            // SAFETY: `size` holds the capacity of `buf`; NVS writes at most that much.
            check(unsafe { nvs_get_blob(self.0, key.as_ptr().cast(), buf.as_mut_ptr().cast(), &mut size) })?;
            Ok(size)
        }

        pub(super) fn set_blob(&mut self, key: &str, data: &[u8]) -> Result<(), StorageError> {
            let key = c_name(key);
            check(unsafe { nvs_set_blob(self.0, key.as_ptr().cast(), data.as_ptr().cast(), data.len()) })?;
            self.commit()
        }

        /// Remove `key`; a key that was never written is not an error.
        pub(super) fn erase(&mut self, key: &str) -> Result<(), StorageError> {
            let key = c_name(key);
            match check(unsafe { nvs_erase_key(self.0, key.as_ptr().cast()) }) {
                Ok(()) | Err(StorageError::NotFound) => self.commit(),
                Err(e) => Err(e),
            }
        }

        pub(super) fn contains(&self, key: &str) -> bool {
            let key = c_name(key);
            check(unsafe { nvs_find_key(self.0, key.as_ptr().cast(), core::ptr::null_mut()) }).is_ok()
        }

        fn commit(&mut self) -> Result<(), StorageError> {
            check(unsafe { nvs_commit(self.0) })
        }
    }

    impl Drop for Namespace {
        fn drop(&mut self) {
            unsafe { nvs_close(self.0) }
        }
    }
}
