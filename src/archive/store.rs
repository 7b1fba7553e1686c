//! Storage backends the archive loader reads groups from.

use crate::error::ClimateError;
use crate::types::gridded::GriddedResult;
use log::debug;
use std::cell::Cell;
use std::collections::HashMap;

/// Opens one archive group (`<base>/<scenario>/<variable>.zarr`) as a gridded result.
pub trait GroupStore {
    fn open(&self, path: &str) -> Result<GriddedResult, ClimateError>;
}

/// Groups held in memory, keyed by path. Counts reads so callers can check that
/// nothing was read.
#[derive(Debug, Default)]
pub struct MemoryGroupStore {
    groups: HashMap<String, GriddedResult>,
    reads: Cell<usize>,
}

impl MemoryGroupStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, group: GriddedResult) {
        self.groups.insert(path.into(), group);
    }

    pub fn with_group(mut self, path: impl Into<String>, group: GriddedResult) -> Self {
        self.insert(path, group);
        self
    }

    pub fn read_count(&self) -> usize {
        self.reads.get()
    }
}

impl GroupStore for MemoryGroupStore {
    fn open(&self, path: &str) -> Result<GriddedResult, ClimateError> {
        self.reads.set(self.reads.get() + 1);
        debug!("Reading in-memory group {}", path);
        self.groups
            .get(path)
            .cloned()
            .ok_or_else(|| ClimateError::Storage {
                path: path.to_string(),
                message: "no such group".to_string(),
            })
    }
}

#[cfg(feature = "zarr")]
pub use zarr_store::ZarrGroupStore;

#[cfg(feature = "s3")]
pub use zarr_store::S3GroupStore;

#[cfg(feature = "zarr")]
mod zarr_store {
    use super::GroupStore;
    use crate::error::ClimateError;
    use crate::types::gridded::{GriddedResult, RawArray};
    use log::{info, warn};
    use serde::Deserialize;
    use serde_json::Value;
    use std::collections::BTreeMap;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use zarrs::array::{Array, DataType};
    use zarrs_filesystem::FilesystemStore;
    use zarrs_storage::{ReadableStorageTraits, StoreKey};

    #[derive(Debug, Deserialize)]
    struct ConsolidatedMetadata {
        metadata: BTreeMap<String, Value>,
    }

    /// Reads consolidated Zarr v2 groups from a local directory tree (for example a
    /// synced copy of the archive bucket). Group paths are resolved against `root`
    /// unless they are absolute.
    #[derive(Debug, Clone)]
    pub struct ZarrGroupStore {
        root: PathBuf,
    }

    impl ZarrGroupStore {
        pub fn new(root: impl Into<PathBuf>) -> Self {
            Self { root: root.into() }
        }

        fn resolve(&self, path: &str) -> PathBuf {
            let path = Path::new(path);
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                self.root.join(path)
            }
        }
    }

    fn storage_error(label: &str, message: impl ToString) -> ClimateError {
        ClimateError::Storage {
            path: label.to_string(),
            message: message.to_string(),
        }
    }

    impl GroupStore for ZarrGroupStore {
        fn open(&self, path: &str) -> Result<GriddedResult, ClimateError> {
            let group = self.resolve(path);
            let label = group.display().to_string();
            info!("Opening Zarr group {}", label);

            let store = Arc::new(FilesystemStore::new(&group).map_err(|e| storage_error(&label, e))?);
            read_group(store, "", &label)
        }
    }

    /// Reads every array of the consolidated group stored under `prefix` (empty, or a
    /// key prefix ending in `/`).
    fn read_group<TStorage>(
        store: Arc<TStorage>,
        prefix: &str,
        label: &str,
    ) -> Result<GriddedResult, ClimateError>
    where
        TStorage: ?Sized + ReadableStorageTraits + 'static,
    {
        let key = StoreKey::new(format!("{prefix}.zmetadata")).map_err(|e| storage_error(label, e))?;
        let consolidated = store
            .get(&key)
            .map_err(|e| storage_error(label, e))?
            .ok_or_else(|| storage_error(label, "missing .zmetadata"))?;
        let consolidated: ConsolidatedMetadata =
            serde_json::from_slice(&consolidated).map_err(|e| storage_error(label, e))?;

        let mut arrays = Vec::new();
        for key in consolidated.metadata.keys() {
            let Some(name) = key.strip_suffix("/.zarray") else {
                continue;
            };
            let attrs = consolidated.metadata.get(&format!("{name}/.zattrs"));
            let dims: Vec<String> = attrs
                .and_then(|a| a.get("_ARRAY_DIMENSIONS"))
                .and_then(Value::as_array)
                .map(|d| d.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                .unwrap_or_default();
            let units = attrs
                .and_then(|a| a.get("units"))
                .and_then(Value::as_str)
                .map(str::to_string);

            let array = Array::open(store.clone(), &format!("/{prefix}{name}"))
                .map_err(|e| storage_error(label, e))?;
            let shape: Vec<usize> = array.shape().iter().map(|&s| s as usize).collect();
            if dims.len() != shape.len() {
                warn!("Skipping Zarr array {} without dimension names", name);
                continue;
            }
            let subset = array.subset_all();

            let (values, labels) = match array.data_type() {
                DataType::Float64 => (
                    array
                        .retrieve_array_subset_elements::<f64>(&subset)
                        .map_err(|e| storage_error(label, e))?,
                    None,
                ),
                DataType::Float32 => (
                    array
                        .retrieve_array_subset_elements::<f32>(&subset)
                        .map_err(|e| storage_error(label, e))?
                        .into_iter()
                        .map(f64::from)
                        .collect(),
                    None,
                ),
                DataType::Int64 => (
                    array
                        .retrieve_array_subset_elements::<i64>(&subset)
                        .map_err(|e| storage_error(label, e))?
                        .into_iter()
                        .map(|v| v as f64)
                        .collect(),
                    None,
                ),
                DataType::Int32 => (
                    array
                        .retrieve_array_subset_elements::<i32>(&subset)
                        .map_err(|e| storage_error(label, e))?
                        .into_iter()
                        .map(f64::from)
                        .collect(),
                    None,
                ),
                DataType::String => (
                    Vec::new(),
                    Some(
                        array
                            .retrieve_array_subset_elements::<String>(&subset)
                            .map_err(|e| storage_error(label, e))?,
                    ),
                ),
                other => {
                    warn!("Skipping Zarr array {} with data type {:?}", name, other);
                    continue;
                }
            };

            arrays.push(RawArray {
                name: name.to_string(),
                dims,
                shape,
                values,
                labels,
                units,
            });
        }

        GriddedResult::from_raw_arrays(arrays).map_err(ClimateError::from)
    }

    #[cfg(feature = "s3")]
    pub use object_storage::S3GroupStore;

    #[cfg(feature = "s3")]
    mod object_storage {
        use super::{read_group, storage_error};
        use crate::archive::store::GroupStore;
        use crate::error::ClimateError;
        use crate::types::gridded::GriddedResult;
        use log::info;
        use object_store::aws::AmazonS3Builder;
        use std::sync::Arc;
        use tokio::runtime::Runtime;
        use zarrs_object_store::AsyncObjectStore;
        use zarrs_storage::storage_adapter::async_to_sync::{
            AsyncToSyncBlockOn, AsyncToSyncStorageAdapter,
        };

        /// Drives the async object store from synchronous zarrs calls.
        #[derive(Clone)]
        struct RuntimeBlockOn(Arc<Runtime>);

        impl AsyncToSyncBlockOn for RuntimeBlockOn {
            fn block_on<F: core::future::Future>(&self, future: F) -> F::Output {
                self.0.block_on(future)
            }
        }

        /// Reads consolidated Zarr groups straight from S3 (`s3://<bucket>/<key>`), such
        /// as the default archive location.
        ///
        /// Must not be used from inside an async runtime; it owns a small runtime of its
        /// own and blocks on it.
        pub struct S3GroupStore {
            builder: AmazonS3Builder,
            runtime: Arc<Runtime>,
        }

        impl S3GroupStore {
            /// Credentials and region come from the usual `AWS_*` environment variables.
            pub fn from_env() -> Result<Self, ClimateError> {
                Self::with_builder(AmazonS3Builder::from_env())
            }

            /// Uses `builder` for every bucket; the bucket name is taken from each path.
            pub fn with_builder(builder: AmazonS3Builder) -> Result<Self, ClimateError> {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .map_err(|e| storage_error("s3", e))?;
                Ok(Self {
                    builder,
                    runtime: Arc::new(runtime),
                })
            }
        }

        /// Splits `s3://bucket/some/key` into the bucket and a key prefix ending in `/`.
        pub(super) fn split_s3_path(path: &str) -> Option<(&str, String)> {
            let rest = path.strip_prefix("s3://")?;
            let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
            if bucket.is_empty() {
                return None;
            }
            let key = key.trim_matches('/');
            let prefix = if key.is_empty() {
                String::new()
            } else {
                format!("{key}/")
            };
            Some((bucket, prefix))
        }

        impl GroupStore for S3GroupStore {
            fn open(&self, path: &str) -> Result<GriddedResult, ClimateError> {
                let (bucket, prefix) = split_s3_path(path)
                    .ok_or_else(|| storage_error(path, "expected an s3://<bucket>/<key> path"))?;
                info!("Opening Zarr group {} in bucket {}", prefix, bucket);

                let s3 = self
                    .builder
                    .clone()
                    .with_bucket_name(bucket)
                    .build()
                    .map_err(|e| storage_error(path, format!("failed to create S3 client: {e}")))?;
                let store = Arc::new(AsyncToSyncStorageAdapter::new(
                    Arc::new(AsyncObjectStore::new(s3)),
                    RuntimeBlockOn(self.runtime.clone()),
                ));
                read_group(store, &prefix, path)
            }
        }

    }
}
