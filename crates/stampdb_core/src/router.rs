//! Point reads and writes, dispatched by category.

use crate::error::{CoreError, CoreResult};
use crate::storage::Storage;
use bytes::Bytes;
use stampdb_codec::{Address, Category, Partition, StampedValue};
use stampdb_storage::{BatchOp, KvStore};
use std::collections::BTreeMap;
use tracing::trace;

impl Storage {
    /// Encodes a stamped address into its partition and raw key.
    pub(crate) fn locate(&self, address: &Address) -> CoreResult<(Partition, String)> {
        if !address.category.is_stamped() {
            return Err(CoreError::invalid_address(
                "custom records carry no stamp; use the custom blob operations",
            ));
        }
        let key = self.codec.encode(address)?;
        Ok((self.codec.partition(address.category), key))
    }

    fn locate_custom(&self, key: &str) -> CoreResult<(Partition, String)> {
        let address = Address::custom(key);
        let raw = self.codec.encode(&address)?;
        Ok((self.codec.partition(Category::Custom), raw))
    }

    /// Reads the record at `address`.
    ///
    /// Returns `None` if no record exists.
    ///
    /// # Errors
    ///
    /// `InvalidAddress` for malformed or custom addresses, `CorruptRecord` if
    /// the stored value does not decode.
    pub async fn get_raw(&self, address: &Address) -> CoreResult<Option<StampedValue>> {
        let (partition, key) = self.locate(address)?;
        let store = self.partitions.get(partition).await?;
        self.stats.record_read();
        let value = store
            .get(&key, self.config.read_options())
            .await
            .map_err(|err| self.fail(err.into()))?;
        value
            .map(|bytes| self.decode_value(address.category, &key, &bytes))
            .transpose()
    }

    /// Writes `value` at `address`, overwriting any previous record.
    ///
    /// No stamp comparison takes place: the caller owns stamp ordering.
    ///
    /// # Errors
    ///
    /// `InvalidAddress` before any I/O, `WriteFailure` if the store rejects
    /// the put.
    pub async fn store_raw(&self, address: &Address, value: &StampedValue) -> CoreResult<()> {
        let (partition, key) = self.locate(address)?;
        self.put_encoded(partition, key, Bytes::from(value.encode()))
            .await
    }

    /// Writes every record, one atomic batch per partition touched.
    ///
    /// All addresses are validated before anything is written.
    ///
    /// # Errors
    ///
    /// As [`Storage::store_raw`].
    pub async fn store_many(&self, records: Vec<(Address, StampedValue)>) -> CoreResult<()> {
        let mut batches: BTreeMap<Partition, Vec<BatchOp>> = BTreeMap::new();
        for (address, value) in &records {
            let (partition, key) = self.locate(address)?;
            batches
                .entry(partition)
                .or_default()
                .push(BatchOp::put(key, value.encode()));
        }
        for (partition, ops) in batches {
            self.write_batch(partition, ops).await?;
        }
        Ok(())
    }

    /// Deletes a reduced record. Deleting an absent record succeeds.
    ///
    /// # Errors
    ///
    /// `InvalidAddress` or `WriteFailure`.
    pub async fn delete_reduced(&self, ns: &str, path: Option<&str>) -> CoreResult<()> {
        let (partition, key) = self.locate(&Address::reduced(ns, path))?;
        self.delete_key(partition, key).await
    }

    /// Reads a custom blob.
    ///
    /// # Errors
    ///
    /// `InvalidAddress` if `key` is empty, contains `/` or begins with a
    /// sentinel.
    pub async fn get_custom(&self, key: &str) -> CoreResult<Option<Bytes>> {
        let (partition, raw) = self.locate_custom(key)?;
        let store = self.partitions.get(partition).await?;
        self.stats.record_read();
        store
            .get(&raw, self.config.read_options())
            .await
            .map_err(|err| self.fail(err.into()))
    }

    /// Stores a custom blob verbatim, without a stamp.
    ///
    /// # Errors
    ///
    /// `InvalidAddress` or `WriteFailure`.
    pub async fn store_custom(&self, key: &str, value: impl Into<Bytes>) -> CoreResult<()> {
        let (partition, raw) = self.locate_custom(key)?;
        self.put_encoded(partition, raw, value.into()).await
    }

    /// Deletes a custom blob.
    ///
    /// # Errors
    ///
    /// `InvalidAddress` or `WriteFailure`.
    pub async fn delete_custom(&self, key: &str) -> CoreResult<()> {
        let (partition, raw) = self.locate_custom(key)?;
        self.delete_key(partition, raw).await
    }

    /// Puts an already encoded value.
    pub(crate) async fn put_encoded(
        &self,
        partition: Partition,
        key: String,
        value: Bytes,
    ) -> CoreResult<()> {
        let store = self.partitions.get(partition).await?;
        trace!(%partition, key = %key, "put");
        match store.put(key.clone(), value).await {
            Ok(()) => {
                self.stats.record_writes(1);
                Ok(())
            }
            Err(source) => Err(self.fail(CoreError::write_failure(key, source))),
        }
    }

    async fn write_batch(&self, partition: Partition, ops: Vec<BatchOp>) -> CoreResult<()> {
        let Some(first) = ops.first().map(|op| op.key().to_owned()) else {
            return Ok(());
        };
        let count = ops.len() as u64;
        let store = self.partitions.get(partition).await?;
        trace!(%partition, count, "batch");
        match store.batch(ops).await {
            Ok(()) => {
                self.stats.record_writes(count);
                Ok(())
            }
            Err(source) => Err(self.fail(CoreError::write_failure(first, source))),
        }
    }

    async fn delete_key(&self, partition: Partition, key: String) -> CoreResult<()> {
        let store = self.partitions.get(partition).await?;
        match store.delete(&key).await {
            Ok(()) => {
                self.stats.record_delete();
                Ok(())
            }
            Err(source) => Err(self.fail(CoreError::write_failure(key, source))),
        }
    }
}
