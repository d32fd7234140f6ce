//! Whole-store export into another storage.
//!
//! Every record of every partition is read, its logical address recovered
//! from the raw key, and re-stored in the destination under the
//! destination's layout. Payload text is copied verbatim, so exporting a
//! `Partitioned` store into a `Shared` one is how legacy stores migrate.

use crate::error::{CoreError, CoreResult};
use crate::progress::Operation;
use crate::storage::Storage;
use bytes::Bytes;
use futures_util::future::{BoxFuture, FutureExt};
use futures_util::stream::{FuturesUnordered, StreamExt};
use stampdb_codec::{decode_raw, encode_raw, Category};
use tracing::{debug, info};

/// Destination writes allowed in flight while the source is read.
const EXPORT_WINDOW: usize = 1024;

/// Per-category record counts of an export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    /// Direct records copied.
    pub direct: u64,
    /// Computed records copied.
    pub computed: u64,
    /// Reduced records copied.
    pub reduced: u64,
    /// Custom blobs copied.
    pub custom: u64,
}

impl ExportSummary {
    /// Total records copied.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.direct + self.computed + self.reduced + self.custom
    }

    fn count(&mut self, category: Category) {
        match category {
            Category::Direct => self.direct += 1,
            Category::Computed => self.computed += 1,
            Category::Reduced => self.reduced += 1,
            Category::Custom => self.custom += 1,
        }
    }
}

impl Storage {
    /// Copies every record into `destination`.
    ///
    /// Destination writes are polled alongside the source scan, with at most
    /// `EXPORT_WINDOW` of them in flight. The export completes once all of
    /// them are acknowledged. The first failed write fails the export and
    /// abandons the rest. Progress is signalled per records read.
    ///
    /// # Errors
    ///
    /// `Scan` or `CorruptRecord` from the source, `InvalidAddress` if a
    /// source key cannot be expressed in the destination layout, or
    /// `WriteFailure` from the destination.
    pub async fn export_all(&self, destination: &Storage) -> CoreResult<ExportSummary> {
        let mut ticker = self
            .progress
            .ticker(Operation::Export, self.config.progress_interval);
        let mut summary = ExportSummary::default();

        for &partition in self.codec.layout().partitions() {
            let mut pending: FuturesUnordered<BoxFuture<'_, CoreResult<()>>> =
                FuturesUnordered::new();
            let mut scan = self.scan(partition, None).await?;
            loop {
                let entry = {
                    let next = scan.next();
                    tokio::pin!(next);
                    loop {
                        tokio::select! {
                            entry = &mut next => break entry?,
                            Some(written) = pending.next(), if !pending.is_empty() => written?,
                        }
                    }
                };
                let Some(entry) = entry else {
                    break;
                };
                ticker.tick();
                let address = self
                    .codec
                    .decode(partition, &entry.key)
                    .map_err(|reason| self.fail(CoreError::corrupt_record(&entry.key, reason)))?;

                let (target, key, value) = if address.category.is_stamped() {
                    let (stamp, payload) = decode_raw(&entry.value).map_err(|reason| {
                        self.fail(CoreError::corrupt_record(&entry.key, reason))
                    })?;
                    let (target, key) = destination.locate(&address)?;
                    (target, key, Bytes::from(encode_raw(stamp, payload)))
                } else {
                    let custom = destination.codec.encode(&address)?;
                    (destination.codec.partition(Category::Custom), custom, entry.value)
                };

                summary.count(address.category);
                if pending.len() >= EXPORT_WINDOW {
                    if let Some(written) = pending.next().await {
                        written?;
                    }
                }
                pending.push(destination.put_encoded(target, key, value).boxed());
            }
            while let Some(written) = pending.next().await {
                written?;
            }
            debug!(%partition, "exported partition");
        }

        info!(
            records = summary.total(),
            read = ticker.processed(),
            source = %self.path().display(),
            destination = %destination.path().display(),
            "export complete"
        );
        Ok(summary)
    }
}
