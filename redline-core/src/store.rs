//! Shared telemetry store
//!
//! One record shared between the context that decodes frames and the
//! context that presents them. The writer works on its own copy and
//! publishes whole records, so a reader always sees a record that some
//! single publish produced, never a mix of two.
//!
//! Ordering: the record copy happens inside the mutex, then the generation
//! counter advances, then the new-data signal is raised. A reader that
//! takes the signal and then snapshots therefore sees at least that
//! publish.

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;
use portable_atomic::{AtomicU32, AtomicU8, Ordering};
use redline_protocol::TelemetryRecord;

use crate::handoff::{HandoffError, Transport};

/// `owner` value while no writer is claimed
const NO_OWNER: u8 = 0;

/// Telemetry record shared across execution contexts
///
/// Usable as a `static` with `CriticalSectionRawMutex`.
pub struct TelemetryStore<M: RawMutex> {
    record: Mutex<M, Cell<TelemetryRecord>>,
    new_data: Signal<M, ()>,
    generation: AtomicU32,
    owner: AtomicU8,
}

impl<M: RawMutex> Default for TelemetryStore<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex> TelemetryStore<M> {
    pub const fn new() -> Self {
        Self {
            record: Mutex::new(Cell::new(TelemetryRecord::new())),
            new_data: Signal::new(),
            generation: AtomicU32::new(0),
            owner: AtomicU8::new(NO_OWNER),
        }
    }

    /// Become the single writer for `transport`
    ///
    /// Fails while another writer is alive. The writer starts from the
    /// currently published record.
    pub fn claim_writer(&self, transport: Transport) -> Result<TelemetryWriter<'_, M>, HandoffError> {
        self.owner
            .compare_exchange(NO_OWNER, transport.tag(), Ordering::AcqRel, Ordering::Acquire)
            .map_err(|held| HandoffError::WriterBusy {
                held_by: Transport::from_tag(held),
            })?;

        Ok(TelemetryWriter {
            store: self,
            transport,
            working: self.snapshot(),
        })
    }

    /// Transport whose writer is currently alive
    pub fn writer(&self) -> Option<Transport> {
        Transport::from_tag(self.owner.load(Ordering::Acquire))
    }

    /// Copy of the last published record
    pub fn snapshot(&self) -> TelemetryRecord {
        self.record.lock(|cell| cell.get())
    }

    /// Consume the new-data signal; `true` if anything was published since
    /// the last call
    pub fn take_new_data(&self) -> bool {
        self.new_data.try_take().is_some()
    }

    /// Snapshot only if new data was published since the last take
    pub fn poll_snapshot(&self) -> Option<TelemetryRecord> {
        self.take_new_data().then(|| self.snapshot())
    }

    /// Wait for the next publish and return the record it produced
    pub async fn wait_snapshot(&self) -> TelemetryRecord {
        self.new_data.wait().await;
        self.snapshot()
    }

    /// Number of publishes since start-up
    pub fn generation(&self) -> u32 {
        self.generation.load(Ordering::Acquire)
    }

    fn write_record(&self, record: &TelemetryRecord) {
        self.record.lock(|cell| cell.set(*record));
        self.generation.fetch_add(1, Ordering::Release);
    }

    fn release(&self) {
        self.owner.store(NO_OWNER, Ordering::Release);
    }
}

/// Exclusive write access to a [`TelemetryStore`]
///
/// Dropping the writer releases the claim.
pub struct TelemetryWriter<'a, M: RawMutex> {
    store: &'a TelemetryStore<M>,
    transport: Transport,
    working: TelemetryRecord,
}

impl<'a, M: RawMutex> TelemetryWriter<'a, M> {
    pub fn transport(&self) -> Transport {
        self.transport
    }

    /// Working copy, not yet visible to readers
    pub fn record(&self) -> &TelemetryRecord {
        &self.working
    }

    pub fn record_mut(&mut self) -> &mut TelemetryRecord {
        &mut self.working
    }

    /// Make the working copy visible without raising the new-data signal
    pub fn commit(&mut self) {
        self.store.write_record(&self.working);
    }

    /// Make the working copy visible and raise the new-data signal
    pub fn publish(&mut self) {
        self.commit();
        self.store.new_data.signal(());
    }
}

impl<'a, M: RawMutex> Drop for TelemetryWriter<'a, M> {
    fn drop(&mut self) {
        self.store.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    #[test]
    fn test_publish_raises_signal_once() {
        let store: TelemetryStore<NoopRawMutex> = TelemetryStore::new();
        assert!(!store.take_new_data());

        let mut writer = store.claim_writer(Transport::Serial).unwrap();
        writer.record_mut().engine.rpm = 850.0;
        assert!(store.snapshot().engine.rpm.is_nan());

        writer.publish();
        assert_eq!(store.generation(), 1);
        assert!(store.take_new_data());
        assert!(!store.take_new_data());
        assert_eq!(store.snapshot().engine.rpm, 850.0);
    }

    #[test]
    fn test_commit_is_silent() {
        let store: TelemetryStore<NoopRawMutex> = TelemetryStore::new();
        let mut writer = store.claim_writer(Transport::Serial).unwrap();
        writer.record_mut().error_count = 3;
        writer.commit();

        assert_eq!(store.poll_snapshot(), None);
        assert_eq!(store.snapshot().error_count, 3);
        assert_eq!(store.generation(), 1);
    }

    #[test]
    fn test_second_writer_is_refused() {
        let store: TelemetryStore<NoopRawMutex> = TelemetryStore::new();
        let writer = store.claim_writer(Transport::Serial).unwrap();
        assert_eq!(store.writer(), Some(Transport::Serial));

        assert!(matches!(
            store.claim_writer(Transport::Bus),
            Err(HandoffError::WriterBusy {
                held_by: Some(Transport::Serial)
            })
        ));

        drop(writer);
        assert_eq!(store.writer(), None);
        let writer = store.claim_writer(Transport::Bus).unwrap();
        assert_eq!(writer.transport(), Transport::Bus);
    }

    #[test]
    fn test_wait_snapshot_returns_published_record() {
        let store: TelemetryStore<NoopRawMutex> = TelemetryStore::new();
        let mut writer = store.claim_writer(Transport::Serial).unwrap();
        writer.record_mut().packet_count = 7;
        writer.publish();

        let record = embassy_futures::block_on(store.wait_snapshot());
        assert_eq!(record.packet_count, 7);
        assert!(!store.take_new_data());
    }

    #[test]
    fn test_new_writer_continues_from_published_record() {
        let store: TelemetryStore<NoopRawMutex> = TelemetryStore::new();
        {
            let mut writer = store.claim_writer(Transport::Serial).unwrap();
            writer.record_mut().packet_count = 42;
            writer.publish();
        }
        let writer = store.claim_writer(Transport::Bus).unwrap();
        assert_eq!(writer.record().packet_count, 42);
    }
}
