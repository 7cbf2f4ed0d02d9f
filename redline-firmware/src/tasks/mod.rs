//! Embassy async tasks
//!
//! The receive task is the only producer of the serial ring, the ingest
//! task its only consumer and the store's only writer. Everything else
//! reads snapshots.

pub mod dashboard;
pub mod ingest;
pub mod serial_rx;
pub mod stats;

pub use dashboard::dashboard_task;
pub use ingest::ingest_task;
pub use serial_rx::serial_rx_task;
pub use stats::stats_task;
