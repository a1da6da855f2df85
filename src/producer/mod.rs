//! Background producers.
//!
//! A producer is a worker thread that fetches content for one view on demand.
//! The view owns the producer; the producer owns the worker's `JoinHandle`.
//! Traffic flows over two `std::sync::mpsc` channels (requests in, events
//! out) plus a [`SharedState`] quit flag the worker checks between rows.
//! Only the main thread ever touches the view's data; the worker just sends.

pub mod blame;
pub mod history;
pub mod shared;

pub use blame::{BlameBatch, BlameEvent, BlameOutcome, BlameProducer};
pub use history::{
    HistoryBatch, HistoryEvent, HistoryProducer, HistoryRequest, ProducerState,
};
pub use shared::SharedState;
