//! Event construction, the outstanding queue and dispatch bookkeeping.
//!
//! # DELIVERY INVARIANT
//! Each logical event is sent at most once. Lifecycle events (depart, arrive,
//! cancel) bypass the queue entirely; feedback and reroute entries live in the
//! [`queue::OutstandingQueue`] until they are selected, sent and drained.
//!
//! # NON-INTERFERENCE
//! The recorder and its snapshots are side-effect bookkeeping.
//! Nothing in the kernel reads them to make a decision.

pub mod event;
pub mod metrics;
pub mod pending;
pub mod queue;
pub mod recorder;
