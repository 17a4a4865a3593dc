// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! lodge-fas: a small futures-and-streams runtime with pluggable executors.
//!
//! Everything else in the workspace is built on the primitives here:
//!
//! - [`Executor`]: where work runs. [`ThreadedExecutor`] serializes jobs on
//!   its own worker thread; [`QueueExecutor`] buffers jobs until someone calls
//!   [`QueueExecutor::run`] (the main thread, or a test).
//! - [`Future`]/[`Promise`]: a single async value with chained continuations,
//!   each bound to an executor, and implicit whole-chain cancellation.
//! - [`Stream`]/[`StreamProducer`]: the multi-value analogue, guaranteeing
//!   production order even when continuations run on a threaded executor.
//! - [`CancellationSource`]/[`CancellationToken`]: an explicit shared cancel
//!   flag with subscribe-on-cancel callbacks.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod cancellation;
mod executor;
mod future;
mod stream;
pub mod system;

pub use cancellation::{make_cancellation_source, CancellationSource, CancellationToken};
pub use executor::{Executor, QueueExecutor, ThreadedExecutor};
pub use future::{make_promise, Future, Promise};
pub use stream::{make_stream, Stream, StreamProducer};
pub use system::SystemExecutor;
