// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! lodge-wire: the client/server protocol.
//!
//! Wire format: 4-byte length prefix (little-endian) + UTF-8 JSON payload.
//! Every message carries an `op` discriminator.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod frame;
mod message;

pub use frame::{
    decode, encode, read_frame, read_message, write_frame, write_message, ProtocolError,
    MAX_FRAME_LEN,
};
pub use message::{ClientMessage, ServerMessage, WireTaskResult, DEFAULT_PORT};
