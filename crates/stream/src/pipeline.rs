//! Sequential encode/decode pipelines.
//!
//! Compression work can be moved off a connection's main loop, but the
//! counters and keystreams only stay in lockstep if every packet fully
//! commits before the next one starts. Each direction therefore runs as a
//! single task draining an in-order channel: an explicit FIFO queue, not
//! a fire-and-forget callback chain. A packet is processed entirely
//! between channel receives, so cancellation (dropping the sender or
//! aborting the task) can never leave a unit half-committed.
//!
//! Both spawners must be called from within a tokio runtime.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::error;

use crate::error::WireError;
use crate::session::{PacketDecoder, PacketEncoder};

/// Drives the send half on its own task.
///
/// Plaintext submitted through the returned sender is sealed strictly in
/// submission order; each wire unit is pushed to `on_unit` before the next
/// plaintext is taken off the queue. The task ends when the sender is
/// dropped, handing the encoder back through the join handle, or with the
/// first error; encode faults are fatal for the connection.
pub fn spawn_encoder<F>(
    mut encoder: PacketEncoder,
    depth: usize,
    mut on_unit: F,
) -> (mpsc::Sender<Vec<u8>>, JoinHandle<Result<PacketEncoder, WireError>>)
where
    F: FnMut(Vec<u8>) + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<Vec<u8>>(depth);

    let handle = tokio::spawn(async move {
        while let Some(plaintext) = rx.recv().await {
            match encoder.encode(&plaintext) {
                Ok(unit) => on_unit(unit),
                Err(e) => {
                    error!(error = %e, "encode pipeline aborting");
                    return Err(e);
                }
            }
        }

        Ok(encoder)
    });

    (tx, handle)
}

/// Drives the receive half on its own task.
///
/// Wire units submitted through the returned sender are opened strictly in
/// submission (i.e. arrival) order; each verified payload is pushed to
/// `on_packet` before the next unit is taken off the queue. Any decode
/// error tears the pipeline down: by the time an integrity fault is
/// observed the stream is already desynchronized, so continuing would only
/// produce garbage.
pub fn spawn_decoder<F>(
    mut decoder: PacketDecoder,
    depth: usize,
    mut on_packet: F,
) -> (mpsc::Sender<Vec<u8>>, JoinHandle<Result<PacketDecoder, WireError>>)
where
    F: FnMut(Vec<u8>) + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel(depth);

    let handle = tokio::spawn(async move {
        while let Some(unit) = rx.recv().await {
            match decoder.decode(unit) {
                Ok(packet) => on_packet(packet),
                Err(e) => {
                    error!(error = %e, "decode pipeline aborting");
                    return Err(e);
                }
            }
        }

        Ok(decoder)
    });

    (tx, handle)
}
