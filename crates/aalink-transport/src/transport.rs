//! Transport base: exact-size receives and ordered sends over any link.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;

use aalink_io::{pending_or, promise, Completion, Promise};
use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::error::TransportError;
use crate::link::{Link, LinkReader, LinkWriter};
use crate::sink::DataSink;

/// Upper bound for one physical read.
const READ_CHUNK_SIZE: usize = 16 * 1024;

enum ReceiveCmd {
    Receive {
        len: usize,
        reply: Promise<Bytes, TransportError>,
    },
    Stop,
}

enum SendCmd {
    Send {
        data: Bytes,
        reply: Promise<(), TransportError>,
    },
    Stop,
}

/// Handle to a running transport.
///
/// The transport runs as two tasks, one per direction, each owning its half
/// of the link and its queue. The handle is cheap to clone; all operations
/// are non-blocking and complete through promises.
#[derive(Clone)]
pub struct Transport {
    receive_cmds: mpsc::UnboundedSender<ReceiveCmd>,
    send_cmds: mpsc::UnboundedSender<SendCmd>,
}

impl Transport {
    /// Split the link and start the two direction tasks.
    pub fn spawn<L: Link>(link: L) -> Self {
        let (reader, writer) = link.into_split();
        let (receive_cmds, receive_rx) = mpsc::unbounded_channel();
        let (send_cmds, send_rx) = mpsc::unbounded_channel();
        tokio::spawn(receive_task(reader, receive_rx));
        tokio::spawn(send_task(writer, send_rx));
        Self {
            receive_cmds,
            send_cmds,
        }
    }

    /// Request exactly `len` bytes from the link.
    ///
    /// Requests are served in FIFO order from the received-data sink. A
    /// request for zero bytes resolves immediately with empty data.
    pub fn receive(&self, len: usize) -> Completion<Bytes, TransportError> {
        let (reply, completion) = promise();
        let _ = self.receive_cmds.send(ReceiveCmd::Receive { len, reply });
        completion
    }

    /// Queue `data` for transmission; resolves once the whole buffer is
    /// committed to the link.
    pub fn send(&self, data: Bytes) -> Completion<(), TransportError> {
        let (reply, completion) = promise();
        let _ = self.send_cmds.send(SendCmd::Send { data, reply });
        completion
    }

    /// Cancel in-flight I/O and reject every pending operation with
    /// [`TransportError::Aborted`]. The transport is unusable afterwards;
    /// later operations reject immediately.
    pub fn stop(&self) {
        let _ = self.receive_cmds.send(ReceiveCmd::Stop);
        let _ = self.send_cmds.send(SendCmd::Stop);
    }
}

struct PendingReceive {
    len: usize,
    reply: Promise<Bytes, TransportError>,
}

/// Resolve queued requests from the sink, in order, until the front request
/// needs more bytes than are available.
fn distribute(sink: &mut DataSink, queue: &mut VecDeque<PendingReceive>) {
    while queue
        .front()
        .is_some_and(|front| sink.available() >= front.len)
    {
        if let Some(entry) = queue.pop_front() {
            trace!(len = entry.len, "resolving receive from sink");
            entry.reply.resolve(sink.consume(entry.len));
        }
    }
}

type ReadOutcome<R> = (R, Vec<u8>, Result<usize, TransportError>);

async fn read_chunk_owned<R: LinkReader>(mut reader: R, mut buf: Vec<u8>) -> ReadOutcome<R> {
    let result = reader.read_chunk(&mut buf).await;
    (reader, buf, result)
}

async fn receive_task<R: LinkReader>(
    reader: R,
    mut commands: mpsc::UnboundedReceiver<ReceiveCmd>,
) {
    let mut sink = DataSink::new();
    let mut queue: VecDeque<PendingReceive> = VecDeque::new();
    let mut reader_slot = Some(reader);
    let mut read_fut: Option<Pin<Box<dyn Future<Output = ReadOutcome<R>> + Send>>> = None;
    let mut dead: Option<TransportError> = None;

    loop {
        distribute(&mut sink, &mut queue);

        // Arm a physical read only while the front request is unsatisfiable.
        // An armed read is never dropped before it completes; surplus bytes
        // always land in the sink.
        if read_fut.is_none() && dead.is_none() && !queue.is_empty() {
            if let Some(r) = reader_slot.take() {
                read_fut = Some(Box::pin(read_chunk_owned(r, vec![0u8; READ_CHUNK_SIZE])));
            }
        }

        tokio::select! {
            biased;
            cmd = commands.recv() => match cmd {
                Some(ReceiveCmd::Receive { len, reply }) => {
                    if let Some(cause) = &dead {
                        reply.reject(cause.clone());
                    } else if len == 0 {
                        reply.resolve(Bytes::new());
                    } else {
                        queue.push_back(PendingReceive { len, reply });
                    }
                }
                Some(ReceiveCmd::Stop) | None => {
                    debug!(pending = queue.len(), "receive direction stopping");
                    for entry in queue.drain(..) {
                        entry.reply.reject(TransportError::Aborted);
                    }
                    break;
                }
            },
            (r, buf, result) = pending_or(&mut read_fut) => {
                read_fut = None;
                reader_slot = Some(r);
                match result {
                    Ok(0) => {
                        debug!("link closed by peer");
                        for entry in queue.drain(..) {
                            entry.reply.reject(TransportError::Closed);
                        }
                        dead = Some(TransportError::Closed);
                    }
                    Ok(n) => {
                        trace!(bytes = n, "committing physical chunk");
                        sink.commit(&buf[..n]);
                    }
                    Err(e) => {
                        debug!(error = %e, "physical read failed");
                        for entry in queue.drain(..) {
                            entry.reply.reject(e.clone());
                        }
                        dead = Some(e);
                    }
                }
            }
        }
    }
}

type WriteOutcome<W> = (W, Result<(), TransportError>);

/// Commit `data` fully, looping over partial writes.
async fn write_all_owned<W: LinkWriter>(mut writer: W, data: Bytes) -> WriteOutcome<W> {
    let mut offset = 0usize;
    while offset < data.len() {
        match writer.write_chunk(&data[offset..]).await {
            Ok(0) => return (writer, Err(TransportError::Closed)),
            Ok(n) => offset += n,
            Err(e) => return (writer, Err(e)),
        }
    }
    (writer, Ok(()))
}

async fn send_task<W: LinkWriter>(writer: W, mut commands: mpsc::UnboundedReceiver<SendCmd>) {
    let mut queue: VecDeque<(Bytes, Promise<(), TransportError>)> = VecDeque::new();
    let mut current: Option<Promise<(), TransportError>> = None;
    let mut writer_slot = Some(writer);
    let mut write_fut: Option<Pin<Box<dyn Future<Output = WriteOutcome<W>> + Send>>> = None;

    loop {
        if write_fut.is_none() {
            if let Some((data, reply)) = queue.pop_front() {
                if let Some(w) = writer_slot.take() {
                    trace!(bytes = data.len(), "starting link write");
                    current = Some(reply);
                    write_fut = Some(Box::pin(write_all_owned(w, data)));
                }
            }
        }

        tokio::select! {
            biased;
            cmd = commands.recv() => match cmd {
                Some(SendCmd::Send { data, reply }) => {
                    queue.push_back((data, reply));
                }
                Some(SendCmd::Stop) | None => {
                    debug!(pending = queue.len(), "send direction stopping");
                    if let Some(reply) = current.take() {
                        reply.reject(TransportError::Aborted);
                    }
                    for (_, reply) in queue.drain(..) {
                        reply.reject(TransportError::Aborted);
                    }
                    break;
                }
            },
            (w, result) = pending_or(&mut write_fut) => {
                write_fut = None;
                writer_slot = Some(w);
                let reply = current.take();
                match result {
                    Ok(()) => {
                        if let Some(reply) = reply {
                            reply.resolve(());
                        }
                    }
                    // A failed write rejects only the failing send; the
                    // orchestrator decides whether the link is dead and
                    // calls stop().
                    Err(e) => {
                        debug!(error = %e, "link write failed");
                        if let Some(reply) = reply {
                            reply.reject(e);
                        }
                    }
                }
            }
        }
    }
}
