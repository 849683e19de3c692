//! Window-side bus endpoint.
//!
//! `SyncBus` publishes this window's mutations and hands broadcasts from
//! sibling windows to per-topic subscriptions. Delivery is last-write-wins:
//! a subscriber must treat every received value as an authoritative
//! replacement of that topic's state, never a delta.

use std::collections::HashMap;
use std::io::{self, BufReader, BufWriter};
use std::net::TcpStream;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;

use log::{info, warn};
use serde::Serialize;
use serde_json::Value;

use crate::framing::{read_frame, write_frame};
use crate::protocol::{Broadcast, HubMessage, WindowId, WindowMessage};

/// A handle to one topic's delivery stream. Dropping it unsubscribes.
pub struct Subscription {
    rx: Receiver<Value>,
}

impl Subscription {
    /// Next undelivered value, if any.
    pub fn try_recv(&self) -> Option<Value> {
        self.rx.try_recv().ok()
    }

    /// Drain everything delivered so far and keep only the last value.
    pub fn latest(&self) -> Option<Value> {
        let mut last = None;
        while let Ok(value) = self.rx.try_recv() {
            last = Some(value);
        }
        last
    }

    /// Drain everything delivered so far, oldest first.
    pub fn drain(&self) -> Vec<Value> {
        let mut values = Vec::new();
        while let Ok(value) = self.rx.try_recv() {
            values.push(value);
        }
        values
    }
}

/// This window's connection to the sync hub.
pub struct SyncBus {
    window_id: WindowId,
    writer: BufWriter<TcpStream>,
    incoming_rx: Receiver<WindowMessage>,
    subscriptions: HashMap<String, Vec<Sender<Value>>>,
    hub_shutdown: bool,
}

impl SyncBus {
    /// Connect to a hub and complete the handshake.
    pub fn connect(addr: &str, window_name: &str) -> io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        let read_stream = stream.try_clone()?;

        let mut writer = BufWriter::new(stream);
        let mut reader = BufReader::new(read_stream);

        write_frame(
            &mut writer,
            &HubMessage::Hello {
                window_name: window_name.to_string(),
            },
        )?;

        let welcome: WindowMessage = read_frame(&mut reader)?;
        let window_id = match welcome {
            WindowMessage::Welcome { window_id } => window_id,
            other => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("expected welcome, got {:?}", other),
                ));
            }
        };

        info!("attached to hub at {} as {}", addr, window_id);

        // Hand the handshake reader to the background thread so frames it
        // may already have buffered are not lost.
        let (incoming_tx, incoming_rx) = mpsc::channel();
        thread::spawn(move || {
            hub_reader_thread(window_id, reader, incoming_tx);
        });

        Ok(Self {
            window_id,
            writer,
            incoming_rx,
            subscriptions: HashMap::new(),
            hub_shutdown: false,
        })
    }

    /// The hub-assigned identity of this window.
    pub fn window_id(&self) -> WindowId {
        self.window_id
    }

    /// Whether the hub has shut down or the connection was lost.
    pub fn hub_shutdown(&self) -> bool {
        self.hub_shutdown
    }

    /// Publish a topic's new value. Fire-and-forget: siblings that are not
    /// attached right now will never see it.
    pub fn publish<T: Serialize>(&mut self, topic: &str, value: &T) -> io::Result<()> {
        let value = serde_json::to_value(value)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        write_frame(
            &mut self.writer,
            &HubMessage::Publish {
                topic: topic.to_string(),
                value,
            },
        )
    }

    /// Subscribe to a topic. Values published by sibling windows arrive on
    /// the returned handle after each `pump()`. Dropping it unsubscribes.
    pub fn subscribe(&mut self, topic: &str) -> Subscription {
        let (tx, rx) = mpsc::channel();
        self.subscriptions.entry(topic.to_string()).or_default().push(tx);
        Subscription { rx }
    }

    /// Drain the socket and route broadcasts to live subscriptions.
    /// Returns true if anything was delivered.
    pub fn pump(&mut self) -> bool {
        let mut delivered = false;

        loop {
            match self.incoming_rx.try_recv() {
                Ok(WindowMessage::Broadcast(Broadcast { topic, value, .. })) => {
                    if self.route(&topic, value) {
                        delivered = true;
                    }
                }
                Ok(WindowMessage::Shutdown) => {
                    info!("hub shutdown received");
                    self.hub_shutdown = true;
                }
                Ok(WindowMessage::Pong) | Ok(WindowMessage::Welcome { .. }) => {}
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    warn!("hub connection lost");
                    self.hub_shutdown = true;
                    break;
                }
            }
        }

        delivered
    }

    /// Deliver one value to a topic's subscribers, pruning dropped handles.
    fn route(&mut self, topic: &str, value: Value) -> bool {
        let Some(subscribers) = self.subscriptions.get_mut(topic) else {
            return false;
        };

        let mut delivered = false;
        subscribers.retain(|tx| match tx.send(value.clone()) {
            Ok(()) => {
                delivered = true;
                true
            }
            Err(_) => false,
        });

        if subscribers.is_empty() {
            self.subscriptions.remove(topic);
        }
        delivered
    }

    /// Send a keepalive ping.
    pub fn ping(&mut self) -> io::Result<()> {
        write_frame(&mut self.writer, &HubMessage::Ping)
    }

    /// Detach cleanly.
    pub fn disconnect(mut self) -> io::Result<()> {
        write_frame(&mut self.writer, &HubMessage::Bye)
    }
}

/// Background thread reading hub messages for one window.
fn hub_reader_thread(
    window_id: WindowId,
    mut reader: BufReader<TcpStream>,
    incoming_tx: Sender<WindowMessage>,
) {
    loop {
        match read_frame::<_, WindowMessage>(&mut reader) {
            Ok(msg) => {
                let is_shutdown = matches!(msg, WindowMessage::Shutdown);
                if incoming_tx.send(msg).is_err() {
                    break;
                }
                if is_shutdown {
                    break;
                }
            }
            Err(e) => {
                if e.kind() != io::ErrorKind::UnexpectedEof {
                    warn!("{} hub read error: {}", window_id, e);
                }
                let _ = incoming_tx.send(WindowMessage::Shutdown);
                break;
            }
        }
    }
}
