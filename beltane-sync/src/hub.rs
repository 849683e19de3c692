//! The sync hub: accepts window connections and relays publishes.
//!
//! The hub is a pure relay. It keeps no topic state, so there is no replay:
//! a window that attaches after a publish never sees it.

use std::collections::HashMap;
use std::io::{self, BufReader, BufWriter};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use log::{error, info, warn};

use crate::framing::{read_frame, write_frame};
use crate::protocol::{Broadcast, HubMessage, WindowId, WindowMessage};

/// A connected window with its write half.
struct WindowConnection {
    name: String,
    writer: BufWriter<TcpStream>,
}

impl WindowConnection {
    fn send(&mut self, msg: &WindowMessage) -> io::Result<()> {
        write_frame(&mut self.writer, msg)
    }
}

/// Hub shared by all windows of one editing origin.
pub struct SyncHub {
    listener: TcpListener,
    /// Fully attached windows (completed Hello handshake).
    windows: HashMap<WindowId, WindowConnection>,
    /// Connections awaiting their Hello message.
    pending: HashMap<WindowId, BufWriter<TcpStream>>,
    inbox_rx: Receiver<(WindowId, HubMessage)>,
    inbox_tx: Sender<(WindowId, HubMessage)>,
    next_window_id: u64,
}

impl SyncHub {
    /// Bind the hub to an address. Use port 0 to pick a free port.
    pub fn bind(addr: &str) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;

        let (inbox_tx, inbox_rx) = mpsc::channel();

        info!("sync hub listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            windows: HashMap::new(),
            pending: HashMap::new(),
            inbox_rx,
            inbox_tx,
            next_window_id: 0,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept any pending TCP connections; they become attached windows
    /// after the Hello handshake.
    pub fn accept_connections(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    let window_id = WindowId::new(self.next_window_id);
                    self.next_window_id += 1;

                    let read_stream = match stream.try_clone() {
                        Ok(s) => s,
                        Err(e) => {
                            error!("failed to clone stream for {}: {}", addr, e);
                            continue;
                        }
                    };

                    let inbox_tx = self.inbox_tx.clone();
                    thread::spawn(move || {
                        window_reader_thread(window_id, read_stream, inbox_tx);
                    });

                    self.pending.insert(window_id, BufWriter::new(stream));
                    info!("window {} connected from {}, awaiting hello", window_id, addr);
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    error!("accept error: {}", e);
                    break;
                }
            }
        }
    }

    /// Drain window messages and relay publishes.
    pub fn pump(&mut self) {
        while let Ok((window_id, msg)) = self.inbox_rx.try_recv() {
            match msg {
                HubMessage::Hello { window_name } => {
                    if let Some(mut writer) = self.pending.remove(&window_id) {
                        let welcome = WindowMessage::Welcome { window_id };
                        if let Err(e) = write_frame(&mut writer, &welcome) {
                            error!("failed to welcome {}: {}", window_id, e);
                            continue;
                        }
                        info!("window {} '{}' attached", window_id, window_name);
                        self.windows.insert(
                            window_id,
                            WindowConnection {
                                name: window_name,
                                writer,
                            },
                        );
                    } else {
                        warn!("window {} sent hello twice", window_id);
                    }
                }
                HubMessage::Publish { topic, value } => {
                    self.relay(Broadcast {
                        topic,
                        value,
                        origin: window_id,
                    });
                }
                HubMessage::Ping => {
                    if let Some(window) = self.windows.get_mut(&window_id) {
                        if let Err(e) = window.send(&WindowMessage::Pong) {
                            warn!("failed to pong {}: {}", window_id, e);
                        }
                    }
                }
                HubMessage::Bye => {
                    self.detach(window_id);
                }
            }
        }
    }

    /// Relay a broadcast to every attached window except its origin.
    fn relay(&mut self, broadcast: Broadcast) {
        let mut dropped = Vec::new();

        for (&id, window) in &mut self.windows {
            if id == broadcast.origin {
                continue;
            }
            if let Err(e) = window.send(&WindowMessage::Broadcast(broadcast.clone())) {
                warn!("failed to relay to window {}: {}", id, e);
                dropped.push(id);
            }
        }

        for id in dropped {
            self.detach(id);
        }
    }

    fn detach(&mut self, window_id: WindowId) {
        self.pending.remove(&window_id);
        if let Some(window) = self.windows.remove(&window_id) {
            info!("window {} '{}' detached", window_id, window.name);
        }
    }

    /// Tell every attached window the hub is going away.
    pub fn broadcast_shutdown(&mut self) {
        let mut dropped = Vec::new();
        for (&id, window) in &mut self.windows {
            if window.send(&WindowMessage::Shutdown).is_err() {
                dropped.push(id);
            }
        }
        for id in dropped {
            self.detach(id);
        }
    }

    /// Number of fully attached windows.
    pub fn window_count(&self) -> usize {
        self.windows.len()
    }
}

/// Background thread reading one window's messages into the hub inbox.
fn window_reader_thread(
    window_id: WindowId,
    stream: TcpStream,
    inbox_tx: Sender<(WindowId, HubMessage)>,
) {
    let mut reader = BufReader::new(stream);

    loop {
        match read_frame::<_, HubMessage>(&mut reader) {
            Ok(msg) => {
                let is_bye = matches!(msg, HubMessage::Bye);
                if inbox_tx.send((window_id, msg)).is_err() {
                    // Hub dropped; nothing left to do.
                    break;
                }
                if is_bye {
                    break;
                }
            }
            Err(e) => {
                if e.kind() != io::ErrorKind::UnexpectedEof {
                    warn!("window {} read error: {}", window_id, e);
                }
                let _ = inbox_tx.send((window_id, HubMessage::Bye));
                break;
            }
        }
    }
}
