use std::io::{BufRead, BufReader, ErrorKind};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info, warn};

use crate::drivers::AcquisitionError;
use crate::types::FeedEvent;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeedTimeouts {
    pub connect: Duration,
    /// A silent feed is dropped after this long.
    pub read_idle: Duration,
}

impl Default for FeedTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(3),
            read_idle: Duration::from_secs(30),
        }
    }
}

type StreamSlot = Arc<Mutex<Option<TcpStream>>>;

fn lock_slot(slot: &StreamSlot) -> MutexGuard<'_, Option<TcpStream>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Background TCP reader forwarding newline-delimited records.
///
/// Records are sent verbatim as [`FeedEvent::Line`]; parsing is left to the
/// receiver. A terminal failure is sent once as [`FeedEvent::Error`] and the
/// reader exits. There is no automatic reconnect.
pub struct NetworkSampleSource {
    timeouts: FeedTimeouts,
    addr: Option<String>,
    stopping: Arc<AtomicBool>,
    stream: StreamSlot,
    handle: Option<JoinHandle<()>>,
}

impl NetworkSampleSource {
    pub fn new(timeouts: FeedTimeouts) -> Self {
        Self {
            timeouts,
            addr: None,
            stopping: Arc::new(AtomicBool::new(false)),
            stream: Arc::new(Mutex::new(None)),
            handle: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn addr(&self) -> Option<&str> {
        self.addr.as_deref()
    }

    /// Spawns the reader. Any previous reader is stopped first.
    pub fn start(&mut self, host: &str, port: u16, tx: Sender<FeedEvent>) {
        self.stop();
        let addr = format!("{host}:{port}");
        let stopping = Arc::new(AtomicBool::new(false));
        let stream: StreamSlot = Arc::new(Mutex::new(None));
        let reader = FeedReader {
            host: host.to_owned(),
            port,
            addr: addr.clone(),
            timeouts: self.timeouts,
            stopping: Arc::clone(&stopping),
            stream: Arc::clone(&stream),
            tx,
        };
        self.handle = Some(thread::spawn(move || reader.run()));
        self.stopping = stopping;
        self.stream = stream;
        self.addr = Some(addr);
    }

    /// Closes the connection and joins the reader.
    ///
    /// No event is sent after this returns. Safe to call when not running.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        self.stopping.store(true, Ordering::SeqCst);
        if let Some(stream) = lock_slot(&self.stream).take() {
            // Unblocks a pending read.
            stream.shutdown(Shutdown::Both).ok();
        }
        if handle.join().is_err() {
            warn!("feed reader for {:?} panicked", self.addr);
        }
        debug!("feed reader for {:?} stopped", self.addr);
        self.addr = None;
    }
}

impl Drop for NetworkSampleSource {
    fn drop(&mut self) {
        self.stop();
    }
}

struct FeedReader {
    host: String,
    port: u16,
    addr: String,
    timeouts: FeedTimeouts,
    stopping: Arc<AtomicBool>,
    stream: StreamSlot,
    tx: Sender<FeedEvent>,
}

impl FeedReader {
    fn stopped(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }

    fn report(&self, err: AcquisitionError) {
        if !self.stopped() {
            warn!("{err}");
            self.tx.send(FeedEvent::Error(err)).ok();
        }
    }

    fn run(self) {
        let stream = match self.connect() {
            Ok(stream) => stream,
            Err(e) => return self.report(e),
        };
        {
            let mut slot = lock_slot(&self.stream);
            if self.stopped() {
                return;
            }
            *slot = stream.try_clone().ok();
        }
        info!("connected to feed {}", self.addr);
        self.read_loop(stream);
    }

    fn connect(&self) -> Result<TcpStream, AcquisitionError> {
        let failed = |reason: String| AcquisitionError::ConnectFailed {
            addr: self.addr.clone(),
            reason,
        };
        let candidates = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| failed(e.to_string()))?;
        let mut last_error = "no address resolved".to_owned();
        for candidate in candidates {
            match TcpStream::connect_timeout(&candidate, self.timeouts.connect) {
                Ok(stream) => {
                    stream
                        .set_read_timeout(Some(self.timeouts.read_idle))
                        .map_err(|e| failed(e.to_string()))?;
                    return Ok(stream);
                }
                Err(e) => last_error = e.to_string(),
            }
        }
        Err(failed(last_error))
    }

    fn read_loop(&self, stream: TcpStream) {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => {
                    self.report(AcquisitionError::TransportClosed {
                        addr: self.addr.clone(),
                        reason: "closed by peer".to_owned(),
                    });
                    return;
                }
                Ok(_) => {
                    if self.stopped() {
                        return;
                    }
                    let text = String::from_utf8_lossy(&buf);
                    let record = text.trim_end_matches(['\r', '\n']);
                    if record.is_empty() {
                        continue;
                    }
                    if self.tx.send(FeedEvent::Line(record.to_owned())).is_err() {
                        // Receiver gone: nobody is listening any more.
                        return;
                    }
                }
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    self.report(AcquisitionError::IdleTimeout {
                        addr: self.addr.clone(),
                        secs: self.timeouts.read_idle.as_secs(),
                    });
                    return;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.report(AcquisitionError::TransportClosed {
                        addr: self.addr.clone(),
                        reason: e.to_string(),
                    });
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::TcpListener;
    use std::sync::mpsc::{channel, RecvTimeoutError};

    const WAIT: Duration = Duration::from_secs(5);

    fn quick_timeouts() -> FeedTimeouts {
        FeedTimeouts {
            connect: Duration::from_secs(2),
            read_idle: Duration::from_secs(10),
        }
    }

    #[test]
    fn forwards_records_then_reports_close() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            conn.write_all(b"0.01,1\r\n\n0.02,2\n0.03,3").unwrap();
        });
        let (tx, rx) = channel();
        let mut source = NetworkSampleSource::new(quick_timeouts());
        source.start("127.0.0.1", port, tx);
        server.join().unwrap();

        let mut lines = Vec::new();
        loop {
            match rx.recv_timeout(WAIT).unwrap() {
                FeedEvent::Line(l) => lines.push(l),
                FeedEvent::Error(e) => {
                    assert!(matches!(e, AcquisitionError::TransportClosed { .. }));
                    break;
                }
            }
        }
        assert_eq!(lines, vec!["0.01,1", "0.02,2", "0.03,3"]);
        source.stop();
        assert!(!source.is_running());
    }

    #[test]
    fn refused_connection_reports_connect_failed() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let (tx, rx) = channel();
        let mut source = NetworkSampleSource::new(quick_timeouts());
        source.start("127.0.0.1", port, tx);
        match rx.recv_timeout(WAIT).unwrap() {
            FeedEvent::Error(e) => assert!(matches!(e, AcquisitionError::ConnectFailed { .. })),
            other => panic!("unexpected event: {other:?}"),
        }
        source.stop();
    }

    #[test]
    fn stop_unblocks_pending_read_and_silences_reader() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let (tx, rx) = channel();
        let mut source = NetworkSampleSource::new(quick_timeouts());
        source.start("127.0.0.1", port, tx);
        let (mut conn, _) = listener.accept().unwrap();
        conn.write_all(b"0.04\n").unwrap();
        assert!(matches!(rx.recv_timeout(WAIT).unwrap(), FeedEvent::Line(_)));

        source.stop();
        assert!(!source.is_running());
        assert_eq!(source.addr(), None);
        // Reader has exited and dropped its sender without reporting anything.
        assert_eq!(
            rx.recv_timeout(Duration::from_millis(200)).unwrap_err(),
            RecvTimeoutError::Disconnected
        );
        drop(conn);
    }

    #[test]
    fn silent_feed_hits_idle_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let (tx, rx) = channel();
        let mut source = NetworkSampleSource::new(FeedTimeouts {
            connect: Duration::from_secs(2),
            read_idle: Duration::from_millis(100),
        });
        source.start("127.0.0.1", port, tx);
        let (_conn, _) = listener.accept().unwrap();
        match rx.recv_timeout(WAIT).unwrap() {
            FeedEvent::Error(e) => assert!(matches!(e, AcquisitionError::IdleTimeout { .. })),
            other => panic!("unexpected event: {other:?}"),
        }
        source.stop();
    }

    #[test]
    fn stop_without_start_is_a_no_op() {
        let mut source = NetworkSampleSource::new(FeedTimeouts::default());
        source.stop();
        source.stop();
        assert!(!source.is_running());
    }
}
