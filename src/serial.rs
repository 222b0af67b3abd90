//! Device line source.
//!
//! The port is read on a dedicated thread since `serialport` is blocking.
//! Lines are framed on `\r\n` and forwarded to the relay loop. If the port
//! cannot be opened the bridge keeps running on console input alone.

use crate::config::SerialSettings;
use crate::models::line::InputLine;
use anyhow::{anyhow, Context, Result};
use serialport::{DataBits, FlowControl, Parity, SerialPort, SerialPortType, StopBits};
use std::io::{ErrorKind, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::Sender;
use tracing::{error, info, warn};

pub const LINE_DELIMITER: &[u8] = b"\r\n";

/// Longest unterminated line kept before it is flushed as-is.
pub const MAX_LINE_BYTES: usize = 4096;

// Short enough for the reader to notice a stop request promptly.
const READ_TIMEOUT: Duration = Duration::from_millis(200);

/// Incremental `\r\n` framing over a byte stream.
#[derive(Debug, Default)]
pub struct LineSplitter {
    buffer: Vec<u8>,
}

impl LineSplitter {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self
            .buffer
            .windows(LINE_DELIMITER.len())
            .position(|w| w == LINE_DELIMITER)
        {
            let rest = self.buffer.split_off(pos + LINE_DELIMITER.len());
            self.buffer.truncate(pos);
            let line = std::mem::replace(&mut self.buffer, rest);
            if !line.is_empty() {
                lines.push(String::from_utf8_lossy(&line).into_owned());
            }
        }

        if self.buffer.len() > MAX_LINE_BYTES {
            // A trailing '\r' may be the first half of the next delimiter.
            // The cut can split a multi-byte character into two U+FFFD;
            // keywords are ASCII so matching is unaffected.
            let keep_cr = self.buffer.last() == Some(&b'\r');
            let tail = if keep_cr {
                self.buffer.split_off(self.buffer.len() - 1)
            } else {
                Vec::new()
            };
            let line = std::mem::replace(&mut self.buffer, tail);
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }

        lines
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub path: String,
    pub description: String,
}

pub fn list_ports() -> Result<Vec<PortInfo>> {
    let ports = serialport::available_ports().context("Failed to enumerate serial ports")?;

    Ok(ports
        .into_iter()
        .map(|p| {
            let description = match p.port_type {
                SerialPortType::UsbPort(usb) => usb
                    .manufacturer
                    .or(usb.product)
                    .unwrap_or_else(|| format!("USB {:04x}:{:04x}", usb.vid, usb.pid)),
                SerialPortType::PciPort => "PCI".to_string(),
                SerialPortType::BluetoothPort => "Bluetooth".to_string(),
                SerialPortType::Unknown => String::new(),
            };
            PortInfo {
                path: p.port_name,
                description,
            }
        })
        .collect())
}

pub fn open_port(settings: &SerialSettings) -> Result<Box<dyn SerialPort>> {
    serialport::new(&settings.port, settings.baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(READ_TIMEOUT)
        .open()
        .with_context(|| format!("Failed to open serial port {}", settings.port))
}

fn report_available_ports(settings: &SerialSettings) {
    info!("Attempting to list available ports...");
    match list_ports() {
        Ok(ports) if ports.is_empty() => {
            warn!("No ports found. Is the device plugged in?");
        }
        Ok(ports) => {
            info!("Found these ports:");
            for port in &ports {
                info!("   * {}\t{}", port.path, port.description);
            }
            info!(
                "Set SERIAL_PORT to one of the paths above (currently '{}')",
                settings.port
            );
        }
        Err(e) => warn!("{:#}", e),
    }
}

enum ReaderExit {
    Stopped,
    Failed(anyhow::Error),
}

fn forward_lines<R: Read>(mut port: R, sender: &Sender<InputLine>, stop: &AtomicBool) -> ReaderExit {
    let mut splitter = LineSplitter::default();
    let mut buf = [0u8; 256];

    while !stop.load(Ordering::Relaxed) {
        match port.read(&mut buf) {
            Ok(0) => return ReaderExit::Failed(anyhow!("device closed the stream")),
            Ok(n) => {
                for line in splitter.push(&buf[..n]) {
                    if sender.blocking_send(InputLine::serial(line)).is_err() {
                        return ReaderExit::Stopped;
                    }
                }
            }
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::Interrupted) => continue,
            Err(e) => {
                return ReaderExit::Failed(
                    anyhow::Error::new(e).context("Failed to read from serial port"),
                )
            }
        }
    }
    ReaderExit::Stopped
}

/// Returns false if a stop was requested while waiting.
fn wait_unless_stopped(interval: Duration, stop: &AtomicBool) -> bool {
    let deadline = Instant::now() + interval;
    while Instant::now() < deadline {
        if stop.load(Ordering::Relaxed) {
            return false;
        }
        thread::sleep(READ_TIMEOUT.min(deadline.saturating_duration_since(Instant::now())));
    }
    !stop.load(Ordering::Relaxed)
}

fn run_reader(
    settings: SerialSettings,
    mut port: Option<Box<dyn SerialPort>>,
    sender: Sender<InputLine>,
    stop: Arc<AtomicBool>,
) {
    loop {
        if let Some(open) = port.take() {
            match forward_lines(open, &sender, &stop) {
                ReaderExit::Stopped => return,
                ReaderExit::Failed(e) => error!("Serial port {}: {:#}", settings.port, e),
            }
        }

        let Some(interval) = settings.reconnect else {
            warn!("Serial input stopped; continuing with console input only");
            return;
        };
        if !wait_unless_stopped(interval, &stop) {
            return;
        }

        match open_port(&settings) {
            Ok(open) => {
                info!("Serial port {} reopened at {} baud", settings.port, settings.baud_rate);
                port = Some(open);
            }
            Err(e) => warn!("Reconnect failed, retrying in {:?}: {:#}", interval, e),
        }
    }
}

pub struct SerialHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl SerialHandle {
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stops the reader and waits for it to release the port.
    pub fn close(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Serial reader thread panicked");
            }
        }
    }
}

/// Opens the configured port and starts forwarding its lines.
///
/// On open failure this lists the available ports and announces simulation
/// mode. Without a reconnect interval the returned handle has no reader and
/// `sender` is dropped.
pub fn start(settings: &SerialSettings, sender: Sender<InputLine>) -> SerialHandle {
    let stop = Arc::new(AtomicBool::new(false));

    let port = match open_port(settings) {
        Ok(port) => {
            info!("Serial port {} opened at {} baud", settings.port, settings.baud_rate);
            Some(port)
        }
        Err(e) => {
            error!("COULD NOT OPEN PORT {}: {:#}", settings.port, e);
            report_available_ports(settings);
            warn!("ENTERING SIMULATION MODE");
            info!("Type 'SOS' and press ENTER to test the remote store without a device.");
            if let Some(interval) = settings.reconnect {
                info!("Retrying {} every {:?}", settings.port, interval);
            }
            None
        }
    };

    let thread = if port.is_some() || settings.reconnect.is_some() {
        let settings = settings.clone();
        let reader_stop = stop.clone();
        thread::Builder::new()
            .name("serial-reader".to_string())
            .spawn(move || run_reader(settings, port, sender, reader_stop))
            .map_err(|e| error!("Failed to spawn serial reader: {}", e))
            .ok()
    } else {
        None
    };

    SerialHandle { stop, thread }
}
