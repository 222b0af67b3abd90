use crate::models::line::InputLine;
use std::io::{self, BufRead};
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc::Sender;
use tracing::{debug, error, warn};

fn forward_lines<R: BufRead>(mut reader: R, sender: &Sender<InputLine>) {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                }
                if buf.last() == Some(&b'\r') {
                    buf.pop();
                }
                // Lossy, so a stray non-UTF-8 byte cannot end the reader.
                let text = String::from_utf8_lossy(&buf).into_owned();
                if sender.blocking_send(InputLine::console(text)).is_err() {
                    debug!("Relay closed, console reader exiting");
                    return;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!("Console read failed: {}", e);
                return;
            }
        }
    }
    debug!("Console input closed");
}

/// Reads operator lines from stdin on a detached thread. Runs whatever state
/// the serial port is in.
pub fn spawn_console_reader(sender: Sender<InputLine>) -> Option<JoinHandle<()>> {
    thread::Builder::new()
        .name("console-reader".to_string())
        .spawn(move || forward_lines(io::stdin().lock(), &sender))
        .map_err(|e| error!("Failed to spawn console reader: {}", e))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tokio::sync::mpsc;

    #[test]
    fn test_forwards_each_line_as_console_input() {
        let (tx, mut rx) = mpsc::channel(8);
        forward_lines(Cursor::new("sos\nstatus\r\n"), &tx);

        assert_eq!(rx.try_recv().unwrap(), InputLine::console("sos"));
        assert_eq!(rx.try_recv().unwrap(), InputLine::console("status"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_invalid_utf8_line_does_not_stop_reader() {
        let (tx, mut rx) = mpsc::channel(8);
        forward_lines(Cursor::new(b"caf\xe9\nSOS\n".to_vec()), &tx);

        assert_eq!(rx.try_recv().unwrap(), InputLine::console("caf\u{fffd}"));
        assert_eq!(rx.try_recv().unwrap(), InputLine::console("SOS"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_last_line_without_newline_is_forwarded() {
        let (tx, mut rx) = mpsc::channel(8);
        forward_lines(Cursor::new("alert"), &tx);

        assert_eq!(rx.try_recv().unwrap(), InputLine::console("alert"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_stops_when_relay_is_gone() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        forward_lines(Cursor::new("SOS\nSOS\n"), &tx);
    }
}
