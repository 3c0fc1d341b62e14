//! TCP implementation of [`Transport`].

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::debug;

use super::Transport;
use crate::error::{Error, Result};

impl Transport for TcpStream {
	fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
		let mut stream: &TcpStream = self;
		Read::read(&mut stream, buf)
	}

	fn write_all(&self, buf: &[u8]) -> io::Result<()> {
		let mut stream: &TcpStream = self;
		Write::write_all(&mut stream, buf)
	}

	fn flush(&self) -> io::Result<()> {
		let mut stream: &TcpStream = self;
		Write::flush(&mut stream)
	}

	fn shutdown(&self) -> io::Result<()> {
		match TcpStream::shutdown(self, Shutdown::Both) {
			// Peer already tore the connection down.
			Err(err) if err.kind() == io::ErrorKind::NotConnected => Ok(()),
			other => other,
		}
	}

	fn peer(&self) -> String {
		self.peer_addr().map(|addr| addr.to_string()).unwrap_or_else(|_| "unknown peer".to_string())
	}
}

/// Opens a TCP connection to `host:port`, trying each resolved address in
/// turn within `timeout`.
pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<TcpStream> {
	let addr = format!("{host}:{port}");
	let candidates = (host, port).to_socket_addrs().map_err(|source| Error::Connect {
		addr: addr.clone(),
		source,
	})?;

	let mut last_err = None;
	for candidate in candidates {
		match TcpStream::connect_timeout(&candidate, timeout) {
			Ok(stream) => {
				if let Err(err) = stream.set_nodelay(true) {
					debug!(target = "pmon.transport", %candidate, error = %err, "could not disable nagle");
				}
				debug!(target = "pmon.transport", %candidate, "connected");
				return Ok(stream);
			}
			Err(err) => {
				debug!(target = "pmon.transport", %candidate, error = %err, "connect attempt failed");
				last_err = Some(err);
			}
		}
	}

	Err(Error::Connect {
		addr,
		source: last_err.unwrap_or_else(|| io::Error::new(io::ErrorKind::NotFound, "host resolved to no addresses")),
	})
}

#[cfg(test)]
mod tests {
	use std::net::TcpListener;
	use std::thread;

	use super::*;

	#[test]
	fn connects_to_listening_port() {
		let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
		let port = listener.local_addr().unwrap().port();
		let server = thread::spawn(move || listener.accept().unwrap().0);

		let stream = connect("127.0.0.1", port, Duration::from_secs(1)).unwrap();
		assert_eq!(Transport::peer(&stream), format!("127.0.0.1:{port}"));
		drop(server.join().unwrap());
	}

	#[test]
	fn refused_port_is_connect_error() {
		let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
		let port = listener.local_addr().unwrap().port();
		drop(listener);

		let err = connect("127.0.0.1", port, Duration::from_millis(500)).unwrap_err();
		assert!(matches!(err, Error::Connect { .. }), "unexpected error: {err}");
		assert!(err.to_string().contains(&format!("127.0.0.1:{port}")));
	}

	#[test]
	fn shutdown_unblocks_reader_on_other_thread() {
		let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
		let port = listener.local_addr().unwrap().port();
		let server = thread::spawn(move || listener.accept().unwrap().0);

		let stream = std::sync::Arc::new(connect("127.0.0.1", port, Duration::from_secs(1)).unwrap());
		let _peer = server.join().unwrap();

		let reader = {
			let stream = std::sync::Arc::clone(&stream);
			thread::spawn(move || {
				let mut buf = [0u8; 8];
				Transport::read(&*stream, &mut buf)
			})
		};

		thread::sleep(Duration::from_millis(50));
		Transport::shutdown(&*stream).unwrap();
		// Either EOF or an error is acceptable; what matters is that it returns.
		let result = reader.join().unwrap();
		assert!(matches!(result, Ok(0) | Err(_)));
	}
}
