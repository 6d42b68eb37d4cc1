use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;

/// A datagram transport that carries one text command per message.
///
/// All I/O goes through a shared reference, so one transport can be shared by the driver (for detection) and a queue.
pub trait LineTransport: Send + Sync {
	/// Send one message, failing if it can not be sent before the timeout expires.
	fn send_timeout(&self, data: &[u8], timeout: Duration) -> io::Result<()>;

	/// Receive one message, failing if none arrives before the timeout expires.
	fn recv_timeout(&self, buffer: &mut [u8], timeout: Duration) -> io::Result<usize>;
}

/// A UDP socket connected to the network command interface of one RetroArch instance.
#[derive(Debug)]
pub struct UdpClient {
	socket: UdpSocket,
	peer: SocketAddr,
}

impl UdpClient {
	/// Resolve `host` (a `host:port` pair) and connect a new socket to it.
	///
	/// IPv4 addresses are preferred, since RetroArch listens on IPv4 by default.
	pub fn connect(host: &str) -> io::Result<Self> {
		let addresses: Vec<SocketAddr> = host.to_socket_addrs()?.collect();
		let peer = addresses.iter()
			.find(|x| x.is_ipv4())
			.or_else(|| addresses.first())
			.copied()
			.ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no address found for {}", host)))?;

		// Bind to the unspecified address of the same IP version as the peer.
		let local: IpAddr = match peer.ip() {
			IpAddr::V4(_) => Ipv4Addr::UNSPECIFIED.into(),
			IpAddr::V6(_) => Ipv6Addr::UNSPECIFIED.into(),
		};
		let socket = UdpSocket::bind(SocketAddr::new(local, 0))?;
		socket.connect(peer)?;
		debug!("retroarch: connected socket {} to {}", socket.local_addr()?, peer);
		Ok(Self { socket, peer })
	}

	/// The address of the RetroArch instance.
	pub fn peer(&self) -> SocketAddr {
		self.peer
	}
}

impl LineTransport for UdpClient {
	fn send_timeout(&self, data: &[u8], timeout: Duration) -> io::Result<()> {
		self.socket.set_write_timeout(Some(non_zero(timeout)?))?;
		let written = self.socket.send(data)?;
		if written != data.len() {
			return Err(io::Error::new(
				io::ErrorKind::WriteZero,
				format!("sent {} of {} bytes", written, data.len()),
			));
		}
		Ok(())
	}

	fn recv_timeout(&self, buffer: &mut [u8], timeout: Duration) -> io::Result<usize> {
		self.socket.set_read_timeout(Some(non_zero(timeout)?))?;
		self.socket.recv(buffer)
	}
}

/// Socket timeouts of zero are rejected by the OS, an expired deadline is a timeout.
fn non_zero(timeout: Duration) -> io::Result<Duration> {
	if timeout.is_zero() {
		Err(io::ErrorKind::TimedOut.into())
	} else {
		Ok(timeout)
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use assert2::{assert, let_assert};

	#[test]
	fn round_trip_over_loopback() {
		let_assert!(Ok(server) = UdpSocket::bind("127.0.0.1:0"));
		let_assert!(Ok(address) = server.local_addr());
		let_assert!(Ok(client) = UdpClient::connect(&address.to_string()));
		assert!(client.peer() == address);

		assert!(let Ok(()) = client.send_timeout(b"VERSION\n", Duration::from_secs(1)));
		let mut buffer = [0; 64];
		let_assert!(Ok((len, from)) = server.recv_from(&mut buffer));
		assert!(&buffer[..len] == b"VERSION\n");

		let_assert!(Ok(_) = server.send_to(b"1.19.1\n", from));
		let_assert!(Ok(len) = client.recv_timeout(&mut buffer, Duration::from_secs(1)));
		assert!(&buffer[..len] == b"1.19.1\n");
	}

	#[test]
	fn recv_times_out() {
		let_assert!(Ok(server) = UdpSocket::bind("127.0.0.1:0"));
		let_assert!(Ok(address) = server.local_addr());
		let_assert!(Ok(client) = UdpClient::connect(&address.to_string()));
		let mut buffer = [0; 64];
		let_assert!(Err(e) = client.recv_timeout(&mut buffer, Duration::from_millis(20)));
		assert!(matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock));
		let_assert!(Err(e) = client.recv_timeout(&mut buffer, Duration::ZERO));
		assert!(e.kind() == io::ErrorKind::TimedOut);
	}
}
