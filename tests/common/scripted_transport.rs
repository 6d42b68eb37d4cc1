use snes_link::retroarch::LineTransport;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

/// A line transport that records sent lines and replies from a script.
#[derive(Default)]
pub struct ScriptedTransport {
	sent: Mutex<Vec<String>>,

	/// Sends that fail, by 1-based send number.
	send_failures: Mutex<HashMap<usize, std::io::ErrorKind>>,

	replies: Mutex<VecDeque<Vec<u8>>>,
}

#[allow(dead_code)]
impl ScriptedTransport {
	pub fn new() -> Self {
		Self::default()
	}

	/// Make the `n`-th send (counting from 1) fail.
	pub fn fail_send(&self, n: usize, kind: std::io::ErrorKind) {
		self.send_failures.lock().unwrap().insert(n, kind);
	}

	/// Queue a message to be received.
	pub fn push_reply(&self, reply: &str) {
		self.replies.lock().unwrap().push_back(reply.as_bytes().to_vec());
	}

	/// All lines sent so far, including the ones that failed.
	pub fn sent(&self) -> Vec<String> {
		self.sent.lock().unwrap().clone()
	}
}

impl LineTransport for ScriptedTransport {
	fn send_timeout(&self, data: &[u8], _timeout: Duration) -> std::io::Result<()> {
		let mut sent = self.sent.lock().unwrap();
		sent.push(String::from_utf8_lossy(data).into_owned());
		match self.send_failures.lock().unwrap().get(&sent.len()) {
			Some(&kind) => Err(kind.into()),
			None => Ok(()),
		}
	}

	fn recv_timeout(&self, buffer: &mut [u8], _timeout: Duration) -> std::io::Result<usize> {
		let reply = self.replies.lock().unwrap().pop_front().ok_or(std::io::ErrorKind::TimedOut)?;
		let len = reply.len().min(buffer.len());
		buffer[..len].copy_from_slice(&reply[..len]);
		Ok(len)
	}
}
