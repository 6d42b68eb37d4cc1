#![allow(dead_code)]

use snes_link::{BatchCompletion, CommandError, Completion, Response};
use std::sync::{Arc, Mutex};

pub mod mock_serial_port;
pub mod scripted_transport;

/// Collects responses and batch results in the order they arrive.
#[derive(Default, Clone)]
pub struct Recorder {
	pub responses: Arc<Mutex<Vec<Response>>>,
	pub batches: Arc<Mutex<Vec<Result<(), String>>>>,
}

impl Recorder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn completion(&self) -> Completion {
		let responses = self.responses.clone();
		Box::new(move |response| responses.lock().unwrap().push(response))
	}

	pub fn batch_completion(&self) -> BatchCompletion {
		let batches = self.batches.clone();
		Arc::new(move |result: Result<(), &CommandError>| batches.lock().unwrap().push(result.map_err(|e| e.to_string())))
	}

	pub fn responses(&self) -> Vec<Response> {
		self.responses.lock().unwrap().clone()
	}

	pub fn batches(&self) -> Vec<Result<(), String>> {
		self.batches.lock().unwrap().clone()
	}
}
