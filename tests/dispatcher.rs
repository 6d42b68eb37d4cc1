use assert2::{assert, let_assert};
use snes_link::fxpakpro::FxPakQueue;
use snes_link::mock::{Memory, MockDriver, MockQueue};
use snes_link::{DeviceDescriptor, DeviceWatcher, Dispatcher, Driver, KeepAlive, OpenError, Queue, ReadRequest, ResponseChannel, WriteRequest};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use test_log::test;

mod common;
use common::mock_serial_port::MockSerialPort;
use common::Recorder;

#[test]
fn sequences_run_in_submission_order() {
	let memory = Memory::new();
	let_assert!(Ok(dispatcher) = Dispatcher::new(Box::new(MockQueue::new(memory.clone())), KeepAlive::disabled()));
	let (responses, received) = ResponseChannel::new();

	let mut pending = Vec::new();
	for i in 0..20u8 {
		let write = WriteRequest::new(0xF5_0000, vec![i]);
		let read = ReadRequest::new(0xF5_0000, 1).with_completion(responses.completion());
		pending.push(dispatcher.write(vec![write], None));
		pending.push(dispatcher.read(vec![read], None));
	}
	for pending in pending {
		let_assert!(Ok(()) = pending.wait());
	}

	let values: Vec<u8> = received.try_iter().map(|x| x.data[0]).collect();
	assert!(values == (0..20).collect::<Vec<u8>>());
	assert!(memory.read(0xF5_0000, 1) == [19]);
}

#[test]
fn failed_command_fails_the_rest_fast() {
	let port = MockSerialPort::new();
	port.fail_writes(std::io::ErrorKind::BrokenPipe);
	let queue = FxPakQueue::new(port.clone(), Duration::from_millis(50));
	let_assert!(Ok(dispatcher) = Dispatcher::new(Box::new(queue), KeepAlive::disabled()));
	let recorder = Recorder::new();

	let requests: Vec<WriteRequest> = (0..20).map(|i| WriteRequest::new(i, vec![1]).with_completion(recorder.completion())).collect();
	let_assert!(Err(e) = dispatcher.write(requests, Some(recorder.batch_completion())).wait());
	assert!(dispatcher.is_terminal_error(&e));
	assert!(dispatcher.closed().is_closed());
	assert!(recorder.responses().is_empty());

	let batches = recorder.batches();
	assert!(batches.len() == 3);
	assert!(batches[1..] == [Err(String::from("fxpakpro: connection is closed")), Err(String::from("fxpakpro: connection is closed"))]);

	// Work submitted after the failure is rejected without touching the port.
	let_assert!(Err(e) = dispatcher.read(vec![ReadRequest::new(0, 1)], None).wait());
	assert!(e.is_connection_closed());
	assert!(!dispatcher.is_terminal_error(&e));
}

#[test]
fn keep_alive_reaches_watchdog() {
	let (keep_alive, pulses) = KeepAlive::channel(64);
	let_assert!(Ok(dispatcher) = Dispatcher::new(Box::new(MockQueue::new(Memory::new())), keep_alive));
	let requests: Vec<ReadRequest> = (0..16).map(|i| ReadRequest::new(i, 1)).collect();
	let_assert!(Ok(()) = dispatcher.read(requests, None).wait());
	assert!(pulses.try_iter().count() == 2);
}

#[test]
fn close_signal_wakes_waiters() {
	let_assert!(Ok(dispatcher) = Dispatcher::new(Box::new(MockQueue::new(Memory::new())), KeepAlive::disabled()));
	let closed = dispatcher.closed();
	let waiter = std::thread::spawn(move || closed.wait_timeout(Duration::from_secs(5)));
	let_assert!(Ok(()) = dispatcher.close());
	let_assert!(Ok(true) = waiter.join());
	drop(dispatcher);
}

/// A driver that reports a scripted list of devices on every scan.
struct ScriptedDetect {
	scans: Mutex<VecDeque<std::io::Result<Vec<DeviceDescriptor>>>>,
}

impl Driver for ScriptedDetect {
	fn open(&self, _device: &DeviceDescriptor) -> Result<Box<dyn Queue>, OpenError> {
		MockDriver::new().open(&DeviceDescriptor::new("mock", ""))
	}

	fn detect(&self) -> std::io::Result<Vec<DeviceDescriptor>> {
		self.scans.lock().unwrap().pop_front().unwrap_or_else(|| Ok(Vec::new()))
	}
}

#[test]
fn watcher_reports_changes_only() {
	let a = DeviceDescriptor::new("/dev/ttyACM0", "/dev/ttyACM0");
	let b = DeviceDescriptor::new("/dev/ttyACM1", "/dev/ttyACM1");
	let scans = vec![
		Ok(vec![a.clone()]),
		Ok(vec![a.clone()]),
		Ok(vec![a.clone(), b.clone()]),
		Ok(vec![b.clone(), a.clone()]),
		Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "no access")),
		Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "no access")),
	];
	let driver = Arc::new(ScriptedDetect { scans: Mutex::new(scans.into()) });
	let mut watcher = DeviceWatcher::new(driver);
	assert!(watcher.devices() == [a.clone()]);

	assert!(watcher.poll().is_none());
	let_assert!(Some(devices) = watcher.poll());
	assert!(devices == [a.clone(), b.clone()]);
	// Same devices in another order is a change.
	let_assert!(Some(devices) = watcher.poll());
	assert!(devices == [b.clone(), a.clone()]);
	// A failed scan counts as no devices.
	let_assert!(Some(devices) = watcher.poll());
	assert!(devices.is_empty());
	assert!(watcher.poll().is_none());
	assert!(watcher.poll().is_none());
}
