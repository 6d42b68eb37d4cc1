use assert2::{assert, let_assert};
use snes_link::fxpakpro::{protocol, FxPakQueue};
use snes_link::{KeepAlive, Queue, ReadRequest, WriteRequest};
use std::time::Duration;
use test_log::test;

mod common;
use common::mock_serial_port::MockSerialPort;
use common::Recorder;

const TIMEOUT: Duration = Duration::from_millis(100);

fn setup() -> (FxPakQueue<MockSerialPort>, MockSerialPort) {
	let port = MockSerialPort::new();
	(FxPakQueue::new(port.clone(), TIMEOUT), port)
}

fn two_byte_writes(recorder: &Recorder, count: u32) -> Vec<WriteRequest> {
	(0..count)
		.map(|i| WriteRequest::new(0xF5_0000 + 2 * i, vec![i as u8, 0x80 | i as u8]).with_completion(recorder.completion()))
		.collect()
}

#[test]
fn ten_two_byte_writes() {
	let (queue, port) = setup();
	let recorder = Recorder::new();

	let sequence = queue.make_write_commands(two_byte_writes(&recorder, 10), Some(recorder.batch_completion()));
	let sizes: Vec<usize> = sequence.commands().iter().map(|x| x.command.len()).collect();
	assert!(sizes == [8, 2]);
	assert!(sequence.commands().iter().all(|x| x.command.is_write()));
	let_assert!(Ok(()) = sequence.execute(&KeepAlive::disabled()));

	// Two vectored writes: a control frame and one data frame each.
	let written = port.take_written();
	assert!(written.len() == 4 * protocol::FRAME_SIZE);
	let (first, second) = written.split_at(2 * protocol::FRAME_SIZE);

	assert!(first[..7] == [b'U', b'S', b'B', b'A', protocol::opcode::VPUT, protocol::space::SNES, 0xC0]);
	assert!(first[32..36] == [2, 0xF5, 0x00, 0x00]);
	assert!(first[60..64] == [2, 0xF5, 0x00, 0x0E]);
	let data = &first[64..128];
	assert!(data[..4] == [0x00, 0x80, 0x01, 0x81]);
	assert!(data[14..16] == [0x07, 0x87]);
	assert!(data[16..] == [0; 48]);

	assert!(second[32..40] == [2, 0xF5, 0x00, 0x10, 2, 0xF5, 0x00, 0x12]);
	assert!(second[40..64] == [0; 24]);
	assert!(second[64..68] == [0x08, 0x88, 0x09, 0x89]);
	assert!(second[68..] == [0; 60]);

	let responses = recorder.responses();
	assert!(responses.len() == 10);
	for (i, response) in responses.iter().enumerate() {
		assert!(response.is_write);
		assert!(response.address == 0xF5_0000 + 2 * i as u32);
		assert!(response.size == 2);
		assert!(response.data == [i as u8, 0x80 | i as u8]);
	}
	assert!(recorder.batches() == [Ok(()), Ok(())]);
	assert!(!queue.closed().is_closed());
}

#[test]
fn twenty_bytes_fit_in_one_data_frame() {
	let descriptors = [protocol::Descriptor { address: 0xF5_0000, size: 2 }; 10];
	let total = protocol::payload_len(&descriptors);
	assert!(total == 20);
	assert!(protocol::frame_count(total) == 1);
	assert!(protocol::padded_len(total) == 64);
}

#[test]
fn large_write_spans_data_frames() {
	let (queue, port) = setup();
	let recorder = Recorder::new();
	let requests = vec![
		WriteRequest::new(0xE0_0000, vec![0xAA; 255]).with_completion(recorder.completion()),
		WriteRequest::new(0xE0_0100, vec![0xBB; 100]).with_completion(recorder.completion()),
	];
	let_assert!(Ok(()) = queue.make_write_commands(requests, None).execute(&KeepAlive::disabled()));

	let written = port.take_written();
	// 355 bytes round up to 6 data frames.
	assert!(written.len() == protocol::FRAME_SIZE + 384);
	assert!(written[64..319].iter().all(|&x| x == 0xAA));
	assert!(written[319..419].iter().all(|&x| x == 0xBB));
	assert!(written[419..].iter().all(|&x| x == 0));
	assert!(recorder.responses().len() == 2);
}

#[test]
fn read_batch_is_sliced_per_request() {
	let (queue, port) = setup();
	let recorder = Recorder::new();
	let mut reply = vec![0; 64];
	reply[..5].copy_from_slice(&[1, 2, 3, 4, 5]);
	port.push_reply(&reply);

	let requests = vec![
		ReadRequest::new(0xF5_0010, 2).with_completion(recorder.completion()),
		ReadRequest::new(0xF5_0100, 3).with_completion(recorder.completion()),
	];
	let sequence = queue.make_read_commands(requests, None);
	assert!(!sequence.commands()[0].command.is_write());
	let_assert!(Ok(()) = sequence.execute(&KeepAlive::disabled()));

	let written = port.take_written();
	assert!(written.len() == 64);
	assert!(written[4] == protocol::opcode::VGET);
	assert!(written[32..40] == [2, 0xF5, 0x00, 0x10, 3, 0xF5, 0x01, 0x00]);

	let responses = recorder.responses();
	assert!(responses.len() == 2);
	assert!(!responses[0].is_write);
	assert!(responses[0].address == 0xF5_0010);
	assert!(responses[0].data == [1, 2]);
	assert!(responses[1].data == [3, 4, 5]);
}

#[test]
fn read_timeout_closes_queue() {
	let (queue, port) = setup();
	let recorder = Recorder::new();
	// Only half of the data frame arrives.
	port.push_reply(&[0; 32]);

	let requests = vec![ReadRequest::new(0xF5_0000, 40).with_completion(recorder.completion())];
	let_assert!(Err(e) = queue.make_read_commands(requests, None).execute(&KeepAlive::disabled()));
	assert!(e.is_timeout());
	assert!(queue.is_terminal_error(&e));
	assert!(recorder.responses().is_empty());
	assert!(queue.closed().is_closed());
}

#[test]
fn write_failure_fires_no_completions() {
	let (queue, port) = setup();
	let recorder = Recorder::new();
	port.fail_writes(std::io::ErrorKind::BrokenPipe);

	let sequence = queue.make_write_commands(two_byte_writes(&recorder, 10), Some(recorder.batch_completion()));
	let_assert!(Err(e) = sequence.execute(&KeepAlive::disabled()));
	assert!(!e.is_timeout());
	assert!(queue.is_terminal_error(&e));
	assert!(recorder.responses().is_empty());
	assert!(queue.closed().is_closed());

	// The second command found the link closed.
	let batches = recorder.batches();
	assert!(batches.len() == 2);
	assert!(batches[0].is_err());
	assert!(batches[1] == Err(String::from("fxpakpro: connection is closed")));
}

#[test]
fn closed_queue() {
	let (queue, port) = setup();
	let closed = queue.closed();
	assert!(!closed.is_closed());
	let_assert!(Ok(()) = queue.close());
	assert!(closed.is_closed());
	let_assert!(Ok(()) = queue.close());
	assert!(closed.is_closed());

	let_assert!(Err(e) = queue.make_write_commands(vec![WriteRequest::new(0, vec![1])], None).execute(&KeepAlive::disabled()));
	assert!(e.is_connection_closed());
	assert!(!queue.is_terminal_error(&e));
	assert!(port.take_written().is_empty());
}

#[test]
fn keep_alive_pulses() {
	let (queue, _port) = setup();
	let (keep_alive, pulses) = KeepAlive::channel(16);
	let_assert!(Ok(()) = queue.make_write_commands(vec![WriteRequest::new(0, vec![1])], None).execute(&keep_alive));
	// One pulse before and one after the transfer.
	assert!(pulses.try_iter().count() == 2);
}
