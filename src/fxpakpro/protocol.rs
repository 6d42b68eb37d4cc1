//! Frame encoding of the FX Pak Pro USB protocol.

use core::time::Duration;

use crate::endian::write_u24_be;
use crate::{InvalidResponse, Operation, SerialPort, TransferError};

/// Every transfer on the USB link happens in units of 64 bytes.
pub const FRAME_SIZE: usize = 64;

/// The magic bytes at the start of every control frame.
pub const MAGIC: [u8; 4] = *b"USBA";

/// The number of address descriptors that fit in one control frame.
pub const MAX_DESCRIPTORS: usize = 8;

/// Offset of the first address descriptor in a control frame.
const DESCRIPTOR_OFFSET: usize = 32;

#[rustfmt::skip]
pub mod opcode {
	pub const GET         : u8 = 0;
	pub const PUT         : u8 = 1;
	pub const VGET        : u8 = 2;
	pub const VPUT        : u8 = 3;
	pub const LS          : u8 = 4;
	pub const MKDIR       : u8 = 5;
	pub const RM          : u8 = 6;
	pub const MV          : u8 = 7;
	pub const RESET       : u8 = 8;
	pub const BOOT        : u8 = 9;
	pub const POWER_CYCLE : u8 = 10;
	pub const INFO        : u8 = 11;
	pub const MENU_RESET  : u8 = 12;
	pub const STREAM      : u8 = 13;
	pub const TIME        : u8 = 14;
	pub const RESPONSE    : u8 = 15;
}

#[rustfmt::skip]
pub mod space {
	pub const FILE   : u8 = 0;
	pub const SNES   : u8 = 1;
	pub const MSU    : u8 = 2;
	pub const CMD    : u8 = 3;
	pub const CONFIG : u8 = 4;
}

#[rustfmt::skip]
pub mod flags {
	pub const NONE         : u8 = 0;
	pub const SKIPRESET    : u8 = 1;
	pub const ONLYRESET    : u8 = 2;
	pub const CLRX         : u8 = 4;
	pub const SETX         : u8 = 8;
	pub const STREAM_BURST : u8 = 16;
	pub const NORESP       : u8 = 64;
	pub const DATA64B      : u8 = 128;
}

/// One entry of a vectored (VGET/VPUT) control frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Descriptor {
	pub address: u32,
	pub size: u8,
}

/// Encode a vectored control frame.
///
/// # Panics
/// Panics if there are more than [`MAX_DESCRIPTORS`] descriptors.
pub fn encode_vector_frame(opcode: u8, descriptors: &[Descriptor]) -> [u8; FRAME_SIZE] {
	assert!(descriptors.len() <= MAX_DESCRIPTORS, "too many descriptors for one frame: {}", descriptors.len());
	let mut frame = [0; FRAME_SIZE];
	frame[..4].copy_from_slice(&MAGIC);
	frame[4] = opcode;
	frame[5] = space::SNES;
	frame[6] = flags::DATA64B | flags::NORESP;
	for (i, descriptor) in descriptors.iter().enumerate() {
		let entry = &mut frame[DESCRIPTOR_OFFSET + i * 4..][..4];
		entry[0] = descriptor.size;
		write_u24_be(&mut entry[1..], descriptor.address);
	}
	frame
}

/// The total payload size of a set of descriptors.
pub fn payload_len(descriptors: &[Descriptor]) -> usize {
	descriptors.iter().map(|x| usize::from(x.size)).sum()
}

/// The number of data frames needed for a payload.
pub fn frame_count(payload_len: usize) -> usize {
	payload_len.div_ceil(FRAME_SIZE)
}

/// The payload length rounded up to whole data frames.
pub fn padded_len(payload_len: usize) -> usize {
	frame_count(payload_len) * FRAME_SIZE
}

/// Write the whole buffer to the serial port.
pub fn send<P: SerialPort>(port: &mut P, data: &[u8], timeout: Duration) -> Result<(), TransferError> {
	trace!("fxpakpro: > {:02X?}", data);
	port.write_all(data).map_err(|e| io_error::<P>(e, Operation::Write, timeout))
}

/// Fill the whole buffer from the serial port before the timeout expires.
pub fn recv<P: SerialPort>(port: &mut P, buffer: &mut [u8], timeout: Duration) -> Result<(), TransferError> {
	let deadline = port.make_deadline(timeout);
	let mut received = 0;
	while received < buffer.len() {
		let new_data = port.read(&mut buffer[received..], &deadline)
			.map_err(|e| io_error::<P>(e, Operation::Read, timeout))?;
		if new_data == 0 {
			return Err(InvalidResponse::new("serial port closed during read").into());
		}
		received += new_data;
	}
	trace!("fxpakpro: < {:02X?}", buffer);
	Ok(())
}

fn io_error<P: SerialPort>(error: std::io::Error, operation: Operation, timeout: Duration) -> TransferError {
	if P::is_timeout_error(&error) {
		crate::Timeout { operation, timeout }.into()
	} else {
		TransferError::from_io(error, operation, timeout)
	}
}
