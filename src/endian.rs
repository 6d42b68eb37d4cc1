/// Write a 24-bit value, most significant byte first.
pub fn write_u24_be(buffer: &mut [u8], value: u32) {
	buffer[0] = (value >> 16 & 0xFF) as u8;
	buffer[1] = (value >> 8 & 0xFF) as u8;
	buffer[2] = (value & 0xFF) as u8;
}
