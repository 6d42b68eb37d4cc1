//! Address translation between the FX Pak address space and the SNES bus for LoROM cartridges.
//!
//! Requests are addressed in the FX Pak address space:
//! * `$00_0000..$E0_0000`: ROM
//! * `$E0_0000..$F0_0000`: SRAM
//! * `$F5_0000..$F7_0000`: WRAM
//!
//! Emulators expect SNES bus addresses instead.

const WRAM_START: u32 = 0xF5_0000;
const WRAM_END: u32 = 0xF7_0000;
const SRAM_START: u32 = 0xE0_0000;
const SRAM_END: u32 = 0xF0_0000;

const BUS_WRAM: u32 = 0x7E_0000;
const BUS_SRAM_BANK: u32 = 0x70;

/// Translate an FX Pak address to a SNES bus address.
///
/// Addresses outside the ROM, SRAM and WRAM regions are returned unchanged.
pub fn pak_address_to_bus(pak: u32) -> u32 {
	if (WRAM_START..WRAM_END).contains(&pak) {
		pak - WRAM_START + BUS_WRAM
	} else if pak < SRAM_START {
		let bank = pak >> 15;
		(bank << 16) | (pak & 0x7FFF) | 0x8000
	} else if pak < SRAM_END {
		let offset = pak - SRAM_START;
		((BUS_SRAM_BANK + (offset >> 15)) << 16) | (offset & 0x7FFF)
	} else {
		pak
	}
}

/// Translate a SNES bus address to an FX Pak address.
///
/// This is the inverse of [`pak_address_to_bus()`] for WRAM, ROM (banks `$00-$7D`, upper half) and SRAM (banks `$70-$7D`, lower half).
/// Other addresses are returned unchanged.
pub fn bus_address_to_pak(bus: u32) -> u32 {
	let bank = bus >> 16;
	let offset = bus & 0xFFFF;
	if (BUS_WRAM..BUS_WRAM + (WRAM_END - WRAM_START)).contains(&bus) {
		bus - BUS_WRAM + WRAM_START
	} else if (BUS_SRAM_BANK..0x7E).contains(&bank) && offset < 0x8000 {
		SRAM_START + ((bank - BUS_SRAM_BANK) << 15) + offset
	} else if bank < 0x7E && offset >= 0x8000 {
		(bank << 15) | (offset & 0x7FFF)
	} else {
		bus
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use assert2::assert;

	#[test]
	fn wram() {
		assert!(pak_address_to_bus(0xF5_0000) == 0x7E_0000);
		assert!(pak_address_to_bus(0xF5_0010) == 0x7E_0010);
		assert!(pak_address_to_bus(0xF6_FFFF) == 0x7F_FFFF);
		assert!(bus_address_to_pak(0x7E_0010) == 0xF5_0010);
		assert!(bus_address_to_pak(0x7F_FFFF) == 0xF6_FFFF);
	}

	#[test]
	fn rom() {
		assert!(pak_address_to_bus(0x00_0000) == 0x00_8000);
		assert!(pak_address_to_bus(0x00_7FFF) == 0x00_FFFF);
		assert!(pak_address_to_bus(0x00_8000) == 0x01_8000);
		assert!(pak_address_to_bus(0x12_3456) == 0x24_B456);
		assert!(bus_address_to_pak(0x00_8000) == 0x00_0000);
		assert!(bus_address_to_pak(0x24_B456) == 0x12_3456);
	}

	#[test]
	fn sram() {
		assert!(pak_address_to_bus(0xE0_0000) == 0x70_0000);
		assert!(pak_address_to_bus(0xE0_1234) == 0x70_1234);
		assert!(pak_address_to_bus(0xE0_8000) == 0x71_0000);
		assert!(bus_address_to_pak(0x70_1234) == 0xE0_1234);
		assert!(bus_address_to_pak(0x71_0000) == 0xE0_8000);
	}

	#[test]
	fn other_addresses_pass_through() {
		assert!(pak_address_to_bus(0xF0_0000) == 0xF0_0000);
		assert!(pak_address_to_bus(0xF7_0000) == 0xF7_0000);
		assert!(pak_address_to_bus(0xFF_FFFF) == 0xFF_FFFF);
		assert!(bus_address_to_pak(0xC0_8000) == 0xC0_8000);
	}

	#[test]
	fn inverse_over_regions() {
		for pak in (0x00_0000..0x3F_0000).step_by(0x1_2345).chain((0xE0_0000..0xE7_0000).step_by(0x333)).chain((0xF5_0000..0xF7_0000).step_by(0x101)) {
			assert!(bus_address_to_pak(pak_address_to_bus(pak)) == pak, "pak = {pak:06X}");
		}
	}
}
