//! A SCSI Block Commands target implementing the subset of opcodes required for a
//! removable, read-only USB mass storage device to enumerate and be read by
//! Windows, macOS, and Linux hosts.
//!
//! Grounded in the SCSI command/sense definitions of the original firmware's
//! `usb_scsi_commands.h` and `usb_scsi.c`.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

use alloc::boxed::Box;

use hadris_fat::virtual_fs::{ExternalFileReader, VirtualFs};
use hadris_part::SECTOR_SIZE;

pub mod opcode {
    pub const TEST_UNIT_READY: u8 = 0x00;
    pub const REQUEST_SENSE: u8 = 0x03;
    pub const INQUIRY: u8 = 0x12;
    pub const MODE_SENSE_6: u8 = 0x1A;
    pub const START_STOP_UNIT: u8 = 0x1B;
    pub const PREVENT_ALLOW_MEDIUM_REMOVAL: u8 = 0x1E;
    pub const READ_FORMAT_CAPACITY: u8 = 0x23;
    pub const READ_CAPACITY_10: u8 = 0x25;
    pub const READ_10: u8 = 0x28;
    pub const WRITE_10: u8 = 0x2A;
    pub const MODE_SENSE_10: u8 = 0x5A;
}

pub mod sense_key {
    pub const NO_SENSE: u8 = 0x00;
    pub const NOT_READY: u8 = 0x02;
    pub const ILLEGAL_REQUEST: u8 = 0x05;
    pub const DATA_PROTECT: u8 = 0x07;
}

pub mod asc {
    pub const INVALID_COMMAND: u8 = 0x20;
    pub const LBA_OUT_OF_RANGE: u8 = 0x21;
    pub const INVALID_FIELD_IN_CDB: u8 = 0x24;
    pub const WRITE_PROTECTED: u8 = 0x27;
    pub const MEDIUM_NOT_PRESENT: u8 = 0x3A;
}

/// A stored `(sense_key, additional_sense_code)` pair, reported by the next REQUEST SENSE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SenseInfo {
    pub key: u8,
    pub asc: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ScsiError {
    #[error("medium not present")]
    NotReady,
    #[error("lba out of range")]
    LbaOutOfRange,
    #[error("invalid field in command descriptor block")]
    InvalidField,
    #[error("unsupported opcode {0:#04x}")]
    UnknownOpcode(u8),
    #[error("write attempted on a read-only device")]
    WriteProtected,
}

impl ScsiError {
    fn sense(self) -> SenseInfo {
        match self {
            ScsiError::NotReady => SenseInfo {
                key: sense_key::NOT_READY,
                asc: asc::MEDIUM_NOT_PRESENT,
            },
            ScsiError::LbaOutOfRange => SenseInfo {
                key: sense_key::ILLEGAL_REQUEST,
                asc: asc::LBA_OUT_OF_RANGE,
            },
            ScsiError::InvalidField => SenseInfo {
                key: sense_key::ILLEGAL_REQUEST,
                asc: asc::INVALID_FIELD_IN_CDB,
            },
            ScsiError::UnknownOpcode(_) => SenseInfo {
                key: sense_key::ILLEGAL_REQUEST,
                asc: asc::INVALID_COMMAND,
            },
            ScsiError::WriteProtected => SenseInfo {
                key: sense_key::DATA_PROTECT,
                asc: asc::WRITE_PROTECTED,
            },
        }
    }
}

/// What kind of data phase a just-processed command expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// No data phase.
    None,
    /// `remaining` bytes left in `scratch`, starting at `buffer_offset`.
    SmallReply,
    /// `remaining` sectors left to stream starting at `current_lba`.
    SectorStream,
}

/// A SCSI target bound to one [`VirtualFs`], tracking exactly one in-flight command's
/// data-phase state at a time (the host may not pipeline commands).
pub struct ScsiTarget {
    vfs: VirtualFs,
    reader: Option<Box<dyn ExternalFileReader>>,
    total_sectors: u32,
    mode: Mode,
    scratch: [u8; SECTOR_SIZE],
    buffer_offset: usize,
    remaining: u32,
    current_lba: u32,
    sense: Option<SenseInfo>,
    medium_present: bool,
}

impl ScsiTarget {
    pub fn new(vfs: VirtualFs, total_sectors: u32) -> Self {
        Self {
            vfs,
            reader: None,
            total_sectors,
            mode: Mode::None,
            scratch: [0u8; SECTOR_SIZE],
            buffer_offset: 0,
            remaining: 0,
            current_lba: 0,
            sense: None,
            medium_present: true,
        }
    }

    /// Marks the medium present or absent. A target starts with medium present; callers that
    /// model removable media arriving after enumeration (e.g. the backing filesystem not yet
    /// attached) can flip this to `false` to have capacity/read/format-capacity commands fail
    /// with `NOT_READY`/`MEDIUM_NOT_PRESENT`, until set back to `true`.
    pub fn set_medium_present(&mut self, present: bool) {
        self.medium_present = present;
    }

    pub fn with_external_reader(mut self, reader: impl ExternalFileReader + 'static) -> Self {
        self.reader = Some(Box::new(reader));
        self
    }

    /// Registers a callback fired the first time any sector of a given virtual file is read,
    /// passed that file's display name. Used to surface a "currently active file" observable.
    pub fn set_read_callback(&mut self, callback: impl FnMut(&str) + 'static) {
        self.vfs.set_read_callback(callback);
    }

    /// Decodes and executes `cdb`, preparing whatever data phase the command implies.
    /// On failure, stores `(sense_key, asc)` for the next REQUEST SENSE and returns the error;
    /// the caller reports CSW status=failed with residue equal to the expected transfer length.
    pub fn process_command(&mut self, cdb: &[u8]) -> Result<(), ScsiError> {
        let result = self.dispatch(cdb);
        if let Err(err) = result {
            tracing::warn!(opcode = cdb.first().copied(), ?err, "scsi command failed");
            self.sense = Some(err.sense());
            self.mode = Mode::None;
        }
        result
    }

    fn dispatch(&mut self, cdb: &[u8]) -> Result<(), ScsiError> {
        let opcode = *cdb.first().ok_or(ScsiError::InvalidField)?;
        match opcode {
            opcode::TEST_UNIT_READY => {
                self.mode = Mode::None;
                Ok(())
            }
            opcode::REQUEST_SENSE => {
                self.build_sense_reply();
                Ok(())
            }
            opcode::INQUIRY => {
                self.build_inquiry_reply(cdb)?;
                Ok(())
            }
            opcode::MODE_SENSE_6 => {
                self.build_mode_sense_reply(4);
                Ok(())
            }
            opcode::MODE_SENSE_10 => {
                self.build_mode_sense_reply(8);
                Ok(())
            }
            opcode::START_STOP_UNIT | opcode::PREVENT_ALLOW_MEDIUM_REMOVAL => {
                self.mode = Mode::None;
                Ok(())
            }
            opcode::READ_FORMAT_CAPACITY => {
                self.require_medium_present()?;
                self.build_read_format_capacity_reply();
                Ok(())
            }
            opcode::READ_CAPACITY_10 => {
                self.require_medium_present()?;
                self.build_read_capacity_reply();
                Ok(())
            }
            opcode::READ_10 => {
                self.require_medium_present()?;
                self.begin_read10(cdb)
            }
            opcode::WRITE_10 => Err(ScsiError::WriteProtected),
            other => Err(ScsiError::UnknownOpcode(other)),
        }
    }

    fn require_medium_present(&self) -> Result<(), ScsiError> {
        if self.medium_present {
            Ok(())
        } else {
            Err(ScsiError::NotReady)
        }
    }

    fn start_small_reply(&mut self, len: usize) {
        self.mode = Mode::SmallReply;
        self.buffer_offset = 0;
        self.remaining = len as u32;
    }

    fn build_sense_reply(&mut self) {
        let sense = self.sense.take().unwrap_or(SenseInfo {
            key: sense_key::NO_SENSE,
            asc: 0,
        });
        let mut buf = [0u8; 18];
        buf[0] = 0x70; // response code, current errors
        buf[2] = sense.key;
        buf[7] = 0x0A; // additional sense length
        buf[12] = sense.asc;
        self.scratch[..18].copy_from_slice(&buf);
        self.start_small_reply(18);
    }

    fn build_inquiry_reply(&mut self, cdb: &[u8]) -> Result<(), ScsiError> {
        let evpd = cdb.get(1).copied().unwrap_or(0) & 0x01 != 0;
        let page_code = cdb.get(2).copied().unwrap_or(0);
        if !evpd {
            let mut buf = [0u8; 36];
            buf[0] = 0x00; // direct access block device
            buf[1] = 0x80; // removable
            buf[2] = 0x00; // version
            buf[3] = 0x02; // response data format
            buf[4] = 31; // additional length
            buf[8..16].copy_from_slice(b"FLIPPER ");
            buf[16..32].copy_from_slice(b"Boot2Flipper    ");
            buf[32..36].copy_from_slice(b"1.0 ");
            self.scratch[..36].copy_from_slice(&buf);
            self.start_small_reply(36);
            return Ok(());
        }
        match page_code {
            0x00 => {
                let mut buf = [0u8; 6];
                buf[0] = 0x00;
                buf[3] = 2;
                buf[4] = 0x00;
                buf[5] = 0x80;
                self.scratch[..6].copy_from_slice(&buf);
                self.start_small_reply(6);
                Ok(())
            }
            0x80 => {
                let mut buf = [0u8; 8];
                buf[0] = 0x00;
                buf[1] = 0x80;
                buf[3] = 4;
                buf[4..8].copy_from_slice(b"FLP0");
                self.scratch[..8].copy_from_slice(&buf);
                self.start_small_reply(8);
                Ok(())
            }
            _ => Err(ScsiError::InvalidField),
        }
    }

    fn build_mode_sense_reply(&mut self, header_len: usize) {
        let mut buf = [0u8; 8];
        // byte 2 (6-byte) / byte 3 (10-byte) of the mode parameter header: device-specific
        // parameter, bit 7 set means write-protected.
        let wp_offset = if header_len == 4 { 2 } else { 3 };
        buf[wp_offset] = 0x80;
        self.scratch[..header_len].copy_from_slice(&buf[..header_len]);
        self.start_small_reply(header_len);
    }

    fn build_read_format_capacity_reply(&mut self) {
        let mut buf = [0u8; 12];
        buf[3] = 0x08; // capacity list length
        buf[4..8].copy_from_slice(&self.total_sectors.to_be_bytes());
        buf[8] = 0x02; // formatted media descriptor code
        buf[9..12].copy_from_slice(&512u32.to_be_bytes()[1..]);
        self.scratch[..12].copy_from_slice(&buf);
        self.start_small_reply(12);
    }

    fn build_read_capacity_reply(&mut self) {
        let mut buf = [0u8; 8];
        buf[0..4].copy_from_slice(&(self.total_sectors - 1).to_be_bytes());
        buf[4..8].copy_from_slice(&512u32.to_be_bytes());
        self.scratch[..8].copy_from_slice(&buf);
        self.start_small_reply(8);
    }

    fn begin_read10(&mut self, cdb: &[u8]) -> Result<(), ScsiError> {
        if cdb.len() < 10 {
            return Err(ScsiError::InvalidField);
        }
        let lba = u32::from_be_bytes(cdb[2..6].try_into().unwrap());
        let length = u16::from_be_bytes(cdb[7..9].try_into().unwrap()) as u32;
        if length == 0 {
            self.mode = Mode::None;
            return Ok(());
        }
        if lba.checked_add(length).is_none_or(|end| end > self.total_sectors) {
            return Err(ScsiError::LbaOutOfRange);
        }
        self.mode = Mode::SectorStream;
        self.current_lba = lba;
        self.remaining = length;
        self.buffer_offset = SECTOR_SIZE; // force a fresh sector read on the first pull
        Ok(())
    }

    /// Copies up to `out.len()` bytes of the current reply into `out`, returning how many
    /// bytes were copied. Returns 0 once the reply is exhausted.
    pub fn transmit_data(&mut self, out: &mut [u8]) -> usize {
        match self.mode {
            Mode::None => 0,
            Mode::SmallReply => self.transmit_small_reply(out),
            Mode::SectorStream => self.transmit_sector_stream(out),
        }
    }

    fn transmit_small_reply(&mut self, out: &mut [u8]) -> usize {
        if self.remaining == 0 {
            self.mode = Mode::None;
            return 0;
        }
        let n = core::cmp::min(out.len(), self.remaining as usize);
        out[..n].copy_from_slice(&self.scratch[self.buffer_offset..self.buffer_offset + n]);
        self.buffer_offset += n;
        self.remaining -= n as u32;
        n
    }

    fn transmit_sector_stream(&mut self, out: &mut [u8]) -> usize {
        if self.remaining == 0 {
            self.mode = Mode::None;
            return 0;
        }
        if self.buffer_offset >= SECTOR_SIZE {
            let mut sector = [0u8; SECTOR_SIZE];
            match self.reader.as_deref_mut() {
                Some(reader) => self.vfs.read_sector_with(self.current_lba, &mut sector, reader),
                None => self.vfs.read_sector(self.current_lba, &mut sector),
            }
            self.scratch = sector;
            self.buffer_offset = 0;
        }
        let n = core::cmp::min(out.len(), SECTOR_SIZE - self.buffer_offset);
        out[..n].copy_from_slice(&self.scratch[self.buffer_offset..self.buffer_offset + n]);
        self.buffer_offset += n;
        if self.buffer_offset == SECTOR_SIZE {
            self.current_lba += 1;
            self.remaining -= 1;
            if self.remaining == 0 {
                self.mode = Mode::None;
            }
        }
        n
    }

    /// Whether the current command still has unread reply bytes.
    pub fn has_pending_data(&self) -> bool {
        self.mode != Mode::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> ScsiTarget {
        let vfs = VirtualFs::new(262144);
        ScsiTarget::new(vfs, 262144)
    }

    #[test]
    fn read_capacity_reports_last_lba_big_endian() {
        let mut target = target();
        target.process_command(&[0x25, 0, 0, 0, 0, 0, 0, 0, 0, 0]).unwrap();
        let mut out = [0u8; 8];
        assert_eq!(target.transmit_data(&mut out), 8);
        assert_eq!(&out[0..4], &0x0003FFFFu32.to_be_bytes());
        assert_eq!(&out[4..8], &512u32.to_be_bytes());
    }

    #[test]
    fn write_is_refused_and_sense_is_cleared_after_read() {
        let mut target = target();
        let err = target.process_command(&[0x2A, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(err, Err(ScsiError::WriteProtected));

        target.process_command(&[0x03, 0, 0, 0, 0, 0]).unwrap();
        let mut out = [0u8; 18];
        assert_eq!(target.transmit_data(&mut out), 18);
        assert_eq!(out[2], sense_key::DATA_PROTECT);
        assert_eq!(out[12], asc::WRITE_PROTECTED);

        target.process_command(&[0x03, 0, 0, 0, 0, 0]).unwrap();
        let mut out2 = [0u8; 18];
        target.transmit_data(&mut out2);
        assert_eq!(out2[2], sense_key::NO_SENSE);
    }

    #[test]
    fn medium_absent_fails_capacity_and_read_with_not_ready() {
        let mut target = target();
        target.set_medium_present(false);

        let err = target.process_command(&[0x25, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(err, Err(ScsiError::NotReady));

        target.process_command(&[0x03, 0, 0, 0, 0, 0]).unwrap();
        let mut out = [0u8; 18];
        target.transmit_data(&mut out);
        assert_eq!(out[2], sense_key::NOT_READY);
        assert_eq!(out[12], asc::MEDIUM_NOT_PRESENT);

        target.set_medium_present(true);
        target.process_command(&[0x25, 0, 0, 0, 0, 0, 0, 0, 0, 0]).unwrap();
    }

    #[test]
    fn unknown_opcode_reports_illegal_request() {
        let mut target = target();
        let err = target.process_command(&[0xFF]);
        assert_eq!(err, Err(ScsiError::UnknownOpcode(0xFF)));
    }

    #[test]
    fn read10_out_of_range_is_rejected() {
        let mut target = target();
        let cdb = [0x28, 0, 0xFF, 0xFF, 0xFF, 0xFF, 0, 0, 1, 0];
        assert_eq!(target.process_command(&cdb), Err(ScsiError::LbaOutOfRange));
    }

    #[test]
    fn read10_streams_requested_sectors() {
        let mut target = target();
        let cdb = [0x28, 0, 0, 0, 0x08, 0x00, 0, 0, 0x00, 0x02];
        target.process_command(&cdb).unwrap();
        let mut out = [0u8; SECTOR_SIZE];
        assert_eq!(target.transmit_data(&mut out), SECTOR_SIZE);
        assert!(target.has_pending_data());
        assert_eq!(target.transmit_data(&mut out), SECTOR_SIZE);
        assert!(!target.has_pending_data());
    }
}
