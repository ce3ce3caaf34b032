//! USB Mass Storage Bulk-Only Transport (BOT) engine.
//!
//! Drives a [`hadris_scsi::ScsiTarget`] through the CBW -> data phase -> CSW command cycle
//! over two bulk endpoints. The platform USB stack is abstracted behind [`EndpointTransport`];
//! this crate ships no hardware backend, only the state machine and a loopback test double.
//!
//! Grounded in the Bulk-Only Transport framing of the original firmware's `usb_msc.h`/`usb_msc.c`.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

use alloc::string::String;
use alloc::sync::Arc;

use hadris_scsi::ScsiTarget;

pub const EP_IN: u8 = 0x82;
pub const EP_OUT: u8 = 0x02;
pub const EP_SIZE: usize = 64;

pub const CBW_SIGNATURE: u32 = 0x4342_5355; // "USBC"
pub const CSW_SIGNATURE: u32 = 0x5342_5355; // "USBS"

pub const CBW_FLAG_IN: u8 = 0x80;

pub const CSW_STATUS_PASSED: u8 = 0x00;
pub const CSW_STATUS_FAILED: u8 = 0x01;
pub const CSW_STATUS_PHASE_ERROR: u8 = 0x02;

const CBW_LEN: usize = 31;
const CSW_LEN: usize = 13;

/// Command Block Wrapper, exactly as it appears on the wire (31 bytes, little-endian).
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, bytemuck::Zeroable, bytemuck::NoUninit, bytemuck::AnyBitPattern)]
pub struct Cbw {
    pub signature: u32,
    pub tag: u32,
    pub data_length: u32,
    pub flags: u8,
    pub lun: u8,
    pub cb_length: u8,
    pub cb: [u8; 16],
}

impl Cbw {
    fn parse(bytes: &[u8; CBW_LEN]) -> Self {
        *bytemuck::from_bytes(bytes)
    }

    fn is_valid(&self) -> bool {
        self.signature == CBW_SIGNATURE
            && self.cb_length >= 1
            && self.cb_length <= 16
    }

    fn is_data_in(&self) -> bool {
        self.flags & CBW_FLAG_IN != 0
    }
}

/// Command Status Wrapper, exactly as it appears on the wire (13 bytes, little-endian).
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, bytemuck::Zeroable, bytemuck::NoUninit, bytemuck::AnyBitPattern)]
pub struct Csw {
    pub signature: u32,
    pub tag: u32,
    pub data_residue: u32,
    pub status: u8,
}

impl Csw {
    fn new(tag: u32, data_residue: u32, status: u8) -> Self {
        Self {
            signature: CSW_SIGNATURE,
            tag,
            data_residue,
            status,
        }
    }

    fn to_bytes(self) -> [u8; CSW_LEN] {
        let mut out = [0u8; CSW_LEN];
        out.copy_from_slice(bytemuck::bytes_of(&self));
        out
    }
}

/// BOT session state, mirroring the four-state machine a real worker loop drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotState {
    ReadCbw,
    DataIn,
    DataOut,
    WriteCsw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BotError {
    #[error("malformed command block wrapper")]
    MalformedCbw,
    #[error("endpoint reported busy")]
    EndpointBusy,
}

/// The platform USB device boundary: two bulk endpoint primitives and the two class-specific
/// control requests this device type needs (`GET_MAX_LUN`, `BOT_RESET`).
///
/// A real platform integration implements this against its USB stack; tests and the disk-image
/// CLI use an in-memory loopback implementation instead.
pub trait EndpointTransport {
    /// Reads exactly `buf.len()` bytes from the OUT endpoint, or returns `false` if the host
    /// has not yet supplied them (the caller should retry on the next event).
    fn read_out(&mut self, buf: &mut [u8]) -> bool;
    /// Writes `data` to the IN endpoint, or returns `false` if the endpoint is still busy with
    /// a previous packet (the caller retains the data and retries).
    fn write_in(&mut self, data: &[u8]) -> bool;
    /// Halts both bulk endpoints until the host issues a `BOT_RESET` class request.
    fn stall(&mut self);
}

/// Drives one [`ScsiTarget`] through repeated CBW/data/CSW cycles.
///
/// The platform's endpoint interrupt callbacks are expected to do nothing but wake a worker
/// loop; this type models that worker's single-threaded processing of one command at a time.
pub struct BotSession {
    scsi: ScsiTarget,
    state: BotState,
    current_file: Arc<spin::Mutex<Option<String>>>,
}

impl BotSession {
    pub fn new(mut scsi: ScsiTarget) -> Self {
        let current_file = Arc::new(spin::Mutex::new(None));
        let observed = current_file.clone();
        scsi.set_read_callback(move |name| {
            *observed.lock() = Some(String::from(name));
        });
        Self {
            scsi,
            state: BotState::ReadCbw,
            current_file,
        }
    }

    pub fn state(&self) -> BotState {
        self.state
    }

    /// The display name of the virtual file whose sectors were most recently streamed, if any.
    pub fn current_file(&self) -> Option<String> {
        self.current_file.lock().clone()
    }

    /// Resets to [`BotState::ReadCbw`] without disturbing the virtual filesystem, mirroring a
    /// host-issued `BOT_RESET` class request.
    pub fn reset(&mut self) {
        self.state = BotState::ReadCbw;
    }

    /// `GET_MAX_LUN` class request: this device exposes exactly one logical unit.
    pub fn max_lun(&self) -> u8 {
        0
    }

    /// Processes exactly one full command cycle: reads a CBW, runs its data phase to
    /// completion, and writes the CSW. Returns the status byte that was sent.
    pub fn process_command(
        &mut self,
        transport: &mut dyn EndpointTransport,
    ) -> Result<u8, BotError> {
        self.state = BotState::ReadCbw;
        let mut raw = [0u8; CBW_LEN];
        if !transport.read_out(&mut raw) {
            return Err(BotError::EndpointBusy);
        }
        let cbw = Cbw::parse(&raw);
        if !cbw.is_valid() {
            transport.stall();
            tracing::warn!("malformed CBW, stalling bulk endpoints");
            return Err(BotError::MalformedCbw);
        }

        let tag = cbw.tag;
        let data_length = cbw.data_length;
        let cb_len = cbw.cb_length as usize;
        let result = self.scsi.process_command(&cbw.cb[..cb_len]);

        let (status, sent) = match result {
            Err(_) => (CSW_STATUS_FAILED, 0u32),
            Ok(()) if data_length == 0 => {
                self.state = BotState::WriteCsw;
                (CSW_STATUS_PASSED, 0)
            }
            Ok(()) => {
                let dir = if cbw.is_data_in() {
                    BotState::DataIn
                } else {
                    BotState::DataOut
                };
                self.state = dir;
                let sent = self.pump_data_in(transport, data_length as usize);
                (CSW_STATUS_PASSED, sent as u32)
            }
        };

        self.state = BotState::WriteCsw;
        let residue = data_length.saturating_sub(sent);
        let csw = Csw::new(tag, residue, status);
        if !transport.write_in(&csw.to_bytes()) {
            return Err(BotError::EndpointBusy);
        }
        self.state = BotState::ReadCbw;
        Ok(status)
    }

    fn pump_data_in(&mut self, transport: &mut dyn EndpointTransport, expected: usize) -> usize {
        let mut sent = 0usize;
        let mut packet = [0u8; EP_SIZE];
        while sent < expected {
            let want = core::cmp::min(EP_SIZE, expected - sent);
            let n = self.scsi.transmit_data(&mut packet[..want]);
            if n == 0 {
                break;
            }
            if !transport.write_in(&packet[..n]) {
                break;
            }
            sent += n;
        }
        sent
    }
}

/// An in-memory loopback [`EndpointTransport`] used by tests and the disk-image CLI: the host
/// side of the bus is simulated by queues the caller pushes to / drains directly.
#[derive(Default)]
pub struct LoopbackTransport {
    pub out_queue: alloc::collections::VecDeque<u8>,
    pub in_history: alloc::vec::Vec<u8>,
    pub stalled: bool,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_out(&mut self, bytes: &[u8]) {
        self.out_queue.extend(bytes.iter().copied());
    }
}

impl EndpointTransport for LoopbackTransport {
    fn read_out(&mut self, buf: &mut [u8]) -> bool {
        if self.out_queue.len() < buf.len() {
            return false;
        }
        for slot in buf.iter_mut() {
            *slot = self.out_queue.pop_front().unwrap();
        }
        true
    }

    fn write_in(&mut self, data: &[u8]) -> bool {
        self.in_history.extend_from_slice(data);
        true
    }

    fn stall(&mut self) {
        self.stalled = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::mem::{align_of, offset_of, size_of};
    use hadris_fat::virtual_fs::VirtualFs;
    use static_assertions::const_assert_eq;

    const_assert_eq!(size_of::<Cbw>(), 31);
    const_assert_eq!(align_of::<Cbw>(), 1);
    const_assert_eq!(offset_of!(Cbw, signature), 0);
    const_assert_eq!(offset_of!(Cbw, tag), 4);
    const_assert_eq!(offset_of!(Cbw, data_length), 8);
    const_assert_eq!(offset_of!(Cbw, flags), 12);
    const_assert_eq!(offset_of!(Cbw, lun), 13);
    const_assert_eq!(offset_of!(Cbw, cb_length), 14);
    const_assert_eq!(offset_of!(Cbw, cb), 15);

    const_assert_eq!(size_of::<Csw>(), 13);
    const_assert_eq!(offset_of!(Csw, signature), 0);
    const_assert_eq!(offset_of!(Csw, tag), 4);
    const_assert_eq!(offset_of!(Csw, data_residue), 8);
    const_assert_eq!(offset_of!(Csw, status), 12);

    fn session() -> BotSession {
        let vfs = VirtualFs::new(262144);
        BotSession::new(ScsiTarget::new(vfs, 262144))
    }

    fn cbw_bytes(tag: u32, data_length: u32, flags: u8, cb: &[u8]) -> alloc::vec::Vec<u8> {
        let mut bytes = alloc::vec::Vec::with_capacity(CBW_LEN);
        bytes.extend_from_slice(&CBW_SIGNATURE.to_le_bytes());
        bytes.extend_from_slice(&tag.to_le_bytes());
        bytes.extend_from_slice(&data_length.to_le_bytes());
        bytes.push(flags);
        bytes.push(0); // lun
        bytes.push(cb.len() as u8);
        let mut cb_fixed = [0u8; 16];
        cb_fixed[..cb.len()].copy_from_slice(cb);
        bytes.extend_from_slice(&cb_fixed);
        bytes
    }

    #[test]
    fn test_unit_ready_round_trip() {
        let mut session = session();
        let mut transport = LoopbackTransport::new();
        transport.push_out(&cbw_bytes(7, 0, 0, &[0x00]));
        let status = session.process_command(&mut transport).unwrap();
        assert_eq!(status, CSW_STATUS_PASSED);
        assert_eq!(&transport.in_history[0..4], &CSW_SIGNATURE.to_le_bytes());
        assert_eq!(&transport.in_history[4..8], &7u32.to_le_bytes());
        assert_eq!(transport.in_history[12], CSW_STATUS_PASSED);
    }

    #[test]
    fn read_capacity_transfers_data_then_csw() {
        let mut session = session();
        let mut transport = LoopbackTransport::new();
        let read_capacity_cdb = [0x25, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        transport.push_out(&cbw_bytes(1, 8, CBW_FLAG_IN, &read_capacity_cdb));
        let status = session.process_command(&mut transport).unwrap();
        assert_eq!(status, CSW_STATUS_PASSED);
        assert_eq!(transport.in_history.len(), 8 + CSW_LEN);
        let residue = u32::from_le_bytes(transport.in_history[8 + 8..8 + 12].try_into().unwrap());
        assert_eq!(residue, 0);
    }

    #[test]
    fn write_refused_reports_failed_status_with_full_residue() {
        let mut session = session();
        let mut transport = LoopbackTransport::new();
        let write_cdb = [0x2A, 0, 0, 0, 0, 1, 0, 0, 1, 0];
        transport.push_out(&cbw_bytes(2, 512, 0, &write_cdb));
        let status = session.process_command(&mut transport).unwrap();
        assert_eq!(status, CSW_STATUS_FAILED);
        let residue = u32::from_le_bytes(transport.in_history[8..12].try_into().unwrap());
        assert_eq!(residue, 512);
    }

    #[test]
    fn malformed_cbw_stalls_endpoints() {
        let mut session = session();
        let mut transport = LoopbackTransport::new();
        transport.push_out(&[0u8; CBW_LEN]);
        let err = session.process_command(&mut transport);
        assert_eq!(err, Err(BotError::MalformedCbw));
        assert!(transport.stalled);
    }
}
