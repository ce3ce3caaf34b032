//! A virtual FAT32 USB mass storage device presenting a single, always-present iPXE boot
//! script (plus an optional loader binary and extra files) to any host that plugs it in.
//!
//! Ties together `hadris-fat`'s virtual FAT32 generator, `hadris-scsi`'s SCSI Block Commands
//! target, and `hadris-usb-msc`'s Bulk-Only Transport engine, per the original firmware's
//! boot2flipper application.

pub mod config;
pub mod disk;
pub mod script;

pub use config::{ConfigError, DeviceConfig, PartitionSchemeConfig, StaticIpConfig};
pub use disk::{build_virtual_fs, HostFileReader, DEFAULT_TOTAL_SECTORS};
pub use script::{render_boot_script, validate_boot_script, ScriptError};

use hadris_scsi::ScsiTarget;
use hadris_usb_msc::BotSession;

/// Builds a complete, ready-to-drive BOT session for `config`: the virtual filesystem, the SCSI
/// target bound to it with a host-file external reader, and the BOT session wrapping that
/// target. This is the full L1-through-L4 pipeline in one call.
pub fn build_session(config: &DeviceConfig) -> Result<BotSession, hadris_fat::virtual_fs::VfatError> {
    let vfs = build_virtual_fs(config, DEFAULT_TOTAL_SECTORS)?;
    let scsi = ScsiTarget::new(vfs, DEFAULT_TOTAL_SECTORS).with_external_reader(HostFileReader);
    Ok(BotSession::new(scsi))
}

#[cfg(test)]
mod e2e_tests {
    use super::*;
    use hadris_usb_msc::{BotState, LoopbackTransport, CBW_FLAG_IN, CBW_SIGNATURE, CSW_STATUS_FAILED, CSW_STATUS_PASSED};

    fn cbw_bytes(tag: u32, data_length: u32, flags: u8, cb: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(31);
        bytes.extend_from_slice(&CBW_SIGNATURE.to_le_bytes());
        bytes.extend_from_slice(&tag.to_le_bytes());
        bytes.extend_from_slice(&data_length.to_le_bytes());
        bytes.push(flags);
        bytes.push(0);
        bytes.push(cb.len() as u8);
        let mut cb_fixed = [0u8; 16];
        cb_fixed[..cb.len()].copy_from_slice(cb);
        bytes.extend_from_slice(&cb_fixed);
        bytes
    }

    /// E1/E2/E5/E6-style end-to-end drive: TEST UNIT READY, INQUIRY, READ CAPACITY, READ(10) of
    /// the boot sector, and WRITE(10) refusal, all through the full BOT -> SCSI -> VirtualFs
    /// stack over a loopback transport.
    #[test]
    fn full_bot_session_drives_every_scenario_opcode() {
        let config = DeviceConfig::default();
        let mut session = build_session(&config).unwrap();
        let mut transport = LoopbackTransport::new();

        transport.push_out(&cbw_bytes(1, 0, 0, &[0x00]));
        assert_eq!(session.process_command(&mut transport).unwrap(), CSW_STATUS_PASSED);
        assert_eq!(session.state(), BotState::ReadCbw);

        transport.push_out(&cbw_bytes(2, 36, CBW_FLAG_IN, &[0x12, 0, 0, 0, 36, 0]));
        assert_eq!(session.process_command(&mut transport).unwrap(), CSW_STATUS_PASSED);
        let inquiry_reply = &transport.in_history[transport.in_history.len() - 13 - 36..transport.in_history.len() - 13];
        assert_eq!(&inquiry_reply[8..16], b"FLIPPER ");

        transport.push_out(&cbw_bytes(3, 8, CBW_FLAG_IN, &[0x25, 0, 0, 0, 0, 0, 0, 0, 0, 0]));
        assert_eq!(session.process_command(&mut transport).unwrap(), CSW_STATUS_PASSED);

        transport.push_out(&cbw_bytes(4, 512, CBW_FLAG_IN, &[0x28, 0, 0, 0, 0, 0, 0, 0, 1, 0]));
        assert_eq!(session.process_command(&mut transport).unwrap(), CSW_STATUS_PASSED);
        let boot_sector = &transport.in_history[transport.in_history.len() - 13 - 512..transport.in_history.len() - 13];
        assert_eq!(&boot_sector[3..11], b"BOOT2FLP");

        let write_cdb = [0x2A, 0, 0, 0, 0, 0, 0, 0, 1, 0];
        transport.push_out(&cbw_bytes(5, 512, 0, &write_cdb));
        assert_eq!(session.process_command(&mut transport).unwrap(), CSW_STATUS_FAILED);

        transport.push_out(&cbw_bytes(6, 18, CBW_FLAG_IN, &[0x03, 0, 0, 0, 18, 0]));
        assert_eq!(session.process_command(&mut transport).unwrap(), CSW_STATUS_PASSED);
        let sense = &transport.in_history[transport.in_history.len() - 13 - 18..transport.in_history.len() - 13];
        assert_eq!(sense[2], 0x07);
        assert_eq!(sense[12], 0x27);
    }

    fn read10(session: &mut BotSession, transport: &mut LoopbackTransport, tag: u32, lba: u32) -> Vec<u8> {
        let mut cdb = [0u8; 10];
        cdb[0] = 0x28;
        cdb[2..6].copy_from_slice(&lba.to_be_bytes());
        cdb[9] = 1;
        transport.push_out(&cbw_bytes(tag, 512, CBW_FLAG_IN, &cdb));
        assert_eq!(session.process_command(transport).unwrap(), CSW_STATUS_PASSED);
        let len = transport.in_history.len();
        transport.in_history[len - 13 - 512..len - 13].to_vec()
    }

    #[test]
    fn current_file_is_observable_after_reading_boot_script() {
        let config = DeviceConfig::default();
        let mut session = build_session(&config).unwrap();
        assert_eq!(session.current_file(), None);

        let mut transport = LoopbackTransport::new();
        let boot_sector = read10(&mut session, &mut transport, 7, 2048);
        let reserved = u16::from_le_bytes(boot_sector[14..16].try_into().unwrap()) as u32;
        let fat_count = boot_sector[16] as u32;
        let sectors_per_fat = u32::from_le_bytes(boot_sector[36..40].try_into().unwrap());
        let data_start_lba = 2048 + reserved + fat_count * sectors_per_fat;

        read10(&mut session, &mut transport, 8, data_start_lba);
        assert_eq!(session.current_file().as_deref(), Some("AUTOEXEC.IPXE"));
    }
}
