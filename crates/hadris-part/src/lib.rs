#![no_std]

//! A crate for working with partitions.
//! Currently this supports MBR and GPT partitioned disks.

extern crate alloc;

use hadris_common::{
    alg::hash::crc::Crc32HasherIsoHdlc,
    part::{
        gpt::{Guid, GptPartitionEntry, GptPartitionTableHeader},
        mbr::{Chs, MbrPartition, MbrPartitionTable, MbrPartitionType},
    },
};

pub const SECTOR_SIZE: usize = 512;

/// A platform-indepedent, partition
pub struct Partition {
    start: u64,
    size: u64,
}

impl Partition {
    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

pub trait Disk {
    fn get_partitions(&self) -> impl Iterator<Item = Partition>;
}

/// Which partitioning scheme a synthesised disk image should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PartitionScheme {
    MbrOnly,
    #[default]
    GptOnly,
}

/// Number of sectors reserved at the tail of the disk for the backup GPT
/// (32-sector partition array + 1-sector header).
pub const GPT_BACKUP_SECTORS: u32 = 33;

/// Disk GUID used for every synthesised disk. Fixed, not randomized, so that
/// repeated renders of the same configuration produce byte-identical images.
pub const DISK_GUID: Guid = Guid::from_bytes([
    0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE, 0xF0, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88,
]);

/// Unique partition GUID for the single EFI System Partition this crate ever emits.
pub const ESP_PARTITION_GUID: Guid = Guid::from_bytes([
    0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF, 0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99,
]);

/// Drives the disk-level (pre-filesystem) portion of a synthesised disk image: the MBR or
/// protective MBR, and for [`PartitionScheme::GptOnly`] the primary and backup GPT structures.
///
/// The FAT32 partition content itself (from `partition_start_lba` onward, minus the GPT backup
/// region at the tail) is out of scope here; callers own that region.
#[derive(Debug, Clone, Copy)]
pub struct DiskLayout {
    pub scheme: PartitionScheme,
    pub total_sectors: u32,
    pub partition_start_lba: u32,
}

impl DiskLayout {
    pub fn new(scheme: PartitionScheme, total_sectors: u32, partition_start_lba: u32) -> Self {
        Self {
            scheme,
            total_sectors,
            partition_start_lba,
        }
    }

    /// First LBA past the end of the usable FAT32 partition region.
    pub fn partition_end_lba(&self) -> u32 {
        match self.scheme {
            PartitionScheme::MbrOnly => self.total_sectors,
            PartitionScheme::GptOnly => self.total_sectors - GPT_BACKUP_SECTORS,
        }
    }

    pub fn partition_sectors(&self) -> u32 {
        self.partition_end_lba() - self.partition_start_lba
    }

    fn backup_array_start(&self) -> u32 {
        self.total_sectors - GPT_BACKUP_SECTORS
    }

    fn backup_header_lba(&self) -> u32 {
        self.total_sectors - 1
    }

    /// Attempts to synthesise `lba`. Returns `None` if `lba` belongs to the FAT32 partition
    /// region, which the caller (the filesystem generator) is responsible for.
    pub fn read_sector(&self, lba: u32) -> Option<[u8; SECTOR_SIZE]> {
        let mut buf = [0u8; SECTOR_SIZE];
        match self.scheme {
            PartitionScheme::MbrOnly => {
                if lba == 0 {
                    self.write_mbr(&mut buf, false);
                    Some(buf)
                } else if lba < self.partition_start_lba {
                    Some(buf)
                } else {
                    None
                }
            }
            PartitionScheme::GptOnly => {
                if lba == 0 {
                    self.write_mbr(&mut buf, true);
                    Some(buf)
                } else if lba == 1 {
                    self.write_gpt_header(&mut buf, false);
                    Some(buf)
                } else if lba == 2 {
                    self.write_gpt_entry_array_first_sector(&mut buf);
                    Some(buf)
                } else if lba < self.partition_start_lba {
                    Some(buf)
                } else if lba >= self.backup_array_start() && lba < self.backup_header_lba() {
                    if lba == self.backup_array_start() {
                        self.write_gpt_entry_array_first_sector(&mut buf);
                    }
                    Some(buf)
                } else if lba == self.backup_header_lba() {
                    self.write_gpt_header(&mut buf, true);
                    Some(buf)
                } else {
                    None
                }
            }
        }
    }

    fn write_mbr(&self, buf: &mut [u8; SECTOR_SIZE], protective: bool) {
        let entry = if protective {
            MbrPartition::protective(self.total_sectors)
        } else {
            MbrPartition::new(
                MbrPartitionType::Fat32Lba.to_u8(),
                self.partition_start_lba,
                self.partition_sectors(),
            )
        };
        let mut table = MbrPartitionTable::default();
        table.partitions[0] = entry;
        let table_bytes: [u8; 64] = bytemuck::cast(table);
        buf[446..510].copy_from_slice(&table_bytes);
        buf[510] = 0x55;
        buf[511] = 0xAA;
    }

    fn esp_entry(&self) -> GptPartitionEntry {
        GptPartitionEntry::new(
            hadris_common::part::gpt::Guid::EFI_SYSTEM_PART,
            ESP_PARTITION_GUID,
            self.partition_start_lba as u64,
            (self.partition_start_lba + self.partition_sectors()) as u64 - 1,
            "EFI System",
        )
    }

    fn entry_array_bytes(&self) -> alloc::vec::Vec<u8> {
        let mut entries = alloc::vec![GptPartitionEntry::default(); 128];
        entries[0] = self.esp_entry();
        let mut bytes = alloc::vec![0u8; 128 * 128];
        for (i, entry) in entries.iter().enumerate() {
            let entry_bytes: [u8; 128] = bytemuck::cast(*entry);
            bytes[i * 128..(i + 1) * 128].copy_from_slice(&entry_bytes);
        }
        bytes
    }

    fn write_gpt_entry_array_first_sector(&self, buf: &mut [u8; SECTOR_SIZE]) {
        let bytes = self.entry_array_bytes();
        buf.copy_from_slice(&bytes[..SECTOR_SIZE]);
    }

    fn write_gpt_header(&self, buf: &mut [u8; SECTOR_SIZE], backup: bool) {
        let entry_array = self.entry_array_bytes();
        let entries_crc = Crc32HasherIsoHdlc::checksum(&entry_array);
        let mut primary = GptPartitionTableHeader::new_primary(
            DISK_GUID,
            self.backup_header_lba(),
            self.partition_start_lba,
            self.backup_array_start() - 1,
            2,
            128,
        );
        let mut header = if backup {
            GptPartitionTableHeader::new_backup(
                &primary,
                self.backup_header_lba(),
                self.backup_array_start(),
            )
        } else {
            primary
        };
        header.partition_entry_array_crc32 =
            hadris_common::types::number::U32::new(entries_crc);
        header.crc32 = hadris_common::types::number::U32::new(0);

        let header_size = header.header_size.get() as usize;
        let header_bytes: [u8; core::mem::size_of::<GptPartitionTableHeader>()] =
            bytemuck::cast(header);
        buf[..header_bytes.len()].copy_from_slice(&header_bytes);
        // `header_size` (92) equals the struct's own size, so this covers exactly the
        // populated header fields, per the UEFI spec's CRC32 computation rule.
        let crc = Crc32HasherIsoHdlc::checksum(&buf[..header_size.min(SECTOR_SIZE)]);
        buf[16..20].copy_from_slice(&crc.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mbr_signature_present() {
        let layout = DiskLayout::new(PartitionScheme::MbrOnly, 262144, 2048);
        let sector = layout.read_sector(0).unwrap();
        assert_eq!(sector[510], 0x55);
        assert_eq!(sector[511], 0xAA);
        assert_eq!(sector[450], MbrPartitionType::Fat32Lba.to_u8());
        assert_eq!(sector[446], 0x80);
    }

    #[test]
    fn protective_mbr_type_is_ee() {
        let layout = DiskLayout::new(PartitionScheme::GptOnly, 262144, 2048);
        let sector = layout.read_sector(0).unwrap();
        assert_eq!(sector[450], 0xEE);
        assert_eq!(&sector[454..462], &[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF][..8]);
    }

    #[test]
    fn gpt_header_signature() {
        let layout = DiskLayout::new(PartitionScheme::GptOnly, 262144, 2048);
        let sector = layout.read_sector(1).unwrap();
        assert_eq!(&sector[0..8], b"EFI PART");
    }

    #[test]
    fn partition_region_is_none_for_caller() {
        let layout = DiskLayout::new(PartitionScheme::GptOnly, 262144, 2048);
        assert!(layout.read_sector(2048).is_none());
        assert!(layout.read_sector(262144 - 34).is_none());
    }

    #[test]
    fn gpt_header_lba_fields_are_64_bit_at_spec_offsets() {
        let layout = DiskLayout::new(PartitionScheme::GptOnly, 262144, 2048);
        let sector = layout.read_sector(1).unwrap();
        // current_lba (u64) at bytes 24..32: this is header LBA 1.
        assert_eq!(&sector[24..32], &[0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
        // backup_lba (u64) at bytes 32..40: last LBA of a 262144-sector disk.
        assert_eq!(&sector[32..40], &[0xFF, 0xFF, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn backup_header_mirrors_primary() {
        let layout = DiskLayout::new(PartitionScheme::GptOnly, 262144, 2048);
        let backup = layout.read_sector(262143).unwrap();
        assert_eq!(&backup[0..8], b"EFI PART");
    }
}
