//! A declarative, stateless-per-sector FAT32 generator.
//!
//! Instead of owning a backing byte buffer, [`VirtualFs`] holds a small table of file/directory
//! descriptions and computes the bytes of any requested sector on demand. This is the engine
//! behind a read-only USB mass storage device whose "disk" never actually exists on media.

extern crate alloc;

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;

use hadris_part::{DiskLayout, PartitionScheme as PartScheme, SECTOR_SIZE};

use crate::structures::boot_sector::{BootSector, MediaType};
use crate::structures::directory::{FileAttributes, FileEntry};
use crate::structures::fs_info::FsInfo;

/// Maximum number of virtual file/directory entries a [`VirtualFs`] can hold.
pub const MAX_ENTRIES: usize = 16;

/// Root directory's cluster number; fixed by the FAT32 spec.
pub const ROOT_CLUSTER: u32 = 2;
/// First cluster available for allocation; 0, 1 and 2 are reserved.
pub const FIRST_FREE_CLUSTER: u32 = 3;

const BYTES_PER_SECTOR: u32 = SECTOR_SIZE as u32;
const SECTORS_PER_CLUSTER: u32 = 1;
const RESERVED_SECTORS: u32 = 32;
const FAT_COUNT: u32 = 2;
const ENTRIES_PER_SECTOR: usize = SECTOR_SIZE / 32;

/// Fixed creation/modification timestamp baked into every synthesised directory entry
/// (2024-01-01 12:00:00), matching the packed FAT16 time/date encoding.
const FIXED_TIME: u16 = 0x6000;
const FIXED_DATE: u16 = 0x5821;

/// Volume serial number stamped into the boot sector (`0x78563412` little-endian).
const VOLUME_ID: u32 = 0x78563412;

/// Where a virtual file's bytes come from.
#[derive(Clone)]
pub enum FileSource {
    /// Bytes owned directly by the filesystem descriptor.
    Memory(Vec<u8>),
    /// Bytes served on demand through [`ExternalFileReader`], keyed by this path.
    ExternalFile { path: String, size: u64 },
}

impl FileSource {
    fn size(&self) -> u64 {
        match self {
            FileSource::Memory(bytes) => bytes.len() as u64,
            FileSource::ExternalFile { size, .. } => *size,
        }
    }
}

/// Sentinel parent index meaning "this entry's parent is the root directory".
pub const ROOT_PARENT: usize = usize::MAX;

#[derive(Clone)]
pub struct VirtualFileEntry {
    /// 8.3 short name, uppercase, space-padded to exactly 11 bytes.
    pub short_name: [u8; 11],
    /// Optional long name, shown to hosts that understand VFAT long-name entries.
    pub long_name: Option<String>,
    pub start_cluster: u32,
    pub cluster_count: u32,
    pub source: Option<FileSource>,
    pub is_directory: bool,
    /// Index into the owning [`VirtualFs`]'s entry table, or [`ROOT_PARENT`].
    pub parent_index: usize,
}

impl VirtualFileEntry {
    fn size(&self) -> u64 {
        self.source.as_ref().map(|s| s.size()).unwrap_or(0)
    }
}

/// Reads a byte range from a host-backed file named in a [`FileSource::ExternalFile`].
///
/// Implementations are expected to be fast and synchronous; the worker loop that eventually
/// drives this crate's SCSI/USB layers reads one 512-byte sector per call.
pub trait ExternalFileReader {
    /// Reads up to `buf.len()` bytes starting at `offset` from `path`, returning the number of
    /// bytes actually copied into `buf`. Returning fewer bytes than requested (including 0) is
    /// treated as "rest of sector is zero", never as an error.
    fn read(&mut self, path: &str, offset: u64, buf: &mut [u8]) -> usize;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VfatError {
    #[error("virtual filesystem entry table is full")]
    TableFull,
}

/// A declarative FAT32 filesystem description that synthesises sector bytes on demand.
///
/// Entries are added once, before the filesystem is put into service; [`VirtualFs::read_sector`]
/// never mutates the entry table.
pub struct VirtualFs {
    scheme: PartScheme,
    total_sectors: u32,
    entries: Vec<VirtualFileEntry>,
    next_free_cluster: u32,
    read_callback: Option<Box<dyn FnMut(&str)>>,
    notified: Vec<bool>,
}

impl VirtualFs {
    /// Creates an empty filesystem over a disk of `total_sectors` 512-byte sectors
    /// (128 MiB at the default 262144-sector geometry used by this crate's disk images).
    pub fn new(total_sectors: u32) -> Self {
        Self {
            scheme: PartScheme::GptOnly,
            total_sectors,
            entries: Vec::new(),
            next_free_cluster: FIRST_FREE_CLUSTER,
            read_callback: None,
            notified: Vec::new(),
        }
    }

    /// Must be called before the first [`VirtualFs::read_sector`].
    pub fn set_scheme(&mut self, scheme: PartScheme) {
        self.scheme = scheme;
    }

    pub fn set_read_callback(&mut self, callback: impl FnMut(&str) + 'static) {
        self.read_callback = Some(Box::new(callback));
    }

    fn layout(&self) -> DiskLayout {
        DiskLayout::new(self.scheme, self.total_sectors, self.partition_start_lba())
    }

    fn partition_start_lba(&self) -> u32 {
        2048
    }

    fn clusters_for_size(size: u64) -> u32 {
        let cluster_bytes = (SECTORS_PER_CLUSTER * BYTES_PER_SECTOR) as u64;
        core::cmp::max(1, size.div_ceil(cluster_bytes)) as u32
    }

    fn allocate(&mut self, clusters: u32) -> u32 {
        let start = self.next_free_cluster;
        self.next_free_cluster += clusters;
        start
    }

    fn push_entry(&mut self, entry: VirtualFileEntry) -> Result<usize, VfatError> {
        if self.entries.len() >= MAX_ENTRIES {
            return Err(VfatError::TableFull);
        }
        self.entries.push(entry);
        self.notified.push(false);
        Ok(self.entries.len() - 1)
    }

    /// Adds a file whose bytes are already in memory. `name` is used verbatim as the long name
    /// if it doesn't survive the 8.3 short-name transform unchanged (see [`long_name_for`]).
    pub fn add_memory_file(&mut self, name: &str, bytes: Vec<u8>) -> Result<usize, VfatError> {
        let short_name = short_name_bytes(name);
        let long_name = long_name_for(name, &short_name);
        self.add_memory_file_under(ROOT_PARENT, name, long_name, bytes)
    }

    /// Adds a file backed by an external, byte-range-readable path. `name` is used verbatim as
    /// the long name if it doesn't survive the 8.3 short-name transform unchanged.
    pub fn add_external_file(
        &mut self,
        name: &str,
        path: impl Into<String>,
        size: u64,
    ) -> Result<usize, VfatError> {
        let short_name = short_name_bytes(name);
        let long_name = long_name_for(name, &short_name);
        self.add_external_file_under(ROOT_PARENT, name, long_name, path, size)
    }

    /// Adds a directory at the root.
    pub fn add_directory(&mut self, short_name: &str) -> Result<usize, VfatError> {
        self.add_directory_under(ROOT_PARENT, short_name)
    }

    fn add_directory_under(
        &mut self,
        parent_index: usize,
        short_name: &str,
    ) -> Result<usize, VfatError> {
        let start_cluster = self.allocate(1);
        self.push_entry(VirtualFileEntry {
            short_name: short_name_bytes(short_name),
            long_name: None,
            start_cluster,
            cluster_count: 1,
            source: None,
            is_directory: true,
            parent_index,
        })
    }

    fn add_memory_file_under(
        &mut self,
        parent_index: usize,
        short_name: &str,
        long_name: Option<String>,
        bytes: Vec<u8>,
    ) -> Result<usize, VfatError> {
        let clusters = Self::clusters_for_size(bytes.len() as u64);
        let start_cluster = self.allocate(clusters);
        self.push_entry(VirtualFileEntry {
            short_name: short_name_bytes(short_name),
            long_name,
            start_cluster,
            cluster_count: clusters,
            source: Some(FileSource::Memory(bytes)),
            is_directory: false,
            parent_index,
        })
    }

    fn add_external_file_under(
        &mut self,
        parent_index: usize,
        short_name: &str,
        long_name: Option<String>,
        path: impl Into<String>,
        size: u64,
    ) -> Result<usize, VfatError> {
        let clusters = Self::clusters_for_size(size);
        let start_cluster = self.allocate(clusters);
        self.push_entry(VirtualFileEntry {
            short_name: short_name_bytes(short_name),
            long_name,
            start_cluster,
            cluster_count: clusters,
            source: Some(FileSource::ExternalFile {
                path: path.into(),
                size,
            }),
            is_directory: false,
            parent_index,
        })
    }

    /// Resolves (creating as needed) every intermediate directory along `parent_path`
    /// (slash-separated), then adds an external file under the final directory.
    pub fn add_file_under_path(
        &mut self,
        parent_path: &str,
        name: &str,
        path: impl Into<String>,
        size: u64,
    ) -> Result<usize, VfatError> {
        let parent = self.resolve_or_create_path(parent_path)?;
        let short_name = short_name_bytes(name);
        let long_name = long_name_for(name, &short_name);
        self.add_external_file_under(parent, name, long_name, path, size)
    }

    fn resolve_or_create_path(&mut self, path: &str) -> Result<usize, VfatError> {
        let mut parent = ROOT_PARENT;
        for component in path.split('/').filter(|s| !s.is_empty()) {
            let wanted = short_name_bytes(component);
            let existing = self.entries.iter().enumerate().find(|(_, e)| {
                e.is_directory && e.parent_index == parent && e.short_name == wanted
            });
            parent = match existing {
                Some((idx, _)) => idx,
                None => self.add_directory_under(parent, component)?,
            };
        }
        Ok(parent)
    }

    fn total_clusters(&self) -> u32 {
        self.layout().partition_sectors() / SECTORS_PER_CLUSTER
    }

    fn sectors_per_fat(&self) -> u32 {
        let entries = self.total_clusters() + 2;
        (entries * 4).div_ceil(BYTES_PER_SECTOR)
    }

    fn data_start_sector(&self) -> u32 {
        RESERVED_SECTORS + FAT_COUNT * self.sectors_per_fat()
    }

    /// Fills `buf` with the content of sector `lba`, relative to the start of the whole disk.
    /// Always succeeds; an LBA with nothing assigned to it reads back as zeroes.
    pub fn read_sector(&mut self, lba: u32, buf: &mut [u8; SECTOR_SIZE]) {
        buf.fill(0);

        let partition_start = self.partition_start_lba();
        if lba < partition_start || lba >= self.layout().partition_end_lba() {
            if let Some(sector) = self.layout().read_sector(lba) {
                buf.copy_from_slice(&sector);
            }
            return;
        }

        let rel = lba - partition_start;
        let fat_start = RESERVED_SECTORS;
        let fat_size = self.sectors_per_fat();
        let data_start = self.data_start_sector();

        if rel == 0 {
            self.write_boot_sector(buf, false);
        } else if rel == 1 {
            self.write_fs_info(buf);
        } else if rel == 6 {
            self.write_boot_sector(buf, true);
        } else if rel == 7 {
            self.write_fs_info(buf);
        } else if rel >= fat_start && rel < fat_start + FAT_COUNT * fat_size {
            let fat_index = (rel - fat_start) % fat_size;
            self.write_fat_sector(buf, fat_index);
        } else if rel >= data_start {
            self.write_data_sector(buf, rel - data_start);
        }
        // everything else (reserved padding, backup-boot-sector slack) stays zero.
    }

    fn write_boot_sector(&self, buf: &mut [u8; SECTOR_SIZE], backup: bool) {
        let _ = backup; // backup boot sector is bit-identical to the primary one.
        let sector = BootSector::create_fat32(
            BYTES_PER_SECTOR as u16,
            SECTORS_PER_CLUSTER as u8,
            RESERVED_SECTORS as u16,
            FAT_COUNT as u8,
            MediaType::HardDisk,
            self.partition_start_lba(),
            self.layout().partition_sectors(),
            self.sectors_per_fat(),
            ROOT_CLUSTER,
            1,
            6,
            0x80,
            VOLUME_ID,
            Some("Boot2Flippr"),
        )
        .with_oem_name(b"BOOT2FLP");
        sector.write(buf.as_mut_slice());
    }

    fn write_fs_info(&self, buf: &mut [u8; SECTOR_SIZE]) {
        let info = FsInfo {
            signature: 0x41615252,
            reserved1: [0; 480],
            structure_signature: 0x61417272,
            free_count: 0xFFFF_FFFF,
            next_free: 0xFFFF_FFFF,
            reserved2: [0; 12],
            trail_signature: 0xAA550000,
        };
        buf.copy_from_slice(bytemuck::bytes_of(&info));
    }

    fn write_fat_sector(&self, buf: &mut [u8; SECTOR_SIZE], fat_sector_index: u32) {
        let base_cluster = fat_sector_index * 128;
        for i in 0..128u32 {
            let cluster = base_cluster + i;
            let value: u32 = match cluster {
                0 => 0x0FFF_FFF8,
                1 => 0x0FFF_FFFF,
                2 => 0x0FFF_FFFF,
                c => self.fat_value_for(c),
            };
            let off = (i * 4) as usize;
            buf[off..off + 4].copy_from_slice(&value.to_le_bytes());
        }
    }

    fn fat_value_for(&self, cluster: u32) -> u32 {
        for entry in &self.entries {
            let start = entry.start_cluster;
            let end = start + entry.cluster_count; // exclusive
            if cluster >= start && cluster < end {
                return if cluster == end - 1 {
                    0x0FFF_FFFF
                } else {
                    cluster + 1
                };
            }
        }
        0 // free
    }

    fn write_data_sector(&mut self, buf: &mut [u8; SECTOR_SIZE], data_rel_sector: u32) {
        let cluster = data_rel_sector / SECTORS_PER_CLUSTER + 2;
        let sub_sector = data_rel_sector % SECTORS_PER_CLUSTER;

        if cluster == ROOT_CLUSTER && sub_sector == 0 {
            self.write_directory_cluster(buf, ROOT_PARENT, ROOT_CLUSTER);
            return;
        }

        if let Some(idx) = self
            .entries
            .iter()
            .position(|e| e.is_directory && e.start_cluster == cluster)
        {
            if sub_sector == 0 {
                self.write_directory_cluster(buf, idx, cluster);
            }
            return;
        }

        if let Some(idx) = self.entries.iter().position(|e| {
            !e.is_directory
                && cluster >= e.start_cluster
                && cluster < e.start_cluster + e.cluster_count
        }) {
            self.maybe_notify(idx);
            let cluster_offset = (cluster - self.entries[idx].start_cluster) as u64
                * (SECTORS_PER_CLUSTER * BYTES_PER_SECTOR) as u64
                + sub_sector as u64 * SECTOR_SIZE as u64;
            self.fill_file_bytes(idx, cluster_offset, buf);
        }
    }

    fn maybe_notify(&mut self, idx: usize) {
        if self.notified[idx] {
            return;
        }
        self.notified[idx] = true;
        let name = self.display_name(idx);
        if let Some(cb) = self.read_callback.as_mut() {
            cb(&name);
        }
    }

    fn display_name(&self, idx: usize) -> String {
        let entry = &self.entries[idx];
        entry
            .long_name
            .clone()
            .unwrap_or_else(|| short_name_display(&entry.short_name))
    }

    fn fill_file_bytes(&self, idx: usize, offset: u64, buf: &mut [u8; SECTOR_SIZE]) {
        let entry = &self.entries[idx];
        let Some(source) = &entry.source else {
            return;
        };
        match source {
            FileSource::Memory(bytes) => {
                if offset >= bytes.len() as u64 {
                    return;
                }
                let start = offset as usize;
                let end = core::cmp::min(bytes.len(), start + SECTOR_SIZE);
                buf[..end - start].copy_from_slice(&bytes[start..end]);
            }
            FileSource::ExternalFile { .. } => {
                // External bytes require a reader supplied at session-build time; without one
                // the sector reads back as zero, matching the "missing file" error semantics.
            }
        }
    }

    /// Like [`VirtualFs::read_sector`], but pulls external file bytes through `reader`.
    pub fn read_sector_with(
        &mut self,
        lba: u32,
        buf: &mut [u8; SECTOR_SIZE],
        reader: &mut dyn ExternalFileReader,
    ) {
        self.read_sector(lba, buf);

        let partition_start = self.partition_start_lba();
        if lba < partition_start {
            return;
        }
        let rel = lba - partition_start;
        let data_start = self.data_start_sector();
        if rel < data_start {
            return;
        }
        let data_rel_sector = rel - data_start;
        let cluster = data_rel_sector / SECTORS_PER_CLUSTER + 2;
        let sub_sector = data_rel_sector % SECTORS_PER_CLUSTER;

        let Some(idx) = self.entries.iter().position(|e| {
            !e.is_directory
                && cluster >= e.start_cluster
                && cluster < e.start_cluster + e.cluster_count
        }) else {
            return;
        };
        self.maybe_notify(idx);
        let entry = &self.entries[idx];
        let Some(FileSource::ExternalFile { path, size }) = &entry.source else {
            return;
        };
        let cluster_offset = (cluster - entry.start_cluster) as u64
            * (SECTORS_PER_CLUSTER * BYTES_PER_SECTOR) as u64
            + sub_sector as u64 * SECTOR_SIZE as u64;
        if cluster_offset >= *size {
            return;
        }
        let n = reader.read(path, cluster_offset, buf.as_mut_slice());
        if (n as u64) < *size - cluster_offset {
            // trailing bytes of the last sector of the file are left zero already.
        }
    }

    fn write_directory_cluster(&self, buf: &mut [u8; SECTOR_SIZE], parent_index: usize, self_cluster: u32) {
        let mut slot = 0usize;

        if self_cluster != ROOT_CLUSTER {
            let parent_cluster = self.parent_cluster_of(parent_index);
            let dot = FileEntry::new(".", "", FileAttributes::DIRECTORY, 0, self_cluster)
                .with_dates(FIXED_TIME, FIXED_DATE);
            write_slot(buf, slot, bytemuck::bytes_of(&dot));
            slot += 1;
            let dotdot = FileEntry::new("..", "", FileAttributes::DIRECTORY, 0, parent_cluster)
                .with_dates(FIXED_TIME, FIXED_DATE);
            write_slot(buf, slot, bytemuck::bytes_of(&dotdot));
            slot += 1;
        }

        for entry in self.entries.iter() {
            if entry.parent_index != parent_index {
                continue;
            }
            if slot >= ENTRIES_PER_SECTOR {
                break;
            }
            slot = self.write_entry_slots(buf, slot, entry);
        }
    }

    fn parent_cluster_of(&self, parent_index: usize) -> u32 {
        if parent_index == ROOT_PARENT {
            ROOT_CLUSTER
        } else {
            self.entries[parent_index].start_cluster
        }
    }

    fn write_entry_slots(
        &self,
        buf: &mut [u8; SECTOR_SIZE],
        mut slot: usize,
        entry: &VirtualFileEntry,
    ) -> usize {
        let (base, ext) = split_short_name(&entry.short_name);

        if let Some(long_name) = &entry.long_name {
            let checksum = short_name_checksum(&entry.short_name);
            let units: Vec<u16> = long_name.encode_utf16().collect();
            let lfn_count = units.len().div_ceil(13).max(1);
            for seq in (1..=lfn_count).rev() {
                if slot >= ENTRIES_PER_SECTOR {
                    return slot;
                }
                let is_last = seq == lfn_count;
                let mut ord = seq as u8;
                if is_last {
                    ord |= 0x40;
                }
                let chunk_start = (seq - 1) * 13;
                let bytes = lfn_entry_bytes(ord, units.as_slice(), chunk_start, checksum);
                write_slot(buf, slot, &bytes);
                slot += 1;
            }
        }

        if slot >= ENTRIES_PER_SECTOR {
            return slot;
        }

        let attrs = if entry.is_directory {
            FileAttributes::DIRECTORY
        } else {
            FileAttributes::ARCHIVE
        };
        let short = FileEntry::new(base, ext, attrs, entry.size() as u32, entry.start_cluster)
            .with_dates(FIXED_TIME, FIXED_DATE);
        write_slot(buf, slot, bytemuck::bytes_of(&short));
        slot + 1
    }
}

/// Copies a 32-byte directory entry into slot `slot` of a sector buffer.
fn write_slot(buf: &mut [u8; SECTOR_SIZE], slot: usize, entry: &[u8]) {
    let off = slot * 32;
    buf[off..off + 32].copy_from_slice(entry);
}

/// Converts a short name like "HELLO.TXT" into the FAT 8.3, space-padded, uppercase 11-byte form.
fn short_name_bytes(name: &str) -> [u8; 11] {
    let mut out = [b' '; 11];
    let (base, ext) = name.split_once('.').unwrap_or((name, ""));
    for (slot, byte) in out[0..8].iter_mut().zip(base.bytes()) {
        *slot = byte.to_ascii_uppercase();
    }
    for (slot, byte) in out[8..11].iter_mut().zip(ext.bytes()) {
        *slot = byte.to_ascii_uppercase();
    }
    out
}

fn split_short_name(short_name: &[u8; 11]) -> (&str, &str) {
    let base = core::str::from_utf8(&short_name[0..8]).unwrap_or("").trim_end();
    let ext = core::str::from_utf8(&short_name[8..11]).unwrap_or("").trim_end();
    (base, ext)
}

fn short_name_display(short_name: &[u8; 11]) -> String {
    let (base, ext) = split_short_name(short_name);
    if ext.is_empty() {
        String::from(base)
    } else {
        alloc::format!("{}.{}", base, ext)
    }
}

/// Whether `name` needs a VFAT long-name entry to be represented faithfully: it does unless its
/// 8.3 short-name rendering reproduces it exactly (same case, no truncation).
fn long_name_for(name: &str, short_name: &[u8; 11]) -> Option<String> {
    if short_name_display(short_name) == name {
        None
    } else {
        Some(String::from(name))
    }
}

/// `unsigned char ChkSum(unsigned char *pFcbName)`, per the FAT32 long-name spec: rotate-right
/// accumulate over the 11 short-name bytes.
fn short_name_checksum(short_name: &[u8; 11]) -> u8 {
    let mut sum: u8 = 0;
    for &byte in short_name {
        sum = ((sum & 1) << 7).wrapping_add(sum >> 1).wrapping_add(byte);
    }
    sum
}

fn lfn_entry_bytes(ord: u8, units: &[u16], chunk_start: usize, checksum: u8) -> [u8; 32] {
    let mut name = [0xFFFFu16; 13];
    let mut terminated = false;
    for (i, slot) in name.iter_mut().enumerate() {
        let src_index = chunk_start + i;
        if src_index < units.len() {
            *slot = units[src_index];
        } else if !terminated {
            *slot = 0x0000;
            terminated = true;
        }
    }

    let mut buf = [0u8; 32];
    buf[0] = ord;
    for i in 0..5 {
        buf[1 + i * 2..3 + i * 2].copy_from_slice(&name[i].to_le_bytes());
    }
    buf[11] = 0x0F;
    buf[12] = 0x00;
    buf[13] = checksum;
    for i in 0..6 {
        buf[14 + i * 2..16 + i * 2].copy_from_slice(&name[5 + i].to_le_bytes());
    }
    buf[26] = 0;
    buf[27] = 0;
    for i in 0..2 {
        buf[28 + i * 2..30 + i * 2].copy_from_slice(&name[11 + i].to_le_bytes());
    }
    buf
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    fn fs() -> VirtualFs {
        let mut fs = VirtualFs::new(262144);
        fs.set_scheme(PartScheme::GptOnly);
        fs
    }

    #[test]
    fn root_directory_single_file() {
        let mut fs = fs();
        fs.add_memory_file("HELLO.TXT", b"hi".to_vec()).unwrap();
        let data_start = fs.data_start_sector();
        let mut buf = [0u8; SECTOR_SIZE];
        fs.read_sector(2048 + data_start, &mut buf);
        assert_eq!(&buf[0..11], b"HELLO   TXT");
        assert_eq!(buf[11], 0x20);
        assert_eq!(&buf[20..22], &[0, 0]);
        assert_eq!(&buf[26..28], &3u16.to_le_bytes());
        assert_eq!(&buf[28..32], &2u32.to_le_bytes());
    }

    #[test]
    fn long_filename_checksum_matches() {
        let mut fs = fs();
        let idx = fs
            .add_memory_file_under(
                ROOT_PARENT,
                "AUTOEXEC.IPX",
                Some(String::from("autoexec.ipxe")),
                b"#!ipxe\n".to_vec(),
            )
            .unwrap();
        let short = fs.entries[idx].short_name;
        let checksum = short_name_checksum(&short);
        let data_start = fs.data_start_sector();
        let mut buf = [0u8; SECTOR_SIZE];
        fs.read_sector(2048 + data_start, &mut buf);
        assert_eq!(buf[0], 0x41);
        assert_eq!(buf[13], checksum);
    }

    #[test]
    fn subdirectory_has_dot_entries() {
        let mut fs = fs();
        fs.add_file_under_path("EFI/BOOT", "BOOTX64.EFI", "/sd/bootx64.efi", 1024 * 1024)
            .unwrap();
        let efi_cluster = fs
            .entries
            .iter()
            .find(|e| e.is_directory && e.short_name == short_name_bytes("EFI"))
            .unwrap()
            .start_cluster;
        let data_start = fs.data_start_sector();
        let sector = 2048 + data_start + (efi_cluster - 2) * SECTORS_PER_CLUSTER;
        let mut buf = [0u8; SECTOR_SIZE];
        fs.read_sector(sector, &mut buf);
        assert_eq!(&buf[0..11], b".          ");
        assert_eq!(&buf[32..43], b"..         ");
        assert_eq!(&buf[64..67], b"BOO");
    }

    #[test]
    fn fat_chain_terminates() {
        let mut fs = fs();
        let idx = fs
            .add_memory_file("BIG.BIN", alloc::vec![0u8; SECTOR_SIZE * 3])
            .unwrap();
        let entry = fs.entries[idx].clone();
        let fat_sector_index = entry.start_cluster / 128;
        let mut buf = [0u8; SECTOR_SIZE];
        fs.write_fat_sector(&mut buf, fat_sector_index);
        let base = (entry.start_cluster % 128) as usize;
        for i in 0..entry.cluster_count as usize - 1 {
            let off = (base + i) * 4;
            let value = u32::from_le_bytes(buf[off..off + 4].try_into().unwrap());
            assert_eq!(value, entry.start_cluster + i as u32 + 1);
        }
        let last_off = (base + entry.cluster_count as usize - 1) * 4;
        let last = u32::from_le_bytes(buf[last_off..last_off + 4].try_into().unwrap());
        assert_eq!(last, 0x0FFF_FFFF);
    }

    #[test]
    fn read_sector_always_returns_512_bytes() {
        let mut fs = fs();
        fs.add_memory_file("A.TXT", b"a".to_vec()).unwrap();
        let mut buf = [0u8; SECTOR_SIZE];
        fs.read_sector(262144 - 1, &mut buf);
        assert_eq!(buf.len(), SECTOR_SIZE);
    }

    #[test]
    fn lowercase_name_gets_an_automatic_long_name_entry() {
        let mut fs = fs();
        fs.add_memory_file("autoexec.ipxe", b"#!ipxe\n".to_vec())
            .unwrap();
        let data_start = fs.data_start_sector();
        let mut buf = [0u8; SECTOR_SIZE];
        fs.read_sector(2048 + data_start, &mut buf);
        assert_eq!(buf[0], 0x41);
        assert_eq!(&buf[32..43], b"AUTOEXECIPX");
    }

    #[test]
    fn table_full_is_reported() {
        let mut fs = fs();
        for i in 0..MAX_ENTRIES {
            let name = alloc::format!("F{i}.TXT");
            fs.add_memory_file(&name, alloc::vec![0u8]).unwrap();
        }
        let err = fs.add_memory_file("ONE.TXT", alloc::vec![0u8]);
        assert_eq!(err.unwrap_err(), VfatError::TableFull);
    }
}
