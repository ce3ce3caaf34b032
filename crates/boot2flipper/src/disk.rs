//! Glue: assembles a [`VirtualFs`] from a [`DeviceConfig`], wiring in the rendered boot script,
//! the loader binary, and any extra SD-backed files.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use hadris_fat::virtual_fs::{ExternalFileReader, VfatError, VirtualFs};

use crate::config::DeviceConfig;
use crate::script::render_boot_script;

/// Total sector count of the synthesised disk image (128 MiB at 512 B/sector).
pub const DEFAULT_TOTAL_SECTORS: u32 = 262144;

/// Builds the virtual filesystem described by `config`: the rendered `AUTOEXEC.IPXE` boot
/// script, the loader binary (if configured), and any extra files, each placed under the
/// directory implied by its disk path.
pub fn build_virtual_fs(
    config: &DeviceConfig,
    total_sectors: u32,
) -> Result<VirtualFs, VfatError> {
    let mut vfs = VirtualFs::new(total_sectors);
    vfs.set_scheme(config.partition_scheme.into());

    let script = render_boot_script(config);
    vfs.add_memory_file("AUTOEXEC.IPXE", script.into_bytes())?;

    if let Some(loader_path) = &config.loader_path {
        add_host_file(&mut vfs, "", loader_name(loader_path), loader_path)?;
    }

    for (disk_path, host_path) in &config.extra_files {
        let (parent, name) = split_disk_path(disk_path);
        add_host_file(&mut vfs, parent, name, host_path)?;
    }

    Ok(vfs)
}

fn loader_name(path: &Path) -> &str {
    path.file_name().and_then(|s| s.to_str()).unwrap_or("LOADER.EFI")
}

fn split_disk_path(disk_path: &str) -> (&str, &str) {
    match disk_path.rsplit_once('/') {
        Some((parent, name)) => (parent, name),
        None => ("", disk_path),
    }
}

fn add_host_file(
    vfs: &mut VirtualFs,
    parent: &str,
    name: &str,
    host_path: &Path,
) -> Result<usize, VfatError> {
    let size = std::fs::metadata(host_path).map(|m| m.len()).unwrap_or(0);
    let path = host_path.to_string_lossy().into_owned();
    if parent.is_empty() {
        vfs.add_external_file(name, path, size)
    } else {
        vfs.add_file_under_path(parent, name, path, size)
    }
}

/// Reads external file bytes straight off the host filesystem, keyed by the host path string
/// stored in each [`hadris_fat::virtual_fs::FileSource::ExternalFile`] entry.
#[derive(Default)]
pub struct HostFileReader;

impl ExternalFileReader for HostFileReader {
    fn read(&mut self, path: &str, offset: u64, buf: &mut [u8]) -> usize {
        let Ok(mut file) = File::open(path) else {
            tracing::warn!(path, "external file missing or unreadable, zero-filling");
            return 0;
        };
        if file.seek(SeekFrom::Start(offset)).is_err() {
            return 0;
        }
        let mut total = 0;
        while total < buf.len() {
            match file.read(&mut buf[total..]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(_) => break,
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeviceConfig;
    use hadris_part::SECTOR_SIZE;

    #[test]
    fn boot_script_is_the_first_root_entry() {
        let config = DeviceConfig::default();
        let mut vfs = build_virtual_fs(&config, DEFAULT_TOTAL_SECTORS).unwrap();
        let mut buf = [0u8; SECTOR_SIZE];
        let data_start_lba = 2048 + reserved_plus_fat_sectors(&mut vfs);
        vfs.read_sector(data_start_lba, &mut buf);
        assert_eq!(&buf[32..43], b"AUTOEXECIPX");
    }

    fn reserved_plus_fat_sectors(vfs: &mut VirtualFs) -> u32 {
        // Boot sector is always at relative sector 0; FAT region follows 32 reserved sectors
        // plus two 512-entry-per-sector FAT copies sized for a 128 MiB volume.
        let mut boot = [0u8; SECTOR_SIZE];
        vfs.read_sector(2048, &mut boot);
        let reserved = u16::from_le_bytes(boot[14..16].try_into().unwrap()) as u32;
        let fat_count = boot[16] as u32;
        let sectors_per_fat = u32::from_le_bytes(boot[36..40].try_into().unwrap());
        reserved + fat_count * sectors_per_fat
    }

    #[test]
    fn missing_loader_file_reports_zero_size_without_failing() {
        let mut config = DeviceConfig::default();
        config.loader_path = Some("/nonexistent/BOOTX64.EFI".into());
        let vfs = build_virtual_fs(&config, DEFAULT_TOTAL_SECTORS);
        assert!(vfs.is_ok());
    }
}
