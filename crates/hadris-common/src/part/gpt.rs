use crate::{
    alg::hash::crc::Crc32HasherIsoHdlc,
    str::utf16::FixedUtf16Str,
    types::{
        endian::{Endian, LittleEndian},
        number::{U32, U64},
    },
};

#[repr(transparent)]
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "bytemuck", derive(bytemuck::Pod, bytemuck::Zeroable))]
pub struct Guid([u8; 16]);

impl Default for Guid {
    fn default() -> Self {
        Self([0; 16])
    }
}

impl Guid {
    pub const BASIC_DATA_PART: Self = Self([
        0xa2, 0xa0, 0xd0, 0xeb, 0xe5, 0xb9, 0x33, 0x44, 0x87, 0xc0, 0x68, 0xb6, 0xb7, 0x26, 0x99,
        0xc7,
    ]);
    pub const EFI_SYSTEM_PART: Self = Self([
        0x28, 0x73, 0x2a, 0xc1, 0x1f, 0xf8, 0xd2, 0x11, 0xba, 0x4b, 0x00, 0xa0, 0xc9, 0x3e, 0xc9,
        0x3b,
    ]);

    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "bytemuck", derive(bytemuck::Pod, bytemuck::Zeroable))]
pub struct GptPartitionTableHeader {
    /// The signature for the GPT header, must be "EFI PART".
    pub signature: [u8; 8],
    pub revision: U32<LittleEndian>,
    pub header_size: U32<LittleEndian>,
    pub crc32: U32<LittleEndian>,
    pub reserved: U32<LittleEndian>,
    pub current_lba: U64<LittleEndian>,
    pub backup_lba: U64<LittleEndian>,
    pub first_usable_lba: U64<LittleEndian>,
    pub last_usable_lba: U64<LittleEndian>,
    pub disk_guid: Guid,
    pub partition_entry_lba: U64<LittleEndian>,
    pub num_partition_entries: U32<LittleEndian>,
    /// The size of the size of each partition entry, in bytes.
    ///
    /// Must be a 128 * 2^n bytes
    pub size_of_partition_entry: U32<LittleEndian>,
    pub partition_entry_array_crc32: U32<LittleEndian>,
}

impl GptPartitionTableHeader {
    const SIGNATURE: [u8; 8] = *b"EFI PART";
}
impl Default for GptPartitionTableHeader {
    fn default() -> Self {
        Self {
            signature: Self::SIGNATURE,
            revision: U32::new(0x00010000),
            header_size: U32::new(0x5C),
            crc32: U32::new(0),
            reserved: U32::new(0),
            current_lba: U64::new(0),
            backup_lba: U64::new(0),
            first_usable_lba: U64::new(0),
            last_usable_lba: U64::new(0),
            disk_guid: Guid::default(),
            partition_entry_lba: U64::new(0),
            num_partition_entries: U32::new(0),
            size_of_partition_entry: U32::new(128),
            partition_entry_array_crc32: U32::new(0),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "bytemuck", derive(bytemuck::Pod, bytemuck::Zeroable))]
pub struct GptPartitionEntry {
    pub type_guid: Guid,
    pub unique_partition_guid: Guid,
    pub starting_lba: U64<LittleEndian>,
    pub ending_lba: U64<LittleEndian>,
    pub attributes: U64<LittleEndian>,
    pub partition_name: FixedUtf16Str<36>,
}

impl GptPartitionEntry {
    pub fn new(
        type_guid: Guid,
        unique_partition_guid: Guid,
        starting_lba: u64,
        ending_lba: u64,
        name: &str,
    ) -> Self {
        Self {
            type_guid,
            unique_partition_guid,
            starting_lba: U64::new(starting_lba),
            ending_lba: U64::new(ending_lba),
            attributes: U64::new(0),
            partition_name: FixedUtf16Str::from_str(name),
        }
    }

    pub fn is_unused(&self) -> bool {
        self.type_guid.as_bytes() == &[0u8; 16]
    }
}

impl Default for GptPartitionEntry {
    fn default() -> Self {
        Self {
            type_guid: Guid::default(),
            unique_partition_guid: Guid::default(),
            starting_lba: U64::new(0),
            ending_lba: U64::new(0),
            attributes: U64::new(0),
            partition_name: FixedUtf16Str::from_str(""),
        }
    }
}

impl GptPartitionTableHeader {
    /// Builds the primary GPT header for a disk with the given geometry.
    ///
    /// `crc32` is left at zero; call [`GptPartitionTableHeader::finalize`] once the
    /// partition entry array has been written, so its CRC can be folded in.
    pub fn new_primary(
        disk_guid: Guid,
        backup_lba: u32,
        first_usable_lba: u32,
        last_usable_lba: u32,
        partition_entry_lba: u32,
        num_partition_entries: u32,
    ) -> Self {
        Self {
            current_lba: U64::new(1),
            backup_lba: U64::new(backup_lba as u64),
            first_usable_lba: U64::new(first_usable_lba as u64),
            last_usable_lba: U64::new(last_usable_lba as u64),
            disk_guid,
            partition_entry_lba: U64::new(partition_entry_lba as u64),
            num_partition_entries: U32::new(num_partition_entries),
            ..Self::default()
        }
    }

    /// Builds the backup header: a mirror of the primary with `current_lba`/`backup_lba`
    /// swapped and the partition entry array relocated just before it.
    pub fn new_backup(primary: &Self, backup_lba: u32, backup_entry_array_lba: u32) -> Self {
        Self {
            current_lba: U64::new(backup_lba as u64),
            backup_lba: U64::new(1),
            partition_entry_lba: U64::new(backup_entry_array_lba as u64),
            crc32: U32::new(0),
            ..*primary
        }
    }

    /// Computes the partition-entry-array CRC32 and the header CRC32 (with the header's own
    /// `crc32` field zeroed during the computation, per the UEFI spec) and sets both fields.
    pub fn finalize(&mut self, partition_entries: &[u8]) {
        self.partition_entry_array_crc32 = U32::new(Crc32HasherIsoHdlc::checksum(partition_entries));
        self.crc32 = U32::new(0);
        let header_size = self.header_size.get() as usize;
        #[cfg(feature = "bytemuck")]
        {
            let bytes = bytemuck::bytes_of(self);
            let crc = Crc32HasherIsoHdlc::checksum(&bytes[..header_size.min(bytes.len())]);
            self.crc32 = U32::new(crc);
        }
    }
}
