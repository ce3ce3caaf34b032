pub mod gpt;
pub mod mbr;

pub use gpt::{Guid, GptPartitionEntry, GptPartitionTableHeader};
pub use mbr::{Chs, MbrPartition, MbrPartitionTable, MbrPartitionType, MbrPartitionTypeFull};
