//! exFAT file system implementation
//!
//! Implements a read-only decoder for the exFAT on-disk format: the boot
//! sector, the File Allocation Table, the allocation bitmap, the up-case
//! table and the directory tree.

mod bitmap;
mod device;
mod ondiskdirentry;
mod parser;
mod superblock;
mod upcase;
mod volume;

pub use superblock::SuperBlock;
pub use volume::ExFatVolume;

pub(crate) use bitmap::ClusterBitmap;
pub(crate) use device::DeviceAccess;
pub(crate) use ondiskdirentry::OnDiskDirEntry;
pub(crate) use parser::{DirEntryEvent, DirectoryParser};
pub(crate) use upcase::UpcaseTable;
pub(crate) use volume::parse_volume;

// ****************************************************************************
//
// End Of File
//
// ****************************************************************************
