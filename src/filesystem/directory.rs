use crate::filesystem::{Attributes, ClusterId, FileName, Handle, Timestamp};
use crate::RawVolume;

/// Represents a directory entry, which tells you about
/// other files and directories.
#[cfg_attr(feature = "defmt-log", derive(defmt::Format))]
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct DirEntry {
    /// The name of the file
    pub name: FileName,
    /// When the file was first created, if the on-disk timestamp was sane
    pub ctime: Option<Timestamp>,
    /// When the file was last modified, if the on-disk timestamp was sane
    pub mtime: Option<Timestamp>,
    /// When the file was last accessed, if the on-disk timestamp was sane
    pub atime: Option<Timestamp>,
    /// The file attributes (Read Only, Directory, etc)
    pub attributes: Attributes,
    /// The first cluster of the file, or cluster 0 if the file is empty
    pub cluster: ClusterId,
    /// If set, the file's clusters are consecutive and the File Allocation
    /// Table is not consulted when walking them
    pub contiguous: bool,
    /// The size of the file in bytes
    pub size: u64,
    /// Which directory record this entry was decoded from. Stable for as long
    /// as the on-disk directory does not change.
    pub index: u32,
}

/// A handle for an open directory on disk.
///
/// Do NOT drop this object! It doesn't hold a reference to the Volume Manager
/// it was created from and the VolumeManager will think you still have the
/// directory open if you just drop it. Instead you must pass it to
/// [`crate::VolumeManager::close_dir`] to close it cleanly.
#[cfg_attr(feature = "defmt-log", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RawDirectory(pub(crate) Handle);

/// Internal information about an open directory
#[cfg_attr(feature = "defmt-log", derive(defmt::Format))]
#[derive(Debug, Clone)]
pub(crate) struct DirectoryInfo {
    /// Unique ID for this directory.
    pub(crate) raw_directory: RawDirectory,
    /// The unique ID for the volume this directory is on
    pub(crate) volume_id: RawVolume,
    /// The starting point of the directory listing.
    pub(crate) cluster: ClusterId,
    /// The directory's own contiguous flag, from its entry in the parent
    /// (always false for the root directory).
    pub(crate) contiguous: bool,
}

// ****************************************************************************
//
// End Of File
//
// ****************************************************************************
