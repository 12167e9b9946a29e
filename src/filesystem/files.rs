use crate::filesystem::{ClusterId, DirEntry, Handle};
use crate::RawVolume;

/// A handle for an open file on disk.
///
/// Do NOT drop this object! It doesn't hold a reference to the Volume Manager
/// it was created from and the VolumeManager will think you still have the
/// file open if you just drop it. Instead you must pass it to
/// [`crate::VolumeManager::close_file`] to close it cleanly.
#[cfg_attr(feature = "defmt-log", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RawFile(pub(crate) Handle);

/// Errors related to file operations
#[cfg_attr(feature = "defmt-log", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileError {
    /// Tried to use an invalid offset.
    InvalidOffset,
}

/// Internal metadata about an open file
#[cfg_attr(feature = "defmt-log", derive(defmt::Format))]
#[derive(Debug, Clone)]
pub(crate) struct FileInfo {
    /// Unique ID for this file
    pub(crate) raw_file: RawFile,
    /// The unique ID for the volume this file is on
    pub(crate) volume_id: RawVolume,
    /// The current cluster, and how many bytes that short-cuts us
    pub(crate) current_cluster: (u64, ClusterId),
    /// How far through the file we've read (in bytes).
    pub(crate) current_offset: u64,
    /// DirEntry of this file
    pub(crate) entry: DirEntry,
}

impl FileInfo {
    /// Are we at the end of the file?
    pub fn eof(&self) -> bool {
        self.current_offset == self.entry.size
    }

    /// How long is the file?
    pub fn length(&self) -> u64 {
        self.entry.size
    }

    /// Amount of file left to read.
    pub fn left(&self) -> u64 {
        self.entry.size - self.current_offset
    }

    /// Seek to a new position in the file, relative to the start of the file.
    pub fn seek_from_start(&mut self, offset: u64) -> Result<(), FileError> {
        if offset <= self.entry.size {
            self.current_offset = offset;
            if offset < self.current_cluster.0 {
                // Back to start
                self.current_cluster = (0, self.entry.cluster);
            }
            Ok(())
        } else {
            Err(FileError::InvalidOffset)
        }
    }

    /// Seek to a new position in the file, relative to the end of the file.
    pub fn seek_from_end(&mut self, offset: u64) -> Result<(), FileError> {
        if offset <= self.entry.size {
            self.seek_from_start(self.entry.size - offset)
        } else {
            Err(FileError::InvalidOffset)
        }
    }

    /// Seek to a new position in the file, relative to the current position.
    pub fn seek_from_current(&mut self, offset: i64) -> Result<(), FileError> {
        let Some(new_offset) = (self.current_offset as i64).checked_add(offset) else {
            return Err(FileError::InvalidOffset);
        };
        if new_offset >= 0 && new_offset as u64 <= self.entry.size {
            self.seek_from_start(new_offset as u64)
        } else {
            Err(FileError::InvalidOffset)
        }
    }
}

// ****************************************************************************
//
// End Of File
//
// ****************************************************************************
