//! # embedded-exfat
//!
//! > A read-only exFAT driver written in Embedded Rust
//!
//! This crate is intended to allow you to read files on an exFAT formatted
//! disk from your Rust Embedded device. It is written in pure-Rust, is
//! `#![no_std]` and does not use `alloc` or `collections` to keep the memory
//! footprint low. In the first instance it is designed for readability and
//! simplicity over performance.
//!
//! ## Using the crate
//!
//! You will need something that implements the `BlockDevice` trait, which can
//! read the 512-byte blocks (or sectors) from your disk. This crate never
//! writes to the device, but the trait keeps a `write` method so your
//! implementation can be shared with code that does.
//!
//! ```rust
//! use embedded_exfat::{BlockDevice, Error, VolumeManager};
//!
//! fn example<D>(device: D) -> Result<(), Error<D::Error>>
//! where
//!     D: BlockDevice,
//! {
//!     let mut volume_mgr = VolumeManager::new(device);
//!     let volume = volume_mgr.open_volume()?;
//!     let root_dir = volume_mgr.open_root_dir(volume)?;
//!     volume_mgr.iterate_dir(root_dir, |entry| {
//!         println!("{} - {} bytes", entry.name, entry.size);
//!     })?;
//!     let my_file = volume_mgr.open_file_in_dir(root_dir, "MY_FILE.TXT")?;
//!     while !volume_mgr.file_eof(my_file)? {
//!         let mut buffer = [0u8; 32];
//!         let num_read = volume_mgr.read(my_file, &mut buffer)?;
//!         for b in &buffer[0..num_read] {
//!             print!("{}", *b as char);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! * `log`: Enabled by default. Generates log messages using the `log` crate.
//! * `defmt-log`: By turning off the default features and enabling the
//!   `defmt-log` feature you can configure this crate to log messages over defmt
//!   instead.
//!
//! You cannot enable both the `log` feature and the `defmt-log` feature.

#![cfg_attr(not(test), no_std)]
#![deny(missing_docs)]

#[cfg(test)]
#[macro_use]
extern crate hex_literal;

#[macro_use]
mod structure;

pub mod blockdevice;
pub mod exfat;
pub mod filesystem;

mod volume_mgr;

#[doc(inline)]
pub use crate::blockdevice::{Block, BlockCount, BlockDevice, BlockIdx};

#[doc(inline)]
pub use crate::exfat::{ExFatVolume, SuperBlock};

#[doc(inline)]
pub use crate::filesystem::{
    Attributes, ClusterId, DirEntry, FileName, FilenameError, Handle, RawDirectory, RawFile,
    Timestamp, ToFileName, VolumeName,
};

#[doc(inline)]
pub use crate::volume_mgr::VolumeManager;

#[cfg(all(feature = "defmt-log", feature = "log"))]
compile_error!("Cannot enable both log and defmt-log");

#[cfg(feature = "log")]
use log::{debug, trace, warn};

#[cfg(feature = "defmt-log")]
use defmt::{debug, trace, warn};

#[cfg(all(not(feature = "defmt-log"), not(feature = "log")))]
#[macro_export]
/// Like log::debug! but does nothing at all
macro_rules! debug {
    ($($arg:tt)+) => {};
}

#[cfg(all(not(feature = "defmt-log"), not(feature = "log")))]
#[macro_export]
/// Like log::trace! but does nothing at all
macro_rules! trace {
    ($($arg:tt)+) => {};
}

#[cfg(all(not(feature = "defmt-log"), not(feature = "log")))]
#[macro_export]
/// Like log::warn! but does nothing at all
macro_rules! warn {
    ($($arg:tt)+) => {};
}

/// All the ways the functions in this crate can fail.
#[cfg_attr(feature = "defmt-log", derive(defmt::Format))]
#[derive(Debug, Clone)]
pub enum Error<E>
where
    E: core::fmt::Debug,
{
    /// The underlying block device threw an error.
    DeviceError(E),
    /// The filesystem is badly formatted (or this code is buggy).
    FormatError(&'static str),
    /// A checksum computed over on-disk data did not match the stored value.
    ChecksumMismatch {
        /// The checksum recorded on disk.
        stored: u32,
        /// The checksum this crate computed.
        computed: u32,
    },
    /// A file name did not hash to the value stored in its directory entry.
    NameHashMismatch {
        /// The name hash recorded on disk.
        stored: u16,
        /// The name hash this crate computed.
        computed: u16,
    },
    /// A directory contained an in-use entry of a kind this crate does not know.
    UnknownEntryType(u8),
    /// Found a bad or out-of-range cluster number.
    BadCluster(ClusterId),
    /// The given filename was bad
    FilenameError(FilenameError),
    /// Out of memory opening directories
    TooManyOpenDirs,
    /// Out of memory opening files
    TooManyOpenFiles,
    /// Bad handle given
    BadHandle,
    /// That file or directory doesn't exist
    NotFound,
    /// You can't open a directory as a file
    OpenedDirAsFile,
    /// You can't open a file as a directory
    OpenedFileAsDir,
    /// You can't close a volume with open files or directories
    VolumeStillInUse,
    /// You can't open a volume twice
    VolumeAlreadyOpen,
    /// Bad offset given when seeking
    InvalidOffset,
}

impl<E> From<E> for Error<E>
where
    E: core::fmt::Debug,
{
    fn from(value: E) -> Error<E> {
        Error::DeviceError(value)
    }
}

/// A handle to an open volume.
///
/// A volume is a block device with an exFAT filesystem within it.
///
/// Do NOT drop this object! It doesn't hold a reference to the Volume Manager
/// it was created from and the VolumeManager will think you still have the
/// volume open if you just drop it, and it won't let you open the volume
/// again.
///
/// Instead you must pass it to [`VolumeManager::close_volume`] to close it
/// cleanly.
#[cfg_attr(feature = "defmt-log", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RawVolume(pub(crate) Handle);

// ****************************************************************************
//
// End Of File
//
// ****************************************************************************
