//! The up-case table.

use crate::exfat::{DeviceAccess, SuperBlock};
use crate::filesystem::{ClusterId, FileName};
use crate::{debug, warn, BlockDevice, Error};

/// The largest up-case table the format allows: one entry for every 16-bit
/// character.
const MAX_TABLE_BYTES: u64 = 0xFFFF * 2;

/// The volume's case-folding table: a flat array of UTF-16 units where entry
/// `c` is the upper-case form of character `c`.
///
/// Lookups go to the device rather than caching the table, which can be up to
/// 128 KiB. Characters at or beyond the end of the table fold to themselves.
#[cfg_attr(feature = "defmt-log", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct UpcaseTable {
    /// Byte offset of the table data on the device.
    offset: u64,
    /// Number of characters the table covers.
    char_count: u32,
}

/// Fold one byte into the running up-case table checksum.
///
/// This is the 32-bit rotate-and-add the format mandates for the table. It is
/// deliberately distinct from the 16-bit variant used for directory entry
/// sets and name hashes; the two must not be unified.
fn fold_table_checksum(sum: u32, byte: u8) -> u32 {
    sum.rotate_right(1).wrapping_add(u32::from(byte))
}

impl UpcaseTable {
    /// Validate the up-case table discovered in the root directory.
    ///
    /// Reads every byte of the table to verify the checksum stored in the
    /// directory entry.
    pub fn read<D>(
        superblock: &SuperBlock,
        block_device: &D,
        access: &mut DeviceAccess,
        start_cluster: ClusterId,
        size: u64,
        stored_checksum: u32,
    ) -> Result<UpcaseTable, Error<D::Error>>
    where
        D: BlockDevice,
    {
        superblock.check_cluster(start_cluster)?;
        if size == 0 || size > MAX_TABLE_BYTES || size % 2 != 0 {
            return Err(Error::FormatError("bad up-case table size"));
        }
        let offset = superblock.cluster_to_offset(start_cluster);
        let mut computed = 0u32;
        for i in 0..size {
            let byte = access.read_u8(block_device, offset + i, "upcase_checksum")?;
            computed = fold_table_checksum(computed, byte);
        }
        if computed != stored_checksum {
            warn!(
                "Up-case table checksum mismatch: stored {:x}, computed {:x}",
                stored_checksum, computed
            );
            return Err(Error::ChecksumMismatch {
                stored: stored_checksum,
                computed,
            });
        }
        debug!(
            "Up-case table at {:?}, {} characters",
            start_cluster,
            size / 2
        );
        Ok(UpcaseTable {
            offset,
            char_count: (size / 2) as u32,
        })
    }

    /// Case-fold a single UTF-16 unit. Units the table doesn't cover pass
    /// through unchanged, preserving their case.
    pub fn to_upper<D>(
        &self,
        block_device: &D,
        access: &mut DeviceAccess,
        unit: u16,
    ) -> Result<u16, Error<D::Error>>
    where
        D: BlockDevice,
    {
        if u32::from(unit) >= self.char_count {
            Ok(unit)
        } else {
            access.read_u16(
                block_device,
                self.offset + u64::from(unit) * 2,
                "upcase_lookup",
            )
        }
    }

    /// Compute the 16-bit hash of a file name, as stored in the stream
    /// extension entry.
    ///
    /// Each character is up-cased, then its low byte and high byte are folded
    /// in, in that order. The byte split is part of the format.
    pub fn hash_name<D>(
        &self,
        block_device: &D,
        access: &mut DeviceAccess,
        name: &FileName,
    ) -> Result<u16, Error<D::Error>>
    where
        D: BlockDevice,
    {
        let mut hash = 0u16;
        for &unit in name.units() {
            let upper = self.to_upper(block_device, access, unit)?;
            hash = hash.rotate_right(1).wrapping_add(upper & 0x00FF);
            hash = hash.rotate_right(1).wrapping_add(upper >> 8);
        }
        Ok(hash)
    }

    /// Case-insensitively compare two file names.
    pub fn names_equal<D>(
        &self,
        block_device: &D,
        access: &mut DeviceAccess,
        a: &FileName,
        b: &FileName,
    ) -> Result<bool, Error<D::Error>>
    where
        D: BlockDevice,
    {
        if a.len() != b.len() {
            return Ok(false);
        }
        for (&x, &y) in a.units().iter().zip(b.units().iter()) {
            if self.to_upper(block_device, access, x)? != self.to_upper(block_device, access, y)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

// ****************************************************************************
//
// Unit Tests
//
// ****************************************************************************


// ****************************************************************************
//
// End Of File
//
// ****************************************************************************
