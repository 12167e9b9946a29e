//! The allocation bitmap.

use crate::exfat::{DeviceAccess, SuperBlock};
use crate::filesystem::ClusterId;
use crate::{debug, BlockDevice, Error};

/// The allocation bitmap: one bit per cluster in the heap, set when the
/// cluster is in use.
///
/// Bit 0 is cluster 2. The bitmap itself lives in the cluster heap and is
/// laid out contiguously from its start cluster.
#[cfg_attr(feature = "defmt-log", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct ClusterBitmap {
    /// Byte offset of the bitmap data on the device.
    offset: u64,
    /// Declared size of the bitmap, in bytes.
    size: u64,
}

impl ClusterBitmap {
    /// Validate the allocation bitmap discovered in the root directory.
    ///
    /// The declared size must cover every cluster in the heap.
    pub fn read<E>(
        superblock: &SuperBlock,
        start_cluster: ClusterId,
        size: u64,
    ) -> Result<ClusterBitmap, Error<E>>
    where
        E: core::fmt::Debug,
    {
        superblock.check_cluster(start_cluster)?;
        if (size as u128) * 8 < u128::from(superblock.cluster_count()) {
            return Err(Error::FormatError("allocation bitmap too small"));
        }
        debug!(
            "Allocation bitmap at {:?}, {} bytes",
            start_cluster, size
        );
        Ok(ClusterBitmap {
            offset: superblock.cluster_to_offset(start_cluster),
            size,
        })
    }

    /// Is the given cluster free?
    pub fn is_cluster_free<D>(
        &self,
        block_device: &D,
        access: &mut DeviceAccess,
        superblock: &SuperBlock,
        cluster: ClusterId,
    ) -> Result<bool, Error<D::Error>>
    where
        D: BlockDevice,
    {
        superblock.check_cluster(cluster)?;
        let bit = u64::from(cluster.0 - ClusterId::FIRST_DATA.0);
        let byte = access.read_u8(block_device, self.offset + bit / 8, "read_bitmap")?;
        Ok(byte & (1 << (bit % 8)) == 0)
    }

    /// How many clusters are currently in use?
    ///
    /// Population-counts every declared byte. The block cache underneath
    /// means one device read per 512 bitmap bytes.
    pub fn used_cluster_count<D>(
        &self,
        block_device: &D,
        access: &mut DeviceAccess,
    ) -> Result<u64, Error<D::Error>>
    where
        D: BlockDevice,
    {
        let mut used = 0u64;
        for i in 0..self.size {
            let byte = access.read_u8(block_device, self.offset + i, "count_bitmap")?;
            used += u64::from(byte.count_ones());
        }
        Ok(used)
    }
}

// ****************************************************************************
//
// End Of File
//
// ****************************************************************************
