//! exFAT volume mounting.

use crate::exfat::{
    ClusterBitmap, DeviceAccess, DirEntryEvent, DirectoryParser, SuperBlock, UpcaseTable,
};
use crate::filesystem::VolumeName;
use crate::{debug, BlockDevice, Error};

/// A mounted exFAT volume: the geometry from the boot sector plus the three
/// structures the root directory is required to describe.
#[derive(Debug)]
pub struct ExFatVolume {
    /// The decoded boot sector.
    pub(crate) superblock: SuperBlock,
    /// The allocation bitmap.
    pub(crate) bitmap: ClusterBitmap,
    /// The case-folding table.
    pub(crate) upcase: UpcaseTable,
    /// The volume label, if the root directory carries one.
    pub(crate) label: Option<VolumeName>,
}

impl ExFatVolume {
    /// The geometry of this volume.
    pub fn superblock(&self) -> &SuperBlock {
        &self.superblock
    }

    /// The volume label, if the root directory carries one.
    pub fn label(&self) -> Option<&VolumeName> {
        self.label.as_ref()
    }
}

/// Load the boot sector from the start of the given block device and mount
/// the exFAT file system it describes.
///
/// Scans the root directory for the allocation bitmap, the up-case table and
/// the volume label. The first two are mandatory: a volume without them does
/// not mount. The up-case table is wired back into the in-progress scan as
/// soon as it is found, so file records after it in the root are
/// name-hash-verified within the same pass.
pub(crate) fn parse_volume<D>(block_device: &D) -> Result<ExFatVolume, Error<D::Error>>
where
    D: BlockDevice,
    D::Error: core::fmt::Debug,
{
    let mut access = DeviceAccess::new();
    let mut boot_sector = [0u8; 512];
    access.read_exact(block_device, 0, &mut boot_sector, "read_boot_sector")?;
    let superblock = SuperBlock::create_from_bytes(&boot_sector).map_err(Error::FormatError)?;
    debug!("Parsed boot sector: {:?}", superblock);

    // The root directory always uses the FAT chain. Walk it once up front so
    // a corrupt chain (or one that loops) fails the mount rather than a
    // directory listing much later.
    superblock.check_cluster(superblock.root_dir_cluster)?;
    let mut cluster = superblock.root_dir_cluster;
    let mut root_clusters = 0u32;
    while superblock.cluster_in_heap(cluster) {
        root_clusters += 1;
        if root_clusters > superblock.cluster_count() {
            return Err(Error::FormatError("root directory chain does not terminate"));
        }
        cluster = superblock.next_cluster(block_device, &mut access, cluster, false)?;
    }
    debug!("Root directory occupies {} clusters", root_clusters);

    let mut parser = DirectoryParser::new(superblock, superblock.root_dir_cluster, false)?;
    let mut bitmap = None;
    let mut upcase = None;
    let mut label = None;
    while let Some(event) = parser.next_event(block_device)? {
        match event {
            DirEntryEvent::Bitmap {
                start_cluster,
                size,
            } => {
                bitmap = Some(ClusterBitmap::read(&superblock, start_cluster, size)?);
            }
            DirEntryEvent::UpcaseTable {
                start_cluster,
                size,
                checksum,
            } => {
                let table = UpcaseTable::read(
                    &superblock,
                    block_device,
                    &mut access,
                    start_cluster,
                    size,
                    checksum,
                )?;
                parser.set_upcase(table);
                upcase = Some(table);
            }
            DirEntryEvent::Label(name) => {
                debug!("Volume label {:?}", name);
                label = Some(name);
            }
            DirEntryEvent::File(_) => {
                // Root files and directories are listed on demand
            }
        }
    }
    let bitmap = bitmap.ok_or(Error::FormatError("cluster bitmap not found"))?;
    let upcase = upcase.ok_or(Error::FormatError("upcase table not found"))?;
    Ok(ExFatVolume {
        superblock,
        bitmap,
        upcase,
        label,
    })
}

// ****************************************************************************
//
// End Of File
//
// ****************************************************************************
