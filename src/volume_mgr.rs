//! The Volume Manager implementation.
//!
//! The volume manager handles a mounted exFAT volume and the open files and
//! directories on it.

use crate::exfat::{self, DeviceAccess, DirEntryEvent, DirectoryParser, ExFatVolume, SuperBlock};
use crate::filesystem::{
    ClusterId, DirEntry, DirectoryInfo, FileInfo, HandleGenerator, RawDirectory, RawFile,
    ToFileName, VolumeName,
};
use crate::{debug, Block, BlockDevice, BlockIdx, Error, RawVolume};
use heapless::Vec;

/// A `VolumeManager` wraps a block device and gives read-only access to the
/// exFAT filesystem on it.
#[derive(Debug)]
pub struct VolumeManager<D, const MAX_DIRS: usize = 4, const MAX_FILES: usize = 4>
where
    D: BlockDevice,
    <D as BlockDevice>::Error: core::fmt::Debug,
{
    block_device: D,
    id_generator: HandleGenerator,
    open_volume: Option<VolumeInfo>,
    open_dirs: Vec<DirectoryInfo, MAX_DIRS>,
    open_files: Vec<FileInfo, MAX_FILES>,
}

/// Internal information about the mounted volume
#[derive(Debug)]
struct VolumeInfo {
    /// Handle for this volume.
    volume_id: RawVolume,
    /// The mounted filesystem
    volume: ExFatVolume,
}

impl<D> VolumeManager<D, 4, 4>
where
    D: BlockDevice,
    <D as BlockDevice>::Error: core::fmt::Debug,
{
    /// Create a new Volume Manager using a generic `BlockDevice`. From this
    /// object we can open the volume and with that we can open files.
    ///
    /// This creates a `VolumeManager` with default values MAX_DIRS = 4,
    /// MAX_FILES = 4. Call `VolumeManager::new_with_limits(block_device)` if
    /// you need different limits.
    pub fn new(block_device: D) -> VolumeManager<D, 4, 4> {
        // Pick a random starting point for the IDs that's not zero, because
        // zero doesn't stand out in the logs.
        Self::new_with_limits(block_device, 5000)
    }
}

impl<D, const MAX_DIRS: usize, const MAX_FILES: usize> VolumeManager<D, MAX_DIRS, MAX_FILES>
where
    D: BlockDevice,
    <D as BlockDevice>::Error: core::fmt::Debug,
{
    /// Create a new Volume Manager using a generic `BlockDevice`. From this
    /// object we can open the volume and with that we can open files.
    ///
    /// You can also give an offset for all the IDs this volume manager
    /// generates, which might help you find the IDs in your logs when
    /// debugging.
    pub fn new_with_limits(
        block_device: D,
        id_offset: u32,
    ) -> VolumeManager<D, MAX_DIRS, MAX_FILES> {
        debug!("Creating new embedded-exfat::VolumeManager");
        VolumeManager {
            block_device,
            id_generator: HandleGenerator::new(id_offset),
            open_volume: None,
            open_dirs: Vec::new(),
            open_files: Vec::new(),
        }
    }

    /// Temporarily get access to the underlying block device.
    pub fn device(&mut self) -> &mut D {
        &mut self.block_device
    }

    /// Mount the exFAT volume on the block device.
    ///
    /// Reads the boot sector at block 0 (partition decoding, if any, belongs
    /// to whoever supplied the block device) and scans the root directory for
    /// the allocation bitmap, the up-case table and the volume label. A
    /// volume missing the bitmap or the table does not mount.
    pub fn open_volume(&mut self) -> Result<RawVolume, Error<D::Error>> {
        if self.open_volume.is_some() {
            return Err(Error::VolumeAlreadyOpen);
        }
        let volume = exfat::parse_volume(&self.block_device)?;
        let id = RawVolume(self.id_generator.generate());
        debug!("Volume mounted as {:?}", id);
        self.open_volume = Some(VolumeInfo {
            volume_id: id,
            volume,
        });
        Ok(id)
    }

    /// Unmount the volume.
    ///
    /// You can't close it if there are any files or directories open on it.
    pub fn close_volume(&mut self, volume: RawVolume) -> Result<(), Error<D::Error>> {
        for f in self.open_files.iter() {
            if f.volume_id == volume {
                return Err(Error::VolumeStillInUse);
            }
        }
        for d in self.open_dirs.iter() {
            if d.volume_id == volume {
                return Err(Error::VolumeStillInUse);
            }
        }
        self.volume_by_id(volume)?;
        self.open_volume = None;
        Ok(())
    }

    /// The volume's label, if the root directory carries one.
    pub fn volume_label(&self, volume: RawVolume) -> Result<Option<VolumeName>, Error<D::Error>> {
        Ok(self.volume_by_id(volume)?.volume.label.clone())
    }

    /// The total size of the cluster heap, in bytes.
    pub fn total_space(&self, volume: RawVolume) -> Result<u64, Error<D::Error>> {
        let superblock = &self.volume_by_id(volume)?.volume.superblock;
        Ok(u64::from(superblock.cluster_count()) * u64::from(superblock.bytes_per_cluster()))
    }

    /// How many bytes of the cluster heap are in use, according to the
    /// allocation bitmap.
    pub fn used_space(&self, volume: RawVolume) -> Result<u64, Error<D::Error>> {
        let info = self.volume_by_id(volume)?;
        let mut access = DeviceAccess::new();
        let used = info
            .volume
            .bitmap
            .used_cluster_count(&self.block_device, &mut access)?;
        Ok(used * u64::from(info.volume.superblock.bytes_per_cluster()))
    }

    /// How many bytes of the cluster heap are free, according to the
    /// allocation bitmap.
    pub fn free_space(&self, volume: RawVolume) -> Result<u64, Error<D::Error>> {
        let total = self.total_space(volume)?;
        let used = self.used_space(volume)?;
        Ok(total.saturating_sub(used))
    }

    /// Is the given cluster marked free in the allocation bitmap?
    ///
    /// Errors with [`Error::BadCluster`] if the cluster is not a data cluster
    /// on this volume.
    pub fn is_cluster_free(
        &self,
        volume: RawVolume,
        cluster: ClusterId,
    ) -> Result<bool, Error<D::Error>> {
        let info = self.volume_by_id(volume)?;
        let mut access = DeviceAccess::new();
        info.volume.bitmap.is_cluster_free(
            &self.block_device,
            &mut access,
            &info.volume.superblock,
            cluster,
        )
    }

    /// Open the volume's root directory.
    ///
    /// You can then read the directory entries with `iterate_dir`, or you can
    /// use `open_file_in_dir`.
    pub fn open_root_dir(&mut self, volume: RawVolume) -> Result<RawDirectory, Error<D::Error>> {
        // Opening the root directory twice is OK
        let root_cluster = self.volume_by_id(volume)?.volume.superblock.root_dir_cluster;
        let directory_id = RawDirectory(self.id_generator.generate());
        let dir_info = DirectoryInfo {
            raw_directory: directory_id,
            volume_id: volume,
            cluster: root_cluster,
            contiguous: false,
        };
        self.open_dirs
            .push(dir_info)
            .map_err(|_| Error::TooManyOpenDirs)?;
        Ok(directory_id)
    }

    /// Open a directory.
    ///
    /// You can then read the directory entries with `iterate_dir` and
    /// `open_file_in_dir`. The name lookup is case-insensitive, via the
    /// volume's up-case table.
    pub fn open_dir<N>(
        &mut self,
        parent_dir: RawDirectory,
        name: N,
    ) -> Result<RawDirectory, Error<D::Error>>
    where
        N: ToFileName,
    {
        if self.open_dirs.is_full() {
            return Err(Error::TooManyOpenDirs);
        }
        let volume_id = self.dir_by_id(parent_dir)?.volume_id;
        let dir_entry = self.find_directory_entry(parent_dir, name)?;
        debug!("Found dir entry: {:?}", dir_entry);
        if !dir_entry.attributes.is_directory() {
            return Err(Error::OpenedFileAsDir);
        }

        // We don't check if the directory is already open - directories hold
        // no cached state and so opening a directory twice is allowable.
        let directory_id = RawDirectory(self.id_generator.generate());
        let dir_info = DirectoryInfo {
            raw_directory: directory_id,
            volume_id,
            cluster: dir_entry.cluster,
            contiguous: dir_entry.contiguous,
        };
        self.open_dirs
            .push(dir_info)
            .map_err(|_| Error::TooManyOpenDirs)?;
        Ok(directory_id)
    }

    /// Close a directory. You cannot perform operations on an open directory
    /// and so must close it if you want to do something with it.
    pub fn close_dir(&mut self, directory: RawDirectory) -> Result<(), Error<D::Error>> {
        for (idx, info) in self.open_dirs.iter().enumerate() {
            if directory == info.raw_directory {
                self.open_dirs.swap_remove(idx);
                return Ok(());
            }
        }
        Err(Error::BadHandle)
    }

    /// Call a callback function for each directory entry in a directory, in
    /// on-disk order.
    pub fn iterate_dir<F>(
        &mut self,
        directory: RawDirectory,
        mut func: F,
    ) -> Result<(), Error<D::Error>>
    where
        F: FnMut(&DirEntry),
    {
        let (superblock, upcase, dir_info) = self.directory_context(directory)?;
        let mut parser = DirectoryParser::new(superblock, dir_info.cluster, dir_info.contiguous)?;
        parser.set_upcase(upcase);
        while let Some(event) = parser.next_event(&self.block_device)? {
            if let DirEntryEvent::File(entry) = event {
                func(&entry);
            }
        }
        Ok(())
    }

    /// Look in a directory for a named file or directory.
    ///
    /// The lookup is case-insensitive, via the volume's up-case table, so
    /// `"readme.txt"` finds `README.TXT`.
    pub fn find_directory_entry<N>(
        &mut self,
        directory: RawDirectory,
        name: N,
    ) -> Result<DirEntry, Error<D::Error>>
    where
        N: ToFileName,
    {
        let target = name.to_file_name().map_err(Error::FilenameError)?;
        let (superblock, upcase, dir_info) = self.directory_context(directory)?;
        let mut parser = DirectoryParser::new(superblock, dir_info.cluster, dir_info.contiguous)?;
        parser.set_upcase(upcase);
        let mut access = DeviceAccess::new();
        while let Some(event) = parser.next_event(&self.block_device)? {
            if let DirEntryEvent::File(entry) = event {
                if upcase.names_equal(&self.block_device, &mut access, &entry.name, &target)? {
                    return Ok(entry);
                }
            }
        }
        Err(Error::NotFound)
    }

    /// Look in a directory for the entry with the given index, as previously
    /// reported on a [`DirEntry`].
    ///
    /// An entry's index is its record position within the directory, so it is
    /// only stable for as long as the on-disk directory does not change.
    pub fn find_directory_entry_by_index(
        &mut self,
        directory: RawDirectory,
        index: u32,
    ) -> Result<DirEntry, Error<D::Error>> {
        let (superblock, upcase, dir_info) = self.directory_context(directory)?;
        let mut parser = DirectoryParser::new(superblock, dir_info.cluster, dir_info.contiguous)?;
        parser.set_upcase(upcase);
        while let Some(event) = parser.next_event(&self.block_device)? {
            if let DirEntryEvent::File(entry) = event {
                if entry.index == index {
                    return Ok(entry);
                }
            }
        }
        Err(Error::NotFound)
    }

    /// Open a file in the given directory for reading.
    ///
    /// Unlike a writable filesystem there is no harm in opening the same file
    /// twice, so that is allowed.
    pub fn open_file_in_dir<N>(
        &mut self,
        directory: RawDirectory,
        name: N,
    ) -> Result<RawFile, Error<D::Error>>
    where
        N: ToFileName,
    {
        if self.open_files.is_full() {
            return Err(Error::TooManyOpenFiles);
        }
        let volume_id = self.dir_by_id(directory)?.volume_id;
        let entry = self.find_directory_entry(directory, name)?;
        if entry.attributes.is_directory() {
            return Err(Error::OpenedDirAsFile);
        }
        let file_id = RawFile(self.id_generator.generate());
        let file = FileInfo {
            raw_file: file_id,
            volume_id,
            current_cluster: (0, entry.cluster),
            current_offset: 0,
            entry,
        };
        self.open_files
            .push(file)
            .map_err(|_| Error::TooManyOpenFiles)?;
        Ok(file_id)
    }

    /// Read from an open file.
    ///
    /// Returns how many bytes were read. Reads shorten at the end of the
    /// file, and return zero bytes once it is reached.
    pub fn read(&mut self, file: RawFile, buffer: &mut [u8]) -> Result<usize, Error<D::Error>> {
        let file_idx = self.file_idx_by_id(file)?;
        let volume_id = self.open_files[file_idx].volume_id;
        let superblock = self.volume_by_id(volume_id)?.volume.superblock;
        // Calculate which file block the current offset lies within.
        // While there is more to read, read the block and copy in to the buffer.
        // If we need to find the next cluster, walk the FAT.
        let mut access = DeviceAccess::new();
        let mut space = buffer.len();
        let mut read = 0;
        while space > 0 && !self.open_files[file_idx].eof() {
            let mut current_cluster = self.open_files[file_idx].current_cluster;
            let (block_idx, block_offset, block_avail) = self.find_data_on_disk(
                &superblock,
                &mut access,
                &mut current_cluster,
                self.open_files[file_idx].entry.cluster,
                self.open_files[file_idx].entry.contiguous,
                self.open_files[file_idx].current_offset,
            )?;
            self.open_files[file_idx].current_cluster = current_cluster;
            let mut blocks = [Block::new()];
            self.block_device
                .read(&mut blocks, block_idx, "read")
                .map_err(Error::DeviceError)?;
            let to_copy = (block_avail as u64)
                .min(space as u64)
                .min(self.open_files[file_idx].left()) as usize;
            assert!(to_copy != 0);
            buffer[read..read + to_copy]
                .copy_from_slice(&blocks[0][block_offset..block_offset + to_copy]);
            read += to_copy;
            space -= to_copy;
            self.open_files[file_idx]
                .seek_from_current(to_copy as i64)
                .map_err(|_| Error::InvalidOffset)?;
        }
        Ok(read)
    }

    /// Close a file with the given raw file handle.
    pub fn close_file(&mut self, file: RawFile) -> Result<(), Error<D::Error>> {
        let file_idx = self.file_idx_by_id(file)?;
        self.open_files.swap_remove(file_idx);
        Ok(())
    }

    /// Check if any files or folders are open.
    pub fn has_open_handles(&self) -> bool {
        !self.open_dirs.is_empty() || !self.open_files.is_empty()
    }

    /// Consume self and return the BlockDevice.
    pub fn free(self) -> D {
        self.block_device
    }

    /// Check if a file is at End Of File.
    pub fn file_eof(&self, file: RawFile) -> Result<bool, Error<D::Error>> {
        let file_idx = self.file_idx_by_id(file)?;
        Ok(self.open_files[file_idx].eof())
    }

    /// Seek a file with an offset from the start of the file.
    pub fn file_seek_from_start(
        &mut self,
        file: RawFile,
        offset: u64,
    ) -> Result<(), Error<D::Error>> {
        let file_idx = self.file_idx_by_id(file)?;
        self.open_files[file_idx]
            .seek_from_start(offset)
            .map_err(|_| Error::InvalidOffset)?;
        Ok(())
    }

    /// Seek a file with an offset from the current position.
    pub fn file_seek_from_current(
        &mut self,
        file: RawFile,
        offset: i64,
    ) -> Result<(), Error<D::Error>> {
        let file_idx = self.file_idx_by_id(file)?;
        self.open_files[file_idx]
            .seek_from_current(offset)
            .map_err(|_| Error::InvalidOffset)?;
        Ok(())
    }

    /// Seek a file with an offset back from the end of the file.
    pub fn file_seek_from_end(&mut self, file: RawFile, offset: u64) -> Result<(), Error<D::Error>> {
        let file_idx = self.file_idx_by_id(file)?;
        self.open_files[file_idx]
            .seek_from_end(offset)
            .map_err(|_| Error::InvalidOffset)?;
        Ok(())
    }

    /// Get the length of a file
    pub fn file_length(&self, file: RawFile) -> Result<u64, Error<D::Error>> {
        let file_idx = self.file_idx_by_id(file)?;
        Ok(self.open_files[file_idx].length())
    }

    /// Get the current offset of a file
    pub fn file_offset(&self, file: RawFile) -> Result<u64, Error<D::Error>> {
        let file_idx = self.file_idx_by_id(file)?;
        Ok(self.open_files[file_idx].current_offset)
    }

    fn volume_by_id(&self, volume: RawVolume) -> Result<&VolumeInfo, Error<D::Error>> {
        match &self.open_volume {
            Some(info) if info.volume_id == volume => Ok(info),
            _ => Err(Error::BadHandle),
        }
    }

    fn dir_by_id(&self, directory: RawDirectory) -> Result<&DirectoryInfo, Error<D::Error>> {
        self.open_dirs
            .iter()
            .find(|d| d.raw_directory == directory)
            .ok_or(Error::BadHandle)
    }

    fn file_idx_by_id(&self, file: RawFile) -> Result<usize, Error<D::Error>> {
        for (idx, info) in self.open_files.iter().enumerate() {
            if info.raw_file == file {
                return Ok(idx);
            }
        }
        Err(Error::BadHandle)
    }

    /// Everything a directory scan needs, copied out so the borrow of `self`
    /// can end before the scan starts.
    fn directory_context(
        &self,
        directory: RawDirectory,
    ) -> Result<(SuperBlock, crate::exfat::UpcaseTable, DirectoryInfo), Error<D::Error>> {
        let dir_info = self.dir_by_id(directory)?.clone();
        let info = self.volume_by_id(dir_info.volume_id)?;
        Ok((info.volume.superblock, info.volume.upcase, dir_info))
    }

    /// This function turns `desired_offset` into an appropriate block to be
    /// read. It either calculates this based on the start of the file, or
    /// from the given start point - whichever is better.
    ///
    /// Returns:
    ///
    /// * the index for the block on the disk that contains the data we want,
    /// * the byte offset into that block for the data we want, and
    /// * how many bytes remain in that block.
    fn find_data_on_disk(
        &self,
        superblock: &SuperBlock,
        access: &mut DeviceAccess,
        start: &mut (u64, ClusterId),
        file_start: ClusterId,
        contiguous: bool,
        desired_offset: u64,
    ) -> Result<(BlockIdx, usize, usize), Error<D::Error>> {
        let bytes_per_cluster = u64::from(superblock.bytes_per_cluster());
        // do we need to be before our start point?
        if desired_offset < start.0 {
            // user wants to go backwards - start from the beginning of the file
            // because the FAT is only a singly-linked list.
            start.0 = 0;
            start.1 = file_start;
        }
        // How many clusters forward do we need to go?
        let num_clusters = (desired_offset - start.0) / bytes_per_cluster;
        for _ in 0..num_clusters {
            superblock.check_cluster(start.1)?;
            start.1 =
                superblock.next_cluster(&self.block_device, access, start.1, contiguous)?;
            start.0 += bytes_per_cluster;
        }
        // Make sure the cluster we landed on is real before reading from it
        superblock.check_cluster(start.1)?;
        let offset_in_cluster = desired_offset - start.0;
        let byte_offset = superblock.cluster_to_offset(start.1) + offset_in_cluster;
        let block_idx = BlockIdx((byte_offset / Block::LEN_U64) as u32);
        let block_offset = (byte_offset % Block::LEN_U64) as usize;
        let available = Block::LEN - block_offset;
        Ok((block_idx, block_offset, available))
    }
}

// ****************************************************************************
//
// End Of File
//
// ****************************************************************************
