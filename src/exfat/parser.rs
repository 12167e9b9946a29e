//! The directory parsing state machine.

use crate::exfat::{DeviceAccess, OnDiskDirEntry, SuperBlock, UpcaseTable};
use crate::filesystem::{Attributes, ClusterId, DirEntry, FileName, Timestamp, VolumeName};
use crate::{trace, warn, BlockDevice, Error};

/// One record discovered while walking a directory.
///
/// The metadata kinds (label, bitmap, up-case table) only legitimately appear
/// in the root directory.
#[derive(Debug)]
pub(crate) enum DirEntryEvent {
    /// The volume label.
    Label(VolumeName),
    /// The allocation bitmap's location.
    Bitmap {
        start_cluster: ClusterId,
        size: u64,
    },
    /// The up-case table's location and expected checksum.
    UpcaseTable {
        start_cluster: ClusterId,
        size: u64,
        checksum: u32,
    },
    /// A file or directory.
    File(DirEntry),
}

/// Walks a directory's cluster chain one 32-byte record at a time.
///
/// The cursor is a (cluster, offset-within-cluster) pair and crosses cluster
/// boundaries transparently, including in the middle of a multi-entry file
/// record set. Pull records with [`DirectoryParser::next_event`] until it
/// returns `None`.
///
/// File names are hash-verified against the up-case table once one has been
/// wired in with [`DirectoryParser::set_upcase`]. The root directory scan
/// discovers the table partway through the scan that is using it, so records
/// earlier in the root than the table itself go unverified; that is how the
/// format is meant to be read.
pub(crate) struct DirectoryParser {
    superblock: SuperBlock,
    access: DeviceAccess,
    cluster: ClusterId,
    offset_in_cluster: u32,
    contiguous: bool,
    upcase: Option<UpcaseTable>,
    index: u32,
    finished: bool,
}

impl DirectoryParser {
    /// Start parsing the directory that begins at the given cluster.
    pub fn new<E>(
        superblock: SuperBlock,
        start_cluster: ClusterId,
        contiguous: bool,
    ) -> Result<DirectoryParser, Error<E>>
    where
        E: core::fmt::Debug,
    {
        superblock.check_cluster(start_cluster)?;
        Ok(DirectoryParser {
            superblock,
            access: DeviceAccess::new(),
            cluster: start_cluster,
            offset_in_cluster: 0,
            contiguous,
            upcase: None,
            index: 0,
            finished: false,
        })
    }

    /// Wire in the up-case table so subsequent file records can have their
    /// name hashes verified.
    pub fn set_upcase(&mut self, table: UpcaseTable) {
        self.upcase = Some(table);
    }

    fn load_entry<D>(
        &mut self,
        block_device: &D,
        buffer: &mut [u8; OnDiskDirEntry::LEN],
    ) -> Result<(), Error<D::Error>>
    where
        D: BlockDevice,
    {
        let offset =
            self.superblock.cluster_to_offset(self.cluster) + u64::from(self.offset_in_cluster);
        self.access.read_exact(block_device, offset, buffer, "read_dir")
    }

    /// Step the cursor to the next 32-byte slot, following the cluster chain
    /// at cluster boundaries. Running off the end of the chain ends the
    /// parse: directories are not required to close with an explicit
    /// end-of-directory record on a cluster boundary.
    fn advance<D>(&mut self, block_device: &D) -> Result<(), Error<D::Error>>
    where
        D: BlockDevice,
    {
        self.offset_in_cluster += OnDiskDirEntry::LEN_U32;
        if self.offset_in_cluster == self.superblock.bytes_per_cluster() {
            let next = self.superblock.next_cluster(
                block_device,
                &mut self.access,
                self.cluster,
                self.contiguous,
            )?;
            if self.superblock.cluster_in_heap(next) {
                self.cluster = next;
                self.offset_in_cluster = 0;
            } else {
                trace!("Directory chain ends after {:?}", self.cluster);
                self.finished = true;
            }
        }
        Ok(())
    }

    /// Pull the next record, or `None` once the directory is exhausted.
    pub fn next_event<D>(
        &mut self,
        block_device: &D,
    ) -> Result<Option<DirEntryEvent>, Error<D::Error>>
    where
        D: BlockDevice,
    {
        let mut entry_data = [0u8; OnDiskDirEntry::LEN];
        loop {
            if self.finished {
                return Ok(None);
            }
            self.load_entry(block_device, &mut entry_data)?;
            let entry = OnDiskDirEntry::new(&entry_data);
            let entry_type = entry.entry_type();
            let record_index = self.index;
            self.index += 1;
            match entry_type {
                OnDiskDirEntry::TYPE_END_OF_DIR => {
                    trace!("End of directory at record {}", record_index);
                    self.finished = true;
                    return Ok(None);
                }
                OnDiskDirEntry::TYPE_ALLOC_BITMAP => {
                    let event = DirEntryEvent::Bitmap {
                        start_cluster: ClusterId(entry.bitmap_start_cluster()),
                        size: check_size(entry.bitmap_size())?,
                    };
                    self.advance(block_device)?;
                    return Ok(Some(event));
                }
                OnDiskDirEntry::TYPE_UPCASE_TABLE => {
                    let event = DirEntryEvent::UpcaseTable {
                        start_cluster: ClusterId(entry.upcase_start_cluster()),
                        size: check_size(entry.upcase_size())?,
                        checksum: entry.upcase_checksum(),
                    };
                    self.advance(block_device)?;
                    return Ok(Some(event));
                }
                OnDiskDirEntry::TYPE_VOLUME_LABEL => {
                    let length = usize::from(entry.label_length());
                    if length > OnDiskDirEntry::NAME_UNITS_PER_ENTRY {
                        return Err(Error::FormatError("volume label too long"));
                    }
                    let mut label = VolumeName::new();
                    for i in 0..length {
                        label
                            .push_unit(entry.name_unit(i))
                            .map_err(Error::FilenameError)?;
                    }
                    self.advance(block_device)?;
                    return Ok(Some(DirEntryEvent::Label(label)));
                }
                OnDiskDirEntry::TYPE_FILE => {
                    let entry = self.parse_file_record(block_device, &entry_data, record_index)?;
                    return Ok(Some(DirEntryEvent::File(entry)));
                }
                _ if entry.is_in_use() => {
                    // Forward compatibility is deliberately not attempted: an
                    // in-use entry we don't recognise poisons the directory.
                    warn!("Unknown directory entry type {:x}", entry_type);
                    return Err(Error::UnknownEntryType(entry_type));
                }
                _ => {
                    // A deleted or never-used slot: the remaining 31 bytes
                    // are don't-care.
                    self.advance(block_device)?;
                }
            }
        }
    }

    /// Advance to the next physical entry of a record set that must not end
    /// here, and load it.
    fn next_in_record<D>(
        &mut self,
        block_device: &D,
        buffer: &mut [u8; OnDiskDirEntry::LEN],
    ) -> Result<(), Error<D::Error>>
    where
        D: BlockDevice,
    {
        self.advance(block_device)?;
        if self.finished {
            return Err(Error::FormatError("directory ends inside a file entry set"));
        }
        self.load_entry(block_device, buffer)
    }

    /// Decode a file entry set: the file entry we just read, a stream
    /// extension, and one or more file name entries, all covered by a running
    /// checksum.
    fn parse_file_record<D>(
        &mut self,
        block_device: &D,
        primary: &[u8; OnDiskDirEntry::LEN],
        record_index: u32,
    ) -> Result<DirEntry, Error<D::Error>>
    where
        D: BlockDevice,
    {
        let file_entry = OnDiskDirEntry::new(primary);
        let secondary_count = file_entry.secondary_count();
        // A legal file needs at least a stream extension and one name entry
        if secondary_count < 2 {
            return Err(Error::FormatError("file entry has too few secondaries"));
        }
        let stored_checksum = file_entry.set_checksum();
        let attributes = Attributes::create_from_exfat(file_entry.file_attributes());
        let ctime = decode_timestamp(
            file_entry.create_date(),
            file_entry.create_time(),
            file_entry.create_ten_ms(),
            file_entry.create_tz(),
        );
        let mtime = decode_timestamp(
            file_entry.modify_date(),
            file_entry.modify_time(),
            file_entry.modify_ten_ms(),
            file_entry.modify_tz(),
        );
        let atime = decode_timestamp(
            file_entry.access_date(),
            file_entry.access_time(),
            0,
            file_entry.access_tz(),
        );
        let mut checksum = file_entry.fold_checksum(0, true);

        let mut entry_data = [0u8; OnDiskDirEntry::LEN];
        self.next_in_record(block_device, &mut entry_data)?;
        let stream = OnDiskDirEntry::new(&entry_data);
        if stream.entry_type() != OnDiskDirEntry::TYPE_STREAM_EXTENSION {
            return Err(Error::FormatError("expected a stream extension entry"));
        }
        checksum = stream.fold_checksum(checksum, false);
        let contiguous = stream.stream_flags() == OnDiskDirEntry::FLAG_CONTIGUOUS;
        let name_length = stream.name_length();
        let stored_hash = stream.name_hash();
        let valid_data_length = check_size(stream.valid_data_length())?;
        let first_cluster = ClusterId(stream.stream_start_cluster());
        let size = check_size(stream.data_length())?;
        // The format stores the size twice; they have to agree
        if valid_data_length != size {
            return Err(Error::FormatError("file size fields disagree"));
        }

        let mut name = FileName::new();
        let mut units_left = usize::from(name_length);
        for _ in 1..secondary_count {
            self.next_in_record(block_device, &mut entry_data)?;
            let name_entry = OnDiskDirEntry::new(&entry_data);
            if name_entry.entry_type() != OnDiskDirEntry::TYPE_FILE_NAME {
                return Err(Error::FormatError("expected a file name entry"));
            }
            checksum = name_entry.fold_checksum(checksum, false);
            let this_entry = units_left.min(OnDiskDirEntry::NAME_UNITS_PER_ENTRY);
            for i in 0..this_entry {
                name.push_unit(name_entry.name_unit(i))
                    .map_err(Error::FilenameError)?;
            }
            units_left -= this_entry;
        }
        if units_left != 0 {
            return Err(Error::FormatError("file name length mismatch"));
        }
        if checksum != stored_checksum {
            warn!(
                "Bad file entry set at record {}: stored checksum {:x}, computed {:x}",
                record_index, stored_checksum, checksum
            );
            return Err(Error::ChecksumMismatch {
                stored: u32::from(stored_checksum),
                computed: u32::from(checksum),
            });
        }
        if let Some(upcase) = self.upcase {
            let computed = upcase.hash_name(block_device, &mut self.access, &name)?;
            if computed != stored_hash {
                return Err(Error::NameHashMismatch {
                    stored: stored_hash,
                    computed,
                });
            }
        }
        self.advance(block_device)?;
        Ok(DirEntry {
            name,
            ctime,
            mtime,
            atime,
            attributes,
            cluster: first_cluster,
            contiguous,
            size,
            index: record_index,
        })
    }
}

/// The format never uses the sign bit of its 64-bit size fields; a value with
/// it set is corruption, not a 9 EiB file.
fn check_size<E>(value: u64) -> Result<u64, Error<E>>
where
    E: core::fmt::Debug,
{
    if value > i64::MAX as u64 {
        return Err(Error::FormatError("64-bit size field has the sign bit set"));
    }
    Ok(value)
}

/// Timestamp decoding is the one lenient spot in an otherwise fatal parser:
/// a nonsense date only costs that timestamp, not the directory.
fn decode_timestamp(date: u16, time: u16, ten_ms: u8, tz: u8) -> Option<Timestamp> {
    match Timestamp::from_exfat(date, time, ten_ms, tz) {
        Ok(timestamp) => Some(timestamp),
        Err(_reason) => {
            warn!("Ignoring unusable timestamp: {}", _reason);
            None
        }
    }
}

// ****************************************************************************
//
// End Of File
//
// ****************************************************************************
