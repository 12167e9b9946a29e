//! Directory Entry as stored on-disk

use byteorder::{ByteOrder, LittleEndian};

/// Represents a 32-byte directory entry as stored on-disk in a directory
/// file.
///
/// The first byte is the entry type. A file is described by a set of entries:
/// a file entry, a stream extension entry, and one file name entry per 15
/// UTF-16 units of name. The whole set is covered by a 16-bit checksum stored
/// in the file entry.
pub(crate) struct OnDiskDirEntry<'a> {
    data: &'a [u8],
}

impl<'a> core::fmt::Debug for OnDiskDirEntry<'a> {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "OnDiskDirEntry<entry_type = {:#04x}>", self.entry_type())
    }
}

impl<'a> OnDiskDirEntry<'a> {
    pub(crate) const LEN: usize = 32;
    pub(crate) const LEN_U32: u32 = 32;

    /// Marks the end of the directory. Everything after it is ignored.
    pub(crate) const TYPE_END_OF_DIR: u8 = 0x00;
    /// The allocation bitmap, in the root directory.
    pub(crate) const TYPE_ALLOC_BITMAP: u8 = 0x81;
    /// The up-case table, in the root directory.
    pub(crate) const TYPE_UPCASE_TABLE: u8 = 0x82;
    /// The volume label, in the root directory.
    pub(crate) const TYPE_VOLUME_LABEL: u8 = 0x83;
    /// A file or directory.
    pub(crate) const TYPE_FILE: u8 = 0x85;
    /// The stream extension that must follow a file entry.
    pub(crate) const TYPE_STREAM_EXTENSION: u8 = 0xC0;
    /// A file name entry; one or more follow the stream extension.
    pub(crate) const TYPE_FILE_NAME: u8 = 0xC1;

    /// The bit of the entry type that marks an entry as in use. Entries with
    /// it clear are deleted or never-used slots.
    pub(crate) const TYPE_IN_USE: u8 = 0x80;

    /// Stream extension flags value for data stored as a plain run of
    /// clusters with no chain in the File Allocation Table.
    pub(crate) const FLAG_CONTIGUOUS: u8 = 0x03;

    /// How many UTF-16 units fit in one file name entry (and in the volume
    /// label entry).
    pub(crate) const NAME_UNITS_PER_ENTRY: usize = 15;

    define_field!(entry_type, u8, 0);

    // Allocation bitmap entries
    define_field!(bitmap_start_cluster, u32, 20);
    define_field!(bitmap_size, u64, 24);

    // Up-case table entries
    define_field!(upcase_checksum, u32, 4);
    define_field!(upcase_start_cluster, u32, 20);
    define_field!(upcase_size, u64, 24);

    // Volume label entries
    define_field!(label_length, u8, 1);

    // File entries
    define_field!(secondary_count, u8, 1);
    define_field!(set_checksum, u16, 2);
    define_field!(file_attributes, u16, 4);
    define_field!(create_time, u16, 8);
    define_field!(create_date, u16, 10);
    define_field!(modify_time, u16, 12);
    define_field!(modify_date, u16, 14);
    define_field!(access_time, u16, 16);
    define_field!(access_date, u16, 18);
    define_field!(create_ten_ms, u8, 20);
    define_field!(modify_ten_ms, u8, 21);
    define_field!(create_tz, u8, 22);
    define_field!(modify_tz, u8, 23);
    define_field!(access_tz, u8, 24);

    // Stream extension entries
    define_field!(stream_flags, u8, 1);
    define_field!(name_length, u8, 3);
    define_field!(name_hash, u16, 4);
    define_field!(valid_data_length, u64, 8);
    define_field!(stream_start_cluster, u32, 20);
    define_field!(data_length, u64, 24);

    /// Create a new on-disk directory entry from a block of 32 bytes read
    /// from a directory file.
    pub fn new(data: &[u8]) -> OnDiskDirEntry {
        OnDiskDirEntry { data }
    }

    /// Is this an in-use entry, as opposed to a deleted or never-used slot?
    pub fn is_in_use(&self) -> bool {
        (self.entry_type() & Self::TYPE_IN_USE) != 0
    }

    /// Get the UTF-16 unit at the given index of a volume label or file name
    /// entry. Both store their text from byte 2 onwards.
    pub fn name_unit(&self, index: usize) -> u16 {
        let offset = 2 + index * 2;
        LittleEndian::read_u16(&self.data[offset..offset + 2])
    }

    /// Fold this entry into a running entry-set checksum.
    ///
    /// The primary (file) entry skips bytes 2 and 3 because that's where the
    /// checksum itself is stored. This is the 16-bit rotate-and-add the
    /// format mandates for entry sets; the up-case table uses a separate
    /// 32-bit variant.
    pub fn fold_checksum(&self, sum: u16, primary: bool) -> u16 {
        let mut sum = sum;
        for (i, byte) in self.data[..Self::LEN].iter().enumerate() {
            if primary && (i == 2 || i == 3) {
                continue;
            }
            sum = sum.rotate_right(1).wrapping_add(u16::from(*byte));
        }
        sum
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
