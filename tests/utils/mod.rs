//! Useful library code for tests

use embedded_exfat::{Block, BlockCount, BlockDevice, BlockIdx};

#[derive(Debug)]
pub enum Error {
    /// Asked for a block we don't have
    OutOfBounds(BlockIdx),
}

/// A block device backed by a `Vec<u8>` disk image.
pub struct RamDisk {
    contents: std::cell::RefCell<Vec<u8>>,
}

impl RamDisk {
    pub fn new(contents: Vec<u8>) -> RamDisk {
        RamDisk {
            contents: std::cell::RefCell::new(contents),
        }
    }

    fn byte_range(
        &self,
        count: usize,
        start_block_idx: BlockIdx,
    ) -> Result<std::ops::Range<usize>, Error> {
        let start = start_block_idx.0 as usize * Block::LEN;
        let end = start + count * Block::LEN;
        if end > self.contents.borrow().len() {
            return Err(Error::OutOfBounds(BlockIdx(
                (end / Block::LEN) as u32 - 1,
            )));
        }
        Ok(start..end)
    }
}

impl BlockDevice for RamDisk {
    type Error = Error;

    fn read(
        &self,
        blocks: &mut [Block],
        start_block_idx: BlockIdx,
        _reason: &str,
    ) -> Result<(), Self::Error> {
        let range = self.byte_range(blocks.len(), start_block_idx)?;
        let contents = self.contents.borrow();
        for (block, chunk) in blocks.iter_mut().zip(contents[range].chunks(Block::LEN)) {
            block.as_mut_slice().copy_from_slice(chunk);
        }
        Ok(())
    }

    fn write(&self, blocks: &[Block], start_block_idx: BlockIdx) -> Result<(), Self::Error> {
        let range = self.byte_range(blocks.len(), start_block_idx)?;
        let mut contents = self.contents.borrow_mut();
        for (block, chunk) in blocks.iter().zip(contents[range].chunks_mut(Block::LEN)) {
            chunk.copy_from_slice(block.as_slice());
        }
        Ok(())
    }

    fn num_blocks(&self) -> Result<BlockCount, Self::Error> {
        let len_blocks = self.contents.borrow().len() / Block::LEN;
        Ok(BlockCount(len_blocks as u32))
    }
}

// ****************************************************************************
//
// Synthetic exFAT volumes
//
// ****************************************************************************

/// There's no exFAT disk image checked in to this repository, so the tests
/// synthesise a little volume instead: 512-byte blocks, one block per
/// cluster, the FAT at block 4 and a 64-cluster heap at block 8. Cluster 2
/// holds the allocation bitmap and cluster 3 an up-case table covering ASCII.
pub struct DiskBuilder {
    image: Vec<u8>,
    next_free: u32,
    used: Vec<u32>,
}

/// Bytes per block, and also per cluster (one block per cluster).
pub const CLUSTER_SIZE: usize = 512;
/// Number of clusters in the heap.
pub const CLUSTER_COUNT: u32 = 64;
/// Filesystem block where the FAT starts.
const FAT_START_BLOCK: usize = 4;
/// Filesystem block where the cluster heap starts.
const HEAP_START_BLOCK: usize = 8;
/// Total number of blocks in the volume.
const VOLUME_BLOCKS: usize = HEAP_START_BLOCK + CLUSTER_COUNT as usize;
/// Cluster holding the allocation bitmap.
const BITMAP_CLUSTER: u32 = 2;
/// Cluster holding the up-case table.
const UPCASE_CLUSTER: u32 = 3;
/// The up-case table covers the first 128 characters.
const UPCASE_CHARS: u16 = 128;

impl DiskBuilder {
    pub fn new() -> DiskBuilder {
        let mut builder = DiskBuilder {
            image: vec![0u8; VOLUME_BLOCKS * CLUSTER_SIZE],
            next_free: 4,
            used: vec![BITMAP_CLUSTER, UPCASE_CLUSTER],
        };
        // The two reserved FAT entries
        builder.set_fat(0, 0xFFFF_FFF8);
        builder.set_fat(1, 0xFFFF_FFFF);
        builder
    }

    /// Byte offset of the given cluster within the disk image.
    pub fn cluster_offset(cluster: u32) -> usize {
        (HEAP_START_BLOCK + cluster as usize - 2) * CLUSTER_SIZE
    }

    fn set_fat(&mut self, cluster: u32, value: u32) {
        let offset = FAT_START_BLOCK * CLUSTER_SIZE + cluster as usize * 4;
        self.image[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    /// Allocate a chain of `count` clusters, each `stride` apart (stride 1
    /// means consecutive), marked used and linked in the FAT.
    pub fn alloc_chain(&mut self, count: usize, stride: u32) -> Vec<u32> {
        let mut clusters = Vec::new();
        let mut cluster = self.next_free;
        for _ in 0..count {
            assert!(cluster < CLUSTER_COUNT + 2, "test volume out of clusters");
            clusters.push(cluster);
            self.used.push(cluster);
            cluster += stride;
        }
        self.next_free = cluster;
        for pair in clusters.windows(2) {
            self.set_fat(pair[0], pair[1]);
        }
        if let Some(&last) = clusters.last() {
            self.set_fat(last, 0xFFFF_FFFF);
        }
        clusters
    }

    /// Allocate a run of consecutive clusters with no FAT chain at all, the
    /// way contiguous files are stored. Reading one of these back can only
    /// work if the File Allocation Table is never consulted.
    pub fn alloc_contiguous(&mut self, count: usize) -> Vec<u32> {
        let mut clusters = Vec::new();
        for _ in 0..count {
            let cluster = self.next_free;
            assert!(cluster < CLUSTER_COUNT + 2, "test volume out of clusters");
            clusters.push(cluster);
            self.used.push(cluster);
            self.next_free += 1;
        }
        clusters
    }

    /// Write file contents into the given clusters, one cluster-sized chunk
    /// at a time.
    pub fn write_data(&mut self, clusters: &[u32], data: &[u8]) {
        assert!(data.len() <= clusters.len() * CLUSTER_SIZE);
        for (chunk, &cluster) in data.chunks(CLUSTER_SIZE).zip(clusters.iter()) {
            let offset = Self::cluster_offset(cluster);
            self.image[offset..offset + chunk.len()].copy_from_slice(chunk);
        }
    }

    /// Write a directory from its 32-byte entries, appending the terminating
    /// end-of-directory entry. Returns the first cluster and the directory's
    /// size in bytes (whole clusters, as exFAT records it).
    pub fn write_directory(&mut self, entries: &[[u8; 32]]) -> (u32, u64) {
        let mut bytes = Vec::new();
        for entry in entries {
            bytes.extend_from_slice(entry);
        }
        bytes.extend_from_slice(&[0u8; 32]);
        let cluster_count = bytes.len().div_ceil(CLUSTER_SIZE);
        let clusters = self.alloc_chain(cluster_count, 1);
        self.write_data(&clusters, &bytes);
        (clusters[0], (cluster_count * CLUSTER_SIZE) as u64)
    }

    /// The allocation bitmap's entry for the root directory.
    pub fn bitmap_entry() -> [u8; 32] {
        let mut entry = [0u8; 32];
        entry[0] = 0x81;
        entry[20..24].copy_from_slice(&BITMAP_CLUSTER.to_le_bytes());
        entry[24..32].copy_from_slice(&u64::from(CLUSTER_COUNT / 8).to_le_bytes());
        entry
    }

    /// The case-folding table: identity, except ASCII lower-case folds to
    /// upper-case.
    fn upcase_table_bytes() -> Vec<u8> {
        let mut bytes = Vec::new();
        for c in 0..UPCASE_CHARS {
            let upper = fold_ascii(c);
            bytes.extend_from_slice(&upper.to_le_bytes());
        }
        bytes
    }

    /// The up-case table's entry for the root directory, with a correct
    /// checksum.
    pub fn upcase_entry() -> [u8; 32] {
        let table = Self::upcase_table_bytes();
        let mut checksum = 0u32;
        for &byte in &table {
            checksum = checksum.rotate_right(1).wrapping_add(u32::from(byte));
        }
        let mut entry = [0u8; 32];
        entry[0] = 0x82;
        entry[4..8].copy_from_slice(&checksum.to_le_bytes());
        entry[20..24].copy_from_slice(&UPCASE_CLUSTER.to_le_bytes());
        entry[24..32].copy_from_slice(&(table.len() as u64).to_le_bytes());
        entry
    }

    /// A volume label entry for the root directory.
    pub fn label_entry(label: &str) -> [u8; 32] {
        let units: Vec<u16> = label.encode_utf16().collect();
        assert!(units.len() <= 15);
        let mut entry = [0u8; 32];
        entry[0] = 0x83;
        entry[1] = units.len() as u8;
        for (i, unit) in units.iter().enumerate() {
            entry[2 + i * 2..4 + i * 2].copy_from_slice(&unit.to_le_bytes());
        }
        entry
    }

    /// A complete file entry set (file entry, stream extension, name
    /// entries) with a correct set checksum and name hash.
    pub fn file_entry_set(
        name: &str,
        first_cluster: u32,
        size: u64,
        contiguous: bool,
        attributes: u16,
        create: (u16, u16),
        modify: (u16, u16),
    ) -> Vec<[u8; 32]> {
        let units: Vec<u16> = name.encode_utf16().collect();
        let name_entries = units.len().div_ceil(15);
        let mut set = Vec::new();

        let mut file_entry = [0u8; 32];
        file_entry[0] = 0x85;
        file_entry[1] = (1 + name_entries) as u8;
        file_entry[4..6].copy_from_slice(&attributes.to_le_bytes());
        file_entry[8..10].copy_from_slice(&create.1.to_le_bytes());
        file_entry[10..12].copy_from_slice(&create.0.to_le_bytes());
        file_entry[12..14].copy_from_slice(&modify.1.to_le_bytes());
        file_entry[14..16].copy_from_slice(&modify.0.to_le_bytes());
        file_entry[16..18].copy_from_slice(&modify.1.to_le_bytes());
        file_entry[18..20].copy_from_slice(&modify.0.to_le_bytes());
        set.push(file_entry);

        let mut stream = [0u8; 32];
        stream[0] = 0xC0;
        stream[1] = if contiguous { 0x03 } else { 0x01 };
        stream[3] = units.len() as u8;
        stream[4..6].copy_from_slice(&name_hash(&units).to_le_bytes());
        stream[8..16].copy_from_slice(&size.to_le_bytes());
        stream[20..24].copy_from_slice(&first_cluster.to_le_bytes());
        stream[24..32].copy_from_slice(&size.to_le_bytes());
        set.push(stream);

        for chunk in units.chunks(15) {
            let mut name_entry = [0u8; 32];
            name_entry[0] = 0xC1;
            for (i, unit) in chunk.iter().enumerate() {
                name_entry[2 + i * 2..4 + i * 2].copy_from_slice(&unit.to_le_bytes());
            }
            set.push(name_entry);
        }

        let checksum = entry_set_checksum(&set);
        set[0][2..4].copy_from_slice(&checksum.to_le_bytes());
        set
    }

    /// Finish the image: boot sector, allocation bitmap and up-case table.
    pub fn build(mut self, root_cluster: u32) -> Vec<u8> {
        // Boot sector
        let mut boot = [0u8; 512];
        boot[0..3].copy_from_slice(&[0xEB, 0x76, 0x90]);
        boot[3..11].copy_from_slice(b"EXFAT   ");
        boot[0x48..0x50].copy_from_slice(&(VOLUME_BLOCKS as u64).to_le_bytes());
        boot[0x50..0x54].copy_from_slice(&(FAT_START_BLOCK as u32).to_le_bytes());
        boot[0x54..0x58].copy_from_slice(&2u32.to_le_bytes());
        boot[0x58..0x5C].copy_from_slice(&(HEAP_START_BLOCK as u32).to_le_bytes());
        boot[0x5C..0x60].copy_from_slice(&CLUSTER_COUNT.to_le_bytes());
        boot[0x60..0x64].copy_from_slice(&root_cluster.to_le_bytes());
        boot[0x64..0x68].copy_from_slice(&0xDEAD_BEEFu32.to_le_bytes());
        boot[0x68] = 0; // version minor
        boot[0x69] = 1; // version major
        boot[0x6C] = 9; // 512-byte blocks
        boot[0x6D] = 0; // one block per cluster
        boot[0x6E] = 1; // one FAT
        boot[0x6F] = 0x80;
        boot[0x70] = 0xFF;
        boot[510] = 0x55;
        boot[511] = 0xAA;
        self.image[0..512].copy_from_slice(&boot);

        // Allocation bitmap
        let bitmap_offset = Self::cluster_offset(BITMAP_CLUSTER);
        for &cluster in &self.used {
            let bit = (cluster - 2) as usize;
            self.image[bitmap_offset + bit / 8] |= 1 << (bit % 8);
        }

        // Up-case table
        let table = Self::upcase_table_bytes();
        let upcase_offset = Self::cluster_offset(UPCASE_CLUSTER);
        self.image[upcase_offset..upcase_offset + table.len()].copy_from_slice(&table);

        self.image
    }

    /// How many clusters the image uses once built.
    pub fn used_cluster_count(&self) -> u64 {
        self.used.len() as u64
    }
}

fn fold_ascii(unit: u16) -> u16 {
    if (0x61..=0x7A).contains(&unit) {
        unit - 0x20
    } else {
        unit
    }
}

/// The format's 16-bit name hash: up-case each unit, then fold in its low
/// byte and high byte.
fn name_hash(units: &[u16]) -> u16 {
    let mut hash = 0u16;
    for &unit in units {
        let upper = if unit < UPCASE_CHARS { fold_ascii(unit) } else { unit };
        hash = hash.rotate_right(1).wrapping_add(upper & 0x00FF);
        hash = hash.rotate_right(1).wrapping_add(upper >> 8);
    }
    hash
}

/// The format's 16-bit entry set checksum, skipping the checksum's own two
/// bytes in the first entry.
pub fn entry_set_checksum(entries: &[[u8; 32]]) -> u16 {
    let mut sum = 0u16;
    for (entry_index, entry) in entries.iter().enumerate() {
        for (i, &byte) in entry.iter().enumerate() {
            if entry_index == 0 && (i == 2 || i == 3) {
                continue;
            }
            sum = sum.rotate_right(1).wrapping_add(u16::from(byte));
        }
    }
    sum
}

/// Deterministic junk to fill test files with.
pub fn test_content(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
        .collect()
}

/// A raw exFAT date field.
pub fn fat_date(year: u16, month: u16, day: u16) -> u16 {
    ((year - 1980) << 9) | (month << 5) | day
}

/// A raw exFAT time field.
pub fn fat_time(hours: u16, minutes: u16, seconds: u16) -> u16 {
    (hours << 11) | (minutes << 5) | (seconds / 2)
}

/// The disk most of the tests share:
///
/// ```console
/// $ ls -l /Volumes/P-EXFAT
/// -rwxrwxrwx  README.TXT    258 bytes, one cluster
/// -rwxrwxrwx  EMPTY.DAT       0 bytes
/// -rwxrwxrwx  FRAG.DAT     1337 bytes over three non-consecutive clusters
/// -rwxrwxrwx  CONTIG.DAT   1400 bytes, contiguous, no FAT chain
/// drwxrwxrwx  TEST
/// -rwxrwxrwx  BADDATE.DAT     0 bytes, unparseable modification date
/// $ ls -l /Volumes/P-EXFAT/TEST
/// -rwxrwxrwx  TEST.DAT     3500 bytes, seven clusters
/// ```
pub struct StandardDisk {
    pub image: Vec<u8>,
    pub root_cluster: u32,
    pub test_dir_cluster: u32,
    pub used_clusters: u64,
}

pub fn make_standard_disk() -> StandardDisk {
    // So RUST_LOG=debug shows what the driver is doing with our disk
    let _ = env_logger::builder().is_test(true).try_init();

    let mut builder = DiskBuilder::new();

    let readme_clusters = builder.alloc_chain(1, 1);
    builder.write_data(&readme_clusters, &test_content(258, 1));

    let frag_clusters = builder.alloc_chain(3, 2);
    builder.write_data(&frag_clusters, &test_content(1337, 2));

    let test_dat_clusters = builder.alloc_chain(7, 1);
    builder.write_data(&test_dat_clusters, &test_content(3500, 3));

    let contig_clusters = builder.alloc_contiguous(3);
    builder.write_data(&contig_clusters, &test_content(1400, 4));

    let mut test_dir = Vec::new();
    test_dir.extend(DiskBuilder::file_entry_set(
        "TEST.DAT",
        test_dat_clusters[0],
        3500,
        false,
        embedded_exfat::Attributes::ARCHIVE,
        (fat_date(2018, 12, 9), fat_time(19, 21, 2)),
        (fat_date(2018, 12, 9), fat_time(19, 22, 12)),
    ));
    let (test_dir_cluster, test_dir_size) = builder.write_directory(&test_dir);

    let mut root = Vec::new();
    root.push(DiskBuilder::bitmap_entry());
    root.push(DiskBuilder::upcase_entry());
    root.push(DiskBuilder::label_entry("P-EXFAT"));
    root.extend(DiskBuilder::file_entry_set(
        "README.TXT",
        readme_clusters[0],
        258,
        true,
        embedded_exfat::Attributes::ARCHIVE,
        (fat_date(2018, 12, 9), fat_time(19, 22, 34)),
        (fat_date(2018, 12, 9), fat_time(19, 22, 34)),
    ));
    root.extend(DiskBuilder::file_entry_set(
        "EMPTY.DAT",
        0,
        0,
        false,
        embedded_exfat::Attributes::ARCHIVE,
        (fat_date(2018, 12, 9), fat_time(19, 21, 16)),
        (fat_date(2018, 12, 9), fat_time(19, 21, 16)),
    ));
    root.extend(DiskBuilder::file_entry_set(
        "FRAG.DAT",
        frag_clusters[0],
        1337,
        false,
        embedded_exfat::Attributes::ARCHIVE,
        (fat_date(2018, 12, 9), fat_time(19, 21, 38)),
        (fat_date(2018, 12, 9), fat_time(19, 21, 38)),
    ));
    root.extend(DiskBuilder::file_entry_set(
        "CONTIG.DAT",
        contig_clusters[0],
        1400,
        true,
        embedded_exfat::Attributes::ARCHIVE,
        (fat_date(2018, 12, 9), fat_time(19, 21, 52)),
        (fat_date(2018, 12, 9), fat_time(19, 21, 52)),
    ));
    root.extend(DiskBuilder::file_entry_set(
        "TEST",
        test_dir_cluster,
        test_dir_size,
        false,
        embedded_exfat::Attributes::DIRECTORY,
        (fat_date(2018, 12, 9), fat_time(19, 23, 16)),
        (fat_date(2018, 12, 9), fat_time(19, 23, 16)),
    ));
    root.extend(DiskBuilder::file_entry_set(
        "BADDATE.DAT",
        0,
        0,
        false,
        embedded_exfat::Attributes::ARCHIVE,
        (fat_date(2003, 4, 4), fat_time(13, 30, 4)),
        // month 13 does not exist
        (fat_date(1980, 13, 4), fat_time(13, 30, 4)),
    ));
    let (root_cluster, _) = builder.write_directory(&root);
    let used_clusters = builder.used_cluster_count();
    StandardDisk {
        image: builder.build(root_cluster),
        root_cluster,
        test_dir_cluster,
        used_clusters,
    }
}

// ****************************************************************************
//
// End Of File
//
// ****************************************************************************
