//! Byte-addressed reads from a block device.

use byteorder::{ByteOrder, LittleEndian};

use crate::{Block, BlockDevice, BlockIdx, Error};

/// Little-endian primitive reads at arbitrary byte offsets, backed by a
/// single-block cache.
///
/// exFAT addresses most of its metadata (FAT entries, bitmap bytes, up-case
/// units, directory records) by byte offset, and the structures are dense, so
/// a one-block cache turns a run of neighbouring reads into a single device
/// transfer.
pub(crate) struct DeviceAccess {
    block: Block,
    block_idx: Option<BlockIdx>,
}

impl DeviceAccess {
    pub fn new() -> DeviceAccess {
        DeviceAccess {
            block: Block::new(),
            block_idx: None,
        }
    }

    /// Fetch the block holding the given byte offset, and where in that
    /// block the offset lands.
    fn block_for<D>(
        &mut self,
        block_device: &D,
        offset: u64,
        reason: &str,
    ) -> Result<(&Block, usize), Error<D::Error>>
    where
        D: BlockDevice,
    {
        let this_block = BlockIdx((offset / Block::LEN_U64) as u32);
        if Some(this_block) != self.block_idx {
            self.block_idx = None;
            block_device
                .read(core::slice::from_mut(&mut self.block), this_block, reason)
                .map_err(Error::DeviceError)?;
            self.block_idx = Some(this_block);
        }
        Ok((&self.block, (offset % Block::LEN_U64) as usize))
    }

    pub fn read_u8<D>(
        &mut self,
        block_device: &D,
        offset: u64,
        reason: &str,
    ) -> Result<u8, Error<D::Error>>
    where
        D: BlockDevice,
    {
        let (block, block_offset) = self.block_for(block_device, offset, reason)?;
        Ok(block[block_offset])
    }

    pub fn read_u16<D>(
        &mut self,
        block_device: &D,
        offset: u64,
        reason: &str,
    ) -> Result<u16, Error<D::Error>>
    where
        D: BlockDevice,
    {
        let mut buffer = [0u8; 2];
        self.read_exact(block_device, offset, &mut buffer, reason)?;
        Ok(LittleEndian::read_u16(&buffer))
    }

    pub fn read_u32<D>(
        &mut self,
        block_device: &D,
        offset: u64,
        reason: &str,
    ) -> Result<u32, Error<D::Error>>
    where
        D: BlockDevice,
    {
        let mut buffer = [0u8; 4];
        self.read_exact(block_device, offset, &mut buffer, reason)?;
        Ok(LittleEndian::read_u32(&buffer))
    }

    /// Fill the whole buffer from the device, starting at the given byte
    /// offset. Reads that span several blocks are streamed one block at a
    /// time.
    pub fn read_exact<D>(
        &mut self,
        block_device: &D,
        offset: u64,
        buffer: &mut [u8],
        reason: &str,
    ) -> Result<(), Error<D::Error>>
    where
        D: BlockDevice,
    {
        let mut offset = offset;
        let mut copied = 0;
        while copied < buffer.len() {
            let (block, block_offset) = self.block_for(block_device, offset, reason)?;
            let this_copy = (Block::LEN - block_offset).min(buffer.len() - copied);
            buffer[copied..copied + this_copy]
                .copy_from_slice(&block[block_offset..block_offset + this_copy]);
            copied += this_copy;
            offset += this_copy as u64;
        }
        Ok(())
    }
}

// ****************************************************************************
//
// End Of File
//
// ****************************************************************************
