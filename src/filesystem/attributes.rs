/// Indicates whether a directory entry is read-only, a directory, a volume
/// label, etc.
#[cfg_attr(feature = "defmt-log", derive(defmt::Format))]
#[derive(Copy, Clone, PartialOrd, Ord, PartialEq, Eq)]
pub struct Attributes(pub(crate) u16);

impl Attributes {
    /// Indicates this file cannot be written.
    pub const READ_ONLY: u16 = 0x0001;
    /// Indicates the file is hidden.
    pub const HIDDEN: u16 = 0x0002;
    /// Indicates this is a system file.
    pub const SYSTEM: u16 = 0x0004;
    /// Indicates this is a volume label.
    pub const VOLUME: u16 = 0x0008;
    /// Indicates this is a directory.
    pub const DIRECTORY: u16 = 0x0010;
    /// Indicates this file needs archiving (i.e. has been modified since last
    /// archived).
    pub const ARCHIVE: u16 = 0x0020;

    /// Create an `Attributes` value from the `u16` stored in an exFAT file
    /// directory entry.
    pub(crate) fn create_from_exfat(value: u16) -> Attributes {
        Attributes(value)
    }

    /// Does this file have the read-only attribute set?
    pub fn is_read_only(self) -> bool {
        (self.0 & Self::READ_ONLY) == Self::READ_ONLY
    }

    /// Does this file have the hidden attribute set?
    pub fn is_hidden(self) -> bool {
        (self.0 & Self::HIDDEN) == Self::HIDDEN
    }

    /// Does this file have the system attribute set?
    pub fn is_system(self) -> bool {
        (self.0 & Self::SYSTEM) == Self::SYSTEM
    }

    /// Does this file have the volume attribute set?
    pub fn is_volume(self) -> bool {
        (self.0 & Self::VOLUME) == Self::VOLUME
    }

    /// Does this entry point at a directory?
    pub fn is_directory(self) -> bool {
        (self.0 & Self::DIRECTORY) == Self::DIRECTORY
    }

    /// Does this need archiving?
    pub fn is_archive(self) -> bool {
        (self.0 & Self::ARCHIVE) == Self::ARCHIVE
    }
}

impl core::fmt::Debug for Attributes {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        if self.is_directory() {
            write!(f, "D")?;
        } else {
            write!(f, "F")?;
        }
        if self.is_read_only() {
            write!(f, "R")?;
        }
        if self.is_hidden() {
            write!(f, "H")?;
        }
        if self.is_system() {
            write!(f, "S")?;
        }
        if self.is_volume() {
            write!(f, "V")?;
        }
        if self.is_archive() {
            write!(f, "A")?;
        }
        Ok(())
    }
}

// ****************************************************************************
//
// End Of File
//
// ****************************************************************************
