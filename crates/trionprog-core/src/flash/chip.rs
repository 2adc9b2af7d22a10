//! Known configuration memories

/// A known flash part
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChipInfo {
    /// Value returned by the manufacturer/device ID command
    pub id: u16,
    /// Vendor and part name
    pub name: &'static str,
}

/// Parts seen on supported boards, keyed by `read_device_id()` value
pub const KNOWN_CHIPS: &[ChipInfo] = &[ChipInfo {
    id: 0x13C8,
    name: "GigaDevices GD25Q80E",
}];

impl ChipInfo {
    /// Look up a device ID
    pub fn lookup(id: u16) -> Option<&'static ChipInfo> {
        KNOWN_CHIPS.iter().find(|c| c.id == id)
    }

    /// Name for a device ID, "Unknown" if not in the table
    pub fn name_for(id: u16) -> &'static str {
        Self::lookup(id).map_or("Unknown", |c| c.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(ChipInfo::name_for(0x13C8), "GigaDevices GD25Q80E");
        assert_eq!(ChipInfo::name_for(0xFFFF), "Unknown");
        assert!(ChipInfo::lookup(0x0000).is_none());
    }
}
