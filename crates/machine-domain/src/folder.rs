use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;

/// Entity selector carried in the envelope `folder` field
///
/// Each folder maps 1:1 to a backing table in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Folder {
    MachineType,
    MachineGroup,
    MachineId,
    MachineDetail,
    MachineProfile,
    MachineRecord,
    MachineProductivity,
    Vendor,
}

impl Folder {
    pub const ALL: [Folder; 8] = [
        Folder::MachineType,
        Folder::MachineGroup,
        Folder::MachineId,
        Folder::MachineDetail,
        Folder::MachineProfile,
        Folder::MachineRecord,
        Folder::MachineProductivity,
        Folder::Vendor,
    ];

    /// Wire name, as it appears in the envelope
    pub fn name(&self) -> &'static str {
        match self {
            Folder::MachineType => "MACHINETYPE",
            Folder::MachineGroup => "MACHINEGROUP",
            Folder::MachineId => "MACHINEID",
            Folder::MachineDetail => "MACHINEDETAIL",
            Folder::MachineProfile => "MACHINEPROFILE",
            Folder::MachineRecord => "MACHINERECORD",
            Folder::MachineProductivity => "MACHINEPRODUCTIVITY",
            Folder::Vendor => "VENDOR",
        }
    }
}

impl fmt::Display for Folder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Case-insensitive, so REST path segments like `machinetype` resolve too
impl FromStr for Folder {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Folder::ALL
            .into_iter()
            .find(|folder| folder.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DomainError::UnknownEntity(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wire_names() {
        for folder in Folder::ALL {
            assert_eq!(folder.name().parse::<Folder>().unwrap(), folder);
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("machinetype".parse::<Folder>().unwrap(), Folder::MachineType);
        assert_eq!("Vendor".parse::<Folder>().unwrap(), Folder::Vendor);
    }

    #[test]
    fn test_unknown_folder() {
        let err = "NOPE".parse::<Folder>().unwrap_err();
        assert!(matches!(err, DomainError::UnknownEntity(name) if name == "NOPE"));
    }
}
