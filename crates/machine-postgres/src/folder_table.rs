use machine_domain::{DomainError, DomainResult, Folder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Text,
    Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnType,
    /// Store-managed columns can be filtered and projected but never assigned
    pub assignable: bool,
}

const fn integer(name: &'static str) -> Column {
    Column {
        name,
        kind: ColumnType::Integer,
        assignable: true,
    }
}

const fn text(name: &'static str) -> Column {
    Column {
        name,
        kind: ColumnType::Text,
        assignable: true,
    }
}

const fn timestamp(name: &'static str) -> Column {
    Column {
        name,
        kind: ColumnType::Timestamp,
        assignable: true,
    }
}

const ID: Column = Column {
    name: "id",
    kind: ColumnType::Integer,
    assignable: false,
};
const ACTIVE: Column = text("active");
const CREATED_AT: Column = Column {
    name: "created_at",
    kind: ColumnType::Timestamp,
    assignable: false,
};
const UPDATED_AT: Column = Column {
    name: "updated_at",
    kind: ColumnType::Timestamp,
    assignable: false,
};

/// Backing table of a folder with its known columns
#[derive(Debug)]
pub struct FolderTable {
    pub folder: Folder,
    pub table: &'static str,
    pub columns: &'static [Column],
}

static MACHINE_TYPES: FolderTable = FolderTable {
    folder: Folder::MachineType,
    table: "machine_types",
    columns: &[ID, text("objecttype"), text("description"), ACTIVE, CREATED_AT, UPDATED_AT],
};

static MACHINE_GROUPS: FolderTable = FolderTable {
    folder: Folder::MachineGroup,
    table: "machine_groups",
    columns: &[
        ID,
        integer("machinetypeid"),
        text("groupname"),
        text("description"),
        ACTIVE,
        CREATED_AT,
        UPDATED_AT,
    ],
};

static MACHINE_IDS: FolderTable = FolderTable {
    folder: Folder::MachineId,
    table: "machine_ids",
    columns: &[
        ID,
        integer("machinegroupid"),
        text("machinecode"),
        text("machinename"),
        text("description"),
        ACTIVE,
        CREATED_AT,
        UPDATED_AT,
    ],
};

static MACHINE_DETAILS: FolderTable = FolderTable {
    folder: Folder::MachineDetail,
    table: "machine_details",
    columns: &[
        ID,
        integer("machineid"),
        integer("vendorid"),
        text("serialnumber"),
        integer("manufactureyear"),
        timestamp("purchasedate"),
        text("location"),
        text("latitude"),
        text("longitude"),
        text("description"),
        ACTIVE,
        CREATED_AT,
        UPDATED_AT,
    ],
};

static MACHINE_PROFILES: FolderTable = FolderTable {
    folder: Folder::MachineProfile,
    table: "machine_profiles",
    columns: &[
        ID,
        integer("machinedetailid"),
        text("profilename"),
        text("photourl"),
        text("specification"),
        ACTIVE,
        CREATED_AT,
        UPDATED_AT,
    ],
};

static MACHINE_RECORDS: FolderTable = FolderTable {
    folder: Folder::MachineRecord,
    table: "machine_records",
    columns: &[
        ID,
        integer("machineid"),
        text("recordtype"),
        timestamp("recordedat"),
        text("notes"),
        ACTIVE,
        CREATED_AT,
        UPDATED_AT,
    ],
};

static MACHINE_PRODUCTIVITY: FolderTable = FolderTable {
    folder: Folder::MachineProductivity,
    table: "machine_productivity",
    columns: &[
        ID,
        integer("machineid"),
        timestamp("productiondate"),
        integer("quantity"),
        integer("uptimeminutes"),
        integer("downtimeminutes"),
        text("notes"),
        ACTIVE,
        CREATED_AT,
        UPDATED_AT,
    ],
};

static VENDORS: FolderTable = FolderTable {
    folder: Folder::Vendor,
    table: "vendors",
    columns: &[
        ID,
        text("vendorname"),
        text("address"),
        text("phone"),
        text("email"),
        ACTIVE,
        CREATED_AT,
        UPDATED_AT,
    ],
};

impl FolderTable {
    pub fn for_folder(folder: Folder) -> &'static FolderTable {
        match folder {
            Folder::MachineType => &MACHINE_TYPES,
            Folder::MachineGroup => &MACHINE_GROUPS,
            Folder::MachineId => &MACHINE_IDS,
            Folder::MachineDetail => &MACHINE_DETAILS,
            Folder::MachineProfile => &MACHINE_PROFILES,
            Folder::MachineRecord => &MACHINE_RECORDS,
            Folder::MachineProductivity => &MACHINE_PRODUCTIVITY,
            Folder::Vendor => &VENDORS,
        }
    }

    /// Resolves a client-supplied column name against the whitelist
    pub fn column(&self, name: &str) -> DomainResult<&'static Column> {
        let wanted = name.trim();
        self.columns
            .iter()
            .find(|column| column.name.eq_ignore_ascii_case(wanted))
            .ok_or_else(|| DomainError::UnknownColumn {
                folder: self.folder.to_string(),
                column: name.to_string(),
            })
    }

    pub fn position(&self, name: &str) -> usize {
        self.columns
            .iter()
            .position(|column| column.name == name)
            .unwrap_or(usize::MAX)
    }

    pub fn column_list(columns: &[&Column]) -> String {
        columns
            .iter()
            .map(|column| column.name)
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn all_columns(&self) -> Vec<&'static Column> {
        self.columns.iter().collect()
    }
}
