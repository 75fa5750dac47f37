//! Built-in filter attributes, grouped into dialects

use crate::attribute::{
    AttributeSpec, COMPARISON_OPERATORS, EQUALITY_OPERATORS, ValueRule,
};
use crate::operator::Operator;

/// Operating systems supported by the Falcon sensor
pub const PLATFORMS: &[&str] = &["Linux", "Mac", "Windows"];

/// Base commands understood by Real Time Response
pub const RTR_BASE_COMMANDS: &[&str] = &[
    "cat",
    "cd",
    "clear",
    "cp",
    "csrutil",
    "cswindiag",
    "encrypt",
    "env",
    "eventlog",
    "filehash",
    "get",
    "getsid",
    "history",
    "ifconfig",
    "ipconfig",
    "kill",
    "ls",
    "map",
    "memdump",
    "mkdir",
    "mount",
    "mv",
    "netstat",
    "ps",
    "put",
    "put-and-run",
    "reg",
    "restart",
    "rm",
    "run",
    "runscript",
    "shutdown",
    "tar",
    "umount",
    "unmap",
    "update",
    "users",
    "xmemdump",
    "zip",
];

const fn free(
    name: &'static str,
    fql: &'static str,
    description: &'static str,
    example: &'static str,
) -> AttributeSpec {
    AttributeSpec {
        name,
        fql,
        description,
        example: Some(example),
        rule: ValueRule::Free,
        accepts_list: true,
        operators: EQUALITY_OPERATORS,
        default_operator: Operator::Equal,
    }
}

const fn timestamp(
    name: &'static str,
    fql: &'static str,
    description: &'static str,
    example: &'static str,
) -> AttributeSpec {
    AttributeSpec {
        name,
        fql,
        description,
        example: Some(example),
        rule: ValueRule::Timestamp,
        accepts_list: false,
        operators: COMPARISON_OPERATORS,
        default_operator: Operator::GreaterOrEqual,
    }
}

// ============== Common ==============

pub static NAME: AttributeSpec = free(
    "Name",
    "name",
    "Filter by name.",
    "This filter accepts a name, such as a group or policy name.",
);

// ============== Hosts ==============

pub static HOST_CONTAINED: AttributeSpec = AttributeSpec {
    name: "Contained",
    fql: "status",
    description: "Filter by a host's network containment status.",
    example: None,
    rule: ValueRule::Mapped(&[
        ("Contained", "contained"),
        ("Containment Pending", "containment_pending"),
        ("Not Contained", "normal"),
    ]),
    accepts_list: true,
    operators: EQUALITY_OPERATORS,
    default_operator: Operator::Equal,
};

pub static HOST_CONNECTION_STATUS: AttributeSpec = AttributeSpec {
    name: "ConnectionStatus",
    fql: "connection_status",
    description: "Filter by whether a host is connected to the Falcon cloud.",
    example: Some(
        "This filter accepts a connection status: Online or Offline. \
         For example: Online",
    ),
    rule: ValueRule::Options(&["Online", "Offline"]),
    accepts_list: true,
    operators: EQUALITY_OPERATORS,
    default_operator: Operator::Equal,
};

pub static HOST_DOMAIN: AttributeSpec = free(
    "Domain",
    "machine_domain",
    "Filter by a host's Active Directory domain.",
    "This filter accepts a domain name, such as GOODDOMAIN or gooddomain.company.com",
);

pub static HOST_GROUP_ID: AttributeSpec = free(
    "GroupID",
    "groups",
    "Filter by the ID of a host group.",
    "This filter accepts a Host Group ID, which is a 32-character hexadecimal \
     string. Multiple IDs can be given as a comma delimited list.",
);

pub static HOST_HOSTNAME: AttributeSpec = free(
    "Hostname",
    "hostname",
    "Filter by host name.",
    "This filter accepts a hostname, such as DC01 or web-server-01",
);

pub static HOST_LAST_SEEN: AttributeSpec = timestamp(
    "LastSeen",
    "last_seen",
    "Filter by the time a host last communicated with the Falcon cloud.",
    "This filter accepts two types of parameter: a fixed ISO 8601 timestamp \
     (such as 2020-01-01T01:00:00Z), or a relative timestamp such as -30m. \
     -30m will filter for hosts last seen within the last 30 minutes, so is \
     best combined with an operator such as GTE.",
);

pub static HOST_FIRST_SEEN: AttributeSpec = timestamp(
    "FirstSeen",
    "first_seen",
    "Filter by the time a host first communicated with the Falcon cloud.",
    "This filter accepts two types of parameter: a fixed ISO 8601 timestamp \
     (such as 2020-01-01T01:00:00Z), or a relative timestamp such as -30m. \
     -30m will filter for hosts first seen within the last 30 minutes, so is \
     best combined with an operator such as GTE.",
);

pub static HOST_LOCAL_IP: AttributeSpec = free(
    "LocalIP",
    "local_ip",
    "Filter by a host's internal IP address.",
    "This filter accepts a local IPv4 address, such as 192.168.1.10",
);

pub static HOST_OS: AttributeSpec = AttributeSpec {
    name: "OS",
    fql: "platform_name",
    description: "Filter by host operating system type.",
    example: None,
    rule: ValueRule::Options(PLATFORMS),
    accepts_list: true,
    operators: EQUALITY_OPERATORS,
    default_operator: Operator::Equal,
};

pub static HOST_OS_VERSION: AttributeSpec = free(
    "OSVersion",
    "os_version",
    "Filter by operating system version.",
    "This filter accepts an OS version string, such as Windows 10 or Catalina (10.15)",
);

pub static HOST_ROLE: AttributeSpec = AttributeSpec {
    name: "Role",
    fql: "product_type_desc",
    description: "Filter by host role.",
    example: None,
    rule: ValueRule::Mapped(&[
        ("DC", "Domain Controller"),
        ("Server", "Server"),
        ("Workstation", "Workstation"),
    ]),
    accepts_list: true,
    operators: EQUALITY_OPERATORS,
    default_operator: Operator::Equal,
};

pub static HOST_SITE: AttributeSpec = free(
    "Site",
    "site_name",
    "Filter by Active Directory site.",
    "This filter accepts an AD site name, such as Default-First-Site-Name",
);

pub static HOST_TAG: AttributeSpec = free(
    "Tag",
    "tags",
    "Filter by sensor or Falcon grouping tag.",
    "This filter accepts a tag, such as FalconGroupingTags/Production",
);

pub static HOST_OU: AttributeSpec = free(
    "OU",
    "ou",
    "Filter by Active Directory organisational unit.",
    "This filter accepts an OU name, such as Domain Controllers",
);

// ============== RTR ==============

pub static RTR_COMMAND: AttributeSpec = AttributeSpec {
    name: "Command",
    fql: "base_command",
    description: "Filter by the base command of an RTR session entry.",
    example: None,
    rule: ValueRule::Options(RTR_BASE_COMMANDS),
    accepts_list: false,
    operators: EQUALITY_OPERATORS,
    default_operator: Operator::Equal,
};

// ============== Users ==============

pub static USER_ASSIGNED_CIDS: AttributeSpec = free(
    "AssignedCIDs",
    "assigned_cids",
    "Filter by the CIDs a user is assigned to.",
    "This filter accepts a CID, such as 0123456789abcdef0123456789abcdef",
);

pub static USER_CID: AttributeSpec = free(
    "CID",
    "cid",
    "Filter by a user's home CID.",
    "This filter accepts a CID, such as 0123456789abcdef0123456789abcdef",
);

pub static USER_FIRST_NAME: AttributeSpec = free(
    "FirstName",
    "first_name",
    "Filter by a user's first name.",
    "This filter accepts a first name, such as Alice",
);

pub static USER_LAST_NAME: AttributeSpec = free(
    "LastName",
    "last_name",
    "Filter by a user's last name.",
    "This filter accepts a last name, such as Smith",
);

pub static USER_NAME: AttributeSpec = free(
    "Name",
    "name",
    "Filter by a user's full name.",
    "This filter accepts a full name, such as Alice Smith",
);

static COMMON_ATTRIBUTES: &[&AttributeSpec] = &[&NAME];

static HOST_ATTRIBUTES: &[&AttributeSpec] = &[
    &NAME,
    &HOST_CONTAINED,
    &HOST_CONNECTION_STATUS,
    &HOST_DOMAIN,
    &HOST_GROUP_ID,
    &HOST_HOSTNAME,
    &HOST_LAST_SEEN,
    &HOST_FIRST_SEEN,
    &HOST_LOCAL_IP,
    &HOST_OS,
    &HOST_OS_VERSION,
    &HOST_ROLE,
    &HOST_SITE,
    &HOST_TAG,
    &HOST_OU,
];

static RTR_ATTRIBUTES: &[&AttributeSpec] = &[&NAME, &RTR_COMMAND];

static USER_ATTRIBUTES: &[&AttributeSpec] = &[
    &USER_ASSIGNED_CIDS,
    &USER_CID,
    &USER_FIRST_NAME,
    &USER_LAST_NAME,
    &USER_NAME,
];

/// Set of attributes available to a filter
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Dialect {
    Generic,
    #[default]
    Hosts,
    Rtr,
    Users,
}

impl Dialect {
    pub fn attributes(&self) -> &'static [&'static AttributeSpec] {
        match self {
            Dialect::Generic => COMMON_ATTRIBUTES,
            Dialect::Hosts => HOST_ATTRIBUTES,
            Dialect::Rtr => RTR_ATTRIBUTES,
            Dialect::Users => USER_ATTRIBUTES,
        }
    }

    /// Look up an attribute by its filter name
    pub fn find(&self, name: &str) -> Option<&'static AttributeSpec> {
        self.attributes().iter().copied().find(|spec| spec.name == name)
    }
}

impl std::str::FromStr for Dialect {
    type Err = crate::error::FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "generic" | "common" => Ok(Dialect::Generic),
            "hosts" => Ok(Dialect::Hosts),
            "rtr" => Ok(Dialect::Rtr),
            "users" => Ok(Dialect::Users),
            other => Err(crate::error::FilterError::UnknownDialect(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_lookup() {
        assert_eq!(Dialect::Hosts.find("Hostname").unwrap().fql, "hostname");
        assert!(Dialect::Users.find("Hostname").is_none());
        assert_eq!(Dialect::Users.find("Name").unwrap().fql, "name");
        assert!(Dialect::Rtr.find("Command").is_some());
    }

    #[test]
    fn test_attribute_names_unique_per_dialect() {
        for dialect in [Dialect::Generic, Dialect::Hosts, Dialect::Rtr, Dialect::Users] {
            let mut names: Vec<&str> = dialect.attributes().iter().map(|a| a.name).collect();
            let total = names.len();
            names.sort_unstable();
            names.dedup();
            assert_eq!(names.len(), total, "{dialect:?}");
        }
    }

    #[test]
    fn test_parse_dialect() {
        assert_eq!("hosts".parse::<Dialect>().unwrap(), Dialect::Hosts);
        assert_eq!("RTR".parse::<Dialect>().unwrap(), Dialect::Rtr);
        assert!("intel".parse::<Dialect>().is_err());
    }
}
