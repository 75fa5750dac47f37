//! Real Time Response constants and command permissions

use std::fmt;
use std::str::FromStr;

use crate::error::{CaracaraError, Result};

/// Maximum number of devices in a single batch session
pub const MAX_BATCH_SESSION_HOSTS: usize = 10_000;

/// Maximum number of batch sessions driven concurrently
pub const MAX_BATCH_SESSION_THREADS: usize = 3;

/// Lifetime of an RTR session in seconds
pub const SESSION_EXPIRY: u64 = 600;

/// Sessions are refreshed when fewer than this many seconds remain
pub const SESSION_REFRESH_TIMEOUT: u64 = 180;

/// Default RTR command timeout in seconds
pub const DEFAULT_TIMEOUT: u64 = 30;

/// RTR role required to run a command
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PermissionLevel {
    ReadOnly,
    ActiveResponder,
    Admin,
}

impl PermissionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionLevel::ReadOnly => "read_only",
            PermissionLevel::ActiveResponder => "active_responder",
            PermissionLevel::Admin => "admin",
        }
    }

    /// Batch command endpoint serving this permission level
    pub fn batch_endpoint(&self) -> &'static str {
        match self {
            PermissionLevel::ReadOnly => "/real-time-response/combined/batch-command/v1",
            PermissionLevel::ActiveResponder => {
                "/real-time-response/combined/batch-active-responder-command/v1"
            }
            PermissionLevel::Admin => "/real-time-response/combined/batch-admin-command/v1",
        }
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionLevel {
    type Err = CaracaraError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "read_only" => Ok(PermissionLevel::ReadOnly),
            "active_responder" => Ok(PermissionLevel::ActiveResponder),
            "admin" => Ok(PermissionLevel::Admin),
            other => Err(CaracaraError::InvalidPermissionLevel(other.to_string())),
        }
    }
}

/// Permission required by a base command
#[derive(Clone, Copy, Debug)]
pub enum CommandPermission {
    Fixed(PermissionLevel),
    /// Depends on the first parameter, e.g. `reg query` or `runscript -CloudFile=...`
    ByParameter {
        default: PermissionLevel,
        overrides: &'static [(&'static str, PermissionLevel)],
    },
}

use PermissionLevel::{ActiveResponder, Admin, ReadOnly};

/// Permission table for every RTR base command
pub const RTR_COMMANDS: &[(&str, CommandPermission)] = &[
    ("cat", CommandPermission::Fixed(ReadOnly)),
    ("cd", CommandPermission::Fixed(ReadOnly)),
    ("clear", CommandPermission::Fixed(ReadOnly)),
    ("cp", CommandPermission::Fixed(ActiveResponder)),
    ("csrutil", CommandPermission::Fixed(ReadOnly)),
    ("cswindiag", CommandPermission::Fixed(Admin)),
    ("encrypt", CommandPermission::Fixed(ActiveResponder)),
    ("env", CommandPermission::Fixed(ReadOnly)),
    ("eventlog", CommandPermission::Fixed(ReadOnly)),
    ("filehash", CommandPermission::Fixed(ReadOnly)),
    ("get", CommandPermission::Fixed(ActiveResponder)),
    ("getsid", CommandPermission::Fixed(ReadOnly)),
    ("history", CommandPermission::Fixed(ReadOnly)),
    ("ifconfig", CommandPermission::Fixed(ReadOnly)),
    ("ipconfig", CommandPermission::Fixed(ReadOnly)),
    ("kill", CommandPermission::Fixed(ActiveResponder)),
    ("ls", CommandPermission::Fixed(ReadOnly)),
    ("map", CommandPermission::Fixed(ActiveResponder)),
    ("memdump", CommandPermission::Fixed(ActiveResponder)),
    ("mkdir", CommandPermission::Fixed(ActiveResponder)),
    ("mount", CommandPermission::Fixed(ReadOnly)),
    ("mv", CommandPermission::Fixed(ActiveResponder)),
    ("netstat", CommandPermission::Fixed(ReadOnly)),
    ("ps", CommandPermission::Fixed(ReadOnly)),
    ("put", CommandPermission::Fixed(Admin)),
    ("put-and-run", CommandPermission::Fixed(Admin)),
    (
        "reg",
        CommandPermission::ByParameter {
            default: ActiveResponder,
            overrides: &[("query", ReadOnly)],
        },
    ),
    ("restart", CommandPermission::Fixed(ActiveResponder)),
    ("rm", CommandPermission::Fixed(ActiveResponder)),
    ("run", CommandPermission::Fixed(Admin)),
    (
        "runscript",
        CommandPermission::ByParameter {
            default: Admin,
            overrides: &[
                ("-Raw", Admin),
                ("-CloudFile", ActiveResponder),
                ("-HostPath", Admin),
            ],
        },
    ),
    ("shutdown", CommandPermission::Fixed(ActiveResponder)),
    ("tar", CommandPermission::Fixed(ActiveResponder)),
    ("umount", CommandPermission::Fixed(ActiveResponder)),
    ("unmap", CommandPermission::Fixed(ActiveResponder)),
    ("update", CommandPermission::Fixed(ActiveResponder)),
    ("users", CommandPermission::Fixed(ReadOnly)),
    ("xmemdump", CommandPermission::Fixed(ActiveResponder)),
    ("zip", CommandPermission::Fixed(ActiveResponder)),
];

/// Look up the permission entry for a base command
pub fn command_permission(base_command: &str) -> Option<CommandPermission> {
    RTR_COMMANDS
        .iter()
        .find(|(name, _)| *name == base_command)
        .map(|(_, permission)| *permission)
}

/// Split a command string into its base command and required permission level
pub fn permission_level(command_string: &str) -> Result<(&str, PermissionLevel)> {
    let mut parts = command_string.split(' ');
    let base_command = parts.next().unwrap_or_default();

    let permission = command_permission(base_command)
        .ok_or_else(|| CaracaraError::InvalidRtrCommand(base_command.to_string()))?;

    let level = match permission {
        CommandPermission::Fixed(level) => level,
        CommandPermission::ByParameter { default, overrides } => {
            let parameter = parts
                .next()
                .and_then(|p| p.split('=').next())
                .unwrap_or_default();
            overrides
                .iter()
                .find(|(name, _)| *name == parameter)
                .map(|(_, level)| *level)
                .unwrap_or(default)
        }
    };

    Ok((base_command, level))
}
