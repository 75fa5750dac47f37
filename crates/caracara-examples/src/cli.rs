//! Command-line arguments
//!
//! `caracara-examples [--config PATH] [--profile NAME] <module> <example>`

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::DEFAULT_CONFIG_PATH;

/// Run a Caracara example against a Falcon tenant
#[derive(Debug, Parser)]
#[command(name = "caracara-examples", version)]
#[command(about = "Caracara example programs driven by a YAML profile file", long_about = None)]
pub struct Cli {
    /// Path to the profile file
    #[arg(short, long, env = "CARACARA_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Profile to use (defaults to the only profile, or the one marked default)
    #[arg(short, long, env = "CARACARA_PROFILE")]
    pub profile: Option<String>,

    #[command(subcommand)]
    pub module: Module,
}

/// Example modules, one per API area
#[derive(Clone, Copy, Debug, PartialEq, Eq, Subcommand)]
pub enum Module {
    /// Hosts and host groups
    Hosts {
        #[command(subcommand)]
        example: HostsExample,
    },
    /// Real Time Response
    Rtr {
        #[command(subcommand)]
        example: RtrExample,
    },
    /// User management
    Users {
        #[command(subcommand)]
        example: UsersExample,
    },
    /// Prevention policies
    PreventionPolicies {
        #[command(subcommand)]
        example: PreventionPoliciesExample,
    },
    /// Response policies
    ResponsePolicies {
        #[command(subcommand)]
        example: ResponsePoliciesExample,
    },
    /// Flight Control (MSSP) parent and child CIDs
    FlightControl {
        #[command(subcommand)]
        example: FlightControlExample,
    },
    /// Sensor update policies
    SensorUpdatePolicies {
        #[command(subcommand)]
        example: SensorUpdatePoliciesExample,
    },
}

impl Module {
    /// Module and example keys used in the profile file's `examples` block
    pub fn settings_key(&self) -> (&'static str, &'static str) {
        match self {
            Module::Hosts { example } => ("hosts", example.key()),
            Module::Rtr { example } => ("rtr", example.key()),
            Module::Users { example } => ("users", example.key()),
            Module::PreventionPolicies { example } => ("prevention_policies", example.key()),
            Module::ResponsePolicies { example } => ("response_policies", example.key()),
            Module::FlightControl { example } => ("flight_control", example.key()),
            Module::SensorUpdatePolicies { example } => ("sensor_update_policies", example.key()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Subcommand)]
pub enum HostsExample {
    /// Describe devices matching the configured filters
    FindDevices,
    /// Find devices that have not been seen for a number of days
    FindStaleSensors,
    ListAllDevices,
    ListWindowsDevices,
    ListAllGroups,
    ListAllGroupMembers,
    /// Show the online state of every device
    ListDeviceStates,
    ListHiddenDevices,
    ListLoginHistory,
    ListNetworkHistory,
    /// Tabulate agent versions across the tenant
    ShowAgentVersions,
}

impl HostsExample {
    pub fn key(&self) -> &'static str {
        match self {
            HostsExample::FindDevices => "find_devices",
            HostsExample::FindStaleSensors => "find_stale_sensors",
            HostsExample::ListAllDevices => "list_all_devices",
            HostsExample::ListWindowsDevices => "list_windows_devices",
            HostsExample::ListAllGroups => "list_all_groups",
            HostsExample::ListAllGroupMembers => "list_all_group_members",
            HostsExample::ListDeviceStates => "list_device_states",
            HostsExample::ListHiddenDevices => "list_hidden_devices",
            HostsExample::ListLoginHistory => "list_login_history",
            HostsExample::ListNetworkHistory => "list_network_history",
            HostsExample::ShowAgentVersions => "show_agent_versions",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Subcommand)]
pub enum RtrExample {
    /// Delete every queued RTR session
    ClearQueuedSessions,
    DescribePutFiles,
    DescribeQueuedSessions,
    DescribeScripts,
    /// Download a Windows event log from every matching host
    DownloadEventLog,
    /// Run one command against matching hosts, queueing for offline ones
    QueueCommand,
}

impl RtrExample {
    pub fn key(&self) -> &'static str {
        match self {
            RtrExample::ClearQueuedSessions => "clear_queued_sessions",
            RtrExample::DescribePutFiles => "describe_put_files",
            RtrExample::DescribeQueuedSessions => "describe_queued_sessions",
            RtrExample::DescribeScripts => "describe_scripts",
            RtrExample::DownloadEventLog => "download_event_log",
            RtrExample::QueueCommand => "queue_command",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Subcommand)]
pub enum UsersExample {
    AddUser,
    DeleteUser,
    DescribeRoles,
    DescribeUsers,
}

impl UsersExample {
    pub fn key(&self) -> &'static str {
        match self {
            UsersExample::AddUser => "add_user",
            UsersExample::DeleteUser => "delete_user",
            UsersExample::DescribeRoles => "describe_roles",
            UsersExample::DescribeUsers => "describe_users",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Subcommand)]
pub enum PreventionPoliciesExample {
    /// Print a prevention policy generated from the template
    CreatePreventionPolicy,
    DescribePreventionPolicies,
}

impl PreventionPoliciesExample {
    pub fn key(&self) -> &'static str {
        match self {
            PreventionPoliciesExample::CreatePreventionPolicy => "create_prevention_policy",
            PreventionPoliciesExample::DescribePreventionPolicies => "describe_prevention_policies",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Subcommand)]
pub enum ResponsePoliciesExample {
    /// Print a response policy generated from the template
    CreateResponsePolicy,
    DescribeResponsePolicies,
}

impl ResponsePoliciesExample {
    pub fn key(&self) -> &'static str {
        match self {
            ResponsePoliciesExample::CreateResponsePolicy => "create_response_policy",
            ResponsePoliciesExample::DescribeResponsePolicies => "describe_response_policies",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Subcommand)]
pub enum FlightControlExample {
    DescribeChildCids,
}

impl FlightControlExample {
    pub fn key(&self) -> &'static str {
        match self {
            FlightControlExample::DescribeChildCids => "describe_child_cids",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Subcommand)]
pub enum SensorUpdatePoliciesExample {
    /// Reveal a device's maintenance token, or the bulk token
    GetMaintenanceToken,
}

impl SensorUpdatePoliciesExample {
    pub fn key(&self) -> &'static str {
        match self {
            SensorUpdatePoliciesExample::GetMaintenanceToken => "get_maintenance_token",
        }
    }
}
