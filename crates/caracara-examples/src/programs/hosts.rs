//! Hosts examples

use std::collections::BTreeSet;

use caracara_client::{CaracaraError, Record};
use caracara_filters::{Dialect, FilterValue, Operator};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{info, warn};

use super::{ExampleContext, pretty_print};
use crate::cli::HostsExample;
use crate::error::{ExampleError, Result};

/// Columns of the agent version table: record field and heading
const AGENT_VERSION_COLUMNS: &[(&str, &str)] = &[
    ("device_id", "ID"),
    ("hostname", "Hostname"),
    ("local_ip", "Internal IP"),
    ("external_ip", "External IP"),
    ("agent_version", "Agent Version"),
];

pub async fn run(example: HostsExample, ctx: &ExampleContext) -> Result<()> {
    match example {
        HostsExample::FindDevices => find_devices(ctx).await,
        HostsExample::FindStaleSensors => find_stale_sensors(ctx).await,
        HostsExample::ListAllDevices => list_all_devices(ctx).await,
        HostsExample::ListWindowsDevices => list_windows_devices(ctx).await,
        HostsExample::ListAllGroups => list_all_groups(ctx).await,
        HostsExample::ListAllGroupMembers => list_all_group_members(ctx).await,
        HostsExample::ListDeviceStates => list_device_states(ctx).await,
        HostsExample::ListHiddenDevices => list_hidden_devices(ctx).await,
        HostsExample::ListLoginHistory => list_login_history(ctx).await,
        HostsExample::ListNetworkHistory => list_network_history(ctx).await,
        HostsExample::ShowAgentVersions => show_agent_versions(ctx).await,
    }
}

fn str_or<'a>(record: &'a Record, key: &str, fallback: &'a str) -> &'a str {
    record.get(key).and_then(Value::as_str).unwrap_or(fallback)
}

async fn find_devices(ctx: &ExampleContext) -> Result<()> {
    let filters = ctx.configured_filter(Dialect::Hosts)?;
    let fql = filters.get_fql();

    if filters.is_empty() {
        info!("No filter provided; getting a list of all devices within the tenant");
    } else {
        info!("Getting a list of hosts that match the FQL string {}", fql);
    }

    let devices = ctx.client.hosts().describe_devices(&filters).await?;
    for device in devices.values() {
        pretty_print(device, false)?;
    }

    info!("Found {} devices in {:.3} seconds", devices.len(), ctx.elapsed());
    if devices.is_empty() {
        return Err(ExampleError::no_devices(&fql));
    }
    Ok(())
}

async fn find_stale_sensors(ctx: &ExampleContext) -> Result<()> {
    let days = ctx.settings.get_u64("days", 7)?;
    let remove = ctx.settings.get_bool("remove", false)?;

    let mut filters = ctx.client.falcon_filter(Dialect::Hosts);
    filters.create_new_filter(
        "LastSeen",
        Some(FilterValue::from(format!("-{days}d"))),
        Some(Operator::LessOrEqual),
    )?;
    let fql = filters.get_fql();
    info!("Using the FQL filter: {}", fql);

    let devices = ctx.client.hosts().describe_devices(&filters).await?;
    if devices.is_empty() {
        return Err(ExampleError::no_devices(&fql));
    }

    if remove {
        let hidden = ctx.client.hosts().hide(&filters).await?;
        info!("{} sensors hidden in {:.3} seconds.", hidden.len(), ctx.elapsed());
    }

    let now = Utc::now();
    for (device_id, device) in &devices {
        let hostname = str_or(device, "hostname", "Unknown Hostname");
        match device
            .get("last_seen")
            .and_then(Value::as_str)
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
        {
            Some(last_seen) => {
                let days_ago = (now - last_seen.with_timezone(&Utc)).num_days();
                info!("[{}] {} was last seen {} days ago", device_id, hostname, days_ago);
            }
            None => warn!("[{}] {} has no valid last_seen timestamp", device_id, hostname),
        }
    }

    info!("{} devices found in {:.3} seconds.", devices.len(), ctx.elapsed());
    Ok(())
}

async fn list_all_devices(ctx: &ExampleContext) -> Result<()> {
    info!("Listing all devices within the tenant");

    let devices = ctx.client.hosts().describe_devices(()).await?;
    for (device_id, device) in &devices {
        info!("{} ({})", device_id, str_or(device, "hostname", "Unknown Hostname"));
    }

    info!("Found {} devices in {:.3} seconds", devices.len(), ctx.elapsed());
    if devices.is_empty() {
        return Err(ExampleError::no_devices(""));
    }
    Ok(())
}

async fn list_windows_devices(ctx: &ExampleContext) -> Result<()> {
    info!("Grabbing all Windows devices within the tenant");

    let mut filters = ctx.client.falcon_filter(Dialect::Hosts);
    filters.create_new_filter("OS", Some(FilterValue::from("Windows")), None)?;
    let fql = filters.get_fql();
    info!("Using the FQL filter: {}", fql);

    let devices = ctx.client.hosts().describe_devices(&filters).await?;
    info!("Found {} devices running Windows", devices.len());
    if devices.is_empty() {
        return Err(ExampleError::no_devices(&fql));
    }

    for (device_id, device) in &devices {
        info!("{} ({})", device_id, str_or(device, "hostname", "Unknown Hostname"));
    }
    Ok(())
}

/// An unfiltered group lookup that matched nothing means the tenant has no groups
fn group_lookup_error(err: CaracaraError) -> ExampleError {
    match err {
        CaracaraError::HostGroupNotFound => ExampleError::no_groups(""),
        other => other.into(),
    }
}

async fn list_all_groups(ctx: &ExampleContext) -> Result<()> {
    info!("Listing all host groups within the tenant");

    let groups = ctx
        .client
        .hosts()
        .describe_groups(())
        .await
        .map_err(group_lookup_error)?;
    for (group_id, group) in &groups {
        info!("{} ({})", group_id, str_or(group, "name", "Unnamed"));
    }

    info!("Found {} groups in {:.3} seconds", groups.len(), ctx.elapsed());
    Ok(())
}

async fn list_all_group_members(ctx: &ExampleContext) -> Result<()> {
    info!("Listing all host groups and their members within the tenant");

    let groups = ctx
        .client
        .hosts()
        .describe_group_members(())
        .await
        .map_err(group_lookup_error)?;
    let mut discovered = BTreeSet::new();

    for (group_id, group) in &groups {
        let members: &[Value] = group
            .get("devices")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        info!(
            "Group {} ({}) contains {} devices",
            group_id,
            str_or(group, "name", "Unnamed"),
            members.len()
        );

        for member in members {
            let device_id = member.get("device_id").and_then(Value::as_str).unwrap_or_default();
            let hostname = member
                .get("hostname")
                .and_then(Value::as_str)
                .unwrap_or("No Hostname");
            discovered.insert(device_id.to_string());
            info!("{} ({})", device_id, hostname);
        }
    }

    info!(
        "Found {} groups with {} total members in {:.3} seconds",
        groups.len(),
        discovered.len(),
        ctx.elapsed()
    );
    Ok(())
}

async fn list_device_states(ctx: &ExampleContext) -> Result<()> {
    info!("Listing all device states within the tenant");

    let devices = ctx.client.hosts().describe_state(()).await?;
    for (device_id, device) in &devices {
        info!(
            "{} ({}): {}",
            device_id,
            str_or(device, "hostname", "Unknown Hostname"),
            str_or(device, "state", "Unknown")
        );
    }

    info!("Found {} devices in {:.3} seconds", devices.len(), ctx.elapsed());
    if devices.is_empty() {
        return Err(ExampleError::no_devices(""));
    }
    Ok(())
}

async fn list_hidden_devices(ctx: &ExampleContext) -> Result<()> {
    info!("Listing all hidden devices within the tenant");

    let devices = ctx.client.hosts().describe_hidden_devices(()).await?;
    for (device_id, device) in &devices {
        info!("{} ({})", device_id, str_or(device, "hostname", "Unknown Hostname"));
    }

    info!("Found {} devices in {:.3} seconds", devices.len(), ctx.elapsed());
    if devices.is_empty() {
        return Err(ExampleError::no_devices("Hidden devices"));
    }
    Ok(())
}

/// One line per distinct login, in the order seen
fn summarise_logins(device: &Record) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for login in device
        .get("recent_logins")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
    {
        let user = login
            .get("user_name")
            .and_then(Value::as_str)
            .unwrap_or("Username not found");
        let time = login.get("login_time").and_then(Value::as_str).unwrap_or("Unknown");
        let detail = format!("{user}: {time}");
        if !found.contains(&detail) {
            found.push(detail);
        }
    }
    found
}

async fn list_login_history(ctx: &ExampleContext) -> Result<()> {
    info!("Listing login history for all devices within the tenant");

    let devices = ctx.client.hosts().describe_login_history(()).await?;
    let mut total_logins = 0;

    for (device_id, device) in &devices {
        let logins = summarise_logins(device);
        total_logins += logins.len();
        if logins.is_empty() {
            info!("{} (No logins found)", device_id);
        } else {
            info!("{} ({})", device_id, logins.join(", "));
        }
    }

    info!("Found {} devices in {:.3} seconds", devices.len(), ctx.elapsed());
    if devices.is_empty() {
        return Err(ExampleError::no_devices(""));
    }
    if total_logins == 0 {
        return Err(ExampleError::NoLoginsFound("Recent logins".to_string()));
    }
    Ok(())
}

/// One line per distinct address change, in the order seen
fn summarise_address_changes(device: &Record) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for change in device
        .get("history")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
    {
        let field = |key: &str, fallback: &'static str| -> String {
            change
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or(fallback)
                .to_string()
        };
        let detail = format!(
            "{} ({}) on {}",
            field("ip_address", "IP Unknown"),
            field("mac_address", "MAC Unknown"),
            field("timestamp", "Unknown")
        );
        if !found.contains(&detail) {
            found.push(detail);
        }
    }
    found
}

async fn list_network_history(ctx: &ExampleContext) -> Result<()> {
    info!("Listing all network address changes within the tenant");

    let devices = ctx.client.hosts().describe_network_address_history(()).await?;
    let mut total_changes = 0;

    for (device_id, device) in &devices {
        let changes = summarise_address_changes(device);
        total_changes += changes.len();
        if changes.is_empty() {
            info!("{} (No recent changes)", device_id);
        } else {
            info!("{} ({})", device_id, changes.join(", "));
        }
    }

    info!("Found {} devices in {:.3} seconds", devices.len(), ctx.elapsed());
    if devices.is_empty() {
        return Err(ExampleError::no_devices(""));
    }
    if total_changes == 0 {
        return Err(ExampleError::NoAddressesFound(
            "Recent network addresses".to_string(),
        ));
    }
    Ok(())
}

fn pad_row(cells: &[&str], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

/// Render rows as a plain text table with a dashed rule under the headings
fn render_table(headings: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headings.iter().map(|h| h.len()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let mut lines = vec![
        pad_row(headings, &widths),
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  "),
    ];
    for row in rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        lines.push(pad_row(&cells, &widths));
    }
    lines.join("\n")
}

async fn show_agent_versions(ctx: &ExampleContext) -> Result<()> {
    info!("Grabbing all devices within the tenant");

    let devices = ctx.client.hosts().describe_devices(()).await?;
    let rows: Vec<Vec<String>> = devices
        .values()
        .map(|device| {
            AGENT_VERSION_COLUMNS
                .iter()
                .map(|(field, _)| str_or(device, field, "Unavailable").to_string())
                .collect()
        })
        .collect();

    let headings: Vec<&str> = AGENT_VERSION_COLUMNS.iter().map(|(_, h)| *h).collect();
    info!("\n{}", render_table(&headings, &rows));
    info!("Found {} devices", rows.len());

    if rows.is_empty() {
        return Err(ExampleError::no_devices(""));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_summarise_logins_dedupes() {
        let device = record(json!({
            "device_id": "dev1",
            "recent_logins": [
                {"user_name": "alice", "login_time": "2024-01-01T00:00:00Z"},
                {"user_name": "alice", "login_time": "2024-01-01T00:00:00Z"},
                {"login_time": "2024-01-02T00:00:00Z"}
            ]
        }));
        assert_eq!(
            summarise_logins(&device),
            vec![
                "alice: 2024-01-01T00:00:00Z",
                "Username not found: 2024-01-02T00:00:00Z"
            ]
        );
        assert!(summarise_logins(&record(json!({"device_id": "dev2"}))).is_empty());
    }

    #[test]
    fn test_summarise_address_changes() {
        let device = record(json!({
            "history": [
                {"ip_address": "10.0.0.1", "mac_address": "aa-bb", "timestamp": "t1"},
                {"ip_address": "10.0.0.2"}
            ]
        }));
        assert_eq!(
            summarise_address_changes(&device),
            vec!["10.0.0.1 (aa-bb) on t1", "10.0.0.2 (MAC Unknown) on Unknown"]
        );
    }

    #[test]
    fn test_render_table() {
        let table = render_table(
            &["ID", "Hostname"],
            &[
                vec!["dev1".to_string(), "web".to_string()],
                vec!["d2".to_string(), "database".to_string()],
            ],
        );
        assert_eq!(
            table,
            "ID    Hostname\n----  --------\ndev1  web\nd2    database"
        );
    }

    #[test]
    fn test_group_lookup_error_maps_missing_groups() {
        let err = group_lookup_error(CaracaraError::HostGroupNotFound);
        assert!(matches!(err, ExampleError::NoGroupsFound(ref fql) if fql == "No filters applied"));

        let err = group_lookup_error(CaracaraError::NotConnected);
        assert!(matches!(err, ExampleError::Caracara(CaracaraError::NotConnected)));
    }
}
