//! Table rendering: declarative column specification, filtering, sorting,
//! and text/HTML output
//!
//! The column set for a batch is computed once from the active feature flags
//! and applies to every row, in a fixed relative order. Sorting is validated
//! against the active set; an invalid choice is a usage error.

use anyhow::{anyhow, Result};
use owo_colors::OwoColorize;
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::database::directory::ProjectDirectory;
use crate::enrich::EnrichedRow;
use crate::probe::dns::DnsStatus;
use crate::probe::ping::PingStatus;

/// Placeholder for network-derived fields of records without network info
pub const PLACEHOLDER: &str = "-";

/// Feature flags that decide which columns are active for a batch
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnConfig {
    pub ping: bool,
    pub check_dns: bool,
    pub uuid: bool,
    /// Set when at least one record in the batch has a disabled hypervisor
    pub show_disabled: bool,
}

/// Report columns, in their fixed relative order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Hostname,
    IpAddress,
    PingStatus,
    DnsStatus,
    RdnsStatus,
    Creator,
    CreatedAt,
    Uuid,
    Project,
    Flavor,
    Hypervisor,
    HypervisorStatus,
    StatusReason,
}

/// The full ordered column specification
pub const COLUMN_ORDER: [Column; 13] = [
    Column::Hostname,
    Column::IpAddress,
    Column::PingStatus,
    Column::DnsStatus,
    Column::RdnsStatus,
    Column::Creator,
    Column::CreatedAt,
    Column::Uuid,
    Column::Project,
    Column::Flavor,
    Column::Hypervisor,
    Column::HypervisorStatus,
    Column::StatusReason,
];

impl Column {
    pub fn title(self) -> &'static str {
        match self {
            Column::Hostname => "Hostname",
            Column::IpAddress => "IP Address",
            Column::PingStatus => "Ping Status",
            Column::DnsStatus => "DNS Status",
            Column::RdnsStatus => "RDNS Status",
            Column::Creator => "Creator",
            Column::CreatedAt => "Created At",
            Column::Uuid => "UUID",
            Column::Project => "Project",
            Column::Flavor => "Flavor",
            Column::Hypervisor => "Hypervisor",
            Column::HypervisorStatus => "Hypervisor Status",
            Column::StatusReason => "Status Reason",
        }
    }

    fn enabled(self, cfg: &ColumnConfig) -> bool {
        match self {
            Column::PingStatus => cfg.ping,
            Column::DnsStatus | Column::RdnsStatus => cfg.check_dns,
            Column::Uuid => cfg.uuid,
            Column::HypervisorStatus | Column::StatusReason => cfg.show_disabled,
            _ => true,
        }
    }
}

/// Filter the full column specification down to the active set for a batch
pub fn active_columns(cfg: &ColumnConfig) -> Vec<Column> {
    COLUMN_ORDER
        .into_iter()
        .filter(|c| c.enabled(cfg))
        .collect()
}

/// Validate a user-chosen sort column against the active set
pub fn resolve_sort_column(name: &str, active: &[Column]) -> Result<Column> {
    active
        .iter()
        .copied()
        .find(|c| c.title() == name)
        .ok_or_else(|| {
            let valid = active
                .iter()
                .map(|c| format!("\"{}\"", c.title()))
                .collect::<Vec<_>>()
                .join(", ");
            anyhow!("Cannot sort by \"{}\". Must be one of: {}", name, valid)
        })
}

/// Context needed to turn a row into display cells
pub struct RenderContext<'a> {
    pub directory: &'a ProjectDirectory,
    pub dns_suffix: &'a str,
}

/// Round to 2 decimal places, trailing zeros trimmed ("1.2", not "1.20")
pub fn format_ms(value: f64) -> String {
    format!("{}", (value * 100.0).round() / 100.0)
}

fn success(text: &str, color: bool) -> String {
    if color {
        text.green().to_string()
    } else {
        text.to_string()
    }
}

fn warning(text: &str, color: bool) -> String {
    if color {
        text.red().to_string()
    } else {
        text.to_string()
    }
}

/// Render a ping status cell
pub fn ping_cell(status: &PingStatus, color: bool) -> String {
    match status {
        PingStatus::Ok { min_ms, avg_ms } => format!(
            "{} ({}ms, {}ms)",
            success("OK", color),
            format_ms(*min_ms),
            format_ms(*avg_ms)
        ),
        PingStatus::Lossy {
            loss_pct,
            min_ms,
            avg_ms,
        } => format!(
            "{} {}% loss ({}ms, {}ms)",
            warning("!!", color),
            loss_pct,
            format_ms(*min_ms),
            format_ms(*avg_ms)
        ),
        PingStatus::Down => warning("DOWN", color),
    }
}

/// Which direction a DNS status cell reports (affects the no-record message)
#[derive(Debug, Clone, Copy)]
pub enum DnsKind {
    Forward,
    Reverse,
}

/// Render a DNS status cell
pub fn dns_cell(status: &DnsStatus, kind: DnsKind, color: bool) -> String {
    match status {
        DnsStatus::Match(resolved) => success(resolved, color),
        DnsStatus::Mismatch(resolved) => warning(&format!("!! {} !!", resolved), color),
        DnsStatus::NoRecord => match kind {
            DnsKind::Forward => warning("!! No DNS record !!", color),
            DnsKind::Reverse => warning("!! No RDNS record !!", color),
        },
        DnsStatus::TimedOut => warning("timed out", color),
    }
}

fn cell(row: &EnrichedRow, column: Column, ctx: &RenderContext, color: bool) -> String {
    match column {
        Column::Hostname => row.record.hostname.clone(),
        Column::IpAddress => row
            .ip
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| PLACEHOLDER.to_string()),
        Column::PingStatus => row
            .ping
            .as_ref()
            .map(|s| ping_cell(s, color))
            .unwrap_or_else(|| PLACEHOLDER.to_string()),
        Column::DnsStatus => row
            .dns
            .as_ref()
            .map(|s| dns_cell(s, DnsKind::Forward, color))
            .unwrap_or_else(|| PLACEHOLDER.to_string()),
        Column::RdnsStatus => row
            .rdns
            .as_ref()
            .map(|s| dns_cell(s, DnsKind::Reverse, color))
            .unwrap_or_else(|| PLACEHOLDER.to_string()),
        Column::Creator => row.record.user_id.clone(),
        Column::CreatedAt => row.record.created_at.clone(),
        Column::Uuid => row.record.uuid.clone(),
        Column::Project => ctx.directory.display_name(&row.record.project_id),
        Column::Flavor => row.record.flavor.clone(),
        Column::Hypervisor => row.record.host.replace(ctx.dns_suffix, ""),
        Column::HypervisorStatus => {
            if row.record.disabled == 0 {
                "Enabled".to_string()
            } else {
                "Disabled".to_string()
            }
        }
        Column::StatusReason => row.record.disabled_reason.clone().unwrap_or_default(),
    }
}

/// Keep only rows with no resolved IP (the `--bad-ips` filter)
pub fn retain_bad_ips(rows: &mut Vec<EnrichedRow>) {
    rows.retain(|row| row.ip.is_none());
}

/// Sort rows by the plain (uncolored) text of the given column
pub fn sort_rows(rows: &mut [EnrichedRow], by: Column, ctx: &RenderContext) {
    rows.sort_by_key(|row| cell(row, by, ctx, false));
}

/// Render an aligned text table (left-aligned, colored status cells)
pub fn render_text(rows: &[EnrichedRow], columns: &[Column], ctx: &RenderContext) -> String {
    let mut builder = Builder::default();
    builder.push_record(columns.iter().map(|c| c.title().to_string()));
    for row in rows {
        builder.push_record(columns.iter().map(|c| cell(row, *c, ctx, true)));
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Render an HTML table (no colors, cells escaped)
pub fn render_html(rows: &[EnrichedRow], columns: &[Column], ctx: &RenderContext) -> String {
    let mut out = String::from("<table>\n    <tr>\n");
    for column in columns {
        out.push_str(&format!(
            "        <th>{}</th>\n",
            escape_html(column.title())
        ));
    }
    out.push_str("    </tr>\n");
    for row in rows {
        out.push_str("    <tr>\n");
        for column in columns {
            out.push_str(&format!(
                "        <td>{}</td>\n",
                escape_html(&cell(row, *column, ctx, false))
            ));
        }
        out.push_str("    </tr>\n");
    }
    out.push_str("</table>");
    out
}
