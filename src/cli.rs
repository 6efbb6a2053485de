use std::path::PathBuf;

use clap::Parser;

use crate::models::{GroupBy, HostOrder, MissingHostPolicy, WindowingKind};

#[derive(Parser, Debug)]
#[command(
    name = "inventory-diff",
    about = "Group monitored hosts by identical package-inventory changes",
    version
)]
pub struct Cli {
    /// Config file [default: ./.inventory-diff/config.toml, fallback ~/.config/inventory-diff/config.toml]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Report format
    #[arg(long, default_value = "terminal", value_name = "FORMAT")]
    pub report: ReportFormat,

    /// Output file for text, table, xlsx and json reports
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Group hosts by identical change or by identical full inventory
    #[arg(long, value_name = "MODE")]
    pub group_by: Option<GroupByArg>,

    /// How the event and history windows are chosen
    #[arg(long, value_name = "MODE")]
    pub windowing: Option<WindowingArg>,

    /// Range start, `dd.mm.yyyy HH:MM` or RFC 3339; implies `--windowing range`
    #[arg(long, value_name = "DATE", requires = "till")]
    pub from: Option<String>,

    /// Range end, `dd.mm.yyyy HH:MM` or RFC 3339
    #[arg(long, value_name = "DATE", requires = "from")]
    pub till: Option<String>,

    /// Report hosts without history as "No Data", or drop them
    #[arg(long, value_name = "POLICY")]
    pub missing_hosts: Option<MissingHostsArg>,

    /// Also report hosts without any change
    #[arg(long)]
    pub include_unchanged: bool,

    /// Order of hosts inside the report
    #[arg(long, value_name = "ORDER")]
    pub order: Option<OrderArg>,

    /// Show item ids and debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Only print summary line
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    Terminal,
    Text,
    Table,
    Xlsx,
    Json,
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum GroupByArg {
    Diff,
    Inventory,
}

impl From<&GroupByArg> for GroupBy {
    fn from(arg: &GroupByArg) -> Self {
        match arg {
            GroupByArg::Diff => GroupBy::Diff,
            GroupByArg::Inventory => GroupBy::Inventory,
        }
    }
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum WindowingArg {
    EventDriven,
    Fixed,
    Range,
}

impl From<&WindowingArg> for WindowingKind {
    fn from(arg: &WindowingArg) -> Self {
        match arg {
            WindowingArg::EventDriven => WindowingKind::EventDriven,
            WindowingArg::Fixed => WindowingKind::Fixed,
            WindowingArg::Range => WindowingKind::Range,
        }
    }
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum MissingHostsArg {
    Sentinel,
    Drop,
}

impl From<&MissingHostsArg> for MissingHostPolicy {
    fn from(arg: &MissingHostsArg) -> Self {
        match arg {
            MissingHostsArg::Sentinel => MissingHostPolicy::Sentinel,
            MissingHostsArg::Drop => MissingHostPolicy::Drop,
        }
    }
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum OrderArg {
    Recency,
    Name,
}

impl From<&OrderArg> for HostOrder {
    fn from(arg: &OrderArg) -> Self {
        match arg {
            OrderArg::Recency => HostOrder::Recency,
            OrderArg::Name => HostOrder::Name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["inventory-diff"]).unwrap();
        assert_eq!(cli.report, ReportFormat::Terminal);
        assert!(cli.group_by.is_none());
        assert!(!cli.include_unchanged);
    }

    #[test]
    fn test_range_flags_come_in_pairs() {
        assert!(Cli::try_parse_from(["inventory-diff", "--from", "25.05.2022 17:20"]).is_err());

        let cli = Cli::try_parse_from([
            "inventory-diff",
            "--from",
            "25.05.2022 17:20",
            "--till",
            "26.05.2022 17:20",
            "--group-by",
            "inventory",
            "--missing-hosts",
            "drop",
            "--report",
            "table",
        ])
        .unwrap();
        assert_eq!(cli.till.as_deref(), Some("26.05.2022 17:20"));
        assert!(matches!(cli.group_by, Some(GroupByArg::Inventory)));
        assert!(matches!(cli.missing_hosts, Some(MissingHostsArg::Drop)));
        assert_eq!(cli.report, ReportFormat::Table);
    }

    #[test]
    fn test_xlsx_report_format() {
        let cli = Cli::try_parse_from(["inventory-diff", "--report", "xlsx"]).unwrap();
        assert_eq!(cli.report, ReportFormat::Xlsx);
    }
}
