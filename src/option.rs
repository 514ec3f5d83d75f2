//! 命令行选项

use std::path::PathBuf;

use clap::Parser;

/// 监控的默认审计日志文件
pub const DEFAULT_INPUT_FILES: [&str; 3] = [
    "/host/var/log/kube-apiserver/audit.log",
    "/host/var/log/openshift-apiserver/audit.log",
    "/host/var/log/oauth-apiserver/audit.log",
];

/// 默认的转发策略文件路径
pub const DEFAULT_POLICY_FILE: &str = "/run/configmaps/forwarder-policy/policy.yaml";

/// 审计日志转发器的命令行选项
#[derive(Debug, Clone, Parser)]
#[command(name = "audit-forwarder", about = "Filter and forward Kubernetes audit logs to stdout")]
pub struct Options {
    /// audit log file(s) to monitor (can be repeated)
    #[arg(long = "input", value_name = "PATH", default_values_t = DEFAULT_INPUT_FILES.map(String::from))]
    pub inputs: Vec<String>,

    /// path to forwarder policy
    #[arg(long = "policy", value_name = "PATH", default_value = DEFAULT_POLICY_FILE)]
    pub policy: PathBuf,

    /// number of workers per pipeline stage
    #[arg(long = "workers", default_value_t = num_cpus::get())]
    pub workers: usize,

    /// reduce level for records larger than this
    #[arg(long = "max-line-length", default_value_t = 1_000_000)]
    pub max_line_length: usize,

    /// don't filter any events (for testing)
    #[arg(long = "no-filter", default_value_t = false)]
    pub no_filter: bool,

    /// exit after reaching EOF, don't reopen rotated files
    #[arg(long = "no-follow", default_value_t = false)]
    pub no_follow: bool,
}
