use crate::messages::SystemInfo;
use std::env::consts::{ARCH, OS};
use std::fs;

const KERNEL_VERSION: &str = "/proc/sys/kernel/version";

pub fn info() -> SystemInfo {
    SystemInfo {
        machine: ARCH.to_string(),
        system_name: system_name(OS).to_string(),
        version: kernel_version(),
    }
}

/// Map a target OS name onto the platform names peers report.
fn system_name(os: &str) -> &str {
    match os {
        "linux" => "Linux",
        "macos" => "Darwin",
        "windows" => "Windows",
        "freebsd" => "FreeBSD",
        other => other,
    }
}

fn kernel_version() -> String {
    fs::read_to_string(KERNEL_VERSION)
        .map(|v| v.trim().to_string())
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}
