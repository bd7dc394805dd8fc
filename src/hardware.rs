//! CPU detection from /proc/cpuinfo.

use std::fs;

/// CPU model string and logical processor count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuInfo {
    pub model: String,
    pub count: u32,
}

fn parse_cpuinfo(content: &str) -> CpuInfo {
    let mut model = "Unknown".to_string();
    let mut processor_count = 0;

    for line in content.lines() {
        if line.starts_with("model name") && model == "Unknown" {
            if let Some(value) = line.split(": ").nth(1) {
                model = value.to_string();
            }
        }
        if line.starts_with("processor") {
            processor_count += 1;
        }
    }

    CpuInfo {
        model,
        count: processor_count.max(1),
    }
}

/// Detect the host CPU. Falls back to a single unknown core when
/// /proc/cpuinfo cannot be read.
pub fn detect_cpu() -> CpuInfo {
    match fs::read_to_string("/proc/cpuinfo") {
        Ok(content) => parse_cpuinfo(&content),
        Err(_) => CpuInfo {
            model: "Unknown".to_string(),
            count: num_cpus::get() as u32,
        },
    }
}
