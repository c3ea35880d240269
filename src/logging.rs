//! ScalerKit Logging System
//!
//! Timestamped log lines to a per-session file under the data directory,
//! mirrored to the console, with a system information header.

use chrono::Local;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::Command;
use std::sync::OnceLock;

static LOGGER: OnceLock<Mutex<ScalerLogger>> = OnceLock::new();

// ============================================================================
// System Information Detection
// ============================================================================

#[derive(Debug, Clone)]
pub struct SystemInfo {
    pub app_version: String,
    pub os: String,
    pub os_version: String,
    pub arch: String,
    pub kernel: String,
}

impl SystemInfo {
    pub fn detect() -> Self {
        Self {
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            os: detect_os(),
            os_version: detect_os_version(),
            arch: std::env::consts::ARCH.to_string(),
            kernel: detect_kernel(),
        }
    }

    pub fn to_log_header(&self) -> String {
        format!(
r#"================================================================================
ScalerKit Log - {}
================================================================================
Application:   ScalerKit v{}
System Info:
  OS:          {} {}
  Arch:        {}
  Kernel:      {}
================================================================================
"#,
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            self.app_version,
            self.os,
            self.os_version,
            self.arch,
            self.kernel,
        )
    }
}

fn detect_os() -> String {
    if let Ok(file) = File::open("/etc/os-release") {
        let reader = BufReader::new(file);
        for line in reader.lines().map_while(Result::ok) {
            if let Some(name) = line.strip_prefix("NAME=") {
                return name.trim_matches('"').to_string();
            }
        }
    }
    std::env::consts::OS.to_string()
}

fn detect_os_version() -> String {
    if let Ok(file) = File::open("/etc/os-release") {
        let reader = BufReader::new(file);
        for line in reader.lines().map_while(Result::ok) {
            if let Some(version) = line.strip_prefix("VERSION_ID=") {
                return version.trim_matches('"').to_string();
            }
        }
    }

    if cfg!(windows) {
        if let Ok(output) = Command::new("cmd").args(["/C", "ver"]).output() {
            if output.status.success() {
                return String::from_utf8_lossy(&output.stdout).trim().to_string();
            }
        }
    }

    String::new()
}

fn detect_kernel() -> String {
    if cfg!(windows) {
        return "NT".to_string();
    }
    if let Ok(output) = Command::new("uname").arg("-r").output() {
        if output.status.success() {
            return String::from_utf8_lossy(&output.stdout).trim().to_string();
        }
    }
    "Unknown".to_string()
}

// ============================================================================
// Log Levels
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogLevel {
    Info,
    Action, // Caller-initiated operations (install, uninstall, restore)
    Download,
    Install,
    Warning,
    Error,
}

impl LogLevel {
    pub fn prefix(&self) -> &'static str {
        match self {
            LogLevel::Info => "[INFO]",
            LogLevel::Action => "[ACTION]",
            LogLevel::Download => "[DOWNLOAD]",
            LogLevel::Install => "[INSTALL]",
            LogLevel::Warning => "[WARNING]",
            LogLevel::Error => "[ERROR]",
        }
    }
}

// ============================================================================
// ScalerKit Logger
// ============================================================================

pub struct ScalerLogger {
    log_file: Option<File>,
    echo: bool,
}

impl ScalerLogger {
    pub fn new() -> Self {
        let log_dir: PathBuf = crate::app_path!("logs");
        let _ = fs::create_dir_all(&log_dir);

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let log_path = log_dir.join(format!("scalerkit_{}.log", timestamp));

        let log_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .ok();

        let mut logger = Self {
            log_file,
            echo: std::env::var("SCALERKIT_QUIET").is_err(),
        };

        let header = SystemInfo::detect().to_log_header();
        logger.write_raw(&header);

        logger
    }

    fn write_raw(&mut self, msg: &str) {
        if let Some(ref mut file) = self.log_file {
            let _ = writeln!(file, "{}", msg);
            let _ = file.flush();
        }

        // stdout belongs to command output
        if self.echo {
            eprintln!("{}", msg);
        }
    }

    pub fn log(&mut self, level: LogLevel, message: &str) {
        let timestamp = Local::now().format("%H:%M:%S");
        let formatted = format!("[{}] {} {}", timestamp, level.prefix(), message);
        self.write_raw(&formatted);
    }
}

impl Default for ScalerLogger {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Global Logger Access
// ============================================================================

/// Initialize the global logger (call once at startup)
pub fn init_logger() {
    logger();
}

fn logger() -> &'static Mutex<ScalerLogger> {
    LOGGER.get_or_init(|| Mutex::new(ScalerLogger::new()))
}

// ============================================================================
// Convenience Logging Functions
// ============================================================================

pub fn log_info(message: &str) {
    logger().lock().log(LogLevel::Info, message);
}

pub fn log_action(message: &str) {
    logger().lock().log(LogLevel::Action, message);
}

pub fn log_download(message: &str) {
    logger().lock().log(LogLevel::Download, message);
}

pub fn log_install(message: &str) {
    logger().lock().log(LogLevel::Install, message);
}

pub fn log_warning(message: &str) {
    logger().lock().log(LogLevel::Warning, message);
}

pub fn log_error(message: &str) {
    logger().lock().log(LogLevel::Error, message);
}
