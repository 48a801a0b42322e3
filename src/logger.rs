use crate::error::{PromptImgError, Result};
use chrono::{DateTime, Utc};
use colored::*;
use log::{Level, LevelFilter, Metadata, Record};
use once_cell::sync::{Lazy, OnceCell};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use uuid::Uuid;

static CONSOLE_LOGGER: Lazy<ConsoleLogger> = Lazy::new(ConsoleLogger::new);
static INSTALLED: OnceCell<()> = OnceCell::new();

pub fn init() -> Result<()> {
    init_with_config(LoggerConfig::default())
}

/// Installs the console logger, or reconfigures it if already installed.
pub fn init_with_config(config: LoggerConfig) -> Result<()> {
    let max_level = config.min_level.to_level_filter();
    CONSOLE_LOGGER.update_config(config)?;

    INSTALLED.get_or_try_init(|| {
        log::set_logger(&*CONSOLE_LOGGER)
            .map_err(|e| PromptImgError::Config(format!("Failed to set logger: {}", e)))
    })?;

    log::set_max_level(max_level);
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl LogLevel {
    pub fn color(&self) -> Color {
        match self {
            LogLevel::Trace => Color::Cyan,
            LogLevel::Debug => Color::Blue,
            LogLevel::Info => Color::Green,
            LogLevel::Warn => Color::Yellow,
            LogLevel::Error => Color::Red,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    pub fn to_level_filter(&self) -> LevelFilter {
        match self {
            LogLevel::Trace => LevelFilter::Trace,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Error => LevelFilter::Error,
        }
    }

    fn to_log_level(self) -> Level {
        match self {
            LogLevel::Trace => Level::Trace,
            LogLevel::Debug => Level::Debug,
            LogLevel::Info => Level::Info,
            LogLevel::Warn => Level::Warn,
            LogLevel::Error => Level::Error,
        }
    }

    fn from_log_level(level: Level) -> Self {
        match level {
            Level::Trace => LogLevel::Trace,
            Level::Debug => LogLevel::Debug,
            Level::Info => LogLevel::Info,
            Level::Warn => LogLevel::Warn,
            Level::Error => LogLevel::Error,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    pub module: String,
    pub file: String,
    pub line: u32,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: String, module: String, file: String, line: u32) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            level,
            message,
            module,
            file,
            line,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub min_level: LogLevel,
    pub show_colors: bool,
    pub show_file_location: bool,
    pub show_module: bool,
    pub include_timestamp: bool,
    pub timestamp_format: String,
    pub output_json: bool,
    pub log_file_path: Option<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            show_colors: true,
            show_file_location: false,
            show_module: true,
            include_timestamp: true,
            timestamp_format: "%Y-%m-%d %H:%M:%S%.3f".to_string(),
            output_json: false,
            log_file_path: None,
        }
    }
}

impl LoggerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    pub fn with_colors(mut self, enabled: bool) -> Self {
        self.show_colors = enabled;
        self
    }

    pub fn with_file_output(mut self, path: &str) -> Self {
        self.log_file_path = Some(path.to_string());
        self
    }

    pub fn with_json_output(mut self, enabled: bool) -> Self {
        self.output_json = enabled;
        self
    }

    pub fn production() -> Self {
        Self {
            min_level: LogLevel::Info,
            show_colors: false,
            output_json: true,
            ..Default::default()
        }
    }

    pub fn development() -> Self {
        Self {
            min_level: LogLevel::Debug,
            show_colors: true,
            show_file_location: true,
            ..Default::default()
        }
    }

    /// Development defaults overridden by `PROMPTIMG_LOG_LEVEL`,
    /// `PROMPTIMG_LOG_JSON` and `PROMPTIMG_LOG_FILE`.
    pub fn from_env() -> Self {
        let mut config = Self::development();

        if let Some(level) = env::var("PROMPTIMG_LOG_LEVEL")
            .ok()
            .and_then(|value| LogLevel::parse(&value))
        {
            config.min_level = level;
        }
        if env::var("PROMPTIMG_LOG_JSON").map_or(false, |val| val == "true") {
            config.output_json = true;
            config.show_colors = false;
        }
        if let Ok(path) = env::var("PROMPTIMG_LOG_FILE") {
            config.log_file_path = Some(path);
        }

        config
    }
}

/// `log` backend writing to stderr and, optionally, appending to a file.
pub struct ConsoleLogger {
    config: Mutex<LoggerConfig>,
    log_file: Mutex<Option<File>>,
    file_error_reported: AtomicBool,
}

impl ConsoleLogger {
    fn new() -> Self {
        Self {
            config: Mutex::new(LoggerConfig::default()),
            log_file: Mutex::new(None),
            file_error_reported: AtomicBool::new(false),
        }
    }

    /// Appends one line to the file sink. Only the first failure is reported,
    /// on stderr, since logging through `log` here would recurse.
    fn write_file_line<W: Write>(&self, sink: &mut W, line: &str) -> bool {
        match writeln!(sink, "{}", line) {
            Ok(()) => true,
            Err(e) => {
                if !self.file_error_reported.swap(true, Ordering::Relaxed) {
                    eprintln!("promptimg logger: cannot write to log file: {}", e);
                }
                false
            }
        }
    }

    fn update_config(&self, new_config: LoggerConfig) -> Result<()> {
        let file = match &new_config.log_file_path {
            Some(path) => Some(OpenOptions::new().create(true).append(true).open(path)?),
            None => None,
        };

        if let Ok(mut log_file) = self.log_file.lock() {
            *log_file = file;
        }
        self.file_error_reported.store(false, Ordering::Relaxed);
        if let Ok(mut config) = self.config.lock() {
            *config = new_config;
        }
        Ok(())
    }

    fn create_log_entry(record: &Record) -> LogEntry {
        LogEntry::new(
            LogLevel::from_log_level(record.level()),
            record.args().to_string(),
            record.module_path().unwrap_or("unknown").to_string(),
            record.file().unwrap_or("unknown").to_string(),
            record.line().unwrap_or(0),
        )
    }
}

pub fn format_entry(entry: &LogEntry, config: &LoggerConfig) -> String {
    if config.output_json {
        return serde_json::to_string(entry).unwrap_or_default();
    }

    let mut output = String::new();

    if config.include_timestamp {
        let timestamp = entry.timestamp.format(&config.timestamp_format).to_string();
        if config.show_colors {
            output.push_str(&format!("{} ", timestamp.bright_black()));
        } else {
            output.push_str(&format!("{} ", timestamp));
        }
    }

    let level = format!("{:<5}", entry.level.as_str());
    if config.show_colors {
        output.push_str(&format!("[{}] ", level.color(entry.level.color()).bold()));
    } else {
        output.push_str(&format!("[{}] ", level));
    }

    if config.show_module && !entry.module.is_empty() {
        if config.show_colors {
            output.push_str(&format!("{}: ", entry.module.bright_blue()));
        } else {
            output.push_str(&format!("{}: ", entry.module));
        }
    }

    output.push_str(&entry.message);

    if config.show_file_location {
        let location = format!("{}:{}", entry.file, entry.line);
        if config.show_colors {
            output.push_str(&format!(" ({})", location.bright_black()));
        } else {
            output.push_str(&format!(" ({})", location));
        }
    }

    output
}

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        match self.config.lock() {
            Ok(config) => metadata.level() <= config.min_level.to_log_level(),
            Err(_) => true,
        }
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let entry = Self::create_log_entry(record);

        let Ok(config) = self.config.lock() else {
            return;
        };
        eprintln!("{}", format_entry(&entry, &config));

        if let Ok(mut log_file) = self.log_file.lock() {
            if let Some(file) = log_file.as_mut() {
                // colour codes don't belong in files
                let plain = LoggerConfig {
                    show_colors: false,
                    ..config.clone()
                };
                self.write_file_line(file, &format_entry(&entry, &plain));
            }
        }
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
        if let Ok(mut log_file) = self.log_file.lock() {
            if let Some(file) = log_file.as_mut() {
                let _ = file.flush();
            }
        }
    }
}

/// Logs how long an operation took when dropped.
pub struct Timer {
    start: Instant,
    name: String,
}

impl Timer {
    pub fn new(name: &str) -> Self {
        log::trace!("Starting timer: {}", name);
        Self {
            start: Instant::now(),
            name: name.to_string(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        log::debug!("{} took {}ms", self.name, self.elapsed().as_millis());
    }
}

pub fn timer(name: &str) -> Timer {
    Timer::new(name)
}

pub fn log_config_info(config: &crate::config::ClientConfig) {
    log::info!("Configuration loaded:");
    match config.endpoint_url() {
        Ok(url) => log::info!("   Endpoint: {}", url),
        Err(e) => log::warn!("   Endpoint: invalid ({})", e),
    }
    log::info!("   Overlapping requests: {:?}", config.overlap);
    match config.timeout {
        Some(timeout) => log::info!("   Transport timeout: {}s", timeout.as_secs()),
        None => log::info!("   Transport timeout: none"),
    }
    if let Some(dir) = &config.save_dir {
        log::info!("   Inline images saved to: {}", dir.display());
    }
}
