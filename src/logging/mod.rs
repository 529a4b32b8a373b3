//! Structured Logging & Tracing
//!
//! Structured logging via the `tracing` crate:
//! - Filters per core module (layout, scene, gamebar, progress, game,
//!   hotreload, plugin), read from the `logging` section of the game config
//! - `RUST_LOG` takes precedence over the configured filters
//! - Idempotent initialization (safe to call from tests, the binary and the plugin)
//! - `LayoutPassTimer`: span around one generator pass, reporting the level,
//!   the buildings placed and the wall time when it closes

use serde::{Deserialize, Serialize};
use std::sync::Once;
use std::time::{Duration, Instant};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Log level for the merge core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// `logging` section of the game config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    pub default_level: LogLevel,
    /// `(module path, level)`; later entries for the same module win
    pub module_filters: Vec<(String, LogLevel)>,
    pub show_targets: bool,
    pub show_file_line: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        let filters = [
            // per-candidate probe noise stays out of the default output
            ("scene", LogLevel::Warn),
            ("layout", LogLevel::Info),
            ("gamebar", LogLevel::Debug),
            ("progress", LogLevel::Info),
            ("game", LogLevel::Info),
            ("hotreload", LogLevel::Warn),
            ("plugin", LogLevel::Info),
        ];
        Self {
            default_level: LogLevel::Info,
            module_filters: filters
                .iter()
                .map(|(module, level)| (format!("merge_core::{}", module), *level))
                .collect(),
            show_targets: true,
            show_file_line: false,
        }
    }
}

impl TracingConfig {
    /// Set (or replace) the level of one module
    pub fn with_module(mut self, module: &str, level: LogLevel) -> Self {
        self.module_filters.retain(|(m, _)| m != module);
        self.module_filters.push((module.to_string(), level));
        self
    }

    pub fn to_env_filter_string(&self) -> String {
        let mut parts = vec![self.default_level.as_str().to_string()];
        for (module, level) in &self.module_filters {
            parts.push(format!("{}={}", module, level.as_str()));
        }
        parts.join(",")
    }
}

static TRACING_INIT: Once = Once::new();

/// Initialize tracing with default settings (idempotent)
pub fn init_tracing_default() {
    init_tracing(&TracingConfig::default());
}

/// Initialize tracing with a custom config (first call wins)
pub fn init_tracing(config: &TracingConfig) {
    let filter_str = config.to_env_filter_string();
    let show_targets = config.show_targets;
    let show_file_line = config.show_file_line;
    TRACING_INIT.call_once(move || {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(show_targets)
            .with_file(show_file_line)
            .with_line_number(show_file_line)
            .compact();

        // Bevy's LogPlugin may already own the global subscriber
        let _ = subscriber.try_init();
    });
}

/// Entered `layout_pass` span; logs the pass summary when dropped
pub struct LayoutPassTimer {
    pass: &'static str,
    level_index: usize,
    placed: u32,
    started: Instant,
    _span: tracing::span::EnteredSpan,
}

impl LayoutPassTimer {
    pub fn start(pass: &'static str, level_index: usize) -> Self {
        let span = tracing::info_span!("layout_pass", pass, level = level_index);
        Self {
            pass,
            level_index,
            placed: 0,
            started: Instant::now(),
            _span: span.entered(),
        }
    }

    pub fn set_placed(&mut self, placed: u32) {
        self.placed = placed;
    }

    pub fn placed(&self) -> u32 {
        self.placed
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Drop for LayoutPassTimer {
    fn drop(&mut self) {
        debug!(
            pass = self.pass,
            level = self.level_index,
            placed = self.placed,
            elapsed_ms = self.elapsed().as_secs_f64() * 1000.0,
            "layout pass finished"
        );
    }
}
