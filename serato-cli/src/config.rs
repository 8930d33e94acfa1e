//! CLI configuration

use serde::Serialize;

/// How JSON results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Pretty,
    Compact,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub output: OutputFormat,
    /// Padding requested when a tag has to grow
    pub padding: u32,
    /// Fail on Markers2 data without a BPMLOCK entry instead of retrying tolerant
    pub strict: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output: OutputFormat::Pretty,
            padding: 1024,
            strict: false,
        }
    }
}

impl Config {
    pub fn render<T: Serialize>(&self, value: &T) -> serde_json::Result<String> {
        match self.output {
            OutputFormat::Pretty => serde_json::to_string_pretty(value),
            OutputFormat::Compact => serde_json::to_string(value),
        }
    }
}
