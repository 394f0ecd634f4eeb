//! Terminal rendering of probe outcomes
//!
//! Hits go to stdout as a two-line block, failures to stderr as a single
//! line. Targets without reflection print nothing.

use colored::Colorize;
use std::io::{self, Write};

use crate::reflection::Reflection;
use crate::scan::models::ProbeOutcome;

#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    /// Writes `outcome` to `out` (hits) or `err` (failures)
    pub fn render<O: Write, E: Write>(
        &self,
        outcome: &ProbeOutcome,
        out: &mut O,
        err: &mut E,
    ) -> io::Result<()> {
        let task = &outcome.task;
        let reflection = match &outcome.result {
            Ok(reflection) => reflection,
            Err(e) => {
                return writeln!(
                    err,
                    "Error probing {} with path {}: {:#}",
                    task.origin, task.path, e
                );
            }
        };
        if !reflection.is_hit() {
            return Ok(());
        }

        let display_url = task.display_url();
        if task.was_redirected() {
            writeln!(
                out,
                "URL: {} ==> {}",
                self.url(&task.original_url),
                self.url(&display_url)
            )?;
        } else {
            writeln!(out, "URL: {}", self.url(&display_url))?;
        }
        writeln!(out, "Reflected Characters: {}", self.characters(reflection))
    }

    fn url(&self, url: &str) -> String {
        if self.color {
            url.blue().to_string()
        } else {
            url.to_string()
        }
    }

    fn characters(&self, reflection: &Reflection) -> String {
        let chars: Vec<String> = reflection.characters().iter().map(char::to_string).collect();
        let list = format!("[{}]", chars.join(" "));
        let list = if self.color { list.red().to_string() } else { list };

        if reflection.is_basic() {
            format!("{} [basic]", list)
        } else {
            list
        }
    }
}
