//! Human-readable rendering of command reports.

use std::io::{self, Write};

use super::models::{CheckReport, InfoReport, PluginReport, RemovalReport};

/// Writes a report as human-readable lines.
pub(crate) trait Render {
    /// Renders `self` into `out`.
    fn render(&self, out: &mut dyn Write) -> io::Result<()>;
}

impl Render for PluginReport {
    fn render(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(
            out,
            "#{} {:<10} {} ({})",
            self.id, self.status, self.libpath, self.symbolname
        )?;
        if let Some(info) = &self.info {
            render_info(info, out)?;
        }
        if let Some(reason) = &self.reason {
            writeln!(out, "    {reason}")?;
        }
        for setting in &self.settings {
            writeln!(
                out,
                "    {} = {} ({})",
                setting.name, setting.value, setting.kind
            )?;
        }
        Ok(())
    }
}

impl Render for [PluginReport] {
    fn render(&self, out: &mut dyn Write) -> io::Result<()> {
        if self.is_empty() {
            return writeln!(out, "no plugins registered");
        }
        self.iter().try_for_each(|report| report.render(out))
    }
}

impl Render for RemovalReport {
    fn render(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(
            out,
            "removed #{} {} ({})",
            self.id, self.libpath, self.symbolname
        )
    }
}

impl Render for CheckReport {
    fn render(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "{} ({}): {}", self.libpath, self.symbolname, self.verdict)
    }
}

fn render_info(info: &InfoReport, out: &mut dyn Write) -> io::Result<()> {
    if info.description.is_empty() {
        writeln!(out, "    {} {}", info.name, info.version)
    } else {
        writeln!(
            out,
            "    {} {}: {}",
            info.name, info.version, info.description
        )
    }
}
