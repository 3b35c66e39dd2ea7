//! Output rendering and formatting

use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use console::{Style, Term};
use firstrun_ops::{OperationResult, RepositoryListing, RepositoryStatus};
use firstrun_types::{ColorChoice, ProvisionOutcome, ProvisionReport, ReadinessState};
use std::io;
use std::time::Duration;

/// Output renderer for CLI results
#[derive(Clone)]
pub struct OutputRenderer {
    /// Use JSON output format
    json_output: bool,
    /// Color configuration
    color_choice: ColorChoice,
    /// Terminal instance
    term: Term,
}

impl OutputRenderer {
    /// Create new output renderer
    pub fn new(json_output: bool, color_choice: ColorChoice) -> Self {
        Self {
            json_output,
            color_choice,
            term: Term::stdout(),
        }
    }

    /// Render operation result
    pub fn render_result(&self, result: &OperationResult) -> io::Result<()> {
        if self.json_output {
            self.render_json(result)
        } else {
            self.render_table(result)
        }
    }

    /// Render as JSON
    fn render_json(&self, result: &OperationResult) -> io::Result<()> {
        let json = result.to_json().map_err(io::Error::other)?;
        println!("{json}");
        Ok(())
    }

    /// Render as formatted table
    fn render_table(&self, result: &OperationResult) -> io::Result<()> {
        match result {
            OperationResult::AppList(listing) => self.render_app_list(listing),
            OperationResult::RepositoryStatus(status) => self.render_repository_status(status),
            OperationResult::ProvisionReport(report) => self.render_provision_report(report),
            OperationResult::Readiness(state) => self.render_readiness(*state),
            OperationResult::Success(message) => {
                println!("{message}");
                Ok(())
            }
        }
    }

    /// Render the apps offered by a repository
    fn render_app_list(&self, listing: &RepositoryListing) -> io::Result<()> {
        println!(
            "{} ({} layout, category {})",
            self.bold(&listing.repository.display().to_string()),
            listing.layout,
            listing.category
        );

        if listing.apps.is_empty() {
            println!("No apps found.");
        } else {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic);

            table.set_header(vec![
                Cell::new("").add_attribute(Attribute::Bold),
                Cell::new("Name").add_attribute(Attribute::Bold),
                Cell::new("Package").add_attribute(Attribute::Bold),
                Cell::new("Categories").add_attribute(Attribute::Bold),
                Cell::new("Summary").add_attribute(Attribute::Bold),
            ]);

            for app in &listing.apps {
                let mark = if app.checked {
                    Cell::new("x").fg(Color::Green)
                } else {
                    Cell::new(" ")
                };
                table.add_row(vec![
                    mark,
                    Cell::new(app.display_name.as_deref().unwrap_or("-")),
                    Cell::new(&app.package_id),
                    Cell::new(app.categories.join(", ")),
                    Cell::new(app.summary.as_deref().unwrap_or("-")),
                ]);
            }

            println!("{table}");
            println!(
                "{} apps, {} selected",
                listing.apps.len(),
                listing.checked().count()
            );
        }

        if !listing.skipped.is_empty() {
            println!();
            println!("Skipped entries:");
            for entry in &listing.skipped {
                println!("  - {entry}");
            }
        }

        Ok(())
    }

    fn render_repository_status(&self, status: &RepositoryStatus) -> io::Result<()> {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        table.add_row(vec![
            Cell::new("Repository").add_attribute(Attribute::Bold),
            Cell::new(status.repository.display()),
        ]);
        table.add_row(vec![
            Cell::new("Layout").add_attribute(Attribute::Bold),
            Cell::new(status.layout.as_deref().unwrap_or("-")),
        ]);
        let usable = if status.usable {
            Cell::new("yes").fg(Color::Green)
        } else {
            Cell::new("no").fg(Color::Red)
        };
        table.add_row(vec![Cell::new("Usable").add_attribute(Attribute::Bold), usable]);
        if let Some(problem) = &status.problem {
            table.add_row(vec![
                Cell::new("Problem").add_attribute(Attribute::Bold),
                Cell::new(problem).fg(Color::Yellow),
            ]);
        }
        table.add_row(vec![
            Cell::new("Readiness").add_attribute(Attribute::Bold),
            Self::readiness_cell(status.readiness),
        ]);

        println!("{table}");
        Ok(())
    }

    fn render_provision_report(&self, report: &ProvisionReport) -> io::Result<()> {
        let (icon, summary) = match &report.outcome {
            ProvisionOutcome::AllInstalled => ("[OK]", "all expected apps installed".to_string()),
            ProvisionOutcome::NothingExpected => ("[OK]", "nothing to wait for".to_string()),
            ProvisionOutcome::AlreadyComplete => {
                ("[OK]", "provisioning was already complete".to_string())
            }
            ProvisionOutcome::TimedOut { missing } => (
                "[WARN]",
                format!("timed out with {} apps missing", missing.len()),
            ),
        };
        println!("{icon} Provisioning {summary}");
        println!("Run: {}", report.run_id);
        println!("Duration: {}", format_duration(report.duration));

        if !report.expected.is_empty() {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec![
                Cell::new("Package").add_attribute(Attribute::Bold),
                Cell::new("Status").add_attribute(Attribute::Bold),
            ]);
            for package_id in &report.expected {
                let status = if report.observed.contains(package_id) {
                    Cell::new("installed").fg(Color::Green)
                } else {
                    Cell::new("missing").fg(Color::Yellow)
                };
                table.add_row(vec![Cell::new(package_id), status]);
            }
            println!();
            println!("{table}");
        }

        if !report.failed.is_empty() {
            println!();
            println!("Failed archives:");
            for failure in &report.failed {
                match &failure.code {
                    Some(code) => println!("  - {} ({code}): {}", failure.archive, failure.message),
                    None => println!("  - {}: {}", failure.archive, failure.message),
                }
            }
        }

        Ok(())
    }

    fn render_readiness(&self, state: ReadinessState) -> io::Result<()> {
        let text = match state {
            ReadinessState::Ready => "Device is ready",
            ReadinessState::Skipped => "Device is ready (provisioning skipped)",
            ReadinessState::Pending => "Provisioning still pending",
        };
        println!("{}", self.bold(text));
        Ok(())
    }

    fn readiness_cell(state: ReadinessState) -> Cell {
        let cell = Cell::new(state);
        match state {
            ReadinessState::Ready => cell.fg(Color::Green),
            ReadinessState::Skipped => cell.fg(Color::Cyan),
            ReadinessState::Pending => cell.fg(Color::Yellow),
        }
    }

    fn bold(&self, text: &str) -> String {
        if self.supports_color() {
            Style::new().bold().apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }

    /// Check if color output is supported
    fn supports_color(&self) -> bool {
        match self.color_choice {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => self.term.features().colors_supported(),
        }
    }
}

fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{millis}ms")
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_millis(2500)), "2.5s");
    }
}
