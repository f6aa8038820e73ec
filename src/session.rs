use std::io::{self, BufRead, Write};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::features::{FeatureError, FeatureKind, FeatureSettings};
use crate::pr::ChangeSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuAction {
    Run(FeatureKind),
    Exit,
}

/// Selection table: menu key, label, action.
const MENU: [(&str, &str, MenuAction); 5] = [
    ("1", "Analyze PR Changes", MenuAction::Run(FeatureKind::Changes)),
    ("2", "Review Code Quality", MenuAction::Run(FeatureKind::Quality)),
    ("3", "Check Dependencies", MenuAction::Run(FeatureKind::Dependencies)),
    ("4", "Generate PR Statistics", MenuAction::Run(FeatureKind::Stats)),
    ("5", "Exit", MenuAction::Exit),
];

fn lookup(choice: &str) -> Option<MenuAction> {
    MENU.iter()
        .find(|(key, _, _)| *key == choice)
        .map(|(_, _, action)| *action)
}

/// Print a feature failure, with a specific hint for authentication
/// failures and unknown pull requests.
pub fn report_failure(out: &mut dyn Write, err: &FeatureError) -> io::Result<()> {
    writeln!(out, "Error: {}", err)?;
    match err.status() {
        Some(401) => writeln!(out, "Authentication failed. Please check your GitHub token.")?,
        Some(404) => writeln!(out, "PR not found. Please check the URL.")?,
        _ => {}
    }
    Ok(())
}

/// Interactive menu loop. Feature failures are reported and the loop goes
/// on; only Exit or end of input stops it.
pub struct Session<R, W> {
    source: Arc<dyn ChangeSource>,
    settings: FeatureSettings,
    input: R,
    output: W,
}

impl<R: BufRead, W: Write + Send> Session<R, W> {
    pub fn new(source: Arc<dyn ChangeSource>, settings: FeatureSettings, input: R, output: W) -> Self {
        Self {
            source,
            settings,
            input,
            output,
        }
    }

    fn display_menu(&mut self) -> io::Result<()> {
        writeln!(self.output)?;
        writeln!(self.output, "GitHub PR Assistant")?;
        writeln!(self.output, "{}", "-".repeat(20))?;
        for (key, label, _) in MENU {
            writeln!(self.output, "{}. {}", key, label)?;
        }
        Ok(())
    }

    /// Print a prompt and read one trimmed line; None at end of input.
    fn prompt(&mut self, text: &str) -> io::Result<Option<String>> {
        write!(self.output, "{}", text)?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    pub async fn run(&mut self) -> io::Result<()> {
        loop {
            self.display_menu()?;
            let Some(choice) = self.prompt("\nSelect an option: ")? else {
                debug!("input closed at menu prompt");
                break;
            };

            let kind = match lookup(&choice) {
                Some(MenuAction::Run(kind)) => kind,
                Some(MenuAction::Exit) => break,
                None => {
                    writeln!(self.output, "Invalid option.")?;
                    continue;
                }
            };

            let Some(reference) = self.prompt("Enter PR URL: ")? else {
                debug!("input closed at reference prompt");
                break;
            };

            let feature = kind.build(self.source.clone(), &self.settings);
            info!(feature = feature.name(), "running feature");
            if let Err(e) = feature.process(&reference, &mut self.output).await {
                warn!(feature = feature.name(), error = %e, "feature failed");
                report_failure(&mut self.output, &e)?;
            }
        }

        writeln!(self.output, "Goodbye!")?;
        self.output.flush()
    }
}
