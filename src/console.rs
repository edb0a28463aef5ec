use colored::Colorize;
use std::fmt;
use std::io::Write;
use std::sync::{Arc, OnceLock};

/// Verbosity levels for console output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum VerbosityLevel {
    /// Only show errors
    Quiet = 0,
    /// Normal output (default)
    #[default]
    Normal = 1,
    /// Verbose output with additional info
    Verbose = 2,
    /// Debug output with detailed information
    Debug = 3,
}

impl fmt::Display for VerbosityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerbosityLevel::Quiet => write!(f, "quiet"),
            VerbosityLevel::Normal => write!(f, "normal"),
            VerbosityLevel::Verbose => write!(f, "verbose"),
            VerbosityLevel::Debug => write!(f, "debug"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Console {
    verbosity: VerbosityLevel,
}

impl Console {
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self { verbosity }
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        self.verbosity
    }

    fn should_show(&self, level: VerbosityLevel) -> bool {
        self.verbosity >= level
    }

    pub fn error(&self, message: &str) {
        if self.verbosity > VerbosityLevel::Quiet {
            eprintln!("❌ {}", message);
        }
    }

    pub fn warning(&self, message: &str) {
        if self.should_show(VerbosityLevel::Normal) {
            println!("⚠️  {}", message);
        }
    }

    pub fn info(&self, message: &str) {
        if self.should_show(VerbosityLevel::Normal) {
            println!("ℹ️  {}", message);
        }
    }

    pub fn success(&self, message: &str) {
        if self.should_show(VerbosityLevel::Normal) {
            println!("✅ {}", message);
        }
    }

    pub fn thinking(&self) {
        if self.should_show(VerbosityLevel::Normal) {
            println!("{}", "🔄 Thinking...".dimmed());
        }
    }

    /// Streamed token fragment; no newline, flushed immediately.
    pub fn token(&self, fragment: &str) {
        if self.should_show(VerbosityLevel::Normal) {
            print!("{}", fragment);
            let _ = std::io::stdout().flush();
        }
    }

    pub fn tool_call(&self, tool_name: &str, args_summary: &str) {
        if !self.should_show(VerbosityLevel::Normal) {
            return;
        }
        println!(
            "{} {}{}{}{}",
            "⏺".dimmed(),
            tool_name.green(),
            "(".dimmed(),
            args_summary.dimmed(),
            ")".dimmed()
        );
    }

    pub fn tool_result_summary(&self, summary: &str) {
        if self.should_show(VerbosityLevel::Normal) {
            println!("  {} {}", "⎿".dimmed(), summary.dimmed());
        }
    }

    pub fn agent_started(&self, agent_name: &str) {
        if self.should_show(VerbosityLevel::Normal) {
            println!("{} {}", "»".dimmed(), agent_name.cyan());
        }
    }

    pub fn approval_request(&self, tool_name: &str, message: &str, countdown: Option<&str>) {
        if !self.should_show(VerbosityLevel::Normal) {
            return;
        }
        match countdown {
            Some(remaining) => println!(
                "🔔 {} {} {}",
                tool_name.yellow(),
                message,
                format!("(expires in {})", remaining).dimmed()
            ),
            None => println!("🔔 {} {}", tool_name.yellow(), message),
        }
    }

    pub fn verbose(&self, message: &str) {
        if self.should_show(VerbosityLevel::Verbose) {
            println!("{}", message);
        }
    }

    pub fn debug(&self, message: &str) {
        if self.should_show(VerbosityLevel::Debug) {
            println!("🐛 DEBUG: {}", message);
        }
    }

    pub fn plain(&self, message: &str) {
        if self.should_show(VerbosityLevel::Normal) {
            println!("{}", message);
        }
    }

    pub fn newline(&self) {
        if self.should_show(VerbosityLevel::Normal) {
            println!();
        }
    }

    pub fn welcome(&self, base_url: &str) {
        if self.should_show(VerbosityLevel::Normal) {
            println!("🚀 Welcome to palaver! Connected to: {}", base_url);
        }
    }

    pub fn goodbye(&self) {
        if self.should_show(VerbosityLevel::Normal) {
            println!("👋 Goodbye!");
        }
    }
}

static GLOBAL_CONSOLE: OnceLock<Arc<Console>> = OnceLock::new();

pub fn init_console(verbosity: VerbosityLevel) {
    let _ = GLOBAL_CONSOLE.set(Arc::new(Console::new(verbosity)));
}

pub fn console() -> Arc<Console> {
    GLOBAL_CONSOLE
        .get_or_init(|| Arc::new(Console::new(VerbosityLevel::Normal)))
        .clone()
}
