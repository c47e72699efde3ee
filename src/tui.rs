//! Operator-facing notices.
//!
//! Everything here goes to stderr: stdout is reserved for result lines so a
//! sweep can be piped straight into other tools.
use colored::Colorize;

/// Prints a red `[!]` notice. Accessible mode drops the decoration.
#[macro_export]
macro_rules! warning {
    ($name:expr) => {
        eprintln!("{} {}", ::colored::Colorize::bold(::colored::Colorize::red("[!]")), $name);
    };
    ($name:expr, $accessible:expr) => {
        if $accessible {
            eprintln!("{}", $name);
        } else {
            eprintln!("{} {}", ::colored::Colorize::bold(::colored::Colorize::red("[!]")), $name);
        }
    };
}

/// Prints a blue `[~]` progress detail. Accessible mode drops the decoration.
#[macro_export]
macro_rules! detail {
    ($name:expr) => {
        eprintln!("{} {}", ::colored::Colorize::bold(::colored::Colorize::blue("[~]")), $name);
    };
    ($name:expr, $accessible:expr) => {
        if $accessible {
            eprintln!("{}", $name);
        } else {
            eprintln!("{} {}", ::colored::Colorize::bold(::colored::Colorize::blue("[~]")), $name);
        }
    };
}

/// The opening lines shown before a sweep.
#[must_use]
pub fn banner(accessible: bool) -> String {
    let title = format!("Sand-Devil v{}", env!("CARGO_PKG_VERSION"));
    let tagline = "Reverse DNS, filtered by keyword, across a whole network.";
    if accessible {
        format!("{title}\n{tagline}\n")
    } else {
        format!("{}\n{}\n", title.bold().yellow(), tagline.dimmed())
    }
}
