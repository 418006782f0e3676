//! Command-line configuration, parsed with `clap`'s derive API.
//!
//! The only recognized option is `-i`/`--init <path>`, overriding the
//! init-script path. An unrecognized option or stray positional argument is
//! `clap`'s own usage error, which `main` turns into exit status 1.

use std::path::PathBuf;

use clap::Parser;

const DEFAULT_INIT_SCRIPT: &str = "./init.scm";

/// Parsed command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "rascheme", version, about = "A small Scheme interpreter")]
pub struct Config {
    /// Path to the init script loaded before the REPL starts.
    #[arg(short = 'i', long = "init", default_value = DEFAULT_INIT_SCRIPT)]
    pub init_script: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            init_script: PathBuf::from(DEFAULT_INIT_SCRIPT),
        }
    }
}

/// Heap sizing, split out from [`Config`] so tests can shrink the heap
/// without going through argument parsing.
#[derive(Debug, Clone, Copy)]
pub struct HeapConfig {
    pub cell_capacity: usize,
}

impl HeapConfig {
    pub const DEFAULT_CAPACITY: usize = 100_000;
}

impl Default for HeapConfig {
    fn default() -> Self {
        HeapConfig {
            cell_capacity: Self::DEFAULT_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_init_script_is_current_directory() {
        let cfg = Config::parse_from(["rascheme"]);
        assert_eq!(cfg.init_script, PathBuf::from(DEFAULT_INIT_SCRIPT));
    }

    #[test]
    fn accepts_short_and_long_init_flag() {
        let cfg = Config::parse_from(["rascheme", "-i", "other.scm"]);
        assert_eq!(cfg.init_script, PathBuf::from("other.scm"));

        let cfg = Config::parse_from(["rascheme", "--init", "other.scm"]);
        assert_eq!(cfg.init_script, PathBuf::from("other.scm"));
    }

    #[test]
    fn rejects_stray_positional_argument() {
        let result = Config::try_parse_from(["rascheme", "extra.scm"]);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_unknown_flag() {
        let result = Config::try_parse_from(["rascheme", "--bogus"]);
        assert!(result.is_err());
    }
}
