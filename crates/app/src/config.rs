use std::fmt;
use std::path::PathBuf;

use learn_core::model::{CourseId, ModuleId};

pub const SNAPSHOT_ENV: &str = "LEARN_SNAPSHOT";
pub const DEFAULT_SNAPSHOT: &str = "snapshot.json";

#[derive(Debug, PartialEq, Eq)]
pub enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidId { flag: &'static str, raw: String },
    InvalidMinutes { raw: String },
    InvalidPath { flag: &'static str },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidId { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidMinutes { raw } => write!(f, "invalid --minutes value: {raw}"),
            ArgsError::InvalidPath { flag } => write!(f, "{flag} cannot be empty"),
        }
    }
}

impl std::error::Error for ArgsError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Per-module statuses and progress for one course.
    Course { course_id: CourseId },
    /// Progress across enrolled courses plus module buckets.
    Dashboard,
    /// Mark a module completed, optionally writing the updated snapshot.
    Complete {
        module_id: ModuleId,
        minutes: u32,
        out: Option<PathBuf>,
    },
    /// Strict ordinal validation of every course in the snapshot.
    Check,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub snapshot: PathBuf,
    pub command: Command,
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  app course    --course <id>  [--snapshot <path>]");
    eprintln!("  app dashboard                [--snapshot <path>]");
    eprintln!("  app complete  --module <id>  [--minutes <n>] [--out <path>] [--snapshot <path>]");
    eprintln!("  app check                    [--snapshot <path>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --snapshot {DEFAULT_SNAPSHOT}");
    eprintln!("  --minutes 0");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  {SNAPSHOT_ENV}, RUST_LOG");
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_id<T: std::str::FromStr>(flag: &'static str, raw: String) -> Result<T, ArgsError> {
    raw.parse().map_err(|_| ArgsError::InvalidId { flag, raw })
}

fn parse_path(flag: &'static str, raw: String) -> Result<PathBuf, ArgsError> {
    if raw.trim().is_empty() {
        return Err(ArgsError::InvalidPath { flag });
    }
    Ok(PathBuf::from(raw))
}

impl AppConfig {
    /// Parse command-line arguments (without the program name).
    ///
    /// `env` looks up environment variables; it is injected so tests do not
    /// depend on the process environment.
    pub fn parse(
        args: impl IntoIterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ArgsError> {
        let mut args = args.into_iter();
        let mut snapshot = env(SNAPSHOT_ENV)
            .filter(|value| !value.trim().is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_SNAPSHOT), PathBuf::from);

        let Some(name) = args.next() else {
            return Ok(Self {
                snapshot,
                command: Command::Help,
            });
        };

        let mut course_id: Option<CourseId> = None;
        let mut module_id: Option<ModuleId> = None;
        let mut minutes = 0_u32;
        let mut out: Option<PathBuf> = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--snapshot" => {
                    snapshot = parse_path("--snapshot", require_value(&mut args, "--snapshot")?)?;
                }
                "--course" => {
                    course_id = Some(parse_id("--course", require_value(&mut args, "--course")?)?);
                }
                "--module" => {
                    module_id = Some(parse_id("--module", require_value(&mut args, "--module")?)?);
                }
                "--minutes" => {
                    let value = require_value(&mut args, "--minutes")?;
                    minutes = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidMinutes { raw: value.clone() })?;
                }
                "--out" => out = Some(parse_path("--out", require_value(&mut args, "--out")?)?),
                "--help" | "-h" => {
                    return Ok(Self {
                        snapshot,
                        command: Command::Help,
                    });
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let command = match name.as_str() {
            "course" => Command::Course {
                course_id: course_id.ok_or(ArgsError::MissingFlag { flag: "--course" })?,
            },
            "dashboard" => Command::Dashboard,
            "complete" => Command::Complete {
                module_id: module_id.ok_or(ArgsError::MissingFlag { flag: "--module" })?,
                minutes,
                out,
            },
            "check" => Command::Check,
            "help" | "--help" | "-h" => Command::Help,
            _ => return Err(ArgsError::UnknownCommand(name)),
        };

        Ok(Self { snapshot, command })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_string()).collect()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn parses_course_command() {
        let config = AppConfig::parse(args(&["course", "--course", "3"]), no_env).unwrap();
        assert_eq!(config.snapshot, PathBuf::from(DEFAULT_SNAPSHOT));
        assert_eq!(
            config.command,
            Command::Course {
                course_id: CourseId::new(3)
            }
        );
    }

    #[test]
    fn snapshot_falls_back_to_env_then_flag_wins() {
        let env = |key: &str| (key == SNAPSHOT_ENV).then(|| "from-env.json".to_string());

        let config = AppConfig::parse(args(&["dashboard"]), env).unwrap();
        assert_eq!(config.snapshot, PathBuf::from("from-env.json"));

        let config =
            AppConfig::parse(args(&["dashboard", "--snapshot", "flag.json"]), env).unwrap();
        assert_eq!(config.snapshot, PathBuf::from("flag.json"));
    }

    #[test]
    fn complete_requires_module() {
        let err = AppConfig::parse(args(&["complete", "--minutes", "5"]), no_env).unwrap_err();
        assert_eq!(err, ArgsError::MissingFlag { flag: "--module" });

        let config = AppConfig::parse(
            args(&["complete", "--module", "7", "--minutes", "5", "--out", "next.json"]),
            no_env,
        )
        .unwrap();
        assert_eq!(
            config.command,
            Command::Complete {
                module_id: ModuleId::new(7),
                minutes: 5,
                out: Some(PathBuf::from("next.json")),
            }
        );
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            AppConfig::parse(args(&["course", "--course", "abc"]), no_env),
            Err(ArgsError::InvalidId { flag: "--course", .. })
        ));
        assert!(matches!(
            AppConfig::parse(args(&["course", "--course"]), no_env),
            Err(ArgsError::MissingValue { flag: "--course" })
        ));
        assert!(matches!(
            AppConfig::parse(args(&["launch"]), no_env),
            Err(ArgsError::UnknownCommand(_))
        ));
        assert!(matches!(
            AppConfig::parse(args(&["dashboard", "--verbose"]), no_env),
            Err(ArgsError::UnknownArg(_))
        ));
    }

    #[test]
    fn empty_args_show_help() {
        let config = AppConfig::parse(Vec::<String>::new(), no_env).unwrap();
        assert_eq!(config.command, Command::Help);
    }
}
