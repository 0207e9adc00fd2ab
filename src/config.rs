use std::env;

use anyhow::{anyhow, bail, Context, Result};

use crate::executor::ExhaustionPolicy;
use crate::parser::{OverflowPolicy, ParseOptions, LEGACY_MAX_ARGS};

pub const DEFAULT_PROMPT: &str = "$ ";

pub const USAGE: &str = "usage: tsh-rs [-c <line>] [--prompt <text>] [--max-args <n>] [--strict-args] [--on-exhaustion fatal|recover]";

/// Runtime options. Environment variables give the defaults, CLI flags win.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub prompt: String,
    pub parse: ParseOptions,
    pub exhaustion: ExhaustionPolicy,
    /// `-c <line>`: run one line and exit instead of reading stdin.
    pub command: Option<String>,
    pub show_help: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            prompt: DEFAULT_PROMPT.to_string(),
            parse: ParseOptions::default(),
            exhaustion: ExhaustionPolicy::default(),
            command: None,
            show_help: false,
        }
    }
}

fn parse_policy(v: &str) -> Result<ExhaustionPolicy> {
    match v {
        "fatal" => Ok(ExhaustionPolicy::Fatal),
        "recover" => Ok(ExhaustionPolicy::Recover),
        other => bail!("invalid exhaustion policy `{other}` (expected fatal or recover)"),
    }
}

fn parse_limit(v: &str) -> Result<usize> {
    let n: usize = v.parse().with_context(|| format!("invalid argument limit `{v}`"))?;
    if n == 0 { bail!("argument limit must be at least 1"); }
    Ok(n)
}

fn is_truthy(v: &str) -> bool {
    matches!(v, "1" | "true" | "yes" | "on")
}

impl Config {
    pub fn load<I: IntoIterator<Item = String>>(args: I) -> Result<Self> {
        let mut config = Config::from_vars(|k| env::var(k).ok())?;
        config.apply_args(args)?;
        Ok(config)
    }

    /// Reads `TSH_PROMPT`, `TSH_MAX_ARGS`, `TSH_STRICT_ARGS` and `TSH_ON_EXHAUSTION`.
    pub fn from_vars<F: Fn(&str) -> Option<String>>(var: F) -> Result<Self> {
        let mut config = Config::default();
        if let Some(p) = var("TSH_PROMPT") { config.prompt = p; }
        if let Some(v) = var("TSH_MAX_ARGS") {
            config.parse.max_args = Some(parse_limit(&v).context("TSH_MAX_ARGS")?);
        }
        if var("TSH_STRICT_ARGS").is_some_and(|v| is_truthy(&v)) {
            config.set_strict_args();
        }
        if let Some(v) = var("TSH_ON_EXHAUSTION") {
            config.exhaustion = parse_policy(&v).context("TSH_ON_EXHAUSTION")?;
        }
        Ok(config)
    }

    pub fn apply_args<I: IntoIterator<Item = String>>(&mut self, args: I) -> Result<()> {
        let mut args = args.into_iter();
        while let Some(a) = args.next() {
            match a.as_str() {
                "-c" => { self.command = Some(args.next().ok_or_else(|| anyhow!("missing line after -c"))?); }
                "--prompt" => { self.prompt = args.next().ok_or_else(|| anyhow!("missing value after --prompt"))?; }
                "--max-args" => {
                    let v = args.next().ok_or_else(|| anyhow!("missing value after --max-args"))?;
                    self.parse.max_args = Some(parse_limit(&v)?);
                }
                "--strict-args" => self.set_strict_args(),
                "--on-exhaustion" => {
                    let v = args.next().ok_or_else(|| anyhow!("missing value after --on-exhaustion"))?;
                    self.exhaustion = parse_policy(&v)?;
                }
                "-h" | "--help" => self.show_help = true,
                other => bail!("unknown arg: {other}\n{USAGE}"),
            }
        }
        Ok(())
    }

    // strict checking without an explicit limit enforces the historical capacity
    fn set_strict_args(&mut self) {
        self.parse.overflow = OverflowPolicy::Reject;
        self.parse.max_args.get_or_insert(LEGACY_MAX_ARGS);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_match_the_reference_shell() {
        let c = Config::from_vars(vars(&[])).unwrap();
        assert_eq!(c.prompt, "$ ");
        assert_eq!(c.parse, ParseOptions::default());
        assert_eq!(c.exhaustion, ExhaustionPolicy::Fatal);
        assert_eq!(c.command, None);
    }

    #[test]
    fn environment_sets_defaults() {
        let c = Config::from_vars(vars(&[
            ("TSH_PROMPT", "> "),
            ("TSH_MAX_ARGS", "8"),
            ("TSH_ON_EXHAUSTION", "recover"),
        ]))
        .unwrap();
        assert_eq!(c.prompt, "> ");
        assert_eq!(c.parse.max_args, Some(8));
        assert_eq!(c.parse.overflow, OverflowPolicy::Truncate);
        assert_eq!(c.exhaustion, ExhaustionPolicy::Recover);
    }

    #[test]
    fn invalid_environment_is_an_error() {
        let err = Config::from_vars(vars(&[("TSH_ON_EXHAUSTION", "sometimes")])).unwrap_err();
        assert!(format!("{err:#}").contains("TSH_ON_EXHAUSTION"));
        assert!(Config::from_vars(vars(&[("TSH_MAX_ARGS", "0")])).is_err());
        assert!(Config::from_vars(vars(&[("TSH_MAX_ARGS", "many")])).is_err());
    }

    #[test]
    fn flags_override_environment() {
        let mut c = Config::from_vars(vars(&[("TSH_PROMPT", "> "), ("TSH_ON_EXHAUSTION", "recover")])).unwrap();
        c.apply_args(args(&["--prompt", "tsh> ", "--on-exhaustion", "fatal", "-c", "ls | wc"])).unwrap();
        assert_eq!(c.prompt, "tsh> ");
        assert_eq!(c.exhaustion, ExhaustionPolicy::Fatal);
        assert_eq!(c.command.as_deref(), Some("ls | wc"));
    }

    #[test]
    fn strict_args_falls_back_to_legacy_limit() {
        let mut c = Config::default();
        c.apply_args(args(&["--strict-args"])).unwrap();
        assert_eq!(c.parse, ParseOptions { max_args: Some(LEGACY_MAX_ARGS), overflow: OverflowPolicy::Reject });

        let mut c = Config::default();
        c.apply_args(args(&["--max-args", "3", "--strict-args"])).unwrap();
        assert_eq!(c.parse.max_args, Some(3));
    }

    #[test]
    fn bad_flags_are_reported() {
        assert!(Config::default().apply_args(args(&["-c"])).is_err());
        assert!(Config::default().apply_args(args(&["--max-args", "x"])).is_err());
        let err = Config::default().apply_args(args(&["--bogus"])).unwrap_err();
        assert!(err.to_string().starts_with("unknown arg: --bogus"));
    }
}
