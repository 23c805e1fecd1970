//! GNU-style command-line option parsing driven by declarative option specs.
//!
//! Parsing is a three-stage pipeline:
//! - [`compile`] normalizes [`Decl`]s into [`OptionSpec`]s and checks their invariants
//! - [`tokenize`] splits argv into option [`Token`]s and positional arguments
//! - [`resolve`] merges tokens into an [`OptionMap`], collecting user-facing errors
//!
//! [`parse_opts`] runs all three and renders a help [`summary`](summarize).
//!
//! ```
//! use gnuopt::{Decl, ParseConfig, Value, parse_opts};
//!
//! let decls = vec![
//!     Decl::new("-p", "--port PORT", "Port number")
//!         .default(80)
//!         .parse_fn(|v| Ok(Value::Int(v.as_str().unwrap_or_default().parse()?))),
//!     Decl::new("-v", "", "Verbosity level")
//!         .id("verbosity")
//!         .default(0)
//!         .update_fn(|old| Value::Int(old.and_then(Value::as_int).unwrap_or(0) + 1)),
//! ];
//!
//! let parsed = parse_opts(&["-vvp8080", "file.txt"], decls, &ParseConfig::default()).unwrap();
//! assert!(parsed.errors.is_empty());
//! assert_eq!(parsed.options["port"], Value::Int(8080));
//! assert_eq!(parsed.options["verbosity"], Value::Int(2));
//! assert_eq!(parsed.arguments, vec!["file.txt"]);
//! ```

mod compile;
mod error;
mod resolve;
mod spec;
mod summary;
mod tokenize;
mod value;

pub use compile::{compile, required_switches};
pub use error::{ConfigError, OptionError};
pub use resolve::{Resolution, ResolveFlags, default_options, resolve};
pub use spec::{
    AssocFn, Decl, DefaultFn, Message, OptionSpec, ParseFn, Predicate, SpecRecord, UpdateFn,
    Validator,
};
pub use summary::{SummaryFn, format_lines, summarize, summary_part};
pub use tokenize::{Schema, Token, Tokenized, tokenize};
pub use value::{OptionMap, Value};

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Parser behavior switches.
#[derive(Clone, Default)]
pub struct ParseConfig {
    /// Stop option processing at the first positional argument.
    pub in_order: bool,
    /// Leave out ids that were not set on the command line.
    pub no_defaults: bool,
    /// Refuse option arguments that look like a known switch.
    pub strict: bool,
    /// Replaces [`summarize`] for the `summary` field.
    pub summary_fn: Option<SummaryFn>,
}

impl ParseConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_order(mut self, in_order: bool) -> Self {
        self.in_order = in_order;
        self
    }

    pub fn no_defaults(mut self, no_defaults: bool) -> Self {
        self.no_defaults = no_defaults;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn summary_fn(
        mut self,
        f: impl Fn(&[OptionSpec]) -> String + Send + Sync + 'static,
    ) -> Self {
        self.summary_fn = Some(Arc::new(f));
        self
    }

    fn resolve_flags(&self) -> ResolveFlags {
        ResolveFlags {
            no_defaults: self.no_defaults,
            strict: self.strict,
        }
    }
}

impl fmt::Debug for ParseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseConfig")
            .field("in_order", &self.in_order)
            .field("no_defaults", &self.no_defaults)
            .field("strict", &self.strict)
            .field("summary_fn", &self.summary_fn.is_some())
            .finish()
    }
}

/// Result of parsing a command line.
///
/// `errors` being empty means success; problems with the command line are
/// never reported any other way.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Parsed {
    pub options: OptionMap,
    pub arguments: Vec<String>,
    pub summary: String,
    pub errors: Vec<String>,
}

impl Parsed {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Compile `decls` and parse `args` against them.
///
/// Only misconfigured declarations fail; command-line problems end up in
/// [`Parsed::errors`].
pub fn parse_opts<S, I>(args: &[S], decls: I, config: &ParseConfig) -> Result<Parsed, ConfigError>
where
    S: AsRef<str>,
    I: IntoIterator<Item = Decl>,
{
    let specs = compile(decls)?;
    Ok(parse_compiled(&specs, args, config))
}

/// Parse `args` against already compiled specs.
pub fn parse_compiled<S: AsRef<str>>(
    specs: &[OptionSpec],
    args: &[S],
    config: &ParseConfig,
) -> Parsed {
    tracing::debug!(
        specs = specs.len(),
        args = args.len(),
        in_order = config.in_order,
        "parsing command line"
    );

    let Tokenized {
        tokens,
        positionals,
    } = tokenize(&required_switches(specs), args, config.in_order);
    let Resolution { options, errors } = resolve(specs, &tokens, config.resolve_flags());

    let summary = match &config.summary_fn {
        Some(f) => f(specs),
        None => summarize(specs),
    };

    Parsed {
        options,
        arguments: positionals,
        summary,
        errors: errors.iter().map(ToString::to_string).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server_decls() -> Vec<Decl> {
        vec![
            Decl::new("-p", "--port PORT", "Port number")
                .default(80)
                .parse_fn(|v| Ok(Value::Int(v.as_str().unwrap_or_default().parse()?)))
                .validate(
                    |v| v.as_int().is_some_and(|n| (1..65536).contains(&n)),
                    "Must be a number between 1 and 65535",
                ),
            Decl::new("-H", "--hostname HOST", "Remote host")
                .default_fn(|_| Value::from("localhost"))
                .default_desc("localhost"),
            Decl::new("-v", "", "Verbosity level")
                .id("verbosity")
                .default(0)
                .update_fn(|old| Value::Int(old.and_then(Value::as_int).unwrap_or(0) + 1)),
            Decl::new("", "--[no-]daemon", "Run in the background").default(true),
            Decl::new("-h", "--help", ""),
        ]
    }

    #[test]
    fn parses_a_typical_command_line() {
        let parsed = parse_opts(
            &["-vvvp8080", "start", "--no-daemon", "--hostname", "example.com", "now"],
            server_decls(),
            &ParseConfig::default(),
        )
        .unwrap();

        assert!(parsed.is_ok(), "{:?}", parsed.errors);
        assert_eq!(parsed.options["port"], Value::Int(8080));
        assert_eq!(parsed.options["verbosity"], Value::Int(3));
        assert_eq!(parsed.options["daemon"], Value::Bool(false));
        assert_eq!(parsed.options["hostname"], Value::from("example.com"));
        assert_eq!(parsed.arguments, vec!["start", "now"]);
        assert!(!parsed.options.contains_key("help"));
        assert!(parsed.summary.contains("--[no-]daemon"));
    }

    #[test]
    fn defaults_apply_when_nothing_is_given() {
        let parsed = parse_opts::<&str, _>(&[], server_decls(), &ParseConfig::default()).unwrap();
        assert!(parsed.is_ok());
        let keys: Vec<&str> = parsed.options.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["port", "verbosity", "daemon", "hostname"]);
        assert_eq!(parsed.options["hostname"], Value::from("localhost"));
    }

    #[test]
    fn errors_are_collected_not_raised() {
        let parsed = parse_opts(
            &["-p", "0", "-x", "--port=abc", "--hostname"],
            server_decls(),
            &ParseConfig::default(),
        )
        .unwrap();

        assert_eq!(
            parsed.errors,
            vec![
                "Failed to validate -p 0: Must be a number between 1 and 65535",
                "Unknown option: -x",
                "Error while parsing option --port abc: invalid digit found in string",
                "Missing required argument for --hostname HOST",
            ]
        );
        assert_eq!(parsed.options["port"], Value::Int(80));
    }

    #[test]
    fn in_order_stops_at_subcommand() {
        let config = ParseConfig::new().in_order(true);
        let parsed =
            parse_opts(&["-v", "run", "-v", "--port", "1"], server_decls(), &config).unwrap();
        assert!(parsed.is_ok());
        assert_eq!(parsed.options["verbosity"], Value::Int(1));
        assert_eq!(parsed.arguments, vec!["run", "-v", "--port", "1"]);
    }

    #[test]
    fn no_defaults_excludes_untouched_ids() {
        let config = ParseConfig::new().no_defaults(true);
        let parsed = parse_opts(&["--no-daemon"], server_decls(), &config).unwrap();
        assert_eq!(parsed.options.len(), 1);
        assert_eq!(parsed.options["daemon"], Value::Bool(false));

        let parsed = parse_opts(&["--no-daemon"], server_decls(), &ParseConfig::default()).unwrap();
        assert!(parsed.options.contains_key("port"));
    }

    #[test]
    fn strict_mode_flags_swallowed_switches() {
        let config = ParseConfig::new().strict(true);
        let parsed = parse_opts(&["--hostname", "-v"], server_decls(), &config).unwrap();
        assert_eq!(parsed.errors, vec!["Missing required argument for --hostname HOST"]);
    }

    #[test]
    fn summary_fn_overrides_summary() {
        let config = ParseConfig::new().summary_fn(|specs| {
            specs
                .iter()
                .map(|s| s.id().to_string())
                .collect::<Vec<_>>()
                .join(",")
        });
        let parsed = parse_opts::<&str, _>(&[], server_decls(), &config).unwrap();
        assert_eq!(parsed.summary, "port,hostname,verbosity,daemon,help");
    }

    #[test]
    fn config_errors_are_fatal() {
        let err = parse_opts(
            &["-a"],
            vec![Decl::new("-a", "--alpha", ""), Decl::new("-a", "--beta", "")],
            &ParseConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateShortOpt { .. }));
    }

    #[test]
    fn parsed_serializes_to_json() {
        let config = ParseConfig::new().no_defaults(true);
        let parsed = parse_opts(&["-v", "x"], server_decls(), &config).unwrap();
        let json = serde_json::to_value(&parsed).unwrap();
        assert_eq!(json["options"]["verbosity"], 1);
        assert_eq!(json["arguments"][0], "x");
        assert!(json["errors"].as_array().unwrap().is_empty());
    }

    #[test]
    fn compiled_specs_are_shareable_across_threads() {
        let specs = Arc::new(compile(server_decls()).unwrap());
        let handles: Vec<_> = (0..4)
            .map(|n| {
                let specs = Arc::clone(&specs);
                std::thread::spawn(move || {
                    let port = format!("{}", 1000 + n);
                    let parsed =
                        parse_compiled(&specs, &["-p", port.as_str()], &ParseConfig::default());
                    parsed.options["port"].clone()
                })
            })
            .collect();
        for (n, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.join().unwrap(), Value::Int(1000 + n as i64));
        }
    }
}
