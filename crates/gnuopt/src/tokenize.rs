//! GNU-style splitting of an argument vector into option tokens and positionals.
//!
//! Tokenizing needs to know which switches consume an argument, otherwise it
//! cannot distinguish between:
//! - a boolean flag followed by a positional (`--verbose file.txt`)
//! - a value flag followed by its value (`--output out.txt`)
//!
//! [`Schema`] carries that set; everything else is decided syntactically.

use std::collections::HashSet;

/// A single option occurrence, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// `-c`, possibly with its argument.
    ShortOpt { switch: String, arg: Option<String> },
    /// `--name`, possibly with its argument.
    LongOpt { switch: String, arg: Option<String> },
}

impl Token {
    pub fn short(switch: impl Into<String>, arg: Option<&str>) -> Self {
        Self::ShortOpt {
            switch: switch.into(),
            arg: arg.map(str::to_string),
        }
    }

    pub fn long(switch: impl Into<String>, arg: Option<&str>) -> Self {
        Self::LongOpt {
            switch: switch.into(),
            arg: arg.map(str::to_string),
        }
    }

    pub fn switch(&self) -> &str {
        match self {
            Self::ShortOpt { switch, .. } | Self::LongOpt { switch, .. } => switch,
        }
    }

    pub fn arg(&self) -> Option<&str> {
        match self {
            Self::ShortOpt { arg, .. } | Self::LongOpt { arg, .. } => arg.as_deref(),
        }
    }
}

/// Switches that take a value (e.g. `--output`, `-o`).
#[derive(Debug, Clone, Default)]
pub struct Schema {
    value_flags: HashSet<String>,
}

impl Schema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn takes_value(&self, switch: &str) -> bool {
        self.value_flags.contains(switch)
    }
}

impl<S: Into<String>> FromIterator<S> for Schema {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            value_flags: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Output of [`tokenize`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tokenized {
    pub tokens: Vec<Token>,
    pub positionals: Vec<String>,
}

/// Split `args` into option tokens and positional arguments.
///
/// - `--` ends option scanning; it is dropped and the rest is positional.
/// - `--name=value` always carries `value`, even when empty.
/// - `--name` takes the next argument when `schema` says it needs one.
/// - `-abc` expands to `-a -b -c`; a value-taking switch inside the cluster
///   takes the remainder of the cluster, or the next argument.
/// - `-` on its own is positional.
///
/// When `in_order` is set, the first positional stops option scanning and
/// every remaining argument is kept verbatim.
pub fn tokenize<S: AsRef<str>>(schema: &Schema, args: &[S], in_order: bool) -> Tokenized {
    let mut out = Tokenized::default();
    let mut i = 0usize;

    while i < args.len() {
        let arg = args[i].as_ref();
        i += 1;

        if arg == "--" {
            out.positionals
                .extend(args[i..].iter().map(|a| a.as_ref().to_string()));
            break;
        }

        if let Some(body) = arg.strip_prefix("--") {
            // --key=value
            if let Some((name, value)) = body.split_once('=') {
                if !name.is_empty() && !name.contains(char::is_whitespace) {
                    out.tokens.push(Token::long(format!("--{name}"), Some(value)));
                    continue;
                }
            }

            let value = if schema.takes_value(arg) {
                let next = args.get(i).map(|a| a.as_ref());
                if next.is_some() {
                    i += 1;
                }
                next
            } else {
                None
            };
            out.tokens.push(Token::long(arg, value));
            continue;
        }

        if let Some(cluster) = arg.strip_prefix('-').filter(|c| !c.is_empty()) {
            for (offset, c) in cluster.char_indices() {
                let switch = format!("-{c}");
                if !schema.takes_value(&switch) {
                    out.tokens.push(Token::short(switch, None));
                    continue;
                }

                let rest = &cluster[offset + c.len_utf8()..];
                let value = if rest.is_empty() {
                    let next = args.get(i).map(|a| a.as_ref());
                    if next.is_some() {
                        i += 1;
                    }
                    next
                } else {
                    Some(rest)
                };
                out.tokens.push(Token::short(switch, value));
                break;
            }
            continue;
        }

        out.positionals.push(arg.to_string());
        if in_order {
            out.positionals
                .extend(args[i..].iter().map(|a| a.as_ref().to_string()));
            break;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(flags: &[&str]) -> Schema {
        flags.iter().copied().collect()
    }

    #[test]
    fn clustered_flags_expand() {
        let out = tokenize(&Schema::new(), &["-abc"], false);
        assert_eq!(
            out.tokens,
            vec![
                Token::short("-a", None),
                Token::short("-b", None),
                Token::short("-c", None),
            ]
        );
        assert!(out.positionals.is_empty());
    }

    #[test]
    fn cluster_remainder_becomes_value() {
        let out = tokenize(&schema(&["-p"]), &["-abcp80"], false);
        assert_eq!(
            out.tokens,
            vec![
                Token::short("-a", None),
                Token::short("-b", None),
                Token::short("-c", None),
                Token::short("-p", Some("80")),
            ]
        );
    }

    #[test]
    fn cluster_ending_in_value_flag_takes_next_arg() {
        let out = tokenize(&schema(&["-o"]), &["-vo", "out.txt", "in.txt"], false);
        assert_eq!(
            out.tokens,
            vec![Token::short("-v", None), Token::short("-o", Some("out.txt"))]
        );
        assert_eq!(out.positionals, vec!["in.txt"]);
    }

    #[test]
    fn value_flag_at_end_has_no_value() {
        let out = tokenize(&schema(&["-o", "--out"]), &["-o"], false);
        assert_eq!(out.tokens, vec![Token::short("-o", None)]);

        let out = tokenize(&schema(&["-o", "--out"]), &["--out"], false);
        assert_eq!(out.tokens, vec![Token::long("--out", None)]);
    }

    #[test]
    fn equals_always_carries_a_value() {
        let out = tokenize(&Schema::new(), &["--port=", "--name=a=b"], false);
        assert_eq!(
            out.tokens,
            vec![
                Token::long("--port", Some("")),
                Token::long("--name", Some("a=b")),
            ]
        );
    }

    #[test]
    fn long_value_flag_consumes_next_argument() {
        let out = tokenize(&schema(&["--port"]), &["--port", "8080", "--verbose", "x"], false);
        assert_eq!(
            out.tokens,
            vec![
                Token::long("--port", Some("8080")),
                Token::long("--verbose", None),
            ]
        );
        assert_eq!(out.positionals, vec!["x"]);
    }

    #[test]
    fn double_dash_ends_scanning() {
        let out = tokenize(&Schema::new(), &["-a", "--", "-b"], false);
        assert_eq!(out.tokens, vec![Token::short("-a", None)]);
        assert_eq!(out.positionals, vec!["-b"]);
    }

    #[test]
    fn single_dash_is_positional() {
        let out = tokenize(&Schema::new(), &["-", "-a"], false);
        assert_eq!(out.tokens, vec![Token::short("-a", None)]);
        assert_eq!(out.positionals, vec!["-"]);
    }

    #[test]
    fn options_are_hoisted_past_positionals() {
        let out = tokenize(&Schema::new(), &["a", "-x", "b", "--y"], false);
        assert_eq!(
            out.tokens,
            vec![Token::short("-x", None), Token::long("--y", None)]
        );
        assert_eq!(out.positionals, vec!["a", "b"]);
    }

    #[test]
    fn in_order_stops_at_first_positional() {
        let out = tokenize(&Schema::new(), &["-x", "cmd", "-y", "--", "z"], true);
        assert_eq!(out.tokens, vec![Token::short("-x", None)]);
        assert_eq!(out.positionals, vec!["cmd", "-y", "--", "z"]);
    }

    #[test]
    fn multibyte_short_switches_are_split_on_chars() {
        let out = tokenize(&schema(&["-ß"]), &["-äßwert"], false);
        assert_eq!(
            out.tokens,
            vec![Token::short("-ä", None), Token::short("-ß", Some("wert"))]
        );
    }

    /// Rendering tokens back to canonical argv form and tokenizing again
    /// yields the same structure.
    #[test]
    fn canonical_rendering_round_trips() {
        let schema = schema(&["-p", "--out"]);
        let inputs: [&[&str]; 4] = [
            &["-vp80", "file", "--out", "x", "--flag"],
            &["a", "--out=", "-p", "--", "-z"],
            &["--name=v", "-", "-abc"],
            &["-p"],
        ];

        for argv in inputs {
            let first = tokenize(&schema, argv, false);
            let mut rendered: Vec<String> = Vec::new();
            for token in &first.tokens {
                match token {
                    Token::LongOpt { switch, arg: Some(arg) } => {
                        rendered.push(format!("{switch}={arg}"))
                    }
                    Token::ShortOpt { switch, arg: Some(arg) } => {
                        rendered.push(switch.clone());
                        rendered.push(arg.clone());
                    }
                    other => rendered.push(other.switch().to_string()),
                }
            }
            if !first.positionals.is_empty() {
                rendered.push("--".to_string());
                rendered.extend(first.positionals.iter().cloned());
            }

            let second = tokenize(&schema, &rendered, false);
            assert_eq!(first, second, "round trip failed for {argv:?}");
        }
    }
}
