//! Merging option tokens into the final option map.
//!
//! Every token is attempted; problems are collected as [`OptionError`]s and
//! never stop the remaining tokens from being processed.

use crate::error::OptionError;
use crate::spec::{OptionSpec, UpdateFn};
use crate::tokenize::Token;
use crate::value::{OptionMap, Value};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveFlags {
    /// Only keep ids that were set on the command line.
    pub no_defaults: bool,
    /// Treat an option argument that names a known switch as missing.
    pub strict: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub options: OptionMap,
    pub errors: Vec<OptionError>,
}

/// Static defaults in declaration order.
fn initial_options(specs: &[OptionSpec]) -> OptionMap {
    specs
        .iter()
        .filter_map(|spec| spec.default.clone().map(|v| (spec.id.clone(), v)))
        .collect()
}

/// The spec a token refers to, with the flag polarity it was used with.
fn find_spec<'s>(specs: &'s [OptionSpec], token: &Token) -> Option<(&'s OptionSpec, bool)> {
    specs.iter().find_map(|spec| match token {
        Token::ShortOpt { switch, .. } => {
            (spec.short_opt.as_deref() == Some(switch.as_str())).then_some((spec, true))
        }
        Token::LongOpt { switch, .. } => spec.match_long(switch).map(|polarity| (spec, polarity)),
    })
}

fn is_known_switch(specs: &[OptionSpec], candidate: &str) -> bool {
    specs
        .iter()
        .any(|spec| spec.switches().iter().any(|switch| switch == candidate))
}

/// `"-p 80"`, or just `"--verbose"` when the occurrence has no argument.
fn describe_occurrence(switch: &str, arg: Option<&str>) -> String {
    match arg {
        Some(arg) => format!("{switch} {arg}"),
        None => switch.to_string(),
    }
}

/// First failing validator, as an error.
fn validate(spec: &OptionSpec, value: &Value, occurrence: &str) -> Option<OptionError> {
    spec.validators
        .iter()
        .find(|validator| !(validator.predicate)(value))
        .map(|validator| OptionError::ValidationFailure {
            occurrence: occurrence.to_string(),
            message: validator.message.as_ref().map(|m| m.render(value)),
        })
}

fn merge(spec: &OptionSpec, options: &mut OptionMap, value: Value) {
    if let Some(assoc) = &spec.assoc_fn {
        assoc(options, spec.id.as_str(), value);
        return;
    }

    let merged = match &spec.update_fn {
        Some(UpdateFn::Replace(update)) => update(options.get(&spec.id)),
        Some(UpdateFn::Accumulate(update)) => update(options.get(&spec.id), value),
        None => value,
    };
    options.insert(spec.id.clone(), merged);
}

/// Resolve `tokens` against `specs`.
///
/// Options start out as the static defaults. After all tokens are merged,
/// `missing` messages are reported for ids without a value, default
/// functions fill ids that were never set on the command line, and
/// `no_defaults` drops everything that was not set on the command line.
///
/// Default functions run in declaration order, and each one sees the values
/// computed by the default functions declared before it.
pub fn resolve(specs: &[OptionSpec], tokens: &[Token], flags: ResolveFlags) -> Resolution {
    let mut options = initial_options(specs);
    let mut touched: HashSet<String> = HashSet::new();
    let mut errors: Vec<OptionError> = Vec::new();

    for token in tokens {
        let switch = token.switch();
        let Some((spec, polarity)) = find_spec(specs, token) else {
            tracing::trace!(switch, "unknown option");
            errors.push(OptionError::UnknownOption {
                switch: switch.to_string(),
            });
            continue;
        };

        let raw = match spec.required.as_deref() {
            Some(required) => {
                let arg = token
                    .arg()
                    .filter(|arg| !(flags.strict && is_known_switch(specs, arg)));
                let Some(arg) = arg else {
                    errors.push(OptionError::MissingRequiredArgument {
                        switch: switch.to_string(),
                        required: required.to_string(),
                    });
                    continue;
                };
                Value::Str(arg.to_string())
            }
            None => Value::Bool(polarity),
        };
        let occurrence = describe_occurrence(switch, token.arg());

        let value = match &spec.parse_fn {
            Some(parse) => match parse(&raw) {
                Ok(value) => value,
                Err(err) => {
                    errors.push(OptionError::ParseFailure {
                        occurrence,
                        message: err.to_string(),
                    });
                    continue;
                }
            },
            None => raw,
        };

        if !spec.post_validation {
            if let Some(err) = validate(spec, &value, &occurrence) {
                errors.push(err);
                continue;
            }
        }

        let snapshot = spec.post_validation.then(|| options.clone());
        merge(spec, &mut options, value);

        if let Some(snapshot) = snapshot {
            let failure = options
                .get(&spec.id)
                .and_then(|merged| validate(spec, merged, &occurrence));
            if let Some(err) = failure {
                errors.push(err);
                options = snapshot;
                continue;
            }
        }

        tracing::trace!(switch, id = %spec.id, "merged option");
        touched.insert(spec.id.clone());
    }

    for spec in specs {
        if let Some(message) = &spec.missing {
            if !options.contains_key(&spec.id) {
                errors.push(OptionError::MissingOption {
                    id: spec.id.clone(),
                    message: message.clone(),
                });
            }
        }
    }

    for spec in specs {
        if let Some(default_fn) = &spec.default_fn {
            if !touched.contains(&spec.id) {
                let value = default_fn(&options);
                options.insert(spec.id.clone(), value);
            }
        }
    }

    if flags.no_defaults {
        options.retain(|id, _| touched.contains(id));
    }

    Resolution { options, errors }
}

/// The option map an empty command line resolves to.
pub fn default_options(specs: &[OptionSpec]) -> OptionMap {
    resolve(specs, &[], ResolveFlags::default()).options
}
