use crate::error::ConfigError;
use crate::spec::{Decl, DeclForm, OptionSpec, SpecRecord, UpdateFn, Validator, is_negatable};
use crate::tokenize::Schema;
use std::collections::HashSet;

/// Compile declarations into option specs and check the global invariants.
///
/// Invariants:
/// - every spec has an id
/// - at most one spec per id supplies a `default`, and at most one a `default_fn`
/// - short options are unique, long options are unique
/// - no spec sets both `assoc_fn` and `update_fn`
/// - `multi` is set exactly when the update function accumulates
pub fn compile<I>(decls: I) -> Result<Vec<OptionSpec>, ConfigError>
where
    I: IntoIterator<Item = Decl>,
{
    let specs = decls
        .into_iter()
        .enumerate()
        .map(|(index, decl)| compile_decl(index, decl))
        .collect::<Result<Vec<_>, _>>()?;

    check_invariants(&specs)?;
    tracing::debug!(count = specs.len(), "compiled option specs");
    Ok(specs)
}

/// Switches whose option consumes an argument.
pub fn required_switches(specs: &[OptionSpec]) -> Schema {
    specs
        .iter()
        .filter(|spec| spec.required.is_some())
        .flat_map(|spec| spec.short_opt.iter().chain(spec.long_opt.iter()))
        .cloned()
        .collect()
}

/// Split `"--port PORT"` / `"--port=PORT"` into the flag and its argument description.
fn split_long_opt(raw: &str) -> (String, Option<String>) {
    match raw.find([' ', '=']) {
        Some(pos) => (raw[..pos].to_string(), Some(raw[pos + 1..].to_string())),
        None => (raw.to_string(), None),
    }
}

/// `--[no-]daemon` -> `daemon`, `--port` -> `port`.
fn derive_id(long_opt: &str) -> String {
    let name = long_opt.trim_start_matches('-');
    name.strip_prefix("[no-]").unwrap_or(name).to_string()
}

fn compile_decl(index: usize, decl: Decl) -> Result<OptionSpec, ConfigError> {
    let Decl { form, props } = decl;

    let (id, short_opt, long_opt, required, desc) = match form {
        DeclForm::Record => (
            props.id.clone(),
            props.short_opt.clone(),
            props.long_opt.clone(),
            props.required.clone(),
            props.desc.clone(),
        ),
        DeclForm::Tuple(fields) => {
            if fields.len() > 3 {
                tracing::warn!(
                    index,
                    extra = fields.len() - 3,
                    "ignoring surplus positional fields in option declaration"
                );
            }
            let field = |i: usize| fields.get(i).cloned().flatten();

            let short_opt = props.short_opt.clone().or_else(|| field(0));
            let (long_opt, arg_desc) = match props.long_opt.clone().or_else(|| field(1)) {
                Some(raw) => {
                    let (long, arg_desc) = split_long_opt(&raw);
                    (Some(long), arg_desc)
                }
                None => (None, None),
            };
            let id = props
                .id
                .clone()
                .or_else(|| long_opt.as_deref().map(derive_id));
            let required = props.required.clone().or(arg_desc);
            let desc = props.desc.clone().or_else(|| field(2));
            (id, short_opt, long_opt, required, desc)
        }
    };

    let Some(id) = id.filter(|id| !id.is_empty()) else {
        return Err(ConfigError::MissingId { index });
    };

    if props.multi && props.update_fn.is_none() {
        tracing::warn!(id = %id, "multi has no effect without an update function");
    }

    let SpecRecord {
        default,
        default_desc,
        default_fn,
        parse_fn,
        assoc_fn,
        update_fn,
        multi,
        post_validation,
        validate,
        validate_fn,
        validate_msg,
        missing,
        ..
    } = props;

    let mut validators = validate;
    validators.extend(validate_fn.into_iter().enumerate().map(|(i, predicate)| Validator {
        predicate,
        message: validate_msg.get(i).cloned().flatten(),
    }));

    let negatable = long_opt.as_deref().is_some_and(is_negatable);

    Ok(OptionSpec {
        id,
        short_opt,
        long_opt,
        negatable,
        required,
        desc,
        default,
        default_desc,
        default_fn,
        parse_fn,
        assoc_fn,
        update_fn,
        multi,
        post_validation,
        validators,
        missing,
    })
}

fn check_invariants(specs: &[OptionSpec]) -> Result<(), ConfigError> {
    let mut default_ids: HashSet<&str> = HashSet::new();
    let mut default_fn_ids: HashSet<&str> = HashSet::new();
    let mut shorts: HashSet<&str> = HashSet::new();
    let mut longs: HashSet<&str> = HashSet::new();

    for spec in specs {
        if spec.default.is_some() && !default_ids.insert(&spec.id) {
            return Err(ConfigError::DuplicateDefault {
                id: spec.id.clone(),
            });
        }
        if spec.default_fn.is_some() && !default_fn_ids.insert(&spec.id) {
            return Err(ConfigError::DuplicateDefaultFn {
                id: spec.id.clone(),
            });
        }
        if let Some(short) = spec.short_opt.as_deref() {
            if !shorts.insert(short) {
                return Err(ConfigError::DuplicateShortOpt {
                    opt: short.to_string(),
                });
            }
        }
        if let Some(long) = spec.long_opt.as_deref() {
            if !longs.insert(long) {
                return Err(ConfigError::DuplicateLongOpt {
                    opt: long.to_string(),
                });
            }
        }
        if spec.assoc_fn.is_some() && spec.update_fn.is_some() {
            return Err(ConfigError::ConflictingMergeFns {
                id: spec.id.clone(),
            });
        }
        match (&spec.update_fn, spec.multi) {
            (Some(UpdateFn::Replace(_)), true) | (Some(UpdateFn::Accumulate(_)), false) => {
                return Err(ConfigError::MultiArity {
                    id: spec.id.clone(),
                });
            }
            _ => {}
        }
    }

    Ok(())
}
