//! JSON documents describing gnuopt option declarations.
//!
//! A document is `{ "options": [decl, ...] }`. Each decl is either
//! - a tuple: leading string-or-null fields `[short, long, desc]`, optionally
//!   followed by one object of named properties, or
//! - a record: an object of named properties, used verbatim.
//!
//! Property names are kebab-case (`short-opt`, `default-desc`, ...). Callbacks
//! cannot be expressed in JSON, so `parse`, `update`, `validate` and
//! `default-from` name built-in behaviors instead.

use gnuopt::{Decl, Message, OptionMap, SpecRecord, Validator, Value};
use serde::{Deserialize, Serialize};
use serde_json::Map;

#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("invalid declaration document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("declaration {index}: {reason}")]
    MalformedTuple { index: usize, reason: String },

    #[error("declaration {index}: unknown parse type `{name}`")]
    UnknownParse { index: usize, name: String },

    #[error("declaration {index}: unknown update function `{name}`")]
    UnknownUpdate { index: usize, name: String },

    #[error("declaration {index}: unsupported value for `{key}`")]
    UnsupportedValue { index: usize, key: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptionsDocument {
    #[serde(default)]
    pub options: Vec<DeclDoc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeclDoc {
    Tuple(Vec<serde_json::Value>),
    Record(Props),
}

/// Named properties of a declaration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Props {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_opt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_opt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_desc: Option<String>,
    /// Id whose resolved value becomes this option's computed default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_from: Option<String>,
    /// `int`, `float`, `string` or `bool`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse: Option<String>,
    /// `count` or `collect`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi: Option<bool>,
    #[serde(default)]
    pub post_validation: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validate: Vec<Rule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing: Option<String>,
    /// Anything not recognized above; reported as warnings.
    #[serde(flatten)]
    pub extra: Map<String, serde_json::Value>,
}

/// One validator. Every constraint that is present must hold.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Rule {
    /// Lower bound on a number, or on the length of a list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<serde_json::Value>,
    #[serde(default)]
    pub non_empty: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Declarations built from a document, plus anything worth telling the author.
#[derive(Debug, Clone, Default)]
pub struct Declarations {
    pub decls: Vec<Decl>,
    pub warnings: Vec<String>,
}

impl OptionsDocument {
    pub fn from_json(json: &str) -> Result<Self, MetadataError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn into_declarations(self) -> Result<Declarations, MetadataError> {
        let mut out = Declarations::default();
        for (index, doc) in self.options.into_iter().enumerate() {
            let decl = match doc {
                DeclDoc::Tuple(items) => {
                    let (fields, props) = split_tuple(index, items)?;
                    let fields: Vec<Option<&str>> = fields.iter().map(Option::as_deref).collect();
                    apply_props(index, Decl::tuple(&fields), props, &mut out.warnings)?
                }
                DeclDoc::Record(props) => apply_props(
                    index,
                    Decl::record(SpecRecord::default()),
                    props,
                    &mut out.warnings,
                )?,
            };
            out.decls.push(decl);
        }
        tracing::debug!(count = out.decls.len(), "loaded option declarations");
        Ok(out)
    }
}

/// Parse a declaration document.
pub fn load_declarations(json: &str) -> Result<Declarations, MetadataError> {
    OptionsDocument::from_json(json)?.into_declarations()
}

fn split_tuple(
    index: usize,
    items: Vec<serde_json::Value>,
) -> Result<(Vec<Option<String>>, Props), MetadataError> {
    let last = items.len().saturating_sub(1);
    let mut fields = Vec::new();
    let mut props = Props::default();

    for (pos, item) in items.into_iter().enumerate() {
        match item {
            serde_json::Value::String(s) => fields.push(Some(s)),
            serde_json::Value::Null => fields.push(None),
            serde_json::Value::Object(map) if pos == last => {
                props = serde_json::from_value(serde_json::Value::Object(map))?;
            }
            _ => {
                return Err(MetadataError::MalformedTuple {
                    index,
                    reason: format!(
                        "field {pos} must be a string, null, or a trailing object of properties"
                    ),
                });
            }
        }
    }

    Ok((fields, props))
}

fn apply_props(
    index: usize,
    mut decl: Decl,
    props: Props,
    warnings: &mut Vec<String>,
) -> Result<Decl, MetadataError> {
    let Props {
        id,
        short_opt,
        long_opt,
        required,
        desc,
        default,
        default_desc,
        default_from,
        parse,
        update,
        multi,
        post_validation,
        validate,
        missing,
        extra,
    } = props;

    for key in extra.keys() {
        tracing::warn!(index, property = %key, "ignoring unknown declaration property");
        warnings.push(format!("declaration {index}: unknown property `{key}`"));
    }

    if let Some(id) = id {
        decl = decl.id(id);
    }
    if let Some(short_opt) = short_opt {
        decl = decl.short_opt(short_opt);
    }
    if let Some(long_opt) = long_opt {
        decl = decl.long_opt(long_opt);
    }
    if let Some(required) = required {
        decl = decl.required(required);
    }
    if let Some(desc) = desc {
        decl = decl.desc(desc);
    }
    if let Some(desc) = default_desc {
        decl = decl.default_desc(desc);
    }
    if let Some(missing) = missing {
        decl = decl.missing(missing);
    }

    let default = default
        .map(|json| {
            to_value(&json).ok_or_else(|| MetadataError::UnsupportedValue {
                index,
                key: "default".to_string(),
            })
        })
        .transpose()?;
    if let Some(value) = &default {
        decl = decl.default(value.clone());
    }
    if let Some(source) = default_from {
        decl = decl.default_fn(move |options: &OptionMap| {
            options
                .get(&source)
                .or(default.as_ref())
                .cloned()
                .unwrap_or_else(|| Value::Str(String::new()))
        });
    }

    if let Some(name) = parse {
        let parse = builtin_parse(&name).ok_or(MetadataError::UnknownParse { index, name })?;
        decl = decl.parse_fn(parse);
    }

    decl = match update.as_deref() {
        None => decl,
        Some("count") => {
            decl.update_fn(|old| Value::Int(old.and_then(Value::as_int).unwrap_or(0) + 1))
        }
        Some("collect") => decl.multi_update_fn(|old, new| {
            let mut items = old.and_then(Value::as_list).unwrap_or_default().to_vec();
            items.push(new);
            Value::List(items)
        }),
        Some(name) => {
            return Err(MetadataError::UnknownUpdate {
                index,
                name: name.to_string(),
            });
        }
    };
    if let Some(multi) = multi {
        decl = decl.multi(multi);
    }

    decl = decl.post_validation(post_validation);
    for rule in validate {
        decl = decl.validator(rule_validator(index, rule)?);
    }

    Ok(decl)
}

fn to_value(json: &serde_json::Value) -> Option<Value> {
    match json {
        serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(Value::Int)
            .or_else(|| n.as_f64().map(Value::Float)),
        serde_json::Value::String(s) => Some(Value::Str(s.clone())),
        serde_json::Value::Array(items) => items
            .iter()
            .map(to_value)
            .collect::<Option<Vec<_>>>()
            .map(Value::List),
        serde_json::Value::Null | serde_json::Value::Object(_) => None,
    }
}

type BuiltinParse = fn(&Value) -> anyhow::Result<Value>;

fn builtin_parse(name: &str) -> Option<BuiltinParse> {
    match name {
        "int" => Some(parse_int),
        "float" => Some(parse_float),
        "bool" => Some(parse_bool),
        "string" => Some(parse_string),
        _ => None,
    }
}

// Flags hand their boolean through untouched.
fn parse_int(raw: &Value) -> anyhow::Result<Value> {
    match raw {
        Value::Str(s) => Ok(Value::Int(s.parse()?)),
        other => Ok(other.clone()),
    }
}

fn parse_float(raw: &Value) -> anyhow::Result<Value> {
    match raw {
        Value::Str(s) => Ok(Value::Float(s.parse()?)),
        other => Ok(other.clone()),
    }
}

fn parse_bool(raw: &Value) -> anyhow::Result<Value> {
    match raw {
        Value::Str(s) => Ok(Value::Bool(s.parse()?)),
        other => Ok(other.clone()),
    }
}

fn parse_string(raw: &Value) -> anyhow::Result<Value> {
    Ok(Value::Str(raw.to_string()))
}

fn rule_validator(index: usize, rule: Rule) -> Result<Validator, MetadataError> {
    let Rule {
        min,
        max,
        one_of,
        non_empty,
        message,
    } = rule;

    let one_of = one_of
        .iter()
        .map(to_value)
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| MetadataError::UnsupportedValue {
            index,
            key: "one-of".to_string(),
        })?;

    let predicate = move |value: &Value| {
        if min.is_some() || max.is_some() {
            let measure = match value {
                Value::List(items) => Some(items.len() as f64),
                other => other.as_float(),
            };
            let Some(n) = measure else {
                return false;
            };
            if min.is_some_and(|min| n < min) || max.is_some_and(|max| n > max) {
                return false;
            }
        }
        if !one_of.is_empty() && !one_of.contains(value) {
            return false;
        }
        if non_empty {
            let empty = match value {
                Value::Str(s) => s.is_empty(),
                Value::List(items) => items.is_empty(),
                _ => false,
            };
            if empty {
                return false;
            }
        }
        true
    };

    Ok(Validator::new(predicate, message.map(Message::from)))
}
