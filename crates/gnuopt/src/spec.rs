//! Option declarations and their compiled form.
//!
//! A [`Decl`] is what callers write: either a positional tuple
//! (`short`, `long [ARG]`, `description`) refined by named properties, or a
//! ready-made [`SpecRecord`]. [`crate::compile`] turns declarations into
//! fixed-shape [`OptionSpec`]s, which is all the resolver ever looks at.

use crate::value::{OptionMap, Value};
use std::fmt;
use std::sync::Arc;

/// Converts a raw argument (a string, or a bool for flags) into an option value.
pub type ParseFn = Arc<dyn Fn(&Value) -> anyhow::Result<Value> + Send + Sync>;

/// Validation predicate over a parsed value.
pub type Predicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Takes full control of merging a value into the option map.
pub type AssocFn = Arc<dyn Fn(&mut OptionMap, &str, Value) + Send + Sync>;

/// Computes a value for an untouched option from the resolved option map.
pub type DefaultFn = Arc<dyn Fn(&OptionMap) -> Value + Send + Sync>;

/// Validation failure message: fixed text or derived from the offending value.
#[derive(Clone)]
pub enum Message {
    Text(String),
    Dynamic(Arc<dyn Fn(&Value) -> String + Send + Sync>),
}

impl Message {
    pub fn dynamic(f: impl Fn(&Value) -> String + Send + Sync + 'static) -> Self {
        Self::Dynamic(Arc::new(f))
    }

    pub fn render(&self, value: &Value) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Dynamic(f) => f(value),
        }
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

#[derive(Clone)]
pub struct Validator {
    pub predicate: Predicate,
    pub message: Option<Message>,
}

impl Validator {
    pub fn new(
        predicate: impl Fn(&Value) -> bool + Send + Sync + 'static,
        message: Option<Message>,
    ) -> Self {
        Self {
            predicate: Arc::new(predicate),
            message,
        }
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

/// How repeated occurrences of an option fold into its current value.
#[derive(Clone)]
pub enum UpdateFn {
    /// `old -> new`; the parsed value of the occurrence is discarded.
    Replace(Arc<dyn Fn(Option<&Value>) -> Value + Send + Sync>),
    /// `(old, parsed) -> new`; used by `multi` options.
    Accumulate(Arc<dyn Fn(Option<&Value>, Value) -> Value + Send + Sync>),
}

impl fmt::Debug for UpdateFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Replace(_) => f.write_str("Replace(..)"),
            Self::Accumulate(_) => f.write_str("Accumulate(..)"),
        }
    }
}

/// Named properties of an option declaration.
///
/// Used directly as the record form of a declaration, where every field is
/// taken as-is, and as the named-property half of a tuple declaration, where
/// any field that is set wins over what the tuple implies.
#[derive(Clone, Default)]
pub struct SpecRecord {
    pub id: Option<String>,
    pub short_opt: Option<String>,
    pub long_opt: Option<String>,
    pub required: Option<String>,
    pub desc: Option<String>,
    pub default: Option<Value>,
    pub default_desc: Option<String>,
    pub default_fn: Option<DefaultFn>,
    pub parse_fn: Option<ParseFn>,
    pub assoc_fn: Option<AssocFn>,
    pub update_fn: Option<UpdateFn>,
    pub multi: bool,
    pub post_validation: bool,
    /// `validate` shorthand: (predicate, message) pairs in order.
    pub validate: Vec<Validator>,
    /// Predicates paired positionally with `validate_msg`.
    pub validate_fn: Vec<Predicate>,
    pub validate_msg: Vec<Option<Message>>,
    pub missing: Option<String>,
}

impl fmt::Debug for SpecRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecRecord")
            .field("id", &self.id)
            .field("short_opt", &self.short_opt)
            .field("long_opt", &self.long_opt)
            .field("required", &self.required)
            .field("desc", &self.desc)
            .field("default", &self.default)
            .field("multi", &self.multi)
            .field("post_validation", &self.post_validation)
            .field("missing", &self.missing)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub(crate) enum DeclForm {
    Tuple(Vec<Option<String>>),
    Record,
}

/// A single option declaration, before compilation.
#[derive(Debug, Clone)]
pub struct Decl {
    pub(crate) form: DeclForm,
    pub(crate) props: SpecRecord,
}

impl Decl {
    /// Tuple declaration from `short`, `long`, `desc`; empty strings mean absent.
    ///
    /// ```
    /// use gnuopt::Decl;
    ///
    /// let port = Decl::new("-p", "--port PORT", "Port number").default(80);
    /// let verbose = Decl::new("-v", "", "Verbosity level").id("verbosity");
    /// # let _ = (port, verbose);
    /// ```
    pub fn new(short: &str, long: &str, desc: &str) -> Self {
        Self::tuple(&[
            Some(short).filter(|s| !s.is_empty()),
            Some(long).filter(|s| !s.is_empty()),
            Some(desc).filter(|s| !s.is_empty()),
        ])
    }

    /// Tuple declaration from leading string-or-absent fields.
    ///
    /// Fields map in order to the short option, the long option (optionally
    /// carrying an argument description, `"--port PORT"` or `"--port=PORT"`)
    /// and the description.
    pub fn tuple(fields: &[Option<&str>]) -> Self {
        Self {
            form: DeclForm::Tuple(fields.iter().map(|f| f.map(str::to_string)).collect()),
            props: SpecRecord::default(),
        }
    }

    /// Record declaration; fields are used verbatim (no id derivation).
    pub fn record(record: SpecRecord) -> Self {
        Self {
            form: DeclForm::Record,
            props: record,
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.props.id = Some(id.into());
        self
    }

    pub fn short_opt(mut self, opt: impl Into<String>) -> Self {
        self.props.short_opt = Some(opt.into());
        self
    }

    pub fn long_opt(mut self, opt: impl Into<String>) -> Self {
        self.props.long_opt = Some(opt.into());
        self
    }

    /// Mark the option as taking an argument, described by `desc`.
    pub fn required(mut self, desc: impl Into<String>) -> Self {
        self.props.required = Some(desc.into());
        self
    }

    pub fn desc(mut self, desc: impl Into<String>) -> Self {
        self.props.desc = Some(desc.into());
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.props.default = Some(value.into());
        self
    }

    pub fn default_desc(mut self, desc: impl Into<String>) -> Self {
        self.props.default_desc = Some(desc.into());
        self
    }

    pub fn default_fn(mut self, f: impl Fn(&OptionMap) -> Value + Send + Sync + 'static) -> Self {
        self.props.default_fn = Some(Arc::new(f));
        self
    }

    pub fn parse_fn(
        mut self,
        f: impl Fn(&Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    ) -> Self {
        self.props.parse_fn = Some(Arc::new(f));
        self
    }

    pub fn assoc_fn(
        mut self,
        f: impl Fn(&mut OptionMap, &str, Value) + Send + Sync + 'static,
    ) -> Self {
        self.props.assoc_fn = Some(Arc::new(f));
        self
    }

    /// Fold each occurrence into the current value, ignoring the parsed value.
    pub fn update_fn(
        mut self,
        f: impl Fn(Option<&Value>) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.props.update_fn = Some(UpdateFn::Replace(Arc::new(f)));
        self
    }

    /// Fold each occurrence's parsed value into the current value. Implies `multi`.
    pub fn multi_update_fn(
        mut self,
        f: impl Fn(Option<&Value>, Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.props.update_fn = Some(UpdateFn::Accumulate(Arc::new(f)));
        self.props.multi = true;
        self
    }

    pub fn multi(mut self, multi: bool) -> Self {
        self.props.multi = multi;
        self
    }

    pub fn post_validation(mut self, post_validation: bool) -> Self {
        self.props.post_validation = post_validation;
        self
    }

    /// Append a (predicate, message) validation pair.
    pub fn validate(
        mut self,
        predicate: impl Fn(&Value) -> bool + Send + Sync + 'static,
        message: impl Into<Message>,
    ) -> Self {
        self.props
            .validate
            .push(Validator::new(predicate, Some(message.into())));
        self
    }

    /// Append a prebuilt validator after the `validate` pairs.
    pub fn validator(mut self, validator: Validator) -> Self {
        self.props.validate.push(validator);
        self
    }

    /// Append a predicate to the `validate_fn` list.
    pub fn validate_fn(
        mut self,
        predicate: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.props.validate_fn.push(Arc::new(predicate));
        self
    }

    /// Append a message to the `validate_msg` list.
    pub fn validate_msg(mut self, message: impl Into<Message>) -> Self {
        self.props.validate_msg.push(Some(message.into()));
        self
    }

    /// Report `message` when the option ends up without a value.
    pub fn missing(mut self, message: impl Into<String>) -> Self {
        self.props.missing = Some(message.into());
        self
    }
}

impl From<SpecRecord> for Decl {
    fn from(record: SpecRecord) -> Self {
        Self::record(record)
    }
}

/// A compiled option specification.
#[derive(Clone)]
pub struct OptionSpec {
    pub(crate) id: String,
    pub(crate) short_opt: Option<String>,
    pub(crate) long_opt: Option<String>,
    pub(crate) negatable: bool,
    pub(crate) required: Option<String>,
    pub(crate) desc: Option<String>,
    pub(crate) default: Option<Value>,
    pub(crate) default_desc: Option<String>,
    pub(crate) default_fn: Option<DefaultFn>,
    pub(crate) parse_fn: Option<ParseFn>,
    pub(crate) assoc_fn: Option<AssocFn>,
    pub(crate) update_fn: Option<UpdateFn>,
    pub(crate) multi: bool,
    pub(crate) post_validation: bool,
    pub(crate) validators: Vec<Validator>,
    pub(crate) missing: Option<String>,
}

const NEGATION_MARKER: &str = "--[no-]";

impl OptionSpec {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn short_opt(&self) -> Option<&str> {
        self.short_opt.as_deref()
    }

    /// The long option as declared, including a `[no-]` marker.
    pub fn long_opt(&self) -> Option<&str> {
        self.long_opt.as_deref()
    }

    /// Whether the long option accepts a `--no-` form.
    pub fn negatable(&self) -> bool {
        self.negatable
    }

    /// Argument description; `Some` means the option consumes an argument.
    pub fn required(&self) -> Option<&str> {
        self.required.as_deref()
    }

    pub fn desc(&self) -> Option<&str> {
        self.desc.as_deref()
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn default_desc(&self) -> Option<&str> {
        self.default_desc.as_deref()
    }

    pub fn has_default_fn(&self) -> bool {
        self.default_fn.is_some()
    }

    pub fn multi(&self) -> bool {
        self.multi
    }

    pub fn post_validation(&self) -> bool {
        self.post_validation
    }

    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    pub fn missing(&self) -> Option<&str> {
        self.missing.as_deref()
    }

    /// Match a long switch against this spec.
    ///
    /// Returns the flag polarity: `false` only for the `--no-` form of a
    /// negatable option.
    pub fn match_long(&self, switch: &str) -> Option<bool> {
        let long = self.long_opt.as_deref()?;
        if !self.negatable {
            return (long == switch).then_some(true);
        }
        let tail = &long[NEGATION_MARKER.len()..];
        let rest = switch.strip_prefix("--")?;
        if rest == tail {
            Some(true)
        } else if rest.strip_prefix("no-") == Some(tail) {
            Some(false)
        } else {
            None
        }
    }

    /// Every switch string this spec answers to.
    pub fn switches(&self) -> Vec<String> {
        let mut out: Vec<String> = self.short_opt.iter().cloned().collect();
        if let Some(long) = &self.long_opt {
            if self.negatable {
                let tail = &long[NEGATION_MARKER.len()..];
                out.push(format!("--{tail}"));
                out.push(format!("--no-{tail}"));
            } else {
                out.push(long.clone());
            }
        }
        out
    }
}

pub(crate) fn is_negatable(long_opt: &str) -> bool {
    long_opt.len() > NEGATION_MARKER.len() && long_opt.starts_with(NEGATION_MARKER)
}

impl fmt::Debug for OptionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionSpec")
            .field("id", &self.id)
            .field("short_opt", &self.short_opt)
            .field("long_opt", &self.long_opt)
            .field("negatable", &self.negatable)
            .field("required", &self.required)
            .field("desc", &self.desc)
            .field("default", &self.default)
            .field("default_desc", &self.default_desc)
            .field("default_fn", &self.default_fn.is_some())
            .field("parse_fn", &self.parse_fn.is_some())
            .field("assoc_fn", &self.assoc_fn.is_some())
            .field("update_fn", &self.update_fn)
            .field("multi", &self.multi)
            .field("post_validation", &self.post_validation)
            .field("validators", &self.validators)
            .field("missing", &self.missing)
            .finish()
    }
}
