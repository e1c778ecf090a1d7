//! Template resolution - selects a definition for an invocation and expands its pattern

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::config::MAX_DEPTH_LIMIT;
use crate::parser::ast::{DeclarationKind, Expr, Pattern, Segment};

use super::builtins::{join_fragments, smallest_number, Builtin, Possessive};
use super::registry::{Definition, TemplateRegistry};

/// Errors that can occur while resolving an invocation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ResolveError {
    /// No definition matches the template name and supplied arguments
    #[error("no template '{name}' accepts arguments ({})", arguments.join(", "))]
    UnknownTemplate {
        name: String,
        arguments: Vec<String>,
    },

    /// No special case or branch matched and there is no default pattern
    #[error("no branch of {signature} matches and no default is declared")]
    UnresolvedBranch { signature: String },

    /// `{identifier}` without a binding in the current scope
    #[error("placeholder '{identifier}' is not bound in {scope}")]
    UnboundPlaceholder { identifier: String, scope: String },

    /// Call to a function that is neither builtin nor declared in the corpus
    #[error("unknown function '{name}'")]
    UnknownFunction { name: String },

    /// Slot-dispatch function given a value it has no wording for
    #[error("function {signature} has no wording for {parameter} = {value:?}")]
    UnknownSlot {
        signature: String,
        parameter: String,
        value: String,
    },

    /// Wrong number of arguments in a call
    #[error("function '{name}' expects {expected} arguments, got {found}")]
    ArityMismatch {
        name: String,
        expected: String,
        found: usize,
    },

    /// A value used where a different shape is required
    #[error("{context}: expected {expected}, found {found}")]
    TypeMismatch {
        context: String,
        expected: &'static str,
        found: &'static str,
    },

    /// Function calls nested deeper than the configured limit
    #[error("function nesting exceeded {limit} levels while calling '{name}'")]
    RecursionLimit { name: String, limit: usize },
}

/// A caller-supplied slot value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotValue {
    One(String),
    /// Several alternatives, e.g. candidate prices offered for selection
    Many(Vec<String>),
}

impl SlotValue {
    pub fn many<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SlotValue::Many(values.into_iter().map(Into::into).collect())
    }

    /// An empty set of alternatives carries no value
    pub fn is_empty(&self) -> bool {
        matches!(self, SlotValue::Many(items) if items.is_empty())
    }

    fn into_value(self) -> Option<Value> {
        match self {
            SlotValue::One(s) => Some(Value::Text(s)),
            SlotValue::Many(items) if items.is_empty() => None,
            SlotValue::Many(mut items) if items.len() == 1 => Some(Value::Text(items.remove(0))),
            SlotValue::Many(items) => Some(Value::List(items)),
        }
    }
}

impl From<&str> for SlotValue {
    fn from(s: &str) -> Self {
        SlotValue::One(s.to_string())
    }
}

impl From<String> for SlotValue {
    fn from(s: String) -> Self {
        SlotValue::One(s)
    }
}

impl From<Vec<String>> for SlotValue {
    fn from(v: Vec<String>) -> Self {
        SlotValue::Many(v)
    }
}

/// A request to render a template: its name and named arguments in caller order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub template: String,
    pub arguments: Vec<(String, SlotValue)>,
}

impl Invocation {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            arguments: Vec::new(),
        }
    }

    /// Add or replace a named argument
    pub fn with(mut self, name: impl Into<String>, value: impl Into<SlotValue>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.arguments.iter_mut().find(|(n, _)| *n == name) {
            Some(existing) => existing.1 = value,
            None => self.arguments.push((name, value)),
        }
        self
    }

    /// Build from a slot/value table, keeping its iteration order
    pub fn from_slots<I, K, V>(template: impl Into<String>, slots: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<SlotValue>,
    {
        slots
            .into_iter()
            .fold(Self::new(template), |inv, (k, v)| inv.with(k, v))
    }

    /// Names of the arguments that carry a value
    fn argument_names(&self) -> impl Iterator<Item = &str> {
        self.arguments
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(n, _)| n.as_str())
    }
}

/// A value flowing through expansion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    List(Vec<String>),
    /// `(slot, value)` pairs bound to a variadic parameter
    Entries(Vec<(String, Value)>),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Text(_) => "text",
            Value::List(_) => "list",
            Value::Entries(_) => "slot entries",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Render as text; alternatives read as "a, b or c"
    pub fn into_text(self, context: impl FnOnce() -> String) -> Result<String, ResolveError> {
        match self {
            Value::Text(s) => Ok(s),
            Value::List(items) => Ok(join_fragments(&items, ", ", " or ")),
            Value::Entries(_) => Err(ResolveError::TypeMismatch {
                context: context(),
                expected: "text",
                found: "slot entries",
            }),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

/// Parameter bindings for one expansion scope
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    values: HashMap<String, Value>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_text)
    }
}

/// Where an expansion is happening, for error messages
#[derive(Debug, Clone)]
struct Scope<'d> {
    signature: String,
    definition: Option<&'d Definition>,
}

impl fmt::Display for Scope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature)
    }
}

/// Resolves invocations against a registry
///
/// Holds only shared references, so one resolver can serve any number of
/// threads.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'r> {
    registry: &'r TemplateRegistry,
    possessive: &'r dyn Possessive,
    max_depth: usize,
}

impl<'r> Resolver<'r> {
    pub fn new(registry: &'r TemplateRegistry, possessive: &'r dyn Possessive, max_depth: usize) -> Self {
        Self {
            registry,
            possessive,
            max_depth: max_depth.min(MAX_DEPTH_LIMIT),
        }
    }

    /// Resolve an invocation to its finished text
    pub fn resolve(&self, invocation: &Invocation) -> Result<String, ResolveError> {
        let definition = self.select(invocation)?;
        let bindings = bind(definition, invocation);
        tracing::debug!(
            template = %definition.signature(),
            "selected template definition"
        );
        let pattern = self.choose_pattern(definition, &bindings)?;
        let scope = Scope {
            signature: definition.signature(),
            definition: Some(definition),
        };
        self.expand_in(pattern, &bindings, &scope, 0)
    }

    /// Expand a standalone pattern against explicit bindings
    pub fn expand(&self, pattern: &Pattern, bindings: &Bindings) -> Result<String, ResolveError> {
        let scope = Scope {
            signature: "pattern".to_string(),
            definition: None,
        };
        self.expand_in(pattern, bindings, &scope, 0)
    }

    /// Call a builtin or corpus function with already-evaluated arguments
    pub fn call(&self, name: &str, args: Vec<Value>) -> Result<Value, ResolveError> {
        self.call_at(name, args, 0)
    }

    /// Pick the overload for an invocation
    ///
    /// Exact (non-variadic) matches are preferred; ties go to declaration order.
    fn select(&self, invocation: &Invocation) -> Result<&'r Definition, ResolveError> {
        let candidates = self.registry.templates(&invocation.template);
        let applicable = || {
            candidates
                .iter()
                .filter(|d| d.accepts(invocation.argument_names()))
        };
        applicable()
            .find(|d| !d.is_variadic())
            .or_else(|| applicable().next())
            .ok_or_else(|| ResolveError::UnknownTemplate {
                name: invocation.template.clone(),
                arguments: invocation.argument_names().map(str::to_string).collect(),
            })
    }

    /// Apply the precedence rule: special cases, then branches, then default
    fn choose_pattern<'d>(
        &self,
        definition: &'d Definition,
        bindings: &Bindings,
    ) -> Result<&'d Pattern, ResolveError> {
        let lookup = |name: &str| bindings.text(name);

        if let Some(pattern) = definition.special_cases.select(lookup) {
            tracing::trace!(definition = %definition.name, "special case applies");
            return Ok(pattern);
        }
        if let Some(pattern) = definition.branches.select(lookup) {
            tracing::trace!(definition = %definition.name, "conditional branch applies");
            return Ok(pattern);
        }
        if let Some(pattern) = &definition.default {
            return Ok(&pattern.node);
        }

        match definition.kind {
            DeclarationKind::Template => Err(ResolveError::UnresolvedBranch {
                signature: definition.signature(),
            }),
            DeclarationKind::Function => {
                let parameter = definition
                    .branches
                    .parameters()
                    .next()
                    .or_else(|| definition.special_cases.parameters().next())
                    .unwrap_or_default()
                    .to_string();
                let value = bindings
                    .get(&parameter)
                    .map(|v| match v {
                        Value::Text(s) => s.clone(),
                        other => other.kind().to_string(),
                    })
                    .unwrap_or_default();
                Err(ResolveError::UnknownSlot {
                    signature: definition.signature(),
                    parameter,
                    value,
                })
            }
        }
    }

    fn expand_in(
        &self,
        pattern: &Pattern,
        bindings: &Bindings,
        scope: &Scope<'_>,
        depth: usize,
    ) -> Result<String, ResolveError> {
        let mut out = String::new();
        for segment in &pattern.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Expr(expr) => {
                    let value = self.eval(expr, bindings, scope, depth)?;
                    out.push_str(&value.into_text(|| format!("{{{}}} in {}", expr, scope))?);
                }
            }
        }
        Ok(out)
    }

    fn eval(
        &self,
        expr: &Expr,
        bindings: &Bindings,
        scope: &Scope<'_>,
        depth: usize,
    ) -> Result<Value, ResolveError> {
        match expr {
            Expr::Literal(s) => Ok(Value::Text(s.clone())),
            Expr::Placeholder(id) => {
                bindings
                    .get(id.as_str())
                    .cloned()
                    .ok_or_else(|| ResolveError::UnboundPlaceholder {
                        identifier: id.to_string(),
                        scope: match scope.definition {
                            Some(def) if !def.has_parameter(id.as_str()) => {
                                format!("{} (not a declared parameter)", scope)
                            }
                            _ => scope.to_string(),
                        },
                    })
            }
            Expr::Call { function, args } => {
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg, bindings, scope, depth))
                    .collect::<Result<Vec<_>, _>>()?;
                self.call_at(function.as_str(), args, depth + 1)
            }
        }
    }

    fn call_at(&self, name: &str, args: Vec<Value>, depth: usize) -> Result<Value, ResolveError> {
        if depth > self.max_depth {
            return Err(ResolveError::RecursionLimit {
                name: name.to_string(),
                limit: self.max_depth,
            });
        }

        if let Some(definition) = self.registry.function(name) {
            return self.call_definition(definition, args, depth).map(Value::Text);
        }

        let builtin = Builtin::from_name(name).ok_or_else(|| ResolveError::UnknownFunction {
            name: name.to_string(),
        })?;
        check_builtin_arity(builtin, args.len())?;

        match builtin {
            Builtin::Genitive => {
                let name_value = first_text(args, builtin)?;
                Ok(Value::Text(self.possessive.possessive(&name_value)))
            }
            Builtin::MoreThan => match args.into_iter().next() {
                Some(Value::List(counts)) => {
                    let smallest = smallest_number(&counts).ok_or_else(|| ResolveError::TypeMismatch {
                        context: format!("argument of {}", builtin),
                        expected: "numbers",
                        found: "list",
                    })?;
                    Ok(Value::Text(format!("more than {}", smallest)))
                }
                other => first_text(other.into_iter().collect(), builtin).map(Value::Text),
            },
            Builtin::For | Builtin::ForEntry => self.join(builtin, args, depth).map(Value::Text),
        }
    }

    fn call_definition(
        &self,
        definition: &Definition,
        args: Vec<Value>,
        depth: usize,
    ) -> Result<String, ResolveError> {
        if args.len() != definition.arity() {
            return Err(ResolveError::ArityMismatch {
                name: definition.name.clone(),
                expected: definition.arity().to_string(),
                found: args.len(),
            });
        }

        let mut bindings = Bindings::new();
        for (param, value) in definition.parameters.iter().zip(args) {
            bindings.insert(param.clone(), value);
        }

        let pattern = self.choose_pattern(definition, &bindings)?;
        let scope = Scope {
            signature: definition.signature(),
            definition: Some(definition),
        };
        self.expand_in(pattern, &bindings, &scope, depth)
    }

    /// `for` / `for_entry`: format every item, then join the fragments
    fn join(&self, builtin: Builtin, args: Vec<Value>, depth: usize) -> Result<String, ResolveError> {
        let found = args.len();
        let mut args = args.into_iter();
        let (Some(items), Some(formatter), Some(separator), Some(conjunction)) =
            (args.next(), args.next(), args.next(), args.next())
        else {
            return Err(ResolveError::ArityMismatch {
                name: builtin.name().to_string(),
                expected: format!("at least {}", builtin.min_arity()),
                found,
            });
        };
        let extra: Vec<Value> = args.collect();

        let formatter = text_argument(formatter, builtin, "formatter")?;
        let separator = text_argument(separator, builtin, "separator")?;
        let conjunction = text_argument(conjunction, builtin, "conjunction")?;

        let item_args: Vec<Vec<Value>> = match (builtin, items) {
            (Builtin::ForEntry, Value::Entries(entries)) => entries
                .into_iter()
                .map(|(slot, value)| vec![Value::Text(slot), value])
                .collect(),
            (Builtin::For, Value::List(items)) => {
                items.into_iter().map(|item| vec![Value::Text(item)]).collect()
            }
            (Builtin::For, Value::Text(item)) => vec![vec![Value::Text(item)]],
            (_, other) => {
                return Err(ResolveError::TypeMismatch {
                    context: format!("first argument of {}", builtin),
                    expected: if builtin == Builtin::ForEntry {
                        "slot entries"
                    } else {
                        "list"
                    },
                    found: other.kind(),
                })
            }
        };

        let fragments = item_args
            .into_iter()
            .map(|mut call_args| {
                call_args.extend(extra.iter().cloned());
                self.call_at(&formatter, call_args, depth + 1)?
                    .into_text(|| format!("result of {}", formatter))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(join_fragments(&fragments, &separator, &conjunction))
    }
}

/// Bind an invocation's arguments to a selected definition
///
/// Fixed parameters bind by name; everything else becomes the variadic
/// parameter's entries in caller order.
fn bind(definition: &Definition, invocation: &Invocation) -> Bindings {
    let mut bindings = Bindings::new();
    let mut entries = Vec::new();

    for (name, value) in &invocation.arguments {
        let Some(value) = value.clone().into_value() else {
            continue;
        };
        if definition.parameters.iter().any(|p| p == name) {
            bindings.insert(name.clone(), value);
        } else {
            entries.push((name.clone(), value));
        }
    }

    if let Some(variadic) = &definition.variadic {
        bindings.insert(variadic.clone(), Value::Entries(entries));
    }
    bindings
}

fn check_builtin_arity(builtin: Builtin, found: usize) -> Result<(), ResolveError> {
    let too_few = found < builtin.min_arity();
    let too_many = builtin.max_arity().is_some_and(|max| found > max);
    if too_few || too_many {
        let expected = match builtin.max_arity() {
            Some(max) if max == builtin.min_arity() => max.to_string(),
            Some(max) => format!("{} to {}", builtin.min_arity(), max),
            None => format!("at least {}", builtin.min_arity()),
        };
        return Err(ResolveError::ArityMismatch {
            name: builtin.name().to_string(),
            expected,
            found,
        });
    }
    Ok(())
}

fn first_text(args: Vec<Value>, builtin: Builtin) -> Result<String, ResolveError> {
    match args.into_iter().next() {
        Some(value) => text_argument(value, builtin, "argument"),
        None => Err(ResolveError::ArityMismatch {
            name: builtin.name().to_string(),
            expected: builtin.min_arity().to_string(),
            found: 0,
        }),
    }
}

fn text_argument(value: Value, builtin: Builtin, role: &str) -> Result<String, ResolveError> {
    match value {
        Value::Text(s) => Ok(s),
        other => Err(ResolveError::TypeMismatch {
            context: format!("{} of {}", role, builtin),
            expected: "text",
            found: other.kind(),
        }),
    }
}
