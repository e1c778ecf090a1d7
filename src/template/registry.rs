//! Template registry for storing and retrieving template and function definitions

use std::collections::{HashMap, HashSet};
use std::fmt;

use thiserror::Error;

use crate::parser::ast::{ClauseKind, Corpus, Declaration, DeclarationKind, Pattern, Span, Spanned};

use super::builtins::Builtin;

/// Errors that can occur while building a registry from a corpus
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Same name and parameter signature declared twice
    #[error("duplicate {kind} definition: {signature}")]
    Duplicate {
        kind: DeclarationKind,
        signature: String,
        span: Span,
    },

    /// A parameter name used twice in one signature
    #[error("duplicate parameter '{param}' in {signature}")]
    DuplicateParameter {
        signature: String,
        param: String,
        span: Span,
    },

    /// `*param` that is not the last parameter, or on a function
    #[error("misplaced variadic parameter '{param}' in {signature}")]
    MisplacedVariadic {
        signature: String,
        param: String,
        span: Span,
    },

    /// A condition keyed on a parameter the definition does not declare
    #[error("condition on unknown parameter '{param}' in {signature}")]
    UnknownParameter {
        signature: String,
        param: String,
        span: Span,
    },

    /// The same condition set declared twice in one definition
    #[error("duplicate {clause} for {conditions} in {signature}")]
    DuplicateBranch {
        signature: String,
        clause: &'static str,
        conditions: String,
        span: Span,
    },

    /// Neither a default pattern nor any clause
    #[error("{signature} has no default pattern and no clauses")]
    EmptyDefinition { signature: String, span: Span },

    /// A corpus function named like a builtin
    #[error("function '{name}' is reserved for a builtin")]
    ReservedFunction { name: String, span: Span },
}

impl TemplateError {
    pub fn span(&self) -> &Span {
        match self {
            TemplateError::Duplicate { span, .. }
            | TemplateError::DuplicateParameter { span, .. }
            | TemplateError::MisplacedVariadic { span, .. }
            | TemplateError::UnknownParameter { span, .. }
            | TemplateError::DuplicateBranch { span, .. }
            | TemplateError::EmptyDefinition { span, .. }
            | TemplateError::ReservedFunction { span, .. } => span,
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        let message = self.to_string();
        crate::error::report(source, filename, self.span().clone(), &message, &message)
    }
}

/// A single `parameter = "literal"` test
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Condition {
    pub parameter: String,
    pub value: String,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {:?}", self.parameter, self.value)
    }
}

/// One clause filed under its first condition
#[derive(Debug, Clone)]
struct Arm {
    order: usize,
    rest: Vec<Condition>,
    pattern: Spanned<Pattern>,
}

/// Clauses keyed on one parameter, indexed by literal value
#[derive(Debug, Clone)]
struct DispatchGroup {
    parameter: String,
    arms: HashMap<String, Vec<Arm>>,
}

/// Lookup table compiled from a definition's `if` or `special_case` clauses
///
/// Clauses are indexed by `(parameter, literal)` of their first condition;
/// additional conditions are checked on the candidates. When several clauses
/// match, the one declared first wins.
#[derive(Debug, Clone, Default)]
pub struct Dispatch {
    groups: Vec<DispatchGroup>,
    len: usize,
}

impl Dispatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Add a clause; returns false if the same condition set is already present
    pub fn insert(&mut self, mut conditions: Vec<Condition>, pattern: Spanned<Pattern>) -> bool {
        if conditions.is_empty() {
            return false;
        }
        let first = conditions.remove(0);
        let group = match self
            .groups
            .iter_mut()
            .position(|g| g.parameter == first.parameter)
        {
            Some(index) => &mut self.groups[index],
            None => {
                self.groups.push(DispatchGroup {
                    parameter: first.parameter.clone(),
                    arms: HashMap::new(),
                });
                let last = self.groups.len() - 1;
                &mut self.groups[last]
            }
        };

        let arms = group.arms.entry(first.value).or_default();
        let key: HashSet<&Condition> = conditions.iter().collect();
        if arms
            .iter()
            .any(|arm| arm.rest.len() == conditions.len() && arm.rest.iter().collect::<HashSet<_>>() == key)
        {
            return false;
        }

        arms.push(Arm {
            order: self.len,
            rest: conditions,
            pattern,
        });
        self.len += 1;
        true
    }

    /// Find the earliest declared clause whose conditions all hold
    ///
    /// `lookup` returns the text bound to a parameter, or `None` when the
    /// parameter is unbound or not plain text.
    pub fn select<'s, 'v>(&'s self, lookup: impl Fn(&str) -> Option<&'v str>) -> Option<&'s Pattern> {
        let mut best: Option<&Arm> = None;
        for group in &self.groups {
            let Some(value) = lookup(&group.parameter) else {
                continue;
            };
            let Some(arms) = group.arms.get(value) else {
                continue;
            };
            for arm in arms {
                let holds = arm
                    .rest
                    .iter()
                    .all(|c| lookup(&c.parameter) == Some(c.value.as_str()));
                if holds && best.map_or(true, |b| arm.order < b.order) {
                    best = Some(arm);
                }
            }
        }
        best.map(|arm| &arm.pattern.node)
    }

    /// All patterns in declaration order, with their source spans
    pub fn patterns(&self) -> Vec<&Spanned<Pattern>> {
        let mut arms: Vec<&Arm> = self
            .groups
            .iter()
            .flat_map(|g| g.arms.values().flatten())
            .collect();
        arms.sort_by_key(|arm| arm.order);
        arms.into_iter().map(|arm| &arm.pattern).collect()
    }

    /// Parameters this table dispatches on
    pub fn parameters(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.parameter.as_str())
    }
}

/// A stored template or function definition
#[derive(Debug, Clone)]
pub struct Definition {
    pub name: String,
    pub kind: DeclarationKind,
    /// Fixed parameters in declaration order
    pub parameters: Vec<String>,
    /// Trailing `*param`, templates only
    pub variadic: Option<String>,
    pub default: Option<Spanned<Pattern>>,
    pub branches: Dispatch,
    pub special_cases: Dispatch,
    pub span: Span,
}

impl Definition {
    /// Build a definition from a parsed declaration, validating its shape
    pub fn from_decl(decl: &Spanned<Declaration>) -> Result<Self, TemplateError> {
        let node = &decl.node;
        let signature = signature_of(node);
        let mut parameters = Vec::new();
        let mut variadic = None;
        let mut seen = HashSet::new();

        for (i, param) in node.parameters.iter().enumerate() {
            let name = param.name.node.as_str().to_string();
            if !seen.insert(name.clone()) {
                return Err(TemplateError::DuplicateParameter {
                    signature,
                    param: name,
                    span: param.name.span.clone(),
                });
            }
            if param.variadic {
                let is_last = i + 1 == node.parameters.len();
                if !is_last || node.kind == DeclarationKind::Function {
                    return Err(TemplateError::MisplacedVariadic {
                        signature,
                        param: name,
                        span: param.name.span.clone(),
                    });
                }
                variadic = Some(name);
            } else {
                parameters.push(name);
            }
        }

        if node.default.is_none() && node.clauses.is_empty() {
            return Err(TemplateError::EmptyDefinition {
                signature,
                span: decl.span.clone(),
            });
        }

        let mut branches = Dispatch::new();
        let mut special_cases = Dispatch::new();

        for clause in &node.clauses {
            let mut conditions = Vec::with_capacity(clause.conditions.len());
            for cond in &clause.conditions {
                let param = cond.parameter.node.as_str();
                if !seen.contains(param) {
                    return Err(TemplateError::UnknownParameter {
                        signature,
                        param: param.to_string(),
                        span: cond.parameter.span.clone(),
                    });
                }
                conditions.push(Condition {
                    parameter: param.to_string(),
                    value: cond.value.clone(),
                });
            }

            let described = conditions
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            let (table, clause_name) = match clause.kind {
                ClauseKind::Branch => (&mut branches, "if"),
                ClauseKind::SpecialCase => (&mut special_cases, "special_case"),
            };
            if !table.insert(conditions, clause.pattern.clone()) {
                return Err(TemplateError::DuplicateBranch {
                    signature,
                    clause: clause_name,
                    conditions: described,
                    span: clause.pattern.span.clone(),
                });
            }
        }

        Ok(Self {
            name: node.name.node.as_str().to_string(),
            kind: node.kind,
            parameters,
            variadic,
            default: node.default.clone(),
            branches,
            special_cases,
            span: decl.span.clone(),
        })
    }

    /// Number of fixed parameters
    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic.is_some()
    }

    /// Check if a parameter (fixed or variadic) is declared
    pub fn has_parameter(&self, name: &str) -> bool {
        self.parameters.iter().any(|p| p == name) || self.variadic.as_deref() == Some(name)
    }

    /// Whether a call supplying exactly these argument names can use this definition
    pub fn accepts<'n>(&self, names: impl IntoIterator<Item = &'n str>) -> bool {
        let names: Vec<&str> = names.into_iter().collect();
        let all_fixed = self.parameters.iter().all(|p| names.contains(&p.as_str()));
        all_fixed && (names.len() == self.parameters.len() || self.is_variadic())
    }

    /// Every pattern the definition may expand, in precedence order
    pub fn patterns(&self) -> Vec<&Spanned<Pattern>> {
        let mut patterns = self.special_cases.patterns();
        patterns.extend(self.branches.patterns());
        patterns.extend(self.default.iter());
        patterns
    }

    /// Human-readable signature, e.g. `inform_byname(name, *slots)`
    pub fn signature(&self) -> String {
        let mut params: Vec<String> = self.parameters.clone();
        if let Some(v) = &self.variadic {
            params.push(format!("*{}", v));
        }
        format!("{}({})", self.name, params.join(", "))
    }

    /// Key identifying an overload: fixed parameter set plus variadic flag
    fn overload_key(&self) -> (Vec<&str>, bool) {
        let mut fixed: Vec<&str> = self.parameters.iter().map(|s| s.as_str()).collect();
        fixed.sort_unstable();
        (fixed, self.is_variadic())
    }
}

fn signature_of(decl: &Declaration) -> String {
    let params: Vec<String> = decl
        .parameters
        .iter()
        .map(|p| {
            if p.variadic {
                format!("*{}", p.name.node)
            } else {
                p.name.node.to_string()
            }
        })
        .collect();
    format!("{}({})", decl.name.node, params.join(", "))
}

/// Registry for storing template and function definitions
///
/// Templates may be overloaded by parameter signature; functions are unique by name.
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, Vec<Definition>>,
    functions: HashMap<String, Definition>,
}

impl TemplateRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from every declaration in a corpus
    pub fn from_corpus(corpus: &Corpus) -> Result<Self, TemplateError> {
        let mut registry = Self::new();
        for decl in &corpus.declarations {
            registry.register(decl)?;
        }
        Ok(registry)
    }

    /// Register a declaration
    pub fn register(&mut self, decl: &Spanned<Declaration>) -> Result<(), TemplateError> {
        let def = Definition::from_decl(decl)?;
        self.register_definition(def)
    }

    /// Register a definition directly
    pub fn register_definition(&mut self, def: Definition) -> Result<(), TemplateError> {
        match def.kind {
            DeclarationKind::Function => {
                if Builtin::from_name(&def.name).is_some() {
                    return Err(TemplateError::ReservedFunction {
                        name: def.name.clone(),
                        span: def.span.clone(),
                    });
                }
                if self.functions.contains_key(&def.name) {
                    return Err(TemplateError::Duplicate {
                        kind: def.kind,
                        signature: def.signature(),
                        span: def.span.clone(),
                    });
                }
                self.functions.insert(def.name.clone(), def);
            }
            DeclarationKind::Template => {
                let overloads = self.templates.entry(def.name.clone()).or_default();
                if overloads.iter().any(|o| o.overload_key() == def.overload_key()) {
                    return Err(TemplateError::Duplicate {
                        kind: def.kind,
                        signature: def.signature(),
                        span: def.span.clone(),
                    });
                }
                overloads.push(def);
            }
        }
        Ok(())
    }

    /// All overloads of a template, in declaration order
    pub fn templates(&self, name: &str) -> &[Definition] {
        self.templates.get(name).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Get a corpus function by name
    pub fn function(&self, name: &str) -> Option<&Definition> {
        self.functions.get(name)
    }

    /// Check if a template name exists
    pub fn contains_template(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Get all template names
    pub fn template_names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(|s| s.as_str())
    }

    /// Get all function names
    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(|s| s.as_str())
    }

    /// Every template and function definition
    pub fn definitions(&self) -> impl Iterator<Item = &Definition> {
        self.templates.values().flatten().chain(self.functions.values())
    }

    /// Number of template overloads
    pub fn template_count(&self) -> usize {
        self.templates.values().map(|v| v.len()).sum()
    }

    /// Number of corpus functions
    pub fn function_count(&self) -> usize {
        self.functions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn registry(source: &str) -> Result<TemplateRegistry, TemplateError> {
        let corpus = parse(source).expect("corpus should parse");
        TemplateRegistry::from_corpus(&corpus)
    }

    fn text_of(pattern: &Pattern) -> String {
        pattern
            .segments
            .iter()
            .map(|s| match s {
                crate::parser::ast::Segment::Text(t) => t.clone(),
                crate::parser::ast::Segment::Expr(e) => format!("{{{}}}", e),
            })
            .collect()
    }

    #[test]
    fn test_registry_register_and_get() {
        let registry = registry(
            r#"
            template closingmsg(): "Goodbye."
            function info(slot, value): "{value}"
            "#,
        )
        .expect("Should register");
        assert!(registry.contains_template("closingmsg"));
        assert_eq!(registry.templates("closingmsg").len(), 1);
        assert!(registry.function("info").is_some());
        assert_eq!(registry.template_count(), 1);
        assert_eq!(registry.function_count(), 1);
    }

    #[test]
    fn test_registry_names() {
        let registry = registry(
            r#"
            template request(slot): "a"
            template inform_byname(name): "b"
            template inform_byname(name, *slots): "c"
            function info(slot, value): "{value}"
            "#,
        )
        .unwrap();
        let mut templates: Vec<&str> = registry.template_names().collect();
        templates.sort_unstable();
        assert_eq!(templates, vec!["inform_byname", "request"]);
        assert_eq!(registry.function_names().collect::<Vec<_>>(), vec!["info"]);
        assert_eq!(registry.template_count(), 3);
    }

    #[test]
    fn test_overloads_by_signature() {
        let registry = registry(
            r#"
            template inform_byname(name): "I found {name}."
            template inform_byname(name, *slots): "{name} matches."
            "#,
        )
        .unwrap();
        let overloads = registry.templates("inform_byname");
        assert_eq!(overloads.len(), 2);
        assert_eq!(overloads[1].signature(), "inform_byname(name, *slots)");
    }

    #[test]
    fn test_registry_duplicate_error() {
        let result = registry(
            r#"
            template request(slot): "a"
            template request(slot): "b"
            "#,
        );
        assert!(matches!(result, Err(TemplateError::Duplicate { .. })));
    }

    #[test]
    fn test_duplicate_function_error() {
        let result = registry(
            r#"
            function info(slot): "a"
            function info(value): "b"
            "#,
        );
        assert!(matches!(result, Err(TemplateError::Duplicate { .. })));
    }

    #[test]
    fn test_duplicate_parameter_error() {
        let result = registry(r#"template t(a, a): "x""#);
        assert!(matches!(result, Err(TemplateError::DuplicateParameter { .. })));
    }

    #[test]
    fn test_misplaced_variadic_error() {
        let result = registry(r#"template t(*slots, name): "x""#);
        assert!(matches!(result, Err(TemplateError::MisplacedVariadic { .. })));

        let result = registry(r#"function f(*slots): "x""#);
        assert!(matches!(result, Err(TemplateError::MisplacedVariadic { .. })));
    }

    #[test]
    fn test_unknown_parameter_error() {
        let result = registry(
            r#"
            template t(name): "x"
                special_case area = "none": "y"
            "#,
        );
        assert!(matches!(
            result,
            Err(TemplateError::UnknownParameter { ref param, .. }) if param == "area"
        ));
    }

    #[test]
    fn test_duplicate_branch_error() {
        let result = registry(
            r#"
            template t(slot)
                if slot = "price": "a"
                if slot = "price": "b"
            "#,
        );
        assert!(matches!(result, Err(TemplateError::DuplicateBranch { .. })));
    }

    #[test]
    fn test_empty_definition_error() {
        let result = registry("template t(slot)");
        assert!(matches!(result, Err(TemplateError::EmptyDefinition { .. })));
    }

    #[test]
    fn test_reserved_function_error() {
        let result = registry(r#"function genitive(name): "{name}s""#);
        assert!(matches!(result, Err(TemplateError::ReservedFunction { .. })));
    }

    #[test]
    fn test_dispatch_select() {
        let registry = registry(
            r#"
            function info(slot, value)
                if slot = "rating": "has a rating of {value}"
                if slot = "price": "has a {value} price"
            "#,
        )
        .unwrap();
        let def = registry.function("info").unwrap();
        let pattern = def
            .branches
            .select(|p| if p == "slot" { Some("price") } else { None })
            .unwrap();
        assert_eq!(text_of(pattern), "has a {value} price");
        assert!(def
            .branches
            .select(|p| if p == "slot" { Some("area") } else { None })
            .is_none());
    }

    #[test]
    fn test_dispatch_multi_condition_and_order() {
        let registry = registry(
            r#"
            template t(name, area): "default"
                special_case area = "north": "north"
                special_case name = "none", area = "north": "nothing north"
                special_case name = "none": "nothing"
            "#,
        )
        .unwrap();
        let def = &registry.templates("t")[0];
        let bindings = |name: &'static str, area: &'static str| {
            move |p: &str| match p {
                "name" => Some(name),
                "area" => Some(area),
                _ => None,
            }
        };
        // Declared first, so it wins even though the later clause is more specific
        let pattern = def.special_cases.select(bindings("none", "north")).unwrap();
        assert_eq!(text_of(pattern), "north");
        let pattern = def.special_cases.select(bindings("none", "south")).unwrap();
        assert_eq!(text_of(pattern), "nothing");
        assert!(def.special_cases.select(bindings("Mensa", "south")).is_none());
        assert_eq!(def.special_cases.len(), 3);
        assert_eq!(def.patterns().len(), 4);
    }

    #[test]
    fn test_accepts() {
        let registry = registry(
            r#"
            template inform_byname(name): "a"
            template inform_byname(name, *slots): "b"
            "#,
        )
        .unwrap();
        let exact = &registry.templates("inform_byname")[0];
        let variadic = &registry.templates("inform_byname")[1];
        assert!(exact.accepts(["name"]));
        assert!(!exact.accepts(["name", "price"]));
        assert!(variadic.accepts(["name"]));
        assert!(variadic.accepts(["name", "price", "rating"]));
        assert!(!variadic.accepts(["price"]));
    }
}
