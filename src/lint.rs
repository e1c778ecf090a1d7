//! Lint checks for authoring defects in a template corpus.
//!
//! Runs over a built registry and reports problems that would otherwise only
//! surface when a particular invocation happens to reach them: placeholders
//! that no parameter binds, calls to functions nobody declared, and calls
//! with the wrong number of arguments.

use std::fmt;

use crate::parser::ast::{Expr, Span};
use crate::template::{Builtin, Definition, TemplateRegistry};

/// A lint warning about a corpus defect
#[derive(Debug, Clone, PartialEq)]
pub struct LintWarning {
    pub category: LintCategory,
    /// Signature of the definition containing the defect
    pub definition: String,
    pub message: String,
    pub span: Span,
}

impl fmt::Display for LintWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.category, self.definition, self.message)
    }
}

/// Category of lint defect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintCategory {
    Placeholder,
    Function,
    Arity,
    Formatter,
}

impl fmt::Display for LintCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LintCategory::Placeholder => write!(f, "placeholder"),
            LintCategory::Function => write!(f, "function"),
            LintCategory::Arity => write!(f, "arity"),
            LintCategory::Formatter => write!(f, "formatter"),
        }
    }
}

/// Run all lint checks on a registry.
pub fn check(registry: &TemplateRegistry) -> Vec<LintWarning> {
    let mut warnings = Vec::new();
    for def in registry.definitions() {
        for pattern in def.patterns() {
            let site = Site {
                def,
                span: &pattern.span,
            };
            for expr in pattern.node.expressions() {
                check_expr(registry, &site, expr, &mut warnings);
            }
        }
    }
    warnings.sort_by(|a, b| {
        a.span
            .start
            .cmp(&b.span.start)
            .then_with(|| a.message.cmp(&b.message))
    });
    // A defect repeated within one pattern is reported once
    warnings.dedup();
    warnings
}

/// The pattern being checked and the definition it belongs to
struct Site<'a> {
    def: &'a Definition,
    span: &'a Span,
}

fn warn(site: &Site<'_>, category: LintCategory, message: String, warnings: &mut Vec<LintWarning>) {
    warnings.push(LintWarning {
        category,
        definition: site.def.signature(),
        message,
        span: site.span.clone(),
    });
}

fn check_expr(
    registry: &TemplateRegistry,
    site: &Site<'_>,
    expr: &Expr,
    warnings: &mut Vec<LintWarning>,
) {
    match expr {
        Expr::Literal(_) => {}
        Expr::Placeholder(id) => {
            if !site.def.has_parameter(id.as_str()) {
                warn(
                    site,
                    LintCategory::Placeholder,
                    format!("placeholder '{}' is not a declared parameter", id),
                    warnings,
                );
            }
        }
        Expr::Call { function, args } => {
            for arg in args {
                check_expr(registry, site, arg, warnings);
            }

            if let Some(callee) = registry.function(function.as_str()) {
                if args.len() != callee.arity() {
                    warn(
                        site,
                        LintCategory::Arity,
                        format!(
                            "'{}' called with {} arguments, declared as {}",
                            function,
                            args.len(),
                            callee.signature()
                        ),
                        warnings,
                    );
                }
            } else if let Some(builtin) = Builtin::from_name(function.as_str()) {
                check_builtin_call(registry, site, builtin, args, warnings);
            } else {
                let hint = if registry.contains_template(function.as_str()) {
                    " (templates cannot be called from patterns)"
                } else {
                    ""
                };
                warn(
                    site,
                    LintCategory::Function,
                    format!("call to unknown function '{}'{}", function, hint),
                    warnings,
                );
            }
        }
    }
}

fn check_builtin_call(
    registry: &TemplateRegistry,
    site: &Site<'_>,
    builtin: Builtin,
    args: &[Expr],
    warnings: &mut Vec<LintWarning>,
) {
    let too_few = args.len() < builtin.min_arity();
    let too_many = builtin.max_arity().is_some_and(|max| args.len() > max);
    if too_few || too_many {
        warn(
            site,
            LintCategory::Arity,
            format!("'{}' called with {} arguments", builtin, args.len()),
            warnings,
        );
        return;
    }

    if builtin.item_arity() == 0 {
        return;
    }

    // Only literal formatter names can be checked statically
    let Some(Expr::Literal(formatter)) = args.get(1) else {
        return;
    };
    let passed = builtin.item_arity() + (args.len() - builtin.min_arity());

    match registry.function(formatter) {
        Some(callee) if callee.arity() != passed => warn(
            site,
            LintCategory::Arity,
            format!(
                "formatter '{}' receives {} arguments from {}, declared as {}",
                formatter,
                passed,
                builtin,
                callee.signature()
            ),
            warnings,
        ),
        Some(_) => {}
        None => match Builtin::from_name(formatter) {
            Some(b) if b.item_arity() == 0 && passed == b.min_arity() => {}
            _ => warn(
                site,
                LintCategory::Formatter,
                format!("{} uses unknown formatter '{}'", builtin, formatter),
                warnings,
            ),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn lint(source: &str) -> Vec<LintWarning> {
        let corpus = parse(source).expect("corpus should parse");
        let registry = TemplateRegistry::from_corpus(&corpus).expect("corpus should register");
        check(&registry)
    }

    #[test]
    fn test_clean_corpus() {
        let warnings = lint(
            r#"
            template inform_byname(name, *slots): "{name} {for_entry(slots, "info", ", ", " and ", name)}."
            template reviews(name): "{genitive(name)} reviews"
            function info(slot, value, name): "{slot} is {value}"
            "#,
        );
        assert!(warnings.is_empty(), "unexpected warnings: {:?}", warnings);
    }

    #[test]
    fn test_undeclared_placeholder() {
        let warnings = lint(r#"template confirm(name): "{name} has a {value} price""#);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].category, LintCategory::Placeholder);
        assert!(warnings[0].message.contains("'value'"));
    }

    #[test]
    fn test_unknown_function() {
        let warnings = lint(r#"template t(name): "{shout(name)}""#);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].category, LintCategory::Function);
    }

    #[test]
    fn test_template_called_as_function() {
        let warnings = lint(
            r#"
            template greet(name): "hi {name}"
            template t(name): "{greet(name)}"
            "#,
        );
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("templates cannot be called"));
    }

    #[test]
    fn test_direct_call_arity() {
        let warnings = lint(
            r#"
            function info(slot, value): "{value}"
            template t(name): "{info(name)}"
            "#,
        );
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].category, LintCategory::Arity);
    }

    #[test]
    fn test_formatter_checks() {
        let warnings = lint(
            r#"
            function info(slot, value): "{value}"
            template a(*slots): "{for_entry(slots, "info", ", ", " and ", "extra")}"
            template b(*slots): "{for_entry(slots, "missing", ", ", " and ")}"
            template c(names): "{for(names, "genitive", ", ", " and ")}"
            "#,
        );
        let categories: Vec<_> = warnings.iter().map(|w| w.category).collect();
        assert_eq!(categories.len(), 2);
        assert!(categories.contains(&LintCategory::Arity));
        assert!(categories.contains(&LintCategory::Formatter));
    }

    #[test]
    fn test_duplicate_findings_reported_once_per_pattern() {
        let warnings = lint(
            r#"
            template t(slot)
                if slot = "a": "{value} and {value}"
                if slot = "b": "{value}!"
            "#,
        );
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].span.start < warnings[1].span.start);
    }

    #[test]
    fn test_warning_points_at_clause() {
        let source = r#"template t(slot): "fine {slot}"
    if slot = "a": "uses {value}"
"#;
        let warnings = lint(source);
        assert_eq!(warnings.len(), 1);
        assert_eq!(&source[warnings[0].span.clone()], "\"uses {value}\"");
    }
}
