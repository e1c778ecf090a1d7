//! Template system: registry, dispatch and expansion
//!
//! A corpus declares templates and helper functions:
//!
//! ```text
//! template inform_byname(name, *slots): "{name} {for_entry(slots, "info", ", ", " and ", name)}."
//!     special_case name = "none": "There is no such restaurant/bar which {for_entry(slots, "info", ", ", " and ", name)}."
//!
//! function info(slot, value, name)
//!     if slot = "rating": "has a rating of {value}"
//!     if slot = "price": "has a {value} price"
//! ```
//!
//! Resolution picks the overload matching the caller's argument names, applies
//! special cases before `if` branches before the default pattern, and expands
//! placeholders and calls left to right.

mod builtins;
mod registry;
mod resolver;

pub use builtins::{
    join_fragments, Builtin, EnglishPossessive, GermanPossessive, Possessive, PossessiveRule,
};
pub use registry::{Condition, Definition, Dispatch, TemplateError, TemplateRegistry};
pub use resolver::{Bindings, Invocation, ResolveError, Resolver, SlotValue, Value};
