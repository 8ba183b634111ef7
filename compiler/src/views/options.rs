//! View Options
//!
//! Builds the `options` object handed to each view constructor.
//! Styles from linked stylesheets are selected by the tag's
//! literal `class` and `id` attributes, expanded, and merged with
//! the inline attributes, which always win. Styles declared under
//! `@media` conditions become guarded assignments.
//!

use serde_json::{Map, Value};

use crate::script::{self, Expr, Scope, ScriptError};
use crate::styles::expanders::{ExpanderRegistry, PropertyBag};
use crate::styles::{self, Declaration, StyleSheet};
use crate::views::attributes::{self, Attribute};
use crate::views::interpolate::{self, CompiledText, quote};

// ------------------------------------------------------------- Public Types

/// Where an unconditional option value comes from.
///
#[derive(Debug, Clone, PartialEq)]
pub enum OptionSource {
    /// An expanded stylesheet value.
    ///
    Style(Value),
    /// An inline attribute, kept both as generated code and as a
    /// compiled interpolation.
    ///
    Attribute {
        expression: String,
        text: CompiledText,
    },
}

/// A style value assigned only when all its conditions hold.
///
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalOption {
    pub name: String,
    pub value: Value,
    pub conditions: Vec<String>,
    pub compiled: Vec<Expr>,
}

/// The merged options of one view.
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionsSpec {
    pub properties: Vec<(String, OptionSource)>,
    pub conditionals: Vec<ConditionalOption>,
}

// ------------------------------------------------------------- Private Types

struct StyleEntry {
    name: String,
    value: Value,
    conditions: Vec<String>,
}

// ------------------------------------------------------------- Public Implementations

impl OptionsSpec {
    /// Renders the `options = {...};` statement followed by one
    /// guarded assignment per conditional style.
    ///
    pub fn to_statement(&self) -> String {
        let literal = attributes::object_literal(self.properties.iter().map(|(name, source)| {
            let expression = match source {
                OptionSource::Style(value) => value.to_string(),
                OptionSource::Attribute { expression, .. } => expression.clone(),
            };
            (name.as_str(), expression)
        }));

        let mut js = format!("options = {};", literal);

        for conditional in &self.conditionals {
            let guard: Vec<String> = conditional
                .conditions
                .iter()
                .map(|condition| format!("({})", condition))
                .collect();

            js.push_str(&format!(
                "\nif ({}) {{\noptions[{}] = {};\n}}",
                guard.join(" && "),
                quote(&conditional.name),
                conditional.value
            ));
        }

        js
    }

    /// Evaluates the options against a scope.
    ///
    pub fn evaluate(&self, scope: &mut Scope) -> Result<Map<String, Value>, ScriptError> {
        let mut options = Map::new();

        for (name, source) in &self.properties {
            let value = match source {
                OptionSource::Style(value) => value.clone(),
                OptionSource::Attribute { text, .. } => {
                    Value::String(interpolate::render(text, scope)?)
                }
            };
            options.insert(name.clone(), value);
        }

        for conditional in &self.conditionals {
            if holds(&conditional.compiled, scope)? {
                options.insert(conditional.name.clone(), conditional.value.clone());
            }
        }

        Ok(options)
    }
}

// ------------------------------------------------------------- Public Functions

/// Merges stylesheet declarations with a tag's inline attributes.
/// Class styles come before id styles, in stylesheet link order.
/// A style is dropped when a later unconditional style or an
/// inline attribute sets the same property.
///
pub fn merge(
    sheets: &[&StyleSheet],
    attributes: &[Attribute],
    expanders: &ExpanderRegistry,
) -> Result<OptionsSpec, ScriptError> {
    let class_names = attributes::literal(attributes, "class").unwrap_or_default();
    let id = attributes::literal(attributes, "id");

    let mut entries = Vec::new();
    for name in class_names.split_whitespace() {
        for sheet in sheets {
            if let Some(rules) = sheet.classes.get(name) {
                entries.extend(rules.values().flat_map(|decl| expand(decl, expanders)));
            }
        }
    }
    if let Some(id) = &id {
        for sheet in sheets {
            if let Some(rules) = sheet.ids.get(id) {
                entries.extend(rules.values().flat_map(|decl| expand(decl, expanders)));
            }
        }
    }

    let mut spec = OptionsSpec::default();

    for (index, entry) in entries.iter().enumerate() {
        let overridden = entries[index + 1..]
            .iter()
            .any(|later| later.name == entry.name && later.conditions.is_empty())
            || attributes::find(attributes, &entry.name).is_some();

        if overridden {
            continue;
        }

        if entry.conditions.is_empty() {
            spec.properties
                .push((entry.name.clone(), OptionSource::Style(entry.value.clone())));
        } else {
            spec.conditionals.push(ConditionalOption {
                name: entry.name.clone(),
                value: entry.value.clone(),
                conditions: entry.conditions.clone(),
                compiled: entry
                    .conditions
                    .iter()
                    .map(|condition| script::parse_expression(condition))
                    .collect::<Result<_, _>>()?,
            });
        }
    }

    for attribute in attributes {
        spec.properties.push((
            attribute.name.clone(),
            OptionSource::Attribute {
                expression: attribute.value.to_expression(),
                text: attribute.value.compile()?,
            },
        ));
    }

    Ok(spec)
}

// ------------------------------------------------------------- Private Functions

/// Camel-cases a declaration and runs it through the expanders.
/// Every resulting property keeps the declaration's conditions.
///
fn expand(declaration: &Declaration, expanders: &ExpanderRegistry) -> Vec<StyleEntry> {
    let mut bag = PropertyBag::new();
    bag.insert(
        styles::camelize(&declaration.name),
        Value::String(declaration.value.clone()),
    );
    expanders.apply(&mut bag);

    bag.into_iter()
        .map(|(name, value)| StyleEntry {
            name,
            value,
            conditions: declaration.conditions.clone(),
        })
        .collect()
}

fn holds(conditions: &[Expr], scope: &Scope) -> Result<bool, ScriptError> {
    for condition in conditions {
        if !script::eval::is_truthy(&script::evaluate(condition, scope)?) {
            return Ok(false);
        }
    }
    Ok(true)
}

// ------------------------------------------------------------- Unit Tests
