//! Property Expanders
//!
//! Ordered transforms that rewrite stylesheet properties into the
//! shapes the view runtime expects. Each property is offered to
//! the registered expanders in order until one claims it.
//!

use serde_json::{Map, Value};

use crate::patterns::{BORDER, FONT, QUOTED};

// ------------------------------------------------------------- Public Types

/// Properties being built for one view, keyed by camel-cased name.
///
pub type PropertyBag = Map<String, Value>;

/// A named property transform. Returns true when it handled the
/// property, which stops later expanders from seeing it.
///
pub trait PropertyExpander {
    fn name(&self) -> &str;

    fn try_apply(&self, bag: &mut PropertyBag, name: &str, value: &str) -> bool;
}

/// Ordered collection of expanders.
///
#[derive(Default)]
pub struct ExpanderRegistry {
    expanders: Vec<Box<dyn PropertyExpander>>,
}

/// `font: bold italic 10 Helvetica` into a font object.
///
pub struct Font;

/// `border: 2 #000` into `borderWidth` and `borderColor`.
///
pub struct Border;

/// `padding` with one to four values into the four sides.
///
pub struct Padding;

/// Strips matching quotes around `text` and `hintText` values.
/// Never claims the property.
///
pub struct TextQuotes;

/// `"true"` and `"false"` into booleans.
///
pub struct Boolean;

// ------------------------------------------------------------- Public Implementations

impl ExpanderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in expanders.
    ///
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry
            .register(Box::new(Font))
            .register(Box::new(Border))
            .register(Box::new(Padding))
            .register(Box::new(TextQuotes))
            .register(Box::new(Boolean));
        registry
    }

    /// Appends an expander after those already registered.
    ///
    pub fn register(&mut self, expander: Box<dyn PropertyExpander>) -> &mut Self {
        self.expanders.push(expander);
        self
    }

    pub fn get(&self, name: &str) -> Option<&dyn PropertyExpander> {
        self.expanders
            .iter()
            .find(|expander| expander.name() == name)
            .map(|expander| expander.as_ref())
    }

    /// Removes the first expander registered under `name`.
    ///
    pub fn unregister(&mut self, name: &str) -> &mut Self {
        if let Some(index) = self.expanders.iter().position(|e| e.name() == name) {
            self.expanders.remove(index);
        }
        self
    }

    /// Offers every string property of the bag to the expanders.
    /// Each expander sees the value as left by the ones before it.
    ///
    pub fn apply(&self, bag: &mut PropertyBag) {
        let names: Vec<String> = bag.keys().cloned().collect();

        for name in names {
            for expander in &self.expanders {
                let Some(Value::String(value)) = bag.get(&name) else {
                    break;
                };

                let value = value.clone();
                if expander.try_apply(bag, &name, &value) {
                    log::trace!("Expander {} claimed {}", expander.name(), name);
                    break;
                }
            }
        }
    }
}

impl PropertyExpander for Font {
    fn name(&self) -> &str {
        "font"
    }

    fn try_apply(&self, bag: &mut PropertyBag, name: &str, value: &str) -> bool {
        if name != "font" {
            return false;
        }

        let Some(captures) = FONT.captures(value) else {
            return false;
        };

        let mut font = Map::new();
        for (index, key) in ["fontWeight", "fontStyle", "fontSize", "fontFamily"]
            .iter()
            .enumerate()
        {
            if let Some(part) = captures.get(index + 1) {
                font.insert(key.to_string(), Value::String(part.as_str().to_string()));
            }
        }

        bag.insert(name.to_string(), Value::Object(font));
        true
    }
}

impl PropertyExpander for Border {
    fn name(&self) -> &str {
        "border"
    }

    fn try_apply(&self, bag: &mut PropertyBag, name: &str, value: &str) -> bool {
        if name != "border" {
            return false;
        }

        let Some(captures) = BORDER.captures(value) else {
            return false;
        };

        bag.remove(name);
        if let Some(width) = captures.get(1) {
            bag.insert("borderWidth".to_string(), Value::String(width.as_str().to_string()));
        }
        if let Some(color) = captures.get(2) {
            bag.insert("borderColor".to_string(), Value::String(color.as_str().to_string()));
        }
        true
    }
}

impl PropertyExpander for Padding {
    fn name(&self) -> &str {
        "padding"
    }

    fn try_apply(&self, bag: &mut PropertyBag, name: &str, value: &str) -> bool {
        if name != "padding" {
            return false;
        }

        let parts: Vec<&str> = value.split_whitespace().collect();
        let [top, right, bottom, left] = match parts.as_slice() {
            [all] => [all, all, all, all],
            [vertical, horizontal] => [vertical, horizontal, vertical, horizontal],
            [top, horizontal, bottom] => [top, horizontal, bottom, horizontal],
            [top, right, bottom, left] => [top, right, bottom, left],
            _ => return false,
        };

        bag.remove(name);
        for (side, size) in [
            ("paddingTop", top),
            ("paddingRight", right),
            ("paddingBottom", bottom),
            ("paddingLeft", left),
        ] {
            bag.insert(side.to_string(), Value::String(size.to_string()));
        }
        true
    }
}

impl PropertyExpander for TextQuotes {
    fn name(&self) -> &str {
        "textQuotes"
    }

    fn try_apply(&self, bag: &mut PropertyBag, name: &str, value: &str) -> bool {
        if name != "text" && name != "hintText" {
            return false;
        }

        if let Some(captures) = QUOTED.captures(value)
            && let Some(inner) = captures.get(1).or_else(|| captures.get(2))
        {
            bag.insert(name.to_string(), Value::String(inner.as_str().to_string()));
        }
        false
    }
}

impl PropertyExpander for Boolean {
    fn name(&self) -> &str {
        "boolean"
    }

    fn try_apply(&self, bag: &mut PropertyBag, name: &str, value: &str) -> bool {
        let flag = match value {
            "true" => true,
            "false" => false,
            _ => return false,
        };

        bag.insert(name.to_string(), Value::Bool(flag));
        true
    }
}

// ------------------------------------------------------------- Unit Tests

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn bag(value: Value) -> PropertyBag {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    fn expand(value: Value) -> Value {
        let mut bag = bag(value);
        ExpanderRegistry::with_defaults().apply(&mut bag);
        Value::Object(bag)
    }

    // ----------------------------------------- font tests

    #[test]
    fn test_font_full() {
        assert_eq!(
            expand(json!({"font": "normal italic 16px Helvetica"})),
            json!({"font": {
                "fontWeight": "normal",
                "fontStyle": "italic",
                "fontSize": "16px",
                "fontFamily": "Helvetica"
            }})
        );
    }

    #[test]
    fn test_font_size_only() {
        assert_eq!(
            expand(json!({"font": "18px", "margin": "10px"})),
            json!({"font": {"fontSize": "18px"}, "margin": "10px"})
        );
    }

    #[test]
    fn test_font_family_only() {
        assert_eq!(
            expand(json!({"font": "Helvetica, Arial, sans-serif"})),
            json!({"font": {"fontFamily": "Helvetica, Arial, sans-serif"}})
        );
    }

    #[test]
    fn test_font_ignores_other_properties() {
        let mut item = bag(json!({"margin": "18px"}));
        assert!(!Font.try_apply(&mut item, "margin", "18px"));
        assert_eq!(Value::Object(item), json!({"margin": "18px"}));
    }

    // ----------------------------------------- border tests

    #[test]
    fn test_border_width_only() {
        assert_eq!(expand(json!({"border": "1"})), json!({"borderWidth": "1"}));
    }

    #[test]
    fn test_border_width_and_color() {
        assert_eq!(
            expand(json!({"border": "2px #444444", "margin": "12px"})),
            json!({"margin": "12px", "borderWidth": "2px", "borderColor": "#444444"})
        );
    }

    #[test]
    fn test_border_unrecognized_value_kept() {
        assert_eq!(expand(json!({"border": "thin solid"})), json!({"border": "thin solid"}));
    }

    // ----------------------------------------- padding tests

    #[test]
    fn test_padding_single_value() {
        assert_eq!(
            expand(json!({"padding": "10px"})),
            json!({
                "paddingTop": "10px",
                "paddingRight": "10px",
                "paddingBottom": "10px",
                "paddingLeft": "10px"
            })
        );
    }

    #[test]
    fn test_padding_three_values() {
        assert_eq!(
            expand(json!({"padding": "1 2 3"})),
            json!({
                "paddingTop": "1",
                "paddingRight": "2",
                "paddingBottom": "3",
                "paddingLeft": "2"
            })
        );
    }

    // ----------------------------------------- textQuotes tests

    #[test]
    fn test_text_quotes_stripped() {
        assert_eq!(
            expand(json!({"hintText": "\"double quoted\"", "text": "'single quoted'"})),
            json!({"hintText": "double quoted", "text": "single quoted"})
        );
    }

    #[test]
    fn test_text_quotes_does_not_claim() {
        assert_eq!(expand(json!({"text": "\"true\""})), json!({"text": true}));
    }

    // ----------------------------------------- boolean tests

    #[test]
    fn test_boolean() {
        assert_eq!(
            expand(json!({"touchEnabled": "false", "wordWrap": "true", "width": "10"})),
            json!({"touchEnabled": false, "wordWrap": true, "width": "10"})
        );
    }

    // ----------------------------------------- registry tests

    #[test]
    fn test_registry_get_and_unregister() {
        let mut registry = ExpanderRegistry::with_defaults();
        assert_eq!(registry.get("font").map(|e| e.name()), Some("font"));

        registry.unregister("font");
        assert!(registry.get("font").is_none());

        let mut item = bag(json!({"font": "18px"}));
        registry.apply(&mut item);
        assert_eq!(Value::Object(item), json!({"font": "18px"}));
    }

    struct Upper;

    impl PropertyExpander for Upper {
        fn name(&self) -> &str {
            "upper"
        }

        fn try_apply(&self, bag: &mut PropertyBag, name: &str, value: &str) -> bool {
            bag.insert(name.to_string(), Value::String(value.to_uppercase()));
            true
        }
    }

    #[test]
    fn test_registry_custom_expander_first_claim_wins() {
        let mut registry = ExpanderRegistry::new();
        registry.register(Box::new(Upper)).register(Box::new(Boolean));

        let mut item = bag(json!({"visible": "true"}));
        registry.apply(&mut item);
        assert_eq!(Value::Object(item), json!({"visible": "TRUE"}));
    }
}
