//! Annotation codec.
//!
//! Pure functions turning recipes, port maps and var maps into the compact
//! text stored in host-document annotations, and back.
//!
//! ```text
//! dat-recipe  scatter;x=temp;y=pressure
//! dat-ports   x=3:value;y=4:value
//! dat-vars    x=12;y=13
//! ```
//!
//! There is no escaping. Template ids, parameter names and variable names
//! must not contain any of [`RESERVED`]; the catalog and the variable
//! registry enforce that before a name can reach the encoder.
//!
//! Every decoder comes in two flavours: `parse_*` returns the typed
//! [`DecodeError`], `decode_*` collapses it to `None` for callers that treat
//! an undecodable annotation as absent.

pub mod error;
pub mod maps;

pub use error::{DecodeError, DecodeResult};
pub use maps::{
    decode_port_map, decode_var_map, encode_port_map, encode_var_map, parse_port_map,
    parse_var_map,
};

use crate::catalog::TemplateLookup;
use crate::types::{Recipe, Variable};

/// Separates segments (template id and parameter assignments).
pub const SEGMENT_SEP: &str = ";";
/// Separates a parameter from its value.
pub const ASSIGN: &str = "=";
/// Separates list items inside a port/var map value.
pub const LIST_SEP: &str = ",";
/// Separates a module id from a port name.
pub const PORT_SEP: &str = ":";

/// Characters that may never appear in names written by the codec.
pub const RESERVED: [char; 4] = [';', '=', ',', ':'];

/// True if `name` contains none of the [`RESERVED`] separators.
pub fn is_reserved_free(name: &str) -> bool {
    !name.contains(RESERVED)
}

/// Encode a recipe as `template_id;param=varname;...` in binding order.
pub fn encode_recipe(recipe: &Recipe) -> String {
    let mut value = recipe.template_id().to_string();
    for (param, variable) in recipe.bindings() {
        value.push_str(SEGMENT_SEP);
        value.push_str(param);
        value.push_str(ASSIGN);
        value.push_str(variable);
    }
    value
}

/// Parse recipe text, resolving the template through `templates` and every
/// variable name through `lookup`.
pub fn parse_recipe<'a, T, F>(text: &str, templates: &T, mut lookup: F) -> DecodeResult<Recipe>
where
    T: TemplateLookup + ?Sized,
    F: FnMut(&str) -> Option<&'a Variable>,
{
    let mut segments = text.split(SEGMENT_SEP);
    let template_id = segments.next().unwrap_or_default();
    let template = templates
        .template(template_id)
        .ok_or_else(|| DecodeError::UnknownTemplate(template_id.to_string()))?;

    let mut recipe = Recipe::new(template);
    for segment in segments {
        let (param, varname) = segment
            .split_once(ASSIGN)
            .ok_or_else(|| DecodeError::MalformedSegment(segment.to_string()))?;
        if param.is_empty() {
            return Err(DecodeError::MalformedSegment(segment.to_string()));
        }
        let variable =
            lookup(varname).ok_or_else(|| DecodeError::UnknownVariable(varname.to_string()))?;
        if !recipe.bind_unchecked(param, variable.name()) {
            return Err(DecodeError::DuplicateParameter(param.to_string()));
        }
    }
    Ok(recipe)
}

/// Decode recipe text; unknown template, unresolved variable or any
/// malformed segment yields `None`.
pub fn decode_recipe<'a, T, F>(text: &str, templates: &T, lookup: F) -> Option<Recipe>
where
    T: TemplateLookup + ?Sized,
    F: FnMut(&str) -> Option<&'a Variable>,
{
    parse_recipe(text, templates, lookup).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{PlotTemplate, TemplateCatalog};
    use crate::id::Version;
    use crate::types::{PortMap, PortTarget, VarMap, VariableType};
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn catalog() -> TemplateCatalog {
        let mut catalog = TemplateCatalog::new();
        catalog
            .register(PlotTemplate::new("scatter", "Scatter", ["x", "y", "color"]))
            .unwrap();
        catalog
    }

    fn variables(names: &[&str]) -> HashMap<String, Variable> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| {
                (
                    n.to_string(),
                    Variable::new(*n, VariableType::new("basic:Float"), Version(i as u64)),
                )
            })
            .collect()
    }

    #[test]
    fn test_encode_recipe() {
        let catalog = catalog();
        let recipe = Recipe::new(catalog.get("scatter").unwrap())
            .bind("x", "var1")
            .unwrap()
            .bind("y", "var2")
            .unwrap();
        assert_eq!(encode_recipe(&recipe), "scatter;x=var1;y=var2");

        let empty = Recipe::new(catalog.get("scatter").unwrap());
        assert_eq!(encode_recipe(&empty), "scatter");
    }

    #[test]
    fn test_decode_recipe() {
        let catalog = catalog();
        let vars = variables(&["temp", "pressure"]);
        let mut asked = Vec::new();

        let recipe = decode_recipe("scatter;x=temp;y=pressure", &catalog, |name| {
            asked.push(name.to_string());
            vars.get(name)
        })
        .unwrap();

        assert_eq!(recipe.template_id(), "scatter");
        assert_eq!(recipe.variable_for("x"), Some("temp"));
        assert_eq!(recipe.variable_for("y"), Some("pressure"));
        assert_eq!(asked, vec!["temp", "pressure"]);
    }

    #[test]
    fn test_decode_recipe_failures() {
        let catalog = catalog();
        let vars = variables(&["temp"]);

        assert_eq!(
            parse_recipe("line;x=temp", &catalog, |n| vars.get(n)).unwrap_err(),
            DecodeError::UnknownTemplate("line".into())
        );
        assert_eq!(
            parse_recipe("scatter;x=temp;y=missing", &catalog, |n| vars.get(n)).unwrap_err(),
            DecodeError::UnknownVariable("missing".into())
        );
        assert_eq!(
            parse_recipe("scatter;xtemp", &catalog, |n| vars.get(n)).unwrap_err(),
            DecodeError::MalformedSegment("xtemp".into())
        );
        assert_eq!(
            parse_recipe("scatter;x=temp;x=temp", &catalog, |n| vars.get(n)).unwrap_err(),
            DecodeError::DuplicateParameter("x".into())
        );
        assert!(decode_recipe("", &catalog, |n| vars.get(n)).is_none());
    }

    #[test]
    fn test_decode_recipe_accepts_undeclared_parameter() {
        // Persisted data from an older template revision still loads
        let catalog = catalog();
        let vars = variables(&["temp"]);
        let recipe = decode_recipe("scatter;size=temp", &catalog, |n| vars.get(n)).unwrap();
        assert_eq!(recipe.variable_for("size"), Some("temp"));
    }

    #[test]
    fn test_reserved_characters() {
        assert!(is_reserved_free("pressure_2"));
        for bad in ["a;b", "a=b", "a,b", "a:b"] {
            assert!(!is_reserved_free(bad), "{bad} should be rejected");
        }
    }

    fn name() -> impl Strategy<Value = String> {
        "[A-Za-z_$@][A-Za-z0-9_$@]{0,8}"
    }

    proptest! {
        #[test]
        fn test_recipe_round_trip(
            bindings in prop::collection::vec((name(), name()), 0..6)
        ) {
            let mut catalog = TemplateCatalog::new();
            let params: Vec<String> = bindings.iter().map(|(p, _)| p.clone()).collect();
            let template = catalog
                .register(PlotTemplate::new("plot", "Plot", params))
                .unwrap();

            let mut recipe = Recipe::new(template);
            for (param, var) in &bindings {
                recipe = recipe.bind(param, var).unwrap();
            }
            let names: Vec<&str> = bindings.iter().map(|(_, v)| v.as_str()).collect();
            let vars = variables(&names);

            let text = encode_recipe(&recipe);
            let decoded = decode_recipe(&text, &catalog, |n| vars.get(n));
            prop_assert_eq!(decoded.as_ref(), Some(&recipe));
            // Stable order: re-encoding gives the same text
            prop_assert_eq!(decoded.map(|r| encode_recipe(&r)), Some(text));
        }

        #[test]
        fn test_port_map_round_trip(
            entries in prop::collection::btree_map(
                name(),
                prop::collection::vec((any::<i64>(), name()), 0..4),
                0..5,
            )
        ) {
            let pm: PortMap = entries
                .into_iter()
                .map(|(p, ports)| {
                    (p, ports.into_iter().map(|(m, n)| PortTarget::new(m, n)).collect())
                })
                .collect();
            prop_assert_eq!(decode_port_map(&encode_port_map(&pm)), Some(pm));
        }

        #[test]
        fn test_var_map_round_trip(
            entries in prop::collection::btree_map(
                name(),
                prop::collection::vec(any::<i64>(), 0..4),
                0..5,
            )
        ) {
            let vm: VarMap = entries.into_iter().collect();
            prop_assert_eq!(decode_var_map(&encode_var_map(&vm)), Some(vm));
        }
    }
}
