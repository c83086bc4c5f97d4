//! Test data builders for creating test objects

use recipe_store::host::{HostDocument, MemoryDocument, MemoryHost};
use recipe_store::{
    DocumentId, DocumentRegistry, PlotTemplate, PortMap, PortTarget, Recipe, StoreConfig,
    TemplateCatalog, VarMap, Version,
};
use std::sync::Arc;

/// Catalog with `scatter(x, y)` and `histogram(values)`
pub fn catalog() -> TemplateCatalog {
    let mut catalog = TemplateCatalog::new();
    catalog
        .register(PlotTemplate::new("scatter", "Scatter plot", ["x", "y"]))
        .unwrap();
    catalog
        .register(PlotTemplate::new("histogram", "Histogram", ["values"]))
        .unwrap();
    catalog
}

/// A registry over `host` with the default config
pub fn registry(host: &MemoryHost) -> DocumentRegistry {
    DocumentRegistry::new(Box::new(host.clone()), catalog(), StoreConfig::default())
}

/// Builder for recipes over a catalog template
pub struct RecipeBuilder {
    template: Arc<PlotTemplate>,
    bindings: Vec<(String, String)>,
}

impl RecipeBuilder {
    pub fn new(catalog: &TemplateCatalog, template: &str) -> Self {
        Self {
            template: catalog.get(template).expect("template registered"),
            bindings: Vec::new(),
        }
    }

    pub fn bind(mut self, parameter: &str, variable: &str) -> Self {
        self.bindings
            .push((parameter.to_string(), variable.to_string()));
        self
    }

    pub fn build(self) -> Recipe {
        self.bindings
            .iter()
            .try_fold(Recipe::new(self.template.clone()), |r, (p, v)| r.bind(p, v))
            .expect("valid bindings")
    }
}

/// Port map wiring each parameter to `<module>:value`
pub fn port_map(entries: &[(&str, i64)]) -> PortMap {
    entries
        .iter()
        .map(|(param, module)| (param.to_string(), vec![PortTarget::new(*module, "value")]))
        .collect()
}

/// Var map with one connection per parameter
pub fn var_map(entries: &[(&str, i64)]) -> VarMap {
    entries
        .iter()
        .map(|(param, conn)| (param.to_string(), vec![*conn]))
        .collect()
}

/// Builder for host documents with pre-existing annotations and variables
pub struct DocumentBuilder {
    doc: MemoryDocument,
}

impl DocumentBuilder {
    pub fn new(id: u64, name: &str) -> Self {
        Self {
            doc: MemoryDocument::new(DocumentId(id), name),
        }
    }

    /// A variable persisted the way the store persists it
    pub fn variable(mut self, name: &str) -> Self {
        let version = self.doc.add_variable_version(super::float());
        self.doc.set_tag(version, &format!("dat-var-{}", name));
        self
    }

    pub fn annotation(mut self, version: u64, key: &str, value: &str) -> Self {
        self.doc.set_annotation(Version(version), key, value);
        self
    }

    pub fn build(self) -> MemoryDocument {
        self.doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipe_builder() {
        let catalog = catalog();
        let recipe = RecipeBuilder::new(&catalog, "scatter")
            .bind("x", "temp")
            .bind("y", "pressure")
            .build();
        assert_eq!(recipe.template_id(), "scatter");
        assert_eq!(recipe.variable_for("y"), Some("pressure"));
    }

    #[test]
    fn test_document_builder() {
        let doc = DocumentBuilder::new(1, "doc")
            .variable("temp")
            .annotation(3, "dat-recipe", "histogram;values=temp")
            .build();
        assert_eq!(doc.tags().len(), 1);
        assert_eq!(doc.annotation_count(), 1);
    }
}
