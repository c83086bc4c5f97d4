//! Test to verify test infrastructure works correctly

mod common;

use common::builders::{catalog, port_map, var_map, RecipeBuilder};
use recipe_store::{codec, PortTarget};

#[test]
fn test_infrastructure_setup() {
    let catalog = catalog();
    let recipe = RecipeBuilder::new(&catalog, "histogram")
        .bind("values", "temp")
        .build();

    assert_eq!(codec::encode_recipe(&recipe), "histogram;values=temp");
}

#[test]
fn test_map_builders() {
    let pm = port_map(&[("x", 3)]);
    assert_eq!(pm["x"], vec![PortTarget::new(3, "value")]);
    assert_eq!(codec::encode_var_map(&var_map(&[("x", 1), ("y", 2)])), "x=1;y=2");
}

#[test]
fn test_log_capture() {
    let (value, logs) = common::capture_logs(|| {
        tracing::warn!("captured");
        tracing::debug!("also captured");
        7
    });
    assert_eq!(value, 7);
    assert_eq!(common::warnings(&logs), vec![logs.lines().next().unwrap()]);
    assert!(logs.contains("also captured"));
}

#[test]
#[should_panic]
fn test_recipe_builder_rejects_unknown_parameter() {
    let catalog = catalog();
    RecipeBuilder::new(&catalog, "histogram").bind("z", "temp").build();
}
