//! The bundled demo catalog parses and answers lookups

use designer_catalog::{CatalogIndex, CatalogSettings, Lookup, StaticCatalog};
use std::path::PathBuf;
use std::sync::Arc;

fn demo_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../demos/kubernetes-catalog.yaml")
}

#[tokio::test]
async fn demo_catalog_loads() {
    let catalog = StaticCatalog::load(demo_path()).await.unwrap();
    let index = CatalogIndex::new(Arc::new(catalog), CatalogSettings::default());

    let categories: Vec<_> = index
        .categories()
        .await
        .unwrap()
        .iter()
        .map(|c| c.name.clone())
        .collect();
    assert_eq!(categories, vec!["Kubernetes", "Istio"]);

    let models = index.models("Kubernetes").await.unwrap();
    assert_eq!(models[1].display_name, "Service (ClusterIP)");

    let components = index.components("Deployment").await.unwrap();
    assert!(components[0].metadata.has_display_metadata());
    assert!(components[1].has_invalid_schema());
    assert!(matches!(index.components_state("Deployment"), Lookup::Ready(_)));
}
