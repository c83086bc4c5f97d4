//! Benchmarks for the annotation codec and index loading
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use recipe_store::host::{HostDocument, MemoryDocument, MemorySource};
use recipe_store::{
    codec, DocumentId, PipelineIndex, PlotTemplate, PortMap, PortTarget, Recipe, StoreConfig,
    TemplateCatalog, VarMap, VariableRegistry, VariableType, Version,
};
use std::sync::Arc;

fn template(params: usize) -> Arc<PlotTemplate> {
    let names: Vec<String> = (0..params).map(|i| format!("p{}", i)).collect();
    Arc::new(PlotTemplate::new("bench", "Benchmark plot", names))
}

fn recipe(template: &Arc<PlotTemplate>) -> Recipe {
    template
        .parameters()
        .iter()
        .enumerate()
        .try_fold(Recipe::new(template.clone()), |r, (i, p)| {
            r.bind(p, &format!("var{}", i))
        })
        .unwrap()
}

fn port_map(params: usize) -> PortMap {
    (0..params)
        .map(|i| {
            (
                format!("p{}", i),
                vec![PortTarget::new(i as i64, "value"), PortTarget::new(i as i64 + 1, "in")],
            )
        })
        .collect()
}

fn bench_recipe_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("recipe_codec");

    for params in [2, 8, 32].iter() {
        let template = template(*params);
        let recipe = recipe(&template);
        let text = codec::encode_recipe(&recipe);
        let mut catalog = TemplateCatalog::new();
        catalog
            .register(PlotTemplate::new("bench", "Benchmark plot", template.parameters().to_vec()))
            .unwrap();
        let mut doc = MemoryDocument::new(DocumentId(1), "bench");
        let mut variables = VariableRegistry::new("dat-var-");
        for i in 0..*params {
            let source =
                MemorySource::at_version(Version(i as u64 + 1), VariableType::new("basic:Float"));
            variables
                .register(&format!("var{}", i), &source, &mut doc)
                .unwrap();
        }

        group.throughput(Throughput::Elements(*params as u64));
        group.bench_with_input(BenchmarkId::new("encode", params), &recipe, |b, recipe| {
            b.iter(|| black_box(codec::encode_recipe(recipe)));
        });
        group.bench_with_input(BenchmarkId::new("decode", params), &text, |b, text| {
            b.iter(|| black_box(codec::decode_recipe(text, &catalog, |n| variables.get(n))));
        });
    }

    group.finish();
}

fn bench_map_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("map_codec");

    for params in [2, 8, 32].iter() {
        let pm = port_map(*params);
        let pm_text = codec::encode_port_map(&pm);
        let vm: VarMap = (0..*params)
            .map(|i| (format!("p{}", i), vec![i as i64, i as i64 + 100]))
            .collect();
        let vm_text = codec::encode_var_map(&vm);

        group.throughput(Throughput::Elements(*params as u64));
        group.bench_with_input(BenchmarkId::new("decode_ports", params), &pm_text, |b, t| {
            b.iter(|| black_box(codec::decode_port_map(t)));
        });
        group.bench_with_input(BenchmarkId::new("decode_vars", params), &vm_text, |b, t| {
            b.iter(|| black_box(codec::decode_var_map(t)));
        });
    }

    group.finish();
}

fn bench_index_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_load");
    let config = StoreConfig::default();

    for records in [100, 1000].iter() {
        let template = template(2);
        let mut catalog = TemplateCatalog::new();
        catalog
            .register(PlotTemplate::new("bench", "Benchmark plot", ["p0", "p1"]))
            .unwrap();
        let mut doc = MemoryDocument::new(DocumentId(1), "bench");
        let mut variables = VariableRegistry::new("dat-var-");
        for name in ["var0", "var1"] {
            let source = MemorySource::at_version(doc.add_version(), VariableType::new("basic:Float"));
            variables.register(name, &source, &mut doc).unwrap();
        }
        let text = codec::encode_recipe(&recipe(&template));
        let ports = codec::encode_port_map(&port_map(2));
        for _ in 0..*records {
            let v = doc.add_version();
            doc.set_annotation(v, "dat-recipe", &text);
            doc.set_annotation(v, "dat-ports", &ports);
            doc.set_annotation(v, "dat-vars", "p0=1;p1=2");
        }

        group.throughput(Throughput::Elements(*records as u64));
        group.bench_with_input(BenchmarkId::new("load", records), &doc, |b, doc| {
            b.iter(|| {
                let mut doc = doc.clone();
                black_box(PipelineIndex::load(&mut doc, &variables, &catalog, &config))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_recipe_codec, bench_map_codec, bench_index_load);
criterion_main!(benches);
