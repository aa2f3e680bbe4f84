#![cfg(test)]

use bindgraph::{
    descriptor::{ComponentId, ComponentTree, Declarations, DescriptorBuilder},
    driver::{CompiledGraph, Driver, Options},
    errors::{Defect, DefectKind},
    index::DeclarationIndex,
    model::{Binding, Key},
    resolve::{InjectRegistry, Resolution, Resolver},
};

#[allow(dead_code)]
pub fn enable_debug_logs() {
    fern::Dispatch::new()
        .level(log::LevelFilter::Debug)
        .chain(std::io::stderr())
        .apply()
        .unwrap();
}

pub fn declarations(json: &str) -> Declarations {
    serde_json::from_str(json).expect("manifest should parse")
}

/// Compiles `json` with default options and returns the graph of its only
/// root component.
#[allow(dead_code)]
pub fn compile(json: &str) -> CompiledGraph {
    compile_with(json, Options::default())
}

#[allow(dead_code)]
pub fn compile_with(json: &str, options: Options) -> CompiledGraph {
    let decls = declarations(json);
    let mut graphs = Driver::new(options)
        .compile(&decls)
        .unwrap_or_else(|errs| panic!("compile failed: {:?}", errs));
    assert_eq!(graphs.len(), 1, "expected a single root component");
    graphs.remove(0)
}

#[allow(dead_code)]
pub fn defects_of(graph: &CompiledGraph, kind: DefectKind) -> Vec<&Defect> {
    graph.defects.iter().filter(|d| d.kind == kind).collect()
}

/// Resolves the first root of `json` and hands the tree and resolution to
/// `f`.
#[allow(dead_code)]
pub fn with_resolution<F>(json: &str, full_binding_graph: bool, f: F)
where
    F: FnOnce(&ComponentTree, &Resolution),
{
    let decls = declarations(json);
    let desc = DescriptorBuilder::new(&decls)
        .build()
        .unwrap_or_else(|errs| panic!("invalid declarations: {:?}", errs));
    let tree = &desc.trees[0];
    let index = DeclarationIndex::new(tree, &desc.modules);
    let registry = InjectRegistry::new(&decls);
    let resolution = Resolver::new(tree, &index, &registry)
        .full_binding_graph(full_binding_graph)
        .run();
    f(tree, &resolution)
}

#[allow(dead_code)]
pub fn component(tree: &ComponentTree, name: &str) -> ComponentId {
    tree.iter()
        .find(|c| c.name.as_str() == name)
        .map(|c| c.id)
        .unwrap_or_else(|| panic!("no component named {}", name))
}

#[allow(dead_code)]
pub fn key(src: &str) -> Key {
    Key::parse(src).unwrap()
}

/// The single binding `key` resolves to in `component`, with its owner.
#[allow(dead_code)]
pub fn resolved_binding<'r>(
    resolution: &'r Resolution,
    component: ComponentId,
    src: &str,
) -> (ComponentId, &'r Binding) {
    let rb = resolution
        .resolved(component, &key(src))
        .unwrap_or_else(|| panic!("{} was not resolved in {}", src, component));
    let bindings = rb.bindings().collect::<Vec<_>>();
    assert_eq!(bindings.len(), 1, "expected one binding for {}, got {:?}", src, bindings);
    bindings[0]
}

#[allow(dead_code)]
pub fn element_of(binding: &Binding) -> &str {
    binding.element.as_ref().map_or("", |e| e.as_str())
}
