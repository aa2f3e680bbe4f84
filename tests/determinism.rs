#![cfg(test)]

mod utils;

use bindgraph::driver;
use utils::declarations;

const MANIFEST: &str = r#"{
    "modules": [
        {"name": "AppModule", "bindings": [
            {"element": "AppModule.config", "key": "Config", "static": true},
            {"element": "AppModule.core", "key": "Set<Plugin>", "contribution": "set_element", "static": true},
            {"element": "AppModule.url", "key": "Url"}
        ]},
        {"name": "OtherModule", "bindings": [
            {"element": "OtherModule.url", "key": "Url"}
        ]},
        {"name": "SessionModule", "bindings": [
            {"element": "SessionModule.audit", "key": "Set<Plugin>", "contribution": "set_element", "static": true}
        ]}
    ],
    "components": [
        {"name": "App", "modules": ["AppModule", "OtherModule"], "scopes": ["Singleton"],
         "entry_points": [
            {"element": "App.plugins", "request": "Set<Plugin>"},
            {"element": "App.url", "request": "Url"},
            {"element": "App.a", "request": "A"}
         ],
         "factory_methods": [{"element": "App.session", "child": "Session"}]},
        {"name": "Session", "subcomponent": true, "modules": ["SessionModule"],
         "entry_points": [
            {"element": "Session.plugins", "request": "Set<Plugin>"},
            {"element": "Session.service", "request": "Service"}
         ]}
    ],
    "injectables": [
        {"type": "Service", "scope": "Singleton", "dependencies": ["Config", "Clock"]},
        {"type": "A", "dependencies": ["B"]},
        {"type": "B", "dependencies": ["A"]}
    ]
}"#;

#[test]
fn declaration_order_does_not_change_the_result() {
    let decls = declarations(MANIFEST);
    let mut shuffled = decls.clone();
    shuffled.modules.reverse();
    for m in shuffled.modules.iter_mut() {
        m.bindings.reverse();
    }
    shuffled.components.reverse();
    for c in shuffled.components.iter_mut() {
        c.entry_points.reverse();
    }
    shuffled.injectables.reverse();

    let expected = driver::compile(&decls).unwrap();
    let actual = driver::compile(&shuffled).unwrap();
    assert_eq!(expected.len(), actual.len());
    for (e, a) in expected.iter().zip(actual.iter()) {
        assert_eq!(e.graph.fingerprint(), a.graph.fingerprint());
        assert_eq!(e.graph.node_count(), a.graph.node_count());
        assert_eq!(e.graph.edge_count(), a.graph.edge_count());
        assert_eq!(e.defects, a.defects);
    }

    // a duplicate, a missing key and a cycle, each reported once
    let kinds = expected[0]
        .defects
        .iter()
        .map(|d| d.kind.to_string())
        .collect::<Vec<_>>();
    assert_eq!(kinds, vec!["duplicate binding", "missing binding", "dependency cycle"]);
}

#[test]
fn repeated_runs_are_identical() {
    let decls = declarations(MANIFEST);
    let first = driver::compile(&decls).unwrap();
    for _ in 0..5 {
        let again = driver::compile(&decls).unwrap();
        assert_eq!(first[0].graph.fingerprint(), again[0].graph.fingerprint());
        assert_eq!(first[0].defects, again[0].defects);
    }
}
