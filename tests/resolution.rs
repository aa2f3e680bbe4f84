#![cfg(test)]

mod utils;

use bindgraph::{
    errors::DefectKind,
    graph::NodeClass,
    model::{BindingKind, RequestKind},
};
use utils::{component, compile, defects_of, element_of, key, resolved_binding, with_resolution};

const SHADOWING: &str = r#"{
    "modules": [
        {"name": "RootModule", "bindings": [
            {"element": "RootModule.greeting", "key": "String", "static": true}
        ]},
        {"name": "ChildModule", "bindings": [
            {"element": "ChildModule.greeting", "key": "String", "static": true}
        ]}
    ],
    "components": [
        {"name": "App", "modules": ["RootModule"],
         "entry_points": [{"element": "App.greeting", "request": "String"}],
         "factory_methods": [{"element": "App.child", "child": "Child"}]},
        {"name": "Child", "subcomponent": true, "modules": ["ChildModule"],
         "entry_points": [{"element": "Child.greeting", "request": "String"}]}
    ]
}"#;

#[test]
fn child_bindings_shadow_ancestor_bindings() {
    with_resolution(SHADOWING, false, |tree, resolution| {
        let app = component(tree, "App");
        let child = component(tree, "Child");

        let (owner, binding) = resolved_binding(resolution, app, "String");
        assert_eq!(owner, app);
        assert_eq!(element_of(binding), "RootModule.greeting");

        let (owner, binding) = resolved_binding(resolution, child, "String");
        assert_eq!(owner, child);
        assert_eq!(element_of(binding), "ChildModule.greeting");
    });

    let graph = compile(SHADOWING);
    assert!(graph.defects.is_empty(), "{:?}", graph.defects);
}

#[test]
fn children_reuse_what_ancestors_resolved() {
    let json = r#"{
        "components": [
            {"name": "App",
             "entry_points": [{"element": "App.service", "request": "Service"}],
             "factory_methods": [{"element": "App.child", "child": "Child"}]},
            {"name": "Child", "subcomponent": true,
             "entry_points": [{"element": "Child.service", "request": "Provider<Service>"}]}
        ],
        "injectables": [{"type": "Service"}]
    }"#;

    with_resolution(json, false, |tree, resolution| {
        let (owner, binding) = resolved_binding(resolution, component(tree, "Child"), "Service");
        assert_eq!(owner, component(tree, "App"));
        assert_eq!(binding.kind, BindingKind::Injection);
    });
}

#[test]
fn sibling_modules_binding_the_same_key_are_duplicates() {
    let json = r#"{
        "modules": [
            {"name": "A", "bindings": [{"element": "A.url", "key": "@Named(\"api\") String"}]},
            {"name": "B", "bindings": [{"element": "B.url", "key": "@Named(\"api\") String"}]}
        ],
        "components": [
            {"name": "App", "modules": ["A", "B"], "entry_points": [
                {"element": "App.url", "request": "@Named(\"api\") String"},
                {"element": "App.client", "request": "Client"}
            ]}
        ],
        "injectables": [{"type": "Client", "dependencies": ["@Named(\"api\") String"]}]
    }"#;

    let graph = compile(json);
    let duplicates = defects_of(&graph, DefectKind::Duplicate);
    assert_eq!(duplicates.len(), 1, "{:?}", graph.defects);

    let chain = &duplicates[0].chain;
    assert_eq!(
        duplicates[0].summary(),
        "@Named(\"api\") String is bound multiple times:"
    );
    assert!(chain.contains("A.url [App]"), "{}", chain);
    assert!(chain.contains("B.url [App]"), "{}", chain);
    assert!(graph.has_errors());

    // the duplicated key still resolves for everything that depends on it
    assert!(defects_of(&graph, DefectKind::Missing).is_empty(), "{:?}", graph.defects);
    assert!(graph.graph.nodes_by_class(NodeClass::Missing).is_empty());
    let client = graph
        .graph
        .nodes_by_class(NodeClass::Binding)
        .iter()
        .copied()
        .find(|id| graph.graph.node(*id).key() == Some(&key("Client")))
        .expect("Client should be bound");
    let targets = graph.graph.outgoing_dependencies(client);
    assert_eq!(targets.len(), 2, "one edge per duplicate binding");
    for (to, _) in targets {
        let node = graph.graph.node(to).as_binding().expect("a binding node");
        assert_eq!(node.binding.key, key("@Named(\"api\") String"));
    }
}

#[test]
fn unbound_keys_are_reported_where_they_are_requested() {
    let json = r#"{
        "components": [
            {"name": "App", "entry_points": [{"element": "App.service", "request": "Service"}]}
        ],
        "injectables": [{"type": "Service", "dependencies": ["Clock"]}]
    }"#;

    let graph = compile(json);
    let missing = defects_of(&graph, DefectKind::Missing);
    assert_eq!(missing.len(), 1, "{:?}", graph.defects);
    assert_eq!(
        missing[0].summary(),
        "Clock cannot be provided without an @Inject constructor or a binding declaration."
    );
    assert!(missing[0].chain.contains("Clock is requested by Service (@Inject Service) [App]"));
    assert_eq!(missing[0].keys, vec![key("Clock")]);
}

#[test]
fn missing_bindings_note_where_the_key_is_bound_instead() {
    let json = r#"{
        "modules": [
            {"name": "ClockModule", "bindings": [{"element": "ClockModule.clock", "key": "Clock", "static": true}]}
        ],
        "components": [
            {"name": "App",
             "factory_methods": [
                {"element": "App.a", "child": "A"},
                {"element": "App.b", "child": "B"}
             ]},
            {"name": "A", "subcomponent": true,
             "entry_points": [{"element": "A.clock", "request": "Clock"}]},
            {"name": "B", "subcomponent": true, "modules": ["ClockModule"]}
        ]
    }"#;

    let graph = compile(json);
    let missing = defects_of(&graph, DefectKind::Missing);
    assert_eq!(missing.len(), 1, "{:?}", graph.defects);
    assert!(
        missing[0]
            .chain
            .contains("Note: Clock is provided in App → B, which is not an ancestor of App → A"),
        "{}",
        missing[0].chain
    );
}

#[test]
fn optionals_are_absent_or_present_depending_on_the_wrapped_key() {
    let absent = r#"{
        "modules": [
            {"name": "M", "optionals": [{"element": "M.cache", "key": "Cache"}]}
        ],
        "components": [
            {"name": "App", "modules": ["M"],
             "entry_points": [{"element": "App.cache", "request": "Optional<Cache>"}]}
        ]
    }"#;
    with_resolution(absent, false, |tree, resolution| {
        let (_, binding) = resolved_binding(resolution, component(tree, "App"), "Optional<Cache>");
        assert_eq!(binding.kind, BindingKind::OptionalAbsent);
        assert!(binding.dependencies.is_empty());
    });
    assert!(compile(absent).defects.is_empty());

    let present = r#"{
        "modules": [
            {"name": "M", "optionals": [{"element": "M.cache", "key": "Cache"}]}
        ],
        "components": [
            {"name": "App", "modules": ["M"],
             "entry_points": [{"element": "App.cache", "request": "Optional<Provider<Cache>>"}]}
        ],
        "injectables": [{"type": "Cache"}]
    }"#;
    with_resolution(present, false, |tree, resolution| {
        let app = component(tree, "App");
        let (_, binding) = resolved_binding(resolution, app, "Optional<Provider<Cache>>");
        assert_eq!(binding.kind, BindingKind::OptionalPresent);
        assert_eq!(binding.dependencies.len(), 1);
        assert_eq!(binding.dependencies[0].key, key("Cache"));
        assert_eq!(binding.dependencies[0].kind, RequestKind::Provider);
        assert!(resolution.resolved(app, &key("Cache")).is_some());
    });
}

#[test]
fn optionals_without_a_declaration_are_missing() {
    let json = r#"{
        "components": [
            {"name": "App", "entry_points": [{"element": "App.cache", "request": "Optional<Cache>"}]}
        ],
        "injectables": [{"type": "Cache"}]
    }"#;

    let graph = compile(json);
    assert_eq!(defects_of(&graph, DefectKind::Missing).len(), 1, "{:?}", graph.defects);
}

#[test]
fn members_injection_resolves_injection_sites() {
    let json = r#"{
        "components": [
            {"name": "App", "entry_points": [
                {"element": "App.inject", "request": "injectMembers(Activity)"},
                {"element": "App.injectPlain", "request": "injectMembers(Plain)"}
            ]}
        ],
        "injectables": [{"type": "Service"}],
        "members_injections": [{"type": "Activity", "sites": ["Service", "Lazy<Logger>"]}]
    }"#;

    with_resolution(json, false, |tree, resolution| {
        let app = component(tree, "App");
        let activity = resolution.members_injection(app, &key("Activity")).unwrap();
        assert_eq!(activity.binding().unwrap().dependencies.len(), 2);
        assert!(resolution.resolved(app, &key("Activity")).is_none());
        assert!(resolution.resolved(app, &key("Service")).is_some());

        // types without injectable members inject nothing
        let plain = resolution.members_injection(app, &key("Plain")).unwrap();
        assert!(plain.binding().unwrap().dependencies.is_empty());
    });

    let graph = compile(json);
    let missing = defects_of(&graph, DefectKind::Missing);
    assert_eq!(missing.len(), 1, "{:?}", graph.defects);
    assert_eq!(missing[0].keys, vec![key("Logger")]);
}

const CREATORS: &str = r#"{
    "modules": [
        {"name": "AppModule", "subcomponents": ["Session"]}
    ],
    "components": [
        {"name": "App", "modules": ["AppModule"],
         "entry_points": [{"element": "App.sessions", "request": "Provider<Session.Builder>"}]},
        {"name": "Session", "subcomponent": true,
         "creator": {"type": "Session.Builder"},
         "entry_points": [{"element": "Session.user", "request": "User"}]}
    ],
    "injectables": [{"type": "User"}]
}"#;

#[test]
fn requesting_a_subcomponent_creator_resolves_the_child() {
    with_resolution(CREATORS, false, |tree, resolution| {
        let app = component(tree, "App");
        let session = component(tree, "Session");

        let (owner, binding) = resolved_binding(resolution, app, "Session.Builder");
        assert_eq!(owner, app);
        assert!(matches!(&binding.kind, BindingKind::SubcomponentCreator { child } if child.as_str() == "Session"));
        assert!(resolution.is_resolved(session));
        assert!(resolution.resolved(session, &key("User")).is_some());
    });

    let graph = compile(CREATORS);
    assert!(graph.defects.is_empty(), "{:?}", graph.defects);
}

#[test]
fn unrequested_module_children_are_left_unresolved() {
    let json = CREATORS.replace(
        r#""entry_points": [{"element": "App.sessions", "request": "Provider<Session.Builder>"}]"#,
        r#""entry_points": []"#,
    );

    with_resolution(&json, false, |tree, resolution| {
        assert!(!resolution.is_resolved(component(tree, "Session")));
    });
    with_resolution(&json, true, |tree, resolution| {
        let session = component(tree, "Session");
        assert!(resolution.is_resolved(session));
        assert!(resolution.resolved(session, &key("User")).is_some());
    });
}

#[test]
fn children_resolve_creators_of_their_own_subcomponents() {
    let json = r#"{
        "modules": [
            {"name": "ChildModule", "subcomponents": ["Grand"]}
        ],
        "components": [
            {"name": "App",
             "entry_points": [{"element": "App.grand", "request": "Grand.Builder"}],
             "factory_methods": [{"element": "App.child", "child": "Child"}]},
            {"name": "Child", "subcomponent": true, "modules": ["ChildModule"],
             "entry_points": [{"element": "Child.grand", "request": "Grand.Builder"}]},
            {"name": "Grand", "subcomponent": true,
             "creator": {"type": "Grand.Builder"},
             "entry_points": [{"element": "Grand.timer", "request": "Timer"}]}
        ],
        "injectables": [{"type": "Timer"}]
    }"#;

    with_resolution(json, false, |tree, resolution| {
        let app = component(tree, "App");
        let child = component(tree, "Child");
        let grand = component(tree, "Grand");

        let in_app = resolution.resolved(app, &key("Grand.Builder")).unwrap();
        assert_eq!(in_app.binding_count(), 0);

        let (owner, binding) = resolved_binding(resolution, child, "Grand.Builder");
        assert_eq!(owner, child);
        assert!(matches!(&binding.kind, BindingKind::SubcomponentCreator { child } if child.as_str() == "Grand"));
        assert!(resolution.is_resolved(grand));
        assert!(resolution.resolved(grand, &key("Timer")).is_some());
    });

    let graph = compile(json);
    let missing = defects_of(&graph, DefectKind::Missing);
    assert_eq!(missing.len(), 1, "{:?}", graph.defects);
    assert!(missing[0].chain.contains("App.grand"), "{}", missing[0].chain);
    assert!(!missing[0].chain.contains("Child.grand"), "{}", missing[0].chain);
}

#[test]
fn long_dependency_chains_resolve() {
    const DEPTH: usize = 20_000;
    let injectables = (0..DEPTH)
        .map(|i| format!(r#"{{"type": "Step{}", "dependencies": ["Step{}"]}}"#, i, i + 1))
        .chain(std::iter::once(format!(r#"{{"type": "Step{}"}}"#, DEPTH)))
        .collect::<Vec<_>>()
        .join(",\n");
    let json = format!(
        r#"{{
            "components": [
                {{"name": "App", "entry_points": [{{"element": "App.first", "request": "Step0"}}]}}
            ],
            "injectables": [{}]
        }}"#,
        injectables
    );

    let graph = compile(&json);
    assert!(graph.defects.is_empty(), "{:?}", graph.defects);
    assert_eq!(graph.graph.nodes_by_class(NodeClass::Binding).len(), DEPTH + 1);
}
