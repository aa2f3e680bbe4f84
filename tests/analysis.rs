#![cfg(test)]

mod utils;

use bindgraph::{
    driver::Options,
    errors::{DefectKind, Severity},
};
use utils::{compile, compile_with, defects_of};

const PRODUCED: &str = r#"{
    "modules": [
        {"name": "Fetch", "bindings": [
            {"element": "Fetch.page", "key": "Page", "kind": "production", "static": true}
        ], "delegates": [
            {"element": "Fetch.document", "key": "Document", "delegate": "Page"}
        ]}
    ],
    "components": [
        {"name": "App", "modules": ["Fetch"], "entry_points": [
            {"element": "App.future", "request": "ListenableFuture<Page>"},
            {"element": "App.renderer", "request": "Renderer"}
        ]}
    ],
    "injectables": [{"type": "Renderer", "dependencies": ["Document"]}]
}"#;

#[test]
fn provisions_may_not_depend_on_productions() {
    let graph = compile(PRODUCED);
    let defects = defects_of(&graph, DefectKind::ProvisionDependsOnProduction);
    assert_eq!(defects.len(), 1, "{:?}", graph.defects);
    assert_eq!(
        defects[0].summary(),
        "Renderer (@Inject Renderer) in App is a provision, which cannot depend on a production."
    );
}

const EXECUTORS: &str = r#"{
    "modules": [
        {"name": "Executors", "bindings": [
            {"element": "Executors.executor", "key": "@Production Executor", "static": true},
            {"element": "Executors.implementation", "key": "@ProductionImplementation Executor",
             "dependencies": ["@Production Executor"], "static": true}
        ]}
    ],
    "components": [
        {"name": "Crawler", "production": true, "modules": ["Executors"], "entry_points": [
            {"element": "Crawler.implementation", "request": "@ProductionImplementation Executor"},
            {"element": "Crawler.scheduler", "request": "Scheduler"}
        ]}
    ],
    "injectables": [{"type": "Scheduler", "dependencies": ["@Production Executor", "@Production Provider<Executor>"]}]
}"#;

#[test]
fn only_the_implementation_executor_depends_on_the_production_executor() {
    let graph = compile(EXECUTORS);
    let defects = defects_of(&graph, DefectKind::DependsOnProductionExecutor);
    assert_eq!(graph.defects.len(), 1, "{:?}", graph.defects);
    assert_eq!(defects.len(), 1);
    assert_eq!(
        defects[0].summary(),
        "Scheduler may not depend on the production executor"
    );
    assert!(defects[0].chain.contains("Scheduler (@Inject Scheduler) in Crawler"));

    // graphs without producers never run on the production executor
    let provisions = EXECUTORS.replace(r#""production": true, "#, "");
    let graph = compile(&provisions);
    assert!(graph.defects.is_empty(), "{:?}", graph.defects);

    let options = Options {
        skip: vec![String::from("production-executor")],
        ..Default::default()
    };
    assert!(compile_with(EXECUTORS, options).defects.is_empty());
}

#[test]
fn nullable_bindings_need_nullable_requests() {
    let json = r#"{
        "modules": [
            {"name": "Names", "bindings": [
                {"element": "Names.nickname", "key": "@Nickname String", "nullable": true, "static": true}
            ]}
        ],
        "components": [
            {"name": "App", "modules": ["Names"], "entry_points": [
                {"element": "App.greeter", "request": "Greeter"},
                {"element": "App.nickname", "request": {"request": "@Nickname String", "nullable": true}},
                {"element": "App.lazyNickname", "request": "@Nickname Provider<String>"}
            ]}
        ],
        "injectables": [{"type": "Greeter", "dependencies": ["@Nickname String"]}]
    }"#;

    let graph = compile(json);
    let mismatches = defects_of(&graph, DefectKind::NullableMismatch);
    assert_eq!(mismatches.len(), 1, "{:?}", graph.defects);
    assert_eq!(
        mismatches[0].summary(),
        "@Nickname String is not nullable, but is being provided by Names.nickname"
    );
    assert!(graph.has_errors());

    let options = Options {
        nullable_validation: Severity::Warning,
        ..Default::default()
    };
    let graph = compile_with(json, options);
    let mismatches = defects_of(&graph, DefectKind::NullableMismatch);
    assert_eq!(mismatches.len(), 1);
    assert_eq!(mismatches[0].severity, Severity::Warning);
    assert!(!graph.has_errors());
}

#[test]
fn assisted_types_are_only_requested_through_their_factory() {
    let json = r#"{
        "components": [
            {"name": "App", "entry_points": [
                {"element": "App.factory", "request": "WidgetFactory"},
                {"element": "App.widget", "request": "Widget"}
            ]}
        ],
        "injectables": [{"type": "Widget", "assisted": true}],
        "assisted_factories": [{"type": "WidgetFactory", "target": "Widget"}]
    }"#;

    let graph = compile(json);
    let defects = defects_of(&graph, DefectKind::AssistedInjectionRequest);
    assert_eq!(defects.len(), 1, "{:?}", graph.defects);
    assert!(defects[0].chain.contains("Widget is requested at App.widget (entry point of App)"));
}

fn session(parameters: &str) -> String {
    format!(
        r#"{{
            "modules": [
                {{"name": "SessionModule", "instantiable": false, "bindings": [
                    {{"element": "SessionModule.token", "key": "Token"}}
                ]}}
            ],
            "components": [
                {{"name": "App",
                 "factory_methods": [{{"element": "App.session", "child": "Session", "parameters": {}}}]}},
                {{"name": "Session", "subcomponent": true, "modules": ["SessionModule"],
                 "entry_points": [{{"element": "Session.token", "request": "Token"}}]}}
            ]
        }}"#,
        parameters
    )
}

#[test]
fn factory_methods_must_pass_modules_that_cannot_be_constructed() {
    let graph = compile(&session("[]"));
    let defects = defects_of(&graph, DefectKind::MissingFactoryMethodModule);
    assert_eq!(defects.len(), 1, "{:?}", graph.defects);
    assert_eq!(
        defects[0].chain,
        "App → Session requires SessionModule, which cannot be constructed, but it is not a parameter of App.session"
    );

    let graph = compile(&session(r#"["SessionModule"]"#));
    assert!(graph.defects.is_empty(), "{:?}", graph.defects);
}

#[test]
fn full_binding_graphs_resolve_unrequested_declarations_without_missing_reports() {
    let json = r#"{
        "modules": [
            {"name": "M", "bindings": [
                {"element": "M.service", "key": "Service", "dependencies": ["Clock"], "static": true}
            ]}
        ],
        "components": [{"name": "App", "modules": ["M"]}]
    }"#;

    let graph = compile(json);
    assert!(graph.defects.is_empty());
    assert_eq!(graph.graph.node_count(), 1);

    let options = Options {
        full_binding_graph: true,
        ..Default::default()
    };
    let graph = compile_with(json, options);
    assert!(graph.defects.is_empty(), "{:?}", graph.defects);
    assert!(graph.graph.is_full_binding_graph());
    assert_eq!(graph.graph.node_count(), 3);
}
