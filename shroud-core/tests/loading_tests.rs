//! 加载与缓存端到端测试

mod common;

use common::{fixture, fixture_with, loc, tag};
use serde_json::json;
use shroud_core::{Environment, LoadError, LoaderConfig, Request, ScriptExecutor, Unit};
use shroud_vfs::MemoryFileSystem;
use std::sync::Arc;
use std::thread;

#[test]
fn test_second_request_returns_cached_unit() {
    let fx = fixture(&[("/app/lib/status.src", "let state = \"up\"\nexport state")]);

    let first = fx.env.request(Request::new("./lib/status").directory("/app")).unwrap();
    let second = fx.env.request(Request::new("./lib/status").directory("/app")).unwrap();

    assert!(Unit::ptr_eq(&first, &second));
    assert_eq!(first.executions(), 1);
    assert_eq!(fx.executor.executed(), vec!["/app/lib/status.src"]);
    assert_eq!(first.exports(), json!("up"));
}

#[test]
fn test_exports_default_to_namespace() {
    let fx = fixture(&[("/m.src", "let a = 1\nlet b = [true, null]")]);

    assert_eq!(fx.env.require("/m").unwrap(), json!({ "a": 1, "b": [true, null] }));
}

#[test]
fn test_require_with_custom_exports() {
    let fx = fixture(&[("/m.src", "let name = \"m\"\nexport 3")]);

    let name = fx.env.require_with("/m", |unit| unit.get("name")).unwrap();
    assert_eq!(name, Some(json!("m")));
    let identity = fx.env.require_with("/m", |unit| unit.identity().clone()).unwrap();
    assert_eq!(identity, loc("/m.src"));
    assert_eq!(fx.executor.executed().len(), 1);
}

#[test]
fn test_nested_lookup() {
    let fx = fixture(&[
        ("/cfg.src", "export { \"db\": { \"hosts\": [\"a\", \"b\"] } }"),
        ("/main.src", "let cfg = require \"./cfg\"\nexport cfg.db.hosts.1"),
    ]);

    assert_eq!(fx.env.require("/main").unwrap(), json!("b"));
}

#[test]
fn test_failed_fresh_load_leaves_registry_unchanged() {
    let fx = fixture(&[
        ("/app/good.src", "export 1"),
        ("/app/bad.src", "let ok = require \"./good\"\nfail \"broken plugin\""),
    ]);

    let err = fx.env.request("/app/bad").unwrap_err();
    match &err {
        LoadError::Execution { location, message } => {
            assert_eq!(location.as_str(), "/app/bad.src");
            assert!(message.contains("broken plugin"));
        }
        other => panic!("expected Execution, got {:?}", other),
    }
    assert!(!fx.env.contains("/app/bad.src"));
    // 嵌套加载成功的单元保留
    assert!(fx.env.contains("/app/good.src"));
}

#[test]
fn test_compile_error() {
    let fx = fixture(&[("/bad.src", "let = nothing")]);

    let err = fx.env.request("/bad").unwrap_err();
    assert!(matches!(err, LoadError::Compile { .. }));
    assert!(fx.env.units().is_empty());
}

#[test]
fn test_nested_error_propagates_unchanged() {
    let fx = fixture(&[
        ("/main.src", "let dep = require \"./missing\""),
    ]);

    let err = fx.env.request("/main").unwrap_err();
    match err {
        LoadError::NotFound { request, searched, .. } => {
            assert_eq!(request, "./missing");
            assert_eq!(searched, vec![loc("/")]);
        }
        other => panic!("expected NotFound, got {:?}", other),
    }
}

#[test]
fn test_cyclic_load_fails_with_chain() {
    let fx = fixture(&[
        ("/app/a.src", "let b = require \"./b\"\nexport 1"),
        ("/app/b.src", "let a = require \"./a\"\nexport 2"),
    ]);

    let err = fx.env.request("/app/a").unwrap_err();
    match &err {
        LoadError::CyclicLoad { chain } => {
            let chain: Vec<&str> = chain.iter().map(|l| l.as_str()).collect();
            assert_eq!(chain, ["/app/a.src", "/app/b.src", "/app/a.src"]);
        }
        other => panic!("expected CyclicLoad, got {:?}", other),
    }
    // 两个单元都没有安装
    assert!(fx.env.units().is_empty());

    // 上下文栈已经清空：之后的请求不受影响
    fx.write("/app/b.src", "export 2");
    assert_eq!(fx.env.require("/app/a").unwrap(), json!(1));
}

#[test]
fn test_self_require_is_cyclic() {
    let fx = fixture(&[("/loop.src", "let me = require \"./loop\"")]);

    let err = fx.env.request("/loop").unwrap_err();
    assert!(matches!(err, LoadError::CyclicLoad { ref chain } if chain.len() == 2));
}

#[test]
fn test_dependency_edges_recorded() {
    let fx = fixture(&[
        ("/a.src", "export 1"),
        ("/b.src", "let a = require \"./a\""),
        ("/c.src", "let b = require \"./b\"\nlet a = require \"./a\""),
    ]);
    fx.env.request("/c").unwrap();

    assert_eq!(fx.env.dependents_of(&loc("/a.src")), vec![loc("/b.src"), loc("/c.src")]);
    assert_eq!(fx.env.dependencies_of(&loc("/c.src")), vec![loc("/a.src"), loc("/b.src")]);
}

#[test]
fn test_environments_are_isolated() {
    let fs = MemoryFileSystem::with_files([("/shared.src", "export 1")]);
    let one = Environment::new(Arc::new(fs.clone()), Arc::new(ScriptExecutor::new())).unwrap();
    let two = Environment::new(Arc::new(fs), Arc::new(ScriptExecutor::new())).unwrap();

    let a = one.request("/shared").unwrap();
    let b = two.request("/shared").unwrap();
    assert!(!Unit::ptr_eq(&a, &b));

    one.set_default_path(["/only/one"]);
    assert!(two.default_path().is_empty());
}

#[test]
fn test_concurrent_requests_execute_once() {
    let fx = fixture(&[("/slow.src", "let a = 1\nlet b = 2\nexport a")]);
    let env = fx.env.clone();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let env = env.clone();
            thread::spawn(move || env.request("/slow").unwrap())
        })
        .collect();
    let units: Vec<Unit> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert!(units.iter().all(|u| Unit::ptr_eq(u, &units[0])));
    assert_eq!(fx.executor.executed().len(), 1);
}

#[test]
fn test_artifact_written_and_reused() {
    let fx = fixture_with(&[("/app/m.src", "export 5")], LoaderConfig::default());

    fx.env.request("/app/m").unwrap();
    assert!(fx.exists(&format!("/app/m.src{}", tag())));
    assert_eq!(fx.executor.compiles(), 1);

    // 新环境：产物新鲜，不再编译
    let env = Environment::builder(Arc::new(fx.fs.clone()), fx.executor.clone())
        .build()
        .unwrap();
    assert_eq!(env.require("/app/m").unwrap(), json!(5));
    assert_eq!(fx.executor.compiles(), 1);
}

#[test]
fn test_stale_artifact_is_recompiled() {
    let fx = fixture_with(&[("/app/m.src", "export 5")], LoaderConfig::default());
    fx.env.request("/app/m").unwrap();

    fx.write("/app/m.src", "export 6");
    let env = Environment::builder(Arc::new(fx.fs.clone()), fx.executor.clone())
        .build()
        .unwrap();
    assert_eq!(env.require("/app/m").unwrap(), json!(6));
    assert_eq!(fx.executor.compiles(), 2);
}

#[test]
fn test_artifacts_ignored_when_disabled() {
    let fx = fixture_with(&[("/app/m.src", "export 5")], LoaderConfig::default());
    fx.env.request("/app/m").unwrap();

    let config = LoaderConfig {
        use_artifacts: false,
        ..LoaderConfig::default()
    };
    let env = Environment::builder(Arc::new(fx.fs.clone()), fx.executor.clone())
        .config(config)
        .build()
        .unwrap();
    env.request("/app/m").unwrap();
    assert_eq!(fx.executor.compiles(), 2);
}

#[test]
fn test_no_artifact_written_when_disabled() {
    let fx = fixture(&[("/app/m.src", "export 5")]);
    fx.env.request("/app/m").unwrap();
    assert_eq!(fx.fs.paths(), vec!["/app/m.src"]);
}

#[test]
fn test_relative_working_dir_rejected() {
    let config = LoaderConfig {
        working_dir: Some("relative/dir".to_string()),
        ..LoaderConfig::default()
    };
    let result = Environment::builder(
        Arc::new(MemoryFileSystem::new()),
        Arc::new(ScriptExecutor::new()),
    )
    .config(config)
    .build();
    assert!(matches!(result, Err(LoadError::Config(_))));
}

#[test]
fn test_native_file_system() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_string_lossy().to_string();
    std::fs::create_dir_all(dir.path().join("lib")).unwrap();
    std::fs::write(dir.path().join("main.src"), "export require \"./lib/util\"").unwrap();
    std::fs::write(dir.path().join("lib/util.src"), "export \"native\"").unwrap();

    let env = Environment::builder(
        Arc::new(shroud_vfs::NativeFileSystem::new()),
        Arc::new(ScriptExecutor::new()),
    )
    .working_dir(root)
    .build()
    .unwrap();

    assert_eq!(env.require("./main").unwrap(), json!("native"));
    let artifact = format!("util.src{}", tag());
    assert!(dir.path().join("lib").join(artifact).is_file());
}
