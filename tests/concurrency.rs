//! Shared caches and the registration namespace under concurrent use

use std::sync::Arc;
use std::thread;

use interpol::{Error, Interpolator, RegistrationError, Scope, Value};
use pretty_assertions::assert_eq;

#[test]
fn test_repeated_template_is_parsed_once() {
    let engine = Interpolator::new();
    let scope = Scope::new().with("n", 2);
    for _ in 0..10 {
        assert_eq!(engine.interpolate("{n} * 2 = {n * 2}", &scope).unwrap(), "2 * 2 = 4");
    }
    let stats = engine.cache_stats();
    assert_eq!(stats.parses, 1);
    assert_eq!(stats.hits, 9);
    assert_eq!(stats.templates, 1);
}

#[test]
fn test_concurrent_renders_agree() {
    let engine = Arc::new(Interpolator::new());
    let templates = ["{i}: {i * i}", "[{i!r:>4}]", "{{{i}}}"];

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                let scope = Scope::new().with("i", i);
                templates
                    .iter()
                    .map(|t| engine.interpolate(t, &scope))
                    .collect::<Result<Vec<_>, Error>>()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let rendered = handle.join().unwrap().unwrap();
        assert_eq!(
            rendered,
            vec![
                format!("{}: {}", i, i * i),
                format!("[{:>4}]", i),
                format!("{{{}}}", i),
            ]
        );
    }

    let stats = engine.cache_stats();
    assert_eq!(stats.templates, templates.len());
    // racing misses may parse a template more than once
    assert!(stats.parses >= templates.len());
    assert_eq!(stats.hits + stats.parses, 8 * templates.len());
}

#[test]
fn test_concurrent_registration_of_distinct_names() {
    let engine = Arc::new(Interpolator::new());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || engine.register(format!("name{}", i), i))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }
    assert_eq!(engine.namespace().len(), 8);
    assert_eq!(
        engine.interpolate("{name3 + name4}", &Scope::new()).unwrap(),
        "7"
    );
}

#[test]
fn test_only_one_conflicting_registration_wins() {
    let engine = Arc::new(Interpolator::new());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || engine.register("owner", i))
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    for result in results.iter().filter(|r| r.is_err()) {
        assert_eq!(
            result,
            &Err(Error::Registration(RegistrationError::Conflict {
                name: "owner".to_string()
            }))
        );
    }
}

#[test]
fn test_register_many_conflict_applies_nothing() {
    let engine = Interpolator::new();
    engine.register("taken", 1).unwrap();
    let result = engine.register_many([("fresh", Value::Int(1)), ("taken", Value::Int(2))], false);
    assert!(matches!(
        result,
        Err(Error::Registration(RegistrationError::Conflict { .. }))
    ));
    assert_eq!(engine.namespace().get("fresh"), None);
    assert_eq!(engine.namespace().get("taken"), Some(Value::Int(1)));

    assert_eq!(
        engine.register_many([("fresh", Value::Int(1)), ("taken", Value::Int(2))], true),
        Ok(2)
    );
    assert_eq!(engine.interpolate("{fresh + taken}", &Scope::new()).unwrap(), "3");
}

#[test]
fn test_default_engine_free_functions() {
    interpol::register("concurrency_suite_greeting", "hello").unwrap();
    interpol::register_many([("concurrency_suite_target", "world")], false).unwrap();
    assert_eq!(
        interpol::interpolate(
            "{concurrency_suite_greeting}, {concurrency_suite_target}!",
            &Scope::new()
        )
        .unwrap(),
        "hello, world!"
    );
    assert!(interpol::engine()
        .namespace()
        .get("concurrency_suite_greeting")
        .is_some());
}
