//! Property-based tests for typecasting and step ordering.

use std::sync::{Arc, Mutex};

use futures::executor::block_on;
use proptest::prelude::*;
use serde_json::{json, Value};
use switchyard_dispatch::{ParamType, RequestContext, Route, Step};

// ============================================================================
// Strategies
// ============================================================================

fn param_type() -> impl Strategy<Value = ParamType> {
    prop_oneof![
        Just(ParamType::String),
        Just(ParamType::Integer),
        Just(ParamType::Float),
        Just(ParamType::Boolean),
        Just(ParamType::Json),
    ]
}

fn raw_value() -> impl Strategy<Value = String> {
    prop_oneof![
        any::<i64>().prop_map(|n| n.to_string()),
        any::<bool>().prop_map(|b| b.to_string()),
        "[a-z0-9.]{0,8}",
        Just("{\"a\":1}".to_string()),
    ]
}

// ============================================================================
// Property tests
// ============================================================================

proptest! {
    /// Casting a cast value again never changes it.
    #[test]
    fn recast_is_stable(kind in param_type(), raw in raw_value()) {
        if let Ok(once) = kind.cast(&Value::String(raw)) {
            if kind == ParamType::Json && once.is_string() {
                return Ok(());
            }
            prop_assert_eq!(kind.cast(&once), Ok(once.clone()));
        }
    }

    /// Integer text casts to the number it spells.
    #[test]
    fn integer_text_casts_exactly(n in any::<i64>()) {
        prop_assert_eq!(ParamType::Integer.cast(&json!(n.to_string())), Ok(json!(n)));
    }

    /// Middleware always runs in registration order, each step once.
    #[test]
    fn middleware_runs_in_registration_order(count in 0usize..12) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let route = (0..count).fold(Route::define("r", "/r").unwrap(), |route, i| {
            let log = log.clone();
            route.use_step(Step::sync(move |_| {
                log.lock().unwrap().push(i);
                Ok(())
            }))
        });

        let mut calls = 0;
        let mut ctx = RequestContext::new("/r");
        block_on(route.handle(&mut ctx, |_| calls += 1)).unwrap();

        prop_assert_eq!(calls, 1);
        prop_assert_eq!(log.lock().unwrap().clone(), (0..count).collect::<Vec<_>>());
    }

    /// Cancelling at step `k` runs exactly the first `k + 1` steps.
    #[test]
    fn cancel_stops_after_current_step(count in 1usize..10, at in 0usize..10) {
        let at = at % count;
        let log = Arc::new(Mutex::new(Vec::new()));
        let route = (0..count).fold(Route::define("r", "/r").unwrap(), |route, i| {
            let log = log.clone();
            route.use_step(Step::sync(move |ctx| {
                log.lock().unwrap().push(i);
                if i == at {
                    ctx.cancel();
                }
                Ok(())
            }))
        });

        let mut reported = None;
        let mut ctx = RequestContext::new("/r");
        block_on(route.handle(&mut ctx, |err| reported = err)).unwrap();

        prop_assert!(reported.map_or(false, |e| e.is_cancelled()));
        prop_assert_eq!(log.lock().unwrap().len(), at + 1);
    }
}
