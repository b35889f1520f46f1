//! Tests for the provider router

use super::{ProviderRouter, REASONER_CAPABILITY};
use crate::config::{LimiterConfig, RouteStrategy, RouterConfig, RoutingWeights};
use crate::core::limiter::AdmissionController;
use crate::core::store::CoordinationStore;
use crate::core::testing::UnreachableStore;
use crate::core::types::{Provider, UpstreamEndpoint};
use crate::storage::memory::MemoryStore;
use std::sync::Arc;
use std::time::Duration;

fn router_with(config: RouterConfig, store: Arc<dyn CoordinationStore>) -> ProviderRouter {
    let dashscope = Arc::new(
        AdmissionController::new(
            LimiterConfig::new(UpstreamEndpoint::DashscopeDeepseek, 1000, 100),
            store.clone(),
        )
        .unwrap(),
    );
    let volcengine = Arc::new(
        AdmissionController::new(
            LimiterConfig::new(UpstreamEndpoint::VolcengineDeepseek, 1000, 100),
            store.clone(),
        )
        .unwrap(),
    );
    ProviderRouter::new(config, store, dashscope, volcengine)
}

fn strategy_config(strategy: RouteStrategy) -> RouterConfig {
    RouterConfig {
        strategy,
        rate_limit_aware: false,
        ..RouterConfig::default()
    }
}

#[tokio::test]
async fn test_round_robin_alternates() {
    let store = Arc::new(MemoryStore::new());
    let router = router_with(strategy_config(RouteStrategy::RoundRobin), store);

    let first = router.select_provider().await;
    for _ in 0..10 {
        let second = router.select_provider().await;
        assert_eq!(second, first.other());
        let third = router.select_provider().await;
        assert_eq!(third, first);
    }
}

#[tokio::test]
async fn test_round_robin_fair_across_router_instances() {
    // Two routers sharing one store stand in for two worker processes.
    let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
    let a = router_with(strategy_config(RouteStrategy::RoundRobin), store.clone());
    let b = router_with(strategy_config(RouteStrategy::RoundRobin), store);

    let mut dashscope = 0i64;
    let mut volcengine = 0i64;
    for i in 0..101 {
        let router = if i % 3 == 0 { &a } else { &b };
        match router.select_provider().await {
            Provider::Dashscope => dashscope += 1,
            Provider::Volcengine => volcengine += 1,
        }
    }
    assert!(
        (dashscope - volcengine).abs() <= 1,
        "dashscope={dashscope} volcengine={volcengine}"
    );
}

#[tokio::test]
async fn test_round_robin_survives_store_outage() {
    let router = router_with(
        strategy_config(RouteStrategy::RoundRobin),
        Arc::new(UnreachableStore),
    );

    // The process-local fallback still alternates within this process.
    let first = router.select_provider().await;
    let second = router.select_provider().await;
    assert_eq!(second, first.other());
}

#[tokio::test]
async fn test_weighted_split_converges() {
    let store = Arc::new(MemoryStore::new());
    let config = RouterConfig {
        strategy: RouteStrategy::Weighted,
        weights: RoutingWeights {
            dashscope: 70,
            volcengine: 30,
        },
        rate_limit_aware: false,
        ..RouterConfig::default()
    };
    let router = router_with(config, store);

    let mut dashscope = 0u32;
    for _ in 0..10_000 {
        if router.select_provider().await == Provider::Dashscope {
            dashscope += 1;
        }
    }
    let share = dashscope as f64 / 10_000.0;
    assert!(
        (share - 0.70).abs() < 0.03,
        "dashscope share {share} outside 70% +/- 3pp"
    );
}

#[tokio::test]
async fn test_random_hits_both_providers() {
    let store = Arc::new(MemoryStore::new());
    let router = router_with(strategy_config(RouteStrategy::Random), store);

    let mut dashscope = 0u32;
    for _ in 0..1_000 {
        if router.select_provider().await == Provider::Dashscope {
            dashscope += 1;
        }
    }
    assert!(dashscope > 0 && dashscope < 1_000);
}

#[tokio::test]
async fn test_disabled_routing_pins_primary() {
    let store = Arc::new(MemoryStore::new());
    let config = RouterConfig {
        enabled: false,
        ..strategy_config(RouteStrategy::Random)
    };
    let router = router_with(config, store);

    for _ in 0..20 {
        assert_eq!(router.select_provider().await, Provider::Dashscope);
    }
}

#[tokio::test]
async fn test_capacity_bias_prefers_free_provider() {
    let store = Arc::new(MemoryStore::new());
    let dashscope = Arc::new(
        AdmissionController::new(
            LimiterConfig::new(UpstreamEndpoint::DashscopeDeepseek, 1000, 1),
            store.clone(),
        )
        .unwrap(),
    );
    let volcengine = Arc::new(
        AdmissionController::new(
            LimiterConfig::new(UpstreamEndpoint::VolcengineDeepseek, 1000, 100),
            store.clone(),
        )
        .unwrap(),
    );
    let router = ProviderRouter::new(
        RouterConfig {
            strategy: RouteStrategy::Random,
            ..RouterConfig::default()
        },
        store,
        dashscope.clone(),
        volcengine,
    );

    // Saturate dashscope's single slot; every selection must now avoid it.
    dashscope.acquire().await.unwrap();
    for _ in 0..20 {
        assert_eq!(router.select_provider().await, Provider::Volcengine);
    }

    // Capacity back on both sides: the bias disappears.
    dashscope.release().await.unwrap();
    let mut seen_dashscope = false;
    for _ in 0..100 {
        if router.select_provider().await == Provider::Dashscope {
            seen_dashscope = true;
            break;
        }
    }
    assert!(seen_dashscope);
}

#[tokio::test]
async fn test_health_bias_avoids_unhealthy_provider() {
    let store = Arc::new(MemoryStore::new());
    let router = router_with(
        RouterConfig {
            strategy: RouteStrategy::Random,
            ..RouterConfig::default()
        },
        store,
    );

    for _ in 0..20 {
        router
            .record_provider_metrics(Provider::Volcengine, false, Duration::from_millis(100))
            .await;
    }

    for _ in 0..20 {
        assert_eq!(router.select_provider().await, Provider::Dashscope);
    }
}

#[tokio::test]
async fn test_map_model_dual_homed_matches_selection() {
    let store = Arc::new(MemoryStore::new());
    let router = router_with(strategy_config(RouteStrategy::RoundRobin), store);

    for _ in 0..10 {
        let resolved = router.map_model("deepseek-v3").await.unwrap();
        match resolved.provider {
            Provider::Dashscope => assert_eq!(resolved.model, "deepseek-v3"),
            Provider::Volcengine => assert_eq!(resolved.model, "deepseek-v3-250324"),
        }
    }
}

#[tokio::test]
async fn test_map_model_fixed_capabilities_bypass_routing() {
    let store = Arc::new(MemoryStore::new());
    let router = router_with(strategy_config(RouteStrategy::RoundRobin), store);

    let resolved = router.map_model("qwen-plus").await.unwrap();
    assert_eq!(resolved.provider, Provider::Dashscope);
    assert_eq!(resolved.model, "qwen-plus");

    // Fixed mappings never touch the round-robin counter, so repeated calls
    // stay put.
    let again = router.map_model("qwen-plus").await.unwrap();
    assert_eq!(again, resolved);
}

#[tokio::test]
async fn test_reasoner_never_resolves_to_dashscope() {
    let store = Arc::new(MemoryStore::new());
    let router = router_with(strategy_config(RouteStrategy::Random), store);

    for _ in 0..50 {
        let resolved = router.map_model(REASONER_CAPABILITY).await.unwrap();
        assert_eq!(resolved.provider, Provider::Volcengine);
        assert_eq!(resolved.model, "deepseek-r1-250120");
    }
}

#[tokio::test]
async fn test_map_model_unknown_capability_errors() {
    let store = Arc::new(MemoryStore::new());
    let router = router_with(strategy_config(RouteStrategy::Random), store);

    let err = router.map_model("gpt-4").await.unwrap_err();
    assert!(matches!(
        err,
        crate::utils::error::GateError::UnknownModel(_)
    ));
}

#[tokio::test]
async fn test_probe_failure_reads_as_headroom() {
    let router = router_with(strategy_config(RouteStrategy::Random), Arc::new(UnreachableStore));
    assert!(router.can_acquire_now(Provider::Dashscope).await);
}
