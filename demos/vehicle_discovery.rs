//! Wires every module into one running instance over a small vehicle-listing
//! domain: parses a starting URL, runs one fetch through the full
//! broker -> mapper -> coordinator -> adapter pipeline, then prints the
//! resulting state.

use std::sync::Arc;
use std::time::Duration;

use urlstate_core::adapter::{DataAdapter, FetchOutcome};
use urlstate_core::cache_key::ParamsCacheKeyBuilder;
use urlstate_core::config::{CoordinatorConfig, OrchestratorConfig};
use urlstate_core::coordinator::RequestCoordinator;
use urlstate_core::error::{BoxFuture, BrokerError, FetchError};
use urlstate_core::mapper::FilterMapper;
use urlstate_core::orchestrator::ResourceOrchestrator;
use urlstate_core::params::{delimiters, Params};
use urlstate_core::{NavigationBackend, UrlStateBroker};

#[derive(Clone, Debug, Default, PartialEq)]
struct VehicleFilters {
    manufacturer: Option<String>,
    year_min: Option<u32>,
    body_classes: Vec<String>,
    page: u32,
}

#[derive(Clone, Debug, PartialEq)]
struct Vehicle {
    manufacturer: String,
    model: String,
    year: u32,
}

struct VehicleMapper;

impl FilterMapper<VehicleFilters> for VehicleMapper {
    fn to_url_params(&self, f: &VehicleFilters) -> Params {
        let mut pairs = Vec::new();
        if let Some(m) = &f.manufacturer {
            pairs.push(("manufacturer".to_string(), m.clone()));
        }
        if let Some(y) = f.year_min {
            pairs.push(("yearMin".to_string(), y.to_string()));
        }
        if !f.body_classes.is_empty() {
            pairs.push(("bodyClass".to_string(), delimiters::join_list_sorted(f.body_classes.clone())));
        }
        if f.page != 1 {
            pairs.push(("page".to_string(), f.page.to_string()));
        }
        Params::from_pairs(pairs)
    }

    fn from_url_params(&self, params: &Params, _warnings: &mut Vec<urlstate_core::MapperWarning>) -> VehicleFilters {
        VehicleFilters {
            manufacturer: params.get("manufacturer").map(str::to_string),
            year_min: params.get("yearMin").and_then(|v| v.parse().ok()),
            body_classes: params.get("bodyClass").map(delimiters::split_list).unwrap_or_default(),
            page: params.get("page").and_then(|v| v.parse().ok()).unwrap_or(1),
        }
    }

    fn default_filters(&self) -> VehicleFilters {
        VehicleFilters { page: 1, ..Default::default() }
    }
}

/// An in-memory "catalog" standing in for a real HTTP data source.
struct CatalogAdapter {
    vehicles: Vec<Vehicle>,
}

impl DataAdapter<VehicleFilters, Vehicle, ()> for CatalogAdapter {
    fn fetch_data<'a>(
        &'a self,
        filters: &'a VehicleFilters,
        _highlights: Option<&'a VehicleFilters>,
    ) -> BoxFuture<'a, Result<FetchOutcome<Vehicle, ()>, FetchError>> {
        Box::pin(async move {
            let matches: Vec<Vehicle> = self
                .vehicles
                .iter()
                .filter(|v| filters.manufacturer.as_deref().is_none_or(|m| m == v.manufacturer))
                .filter(|v| filters.year_min.is_none_or(|y| v.year >= y))
                .cloned()
                .collect();
            Ok(FetchOutcome { total: matches.len() as u64, results: matches, statistics: None })
        })
    }
}

/// A navigation backend that just prints every write instead of touching a
/// real browser address bar.
struct StdoutNavigation {
    query: parking_lot::Mutex<String>,
}

impl NavigationBackend for StdoutNavigation {
    fn read_query(&self) -> String {
        self.query.lock().clone()
    }

    fn write_query<'a>(&'a self, query: String) -> BoxFuture<'a, Result<(), BrokerError>> {
        Box::pin(async move {
            println!("navigate: ?{query}");
            *self.query.lock() = query;
            Ok(())
        })
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let backend = StdoutNavigation { query: parking_lot::Mutex::new("manufacturer=Ford&yearMin=2020".to_string()) };
    let broker = Arc::new(UrlStateBroker::new(Box::new(backend)));

    let mapper = Arc::new(VehicleMapper);
    let adapter = Arc::new(CatalogAdapter {
        vehicles: vec![
            Vehicle { manufacturer: "Ford".into(), model: "F150".into(), year: 2022 },
            Vehicle { manufacturer: "Ford".into(), model: "Bronco".into(), year: 2019 },
            Vehicle { manufacturer: "Toyota".into(), model: "Tacoma".into(), year: 2023 },
        ],
    });
    let cache_key_builder = Arc::new(ParamsCacheKeyBuilder::new(VehicleMapper));
    let coordinator = Arc::new(RequestCoordinator::new(CoordinatorConfig::default()));

    let orchestrator =
        Arc::new(ResourceOrchestrator::new(mapper, adapter, cache_key_builder, coordinator, OrchestratorConfig::default()));
    orchestrator.drive_from_broker(broker.clone());

    let mut states = orchestrator.state_stream();
    states.changed().await?;
    let initial = states.borrow().clone();
    println!("initial fetch: {} vehicle(s), loading={}", initial.results.len(), initial.loading);

    orchestrator
        .update_filters(VehicleFilters { body_classes: vec!["truck".into()], ..initial.filters.clone() })
        .await?;
    states.changed().await?;
    tokio::time::sleep(Duration::from_millis(10)).await;
    let after = orchestrator.snapshot();
    println!("after update_filters: {} vehicle(s)", after.results.len());

    orchestrator.dispose();
    Ok(())
}
