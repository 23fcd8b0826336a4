//! Turns the per-source readings into published service values.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::air_quality::{index_by_name, AirQuality, AirQualityIndex, DEFAULT_INDEX};
use super::reading::{Measurement, ReadingStore};
use crate::core::config::{AggregateFunction, FieldBinding, ServiceKind, ServiceSpec};

/// Values of one published service after a cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceValues {
    pub name: String,
    pub fault: bool,
    /// Every bound field, `None` when no source provided a value
    pub values: BTreeMap<Measurement, Option<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub air_quality: Option<AirQuality>,
}

/// Everything a presentation layer needs after a cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleValues {
    pub services: BTreeMap<ServiceKind, ServiceValues>,
}

impl CycleValues {
    /// Value of a measurement, from the first service that binds it
    pub fn value(&self, measurement: Measurement) -> Option<f64> {
        self.services
            .values()
            .find_map(|s| s.values.get(&measurement).copied().flatten())
    }

    pub fn air_quality(&self) -> Option<AirQuality> {
        self.services
            .get(&ServiceKind::AirQuality)
            .and_then(|s| s.air_quality)
    }

    pub fn service(&self, kind: ServiceKind) -> Option<&ServiceValues> {
        self.services.get(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

/// Reduce the present values of several sources.
///
/// No values, or an unknown function, yields `None`.
pub fn aggregate(function: &AggregateFunction, values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    match function {
        AggregateFunction::Minimum => values.iter().copied().reduce(f64::min),
        AggregateFunction::Maximum => values.iter().copied().reduce(f64::max),
        AggregateFunction::Average => Some(values.iter().sum::<f64>() / values.len() as f64),
        AggregateFunction::Unknown(name) => {
            log::error!("Unknown aggregate function '{}'", name);
            None
        }
    }
}

/// Resolve one field binding against the reading store
pub fn resolve(binding: &FieldBinding, measurement: Measurement, store: &ReadingStore) -> Option<f64> {
    match binding {
        FieldBinding::Direct(id) => store.value(id, measurement),
        FieldBinding::Aggregate { sources, aggregate: function } => {
            let present: Vec<f64> = sources
                .iter()
                .filter_map(|id| store.value(id, measurement))
                .collect();
            aggregate(function, &present)
        }
    }
}

pub struct Aggregator {
    services: BTreeMap<ServiceKind, ServiceSpec>,
    index: Option<Box<dyn AirQualityIndex>>,
}

impl Aggregator {
    /// Resolve the index algorithm once. An unknown name is reported here and
    /// the service then always publishes `Unknown`.
    pub fn new(services: BTreeMap<ServiceKind, ServiceSpec>) -> Self {
        let index = services.get(&ServiceKind::AirQuality).and_then(|spec| {
            let name = spec.aqi.as_deref().unwrap_or(DEFAULT_INDEX);
            match index_by_name(name) {
                Ok(index) => Some(index),
                Err(e) => {
                    log::error!("{}", e);
                    None
                }
            }
        });

        Self { services, index }
    }

    pub fn derive(&self, store: &ReadingStore, error: bool) -> CycleValues {
        let mut values = CycleValues::default();

        for (kind, spec) in &self.services {
            let fields: BTreeMap<Measurement, Option<f64>> = spec
                .fields
                .iter()
                .map(|(m, binding)| (*m, resolve(binding, *m, store)))
                .collect();

            let air_quality = (*kind == ServiceKind::AirQuality).then(|| match &self.index {
                Some(index) => index.compute(&|m| fields.get(&m).copied().flatten()),
                None => AirQuality::Unknown,
            });

            values.services.insert(
                *kind,
                ServiceValues {
                    name: spec.name.clone(),
                    fault: error,
                    values: fields,
                    air_quality,
                },
            );
        }

        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;

    fn store(entries: &[(&str, Measurement, f64)]) -> ReadingStore {
        let mut store = ReadingStore::with_sources(["a", "b", "c"]);
        for (id, m, v) in entries {
            store.entry(id).set(*m, *v);
        }
        store
    }

    #[test]
    fn test_aggregate_functions() {
        assert_eq!(aggregate(&AggregateFunction::Average, &[10.0, 20.0]), Some(15.0));
        assert_eq!(aggregate(&AggregateFunction::Minimum, &[]), None);
        assert_eq!(aggregate(&AggregateFunction::Minimum, &[3.0, -1.0]), Some(-1.0));
        assert_eq!(aggregate(&AggregateFunction::Maximum, &[3.0, 7.5, 1.0]), Some(7.5));
        assert_eq!(
            aggregate(&AggregateFunction::Unknown("median".to_string()), &[1.0]),
            None
        );
    }

    #[test]
    fn test_aggregate_skips_absent_sources() {
        let store = store(&[("a", Measurement::Temperature, 19.0), ("c", Measurement::Temperature, 0.0)]);
        let binding = FieldBinding::Aggregate {
            sources: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            aggregate: AggregateFunction::Maximum,
        };
        assert_eq!(resolve(&binding, Measurement::Temperature, &store), Some(19.0));

        let binding = FieldBinding::Aggregate {
            sources: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            aggregate: AggregateFunction::Average,
        };
        assert_eq!(resolve(&binding, Measurement::Temperature, &store), Some(9.5));
    }

    #[test]
    fn test_direct_binding() {
        let store = store(&[("a", Measurement::Humidity, 55.0)]);
        let direct = FieldBinding::Direct("a".to_string());
        assert_eq!(resolve(&direct, Measurement::Humidity, &store), Some(55.0));
        assert_eq!(resolve(&direct, Measurement::Pressure, &store), None);
    }

    #[test]
    fn test_derive_end_to_end() {
        let config = Config::from_json_str(
            r#"{
                "sources": [
                    { "id": "outdoor", "provider": "sensor.community", "sensor": "1" },
                    { "id": "city", "provider": "waqi.info", "city": "x", "token": "t" }
                ],
                "services": {
                    "temperature": { "name": "Temp", "temperature": "outdoor" },
                    "humidity": { "humidity": "outdoor" },
                    "airquality": {
                        "no2": "city", "pm10": "city", "o3": "city", "pm2.5": "city"
                    }
                }
            }"#,
        )
        .unwrap();

        let mut store = ReadingStore::with_sources(["outdoor", "city"]);
        store.entry("outdoor").set(Measurement::Temperature, 21.3);
        store.entry("outdoor").set(Measurement::Humidity, 55.0);
        for (m, v) in [
            (Measurement::No2, 120.0),
            (Measurement::Pm10, 30.0),
            (Measurement::O3, 90.0),
            (Measurement::Pm25, 20.0),
        ] {
            store.entry("city").set(m, v);
        }

        let values = Aggregator::new(config.services.clone()).derive(&store, false);

        assert_eq!(values.value(Measurement::Temperature), Some(21.3));
        assert_eq!(values.value(Measurement::Humidity), Some(55.0));
        assert_eq!(values.air_quality(), Some(AirQuality::Fair));
        assert_eq!(values.service(ServiceKind::Temperature).unwrap().name, "Temp");
        assert!(!values.service(ServiceKind::AirQuality).unwrap().fault);
    }

    #[test]
    fn test_derive_propagates_fault_and_absent_values() {
        let mut services = BTreeMap::new();
        let mut spec = ServiceSpec::default();
        spec.fields
            .insert(Measurement::Pm10, FieldBinding::Direct("a".to_string()));
        services.insert(ServiceKind::AirQuality, spec);

        let values = Aggregator::new(services).derive(&store(&[]), true);
        let service = values.service(ServiceKind::AirQuality).unwrap();

        assert!(service.fault);
        assert_eq!(service.values.get(&Measurement::Pm10), Some(&None));
        assert_eq!(values.air_quality(), Some(AirQuality::Unknown));
    }

    #[test]
    fn test_unknown_index_degrades_to_unknown() {
        let mut services = BTreeMap::new();
        let mut spec = ServiceSpec {
            aqi: Some("aqi-us".to_string()),
            ..Default::default()
        };
        spec.fields
            .insert(Measurement::Pm10, FieldBinding::Direct("a".to_string()));
        services.insert(ServiceKind::AirQuality, spec);

        let values =
            Aggregator::new(services).derive(&store(&[("a", Measurement::Pm10, 300.0)]), false);

        assert_eq!(values.value(Measurement::Pm10), Some(300.0));
        assert_eq!(values.air_quality(), Some(AirQuality::Unknown));
    }
}
