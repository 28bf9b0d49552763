use crate::aggregators::Aggregation;
use crate::dimension::{Dimension, MappedDimension, Mapping, Operation};
use crate::error::TabulaMappingError;
use tabula_common::Value;

/// Copy `source_path` of `source` into `target_path` of `target`.
///
/// Aggregations and whole configurations are cloned as they are, so function
/// aggregators reach the target by reference. Anything else goes through
/// [`Value`], a missing source writing null.
fn copy_path(
    source: &MappedDimension,
    source_path: &str,
    target: &mut MappedDimension,
    target_path: &str,
) -> Result<(), TabulaMappingError> {
    match (source_path, target_path) {
        ("config.aggregation", "config.aggregation") => {
            target.config.aggregation = source.config.aggregation.clone();
            Ok(())
        }
        ("config", "config") => {
            target.config = source.config.clone();
            Ok(())
        }
        _ => {
            let value = source.get_path(source_path).unwrap_or_default();
            if source_path == "config.aggregation"
                && matches!(source.config.aggregation, Some(Aggregation::Func(_)))
            {
                tracing::warn!(
                    path = %source_path,
                    "aggregation function cannot be written to a different path"
                );
            }
            target.set_path(target_path, value)
        }
    }
}

/// Fan the configuration of proxy dimensions out into their targets.
///
/// For every `proxy` dimension present in the mapping, each declared
/// `target_path <- source_path` pair copies the value at `source_path` of the
/// proxy's own mapping into `target_path` of the target dimension's mapping,
/// creating the target entry when needed.
pub fn hydrate_proxies(
    dimensions: &[Dimension],
    mapping: &Mapping,
) -> Result<Mapping, TabulaMappingError> {
    let mut hydrated = mapping.clone();

    for dimension in dimensions.iter().filter(|d| d.operation == Operation::Proxy) {
        let (Some(targets), Some(source)) = (&dimension.targets, mapping.get(&dimension.id)) else {
            continue;
        };
        for (target_id, paths) in targets {
            for (target_path, source_path) in paths {
                tracing::debug!(
                    proxy = %dimension.id,
                    target = %target_id,
                    path = %target_path,
                    "hydrating proxy target"
                );
                let target = hydrated.entry(target_id.clone()).or_default();
                copy_path(source, source_path, target, target_path)?;
            }
        }
    }

    Ok(hydrated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregators::Aggregator;

    fn dimensions() -> Vec<Dimension> {
        vec![
            Dimension::get("size"),
            Dimension::get("color"),
            Dimension::new("series", Operation::Proxy)
                .with_target("size", "value", "value")
                .with_target("color", "value", "value")
                .with_target("color", "config.aggregation", "config.aggregation")
                .with_target("size", "config.scale", "config.scale"),
        ]
    }

    #[test]
    fn test_proxy_fans_out() {
        let mut mapping = Mapping::new();
        mapping.insert(
            "series".to_string(),
            MappedDimension::column("Fare")
                .with_aggregation("mean")
                .with_config("scale", "log"),
        );

        let hydrated = hydrate_proxies(&dimensions(), &mapping).unwrap();
        assert_eq!(hydrated["size"].value, vec!["Fare".to_string()]);
        assert_eq!(
            hydrated["size"].config.extra.get("scale"),
            Some(&Value::from("log"))
        );
        assert_eq!(hydrated["color"].value, vec!["Fare".to_string()]);
        assert_eq!(
            hydrated["color"].config.aggregation,
            Some(Aggregation::from("mean"))
        );
        assert_eq!(hydrated["series"], mapping["series"]);
    }

    #[test]
    fn test_missing_sources_clear_targets() {
        let mut mapping = Mapping::new();
        mapping.insert("series".to_string(), MappedDimension::column("Fare"));
        mapping.insert(
            "color".to_string(),
            MappedDimension::column("Age").with_aggregation("sum"),
        );
        let hydrated = hydrate_proxies(&dimensions(), &mapping).unwrap();
        assert_eq!(hydrated["color"].value, vec!["Fare".to_string()]);
        assert_eq!(hydrated["color"].config.aggregation, None);
    }

    #[test]
    fn test_unmapped_proxy_is_skipped() {
        let mut mapping = Mapping::new();
        mapping.insert("size".to_string(), MappedDimension::column("Age"));
        let hydrated = hydrate_proxies(&dimensions(), &mapping).unwrap();
        assert_eq!(hydrated, mapping);
    }

    #[test]
    fn test_function_aggregations_are_shared() {
        let count = Aggregator::count();
        let mut mapping = Mapping::new();
        mapping.insert(
            "series".to_string(),
            MappedDimension::column("Fare").with_aggregation(count.clone()),
        );
        let hydrated = hydrate_proxies(&dimensions(), &mapping).unwrap();
        assert_eq!(hydrated["color"].value, vec!["Fare".to_string()]);
        assert_eq!(
            hydrated["color"].config.aggregation,
            Some(Aggregation::Func(count))
        );
    }

    #[test]
    fn test_whole_config_keeps_function_aggregations() {
        let count = Aggregator::count();
        let dimensions = vec![
            Dimension::get("size"),
            Dimension::new("series", Operation::Proxy).with_target("size", "config", "config"),
        ];
        let mut mapping = Mapping::new();
        mapping.insert(
            "series".to_string(),
            MappedDimension::column("Fare")
                .with_aggregation(count.clone())
                .with_config("scale", "log"),
        );
        let hydrated = hydrate_proxies(&dimensions, &mapping).unwrap();
        assert_eq!(hydrated["size"].config, mapping["series"].config);
        assert_eq!(
            hydrated["size"].config.aggregation,
            Some(Aggregation::Func(count))
        );
    }
}
