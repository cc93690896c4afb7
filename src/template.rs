//! Template resolution.
//!
//! A template tells the protocol which value to put into every form field for
//! one (indicator, region) pair. Values cascade in three levels: the catalog's
//! global default, the indicator's own overrides, then the indicator's
//! overrides for a single region. Later levels win per key.

use crate::catalog::{Catalog, FieldValue, RawTemplate};
use crate::constants::{AVAILABLE_KEY, AVAILABLE_YES, WILDCARD};
use crate::errors::{AppError, AppResult};
use std::collections::BTreeMap;
use std::fmt;

/// Resolved value of a single form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateValue {
    /// Check the field's "all values" box unconditionally.
    Wildcard,
    /// Select exactly these option labels.
    Options(Vec<String>),
}

impl TemplateValue {
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::Wildcard)
    }
}

impl From<FieldValue> for TemplateValue {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::One(label) if label == WILDCARD => Self::Wildcard,
            FieldValue::One(label) => Self::Options(vec![label]),
            FieldValue::Many(labels) => Self::Options(labels),
        }
    }
}

impl From<&str> for TemplateValue {
    fn from(value: &str) -> Self {
        FieldValue::from(value).into()
    }
}

impl fmt::Display for TemplateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wildcard => write!(f, "{WILDCARD}"),
            Self::Options(labels) => write!(f, "{}", labels.join(" | ")),
        }
    }
}

/// Field name to value mapping, iterated in field-name order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Template(BTreeMap<String, TemplateValue>);

impl Template {
    pub fn get(&self, field: &str) -> Option<&TemplateValue> {
        self.0.get(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TemplateValue)> {
        self.0.iter().map(|(field, value)| (field.as_str(), value))
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<TemplateValue>> FromIterator<(K, V)> for Template {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(field, value)| (field.into(), value.into()))
                .collect(),
        )
    }
}

/// Output of [`resolve`]: the form template and whether the pair has data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTemplate {
    pub template: Template,
    pub available: bool,
}

/// Resolves the template for `indicator` in `region` against a catalog snapshot.
///
/// The `available` key is consumed last: `"yes"` marks the pair as available,
/// any other value as unavailable, and a template without the key counts as
/// available. The key never appears in the returned template.
///
/// # Errors
///
/// Returns `UnknownIndicator` if the indicator is not in the catalog (the empty
/// name included), and `UnknownRegion` if the region is not in the catalog's
/// region code sequence.
pub fn resolve(catalog: &Catalog, indicator: &str, region: &str) -> AppResult<ResolvedTemplate> {
    let definition = catalog
        .indicator(indicator)
        .ok_or_else(|| AppError::UnknownIndicator(indicator.to_string()))?;

    if !catalog.contains_region(region) {
        return Err(AppError::UnknownRegion {
            region: region.to_string(),
            available: catalog.available_regions(),
        });
    }

    let mut raw = catalog.default_template.clone();
    merge(&mut raw, &definition.template);
    if let Some(region_override) = definition.regions.get(region) {
        merge(&mut raw, region_override);
    }

    let available = match raw.remove(AVAILABLE_KEY) {
        Some(FieldValue::One(flag)) => flag == AVAILABLE_YES,
        Some(FieldValue::Many(_)) => false,
        None => true,
    };

    Ok(ResolvedTemplate {
        template: Template(
            raw.into_iter()
                .map(|(field, value)| (field, value.into()))
                .collect(),
        ),
        available,
    })
}

fn merge(base: &mut RawTemplate, overrides: &RawTemplate) {
    for (field, value) in overrides {
        base.insert(field.clone(), value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundled() -> Catalog {
        Catalog::bundled().unwrap()
    }

    #[test]
    fn test_street_network_uses_default_template() {
        let resolved = resolve(&bundled(), "street_network", "01").unwrap();
        let expected: Template = [
            ("munr", "*"),
            ("tippos", "*"),
            ("oktmo", "*"),
            ("god", "2010"),
            ("period", "значение показателя за год"),
        ]
        .into_iter()
        .collect();

        assert_eq!(resolved.template, expected);
        assert!(resolved.available);
    }

    #[test]
    fn test_indicator_override_replaces_default_key() {
        let resolved = resolve(&bundled(), "natural_change", "01").unwrap();
        assert_eq!(resolved.template.get("god"), Some(&TemplateValue::from("2012")));
        assert_eq!(resolved.template.get("munr"), Some(&TemplateValue::Wildcard));
    }

    #[test]
    fn test_region_override_changes_only_overridden_keys() {
        let catalog = bundled();
        let region_01 = resolve(&catalog, "natural_change", "01").unwrap().template;
        let region_99 = resolve(&catalog, "natural_change", "99").unwrap().template;

        let differing: Vec<&str> = region_01
            .iter()
            .filter(|(field, value)| region_99.get(field) != Some(*value))
            .map(|(field, _)| field)
            .collect();
        assert_eq!(differing, vec!["period"]);
        assert_eq!(region_99.get("period"), Some(&TemplateValue::from("январь-март")));
        assert_eq!(region_01.len(), region_99.len());
    }

    #[test]
    fn test_no_override_indicator_matches_default_everywhere() {
        let catalog = bundled();
        let mut default = catalog.default_template.clone();
        default.remove(AVAILABLE_KEY);
        let expected: Template = default.into_iter().collect();

        for region in &catalog.region_codes {
            let resolved = resolve(&catalog, "street_network", region).unwrap();
            assert_eq!(resolved.template, expected, "region {region}");
        }
    }

    #[test]
    fn test_empty_indicator_and_region_fail() {
        let err = resolve(&bundled(), "", "").unwrap_err();
        assert!(matches!(err, AppError::UnknownIndicator(name) if name.is_empty()));
    }

    #[test]
    fn test_unknown_region_fails() {
        let err = resolve(&bundled(), "street_network", "02").unwrap_err();
        assert!(matches!(err, AppError::UnknownRegion { .. }));
    }

    #[test]
    fn test_region_availability_override_marks_unavailable() {
        let catalog = bundled();
        let moscow = resolve(&catalog, "ethnicity", "45").unwrap();
        assert!(!moscow.available);
        assert!(moscow.template.get(AVAILABLE_KEY).is_none());

        let altai = resolve(&catalog, "ethnicity", "01").unwrap();
        assert!(altai.available);
    }

    #[test]
    fn test_missing_available_key_counts_as_available() {
        let catalog = Catalog::from_toml_str(
            r#"
            region_codes = ["01"]
            [indicators.a]
            id = 1
            template = { god = ["2010", "2011"] }
            "#,
        )
        .unwrap();

        let resolved = resolve(&catalog, "a", "01").unwrap();
        assert!(resolved.available);
        assert_eq!(
            resolved.template.get("god"),
            Some(&TemplateValue::Options(vec!["2010".into(), "2011".into()]))
        );
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let catalog = bundled();
        assert_eq!(
            resolve(&catalog, "migration", "50").unwrap(),
            resolve(&catalog, "migration", "50").unwrap()
        );
    }

    #[test]
    fn test_template_value_display() {
        assert_eq!(TemplateValue::Wildcard.to_string(), "*");
        assert_eq!(
            TemplateValue::Options(vec!["a".into(), "b".into()]).to_string(),
            "a | b"
        );
    }
}
