//! Per-type property plan: what the annotations say about each property and
//! constructor parameter, resolved once against a config's annotation
//! registries.
use super::JsonConfig;
use crate::describe::{Annotation, Param, TypeDescriptor};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlannedProperty {
    /// Position in [`TypeDescriptor::properties`].
    pub index: usize,
    pub json_name: String,
    pub ignored: bool,
    pub include_if_null: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlannedParam {
    pub json_name: String,
    pub ignored: bool,
}

#[derive(Clone, Debug, Default)]
pub struct TypePlan {
    /// Emission order: primary constructor parameters first, then the rest
    /// in declaration order. Later duplicates of a serialized name dropped.
    properties: Vec<PlannedProperty>,
    /// Indexed like [`TypeDescriptor::constructors`], then by parameter.
    params: Vec<Vec<PlannedParam>>,
    include_all: bool,
    allow_extra: bool,
}

impl TypePlan {
    pub fn build(config: &JsonConfig, descriptor: &TypeDescriptor) -> Self {
        let declared = descriptor.properties();
        let primary = descriptor.primary_constructor();

        let param_annotations = |raw: &str| -> Vec<Annotation> {
            primary
                .and_then(|c| c.params().iter().find(|p| p.name() == raw))
                .map(|p| p.annotations().to_vec())
                .unwrap_or_default()
        };

        let mut order: Vec<usize> = primary
            .into_iter()
            .flat_map(|c| c.params())
            .filter_map(|p| declared.iter().position(|prop| prop.name() == p.name()))
            .collect();
        for index in 0..declared.len() {
            if !order.contains(&index) {
                order.push(index);
            }
        }

        let mut properties: Vec<PlannedProperty> = Vec::with_capacity(order.len());
        for index in order {
            let property = &declared[index];
            let mut merged = property.annotations().to_vec();
            merged.extend(param_annotations(property.name()));
            let json_name = config.find_name(&merged).unwrap_or_else(|| property.name().to_owned());
            if properties.iter().any(|p| p.json_name == json_name) {
                continue;
            }
            properties.push(PlannedProperty {
                index,
                json_name,
                ignored: config.has_ignore(&merged),
                include_if_null: config.has_include_if_null(&merged),
            });
        }

        let params = descriptor
            .constructors()
            .iter()
            .map(|c| c.params().iter().map(|p| plan_param(config, descriptor, p)).collect())
            .collect();

        Self {
            properties,
            params,
            include_all: config.has_include_all_properties(descriptor.annotations()),
            allow_extra: config.has_allow_extra(descriptor.annotations()),
        }
    }

    pub fn properties(&self) -> &[PlannedProperty] { &self.properties }

    pub fn params(&self, constructor: usize) -> &[PlannedParam] {
        self.params.get(constructor).map_or(&[], Vec::as_slice)
    }

    /// Property whose serialized name is `json_name`.
    pub fn find(&self, json_name: &str) -> Option<&PlannedProperty> {
        self.properties.iter().find(|p| p.json_name == json_name)
    }

    pub fn include_all(&self) -> bool { self.include_all }

    pub fn allow_extra(&self) -> bool { self.allow_extra }
}

/// Parameter annotations merged with those of the property of the same name.
fn plan_param(config: &JsonConfig, descriptor: &TypeDescriptor, param: &Param) -> PlannedParam {
    let mut merged = param.annotations().to_vec();
    if let Some(property) = descriptor.properties().iter().find(|p| p.name() == param.name()) {
        merged.extend(property.annotations().iter().cloned());
    }
    PlannedParam {
        json_name: config.find_name(&merged).unwrap_or_else(|| param.name().to_owned()),
        ignored: config.has_ignore(&merged),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::describe::{Args, Constructor, Property};
    use crate::types::Typed;

    #[derive(Clone, Debug, PartialEq)]
    struct Row {
        id: i32,
        label: String,
        note: Option<String>,
    }
    crate::reflect_record!(Row);

    fn row() -> TypeDescriptor {
        TypeDescriptor::record(Row::type_ref())
            .property(Property::of("note", |r: &Row| &r.note).annotate(Annotation::include_if_null()))
            .property(Property::of("label", |r: &Row| &r.label))
            .property(Property::of("id", |r: &Row| &r.id))
            .constructor(
                Constructor::new(|args: &mut Args| {
                    Ok(Row { id: args.take("id")?, label: args.take("label")?, note: None })
                })
                .param(Param::of::<i32>("id").annotate(Annotation::json_name("ID")))
                .param(Param::of::<String>("label").annotate(Annotation::json_ignore())),
            )
    }

    #[test]
    fn order_follows_primary_constructor() {
        let plan = TypePlan::build(&JsonConfig::new(), &row());
        let names: Vec<_> = plan.properties().iter().map(|p| p.json_name.as_str()).collect();
        assert_eq!(names, ["ID", "label", "note"]);
        assert!(plan.find("label").unwrap().ignored);
        assert!(plan.find("note").unwrap().include_if_null);
        assert_eq!(plan.find("ID").unwrap().index, 2);
    }

    #[test]
    fn params_merge_property_annotations() {
        let plan = TypePlan::build(&JsonConfig::new(), &row());
        assert_eq!(plan.params(0)[0], PlannedParam { json_name: "ID".into(), ignored: false });
        assert!(plan.params(0)[1].ignored);
        assert!(plan.params(7).is_empty());
    }
}
