//! Which members a record emits, under which names, in which order.
use crate::config::JsonConfig;
use crate::describe::{PropertyValue, TypeDescriptor};
use crate::reflect::{peel, Reflect, ReflectRef};

pub(crate) enum Member<'a> {
    /// Sealed-family discriminator with the variant's simple name.
    Discriminator(String),
    Property { raw: String, value: PropertyValue<'a> },
}

/// Members of `obj` in emission order, paired with their serialized names.
pub(crate) fn members<'a>(
    config: &JsonConfig,
    obj: &'a dyn Reflect,
    descriptor: &TypeDescriptor,
) -> Vec<(String, Member<'a>)> {
    let plan = config.plan(descriptor);
    let mut out = Vec::with_capacity(plan.properties().len() + 1);
    let discriminator = descriptor.sealed_parent().map(|_| config.sealed_class_discriminator());
    if let Some(name) = discriminator {
        out.push((name.to_owned(), Member::Discriminator(descriptor.name().to_owned())));
    }
    for planned in plan.properties() {
        if planned.ignored || discriminator == Some(planned.json_name.as_str()) {
            continue;
        }
        let property = &descriptor.properties()[planned.index];
        let Some(value) = property.get(obj) else { continue };
        let is_null = matches!(peel(value.as_reflect()).reflect_ref(), ReflectRef::Null);
        if is_null && !(planned.include_if_null || config.include_nulls() || plan.include_all()) {
            continue;
        }
        out.push((planned.json_name.clone(), Member::Property { raw: property.name().to_owned(), value }));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::*;
    use crate::types::Typed;

    fn names(config: &JsonConfig, obj: &dyn Reflect) -> Vec<String> {
        let descriptor = config.descriptor(&obj.runtime_type()).unwrap();
        members(config, obj, &descriptor).into_iter().map(|(n, _)| n).collect()
    }

    #[test]
    fn discriminator_comes_first() {
        let c = fixture_config();
        assert_eq!(names(&c, &Expr::Const { number: 1.0 }), ["class", "number"]);
        assert_eq!(names(&c, &Expr::NotANumber), ["class"]);
    }

    #[test]
    fn nulls_need_a_reason() {
        let mut c = fixture_config();
        let d = Dummy { field1: "a".into(), extra: None };
        assert_eq!(names(&c, &d), ["field1"]);
        c.set_include_nulls(true);
        assert_eq!(names(&c, &d), ["field1", "extra"]);
        let n = Nullable { a: None, b: None };
        assert_eq!(names(&fixture_config(), &n), ["b"]);
        assert!(Nullable::type_ref().to_string().starts_with("Nullable"));
    }

    #[test]
    fn custom_annotations() {
        let mut c = fixture_config();
        let t = Tagged { alpha: "a".into(), secret: "s".into() };
        assert_eq!(names(&c, &t), ["alpha", "secret"]);
        c.add_name_annotation("Rename", "to").add_ignore_annotation("Skip");
        assert_eq!(names(&c, &t), ["first"]);
    }
}
