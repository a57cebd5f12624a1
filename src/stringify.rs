//! Direct-to-text serialization: the same walk as [`Serializer`], appending
//! to a string instead of building a tree.
use crate::config::JsonConfig;
use crate::error::Result;
use crate::reflect::Reflect;
use crate::ser::props::{self, Member};
use crate::ser::{key_text, shape, Serializer, Shape, Visiting};
use crate::value::text::{write_string, write_value};

#[derive(Clone, Copy)]
pub struct Stringifier<'c> {
    config: &'c JsonConfig,
}

impl<'c> Stringifier<'c> {
    pub fn new(config: &'c JsonConfig) -> Self { Self { config } }

    pub fn append(&self, out: &mut String, value: &dyn Reflect) -> Result<()> {
        self.write(out, value, &mut Visiting::default())
    }

    fn write(&self, out: &mut String, value: &dyn Reflect, visiting: &mut Visiting) -> Result<()> {
        match shape(self.config, value)? {
            Shape::Scalar(json) => write_value(out, &json),
            Shape::Sequence(items) => {
                out.push('[');
                for (i, item) in items.enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    self.write(out, item, visiting)?;
                }
                out.push(']');
            }
            Shape::Tuple(items) => {
                out.push('[');
                for (i, item) in items.into_iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    self.write(out, item, visiting)?;
                }
                out.push(']');
            }
            Shape::Map(entries) => {
                let keys = Serializer::new(self.config);
                out.push('{');
                for (i, (k, v)) in entries.enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    write_string(out, &key_text(keys.value(k, visiting)?));
                    out.push(':');
                    self.write(out, v, visiting)?;
                }
                out.push('}');
            }
            Shape::Record(obj, descriptor) => {
                visiting.enter(obj, descriptor.type_ref())?;
                let result = self.record(out, obj, &descriptor, visiting);
                visiting.exit(obj);
                result?;
            }
        }
        Ok(())
    }

    fn record(
        &self,
        out: &mut String,
        obj: &dyn Reflect,
        descriptor: &crate::describe::TypeDescriptor,
        visiting: &mut Visiting,
    ) -> Result<()> {
        out.push('{');
        for (i, (name, member)) in props::members(self.config, obj, descriptor).into_iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            write_string(out, &name);
            out.push(':');
            match member {
                Member::Discriminator(variant) => write_string(out, &variant),
                Member::Property { raw, value } => {
                    visiting.check_property(value.as_reflect(), &raw, descriptor)?;
                    self.write(out, value.as_reflect(), visiting)?;
                }
            }
        }
        out.push('}');
        Ok(())
    }
}

/// Serialize `value` straight to JSON text with `config`.
#[tracing::instrument(skip_all)]
pub fn stringify(value: &dyn Reflect, config: &JsonConfig) -> Result<String> {
    let mut out = String::with_capacity(config.stringify_initial_size());
    Stringifier::new(config).append(&mut out, value)?;
    tracing::debug!(ty = %value.runtime_type(), len = out.len(), "stringify");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::*;
    use crate::ser::serialize;
    use fixedbitset::FixedBitSet;
    use std::collections::BTreeMap;

    fn same_both_ways(value: &dyn Reflect, config: &JsonConfig) -> String {
        let text = stringify(value, config).unwrap();
        assert_eq!(text, serialize(value, config).unwrap().to_json_string());
        text
    }

    #[test]
    fn flavors_agree() {
        let c = fixture_config();
        assert_eq!(same_both_ways(&Dummy1 { field1: "a\u{e9}\n".into(), field2: 1 }, &c), r#"{"field1":"a\u00E9\n","field2":1}"#);
        assert_eq!(same_both_ways(&Expr::Const { number: 2.0 }, &c), r#"{"class":"Const","number":2.0}"#);
        let mut bits = FixedBitSet::with_capacity(8);
        bits.insert(1);
        bits.insert(3);
        assert_eq!(same_both_ways(&bits, &c), "[1,3]");
        let mut m = BTreeMap::new();
        m.insert(2_i64, vec![Some(1.5_f32), None]);
        assert_eq!(same_both_ways(&m, &c), r#"{"2":[1.5,null]}"#);
        same_both_ways(&(DummyEnum::ALPHA, 'x', "y".to_owned()), &c);
    }

    #[test]
    fn cycles_fail_in_text_too() {
        let (a, _b) = node_cycle();
        let e = stringify(&*a, &fixture_config()).unwrap_err();
        assert_eq!(e.to_string(), "Circular reference: property next in Node");
    }
}
