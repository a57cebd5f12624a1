//! Generic binding and subtype tests.
use crate::describe::TypeIntrospector;

use super::{Classifier, TypeParam, TypeRef};

/// Substitute every `Param(i)` in `position` with the enclosing type's i-th
/// argument, else the parameter's declared bound. `Err` carries the name of
/// the parameter that could not be resolved.
pub fn bind(position: &TypeRef, enclosing: &TypeRef, params: &[TypeParam]) -> Result<TypeRef, String> {
    if !position.has_params() {
        return Ok(position.clone());
    }
    if let Classifier::Param(index) = position.classifier() {
        let bound = enclosing
            .arg(*index)
            .filter(|a| !a.has_params())
            .or_else(|| params.get(*index).and_then(TypeParam::bound))
            .cloned();
        return match bound {
            Some(t) if position.is_nullable() => Ok(t.nullable()),
            Some(t) => Ok(t),
            None => Err(params.get(*index).map_or_else(|| format!("T{index}"), |p| p.name().to_owned())),
        };
    }
    let args = position
        .args()
        .iter()
        .map(|a| bind(a, enclosing, params))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(position.with_args(args))
}

const MAX_HIERARCHY_DEPTH: usize = 32;

/// `sub ⊑ sup`: nullability narrows, `Any` tops everything, numeric scalars
/// sit under `Number`, declared supertypes (and sealed parents) are followed,
/// and type arguments are covariant. A supertype with no arguments matches
/// any argument list.
pub fn is_subtype(types: &dyn TypeIntrospector, sub: &TypeRef, sup: &TypeRef) -> bool {
    subtype_at(types, sub, sup, 0)
}

fn subtype_at(types: &dyn TypeIntrospector, sub: &TypeRef, sup: &TypeRef, depth: usize) -> bool {
    if sub.is_nullable() && !sup.is_nullable() {
        return false;
    }
    match sup.classifier() {
        Classifier::Any => return true,
        Classifier::Number if sub.classifier().is_numeric() => return true,
        _ => {}
    }
    if sub.classifier() == sup.classifier() {
        return sup.args().is_empty()
            || (sub.args().len() == sup.args().len()
                && sub.args().iter().zip(sup.args()).all(|(a, b)| subtype_at(types, a, b, depth)));
    }
    if depth >= MAX_HIERARCHY_DEPTH {
        return false;
    }
    types.supertypes(sub).iter().any(|parent| {
        let parent = if sub.is_nullable() { parent.clone().nullable() } else { parent.clone() };
        subtype_at(types, &parent, sup, depth + 1)
    })
}
