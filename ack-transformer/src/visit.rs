use std::{marker::PhantomData, ops::ControlFlow};

use serde_json::Value;

use crate::resource::Object;

pub trait VisitorMut {
    type Break;

    fn visit_value(&mut self, node: &mut Value) -> ControlFlow<Self::Break> {
        self.walk_value(node)
    }

    fn visit_object(&mut self, object: &mut Object) -> ControlFlow<Self::Break> {
        self.walk_object(object)
    }

    fn visit_field(&mut self, _key: &str, value: &mut Value) -> ControlFlow<Self::Break> {
        self.visit_value(value)
    }

    fn visit_array(&mut self, array: &mut Vec<Value>) -> ControlFlow<Self::Break> {
        self.walk_array(array)
    }

    fn walk_object(&mut self, object: &mut Object) -> ControlFlow<Self::Break> {
        for (key, value) in object.iter_mut() {
            self.visit_field(key, value)?;
        }

        ControlFlow::Continue(())
    }

    fn walk_array(&mut self, array: &mut Vec<Value>) -> ControlFlow<Self::Break> {
        for item in array.iter_mut() {
            self.visit_value(item)?;
        }

        ControlFlow::Continue(())
    }

    fn walk_value(&mut self, node: &mut Value) -> ControlFlow<Self::Break> {
        match node {
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {
                ControlFlow::Continue(())
            }
            Value::Array(array) => self.visit_array(array),
            Value::Object(object) => self.visit_object(object),
        }
    }
}

pub trait VisitMut {
    fn visit_with<V: VisitorMut>(&mut self, visitor: &mut V) -> ControlFlow<V::Break>;
}

impl VisitMut for Value {
    fn visit_with<V: VisitorMut>(&mut self, visitor: &mut V) -> ControlFlow<V::Break> {
        visitor.visit_value(self)
    }
}

impl VisitMut for Object {
    fn visit_with<V: VisitorMut>(&mut self, visitor: &mut V) -> ControlFlow<V::Break> {
        visitor.visit_object(self)
    }
}

/// Applies `op` to the value of every field named `field`.
///
/// Matching values are handed to `op` and not descended into. Array elements are only
/// searched when they are themselves mappings.
struct FieldOperator<'a, F, E> {
    field: &'a str,
    op: F,
    _error: PhantomData<fn() -> E>,
}

impl<F, E> VisitorMut for FieldOperator<'_, F, E>
where
    F: FnMut(&mut Value) -> Result<(), E>,
{
    type Break = E;

    fn visit_field(&mut self, key: &str, value: &mut Value) -> ControlFlow<E> {
        if key != self.field {
            return self.visit_value(value);
        }

        match (self.op)(value) {
            Ok(()) => ControlFlow::Continue(()),
            Err(err) => ControlFlow::Break(err),
        }
    }

    fn visit_array(&mut self, array: &mut Vec<Value>) -> ControlFlow<E> {
        for item in array.iter_mut() {
            if let Value::Object(object) = item {
                self.visit_object(object)?;
            }
        }

        ControlFlow::Continue(())
    }
}

/// Runs `op` on every value keyed by `field` anywhere in `object`, stopping at the first error.
///
/// Values already rewritten before an error stay rewritten.
pub fn operate_fields<E>(
    object: &mut Object,
    field: &str,
    op: impl FnMut(&mut Value) -> Result<(), E>,
) -> Result<(), E> {
    let mut operator = FieldOperator {
        field,
        op,
        _error: PhantomData,
    };

    match object.visit_with(&mut operator) {
        ControlFlow::Continue(()) => Ok(()),
        ControlFlow::Break(err) => Err(err),
    }
}
