//! Event payload mapping: route gesture/scroll payload fields into values.
//!
//! An `EventHandler` binds positional event arguments to a mapping tree.
//! When an event arrives, the tree is walked against the payload shape and
//! every `Target` leaf whose payload field is numeric receives a
//! `set_value`. The mapping and payload shapes must agree; a structural
//! mismatch or a non-numeric field under a leaf is a usage error. An
//! optional listener then observes the raw payloads synchronously.
//!
//! Payloads are dynamic JSON trees, matching the wire shape events arrive
//! in from the host.

use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

use crate::error::EventError;
use crate::value::Value;

/// One node of the mapping tree.
#[derive(Clone)]
pub enum ArgMapping {
    /// Leaf: feed this payload field into a value node.
    Target(Value),
    /// Match an object payload field by field.
    Map(BTreeMap<String, ArgMapping>),
}

impl ArgMapping {
    /// Leaf mapping into `value`.
    pub fn target(value: &Value) -> Self {
        Self::Target(value.clone())
    }

    /// Object mapping from named fields.
    pub fn map(entries: impl IntoIterator<Item = (&'static str, ArgMapping)>) -> Self {
        Self::Map(
            entries
                .into_iter()
                .map(|(key, mapping)| (key.to_string(), mapping))
                .collect(),
        )
    }
}

/// Maps event payloads onto value nodes.
pub struct EventHandler {
    mappings: Vec<ArgMapping>,
    listener: Option<Box<dyn Fn(&[JsonValue])>>,
}

/// Build an event handler over positional argument mappings.
pub fn event_map(mappings: Vec<ArgMapping>) -> EventHandler {
    EventHandler {
        mappings,
        listener: None,
    }
}

impl EventHandler {
    /// Also pass the raw payloads to `listener` after mapping.
    pub fn with_listener(mut self, listener: impl Fn(&[JsonValue]) + 'static) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }

    /// Apply the mapping to one event's arguments.
    ///
    /// # Panics
    /// Panics when the payload shape disagrees with the mapping; use
    /// [`try_call`] for untrusted payloads.
    ///
    /// [`try_call`]: Self::try_call
    pub fn call(&self, args: &[JsonValue]) {
        if let Err(error) = self.try_call(args) {
            panic!("bad event payload: {error}");
        }
    }

    /// Apply the mapping to one event's arguments, reporting shape errors.
    ///
    /// Fields mapped before an error is found keep their new values.
    pub fn try_call(&self, args: &[JsonValue]) -> Result<(), EventError> {
        if args.len() < self.mappings.len() {
            return Err(EventError::MissingArgument {
                expected: self.mappings.len(),
                got: args.len(),
            });
        }
        for (index, mapping) in self.mappings.iter().enumerate() {
            apply(mapping, &args[index], &format!("[{index}]"))?;
        }
        if let Some(listener) = &self.listener {
            listener(args);
        }
        Ok(())
    }
}

fn apply(mapping: &ArgMapping, payload: &JsonValue, path: &str) -> Result<(), EventError> {
    match mapping {
        ArgMapping::Target(value) => match payload.as_f64() {
            Some(number) => {
                value.set_value(number);
                Ok(())
            }
            None => Err(EventError::NonNumericField {
                path: path.to_string(),
            }),
        },
        ArgMapping::Map(entries) => {
            let Some(object) = payload.as_object() else {
                return Err(EventError::ShapeMismatch {
                    path: path.to_string(),
                });
            };
            for (key, mapping) in entries {
                let Some(field) = object.get(key) else {
                    return Err(EventError::ShapeMismatch {
                        path: format!("{path}.{key}"),
                    });
                };
                apply(mapping, field, &format!("{path}.{key}"))?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use serde_json::json;

    use super::*;

    #[test]
    fn test_maps_nested_fields_into_values() {
        let scroll_x = Value::new(0.0);
        let scroll_y = Value::new(0.0);
        let handler = event_map(vec![ArgMapping::map([(
            "content_offset",
            ArgMapping::map([
                ("x", ArgMapping::target(&scroll_x)),
                ("y", ArgMapping::target(&scroll_y)),
            ]),
        )])]);

        handler.call(&[json!({"content_offset": {"x": 12.5, "y": -3.0}})]);
        assert_eq!(scroll_x.get_value(), 12.5);
        assert_eq!(scroll_y.get_value(), -3.0);
    }

    #[test]
    fn test_extra_arguments_are_ignored() {
        let x = Value::new(0.0);
        let handler = event_map(vec![ArgMapping::target(&x)]);
        handler.call(&[json!(7.0), json!({"unused": true})]);
        assert_eq!(x.get_value(), 7.0);
    }

    #[test]
    fn test_listener_sees_raw_payloads_after_mapping() {
        let x = Value::new(0.0);
        let order = Rc::new(RefCell::new(Vec::new()));

        let order_listener = order.clone();
        let x_probe = x.clone();
        let handler = event_map(vec![ArgMapping::target(&x)]).with_listener(move |args| {
            // Mapping has already run by the time the listener fires.
            order_listener
                .borrow_mut()
                .push((x_probe.get_value(), args[0].clone()));
        });

        handler.call(&[json!(5.0)]);
        assert_eq!(*order.borrow(), vec![(5.0, json!(5.0))]);
    }

    #[test]
    fn test_non_numeric_leaf_is_an_error() {
        let x = Value::new(0.0);
        let handler = event_map(vec![ArgMapping::target(&x)]);
        let error = handler.try_call(&[json!("fast")]).unwrap_err();
        assert!(matches!(error, EventError::NonNumericField { .. }));
    }

    #[test]
    fn test_shape_mismatch_is_an_error() {
        let x = Value::new(0.0);
        let handler = event_map(vec![ArgMapping::map([("dx", ArgMapping::target(&x))])]);

        let error = handler.try_call(&[json!(1.0)]).unwrap_err();
        assert!(matches!(error, EventError::ShapeMismatch { .. }));

        let error = handler.try_call(&[json!({"dy": 1.0})]).unwrap_err();
        assert!(matches!(error, EventError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_missing_argument_is_an_error() {
        let x = Value::new(0.0);
        let handler = event_map(vec![ArgMapping::target(&x)]);
        let error = handler.try_call(&[]).unwrap_err();
        assert_eq!(
            error,
            EventError::MissingArgument {
                expected: 1,
                got: 0
            }
        );
    }

    #[test]
    #[should_panic(expected = "bad event payload")]
    fn test_call_panics_on_mismatch() {
        let x = Value::new(0.0);
        event_map(vec![ArgMapping::target(&x)]).call(&[json!(null)]);
    }
}
