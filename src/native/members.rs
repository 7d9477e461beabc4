use super::{BuiltInCatalogue, BuiltInFunction};
use crate::value::{SharedMapExt, Value, ValueKind};

pub(super) fn register(catalogue: &mut BuiltInCatalogue) {
    register_any(catalogue);
    register_number(catalogue);
    register_string(catalogue);
    register_list(catalogue);
    register_map(catalogue);
}

fn register_any(catalogue: &mut BuiltInCatalogue) {
    catalogue.register(BuiltInFunction::method("toString", &["this"], |_, call| {
        Ok(Value::string(call.value(0).to_string(), call.span))
    }));
}

fn register_number(catalogue: &mut BuiltInCatalogue) {
    fn rounding(name: &'static str, operation: fn(f64) -> f64) -> BuiltInFunction {
        BuiltInFunction::method(name, &["this"], move |environment, call| {
            let value = call.number(environment, 0)?;
            Ok(Value::number(operation(value), call.span))
        })
    }

    // Halves round towards positive infinity.
    catalogue.register(rounding("round", |v| (v + 0.5).floor()));
    catalogue.register(rounding("roundUp", f64::ceil));
    catalogue.register(rounding("roundDown", f64::floor));
    catalogue.register(BuiltInFunction::method(
        "modulus",
        &["this", "otherNumber"],
        |environment, call| {
            let lhs = call.number(environment, 0)?;
            let rhs = call.number(environment, 1)?;
            Ok(Value::number(lhs % rhs, call.span))
        },
    ));
}

fn register_string(catalogue: &mut BuiltInCatalogue) {
    catalogue.register(BuiltInFunction::method("toList", &["this"], |environment, call| {
        let string = call.string(environment, 0)?;
        let characters = string
            .chars()
            .map(|c| Value::string(c.to_string(), call.span))
            .collect();
        Ok(Value::list(characters, call.span))
    }));
    catalogue.register(BuiltInFunction::method(
        "toNumber",
        &["this"],
        |environment, call| {
            let string = call.string(environment, 0)?;
            let number = string.trim().parse::<f64>().map_err(|_| {
                environment.runtime_error(
                    format!("Cannot parse '{string}' as a number"),
                    call.span,
                )
            })?;
            Ok(Value::number(number, call.span))
        },
    ));
    // `contains` is shared with lists, so it dispatches on the receiver.
    catalogue.register(BuiltInFunction::method(
        "contains",
        &["this", "value"],
        |environment, call| {
            let receiver = call.value(0);
            let needle = call.value(1);
            let found = match &receiver.kind {
                ValueKind::String(string) => {
                    let needle = call.string(environment, 1)?;
                    string.contains(needle.as_str())
                }
                ValueKind::List(list) => {
                    let values = list.lock().clone();
                    values.iter().any(|value| value.is_equal(&needle))
                }
                _ => {
                    return Err(environment
                        .runtime_error(
                            "Must pass String or List into parameter 0 for contains()",
                            call.span,
                        )
                        .into())
                }
            };
            Ok(Value::boolean(found, call.span))
        },
    ));
}

fn register_list(catalogue: &mut BuiltInCatalogue) {
    catalogue.register(BuiltInFunction::method(
        "append",
        &["this", "value"],
        |environment, call| {
            let list = call.list(environment, 0)?;
            list.lock().push(call.value(1));
            Ok(call.value(0))
        },
    ));
    catalogue.register(BuiltInFunction::method(
        "insert",
        &["this", "value", "index"],
        |environment, call| {
            let list = call.list(environment, 0)?;
            let length = list.lock().len();
            let index = call.index(environment, 2, length + 1)?;
            list.lock().insert(index, call.value(1));
            Ok(call.value(0))
        },
    ));
    catalogue.register(BuiltInFunction::method(
        "concat",
        &["this", "otherList"],
        |environment, call| {
            let list = call.list(environment, 0)?;
            let other = call.list(environment, 1)?.lock().clone();
            list.lock().extend(other);
            Ok(call.value(0))
        },
    ));
    // `get` and `remove` are shared with maps.
    catalogue.register(BuiltInFunction::method(
        "get",
        &["this", "key"],
        |environment, call| match &call.value(0).kind {
            ValueKind::List(list) => {
                let values = list.lock().clone();
                let index = call.index(environment, 1, values.len())?;
                Ok(values[index].clone())
            }
            ValueKind::Map(map) => Ok(map
                .lookup(&call.value(1))
                .unwrap_or_else(|| Value::null(call.span))),
            _ => Err(environment
                .runtime_error(
                    "Must pass List or Map into parameter 0 for get()",
                    call.span,
                )
                .into()),
        },
    ));
    catalogue.register(BuiltInFunction::method(
        "remove",
        &["this", "key"],
        |environment, call| match &call.value(0).kind {
            ValueKind::List(list) => {
                let length = list.lock().len();
                let index = call.index(environment, 1, length)?;
                Ok(list.lock().remove(index))
            }
            ValueKind::Map(map) => Ok(map
                .take(&call.value(1))
                .unwrap_or_else(|| Value::null(call.span))),
            _ => Err(environment
                .runtime_error(
                    "Must pass List or Map into parameter 0 for remove()",
                    call.span,
                )
                .into()),
        },
    ));
}

fn register_map(catalogue: &mut BuiltInCatalogue) {
    catalogue.register(BuiltInFunction::method(
        "put",
        &["this", "key", "value"],
        |environment, call| {
            let map = call.map(environment, 0)?;
            let previous = map.store(call.value(1), call.value(2));
            Ok(previous.unwrap_or_else(|| Value::null(call.span)))
        },
    ));
    catalogue.register(BuiltInFunction::method(
        "containsKey",
        &["this", "key"],
        |environment, call| {
            let map = call.map(environment, 0)?;
            let found = map.has_key(&call.value(1));
            Ok(Value::boolean(found, call.span))
        },
    ));
    catalogue.register(BuiltInFunction::method(
        "getKeys",
        &["this"],
        |environment, call| {
            let map = call.map(environment, 0)?;
            let keys = map.lock().keys();
            Ok(Value::list(keys, call.span))
        },
    ));
    catalogue.register(BuiltInFunction::method(
        "getValues",
        &["this"],
        |environment, call| {
            let map = call.map(environment, 0)?;
            let values = map.lock().values();
            Ok(Value::list(values, call.span))
        },
    ));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_members_are_registered_by_arity() {
        let mut catalogue = BuiltInCatalogue::new();
        register(&mut catalogue);
        assert!(catalogue.find("round", 1, true).is_some());
        assert!(catalogue.find("insert", 3, true).is_some());
        assert!(catalogue.find("insert", 2, true).is_none());
        assert!(!catalogue.contains("append"));
    }
}
