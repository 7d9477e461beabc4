use super::{Value, ValueKind};

pub trait ValueFormatter {
    fn format(&self, value: &Value) -> String;
}

pub struct DebugFormatter;

impl ValueFormatter for DebugFormatter {
    fn format(&self, value: &Value) -> String {
        format!("{value:?}")
    }
}

/// Renders values the way `print` shows them.
pub struct BasicFormatter;

impl ValueFormatter for BasicFormatter {
    fn format(&self, value: &Value) -> String {
        format!("{value}")
    }
}

/// Renders values together with their kind, e.g. `Number(5)`.
pub struct VerboseFormatter;

impl ValueFormatter for VerboseFormatter {
    fn format(&self, value: &Value) -> String {
        match &value.kind {
            ValueKind::Null => "Null".to_string(),
            ValueKind::String(v) => format!("String(\"{v}\")"),
            ValueKind::Function(function) => format!("Function({})", function.name()),
            ValueKind::Instance(instance) => format!("Instance({})", instance.class.name()),
            _ => format!("{}({value})", value.kind_name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Span;

    #[test]
    fn verbose_rendering_names_the_kind() {
        let span = Span::default();
        assert_eq!(VerboseFormatter.format(&Value::number(5.0, span)), "Number(5)");
        assert_eq!(VerboseFormatter.format(&Value::string("a", span)), "String(\"a\")");
        assert_eq!(
            VerboseFormatter.format(&Value::list(vec![Value::boolean(true, span)], span)),
            "List([true])"
        );
        assert_eq!(VerboseFormatter.format(&Value::null(span)), "Null");
    }
}
