//! Expression evaluation: bind a parsed call against an item and dispatch
//! it to a built-in or an add-on function.
//!
//! A call that cannot be dispatched produces no value. Results other than
//! text and booleans are discarded.

use std::fmt;

use pagemorph_connectors::{ContentItem, FieldValue, FunctionValue};
use pagemorph_core::{
    parse_function_call, ArgumentKind, FieldValueType, FunctionCall, FunctionParseError,
};

use crate::functions;
use crate::registry::{AddOnRegistry, Lookup};

/// Accepted function output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputValue {
    Text(String),
    Bool(bool),
}

impl OutputValue {
    pub fn into_field_value(self) -> FieldValue {
        match self {
            OutputValue::Text(s) => FieldValue::Text(s),
            OutputValue::Bool(b) => FieldValue::Bool(b),
        }
    }
}

impl fmt::Display for OutputValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputValue::Text(s) => f.write_str(s),
            OutputValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// How a call was dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallStatus {
    Completed,
    /// No built-in with this name and arity.
    UnknownBuiltin,
    /// No add-on is registered under the namespace.
    UnknownNamespace,
    /// The add-on exists but has no such member.
    UnknownMember,
    /// The function returned a value of a type that is not accepted.
    Discarded { type_name: &'static str },
}

/// The output binding and value of one evaluated call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub output: String,
    pub value: Option<OutputValue>,
    pub status: CallStatus,
}

impl Evaluation {
    fn empty(output: &str, status: CallStatus) -> Self {
        Evaluation {
            output: output.to_string(),
            value: None,
            status,
        }
    }

    /// `true` when the call could not be dispatched at all.
    pub fn is_not_found(&self) -> bool {
        self.status == CallStatus::UnknownBuiltin || self.is_missing_add_on()
    }

    /// `true` when a namespaced call found no add-on function. Unlike an
    /// unknown built-in this is worth reporting.
    pub fn is_missing_add_on(&self) -> bool {
        matches!(
            self.status,
            CallStatus::UnknownNamespace | CallStatus::UnknownMember
        )
    }
}

/// Fill in the runtime value of every field-reference argument.
///
/// Values are read from `item` according to `value_type`: identity fields
/// yield their principal keys, everything else its plain rendering. A
/// field the item does not carry binds to the empty string.
pub fn bind_arguments(call: &mut FunctionCall, item: &ContentItem, value_type: FieldValueType) {
    for argument in &mut call.arguments {
        if argument.kind != ArgumentKind::Field {
            continue;
        }
        argument.value_type = value_type;
        argument.value = match item.get(&argument.text) {
            Some(value) if value_type == FieldValueType::Identity => value.identity_key(),
            Some(value) => value.render(),
            None => String::new(),
        };
    }
}

/// Evaluates calls against the built-in table and one add-on registry.
pub struct Evaluator<'r> {
    registry: &'r mut AddOnRegistry,
}

impl<'r> Evaluator<'r> {
    pub fn new(registry: &'r mut AddOnRegistry) -> Self {
        Evaluator { registry }
    }

    /// Parse `expression` for field `field_name`, bind it against `item`
    /// and run it.
    pub fn evaluate(
        &mut self,
        expression: &str,
        field_name: &str,
        value_type: FieldValueType,
        item: &ContentItem,
    ) -> Result<Evaluation, FunctionParseError> {
        let mut call = parse_function_call(expression, field_name)?;
        bind_arguments(&mut call, item, value_type);
        Ok(self.call(&call))
    }

    /// Run an already bound call.
    pub fn call(&mut self, call: &FunctionCall) -> Evaluation {
        let result = match &call.namespace {
            None => {
                let Some(builtin) = functions::lookup(&call.name, call.arguments.len()) else {
                    tracing::debug!(
                        function = %call.name,
                        arity = call.arguments.len(),
                        "no built-in function with this name and arity"
                    );
                    return Evaluation::empty(&call.output, CallStatus::UnknownBuiltin);
                };
                let args: Vec<&str> = call.arguments.iter().map(|a| a.value.as_str()).collect();
                builtin.call(&args)
            }
            Some(namespace) => match self.registry.lookup(namespace, &call.name) {
                Lookup::Found => match self.registry.invoke(namespace, &call.name, &call.arguments)
                {
                    Some(value) => value,
                    None => return Evaluation::empty(&call.output, CallStatus::UnknownMember),
                },
                Lookup::UnknownNamespace => {
                    tracing::warn!(
                        function = %call.qualified_name(),
                        "add-on namespace is not registered"
                    );
                    return Evaluation::empty(&call.output, CallStatus::UnknownNamespace);
                }
                Lookup::UnknownFunction => {
                    tracing::warn!(
                        function = %call.qualified_name(),
                        "add-on has no such function"
                    );
                    return Evaluation::empty(&call.output, CallStatus::UnknownMember);
                }
            },
        };

        match result {
            FunctionValue::Text(s) => Evaluation {
                output: call.output.clone(),
                value: Some(OutputValue::Text(s)),
                status: CallStatus::Completed,
            },
            FunctionValue::Bool(b) => Evaluation {
                output: call.output.clone(),
                value: Some(OutputValue::Bool(b)),
                status: CallStatus::Completed,
            },
            other => {
                let type_name = match other {
                    FunctionValue::Integer(_) => "integer",
                    FunctionValue::List(_) => "list",
                    _ => "null",
                };
                tracing::debug!(
                    function = %call.qualified_name(),
                    type_name,
                    "discarding non-text function result"
                );
                Evaluation::empty(&call.output, CallStatus::Discarded { type_name })
            }
        }
    }
}
