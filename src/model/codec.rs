//! Canonical sample encoding
//!
//! A sample is the concatenation, in discovery order, of one field per
//! variable:
//!
//! ```text
//! <name>:<true|false>;                                    Boolean
//! <name>:<numeral>;                                        BitVector / Integer
//! <name>:[<n>;<default>;<idx1>;<val1>;...;]                Array
//! <name>:(<n>;<default>;<arg1_1>;...;<arg1_k>;<val1>;...)   Function
//! ```
//!
//! Leaves never contain `[`, `]`, `(`, `)`, `;` or `:`, so two different
//! models cannot produce the same string.

use crate::error::{Result, SamplerError};
use crate::formula::{SortKind, Variable};
use crate::model::{FunctionTable, Model, Scalar, Value};

/// Characters that structure a sample and may not occur inside a leaf
pub const RESERVED: [char; 6] = ['[', ']', '(', ')', ';', ':'];

/// Encode `model` over `variables` in their discovery order
pub fn encode(model: &Model, variables: &[Variable]) -> Result<String> {
    let mut sample = String::new();

    for var in variables {
        sample.push_str(&var.name);
        sample.push(':');

        match var.kind {
            SortKind::Array => encode_array(&mut sample, var, model.get(&var.name))?,
            SortKind::UninterpretedFunction(_) => {
                encode_function(&mut sample, var, model.get(&var.name))?
            }
            SortKind::Real => return Err(SamplerError::invalid_sort(&var.name, "Real")),
            SortKind::Boolean | SortKind::BitVector(_) | SortKind::Integer => {
                let leaf = match model.get(&var.name) {
                    Some(Value::Scalar(scalar)) => {
                        check_scalar_kind(var, scalar)?;
                        encode_leaf(scalar)?
                    }
                    Some(_) => {
                        return Err(SamplerError::codec(
                            &var.name,
                            "expected a scalar value",
                        ));
                    }
                    None => encode_leaf(&default_leaf(var)?)?,
                };
                sample.push_str(&leaf);
                sample.push(';');
            }
        }
    }

    Ok(sample)
}

/// Render one scalar. Bit-vectors are written as exactly `width` binary
/// digits, most significant first.
pub fn encode_leaf(scalar: &Scalar) -> Result<String> {
    match scalar {
        Scalar::Bool(b) => Ok(b.to_string()),
        Scalar::Int(i) => Ok(i.to_string()),
        Scalar::BitVec { width, value } => {
            let digits = value.to_str_radix(2);
            let width = *width as usize;
            if digits.len() > width {
                return Err(SamplerError::codec(
                    digits,
                    format!("value does not fit in {} bits", width),
                ));
            }
            Ok(format!("{:0>width$}", digits, width = width))
        }
    }
}

fn check_scalar_kind(var: &Variable, scalar: &Scalar) -> Result<()> {
    let matches = match (var.kind, scalar) {
        (SortKind::Boolean, Scalar::Bool(_)) => true,
        (SortKind::Integer, Scalar::Int(_)) => true,
        (SortKind::BitVector(expected), Scalar::BitVec { width, .. }) => expected == *width,
        _ => false,
    };
    if matches {
        Ok(())
    } else {
        Err(SamplerError::codec(
            &var.name,
            format!("value {:?} does not match sort {}", scalar, var.kind),
        ))
    }
}

fn default_leaf(var: &Variable) -> Result<Scalar> {
    Scalar::default_for(&var.range).ok_or_else(|| SamplerError::invalid_sort(&var.name, &var.range))
}

fn encode_array(sample: &mut String, var: &Variable, value: Option<&Value>) -> Result<()> {
    let array = match value {
        Some(Value::Array(interp)) => interp.normalize(),
        Some(_) => return Err(SamplerError::codec(&var.name, "expected an array value")),
        None => {
            sample.push_str(&format!("[0;{};]", encode_leaf(&default_leaf(var)?)?));
            return Ok(());
        }
    };

    sample.push('[');
    sample.push_str(&array.entries.len().to_string());
    sample.push(';');
    sample.push_str(&encode_leaf(&array.default)?);
    sample.push(';');
    for (index, element) in &array.entries {
        sample.push_str(&encode_leaf(index)?);
        sample.push(';');
        sample.push_str(&encode_leaf(element)?);
        sample.push(';');
    }
    sample.push(']');
    Ok(())
}

fn encode_function(sample: &mut String, var: &Variable, value: Option<&Value>) -> Result<()> {
    let empty;
    let table = match value {
        Some(Value::Function(table)) => table,
        Some(_) => return Err(SamplerError::codec(&var.name, "expected a function value")),
        None => {
            empty = FunctionTable {
                default: default_leaf(var)?,
                entries: Vec::new(),
            };
            &empty
        }
    };

    sample.push('(');
    sample.push_str(&table.entries.len().to_string());
    sample.push(';');
    sample.push_str(&encode_leaf(&table.default)?);
    sample.push(';');
    for (args, result) in &table.entries {
        for arg in args {
            sample.push_str(&encode_leaf(arg)?);
            sample.push(';');
        }
        sample.push_str(&encode_leaf(result)?);
        sample.push(';');
    }
    sample.push(')');
    Ok(())
}
