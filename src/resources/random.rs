// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Generated credentials.
//!
//! Passwords are generated in process the first time the declaration converges and are
//! kept in state afterwards; they only change when the declaration itself changes.

use crate::error::{InfraError, Result};
use crate::graph::Declare;
use crate::output::Output;
use crate::resource::{Declaration, Input, ResourceKind, Urn};
use rand::Rng;
use serde_json::{json, Value};

const ALPHANUMERIC: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const SPECIAL: &[u8] = b"!#$%&*()-_=+[]{}<>:?";
const MAX_LENGTH: usize = 128;

#[derive(Debug, Clone, Copy)]
pub struct RandomPasswordArgs {
    pub length: usize,
    pub special: bool,
}

#[derive(Debug, Clone)]
pub struct RandomPassword {
    urn: Urn,
}

impl RandomPassword {
    pub fn declare(graph: &mut impl Declare, name: &str, args: RandomPasswordArgs) -> Result<Self> {
        if args.length == 0 || args.length > MAX_LENGTH {
            return Err(InfraError::config(format!(
                "password {} length must be between 1 and {}, got {}",
                name, MAX_LENGTH, args.length
            )));
        }
        let inputs = Input::object([
            ("length", Input::from(args.length)),
            ("special", Input::from(args.special)),
        ]);
        let urn = graph.declare(Declaration::new(ResourceKind::RandomPassword, name, inputs))?;
        Ok(Self { urn })
    }

    pub fn urn(&self) -> &Urn {
        &self.urn
    }

    pub fn result(&self) -> Output<String> {
        Output::<String>::property(&self.urn, "/result").secret()
    }
}

pub fn generate_password(length: usize, special: bool) -> String {
    let mut rng = rand::thread_rng();
    let alphabet: Vec<u8> = if special {
        [ALPHANUMERIC, SPECIAL].concat()
    } else {
        ALPHANUMERIC.to_vec()
    };
    (0..length)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
        .collect()
}

/// Outputs of a password declaration from its resolved inputs
pub(crate) fn evaluate(urn: &Urn, inputs: &Value) -> Result<Value> {
    let length = inputs
        .get("length")
        .and_then(Value::as_u64)
        .ok_or_else(|| InfraError::MissingInput {
            urn: urn.clone(),
            input: "length".to_string(),
        })?;
    let special = inputs
        .get("special")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    Ok(json!({
        "length": length,
        "special": special,
        "result": generate_password(length as usize, special),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::DeclarationGraph;

    #[test]
    fn test_generate_password_length_and_alphabet() {
        let password = generate_password(16, false);
        assert_eq!(password.len(), 16);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generate_password_with_special_stays_in_alphabet() {
        let password = generate_password(64, true);
        assert!(password
            .bytes()
            .all(|b| ALPHANUMERIC.contains(&b) || SPECIAL.contains(&b)));
    }

    #[test]
    fn test_result_is_secret() {
        let mut graph = DeclarationGraph::new();
        let pw = RandomPassword::declare(
            &mut graph,
            "mlflow-db-password",
            RandomPasswordArgs {
                length: 16,
                special: false,
            },
        )
        .unwrap();
        assert!(pw.result().is_secret());
        assert!(pw.result().depends_on(pw.urn()));
    }

    #[test]
    fn test_zero_length_is_rejected() {
        let mut graph = DeclarationGraph::new();
        let args = RandomPasswordArgs {
            length: 0,
            special: false,
        };
        assert!(RandomPassword::declare(&mut graph, "pw", args).is_err());
    }

    #[test]
    fn test_evaluate_produces_result() {
        let urn = Urn::from("random:index:RandomPassword::pw");
        let outputs = evaluate(&urn, &json!({"length": 12, "special": false})).unwrap();
        assert_eq!(outputs["result"].as_str().unwrap().len(), 12);
        assert!(evaluate(&urn, &json!({})).is_err());
    }
}
