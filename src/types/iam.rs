// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! IAM policy documents.

use crate::constants::oidc::POLICY_VERSION;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<Statement>,
}

impl PolicyDocument {
    pub fn new(statement: Vec<Statement>) -> Self {
        Self {
            version: POLICY_VERSION.to_string(),
            statement,
        }
    }

    /// Every action granted by an `Allow` statement
    pub fn allowed_actions(&self) -> impl Iterator<Item = &str> {
        self.statement
            .iter()
            .filter(|s| s.effect == Effect::Allow)
            .flat_map(|s| s.action.iter().map(String::as_str))
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    Allow,
    Deny,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    pub effect: Effect,
    pub action: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<Principal>,
    /// Condition operator → (key → value)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<BTreeMap<String, BTreeMap<String, String>>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Principal {
    pub federated: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_serializes_in_aws_casing() {
        let doc = PolicyDocument::new(vec![Statement {
            effect: Effect::Allow,
            action: vec!["s3:GetObject".to_string()],
            resource: Some(vec!["arn:aws:s3:::bucket/*".to_string()]),
            principal: None,
            condition: None,
        }]);

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["Version"], "2012-10-17");
        assert_eq!(value["Statement"][0]["Effect"], "Allow");
        assert_eq!(value["Statement"][0]["Action"][0], "s3:GetObject");
        assert!(value["Statement"][0].get("Principal").is_none());
    }

    #[test]
    fn test_allowed_actions_skip_deny() {
        let doc = PolicyDocument::new(vec![
            Statement {
                effect: Effect::Allow,
                action: vec!["s3:GetObject".to_string()],
                resource: None,
                principal: None,
                condition: None,
            },
            Statement {
                effect: Effect::Deny,
                action: vec!["s3:PutObject".to_string()],
                resource: None,
                principal: None,
                condition: None,
            },
        ]);

        assert_eq!(doc.allowed_actions().collect::<Vec<_>>(), vec!["s3:GetObject"]);
    }
}
