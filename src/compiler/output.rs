//! Parsing of the Standard-JSON compiler output shape (§4.2). Everything
//! this driver compiles -- raw single-source text included, wrapped into an
//! equivalent document by [`crate::compiler::driver::standard_json_from_single_source`]
//! -- goes through `--standard-json`, since it is the only shape carrying
//! runtime bytecode (`evm.deployedBytecode.object`) and immutable
//! references.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::types::{ImmutableReference, ImmutableReferences};

/// One compiled contract.
#[derive(Debug, Clone)]
pub struct ParsedContract {
    pub file: String,
    pub name: String,
    pub runtime_bytecode: String,
    pub abi: String,
    pub metadata: String,
    pub immutable_references: ImmutableReferences,
}

/// `solc --standard-json` output.
pub fn parse_standard_json(raw: &str) -> Result<Vec<ParsedContract>, String> {
    #[derive(Deserialize)]
    struct StandardJsonOutput {
        #[serde(default)]
        errors: Vec<StandardJsonError>,
        #[serde(default)]
        contracts: BTreeMap<String, BTreeMap<String, StandardJsonContract>>,
    }
    #[derive(Deserialize)]
    struct StandardJsonError {
        severity: String,
        #[serde(default)]
        formatted_message: Option<String>,
        #[serde(default)]
        message: String,
    }
    #[derive(Deserialize)]
    struct StandardJsonContract {
        #[serde(default)]
        abi: Value,
        #[serde(default)]
        metadata: String,
        evm: StandardJsonEvm,
    }
    #[derive(Deserialize)]
    struct StandardJsonEvm {
        #[serde(rename = "deployedBytecode", default)]
        deployed_bytecode: StandardJsonDeployedBytecode,
    }
    #[derive(Default, Deserialize)]
    struct StandardJsonDeployedBytecode {
        #[serde(default)]
        object: String,
        #[serde(rename = "immutableReferences", default)]
        immutable_references: BTreeMap<String, Vec<RawImmutableReference>>,
    }
    #[derive(Deserialize)]
    struct RawImmutableReference {
        start: usize,
        length: usize,
    }

    let parsed: StandardJsonOutput =
        serde_json::from_str(raw).map_err(|e| format!("malformed standard-json output: {e}"))?;

    let errors: Vec<String> = parsed
        .errors
        .iter()
        .filter(|e| e.severity == "error")
        .map(|e| {
            e.formatted_message
                .clone()
                .unwrap_or_else(|| e.message.clone())
        })
        .collect();
    if !errors.is_empty() {
        return Err(errors.join("\n"));
    }

    let mut contracts = Vec::new();
    for (file, by_name) in parsed.contracts {
        for (name, contract) in by_name {
            let immutable_references = contract
                .evm
                .deployed_bytecode
                .immutable_references
                .into_iter()
                .map(|(node_id, refs)| {
                    (
                        node_id,
                        refs.into_iter()
                            .map(|r| ImmutableReference {
                                start: r.start,
                                length: r.length,
                            })
                            .collect(),
                    )
                })
                .collect();

            contracts.push(ParsedContract {
                file: file.clone(),
                name,
                runtime_bytecode: contract.evm.deployed_bytecode.object,
                abi: contract.abi.to_string(),
                metadata: contract.metadata,
                immutable_references,
            });
        }
    }
    Ok(contracts)
}

/// Contract selection (§4.2): when `contract_name` contains a single `:`,
/// both file and name must match; otherwise only the name must match. When
/// empty, the first contract in iteration order is returned. Returns `None`
/// when nothing matches a non-empty selector, or when the set is empty.
pub fn select_contract<'a>(
    contracts: &'a [ParsedContract],
    contract_name: Option<&str>,
) -> Option<&'a ParsedContract> {
    match contract_name {
        None => contracts.first(),
        Some(selector) if selector.is_empty() => contracts.first(),
        Some(selector) => {
            if let Some((file, name)) = selector.split_once(':') {
                contracts.iter().find(|c| c.file == file && c.name == name)
            } else {
                contracts.iter().find(|c| c.name == selector)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_standard_json_runtime_bytecode_and_immutables() {
        let raw = r#"{
            "contracts": {
                "A.sol": {
                    "Foo": {
                        "abi": [],
                        "metadata": "{}",
                        "evm": {
                            "deployedBytecode": {
                                "object": "6080604052",
                                "immutableReferences": {
                                    "100": [{"start": 5, "length": 10}]
                                }
                            }
                        }
                    }
                }
            }
        }"#;
        let contracts = parse_standard_json(raw).unwrap();
        assert_eq!(contracts.len(), 1);
        assert_eq!(contracts[0].runtime_bytecode, "6080604052");
        assert_eq!(
            contracts[0].immutable_references.get("100").unwrap()[0].start,
            5
        );
    }

    #[test]
    fn standard_json_errors_fail_compilation() {
        let raw = r#"{
            "errors": [{"severity": "error", "message": "boom"}],
            "contracts": {}
        }"#;
        let err = parse_standard_json(raw).unwrap_err();
        assert!(err.contains("boom"));
    }

    #[test]
    fn standard_json_warnings_do_not_fail_compilation() {
        let raw = r#"{
            "errors": [{"severity": "warning", "message": "unused variable"}],
            "contracts": {
                "A.sol": {
                    "Foo": {
                        "abi": [],
                        "metadata": "{}",
                        "evm": {"deployedBytecode": {"object": "60", "immutableReferences": {}}}
                    }
                }
            }
        }"#;
        assert!(parse_standard_json(raw).is_ok());
    }

    #[test]
    fn select_contract_by_name_only() {
        let contracts = vec![
            ParsedContract {
                file: "A.sol".into(),
                name: "Foo".into(),
                runtime_bytecode: "aa".into(),
                abi: "[]".into(),
                metadata: "{}".into(),
                immutable_references: ImmutableReferences::new(),
            },
            ParsedContract {
                file: "B.sol".into(),
                name: "Bar".into(),
                runtime_bytecode: "bb".into(),
                abi: "[]".into(),
                metadata: "{}".into(),
                immutable_references: ImmutableReferences::new(),
            },
        ];
        let selected = select_contract(&contracts, Some("Bar")).unwrap();
        assert_eq!(selected.name, "Bar");
    }

    #[test]
    fn select_contract_by_file_and_name() {
        let contracts = vec![
            ParsedContract {
                file: "A.sol".into(),
                name: "Foo".into(),
                runtime_bytecode: "aa".into(),
                abi: "[]".into(),
                metadata: "{}".into(),
                immutable_references: ImmutableReferences::new(),
            },
            ParsedContract {
                file: "B.sol".into(),
                name: "Foo".into(),
                runtime_bytecode: "bb".into(),
                abi: "[]".into(),
                metadata: "{}".into(),
                immutable_references: ImmutableReferences::new(),
            },
        ];
        let selected = select_contract(&contracts, Some("B.sol:Foo")).unwrap();
        assert_eq!(selected.runtime_bytecode, "bb");
    }

    #[test]
    fn select_contract_defaults_to_first_when_unselected() {
        let contracts = vec![ParsedContract {
            file: "A.sol".into(),
            name: "Foo".into(),
            runtime_bytecode: "aa".into(),
            abi: "[]".into(),
            metadata: "{}".into(),
            immutable_references: ImmutableReferences::new(),
        }];
        assert_eq!(select_contract(&contracts, None).unwrap().name, "Foo");
    }

    #[test]
    fn contract_selection_is_stable_across_calls() {
        let raw = r#"{
            "contracts": {
                "A.sol": {
                    "Foo": {
                        "abi": [],
                        "metadata": "{}",
                        "evm": {"deployedBytecode": {"object": "aa", "immutableReferences": {}}}
                    }
                }
            }
        }"#;
        let first = parse_standard_json(raw).unwrap();
        let second = parse_standard_json(raw).unwrap();
        let a = select_contract(&first, Some("Foo")).unwrap();
        let b = select_contract(&second, Some("Foo")).unwrap();
        assert_eq!(a.runtime_bytecode, b.runtime_bytecode);
    }
}
