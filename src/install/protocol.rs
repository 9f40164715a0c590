use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Message sent to a worker on stdin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallRequest {
    pub package_name: String,
    /// `latest`, an exact version or a range. Absent means `latest`.
    #[serde(default)]
    pub version: Option<String>,
    pub registry: String,
    /// Package root receiving `<version>/`.
    pub destination_root: PathBuf,
    /// Install this local tree instead of asking the registry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<PathBuf>,
}

/// The single line a worker writes to stdout before exiting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InstallResponse {
    Installed { version: String },
    Failed { error: String },
}

impl InstallResponse {
    pub fn into_result(self) -> Result<String> {
        match self {
            InstallResponse::Installed { version } => Ok(version),
            InstallResponse::Failed { error } => Err(anyhow!(error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_uses_camel_case_keys() {
        let request = InstallRequest {
            package_name: "@svrx/svrx".into(),
            version: Some("1.0.0".into()),
            registry: "https://registry.npmjs.org".into(),
            destination_root: PathBuf::from("/tmp/root/versions"),
            source_path: None,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "packageName": "@svrx/svrx",
                "version": "1.0.0",
                "registry": "https://registry.npmjs.org",
                "destinationRoot": "/tmp/root/versions"
            })
        );
    }

    #[test]
    fn test_request_optional_fields_default() {
        let request: InstallRequest = serde_json::from_value(json!({
            "packageName": "foo",
            "registry": "http://localhost",
            "destinationRoot": "/tmp/foo"
        }))
        .unwrap();
        assert_eq!(request.version, None);
        assert_eq!(request.source_path, None);
    }

    #[test]
    fn test_response_variants() {
        let ok: InstallResponse = serde_json::from_str(r#"{"version":"1.2.3"}"#).unwrap();
        assert_eq!(ok.into_result().unwrap(), "1.2.3");

        let failed: InstallResponse = serde_json::from_str(r#"{"error":"not found"}"#).unwrap();
        assert_eq!(failed.into_result().unwrap_err().to_string(), "not found");

        assert!(serde_json::from_str::<InstallResponse>(r#"{"status":"ok"}"#).is_err());
    }

    #[test]
    fn test_response_serializes_flat() {
        let line = serde_json::to_string(&InstallResponse::Failed {
            error: "boom".into(),
        })
        .unwrap();
        assert_eq!(line, r#"{"error":"boom"}"#);
    }
}
