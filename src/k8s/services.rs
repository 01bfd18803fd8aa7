//! Service lookup for installed workloads

use anyhow::{Context, Result};
use k8s_openapi::api::core::v1::Service;
use serde::Deserialize;
use std::path::Path;

use super::kubectl;

/// Services matching every `key=value` selector
pub fn get_services(selectors: &[(String, String)], kubeconfig: Option<&Path>) -> Result<Vec<Service>> {
    let mut args = vec!["get".to_string(), "services".to_string()];
    args.extend(kubectl::selector_args(selectors));
    args.extend(["-o".to_string(), "json".to_string()]);
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    let output = kubectl::run_kubectl_output(&args, kubeconfig)
        .context("Unexpected error getting services")?;
    parse_services(&output)
}

// kubectl answers with `kind: List`, not `ServiceList`, so only the items are read
#[derive(Deserialize)]
struct ServiceItems {
    #[serde(default)]
    items: Vec<Service>,
}

fn parse_services(json: &str) -> Result<Vec<Service>> {
    let list: ServiceItems =
        serde_json::from_str(json).context("Failed to parse kubectl service list")?;
    Ok(list.items)
}

/// Human summary `name type ports` for one service
pub fn describe(service: &Service) -> String {
    let name = service.metadata.name.as_deref().unwrap_or("<unnamed>");
    let spec = service.spec.as_ref();
    let kind = spec
        .and_then(|s| s.type_.as_deref())
        .unwrap_or("ClusterIP");
    let ports = spec
        .and_then(|s| s.ports.as_ref())
        .map(|ports| {
            ports
                .iter()
                .map(|p| match p.node_port {
                    Some(node_port) => format!("{}:{}", p.port, node_port),
                    None => p.port.to_string(),
                })
                .collect::<Vec<_>>()
                .join(",")
        })
        .unwrap_or_default();
    format!("{} {} {}", name, kind, ports)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_services() {
        let json = r#"{
            "apiVersion": "v1",
            "kind": "List",
            "metadata": {"resourceVersion": ""},
            "items": [{
                "apiVersion": "v1",
                "kind": "Service",
                "metadata": {"name": "redis-master"},
                "spec": {"type": "NodePort", "ports": [{"port": 6379, "nodePort": 30079}]}
            }]
        }"#;
        let services = parse_services(json).unwrap();
        assert_eq!(services.len(), 1);
        assert_eq!(describe(&services[0]), "redis-master NodePort 6379:30079");
    }

    #[test]
    fn test_parse_empty_list() {
        let json = r#"{"apiVersion":"v1","kind":"List","metadata":{},"items":[]}"#;
        assert!(parse_services(json).unwrap().is_empty());
    }
}
