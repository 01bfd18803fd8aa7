//! Enhanced error types with actionable suggestions

use colored::Colorize;
use thiserror::Error;

use crate::backend::BackendError;

/// Enhanced error with suggestions and documentation links
#[derive(Error, Debug)]
#[error("{message}")]
pub struct AppcoError {
    pub message: String,
    pub suggestions: Vec<String>,
    pub docs_link: Option<String>,
}

impl AppcoError {
    /// Create a new error with suggestions
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestions: Vec::new(),
            docs_link: None,
        }
    }

    /// Add a suggestion to the error
    pub fn suggest(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Add a documentation link
    pub fn with_docs(mut self, link: impl Into<String>) -> Self {
        self.docs_link = Some(link.into());
        self
    }

    /// Display the error with suggestions
    pub fn display(&self) {
        eprintln!("{} {}", "Error:".red().bold(), self.message);

        if !self.suggestions.is_empty() {
            eprintln!();
            eprintln!("{}", "Suggestions:".yellow().bold());
            for suggestion in &self.suggestions {
                eprintln!("  {} {}", "→".blue(), suggestion);
            }
        }

        if let Some(docs) = &self.docs_link {
            eprintln!();
            eprintln!("{} {}", "Documentation:".cyan(), docs);
        }
    }

    // Common error patterns

    /// Registry rejected the username/token pair
    pub fn invalid_credentials() -> Self {
        Self::new("Invalid authentication pair")
            .suggest("Verify the username (your account e-mail) and the access token")
            .suggest("Generate a new access token if the current one expired")
            .with_docs("https://docs.apps.rancher.io/")
    }

    /// Tool not found error
    pub fn tool_not_found(tool: &str, install_hint: &str) -> Self {
        Self::new(format!("Required tool '{}' not found", tool))
            .suggest(format!("Install with: {}", install_hint))
            .suggest("Ensure the tool is in your PATH")
    }

    /// Docker daemon is not answering
    pub fn docker_unavailable() -> Self {
        Self::new("Docker daemon is not reachable")
            .suggest("Start Docker Desktop or the docker service")
            .suggest("Check with: docker info")
    }

    /// Kubernetes cluster is not answering
    pub fn cluster_unreachable() -> Self {
        Self::new("Kubernetes cluster is not reachable")
            .suggest("Enable Kubernetes in Docker Desktop settings")
            .suggest("Check the current context with: kubectl config current-context")
            .suggest("Use --kubeconfig to point at a different cluster")
    }

    /// Pull secret missing before an install/upgrade
    pub fn pull_secret_missing(secret: &str) -> Self {
        Self::new(format!(
            "Secret {} does not exist. Please refresh the authentication settings.",
            secret
        ))
        .suggest("Run: appco auth login")
    }

    /// Backend service is down or unreachable
    pub fn backend_unreachable(url: &str) -> Self {
        Self::new(format!("Extension backend is not reachable at {}", url))
            .suggest("Start it with: appco serve")
            .suggest("Use --backend-url or APPCO_BACKEND_URL to point at a running backend")
    }

    /// Release lookup failed
    pub fn release_not_found(name: &str) -> Self {
        Self::new(format!("Workload does not exist: {}", name))
            .suggest("List installed workloads with: appco releases list")
    }

    /// Permission denied error
    pub fn permission_denied(operation: &str) -> Self {
        Self::new(format!("Permission denied: {}", operation))
            .suggest("Verify you have sufficient cluster permissions")
            .suggest("Check that the registry account can access the Application Collection")
    }
}

/// Helper to display error and exit
pub fn display_error_and_exit(error: AppcoError) -> ! {
    error.display();
    std::process::exit(1);
}

/// Convert anyhow error to AppcoError when possible
pub fn enhance_error(err: anyhow::Error) -> AppcoError {
    if let Some(known) = err.downcast_ref::<AppcoError>() {
        return AppcoError {
            message: known.message.clone(),
            suggestions: known.suggestions.clone(),
            docs_link: known.docs_link.clone(),
        };
    }

    if let Some(BackendError::Unreachable { url, .. } | BackendError::Timeout { url }) =
        err.downcast_ref::<BackendError>()
    {
        return AppcoError::backend_unreachable(url);
    }

    // Include the whole context chain so stderr of the failing CLI is matched too
    let err_str = format!("{:#}", err);

    if err_str.contains("401 Unauthorized") || err_str.contains("Invalid authentication pair") {
        return AppcoError::invalid_credentials();
    }

    if let Some(tool) = extract_missing_tool(&err_str) {
        let hint = match tool {
            "helm" => "https://helm.sh/docs/intro/install/",
            "kubectl" => "https://kubernetes.io/docs/tasks/tools/",
            "docker" => "https://docs.docker.com/get-docker/",
            _ => "your package manager",
        };
        return AppcoError::tool_not_found(tool, hint);
    }

    if err_str.contains("Cannot connect to the Docker daemon") {
        return AppcoError::docker_unavailable();
    }

    if err_str.contains("connection refused") || err_str.contains("Unable to connect to the server")
    {
        return AppcoError::cluster_unreachable();
    }

    if err_str.contains("unauthorized") || err_str.contains("forbidden") {
        return AppcoError::permission_denied("cluster operation");
    }

    // Default error with generic suggestion
    AppcoError::new(err_str)
        .suggest("Run with --verbose for more details")
        .suggest("Check logs for additional context")
}

/// Extract the tool name from a "Required tool 'x' not found" message
fn extract_missing_tool(msg: &str) -> Option<&str> {
    let marker = "Required tool '";
    let start = msg.find(marker)? + marker.len();
    let end = msg[start..].find('\'')?;
    Some(&msg[start..start + end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_with_docs() {
        let err = AppcoError::new("test error").with_docs("https://example.com");
        assert!(err.docs_link.is_some());
    }

    #[test]
    fn test_error_suggestions() {
        let err = AppcoError::new("test")
            .suggest("suggestion 1")
            .suggest("suggestion 2");
        assert_eq!(err.suggestions.len(), 2);
    }

    #[test]
    fn test_enhance_unauthorized() {
        let err = anyhow::anyhow!("Error response from daemon: login attempt failed with status: 401 Unauthorized");
        assert_eq!(enhance_error(err).message, "Invalid authentication pair");
    }

    #[test]
    fn test_enhance_missing_tool() {
        let err = anyhow::anyhow!("Required tool 'helm' not found on PATH");
        let enhanced = enhance_error(err);
        assert!(enhanced.message.contains("helm"));
        assert!(enhanced.suggestions[0].contains("helm.sh"));
    }

    #[test]
    fn test_enhance_keeps_known_error() {
        let err: anyhow::Error = AppcoError::pull_secret_missing("application-collection").into();
        let enhanced = enhance_error(err);
        assert!(enhanced.message.starts_with("Secret application-collection does not exist"));
        assert_eq!(enhanced.suggestions.len(), 1);
    }

    #[test]
    fn test_enhance_backend_timeout() {
        let err: anyhow::Error = BackendError::Timeout {
            url: "http://127.0.0.1:7171/notifications".to_string(),
        }
        .into();
        let enhanced = enhance_error(err.context("Failed to list notifications"));
        assert!(enhanced.message.contains("127.0.0.1:7171"));
        assert!(enhanced.suggestions[0].contains("appco serve"));
    }

    #[test]
    fn test_enhance_fallback() {
        let enhanced = enhance_error(anyhow::anyhow!("something odd"));
        assert_eq!(enhanced.message, "something odd");
        assert_eq!(enhanced.suggestions.len(), 2);
    }
}
