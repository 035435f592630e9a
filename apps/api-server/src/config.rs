use ai::llm::openai::OpenAI;
use anyhow::{anyhow, Context};
use roof_inspection::{InspectionSettings, VerdictPolicy};
use std::{fmt, net::SocketAddr, path::PathBuf, str::FromStr};

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1/";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4-vision-preview";
const DEFAULT_AZURE_API_VERSION: &str = "2024-02-01";
const DEFAULT_MAX_NEW_TOKENS: usize = 1024;
const DEFAULT_IMAGE_DIR: &str = "images";
const DEFAULT_LISTEN_ADDR: &str = "[::]:3001";
const DEFAULT_SIDEBAR_TITLE: &str = "BMW Innovation Challenge: Use Case 8";
const DEFAULT_SIDEBAR_TEXT: &str =
    "Members: Siddhi Gunaji, Chaitya Teli, Mridul Koshy, Philip Modayil";

#[derive(Clone)]
pub enum InferenceEndpoint {
    OpenAI {
        base_url: String,
        api_key: String,
        model: String,
    },
    Azure {
        endpoint: String,
        api_key: String,
        deployment: String,
        api_version: String,
    },
}

// keys stay out of logs
impl fmt::Debug for InferenceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenAI { base_url, model, .. } => f
                .debug_struct("OpenAI")
                .field("base_url", base_url)
                .field("model", model)
                .finish_non_exhaustive(),
            Self::Azure {
                endpoint,
                deployment,
                api_version,
                ..
            } => f
                .debug_struct("Azure")
                .field("endpoint", endpoint)
                .field("deployment", deployment)
                .field("api_version", api_version)
                .finish_non_exhaustive(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Sidebar {
    pub title: String,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub endpoint: InferenceEndpoint,
    pub max_new_tokens: usize,
    pub image_dir: PathBuf,
    pub output_path: Option<PathBuf>,
    pub verdict_policy: VerdictPolicy,
    pub listen_addr: SocketAddr,
    pub sidebar: Sidebar,
    pub log_dir: Option<PathBuf>,
}

impl Config {
    /// Reads the process environment. Load `.env` before calling this.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        // empty values count as unset
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let endpoint = match get("AZURE_OPENAI_ENDPOINT") {
            Some(endpoint) => InferenceEndpoint::Azure {
                endpoint,
                api_key: get("AZURE_OPENAI_API_KEY")
                    .ok_or(anyhow!("'$AZURE_OPENAI_API_KEY' is not set"))?,
                deployment: get("AZURE_OPENAI_DEPLOYMENT")
                    .ok_or(anyhow!("'$AZURE_OPENAI_DEPLOYMENT' is not set"))?,
                api_version: get("AZURE_OPENAI_API_VERSION")
                    .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string()),
            },
            None => InferenceEndpoint::OpenAI {
                base_url: get("OPENAI_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
                api_key: get("OPENAI_API_KEY").ok_or(anyhow!("'$OPENAI_API_KEY' is not set"))?,
                model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            },
        };

        let max_new_tokens = match get("MAX_NEW_TOKENS") {
            Some(v) => v
                .parse()
                .with_context(|| format!("invalid MAX_NEW_TOKENS: {}", v))?,
            None => DEFAULT_MAX_NEW_TOKENS,
        };

        let verdict_policy = match get("VERDICT_POLICY") {
            Some(v) => VerdictPolicy::from_str(&v)
                .with_context(|| format!("invalid VERDICT_POLICY: {}", v))?,
            None => VerdictPolicy::default(),
        };

        let listen_addr = get("LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr = listen_addr
            .parse()
            .with_context(|| format!("invalid LISTEN_ADDR: {}", listen_addr))?;

        Ok(Self {
            endpoint,
            max_new_tokens,
            image_dir: get("IMAGE_DIR")
                .unwrap_or_else(|| DEFAULT_IMAGE_DIR.to_string())
                .into(),
            output_path: get("OUTPUT_PATH").map(PathBuf::from),
            verdict_policy,
            listen_addr,
            sidebar: Sidebar {
                title: get("SIDEBAR_TITLE").unwrap_or_else(|| DEFAULT_SIDEBAR_TITLE.to_string()),
                text: get("SIDEBAR_TEXT").unwrap_or_else(|| DEFAULT_SIDEBAR_TEXT.to_string()),
            },
            log_dir: get("LOCAL_LOG_DIR").map(PathBuf::from),
        })
    }

    pub fn inspection_settings(&self) -> InspectionSettings {
        InspectionSettings {
            image_dir: self.image_dir.clone(),
            output_path: self.output_path.clone(),
            verdict_policy: self.verdict_policy,
        }
    }

    pub fn create_model(&self) -> anyhow::Result<OpenAI> {
        match &self.endpoint {
            InferenceEndpoint::OpenAI {
                base_url,
                api_key,
                model,
            } => OpenAI::new(base_url, api_key, model),
            InferenceEndpoint::Azure {
                endpoint,
                api_key,
                deployment,
                api_version,
            } => OpenAI::new_azure(endpoint, api_key, deployment, api_version),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_with_only_api_key() {
        let config = config(&[("OPENAI_API_KEY", "sk-test")]).unwrap();

        assert!(matches!(
            &config.endpoint,
            InferenceEndpoint::OpenAI { model, base_url, .. }
                if model == DEFAULT_OPENAI_MODEL && base_url == DEFAULT_OPENAI_BASE_URL
        ));
        assert_eq!(config.max_new_tokens, 1024);
        assert_eq!(config.image_dir, PathBuf::from("images"));
        assert_eq!(config.output_path, None);
        assert_eq!(config.verdict_policy, VerdictPolicy::AsIs);
        assert_eq!(config.listen_addr.port(), 3001);
        assert!(config.create_model().is_ok());
    }

    #[test]
    fn api_key_is_required() {
        let err = config(&[("OPENAI_API_KEY", "  ")]).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn azure_endpoint_switches_mode() {
        let config = config(&[
            ("AZURE_OPENAI_ENDPOINT", "https://example.openai.azure.com/"),
            ("AZURE_OPENAI_API_KEY", "azure-key"),
            ("AZURE_OPENAI_DEPLOYMENT", "gpt-4v"),
        ])
        .unwrap();

        assert!(matches!(
            &config.endpoint,
            InferenceEndpoint::Azure { api_version, .. } if api_version == DEFAULT_AZURE_API_VERSION
        ));
        assert_eq!(config.create_model().unwrap().model(), "gpt-4v");
    }

    #[test]
    fn reads_paths_and_policy() {
        let config = config(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("IMAGE_DIR", "/data/drone"),
            ("OUTPUT_PATH", "output.json"),
            ("VERDICT_POLICY", "normalize"),
            ("MAX_NEW_TOKENS", "300"),
            ("LISTEN_ADDR", "127.0.0.1:8080"),
        ])
        .unwrap();

        let settings = config.inspection_settings();
        assert_eq!(settings.image_dir, PathBuf::from("/data/drone"));
        assert_eq!(settings.output_path, Some(PathBuf::from("output.json")));
        assert_eq!(settings.verdict_policy, VerdictPolicy::Normalize);
        assert_eq!(config.max_new_tokens, 300);
        assert_eq!(config.listen_addr.to_string(), "127.0.0.1:8080");
    }

    #[test]
    fn rejects_bad_values() {
        assert!(config(&[("OPENAI_API_KEY", "k"), ("MAX_NEW_TOKENS", "lots")]).is_err());
        assert!(config(&[("OPENAI_API_KEY", "k"), ("VERDICT_POLICY", "strict")]).is_err());
    }

    #[test]
    fn debug_output_hides_key() {
        let config = config(&[("OPENAI_API_KEY", "sk-secret")]).unwrap();
        assert!(!format!("{:?}", config).contains("sk-secret"));
    }
}
