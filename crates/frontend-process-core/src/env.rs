use crate::config::RuntimeConfig;
use crate::error::FrontendError;
use crate::ipc::IpcEndpoint;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;

pub const ROLE_VAR: &str = "FRONTEND_PROCESS_ROLE";
pub const NAME_VAR: &str = "FRONTEND_PROCESS_NAME";
pub const FRONTEND_VAR: &str = "FRONTEND_PROCESS_FRONTEND";
pub const ARGS_VAR: &str = "FRONTEND_PROCESS_ARGS";
pub const ENDPOINT_VAR: &str = "FRONTEND_PROCESS_ENDPOINT";
pub const RUNTIME_VAR: &str = "FRONTEND_PROCESS_RUNTIME";

pub const SUBORDINATE_ROLE: &str = "subordinate";

/// What a subordinate needs to know about its launch, carried in environment variables
#[derive(Debug, Clone, PartialEq)]
pub struct SubordinateEnv {
    pub process_name: String,
    pub frontend: String,
    /// Constructor arguments as a JSON document
    pub args: String,
    pub endpoint: IpcEndpoint,
    pub runtime: RuntimeConfig,
}

impl SubordinateEnv {
    pub fn new<A: Serialize>(
        process_name: impl Into<String>,
        frontend: impl Into<String>,
        args: &A,
        endpoint: IpcEndpoint,
        runtime: RuntimeConfig,
    ) -> Result<Self, FrontendError> {
        Ok(Self {
            process_name: process_name.into(),
            frontend: frontend.into(),
            args: serde_json::to_string(args)?,
            endpoint,
            runtime,
        })
    }

    pub fn to_vars(&self) -> Result<HashMap<String, String>, FrontendError> {
        Ok(HashMap::from([
            (ROLE_VAR.to_string(), SUBORDINATE_ROLE.to_string()),
            (NAME_VAR.to_string(), self.process_name.clone()),
            (FRONTEND_VAR.to_string(), self.frontend.clone()),
            (ARGS_VAR.to_string(), self.args.clone()),
            (ENDPOINT_VAR.to_string(), self.endpoint.base().to_string()),
            (RUNTIME_VAR.to_string(), serde_json::to_string(&self.runtime)?),
        ]))
    }

    /// Read the launch description; `Ok(None)` for a process that is not a subordinate
    pub fn from_lookup<L>(lookup: L) -> Result<Option<Self>, FrontendError>
    where
        L: Fn(&str) -> Option<String>,
    {
        if lookup(ROLE_VAR).as_deref() != Some(SUBORDINATE_ROLE) {
            return Ok(None);
        }

        let required = |key: &str| {
            lookup(key)
                .ok_or_else(|| FrontendError::Configuration(format!("{key} is not set")))
        };

        let runtime: RuntimeConfig = match lookup(RUNTIME_VAR) {
            Some(raw) => serde_json::from_str(&raw)?,
            None => RuntimeConfig::default(),
        };
        runtime
            .validate()
            .map_err(|e| FrontendError::Configuration(e.to_string()))?;

        Ok(Some(Self {
            process_name: required(NAME_VAR)?,
            frontend: required(FRONTEND_VAR)?,
            args: required(ARGS_VAR)?,
            endpoint: IpcEndpoint::from_base(required(ENDPOINT_VAR)?),
            runtime,
        }))
    }

    pub fn from_process_env() -> Result<Option<Self>, FrontendError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn decode_args<A: DeserializeOwned>(&self) -> Result<A, FrontendError> {
        Ok(serde_json::from_str(&self.args)?)
    }
}
