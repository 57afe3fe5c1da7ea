use crate::factory::PlatformLauncherFactory;
use crate::link::SubordinateLink;
use crate::runtime::FrontendRuntime;
use frontend_process_core::{
    Frontend, FrontendError, FrontendStdin, SubordinateEnv, SubordinateLauncher,
    SubordinateLauncherFactory,
};
use std::marker::PhantomData;
use tracing::{info, warn};

/// Code that runs inside a subordinate process spawned by [`crate::FrontendProcess`]
pub struct SubordinateEntryPoint<F: Frontend> {
    env: SubordinateEnv,
    _frontend: PhantomData<F>,
}

impl<F: Frontend> SubordinateEntryPoint<F> {
    /// Detect a subordinate launch for `F`; `Ok(None)` in an ordinary process
    pub fn from_env() -> Result<Option<Self>, FrontendError> {
        match SubordinateEnv::from_process_env()? {
            Some(env) => Self::from_subordinate_env(env).map(Some),
            None => Ok(None),
        }
    }

    /// Like [`SubordinateEntryPoint::from_env`] for binaries that only ever run as a subordinate
    pub fn require_from_env() -> Result<Self, FrontendError> {
        Self::from_env()?.ok_or(FrontendError::NotSubordinate)
    }

    pub fn from_subordinate_env(env: SubordinateEnv) -> Result<Self, FrontendError> {
        if env.frontend != F::DISPLAY_NAME {
            return Err(FrontendError::FrontendMismatch {
                expected: F::DISPLAY_NAME.to_string(),
                found: env.frontend,
            });
        }
        Ok(Self {
            env,
            _frontend: PhantomData,
        })
    }

    pub fn process_name(&self) -> &str {
        &self.env.process_name
    }

    /// Build the frontend, connect back to the supervisor and run until terminated.
    ///
    /// Construction and hook failures are returned as-is.
    pub async fn run(self) -> anyhow::Result<F> {
        let launcher = PlatformLauncherFactory::create_launcher();
        if let Err(e) = launcher.apply_process_name(&self.env.process_name) {
            warn!(
                "Could not apply process name '{}': {}",
                self.env.process_name, e
            );
        }
        info!(
            "Starting '{}' on {}",
            self.env.process_name,
            PlatformLauncherFactory::platform_name()
        );

        let args: F::Args = self.env.decode_args()?;
        let frontend = F::construct(args)?;

        let (receiver, flag, _readers) =
            SubordinateLink::<F::Packet>::connect(&self.env.endpoint, &self.env.runtime)
                .await
                .into_parts();

        let frontend = FrontendRuntime::with_config(frontend, &self.env.runtime)
            .set_up_ipc(receiver, flag, FrontendStdin::inherited())
            .run()
            .await?;

        info!("'{}' finished", self.env.process_name);
        Ok(frontend)
    }
}

/// Run the subordinate side of `F` if this process was launched as one.
///
/// Call first thing in `main`. Returns `Ok(true)` after the frontend ran to
/// completion, `Ok(false)` in an ordinary process.
pub async fn run_subordinate_if_requested<F: Frontend>() -> anyhow::Result<bool> {
    match SubordinateEntryPoint::<F>::from_env()? {
        Some(entry) => {
            entry.run().await?;
            Ok(true)
        }
        None => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use frontend_process_core::{IpcEndpoint, RuntimeConfig};

    struct Banner;

    #[async_trait]
    impl Frontend for Banner {
        const DISPLAY_NAME: &'static str = "Banner";
        type Args = String;
        type Packet = String;

        fn construct(title: String) -> anyhow::Result<Self> {
            anyhow::ensure!(!title.is_empty(), "a banner needs a title");
            Ok(Banner)
        }
    }

    fn env_for(frontend: &str, title: &str) -> SubordinateEnv {
        SubordinateEnv::new(
            format!("{frontend} UI process"),
            frontend,
            &title.to_string(),
            IpcEndpoint::generate("entry-test"),
            RuntimeConfig {
                connect_timeout_ms: 200,
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_mismatched_frontend_refused() {
        let result = SubordinateEntryPoint::<Banner>::from_subordinate_env(env_for("Table", "t"));
        match result {
            Err(FrontendError::FrontendMismatch { expected, found }) => {
                assert_eq!(expected, "Banner");
                assert_eq!(found, "Table");
            }
            _ => panic!("expected a frontend mismatch"),
        }
    }

    #[tokio::test]
    async fn test_missing_supervisor_runs_cleanup_and_exits() {
        let entry =
            SubordinateEntryPoint::<Banner>::from_subordinate_env(env_for("Banner", "capture"))
                .unwrap();
        assert_eq!(entry.process_name(), "Banner UI process");
        entry.run().await.unwrap();
    }

    #[tokio::test]
    async fn test_construction_error_is_returned() {
        let entry =
            SubordinateEntryPoint::<Banner>::from_subordinate_env(env_for("Banner", "")).unwrap();
        let err = entry.run().await.err().unwrap();
        assert!(err.to_string().contains("a banner needs a title"));
    }
}
