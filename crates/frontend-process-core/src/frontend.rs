use crate::stdio::FrontendStdin;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// A display that consumes packets inside a subordinate process.
///
/// Implementations are constructed in the subordinate from [`Frontend::Args`],
/// which the supervisor serializes at `start()`. All hooks default to no-ops.
///
/// ```rust,no_run
/// use async_trait::async_trait;
/// use frontend_process_core::{Frontend, FrontendStdin};
///
/// struct Console;
///
/// #[async_trait]
/// impl Frontend for Console {
///     const DISPLAY_NAME: &'static str = "Console";
///     type Args = ();
///     type Packet = String;
///
///     fn construct(_args: ()) -> anyhow::Result<Self> {
///         Ok(Console)
///     }
///
///     async fn handle_incoming_packet(
///         &mut self,
///         packet: String,
///         _stdin: &mut FrontendStdin,
///     ) -> anyhow::Result<()> {
///         println!("{packet}");
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Frontend: Send + Sized + 'static {
    /// Identifies the implementation; the subordinate's process name is derived from it
    const DISPLAY_NAME: &'static str;

    /// Constructor arguments captured by the supervisor
    type Args: Serialize + DeserializeOwned + Send + Sync + 'static;

    /// Analyzed data unit delivered to the display
    type Packet: Serialize + DeserializeOwned + Send + 'static;

    fn construct(args: Self::Args) -> anyhow::Result<Self>;

    /// Called once for every packet, in the order the supervisor issued them
    async fn handle_incoming_packet(
        &mut self,
        packet: Self::Packet,
        stdin: &mut FrontendStdin,
    ) -> anyhow::Result<()> {
        let _ = (packet, stdin);
        Ok(())
    }

    /// Called once per dispatch cycle, after the packets available in it.
    ///
    /// Displays with their own input or redraw work do it here.
    async fn handle_events(&mut self, stdin: &mut FrontendStdin) -> anyhow::Result<()> {
        let _ = stdin;
        Ok(())
    }

    /// Called exactly once after termination is observed
    async fn handle_termination(&mut self, stdin: &mut FrontendStdin) -> anyhow::Result<()> {
        let _ = stdin;
        Ok(())
    }
}

/// Operator-visible name of the process hosting `F`
pub fn process_name_for<F: Frontend>() -> String {
    format!("{} UI process", F::DISPLAY_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Silent;

    #[async_trait]
    impl Frontend for Silent {
        const DISPLAY_NAME: &'static str = "Silent";
        type Args = ();
        type Packet = u32;

        fn construct(_args: ()) -> anyhow::Result<Self> {
            Ok(Silent)
        }
    }

    #[test]
    fn test_process_name() {
        assert_eq!(process_name_for::<Silent>(), "Silent UI process");
    }

    #[tokio::test]
    async fn test_default_hooks_are_noops() {
        let mut frontend = Silent::construct(()).unwrap();
        let mut stdin = FrontendStdin::empty();
        frontend
            .handle_incoming_packet(7, &mut stdin)
            .await
            .unwrap();
        frontend.handle_events(&mut stdin).await.unwrap();
        frontend.handle_termination(&mut stdin).await.unwrap();
    }
}
