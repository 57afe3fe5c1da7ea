mod unix_launcher;

use frontend_process_core::SubordinateLauncherFactory;

pub use unix_launcher::{UnixLauncher, UnixSubordinateHandle};

#[cfg(unix)]
pub use unix_launcher::describe_exit;

pub struct UnixLauncherFactory;

impl SubordinateLauncherFactory for UnixLauncherFactory {
    type Launcher = UnixLauncher;

    fn create_launcher() -> UnixLauncher {
        <UnixLauncher as frontend_process_core::SubordinateLauncher>::new()
    }

    fn platform_name() -> &'static str {
        "Unix"
    }
}
