//! Windows-specific subordinate launcher implementation

mod windows_launcher;

use frontend_process_core::SubordinateLauncherFactory;

pub use windows_launcher::{WindowsLauncher, WindowsSubordinateHandle};

/// Windows-specific launcher factory
pub struct WindowsLauncherFactory;

impl SubordinateLauncherFactory for WindowsLauncherFactory {
    type Launcher = WindowsLauncher;

    fn create_launcher() -> WindowsLauncher {
        <WindowsLauncher as frontend_process_core::SubordinateLauncher>::new()
    }

    fn platform_name() -> &'static str {
        "Windows"
    }
}
