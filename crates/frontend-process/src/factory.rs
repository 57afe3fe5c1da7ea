use frontend_process_core::SubordinateLauncherFactory;

/// Platform-independent factory that selects the appropriate implementation at compile time
pub struct PlatformLauncherFactory;

impl SubordinateLauncherFactory for PlatformLauncherFactory {
    #[cfg(unix)]
    type Launcher = frontend_process_unix::UnixLauncher;

    #[cfg(windows)]
    type Launcher = frontend_process_windows::WindowsLauncher;

    fn create_launcher() -> Self::Launcher {
        #[cfg(unix)]
        return frontend_process_unix::UnixLauncherFactory::create_launcher();

        #[cfg(windows)]
        return frontend_process_windows::WindowsLauncherFactory::create_launcher();
    }

    fn platform_name() -> &'static str {
        #[cfg(unix)]
        return frontend_process_unix::UnixLauncherFactory::platform_name();

        #[cfg(windows)]
        return frontend_process_windows::WindowsLauncherFactory::platform_name();
    }
}

/// The launcher type for the current platform
pub type PlatformLauncher = <PlatformLauncherFactory as SubordinateLauncherFactory>::Launcher;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_detection() {
        let platform = PlatformLauncherFactory::platform_name();
        assert!(platform == "Unix" || platform == "Windows");

        let _launcher = PlatformLauncherFactory::create_launcher();
    }
}
