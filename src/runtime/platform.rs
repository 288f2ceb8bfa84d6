/// Thin host abstraction for the clock, the filesystem and the process
/// environment. Native modules only reach the outside world through it, so
/// tests can substitute a fixed clock or an in-memory filesystem.
pub trait Platform {
    fn now_ms(&self) -> i128;
    fn sleep_ms(&self, millis: i128);
    fn fs_exists(&self, path: &str) -> bool;
    fn fs_read(&self, path: &str) -> Result<String, String>;
    fn fs_write(&self, path: &str, contents: &str) -> Result<(), String>;
    fn env_var(&self, name: &str) -> Option<String>;
}

pub struct StdPlatform;

impl Platform for StdPlatform {
    fn now_ms(&self) -> i128 {
        let now = std::time::SystemTime::now();
        now.duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as i128)
            .unwrap_or(0)
    }

    fn sleep_ms(&self, millis: i128) {
        if millis > 0 {
            std::thread::sleep(std::time::Duration::from_millis(millis as u64));
        }
    }

    fn fs_exists(&self, path: &str) -> bool {
        std::path::Path::new(path).exists()
    }

    fn fs_read(&self, path: &str) -> Result<String, String> {
        std::fs::read_to_string(path).map_err(|err| format!("{path}: {err}"))
    }

    fn fs_write(&self, path: &str, contents: &str) -> Result<(), String> {
        std::fs::write(path, contents).map_err(|err| format!("{path}: {err}"))
    }

    fn env_var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}
