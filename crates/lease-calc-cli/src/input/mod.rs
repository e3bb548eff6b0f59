pub mod config;
pub mod file;
pub mod stdin;

use serde::de::DeserializeOwned;

/// Resolve a command's input from `--input`, then piped stdin, then flags.
pub fn from_file_stdin_or<T, F>(path: Option<&str>, from_flags: F) -> Result<T, Box<dyn std::error::Error>>
where
    T: DeserializeOwned,
    F: FnOnce() -> Result<T, Box<dyn std::error::Error>>,
{
    if let Some(path) = path {
        return file::read_json(path);
    }
    if let Some(data) = stdin::read_stdin()? {
        return Ok(serde_json::from_value(data)?);
    }
    from_flags()
}
