//! Credential resolution from the environment or secret files
//!
//! A credential named `key` is taken from the `key` environment variable. When
//! that is unset or empty, the `key.secret` variable names a file whose first
//! line is the credential (the layout used by mounted container secrets).

use crate::error::ConfigError;
use std::path::PathBuf;
use tracing::debug;

/// Resolve a credential from the process environment
pub fn resolve(key: &str) -> Result<String, ConfigError> {
    resolve_with(key, |name| std::env::var(name).ok())
}

/// Resolve a credential using `lookup` in place of the process environment
pub fn resolve_with<F>(key: &str, lookup: F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
        return Ok(value);
    }

    let file_var = format!("{key}.secret");
    let path = lookup(&file_var)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| ConfigError::MissingSecret {
            key: key.to_string(),
            file_var: file_var.clone(),
        })?;

    debug!(key, path = %path.display(), "Reading credential from secret file");
    let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::SecretFile {
        key: key.to_string(),
        path: path.clone(),
        source,
    })?;

    Ok(first_line(&contents).to_string())
}

fn first_line(contents: &str) -> &str {
    let line = contents.split('\n').next().unwrap_or("");
    line.strip_suffix('\r').unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn secret_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_direct_variable_wins() {
        let file = secret_file("from-file\n");
        let path = file.path().to_str().unwrap();
        let lookup = env(&[("secret", "direct"), ("secret.secret", path)]);

        assert_eq!(resolve_with("secret", lookup).unwrap(), "direct");
    }

    #[test]
    fn test_falls_back_to_first_line_of_file() {
        let file = secret_file("minio123\nsecond line\n");
        let path = file.path().to_str().unwrap();
        let lookup = env(&[("access.secret", path)]);

        assert_eq!(resolve_with("access", lookup).unwrap(), "minio123");
    }

    #[test]
    fn test_empty_variable_falls_back_to_file() {
        let file = secret_file("value");
        let path = file.path().to_str().unwrap();
        let lookup = env(&[("secret", ""), ("secret.secret", path)]);

        assert_eq!(resolve_with("secret", lookup).unwrap(), "value");
    }

    #[test]
    fn test_crlf_line_ending_is_trimmed() {
        let file = secret_file("windows\r\n");
        let path = file.path().to_str().unwrap();

        assert_eq!(resolve_with("secret", env(&[("secret.secret", path)])).unwrap(), "windows");
    }

    #[test]
    fn test_empty_file_yields_empty_credential() {
        let file = secret_file("");
        let path = file.path().to_str().unwrap();

        assert_eq!(resolve_with("secret", env(&[("secret.secret", path)])).unwrap(), "");
    }

    #[test]
    fn test_unreadable_file_is_an_error() {
        let lookup = env(&[("secret.secret", "/nonexistent/blobgate/secret")]);

        let err = resolve_with("secret", lookup).unwrap_err();
        assert!(matches!(err, ConfigError::SecretFile { ref key, .. } if key == "secret"));
    }

    #[test]
    fn test_nothing_configured_is_an_error() {
        let err = resolve_with("access", env(&[])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingSecret { ref file_var, .. } if file_var == "access.secret"
        ));
    }
}
