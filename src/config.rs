use crate::git::CloneMethod;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Settings read once at startup, passed by reference everywhere else.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub api_key: String,
    pub output: PathBuf,
    pub base_url: String,
    #[serde(default)]
    pub clone_method: CloneMethod,
}

impl Config {
    pub fn load(path: &Path) -> Result<Config> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: path={:?}", path))?;
        let mut config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: path={:?}", path))?;
        config.output = expand_home(&config.output);
        Ok(config)
    }

    /// Must pass before any network or filesystem activity.
    pub fn verify(&self) -> Result<()> {
        if self.api_key.is_empty() {
            bail!("api-key is required");
        }
        if self.base_url.is_empty() {
            bail!("base-url is required");
        }
        if self.output.exists() && !self.output.is_dir() {
            bail!("output path {:?} is not a directory", self.output);
        }
        Ok(())
    }
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    fn write_config(dir: &Path, contents: &str) -> PathBuf {
        let path = dir.join("config.yml");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn loads_a_complete_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "api-key: \"secret\"\noutput: \"/tmp/mirror\"\nbase-url: \"https://gitlab.example.com/api/v4\"\nclone-method: ssh\n",
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.output, PathBuf::from("/tmp/mirror"));
        assert_eq!(config.base_url, "https://gitlab.example.com/api/v4");
        assert_eq!(config.clone_method, CloneMethod::Ssh);
        config.verify().unwrap();
    }

    #[test]
    fn clone_method_defaults_to_https() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "api-key: \"secret\"\noutput: \"/tmp/mirror\"\nbase-url: \"https://gitlab.example.com/api/v4\"\n",
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.clone_method, CloneMethod::Https);
    }

    #[test]
    fn rejects_empty_api_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "api-key: \"\"\noutput: \"/tmp/mirror\"\nbase-url: \"https://gitlab.example.com/api/v4\"\n",
        );

        let err = Config::load(&path).unwrap().verify().unwrap_err();
        assert!(err.to_string().contains("api-key"));
    }

    #[test]
    fn rejects_empty_base_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "api-key: \"secret\"\noutput: \"/tmp/mirror\"\nbase-url: \"\"\n",
        );

        let err = Config::load(&path).unwrap().verify().unwrap_err();
        assert!(err.to_string().contains("base-url"));
    }

    #[test]
    fn rejects_output_that_is_not_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("occupied");
        File::create(&output).unwrap();
        let path = write_config(
            dir.path(),
            &format!(
                "api-key: \"secret\"\noutput: \"{}\"\nbase-url: \"https://gitlab.example.com/api/v4\"\n",
                output.display()
            ),
        );

        let err = Config::load(&path).unwrap().verify().unwrap_err();
        assert!(err.to_string().contains("output"));
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(&dir.path().join("nope.yml")).is_err());
    }
}
