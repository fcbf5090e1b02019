//! Declaration file support for varmatrix.
//!
//! This module locates and loads the `varmatrix.toml` declaration and builds
//! the environment snapshot the engine resolves against.
//!
//! ## Declaration File Location
//!
//! The declaration is searched for in the following order:
//! 1. The path given with `--config`
//! 2. Current working directory (`./varmatrix.toml`, `./varmatrix.yaml`, `./varmatrix.yml`)
//! 3. Parent directories (up to the repository root or filesystem root)
//!
//! ## Environment Snapshot
//!
//! The snapshot is assembled explicitly, lowest precedence first:
//! 1. The `[environment]` table of the declaration
//! 2. Bindings from `--env-file` (dotenv syntax, never applied to the process)
//! 3. `--env KEY=VALUE` flags, in order
//!
//! The process environment is never read implicitly.

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use varmatrix_sdk::{Declaration, EnvironmentSnapshot};

/// The default declaration file name.
pub const CONFIG_FILE_NAME: &str = "varmatrix.toml";

/// File names probed in each directory during discovery.
pub const CONFIG_FILE_NAMES: [&str; 3] = [CONFIG_FILE_NAME, "varmatrix.yaml", "varmatrix.yml"];

/// Loads a declaration from the specified file path.
///
/// The format is chosen from the file extension (`.yaml`/`.yml` for YAML,
/// anything else for TOML).
pub fn load_from_file(path: &Path) -> Result<Declaration> {
    Declaration::from_path(path)
        .with_context(|| format!("Failed to load declaration file: {:?}", path))
}

/// Attempts to find and load a declaration from the current directory
/// or any parent directory.
pub fn discover() -> Result<Option<(Declaration, PathBuf)>> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    discover_from(&cwd)
}

/// Attempts to find and load a declaration starting from the specified directory.
///
/// # Returns
///
/// * `Ok(Some((declaration, path)))` - Found and loaded declaration with its path
/// * `Ok(None)` - No declaration file found
/// * `Err` - If a declaration file was found but couldn't be parsed
pub fn discover_from(start_dir: &Path) -> Result<Option<(Declaration, PathBuf)>> {
    let mut current = start_dir.to_path_buf();

    loop {
        for name in CONFIG_FILE_NAMES {
            let config_path = current.join(name);
            if config_path.is_file() {
                let declaration = load_from_file(&config_path)?;
                return Ok(Some((declaration, config_path)));
            }
        }

        // Stop at repository root or filesystem root
        if current.join(".git").exists() || !current.pop() {
            break;
        }
    }

    Ok(None)
}

/// Resolves the declaration to use: an explicit path wins over discovery.
pub fn resolve_declaration(explicit: Option<&Path>) -> Result<(Declaration, PathBuf)> {
    if let Some(path) = explicit {
        return Ok((load_from_file(path)?, path.to_path_buf()));
    }
    match discover()? {
        Some(found) => Ok(found),
        None => bail!(
            "no {} found in this directory or its parents.\n\n\
             Run `varmatrix init` to create one, or pass --config <path>.",
            CONFIG_FILE_NAME
        ),
    }
}

/// Parses one `KEY=VALUE` flag. The value may be empty; the key may not.
pub fn parse_env_pair(raw: &str) -> Result<(String, String)> {
    let Some((key, value)) = raw.split_once('=') else {
        bail!("invalid --env '{}': expected KEY=VALUE", raw);
    };
    let key = key.trim();
    if key.is_empty() {
        bail!("invalid --env '{}': variable name is empty", raw);
    }
    Ok((key.to_string(), value.to_string()))
}

/// Builds the caller snapshot from an optional dotenv file and `--env` flags.
///
/// Flags are applied after the file, so a flag wins over a file binding.
pub fn build_snapshot(env_file: Option<&Path>, pairs: &[String]) -> Result<EnvironmentSnapshot> {
    let mut bindings: Vec<(String, String)> = Vec::new();

    if let Some(path) = env_file {
        let iter = dotenvy::from_path_iter(path)
            .with_context(|| format!("Failed to open env file: {:?}", path))?;
        for item in iter {
            let (key, value) =
                item.with_context(|| format!("Failed to parse env file: {:?}", path))?;
            bindings.push((key, value));
        }
    }

    for raw in pairs {
        bindings.push(parse_env_pair(raw)?);
    }

    Ok(EnvironmentSnapshot::from_pairs(bindings))
}

/// Turns an application name into an identifier segment: "My App" -> "myapp".
fn slug(app_name: &str) -> String {
    let slug: String = app_name
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if slug.is_empty() {
        "app".to_string()
    } else {
        slug
    }
}

/// Generates a starter declaration as a formatted TOML string.
///
/// The starter declares development, preview and production variants that
/// audit clean: distinct identifiers, distinct schemes, and an allow-list
/// covering exactly the three declared Android pairs.
pub fn generate_starter_toml(app_name: &str) -> String {
    let slug = slug(app_name);
    let package = format!("com.example.{}", slug);

    format!(
        r#"# varmatrix declaration
# Declares every variant of the app and the native target each one builds.
# Run `varmatrix audit` before building to catch identity and matrix drift.

[identity]
# Base identity shared by every variant unless an override applies
display_name = "{app_name}"
android_package = "{package}"
ios_bundle_identifier = "{package}"
icon = "./assets/icon.png"
scheme = "{slug}"

# Every matching override applies. Two matching overrides that set the same
# field to different values are reported as a conflict.
[[identity.overrides]]
name = "development"
when = {{ equals = {{ var = "APP_VARIANT", value = "development" }} }}
display_name = "{app_name} (Dev)"
android_package = "{package}.dev"
ios_bundle_identifier = "{package}.dev"
icon = "./assets/icon-dev.png"
dev_client_scheme = true

[[identity.overrides]]
name = "preview"
when = {{ equals = {{ var = "APP_VARIANT", value = "preview" }} }}
display_name = "{app_name} (Preview)"
android_package = "{package}.preview"
ios_bundle_identifier = "{package}.preview"
icon = "./assets/icon-preview.png"

# Bindings shared by every profile (overridden by --env-file and --env)
[environment]
# API_URL = "https://api.example.com"

[profiles.development]
env = {{ APP_VARIANT = "development" }}
android = {{ flavor = "development", build_type = "debug", gradle_command = ":app:assembleDevelopmentDebug" }}
ios = {{ scheme = "{slug}-dev", build_configuration = "Debug" }}

[profiles.preview]
env = {{ APP_VARIANT = "preview" }}
android = {{ flavor = "preview", build_type = "release" }}
ios = {{ scheme = "{slug}-preview", build_configuration = "Release" }}

[profiles.production]
android = {{ flavor = "production", build_type = "release", gradle_command = ":app:bundleProductionRelease" }}
ios = {{ scheme = "{slug}", build_configuration = "Release" }}

[android]
# Legal (flavor, build_type) pairs. Anything else is rejected.
allow = [
    {{ flavor = "development", build_type = "debug" }},
    {{ flavor = "preview", build_type = "release" }},
    {{ flavor = "production", build_type = "release" }},
]

[ios]
# Allowed Xcode build configurations (optional)
configurations = ["Debug", "Release"]

# Explicit scheme bindings, when a scheme builds a differently named target
# [[ios.bindings]]
# profile = "production"
# scheme = "{slug}"
# target = "{app_name}"
"#,
        app_name = app_name,
        package = package,
        slug = slug,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_starter_declaration_audits_clean() {
        let toml = generate_starter_toml("My App");
        let declaration = Declaration::from_toml_str(&toml).unwrap();
        assert_eq!(declaration.profiles.len(), 3);
        assert_eq!(declaration.identity.base.android_package.as_deref(), Some("com.example.myapp"));

        let registry = declaration
            .into_registry(&EnvironmentSnapshot::new())
            .unwrap();
        let report = registry.audit().unwrap();
        assert!(report.is_clean(), "{:?}", report.findings);
        assert_eq!(report.identities.len(), 6);
    }

    #[test]
    fn test_slug_falls_back_for_symbols() {
        assert_eq!(slug("Acme-Go!"), "acmego");
        assert_eq!(slug("***"), "app");
    }

    #[test]
    fn test_load_from_file_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("varmatrix.yaml");
        std::fs::write(
            &path,
            "identity:\n  display_name: X\nprofiles:\n  dev: {}\n",
        )
        .unwrap();

        let declaration = load_from_file(&path).unwrap();
        assert_eq!(declaration.identity.base.display_name.as_deref(), Some("X"));
        assert!(declaration.profiles.contains_key("dev"));
    }

    #[test]
    fn test_load_from_file_reports_path_on_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("varmatrix.toml");
        std::fs::write(&path, "[profiles\n").unwrap();

        let err = load_from_file(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to load declaration file"));
    }

    #[test]
    fn test_discover_config() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join(".git")).unwrap();
        let config_path = temp_dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&config_path, "[profiles.discovered]\n").unwrap();
        let nested = temp_dir.path().join("apps/mobile");
        std::fs::create_dir_all(&nested).unwrap();

        let (declaration, path) = discover_from(&nested).unwrap().unwrap();
        assert!(declaration.profiles.contains_key("discovered"));
        assert_eq!(path, config_path);
    }

    #[test]
    fn test_discover_no_config() {
        let temp_dir = TempDir::new().unwrap();
        // Create a .git directory to stop the search
        std::fs::create_dir(temp_dir.path().join(".git")).unwrap();

        let result = discover_from(temp_dir.path()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_parse_env_pair() {
        assert_eq!(
            parse_env_pair("APP_VARIANT=preview").unwrap(),
            ("APP_VARIANT".to_string(), "preview".to_string())
        );
        assert_eq!(
            parse_env_pair("URL=a=b").unwrap(),
            ("URL".to_string(), "a=b".to_string())
        );
        assert_eq!(parse_env_pair("EMPTY=").unwrap().1, "");
        assert!(parse_env_pair("NOVALUE").is_err());
        assert!(parse_env_pair("=x").is_err());
    }

    #[test]
    fn test_build_snapshot_flags_win_over_file() {
        let temp_dir = TempDir::new().unwrap();
        let env_file = temp_dir.path().join(".env");
        std::fs::write(&env_file, "APP_VARIANT=preview\nAPI_URL=https://staging\n").unwrap();

        let snapshot =
            build_snapshot(Some(&env_file), &["APP_VARIANT=development".to_string()]).unwrap();
        assert_eq!(snapshot.get("APP_VARIANT"), Some("development"));
        assert_eq!(snapshot.get("API_URL"), Some("https://staging"));
        // the file is read, not applied to the process
        assert!(std::env::var("API_URL").is_err());
    }
}
