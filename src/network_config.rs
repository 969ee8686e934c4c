//! Network security config injection

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PatchError, Result};

/// File name the manifest attribute `@xml/network_security_config` resolves to
pub const NETWORK_CONFIG_FILE: &str = "network_security_config.xml";

/// Copy `source` verbatim into `<decompiled_dir>/res/xml/network_security_config.xml`
///
/// # Returns
/// Path of the written resource
///
/// # Notes
/// - Creates `res/xml` if needed; an existing directory is fine
/// - Overwrites an existing config of the same name
pub fn inject_network_config(source: &Path, decompiled_dir: &Path) -> Result<PathBuf> {
    let contents = fs::read(source).map_err(|err| PatchError::NetworkConfigUnreadable {
        path: source.to_path_buf(),
        source: err,
    })?;

    let res_xml = decompiled_dir.join("res").join("xml");
    println!("[*]  Adding network file to {}", res_xml.display());
    fs::create_dir_all(&res_xml).map_err(|err| PatchError::from_io_error(&res_xml, err))?;

    let dest = res_xml.join(NETWORK_CONFIG_FILE);
    fs::write(&dest, contents).map_err(|err| PatchError::from_io_error(&dest, err))?;
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copies_bytes_verbatim() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let source = temp.path().join("config.xml");
        let body = b"<network-security-config>\r\n  <base-config/>\n</network-security-config>";
        fs::write(&source, body)?;

        let decompiled = temp.path().join("app");
        let dest = inject_network_config(&source, &decompiled)?;

        assert_eq!(dest, decompiled.join("res/xml/network_security_config.xml"));
        assert_eq!(fs::read(&dest)?, body);
        Ok(())
    }

    #[test]
    fn test_existing_res_xml_is_reused() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let source = temp.path().join("config.xml");
        fs::write(&source, b"<network-security-config/>")?;

        let decompiled = temp.path().join("app");
        fs::create_dir_all(decompiled.join("res/xml"))?;
        fs::write(decompiled.join("res/xml/network_security_config.xml"), b"old")?;

        let dest = inject_network_config(&source, &decompiled)?;
        assert_eq!(fs::read(dest)?, b"<network-security-config/>");
        Ok(())
    }

    #[test]
    fn test_missing_source_is_fatal() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let err = inject_network_config(&temp.path().join("absent.xml"), temp.path())
            .unwrap_err();
        assert!(matches!(err, PatchError::NetworkConfigUnreadable { .. }));
        assert!(!temp.path().join("res").exists());
        Ok(())
    }
}
