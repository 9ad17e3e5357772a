use anyhow::{Context, Result};
use std::io::{Read, Seek};
use std::path::Path;

/// Unpack a zip archive into `dest_dir`. Entries that would escape the
/// destination are skipped.
pub fn extract_zip<R: Read + Seek>(reader: R, dest_dir: &Path) -> Result<()> {
    log::debug!("Extracting zip to: {:?}", dest_dir);
    std::fs::create_dir_all(dest_dir)?;

    let mut archive = zip::ZipArchive::new(reader).context("Invalid zip archive")?;

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        let Some(relative) = file.enclosed_name() else {
            log::warn!("Skipping unsafe zip entry: {}", file.name());
            continue;
        };
        let outpath = dest_dir.join(relative);

        if file.is_dir() {
            std::fs::create_dir_all(&outpath)?;
        } else {
            if let Some(parent) = outpath.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut outfile = std::fs::File::create(&outpath)
                .with_context(|| format!("Failed to create {:?}", outpath))?;
            std::io::copy(&mut file, &mut outfile)?;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = file.unix_mode() {
                std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode))?;
            }
        }
    }

    Ok(())
}

/// Unpack a gzip-compressed tarball into `dest_dir`.
pub fn extract_tar_gz<R: Read>(reader: R, dest_dir: &Path) -> Result<()> {
    use flate2::read::GzDecoder;
    use tar::Archive;

    log::debug!("Extracting tar.gz to: {:?}", dest_dir);
    std::fs::create_dir_all(dest_dir)?;
    let mut archive = Archive::new(GzDecoder::new(reader));
    archive
        .unpack(dest_dir)
        .with_context(|| format!("Failed to unpack tarball into {:?}", dest_dir))?;
    Ok(())
}
