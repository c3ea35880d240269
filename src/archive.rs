//! Release archive extraction (.zip, .7z, .tar.gz)

use std::fs;
use std::path::Path;

use flate2::read::GzDecoder;
use tar::Archive;

use crate::error::{Result, ScalerError};
use crate::logging::log_info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    SevenZip,
    TarGz,
}

impl ArchiveFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        if lower.ends_with(".zip") {
            Some(ArchiveFormat::Zip)
        } else if lower.ends_with(".7z") {
            Some(ArchiveFormat::SevenZip)
        } else if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Some(ArchiveFormat::TarGz)
        } else {
            None
        }
    }
}

fn extraction_error(archive: &Path, reason: impl ToString) -> ScalerError {
    ScalerError::Extraction {
        archive: archive.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Unpack `archive` into `dest` (created if missing); format chosen by file name
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<()> {
    let name = archive
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let format = ArchiveFormat::from_name(&name)
        .ok_or_else(|| extraction_error(archive, "unsupported archive type"))?;

    fs::create_dir_all(dest).map_err(|e| ScalerError::from_io(dest, "Failed to create", e))?;
    log_info(&format!("Extracting {} ({:?}) to {}", name, format, dest.display()));

    match format {
        ArchiveFormat::Zip => {
            let file = fs::File::open(archive).map_err(|e| extraction_error(archive, e))?;
            let mut zip = zip::ZipArchive::new(file).map_err(|e| extraction_error(archive, e))?;
            zip.extract(dest).map_err(|e| extraction_error(archive, e))?;
        }
        ArchiveFormat::SevenZip => {
            sevenz_rust::decompress_file(archive, dest).map_err(|e| extraction_error(archive, e))?;
        }
        ArchiveFormat::TarGz => {
            let file = fs::File::open(archive).map_err(|e| extraction_error(archive, e))?;
            let mut tar = Archive::new(GzDecoder::new(file));
            tar.unpack(dest).map_err(|e| extraction_error(archive, e))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn format_by_suffix() {
        assert_eq!(ArchiveFormat::from_name("a.ZIP"), Some(ArchiveFormat::Zip));
        assert_eq!(ArchiveFormat::from_name("a.7z"), Some(ArchiveFormat::SevenZip));
        assert_eq!(ArchiveFormat::from_name("a.tgz"), Some(ArchiveFormat::TarGz));
        assert_eq!(ArchiveFormat::from_name("a.rar"), None);
    }

    #[test]
    fn extracts_zip() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("mod.zip");
        let mut writer = zip::ZipWriter::new(fs::File::create(&archive).unwrap());
        writer
            .start_file("OptiScaler/OptiScaler.ini", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"[Upscalers]\n").unwrap();
        writer.finish().unwrap();

        let dest = tmp.path().join("out");
        extract_archive(&archive, &dest).unwrap();
        assert_eq!(
            fs::read_to_string(dest.join("OptiScaler/OptiScaler.ini")).unwrap(),
            "[Upscalers]\n"
        );
    }

    #[test]
    fn extracts_tar_gz() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("mod.tar.gz");
        let encoder = GzEncoder::new(fs::File::create(&archive).unwrap(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        let data = b"nvapi";
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, "fg/nvapi64.dll", &data[..]).unwrap();
        builder.into_inner().unwrap().finish().unwrap();

        let dest = tmp.path().join("out");
        extract_archive(&archive, &dest).unwrap();
        assert_eq!(fs::read(dest.join("fg/nvapi64.dll")).unwrap(), b"nvapi");
    }

    #[test]
    fn corrupt_archive_is_extraction_error() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("broken.zip");
        fs::write(&archive, "not a zip").unwrap();
        let err = extract_archive(&archive, &tmp.path().join("out")).unwrap_err();
        assert!(matches!(err, ScalerError::Extraction { .. }));
    }
}
