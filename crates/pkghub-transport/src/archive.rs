//! Tarball extraction for pulled layers

use flate2::read::GzDecoder;
use std::io::Read;
use std::path::Path;
use tar::Archive;

use crate::error::Result;

/// Extract a gzipped tarball into `dest`
pub fn extract_tar_gz(data: &[u8], dest: &Path) -> Result<()> {
    unpack(GzDecoder::new(std::io::Cursor::new(data)), dest)
}

/// Extract an uncompressed tarball into `dest`
pub fn extract_tar(data: &[u8], dest: &Path) -> Result<()> {
    unpack(std::io::Cursor::new(data), dest)
}

fn unpack<R: Read>(reader: R, dest: &Path) -> Result<()> {
    std::fs::create_dir_all(dest)?;
    let mut archive = Archive::new(reader);
    archive.set_overwrite(true);
    // `unpack` refuses entries escaping `dest`
    archive.unpack(dest)?;
    Ok(())
}

#[cfg(test)]
pub(crate) fn build_tar(files: &[(&str, &str)], gzip: bool) -> Vec<u8> {
    use flate2::Compression;
    use flate2::write::GzEncoder;

    let mut builder = tar::Builder::new(Vec::new());
    for (path, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, path, content.as_bytes())
            .unwrap();
    }
    let raw = builder.into_inner().unwrap();
    if !gzip {
        return raw;
    }
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    std::io::Write::write_all(&mut enc, &raw).unwrap();
    enc.finish().unwrap()
}
