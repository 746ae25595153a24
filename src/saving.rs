use bincode::{deserialize_from, serialize_into};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use log::info;
use std::fs::File;
use std::io::{BufReader, BufWriter, Error, ErrorKind, Write};
use std::path::Path;

use crate::store::DataStore;

pub fn save_store(store: &DataStore, path: impl AsRef<Path>) -> std::io::Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut writer = BufWriter::new(encoder);

    serialize_into(&mut writer, store).map_err(|e| Error::new(ErrorKind::Other, e))?;
    writer
        .into_inner()
        .map_err(|e| e.into_error())?
        .finish()?
        .flush()?;

    info!("store saved to {}", path.display());
    Ok(())
}

pub fn load_store(path: impl AsRef<Path>) -> std::io::Result<DataStore> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let decoder = GzDecoder::new(file);
    let mut reader = BufReader::new(decoder);

    let store: DataStore =
        deserialize_from(&mut reader).map_err(|e| Error::new(ErrorKind::InvalidData, e))?;

    info!("store loaded from {}", path.display());
    Ok(store)
}

pub fn store_to_bytes(store: &DataStore) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    serialize_into(&mut encoder, store).map_err(|e| Error::new(ErrorKind::Other, e))?;
    encoder.finish()
}

pub fn store_from_bytes(bytes: &[u8]) -> std::io::Result<DataStore> {
    let decoder = GzDecoder::new(bytes);
    deserialize_from(BufReader::new(decoder)).map_err(|e| Error::new(ErrorKind::InvalidData, e))
}
