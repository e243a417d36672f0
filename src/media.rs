use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use axum::{
    body::Body,
    http::{
        HeaderMap, HeaderName, HeaderValue,
        header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::http::{HttpFetcher, browser_headers};

pub const MAX_MEDIA_BYTES: u64 = 250 * 1024 * 1024;
pub const DOWNLOAD_FILENAME_HEADER: &str = "x-download-filename";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredMedia {
    pub filename: String,
    pub size: u64,
}

#[derive(Debug, Clone)]
pub struct MediaStore {
    dir: PathBuf,
    max_bytes: u64,
}

impl MediaStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            max_bytes: MAX_MEDIA_BYTES,
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn ensure_dir(&self) -> Result<(), ApiError> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|error| {
            ApiError::internal(format!("No se pudo crear la carpeta de medios: {error}"))
        })
    }

    pub fn reserve(&self) -> (String, PathBuf) {
        let filename = format!("{}.mp4", Uuid::new_v4());
        let path = self.dir.join(&filename);
        (filename, path)
    }

    pub async fn download_direct(
        &self,
        fetcher: &HttpFetcher,
        video_url: &str,
    ) -> Result<StoredMedia, ApiError> {
        let (filename, path) = self.reserve();

        match self.stream_to_file(fetcher, video_url, &path).await {
            Ok(size) => {
                info!("Video directo guardado en {filename} ({size} bytes)");
                Ok(StoredMedia { filename, size })
            }
            Err(error) => {
                remove_quietly(&path).await;
                Err(error)
            }
        }
    }

    async fn stream_to_file(
        &self,
        fetcher: &HttpFetcher,
        video_url: &str,
        path: &Path,
    ) -> Result<u64, ApiError> {
        let mut response = fetcher
            .get_streaming(video_url, browser_headers())
            .await
            .map_err(|error| ApiError::internal(format!("Error de descarga: {error}")))?;

        if !response.status().is_success() {
            return Err(ApiError::internal(format!(
                "Error de descarga: el origen respondio {}",
                response.status()
            )));
        }

        let mut file = tokio::fs::File::create(path).await.map_err(|error| {
            ApiError::internal(format!("No se pudo crear el archivo de destino: {error}"))
        })?;

        let mut written: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|error| ApiError::internal(format!("Error de descarga: {error}")))?
        {
            written += chunk.len() as u64;
            if written > self.max_bytes {
                let max_mb = self.max_bytes / 1_048_576;
                return Err(ApiError::bad_request(format!(
                    "El archivo supera el limite permitido de {max_mb} MB."
                )));
            }

            file.write_all(&chunk).await.map_err(|error| {
                ApiError::internal(format!("No se pudo escribir el archivo: {error}"))
            })?;
        }

        file.flush().await.map_err(|error| {
            ApiError::internal(format!("No se pudo escribir el archivo: {error}"))
        })?;

        if written == 0 {
            return Err(ApiError::bad_request("El archivo descargado esta vacio"));
        }

        Ok(written)
    }

    pub async fn stored(&self, filename: &str) -> Result<StoredMedia, ApiError> {
        let path = self.dir.join(filename);
        let metadata = tokio::fs::metadata(&path).await.map_err(|error| {
            ApiError::internal(format!("No se encontro el archivo descargado: {error}"))
        })?;

        if metadata.len() > self.max_bytes {
            remove_quietly(&path).await;
            let max_mb = self.max_bytes / 1_048_576;
            return Err(ApiError::bad_request(format!(
                "El archivo supera el limite permitido de {max_mb} MB."
            )));
        }

        Ok(StoredMedia {
            filename: filename.to_string(),
            size: metadata.len(),
        })
    }

    pub async fn serve(&self, filename: &str) -> Result<Response, ApiError> {
        let path = self.resolve(filename).await?;

        let metadata = tokio::fs::metadata(&path).await.map_err(|error| {
            ApiError::internal(format!("No se pudo leer metadata del archivo: {error}"))
        })?;
        let file = tokio::fs::File::open(&path).await.map_err(|error| {
            ApiError::internal(format!("No se pudo leer el archivo: {error}"))
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static(content_type_for_filename(filename)),
        );
        headers.insert(CONTENT_LENGTH, HeaderValue::from(metadata.len()));
        headers.insert(
            CONTENT_DISPOSITION,
            HeaderValue::from_str(&build_content_disposition(filename))
                .map_err(|_| ApiError::internal("No se pudo crear la cabecera de descarga."))?,
        );
        headers.insert(
            HeaderName::from_static(DOWNLOAD_FILENAME_HEADER),
            HeaderValue::from_str(&sanitize_ascii_filename(filename))
                .map_err(|_| ApiError::internal("No se pudo crear el nombre del archivo."))?,
        );

        let body = Body::from_stream(ReaderStream::new(file));
        Ok((headers, body).into_response())
    }

    /// Canonical path of `filename`, refusing anything outside the store.
    async fn resolve(&self, filename: &str) -> Result<PathBuf, ApiError> {
        let not_found = || ApiError::not_found("Archivo no encontrado");

        let canonical_dir = match tokio::fs::canonicalize(&self.dir).await {
            Ok(dir) => dir,
            Err(error) if error.kind() == ErrorKind::NotFound => return Err(not_found()),
            Err(error) => {
                return Err(ApiError::internal(format!(
                    "No se pudo resolver la carpeta de medios: {error}"
                )));
            }
        };

        let candidate = match tokio::fs::canonicalize(self.dir.join(filename)).await {
            Ok(candidate) => candidate,
            Err(error) if error.kind() == ErrorKind::NotFound => return Err(not_found()),
            Err(error) => {
                return Err(ApiError::internal(format!(
                    "No se pudo resolver la ruta del archivo: {error}"
                )));
            }
        };

        if !candidate.starts_with(&canonical_dir) {
            warn!("Se bloqueo un archivo fuera de la carpeta de medios: {candidate:?}");
            return Err(not_found());
        }

        if !candidate.is_file() {
            return Err(not_found());
        }

        Ok(candidate)
    }
}

pub async fn remove_quietly(path: &Path) {
    if let Err(error) = tokio::fs::remove_file(path).await
        && error.kind() != ErrorKind::NotFound
    {
        info!("No se pudo borrar el archivo temporal {path:?}: {error}");
    }
}

fn content_type_for_filename(filename: &str) -> &'static str {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "mov" => "video/quicktime",
        "m4a" => "audio/mp4",
        "mp3" => "audio/mpeg",
        _ => "application/octet-stream",
    }
}

fn build_content_disposition(filename: &str) -> String {
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        sanitize_ascii_filename(filename),
        urlencoding::encode(filename)
    )
}

fn sanitize_ascii_filename(value: &str) -> String {
    let sanitized: String = value
        .chars()
        .map(|character| {
            if character.is_ascii_alphanumeric() || matches!(character, '.' | '-' | '_') {
                character
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.trim_matches('_').is_empty() {
        "video.mp4".to_string()
    } else {
        sanitized
    }
}
